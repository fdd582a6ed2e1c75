//! PostgreSQL with the pgSphere extension. Angles are degrees on the ADQL side
//!  and radians inside pgSphere.

use nom::{
    IResult,
    branch::alt,
    character::complete::{char, multispace0},
    combinator::{map, opt},
    multi::separated_list1,
    number::complete::double,
    sequence::{delimited, preceded, separated_pair, tuple},
};
use tracing::{debug, trace};

use super::{
    BinaryOp, DialectConfig, Error, Expression, Parenthesize, Result, TranslationContext, UnaryOp,
    geometry_predicate, region_argument, translate_args, translate_geometry_value,
};
use crate::{
    config::Config,
    ast::{ComparisonOperator, Condition},
    db_type::{DbType, DbTypeKind, TypeMapping, length_param},
    function_def::FunctionRegistry,
    functions::{ScalarFunction, ScalarFunctionKind as F},
    geometry::GeometryFunction,
    position::TextPosition,
    region::{Region, Shape},
    to_sql::{PostgresPrinterContext, PrinterConfig},
};

/// This type provides default translation for Postgres. You can "inherit"
///  while allowing overriding by implementing the TranslationContext trait and
///  dispatching to the functions of this module for anything you're not
///  interested in overriding.
#[derive(Debug, Default)]
pub struct PostgresTranslator {
    pub dialect: DialectConfig,
    pub functions: FunctionRegistry,
    pub types: PostgresTypeMapping,
}

impl PostgresTranslator {
    pub fn new(dialect: DialectConfig) -> Self {
        Self {
            dialect,
            ..Default::default()
        }
    }

    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    /// Dialect options and UDF definitions from a deployment configuration.
    pub fn with_config(config: &Config) -> std::result::Result<Self, Error> {
        Ok(Self::new(config.dialect.unwrap_or_default()).with_functions(config.function_registry()?))
    }
}

impl TranslationContext for PostgresTranslator {
    type Geometry = String;

    fn dialect(&self) -> &DialectConfig {
        &self.dialect
    }

    fn printer_config(&self) -> PrinterConfig {
        PrinterConfig::new(PostgresPrinterContext)
    }

    fn type_mapping(&self) -> &dyn TypeMapping {
        &self.types
    }

    fn functions(&self) -> Option<&FunctionRegistry> {
        Some(&self.functions)
    }

    fn translate_fn_call(&self, function: &ScalarFunction) -> Result {
        translate_fn_call(function, self)
    }

    fn translate_condition(&self, condition: &Condition) -> Result {
        translate_condition(condition, self)
    }

    fn translate_geometry(&self, function: &GeometryFunction) -> Result {
        translate_geometry(function, self)
    }

    fn translate_geometry_from_db(&self, value: &String) -> std::result::Result<Region, Error> {
        from_pgsphere(value)
    }

    fn translate_geometry_to_db(&self, region: &Region) -> std::result::Result<String, Error> {
        to_pgsphere(region)
    }
}

fn numeric(e: Expression) -> Expression {
    Expression::Cast(Box::new(e), "numeric".to_string())
}

pub fn translate_fn_call<C: TranslationContext + ?Sized>(function: &ScalarFunction, cx: &C) -> Result {
    let mut args = translate_args(&function.args, cx)?;
    match function.kind {
        F::Log => Ok(Expression::call("ln", args)),
        F::Log10 => Ok(Expression::call("log", args)),
        // The seed has no equivalent in a single expression
        F::Rand => Ok(Expression::call("random", vec![])),
        F::Round | F::Truncate => {
            let name = if function.kind == F::Round { "round" } else { "trunc" };
            // Only the numeric variants take a precision
            if args.len() == 2 {
                let value = args.remove(0);
                args.insert(0, numeric(value));
            }
            Ok(Expression::call(name, args))
        }
        _ => super::translate_fn_call(function, cx),
    }
}

/// pgSphere's operators are boolean, so `CONTAINS(a, b) = 1` becomes the bare
///  predicate. Postgres has ILIKE natively.
pub fn translate_condition<C: TranslationContext + ?Sized>(condition: &Condition, cx: &C) -> Result {
    if let Some((function, negated)) = geometry_predicate(condition) {
        let predicate = cx.translate_geometry(function)?;
        return Ok(if negated {
            Expression::UnaryOperator(UnaryOp::Not, Box::new(predicate))
        } else {
            predicate
        });
    }
    match condition {
        Condition::Comparison {
            left,
            operator: op @ (ComparisonOperator::ILike | ComparisonOperator::NotILike),
            right,
            ..
        } => Ok(Expression::BinaryOperator(
            Box::new(cx.translate(left)?),
            (*op).into(),
            Box::new(cx.translate(right)?),
            Parenthesize::No,
        )),
        _ => super::translate_condition(condition, cx),
    }
}

fn radians(e: Expression) -> Expression {
    Expression::call("radians", vec![e])
}

fn degrees(e: Expression) -> Expression {
    Expression::call("degrees", vec![e])
}

fn spoint(x: Expression, y: Expression) -> Expression {
    Expression::call("spoint", vec![radians(x), radians(y)])
}

fn half(e: Expression) -> Expression {
    Expression::binary(e, BinaryOp::Div, Expression::from(2))
}

fn pgsphere_type(shape: &Shape) -> Option<&'static str> {
    match shape {
        Shape::Position { .. } => Some("spoint"),
        Shape::Circle { .. } => Some("scircle"),
        Shape::Box { .. } => Some("sbox"),
        Shape::Polygon(_) => Some("spoly"),
        Shape::Union(_) | Shape::Intersection(_) | Shape::Not(_) => None,
    }
}

pub fn translate_geometry<C: TranslationContext + ?Sized>(function: &GeometryFunction, cx: &C) -> Result {
    trace!(function = function.name(), "translating to pgSphere");
    match function {
        GeometryFunction::Point(p) => Ok(spoint(cx.translate(&p.coord1)?, cx.translate(&p.coord2)?)),
        GeometryFunction::Circle(c) => Ok(Expression::call(
            "scircle",
            vec![
                spoint(cx.translate(&c.coord1)?, cx.translate(&c.coord2)?),
                radians(cx.translate(&c.radius)?),
            ],
        )),
        GeometryFunction::Box(b) => {
            let (x, y) = (cx.translate(&b.coord1)?, cx.translate(&b.coord2)?);
            let (w, h) = (half(cx.translate(&b.width)?), half(cx.translate(&b.height)?));
            let corner = |op| {
                spoint(
                    Expression::binary(x.clone(), op, w.clone()),
                    Expression::binary(y.clone(), op, h.clone()),
                )
            };
            Ok(Expression::call(
                "sbox",
                vec![corner(BinaryOp::Sub), corner(BinaryOp::Add)],
            ))
        }
        GeometryFunction::Polygon(p) => {
            // '{(' || ra1 || 'd,' || dec1 || 'd),(' || ... || 'd)}'
            let mut parts = Vec::with_capacity(p.vertices.len() * 4 + 1);
            for (i, (x, y)) in p.vertices.iter().enumerate() {
                parts.push(Expression::from(if i == 0 { "{(" } else { "d),(" }));
                parts.push(cx.translate(x)?);
                parts.push(Expression::from("d,"));
                parts.push(cx.translate(y)?);
            }
            parts.push(Expression::from("d)}"));
            Ok(Expression::Cast(
                Box::new(Expression::BinaryOperatorSequence(
                    BinaryOp::Concat,
                    parts,
                    Parenthesize::No,
                )),
                "spoly".to_string(),
            ))
        }
        GeometryFunction::Region(r) => {
            let region = region_argument(r)?;
            let ty = pgsphere_type(&region.shape).ok_or_else(|| {
                Error::geometry(
                    format!("pgSphere has no type for the region {region}"),
                    r.position,
                )
            })?;
            Ok(Expression::Cast(
                Box::new(Expression::StringLiteral(to_pgsphere(&region)?)),
                ty.to_string(),
            ))
        }
        GeometryFunction::Centroid(c) => Ok(Expression::call(
            "center",
            vec![translate_geometry_value(&c.geometry, cx)?],
        )),
        // steradians to square degrees
        GeometryFunction::Area(a) => Ok(degrees(degrees(Expression::call(
            "area",
            vec![translate_geometry_value(&a.geometry, cx)?],
        )))),
        GeometryFunction::Distance(d) => Ok(degrees(Expression::binary(
            translate_geometry_value(&d.p1, cx)?,
            BinaryOp::Other("<->"),
            translate_geometry_value(&d.p2, cx)?,
        ))),
        GeometryFunction::Contains(c) => Ok(Expression::binary(
            translate_geometry_value(&c.left, cx)?,
            BinaryOp::Other("@"),
            translate_geometry_value(&c.right, cx)?,
        )),
        GeometryFunction::Intersects(i) => Ok(Expression::binary(
            translate_geometry_value(&i.left, cx)?,
            BinaryOp::Other("&&"),
            translate_geometry_value(&i.right, cx)?,
        )),
        GeometryFunction::ExtractCoord(e) => Ok(degrees(Expression::call(
            if e.index() == 1 { "long" } else { "lat" },
            vec![translate_geometry_value(&e.point, cx)?],
        ))),
        // pgSphere values carry no frame
        GeometryFunction::ExtractCoordSys(_) => Ok(Expression::from("UNKNOWNFRAME")),
    }
}

/// pgSphere's type OIDs are assigned at install time, so those are matched by
///  name.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresTypeMapping;

impl TypeMapping for PostgresTypeMapping {
    fn from_backend(
        &self,
        type_code: i32,
        raw_name: &str,
        _display_name: &str,
        params: &[String],
    ) -> DbType {
        let sized = |kind| match length_param(params) {
            Some(n) => DbType::with_length(kind, n),
            None => DbType::new(kind),
        };
        let ty = match type_code {
            21 => DbType::new(DbTypeKind::SmallInt),
            23 => DbType::new(DbTypeKind::Integer),
            20 => DbType::new(DbTypeKind::BigInt),
            700 => DbType::new(DbTypeKind::Real),
            701 => DbType::new(DbTypeKind::Double),
            1700 => DbType::new(DbTypeKind::UnknownNumeric),
            1042 => sized(DbTypeKind::Char),
            1043 => sized(DbTypeKind::VarChar),
            25 => DbType::new(DbTypeKind::Clob),
            17 => DbType::new(DbTypeKind::VarBinary),
            1082 | 1114 | 1184 => DbType::new(DbTypeKind::Timestamp),
            _ => match raw_name.to_ascii_lowercase().as_str() {
                "spoint" => DbType::new(DbTypeKind::Point),
                "scircle" => DbType::new(DbTypeKind::Circle),
                "spoly" | "sbox" => DbType::new(DbTypeKind::Polygon),
                _ => return DbType::unknown(raw_name),
            },
        };
        ty.raw(raw_name)
    }

    fn to_backend(&self, ty: &DbType) -> String {
        let sized = |name: &str| match ty.length {
            Some(n) => format!("{name}({n})"),
            None => name.to_string(),
        };
        match ty.kind {
            DbTypeKind::SmallInt => "smallint".to_string(),
            DbTypeKind::Integer => "integer".to_string(),
            DbTypeKind::BigInt => "bigint".to_string(),
            DbTypeKind::Real => "real".to_string(),
            DbTypeKind::Double => "double precision".to_string(),
            DbTypeKind::Binary | DbTypeKind::VarBinary | DbTypeKind::Blob => "bytea".to_string(),
            DbTypeKind::Char => sized("character"),
            DbTypeKind::VarChar => sized("varchar"),
            DbTypeKind::Clob => "text".to_string(),
            DbTypeKind::Timestamp => "timestamp".to_string(),
            DbTypeKind::Point => "spoint".to_string(),
            DbTypeKind::Circle => "scircle".to_string(),
            DbTypeKind::Polygon | DbTypeKind::Region => "spoly".to_string(),
            DbTypeKind::UnknownNumeric => "numeric".to_string(),
            DbTypeKind::Unknown => ty.raw_name.clone().unwrap_or_else(|| "text".to_string()),
        }
    }
}

fn point_text(x: f64, y: f64) -> String {
    format!("({x}d,{y}d)")
}

/// Encodes a region as pgSphere input text, in degrees.
pub fn to_pgsphere(region: &Region) -> std::result::Result<String, Error> {
    match &region.shape {
        Shape::Position { x, y } => Ok(point_text(*x, *y)),
        Shape::Circle { x, y, radius } => Ok(format!("<{},{radius}d>", point_text(*x, *y))),
        Shape::Box {
            x,
            y,
            width,
            height,
        } => Ok(format!(
            "({},{})",
            point_text(x - width / 2.0, y - height / 2.0),
            point_text(x + width / 2.0, y + height / 2.0)
        )),
        Shape::Polygon(vertices) => Ok(format!(
            "{{{}}}",
            vertices
                .iter()
                .map(|(x, y)| point_text(*x, *y))
                .collect::<Vec<_>>()
                .join(",")
        )),
        Shape::Union(_) | Shape::Intersection(_) | Shape::Not(_) => Err(Error::geometry(
            format!("pgSphere has no representation for {region}"),
            None,
        )),
    }
}

enum Sphere {
    Point((f64, f64)),
    Circle((f64, f64), f64),
    Box((f64, f64), (f64, f64)),
    Polygon(Vec<(f64, f64)>),
}

fn symbol<'a>(c: char) -> impl FnMut(&'a str) -> IResult<&'a str, char> {
    preceded(multispace0, char(c))
}

/// Radians unless suffixed with `d`.
fn angle(input: &str) -> IResult<&str, f64> {
    let (input, value) = preceded(multispace0, double)(input)?;
    let (input, unit) = opt(char('d'))(input)?;
    Ok((input, if unit.is_some() { value } else { value.to_degrees() }))
}

fn point(input: &str) -> IResult<&str, (f64, f64)> {
    delimited(symbol('('), separated_pair(angle, symbol(','), angle), symbol(')'))(input)
}

fn sphere(input: &str) -> IResult<&str, Sphere> {
    alt((
        map(
            delimited(symbol('<'), separated_pair(point, symbol(','), angle), symbol('>')),
            |(center, radius)| Sphere::Circle(center, radius),
        ),
        map(
            delimited(symbol('{'), separated_list1(symbol(','), point), symbol('}')),
            Sphere::Polygon,
        ),
        map(
            delimited(symbol('('), separated_pair(point, symbol(','), point), symbol(')')),
            |(lo, hi)| Sphere::Box(lo, hi),
        ),
        map(point, Sphere::Point),
    ))(input)
}

/// Decodes pgSphere output (radians, or degrees with a `d` suffix).
pub fn from_pgsphere(text: &str) -> std::result::Result<Region, Error> {
    let at = |rest: &str| Some(TextPosition::new(1, (text.len() - rest.len() + 1) as u32));
    let (rest, value) = match tuple((sphere, multispace0))(text) {
        Ok((rest, (value, _))) => (rest, value),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            debug!(text, "undecodable pgSphere value");
            return Err(Error::geometry(
                format!("Invalid pgSphere value \"{text}\""),
                at(e.input),
            ));
        }
        Err(nom::Err::Incomplete(_)) => {
            return Err(Error::geometry(format!("Incomplete pgSphere value \"{text}\""), None));
        }
    };
    if !rest.is_empty() {
        return Err(Error::geometry(
            format!("Unexpected text after pgSphere value: \"{rest}\""),
            at(rest),
        ));
    }
    match value {
        Sphere::Point((x, y)) => Region::position(x, y),
        Sphere::Circle((x, y), radius) => Region::circle(x, y, radius),
        Sphere::Box((x1, y1), (x2, y2)) => {
            Region::boxed((x1 + x2) / 2.0, (y1 + y2) / 2.0, x2 - x1, y2 - y1)
        }
        Sphere::Polygon(vertices) => Region::polygon(vertices),
    }
}
