//! SQLite with SpatiaLite. Geometry values are exchanged as WKT text (what
//!  `AsText` returns and `GeomFromText` accepts).

use nom::{
    IResult,
    branch::alt,
    bytes::complete::tag_no_case,
    character::complete::{char, multispace0, multispace1},
    combinator::map,
    multi::separated_list1,
    number::complete::double,
    sequence::{delimited, preceded, separated_pair, tuple},
};
use tracing::{debug, trace};

use crate::{
    config::Config,
    ast::{ComparisonOperator, Condition, Operand, OperationType},
    db_type::{DbType, DbTypeKind, TypeMapping, length_param},
    function_def::FunctionRegistry,
    functions::{ScalarFunction, ScalarFunctionKind as F},
    geometry::GeometryFunction,
    position::TextPosition,
    region::{Region, Shape},
    to_sql::{PrinterConfig, SqlitePrinterContext},
    translate::{
        self, BinaryOp, DialectConfig, Error, Expression, OffsetPolicy, Parenthesize, Result,
        TranslationContext, region_argument, translate_args, translate_geometry_value,
    },
};

#[derive(Debug)]
pub struct SqliteTranslator {
    pub dialect: DialectConfig,
    pub functions: FunctionRegistry,
    pub types: SqliteTypeMapping,
}

impl Default for SqliteTranslator {
    fn default() -> Self {
        // SQLite only accepts OFFSET after a LIMIT
        Self::new(DialectConfig {
            offset_policy: OffsetPolicy::WithUnboundedLimit,
            ..Default::default()
        })
    }
}

impl SqliteTranslator {
    pub fn new(dialect: DialectConfig) -> Self {
        Self {
            dialect,
            functions: FunctionRegistry::new(),
            types: SqliteTypeMapping,
        }
    }

    pub fn with_functions(mut self, functions: FunctionRegistry) -> Self {
        self.functions = functions;
        self
    }

    /// Dialect options and UDF definitions from a deployment configuration.
    pub fn with_config(config: &Config) -> std::result::Result<Self, Error> {
        Ok(config.dialect.map_or_else(Self::default, Self::new).with_functions(config.function_registry()?))
    }
}

impl TranslationContext for SqliteTranslator {
    type Geometry = String;

    fn dialect(&self) -> &DialectConfig {
        &self.dialect
    }

    fn printer_config(&self) -> PrinterConfig {
        PrinterConfig::new(SqlitePrinterContext)
    }

    fn type_mapping(&self) -> &dyn TypeMapping {
        &self.types
    }

    fn functions(&self) -> Option<&FunctionRegistry> {
        Some(&self.functions)
    }

    fn translate(&self, operand: &Operand) -> Result {
        match operand {
            // No XOR operator: (a|b)-(a&b)
            Operand::Operation(op) if op.operator == OperationType::BitXor => {
                let (l, r) = (self.translate(&op.left)?, self.translate(&op.right)?);
                Ok(Expression::binary(
                    Expression::binary(l.clone(), BinaryOp::BitOr, r.clone()),
                    BinaryOp::Sub,
                    Expression::binary(l, BinaryOp::BitAnd, r),
                ))
            }
            _ => translate::translate(operand, self),
        }
    }

    fn translate_fn_call(&self, function: &ScalarFunction) -> Result {
        translate_fn_call(function, self)
    }

    fn translate_condition(&self, condition: &Condition) -> Result {
        match condition {
            // LIKE is already case insensitive for ASCII
            Condition::Comparison {
                left,
                operator: op @ (ComparisonOperator::ILike | ComparisonOperator::NotILike),
                right,
                ..
            } => Ok(Expression::BinaryOperator(
                Box::new(self.translate(left)?),
                if *op == ComparisonOperator::ILike {
                    BinaryOp::Like
                } else {
                    BinaryOp::NotLike
                },
                Box::new(self.translate(right)?),
                Parenthesize::No,
            )),
            _ => translate::translate_condition(condition, self),
        }
    }

    fn translate_geometry(&self, function: &GeometryFunction) -> Result {
        translate_geometry(function, self)
    }

    fn translate_geometry_from_db(&self, value: &String) -> std::result::Result<Region, Error> {
        from_wkt(value)
    }

    fn translate_geometry_to_db(&self, region: &Region) -> std::result::Result<String, Error> {
        to_wkt(region)
    }
}

pub fn translate_fn_call<C: TranslationContext + ?Sized>(function: &ScalarFunction, cx: &C) -> Result {
    let mut args = translate_args(&function.args, cx)?;
    match function.kind {
        F::Log => Ok(Expression::call("ln", args)),
        F::Log10 => Ok(Expression::call("log10", args)),
        F::Rand => Ok(Expression::call("random", vec![])),
        F::Mod if args.len() == 2 => {
            let r = args.remove(1);
            let l = args.remove(0);
            Ok(Expression::binary(l, BinaryOp::Other("%"), r))
        }
        F::Cot => Ok(Expression::binary(
            Expression::from(1),
            BinaryOp::Div,
            Expression::call("tan", args),
        )),
        F::Truncate if args.len() == 2 => {
            // trunc(x * 10^n) / 10^n
            let digits = args.remove(1);
            let scale = Expression::call("power", vec![Expression::from(10), digits]);
            let value = args.remove(0);
            Ok(Expression::binary(
                Expression::call(
                    "trunc",
                    vec![Expression::binary(value, BinaryOp::Mul, scale.clone())],
                ),
                BinaryOp::Div,
                scale,
            ))
        }
        F::Truncate => Ok(Expression::call("trunc", args)),
        _ => translate::translate_fn_call(function, cx),
    }
}

fn number(value: f64) -> Expression {
    Expression::NumberLiteral(value.to_string())
}

fn make_point(x: Expression, y: Expression) -> Expression {
    Expression::call("MakePoint", vec![x, y])
}

fn region_expression(region: &Region, position: Option<TextPosition>) -> Result {
    let fold = |name: &str, regions: &[Region]| -> Result {
        regions
            .iter()
            .map(|r| region_expression(r, position))
            .collect::<std::result::Result<Vec<_>, _>>()?
            .into_iter()
            .reduce(|a, b| Expression::call(name, vec![a, b]))
            .ok_or_else(|| Error::geometry(format!("{name} of no regions"), position))
    };
    match &region.shape {
        Shape::Circle { x, y, radius } => Ok(Expression::call(
            "Buffer",
            vec![make_point(number(*x), number(*y)), number(*radius)],
        )),
        Shape::Union(regions) => fold("GUnion", regions),
        Shape::Intersection(regions) => fold("Intersection", regions),
        Shape::Not(_) => Err(Error::geometry(
            format!("SpatiaLite cannot express the complement region {region}"),
            position,
        )),
        Shape::Position { .. } | Shape::Box { .. } | Shape::Polygon(_) => Ok(Expression::call(
            "GeomFromText",
            vec![Expression::StringLiteral(to_wkt(region)?)],
        )),
    }
}

pub fn translate_geometry<C: TranslationContext + ?Sized>(function: &GeometryFunction, cx: &C) -> Result {
    trace!(function = function.name(), "translating to SpatiaLite");
    let call = |name: &str, args: Vec<Expression>| -> Result { Ok(Expression::call(name, args)) };
    match function {
        GeometryFunction::Point(p) => Ok(make_point(cx.translate(&p.coord1)?, cx.translate(&p.coord2)?)),
        GeometryFunction::Circle(c) => call(
            "Buffer",
            vec![
                make_point(cx.translate(&c.coord1)?, cx.translate(&c.coord2)?),
                cx.translate(&c.radius)?,
            ],
        ),
        GeometryFunction::Box(b) => {
            let (x, y) = (cx.translate(&b.coord1)?, cx.translate(&b.coord2)?);
            let half = |e| Expression::binary(e, BinaryOp::Div, Expression::from(2));
            let (w, h) = (half(cx.translate(&b.width)?), half(cx.translate(&b.height)?));
            call(
                "BuildMbr",
                vec![
                    Expression::binary(x.clone(), BinaryOp::Sub, w.clone()),
                    Expression::binary(y.clone(), BinaryOp::Sub, h.clone()),
                    Expression::binary(x, BinaryOp::Add, w),
                    Expression::binary(y, BinaryOp::Add, h),
                ],
            )
        }
        GeometryFunction::Polygon(p) => {
            // 'POLYGON((' || x1 || ' ' || y1 || ', ' || ... || x1 || ' ' || y1 || '))'
            let mut parts = vec![Expression::from("POLYGON((")];
            let closed = p.vertices.iter().chain(p.vertices.first());
            for (i, (x, y)) in closed.enumerate() {
                if i > 0 {
                    parts.push(Expression::from(", "));
                }
                parts.push(cx.translate(x)?);
                parts.push(Expression::from(" "));
                parts.push(cx.translate(y)?);
            }
            parts.push(Expression::from("))"));
            call(
                "GeomFromText",
                vec![Expression::BinaryOperatorSequence(
                    BinaryOp::Concat,
                    parts,
                    Parenthesize::No,
                )],
            )
        }
        GeometryFunction::Region(r) => region_expression(&region_argument(r)?, r.position),
        GeometryFunction::Centroid(c) => call("Centroid", vec![translate_geometry_value(&c.geometry, cx)?]),
        GeometryFunction::Area(a) => call("Area", vec![translate_geometry_value(&a.geometry, cx)?]),
        GeometryFunction::Distance(d) => call(
            "Distance",
            vec![
                translate_geometry_value(&d.p1, cx)?,
                translate_geometry_value(&d.p2, cx)?,
            ],
        ),
        GeometryFunction::Contains(c) => call(
            "Within",
            vec![
                translate_geometry_value(&c.left, cx)?,
                translate_geometry_value(&c.right, cx)?,
            ],
        ),
        GeometryFunction::Intersects(i) => call(
            "Intersects",
            vec![
                translate_geometry_value(&i.left, cx)?,
                translate_geometry_value(&i.right, cx)?,
            ],
        ),
        GeometryFunction::ExtractCoord(e) => call(
            if e.index() == 1 { "X" } else { "Y" },
            vec![translate_geometry_value(&e.point, cx)?],
        ),
        GeometryFunction::ExtractCoordSys(_) => Ok(Expression::from("UNKNOWNFRAME")),
    }
}

/// Maps declared column types with SQLite's affinity rules. `type_code` is the
///  storage class of a value (1 integer, 2 float, 3 text, 4 blob), used when
///  nothing was declared.
#[derive(Debug, Default, Clone, Copy)]
pub struct SqliteTypeMapping;

impl TypeMapping for SqliteTypeMapping {
    fn from_backend(
        &self,
        type_code: i32,
        raw_name: &str,
        _display_name: &str,
        params: &[String],
    ) -> DbType {
        let declared = raw_name.to_ascii_uppercase();
        let sized = |kind| match length_param(params) {
            Some(n) => DbType::with_length(kind, n),
            None => DbType::new(kind),
        };
        let ty = match declared.as_str() {
            "POINT" => DbType::new(DbTypeKind::Point),
            "POLYGON" | "MULTIPOLYGON" => DbType::new(DbTypeKind::Polygon),
            "GEOMETRY" => DbType::new(DbTypeKind::Region),
            "" => match type_code {
                1 => DbType::new(DbTypeKind::BigInt),
                2 => DbType::new(DbTypeKind::Double),
                3 => DbType::new(DbTypeKind::Clob),
                4 => DbType::new(DbTypeKind::Blob),
                _ => return DbType::unknown(raw_name),
            },
            d if d.starts_with("SMALLINT") || d.starts_with("TINYINT") => {
                DbType::new(DbTypeKind::SmallInt)
            }
            d if d.contains("INT") => DbType::new(DbTypeKind::BigInt),
            d if d.contains("CLOB") || d.contains("TEXT") => DbType::new(DbTypeKind::Clob),
            d if d.contains("VARCHAR") || d.contains("VARYING") => sized(DbTypeKind::VarChar),
            d if d.contains("CHAR") => sized(DbTypeKind::Char),
            d if d.contains("BLOB") => DbType::new(DbTypeKind::Blob),
            d if d.contains("REAL") || d.contains("FLOA") || d.contains("DOUB") => {
                DbType::new(DbTypeKind::Double)
            }
            d if d.contains("DATE") || d.contains("TIME") => DbType::new(DbTypeKind::Timestamp),
            _ => DbType::new(DbTypeKind::UnknownNumeric),
        };
        ty.raw(raw_name)
    }

    fn to_backend(&self, ty: &DbType) -> String {
        match ty.kind {
            DbTypeKind::SmallInt | DbTypeKind::Integer | DbTypeKind::BigInt => "INTEGER",
            DbTypeKind::Real | DbTypeKind::Double => "REAL",
            DbTypeKind::Char
            | DbTypeKind::VarChar
            | DbTypeKind::Clob
            | DbTypeKind::Timestamp => "TEXT",
            DbTypeKind::Binary
            | DbTypeKind::VarBinary
            | DbTypeKind::Blob
            | DbTypeKind::Point
            | DbTypeKind::Circle
            | DbTypeKind::Polygon
            | DbTypeKind::Region => "BLOB",
            DbTypeKind::UnknownNumeric => "NUMERIC",
            DbTypeKind::Unknown => return ty.raw_name.clone().unwrap_or_else(|| "BLOB".to_string()),
        }
        .to_string()
    }
}

fn wkt_ring(vertices: &[(f64, f64)]) -> String {
    vertices
        .iter()
        .chain(vertices.first())
        .map(|(x, y)| format!("{x} {y}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Encodes a region as WKT. Circles and composite regions have no WKT form.
pub fn to_wkt(region: &Region) -> std::result::Result<String, Error> {
    match &region.shape {
        Shape::Position { x, y } => Ok(format!("POINT({x} {y})")),
        Shape::Box {
            x,
            y,
            width,
            height,
        } => {
            let (x0, x1) = (x - width / 2.0, x + width / 2.0);
            let (y0, y1) = (y - height / 2.0, y + height / 2.0);
            Ok(format!(
                "POLYGON(({}))",
                wkt_ring(&[(x0, y0), (x1, y0), (x1, y1), (x0, y1)])
            ))
        }
        Shape::Polygon(vertices) => Ok(format!("POLYGON(({}))", wkt_ring(vertices))),
        Shape::Circle { .. } | Shape::Union(_) | Shape::Intersection(_) | Shape::Not(_) => {
            Err(Error::geometry(format!("No WKT representation for {region}"), None))
        }
    }
}

enum Wkt {
    Point((f64, f64)),
    Polygon(Vec<(f64, f64)>),
}

fn symbol<'a>(c: char) -> impl FnMut(&'a str) -> IResult<&'a str, char> {
    preceded(multispace0, char(c))
}

fn coordinates(input: &str) -> IResult<&str, (f64, f64)> {
    preceded(multispace0, separated_pair(double, multispace1, double))(input)
}

fn wkt(input: &str) -> IResult<&str, Wkt> {
    alt((
        map(
            preceded(
                tag_no_case("POINT"),
                delimited(symbol('('), coordinates, symbol(')')),
            ),
            Wkt::Point,
        ),
        map(
            preceded(
                tag_no_case("POLYGON"),
                delimited(
                    tuple((symbol('('), symbol('('))),
                    separated_list1(symbol(','), coordinates),
                    tuple((symbol(')'), symbol(')'))),
                ),
            ),
            Wkt::Polygon,
        ),
    ))(input)
}

/// Decodes a WKT point or single-ring polygon.
pub fn from_wkt(text: &str) -> std::result::Result<Region, Error> {
    let at = |rest: &str| Some(TextPosition::new(1, (text.len() - rest.len() + 1) as u32));
    let (rest, value) = match delimited(multispace0, wkt, multispace0)(text) {
        Ok(parsed) => parsed,
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            debug!(text, "undecodable WKT value");
            return Err(Error::geometry(format!("Invalid WKT \"{text}\""), at(e.input)));
        }
        Err(nom::Err::Incomplete(_)) => {
            return Err(Error::geometry(format!("Incomplete WKT \"{text}\""), None));
        }
    };
    if !rest.is_empty() {
        return Err(Error::geometry(
            format!("Unexpected text after WKT: \"{rest}\""),
            at(rest),
        ));
    }
    match value {
        Wkt::Point((x, y)) => Region::position(x, y),
        Wkt::Polygon(mut ring) => {
            // the closing vertex repeats the first
            if ring.len() > 1 && ring.first() == ring.last() {
                ring.pop();
            }
            Region::polygon(ring)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        ast::{Query, SelectItem},
        geometry::{GeometryValue, PointFunction, PolygonFunction, RegionFunction},
        translate::{translate_operand, translate_query},
    };
    use pretty_assertions::assert_eq;

    #[test]
    fn offset_needs_a_limit() -> std::result::Result<(), Error> {
        let query = Query::select_from(vec![SelectItem::All], "foo").with_offset(10);
        assert_eq!(
            "SELECT *\nFROM foo\nLIMIT -1\nOFFSET 10",
            translate_query(&query, &SqliteTranslator::default())?
        );
        Ok(())
    }

    #[test]
    fn xor_and_functions() -> std::result::Result<(), Error> {
        let cx = SqliteTranslator::default();
        let xor = Operand::op(Operand::column("a"), OperationType::BitXor, Operand::column("b"));
        assert_eq!("((a|b)-(a&b))", translate_operand(&xor, &cx)?);

        let modulo = Operand::function(F::Mod, vec![Operand::column("a"), Operand::numeric("3")])?;
        assert_eq!("(a % 3)", translate_operand(&modulo, &cx)?);

        let truncate = Operand::function(F::Truncate, vec![Operand::column("x"), Operand::numeric("2")])?;
        assert_eq!(
            "(trunc((x*power(10, 2)))/power(10, 2))",
            translate_operand(&truncate, &cx)?
        );
        Ok(())
    }

    #[test]
    fn ilike_is_like() -> std::result::Result<(), Error> {
        let query = Query::select_from(vec![SelectItem::All], "foo").with_where(Condition::compare(
            Operand::column("name"),
            ComparisonOperator::ILike,
            Operand::string("m%"),
        ));
        assert_eq!(
            "SELECT *\nFROM foo\nWHERE name LIKE 'm%'",
            translate_query(&query, &SqliteTranslator::default())?
        );
        Ok(())
    }

    #[test]
    fn geometry() -> std::result::Result<(), Error> {
        let cx = SqliteTranslator::default();
        let polygon = PolygonFunction::new(
            None,
            vec![
                (Operand::numeric("0"), Operand::numeric("0")),
                (Operand::numeric("1"), Operand::numeric("0")),
                (Operand::column("x"), Operand::numeric("1")),
            ],
        )?;
        assert_eq!(
            "GeomFromText('POLYGON((' || 0 || ' ' || 0 || ', ' || 1 || ' ' || 0 || ', ' || x || ' ' || 1 || ', ' || 0 || ' ' || 0 || '))')",
            translate_operand(&Operand::from(GeometryFunction::from(polygon)), &cx)?
        );

        let point = PointFunction::new(None, Operand::column("ra"), Operand::column("dec"))?;
        let coord = crate::geometry::ExtractCoord::new(2, GeometryValue::Function(Box::new(point)))?;
        assert_eq!(
            "Y(MakePoint(ra, dec))",
            translate_operand(&Operand::from(GeometryFunction::from(coord)), &cx)?
        );

        let union = RegionFunction::new(Operand::string(
            "UNION (CIRCLE 1 2 3 POSITION 4 5 BOX 0 0 2 2)",
        ))?;
        assert_eq!(
            "GUnion(GUnion(Buffer(MakePoint(1, 2), 3), GeomFromText('POINT(4 5)')), GeomFromText('POLYGON((-1 -1, 1 -1, 1 1, -1 1, -1 -1))'))",
            translate_operand(&Operand::from(GeometryFunction::from(union)), &cx)?
        );
        Ok(())
    }

    #[test]
    fn wkt_round_trip() -> std::result::Result<(), Error> {
        let cx = SqliteTranslator::default();
        for region in [
            Region::position(10.5, -20.0)?,
            Region::polygon(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)])?,
        ] {
            let native = cx.translate_geometry_to_db(&region)?;
            assert_eq!(region, cx.translate_geometry_from_db(&native)?);
        }
        assert_eq!(
            Region::position(1.0, 2.0)?,
            from_wkt(" point ( 1 2 ) ")?
        );
        assert!(to_wkt(&Region::circle(1.0, 2.0, 3.0)?).is_err());
        assert!(from_wkt("LINESTRING(0 0, 1 1)").is_err());
        Ok(())
    }

    #[test]
    fn type_mapping() {
        let types = SqliteTypeMapping;
        assert_eq!(DbTypeKind::BigInt, types.from_backend(0, "integer", "INTEGER", &[]).kind);
        assert_eq!(
            DbType::with_length(DbTypeKind::VarChar, 20).raw("VARCHAR"),
            types.from_backend(0, "VARCHAR", "VARCHAR", &["20".to_string()])
        );
        assert_eq!(DbTypeKind::Double, types.from_backend(2, "", "", &[]).kind);
        assert_eq!(DbTypeKind::UnknownNumeric, types.from_backend(0, "DECIMAL", "DECIMAL", &[]).kind);
        assert_eq!("TEXT", types.to_backend(&DbType::with_length(DbTypeKind::VarChar, 20)));
    }
}
