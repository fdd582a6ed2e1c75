use std::fmt::Formatter;

use serde::Deserialize;
use tracing::{debug, trace};

use crate::{
    ast::{
        Column, ComparisonOperator, Condition, FromItem, Identifier, JoinCondition, Node, Operand,
        OperationType, OrderTarget, Query, SelectItem, TableName, UnaryOperator,
        UserDefinedFunction,
    },
    db_type::TypeMapping,
    error::Error,
    function_def::{FunctionRegistry, apply_pattern},
    functions::ScalarFunction,
    geometry::{GeometryFunction, GeometryKind, GeometryValue, RegionFunction},
    region::Region,
    to_sql::{Printer, PrinterConfig},
};

pub mod postgres;
pub mod sqlite;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    BitAnd,
    BitOr,
    BitXor,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Like,
    NotLike,
    ILike,
    NotILike,
    And,
    Or,
    Concat,
    /// A dialect specific infix operator, printed surrounded by spaces.
    Other(&'static str),
}

impl BinaryOp {
    /// Arithmetic and bitwise operators are printed without surrounding spaces.
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Add | Self::Sub | Self::Mul | Self::Div | Self::BitAnd | Self::BitOr | Self::BitXor
        )
    }
}

impl From<OperationType> for BinaryOp {
    fn from(op: OperationType) -> Self {
        match op {
            OperationType::Sum => Self::Add,
            OperationType::Sub => Self::Sub,
            OperationType::Mult => Self::Mul,
            OperationType::Div => Self::Div,
            OperationType::BitAnd => Self::BitAnd,
            OperationType::BitOr => Self::BitOr,
            OperationType::BitXor => Self::BitXor,
        }
    }
}

impl From<ComparisonOperator> for BinaryOp {
    fn from(op: ComparisonOperator) -> Self {
        match op {
            ComparisonOperator::Eq => Self::Eq,
            ComparisonOperator::Ne => Self::Ne,
            ComparisonOperator::Lt => Self::Lt,
            ComparisonOperator::Le => Self::Le,
            ComparisonOperator::Gt => Self::Gt,
            ComparisonOperator::Ge => Self::Ge,
            ComparisonOperator::Like => Self::Like,
            ComparisonOperator::NotLike => Self::NotLike,
            ComparisonOperator::ILike => Self::ILike,
            ComparisonOperator::NotILike => Self::NotILike,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    BitNot,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Parenthesize {
    #[default]
    Yes,
    No,
}

impl Parenthesize {
    pub fn open(&self, out: &mut Formatter) -> std::fmt::Result {
        self.write(out, "(")
    }
    pub fn close(&self, out: &mut Formatter) -> std::fmt::Result {
        self.write(out, ")")
    }
    fn write(&self, out: &mut Formatter, str: &str) -> std::fmt::Result {
        if self == &Parenthesize::Yes {
            out.write_str(str)
        } else {
            Ok(())
        }
    }
}

/// An identifier in the output; `quoted` ones are printed with the dialect's
///  delimiters and keep their case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ident {
    pub name: String,
    pub quoted: bool,
}

impl Ident {
    pub fn quoted(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            quoted: true,
        }
    }
}

/// This is the output type of translation: an ADQL tree goes in, a SQL tree
///  comes out.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    NumberLiteral(String),
    /// Unescaped; the printer doubles single quotes.
    StringLiteral(String),
    /// Possibly qualified name: `schema.table.column`.
    Field(Vec<Ident>),
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    BinaryOperator(Box<Expression>, BinaryOp, Box<Expression>, Parenthesize),
    // This is an optimization of BinaryOperator for things like:
    //   a || b || c
    // OR
    //   x AND y AND z
    BinaryOperatorSequence(BinaryOp, Vec<Expression>, Parenthesize),
    UnaryOperator(UnaryOp, Box<Expression>),
    Cast(Box<Expression>, String),
    IsNull(Box<Expression>, bool),
    Between {
        operand: Box<Expression>,
        low: Box<Expression>,
        high: Box<Expression>,
        negated: bool,
    },
    /// Text emitted as is, e.g. the expansion of a UDF translation pattern.
    Verbatim(String),
}

// These From implementations help the translation implementation
impl From<&str> for Expression {
    fn from(s: &str) -> Self {
        Expression::StringLiteral(s.to_string())
    }
}
impl From<String> for Expression {
    fn from(s: String) -> Self {
        Expression::StringLiteral(s)
    }
}
impl From<i64> for Expression {
    fn from(n: i64) -> Self {
        Expression::NumberLiteral(n.to_string())
    }
}

impl Expression {
    pub fn call(name: impl Into<String>, args: Vec<Expression>) -> Self {
        Expression::FunctionCall {
            name: name.into(),
            args,
        }
    }

    pub fn binary(l: Expression, op: BinaryOp, r: Expression) -> Self {
        Expression::BinaryOperator(Box::new(l), op, Box::new(r), Parenthesize::Yes)
    }
}

pub type Result = std::result::Result<Expression, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Rows(u64),
    /// The dialect's "no limit" keyword, needed before a lone OFFSET.
    Unbounded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectExpr {
    All,
    AllOf(Vec<Ident>),
    Expr { expr: Expression, alias: Ident },
}

#[derive(Debug, Clone, PartialEq)]
pub enum FromExpr {
    Table {
        name: Vec<Ident>,
        alias: Option<Ident>,
    },
    Join {
        keyword: &'static str,
        natural: bool,
        left: Box<FromExpr>,
        right: Box<FromExpr>,
        on: Option<Expression>,
        using: Vec<Ident>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderExpr {
    pub expr: Expression,
    pub descending: bool,
}

/// A translated query, printed by [crate::to_sql].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectStatement {
    pub distinct: bool,
    pub items: Vec<SelectExpr>,
    pub from: Vec<FromExpr>,
    pub where_clause: Option<Expression>,
    pub group_by: Vec<Expression>,
    pub having: Option<Expression>,
    pub order_by: Vec<OrderExpr>,
    pub limit: Option<Limit>,
    pub offset: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierField {
    Catalog,
    Schema,
    Table,
    Column,
    Alias,
}

/// Which identifier kinds are emitted quoted (and case preserved).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CaseSensitivity {
    pub catalog: bool,
    pub schema: bool,
    pub table: bool,
    pub column: bool,
    pub alias: bool,
}

impl CaseSensitivity {
    pub fn all() -> Self {
        Self {
            catalog: true,
            schema: true,
            table: true,
            column: true,
            alias: true,
        }
    }

    pub fn get(&self, field: IdentifierField) -> bool {
        match field {
            IdentifierField::Catalog => self.catalog,
            IdentifierField::Schema => self.schema,
            IdentifierField::Table => self.table,
            IdentifierField::Column => self.column,
            IdentifierField::Alias => self.alias,
        }
    }
}

/// How to translate an OFFSET which has no accompanying limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetPolicy {
    /// `OFFSET n` on its own.
    #[default]
    Standalone,
    /// `LIMIT <unbounded> OFFSET n`.
    WithUnboundedLimit,
    Reject,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DialectConfig {
    pub case_sensitivity: CaseSensitivity,
    pub offset_policy: OffsetPolicy,
}

/// This trait allows the caller to control translation. When implementing a new
///  translation target, a reasonable strategy is to rely on the default methods
///  and intercept anything that needs to be handled differently:
///
/// ```rust
/// # use adql_expr::{
/// #     ast::{Operand, UserDefinedFunction},
/// #     db_type::TypeMapping,
/// #     error::Error,
/// #     functions::{ScalarFunction, ScalarFunctionKind},
/// #     geometry::GeometryFunction,
/// #     region::Region,
/// #     to_sql::PrinterConfig,
/// #     translate::{self, DialectConfig, Expression, TranslationContext},
/// # };
/// struct MyCustomTranslator {
///     dialect: DialectConfig,
///     types: adql_expr::translate::postgres::PostgresTypeMapping,
/// }
///
/// impl TranslationContext for MyCustomTranslator {
///     type Geometry = String;
///
///     fn dialect(&self) -> &DialectConfig {
///         &self.dialect
///     }
///
///     fn printer_config(&self) -> PrinterConfig {
///         PrinterConfig::default()
///     }
///
///     fn type_mapping(&self) -> &dyn TypeMapping {
///         &self.types
///     }
///
///     fn translate_fn_call(&self, function: &ScalarFunction) -> translate::Result {
///         // Handle the functions which differ here...
///         if function.kind == ScalarFunctionKind::Rand {
///             return Ok(Expression::call("random", vec![]));
///         }
///         // ...and delegate the rest
///         translate::translate_fn_call(function, self)
///     }
///
///     fn translate_geometry(&self, function: &GeometryFunction) -> translate::Result {
///         Err(Error::geometry("no geometry support", adql_expr::ast::Node::position(function)))
///     }
///
///     fn translate_geometry_from_db(&self, value: &String) -> Result<Region, Error> {
///         Region::parse(value)
///     }
///
///     fn translate_geometry_to_db(&self, region: &Region) -> Result<String, Error> {
///         Ok(region.to_string())
///     }
/// }
/// ```
pub trait TranslationContext {
    /// The engine's native representation of a region.
    type Geometry;

    fn dialect(&self) -> &DialectConfig;

    fn printer_config(&self) -> PrinterConfig;

    fn type_mapping(&self) -> &dyn TypeMapping;

    /// Called to translate every geometric function. There is no default:
    ///  each dialect states how (or whether) it supports every variant.
    fn translate_geometry(&self, function: &GeometryFunction) -> Result;

    /// Decodes a native geometry value. Malformed input is an error, never a
    ///  partial region.
    fn translate_geometry_from_db(
        &self,
        value: &Self::Geometry,
    ) -> std::result::Result<Region, Error>;

    fn translate_geometry_to_db(&self, region: &Region)
    -> std::result::Result<Self::Geometry, Error>;

    /// Definitions used for UDFs whose node carries none.
    fn functions(&self) -> Option<&FunctionRegistry> {
        None
    }

    fn is_case_sensitive(&self, field: IdentifierField) -> bool {
        self.dialect().case_sensitivity.get(field)
    }

    /// Called to translate an operand generally.
    fn translate(&self, operand: &Operand) -> Result {
        translate(operand, self)
    }

    /// Called to translate a call to one of the built-in scalar functions.
    fn translate_fn_call(&self, function: &ScalarFunction) -> Result {
        translate_fn_call(function, self)
    }

    fn translate_condition(&self, condition: &Condition) -> Result {
        translate_condition(condition, self)
    }

    fn translate_udf(&self, udf: &UserDefinedFunction) -> Result {
        translate_udf(udf, self)
    }
}

/// Translates an ADQL operand to a SQL expression.
pub fn translate<C: TranslationContext + ?Sized>(operand: &Operand, cx: &C) -> Result {
    match operand {
        Operand::Numeric(n) => Ok(Expression::NumberLiteral(n.to_decimal()?)),
        Operand::String(s) => Ok(Expression::StringLiteral(s.value.clone())),
        Operand::Column(c) => Ok(translate_column(c, cx)),
        Operand::Operation(op) => Ok(Expression::binary(
            cx.translate(&op.left)?,
            op.operator.into(),
            cx.translate(&op.right)?,
        )),
        Operand::Unary(u) => match (u.operator, u.operand.as_ref()) {
            // A negated literal folds into a single signed number
            (UnaryOperator::Negative, Operand::Numeric(n)) => {
                Ok(Expression::NumberLiteral(format!("-{}", n.to_decimal()?)))
            }
            (UnaryOperator::Negative, inner) => Ok(Expression::UnaryOperator(
                UnaryOp::Neg,
                Box::new(cx.translate(inner)?),
            )),
            (UnaryOperator::BitNot, inner) => Ok(Expression::UnaryOperator(
                UnaryOp::BitNot,
                Box::new(cx.translate(inner)?),
            )),
        },
        Operand::Concatenation(c) => Ok(Expression::BinaryOperatorSequence(
            BinaryOp::Concat,
            c.operands
                .iter()
                .map(|o| cx.translate(o))
                .collect::<std::result::Result<_, _>>()?,
            Parenthesize::Yes,
        )),
        Operand::Function(f) => cx.translate_fn_call(f),
        Operand::Cast(c) => Ok(Expression::Cast(
            Box::new(cx.translate(&c.operand)?),
            cx.type_mapping().to_backend(&c.target),
        )),
        Operand::Geometry(g) => cx.translate_geometry(g),
        Operand::Udf(u) => cx.translate_udf(u),
    }
}

/// Translates the arguments of a call, in order.
pub fn translate_args<C: TranslationContext + ?Sized>(
    args: &[Operand],
    cx: &C,
) -> std::result::Result<Vec<Expression>, Error> {
    args.iter().map(|a| cx.translate(a)).collect()
}

/// Default function translation: `NAME(arg, ...)`.
pub fn translate_fn_call<C: TranslationContext + ?Sized>(function: &ScalarFunction, cx: &C) -> Result {
    Ok(Expression::call(
        function.kind.name(),
        translate_args(&function.args, cx)?,
    ))
}

/// A nested AND/OR group must keep its parentheses.
fn grouped(expr: Expression) -> Expression {
    match expr {
        Expression::BinaryOperatorSequence(op @ (BinaryOp::And | BinaryOp::Or), items, _) => {
            Expression::BinaryOperatorSequence(op, items, Parenthesize::Yes)
        }
        other => other,
    }
}

pub fn translate_condition<C: TranslationContext + ?Sized>(condition: &Condition, cx: &C) -> Result {
    match condition {
        Condition::Comparison {
            left,
            operator: op @ (ComparisonOperator::ILike | ComparisonOperator::NotILike),
            right,
            ..
        } => {
            let like = if *op == ComparisonOperator::ILike {
                BinaryOp::Like
            } else {
                BinaryOp::NotLike
            };
            Ok(Expression::BinaryOperator(
                Box::new(Expression::call("LOWER", vec![cx.translate(left)?])),
                like,
                Box::new(Expression::call("LOWER", vec![cx.translate(right)?])),
                Parenthesize::No,
            ))
        }
        Condition::Comparison {
            left,
            operator,
            right,
            ..
        } => Ok(Expression::BinaryOperator(
            Box::new(cx.translate(left)?),
            (*operator).into(),
            Box::new(cx.translate(right)?),
            Parenthesize::No,
        )),
        Condition::IsNull {
            operand, negated, ..
        } => Ok(Expression::IsNull(Box::new(cx.translate(operand)?), *negated)),
        Condition::Between {
            operand,
            low,
            high,
            negated,
            ..
        } => Ok(Expression::Between {
            operand: Box::new(cx.translate(operand)?),
            low: Box::new(cx.translate(low)?),
            high: Box::new(cx.translate(high)?),
            negated: *negated,
        }),
        Condition::And(items) | Condition::Or(items) => {
            let op = if matches!(condition, Condition::And(_)) {
                BinaryOp::And
            } else {
                BinaryOp::Or
            };
            let items = items
                .iter()
                .map(|c| cx.translate_condition(c).map(grouped))
                .collect::<std::result::Result<_, _>>()?;
            Ok(Expression::BinaryOperatorSequence(op, items, Parenthesize::No))
        }
        Condition::Not(inner) => Ok(Expression::UnaryOperator(
            UnaryOp::Not,
            Box::new(grouped(cx.translate_condition(inner)?)),
        )),
    }
}

/// Expands the definition's translation pattern when there is one, otherwise
///  emits a plain call.
pub fn translate_udf<C: TranslationContext + ?Sized>(udf: &UserDefinedFunction, cx: &C) -> Result {
    let definition = udf
        .definition()
        .or_else(|| cx.functions()?.lookup(&udf.name, udf.args.len()));
    let args = translate_args(&udf.args, cx)?;

    match definition.and_then(|d| d.translation_pattern()) {
        Some(pattern) => {
            trace!(udf = %udf.name, pattern, "applying translation pattern");
            let config = cx.printer_config();
            let expanded = apply_pattern(pattern, |k| {
                k.checked_sub(1)
                    .and_then(|i| args.get(i))
                    .map(|arg| Printer::new(arg, config.clone()).to_string())
                    .ok_or_else(|| {
                        Error::Translation(format!(
                            "${k} is out of range in the translation pattern of {}",
                            udf.name
                        ))
                    })
            })?;
            Ok(Expression::Verbatim(expanded))
        }
        None => Ok(Expression::call(udf.name.clone(), args)),
    }
}

/// Translates a geometric argument; functions go through
///  [TranslationContext::translate_geometry].
pub fn translate_geometry_value<F, C>(value: &GeometryValue<F>, cx: &C) -> Result
where
    F: GeometryKind,
    C: TranslationContext + ?Sized,
{
    match value {
        GeometryValue::Column(c) => Ok(translate_column(c, cx)),
        GeometryValue::Function(f) => cx.translate_geometry(&f.as_geometry()),
        GeometryValue::Udf(u) => cx.translate_udf(u),
    }
}

fn ident<C: TranslationContext + ?Sized>(id: &Identifier, field: IdentifierField, cx: &C) -> Ident {
    Ident {
        name: id.name.clone(),
        quoted: id.case_sensitive || cx.is_case_sensitive(field),
    }
}

fn table_name<C: TranslationContext + ?Sized>(table: &TableName, cx: &C) -> Vec<Ident> {
    let mut parts = Vec::with_capacity(3);
    if let Some(catalog) = &table.catalog {
        parts.push(ident(catalog, IdentifierField::Catalog, cx));
    }
    if let Some(schema) = &table.schema {
        parts.push(ident(schema, IdentifierField::Schema, cx));
    }
    parts.push(ident(&table.name, IdentifierField::Table, cx));
    parts
}

pub fn translate_column<C: TranslationContext + ?Sized>(column: &Column, cx: &C) -> Expression {
    let mut parts = column
        .table
        .as_ref()
        .map(|t| table_name(t, cx))
        .unwrap_or_default();
    parts.push(ident(&column.name, IdentifierField::Column, cx));
    Expression::Field(parts)
}

fn alias<C: TranslationContext + ?Sized>(alias: &Identifier, cx: &C) -> Ident {
    if alias.case_sensitive || cx.is_case_sensitive(IdentifierField::Alias) {
        Ident::quoted(alias.name.clone())
    } else {
        Ident::quoted(alias.name.to_lowercase())
    }
}

fn translate_from<C: TranslationContext + ?Sized>(
    item: &FromItem,
    cx: &C,
) -> std::result::Result<FromExpr, Error> {
    match item {
        FromItem::Table(t) => Ok(FromExpr::Table {
            name: table_name(&t.name, cx),
            alias: t.alias.as_ref().map(|a| alias(a, cx)),
        }),
        FromItem::Join(join) => {
            let (on, using) = match &join.condition {
                Some(JoinCondition::On(cond)) => (Some(cx.translate_condition(cond)?), vec![]),
                Some(JoinCondition::Using(cols)) => (
                    None,
                    cols.iter()
                        .map(|c| ident(&c.name, IdentifierField::Column, cx))
                        .collect(),
                ),
                None => (None, vec![]),
            };
            Ok(FromExpr::Join {
                keyword: join.kind.keyword(),
                natural: join.natural,
                left: Box::new(translate_from(&join.left, cx)?),
                right: Box::new(translate_from(&join.right, cx)?),
                on,
                using,
            })
        }
    }
}

/// Builds the SQL statement for `query` without printing it.
pub fn select_statement<C: TranslationContext + ?Sized>(
    query: &Query,
    cx: &C,
) -> std::result::Result<SelectStatement, Error> {
    let items = query
        .select
        .items
        .iter()
        .map(|item| -> std::result::Result<SelectExpr, Error> {
            Ok(match item {
                SelectItem::All => SelectExpr::All,
                SelectItem::AllOf(table) => SelectExpr::AllOf(table_name(table, cx)),
                SelectItem::Operand {
                    operand,
                    alias: name,
                } => SelectExpr::Expr {
                    expr: cx.translate(operand)?,
                    alias: match name {
                        Some(name) => alias(name, cx),
                        None => Ident::quoted(operand.name()),
                    },
                },
            })
        })
        .collect::<std::result::Result<Vec<_>, Error>>()?;

    let mut limit = query.select.top.map(Limit::Rows);
    let offset = query.offset.as_ref().map(|o| o.value);
    if limit.is_none() && offset.is_some() {
        match cx.dialect().offset_policy {
            OffsetPolicy::Standalone => {}
            OffsetPolicy::WithUnboundedLimit => limit = Some(Limit::Unbounded),
            OffsetPolicy::Reject => {
                return Err(Error::Translation(
                    "OFFSET without a row limit is not supported by this dialect".to_string(),
                ));
            }
        }
    }

    Ok(SelectStatement {
        distinct: query.select.distinct,
        items,
        from: query
            .from
            .iter()
            .map(|f| translate_from(f, cx))
            .collect::<std::result::Result<_, _>>()?,
        where_clause: query
            .where_clause
            .as_ref()
            .map(|c| cx.translate_condition(c))
            .transpose()?,
        group_by: translate_args(&query.group_by, cx)?,
        having: query
            .having
            .as_ref()
            .map(|c| cx.translate_condition(c))
            .transpose()?,
        order_by: query
            .order_by
            .iter()
            .map(|item| -> std::result::Result<OrderExpr, Error> {
                let expr = match &item.target {
                    OrderTarget::Operand(o) => cx.translate(o)?,
                    OrderTarget::Index(i) => Expression::NumberLiteral(i.to_string()),
                };
                Ok(OrderExpr {
                    expr,
                    descending: item.descending,
                })
            })
            .collect::<std::result::Result<_, _>>()?,
        limit,
        offset,
    })
}

/// Translates a whole query to SQL text.
pub fn translate_query<C: TranslationContext + ?Sized>(
    query: &Query,
    cx: &C,
) -> std::result::Result<String, Error> {
    debug!(adql = %query.to_adql(), "translating query");
    let statement = select_statement(query, cx)?;
    let sql = Printer::new(statement, cx.printer_config()).to_string();
    debug!(%sql, "translated query");
    Ok(sql)
}

/// Translates a single operand to SQL text.
pub fn translate_operand<C: TranslationContext + ?Sized>(
    operand: &Operand,
    cx: &C,
) -> std::result::Result<String, Error> {
    let expr = cx.translate(operand)?;
    Ok(Printer::new(expr, cx.printer_config()).to_string())
}

/// `CONTAINS(..) = 1`, `INTERSECTS(..) != 0` and their mirrors: the predicate
///  and whether it is negated. Used by dialects with boolean spatial
///  operators.
pub fn geometry_predicate(condition: &Condition) -> Option<(&GeometryFunction, bool)> {
    let Condition::Comparison {
        left,
        operator,
        right,
        ..
    } = condition
    else {
        return None;
    };
    let (function, value) = match (left, right) {
        (Operand::Geometry(g), Operand::Numeric(n)) | (Operand::Numeric(n), Operand::Geometry(g)) => {
            (g.as_ref(), n.value.as_str())
        }
        _ => return None,
    };
    if !matches!(
        function,
        GeometryFunction::Contains(_) | GeometryFunction::Intersects(_)
    ) {
        return None;
    }
    let truthy = match value {
        "1" => true,
        "0" => false,
        _ => return None,
    };
    match operator {
        ComparisonOperator::Eq => Some((function, !truthy)),
        ComparisonOperator::Ne => Some((function, truthy)),
        _ => None,
    }
}

/// The region described by the STC-S literal given to `REGION`.
pub fn region_argument(function: &RegionFunction) -> std::result::Result<Region, Error> {
    match &function.value {
        Operand::String(s) => Region::parse(&s.value),
        other => Err(Error::geometry(
            format!("REGION needs a literal STC-S string (got {})", other.to_adql()),
            function.position,
        )),
    }
}
