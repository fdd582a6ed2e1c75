//! The ADQL syntax tree produced by a [crate::QueryParser] (or built by hand)
//!  and consumed by validation and translation.
//!
//! Every element implements [Node]. Trees own their children, so `clone()` is
//!  a deep copy and edits through `&mut` never leak into another tree.

use std::fmt::{self, Debug};

use crate::{
    db_type::DbType,
    error::Error,
    feature::{LanguageFeature, features},
    function_def::FunctionDef,
    functions::{ScalarFunction, ScalarFunctionKind},
    geometry::GeometryFunction,
    position::TextPosition,
};

/// A fresh iterator over the direct children of a node.
pub type Children<'a> = Box<dyn Iterator<Item = &'a dyn Node> + 'a>;

pub trait Node: Debug {
    /// Span in the source text; `None` for synthesized nodes.
    fn position(&self) -> Option<TextPosition>;

    /// The language feature a node of this kind requires.
    fn feature(&self) -> LanguageFeature;

    /// Canonical ADQL text of this node and its children.
    fn to_adql(&self) -> String;

    fn children(&self) -> Children<'_>;
}

/// Type predicates answered from the structure of a value.
pub trait ValueKind {
    fn is_numeric(&self) -> bool;
    fn is_string(&self) -> bool;
    fn is_geometry(&self) -> bool;
}

pub(crate) fn no_children<'a>() -> Children<'a> {
    Box::new(std::iter::empty())
}

pub(crate) fn join_adql<'a, N: Node + 'a>(nodes: impl IntoIterator<Item = &'a N>) -> String {
    nodes
        .into_iter()
        .map(|n| n.to_adql())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A name as written in the query. Delimited (`"Name"`) identifiers are case
///  sensitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    pub name: String,
    pub case_sensitive: bool,
}

impl Identifier {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            case_sensitive: false,
        }
    }

    pub fn delimited(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            case_sensitive: true,
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.case_sensitive {
            write!(f, "\"{}\"", self.name.replace('"', "\"\""))
        } else {
            f.write_str(&self.name)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName {
    pub catalog: Option<Identifier>,
    pub schema: Option<Identifier>,
    pub name: Identifier,
}

impl TableName {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: None,
            name: Identifier::new(name),
        }
    }

    pub fn qualified(schema: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            catalog: None,
            schema: Some(Identifier::new(schema)),
            name: Identifier::new(name),
        }
    }
}

impl From<&str> for TableName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in [&self.catalog, &self.schema].into_iter().flatten() {
            write!(f, "{part}.")?;
        }
        write!(f, "{}", self.name)
    }
}

/// A numeric literal, kept as written (`12`, `1.5e3`, `0xF`).
#[derive(Debug, Clone, PartialEq)]
pub struct NumericConstant {
    pub value: String,
    pub position: Option<TextPosition>,
}

impl NumericConstant {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            position: None,
        }
    }

    pub fn is_hexadecimal(&self) -> bool {
        self.value.starts_with("0x") || self.value.starts_with("0X")
    }

    /// The literal in decimal notation. Hexadecimal literals must fit an
    ///  unsigned 64 bit integer.
    pub fn to_decimal(&self) -> Result<String, Error> {
        if !self.is_hexadecimal() {
            return Ok(self.value.clone());
        }
        u64::from_str_radix(&self.value[2..], 16)
            .map(|v| v.to_string())
            .map_err(|e| {
                Error::Translation(format!("Invalid hexadecimal literal {}: {e}", self.value))
            })
    }
}

impl Node for NumericConstant {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        if self.is_hexadecimal() {
            features::HEXADECIMAL
        } else {
            features::NUMERIC
        }
    }

    fn to_adql(&self) -> String {
        self.value.clone()
    }

    fn children(&self) -> Children<'_> {
        no_children()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StringConstant {
    pub value: String,
    pub position: Option<TextPosition>,
}

impl StringConstant {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            position: None,
        }
    }
}

impl Node for StringConstant {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        features::STRING
    }

    fn to_adql(&self) -> String {
        format!("'{}'", self.value.replace('\'', "''"))
    }

    fn children(&self) -> Children<'_> {
        no_children()
    }
}

/// A column reference. `db_type` is filled in once the column is resolved
///  against the catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub table: Option<TableName>,
    pub name: Identifier,
    pub db_type: Option<DbType>,
    pub position: Option<TextPosition>,
}

impl Column {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            table: None,
            name: Identifier::new(name),
            db_type: None,
            position: None,
        }
    }

    pub fn with_table(mut self, table: impl Into<TableName>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_type(mut self, db_type: DbType) -> Self {
        self.db_type = Some(db_type);
        self
    }
}

impl Node for Column {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        features::COLUMN
    }

    fn to_adql(&self) -> String {
        match &self.table {
            Some(table) => format!("{table}.{}", self.name),
            None => self.name.to_string(),
        }
    }

    fn children(&self) -> Children<'_> {
        no_children()
    }
}

impl ValueKind for Column {
    fn is_numeric(&self) -> bool {
        self.db_type.as_ref().is_none_or(|t| t.is_numeric())
    }

    fn is_string(&self) -> bool {
        self.db_type.as_ref().is_none_or(|t| t.is_string())
    }

    fn is_geometry(&self) -> bool {
        self.db_type.as_ref().is_none_or(|t| t.is_geometry())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Sum,
    Sub,
    Mult,
    Div,
    BitAnd,
    BitOr,
    BitXor,
}

const UNARY_PRECEDENCE: u8 = 6;
const ATOM_PRECEDENCE: u8 = 7;

impl OperationType {
    /// The default select-item name of an operation.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Sum => "SUM",
            Self::Sub => "SUB",
            Self::Mult => "MULT",
            Self::Div => "DIV",
            Self::BitAnd => "BIT_AND",
            Self::BitOr => "BIT_OR",
            Self::BitXor => "BIT_XOR",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Sum => "+",
            Self::Sub => "-",
            Self::Mult => "*",
            Self::Div => "/",
            Self::BitAnd => "&",
            Self::BitOr => "|",
            Self::BitXor => "^",
        }
    }

    /// Binding strength in ADQL, higher binds tighter.
    pub fn precedence(&self) -> u8 {
        match self {
            Self::BitOr => 1,
            Self::BitXor => 2,
            Self::BitAnd => 3,
            Self::Sum | Self::Sub => 4,
            Self::Mult | Self::Div => 5,
        }
    }

    pub fn feature(&self) -> LanguageFeature {
        match self {
            Self::Sum => features::SUM,
            Self::Sub => features::SUB,
            Self::Mult => features::MULT,
            Self::Div => features::DIV,
            Self::BitAnd => features::BIT_AND,
            Self::BitOr => features::BIT_OR,
            Self::BitXor => features::BIT_XOR,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub left: Box<Operand>,
    pub operator: OperationType,
    pub right: Box<Operand>,
    pub position: Option<TextPosition>,
}

impl Operation {
    pub fn new(left: Operand, operator: OperationType, right: Operand) -> Self {
        Self {
            left: Box::new(left),
            operator,
            right: Box::new(right),
            position: None,
        }
    }
}

impl Node for Operation {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        self.operator.feature()
    }

    fn to_adql(&self) -> String {
        let prec = self.operator.precedence();
        // Operators are left associative: a right child of equal binding
        //  strength needs parentheses
        format!(
            "{}{}{}",
            self.left.to_adql_within(self.left.precedence() < prec),
            self.operator.symbol(),
            self.right.to_adql_within(self.right.precedence() <= prec),
        )
    }

    fn children(&self) -> Children<'_> {
        Box::new([&*self.left as &dyn Node, &*self.right].into_iter())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOperator {
    Negative,
    BitNot,
}

impl UnaryOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Negative => "-",
            Self::BitNot => "~",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UnaryOperation {
    pub operator: UnaryOperator,
    pub operand: Box<Operand>,
    pub position: Option<TextPosition>,
}

impl UnaryOperation {
    pub fn new(operator: UnaryOperator, operand: Operand) -> Self {
        Self {
            operator,
            operand: Box::new(operand),
            position: None,
        }
    }
}

impl Node for UnaryOperation {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        match self.operator {
            UnaryOperator::Negative => features::NEGATION,
            UnaryOperator::BitNot => features::BIT_NOT,
        }
    }

    fn to_adql(&self) -> String {
        // `--x` would start a comment
        let wrap = self.operand.precedence() <= UNARY_PRECEDENCE;
        format!(
            "{}{}",
            self.operator.symbol(),
            self.operand.to_adql_within(wrap)
        )
    }

    fn children(&self) -> Children<'_> {
        Box::new(std::iter::once(&*self.operand as &dyn Node))
    }
}

/// `a || b || c`, at least two operands.
#[derive(Debug, Clone, PartialEq)]
pub struct Concatenation {
    pub operands: Vec<Operand>,
    pub position: Option<TextPosition>,
}

impl Concatenation {
    pub fn new(operands: Vec<Operand>) -> Result<Self, Error> {
        if operands.len() < 2 {
            return Err(Error::InvalidArgument(format!(
                "A concatenation needs at least two operands (got {})",
                operands.len()
            )));
        }
        Ok(Self {
            operands,
            position: None,
        })
    }
}

impl Node for Concatenation {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        features::CONCAT
    }

    fn to_adql(&self) -> String {
        self.operands
            .iter()
            .map(|o| o.to_adql_within(o.precedence() < ATOM_PRECEDENCE))
            .collect::<Vec<_>>()
            .join(" || ")
    }

    fn children(&self) -> Children<'_> {
        Box::new(self.operands.iter().map(|o| o as &dyn Node))
    }
}

/// `CAST(x AS type)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Cast {
    pub operand: Box<Operand>,
    pub target: DbType,
    pub position: Option<TextPosition>,
}

impl Cast {
    pub fn new(operand: Operand, target: DbType) -> Self {
        Self {
            operand: Box::new(operand),
            target,
            position: None,
        }
    }
}

impl Node for Cast {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        features::CAST
    }

    fn to_adql(&self) -> String {
        format!("CAST({} AS {})", self.operand.to_adql(), self.target)
    }

    fn children(&self) -> Children<'_> {
        Box::new(std::iter::once(&*self.operand as &dyn Node))
    }
}

/// A call to a function the language does not define. It is typed by its
///  definition once one is attached.
#[derive(Debug, Clone, PartialEq)]
pub struct UserDefinedFunction {
    pub name: String,
    pub args: Vec<Operand>,
    definition: Option<FunctionDef>,
    pub position: Option<TextPosition>,
}

impl UserDefinedFunction {
    pub fn new(name: impl Into<String>, args: Vec<Operand>) -> Self {
        Self {
            name: name.into(),
            args,
            definition: None,
            position: None,
        }
    }

    pub fn definition(&self) -> Option<&FunctionDef> {
        self.definition.as_ref()
    }

    pub fn definition_mut(&mut self) -> Option<&mut FunctionDef> {
        self.definition.as_mut()
    }

    /// Attaches a definition; its name and arity must match the call.
    pub fn set_definition(&mut self, def: Option<FunctionDef>) -> Result<(), Error> {
        if let Some(def) = &def {
            if !def.name.eq_ignore_ascii_case(&self.name) || def.params.len() != self.args.len() {
                return Err(Error::InvalidArgument(format!(
                    "The definition \"{def}\" does not match the call {}",
                    self.to_adql()
                )));
            }
        }
        self.definition = def;
        Ok(())
    }
}

impl Node for UserDefinedFunction {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        LanguageFeature::udf(self.name.clone())
    }

    fn to_adql(&self) -> String {
        format!("{}({})", self.name, join_adql(&self.args))
    }

    fn children(&self) -> Children<'_> {
        Box::new(self.args.iter().map(|a| a as &dyn Node))
    }
}

impl ValueKind for UserDefinedFunction {
    fn is_numeric(&self) -> bool {
        self.definition.as_ref().is_none_or(|d| d.is_numeric())
    }

    fn is_string(&self) -> bool {
        self.definition.as_ref().is_none_or(|d| d.is_string())
    }

    fn is_geometry(&self) -> bool {
        self.definition.as_ref().is_none_or(|d| d.is_geometry())
    }
}

/// Any value expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Numeric(NumericConstant),
    String(StringConstant),
    Column(Column),
    Operation(Operation),
    Unary(UnaryOperation),
    Concatenation(Concatenation),
    Function(ScalarFunction),
    Cast(Cast),
    Geometry(Box<GeometryFunction>),
    Udf(UserDefinedFunction),
}

impl Operand {
    pub fn numeric(value: impl Into<String>) -> Self {
        Self::Numeric(NumericConstant::new(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        Self::String(StringConstant::new(value))
    }

    pub fn column(name: impl Into<String>) -> Self {
        Self::Column(Column::new(name))
    }

    pub fn udf(name: impl Into<String>, args: Vec<Operand>) -> Self {
        Self::Udf(UserDefinedFunction::new(name, args))
    }

    pub fn op(left: Operand, operator: OperationType, right: Operand) -> Self {
        Self::Operation(Operation::new(left, operator, right))
    }

    pub fn negate(operand: Operand) -> Self {
        Self::Unary(UnaryOperation::new(UnaryOperator::Negative, operand))
    }

    pub fn bit_not(operand: Operand) -> Self {
        Self::Unary(UnaryOperation::new(UnaryOperator::BitNot, operand))
    }

    pub fn function(kind: ScalarFunctionKind, args: Vec<Operand>) -> Result<Self, Error> {
        ScalarFunction::new(kind, args).map(Self::Function)
    }

    pub fn concat(operands: Vec<Operand>) -> Result<Self, Error> {
        Concatenation::new(operands).map(Self::Concatenation)
    }

    pub fn cast(operand: Operand, target: DbType) -> Self {
        Self::Cast(Cast::new(operand, target))
    }

    pub fn as_node(&self) -> &dyn Node {
        match self {
            Self::Numeric(n) => n,
            Self::String(s) => s,
            Self::Column(c) => c,
            Self::Operation(o) => o,
            Self::Unary(u) => u,
            Self::Concatenation(c) => c,
            Self::Function(f) => f,
            Self::Cast(c) => c,
            Self::Geometry(g) => &**g,
            Self::Udf(u) => u,
        }
    }

    pub fn set_position(&mut self, position: Option<TextPosition>) {
        match self {
            Self::Numeric(n) => n.position = position,
            Self::String(s) => s.position = position,
            Self::Column(c) => c.position = position,
            Self::Operation(o) => o.position = position,
            Self::Unary(u) => u.position = position,
            Self::Concatenation(c) => c.position = position,
            Self::Function(f) => f.position = position,
            Self::Cast(c) => c.position = position,
            Self::Geometry(g) => g.set_position(position),
            Self::Udf(u) => u.position = position,
        }
    }

    pub fn with_position(mut self, position: TextPosition) -> Self {
        self.set_position(Some(position));
        self
    }

    /// The name given to this operand when it is selected without an alias.
    pub fn name(&self) -> String {
        match self {
            Self::Numeric(n) => n.value.clone(),
            Self::String(s) => s.value.clone(),
            Self::Column(c) => c.name.name.clone(),
            Self::Operation(o) => o.operator.name().to_string(),
            Self::Unary(u) => match u.operator {
                UnaryOperator::Negative => format!("NEG_{}", u.operand.name()),
                UnaryOperator::BitNot => format!("BIT_NOT_{}", u.operand.name()),
            },
            Self::Concatenation(_) => "||".to_string(),
            Self::Function(f) => f.kind.name().to_string(),
            Self::Cast(_) => "CAST".to_string(),
            Self::Geometry(g) => g.name().to_string(),
            Self::Udf(u) => u.name.clone(),
        }
    }

    pub(crate) fn precedence(&self) -> u8 {
        match self {
            Self::Operation(o) => o.operator.precedence(),
            Self::Unary(_) => UNARY_PRECEDENCE,
            Self::Concatenation(_) => 0,
            _ => ATOM_PRECEDENCE,
        }
    }

    fn to_adql_within(&self, parenthesize: bool) -> String {
        if parenthesize {
            format!("({})", self.to_adql())
        } else {
            self.to_adql()
        }
    }
}

impl Node for Operand {
    fn position(&self) -> Option<TextPosition> {
        self.as_node().position()
    }

    fn feature(&self) -> LanguageFeature {
        self.as_node().feature()
    }

    fn to_adql(&self) -> String {
        self.as_node().to_adql()
    }

    fn children(&self) -> Children<'_> {
        self.as_node().children()
    }
}

impl ValueKind for Operand {
    fn is_numeric(&self) -> bool {
        match self {
            Self::Numeric(_) | Self::Operation(_) | Self::Unary(_) => true,
            Self::String(_) | Self::Concatenation(_) => false,
            Self::Column(c) => c.is_numeric(),
            Self::Function(f) => f.is_numeric(),
            Self::Cast(c) => c.target.is_numeric(),
            Self::Geometry(g) => g.is_numeric(),
            Self::Udf(u) => u.is_numeric(),
        }
    }

    fn is_string(&self) -> bool {
        match self {
            Self::String(_) | Self::Concatenation(_) => true,
            Self::Numeric(_) | Self::Operation(_) | Self::Unary(_) => false,
            Self::Column(c) => c.is_string(),
            Self::Function(f) => f.is_string(),
            Self::Cast(c) => c.target.is_string(),
            Self::Geometry(g) => g.is_string(),
            Self::Udf(u) => u.is_string(),
        }
    }

    fn is_geometry(&self) -> bool {
        match self {
            Self::Numeric(_)
            | Self::String(_)
            | Self::Operation(_)
            | Self::Unary(_)
            | Self::Concatenation(_) => false,
            Self::Column(c) => c.is_geometry(),
            Self::Function(f) => f.is_geometry(),
            Self::Cast(c) => c.target.is_geometry(),
            Self::Geometry(g) => g.is_geometry(),
            Self::Udf(u) => u.is_geometry(),
        }
    }
}

impl From<Column> for Operand {
    fn from(column: Column) -> Self {
        Self::Column(column)
    }
}

impl From<UserDefinedFunction> for Operand {
    fn from(udf: UserDefinedFunction) -> Self {
        Self::Udf(udf)
    }
}

impl From<ScalarFunction> for Operand {
    fn from(function: ScalarFunction) -> Self {
        Self::Function(function)
    }
}

impl From<GeometryFunction> for Operand {
    fn from(function: GeometryFunction) -> Self {
        Self::Geometry(Box::new(function))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComparisonOperator {
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
}

impl ComparisonOperator {
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Like => "LIKE",
            Self::NotLike => "NOT LIKE",
            Self::ILike => "ILIKE",
            Self::NotILike => "NOT ILIKE",
        }
    }
}

/// A search condition (`WHERE`, `HAVING`, `JOIN ... ON`).
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Comparison {
        left: Operand,
        operator: ComparisonOperator,
        right: Operand,
        position: Option<TextPosition>,
    },
    IsNull {
        operand: Operand,
        negated: bool,
        position: Option<TextPosition>,
    },
    Between {
        operand: Operand,
        low: Operand,
        high: Operand,
        negated: bool,
        position: Option<TextPosition>,
    },
    And(Vec<Condition>),
    Or(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn compare(left: Operand, operator: ComparisonOperator, right: Operand) -> Self {
        Self::Comparison {
            left,
            operator,
            right,
            position: None,
        }
    }

    pub fn is_null(operand: Operand, negated: bool) -> Self {
        Self::IsNull {
            operand,
            negated,
            position: None,
        }
    }

    pub fn between(operand: Operand, low: Operand, high: Operand, negated: bool) -> Self {
        Self::Between {
            operand,
            low,
            high,
            negated,
            position: None,
        }
    }

    fn is_group(&self) -> bool {
        matches!(self, Self::And(_) | Self::Or(_))
    }

    fn group_adql(&self) -> String {
        if self.is_group() {
            format!("({})", self.to_adql())
        } else {
            self.to_adql()
        }
    }
}

impl Node for Condition {
    fn position(&self) -> Option<TextPosition> {
        match self {
            Self::Comparison { position, .. }
            | Self::IsNull { position, .. }
            | Self::Between { position, .. } => *position,
            Self::And(items) | Self::Or(items) => {
                let first = items.first().and_then(|c| c.position());
                let last = items.last().and_then(|c| c.position());
                first.zip(last).map(|(b, e)| TextPosition::span(b, e))
            }
            Self::Not(inner) => inner.position(),
        }
    }

    fn feature(&self) -> LanguageFeature {
        match self {
            Self::Comparison {
                operator: ComparisonOperator::ILike | ComparisonOperator::NotILike,
                ..
            } => features::ILIKE,
            Self::Comparison { .. } => features::COMPARISON,
            Self::IsNull { .. } => features::IS_NULL,
            Self::Between { .. } => features::BETWEEN,
            Self::And(_) => features::AND,
            Self::Or(_) => features::OR,
            Self::Not(_) => features::NOT,
        }
    }

    fn to_adql(&self) -> String {
        match self {
            Self::Comparison {
                left,
                operator,
                right,
                ..
            } => format!("{} {} {}", left.to_adql(), operator.symbol(), right.to_adql()),
            Self::IsNull {
                operand, negated, ..
            } => format!(
                "{} IS {}NULL",
                operand.to_adql(),
                if *negated { "NOT " } else { "" }
            ),
            Self::Between {
                operand,
                low,
                high,
                negated,
                ..
            } => format!(
                "{} {}BETWEEN {} AND {}",
                operand.to_adql(),
                if *negated { "NOT " } else { "" },
                low.to_adql(),
                high.to_adql()
            ),
            Self::And(items) => items
                .iter()
                .map(Condition::group_adql)
                .collect::<Vec<_>>()
                .join(" AND "),
            Self::Or(items) => items
                .iter()
                .map(Condition::group_adql)
                .collect::<Vec<_>>()
                .join(" OR "),
            Self::Not(inner) => format!("NOT {}", inner.group_adql()),
        }
    }

    fn children(&self) -> Children<'_> {
        match self {
            Self::Comparison { left, right, .. } => {
                Box::new([left as &dyn Node, right].into_iter())
            }
            Self::IsNull { operand, .. } => Box::new(std::iter::once(operand as &dyn Node)),
            Self::Between {
                operand, low, high, ..
            } => Box::new([operand as &dyn Node, low, high].into_iter()),
            Self::And(items) | Self::Or(items) => Box::new(items.iter().map(|c| c as &dyn Node)),
            Self::Not(inner) => Box::new(std::iter::once(&**inner as &dyn Node)),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SelectItem {
    /// `*`
    All,
    /// `t.*`
    AllOf(TableName),
    Operand {
        operand: Operand,
        alias: Option<Identifier>,
    },
}

impl SelectItem {
    pub fn operand(operand: Operand) -> Self {
        Self::Operand {
            operand,
            alias: None,
        }
    }

    pub fn aliased(operand: Operand, alias: Identifier) -> Self {
        Self::Operand {
            operand,
            alias: Some(alias),
        }
    }

    fn to_adql(&self) -> String {
        match self {
            Self::All => "*".to_string(),
            Self::AllOf(table) => format!("{table}.*"),
            Self::Operand {
                operand,
                alias: None,
            } => operand.to_adql(),
            Self::Operand {
                operand,
                alias: Some(alias),
            } => format!("{} AS {alias}", operand.to_adql()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectClause {
    pub distinct: bool,
    pub top: Option<u64>,
    pub items: Vec<SelectItem>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: TableName,
    pub alias: Option<Identifier>,
    pub position: Option<TextPosition>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
}

impl JoinKind {
    pub fn keyword(&self) -> &'static str {
        match self {
            Self::Inner => "INNER JOIN",
            Self::Left => "LEFT OUTER JOIN",
            Self::Right => "RIGHT OUTER JOIN",
            Self::Full => "FULL OUTER JOIN",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JoinCondition {
    On(Condition),
    Using(Vec<Column>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
    pub kind: JoinKind,
    pub natural: bool,
    pub left: FromItem,
    pub right: FromItem,
    pub condition: Option<JoinCondition>,
    pub position: Option<TextPosition>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FromItem {
    Table(TableRef),
    Join(Box<Join>),
}

impl FromItem {
    pub fn table(name: impl Into<TableName>) -> Self {
        Self::Table(TableRef {
            name: name.into(),
            alias: None,
            position: None,
        })
    }

    pub fn aliased(name: impl Into<TableName>, alias: Identifier) -> Self {
        Self::Table(TableRef {
            name: name.into(),
            alias: Some(alias),
            position: None,
        })
    }

    pub fn join(
        kind: JoinKind,
        left: FromItem,
        right: FromItem,
        condition: Option<JoinCondition>,
    ) -> Self {
        Self::Join(Box::new(Join {
            kind,
            natural: false,
            left,
            right,
            condition,
            position: None,
        }))
    }
}

impl Node for FromItem {
    fn position(&self) -> Option<TextPosition> {
        match self {
            Self::Table(t) => t.position,
            Self::Join(j) => j.position,
        }
    }

    fn feature(&self) -> LanguageFeature {
        match self {
            Self::Table(_) => features::TABLE,
            Self::Join(_) => features::JOIN,
        }
    }

    fn to_adql(&self) -> String {
        match self {
            Self::Table(TableRef {
                name, alias: None, ..
            }) => name.to_string(),
            Self::Table(TableRef {
                name,
                alias: Some(alias),
                ..
            }) => format!("{name} AS {alias}"),
            Self::Join(join) => {
                let mut out = format!(
                    "{} {}{} {}",
                    join.left.to_adql(),
                    if join.natural { "NATURAL " } else { "" },
                    join.kind.keyword(),
                    join.right.to_adql()
                );
                match &join.condition {
                    Some(JoinCondition::On(cond)) => {
                        out.push_str(&format!(" ON {}", cond.to_adql()));
                    }
                    Some(JoinCondition::Using(cols)) => {
                        out.push_str(&format!(" USING({})", join_adql(cols)));
                    }
                    None => {}
                }
                out
            }
        }
    }

    fn children(&self) -> Children<'_> {
        match self {
            Self::Table(_) => no_children(),
            Self::Join(join) => {
                let condition: Children<'_> = match &join.condition {
                    Some(JoinCondition::On(cond)) => Box::new(std::iter::once(cond as &dyn Node)),
                    Some(JoinCondition::Using(cols)) => {
                        Box::new(cols.iter().map(|c| c as &dyn Node))
                    }
                    None => no_children(),
                };
                Box::new(
                    [&join.left as &dyn Node, &join.right]
                        .into_iter()
                        .chain(condition),
                )
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OrderTarget {
    Operand(Operand),
    /// 1-based index into the select list.
    Index(u32),
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderItem {
    pub target: OrderTarget,
    pub descending: bool,
}

impl OrderItem {
    fn to_adql(&self) -> String {
        let target = match &self.target {
            OrderTarget::Operand(o) => o.to_adql(),
            OrderTarget::Index(i) => i.to_string(),
        };
        format!("{target} {}", if self.descending { "DESC" } else { "ASC" })
    }
}

/// `OFFSET n`. An explicit `OFFSET 0` is kept distinct from no offset.
#[derive(Debug, Clone, PartialEq)]
pub struct Offset {
    pub value: u64,
    pub position: Option<TextPosition>,
}

impl Node for Offset {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        features::OFFSET
    }

    fn to_adql(&self) -> String {
        format!("OFFSET {}", self.value)
    }

    fn children(&self) -> Children<'_> {
        no_children()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub select: SelectClause,
    pub from: Vec<FromItem>,
    pub where_clause: Option<Condition>,
    pub group_by: Vec<Operand>,
    pub having: Option<Condition>,
    pub order_by: Vec<OrderItem>,
    pub offset: Option<Offset>,
    pub position: Option<TextPosition>,
}

impl Query {
    pub fn select(items: Vec<SelectItem>) -> Self {
        Self {
            select: SelectClause {
                items,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    /// `SELECT <items> FROM <table>`
    pub fn select_from(items: Vec<SelectItem>, table: impl Into<TableName>) -> Self {
        Self::select(items).with_from(FromItem::table(table))
    }

    pub fn with_from(mut self, item: FromItem) -> Self {
        self.from.push(item);
        self
    }

    pub fn distinct(mut self) -> Self {
        self.select.distinct = true;
        self
    }

    pub fn with_top(mut self, top: u64) -> Self {
        self.select.top = Some(top);
        self
    }

    pub fn with_offset(mut self, value: u64) -> Self {
        self.offset = Some(Offset {
            value,
            position: None,
        });
        self
    }

    pub fn with_where(mut self, condition: Condition) -> Self {
        self.where_clause = Some(condition);
        self
    }

    pub fn group_by(mut self, operand: Operand) -> Self {
        self.group_by.push(operand);
        self
    }

    pub fn with_having(mut self, condition: Condition) -> Self {
        self.having = Some(condition);
        self
    }

    pub fn order_by(mut self, operand: Operand, descending: bool) -> Self {
        self.order_by.push(OrderItem {
            target: OrderTarget::Operand(operand),
            descending,
        });
        self
    }

    pub fn order_by_index(mut self, index: u32, descending: bool) -> Self {
        self.order_by.push(OrderItem {
            target: OrderTarget::Index(index),
            descending,
        });
        self
    }
}

impl Node for Query {
    fn position(&self) -> Option<TextPosition> {
        self.position
    }

    fn feature(&self) -> LanguageFeature {
        features::SELECT
    }

    fn to_adql(&self) -> String {
        let mut out = String::from("SELECT ");
        if self.select.distinct {
            out.push_str("DISTINCT ");
        }
        if let Some(top) = self.select.top {
            out.push_str(&format!("TOP {top} "));
        }
        out.push_str(
            &self
                .select
                .items
                .iter()
                .map(SelectItem::to_adql)
                .collect::<Vec<_>>()
                .join(", "),
        );
        if !self.from.is_empty() {
            out.push_str(&format!("\nFROM {}", join_adql(&self.from)));
        }
        if let Some(cond) = &self.where_clause {
            out.push_str(&format!("\nWHERE {}", cond.to_adql()));
        }
        if !self.group_by.is_empty() {
            out.push_str(&format!("\nGROUP BY {}", join_adql(&self.group_by)));
        }
        if let Some(cond) = &self.having {
            out.push_str(&format!("\nHAVING {}", cond.to_adql()));
        }
        if !self.order_by.is_empty() {
            let items = self
                .order_by
                .iter()
                .map(OrderItem::to_adql)
                .collect::<Vec<_>>();
            out.push_str(&format!("\nORDER BY {}", items.join(", ")));
        }
        if let Some(offset) = &self.offset {
            out.push('\n');
            out.push_str(&offset.to_adql());
        }
        out
    }

    fn children(&self) -> Children<'_> {
        let selected = self.select.items.iter().filter_map(|item| match item {
            SelectItem::Operand { operand, .. } => Some(operand as &dyn Node),
            _ => None,
        });
        let ordered = self.order_by.iter().filter_map(|item| match &item.target {
            OrderTarget::Operand(o) => Some(o as &dyn Node),
            OrderTarget::Index(_) => None,
        });
        Box::new(
            selected
                .chain(self.from.iter().map(|f| f as &dyn Node))
                .chain(self.where_clause.iter().map(|c| c as &dyn Node))
                .chain(self.group_by.iter().map(|g| g as &dyn Node))
                .chain(self.having.iter().map(|c| c as &dyn Node))
                .chain(ordered)
                .chain(self.offset.iter().map(|o| o as &dyn Node)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_type::DbTypeKind;
    use pretty_assertions::assert_eq;

    use OperationType::*;

    fn n(v: &str) -> Operand {
        Operand::numeric(v)
    }

    /// ~3-1|2*5^6/1+2 as grouped by ADQL precedence
    fn precedence_tree() -> Operand {
        let left = Operand::op(Operand::bit_not(n("3")), Sub, n("1"));
        let right = Operand::op(
            Operand::op(n("2"), Mult, n("5")),
            BitXor,
            Operand::op(Operand::op(n("6"), Div, n("1")), Sum, n("2")),
        );
        Operand::op(left, BitOr, right)
    }

    #[test]
    fn adql_reinserts_needed_parentheses_only() {
        assert_eq!("~3-1|2*5^6/1+2", precedence_tree().to_adql());

        let grouped = Operand::op(n("1"), Sub, Operand::op(n("2"), Sub, n("3")));
        assert_eq!("1-(2-3)", grouped.to_adql());
        let left = Operand::op(Operand::op(n("1"), Sum, n("2")), Mult, n("3"));
        assert_eq!("(1+2)*3", left.to_adql());
        assert_eq!("-(-3)", Operand::negate(Operand::negate(n("3"))).to_adql());
        assert_eq!("-(a+1)", Operand::negate(Operand::op(Operand::column("a"), Sum, n("1"))).to_adql());
    }

    #[test]
    fn clone_is_deep() {
        let original = precedence_tree().with_position(TextPosition::new(1, 8));
        let mut copy = original.clone();
        assert_eq!(original.to_adql(), copy.to_adql());

        if let Operand::Operation(op) = &mut copy {
            *op.right = n("7");
        }
        copy.set_position(None);
        assert_eq!("~3-1|2*5^6/1+2", original.to_adql());
        assert_eq!(Some(TextPosition::new(1, 8)), original.position());
        assert_eq!("~3-1|7", copy.to_adql());
    }

    #[test]
    fn children_are_direct() {
        let tree = precedence_tree();
        let kids: Vec<String> = tree.children().map(|c| c.to_adql()).collect();
        assert_eq!(vec!["~3-1", "2*5^6/1+2"], kids);
        // A new iterator each call
        assert_eq!(2, tree.children().count());
        assert_eq!(0, n("1").children().count());
    }

    #[test]
    fn default_names() {
        assert_eq!("0xF", n("0xF").name());
        assert_eq!("NEG_0xF", Operand::negate(n("0xF")).name());
        assert_eq!("BIT_NOT_a", Operand::bit_not(Operand::column("a")).name());
        assert_eq!("MULT", Operand::op(n("0xF"), Mult, n("2")).name());
        assert_eq!("BIT_XOR", Operand::op(n("1"), BitXor, n("2")).name());
        assert_eq!("CAST", Operand::cast(n("1"), DbType::new(DbTypeKind::Real)).name());
    }

    #[test]
    fn hexadecimal() -> Result<(), Error> {
        let hex = NumericConstant::new("0xF");
        assert!(hex.is_hexadecimal());
        assert_eq!(features::HEXADECIMAL, hex.feature());
        assert_eq!("15", hex.to_decimal()?);
        assert_eq!("1.5", NumericConstant::new("1.5").to_decimal()?);
        assert!(matches!(
            NumericConstant::new("0x1FFFFFFFFFFFFFFFF").to_decimal(),
            Err(Error::Translation(_))
        ));
        Ok(())
    }

    #[test]
    fn value_kinds() {
        let unresolved = Operand::column("ra");
        assert!(unresolved.is_numeric() && unresolved.is_string() && unresolved.is_geometry());

        let typed = Operand::Column(Column::new("name").with_type(DbType::new(DbTypeKind::VarChar)));
        assert!(typed.is_string() && !typed.is_numeric());

        assert!(Operand::string("x").is_string());
        assert!(!Operand::op(n("1"), Sum, n("2")).is_string());
        let concat = Operand::concat(vec![Operand::string("a"), Operand::string("b")]);
        assert!(concat.is_ok_and(|c| c.is_string() && !c.is_numeric()));
    }

    #[test]
    fn concatenation_needs_two_operands() {
        assert!(Operand::concat(vec![Operand::string("a")]).is_err());
    }

    #[test]
    fn strings_double_quotes() {
        assert_eq!("'SQL''s translation'", Operand::string("SQL's translation").to_adql());
    }

    #[test]
    fn udf_definition_must_match() -> Result<(), Error> {
        let mut udf = UserDefinedFunction::new("split", vec![Operand::column("values"), Operand::string(";")]);
        assert!(udf.is_numeric() && udf.is_string());

        let def = FunctionDef::parse("split(str VARCHAR, sep VARCHAR) -> VARCHAR")?;
        udf.set_definition(Some(def))?;
        assert!(udf.is_string() && !udf.is_numeric());

        let wrong = FunctionDef::parse("split(str VARCHAR) -> VARCHAR")?;
        assert!(matches!(udf.set_definition(Some(wrong)), Err(Error::InvalidArgument(_))));
        assert!(udf.definition().is_some());
        assert_eq!("split(values, ';')", udf.to_adql());
        Ok(())
    }

    #[test]
    fn query_adql() {
        let query = Query::select_from(vec![SelectItem::All], "foo")
            .with_top(5)
            .with_where(Condition::And(vec![
                Condition::compare(Operand::column("a"), ComparisonOperator::Ne, n("1")),
                Condition::Or(vec![
                    Condition::is_null(Operand::column("b"), true),
                    Condition::between(Operand::column("c"), n("1"), n("2"), false),
                ]),
            ]))
            .order_by(Operand::column("id"), false)
            .with_offset(10);
        assert_eq!(
            "SELECT TOP 5 *\nFROM foo\nWHERE a <> 1 AND (b IS NOT NULL OR c BETWEEN 1 AND 2)\nORDER BY id ASC\nOFFSET 10",
            query.to_adql()
        );
        // select operands, from, where, order, offset
        assert_eq!(4, query.children().count());
    }

    #[test]
    fn join_adql() {
        let join = FromItem::join(
            JoinKind::Left,
            FromItem::aliased(TableName::qualified("gaia", "source"), Identifier::new("g")),
            FromItem::table(TableName::qualified("tycho", "main")),
            Some(JoinCondition::Using(vec![Column::new("id")])),
        );
        assert_eq!(
            "gaia.source AS g LEFT OUTER JOIN tycho.main USING(id)",
            join.to_adql()
        );
        assert_eq!(features::JOIN, join.feature());
        assert_eq!(3, join.children().count());
    }

    #[test]
    fn delimited_identifiers() {
        let column = Column::new("x").with_table(TableName::new("t"));
        assert_eq!("t.x", column.to_adql());
        assert_eq!("\"My\"\"Col\"", Identifier::delimited("My\"Col").to_string());
    }
}
