use crate::translate::{
    BinaryOp, Expression, FromExpr, Ident, Limit, OrderExpr, SelectExpr, SelectStatement, UnaryOp,
};
use std::fmt::{Display, Formatter, Result};

/// Per-dialect printing decisions which do not change the shape of the tree.
pub trait PrinterContext: std::fmt::Debug {
    fn write_identifier(&self, out: &mut Formatter<'_>, ident: &Ident) -> Result {
        if ident.quoted {
            write!(out, "\"{}\"", ident.name.replace('"', "\"\""))
        } else {
            out.write_str(&ident.name)
        }
    }

    fn write_binary_op(&self, out: &mut Formatter<'_>, op: &BinaryOp) -> Result {
        out.write_str(standard_symbol(op))?;
        if let BinaryOp::Other(symbol) = op {
            write!(out, "{symbol} ")?;
        }
        Ok(())
    }

    /// What follows `LIMIT` when no row limit applies.
    fn unbounded_limit(&self) -> &'static str {
        "ALL"
    }

    fn box_clone(&self) -> Box<dyn PrinterContext>;
}

impl Clone for Box<dyn PrinterContext> {
    fn clone(&self) -> Box<dyn PrinterContext> {
        self.box_clone()
    }
}

/// Negative literals after an unspaced operator are parenthesized, `1--1`
///  would start a comment.
fn write_right_operand(
    out: &mut Formatter,
    conf: &PrinterConfig,
    op: &BinaryOp,
    expr: &Expression,
) -> Result {
    match expr {
        Expression::NumberLiteral(v) if v.starts_with('-') && op.is_arithmetic() => {
            write!(out, "(")?;
            expr.to_sql(out, conf)?;
            write!(out, ")")
        }
        _ => expr.to_sql(out, conf),
    }
}

fn standard_symbol(op: &BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::BitAnd => "&",
        BinaryOp::BitOr => "|",
        BinaryOp::BitXor => "^",

        BinaryOp::Eq => " = ",
        BinaryOp::Ne => " != ",
        BinaryOp::Lt => " < ",
        BinaryOp::Le => " <= ",
        BinaryOp::Gt => " > ",
        BinaryOp::Ge => " >= ",
        BinaryOp::Like => " LIKE ",
        BinaryOp::NotLike => " NOT LIKE ",
        BinaryOp::ILike => " ILIKE ",
        BinaryOp::NotILike => " NOT ILIKE ",
        BinaryOp::And => " AND ",
        BinaryOp::Or => " OR ",
        BinaryOp::Concat => " || ",
        // followed by the symbol itself
        BinaryOp::Other(_) => " ",
    }
}

#[derive(Debug, Clone, Copy)]
pub struct StandardPrinterContext;

impl PrinterContext for StandardPrinterContext {
    fn box_clone(&self) -> Box<dyn PrinterContext> {
        Box::new(*self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PostgresPrinterContext;

impl PrinterContext for PostgresPrinterContext {
    fn write_binary_op(&self, out: &mut Formatter<'_>, op: &BinaryOp) -> Result {
        match op {
            BinaryOp::BitXor => out.write_str("#"),
            _ => StandardPrinterContext.write_binary_op(out, op),
        }
    }
    fn box_clone(&self) -> Box<dyn PrinterContext> {
        Box::new(*self)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SqlitePrinterContext;

impl PrinterContext for SqlitePrinterContext {
    fn unbounded_limit(&self) -> &'static str {
        "-1"
    }
    fn box_clone(&self) -> Box<dyn PrinterContext> {
        Box::new(*self)
    }
}

#[derive(Debug, Clone)]
pub struct PrinterConfig {
    pub context: Box<dyn PrinterContext>,
}

impl Default for PrinterConfig {
    fn default() -> Self {
        Self {
            context: Box::new(StandardPrinterContext),
        }
    }
}

impl PrinterConfig {
    pub fn new(context: impl PrinterContext + 'static) -> Self {
        Self {
            context: Box::new(context),
        }
    }
}

pub struct Printer<T> {
    tree: T,
    config: PrinterConfig,
}

impl<T> Printer<T> {
    pub fn new(tree: T, config: PrinterConfig) -> Self {
        Self { tree, config }
    }
}

pub trait ToSQL {
    fn to_sql(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result;
}

impl<T> ToSQL for Box<T>
where
    T: ToSQL,
{
    fn to_sql(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result {
        self.as_ref().to_sql(out, conf)
    }
}

impl<T> ToSQL for &T
where
    T: ToSQL,
{
    fn to_sql(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result {
        (*self).to_sql(out, conf)
    }
}

impl<T> Display for Printer<T>
where
    T: ToSQL,
{
    fn fmt(&self, f: &mut Formatter) -> Result {
        self.tree.to_sql(f, &self.config)
    }
}

fn write_separated<T: ToSQL>(
    out: &mut Formatter,
    conf: &PrinterConfig,
    items: &[T],
    separator: &str,
) -> Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            out.write_str(separator)?;
        }
        item.to_sql(out, conf)?;
    }
    Ok(())
}

impl ToSQL for BinaryOp {
    fn to_sql(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result {
        conf.context.write_binary_op(out, self)
    }
}

impl ToSQL for Ident {
    fn to_sql(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result {
        conf.context.write_identifier(out, self)
    }
}

impl ToSQL for Expression {
    fn to_sql(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result {
        match self {
            Expression::NumberLiteral(v) => write!(out, "{v}"),
            Expression::StringLiteral(v) => write!(out, "'{}'", v.replace('\'', "''")),
            Expression::Field(parts) => write_separated(out, conf, parts, "."),
            Expression::UnaryOperator(UnaryOp::Not, exp) => {
                write!(out, "NOT ")?;
                exp.to_sql(out, conf)
            }
            Expression::UnaryOperator(op, exp) => {
                write!(out, "(")?;
                match (op, exp.as_ref()) {
                    // "--" would start a comment
                    (UnaryOp::Neg, Expression::NumberLiteral(v)) if v.starts_with('-') => {
                        write!(out, "- ")
                    }
                    (UnaryOp::BitNot, _) => write!(out, "~"),
                    _ => write!(out, "-"),
                }?;
                exp.to_sql(out, conf)?;
                write!(out, ")")
            }
            Expression::BinaryOperator(l, op, r, p) => {
                p.open(out)?;
                l.to_sql(out, conf)?;
                op.to_sql(out, conf)?;
                write_right_operand(out, conf, op, r)?;
                p.close(out)
            }
            Expression::BinaryOperatorSequence(op, exprs, p) => {
                p.open(out)?;
                for (i, expr) in exprs.iter().enumerate() {
                    if i > 0 {
                        op.to_sql(out, conf)?;
                        write_right_operand(out, conf, op, expr)?;
                    } else {
                        expr.to_sql(out, conf)?;
                    }
                }
                p.close(out)
            }
            Expression::FunctionCall { name, args } => {
                write!(out, "{name}(")?;
                write_separated(out, conf, args, ", ")?;
                write!(out, ")")
            }
            Expression::Cast(expr, to) => {
                write!(out, "CAST(")?;
                expr.to_sql(out, conf)?;
                write!(out, " AS {to})")
            }
            Expression::IsNull(expr, negated) => {
                expr.to_sql(out, conf)?;
                write!(out, " IS {}NULL", if *negated { "NOT " } else { "" })
            }
            Expression::Between {
                operand,
                low,
                high,
                negated,
            } => {
                operand.to_sql(out, conf)?;
                write!(out, " {}BETWEEN ", if *negated { "NOT " } else { "" })?;
                low.to_sql(out, conf)?;
                write!(out, " AND ")?;
                high.to_sql(out, conf)
            }
            Expression::Verbatim(text) => out.write_str(text),
        }
    }
}

impl ToSQL for SelectExpr {
    fn to_sql(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result {
        match self {
            SelectExpr::All => write!(out, "*"),
            SelectExpr::AllOf(table) => {
                write_separated(out, conf, table, ".")?;
                write!(out, ".*")
            }
            SelectExpr::Expr { expr, alias } => {
                expr.to_sql(out, conf)?;
                write!(out, " AS ")?;
                alias.to_sql(out, conf)
            }
        }
    }
}

impl ToSQL for FromExpr {
    fn to_sql(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result {
        match self {
            FromExpr::Table { name, alias } => {
                write_separated(out, conf, name, ".")?;
                if let Some(alias) = alias {
                    write!(out, " AS ")?;
                    alias.to_sql(out, conf)?;
                }
                Ok(())
            }
            FromExpr::Join {
                keyword,
                natural,
                left,
                right,
                on,
                using,
            } => {
                left.to_sql(out, conf)?;
                write!(out, " {}{keyword} ", if *natural { "NATURAL " } else { "" })?;
                right.to_sql(out, conf)?;
                if let Some(on) = on {
                    write!(out, " ON ")?;
                    on.to_sql(out, conf)?;
                } else if !using.is_empty() {
                    write!(out, " USING (")?;
                    write_separated(out, conf, using, ", ")?;
                    write!(out, ")")?;
                }
                Ok(())
            }
        }
    }
}

impl ToSQL for OrderExpr {
    fn to_sql(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result {
        self.expr.to_sql(out, conf)?;
        write!(out, " {}", if self.descending { "DESC" } else { "ASC" })
    }
}

impl ToSQL for SelectStatement {
    fn to_sql(&self, out: &mut Formatter, conf: &PrinterConfig) -> Result {
        write!(out, "SELECT {}", if self.distinct { "DISTINCT " } else { "" })?;
        write_separated(out, conf, &self.items, ", ")?;

        if !self.from.is_empty() {
            write!(out, "\nFROM ")?;
            write_separated(out, conf, &self.from, ", ")?;
        }
        if let Some(cond) = &self.where_clause {
            write!(out, "\nWHERE ")?;
            cond.to_sql(out, conf)?;
        }
        if !self.group_by.is_empty() {
            write!(out, "\nGROUP BY ")?;
            write_separated(out, conf, &self.group_by, ", ")?;
        }
        if let Some(cond) = &self.having {
            write!(out, "\nHAVING ")?;
            cond.to_sql(out, conf)?;
        }
        if !self.order_by.is_empty() {
            write!(out, "\nORDER BY ")?;
            write_separated(out, conf, &self.order_by, ", ")?;
        }
        match self.limit {
            Some(Limit::Rows(n)) => write!(out, "\nLIMIT {n}")?,
            Some(Limit::Unbounded) => write!(out, "\nLIMIT {}", conf.context.unbounded_limit())?,
            None => {}
        }
        if let Some(offset) = self.offset {
            write!(out, "\nOFFSET {offset}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::Parenthesize;
    use pretty_assertions::assert_eq;

    fn field(name: &str) -> Expression {
        Expression::Field(vec![Ident {
            name: name.to_string(),
            quoted: false,
        }])
    }

    #[test]
    fn arithmetic_is_tight_and_comparisons_are_spaced() {
        let sum = Expression::binary(field("a"), BinaryOp::Add, Expression::from(1));
        let cmp = Expression::BinaryOperator(
            Box::new(sum),
            BinaryOp::Ge,
            Box::new(Expression::from(2)),
            Parenthesize::No,
        );
        assert_eq!(
            "(a+1) >= 2",
            Printer::new(&cmp, PrinterConfig::default()).to_string()
        );
    }

    #[test]
    fn strings_and_identifiers_are_escaped() {
        let lit = Expression::from("it's");
        assert_eq!("'it''s'", Printer::new(&lit, PrinterConfig::default()).to_string());

        let quoted = Expression::Field(vec![Ident::quoted("we\"ird")]);
        assert_eq!(
            "\"we\"\"ird\"",
            Printer::new(&quoted, PrinterConfig::default()).to_string()
        );
    }

    #[test]
    fn xor_depends_on_the_dialect() {
        let xor = Expression::binary(field("a"), BinaryOp::BitXor, field("b"));
        assert_eq!("(a^b)", Printer::new(&xor, PrinterConfig::default()).to_string());
        assert_eq!(
            "(a#b)",
            Printer::new(&xor, PrinterConfig::new(PostgresPrinterContext)).to_string()
        );
    }

    #[test]
    fn other_operators_and_double_negation() {
        let contains = Expression::binary(field("p"), BinaryOp::Other("@"), field("c"));
        assert_eq!("(p @ c)", Printer::new(&contains, PrinterConfig::default()).to_string());

        let neg = Expression::UnaryOperator(
            UnaryOp::Neg,
            Box::new(Expression::NumberLiteral("-3".to_string())),
        );
        assert_eq!("(- -3)", Printer::new(&neg, PrinterConfig::default()).to_string());
    }

    #[test]
    fn unbounded_limit() {
        let statement = SelectStatement {
            items: vec![SelectExpr::All],
            from: vec![FromExpr::Table {
                name: vec![Ident {
                    name: "foo".to_string(),
                    quoted: false,
                }],
                alias: None,
            }],
            limit: Some(Limit::Unbounded),
            offset: Some(10),
            ..Default::default()
        };
        assert_eq!(
            "SELECT *\nFROM foo\nLIMIT -1\nOFFSET 10",
            Printer::new(&statement, PrinterConfig::new(SqlitePrinterContext)).to_string()
        );
        assert_eq!(
            "SELECT *\nFROM foo\nLIMIT ALL\nOFFSET 10",
            Printer::new(&statement, PrinterConfig::new(PostgresPrinterContext)).to_string()
        );
    }
}
