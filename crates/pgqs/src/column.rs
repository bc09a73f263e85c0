//! Column references (`F`) and arithmetic over columns, expressions and literals.

use crate::expr::Expression;
use crate::ident::normalize_path;
use crate::sql::Sql;
use crate::value::Value;
use std::ops::{Add, Div, Mul, Sub};

/// A reference to a column, written with the `__` path convention.
///
/// ```ignore
/// let total = F::new("price") * F::new("quantity");
/// let bumped = F::new("stock") + 5;   // one deferred placeholder
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct F {
    field: String,
}

impl F {
    pub fn new(field: &str) -> Self {
        Self {
            field: normalize_path(field),
        }
    }

    /// Normalized column path (`author__name` becomes `author.name`).
    pub fn field(&self) -> &str {
        &self.field
    }

    fn call(&self, func: &str) -> Expression {
        Expression::raw(format!("{func}({})", self.field))
    }

    pub fn sum(&self) -> Expression {
        self.call("SUM")
    }

    pub fn avg(&self) -> Expression {
        self.call("AVG")
    }

    pub fn count(&self) -> Expression {
        self.call("COUNT")
    }

    pub fn max(&self) -> Expression {
        self.call("MAX")
    }

    pub fn min(&self) -> Expression {
        self.call("MIN")
    }

    pub fn lag(&self, offset: u32) -> Expression {
        Expression::raw(format!("LAG({}, {offset})", self.field))
    }

    /// `LAG(field, offset, $n)` with `default` bound.
    pub fn lag_or(&self, offset: u32, default: impl Into<Value>) -> Expression {
        self.shifted("LAG", offset, default.into())
    }

    pub fn lead(&self, offset: u32) -> Expression {
        Expression::raw(format!("LEAD({}, {offset})", self.field))
    }

    /// `LEAD(field, offset, $n)` with `default` bound.
    pub fn lead_or(&self, offset: u32, default: impl Into<Value>) -> Expression {
        self.shifted("LEAD", offset, default.into())
    }

    fn shifted(&self, func: &str, offset: u32, default: Value) -> Expression {
        let mut sql = Sql::new(format!("{func}({}, {offset}, ", self.field));
        sql.push_bind(default).push(")");
        Expression::from_sql(sql)
    }

    // Ranking functions ignore the column.
    pub fn row_number(&self) -> Expression {
        Expression::raw("ROW_NUMBER()")
    }

    pub fn rank(&self) -> Expression {
        Expression::raw("RANK()")
    }

    pub fn dense_rank(&self) -> Expression {
        Expression::raw("DENSE_RANK()")
    }
}

/// One side of an arithmetic expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Column(F),
    Expr(Expression),
    Value(Value),
}

impl Operand {
    fn fragment(self) -> Sql {
        match self {
            Operand::Column(f) => Sql::new(f.field),
            Operand::Expr(e) => e.as_sql().parenthesized(),
            Operand::Value(v) => Sql::bind(v),
        }
    }
}

impl From<F> for Operand {
    fn from(f: F) -> Self {
        Operand::Column(f)
    }
}

impl From<Expression> for Operand {
    fn from(e: Expression) -> Self {
        Operand::Expr(e)
    }
}

macro_rules! impl_operand_literal {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for Operand {
                fn from(v: $ty) -> Self {
                    Operand::Value(v.into())
                }
            }
        )*
    };
}

impl_operand_literal!(Value, bool, i16, i32, i64, u32, f32, f64, String, &str);

fn binary(lhs: Operand, op: &str, rhs: Operand) -> Expression {
    let mut sql = lhs.fragment();
    sql.push(op);
    sql.append(rhs.fragment());
    Expression::from_sql(sql)
}

macro_rules! impl_arith {
    ($($trait:ident :: $method:ident => $op:literal),* $(,)?) => {
        $(
            impl<R: Into<Operand>> $trait<R> for F {
                type Output = Expression;

                fn $method(self, rhs: R) -> Expression {
                    binary(Operand::Column(self), $op, rhs.into())
                }
            }

            impl<R: Into<Operand>> $trait<R> for Expression {
                type Output = Expression;

                fn $method(self, rhs: R) -> Expression {
                    binary(Operand::Expr(self), $op, rhs.into())
                }
            }
        )*
    };
}

impl_arith!(
    Add::add => " + ",
    Sub::sub => " - ",
    Mul::mul => " * ",
    Div::div => " / ",
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_path() {
        assert_eq!(F::new("author__name").field(), "author.name");
    }

    #[test]
    fn column_arithmetic_has_no_params() {
        let e = F::new("price") * F::new("quantity");
        assert_eq!(e.to_sql(), "price * quantity");
        assert!(e.params().is_empty());
    }

    #[test]
    fn literal_arithmetic_defers_placeholder() {
        let e = F::new("stock") + 5;
        assert_eq!(e.to_sql(), "stock + $1");
        assert_eq!(e.params(), &[Value::Int(5)]);
        assert!(!e.to_sql().contains('?'));
    }

    #[test]
    fn nested_expression_is_parenthesized() {
        let e = (F::new("a") + 1) * F::new("b") - 2.5;
        assert_eq!(e.to_sql(), "((a + $1) * b) - $2");
        assert_eq!(e.params(), &[Value::Int(1), Value::Float(2.5)]);
    }

    #[test]
    fn aggregates() {
        assert_eq!(F::new("amount").sum().to_sql(), "SUM(amount)");
        assert_eq!(F::new("amount").avg().to_sql(), "AVG(amount)");
        assert_eq!(F::new("id").count().to_sql(), "COUNT(id)");
        assert_eq!(F::new("x").max().to_sql(), "MAX(x)");
        assert_eq!(F::new("x").min().to_sql(), "MIN(x)");
    }

    #[test]
    fn lag_lead() {
        assert_eq!(F::new("price").lag(1).to_sql(), "LAG(price, 1)");
        assert_eq!(F::new("price").lead(2).to_sql(), "LEAD(price, 2)");

        let e = F::new("price").lag_or(1, 0);
        assert_eq!(e.to_sql(), "LAG(price, 1, $1)");
        assert_eq!(e.params(), &[Value::Int(0)]);
    }

    #[test]
    fn ranking_functions() {
        let f = F::new("ignored");
        assert_eq!(f.row_number().to_sql(), "ROW_NUMBER()");
        assert_eq!(f.rank().to_sql(), "RANK()");
        assert_eq!(f.dense_rank().to_sql(), "DENSE_RANK()");
    }
}
