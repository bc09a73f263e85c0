//! Boolean predicate trees (`Q`) and field lookups.
//!
//! A lookup key is `field` or `field__op`, with `__` also used for relation paths:
//!
//! | key | SQL |
//! |---|---|
//! | `age` / `age__exact` | `t.age = $n` |
//! | `age__gt`, `__lt`, `__gte`, `__lte` | `>`, `<`, `>=`, `<=` |
//! | `name__contains` / `__icontains` | `LIKE` / `ILIKE '%v%'` |
//! | `name__startswith` / `__endswith` | `LIKE 'v%'` / `LIKE '%v'` |
//! | `id__in` / `id__not_in` | `IN ($a, $b)` / `NOT IN (...)` |
//! | `deleted_at__isnull` | `IS NULL` / `IS NOT NULL` |
//! | `age__between` | `BETWEEN $a AND $b` |
//! | `name__regex` / `__iregex` | `~` / `~*` |
//!
//! Combining predicates:
//!
//! ```ignore
//! use pgqs::{q, Q};
//!
//! let adults_or_kids = q!(age__gt = 18) | q!(age__lt = 5);
//! let active = q!(status = "active") & !q!(banned = true);
//! ```

use crate::column::F;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expression;
use crate::ident::qualify_column;
use crate::sql::Sql;
use crate::value::Value;
use std::ops::{BitAnd, BitOr, Not};

/// Comparison applied by a lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupOp {
    Exact,
    Gt,
    Lt,
    Gte,
    Lte,
    Contains,
    IContains,
    StartsWith,
    EndsWith,
    In,
    NotIn,
    IsNull,
    Between,
    Regex,
    IRegex,
}

impl LookupOp {
    /// Parse the `__op` suffix of a lookup key.
    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Some(match suffix {
            "exact" => LookupOp::Exact,
            "gt" => LookupOp::Gt,
            "lt" => LookupOp::Lt,
            "gte" => LookupOp::Gte,
            "lte" => LookupOp::Lte,
            "contains" => LookupOp::Contains,
            "icontains" => LookupOp::IContains,
            "startswith" => LookupOp::StartsWith,
            "endswith" => LookupOp::EndsWith,
            "in" => LookupOp::In,
            "not_in" => LookupOp::NotIn,
            "isnull" => LookupOp::IsNull,
            "between" => LookupOp::Between,
            "regex" => LookupOp::Regex,
            "iregex" => LookupOp::IRegex,
            _ => return None,
        })
    }

    /// SQL operator keyword or symbol.
    pub fn symbol(&self) -> &'static str {
        match self {
            LookupOp::Exact => "=",
            LookupOp::Gt => ">",
            LookupOp::Lt => "<",
            LookupOp::Gte => ">=",
            LookupOp::Lte => "<=",
            LookupOp::Contains | LookupOp::StartsWith | LookupOp::EndsWith => "LIKE",
            LookupOp::IContains => "ILIKE",
            LookupOp::In => "IN",
            LookupOp::NotIn => "NOT IN",
            LookupOp::IsNull => "IS NULL",
            LookupOp::Between => "BETWEEN",
            LookupOp::Regex => "~",
            LookupOp::IRegex => "~*",
        }
    }

    fn is_pattern(&self) -> bool {
        matches!(
            self,
            LookupOp::Contains | LookupOp::IContains | LookupOp::StartsWith | LookupOp::EndsWith
        )
    }

    /// Wildcards placed before and after the operand.
    fn wildcards(&self) -> (bool, bool) {
        match self {
            LookupOp::Contains | LookupOp::IContains => (true, true),
            LookupOp::StartsWith => (false, true),
            LookupOp::EndsWith => (true, false),
            _ => (false, false),
        }
    }
}

/// Right-hand side of a lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupValue {
    Value(Value),
    List(Vec<Value>),
    Column(F),
    Expr(Expression),
}

macro_rules! impl_lookup_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl From<$ty> for LookupValue {
                fn from(v: $ty) -> Self {
                    LookupValue::Value(v.into())
                }
            }
        )*
    };
}

impl_lookup_scalar!(
    Value,
    bool,
    i16,
    i32,
    i64,
    u32,
    f32,
    f64,
    String,
    &String,
    &str,
    uuid::Uuid,
    chrono::DateTime<chrono::Utc>,
    chrono::NaiveDate,
    serde_json::Value,
);

impl<T: Into<Value>> From<Option<T>> for LookupValue {
    fn from(v: Option<T>) -> Self {
        LookupValue::Value(v.into())
    }
}

impl<T: Into<Value>> From<Vec<T>> for LookupValue {
    fn from(values: Vec<T>) -> Self {
        LookupValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>, const N: usize> From<[T; N]> for LookupValue {
    fn from(values: [T; N]) -> Self {
        LookupValue::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value> + Clone> From<&[T]> for LookupValue {
    fn from(values: &[T]) -> Self {
        LookupValue::List(values.iter().cloned().map(Into::into).collect())
    }
}

impl From<F> for LookupValue {
    fn from(f: F) -> Self {
        LookupValue::Column(f)
    }
}

impl From<Expression> for LookupValue {
    fn from(e: Expression) -> Self {
        LookupValue::Expr(e)
    }
}

/// A single `field <op> value` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    pub field: String,
    pub op: LookupOp,
    pub value: LookupValue,
}

impl Lookup {
    /// Split `key` on its last `__`; an unknown suffix means an exact match on the whole path.
    pub fn parse(key: &str, value: impl Into<LookupValue>) -> Self {
        let (field, op) = match key.rsplit_once("__") {
            Some((field, suffix)) if !field.is_empty() => match LookupOp::from_suffix(suffix) {
                Some(op) => (field, op),
                None => (key, LookupOp::Exact),
            },
            _ => (key, LookupOp::Exact),
        };
        Self {
            field: field.to_string(),
            op,
            value: value.into(),
        }
    }

    pub(crate) fn fragment(&self, table: Option<&str>) -> OrmResult<Sql> {
        let column = qualify_column(table, &self.field);
        let mut out = Sql::new(&column);

        match (self.op, &self.value) {
            (LookupOp::In | LookupOp::NotIn, LookupValue::List(values)) => {
                if values.is_empty() {
                    // Nothing is IN an empty set; everything is NOT IN it.
                    let always = if self.op == LookupOp::In { "1=0" } else { "1=1" };
                    return Ok(Sql::new(always));
                }
                out.push(" ").push(self.op.symbol()).push(" (");
                out.push_bind_list(values.iter().cloned());
                out.push(")");
            }
            (LookupOp::In | LookupOp::NotIn, LookupValue::Expr(subquery)) => {
                out.push(" ").push(self.op.symbol()).push(" ");
                out.append(subquery.as_sql().parenthesized());
            }
            (LookupOp::Between, LookupValue::List(values)) => {
                let [low, high] = values.as_slice() else {
                    return Err(OrmError::compilation(format!(
                        "between lookup on '{column}' needs exactly 2 values, got {}",
                        values.len()
                    )));
                };
                out.push(" BETWEEN ")
                    .push_bind(low.clone())
                    .push(" AND ")
                    .push_bind(high.clone());
            }
            (LookupOp::In | LookupOp::NotIn | LookupOp::Between, _) => {
                return Err(OrmError::compilation(format!(
                    "'{}' lookup on '{column}' needs a list of values",
                    self.op.symbol()
                )));
            }
            (LookupOp::IsNull, LookupValue::Value(flag)) => {
                out.push(if flag.is_truthy() {
                    " IS NULL"
                } else {
                    " IS NOT NULL"
                });
            }
            (LookupOp::IsNull, _) => {
                return Err(OrmError::compilation(format!(
                    "isnull lookup on '{column}' needs a boolean"
                )));
            }
            (LookupOp::Exact, LookupValue::Value(Value::Null)) => {
                out.push(" IS NULL");
            }
            (_, LookupValue::List(_)) => {
                return Err(OrmError::compilation(format!(
                    "'{}' lookup on '{column}' does not take a list",
                    self.op.symbol()
                )));
            }
            (op, LookupValue::Value(value)) if op.is_pattern() => {
                let (before, after) = op.wildcards();
                let pattern = format!(
                    "{}{value}{}",
                    if before { "%" } else { "" },
                    if after { "%" } else { "" }
                );
                out.push(" ").push(op.symbol()).push(" ").push_bind(pattern);
            }
            (op, rhs) if op.is_pattern() => {
                let (before, after) = op.wildcards();
                out.push(" ").push(op.symbol()).push(" ");
                if before {
                    out.push("'%' || ");
                }
                out.append(operand_fragment(rhs));
                if after {
                    out.push(" || '%'");
                }
            }
            (op, rhs) => {
                out.push(" ").push(op.symbol()).push(" ");
                out.append(operand_fragment(rhs));
            }
        }

        Ok(out)
    }
}

fn operand_fragment(value: &LookupValue) -> Sql {
    match value {
        LookupValue::Value(v) => Sql::bind(v.clone()),
        LookupValue::Column(f) => Sql::new(f.field()),
        LookupValue::Expr(e) => e.as_sql().parenthesized(),
        LookupValue::List(values) => {
            let mut out = Sql::new("(");
            out.push_bind_list(values.iter().cloned());
            out.push(")");
            out
        }
    }
}

/// A predicate tree.
///
/// `&` and `|` splice the children of same-kind, non-negated groups so chains stay
/// flat; `!` wraps without ever merging through the negation.
#[derive(Debug, Clone, PartialEq)]
pub enum Q {
    Leaf(Lookup),
    And(Vec<Q>),
    Or(Vec<Q>),
    Not(Box<Q>),
}

impl Default for Q {
    fn default() -> Self {
        Q::And(Vec::new())
    }
}

impl Q {
    /// An empty predicate. Contributes nothing when passed to `filter` on its own.
    pub fn new() -> Self {
        Self::default()
    }

    /// A single lookup such as `Q::lookup("age__gt", 18)`.
    pub fn lookup(key: &str, value: impl Into<LookupValue>) -> Self {
        Q::Leaf(Lookup::parse(key, value))
    }

    /// Several lookups joined by `AND`, or a bare leaf when there is only one.
    pub fn from_lookups<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<LookupValue>,
    {
        let mut leaves: Vec<Q> = pairs
            .into_iter()
            .map(|(k, v)| Q::lookup(k.as_ref(), v))
            .collect();
        if leaves.len() == 1 {
            leaves.remove(0)
        } else {
            Q::And(leaves)
        }
    }

    pub fn all(children: impl IntoIterator<Item = Q>) -> Self {
        Q::And(children.into_iter().collect())
    }

    pub fn any(children: impl IntoIterator<Item = Q>) -> Self {
        Q::Or(children.into_iter().collect())
    }

    /// True for a group with no children (or the negation of one).
    pub fn is_empty(&self) -> bool {
        match self {
            Q::Leaf(_) => false,
            Q::And(children) | Q::Or(children) => children.is_empty(),
            Q::Not(inner) => inner.is_empty(),
        }
    }

    pub fn is_negated(&self) -> bool {
        matches!(self, Q::Not(_))
    }

    /// Render the predicate; `table` qualifies bare column names.
    pub(crate) fn fragment(&self, table: Option<&str>) -> OrmResult<Sql> {
        match self {
            Q::Leaf(lookup) => lookup.fragment(table),
            Q::And(children) => Self::group_fragment(children, " AND ", table),
            Q::Or(children) => Self::group_fragment(children, " OR ", table),
            Q::Not(inner) => {
                let mut out = Sql::new("NOT ");
                out.append(inner.fragment(table)?.parenthesized());
                Ok(out)
            }
        }
    }

    fn group_fragment(children: &[Q], connector: &str, table: Option<&str>) -> OrmResult<Sql> {
        match children {
            [] => Err(OrmError::compilation(
                "empty predicate cannot be combined with other conditions",
            )),
            [only] => only.fragment(table),
            _ => {
                let mut out = Sql::empty();
                for (i, child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push(connector);
                    }
                    out.append(child.fragment(table)?.parenthesized());
                }
                Ok(out)
            }
        }
    }

    /// Render stand-alone, without table qualification.
    pub fn to_sql(&self) -> OrmResult<String> {
        Ok(self.fragment(None)?.to_sql())
    }
}

fn merge(lhs: Q, rhs: Q, and: bool) -> Q {
    let mut children = Vec::new();
    for side in [lhs, rhs] {
        match side {
            Q::And(inner) if and && !inner.is_empty() => children.extend(inner),
            Q::Or(inner) if !and && !inner.is_empty() => children.extend(inner),
            other => children.push(other),
        }
    }
    if and { Q::And(children) } else { Q::Or(children) }
}

impl BitAnd for Q {
    type Output = Q;

    fn bitand(self, rhs: Q) -> Q {
        merge(self, rhs, true)
    }
}

impl BitOr for Q {
    type Output = Q;

    fn bitor(self, rhs: Q) -> Q {
        merge(self, rhs, false)
    }
}

impl Not for Q {
    type Output = Q;

    fn not(self) -> Q {
        match self {
            Q::Not(inner) => *inner,
            other => Q::Not(Box::new(other)),
        }
    }
}

impl From<Lookup> for Q {
    fn from(lookup: Lookup) -> Self {
        Q::Leaf(lookup)
    }
}

/// Build a [`Q`] from keyword-style lookups.
///
/// ```ignore
/// let cond = q!(status = "active", age__gte = 18);
/// ```
#[macro_export]
macro_rules! q {
    () => {
        $crate::Q::new()
    };
    ($($key:ident = $value:expr),+ $(,)?) => {
        $crate::Q::from_lookups([
            $((stringify!($key), $crate::LookupValue::from($value))),+
        ])
    };
}
