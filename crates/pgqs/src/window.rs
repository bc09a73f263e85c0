//! Window specifications: `OVER (...)` clauses, frames and named `WINDOW` entries.

use crate::column::F;
use crate::error::{OrmError, OrmResult};
use crate::expr::Expression;
use crate::ident::qualify_column;
use crate::sql::Sql;

/// A partition, ordering or grouping term.
///
/// Strings follow the `__` path convention; in ordering position a leading `-`
/// means `DESC` and `+` means `ASC`.
#[derive(Debug, Clone, PartialEq)]
pub enum Term {
    Name(String),
    Column(F),
    Expr(Expression),
}

impl From<&str> for Term {
    fn from(s: &str) -> Self {
        Term::Name(s.to_string())
    }
}

impl From<String> for Term {
    fn from(s: String) -> Self {
        Term::Name(s)
    }
}

impl From<F> for Term {
    fn from(f: F) -> Self {
        Term::Column(f)
    }
}

impl From<Expression> for Term {
    fn from(e: Expression) -> Self {
        Term::Expr(e)
    }
}

impl Term {
    /// Render as a plain term (partition/group position).
    pub(crate) fn plain_fragment(&self, table: Option<&str>) -> Sql {
        match self {
            Term::Name(name) => Sql::new(qualify_column(table, name)),
            Term::Column(f) => Sql::new(f.field()),
            Term::Expr(e) => e.as_sql().clone(),
        }
    }

    /// Render in ordering position.
    ///
    /// Bare names get an explicit `ASC` when `default_asc` is set.
    pub(crate) fn order_fragment(&self, table: Option<&str>, default_asc: bool) -> Sql {
        let Term::Name(name) = self else {
            return self.plain_fragment(table);
        };
        let (name, direction) = if let Some(rest) = name.strip_prefix('-') {
            (rest, " DESC")
        } else if let Some(rest) = name.strip_prefix('+') {
            (rest, " ASC")
        } else if default_asc {
            (name.as_str(), " ASC")
        } else {
            (name.as_str(), "")
        };
        let mut out = Sql::new(qualify_column(table, name));
        out.push(direction);
        out
    }
}

/// Collect terms from anything iterable.
pub(crate) fn collect_terms<I, T>(terms: I) -> Vec<Term>
where
    I: IntoIterator<Item = T>,
    T: Into<Term>,
{
    terms.into_iter().map(Into::into).collect()
}

/// Frame unit of a window frame clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Rows,
    Range,
    Groups,
}

impl FrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FrameKind::Rows => "ROWS",
            FrameKind::Range => "RANGE",
            FrameKind::Groups => "GROUPS",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "ROWS" => Some(FrameKind::Rows),
            "RANGE" => Some(FrameKind::Range),
            "GROUPS" => Some(FrameKind::Groups),
            _ => None,
        }
    }
}

/// A window frame clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    /// Frame text emitted verbatim.
    Raw(String),
    /// `<kind> BETWEEN <start> AND <end>`.
    Between {
        kind: FrameKind,
        start: String,
        end: String,
    },
}

impl Frame {
    pub fn raw(sql: impl Into<String>) -> Self {
        Frame::Raw(sql.into())
    }

    pub fn between(kind: FrameKind, start: impl Into<String>, end: impl Into<String>) -> Self {
        Frame::Between {
            kind,
            start: start.into(),
            end: end.into(),
        }
    }

    pub fn rows(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::between(FrameKind::Rows, start, end)
    }

    pub fn range(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::between(FrameKind::Range, start, end)
    }

    pub fn groups(start: impl Into<String>, end: impl Into<String>) -> Self {
        Self::between(FrameKind::Groups, start, end)
    }

    pub fn to_sql(&self) -> String {
        match self {
            Frame::Raw(sql) => sql.clone(),
            Frame::Between { kind, start, end } => {
                format!("{} BETWEEN {start} AND {end}", kind.as_str())
            }
        }
    }
}

impl From<&str> for Frame {
    fn from(s: &str) -> Self {
        Frame::Raw(s.to_string())
    }
}

impl From<(&str, &str)> for Frame {
    fn from((start, end): (&str, &str)) -> Self {
        Frame::rows(start, end)
    }
}

impl TryFrom<&[&str]> for Frame {
    type Error = OrmError;

    /// Accepts `[start, end]` (ROWS) or `[kind, start, end]`.
    fn try_from(items: &[&str]) -> OrmResult<Self> {
        match items {
            [start, end] => Ok(Frame::rows(*start, *end)),
            [kind, start, end] => {
                let kind = FrameKind::parse(kind).ok_or_else(|| {
                    OrmError::compilation(format!(
                        "frame type must be ROWS, RANGE or GROUPS, got '{kind}'"
                    ))
                })?;
                Ok(Frame::between(kind, *start, *end))
            }
            _ => Err(OrmError::compilation(format!(
                "frame needs 2 or 3 elements, got {}",
                items.len()
            ))),
        }
    }
}

/// The body of an `OVER (...)` clause.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Over {
    pub partition_by: Vec<Term>,
    pub order_by: Vec<Term>,
    pub frame: Option<Frame>,
}

impl Over {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn partition_by<I, T>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Term>,
    {
        self.partition_by = collect_terms(terms);
        self
    }

    pub fn order_by<I, T>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Term>,
    {
        self.order_by = collect_terms(terms);
        self
    }

    pub fn frame(mut self, frame: impl Into<Frame>) -> Self {
        self.frame = Some(frame.into());
        self
    }

    /// Render the clauses inside the parentheses, space separated, empty ones omitted.
    pub(crate) fn body_fragment(&self, table: Option<&str>, default_asc: bool) -> Sql {
        let mut out = Sql::empty();

        if !self.partition_by.is_empty() {
            out.push("PARTITION BY ");
            for (i, term) in self.partition_by.iter().enumerate() {
                if i > 0 {
                    out.push(", ");
                }
                out.append(term.plain_fragment(table));
            }
        }

        if !self.order_by.is_empty() {
            if !out.is_empty() {
                out.push(" ");
            }
            out.push("ORDER BY ");
            for (i, term) in self.order_by.iter().enumerate() {
                if i > 0 {
                    out.push(", ");
                }
                out.append(term.order_fragment(table, default_asc));
            }
        }

        if let Some(frame) = &self.frame {
            if !out.is_empty() {
                out.push(" ");
            }
            out.push(&frame.to_sql());
        }

        out
    }
}

/// A named window for the `WINDOW` clause.
///
/// ```ignore
/// let w = Window::new("w")
///     .partition_by(["department"])
///     .order_by(["-salary"])
///     .frame(("UNBOUNDED PRECEDING", "CURRENT ROW"));
/// assert_eq!(
///     w.to_sql(),
///     "w AS (PARTITION BY department ORDER BY salary DESC ROWS BETWEEN UNBOUNDED PRECEDING AND CURRENT ROW)"
/// );
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Window {
    pub name: String,
    pub over: Over,
}

impl Window {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            over: Over::default(),
        }
    }

    pub fn partition_by<I, T>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Term>,
    {
        self.over = self.over.partition_by(terms);
        self
    }

    pub fn order_by<I, T>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Term>,
    {
        self.over = self.over.order_by(terms);
        self
    }

    pub fn frame(mut self, frame: impl Into<Frame>) -> Self {
        self.over = self.over.frame(frame);
        self
    }

    pub(crate) fn fragment(&self, table: Option<&str>, default_asc: bool) -> Sql {
        let mut out = Sql::new(format!("{} AS (", self.name));
        out.append(self.over.body_fragment(table, default_asc));
        out.push(")");
        out
    }

    /// Render the definition stand-alone.
    pub fn to_sql(&self) -> String {
        self.fragment(None, false).to_sql()
    }
}
