//! # pgqs
//!
//! Composable, lazily evaluated query sets compiled to parameterized PostgreSQL.
//!
//! ## Features
//!
//! - **Immutable chains**: every chain method returns a new `QuerySet`; the source is untouched
//! - **Predicate trees**: `Q` objects combine with `&`, `|` and `!`
//! - **Field lookups**: `status__in`, `title__icontains`, `author__name__startswith`, ...
//! - **Column references**: `F::new("price") * 2`, aggregates and window functions
//! - **Parameter safety**: every value is bound; `$n` placeholders run strictly left to right
//! - **Pluggable execution**: terminal operations go through an [`Executor`]
//!
//! ## Example
//!
//! ```ignore
//! use pgqs::prelude::*;
//!
//! let books = Book::objects()
//!     .filter(q!(status = "published") | q!(rating__gte = 4))
//!     .order_by(["-created_at"])
//!     .limit(10);
//!
//! let built = books.to_sql()?;
//! // SELECT * FROM books WHERE ((books.status = $1) OR (books.rating >= $2))
//! //   ORDER BY books.created_at DESC LIMIT 10
//!
//! let rows = books.execute(&client).await?;
//! let n = books.count(&client).await?;
//! ```

pub mod column;
pub mod error;
pub mod executor;
pub mod expr;
pub mod ident;
pub mod model;
pub mod monitor;
pub mod param;
pub mod predicate;
pub mod prelude;
pub mod queryset;
pub mod record;
pub mod sql;
pub mod value;
pub mod window;

pub use column::{F, Operand};
pub use error::{BoxError, OrmError, OrmResult};
pub use executor::{Executor, ScalarRow};
pub use expr::Expression;
pub use ident::{Ident, IntoIdent};
pub use model::{FieldDef, ForeignKey, Model, TableDef};
pub use monitor::{ExecConfig, InstrumentedExecutor};
pub use param::{MAX_BIND_PARAMS, ParamAllocator};
pub use predicate::{Lookup, LookupOp, LookupValue, Q};
pub use queryset::{ExplainOptions, Filter, JoinType, QuerySet, TableName};
pub use record::Record;
pub use sql::{BuiltQuery, Sql};
pub use value::Value;
pub use window::{Frame, FrameKind, Over, Term, Window};
