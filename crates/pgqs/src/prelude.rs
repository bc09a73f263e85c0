//! Convenient imports for typical `pgqs` usage.
//!
//! ```ignore
//! use pgqs::prelude::*;
//! ```

pub use crate::q;
pub use crate::{
    Executor, Expression, F, FieldDef, ForeignKey, Model, OrmError, OrmResult, Over, Q, QuerySet,
    Record, TableDef, Value, Window,
};
