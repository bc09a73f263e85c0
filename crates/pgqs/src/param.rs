//! Placeholder allocation.

use crate::error::{OrmError, OrmResult};
use crate::value::Value;

/// Maximum number of bind parameters PostgreSQL accepts in one statement.
pub const MAX_BIND_PARAMS: usize = u16::MAX as usize;

/// Hands out `$1, $2, ...` in strict first-use order and collects the bound values.
///
/// One allocator lives for exactly one render pass. Every clause of a statement is
/// rendered through the same allocator, so the `i`-th collected value always belongs
/// to `$i`.
#[derive(Debug, Default)]
pub struct ParamAllocator {
    params: Vec<Value>,
}

impl ParamAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `value` and write its placeholder into `out`.
    pub fn bind(&mut self, value: Value, out: &mut String) -> OrmResult<()> {
        if self.params.len() >= MAX_BIND_PARAMS {
            return Err(OrmError::compilation(format!(
                "too many bind parameters (max {MAX_BIND_PARAMS})"
            )));
        }
        self.params.push(value);
        use std::fmt::Write;
        let _ = write!(out, "${}", self.params.len());
        Ok(())
    }

    /// Number of placeholders issued so far.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    pub fn into_params(self) -> Vec<Value> {
        self.params
    }
}
