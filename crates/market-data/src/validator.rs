//! Request parameter validation.
//!
//! Runs before any cache lookup or upstream call, so a rejected request
//! performs no I/O at all.

use log::debug;

use crate::errors::ValidationError;
use crate::models::{CacheKey, Operation, Symbol};

/// Validate raw `operation` and `symbol` query values into a [`CacheKey`].
///
/// Surrounding whitespace is trimmed. Case is not normalized: `ibm` is
/// rejected rather than silently rewritten to `IBM`.
pub fn validate_request(
    operation: Option<&str>,
    symbol: Option<&str>,
) -> Result<CacheKey, ValidationError> {
    let operation = non_blank(operation).ok_or(ValidationError::MissingParameter("operation"))?;
    let symbol = non_blank(symbol).ok_or(ValidationError::MissingParameter("symbol"))?;

    let operation: Operation = operation.parse()?;
    let symbol = Symbol::parse(symbol).map_err(|e| {
        debug!("Rejected symbol {:?}", symbol);
        e
    })?;

    Ok(CacheKey::new(operation, symbol))
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
