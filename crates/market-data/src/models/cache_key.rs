use std::fmt;

use serde::{Deserialize, Serialize};

use super::operation::Operation;
use super::symbol::Symbol;

/// Separator between operation and symbol in the stable key form.
const KEY_SEPARATOR: &str = "__";

/// Identity of a cached upstream resource: one operation for one symbol.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub operation: Operation,
    pub symbol: Symbol,
}

impl CacheKey {
    pub fn new(operation: Operation, symbol: Symbol) -> Self {
        Self { operation, symbol }
    }

    /// Stable string form, `{OPERATION}__{SYMBOL}`.
    pub fn as_key(&self) -> String {
        format!("{}{}{}", self.operation, KEY_SEPARATOR, self.symbol)
    }

    /// File stem for on-disk records.
    ///
    /// Symbols are already restricted to `[A-Z0-9.-]`; the mapping below only
    /// guarantees the stem can never contain a path separator even if that
    /// pattern is loosened.
    pub fn file_stem(&self) -> String {
        self.as_key()
            .chars()
            .map(|c| match c {
                'A'..='Z' | 'a'..='z' | '0'..='9' | '.' | '-' | '_' => c,
                _ => '_',
            })
            .collect()
    }

    /// File name for on-disk records (`{stem}.json`).
    pub fn file_name(&self) -> String {
        format!("{}.json", self.file_stem())
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_key())
    }
}
