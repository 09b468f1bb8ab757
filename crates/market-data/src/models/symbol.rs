use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

/// Maximum ticker length accepted by the proxy.
pub const MAX_SYMBOL_LEN: usize = 10;

lazy_static! {
    /// Uppercase letters, digits, dot and hyphen. Anything else could end up
    /// in a cache file name or an upstream query, so it is rejected early.
    static ref SYMBOL_PATTERN: Regex =
        Regex::new(r"^[A-Z0-9.\-]{1,10}$").expect("symbol pattern is a valid regex");
}

/// A ticker symbol that passed validation.
///
/// Construction goes through [`Symbol::parse`], so holding a `Symbol` means
/// the value is safe to embed in file names and query strings.
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        if SYMBOL_PATTERN.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(ValidationError::InvalidSymbol(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Symbol::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
