//! Request models
//!
//! - `operation` - The allow-listed upstream operations (Operation)
//! - `symbol` - Validated ticker symbols (Symbol)
//! - `cache_key` - Composite cache identity and its file-safe encoding (CacheKey)

mod cache_key;
mod operation;
mod symbol;

pub use cache_key::CacheKey;
pub use operation::Operation;
pub use symbol::{Symbol, MAX_SYMBOL_LEN};
