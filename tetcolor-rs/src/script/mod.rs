//! Lua script embedding.
//!
//! The game rules live in a Lua script; this module is the bridge that
//! loads it and calls into it.
//!
//! - [`host`]: [`ScriptHost`], interpreter lifecycle and the three
//!   calling conventions (void, integer, matrix)
//! - [`value`]: [`ScriptValue`], tagged decoding of returned values
//! - [`error`]: [`ScriptError`], what can go wrong, and where
//!
//! # Quick start
//!
//! ```rust
//! use tetcolor::script::ScriptHost;
//!
//! let host = ScriptHost::new().unwrap();
//! host.do_string("function field() return {{1, 2}, {3, 4}} end").unwrap();
//! let mut cells = [0i8; 4];
//! host.matrix("field", 2, 2, &mut cells).unwrap();
//! assert_eq!(cells, [1, 2, 3, 4]);
//! ```

pub mod error;
pub mod host;
pub mod value;

pub use error::{Result, ScriptError};
pub use host::ScriptHost;
pub use value::ScriptValue;
