//! Embedded Lua host with three fixed calling conventions.
//!
//! | Convention | Rust method              | Script function returns            |
//! |------------|--------------------------|------------------------------------|
//! | void       | [`ScriptHost::call`]     | anything (discarded)               |
//! | integer    | [`ScriptHost::call_int`] | one number                         |
//! | matrix     | [`ScriptHost::matrix`]   | a table of `rows` tables of `cols` numbers |
//!
//! All functions are zero-argument globals.  Every engine handle obtained
//! during a call (the function, the returned values, row tables) is a local
//! of that call and is dropped on every exit path, so no stack or registry
//! slot outlives the call no matter how it ends.

use std::panic::Location;
use std::path::Path;

use mlua::{FromLuaMulti, Function, Lua, LuaOptions, MultiValue, StdLib, Table, Value};

use super::error::{Result, ScriptError};
use super::value::{cell_from_value, lua_type_name, ScriptValue};

/// Chunk name used for sources passed to [`ScriptHost::do_string`].
const STRING_CHUNK: &str = "=<string>";

/// One Lua 5.4 interpreter and the global namespace of the script(s) loaded
/// into it.
///
/// Deliberately not `Clone`: two handles would share one mutable namespace.
/// Dropping the host closes the interpreter.
pub struct ScriptHost {
    lua: Lua,
    origin: String,
}

impl ScriptHost {
    /// Create an interpreter with the safe standard libraries and nothing
    /// loaded.
    pub fn new() -> Result<Self> {
        Self::with_origin(String::from("<empty>"))
    }

    /// Read `path`, create an interpreter and run the file's top-level code
    /// once, defining its global functions.
    ///
    /// The file is read before the interpreter is created, so an unreadable
    /// file never allocates a state.
    pub fn from_file(path: &Path) -> Result<Self> {
        let origin = path.display().to_string();
        let source = std::fs::read(path).map_err(|e| ScriptError::Load {
            origin: origin.clone(),
            message: format!("cannot open file: {e}"),
        })?;

        let host = Self::with_origin(origin.clone())?;
        host.exec_chunk(&source, &format!("@{origin}"), &origin)?;
        tracing::info!(script = %origin, "script loaded");
        Ok(host)
    }

    fn with_origin(origin: String) -> Result<Self> {
        let lua = Lua::new_with(StdLib::ALL_SAFE, LuaOptions::default())
            .map_err(|e| ScriptError::Allocation(e.to_string()))?;
        tracing::debug!(script = %origin, "lua state created");
        Ok(Self { lua, origin })
    }

    /// Path (or placeholder) of the script this host was built from.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    // ── Loading further chunks ────────────────────────────────────────────────

    /// Run another file in the already-loaded namespace.
    pub fn do_file(&self, path: &Path) -> Result<()> {
        let origin = path.display().to_string();
        let source = std::fs::read(path).map_err(|e| ScriptError::Load {
            origin: origin.clone(),
            message: format!("cannot open file: {e}"),
        })?;
        self.exec_chunk(&source, &format!("@{origin}"), &origin)
    }

    /// Run a source string in the already-loaded namespace.
    pub fn do_string(&self, source: &str) -> Result<()> {
        self.exec_chunk(source.as_bytes(), STRING_CHUNK, "<string>")
    }

    fn exec_chunk(&self, source: &[u8], chunk_name: &str, origin: &str) -> Result<()> {
        self.lua
            .load(source)
            .set_name(chunk_name)
            .exec()
            .map_err(|e| ScriptError::Load {
                origin: origin.to_owned(),
                message: e.to_string(),
            })
    }

    // ── Calling conventions ───────────────────────────────────────────────────

    /// Call global `name` with no arguments and discard whatever it returns.
    #[track_caller]
    pub fn call(&self, name: &str) -> Result<()> {
        tracing::debug!(function = name, "call");
        self.invoke(name).map(drop)
    }

    /// Call global `name` and return its first result as an integer.
    ///
    /// Floats are truncated toward zero; any other type (including no result
    /// at all) is a [`ScriptError::Type`].
    #[track_caller]
    pub fn call_int(&self, name: &str) -> Result<i64> {
        tracing::debug!(function = name, "call_int");
        let first = self.invoke(name)?.into_iter().next().unwrap_or(Value::Nil);
        match ScriptValue::decode(first) {
            Ok(ScriptValue::Integer(i)) => Ok(i),
            Ok(other) => Err(type_error(name, None, None, expected("integer", other.type_name()))),
            Err(found) => Err(type_error(name, None, None, expected("integer", found))),
        }
    }

    /// Call global `name` and copy the returned table of tables into `dest`,
    /// row-major: `dest[r * cols + c] = result[r + 1][c + 1]`, each value
    /// truncated to 8 bits.
    ///
    /// Rows are written in order as they are read.  When a row or cell is
    /// missing or not numeric the call fails at that point: rows before the
    /// failing one keep their new values, the failing row and everything
    /// after it keep what they held before the call.  Nothing is rolled back.
    ///
    /// A `dest` shorter than `rows * cols` is rejected before the script is
    /// called.
    #[track_caller]
    pub fn matrix(&self, name: &str, rows: usize, cols: usize, dest: &mut [i8]) -> Result<()> {
        let needed = rows.saturating_mul(cols);
        if dest.len() < needed {
            return Err(ScriptError::Buffer {
                function: name.to_owned(),
                needed,
                available: dest.len(),
            });
        }

        tracing::debug!(function = name, rows, cols, "matrix");
        let first = self.invoke(name)?.into_iter().next().unwrap_or(Value::Nil);
        let table = match ScriptValue::decode(first) {
            Ok(ScriptValue::Table(t)) => t,
            Ok(other) => {
                return Err(type_error(name, None, None, expected("table", other.type_name())))
            }
            Err(found) => return Err(type_error(name, None, None, expected("table", found))),
        };

        // Each row is staged and committed only once it converted fully, so a
        // bad cell leaves its whole row untouched.
        let mut staged = vec![0i8; cols];
        for r in 0..rows {
            let row = row_table(&table, name, r + 1)?;
            for (c, slot) in staged.iter_mut().enumerate() {
                let cell: Value = row.raw_get(c + 1).map_err(|e| {
                    type_error(name, Some(r + 1), Some(c + 1), e.to_string())
                })?;
                *slot = cell_from_value(&cell).map_err(|found| {
                    type_error(name, Some(r + 1), Some(c + 1), expected("number", found))
                })?;
            }
            dest[r * cols..(r + 1) * cols].copy_from_slice(&staged);
        }
        Ok(())
    }

    /// Look up and invoke a global function, returning all of its results.
    #[track_caller]
    fn invoke(&self, name: &str) -> Result<MultiValue> {
        let location = Location::caller();
        let runtime = |message: String| ScriptError::Runtime {
            function: name.to_owned(),
            message,
            location,
        };

        let global: Value = self
            .lua
            .globals()
            .get(name)
            .map_err(|e| runtime(e.to_string()))?;
        let func: Function = match global {
            Value::Function(f) => f,
            other => {
                return Err(runtime(format!(
                    "attempt to call a {} value (global '{name}')",
                    lua_type_name(&other)
                )))
            }
        };
        func.call::<MultiValue>(()).map_err(|e| runtime(e.to_string()))
    }

    // ── Diagnostics ───────────────────────────────────────────────────────────

    /// Evaluate a Lua expression in the loaded namespace and convert its
    /// value to `R`.
    #[track_caller]
    pub fn eval<R: FromLuaMulti>(&self, expr: &str) -> Result<R> {
        let location = Location::caller();
        self.lua
            .load(expr)
            .set_name(STRING_CHUNK)
            .eval::<R>()
            .map_err(|e| ScriptError::Runtime {
                function: String::from("<eval>"),
                message: e.to_string(),
                location,
            })
    }

    /// Bytes currently allocated by the interpreter.
    pub fn used_memory(&self) -> usize {
        self.lua.used_memory()
    }

    /// Run a full garbage-collection cycle.
    pub fn collect_garbage(&self) -> Result<()> {
        self.lua.gc_collect().map_err(|e| ScriptError::Runtime {
            function: String::from("<gc>"),
            message: e.to_string(),
            location: Location::caller(),
        })
    }
}

impl Drop for ScriptHost {
    fn drop(&mut self) {
        tracing::debug!(script = %self.origin, "lua state closed");
    }
}

impl std::fmt::Debug for ScriptHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptHost").field("origin", &self.origin).finish()
    }
}

fn row_table(table: &Table, name: &str, row: usize) -> Result<Table> {
    let value: Value = table
        .raw_get(row)
        .map_err(|e| type_error(name, Some(row), None, e.to_string()))?;
    match value {
        Value::Table(t) => Ok(t),
        other => Err(type_error(
            name,
            Some(row),
            None,
            expected("table", lua_type_name(&other)),
        )),
    }
}

fn type_error(name: &str, row: Option<usize>, col: Option<usize>, reason: String) -> ScriptError {
    ScriptError::Type { function: name.to_owned(), row, col, reason }
}

fn expected(what: &str, found: &str) -> String {
    format!("expected {what}, got {found}")
}

// ── Tests ─────────────────────────────────────────────────────────────────────
