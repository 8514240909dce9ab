//! Tagged view of a value returned from a script function.
//!
//! Lua is dynamically typed; the host only understands three shapes of
//! return value.  [`ScriptValue::decode`] sorts an [`mlua::Value`] into one
//! of them and rejects everything else, so each calling convention can match
//! on the tag instead of probing the raw value.
//!
//! | Lua value            | Tag                          |
//! |----------------------|------------------------------|
//! | `nil`                | [`ScriptValue::None`]        |
//! | integer              | [`ScriptValue::Integer`]     |
//! | float                | [`ScriptValue::Integer`] (truncated toward zero) |
//! | table                | [`ScriptValue::Table`]       |
//! | anything else        | rejected with its type name  |
//!
//! Values are decoded and dropped within a single host call; nothing here is
//! ever stored.

use mlua::{Table, Value};

/// One decoded script return value.
#[derive(Debug, Clone)]
pub enum ScriptValue {
    None,
    Integer(i64),
    /// Expected to be a table of tables; rows are inspected lazily by the
    /// matrix convention so errors can name the exact row and column.
    Table(Table),
}

impl ScriptValue {
    /// Classify `value`.  Returns the Lua type name of anything that is not
    /// nil, a number or a table.
    pub fn decode(value: Value) -> Result<Self, &'static str> {
        match value {
            Value::Nil => Ok(ScriptValue::None),
            Value::Integer(i) => Ok(ScriptValue::Integer(i)),
            Value::Number(n) => Ok(ScriptValue::Integer(truncate(n))),
            Value::Table(t) => Ok(ScriptValue::Table(t)),
            other => Err(lua_type_name(&other)),
        }
    }

    /// Lua type name of the tagged value, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            ScriptValue::None => "nil",
            ScriptValue::Integer(_) => "number",
            ScriptValue::Table(_) => "table",
        }
    }
}

/// Type name as Lua's `type()` reports it.  mlua tells integers and floats
/// apart; Lua calls both `number`.
pub fn lua_type_name(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) | Value::Number(_) => "number",
        other => other.type_name(),
    }
}

/// Truncate a float toward zero.  Out-of-range values saturate and NaN
/// becomes 0, which is what an `as` cast does.
pub fn truncate(n: f64) -> i64 {
    n as i64
}

/// Convert one matrix cell.  Only numbers are accepted; the result is the
/// low 8 bits of the integer value.
pub fn cell_from_value(value: &Value) -> Result<i8, &'static str> {
    match value {
        Value::Integer(i) => Ok(*i as i8),
        Value::Number(n) => Ok(truncate(*n) as i8),
        other => Err(lua_type_name(other)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use mlua::Lua;

    #[test]
    fn decode_nil_and_numbers() {
        assert!(matches!(ScriptValue::decode(Value::Nil), Ok(ScriptValue::None)));
        assert!(matches!(ScriptValue::decode(Value::Integer(7)), Ok(ScriptValue::Integer(7))));
        assert!(matches!(ScriptValue::decode(Value::Number(2.9)), Ok(ScriptValue::Integer(2))));
        assert!(matches!(ScriptValue::decode(Value::Number(-2.9)), Ok(ScriptValue::Integer(-2))));
    }

    #[test]
    fn decode_table() {
        let lua = Lua::new();
        let t = lua.create_table().unwrap();
        let v = ScriptValue::decode(Value::Table(t)).unwrap();
        assert_eq!(v.type_name(), "table");
    }

    #[test]
    fn decode_rejects_other_types() {
        let lua = Lua::new();
        let s = lua.create_string("1").unwrap();
        assert_eq!(ScriptValue::decode(Value::String(s)).unwrap_err(), "string");
        assert_eq!(ScriptValue::decode(Value::Boolean(true)).unwrap_err(), "boolean");
    }

    #[test]
    fn numbers_are_named_like_lua() {
        assert_eq!(lua_type_name(&Value::Integer(7)), "number");
        assert_eq!(lua_type_name(&Value::Number(0.5)), "number");
        assert_eq!(lua_type_name(&Value::Nil), "nil");
        assert_eq!(lua_type_name(&Value::Boolean(false)), "boolean");
    }

    #[test]
    fn truncate_saturates() {
        assert_eq!(truncate(f64::NAN), 0);
        assert_eq!(truncate(1e300), i64::MAX);
        assert_eq!(truncate(-1e300), i64::MIN);
    }

    #[test]
    fn cell_wraps_to_eight_bits() {
        assert_eq!(cell_from_value(&Value::Integer(-1)), Ok(-1));
        assert_eq!(cell_from_value(&Value::Integer(5)), Ok(5));
        assert_eq!(cell_from_value(&Value::Integer(300)), Ok(44));
        assert_eq!(cell_from_value(&Value::Integer(255)), Ok(-1));
        assert_eq!(cell_from_value(&Value::Number(3.7)), Ok(3));
        assert_eq!(cell_from_value(&Value::Nil), Err("nil"));
    }
}
