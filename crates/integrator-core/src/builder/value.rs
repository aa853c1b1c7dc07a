// Values a method can be made to return.

use serde_json::Value;

use crate::ast::{ArrayItem, Expr};
use crate::parser::Parser;
use crate::{IntegratorError, Result};

const LITERAL_FLAG: &str = "is_literal";
const LITERAL_VALUE: &str = "value";

/// Return value of a `set-return-value` mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum ReturnValue {
    /// Structured data converted into an equivalent literal
    Value(Value),
    /// Source fragment spliced in after parsing on its own
    Raw(String),
}

impl ReturnValue {
    pub fn raw(code: impl Into<String>) -> Self {
        ReturnValue::Raw(code.into())
    }

    /// Decodes a configured value. An object carrying a non-null `is_literal`
    /// flag is raw code: a string `value` as written, any other JSON value as
    /// its JSON text, which is PHP for scalars and fails to parse for objects.
    /// A missing `value` is empty code.
    pub fn from_json(value: Value) -> Self {
        if let Value::Object(map) = &value {
            if map.get(LITERAL_FLAG).is_some_and(|flag| !flag.is_null()) {
                return ReturnValue::Raw(match map.get(LITERAL_VALUE) {
                    Some(Value::String(code)) => code.clone(),
                    Some(other) => other.to_string(),
                    None => String::new(),
                });
            }
        }
        ReturnValue::Value(value)
    }

    pub fn is_raw(&self) -> bool {
        matches!(self, ReturnValue::Raw(_))
    }

    /// Builds the returned expression. Raw code must parse as exactly one
    /// expression.
    pub fn to_expr(&self, parser: &dyn Parser) -> Result<Expr> {
        match self {
            ReturnValue::Value(value) => Ok(json_to_expr(value)),
            ReturnValue::Raw(code) => {
                parser
                    .parse_expression(code)
                    .map_err(|error| IntegratorError::LiteralParse {
                        value: code.clone(),
                        reason: error.to_string(),
                    })
            }
        }
    }

    /// Return type declared on a method created to hold this value.
    pub fn inferred_type(&self) -> Option<&'static str> {
        match self {
            ReturnValue::Raw(_) => None,
            ReturnValue::Value(value) => match value {
                Value::Null => None,
                Value::Bool(_) => Some("bool"),
                Value::Number(number) if number.is_i64() => Some("int"),
                Value::Number(_) => Some("float"),
                Value::String(_) => Some("string"),
                Value::Array(_) | Value::Object(_) => Some("array"),
            },
        }
    }
}

impl From<Value> for ReturnValue {
    fn from(value: Value) -> Self {
        ReturnValue::from_json(value)
    }
}

/// Structural conversion of JSON data into a literal expression.
pub fn json_to_expr(value: &Value) -> Expr {
    match value {
        Value::Null => Expr::null(),
        Value::Bool(flag) => Expr::bool(*flag),
        // PHP has no unsigned integers; past PHP_INT_MAX a literal is a float
        // there too, so u64 values keep only float precision.
        Value::Number(number) => match number.as_i64() {
            Some(int) => Expr::Int(int),
            None => Expr::Float(number.as_f64().unwrap_or(f64::NAN)),
        },
        Value::String(text) => Expr::String(text.clone()),
        Value::Array(values) => list(values.iter()),
        Value::Object(map) => {
            let is_list = map
                .keys()
                .enumerate()
                .all(|(index, key)| key == &index.to_string());
            if is_list {
                return list(map.values());
            }
            let items = map
                .iter()
                .map(|(key, value)| ArrayItem::keyed(array_key(key), json_to_expr(value)))
                .collect();
            Expr::Array {
                items,
                long_syntax: false,
            }
        }
    }
}

fn list<'a>(values: impl Iterator<Item = &'a Value>) -> Expr {
    Expr::Array {
        items: values.map(|value| ArrayItem::value(json_to_expr(value))).collect(),
        long_syntax: false,
    }
}

/// Decimal integer keys keep their integer form.
fn array_key(key: &str) -> Expr {
    match key.parse::<i64>() {
        Ok(int) if int.to_string() == key => Expr::Int(int),
        _ => Expr::String(key.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::ToSource;
    use crate::parser::PhpParser;
    use serde_json::json;

    fn printed(value: Value) -> String {
        ReturnValue::from_json(value)
            .to_expr(&PhpParser)
            .unwrap()
            .to_source()
    }

    #[test]
    fn test_scalars() {
        assert_eq!(printed(json!(true)), "true");
        assert_eq!(printed(json!(null)), "null");
        assert_eq!(printed(json!(42)), "42");
        assert_eq!(printed(json!(-7)), "-7");
        assert_eq!(printed(json!(1.5)), "1.5");
        assert_eq!(printed(json!("it's")), "'it\\'s'");
    }

    #[test]
    fn test_list_and_map() {
        assert_eq!(printed(json!(["a", 1])), "['a', 1]");
        assert_eq!(printed(json!({"0": "a", "1": "b"})), "['a', 'b']");
        assert_eq!(
            printed(json!({"key": "value", "10": false})),
            "[\n    'key' => 'value',\n    10 => false,\n]"
        );
    }

    #[test]
    fn test_literal_flag_selects_raw_code() {
        let value = ReturnValue::from_json(json!({"is_literal": true, "value": "Config::get('x')"}));
        assert_eq!(value, ReturnValue::raw("Config::get('x')"));

        let unflagged = ReturnValue::from_json(json!({"is_literal": null, "value": "x"}));
        assert!(!unflagged.is_raw());
    }

    #[test]
    fn test_literal_flag_with_scalar_value() {
        assert_eq!(
            ReturnValue::from_json(json!({"is_literal": true, "value": true})),
            ReturnValue::raw("true")
        );
        assert_eq!(
            ReturnValue::from_json(json!({"is_literal": 1, "value": null})),
            ReturnValue::raw("null")
        );
        assert_eq!(
            ReturnValue::from_json(json!({"is_literal": true, "value": 12})),
            ReturnValue::raw("12")
        );
        assert_eq!(printed(json!({"is_literal": true, "value": false})), "false");
        assert_eq!(printed(json!({"is_literal": true, "value": [1, 2]})), "[1, 2]");
    }

    #[test]
    fn test_literal_flag_with_unusable_value_is_an_error() {
        for value in [
            json!({"is_literal": true, "value": {"a": 1}}),
            json!({"is_literal": true}),
        ] {
            let result = ReturnValue::from_json(value).to_expr(&PhpParser);
            assert!(matches!(result, Err(IntegratorError::LiteralParse { .. })));
        }
    }

    #[test]
    fn test_integer_beyond_i64_becomes_float() {
        let value = ReturnValue::from_json(json!(u64::MAX));
        assert_eq!(value.inferred_type(), Some("float"));
        assert_eq!(
            value.to_expr(&PhpParser).unwrap(),
            Expr::Float(u64::MAX as f64)
        );
        assert_eq!(printed(json!(i64::MAX)), i64::MAX.to_string());
    }

    #[test]
    fn test_incomplete_literal_is_an_error() {
        let result = ReturnValue::raw("1 +").to_expr(&PhpParser);
        assert!(matches!(
            result,
            Err(IntegratorError::LiteralParse { ref value, .. }) if value == "1 +"
        ));
    }

    #[test]
    fn test_literal_with_trailing_semicolon() {
        let expr = ReturnValue::raw("static::FLAG;").to_expr(&PhpParser).unwrap();
        assert_eq!(expr.to_source(), "static::FLAG");
    }

    #[test]
    fn test_inferred_types() {
        assert_eq!(ReturnValue::from_json(json!(false)).inferred_type(), Some("bool"));
        assert_eq!(ReturnValue::from_json(json!(3)).inferred_type(), Some("int"));
        assert_eq!(ReturnValue::from_json(json!(0.5)).inferred_type(), Some("float"));
        assert_eq!(ReturnValue::from_json(json!([])).inferred_type(), Some("array"));
        assert_eq!(ReturnValue::raw("1").inferred_type(), None);
    }
}
