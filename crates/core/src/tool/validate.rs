use serde_json::{Number, Value, json};

use super::{Error, ParamType, ParameterSpec, ToolCallRequest, ToolSignature};

/// Checks a proposed call against the tool's signature.
///
/// Every required parameter must be present (and not `null`), no
/// undeclared parameter may appear, and every value must have the declared
/// type. Values are only converted for parameters that declare `coerce`.
/// On success the call is handed back, so this works as a checkpoint right
/// before execution.
pub fn validate_arguments(
    mut call: ToolCallRequest,
    signature: &ToolSignature,
) -> Result<ToolCallRequest, Error> {
    if call.name != signature.name {
        return Err(Error::unknown_tool(&call.name).with_reason(format!(
            "`{}` was checked against the signature of `{}`",
            call.name, signature.name
        )));
    }

    if let Some(name) = call
        .arguments
        .keys()
        .find(|name| signature.parameter(name).is_none())
    {
        return Err(Error::invalid_argument(name.as_str())
            .with_reason("unexpected parameter"));
    }

    for spec in &signature.parameters {
        let Some(value) = call.arguments.get_mut(&spec.name) else {
            if spec.required {
                return Err(Error::invalid_argument(spec.name.as_str())
                    .with_reason("missing required parameter"));
            }
            continue;
        };
        if value.is_null() {
            if spec.required {
                return Err(Error::invalid_argument(spec.name.as_str())
                    .with_reason("required parameter is null"));
            }
            continue;
        }
        check_value(spec, value)?;
    }

    Ok(call)
}

fn check_value(spec: &ParameterSpec, value: &mut Value) -> Result<(), Error> {
    if matches_type(spec.ty, value) {
        return Ok(());
    }
    if spec.coerce {
        if let Some(coerced) = coerce(spec.ty, value) {
            trace!("coerced `{}` from {value} to {coerced}", spec.name);
            *value = coerced;
            return Ok(());
        }
    }
    Err(Error::invalid_argument(spec.name.as_str()).with_reason(format!(
        "expected {}, got {}",
        spec.ty,
        type_name(value)
    )))
}

fn matches_type(ty: ParamType, value: &Value) -> bool {
    match ty {
        ParamType::String => value.is_string(),
        ParamType::Integer => value.is_i64() || value.is_u64(),
        ParamType::Number => value.is_number(),
        ParamType::Boolean => value.is_boolean(),
        ParamType::Array => value.is_array(),
        ParamType::Object => value.is_object(),
        ParamType::Any => true,
    }
}

fn coerce(ty: ParamType, value: &Value) -> Option<Value> {
    match (ty, value) {
        (ParamType::String, Value::Number(n)) => Some(json!(n.to_string())),
        (ParamType::String, Value::Bool(b)) => Some(json!(b.to_string())),
        (ParamType::Integer, Value::String(s)) => {
            s.trim().parse::<i64>().ok().map(Value::from)
        }
        (ParamType::Integer, Value::Number(n)) => n
            .as_f64()
            .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
            .map(|f| Value::from(f as i64)),
        (ParamType::Number, Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number),
        (ParamType::Boolean, Value::String(s)) => match s.trim() {
            "true" | "True" => Some(Value::Bool(true)),
            "false" | "False" => Some(Value::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
