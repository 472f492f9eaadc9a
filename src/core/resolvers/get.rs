use log::trace;
use serde_json::Value;

use crate::parser::Attributes;
use crate::registry::RequestParamReader;
use crate::types::is_blank;

/// Resolves `[get param="name" default="..." prev_val="..."]`.
///
/// Blank request values fall back to `default`, then `prev_val`, then nothing.
pub fn get_param(params: &dyn RequestParamReader, attributes: &Attributes) -> Value {
    let Some(param) = attributes.get("param") else {
        return Value::String(String::new());
    };
    // Brackets inside a shortcode attribute arrive entity-encoded.
    let param = param.replace("&#91;", "[").replace("&#93;", "]");

    match params.get(&param) {
        Some(value) if !is_blank(&value) => value,
        _ => {
            let fallback = attributes.get("default").or_else(|| attributes.get("prev_val")).unwrap_or("");
            trace!("Request parameter '{}' is blank, using {:?}", param, fallback);
            Value::String(fallback.to_string())
        }
    }
}
