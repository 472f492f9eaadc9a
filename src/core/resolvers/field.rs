use serde_json::Value;

use crate::errors::RenderError;
use crate::parser::Attributes;
use crate::registry::DisplayFormatter;
use crate::types::{FieldDescriptor, RenderContext, value_to_string};

/// The entry's stored value for `field`, or null.
pub fn field_value(ctx: &RenderContext, field: &FieldDescriptor) -> Value {
    ctx.entry
        .as_ref()
        .and_then(|entry| entry.meta(field))
        .cloned()
        .unwrap_or(Value::Null)
}

/// Display text for a field tag such as `[25 sep=", " show="field_label"]`.
pub fn field_display(
    formatter: &dyn DisplayFormatter,
    default_separator: &str,
    ctx: &RenderContext,
    field: &FieldDescriptor,
    attributes: &Attributes,
) -> Result<String, RenderError> {
    match attributes.get("show") {
        Some("field_label") => return Ok(field.name.clone()),
        Some("description") => return Ok(field.description.clone()),
        _ => (),
    }

    let value = field_value(ctx, field);
    let sep = attributes.get("sep").unwrap_or(default_separator);
    let joined = value_to_string(&value, sep);
    if joined.is_empty() {
        return Ok(String::new());
    }

    let mut attributes = attributes.clone();
    if !attributes.contains("sep") {
        attributes.insert("sep", sep);
    }
    if let Some(entry) = &ctx.entry {
        attributes.insert("entry_id", &entry.id.to_string());
        attributes.insert("entry_key", &entry.item_key);
    }

    formatter
        .format(&value, field, &attributes)
        .map_err(|source| RenderError::Format { field: field.key.clone(), source })
}
