use std::collections::HashMap;

use log::trace;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::renderer::Pipeline;
use crate::types::{FieldDescriptor, FieldType};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormInfo {
    pub form_key: String,
    pub name: String,
}

/// Inputs for customizing one field's HTML.
#[derive(Debug, Clone)]
pub struct FieldHtmlArgs<'a> {
    pub field: &'a FieldDescriptor,
    /// Id used in the markup; repeated fields carry a suffix such as `25-0`.
    pub field_id: String,
    pub html_id: String,
    /// Validation errors keyed `field<field_id>`.
    pub errors: &'a HashMap<String, String>,
    pub form: Option<&'a FormInfo>,
    /// The `entry` request parameter, when present.
    pub entry_key: Option<String>,
}

impl<'a> FieldHtmlArgs<'a> {
    pub fn new(field: &'a FieldDescriptor, errors: &'a HashMap<String, String>) -> Self {
        Self {
            field,
            field_id: field.id.to_string(),
            html_id: format!("field_{}", field.key),
            errors,
            form: None,
            entry_key: None,
        }
    }
}

const INLINE_CONDITIONS: [&str; 3] = ["required_label", "description", "error"];

static INLINE_BLOCKS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    INLINE_CONDITIONS
        .iter()
        .map(|name| {
            let pattern = format!(r"(?is)\[if\s+{0}\].*?\[/if\s+{0}\]", name);
            (*name, Regex::new(&pattern).expect("inline condition pattern"))
        })
        .collect()
});

impl Pipeline<'_> {
    /// Replaces the field-level shortcodes in a field's HTML.
    pub fn render_field_html(&self, html: &str, args: &FieldHtmlArgs<'_>) -> String {
        let field = args.field;
        let mut html = html.to_string();

        if field.field_type == FieldType::Captcha {
            html = html.replace(" for=\"field_[key]\"", "");
        }

        html = html
            .replace("[id]", &args.field_id)
            .replace("field_[key]", &args.html_id)
            .replace("[key]", &field.key)
            .replace("[field_name]", &field.name);

        if field.field_type == FieldType::Divider {
            html = if field.description.is_empty() {
                html.replace("[label_position]", "[label_position] frm_section_spacing")
            } else {
                html.replace("frm_description", "frm_description frm_section_spacing")
            };
        }

        let required = if field.required { field.required_indicator.as_str() } else { "" };
        let error = args
            .errors
            .get(&format!("field{}", args.field_id))
            .map(String::as_str)
            .unwrap_or("");
        html = inline_conditions(&html, |name| match name {
            "required_label" => required,
            "description" => field.description.as_str(),
            _ => error,
        });

        let required_class = if field.required { " frm_required_field" } else { "" };
        html = html
            .replace("[required_class]", required_class)
            .replace("[entry_key]", args.entry_key.as_deref().unwrap_or(""));

        if let Some(form) = args.form {
            html = html.replace("[form_key]", &form.form_key).replace("[form_name]", &form.name);
        }

        html = self.generic_pass(&html);

        if field.field_type == FieldType::Html {
            html = self.generic_pass(&html);
        }

        if html.contains("[collapse_this]") {
            html = html.replace("[collapse_this]", "");
        }
        html
    }
}

/// `[if X]..[/if X]` keeps its body when X has a value, then `[X]` becomes the value.
///
/// `"0"` counts as no value. With a value every `[if X]` and `[/if X]` is dropped,
/// paired or not.
fn inline_conditions<'v>(html: &str, value_of: impl Fn(&str) -> &'v str) -> String {
    let mut text = html.to_string();
    for (name, block) in INLINE_BLOCKS.iter() {
        let name = *name;
        let value = value_of(name);
        let shown = !value.is_empty() && value != "0";
        trace!("Field html [if {}] -> {}", name, shown);
        if shown {
            text = text.replace(&format!("[if {}]", name), "").replace(&format!("[/if {}]", name), "");
        } else {
            text = block.replace_all(&text, "").into_owned();
        }
        text = text.replace(&format!("[{}]", name), value);
    }
    text
}
