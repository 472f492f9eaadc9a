// Declare submodules
pub mod builtin;
pub mod field;
pub mod get;

pub use builtin::{BUILTIN_TAGS, Builtin};
pub use field::{field_display, field_value};
pub use get::get_param;

use log::trace;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::core::format::php_date;
use crate::errors::RenderError;
use crate::parser::Attributes;
use crate::registry::{DisplayFormatter, FieldProvider, RequestParamReader};
use crate::types::{FieldDescriptor, FieldType, RenderContext, value_to_string};

/// Maps a tag name to its value: built-ins first, then `get`, then fields.
pub struct ValueResolver<'e> {
    config: &'e EngineConfig,
    formatter: &'e dyn DisplayFormatter,
    params: &'e dyn RequestParamReader,
}

impl<'e> ValueResolver<'e> {
    pub fn new(
        config: &'e EngineConfig,
        formatter: &'e dyn DisplayFormatter,
        params: &'e dyn RequestParamReader,
    ) -> Self {
        Self { config, formatter, params }
    }

    /// The unformatted value behind a tag, used by conditions and loops.
    /// `None` when the name is neither a built-in nor a field.
    pub fn raw_value(&self, name: &str, attributes: &Attributes, ctx: &RenderContext) -> Option<Value> {
        if let Some(builtin) = Builtin::parse(name) {
            return Some(self.builtin_raw(builtin, attributes, ctx));
        }
        ctx.get_field(name).map(|field| field_value(ctx, field))
    }

    /// The replacement text for a plain tag. `None` leaves the tag as written.
    pub fn display_value(
        &self,
        name: &str,
        attributes: &Attributes,
        ctx: &RenderContext,
    ) -> Result<Option<String>, RenderError> {
        if let Some(builtin) = Builtin::parse(name) {
            return self.builtin_display(builtin, attributes, ctx).map(Some);
        }
        match ctx.get_field(name) {
            Some(field) => {
                field_display(self.formatter, &self.config.default_separator, ctx, field, attributes).map(Some)
            }
            None => {
                trace!("No value source for [{}]", name);
                Ok(None)
            }
        }
    }

    fn builtin_raw(&self, builtin: Builtin, attributes: &Attributes, ctx: &RenderContext) -> Value {
        let site = &self.config.site;
        match builtin {
            Builtin::SiteName => return Value::from(site.name.as_str()),
            Builtin::SiteUrl => return Value::from(site.url.as_str()),
            Builtin::AdminEmail => return Value::from(site.admin_email.as_str()),
            Builtin::PluginUrl => return Value::from(site.plugin_url.as_str()),
            Builtin::Get => return get_param(self.params, attributes),
            _ => (),
        }

        let Some(entry) = &ctx.entry else {
            trace!("[{:?}] needs an entry, none given", builtin);
            return Value::Null;
        };
        match builtin {
            Builtin::Id => Value::from(entry.id),
            Builtin::Key => Value::from(entry.item_key.as_str()),
            Builtin::Ip => Value::from(entry.ip.as_str()),
            Builtin::PostId => builtin::optional_id(entry.post_id),
            Builtin::ParentId => builtin::optional_id(entry.parent_item_id),
            Builtin::CreatedAt => entry
                .created_at
                .map_or(Value::Null, |dt| Value::from(dt.format("%Y-%m-%d %H:%M:%S").to_string())),
            Builtin::UpdatedAt => entry
                .updated_at
                .map_or(Value::Null, |dt| Value::from(dt.format("%Y-%m-%d %H:%M:%S").to_string())),
            Builtin::CreatedBy => builtin::optional_id(entry.user_id),
            Builtin::UpdatedBy => builtin::optional_id(entry.updated_by),
            Builtin::UserAgent => entry.browser.as_deref().map_or(Value::Null, Value::from),
            Builtin::SiteName | Builtin::SiteUrl | Builtin::AdminEmail | Builtin::PluginUrl | Builtin::Get => {
                Value::Null
            }
        }
    }

    fn builtin_display(
        &self,
        builtin: Builtin,
        attributes: &Attributes,
        ctx: &RenderContext,
    ) -> Result<String, RenderError> {
        if builtin.needs_entry() && ctx.entry.is_none() {
            return Ok(String::new());
        }
        let entry = ctx.entry.as_ref();
        match builtin {
            Builtin::CreatedAt | Builtin::UpdatedAt => {
                let timestamp = entry.and_then(|e| match builtin {
                    Builtin::CreatedAt => e.created_at,
                    _ => e.updated_at,
                });
                let format = attributes.get("format").unwrap_or(&self.config.date_format);
                Ok(timestamp.map(|dt| php_date(&dt, format)).unwrap_or_default())
            }
            Builtin::CreatedBy | Builtin::UpdatedBy => {
                let user_id = self.builtin_raw(builtin, attributes, ctx);
                if user_id.is_null() {
                    return Ok(String::new());
                }
                let user_field = FieldDescriptor::new(0, builtin_key(builtin), FieldType::UserId);
                self.formatter
                    .format(&user_id, &user_field, attributes)
                    .map_err(|source| RenderError::Format { field: user_field.key.clone(), source })
            }
            _ => Ok(value_to_string(&self.builtin_raw(builtin, attributes, ctx), ", ")),
        }
    }
}

fn builtin_key(builtin: Builtin) -> &'static str {
    match builtin {
        Builtin::UpdatedBy => "updated_by",
        _ => "created_by",
    }
}
