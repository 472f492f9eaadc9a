use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer, de};
use serde_json::{Map, Value};

macro_rules! field_types {
    ($($variant:ident => $name:literal),* $(,)?) => {
        /// Field types the engine knows how to display. Anything else is kept by name.
        #[derive(Clone, Debug, PartialEq, Eq)]
        pub enum FieldType {
            $($variant,)*
            Other(String),
        }

        impl FieldType {
            pub fn as_str(&self) -> &str {
                match self {
                    $(FieldType::$variant => $name,)*
                    FieldType::Other(name) => name.as_str(),
                }
            }
        }

        impl From<&str> for FieldType {
            fn from(value: &str) -> Self {
                match value {
                    $($name => FieldType::$variant,)*
                    other => FieldType::Other(other.to_string()),
                }
            }
        }
    };
}

field_types! {
    Text => "text",
    Textarea => "textarea",
    Email => "email",
    Url => "url",
    Number => "number",
    Phone => "phone",
    Date => "date",
    Time => "time",
    Hidden => "hidden",
    Checkbox => "checkbox",
    Radio => "radio",
    Select => "select",
    Lookup => "lookup",
    Scale => "scale",
    UserId => "user_id",
    Html => "html",
    Divider => "divider",
    Break => "break",
    Captcha => "captcha",
    File => "file",
}

impl FieldType {
    /// Types whose stored value may hold several options.
    pub fn is_multi_value(&self) -> bool {
        matches!(self, FieldType::Checkbox | FieldType::Select | FieldType::Radio | FieldType::Lookup)
    }
}

impl From<String> for FieldType {
    fn from(value: String) -> Self {
        FieldType::from(value.as_str())
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(FieldType::from(name))
    }
}

/// A single input definition within a form.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct FieldDescriptor {
    pub id: u64,
    #[serde(alias = "field_key")]
    pub key: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default = "default_required_indicator")]
    pub required_indicator: String,
}

fn default_required_indicator() -> String {
    "*".to_string()
}

impl FieldDescriptor {
    pub fn new(id: u64, key: &str, field_type: FieldType) -> Self {
        Self {
            id,
            key: key.to_string(),
            field_type,
            name: String::new(),
            description: String::new(),
            required: false,
            required_indicator: default_required_indicator(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn required(mut self, indicator: &str) -> Self {
        self.required = true;
        self.required_indicator = indicator.to_string();
        self
    }
}

/// A single submitted record of a form.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct EntryRecord {
    pub id: u64,
    #[serde(default)]
    pub item_key: String,
    #[serde(default)]
    pub ip: String,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub created_at: Option<NaiveDateTime>,
    #[serde(default, deserialize_with = "deserialize_timestamp")]
    pub updated_at: Option<NaiveDateTime>,
    #[serde(default)]
    pub user_id: Option<u64>,
    #[serde(default)]
    pub updated_by: Option<u64>,
    #[serde(default)]
    pub post_id: Option<u64>,
    #[serde(default)]
    pub parent_item_id: Option<u64>,
    #[serde(default)]
    pub browser: Option<String>,
    /// Stored values keyed by field id (or field key).
    #[serde(default)]
    pub metas: BTreeMap<String, Value>,
}

impl EntryRecord {
    pub fn new(id: u64, item_key: &str) -> Self {
        Self { id, item_key: item_key.to_string(), ..Default::default() }
    }

    pub fn with_meta(mut self, field_id: impl ToString, value: Value) -> Self {
        self.metas.insert(field_id.to_string(), value);
        self
    }

    /// The stored value for a field, looked up by id first and key second.
    pub fn meta(&self, field: &FieldDescriptor) -> Option<&Value> {
        self.metas
            .get(&field.id.to_string())
            .or_else(|| self.metas.get(&field.key))
    }
}

/// Everything a render reads. Never mutated by the engine.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct RenderContext {
    #[serde(default)]
    pub entry: Option<EntryRecord>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
    #[serde(default)]
    pub form_meta: Map<String, Value>,
}

impl RenderContext {
    pub fn new(fields: Vec<FieldDescriptor>) -> Self {
        Self { entry: None, fields, form_meta: Map::new() }
    }

    pub fn with_entry(mut self, entry: EntryRecord) -> Self {
        self.entry = Some(entry);
        self
    }

    /// Shortcode names contributed by the field set: every id and every key.
    pub fn field_tag_names(&self) -> Vec<String> {
        self.fields
            .iter()
            .flat_map(|field| [field.id.to_string(), field.key.clone()])
            .filter(|name| !name.is_empty())
            .collect()
    }
}

/// Parses the timestamp shapes entries arrive with: MySQL, ISO-8601 or a bare date.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];
    let raw = raw.trim();
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

fn deserialize_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveDateTime>, D::Error> {
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_timestamp(s)
            .map(Some)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp '{}'", s))),
    }
}

/// Flattens a stored value into display text, joining lists with `sep`.
pub fn value_to_string(value: &Value, sep: &str) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(true) => "1".to_string(),
        Value::Bool(false) => String::new(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(|item| value_to_string(item, sep))
            .collect::<Vec<_>>()
            .join(sep),
        Value::Object(map) => map
            .values()
            .map(|item| value_to_string(item, sep))
            .collect::<Vec<_>>()
            .join(sep),
    }
}

/// True when the value would display as nothing. `"0"` is a value.
pub fn is_blank(value: &Value) -> bool {
    value_to_string(value, "").trim().is_empty()
}
