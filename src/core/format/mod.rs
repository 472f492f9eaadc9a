use std::collections::HashMap;

use chrono::NaiveDate;
use log::trace;
use serde::Deserialize;
use serde_json::Value;

use crate::config::EngineConfig;
use crate::errors::FormatError;
use crate::parser::Attributes;
use crate::registry::DisplayFormatter;
use crate::types::{FieldDescriptor, FieldType, parse_timestamp, value_to_string};

pub mod dates;

pub use dates::php_date;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct UserRecord {
    pub id: u64,
    #[serde(default)]
    pub user_login: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl UserRecord {
    fn info(&self, show: &str) -> String {
        match show {
            "id" | "ID" => self.id.to_string(),
            "user_login" => self.user_login.clone(),
            "display_name" => self.display_name.clone(),
            "user_email" => self.user_email.clone(),
            "first_name" => self.first_name.clone(),
            "last_name" => self.last_name.clone(),
            _ => String::new(),
        }
    }
}

/// Display rules for the built-in field types.
#[derive(Debug, Clone)]
pub struct DefaultFormatter {
    date_format: String,
    separator: String,
    site_url: String,
    users: HashMap<u64, UserRecord>,
}

impl DefaultFormatter {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            date_format: config.date_format.clone(),
            separator: config.default_separator.clone(),
            site_url: config.site.url.trim_end_matches('/').to_string(),
            users: HashMap::new(),
        }
    }

    pub fn with_users(mut self, users: impl IntoIterator<Item = UserRecord>) -> Self {
        self.users.extend(users.into_iter().map(|u| (u.id, u)));
        self
    }

    /// A user attribute for display, falling back to the login name unless `blank` is set.
    pub fn user_info(&self, user_id: u64, attributes: &Attributes) -> String {
        let Some(user) = self.users.get(&user_id) else {
            trace!("No user {} for display", user_id);
            return String::new();
        };
        let show = attributes.get("show").unwrap_or("display_name");
        let mut info = user.info(show);
        if info.is_empty() && !is_truthy(attributes.get("blank")) {
            info = user.user_login.clone();
        }
        if is_truthy(attributes.get("link")) || attributes.has_flag("link") {
            info = format!(
                "<a href=\"{}/wp-admin/user-edit.php?user_id={}\">{}</a>",
                self.site_url, user_id, info
            );
        }
        info
    }

    fn format_date(&self, value: &Value, attributes: &Attributes, sep: &str) -> String {
        let format = attributes.get("format").unwrap_or(&self.date_format);
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| self.format_date(item, attributes, sep))
                .collect::<Vec<_>>()
                .join(sep),
            other => {
                let raw = value_to_string(other, sep);
                match NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .or_else(|| parse_timestamp(&raw))
                {
                    Some(dt) => php_date(&dt, format),
                    None => raw,
                }
            }
        }
    }

    fn format_users(&self, value: &Value, attributes: &Attributes, sep: &str) -> String {
        match value {
            Value::Array(items) => items
                .iter()
                .map(|item| self.format_users(item, attributes, sep))
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(sep),
            other => match user_id_of(other) {
                Some(id) => self.user_info(id, attributes),
                None => String::new(),
            },
        }
    }

    fn format_number(&self, value: &Value, attributes: &Attributes, sep: &str) -> Result<String, FormatError> {
        let raw = value_to_string(value, sep);
        let Some(decimals) = attributes.get("decimal") else {
            return Ok(raw);
        };
        let decimals: usize = decimals
            .trim()
            .parse()
            .ok()
            .filter(|d| *d <= MAX_DECIMALS)
            .ok_or_else(|| FormatError::InvalidAttribute {
                name: "decimal".to_string(),
                value: decimals.to_string(),
            })?;
        let Ok(number) = raw.trim().parse::<f64>() else {
            return Ok(raw);
        };
        Ok(number_format(
            number,
            decimals,
            attributes.get("dec_point").unwrap_or("."),
            attributes.get("thousands_sep").unwrap_or(","),
        ))
    }
}

impl DisplayFormatter for DefaultFormatter {
    fn format(&self, value: &Value, field: &FieldDescriptor, attributes: &Attributes) -> Result<String, FormatError> {
        let sep = attributes.get("sep").unwrap_or(&self.separator);
        match field.field_type {
            FieldType::Date => Ok(self.format_date(value, attributes, sep)),
            FieldType::UserId => Ok(self.format_users(value, attributes, sep)),
            FieldType::Number => self.format_number(value, attributes, sep),
            _ => Ok(value_to_string(value, sep)),
        }
    }
}

fn user_id_of(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn is_truthy(flag: Option<&str>) -> bool {
    matches!(flag.map(str::trim), Some(v) if !v.is_empty() && v != "0" && !v.eq_ignore_ascii_case("false"))
}

/// Largest `decimal` attribute accepted for number fields.
pub const MAX_DECIMALS: usize = 20;

/// PHP's `number_format`: fixed decimals, grouped thousands.
pub fn number_format(number: f64, decimals: usize, dec_point: &str, thousands_sep: &str) -> String {
    let decimals = decimals.min(MAX_DECIMALS);
    let fixed = format!("{:.*}", decimals, php_round(number, decimals).abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let digits: Vec<char> = int_part.chars().collect();
    let mut grouped = String::with_capacity(fixed.len() + digits.len() / 3);
    for (i, digit) in digits.iter().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push_str(thousands_sep);
        }
        grouped.push(*digit);
    }
    if let Some(frac) = frac_part {
        grouped.push_str(dec_point);
        grouped.push_str(frac);
    }

    let is_zero = fixed.chars().all(|c| c == '0' || c == '.');
    if number < 0.0 && !is_zero {
        grouped.insert(0, '-');
    }
    grouped
}

/// Rounds half away from zero after trimming the scaled value to 15
/// significant digits, so `1.005` at two places gives `1.01`.
fn php_round(number: f64, places: usize) -> f64 {
    let factor = 10f64.powi(places as i32);
    let scaled = number * factor;
    if !scaled.is_finite() {
        return number;
    }
    let scaled = format!("{:.14e}", scaled).parse::<f64>().unwrap_or(scaled);
    scaled.round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_attributes;
    use serde_json::json;

    fn formatter() -> DefaultFormatter {
        let mut config = EngineConfig::default();
        config.site.url = "https://example.test/".to_string();
        DefaultFormatter::new(&config).with_users([UserRecord {
            id: 4,
            user_login: "jdoe".to_string(),
            display_name: "Jane Doe".to_string(),
            ..Default::default()
        }])
    }

    #[test]
    fn multi_values_join_with_sep() {
        let field = FieldDescriptor::new(1, "colors", FieldType::Checkbox);
        let out = formatter().format(&json!(["a", "b"]), &field, &parse_attributes(r#"sep="|""#)).unwrap();
        assert_eq!(out, "a|b");
        let out = formatter().format(&json!(["a", "b"]), &field, &Attributes::new()).unwrap();
        assert_eq!(out, "a, b");
    }

    #[test]
    fn dates_use_format_attribute_or_default() {
        let field = FieldDescriptor::new(2, "dob", FieldType::Date);
        let f = formatter();
        assert_eq!(f.format(&json!("2024-03-05"), &field, &Attributes::new()).unwrap(), "March 5, 2024");
        assert_eq!(
            f.format(&json!("2024-03-05"), &field, &parse_attributes("format=d/m/Y")).unwrap(),
            "05/03/2024"
        );
        assert_eq!(f.format(&json!("soon"), &field, &Attributes::new()).unwrap(), "soon");
    }

    #[test]
    fn user_ids_expand_to_names() {
        let field = FieldDescriptor::new(3, "owner", FieldType::UserId);
        let f = formatter();
        assert_eq!(f.format(&json!(4), &field, &Attributes::new()).unwrap(), "Jane Doe");
        assert_eq!(f.format(&json!("4"), &field, &parse_attributes("show=id")).unwrap(), "4");
        // Empty info falls back to the login.
        assert_eq!(f.format(&json!(4), &field, &parse_attributes("show=first_name")).unwrap(), "jdoe");
        assert_eq!(f.format(&json!(4), &field, &parse_attributes("show=first_name blank=1")).unwrap(), "");
        assert_eq!(f.format(&json!(99), &field, &Attributes::new()).unwrap(), "");
        assert_eq!(
            f.format(&json!(4), &field, &parse_attributes("link=1")).unwrap(),
            "<a href=\"https://example.test/wp-admin/user-edit.php?user_id=4\">Jane Doe</a>"
        );
        assert_eq!(
            f.format(&json!(4), &field, &parse_attributes("link show=user_login")).unwrap(),
            "<a href=\"https://example.test/wp-admin/user-edit.php?user_id=4\">jdoe</a>"
        );
    }

    #[test]
    fn numbers_format_with_decimal_attribute() {
        let field = FieldDescriptor::new(5, "total", FieldType::Number);
        let f = formatter();
        assert_eq!(f.format(&json!("1234567.891"), &field, &Attributes::new()).unwrap(), "1234567.891");
        assert_eq!(
            f.format(&json!("1234567.891"), &field, &parse_attributes("decimal=2")).unwrap(),
            "1,234,567.89"
        );
        assert_eq!(
            f.format(&json!(-1234.5), &field, &parse_attributes(r#"decimal=1 dec_point="," thousands_sep=".""#))
                .unwrap(),
            "-1.234,5"
        );
        assert_eq!(
            f.format(&json!("3"), &field, &parse_attributes("decimal=two")),
            Err(FormatError::InvalidAttribute { name: "decimal".to_string(), value: "two".to_string() })
        );
    }

    #[test]
    fn number_format_edges() {
        assert_eq!(number_format(0.0, 2, ".", ","), "0.00");
        assert_eq!(number_format(-0.001, 2, ".", ","), "0.00");
        assert_eq!(number_format(999.0, 0, ".", ","), "999");
        assert_eq!(number_format(1000.0, 0, ".", " "), "1 000");
    }

    #[test]
    fn number_format_rounds_half_away_from_zero() {
        assert_eq!(number_format(0.125, 2, ".", ","), "0.13");
        assert_eq!(number_format(2.5, 0, ".", ","), "3");
        assert_eq!(number_format(-2.5, 0, ".", ","), "-3");
        assert_eq!(number_format(1.005, 2, ".", ","), "1.01");
        assert_eq!(number_format(1234.5, 2, ".", ","), "1,234.50");
    }

    #[test]
    fn oversized_decimal_is_rejected() {
        let field = FieldDescriptor::new(5, "total", FieldType::Number);
        assert_eq!(
            formatter().format(&json!("2.5"), &field, &parse_attributes("decimal=999999999999")),
            Err(FormatError::InvalidAttribute { name: "decimal".to_string(), value: "999999999999".to_string() })
        );
        assert_eq!(formatter().format(&json!("2.5"), &field, &parse_attributes("decimal=20")).unwrap().len(), 22);
    }
}
