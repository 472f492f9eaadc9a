use serde::Deserialize;

use crate::errors::ConfigError;

/// Site constants exposed through built-in shortcodes.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SiteInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub admin_email: String,
    #[serde(default)]
    pub plugin_url: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub site: SiteInfo,
    /// PHP-style date format used when a tag has no `format` attribute.
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_separator")]
    pub default_separator: String,
    /// Whether the generic shortcode pass runs at all.
    #[serde(default = "default_true")]
    pub do_html_shortcodes: bool,
    /// Upper bound on conditional re-scans and foreach nesting.
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
}

fn default_date_format() -> String {
    "F j, Y".to_string()
}

fn default_separator() -> String {
    ", ".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_passes() -> usize {
    16
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            site: SiteInfo::default(),
            date_format: default_date_format(),
            default_separator: default_separator(),
            do_html_shortcodes: true,
            max_passes: default_max_passes(),
        }
    }
}

impl EngineConfig {
    pub fn from_json(raw: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_passes == 0 {
            return Err(ConfigError::Invalid("max_passes must be at least 1".to_string()));
        }
        if self.date_format.trim().is_empty() {
            return Err(ConfigError::Invalid("date_format must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn with_site(mut self, site: SiteInfo) -> Self {
        self.site = site;
        self
    }
}
