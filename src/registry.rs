use std::{
    collections::HashMap,
    fmt::Debug,
    sync::{Arc, PoisonError, RwLock},
};

use log::{debug, trace};
use serde_json::Value;

use crate::{
    errors::{FormatError, ShortcodeError},
    parser::Attributes,
    types::{FieldDescriptor, RenderContext},
};

// --- Host collaborator traits ---

/// Looks up field definitions by numeric id or key.
pub trait FieldProvider {
    fn get_field(&self, id_or_key: &str) -> Option<&FieldDescriptor>;
}

impl FieldProvider for [FieldDescriptor] {
    fn get_field(&self, id_or_key: &str) -> Option<&FieldDescriptor> {
        let id_or_key = id_or_key.trim();
        match id_or_key.parse::<u64>() {
            Ok(id) => self.iter().find(|f| f.id == id).or_else(|| self.iter().find(|f| f.key == id_or_key)),
            Err(_) => self.iter().find(|f| f.key == id_or_key),
        }
    }
}

impl FieldProvider for RenderContext {
    fn get_field(&self, id_or_key: &str) -> Option<&FieldDescriptor> {
        self.fields.as_slice().get_field(id_or_key)
    }
}

/// Type-specific display of a stored field value.
pub trait DisplayFormatter {
    fn format(&self, value: &Value, field: &FieldDescriptor, attributes: &Attributes) -> Result<String, FormatError>;
}

/// Read access to the current request's query/form parameters.
pub trait RequestParamReader {
    fn get(&self, name: &str) -> Option<Value>;
}

impl RequestParamReader for HashMap<String, Value> {
    fn get(&self, name: &str) -> Option<Value> {
        HashMap::get(self, name).cloned()
    }
}

/// A request without parameters.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoParams;

impl RequestParamReader for NoParams {
    fn get(&self, _name: &str) -> Option<Value> {
        None
    }
}

// --- Generic shortcodes ---

/// A host-registered shortcode run by the generic pass.
///
/// `content` is set for enclosing use (`[name]content[/name]`).
pub trait ShortcodeHandler: Send + Sync {
    fn render(&self, attributes: &Attributes, content: Option<&str>) -> Result<String, ShortcodeError>;
}

impl<F> ShortcodeHandler for F
where
    F: Fn(&Attributes, Option<&str>) -> Result<String, ShortcodeError> + Send + Sync,
{
    fn render(&self, attributes: &Attributes, content: Option<&str>) -> Result<String, ShortcodeError> {
        self(attributes, content)
    }
}

#[derive(Default)]
pub struct ShortcodeRegistry {
    handlers: RwLock<HashMap<String, Arc<dyn ShortcodeHandler>>>,
}

impl Debug for ShortcodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShortcodeRegistry").field("names", &self.names()).finish()
    }
}

impl ShortcodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the handler for `name`.
    pub fn register(&self, name: &str, handler: Arc<dyn ShortcodeHandler>) {
        debug!("Registering shortcode: {}", name);
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), handler);
    }

    /// Registers a closure as the handler for `name`.
    pub fn register_fn<F>(&self, name: &str, handler: F)
    where
        F: Fn(&Attributes, Option<&str>) -> Result<String, ShortcodeError> + Send + Sync + 'static,
    {
        self.register(name, Arc::new(handler));
    }

    pub fn unregister(&self, name: &str) -> bool {
        trace!("Removing shortcode: {}", name);
        self.handlers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
            .is_some()
    }

    pub fn handler(&self, name: &str) -> Option<Arc<dyn ShortcodeHandler>> {
        self.handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .handlers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().unwrap_or_else(PoisonError::into_inner).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FieldType;

    #[test]
    fn field_lookup_by_id_or_key() {
        let fields = vec![
            FieldDescriptor::new(12, "email", FieldType::Email),
            FieldDescriptor::new(13, "42", FieldType::Text),
        ];
        assert_eq!(fields.as_slice().get_field("12").map(|f| f.key.as_str()), Some("email"));
        assert_eq!(fields.as_slice().get_field("email").map(|f| f.id), Some(12));
        // A numeric key still resolves when no field has that id.
        assert_eq!(fields.as_slice().get_field("42").map(|f| f.id), Some(13));
        assert!(fields.as_slice().get_field("missing").is_none());
    }

    #[test]
    fn closures_register_as_handlers() {
        let registry = ShortcodeRegistry::new();
        registry.register_fn("upper", |_, content| Ok(content.unwrap_or_default().to_uppercase()));
        let handler = registry.handler("upper").unwrap();
        assert_eq!(handler.render(&Attributes::new(), Some("abc")).unwrap(), "ABC");
        assert_eq!(registry.names(), vec!["upper".to_string()]);
        assert!(registry.unregister("upper"));
        assert!(registry.is_empty());
    }
}
