pub mod conditions;
pub mod duplicate;
pub mod field_html;
pub mod format;
pub mod resolvers;
