// src/renderer.rs
use std::ops::Range;

use log::{debug, trace, warn};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::core::conditions::Condition;
use crate::core::resolvers::{BUILTIN_TAGS, ValueResolver};
use crate::errors::RenderError;
use crate::registry::{FieldProvider, ShortcodeRegistry};
use crate::scanner::{ScanMode, TagSet};
use crate::types::{EntryRecord, RenderContext, is_blank};

/// One render's worth of collaborators. Holds no state between renders.
pub struct Pipeline<'e> {
    config: &'e EngineConfig,
    resolver: ValueResolver<'e>,
    registry: &'e ShortcodeRegistry,
}

impl<'e> Pipeline<'e> {
    pub fn new(config: &'e EngineConfig, resolver: ValueResolver<'e>, registry: &'e ShortcodeRegistry) -> Self {
        Self { config, resolver, registry }
    }

    /// Conditionals, then loops, then plain tags, then registered shortcodes.
    pub fn render(&self, template: &str, ctx: &RenderContext) -> Result<String, RenderError> {
        let resolved = self.render_entry(template, ctx, 0)?;
        Ok(self.generic_pass(&resolved))
    }

    /// `[sitename]` and registered shortcodes only.
    pub fn basic_replace(&self, value: &str) -> String {
        let value = if value.contains("[sitename]") {
            value.replace("[sitename]", &self.config.site.name)
        } else {
            value.to_string()
        };
        self.generic_pass(&value)
    }

    fn render_entry(&self, template: &str, ctx: &RenderContext, depth: usize) -> Result<String, RenderError> {
        let tags = TagSet::new(BUILTIN_TAGS.iter().map(|t| t.to_string()).chain(ctx.field_tag_names()));
        trace!("Rendering {} bytes at depth {} against {} tag names", template.len(), depth, tags.names().len());

        let text = self.conditional_pass(template, &tags, ctx);
        let text = self.foreach_pass(&text, &tags, ctx, depth)?;
        self.plain_pass(&text, &tags, ctx)
    }

    /// Resolves `[if X]` blocks outermost first, re-scanning until nothing changes.
    pub(crate) fn conditional_pass(&self, template: &str, tags: &TagSet, ctx: &RenderContext) -> String {
        let mut text = template.to_string();
        for pass in 0..self.config.max_passes {
            let mut replacements = Vec::new();
            for tag in tags.scan(&text, ScanMode::Conditionals) {
                let Some(value) = self.resolver.raw_value(tag.name, &tag.attributes, ctx) else {
                    continue;
                };
                let keep = Condition::from_attributes(&tag.attributes).holds(&value);
                trace!("[if {}] -> {}", tag.name, if keep { "shown" } else { "removed" });
                let body = if keep { tag.body.unwrap_or_default().to_string() } else { String::new() };
                replacements.push((tag.span.clone(), body));
            }
            if replacements.is_empty() {
                return text;
            }
            debug!("Conditional pass {} resolved {} blocks", pass + 1, replacements.len());
            text = splice(&text, replacements);
        }
        warn!("Conditional blocks still unresolved after {} passes", self.config.max_passes);
        text
    }

    fn foreach_pass(&self, text: &str, tags: &TagSet, ctx: &RenderContext, depth: usize) -> Result<String, RenderError> {
        let mut replacements = Vec::new();
        for tag in tags.scan(text, ScanMode::Foreach) {
            let Some(value) = self.resolver.raw_value(tag.name, &tag.attributes, ctx) else {
                continue;
            };
            if depth + 1 >= self.config.max_passes {
                warn!("[foreach {}] nested too deep, left as text", tag.name);
                continue;
            }
            let body = tag.body.unwrap_or_default();
            let mut rendered = String::new();
            for child in child_contexts(ctx, tag.name, value) {
                rendered.push_str(&self.render_entry(body, &child, depth + 1)?);
            }
            replacements.push((tag.span.clone(), rendered));
        }
        Ok(splice(text, replacements))
    }

    fn plain_pass(&self, text: &str, tags: &TagSet, ctx: &RenderContext) -> Result<String, RenderError> {
        let mut replacements = Vec::new();
        for tag in tags.scan(text, ScanMode::Plain) {
            if let Some(replacement) = self.resolver.display_value(tag.name, &tag.attributes, ctx)? {
                replacements.push((tag.span.clone(), replacement));
            }
        }
        Ok(splice(text, replacements))
    }

    /// Runs registered shortcodes. A failing handler leaves its tag in place.
    pub fn generic_pass(&self, text: &str) -> String {
        if !self.config.do_html_shortcodes || self.registry.is_empty() {
            return text.to_string();
        }
        let tags = TagSet::new(self.registry.names());
        let mut replacements = Vec::new();
        for tag in tags.scan(text, ScanMode::Enclosing) {
            let Some(handler) = self.registry.handler(tag.name) else {
                continue;
            };
            match handler.render(&tag.attributes, tag.body) {
                Ok(output) => replacements.push((tag.span.clone(), output)),
                Err(e) => warn!("Shortcode [{}] failed, left as text: {}", tag.name, e),
            }
        }
        splice(text, replacements)
    }
}

/// One context per loop item. Object items overlay the entry's values; scalars
/// stand in for the looped field itself.
fn child_contexts(ctx: &RenderContext, name: &str, value: Value) -> Vec<RenderContext> {
    let items = match value {
        Value::Array(items) => items,
        blank if is_blank(&blank) => Vec::new(),
        single => vec![single],
    };
    let looped_key = ctx.get_field(name).map(|f| f.id.to_string());

    items
        .into_iter()
        .map(|item| {
            let mut entry: EntryRecord = ctx.entry.clone().unwrap_or_default();
            match item {
                Value::Object(values) => {
                    for (key, value) in values {
                        // Stored under the field id so it shadows the parent's value.
                        let key = ctx.get_field(&key).map_or(key, |f| f.id.to_string());
                        entry.metas.insert(key, value);
                    }
                }
                scalar => {
                    entry.metas.insert(looped_key.clone().unwrap_or_else(|| name.to_string()), scalar);
                }
            }
            RenderContext { entry: Some(entry), fields: ctx.fields.clone(), form_meta: ctx.form_meta.clone() }
        })
        .collect()
}

/// Rebuilds `text` with each span swapped for its replacement. Spans are in
/// scan order and never overlap.
pub(crate) fn splice(text: &str, replacements: Vec<(Range<usize>, String)>) -> String {
    if replacements.is_empty() {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (span, replacement) in replacements {
        out.push_str(&text[cursor..span.start]);
        out.push_str(&replacement);
        cursor = span.end;
    }
    out.push_str(&text[cursor..]);
    out
}
