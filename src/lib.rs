use std::sync::Arc;

use log::debug;

pub mod config;
pub mod core;
pub mod errors;
pub mod id;
pub mod parser;
pub mod registry;
pub mod renderer;
pub mod scanner;
pub mod types;

pub use config::{EngineConfig, SiteInfo};
pub use crate::core::duplicate::{remap_all, remap_field_ids};
pub use crate::core::field_html::{FieldHtmlArgs, FormInfo};
pub use crate::core::format::{DefaultFormatter, UserRecord};
pub use errors::{ConfigError, FormatError, RenderError, ShortcodeError};
pub use id::FieldKeyGenerator;
pub use parser::{Attributes, parse_attributes};
pub use registry::{
    DisplayFormatter, FieldProvider, NoParams, RequestParamReader, ShortcodeHandler, ShortcodeRegistry,
};
pub use renderer::Pipeline;
pub use scanner::{ScanMode, Tag, TagKind, TagSet};
pub use types::{EntryRecord, FieldDescriptor, FieldType, RenderContext};

use crate::core::resolvers::{BUILTIN_TAGS, ValueResolver};

/// Renders shortcode templates against caller-supplied entry data.
///
/// The engine keeps no per-render state, so one instance can serve any number
/// of renders. Registered shortcodes are shared through an [`Arc`].
pub struct ShortcodeEngine<F: DisplayFormatter, R: RequestParamReader> {
    config: EngineConfig,
    formatter: F,
    params: R,
    registry: Arc<ShortcodeRegistry>,
}

impl<F: DisplayFormatter, R: RequestParamReader> ShortcodeEngine<F, R> {
    pub fn new(config: EngineConfig, formatter: F, params: R) -> Self {
        debug!("Creating shortcode engine for site '{}'", config.site.name);
        Self { config, formatter, params, registry: Arc::new(ShortcodeRegistry::new()) }
    }

    /// Shares an existing registry instead of starting with an empty one.
    pub fn with_registry(mut self, registry: Arc<ShortcodeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Swaps the request parameters, e.g. for the next request.
    pub fn with_params<P: RequestParamReader>(self, params: P) -> ShortcodeEngine<F, P> {
        ShortcodeEngine { config: self.config, formatter: self.formatter, params, registry: self.registry }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ShortcodeRegistry> {
        &self.registry
    }

    pub fn register_shortcode<H>(&self, name: &str, handler: H) -> &Self
    where
        H: Fn(&Attributes, Option<&str>) -> Result<String, ShortcodeError> + Send + Sync + 'static,
    {
        self.registry.register_fn(name, handler);
        self
    }

    pub fn pipeline(&self) -> Pipeline<'_> {
        let resolver = ValueResolver::new(&self.config, &self.formatter, &self.params);
        Pipeline::new(&self.config, resolver, &self.registry)
    }

    pub fn render(&self, template: &str, ctx: &RenderContext) -> Result<String, RenderError> {
        self.pipeline().render(template, ctx)
    }

    pub fn basic_replace(&self, value: &str) -> String {
        self.pipeline().basic_replace(value)
    }

    pub fn render_field_html(&self, html: &str, args: &FieldHtmlArgs<'_>) -> String {
        self.pipeline().render_field_html(html, args)
    }

    /// Every tag in `template` the engine would act on, in source order.
    pub fn scan<'t>(&self, template: &'t str, ctx: &RenderContext) -> Vec<Tag<'t>> {
        self.tag_set(ctx).scan(template, ScanMode::All).collect()
    }

    /// Built-in names, the context's field ids and keys, and registered shortcodes.
    pub fn tag_set(&self, ctx: &RenderContext) -> TagSet {
        TagSet::new(
            BUILTIN_TAGS
                .iter()
                .map(|t| t.to_string())
                .chain(ctx.field_tag_names())
                .chain(self.registry.names()),
        )
    }
}

impl ShortcodeEngine<DefaultFormatter, NoParams> {
    /// An engine using the bundled formatter and no request parameters.
    pub fn with_config(config: EngineConfig) -> Self {
        let formatter = DefaultFormatter::new(&config);
        Self::new(config, formatter, NoParams)
    }
}
