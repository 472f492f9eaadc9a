// src/parser.rs
use log::{trace, warn};
use pest::Parser;
use pest::iterators::Pair;
use pest_derive::Parser;

#[derive(Parser)]
#[grammar = "parser.pest"]
struct AttributeParser;

/// Attributes of one shortcode, in source order.
///
/// Named keys are lower-cased. Words without a `=` are kept as positional
/// flags, so `[foo bar baz=1]` yields the flag `bar` and the pair `baz=1`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Attributes {
    named: Vec<(String, String)>,
    positional: Vec<String>,
}

impl Attributes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a named attribute. A repeated key resolves to its last value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.named
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Sets a named attribute, replacing every earlier value for the key.
    pub fn insert(&mut self, key: &str, value: &str) {
        let key = key.to_lowercase();
        self.named.retain(|(k, _)| *k != key);
        self.named.push((key, value.to_string()));
    }

    pub fn positional(&self) -> &[String] {
        &self.positional
    }

    pub fn has_flag(&self, flag: &str) -> bool {
        self.positional.iter().any(|p| p == flag)
    }
}

/// Parses the raw text between a tag name and its closing bracket.
///
/// Never fails: broken quoting degrades to positional flags.
pub fn parse_attributes(raw: &str) -> Attributes {
    let text = raw.replace(['\u{a0}', '\u{200b}'], " ");
    let text = text.trim();
    if text.is_empty() {
        return Attributes::new();
    }

    match AttributeParser::parse(Rule::attributes, text) {
        Ok(mut pairs) => {
            let mut atts = Attributes::new();
            if let Some(root) = pairs.next() {
                for item in root.into_inner() {
                    collect_item(item, &mut atts);
                }
            }
            trace!("Parsed attributes {:?} from {:?}", atts, raw);
            atts
        }
        // Unreachable in practice: `bare` accepts any run of non-space characters.
        Err(e) => {
            warn!("Attribute grammar rejected {:?}: {}", raw, e);
            Attributes::new()
        }
    }
}

fn collect_item(item: Pair<Rule>, atts: &mut Attributes) {
    match item.as_rule() {
        Rule::pair => {
            let mut inner = item.into_inner();
            let key = inner.next().map(|k| k.as_str().to_string()).unwrap_or_default();
            let value = inner.next().map(value_text).unwrap_or_default();
            atts.named.push((key.to_lowercase(), value));
        }
        Rule::double_quoted | Rule::single_quoted => atts.positional.push(value_text(item)),
        Rule::bare => atts.positional.push(item.as_str().to_string()),
        Rule::EOI => (),
        rule => trace!("Ignoring unexpected attribute rule {:?}", rule),
    }
}

fn value_text(pair: Pair<Rule>) -> String {
    match pair.as_rule() {
        Rule::double_quoted | Rule::single_quoted => pair
            .into_inner()
            .next()
            .map(|inner| inner.as_str().to_string())
            .unwrap_or_default(),
        _ => pair.as_str().to_string(),
    }
}
