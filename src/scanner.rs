use std::ops::Range;

use log::trace;
use regex::Regex;

use crate::parser::{Attributes, parse_attributes};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagKind {
    Plain,
    Conditional,
    Foreach,
}

impl TagKind {
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            TagKind::Plain => None,
            TagKind::Conditional => Some("if"),
            TagKind::Foreach => Some("foreach"),
        }
    }
}

/// Which tags a scan yields.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanMode {
    All,
    Conditionals,
    Foreach,
    Plain,
    /// Keywordless tags, each with the body up to a matching `[/name]` when one follows.
    Enclosing,
}

impl ScanMode {
    fn accepts(&self, kind: TagKind) -> bool {
        matches!(
            (self, kind),
            (ScanMode::All, _)
                | (ScanMode::Conditionals, TagKind::Conditional)
                | (ScanMode::Foreach, TagKind::Foreach)
                | (ScanMode::Plain, TagKind::Plain)
                | (ScanMode::Enclosing, TagKind::Plain)
        )
    }
}

/// One bracketed token found in a template.
#[derive(Clone, Debug, PartialEq)]
pub struct Tag<'t> {
    pub name: &'t str,
    pub attributes: Attributes,
    pub kind: TagKind,
    /// Text between the open and close tag of a block.
    pub body: Option<&'t str>,
    /// The full source text of the tag, including the body and close tag of a block.
    pub raw: &'t str,
    pub span: Range<usize>,
}

impl Tag<'_> {
    pub fn is_conditional(&self) -> bool {
        self.kind == TagKind::Conditional
    }

    pub fn is_foreach(&self) -> bool {
        self.kind == TagKind::Foreach
    }
}

/// The set of tag names a template is scanned for.
#[derive(Clone, Debug)]
pub struct TagSet {
    pattern: Option<Regex>,
    names: Vec<String>,
}

impl TagSet {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: Vec<String> = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        names.dedup();

        let pattern = if names.is_empty() {
            None
        } else {
            let alternation = names.iter().map(|n| regex::escape(n)).collect::<Vec<_>>().join("|");
            // Every name is escaped, so the pattern is always valid. A name must be
            // followed by whitespace, `/` or `]`: `[name-2]` is not `[name]`.
            Regex::new(&format!(r"\[(?:(if|foreach)\s+)?({})((?:\s[^\]]*?)?)(/)?\]", alternation)).ok()
        };

        Self { pattern, names }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }

    /// Lazily scans `text` for tags in this set, left to right.
    pub fn scan<'s, 't>(&'s self, text: &'t str, mode: ScanMode) -> TagScanner<'s, 't> {
        TagScanner { pattern: self.pattern.as_ref(), text, pos: 0, mode }
    }
}

pub struct TagScanner<'s, 't> {
    pattern: Option<&'s Regex>,
    text: &'t str,
    pos: usize,
    mode: ScanMode,
}

impl<'t> Iterator for TagScanner<'_, 't> {
    type Item = Tag<'t>;

    fn next(&mut self) -> Option<Tag<'t>> {
        let pattern = self.pattern?;
        let text = self.text;
        loop {
            if self.pos >= text.len() {
                return None;
            }
            let caps = pattern.captures_at(text, self.pos)?;
            let open = caps.get(0)?;
            let name = caps.get(2)?.as_str();
            let raw_attributes = caps.get(3).map_or("", |m| m.as_str());
            let kind = match caps.get(1).map(|m| m.as_str()) {
                Some("if") => TagKind::Conditional,
                Some("foreach") => TagKind::Foreach,
                _ => TagKind::Plain,
            };

            let Some(keyword) = kind.keyword() else {
                self.pos = open.end();
                if !self.mode.accepts(kind) {
                    continue;
                }
                let self_closing = caps.get(4).is_some();
                let close = match self.mode {
                    ScanMode::Enclosing if !self_closing => find_close(text, open.end(), None, name),
                    _ => None,
                };
                let tag = match close {
                    Some(close) => {
                        self.pos = close.end;
                        Tag {
                            name,
                            attributes: parse_attributes(raw_attributes),
                            kind,
                            body: Some(&text[open.end()..close.start]),
                            raw: &text[open.start()..close.end],
                            span: open.start()..close.end,
                        }
                    }
                    None => Tag {
                        name,
                        attributes: parse_attributes(raw_attributes),
                        kind,
                        body: None,
                        raw: open.as_str(),
                        span: open.range(),
                    },
                };
                return Some(tag);
            };

            match find_close(text, open.end(), Some(keyword), name) {
                Some(close) => {
                    if self.mode.accepts(kind) {
                        self.pos = close.end;
                        return Some(Tag {
                            name,
                            attributes: parse_attributes(raw_attributes),
                            kind,
                            body: Some(&text[open.end()..close.start]),
                            raw: &text[open.start()..close.end],
                            span: open.start()..close.end,
                        });
                    }
                    // Blocks of another kind are skipped whole, unless only plain tags are wanted.
                    self.pos = match self.mode {
                        ScanMode::Plain | ScanMode::Enclosing => open.end(),
                        _ => close.end,
                    };
                }
                None => {
                    trace!("Unclosed [{} {}] at {} left as text", keyword, name, open.start());
                    self.pos = open.end();
                }
            }
        }
    }
}

/// Finds the first `[/keyword name]` (or `[/name]` without a keyword) at or after `from`.
fn find_close(text: &str, from: usize, keyword: Option<&str>, name: &str) -> Option<Range<usize>> {
    let mut offset = from;
    while let Some(found) = text[offset..].find("[/") {
        let start = offset + found;
        let rest = &text[start + 2..];
        let after_name = match keyword {
            Some(keyword) => rest
                .strip_prefix(keyword)
                .and_then(|r| {
                    let trimmed = r.trim_start();
                    (trimmed.len() < r.len()).then_some(trimmed)
                })
                .and_then(|r| r.strip_prefix(name)),
            None => rest.strip_prefix(name),
        };
        if let Some(after_name) = after_name {
            if after_name.starts_with(']') {
                return Some(start..text.len() - after_name.len() + 1);
            }
        }
        offset = start + 2;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names() -> TagSet {
        TagSet::new(["25", "name", "name2", "description", "get"])
    }

    #[test]
    fn yields_tags_left_to_right() {
        let set = names();
        let tags: Vec<_> = set.scan("a [name] b [25 sep=\"|\"] c [unknown]", ScanMode::All).collect();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].name, "name");
        assert_eq!(tags[0].span, 2..8);
        assert_eq!(tags[1].name, "25");
        assert_eq!(tags[1].attributes.get("sep"), Some("|"));
    }

    #[test]
    fn prefers_the_longest_matching_name() {
        let set = names();
        let tags: Vec<_> = set.scan("[name2] [name]", ScanMode::Plain).collect();
        assert_eq!(tags.iter().map(|t| t.name).collect::<Vec<_>>(), vec!["name2", "name"]);
    }

    #[test]
    fn names_end_at_a_word_boundary() {
        let set = names();
        assert_eq!(set.scan("[25x] [namey]", ScanMode::All).count(), 0);
    }

    #[test]
    fn names_must_end_the_tag_word() {
        let set = names();
        assert_eq!(set.scan("[name-2] [get.x] [25-1 a=b] [if name-2]x[/if name-2]", ScanMode::All).count(), 0);
        let tags: Vec<_> = set.scan("[name\tsep=x] [name/]", ScanMode::Plain).collect();
        assert_eq!(tags.len(), 2);
        assert_eq!(tags[0].attributes.get("sep"), Some("x"));
    }

    #[test]
    fn captures_conditional_bodies() {
        let set = names();
        let text = "x[if description]Desc: [description][/if description]y";
        let tag = set.scan(text, ScanMode::Conditionals).next().unwrap();
        assert!(tag.is_conditional());
        assert_eq!(tag.body, Some("Desc: [description]"));
        assert_eq!(tag.raw, "[if description]Desc: [description][/if description]");
        assert_eq!(&text[tag.span.clone()], tag.raw);
    }

    #[test]
    fn unclosed_blocks_are_not_yielded() {
        let set = names();
        let tags: Vec<_> = set.scan("[if name]never closed [name]", ScanMode::All).collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].kind, TagKind::Plain);
    }

    #[test]
    fn conditional_scan_skips_foreach_blocks() {
        let set = names();
        let text = "[foreach 25][if name]a[/if name][/foreach 25][if get]b[/if get]";
        let tags: Vec<_> = set.scan(text, ScanMode::Conditionals).collect();
        assert_eq!(tags.len(), 1);
        assert_eq!(tags[0].name, "get");
    }

    #[test]
    fn self_closing_plain_tags() {
        let set = names();
        let tag = set.scan("[get param=x/]", ScanMode::Plain).next().unwrap();
        assert_eq!(tag.attributes.get("param"), Some("x"));
    }

    #[test]
    fn enclosing_mode_pairs_plain_tags_with_their_close() {
        let set = TagSet::new(["b", "hr"]);
        let text = "[b class=x]bold[/b] [hr/] [b]open";
        let tags: Vec<_> = set.scan(text, ScanMode::Enclosing).collect();
        assert_eq!(tags.len(), 3);
        assert_eq!(tags[0].body, Some("bold"));
        assert_eq!(tags[0].raw, "[b class=x]bold[/b]");
        assert_eq!(tags[1].name, "hr");
        assert_eq!(tags[1].body, None);
        assert_eq!(tags[2].body, None);
    }

    #[test]
    fn empty_set_scans_nothing() {
        let set = TagSet::new(Vec::<String>::new());
        assert_eq!(set.scan("[anything]", ScanMode::All).count(), 0);
    }
}
