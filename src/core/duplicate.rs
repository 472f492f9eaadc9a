use std::collections::HashMap;

use log::debug;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static FIELD_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[((?:/?if|/?foreach) )?([^\[\]\s/]+)([\] ])").expect("field reference pattern")
});

/// Points field references in a copied form's templates at the new field ids.
///
/// Rewrites `[if OLD]`, `[if OLD ...]`, `[/if OLD]`, `[foreach OLD]`,
/// `[/foreach OLD]`, `[OLD]` and `[OLD ...]`. Each reference is rewritten
/// at most once, so `{1 => 2, 2 => 3}` never turns `[1]` into `[3]`.
pub fn remap_field_ids(text: &str, ids: &HashMap<String, String>) -> String {
    if ids.is_empty() {
        return text.to_string();
    }
    let mut count = 0;
    let out = FIELD_REFERENCE.replace_all(text, |caps: &Captures| {
        let prefix = caps.get(1).map_or("", |m| m.as_str());
        let old = &caps[2];
        let tail = &caps[3];
        // Only `[if OLD ...]` and `[OLD ...]` may carry attributes.
        let allows_attributes = prefix.is_empty() || prefix == "if ";
        match ids.get(old) {
            Some(new) if tail == "]" || allows_attributes => {
                count += 1;
                format!("[{}{}{}", prefix, new, tail)
            }
            _ => caps[0].to_string(),
        }
    });
    debug!("Remapped {} field references", count);
    out.into_owned()
}

/// Remaps every template in `values`.
pub fn remap_all<'a>(values: impl IntoIterator<Item = &'a str>, ids: &HashMap<String, String>) -> Vec<String> {
    values.into_iter().map(|v| remap_field_ids(v, ids)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
    }

    #[test]
    fn rewrites_every_reference_form() {
        let map = ids(&[("12", "40")]);
        let text = "[if 12 equals=\"x\"][12][/if 12] [foreach 12][12 sep=\"|\"][/foreach 12]";
        assert_eq!(
            remap_field_ids(text, &map),
            "[if 40 equals=\"x\"][40][/if 40] [foreach 40][40 sep=\"|\"][/foreach 40]"
        );
    }

    #[test]
    fn does_not_chain_remaps() {
        let map = ids(&[("1", "2"), ("2", "3")]);
        assert_eq!(remap_field_ids("[1] [2]", &map), "[2] [3]");
    }

    #[test]
    fn leaves_other_tags_alone() {
        let map = ids(&[("12", "40")]);
        assert_eq!(remap_field_ids("[123] [sitename] [12x]", &map), "[123] [sitename] [12x]");
        assert_eq!(remap_field_ids("[foreach 12 x]", &map), "[foreach 12 x]");
    }

    #[test]
    fn remaps_lists() {
        let map = ids(&[("7", "8")]);
        assert_eq!(remap_all(["[7]", "none"], &map), vec!["[8]".to_string(), "none".to_string()]);
    }
}
