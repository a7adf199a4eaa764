use std::collections::{HashMap, HashSet};

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

// A `<...>` span whose inner text holds no angle bracket. Matching resumes
// right after each closing `>`, so nested brackets are never special-cased.
static PLACEHOLDER_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<([^<>]+)>").expect("Placeholder pattern must compile"));

/// Placeholders found in a template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceholderSet {
    /// Every occurrence, in template order, duplicates included.
    pub all: Vec<String>,
    /// Distinct names in first-seen order.
    pub unique: Vec<String>,
}

impl PlaceholderSet {
    pub fn is_empty(&self) -> bool {
        self.all.is_empty()
    }
}

pub fn extract_placeholders(template: &str) -> PlaceholderSet {
    let all: Vec<String> = PLACEHOLDER_PATTERN
        .captures_iter(template)
        .map(|caps| caps[1].to_owned())
        .collect();

    let mut seen = HashSet::new();
    let unique = all
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect();

    PlaceholderSet { all, unique }
}

/// Anything placeholder values can be looked up in: a dataset row,
/// or a hand-written sample for previews and test sends.
pub trait ValueSource {
    fn value(&self, name: &str) -> Option<&str>;
}

impl ValueSource for HashMap<String, String> {
    fn value(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// Replaces every `<Name>` token whose name is listed in `names` with the
/// value found in `values`, or with an empty string when there is none.
///
/// Tokens for names outside of `names` are left untouched. Substitution is a
/// single pass over the template: a value containing `<Name>` is copied as is
/// and never expanded again.
pub fn merge<V>(template: &str, names: &[String], values: &V) -> String
where
    V: ValueSource + ?Sized,
{
    PLACEHOLDER_PATTERN
        .replace_all(template, |caps: &Captures| {
            let name = &caps[1];
            if names.iter().any(|n| n == name) {
                values.value(name).unwrap_or_default().to_owned()
            } else {
                caps[0].to_owned()
            }
        })
        .into_owned()
}
