//! `{param}` placeholder rendering.
//!
//! Placeholders are `{name}` where `name` is an identifier. A placeholder
//! preceded by `$` (shell `${VAR}`) is left untouched.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::types::Params;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\$?)\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex is valid")
});

/// Names referenced by `template`, in order of first appearance.
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for caps in PLACEHOLDER.captures_iter(template) {
        if !caps[1].is_empty() {
            continue;
        }
        let name = &caps[2];
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Substitute every placeholder with its parameter value.
///
/// Returns the name of the first placeholder with no value as `Err`.
pub fn render(template: &str, params: &Params) -> Result<String, String> {
    let mut missing: Option<String> = None;

    let rendered = PLACEHOLDER.replace_all(template, |caps: &Captures<'_>| {
        if !caps[1].is_empty() {
            return caps[0].to_string();
        }
        match params.get(&caps[2]) {
            Some(value) => value.to_string(),
            None => {
                missing.get_or_insert_with(|| caps[2].to_string());
                caps[0].to_string()
            }
        }
    });

    match missing {
        Some(name) => Err(name),
        None => Ok(rendered.into_owned()),
    }
}
