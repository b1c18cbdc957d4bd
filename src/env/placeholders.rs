use once_cell::sync::Lazy;
use regex::{Captures, Regex};

use crate::env::EnvMap;

static VARIABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{([^{}]+)\}\}").expect("valid regex"));

/// Replaces `{{name}}` references with their values. Unknown names are left
/// verbatim, the way collection runners treat them.
pub fn resolve_variables(input: &str, vars: &EnvMap) -> String {
    VARIABLE_PATTERN
        .replace_all(input, |caps: &Captures<'_>| {
            vars.get(caps[1].trim())
                .cloned()
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

/// Names referenced in `input` that `vars` cannot resolve.
pub fn unresolved_variables(input: &str, vars: &EnvMap) -> Vec<String> {
    VARIABLE_PATTERN
        .captures_iter(input)
        .map(|caps| caps[1].trim().to_string())
        .filter(|name| !vars.contains_key(name))
        .collect()
}
