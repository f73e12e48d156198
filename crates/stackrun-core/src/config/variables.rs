//! Variable handling for instance inputs.
//!
//! Only `${env:NAME}` is resolved at load time. `${output:..}` references are
//! left untouched for the provider, and legacy framework variables are
//! rejected.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::StackError;

static VARIABLE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{(\w*:?[\w.\-]+)\}").expect("variable pattern is a valid regex")
});

/// Variable sources that belong to the legacy framework and are not supported.
const UNSUPPORTED_SOURCES: [&str; 7] = ["self", "opt", "sls", "cf", "s3", "ssm", "file"];

/// Visit every string leaf of a nested value, depth first.
pub fn walk_strings<'a, F>(value: &'a Value, visit: &mut F)
where
    F: FnMut(&'a str),
{
    match value {
        Value::String(s) => visit(s),
        Value::Array(items) => items.iter().for_each(|item| walk_strings(item, visit)),
        Value::Object(map) => map.values().for_each(|item| walk_strings(item, visit)),
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
}

/// Replace every string leaf of a nested value with the result of `rewrite`.
pub fn rewrite_strings<F, E>(value: &mut Value, rewrite: &mut F) -> Result<(), E>
where
    F: FnMut(&str) -> Result<Option<Value>, E>,
{
    match value {
        Value::String(s) => {
            if let Some(replacement) = rewrite(s)? {
                *value = replacement;
            }
        }
        Value::Array(items) => {
            for item in items {
                rewrite_strings(item, rewrite)?;
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                rewrite_strings(item, rewrite)?;
            }
        }
        Value::Null | Value::Bool(_) | Value::Number(_) => {}
    }
    Ok(())
}

/// Resolve `${env:NAME}` references using `lookup`.
///
/// A string that is exactly one env reference takes the variable's value, or
/// `null` when unset. Embedded references are substituted in place, unset
/// ones with an empty string.
pub fn resolve_env_variables<L>(value: &mut Value, lookup: &L) -> Result<(), StackError>
where
    L: Fn(&str) -> Option<String>,
{
    rewrite_strings(value, &mut |s: &str| resolve_env_in_str(s, lookup))
}

fn resolve_env_in_str<L>(s: &str, lookup: &L) -> Result<Option<Value>, StackError>
where
    L: Fn(&str) -> Option<String>,
{
    if !s.contains("${") {
        return Ok(None);
    }

    let mut changed = false;
    let mut whole_match = None;
    let mut result = String::with_capacity(s.len());
    let mut last = 0;

    for caps in VARIABLE_RE.captures_iter(s) {
        let Some(full) = caps.get(0) else {
            continue;
        };
        let reference = &caps[1];
        let (source, name) = reference.split_once(':').unwrap_or(("", reference));

        if UNSUPPORTED_SOURCES.contains(&source) {
            return Err(StackError::UnsupportedVariable {
                variable: full.as_str().to_string(),
            });
        }
        if source != "env" {
            continue;
        }

        changed = true;
        let resolved = lookup(name);
        if full.start() == 0 && full.end() == s.len() {
            whole_match = Some(resolved.clone());
        }
        result.push_str(&s[last..full.start()]);
        result.push_str(resolved.as_deref().unwrap_or_default());
        last = full.end();
    }

    if !changed {
        return Ok(None);
    }
    if let Some(resolved) = whole_match {
        return Ok(Some(resolved.map(Value::String).unwrap_or(Value::Null)));
    }
    result.push_str(&s[last..]);
    Ok(Some(Value::String(result)))
}
