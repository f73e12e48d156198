//! Output-reference scanning.
//!
//! An input string such as `"${output:db.endpoint}"` or
//! `"${output:dev:shop:db.endpoint}"` references instance `db`. The instance
//! name is the part of the last `:`-separated segment before the first `.`.

use std::collections::BTreeSet;
use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::config::walk_strings;

static OUTPUT_REF_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{output:([^{}\s]+)\}").expect("output reference pattern is a valid regex")
});

/// Instance names referenced from `inputs` that are present in `known`.
///
/// References to other names are ignored; they may be resolved elsewhere.
pub fn find_dependencies(inputs: &Value, known: &BTreeSet<String>) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    walk_strings(inputs, &mut |s| {
        for name in referenced_instances(s) {
            if known.contains(name) {
                found.insert(name.to_string());
            }
        }
    });
    found
}

/// Instance names referenced by `${output:..}` placeholders in one string.
pub fn referenced_instances(s: &str) -> impl Iterator<Item = &str> {
    OUTPUT_REF_RE.captures_iter(s).filter_map(|caps| {
        let reference = caps.get(1)?.as_str();
        let target = reference.rsplit(':').next()?;
        let name = target.split('.').next()?;
        (!name.is_empty()).then_some(name)
    })
}

/// A parsed `${output:[stage:app:]instance.path}` placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputReference {
    /// Byte range of the whole placeholder in the scanned string
    pub span: Range<usize>,
    pub stage: Option<String>,
    pub app: Option<String>,
    pub instance: String,
    pub path: Vec<String>,
}

/// Every output placeholder in `s`, in order of appearance.
///
/// Only the full `stage:app:` namespace is honoured; any other prefix is
/// ignored and the reference is taken as local.
pub fn output_references(s: &str) -> Vec<OutputReference> {
    OUTPUT_REF_RE
        .captures_iter(s)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let reference = caps.get(1)?.as_str();
            let segments: Vec<&str> = reference.split(':').collect();
            let target = segments.last()?;
            let mut parts = target.split('.');
            let instance = parts.next().filter(|name| !name.is_empty())?;
            let (stage, app) = match segments.as_slice() {
                [stage, app, _] => (Some(stage.to_string()), Some(app.to_string())),
                _ => (None, None),
            };
            Some(OutputReference {
                span: whole.range(),
                stage,
                app,
                instance: instance.to_string(),
                path: parts.map(str::to_string).collect(),
            })
        })
        .collect()
}
