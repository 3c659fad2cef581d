//! Attribute path notation and path patterns.
//!
//! Paths use dotted keys and bracketed indices (`spec.ports[0].port`).
//! Keys that would be ambiguous in dotted form are quoted
//! (`labels["app.kubernetes.io/name"]`).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Appends a mapping key to a path.
#[must_use]
pub fn child_key(parent: &str, key: &str) -> String {
    if is_plain_key(key) {
        if parent.is_empty() {
            key.to_string()
        } else {
            format!("{parent}.{key}")
        }
    } else {
        let quoted = serde_json::to_string(key).unwrap_or_else(|_| format!("\"{key}\""));
        format!("{parent}[{quoted}]")
    }
}

/// Appends a sequence index to a path.
#[must_use]
pub fn child_index(parent: &str, index: usize) -> String {
    format!("{parent}[{index}]")
}

fn is_plain_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Mapping key.
    Key(String),
    /// Sequence index.
    Index(usize),
}

/// Parses a path into its segments.
///
/// # Errors
///
/// Returns a description of the problem if the path is not well formed.
pub fn parse(path: &str) -> Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut rest = path;

    while !rest.is_empty() {
        if let Some(inner) = rest.strip_prefix('[') {
            let end = inner
                .find(']')
                .ok_or_else(|| format!("unterminated '[' in path '{path}'"))?;
            let token = &inner[..end];
            if token.starts_with('"') {
                // Quoted keys may contain ']' so re-scan with the JSON parser.
                let (key, consumed) = parse_quoted(inner, path)?;
                segments.push(Segment::Key(key));
                rest = &inner[consumed..];
                rest = rest
                    .strip_prefix(']')
                    .ok_or_else(|| format!("expected ']' in path '{path}'"))?;
            } else {
                let index = token
                    .parse::<usize>()
                    .map_err(|_| format!("invalid index '{token}' in path '{path}'"))?;
                segments.push(Segment::Index(index));
                rest = &inner[end + 1..];
            }
        } else {
            let body = if segments.is_empty() {
                rest
            } else {
                rest.strip_prefix('.')
                    .ok_or_else(|| format!("expected '.' or '[' in path '{path}'"))?
            };
            let end = body.find(['.', '[']).unwrap_or(body.len());
            let key = &body[..end];
            if key.is_empty() {
                return Err(format!("empty key in path '{path}'"));
            }
            segments.push(Segment::Key(key.to_string()));
            rest = &body[end..];
        }
    }

    Ok(segments)
}

/// Parses a JSON string literal at the start of `input`, returning the key
/// and the number of bytes consumed.
fn parse_quoted(input: &str, path: &str) -> Result<(String, usize), String> {
    let mut escaped = false;
    for (i, c) in input.char_indices().skip(1) {
        match c {
            '\\' if !escaped => escaped = true,
            '"' if !escaped => {
                let literal = &input[..=i];
                let key: String = serde_json::from_str(literal)
                    .map_err(|e| format!("invalid quoted key in path '{path}': {e}"))?;
                return Ok((key, i + 1));
            }
            _ => escaped = false,
        }
    }
    Err(format!("unterminated quoted key in path '{path}'"))
}

/// Resolves a path against an attribute tree.
#[must_use]
pub fn lookup<'a>(tree: &'a Value, segments: &[Segment]) -> Option<&'a Value> {
    segments.iter().try_fold(tree, |node, segment| match segment {
        Segment::Key(key) => node.as_object()?.get(key),
        Segment::Index(index) => node.as_array()?.get(*index),
    })
}

/// Returns true if `path` is `prefix` itself or nested beneath it.
#[must_use]
pub fn is_within(path: &str, prefix: &str) -> bool {
    if prefix.is_empty() {
        return true;
    }
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('.') || rest.starts_with('['))
}

/// A set of path patterns with prefix semantics.
///
/// A pattern matches itself and any path nested under it, so `spec.vpcId`
/// matches `spec.vpcId` and `spec.vpcId.primary` but not `spec.vpcIdentity`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PathSet {
    patterns: BTreeSet<String>,
}

impl PathSet {
    /// Creates an empty set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            patterns: BTreeSet::new(),
        }
    }

    /// Inserts a pattern.
    pub fn insert(&mut self, pattern: impl Into<String>) {
        self.patterns.insert(pattern.into());
    }

    /// Returns true if the set has no patterns.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Iterates over the patterns in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(String::as_str)
    }

    /// Returns the first pattern that covers `path`.
    #[must_use]
    pub fn matching(&self, path: &str) -> Option<&str> {
        self.iter().find(|pattern| is_within(path, pattern))
    }

    /// Returns true if `path` is covered by a pattern, or if a pattern lies
    /// beneath `path` (a change at `path` replaces that whole subtree).
    #[must_use]
    pub fn touches(&self, path: &str) -> bool {
        self.iter()
            .any(|pattern| is_within(path, pattern) || is_within(pattern, path))
    }

    /// Returns the union of two sets.
    #[must_use]
    pub fn union(&self, other: &Self) -> Self {
        Self {
            patterns: self.patterns.union(&other.patterns).cloned().collect(),
        }
    }
}

impl<S: Into<String>> FromIterator<S> for PathSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            patterns: iter.into_iter().map(Into::into).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_child_paths() {
        assert_eq!(child_key("", "spec"), "spec");
        assert_eq!(child_key("spec", "ports"), "spec.ports");
        assert_eq!(child_index("spec.ports", 0), "spec.ports[0]");
        assert_eq!(
            child_key("labels", "app.kubernetes.io/name"),
            "labels[\"app.kubernetes.io/name\"]"
        );
    }

    #[test]
    fn test_parse_round_trips_rendered_paths() {
        let path = child_key(&child_index("spec.ports", 2), "port");
        assert_eq!(
            parse(&path).expect("valid path"),
            vec![
                Segment::Key("spec".into()),
                Segment::Key("ports".into()),
                Segment::Index(2),
                Segment::Key("port".into()),
            ]
        );

        let quoted = child_key("labels", "a.b]c");
        assert_eq!(
            parse(&quoted).expect("valid path"),
            vec![Segment::Key("labels".into()), Segment::Key("a.b]c".into())]
        );
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse("spec..x").is_err());
        assert!(parse("spec[x]").is_err());
        assert!(parse("spec[0").is_err());
    }

    #[test]
    fn test_lookup() {
        let tree = json!({"spec": {"ports": [{"port": 80}]}});
        let segments = parse("spec.ports[0].port").expect("valid path");
        assert_eq!(lookup(&tree, &segments), Some(&json!(80)));
        let missing = parse("spec.ports[1]").expect("valid path");
        assert_eq!(lookup(&tree, &missing), None);
    }

    #[test]
    fn test_prefix_semantics() {
        let set: PathSet = ["spec.vpcId"].into_iter().collect();
        assert_eq!(set.matching("spec.vpcId"), Some("spec.vpcId"));
        assert_eq!(set.matching("spec.vpcId.primary"), Some("spec.vpcId"));
        assert_eq!(set.matching("spec.vpcId[0]"), Some("spec.vpcId"));
        assert_eq!(set.matching("spec.vpcIdentity"), None);
        assert!(set.touches("spec"));
        assert!(!set.touches("metadata"));
    }
}
