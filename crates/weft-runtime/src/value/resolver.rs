//! The variable resolver.
//!
//! A small interpreter dereferencing `${...}` path expressions against
//! the map of already-produced envelopes. Resolution is pure: the same
//! path against the same map always yields the same value, and the map is
//! never mutated.

use serde_json::Value;
use thiserror::Error;

use super::path::{PathRoot, PathSegment, ValuePath};
use super::EnvelopeMap;
use crate::TRACING_TARGET;

/// Errors raised when a variable path cannot be dereferenced.
///
/// Each variant carries the offending path so a node failure can be
/// attributed precisely.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    /// The path references a node with no envelope yet.
    #[error("unknown node `{node}` in `${{{path}}}`")]
    UnknownNode {
        /// Node id that missed.
        node: String,
        /// Full offending path.
        path: String,
    },

    /// The path does not follow the grammar.
    #[error("malformed path `${{{path}}}`: {reason}")]
    MalformedPath {
        /// Full offending path.
        path: String,
        /// What was wrong with it.
        reason: String,
    },

    /// A mapping key was absent.
    #[error("field `{segment}` not present in `${{{path}}}`")]
    MissingField {
        /// Key that missed.
        segment: String,
        /// Full offending path.
        path: String,
    },

    /// A sequence index was out of range.
    #[error("index {index} out of range in `${{{path}}}`")]
    IndexOutOfRange {
        /// Index that missed.
        index: usize,
        /// Full offending path.
        path: String,
    },

    /// The path tried to traverse into a scalar.
    #[error("cannot index into non-structured value in `${{{path}}}`")]
    NotStructured {
        /// Full offending path.
        path: String,
    },
}

impl ResolveError {
    pub(crate) fn malformed(path: &str, reason: impl Into<String>) -> Self {
        Self::MalformedPath {
            path: path.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Resolves `${...}` references against an envelope map.
#[derive(Debug, Clone, Copy)]
pub struct VariableResolver<'a> {
    envelopes: &'a EnvelopeMap,
}

impl<'a> VariableResolver<'a> {
    /// Creates a resolver over the given envelope map.
    pub fn new(envelopes: &'a EnvelopeMap) -> Self {
        Self { envelopes }
    }

    /// Resolves a bare path expression (no `${}` wrapper).
    pub fn resolve_path(&self, path: &str) -> Result<Value, ResolveError> {
        let parsed = ValuePath::parse(path)?;

        let envelope =
            self.envelopes
                .get(&parsed.node)
                .ok_or_else(|| ResolveError::UnknownNode {
                    node: parsed.node.to_string(),
                    path: path.to_owned(),
                })?;

        let root = match parsed.root {
            PathRoot::Value => envelope.value.clone(),
            // Meta is a plain struct; walking its serialized form keeps
            // field access uniform with value traversal.
            PathRoot::Meta => serde_json::to_value(&envelope.meta)
                .map_err(|e| ResolveError::malformed(path, e.to_string()))?,
        };

        walk(root, &parsed.segments, path)
    }

    /// Resolves a template string.
    ///
    /// A template that is *entirely* one reference returns the resolved
    /// value unconverted, preserving its type for downstream parameters.
    /// Anything else is interpolated into a string.
    pub fn resolve_template(&self, template: &str) -> Result<Value, ResolveError> {
        if let Some(path) = whole_reference(template) {
            return self.resolve_path(path);
        }
        Ok(Value::String(self.interpolate(template)))
    }

    /// Substitutes every `${...}` reference in `template`, stringifying
    /// resolved values in place.
    ///
    /// Unresolvable references are left as literal text with a logged
    /// warning rather than failing the whole template.
    pub fn interpolate(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let path = &after[..end];
                    match self.resolve_path(path) {
                        Ok(value) => out.push_str(&stringify(&value)),
                        Err(error) => {
                            tracing::warn!(
                                target: TRACING_TARGET,
                                path = path,
                                %error,
                                "Leaving unresolved reference in template"
                            );
                            out.push_str(&rest[start..start + 2 + end + 1]);
                        }
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    // Unterminated reference; keep the remainder verbatim.
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }

    /// Recursively resolves templates inside a JSON value.
    ///
    /// Strings go through [`resolve_template`]; objects and arrays are
    /// walked; everything else is cloned as-is.
    ///
    /// [`resolve_template`]: VariableResolver::resolve_template
    pub fn resolve_json(&self, value: &Value) -> Result<Value, ResolveError> {
        match value {
            Value::String(template) => self.resolve_template(template),
            Value::Array(items) => items
                .iter()
                .map(|item| self.resolve_json(item))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Value::Object(map) => map
                .iter()
                .map(|(k, v)| Ok((k.clone(), self.resolve_json(v)?)))
                .collect::<Result<serde_json::Map<_, _>, ResolveError>>()
                .map(Value::Object),
            other => Ok(other.clone()),
        }
    }
}

/// Returns the inner path when the template is exactly one reference.
fn whole_reference(template: &str) -> Option<&str> {
    let inner = template.strip_prefix("${")?.strip_suffix('}')?;
    // A second opener or a stray closer means the template mixes literal
    // text with references and must be interpolated instead.
    if inner.contains("${") || inner.contains('}') {
        return None;
    }
    Some(inner)
}

/// Stringifies a resolved value for interpolation: strings drop their
/// quotes, everything else renders as compact JSON.
fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn walk(mut current: Value, segments: &[PathSegment], path: &str) -> Result<Value, ResolveError> {
    for segment in segments {
        current = match (segment, current) {
            (PathSegment::Key(key), Value::Object(mut map)) => {
                map.remove(key).ok_or_else(|| ResolveError::MissingField {
                    segment: key.clone(),
                    path: path.to_owned(),
                })?
            }
            (PathSegment::Index(index), Value::Array(mut items)) => {
                if *index >= items.len() {
                    return Err(ResolveError::IndexOutOfRange {
                        index: *index,
                        path: path.to_owned(),
                    });
                }
                items.swap_remove(*index)
            }
            (PathSegment::Key(key), Value::Array(_)) => {
                return Err(ResolveError::MissingField {
                    segment: key.clone(),
                    path: path.to_owned(),
                });
            }
            // Numeric segments double as mapping keys (`{"0": ...}`).
            (PathSegment::Index(index), Value::Object(mut map)) => map
                .remove(&index.to_string())
                .ok_or_else(|| ResolveError::MissingField {
                    segment: index.to_string(),
                    path: path.to_owned(),
                })?,
            (_, _) => {
                return Err(ResolveError::NotStructured {
                    path: path.to_owned(),
                });
            }
        };
    }
    Ok(current)
}
