//! Variable path parsing.

use weft_core::NodeId;

use super::resolver::ResolveError;

/// Which half of an envelope a path traverses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRoot {
    /// The node's produced value.
    Value,
    /// The envelope's meta block.
    Meta,
}

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Mapping key.
    Key(String),
    /// Sequence index.
    Index(usize),
}

/// A parsed variable path.
///
/// Grammar: `node`, `node.value[.field...]`, `node.meta.<field>`, and the
/// shorthand `node.<field>` for `node.value.<field>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuePath {
    /// The referenced node.
    pub node: NodeId,
    /// Envelope half the segments traverse.
    pub root: PathRoot,
    /// Traversal steps below the root.
    pub segments: Vec<PathSegment>,
}

impl ValuePath {
    /// Parses a dotted path expression.
    pub fn parse(path: &str) -> Result<Self, ResolveError> {
        let mut parts = path.split('.');

        let node = match parts.next() {
            Some(head) if !head.is_empty() => NodeId::from(head),
            _ => {
                return Err(ResolveError::malformed(path, "missing node id"));
            }
        };

        let mut rest: Vec<&str> = Vec::new();
        for part in parts {
            if part.is_empty() {
                return Err(ResolveError::malformed(path, "empty path segment"));
            }
            rest.push(part);
        }

        let (root, tail): (PathRoot, &[&str]) = match rest.split_first() {
            None => (PathRoot::Value, &[]),
            Some((&"value", tail)) => (PathRoot::Value, tail),
            Some((&"meta", tail)) => {
                if tail.is_empty() {
                    return Err(ResolveError::malformed(path, "meta requires a field"));
                }
                (PathRoot::Meta, tail)
            }
            // `node.<field>` is shorthand for `node.value.<field>`.
            Some(_) => (PathRoot::Value, rest.as_slice()),
        };

        let segments = tail.iter().map(|part| Self::segment(part)).collect();

        Ok(Self {
            node,
            root,
            segments,
        })
    }

    fn segment(part: &str) -> PathSegment {
        match part.parse::<usize>() {
            Ok(index) => PathSegment::Index(index),
            Err(_) => PathSegment::Key(part.to_owned()),
        }
    }
}
