//! Line/column annotated YAML tree and token-path lookup
//!
//! The tree keeps every key node with its position, which the serde model of
//! the document discards. Aliases are expanded to a copy of the anchored node.

use crate::error::SearchError;
use std::collections::HashMap;
use yaml_rust2::parser::{Event, MarkedEventReceiver, Parser};
use yaml_rust2::scanner::Marker;

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Scalar(String),
    Sequence(Vec<Node>),
    /// Key/value pairs in document order
    Mapping(Vec<(Node, Node)>),
}

/// A YAML node and where it starts in the source
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// 1-based
    pub line: usize,
    /// 1-based
    pub column: usize,
}

impl Node {
    fn new(kind: NodeKind, mark: Marker) -> Self {
        Self {
            kind,
            line: mark.line(),
            column: mark.col() + 1,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Scalar(value) => Some(value),
            _ => None,
        }
    }

    /// Key and value nodes of the mapping entry named `key`.
    pub fn entry(&self, key: &str) -> Option<(&Node, &Node)> {
        match &self.kind {
            NodeKind::Mapping(entries) => entries
                .iter()
                .find(|(k, _)| k.as_scalar() == Some(key))
                .map(|(k, v)| (k, v)),
            _ => None,
        }
    }
}

#[derive(Default)]
struct TreeBuilder {
    root: Option<Node>,
    /// Open containers with their anchor ids
    stack: Vec<(Node, usize)>,
    /// Pending key per open mapping
    keys: Vec<Option<Node>>,
    anchors: HashMap<usize, Node>,
    /// First structural error, reported once the stream ends
    error: Option<SearchError>,
}

impl TreeBuilder {
    fn insert(&mut self, node: Node, anchor: usize) {
        if anchor > 0 {
            self.anchors.insert(anchor, node.clone());
        }
        let Some((parent, _)) = self.stack.last_mut() else {
            self.root = Some(node);
            return;
        };
        match &mut parent.kind {
            NodeKind::Sequence(items) => items.push(node),
            NodeKind::Mapping(entries) => {
                if let Some(slot) = self.keys.last_mut() {
                    match slot.take() {
                        Some(key) => entries.push((key, node)),
                        None => *slot = Some(node),
                    }
                }
            }
            NodeKind::Scalar(_) => {}
        }
    }

    fn close(&mut self) {
        if let Some((node, anchor)) = self.stack.pop() {
            if matches!(node.kind, NodeKind::Mapping(_)) {
                self.keys.pop();
            }
            self.insert(node, anchor);
        }
    }

    fn finish(self) -> Result<Node, SearchError> {
        if let Some(error) = self.error {
            return Err(error);
        }
        self.root.ok_or(SearchError::EmptyDocument)
    }
}

impl MarkedEventReceiver for TreeBuilder {
    fn on_event(&mut self, event: Event, mark: Marker) {
        match event {
            Event::Scalar(value, _, anchor, ..) => self.insert(Node::new(NodeKind::Scalar(value), mark), anchor),
            Event::SequenceStart(anchor, ..) => {
                self.stack.push((Node::new(NodeKind::Sequence(Vec::new()), mark), anchor));
            }
            Event::MappingStart(anchor, ..) => {
                self.stack.push((Node::new(NodeKind::Mapping(Vec::new()), mark), anchor));
                self.keys.push(None);
            }
            Event::SequenceEnd | Event::MappingEnd => self.close(),
            Event::Alias(id) => match self.anchors.get(&id) {
                Some(anchored) => self.insert(anchored.clone(), 0),
                None => {
                    self.error.get_or_insert(SearchError::UnknownAlias {
                        id,
                        line: mark.line(),
                        column: mark.col() + 1,
                    });
                }
            },
            _ => {}
        }
    }
}

/// Parse the first document in `source` into a positioned tree.
pub fn parse_document(source: &str) -> Result<Node, SearchError> {
    let mut builder = TreeBuilder::default();
    Parser::new(source.chars())
        .load(&mut builder, false)
        .map_err(|e| SearchError::Parse(e.to_string()))?;
    builder.finish()
}

fn child<'a>(node: &'a Node, segment: &str) -> Result<(Option<&'a Node>, &'a Node), SearchError> {
    match &node.kind {
        NodeKind::Sequence(items) => {
            let index: usize = segment.parse().map_err(|_| SearchError::InvalidIndex {
                segment: segment.to_string(),
            })?;
            let item = items.get(index).ok_or(SearchError::IndexOutOfBounds {
                index,
                len: items.len(),
            })?;
            Ok((None, item))
        }
        NodeKind::Mapping(_) => node
            .entry(segment)
            .map(|(key, value)| (Some(key), value))
            .ok_or_else(|| SearchError::NotFound(segment.to_string())),
        NodeKind::Scalar(_) => Err(SearchError::NotFound(segment.to_string())),
    }
}

fn walk<'a>(root: &'a Node, path: &[String]) -> Result<(Option<&'a Node>, &'a Node), SearchError> {
    let mut current = (None, root);
    for segment in path {
        current = child(current.1, segment)?;
    }
    Ok(current)
}

/// Key node at the end of `path`.
///
/// Fails with [`SearchError::NoKey`] when the last segment indexes a sequence.
pub fn find_key<'a>(root: &'a Node, path: &[String]) -> Result<&'a Node, SearchError> {
    let (key, _) = walk(root, path)?;
    key.ok_or_else(|| SearchError::NoKey(path.join(".")))
}

/// Value node at the end of `path`; the root for an empty path.
pub fn find_value<'a>(root: &'a Node, path: &[String]) -> Result<&'a Node, SearchError> {
    walk(root, path).map(|(_, value)| value)
}
