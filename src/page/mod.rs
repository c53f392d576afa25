//! Telegraph page model and fetch client.
//!
//! A fetched page is a title plus a tree of [`ContentNode`]s. Element nodes
//! carry a tag, optional attributes and children; text leaves carry an empty
//! tag and nothing else.
//!
//! - [`client`] - HTTP client for the Telegraph `getPage` API
//! - [`error`] - fetch error types

mod client;
mod error;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use client::{DEFAULT_API_BASE, PageSource, TelegraphClient, extract_page_path};
pub use error::FetchError;

/// Loosely-typed attribute value.
///
/// Telegraph attributes are almost always strings, but the JSON payload is
/// untyped, so every JSON shape has a variant rather than being coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttrValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<AttrValue>),
    Map(BTreeMap<String, AttrValue>),
}

impl AttrValue {
    /// Returns the string payload, or `None` for any other variant.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }
}

impl From<&str> for AttrValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Attribute map of an element node.
pub type Attrs = BTreeMap<String, AttrValue>;

/// A node of a page content tree.
///
/// Text leaves have an empty `tag`, no attributes and no children; they are
/// never media.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentNode {
    /// Element tag name, empty for text leaves.
    pub tag: String,
    /// Element attributes, absent when the element has none.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Attrs>,
    /// Child nodes in document order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ContentNode>,
}

impl ContentNode {
    /// Creates an element node with no attributes or children.
    #[must_use]
    pub fn element(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: None,
            children: Vec::new(),
        }
    }

    /// Creates a text leaf.
    #[must_use]
    pub fn text() -> Self {
        Self::default()
    }

    /// Adds an attribute, creating the attribute map if needed.
    #[must_use]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<AttrValue>) -> Self {
        self.attrs
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Appends child nodes.
    #[must_use]
    pub fn with_children(mut self, children: impl IntoIterator<Item = ContentNode>) -> Self {
        self.children.extend(children);
        self
    }

    /// Returns `true` for text leaves.
    #[must_use]
    pub fn is_text(&self) -> bool {
        self.tag.is_empty()
    }

    /// Looks up a string-valued attribute.
    ///
    /// Non-string values (numbers, booleans, nested maps) yield `None`.
    #[must_use]
    pub fn string_attr(&self, key: &str) -> Option<&str> {
        self.attrs.as_ref()?.get(key)?.as_str()
    }
}

/// A parent under construction while converting a JSON tree.
struct PendingElement {
    node: Option<ContentNode>,
    remaining: std::vec::IntoIter<Value>,
    children: Vec<ContentNode>,
}

impl PendingElement {
    fn new(node: Option<ContentNode>, children: Vec<Value>) -> Self {
        Self {
            node,
            remaining: children.into_iter(),
            children: Vec::new(),
        }
    }
}

/// Splits one wire node into its leaf form, or an element plus its raw children.
///
/// Strings are text leaves. Objects are elements only when they carry a
/// non-empty string `tag`; anything else is dropped.
fn classify(value: Value) -> Option<(ContentNode, Vec<Value>)> {
    match value {
        Value::String(_) => Some((ContentNode::text(), Vec::new())),
        Value::Object(mut fields) => {
            let tag = match fields.remove("tag") {
                Some(Value::String(tag)) if !tag.is_empty() => tag,
                _ => return None,
            };
            let attrs = match fields.remove("attrs") {
                Some(attrs @ Value::Object(_)) => serde_json::from_value(attrs).ok(),
                _ => None,
            };
            let children = match fields.remove("children") {
                Some(Value::Array(children)) => children,
                _ => Vec::new(),
            };
            Some((
                ContentNode {
                    tag,
                    attrs,
                    children: Vec::new(),
                },
                children,
            ))
        }
        _ => None,
    }
}

/// Parses a JSON content array, dropping entries that are neither text nor elements.
///
/// Conversion keeps its own stack, so nesting depth is bounded only by memory.
///
/// # Errors
///
/// Returns an error if `value` is not a JSON array.
pub fn parse_content(value: Value) -> Result<Vec<ContentNode>, serde_json::Error> {
    let Value::Array(roots) = value else {
        return Err(serde::de::Error::custom("page content must be a JSON array"));
    };

    let mut stack = vec![PendingElement::new(None, roots)];
    while let Some(top) = stack.last_mut() {
        if let Some(raw) = top.remaining.next() {
            if let Some((node, children)) = classify(raw) {
                if children.is_empty() {
                    top.children.push(node);
                } else {
                    stack.push(PendingElement::new(Some(node), children));
                }
            }
            continue;
        }

        let Some(done) = stack.pop() else { break };
        match (done.node, stack.last_mut()) {
            (Some(mut node), Some(parent)) => {
                node.children = done.children;
                parent.children.push(node);
            }
            _ => return Ok(done.children),
        }
    }
    Ok(Vec::new())
}

/// A fetched page.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Page {
    /// Page path as returned by the API.
    pub path: String,
    /// Canonical page URL.
    pub url: String,
    /// Page title.
    pub title: String,
    /// Author name, if set.
    pub author_name: Option<String>,
    /// Short page description, if set.
    pub description: Option<String>,
    /// Root content nodes in document order.
    pub nodes: Vec<ContentNode>,
}

/// Counts every node of a tree, text leaves included.
#[must_use]
pub fn count_nodes(nodes: &[ContentNode]) -> usize {
    let mut count = 0;
    let mut stack = vec![nodes];
    while let Some(level) = stack.pop() {
        count += level.len();
        stack.extend(level.iter().map(|node| node.children.as_slice()));
    }
    count
}
