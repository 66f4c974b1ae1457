use super::*;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("html parse error: {0}")]
    HtmlParse(String),
    #[error("unsupported selector: {0}")]
    UnsupportedSelector(String),
    #[error("selector not found: {0}")]
    SelectorNotFound(String),
    #[error("not an element: {0}")]
    NotAnElement(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error(
        "assertion failed for {selector}: expected {expected}, actual {actual}, snippet {dom_snippet}"
    )]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
        dom_snippet: String,
    },
    #[error("host error: {0}")]
    Host(String),
}

/// Handle to a node inside a [`Harness`] document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

#[derive(Debug, Clone)]
pub(crate) enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub(crate) struct Node {
    pub(crate) parent: Option<NodeId>,
    pub(crate) children: Vec<NodeId>,
    pub(crate) node_type: NodeType,
}

impl Node {
    pub(crate) fn element(&self) -> Option<&Element> {
        match &self.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self) -> Option<&mut Element> {
        match &mut self.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Element {
    pub(crate) tag_name: String,
    pub(crate) attrs: HashMap<String, String>,
}

impl Element {
    pub(crate) fn classes(&self) -> impl Iterator<Item = &str> {
        self.attrs
            .get("class")
            .map(String::as_str)
            .unwrap_or_default()
            .split_whitespace()
    }

    pub(crate) fn has_class(&self, class_name: &str) -> bool {
        self.classes().any(|class| class == class_name)
    }

    /// Adds or removes one class token. The attribute is only rewritten
    /// when the token set changes, and disappears with its last token.
    pub(crate) fn toggle_class(&mut self, class_name: &str, on: bool) {
        if self.has_class(class_name) == on {
            return;
        }
        let mut tokens = self
            .classes()
            .filter(|class| *class != class_name)
            .map(str::to_string)
            .collect::<Vec<_>>();
        if on {
            tokens.push(class_name.to_string());
        }
        if tokens.is_empty() {
            self.attrs.remove("class");
        } else {
            self.attrs.insert("class".to_string(), tokens.join(" "));
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Dom {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) id_index: HashMap<String, Vec<NodeId>>,
}

/// Appends `value` with the characters that would break HTML serialization
/// replaced by entities. Double quotes are only escaped inside attributes.
pub(crate) fn escape_html_into(out: &mut String, value: &str, in_attribute: bool) {
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if in_attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
}

/// Extracts the fragment identifier of a same-page link target.
///
/// `"#intro"` yields `Some("intro")`. Percent-escapes are decoded so that
/// `"#caf%C3%A9"` and `"#café"` both resolve to `café`. A bare `"#"` or a
/// target without a fragment yields `None`.
pub fn fragment_of(href: &str) -> Option<String> {
    let (_, raw) = href.split_once('#')?;
    if raw.is_empty() {
        return None;
    }
    let decoded = urlencoding::decode(raw)
        .map(|value| value.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    Some(decoded)
}

pub(crate) fn truncate_chars(value: &str, max_chars: usize) -> String {
    match value.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &value[..cut]),
        None => value.to_string(),
    }
}
