//! Template node model shared by the parser, the validator and the builders.
//!
//! Nodes are plain values. Builders never mutate a node they were handed;
//! when a variant is needed (a directive stripped, a selector injected) a
//! new node is produced by one of the pure constructors below.

use serde::{Deserialize, Serialize};

pub const IF_DIRECTIVE: &str = "if";
pub const EACH_DIRECTIVE: &str = "each";
pub const KEY_ATTRIBUTE: &str = "key";
pub const SLOT_ATTRIBUTE: &str = "slot";
pub const IS_DIRECTIVE: &str = "is";
pub const NAME_ATTRIBUTE: &str = "name";
pub const REF_ATTRIBUTE: &str = "ref";
pub const VALUE_ATTRIBUTE: &str = "value";

pub const DIRECTIVES: [&str; 5] = [
    IF_DIRECTIVE,
    EACH_DIRECTIVE,
    KEY_ATTRIBUTE,
    SLOT_ATTRIBUTE,
    IS_DIRECTIVE,
];

pub const SLOT_TAG: &str = "slot";
pub const TEMPLATE_TAG: &str = "template";

pub fn is_directive(name: &str) -> bool {
    DIRECTIVES.contains(&name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Tag,
    Text,
}

/// An interpolation span. `start..end` are byte offsets of `text` in the
/// component source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TemplateExpression {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl TemplateExpression {
    pub fn new(start: usize, text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            start,
            end: start + text.len(),
            text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Attribute {
    /// `None` only for spread attributes.
    pub name: Option<String>,
    pub value: Option<String>,
    pub expressions: Vec<TemplateExpression>,
    pub is_boolean: bool,
    pub is_spread: bool,
    /// Byte offset of the value in the component source, or of the name
    /// when the attribute has no value.
    pub start: usize,
}

impl Attribute {
    pub fn new(name: &str, value: Option<&str>) -> Self {
        Self {
            name: Some(name.to_string()),
            value: value.map(str::to_string),
            ..Self::default()
        }
    }

    pub fn dynamic(name: &str, value: &str, expressions: Vec<TemplateExpression>) -> Self {
        Self {
            name: Some(name.to_string()),
            value: Some(value.to_string()),
            expressions,
            ..Self::default()
        }
    }

    pub fn spread(expression: TemplateExpression) -> Self {
        Self {
            name: None,
            value: None,
            start: expression.start,
            expressions: vec![expression],
            is_boolean: false,
            is_spread: true,
        }
    }

    pub fn at(self, start: usize) -> Self {
        Self { start, ..self }
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn has_expressions(&self) -> bool {
        !self.expressions.is_empty()
    }

    pub fn is_directive(&self) -> bool {
        !self.is_spread && is_directive(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Node {
    #[serde(rename = "type")]
    pub node_type: NodeType,
    pub name: Option<String>,
    pub attributes: Vec<Attribute>,
    pub nodes: Vec<Node>,
    pub text: Option<String>,
    pub expressions: Vec<TemplateExpression>,
    pub is_custom: bool,
    pub is_void: bool,
    pub is_raw: bool,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            node_type: NodeType::Tag,
            name: None,
            attributes: Vec::new(),
            nodes: Vec::new(),
            text: None,
            expressions: Vec::new(),
            is_custom: false,
            is_void: false,
            is_raw: false,
        }
    }
}

impl Node {
    pub fn tag(name: &str, attributes: Vec<Attribute>, nodes: Vec<Node>) -> Self {
        Self {
            node_type: NodeType::Tag,
            name: Some(name.to_string()),
            attributes,
            nodes,
            is_custom: name.contains('-'),
            ..Self::default()
        }
    }

    pub fn text(text: &str) -> Self {
        Self {
            node_type: NodeType::Text,
            text: Some(text.to_string()),
            ..Self::default()
        }
    }

    pub fn dynamic_text(text: &str, expressions: Vec<TemplateExpression>) -> Self {
        Self {
            expressions,
            ..Self::text(text)
        }
    }

    /// A nameless tag wrapping `nodes`, used as the entry of a nested build.
    pub fn synthetic_root(nodes: Vec<Node>) -> Self {
        Self {
            nodes,
            ..Self::default()
        }
    }

    pub fn is_tag(&self) -> bool {
        self.node_type == NodeType::Tag
    }

    pub fn is_text(&self) -> bool {
        self.node_type == NodeType::Text
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or_default()
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|attr| !attr.is_spread && attr.name() == name)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attribute(name).is_some()
    }

    /// Literal value of an attribute, `None` when absent or interpolated.
    pub fn static_attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name)
            .filter(|attr| !attr.has_expressions())
            .and_then(|attr| attr.value.as_deref())
    }

    /// Copy of the node with `attribute` placed first.
    pub fn with_injected_attribute(&self, attribute: Attribute) -> Node {
        let mut attributes = Vec::with_capacity(self.attributes.len() + 1);
        attributes.push(attribute);
        attributes.extend(self.attributes.iter().cloned());
        Node {
            attributes,
            ..self.clone()
        }
    }

    /// Copy of the node without the named attributes.
    pub fn without_attributes(&self, names: &[&str]) -> Node {
        Node {
            attributes: self
                .attributes
                .iter()
                .filter(|attr| attr.is_spread || !names.contains(&attr.name()))
                .cloned()
                .collect(),
            ..self.clone()
        }
    }
}

/// The `exprN="exprN"` marker that pairs an element with its binding.
pub fn selector_attribute(selector: &str) -> Attribute {
    Attribute::new(selector, Some(selector))
}
