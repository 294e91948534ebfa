//! Node classification.
//!
//! Every node is routed to exactly one [`NodeKind`]; the tree builder matches
//! on it exhaustively. Priority between directives is decided here and only
//! here: each > if > component (custom tag or `is`) > slot > plain bindings.

use crate::ir::{
    Node, EACH_DIRECTIVE, IF_DIRECTIVE, IS_DIRECTIVE, SLOT_ATTRIBUTE, SLOT_TAG, TEMPLATE_TAG,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// Text without interpolations.
    StaticText,
    /// Text with interpolations, evaluated by its parent's binding.
    DynamicText,
    /// A tag with nothing dynamic on it or on its direct text children.
    Static,
    /// A `<template slot>` wrapper that renders only its children.
    Removable,
    Each,
    If,
    Tag,
    Slot,
    /// A tag whose attributes or text children carry expressions.
    Dynamic,
}

pub fn classify(node: &Node) -> NodeKind {
    if node.is_text() {
        return if has_expressions(node) {
            NodeKind::DynamicText
        } else {
            NodeKind::StaticText
        };
    }
    if is_removable(node) {
        NodeKind::Removable
    } else if has_each(node) {
        NodeKind::Each
    } else if has_if(node) {
        NodeKind::If
    } else if is_component(node) {
        NodeKind::Tag
    } else if is_slot(node) {
        NodeKind::Slot
    } else if has_expressions(node) {
        NodeKind::Dynamic
    } else {
        NodeKind::Static
    }
}

pub fn has_each(node: &Node) -> bool {
    node.has_attribute(EACH_DIRECTIVE)
}

pub fn has_if(node: &Node) -> bool {
    node.has_attribute(IF_DIRECTIVE)
}

pub fn has_is(node: &Node) -> bool {
    node.has_attribute(IS_DIRECTIVE)
}

/// Custom elements and anything mounted through `is`.
pub fn is_component(node: &Node) -> bool {
    node.is_tag() && (node.is_custom || has_is(node))
}

pub fn is_slot(node: &Node) -> bool {
    node.is_tag() && node.name() == SLOT_TAG
}

pub fn has_slot_attribute(node: &Node) -> bool {
    node.has_attribute(SLOT_ATTRIBUTE)
}

/// Own expressions, interpolated non-directive attributes, or interpolated
/// direct text children. Children of removable wrappers count as direct
/// children; grandchildren are not inspected.
pub fn has_expressions(node: &Node) -> bool {
    !node.expressions.is_empty()
        || node
            .attributes
            .iter()
            .any(|attr| attr.has_expressions() && !attr.is_directive())
        || rendered_children(node)
            .iter()
            .any(|child| child.is_text() && !child.expressions.is_empty())
}

/// Children as they end up in the DOM: removable wrappers are replaced by
/// their own children, recursively.
pub fn rendered_children(node: &Node) -> Vec<&Node> {
    fn collect<'n>(nodes: &'n [Node], out: &mut Vec<&'n Node>) {
        for node in nodes {
            if is_removable(node) {
                collect(&node.nodes, out);
            } else {
                out.push(node);
            }
        }
    }
    let mut children = Vec::with_capacity(node.nodes.len());
    collect(&node.nodes, &mut children);
    children
}

pub fn is_static(node: &Node) -> bool {
    !has_expressions(node)
        && !has_each(node)
        && !has_if(node)
        && !is_component(node)
        && !is_slot(node)
}

pub fn is_removable(node: &Node) -> bool {
    node.is_tag()
        && node.name() == TEMPLATE_TAG
        && has_slot_attribute(node)
        && !has_each(node)
        && !has_if(node)
}

pub fn has_its_own_template(node: &Node) -> bool {
    has_each(node) || has_if(node) || is_component(node)
}
