use crate::ir::{Attribute, Node, TemplateExpression};

/// Read-only traversal over a template node tree.
///
/// Implementers override `visit_*` methods and call the matching `walk_*`
/// function to keep descending; not calling it prunes the subtree.
pub trait NodeVisitor {
    fn visit_node(&mut self, node: &Node) {
        walk_node(self, node);
    }

    fn visit_tag(&mut self, node: &Node) {
        walk_tag(self, node);
    }

    fn visit_text(&mut self, node: &Node) {
        walk_text(self, node);
    }

    fn visit_attribute(&mut self, _owner: &Node, attribute: &Attribute) {
        walk_attribute(self, attribute);
    }

    fn visit_expression(&mut self, _expression: &TemplateExpression) {
        // Leaf
    }

    fn visit_children(&mut self, children: &[Node]) {
        walk_children(self, children);
    }
}

pub fn walk_node<V: NodeVisitor + ?Sized>(visitor: &mut V, node: &Node) {
    if node.is_tag() {
        visitor.visit_tag(node);
    } else {
        visitor.visit_text(node);
    }
}

pub fn walk_tag<V: NodeVisitor + ?Sized>(visitor: &mut V, node: &Node) {
    for attribute in &node.attributes {
        visitor.visit_attribute(node, attribute);
    }
    visitor.visit_children(&node.nodes);
}

pub fn walk_text<V: NodeVisitor + ?Sized>(visitor: &mut V, node: &Node) {
    for expression in &node.expressions {
        visitor.visit_expression(expression);
    }
}

pub fn walk_attribute<V: NodeVisitor + ?Sized>(visitor: &mut V, attribute: &Attribute) {
    for expression in &attribute.expressions {
        visitor.visit_expression(expression);
    }
}

pub fn walk_children<V: NodeVisitor + ?Sized>(visitor: &mut V, children: &[Node]) {
    for node in children {
        visitor.visit_node(node);
    }
}

/// Every template expression of a tree, in document order.
pub fn collect_expressions(root: &Node) -> Vec<TemplateExpression> {
    struct Collector(Vec<TemplateExpression>);

    impl NodeVisitor for Collector {
        fn visit_expression(&mut self, expression: &TemplateExpression) {
            self.0.push(expression.clone());
        }
    }

    let mut collector = Collector(Vec::new());
    collector.visit_node(root);
    collector.0
}
