use crate::builder::{TemplateBuilder, BINDING_TYPES, GET_COMPONENT};
use crate::classify::{is_component, is_removable, is_slot};
use crate::error::{
    CompilerError, ErrorKind, Result, ERR_DIRECTIVE_SYNTAX, ERR_EACH_SYNTAX, ERR_EMPTY_IS,
    ERR_INTERNAL,
};
use crate::ir::{
    Attribute, Node, TemplateExpression, EACH_DIRECTIVE, IF_DIRECTIVE, IS_DIRECTIVE,
    KEY_ATTRIBUTE, NAME_ATTRIBUTE, SLOT_ATTRIBUTE, TEMPLATE_TAG,
};
use oxc_ast::ast::{Expression, ObjectPropertyKind};
use regex::Regex;

pub const EACH_BINDING: &str = "EACH";
pub const IF_BINDING: &str = "IF";
pub const TAG_BINDING: &str = "TAG";
pub const SLOT_BINDING: &str = "SLOT";

pub const DEFAULT_SLOT_NAME: &str = "default";

lazy_static::lazy_static! {
    static ref EACH_REGEX: Regex =
        Regex::new(r"^\s*\(?\s*([A-Za-z_$][\w$]*)(?:\s*,\s*([A-Za-z_$][\w$]*))?\s*\)?\s+in\s+(\S[\s\S]*)$")
            .unwrap();
}

/// Parsed `item[, index] in collection` directive. The names may be
/// parenthesized: `(item, index) in collection`.
#[derive(Debug, Clone, PartialEq)]
pub struct EachDirective {
    pub item_name: String,
    pub index_name: Option<String>,
    /// The collection, positioned where it sits in the source.
    pub collection: TemplateExpression,
}

pub fn parse_each_directive(
    expression: &TemplateExpression,
    source_file: &str,
    source_code: &str,
) -> Result<EachDirective> {
    let Some(captures) = EACH_REGEX.captures(&expression.text) else {
        return Err(CompilerError::syntax(
            ERR_EACH_SYNTAX,
            &format!("Malformed each directive `{}`", expression.text.trim()),
            source_file,
            source_code,
            expression.start,
        )
        .with_context(expression.text.clone())
        .with_hint("Write `item in items` or `item, index in items`."));
    };

    let item_name = captures[1].to_string();
    let index_name = captures.get(2).map(|m| m.as_str().to_string());
    let collection = match captures.get(3) {
        Some(m) => TemplateExpression::new(expression.start + m.start(), m.as_str()),
        None => TemplateExpression::default(),
    };
    Ok(EachDirective {
        item_name,
        index_name,
        collection,
    })
}

/// Expression carried by a directive attribute. A literal value is read as
/// expression text (`if="show"`). Blank values carry no expression.
fn directive_expression(attribute: &Attribute) -> Option<TemplateExpression> {
    attribute
        .expressions
        .first()
        .cloned()
        .or_else(|| {
            attribute
                .value
                .as_deref()
                .map(|value| TemplateExpression::new(attribute.start, value))
        })
        .filter(|expression| !expression.text.trim().is_empty())
}

impl<'a> TemplateBuilder<'a> {
    fn selector_properties(&self, selector: Option<&str>) -> Vec<ObjectPropertyKind<'a>> {
        match selector {
            Some(selector) => vec![
                self.property("redundantAttribute", self.string(selector)),
                self.property("selector", self.string(&format!("[{}]", selector))),
            ],
            None => vec![],
        }
    }

    fn binding_type(&self, kind: &str) -> ObjectPropertyKind<'a> {
        self.property("type", self.type_member(BINDING_TYPES, kind))
    }

    /// `_scope => <directive>` when the node carries the directive. A
    /// directive present without an expression is a syntax error.
    fn directive_evaluator(&self, node: &Node, name: &str) -> Result<Option<Expression<'a>>> {
        let Some(attribute) = node.attribute(name) else {
            return Ok(None);
        };
        let Some(expression) = directive_expression(attribute) else {
            return Err(CompilerError::syntax(
                ERR_DIRECTIVE_SYNTAX,
                &format!("Empty `{}` directive on <{}>", name, node.name()),
                &self.source_file,
                &self.source_code,
                attribute.start,
            )
            .with_hint(format!("Write `{}=\"{{ expression }}\"`.", name)));
        };
        let body = self.rewritten(&expression)?;
        Ok(Some(self.evaluate_function(body)?))
    }

    /// `{ redundantAttribute, selector, expressions }`, or just
    /// `{ expressions }` for roots.
    pub fn simple_binding(&self, selector: Option<&str>, expressions: Vec<Expression<'a>>) -> Expression<'a> {
        let mut properties = self.selector_properties(selector);
        properties.push(self.property("expressions", self.array(expressions)));
        self.object(properties)
    }

    /// Template mounted in place of a node carrying its own template. The
    /// node's tag is part of the template unless the node only mounts a
    /// component or a slot.
    pub fn nested_template(&mut self, node: &Node) -> Result<Expression<'a>> {
        if is_component(node) {
            let binding = self.tag_binding(node, None)?;
            return Ok(self.template_call(None, vec![binding]));
        }
        if is_slot(node) {
            let binding = self.slot_binding(node, None)?;
            return Ok(self.template_call(None, vec![binding]));
        }
        let output = if node.name() == TEMPLATE_TAG {
            self.build_fragment(node.nodes.clone())?
        } else {
            self.build_fragment(vec![node.clone()])?
        };
        Ok(self.template_call(Some(&output.html), output.bindings))
    }

    pub fn each_binding(&mut self, node: &Node, selector: Option<&str>) -> Result<Expression<'a>> {
        let attribute = node.attribute(EACH_DIRECTIVE);
        let Some(expression) = attribute.and_then(directive_expression) else {
            return Err(CompilerError::syntax(
                ERR_EACH_SYNTAX,
                "Empty each directive",
                &self.source_file,
                &self.source_code,
                attribute.map_or(0, |attr| attr.start),
            ));
        };
        let directive = parse_each_directive(&expression, &self.source_file, &self.source_code)?;

        let get_key = self.directive_evaluator(node, KEY_ATTRIBUTE)?;
        let condition = self.directive_evaluator(node, IF_DIRECTIVE)?;
        let template =
            self.nested_template(&node.without_attributes(&[EACH_DIRECTIVE, IF_DIRECTIVE, KEY_ATTRIBUTE]))?;
        let collection = self.rewritten(&directive.collection)?;
        let evaluate = self.evaluate_function(collection)?;

        let mut properties = vec![
            self.binding_type(EACH_BINDING),
            self.property("getKey", get_key.unwrap_or_else(|| self.null())),
            self.property("condition", condition.unwrap_or_else(|| self.null())),
            self.property("template", template),
        ];
        properties.extend(self.selector_properties(selector));
        properties.push(self.property("itemName", self.string(&directive.item_name)));
        if let Some(index_name) = &directive.index_name {
            properties.push(self.property("indexName", self.string(index_name)));
        }
        properties.push(self.property("evaluate", evaluate));
        Ok(self.object(properties))
    }

    pub fn if_binding(&mut self, node: &Node, selector: Option<&str>) -> Result<Expression<'a>> {
        let Some(evaluate) = self.directive_evaluator(node, IF_DIRECTIVE)? else {
            return Err(CompilerError::new(
                ERR_INTERNAL,
                ErrorKind::Structural,
                &format!("<{}> has no if directive", node.name()),
                &self.source_file,
                1,
                1,
            ));
        };
        let template = self.nested_template(&node.without_attributes(&[IF_DIRECTIVE]))?;

        let mut properties = vec![
            self.binding_type(IF_BINDING),
            self.property("evaluate", evaluate),
        ];
        properties.extend(self.selector_properties(selector));
        properties.push(self.property("template", template));
        Ok(self.object(properties))
    }

    /// Component name: the `is` directive when present, else the tag name.
    fn component_name_evaluator(&self, node: &Node) -> Result<Expression<'a>> {
        let body = match node.attribute(IS_DIRECTIVE) {
            Some(attribute) if attribute.has_expressions() => {
                self.rewritten(&attribute.expressions[0])?
            }
            Some(attribute) => {
                let value = attribute.value.as_deref().unwrap_or_default().trim();
                if value.is_empty() {
                    return Err(CompilerError::structural(
                        ERR_EMPTY_IS,
                        &format!("<{}> has an empty `is` directive", node.name()),
                        &self.source_file,
                        &self.source_code,
                        attribute.start,
                    ));
                }
                self.string(value)
            }
            None => self.string(node.name()),
        };
        self.evaluate_function(body)
    }

    /// Children grouped by their `slot` attribute, in order of first
    /// appearance. Unlabeled children go to `default`.
    pub fn slot_buckets(node: &Node) -> Vec<(String, Vec<Node>)> {
        let mut buckets: Vec<(String, Vec<Node>)> = Vec::new();
        for child in &node.nodes {
            let label = child
                .static_attribute_value(SLOT_ATTRIBUTE)
                .map(str::to_string)
                .unwrap_or_else(|| DEFAULT_SLOT_NAME.to_string());

            let contents = if is_removable(child) {
                child.nodes.clone()
            } else if child.is_tag() {
                vec![child.without_attributes(&[SLOT_ATTRIBUTE])]
            } else {
                vec![child.clone()]
            };

            match buckets.iter_mut().find(|(name, _)| *name == label) {
                Some((_, nodes)) => nodes.extend(contents),
                None => buckets.push((label, contents)),
            }
        }
        buckets.retain(|(_, nodes)| {
            nodes.iter().any(|n| {
                n.is_tag() || !n.expressions.is_empty() || !n.text.as_deref().unwrap_or_default().trim().is_empty()
            })
        });
        buckets
    }

    fn slot_descriptors(&mut self, node: &Node) -> Result<Vec<Expression<'a>>> {
        let mut slots = Vec::new();
        for (id, nodes) in Self::slot_buckets(node) {
            let output = self.build_fragment(nodes)?;
            slots.push(self.object(vec![
                self.property("id", self.string(&id)),
                self.property("html", self.string(&output.html)),
                self.property("bindings", self.array(output.bindings)),
            ]));
        }
        Ok(slots)
    }

    /// Dynamic attributes forwarded to a mounted component or slot.
    fn forwarded_attributes(&self, node: &Node, skip: &[&str]) -> Result<Vec<Expression<'a>>> {
        let mut attributes = Vec::new();
        for attribute in &node.attributes {
            if !attribute.has_expressions() || attribute.is_directive() {
                continue;
            }
            if !attribute.is_spread && skip.contains(&attribute.name()) {
                continue;
            }
            attributes.push(self.attribute_expression(attribute)?);
        }
        Ok(attributes)
    }

    pub fn tag_binding(&mut self, node: &Node, selector: Option<&str>) -> Result<Expression<'a>> {
        let evaluate = self.component_name_evaluator(node)?;
        let slots = self.slot_descriptors(node)?;
        let attributes = self.forwarded_attributes(node, &[])?;

        let mut properties = vec![
            self.binding_type(TAG_BINDING),
            self.property("getComponent", self.identifier(GET_COMPONENT)),
            self.property("evaluate", evaluate),
            self.property("slots", self.array(slots)),
            self.property("attributes", self.array(attributes)),
        ];
        properties.extend(self.selector_properties(selector));
        Ok(self.object(properties))
    }

    pub fn slot_binding(&mut self, node: &Node, selector: Option<&str>) -> Result<Expression<'a>> {
        let name = node
            .static_attribute_value(NAME_ATTRIBUTE)
            .unwrap_or(DEFAULT_SLOT_NAME)
            .to_string();
        let attributes = self.forwarded_attributes(node, &[NAME_ATTRIBUTE])?;

        let mut properties = vec![
            self.binding_type(SLOT_BINDING),
            self.property("attributes", self.array(attributes)),
            self.property("name", self.string(&name)),
        ];
        properties.extend(self.selector_properties(selector));
        if !node.nodes.is_empty() {
            let fallback = self.build_fragment(node.nodes.clone())?;
            properties.push(self.property(
                "template",
                self.template_call(Some(&fallback.html), fallback.bindings),
            ));
        }
        Ok(self.object(properties))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(text: &str) -> Result<EachDirective> {
        parse_each_directive(&TemplateExpression::new(10, text), "a.riot", text)
    }

    #[test]
    fn test_each_item_only() {
        let directive = parse("item in items").unwrap();
        assert_eq!(directive.item_name, "item");
        assert_eq!(directive.index_name, None);
        assert_eq!(directive.collection.text, "items");
        assert_eq!(directive.collection.start, 18);
    }

    #[test]
    fn test_each_item_and_index() {
        let directive = parse(" item, i in items.filter(x => x.ok) ").unwrap();
        assert_eq!(directive.item_name, "item");
        assert_eq!(directive.index_name.as_deref(), Some("i"));
        assert_eq!(directive.collection.text, "items.filter(x => x.ok) ");
    }

    #[test]
    fn test_each_parenthesized_names() {
        let directive = parse("(todo, i) in todos").unwrap();
        assert_eq!(directive.item_name, "todo");
        assert_eq!(directive.index_name.as_deref(), Some("i"));
        assert_eq!(directive.collection.text, "todos");
        assert_eq!(directive.collection.start, 23);
    }

    #[test]
    fn test_each_missing_item_is_syntax_error() {
        let err = parse("in items").unwrap_err();
        assert_eq!(err.code, ERR_EACH_SYNTAX);
        assert!(err.message.contains("Malformed each directive"));
    }

    #[test]
    fn test_slot_buckets_preserve_order() {
        let node = Node::tag(
            "my-widget",
            vec![],
            vec![
                Node::tag("span", vec![Attribute::new("slot", Some("label"))], vec![Node::text("Hi")]),
                Node::text("Default"),
                Node::tag("b", vec![Attribute::new("slot", Some("label"))], vec![]),
            ],
        );
        let buckets = TemplateBuilder::slot_buckets(&node);
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].0, "label");
        assert_eq!(buckets[0].1.len(), 2);
        assert!(!buckets[0].1[0].has_attribute("slot"));
        assert_eq!(buckets[1].0, "default");
        assert_eq!(buckets[1].1[0].text.as_deref(), Some("Default"));
    }
}
