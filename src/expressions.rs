use crate::builder::{TemplateBuilder, EXPRESSION_TYPES};
use crate::classify::rendered_children;
use crate::error::Result;
use crate::ir::{Attribute, Node, TemplateExpression, REF_ATTRIBUTE, VALUE_ATTRIBUTE};
use crate::rewriter::rewrite_expression;
use crate::scope::{parse_template_expression, SCOPE_IDENTIFIER};
use oxc_ast::ast::{Expression, ObjectPropertyKind};

pub const TEXT_EXPRESSION: &str = "TEXT";
pub const ATTRIBUTE_EXPRESSION: &str = "ATTRIBUTE";
pub const VALUE_EXPRESSION: &str = "VALUE";
pub const EVENT_EXPRESSION: &str = "EVENT";
pub const REF_EXPRESSION: &str = "REF";

const PROGRESS_TAG: &str = "progress";

/// Piece of an interpolated value.
#[derive(Debug, PartialEq)]
pub enum Segment<'e> {
    Literal(String),
    Expression(&'e TemplateExpression),
}

/// Splits `value` (as written, `{...}` included) around its expressions.
/// Without a value, or when the braces cannot be located, the expressions
/// are returned alone.
pub fn split_interpolations<'e>(
    value: Option<&str>,
    expressions: &'e [TemplateExpression],
) -> Vec<Segment<'e>> {
    let Some(value) = value else {
        return expressions.iter().map(Segment::Expression).collect();
    };

    let mut segments = Vec::new();
    let mut cursor = 0;
    let mut located = 0;
    for expression in expressions {
        let needle = format!("{{{}}}", expression.text);
        if let Some(pos) = value[cursor..].find(&needle) {
            if pos > 0 {
                segments.push(Segment::Literal(value[cursor..cursor + pos].to_string()));
            }
            cursor += pos + needle.len();
            located += 1;
        }
        segments.push(Segment::Expression(expression));
    }
    if located > 0 && cursor < value.len() {
        segments.push(Segment::Literal(value[cursor..].to_string()));
    }
    segments
}

pub fn is_event_attribute(name: &str) -> bool {
    name.starts_with("on")
}

/// `value` is bound as a property, except on render-only progress bars.
pub fn is_value_attribute(node: &Node, name: &str) -> bool {
    name == VALUE_ATTRIBUTE && node.name() != PROGRESS_TAG
}

impl<'a> TemplateBuilder<'a> {
    /// Parses and scope-rewrites one template expression.
    pub fn rewritten(&self, expression: &TemplateExpression) -> Result<Expression<'a>> {
        let mut expr = parse_template_expression(
            self.allocator,
            expression,
            &self.source_file,
            &self.source_code,
        )?;
        rewrite_expression(self.allocator, &mut expr);
        Ok(expr)
    }

    /// `_scope => body`
    pub fn evaluate_function(&self, body: Expression<'a>) -> Result<Expression<'a>> {
        self.arrow_function(SCOPE_IDENTIFIER, body)
    }

    /// One evaluator for all interpolations of a value. A lone expression is
    /// returned as is; otherwise the pieces are joined as strings.
    pub fn merged_evaluator(&self, segments: &[Segment]) -> Result<Expression<'a>> {
        let body = match segments {
            [Segment::Expression(expression)] => self.rewritten(expression)?,
            _ => {
                let mut items = Vec::with_capacity(segments.len());
                for segment in segments {
                    items.push(match segment {
                        Segment::Literal(text) => self.string(text),
                        Segment::Expression(expression) => self.rewritten(expression)?,
                    });
                }
                let join = self.static_member(self.array(items), "join");
                self.call(join, vec![self.string("")])
            }
        };
        self.evaluate_function(body)
    }

    fn expression_descriptor(
        &self,
        kind: &str,
        mut properties: Vec<ObjectPropertyKind<'a>>,
        evaluate: Expression<'a>,
    ) -> Expression<'a> {
        let mut all = vec![self.property("type", self.type_member(EXPRESSION_TYPES, kind))];
        all.append(&mut properties);
        all.push(self.property("evaluate", evaluate));
        self.object(all)
    }

    /// Interpolated text, located at runtime by its index among the parent's
    /// child nodes.
    pub fn text_expression(&self, node: &Node, child_node_index: usize) -> Result<Expression<'a>> {
        let mut segments = split_interpolations(node.text.as_deref(), &node.expressions);
        trim_outer_whitespace(&mut segments);
        let evaluate = self.merged_evaluator(&segments)?;
        Ok(self.expression_descriptor(
            TEXT_EXPRESSION,
            vec![self.property("childNodeIndex", self.number(child_node_index))],
            evaluate,
        ))
    }

    /// Generic attribute. Spread attributes get a `null` name.
    pub fn attribute_expression(&self, attribute: &Attribute) -> Result<Expression<'a>> {
        let evaluate = if attribute.has_expressions() {
            self.merged_evaluator(&split_interpolations(
                attribute.value.as_deref(),
                &attribute.expressions,
            ))?
        } else if attribute.is_boolean || attribute.value.is_none() {
            self.evaluate_function(self.boolean(true))?
        } else {
            self.evaluate_function(self.string(attribute.value.as_deref().unwrap_or_default()))?
        };

        let name = match &attribute.name {
            Some(name) if !attribute.is_spread => self.string(name),
            _ => self.null(),
        };
        let mut properties = vec![self.property("name", name)];
        if attribute.is_boolean {
            properties.push(self.property("isBoolean", self.boolean(true)));
        }
        Ok(self.expression_descriptor(ATTRIBUTE_EXPRESSION, properties, evaluate))
    }

    pub fn value_expression(&self, attribute: &Attribute) -> Result<Expression<'a>> {
        let evaluate = self.merged_evaluator(&split_interpolations(
            attribute.value.as_deref(),
            &attribute.expressions,
        ))?;
        Ok(self.expression_descriptor(VALUE_EXPRESSION, vec![], evaluate))
    }

    pub fn event_expression(&self, attribute: &Attribute) -> Result<Expression<'a>> {
        let evaluate = self.merged_evaluator(&split_interpolations(None, &attribute.expressions))?;
        Ok(self.expression_descriptor(
            EVENT_EXPRESSION,
            vec![self.property("name", self.string(attribute.name()))],
            evaluate,
        ))
    }

    pub fn ref_expression(&self, attribute: &Attribute) -> Result<Expression<'a>> {
        let evaluate = self.merged_evaluator(&split_interpolations(None, &attribute.expressions))?;
        Ok(self.expression_descriptor(REF_EXPRESSION, vec![], evaluate))
    }

    /// Dispatch order: value, event, ref, generic attribute.
    pub fn expression_for_attribute(&self, node: &Node, attribute: &Attribute) -> Result<Expression<'a>> {
        if attribute.is_spread {
            return self.attribute_expression(attribute);
        }
        let name = attribute.name();
        if is_value_attribute(node, name) {
            self.value_expression(attribute)
        } else if is_event_attribute(name) {
            self.event_expression(attribute)
        } else if name == REF_ATTRIBUTE {
            self.ref_expression(attribute)
        } else {
            self.attribute_expression(attribute)
        }
    }

    /// Dynamic attributes of `node`, then its interpolated text children.
    pub fn node_expressions(&self, node: &Node) -> Result<Vec<Expression<'a>>> {
        let mut expressions = Vec::new();
        for attribute in &node.attributes {
            if attribute.has_expressions() && !attribute.is_directive() {
                expressions.push(self.expression_for_attribute(node, attribute)?);
            }
        }
        self.push_text_expressions(node, &mut expressions)?;
        Ok(expressions)
    }

    /// Like [`Self::node_expressions`], but static attributes of the root are
    /// bound too, as literal evaluators.
    pub fn root_expressions(&self, root: &Node) -> Result<Vec<Expression<'a>>> {
        let mut expressions = Vec::new();
        for attribute in &root.attributes {
            if attribute.is_directive() {
                continue;
            }
            if attribute.has_expressions() {
                expressions.push(self.expression_for_attribute(root, attribute)?);
            } else {
                expressions.push(self.attribute_expression(attribute)?);
            }
        }
        self.push_text_expressions(root, &mut expressions)?;
        Ok(expressions)
    }

    fn push_text_expressions(&self, node: &Node, expressions: &mut Vec<Expression<'a>>) -> Result<()> {
        for (index, child) in rendered_children(node).into_iter().enumerate() {
            if child.is_text() && !child.expressions.is_empty() {
                expressions.push(self.text_expression(child, index)?);
            }
        }
        Ok(())
    }
}

fn trim_outer_whitespace(segments: &mut Vec<Segment>) {
    if let Some(Segment::Literal(text)) = segments.first_mut() {
        *text = text.trim_start().to_string();
    }
    if let Some(Segment::Literal(text)) = segments.last_mut() {
        *text = text.trim_end().to_string();
    }
    segments.retain(|segment| !matches!(segment, Segment::Literal(text) if text.is_empty()));
}
