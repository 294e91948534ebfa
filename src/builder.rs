//! Template tree builder.
//!
//! Walks a node tree depth first and produces the static HTML of the
//! template together with the flat list of binding descriptors the runtime
//! attaches to it. Directive nodes are delegated to the binding builders in
//! `bindings.rs`, which build their nested templates through this same
//! builder so selector numbering stays monotonic across the whole component.

use crate::classify::{classify, rendered_children, NodeKind};
use crate::error::{CompilerError, ErrorKind, Result, ERR_INTERNAL};
use crate::ir::{selector_attribute, Node};
use oxc_allocator::{Allocator, Box as OxcBox};
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_ast_visit::VisitMut;
use oxc_parser::Parser;
use oxc_span::{SourceType, Span, SPAN};
use oxc_syntax::number::NumberBase;

pub const TEMPLATE_FUNCTION: &str = "template";
pub const EXPRESSION_TYPES: &str = "expressionTypes";
pub const BINDING_TYPES: &str = "bindingTypes";
pub const GET_COMPONENT: &str = "getComponent";

// ═══════════════════════════════════════════════════════════════════════════════
// SELECTORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-compilation `exprN` allocator. Never shared between compilations.
#[derive(Debug, Default)]
pub struct SelectorCounter {
    next: usize,
}

impl SelectorCounter {
    pub fn next_selector(&mut self) -> String {
        let selector = format!("expr{}", self.next);
        self.next += 1;
        selector
    }

    pub fn allocated(&self) -> usize {
        self.next
    }

    pub fn reset(&mut self) {
        self.next = 0;
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HTML SERIALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

/// Opening tag with the node's static, non-directive attributes only.
pub fn open_tag(node: &Node) -> String {
    let mut html = format!("<{}", node.name());
    for attr in &node.attributes {
        if attr.is_spread || attr.is_directive() || attr.has_expressions() {
            continue;
        }
        html.push(' ');
        html.push_str(attr.name());
        match attr.value.as_deref() {
            Some(value) if !attr.is_boolean => {
                html.push_str("=\"");
                html.push_str(&escape_attribute(value));
                html.push('"');
            }
            _ => {}
        }
    }
    html.push_str(if node.is_void { "/>" } else { ">" });
    html
}

pub fn close_tag(node: &Node) -> String {
    if node.is_void {
        String::new()
    } else {
        format!("</{}>", node.name())
    }
}

fn text_html(node: &Node) -> String {
    let text = node.text.as_deref().unwrap_or_default();
    if node.is_raw {
        text.to_string()
    } else {
        escape_text(text)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATE BUILDER
// ═══════════════════════════════════════════════════════════════════════════════

/// Resets every span of a generated subtree to the empty span.
pub struct ClearSpans;

impl<'a> VisitMut<'a> for ClearSpans {
    fn visit_span(&mut self, span: &mut Span) {
        *span = SPAN;
    }
}

/// HTML and bindings of one (possibly nested) template.
#[derive(Default)]
pub struct TemplateOutput<'a> {
    pub html: String,
    pub bindings: Vec<Expression<'a>>,
}

/// Build context of one compilation: the AST arena, the source being
/// compiled (for diagnostics) and the selector counter.
pub struct TemplateBuilder<'a> {
    pub allocator: &'a Allocator,
    pub ast: AstBuilder<'a>,
    pub source_file: String,
    pub source_code: String,
    selectors: SelectorCounter,
}

impl<'a> TemplateBuilder<'a> {
    pub fn new(allocator: &'a Allocator, source_file: &str, source_code: &str) -> Self {
        Self {
            allocator,
            ast: AstBuilder::new(allocator),
            source_file: source_file.to_string(),
            source_code: source_code.to_string(),
            selectors: SelectorCounter::default(),
        }
    }

    pub fn next_selector(&mut self) -> String {
        self.selectors.next_selector()
    }

    pub fn selectors_allocated(&self) -> usize {
        self.selectors.allocated()
    }

    pub fn reset_selectors(&mut self) {
        self.selectors.reset();
    }

    /// `template(html, [bindings])` for a component root.
    pub fn build_template(&mut self, root: &Node) -> Result<Expression<'a>> {
        let output = self.build(root)?;
        tracing::debug!(
            root = root.name(),
            bindings = output.bindings.len(),
            selectors = self.selectors_allocated(),
            "built component template"
        );
        Ok(self.template_call(Some(&output.html), output.bindings))
    }

    /// Builds the content of `root`. The root itself is not rendered: its
    /// attributes and direct text expressions become one selector-less
    /// binding, then each child is rendered in order.
    pub fn build(&mut self, root: &Node) -> Result<TemplateOutput<'a>> {
        let mut output = TemplateOutput::default();
        let expressions = self.root_expressions(root)?;
        if !expressions.is_empty() {
            output.bindings.push(self.simple_binding(None, expressions));
        }
        for child in rendered_children(root) {
            self.parse_node(child, &mut output)?;
        }
        Ok(output)
    }

    fn parse_node(&mut self, node: &Node, output: &mut TemplateOutput<'a>) -> Result<()> {
        match classify(node) {
            NodeKind::StaticText => output.html.push_str(&text_html(node)),
            // Placeholder text node, evaluated by the parent's binding.
            NodeKind::DynamicText => output.html.push(' '),
            NodeKind::Static => {
                output.html.push_str(&open_tag(node));
                for child in rendered_children(node) {
                    self.parse_node(child, output)?;
                }
                output.html.push_str(&close_tag(node));
            }
            // Only reached for a wrapper handed in directly; parents splice
            // wrappers away before visiting their children.
            NodeKind::Removable => {
                for child in rendered_children(node) {
                    self.parse_node(child, output)?;
                }
            }
            kind @ (NodeKind::Each | NodeKind::If | NodeKind::Tag | NodeKind::Slot) => {
                let selector = self.next_selector();
                tracing::debug!(tag = node.name(), selector = %selector, kind = ?kind, "binding");
                let marked = node.with_injected_attribute(selector_attribute(&selector));
                output.html.push_str(&open_tag(&marked));
                output.html.push_str(&close_tag(&marked));
                let binding = match kind {
                    NodeKind::Each => self.each_binding(node, Some(&selector))?,
                    NodeKind::If => self.if_binding(node, Some(&selector))?,
                    NodeKind::Tag => self.tag_binding(node, Some(&selector))?,
                    _ => self.slot_binding(node, Some(&selector))?,
                };
                output.bindings.push(binding);
            }
            NodeKind::Dynamic => {
                let selector = self.next_selector();
                let marked = node.with_injected_attribute(selector_attribute(&selector));
                output.html.push_str(&open_tag(&marked));
                let expressions = self.node_expressions(node)?;
                output
                    .bindings
                    .push(self.simple_binding(Some(&selector), expressions));
                for child in rendered_children(node) {
                    self.parse_node(child, output)?;
                }
                output.html.push_str(&close_tag(node));
            }
        }
        Ok(())
    }

    /// Builds a node list in isolation, with its own accumulators.
    pub fn build_fragment(&mut self, nodes: Vec<Node>) -> Result<TemplateOutput<'a>> {
        self.build(&Node::synthetic_root(nodes))
    }

    // ───────────────────────────────────────────────────────────────────────────
    // AST helpers
    // ───────────────────────────────────────────────────────────────────────────

    pub fn string(&self, value: &str) -> Expression<'a> {
        let arena_str: &'a str = self.allocator.alloc_str(value);
        self.ast.expression_string_literal(SPAN, arena_str, None)
    }

    pub fn null(&self) -> Expression<'a> {
        self.ast.expression_null_literal(SPAN)
    }

    pub fn boolean(&self, value: bool) -> Expression<'a> {
        self.ast.expression_boolean_literal(SPAN, value)
    }

    pub fn number(&self, value: usize) -> Expression<'a> {
        self.ast
            .expression_numeric_literal(SPAN, value as f64, None, NumberBase::Decimal)
    }

    pub fn identifier(&self, name: &str) -> Expression<'a> {
        let arena_str: &'a str = self.allocator.alloc_str(name);
        self.ast.expression_identifier(SPAN, arena_str)
    }

    /// `object.property`
    pub fn static_member(&self, object: Expression<'a>, property: &str) -> Expression<'a> {
        let arena_str: &'a str = self.allocator.alloc_str(property);
        Expression::from(self.ast.member_expression_static(
            SPAN,
            object,
            self.ast.identifier_name(SPAN, arena_str),
            false,
        ))
    }

    /// `expressionTypes.TEXT`, `bindingTypes.EACH`, ...
    pub fn type_member(&self, namespace: &str, kind: &str) -> Expression<'a> {
        self.static_member(self.identifier(namespace), kind)
    }

    pub fn property(&self, key: &str, value: Expression<'a>) -> ObjectPropertyKind<'a> {
        let arena_str: &'a str = self.allocator.alloc_str(key);
        self.ast.object_property_kind_object_property(
            SPAN,
            PropertyKind::Init,
            PropertyKey::StaticIdentifier(self.ast.alloc(self.ast.identifier_name(SPAN, arena_str))),
            value,
            false,
            false,
            false,
        )
    }

    pub fn object(&self, properties: Vec<ObjectPropertyKind<'a>>) -> Expression<'a> {
        let mut props = self.ast.vec();
        for prop in properties {
            props.push(prop);
        }
        self.ast.expression_object(SPAN, props)
    }

    pub fn array(&self, items: Vec<Expression<'a>>) -> Expression<'a> {
        let mut elements = self.ast.vec();
        for item in items {
            elements.push(ArrayExpressionElement::from(item));
        }
        self.ast.expression_array(SPAN, elements)
    }

    pub fn call(&self, callee: Expression<'a>, arguments: Vec<Expression<'a>>) -> Expression<'a> {
        let mut args = self.ast.vec();
        for arg in arguments {
            args.push(Argument::from(arg));
        }
        self.ast.expression_call(
            SPAN,
            callee,
            None::<OxcBox<TSTypeParameterInstantiation>>,
            args,
            false,
        )
    }

    /// `template(html, [bindings])`, with `null` html for templates that only
    /// mount a component or a slot.
    pub fn template_call(&self, html: Option<&str>, bindings: Vec<Expression<'a>>) -> Expression<'a> {
        let html = match html {
            Some(html) => self.string(html),
            None => self.null(),
        };
        self.call(
            self.identifier(TEMPLATE_FUNCTION),
            vec![html, self.array(bindings)],
        )
    }

    /// Parses generated code. Its spans are cleared since they do not point
    /// into the component source.
    fn parse_stub(&self, code: &str) -> Result<Expression<'a>> {
        let arena_code: &'a str = self.allocator.alloc_str(code);
        Parser::new(self.allocator, arena_code, SourceType::default().with_module(true))
            .parse_expression()
            .map(|mut stub| {
                ClearSpans.visit_expression(&mut stub);
                stub
            })
            .map_err(|_| {
                CompilerError::new(
                    ERR_INTERNAL,
                    ErrorKind::Structural,
                    &format!("Could not build `{}`", code),
                    &self.source_file,
                    1,
                    1,
                )
            })
    }

    /// Arrow function `params => body` with an expression body.
    pub fn arrow_function(&self, params: &str, body: Expression<'a>) -> Result<Expression<'a>> {
        let mut stub = self.parse_stub(&format!("({}) => 0", params))?;
        if let Expression::ArrowFunctionExpression(arrow) = &mut stub {
            if let Some(Statement::ExpressionStatement(stmt)) = arrow.body.statements.first_mut() {
                stmt.expression = body;
                return Ok(stub);
            }
        }
        Err(CompilerError::new(
            ERR_INTERNAL,
            ErrorKind::Structural,
            "Arrow function stub has no expression body",
            &self.source_file,
            1,
            1,
        ))
    }
}
