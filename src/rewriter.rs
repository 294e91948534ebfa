use crate::scope::{is_global, SCOPE_IDENTIFIER};
use oxc_allocator::{Allocator, CloneIn};
use oxc_ast::ast::*;
use oxc_ast::AstBuilder;
use oxc_ast_visit::walk_mut::{
    walk_assignment_target_property, walk_expression, walk_object_property,
    walk_simple_assignment_target, walk_statement,
};
use oxc_ast_visit::{Visit, VisitMut};
use oxc_span::Span;
use oxc_syntax::scope::ScopeFlags;
use std::collections::HashSet;

// ═══════════════════════════════════════════════════════════════════════════════
// BINDING NAMES
// Collects the names a pattern or parameter list binds, without entering
// nested functions or classes.
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct BindingNames {
    names: Vec<String>,
}

impl<'b> Visit<'b> for BindingNames {
    fn visit_binding_identifier(&mut self, ident: &BindingIdentifier<'b>) {
        self.names.push(ident.name.to_string());
    }

    fn visit_function(&mut self, _func: &Function<'b>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _arrow: &ArrowFunctionExpression<'b>) {}

    fn visit_class(&mut self, _class: &Class<'b>) {}
}

/// `var` names declared anywhere in a function body, nested blocks and
/// loop heads included. Nested functions and classes are not entered.
#[derive(Default)]
struct VarNames {
    names: Vec<String>,
}

impl<'b> Visit<'b> for VarNames {
    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration<'b>) {
        if decl.kind == VariableDeclarationKind::Var {
            for declarator in &decl.declarations {
                let mut collector = BindingNames::default();
                collector.visit_binding_pattern(&declarator.id);
                self.names.append(&mut collector.names);
            }
        }
    }

    fn visit_function(&mut self, _func: &Function<'b>, _flags: ScopeFlags) {}

    fn visit_arrow_function_expression(&mut self, _arrow: &ArrowFunctionExpression<'b>) {}

    fn visit_class(&mut self, _class: &Class<'b>) {}
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPE REWRITER
// Rewrites free identifiers of a template expression into `_scope.<name>`
// ═══════════════════════════════════════════════════════════════════════════════

pub struct ScopeRewriter<'a> {
    pub allocator: &'a Allocator,
    pub ast: AstBuilder<'a>,
    scope_stack: Vec<HashSet<String>>,
}

impl<'a> ScopeRewriter<'a> {
    pub fn new(allocator: &'a Allocator) -> Self {
        Self {
            allocator,
            ast: AstBuilder::new(allocator),
            scope_stack: Vec::new(),
        }
    }

    /// Rewrites `expr` in place. The scope stack is empty before and after.
    pub fn rewrite(&mut self, expr: &mut Expression<'a>) {
        self.visit_expression(expr);
        debug_assert!(self.scope_stack.is_empty());
    }

    fn push_scope(&mut self) {
        self.scope_stack.push(HashSet::new());
    }

    fn pop_scope(&mut self) {
        self.scope_stack.pop();
    }

    fn add_local(&mut self, name: String) {
        if let Some(scope) = self.scope_stack.last_mut() {
            scope.insert(name);
        }
    }

    fn add_locals(&mut self, names: Vec<String>) {
        for name in names {
            self.add_local(name);
        }
    }

    /// Innermost frame first, so a local binding shadows a global of the same name.
    fn is_local(&self, name: &str) -> bool {
        self.scope_stack.iter().rev().any(|s| s.contains(name))
    }

    fn should_rewrite(&self, name: &str) -> bool {
        if name == SCOPE_IDENTIFIER || self.is_local(name) {
            return false;
        }
        !is_global(name)
    }

    fn scope_member(&self, span: Span, name: &str) -> MemberExpression<'a> {
        let arena_str: &'a str = self.allocator.alloc_str(name);
        self.ast.member_expression_static(
            span,
            self.ast.expression_identifier(span, SCOPE_IDENTIFIER),
            self.ast.identifier_name(span, arena_str),
            false,
        )
    }

    fn pattern_names(pattern: &BindingPattern<'a>) -> Vec<String> {
        let mut collector = BindingNames::default();
        collector.visit_binding_pattern(pattern);
        collector.names
    }

    fn parameter_names(params: &FormalParameters<'a>) -> Vec<String> {
        let mut collector = BindingNames::default();
        collector.visit_formal_parameters(params);
        collector.names
    }

    /// Lexical declarations of a statement list are visible to the whole
    /// list. `var` is hoisted separately, to the enclosing function.
    fn hoist_declarations(&mut self, statements: &[Statement<'a>]) {
        for stmt in statements {
            match stmt {
                Statement::VariableDeclaration(var_decl)
                    if var_decl.kind != VariableDeclarationKind::Var =>
                {
                    for decl in &var_decl.declarations {
                        let names = Self::pattern_names(&decl.id);
                        self.add_locals(names);
                    }
                }
                Statement::FunctionDeclaration(func) => {
                    if let Some(id) = &func.id {
                        self.add_local(id.name.to_string());
                    }
                }
                Statement::ClassDeclaration(class) => {
                    if let Some(id) = &class.id {
                        self.add_local(id.name.to_string());
                    }
                }
                _ => {}
            }
        }
    }

    fn hoist_vars(&mut self, statements: &[Statement<'a>]) {
        let mut collector = VarNames::default();
        for stmt in statements {
            collector.visit_statement(stmt);
        }
        self.add_locals(collector.names);
    }

    /// Body of a function or arrow: its own frame receives every `var`.
    fn enter_function_body(&mut self, statements: &mut oxc_allocator::Vec<'a, Statement<'a>>) {
        self.hoist_vars(statements);
        self.visit_body(statements);
    }

    fn visit_body(&mut self, statements: &mut oxc_allocator::Vec<'a, Statement<'a>>) {
        self.hoist_declarations(statements);
        for stmt in statements.iter_mut() {
            self.visit_statement(stmt);
        }
    }

    /// The head of a `new` callee names a constructor and is left as is;
    /// computed members along the chain are still rewritten.
    fn visit_new_callee(&mut self, callee: &mut Expression<'a>) {
        match callee {
            Expression::Identifier(_) => {}
            Expression::StaticMemberExpression(member) => self.visit_new_callee(&mut member.object),
            Expression::PrivateFieldExpression(member) => self.visit_new_callee(&mut member.object),
            Expression::ComputedMemberExpression(member) => {
                self.visit_new_callee(&mut member.object);
                self.visit_expression(&mut member.expression);
            }
            Expression::ParenthesizedExpression(paren) => self.visit_new_callee(&mut paren.expression),
            _ => self.visit_expression(callee),
        }
    }

    fn visit_function_like(&mut self, func: &mut Function<'a>, own_name: bool) {
        self.push_scope();
        if own_name {
            if let Some(id) = &func.id {
                self.add_local(id.name.to_string());
            }
        }
        self.add_local("arguments".to_string());
        let names = Self::parameter_names(&func.params);
        self.add_locals(names);
        self.visit_formal_parameters(&mut func.params);
        if let Some(body) = &mut func.body {
            self.enter_function_body(&mut body.statements);
        }
        self.pop_scope();
    }
}

impl<'a> VisitMut<'a> for ScopeRewriter<'a> {
    fn visit_statement(&mut self, stmt: &mut Statement<'a>) {
        match stmt {
            Statement::BlockStatement(block) => {
                self.push_scope();
                self.visit_body(&mut block.body);
                self.pop_scope();
            }
            Statement::FunctionDeclaration(func) => {
                self.visit_function_like(func, false);
            }
            // Class bodies are emitted verbatim.
            Statement::ClassDeclaration(_) => {}
            _ => walk_statement(self, stmt),
        }
    }

    fn visit_expression(&mut self, expr: &mut Expression<'a>) {
        match expr {
            Expression::TSAsExpression(as_expr) => {
                let inner = as_expr.expression.clone_in(self.allocator);
                *expr = inner;
                self.visit_expression(expr);
            }
            Expression::TSNonNullExpression(nn_expr) => {
                let inner = nn_expr.expression.clone_in(self.allocator);
                *expr = inner;
                self.visit_expression(expr);
            }
            Expression::TSSatisfiesExpression(sat_expr) => {
                let inner = sat_expr.expression.clone_in(self.allocator);
                *expr = inner;
                self.visit_expression(expr);
            }
            Expression::TSTypeAssertion(assertion) => {
                let inner = assertion.expression.clone_in(self.allocator);
                *expr = inner;
                self.visit_expression(expr);
            }
            Expression::Identifier(id) => {
                let name = id.name.to_string();
                let span = id.span;
                if self.should_rewrite(&name) {
                    tracing::trace!(identifier = %name, "rewriting identifier to scope member");
                    *expr = Expression::from(self.scope_member(span, &name));
                }
            }
            Expression::ThisExpression(this) => {
                let span = this.span;
                *expr = self.ast.expression_identifier(span, SCOPE_IDENTIFIER);
            }
            Expression::ArrowFunctionExpression(arrow) => {
                self.push_scope();
                let names = Self::parameter_names(&arrow.params);
                self.add_locals(names);
                self.visit_formal_parameters(&mut arrow.params);
                self.enter_function_body(&mut arrow.body.statements);
                self.pop_scope();
            }
            Expression::FunctionExpression(func) => {
                self.visit_function_like(func, true);
            }
            Expression::ClassExpression(_) => {}
            Expression::NewExpression(new_expr) => {
                self.visit_new_callee(&mut new_expr.callee);
                for arg in new_expr.arguments.iter_mut() {
                    self.visit_argument(arg);
                }
            }
            _ => walk_expression(self, expr),
        }
    }

    fn visit_object_property(&mut self, prop: &mut ObjectProperty<'a>) {
        // The key stays literal once the value becomes `_scope.<key>`.
        prop.shorthand = false;
        walk_object_property(self, prop);
    }

    /// `({ a } = b)` becomes `({ a: _scope.a } = _scope.b)`.
    fn visit_assignment_target_property(&mut self, prop: &mut AssignmentTargetProperty<'a>) {
        if let AssignmentTargetProperty::AssignmentTargetPropertyIdentifier(shorthand) = prop {
            let name = shorthand.binding.name.to_string();
            if self.should_rewrite(&name) {
                tracing::trace!(identifier = %name, "rewriting destructuring target to scope member");
                let span = shorthand.span;
                let name_span = shorthand.binding.span;
                let target = AssignmentTarget::from(SimpleAssignmentTarget::from(
                    self.scope_member(name_span, &name),
                ));
                let binding = match shorthand.init.take() {
                    Some(mut init) => {
                        self.visit_expression(&mut init);
                        self.ast
                            .assignment_target_maybe_default_assignment_target_with_default(span, target, init)
                    }
                    None => AssignmentTargetMaybeDefault::from(target),
                };
                let arena_str: &'a str = self.allocator.alloc_str(&name);
                let key = PropertyKey::StaticIdentifier(
                    self.ast.alloc(self.ast.identifier_name(name_span, arena_str)),
                );
                *prop = self
                    .ast
                    .assignment_target_property_assignment_target_property_property(span, key, binding, false);
                return;
            }
        }
        walk_assignment_target_property(self, prop);
    }

    fn visit_simple_assignment_target(&mut self, target: &mut SimpleAssignmentTarget<'a>) {
        if let SimpleAssignmentTarget::AssignmentTargetIdentifier(id) = target {
            let name = id.name.to_string();
            let span = id.span;
            if self.should_rewrite(&name) {
                tracing::trace!(identifier = %name, "rewriting assignment target to scope member");
                *target = SimpleAssignmentTarget::from(self.scope_member(span, &name));
                return;
            }
        }
        walk_simple_assignment_target(self, target);
    }

    fn visit_for_of_statement(&mut self, stmt: &mut ForOfStatement<'a>) {
        self.push_scope();
        if let ForStatementLeft::VariableDeclaration(var_decl) = &stmt.left {
            for decl in &var_decl.declarations {
                let names = Self::pattern_names(&decl.id);
                self.add_locals(names);
            }
        }
        self.visit_for_statement_left(&mut stmt.left);
        self.visit_expression(&mut stmt.right);
        self.visit_statement(&mut stmt.body);
        self.pop_scope();
    }

    fn visit_for_in_statement(&mut self, stmt: &mut ForInStatement<'a>) {
        self.push_scope();
        if let ForStatementLeft::VariableDeclaration(var_decl) = &stmt.left {
            for decl in &var_decl.declarations {
                let names = Self::pattern_names(&decl.id);
                self.add_locals(names);
            }
        }
        self.visit_for_statement_left(&mut stmt.left);
        self.visit_expression(&mut stmt.right);
        self.visit_statement(&mut stmt.body);
        self.pop_scope();
    }

    fn visit_for_statement(&mut self, stmt: &mut ForStatement<'a>) {
        self.push_scope();
        if let Some(ForStatementInit::VariableDeclaration(var_decl)) = &stmt.init {
            for decl in &var_decl.declarations {
                let names = Self::pattern_names(&decl.id);
                self.add_locals(names);
            }
        }
        if let Some(init) = &mut stmt.init {
            self.visit_for_statement_init(init);
        }
        if let Some(test) = &mut stmt.test {
            self.visit_expression(test);
        }
        if let Some(update) = &mut stmt.update {
            self.visit_expression(update);
        }
        self.visit_statement(&mut stmt.body);
        self.pop_scope();
    }

    fn visit_catch_clause(&mut self, clause: &mut CatchClause<'a>) {
        self.push_scope();
        if let Some(param) = &clause.param {
            let names = Self::pattern_names(&param.pattern);
            self.add_locals(names);
        }
        self.visit_body(&mut clause.body.body);
        self.pop_scope();
    }
}

/// Rewrites every free identifier of `expr` to read from the scope object.
pub fn rewrite_expression<'a>(allocator: &'a Allocator, expr: &mut Expression<'a>) {
    ScopeRewriter::new(allocator).rewrite(expr);
}
