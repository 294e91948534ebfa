//! Scope rewriting of template expressions, printed back to source.

#[cfg(test)]
mod tests {
    use crate::codegen::print_expression;
    use crate::ir::TemplateExpression;
    use crate::rewriter::rewrite_expression;
    use crate::scope::parse_template_expression;
    use oxc_allocator::Allocator;

    fn rewrite(code: &str) -> String {
        let allocator = Allocator::default();
        let expression = TemplateExpression::new(0, code);
        let mut expr = parse_template_expression(&allocator, &expression, "test.riot", code)
            .unwrap_or_else(|e| panic!("failed to parse `{}`: {}", code, e));
        rewrite_expression(&allocator, &mut expr);
        print_expression(&allocator, &expr)
    }

    #[test]
    fn test_bare_identifier_reads_from_scope() {
        assert_eq!(rewrite("count"), "_scope.count");
        assert_eq!(rewrite("a + b"), "_scope.a + _scope.b");
    }

    #[test]
    fn test_member_chain_rewrites_head_only() {
        let out = rewrite("a.b.c");
        assert_eq!(out, "_scope.a.b.c");
        assert!(!out.contains("_scope.b"), "nested property was prefixed: {}", out);
    }

    #[test]
    fn test_computed_member_rewrites_both_sides() {
        assert_eq!(rewrite("items[index]"), "_scope.items[_scope.index]");
    }

    #[test]
    fn test_globals_are_untouched() {
        assert_eq!(rewrite("new Date()"), "new Date()");
        assert_eq!(rewrite("Math.max(1, 2)"), "Math.max(1, 2)");
        assert_eq!(rewrite("JSON.stringify(window.location)"), "JSON.stringify(window.location)");
    }

    #[test]
    fn test_new_callee_is_not_rewritten() {
        let out = rewrite("new Widget(options)");
        assert!(out.starts_with("new Widget("), "callee was rewritten: {}", out);
        assert!(out.contains("_scope.options"), "argument was not rewritten: {}", out);
    }

    #[test]
    fn test_this_becomes_scope() {
        assert_eq!(rewrite("this.title"), "_scope.title");
        assert_eq!(rewrite("this"), "_scope");
    }

    #[test]
    fn test_scope_identifier_is_left_alone() {
        assert_eq!(rewrite("_scope.count"), "_scope.count");
    }

    #[test]
    fn test_shorthand_property_is_expanded() {
        let out = rewrite("{ foo, bar: 1 }");
        assert!(out.contains("foo: _scope.foo"), "shorthand kept: {}", out);
        assert!(out.contains("bar: 1"), "{}", out);
    }

    #[test]
    fn test_arrow_parameters_are_local() {
        let out = rewrite("items.map(item => item.name + suffix)");
        assert!(out.starts_with("_scope.items.map("), "{}", out);
        assert!(out.contains("item.name"), "{}", out);
        assert!(!out.contains("_scope.item.name"), "parameter was rewritten: {}", out);
        assert!(out.contains("_scope.suffix"), "{}", out);
    }

    #[test]
    fn test_destructured_parameters_are_local() {
        let out = rewrite("({ id, tags: [first] }) => id + first + other");
        assert!(!out.contains("_scope.id"), "{}", out);
        assert!(!out.contains("_scope.first"), "{}", out);
        assert!(out.contains("_scope.other"), "{}", out);
    }

    #[test]
    fn test_local_shadows_global() {
        let out = rewrite("(window) => window.open()");
        assert!(!out.contains("_scope.window"), "{}", out);

        let out = rewrite("function (Date) { return Date + today }");
        assert!(!out.contains("_scope.Date"), "{}", out);
        assert!(out.contains("_scope.today"), "{}", out);
    }

    #[test]
    fn test_function_declarations_are_hoisted() {
        let out = rewrite("() => { const n = helper(x); function helper(v) { return v * n } return n }");
        assert!(!out.contains("_scope.helper"), "{}", out);
        assert!(!out.contains("_scope.n"), "{}", out);
        assert!(!out.contains("_scope.v"), "{}", out);
        assert!(out.contains("_scope.x"), "{}", out);
    }

    #[test]
    fn test_named_function_expression_sees_itself() {
        let out = rewrite("function loop(i) { return i ? loop(i - 1) : arguments.length }");
        assert!(!out.contains("_scope.loop"), "{}", out);
        assert!(!out.contains("_scope.arguments"), "{}", out);
    }

    #[test]
    fn test_catch_and_loop_bindings_are_local() {
        let out = rewrite(
            "() => { try { run() } catch (err) { log(err) } for (const key in map) { use(key) } for (let i = 0; i < n; i++) { tick(i) } }",
        );
        assert!(!out.contains("_scope.err"), "{}", out);
        assert!(!out.contains("_scope.key"), "{}", out);
        assert!(!out.contains("_scope.i"), "{}", out);
        for name in ["run", "log", "map", "use", "n", "tick"] {
            assert!(out.contains(&format!("_scope.{}", name)), "`{}` not rewritten: {}", name, out);
        }
    }

    #[test]
    fn test_var_is_function_scoped() {
        let out = rewrite("() => { { var v = 1 } return v }");
        assert!(out.contains("return v"), "{}", out);
        assert!(!out.contains("_scope.v"), "{}", out);

        let out = rewrite("() => { if (ok) { var w = 1 } else { let q = 2 } for (var k = 0; k < 3; k++) {} return w + q + k }");
        assert!(!out.contains("_scope.w"), "{}", out);
        assert!(!out.contains("_scope.k"), "{}", out);
        assert!(out.contains("_scope.q"), "let stays block scoped: {}", out);
        assert!(out.contains("_scope.ok"), "{}", out);
    }

    #[test]
    fn test_var_does_not_escape_nested_function() {
        let out = rewrite("() => { const f = () => { var hidden = 1 }; return hidden }");
        assert!(out.contains("return _scope.hidden"), "{}", out);
    }

    #[test]
    fn test_block_bindings_do_not_leak() {
        let out = rewrite("() => { { const inner = 1 } return inner }");
        assert!(out.contains("return _scope.inner"), "{}", out);
    }

    #[test]
    fn test_class_bodies_are_verbatim() {
        let out = rewrite("class extends Base { run() { return value } }");
        assert!(!out.contains("_scope"), "{}", out);
    }

    #[test]
    fn test_assignment_target_is_rewritten() {
        assert_eq!(rewrite("count = count + 1"), "_scope.count = _scope.count + 1");
        assert_eq!(rewrite("total++"), "_scope.total++");
    }

    #[test]
    fn test_destructuring_assignment_shorthand_is_expanded() {
        let out = rewrite("({ a } = b)");
        assert!(out.contains("a: _scope.a"), "{}", out);
        assert!(out.contains("= _scope.b"), "{}", out);

        let out = rewrite("({ a = fallback } = b)");
        assert!(out.contains("a: _scope.a = _scope.fallback"), "{}", out);

        let out = rewrite("(a) => ({ a } = b)");
        assert!(!out.contains("_scope.a"), "local target was rewritten: {}", out);
    }

    #[test]
    fn test_new_callee_member_head_is_not_rewritten() {
        assert_eq!(rewrite("new Foo.Bar()"), "new Foo.Bar()");
        let out = rewrite("new widgets[kind](options)");
        assert!(out.starts_with("new widgets[_scope.kind]("), "{}", out);
        assert!(out.contains("_scope.options"), "{}", out);
    }

    #[test]
    fn test_event_handler_body() {
        let out = rewrite("(e) => { e.preventDefault(); this.update({ open: !open }) }");
        assert!(out.contains("e.preventDefault()"), "{}", out);
        assert!(out.contains("_scope.update("), "{}", out);
        assert!(out.contains("open: !_scope.open"), "{}", out);
    }

    #[test]
    fn test_typescript_wrappers_are_stripped() {
        let out = rewrite("(value as number) + 1");
        assert!(out.contains("_scope.value"), "{}", out);
        assert!(!out.contains("as number"), "{}", out);
        assert_eq!(rewrite("user!.name"), "_scope.user.name");
    }
}
