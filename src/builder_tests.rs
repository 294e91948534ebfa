//! Template HTML and binding descriptors for parsed components.

#[cfg(test)]
mod tests {
    use crate::builder::TemplateBuilder;
    use crate::codegen::print_expression;
    use crate::error::{ERR_DIRECTIVE_SYNTAX, ERR_EACH_SYNTAX, ERR_EMPTY_IS, ERR_EXPRESSION_SYNTAX};
    use crate::ir::{Attribute, Node};
    use crate::parse::parse_component;
    use oxc_allocator::Allocator;

    struct Built {
        html: String,
        /// Printed bindings array.
        code: String,
        selectors: usize,
    }

    impl Built {
        /// Printed bindings with all whitespace removed.
        fn squashed(&self) -> String {
            self.code.chars().filter(|c| !c.is_whitespace()).collect()
        }
    }

    fn build(source: &str) -> Built {
        try_build(source).unwrap_or_else(|e| panic!("build failed: {}", e))
    }

    fn try_build(source: &str) -> crate::error::Result<Built> {
        let allocator = Allocator::default();
        let parsed = parse_component(source, "test.riot")?;
        let root = parsed.template.expect("component has a root tag");
        let mut builder = TemplateBuilder::new(&allocator, "test.riot", source);
        let output = builder.build(&root)?;
        let selectors = builder.selectors_allocated();
        let bindings = builder.array(output.bindings);
        Ok(Built {
            html: output.html,
            code: print_expression(&allocator, &bindings),
            selectors,
        })
    }

    #[test]
    fn test_text_interpolation() {
        let built = build("<my-app><p>{x}</p></my-app>");
        assert_eq!(built.html, "<p expr0=\"expr0\"> </p>");
        let code = built.squashed();
        assert!(code.contains("redundantAttribute:'expr0'"), "{}", code);
        assert!(code.contains("selector:'[expr0]'"), "{}", code);
        assert!(code.contains("type:expressionTypes.TEXT"), "{}", code);
        assert!(code.contains("childNodeIndex:0"), "{}", code);
        assert!(code.contains("=>_scope.x"), "{}", code);
    }

    #[test]
    fn test_each_binding() {
        let built = build("<my-app><ul><li each=\"item in items\">{item}</li></ul></my-app>");
        assert_eq!(built.html, "<ul><li expr0=\"expr0\"></li></ul>");
        // Nested loop templates keep the looped tag. The <li> is still dynamic
        // there, so it carries its own selector instead of a bare `<li> </li>`.
        assert!(built.code.contains("'<li expr1=\"expr1\"> </li>'"), "{}", built.code);

        let code = built.squashed();
        assert!(code.contains("type:bindingTypes.EACH"), "{}", code);
        assert!(code.contains("getKey:null"), "{}", code);
        assert!(code.contains("condition:null"), "{}", code);
        assert!(code.contains("selector:'[expr0]'"), "{}", code);
        assert!(code.contains("itemName:'item'"), "{}", code);
        assert!(!code.contains("indexName"), "{}", code);
        assert!(code.contains("=>_scope.items"), "{}", code);
        assert!(code.contains("=>_scope.item}"), "{}", code);
    }

    #[test]
    fn test_each_binding_with_index_and_key() {
        let built = build("<my-app><li each=\"{ (todo, i) in todos }\" key=\"{todo.id}\">{i}</li></my-app>");
        let code = built.squashed();
        assert!(code.contains("type:bindingTypes.EACH"), "{}", code);
        assert!(code.contains("getKey:(_scope)=>_scope.todo.id") || code.contains("getKey:_scope=>_scope.todo.id"), "{}", code);
        assert!(code.contains("itemName:'todo'"), "{}", code);
        assert!(code.contains("indexName:'i'"), "{}", code);
        assert!(!code.contains("key="), "{}", code);
    }

    #[test]
    fn test_if_binding() {
        let built = build("<my-app><div if=\"{show}\">{msg}</div></my-app>");
        assert_eq!(built.html, "<div expr0=\"expr0\"></div>");
        let code = built.squashed();
        assert!(code.contains("type:bindingTypes.IF"), "{}", code);
        assert!(code.contains("evaluate:(_scope)=>_scope.show") || code.contains("evaluate:_scope=>_scope.show"), "{}", code);
        assert!(built.code.contains("'<div expr1=\"expr1\"> </div>'"), "{}", built.code);
        assert!(code.contains("=>_scope.msg"), "{}", code);
    }

    #[test]
    fn test_if_on_static_element_inlines_its_markup() {
        let built = build("<my-app><p if=\"{ok}\">Hi</p></my-app>");
        assert!(built.code.contains("template('<p>Hi</p>', [])"), "{}", built.code);
        assert_eq!(built.selectors, 1);
    }

    #[test]
    fn test_component_binding_with_slots() {
        let built = build(
            "<my-app><my-widget foo=\"{bar}\"><span slot=\"label\">Hi</span>Default</my-widget></my-app>",
        );
        assert_eq!(built.html, "<my-widget expr0=\"expr0\"></my-widget>");
        let code = built.squashed();
        assert!(code.contains("type:bindingTypes.TAG"), "{}", code);
        assert!(code.contains("getComponent:getComponent"), "{}", code);
        assert!(code.contains("=>'my-widget'"), "{}", code);

        let label = code.find("id:'label'").expect("label slot");
        let default = code.find("id:'default'").expect("default slot");
        assert!(label < default, "slots out of order: {}", code);
        assert!(code.contains("id:'label',html:'<span>Hi</span>',bindings:[]"), "{}", code);
        assert!(code.contains("id:'default',html:'Default',bindings:[]"), "{}", code);

        assert!(code.contains("type:expressionTypes.ATTRIBUTE,name:'foo'"), "{}", code);
        assert!(code.contains("=>_scope.bar"), "{}", code);
    }

    #[test]
    fn test_template_slot_wrapper_is_removed() {
        let built = build("<my-app><my-card><template slot=\"head\"><b>{title}</b></template></my-card></my-app>");
        let code = built.squashed();
        assert!(code.contains("id:'head'"), "{}", code);
        assert!(built.code.contains("'<b expr1=\"expr1\"> </b>'"), "{}", built.code);
        assert!(!code.contains("<template"), "{}", code);
        assert!(code.contains("=>_scope.title"), "{}", code);
    }

    #[test]
    fn test_template_slot_wrapper_outside_component_keeps_expressions() {
        let built = build("<my-app><div><template slot=\"a\">{x}</template></div></my-app>");
        assert_eq!(built.html, "<div expr0=\"expr0\"> </div>");
        let code = built.squashed();
        assert!(code.contains("type:expressionTypes.TEXT,childNodeIndex:0"), "{}", code);
        assert!(code.contains("=>_scope.x"), "{}", code);
    }

    #[test]
    fn test_child_node_index_counts_spliced_children() {
        let built = build("<my-app><p><template slot=\"a\"><b>a</b><i>b</i></template>{y}</p></my-app>");
        assert_eq!(built.html, "<p expr0=\"expr0\"><b>a</b><i>b</i> </p>");
        let code = built.squashed();
        assert!(code.contains("childNodeIndex:2"), "{}", code);
        assert!(code.contains("=>_scope.y"), "{}", code);
    }

    #[test]
    fn test_directive_expressions_alone_allocate_no_selector() {
        let built = build("<my-app><div key=\"{id}\">static</div></my-app>");
        assert_eq!(built.html, "<div>static</div>");
        assert_eq!(built.code, "[]");
        assert_eq!(built.selectors, 0);
    }

    #[test]
    fn test_empty_if_directive_is_fatal() {
        let err = try_build("<my-app>\n  <div if>z</div>\n</my-app>").err().expect("empty if");
        assert_eq!(err.code, ERR_DIRECTIVE_SYNTAX);
        assert_eq!((err.line, err.column), (2, 8));

        let err = try_build("<my-app><div if=\"\">z</div></my-app>").err().expect("blank if");
        assert_eq!(err.code, ERR_DIRECTIVE_SYNTAX);
    }

    #[test]
    fn test_empty_key_directive_is_fatal() {
        let err = try_build("<my-app><li each=\"{x in xs}\" key>{x}</li></my-app>").err().expect("empty key");
        assert_eq!(err.code, ERR_DIRECTIVE_SYNTAX);
        assert!(err.message.contains("`key`"), "{}", err.message);
    }

    #[test]
    fn test_literal_directive_value_keeps_its_offset() {
        let allocator = Allocator::default();
        let source = "<my-app>\n  <p if=\"a +\"></p>\n</my-app>";
        let start = source.find("a +").unwrap();
        let root = Node::tag(
            "my-app",
            vec![],
            vec![Node::tag("p", vec![Attribute::new("if", Some("a +")).at(start)], vec![])],
        );
        let mut builder = TemplateBuilder::new(&allocator, "test.riot", source);
        let err = builder.build(&root).err().expect("invalid expression");
        assert_eq!(err.code, ERR_EXPRESSION_SYNTAX);
        assert_eq!((err.line, err.column), (2, 10));
    }

    #[test]
    fn test_is_directive_mounts_component() {
        let code = build("<my-app><div is=\"{which}\" class=\"box\"></div></my-app>").squashed();
        assert!(code.contains("type:bindingTypes.TAG"), "{}", code);
        assert!(code.contains("=>_scope.which"), "{}", code);

        let code = build("<my-app><div is=\"user-card\"></div></my-app>").squashed();
        assert!(code.contains("=>'user-card'"), "{}", code);
    }

    #[test]
    fn test_empty_is_directive_is_rejected() {
        let err = try_build("<my-app><div is=\"\"></div></my-app>").err().expect("empty is");
        assert_eq!(err.code, ERR_EMPTY_IS);
        assert_eq!((err.line, err.column), (1, 18));
    }

    #[test]
    fn test_slot_binding() {
        let built = build("<my-app><slot name=\"footer\" item=\"{x}\">Fallback</slot><slot/></my-app>");
        assert_eq!(
            built.html,
            "<slot expr0=\"expr0\" name=\"footer\"></slot><slot expr1=\"expr1\"></slot>"
        );
        let code = built.squashed();
        assert!(code.contains("type:bindingTypes.SLOT"), "{}", code);
        assert!(code.contains("name:'footer'"), "{}", code);
        assert!(code.contains("name:'default'"), "{}", code);
        assert!(code.contains("name:'item'"), "{}", code);
        assert!(code.contains("template:template('Fallback',[])"), "{}", code);
    }

    #[test]
    fn test_merged_attribute_evaluator() {
        let built = build("<my-app><p class=\"{a} red {b}\"></p></my-app>");
        assert_eq!(built.html, "<p expr0=\"expr0\"></p>");
        assert!(built.code.contains("[_scope.a, ' red ', _scope.b].join('')"), "{}", built.code);
        assert!(built.squashed().contains("name:'class'"), "{}", built.code);
    }

    #[test]
    fn test_malformed_each_is_fatal() {
        let err = try_build("<my-app><li each=\"in items\"></li></my-app>").err().expect("syntax error");
        assert_eq!(err.code, ERR_EACH_SYNTAX);
        assert!(err.message.contains("Malformed each directive"), "{}", err.message);
    }

    #[test]
    fn test_attribute_dispatch() {
        let code = build(
            "<my-app><input value=\"{v}\" onclick=\"{go}\" ref=\"{setRef}\"/><progress value=\"{p}\"></progress></my-app>",
        )
        .squashed();
        assert!(code.contains("type:expressionTypes.VALUE"), "{}", code);
        assert!(code.contains("type:expressionTypes.EVENT,name:'onclick'"), "{}", code);
        assert!(code.contains("type:expressionTypes.REF"), "{}", code);
        assert!(code.contains("type:expressionTypes.ATTRIBUTE,name:'value'"), "{}", code);
    }

    #[test]
    fn test_spread_attribute_has_null_name() {
        let code = build("<my-app><div {...props}></div></my-app>").squashed();
        assert!(code.contains("type:expressionTypes.ATTRIBUTE,name:null"), "{}", code);
        assert!(code.contains("=>_scope.props"), "{}", code);
    }

    #[test]
    fn test_boolean_attribute_flag() {
        let code = build("<my-app><button disabled=\"{busy}\"></button></my-app>").squashed();
        assert!(code.contains("name:'disabled',isBoolean:true"), "{}", code);
    }

    #[test]
    fn test_root_attributes_are_bound() {
        let built = build("<my-app class=\"app\" title=\"{t}\">{greeting}</my-app>");
        assert_eq!(built.html, " ");
        assert_eq!(built.selectors, 0);
        let code = built.squashed();
        assert!(!code.contains("selector"), "{}", code);
        assert!(code.contains("name:'class'"), "{}", code);
        assert!(code.contains("=>'app'"), "{}", code);
        assert!(code.contains("name:'title'"), "{}", code);
        assert!(code.contains("=>_scope.t"), "{}", code);
        assert!(code.contains("type:expressionTypes.TEXT,childNodeIndex:0"), "{}", code);
    }

    #[test]
    fn test_static_markup_passes_through() {
        let built = build("<my-app><section class=\"a\"><h1>Title &amp; more</h1><input disabled/><br/></section></my-app>");
        assert_eq!(
            built.html,
            "<section class=\"a\"><h1>Title &amp; more</h1><input disabled/><br/></section>"
        );
        assert_eq!(built.code, "[]");
        assert_eq!(built.selectors, 0);
    }

    #[test]
    fn test_each_wins_over_if() {
        let code = build(
            "<my-app><my-item each=\"{item in items}\" if=\"{item.visible}\" item=\"{item}\"></my-item></my-app>",
        )
        .squashed();
        assert_eq!(code.matches("bindingTypes.EACH").count(), 1, "{}", code);
        assert_eq!(code.matches("bindingTypes.IF").count(), 0, "{}", code);
        assert!(code.contains("=>_scope.item.visible"), "{}", code);
        // The component is mounted inside the loop's template.
        assert!(code.contains("template:template(null,[{type:bindingTypes.TAG"), "{}", code);
        assert!(code.contains("name:'item'"), "{}", code);
    }

    #[test]
    fn test_selectors_are_unique() {
        let built = build(concat!(
            "<my-app title=\"{t}\">",
            "<header><h1>{title}</h1><nav><a each=\"{link in links}\" href=\"{link.url}\">{link.label}</a></nav></header>",
            "<main><p if=\"{ready}\" class=\"{cls}\">{body}</p><my-list items=\"{items}\"><li slot=\"row\">{row}</li></my-list></main>",
            "<footer><slot name=\"footer\"/></footer>",
            "</my-app>"
        ));
        assert!(built.selectors > 5);
        for n in 0..built.selectors {
            let attribute = format!("expr{0}=\\\"expr{0}\\\"", n);
            let plain_attribute = format!("expr{0}=\"expr{0}\"", n);
            let in_html = built.html.matches(&plain_attribute).count();
            let in_nested = built.code.matches(&plain_attribute).count()
                + built.code.matches(&attribute).count();
            assert_eq!(in_html + in_nested, 1, "expr{} placed {} times", n, in_html + in_nested);
            let selector = format!("'[expr{}]'", n);
            assert_eq!(built.code.matches(&selector).count(), 1, "selector {} bound more than once", selector);
        }
    }

    #[test]
    fn test_fresh_builders_restart_numbering() {
        let source = "<my-app><p>{a}</p><p>{b}</p></my-app>";
        let first = build(source);
        let second = build(source);
        assert_eq!(first.html, second.html);
        assert_eq!(first.code, second.code);
        assert_eq!(first.selectors, 2);
    }
}
