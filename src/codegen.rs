//! Module assembly and printing.
//!
//! The script section and the compiled template end up in one oxc `Program`:
//! the script's own statements first, then
//! `export default { css, exports, template, name }`. The program is printed
//! with `oxc_codegen`, which also produces the source map.

use crate::builder::{ClearSpans, TemplateBuilder, BINDING_TYPES, EXPRESSION_TYPES, GET_COMPONENT, TEMPLATE_FUNCTION};
use crate::error::{
    CompilerError, ErrorKind, Result, ERR_EXPORT_NOT_EXPRESSION, ERR_INTERNAL, ERR_SCRIPT_SYNTAX,
};
use oxc_allocator::{Allocator, CloneIn};
use oxc_ast::ast::*;
use oxc_ast_visit::VisitMut;
use oxc_codegen::{Codegen, CodegenOptions};
use oxc_parser::Parser;
use oxc_semantic::SemanticBuilder;
use oxc_span::SourceType;
use oxc_transformer::{TransformOptions, Transformer};
use std::path::{Path, PathBuf};

/// Copy of `source` with every byte outside `start..end` turned into a space,
/// line breaks kept, so offsets and line numbers stay valid.
pub fn blank_outside(source: &str, start: usize, end: usize) -> String {
    let mut out = String::with_capacity(source.len());
    for (i, c) in source.char_indices() {
        if (start..end).contains(&i) || c == '\n' || c == '\r' {
            out.push(c);
        } else {
            for _ in 0..c.len_utf8() {
                out.push(' ');
            }
        }
    }
    out
}

/// Script code ready to be parsed.
pub struct ScriptSource {
    pub code: String,
    /// Byte offset of the script in the component source, for diagnostics.
    pub offset: usize,
    /// `code` is the component source with everything but the script blanked.
    pub aligned: bool,
    pub typescript: bool,
}

/// Statements of the script section and its default export.
pub struct ScriptSection<'a> {
    pub program: Program<'a>,
    pub exports: Option<Expression<'a>>,
}

/// Parses the script, strips TypeScript, and detaches `export default`.
pub fn parse_script<'a>(
    allocator: &'a Allocator,
    script: &ScriptSource,
    source_file: &str,
    source_code: &str,
) -> Result<ScriptSection<'a>> {
    let code: &'a str = allocator.alloc_str(&script.code);
    let source_type = SourceType::default()
        .with_module(true)
        .with_typescript(script.typescript);

    let ret = Parser::new(allocator, code, source_type).parse();
    if !ret.errors.is_empty() {
        let details = ret
            .errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(CompilerError::syntax(
            ERR_SCRIPT_SYNTAX,
            &format!("Invalid script: {}", details),
            source_file,
            source_code,
            script.offset,
        ));
    }

    let mut program = ret.program;
    if script.typescript {
        strip_typescript(allocator, &mut program, source_file)?;
    }

    let body = std::mem::replace(&mut program.body, oxc_allocator::Vec::new_in(allocator));
    let mut exports = None;
    for stmt in body {
        match stmt {
            Statement::ExportDefaultDeclaration(decl) => match decl.declaration.as_expression() {
                Some(expr) => exports = Some(expr.clone_in(allocator)),
                None => {
                    let offset = if script.aligned {
                        decl.span.start as usize
                    } else {
                        script.offset
                    };
                    return Err(CompilerError::structural(
                        ERR_EXPORT_NOT_EXPRESSION,
                        "The default export of a component must be an expression",
                        source_file,
                        source_code,
                        offset,
                    )
                    .with_hint("Write `export default { ... }`."));
                }
            },
            other => program.body.push(other),
        }
    }

    if script.aligned {
        program.source_text = allocator.alloc_str(source_code);
    }
    Ok(ScriptSection { program, exports })
}

fn strip_typescript<'a>(
    allocator: &'a Allocator,
    program: &mut Program<'a>,
    source_file: &str,
) -> Result<()> {
    let scoping = SemanticBuilder::new()
        .with_excess_capacity(2.0)
        .build(program)
        .semantic
        .into_scoping();

    let mut options = TransformOptions::default();
    // Imports referenced only from template expressions look unused here.
    options.typescript.only_remove_type_imports = true;
    let ret = Transformer::new(allocator, Path::new(source_file), &options)
        .build_with_scoping(scoping, program);

    if let Some(error) = ret.errors.first() {
        return Err(CompilerError::new(
            ERR_SCRIPT_SYNTAX,
            ErrorKind::Syntax,
            &format!("Could not strip TypeScript: {}", error),
            source_file,
            1,
            1,
        ));
    }
    Ok(())
}

/// Pieces of the default-exported component object.
pub struct ModuleParts<'a> {
    pub css: Option<String>,
    pub exports: Option<Expression<'a>>,
    pub template: Option<Expression<'a>>,
    pub name: Option<String>,
}

/// Appends `export default { css, exports, template, name }` to `program`.
pub fn append_component_export<'a>(
    builder: &TemplateBuilder<'a>,
    program: &mut Program<'a>,
    parts: ModuleParts<'a>,
) -> Result<()> {
    let css = match &parts.css {
        Some(css) => builder.string(css),
        None => builder.null(),
    };
    let exports = parts.exports.unwrap_or_else(|| builder.null());
    let template = match parts.template {
        Some(template_call) => builder.arrow_function(
            &[TEMPLATE_FUNCTION, EXPRESSION_TYPES, BINDING_TYPES, GET_COMPONENT].join(", "),
            template_call,
        )?,
        None => builder.null(),
    };
    let name = match &parts.name {
        Some(name) => builder.string(name),
        None => builder.null(),
    };

    let component = builder.object(vec![
        builder.property("css", css),
        builder.property("exports", exports),
        builder.property("template", template),
        builder.property("name", name),
    ]);

    let stub = Parser::new(builder.allocator, "export default 0;", SourceType::mjs()).parse();
    let Some(mut stmt) = stub.program.body.into_iter().next() else {
        return Err(internal_error(&builder.source_file));
    };
    ClearSpans.visit_statement(&mut stmt);
    match &mut stmt {
        Statement::ExportDefaultDeclaration(decl) => {
            decl.declaration = ExportDefaultDeclarationKind::from(component);
        }
        _ => return Err(internal_error(&builder.source_file)),
    }
    program.body.push(stmt);
    Ok(())
}

fn internal_error(source_file: &str) -> CompilerError {
    CompilerError::new(
        ERR_INTERNAL,
        ErrorKind::Structural,
        "Could not build the component export",
        source_file,
        1,
        1,
    )
}

/// Printed module and its JSON source map.
pub struct PrintedModule {
    pub code: String,
    pub map: Option<String>,
}

pub fn print_module(program: &Program<'_>, source_file: &str, source_map: bool) -> PrintedModule {
    let options = CodegenOptions {
        single_quote: true,
        source_map_path: source_map.then(|| PathBuf::from(source_file)),
        ..CodegenOptions::default()
    };
    let ret = Codegen::new().with_options(options).build(program);
    PrintedModule {
        code: ret.code,
        map: ret.map.map(|map| map.to_json_string()),
    }
}

/// Prints a single expression as source text.
pub fn print_expression<'a>(allocator: &'a Allocator, expr: &Expression<'a>) -> String {
    let ret = Parser::new(allocator, "0;", SourceType::mjs()).parse();
    let mut program = ret.program;
    if let Some(Statement::ExpressionStatement(stmt)) = program.body.first_mut() {
        stmt.expression = expr.clone_in(allocator);
    }
    let code = Codegen::new()
        .with_options(CodegenOptions {
            single_quote: true,
            ..CodegenOptions::default()
        })
        .build(&program)
        .code;
    code.trim_end().trim_end_matches(';').to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use oxc_span::GetSpan;

    #[test]
    fn test_blank_outside_keeps_offsets() {
        let source = "<a>\n<script>x</script>é";
        let start = source.find('x').unwrap();
        let blanked = blank_outside(source, start, start + 1);
        assert_eq!(blanked.len(), source.len());
        assert_eq!(blanked.find('x'), Some(start));
        assert_eq!(blanked.matches('\n').count(), 1);
        assert!(blanked.trim().starts_with('x'));
    }

    #[test]
    fn test_script_export_is_detached() {
        let allocator = Allocator::default();
        let source = "<my-app>\n<script>\nimport x from './x'\nexport default { onMounted() { x() } }\n</script>\n</my-app>";
        let start = source.find("\nimport").unwrap();
        let end = source.find("</script>").unwrap();
        let script = ScriptSource {
            code: blank_outside(source, start, end),
            offset: start,
            aligned: true,
            typescript: false,
        };
        let section = parse_script(&allocator, &script, "app.riot", source).unwrap();
        assert_eq!(section.program.body.len(), 1);
        let exports = section.exports.expect("default export");
        assert!(print_expression(&allocator, &exports).contains("onMounted"));
        let span_start = exports.span().start as usize;
        assert_eq!(&source[span_start..span_start + 1], "{");
    }

    #[test]
    fn test_typescript_is_stripped() {
        let allocator = Allocator::default();
        let script = ScriptSource {
            code: "type Props = { a: number }\nconst n: number = 1\nexport default { n } as const".to_string(),
            offset: 0,
            aligned: false,
            typescript: true,
        };
        let section = parse_script(&allocator, &script, "app.riot", &script.code).unwrap();
        let builder = TemplateBuilder::new(&allocator, "app.riot", "");
        let mut program = section.program;
        append_component_export(
            &builder,
            &mut program,
            ModuleParts {
                css: None,
                exports: section.exports,
                template: None,
                name: Some("my-app".to_string()),
            },
        )
        .unwrap();
        let printed = print_module(&program, "app.riot", false);
        assert!(!printed.code.contains("type Props"));
        assert!(!printed.code.contains(": number"));
        assert!(printed.code.contains("const n = 1"));
        assert!(printed.code.contains("name: 'my-app'"));
        assert!(printed.map.is_none());
    }

    #[test]
    fn test_export_default_function_is_rejected() {
        let allocator = Allocator::default();
        let script = ScriptSource {
            code: "export default function () {}".to_string(),
            offset: 0,
            aligned: false,
            typescript: false,
        };
        let err = parse_script(&allocator, &script, "app.riot", &script.code)
            .err()
            .expect("non-expression export");
        assert_eq!(err.code, ERR_EXPORT_NOT_EXPRESSION);
    }
}
