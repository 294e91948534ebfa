use crate::error::{CompilerError, Result, ERR_EXPRESSION_SYNTAX};
use crate::ir::TemplateExpression;
use oxc_allocator::Allocator;
use oxc_ast::ast::Expression;
use oxc_parser::Parser;
use oxc_span::SourceType;
use std::collections::HashSet;

/// Parameter name of every generated `evaluate` function.
pub const SCOPE_IDENTIFIER: &str = "_scope";

lazy_static::lazy_static! {
    /// Names that always resolve outside the component scope.
    pub static ref GLOBALS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        // Language builtins
        for name in [
            "undefined", "NaN", "Infinity", "globalThis", "Math", "JSON", "Reflect", "Proxy",
            "Intl", "Atomics", "Object", "Function", "Array", "String", "Number", "Boolean",
            "Symbol", "BigInt", "Date", "RegExp", "Error", "EvalError", "RangeError",
            "ReferenceError", "SyntaxError", "TypeError", "URIError", "AggregateError",
            "Promise", "Map", "Set", "WeakMap", "WeakSet", "WeakRef", "FinalizationRegistry",
            "ArrayBuffer", "SharedArrayBuffer", "DataView", "Int8Array", "Uint8Array",
            "Uint8ClampedArray", "Int16Array", "Uint16Array", "Int32Array", "Uint32Array",
            "Float32Array", "Float64Array", "BigInt64Array", "BigUint64Array", "isNaN",
            "isFinite", "parseInt", "parseFloat", "encodeURI", "encodeURIComponent",
            "decodeURI", "decodeURIComponent", "escape", "unescape", "eval", "arguments",
            "require",
        ] {
            s.insert(name);
        }
        // Browser environment
        for name in [
            "window", "self", "document", "navigator", "location", "history", "screen",
            "console", "localStorage", "sessionStorage", "fetch", "setTimeout",
            "clearTimeout", "setInterval", "clearInterval", "requestAnimationFrame",
            "cancelAnimationFrame", "queueMicrotask", "structuredClone", "alert", "confirm",
            "prompt", "atob", "btoa", "performance", "crypto", "URL", "URLSearchParams",
            "Blob", "File", "FileReader", "FormData", "Headers", "Request", "Response",
            "Event", "CustomEvent", "EventTarget", "AbortController", "WebSocket", "Worker",
            "XMLHttpRequest", "Image", "Audio", "Node", "Element", "HTMLElement",
            "MutationObserver", "IntersectionObserver", "ResizeObserver", "customElements",
            "getComputedStyle", "matchMedia", "TextEncoder", "TextDecoder",
        ] {
            s.insert(name);
        }
        s
    };
}

pub fn is_global(name: &str) -> bool {
    GLOBALS.contains(name)
}

/// Parses one template expression in `allocator`.
///
/// The text is parsed behind `expression.start` spaces so every span of the
/// resulting AST is a byte offset into the component source.
pub fn parse_template_expression<'a>(
    allocator: &'a Allocator,
    expression: &TemplateExpression,
    source_file: &str,
    source_code: &str,
) -> Result<Expression<'a>> {
    let padded = format!("{}{}", " ".repeat(expression.start), expression.text);
    let code: &'a str = allocator.alloc_str(&padded);
    let source_type = SourceType::default()
        .with_typescript(true)
        .with_module(true);

    Parser::new(allocator, code, source_type)
        .parse_expression()
        .map_err(|errors| {
            let details = errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            CompilerError::syntax(
                ERR_EXPRESSION_SYNTAX,
                &format!("Invalid expression `{}`: {}", expression.text.trim(), details),
                source_file,
                source_code,
                expression.start,
            )
            .with_context(expression.text.clone())
        })
}
