use serde::{Deserialize, Serialize};
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// ERROR CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const ERR_EXPRESSION_SYNTAX: &str = "C-ERR-SYNTAX-001";
pub const ERR_EACH_SYNTAX: &str = "C-ERR-SYNTAX-002";
pub const ERR_SCRIPT_SYNTAX: &str = "C-ERR-SYNTAX-003";
pub const ERR_DIRECTIVE_SYNTAX: &str = "C-ERR-SYNTAX-004";
pub const ERR_MARKUP: &str = "C-ERR-PARSE-001";
pub const ERR_BARE_ATTRIBUTE_EXPRESSION: &str = "C-ERR-PARSE-002";
pub const ERR_SPREAD_WITH_DIRECTIVE: &str = "C-ERR-STRUCT-001";
pub const ERR_CSS_WITHOUT_TAG: &str = "C-ERR-STRUCT-002";
pub const ERR_EMPTY_IS: &str = "C-ERR-STRUCT-003";
pub const ERR_EXPORT_NOT_EXPRESSION: &str = "C-ERR-STRUCT-004";
pub const ERR_PROCESSOR: &str = "C-ERR-PROC-001";
pub const ERR_INTERNAL: &str = "C-ERR-INTERNAL-001";

/// Short explanation attached to every error with a known code.
pub fn describe_code(code: &str) -> &'static str {
    match code {
        ERR_EXPRESSION_SYNTAX => "Template expressions must be valid JavaScript expressions.",
        ERR_EACH_SYNTAX => {
            "Loop directives take the form `item in collection` or `item, index in collection`."
        }
        ERR_SCRIPT_SYNTAX => "The <script> section must be a valid ES module.",
        ERR_DIRECTIVE_SYNTAX => "The `if` and `key` directives take an expression.",
        ERR_MARKUP => "A component template has exactly one root tag.",
        ERR_BARE_ATTRIBUTE_EXPRESSION => {
            "Expressions in attribute position must be spread attributes: {...props}."
        }
        ERR_SPREAD_WITH_DIRECTIVE => {
            "Spread attributes cannot share a node with if, each, key, slot or is."
        }
        ERR_CSS_WITHOUT_TAG => "Scoped CSS is prefixed with the component root tag name.",
        ERR_EMPTY_IS => "The `is` directive names the component to mount.",
        ERR_EXPORT_NOT_EXPRESSION => "The default export of a component is an object expression.",
        ERR_PROCESSOR => "Pre and postprocessors are looked up by name in the registry.",
        ERR_INTERNAL => "The compiler produced an invalid intermediate construct.",
        _ => "Unknown error.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILER ERROR
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorKind {
    /// Expression, directive or script text failed to parse.
    Syntax,
    /// A combination of nodes or options the compiler cannot resolve.
    Structural,
    /// A pre or postprocessor was missing or failed.
    Processor,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[error("[{code}] {message} ({file}:{line}:{column})")]
pub struct CompilerError {
    pub code: String,
    pub kind: ErrorKind,
    pub message: String,
    pub description: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl CompilerError {
    pub fn new(code: &str, kind: ErrorKind, message: &str, file: &str, line: u32, column: u32) -> Self {
        Self {
            code: code.to_string(),
            kind,
            message: message.to_string(),
            description: describe_code(code).to_string(),
            file: file.to_string(),
            line,
            column,
            context: None,
            hints: Vec::new(),
        }
    }

    /// Builds an error positioned at a byte offset of the component source.
    pub fn at_offset(
        code: &str,
        kind: ErrorKind,
        message: &str,
        file: &str,
        source: &str,
        offset: usize,
    ) -> Self {
        let (line, column) = line_column(source, offset);
        Self::new(code, kind, message, file, line, column)
    }

    pub fn syntax(code: &str, message: &str, file: &str, source: &str, offset: usize) -> Self {
        Self::at_offset(code, ErrorKind::Syntax, message, file, source, offset)
    }

    pub fn structural(code: &str, message: &str, file: &str, source: &str, offset: usize) -> Self {
        Self::at_offset(code, ErrorKind::Structural, message, file, source, offset)
    }

    pub fn processor(message: &str, file: &str) -> Self {
        Self::new(ERR_PROCESSOR, ErrorKind::Processor, message, file, 1, 1)
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }
}

pub type Result<T, E = CompilerError> = std::result::Result<T, E>;

/// 1-based line and column (in chars) of a byte offset. Offsets past the end
/// clamp to the last position.
pub fn line_column(source: &str, offset: usize) -> (u32, u32) {
    let mut end = offset.min(source.len());
    while !source.is_char_boundary(end) {
        end -= 1;
    }
    let before = &source[..end];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
    let column = before[line_start..].chars().count() + 1;
    (line as u32, column as u32)
}
