//! # Component Compiler
//!
//! Compiles a single-file component (one root tag with markup, an optional
//! `<script>` and an optional `<style>`) into an ES module:
//!
//! ```text
//! <script statements>
//! export default {
//!   css: '...',
//!   exports: <script default export>,
//!   template: (template, expressionTypes, bindingTypes, getComponent) =>
//!     template('<p expr0="expr0"> </p>', [ ...bindings ]),
//!   name: 'my-component'
//! }
//! ```
//!
//! ## Pipeline
//!
//! 1. **Parse** (`parse`): sections, node tree, expressions with source offsets.
//! 2. **Validate** (`validate`): structural checks over the node tree.
//! 3. **Build** (`builder`, `bindings`, `expressions`): classify every node
//!    (`classify`), render static HTML, allocate `exprN` selectors and emit
//!    binding descriptors. Every template expression is rewritten
//!    (`rewriter`) so free identifiers read from `_scope`.
//! 4. **Assemble** (`codegen`): script statements plus the default export,
//!    printed with a source map.
//!
//! Each compilation owns its arena and selector counter, so independent
//! components can be compiled in parallel (`compile_batch`).

#[cfg(feature = "napi")]
use napi_derive::napi;

pub mod bindings;
pub mod builder;
pub mod classify;
pub mod codegen;
pub mod css;
pub mod error;
pub mod expressions;
pub mod ir;
pub mod parse;
pub mod preprocess;
pub mod rewriter;
pub mod scope;
pub mod validate;
pub mod visitor;

#[cfg(test)]
mod builder_tests;
#[cfg(test)]
mod rewriter_tests;

pub use builder::{TemplateBuilder, TemplateOutput};
pub use classify::{classify, NodeKind};
pub use error::{CompilerError, ErrorKind, Result};
pub use ir::{Attribute, Node, NodeType, TemplateExpression};
pub use parse::{parse_component, ParsedComponent, SourceBlock};
pub use preprocess::{Processed, Processor, ProcessorKind, ProcessorMeta, Processors};
pub use rewriter::rewrite_expression;

use codegen::{ModuleParts, ScriptSource};
use error::ERR_CSS_WITHOUT_TAG;
use oxc_allocator::Allocator;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS & OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CompileOptions {
    /// Used in diagnostics and as the source map's file.
    pub file: String,
    /// Template preprocessor run on the whole source before parsing.
    pub template: Option<String>,
    pub scoped_css: bool,
    pub source_map: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            file: String::new(),
            template: None,
            scoped_css: true,
            source_map: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompileMeta {
    pub tag_name: Option<String>,
    pub css: Option<String>,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct CompileOutput {
    pub code: String,
    /// JSON source map.
    pub map: Option<String>,
    pub meta: CompileMeta,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchInput {
    pub source: String,
    pub file: String,
}

// ═══════════════════════════════════════════════════════════════════════════════
// COMPILATION
// ═══════════════════════════════════════════════════════════════════════════════

pub fn compile(source: &str, options: &CompileOptions) -> Result<CompileOutput> {
    compile_with(source, options, &Processors::default())
}

pub fn compile_with(
    source: &str,
    options: &CompileOptions,
    processors: &Processors,
) -> Result<CompileOutput> {
    let file = options.file.as_str();
    let mut meta = ProcessorMeta {
        file: file.to_string(),
        ..ProcessorMeta::default()
    };

    let source: Cow<str> = match &options.template {
        Some(name) => Cow::Owned(
            processors
                .preprocess(ProcessorKind::Template, name, &meta, source)?
                .code,
        ),
        None => Cow::Borrowed(source),
    };
    let source = source.as_ref();

    let parsed = parse_component(source, file)?;
    let tag_name = parsed.template.as_ref().map(|root| root.name().to_string());
    meta.tag_name = tag_name.clone();

    if let Some(root) = &parsed.template {
        let warnings = validate::validate_template(root, file, source)?;
        tracing::debug!(
            file,
            tag = root.name(),
            expressions = visitor::collect_expressions(root).len(),
            warnings = warnings.len(),
            "validated template"
        );
    }

    let css = match &parsed.css {
        Some(block) => {
            let block_meta = ProcessorMeta {
                attributes: block.attributes.clone(),
                ..meta.clone()
            };
            let text = match block.lang() {
                Some(lang) if lang != "css" => {
                    processors
                        .preprocess(ProcessorKind::Css, lang, &block_meta, &block.text)?
                        .code
                }
                _ => block.text.clone(),
            };
            if options.scoped_css && tag_name.is_none() {
                return Err(CompilerError::structural(
                    ERR_CSS_WITHOUT_TAG,
                    "Scoped CSS needs a root tag to scope to",
                    file,
                    source,
                    block.start,
                )
                .with_hint("Add a root tag or set `scopedCss` to false."));
            }
            css::generate_css(tag_name.as_deref(), &text, options.scoped_css)
        }
        None => None,
    };

    let script = match &parsed.javascript {
        Some(block) => {
            let lang = block.lang();
            let typescript = matches!(lang, Some("ts" | "typescript"));
            match lang {
                None | Some("js" | "javascript" | "module" | "ts" | "typescript") => ScriptSource {
                    code: codegen::blank_outside(source, block.start, block.end),
                    offset: block.start,
                    aligned: true,
                    typescript,
                },
                Some(lang) => {
                    let block_meta = ProcessorMeta {
                        attributes: block.attributes.clone(),
                        ..meta.clone()
                    };
                    let processed = processors.preprocess(
                        ProcessorKind::Javascript,
                        lang,
                        &block_meta,
                        &block.text,
                    )?;
                    ScriptSource {
                        code: processed.code,
                        offset: block.start,
                        aligned: false,
                        typescript: false,
                    }
                }
            }
        }
        None => ScriptSource {
            code: String::new(),
            offset: 0,
            aligned: true,
            typescript: false,
        },
    };

    // Spans of a preprocessed script do not index the component source.
    let source_map = options.source_map && script.aligned;

    let allocator = Allocator::default();
    let section = codegen::parse_script(&allocator, &script, file, source)?;
    let mut program = section.program;

    let mut builder = TemplateBuilder::new(&allocator, file, source);
    let template = match &parsed.template {
        Some(root) => Some(builder.build_template(root)?),
        None => None,
    };

    codegen::append_component_export(
        &builder,
        &mut program,
        ModuleParts {
            css: css.clone(),
            exports: section.exports,
            template,
            name: tag_name.clone(),
        },
    )?;

    let printed = codegen::print_module(&program, file, source_map);
    let output = processors.postprocess(
        &meta,
        Processed {
            code: printed.code,
            map: printed.map,
        },
    )?;

    tracing::debug!(file, code_len = output.code.len(), "compiled component");

    Ok(CompileOutput {
        code: output.code,
        map: output.map,
        meta: CompileMeta {
            tag_name,
            css,
            file: file.to_string(),
        },
    })
}

/// Compiles independent components in parallel. Results keep input order.
pub fn compile_batch(
    inputs: &[BatchInput],
    options: &CompileOptions,
    processors: &Processors,
) -> Vec<Result<CompileOutput>> {
    inputs
        .par_iter()
        .map(|input| {
            let options = CompileOptions {
                file: input.file.clone(),
                ..options.clone()
            };
            compile_with(&input.source, &options, processors)
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// NAPI EXPORT
// ═══════════════════════════════════════════════════════════════════════════════

#[cfg(feature = "napi")]
#[napi]
pub fn compile_native(
    source: String,
    options_json: Option<serde_json::Value>,
) -> napi::Result<CompileOutput> {
    let options: CompileOptions = match options_json {
        Some(value) => serde_json::from_value(value)
            .map_err(|e| napi::Error::from_reason(format!("Invalid options: {}", e)))?,
        None => CompileOptions::default(),
    };
    compile(&source, &options).map_err(|e| {
        let reason = serde_json::to_string(&e).unwrap_or_else(|_| e.to_string());
        napi::Error::from_reason(reason)
    })
}
