//! Component source parser.
//!
//! Splits a single-file component into its template, style and script
//! sections. The template is parsed with html5ever after every `{...}`
//! interpolation has been swapped for a placeholder, so the HTML parser never
//! sees JavaScript. Placeholders are swapped back while converting the DOM,
//! each becoming a [`TemplateExpression`] positioned in the original source.

use html5ever::parse_document;
use html5ever::tendril::TendrilSink;
use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::error::{
    CompilerError, Result, ERR_BARE_ATTRIBUTE_EXPRESSION, ERR_MARKUP,
};
use crate::ir::{
    Attribute, Node, NodeType, TemplateExpression, EACH_DIRECTIVE, IF_DIRECTIVE, KEY_ATTRIBUTE,
    TEMPLATE_TAG,
};

lazy_static! {
    static ref SCRIPT_REGEX: Regex =
        Regex::new(r"(?is)<script\b([^>]*)>([\s\S]*?)</script\s*>").unwrap();
    static ref STYLE_REGEX: Regex =
        Regex::new(r"(?is)<style\b([^>]*)>([\s\S]*?)</style\s*>").unwrap();
    static ref ATTR_REGEX: Regex =
        Regex::new(r#"(?i)([a-z0-9:_-]+)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^>\s]+)))?"#).unwrap();
    static ref PLACEHOLDER_REGEX: Regex = Regex::new(r"__expr_(\d+)__").unwrap();
    static ref TAG_MARKER_REGEX: Regex = Regex::new(r"^__at_(\d+)__$").unwrap();
    static ref STRAY_MARKER_REGEX: Regex = Regex::new(r" __at_\d+__").unwrap();
    static ref SELF_CLOSING_REGEX: Regex =
        Regex::new(r"<([A-Za-z][\w-]*)(\s[^<>]*?)?\s*/>").unwrap();

    pub static ref VOID_ELEMENTS: HashSet<&'static str> = [
        "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
        "source", "track", "wbr",
    ]
    .into_iter()
    .collect();

    pub static ref BOOLEAN_ATTRIBUTES: HashSet<&'static str> = [
        "allowfullscreen", "async", "autofocus", "autoplay", "checked", "controls", "default",
        "defer", "disabled", "formnovalidate", "hidden", "inert", "ismap", "itemscope", "loop",
        "multiple", "muted", "nomodule", "novalidate", "open", "playsinline", "readonly",
        "required", "reversed", "selected",
    ]
    .into_iter()
    .collect();
}

// ═══════════════════════════════════════════════════════════════════════════════
// SECTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// Content of a `<script>` or `<style>` block. `start..end` is the byte range
/// of `text` in the component source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceBlock {
    pub text: String,
    pub start: usize,
    pub end: usize,
    pub attributes: HashMap<String, String>,
}

impl SourceBlock {
    /// `lang`, falling back to the subtype of `type` (`text/typescript`).
    pub fn lang(&self) -> Option<&str> {
        if let Some(lang) = self.attributes.get("lang") {
            return Some(lang.as_str());
        }
        self.attributes
            .get("type")
            .map(|t| t.rsplit('/').next().unwrap_or(t.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedComponent {
    pub template: Option<Node>,
    pub css: Option<SourceBlock>,
    pub javascript: Option<SourceBlock>,
}

fn parse_block_attributes(raw: &str) -> HashMap<String, String> {
    let mut attributes = HashMap::new();
    for caps in ATTR_REGEX.captures_iter(raw) {
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        attributes.insert(caps[1].to_lowercase(), value);
    }
    attributes
}

/// Byte ranges of every match (tags included) and the first block found.
fn find_blocks(source: &str, regex: &Regex) -> (Vec<(usize, usize)>, Option<SourceBlock>) {
    let mut ranges = Vec::new();
    let mut first = None;
    for caps in regex.captures_iter(source) {
        let Some(whole) = caps.get(0) else { continue };
        ranges.push((whole.start(), whole.end()));
        if let Some(content) = caps.get(2) {
            if first.is_none() {
                first = Some(SourceBlock {
                    text: content.as_str().to_string(),
                    start: content.start(),
                    end: content.end(),
                    attributes: parse_block_attributes(caps.get(1).map_or("", |m| m.as_str())),
                });
            } else {
                tracing::warn!(
                    offset = whole.start(),
                    "only the first block of a kind is compiled, later ones stay in the markup"
                );
            }
        }
    }
    (ranges, first)
}

// ═══════════════════════════════════════════════════════════════════════════════
// EXPRESSION NORMALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone)]
struct Placeholder {
    expression: TemplateExpression,
    /// Written as `{...}` rather than as a bare directive value.
    braced: bool,
}

struct Normalized {
    html: String,
    placeholders: Vec<Placeholder>,
}

/// Byte index after the brace closing the one at `start`, skipping strings
/// and template literals. `None` when unbalanced.
fn find_balanced_brace_end(source: &str, start: usize) -> Option<usize> {
    let bytes = source.as_bytes();
    let mut depth = 0usize;
    let mut i = start;
    let mut in_string: Option<u8> = None;
    let mut in_template_literal = false;
    let mut template_brace_depth = 0usize;

    while i < bytes.len() {
        let c = bytes[i];

        if c == b'\\' && i + 1 < bytes.len() {
            i += 2;
            continue;
        }

        if let Some(quote) = in_string {
            if c == quote {
                in_string = None;
            }
            i += 1;
            continue;
        }

        if in_template_literal {
            if c == b'`' && template_brace_depth == 0 {
                in_template_literal = false;
            } else if c == b'$' && bytes.get(i + 1) == Some(&b'{') {
                template_brace_depth += 1;
                i += 2;
                continue;
            } else if c == b'}' && template_brace_depth > 0 {
                template_brace_depth -= 1;
            }
            i += 1;
            continue;
        }

        match c {
            b'"' | b'\'' => in_string = Some(c),
            b'`' => in_template_literal = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// True when `prefix` ends with ` if=`, ` each=` or ` key=`.
fn ends_with_directive_assignment(prefix: &str) -> bool {
    let Some(before_eq) = prefix.trim_end().strip_suffix('=') else {
        return false;
    };
    let before_eq = before_eq.trim_end();
    let name_start = before_eq
        .char_indices()
        .rev()
        .find(|(_, c)| !(c.is_ascii_alphanumeric() || *c == '-' || *c == '_' || *c == ':'))
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let name = &before_eq[name_start..];
    [IF_DIRECTIVE, EACH_DIRECTIVE, KEY_ATTRIBUTE].contains(&name)
        && before_eq[..name_start].ends_with(char::is_whitespace)
}

fn push_placeholder(normalized: &mut Normalized, expression: TemplateExpression, braced: bool) {
    normalized
        .html
        .push_str(&format!("__expr_{}__", normalized.placeholders.len()));
    normalized.placeholders.push(Placeholder { expression, braced });
}

fn is_tag_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b == b':' || b == b'.'
}

/// Offset of attribute `name` in the opening tag at `tag_start`: the start of
/// its value when it has one, else of the name. Falls back to `tag_start`.
fn attribute_offset(source: &str, tag_start: usize, name: &str) -> usize {
    let bytes = source.as_bytes();
    let mut quote: Option<u8> = None;
    let mut i = tag_start + 1;
    while i < bytes.len() {
        let c = bytes[i];
        match quote {
            Some(q) => {
                if c == q {
                    quote = None;
                }
            }
            None if c == b'"' || c == b'\'' => quote = Some(c),
            None if c == b'>' => break,
            None => {
                let matches_name = bytes[i - 1].is_ascii_whitespace()
                    && source
                        .get(i..i + name.len())
                        .is_some_and(|candidate| candidate.eq_ignore_ascii_case(name))
                    && !bytes.get(i + name.len()).copied().is_some_and(is_tag_name_byte);
                if matches_name {
                    let mut j = i + name.len();
                    while bytes.get(j).is_some_and(u8::is_ascii_whitespace) {
                        j += 1;
                    }
                    if bytes.get(j) != Some(&b'=') {
                        return i;
                    }
                    j += 1;
                    while bytes.get(j).is_some_and(u8::is_ascii_whitespace) {
                        j += 1;
                    }
                    if matches!(bytes.get(j), Some(b'"' | b'\'')) {
                        j += 1;
                    }
                    return j;
                }
            }
        }
        i += 1;
    }
    tag_start
}

/// Replaces interpolations with `__expr_N__` and tags every opening tag with
/// a `__at_N__` attribute holding its source offset. Bytes inside `skip`
/// ranges (script and style blocks) are copied untouched.
fn normalize_expressions(source: &str, skip: &[(usize, usize)]) -> Normalized {
    let bytes = source.as_bytes();
    let mut normalized = Normalized {
        html: String::with_capacity(source.len()),
        placeholders: Vec::new(),
    };
    let mut skip = skip.iter().peekable();
    let mut in_tag = false;
    let mut quote: Option<u8> = None;
    let mut i = 0;

    while i < bytes.len() {
        if let Some(&&(start, end)) = skip.peek() {
            if i >= end {
                skip.next();
                continue;
            }
            if i >= start {
                normalized.html.push_str(&source[i..end]);
                i = end;
                skip.next();
                continue;
            }
        }

        let c = bytes[i];
        if in_tag {
            match quote {
                Some(q) if c == q => quote = None,
                Some(_) => {}
                None if c == b'>' => in_tag = false,
                None if c == b'"' || c == b'\'' => {
                    let close = source[i + 1..].find(c as char).map(|p| i + 1 + p);
                    if let Some(close) = close {
                        let value = &source[i + 1..close];
                        if ends_with_directive_assignment(&normalized.html)
                            && !value.contains('{')
                            && !value.trim().is_empty()
                        {
                            normalized.html.push(c as char);
                            push_placeholder(
                                &mut normalized,
                                TemplateExpression::new(i + 1, value),
                                false,
                            );
                            normalized.html.push(c as char);
                            i = close + 1;
                            continue;
                        }
                    }
                    quote = Some(c);
                }
                None => {}
            }
        } else if c == b'<' && bytes.get(i + 1).is_some_and(u8::is_ascii_alphabetic) {
            in_tag = true;
            let mut name_end = i + 1;
            while bytes.get(name_end).copied().is_some_and(is_tag_name_byte) {
                name_end += 1;
            }
            normalized.html.push_str(&source[i..name_end]);
            normalized.html.push_str(&format!(" __at_{}__", i));
            i = name_end;
            continue;
        }

        if c == b'{' {
            if let Some(end) = find_balanced_brace_end(source, i) {
                let text = &source[i + 1..end - 1];
                push_placeholder(&mut normalized, TemplateExpression::new(i + 1, text), true);
                i = end;
                continue;
            }
        }

        let len = source[i..].chars().next().map_or(1, char::len_utf8);
        normalized.html.push_str(&source[i..i + len]);
        i += len;
    }

    normalized
}

/// `<my-tag />` and `<div />` open elements in HTML5; close them explicitly.
fn expand_self_closing_tags(html: &str) -> String {
    SELF_CLOSING_REGEX
        .replace_all(html, |caps: &Captures| {
            let name = &caps[1];
            if VOID_ELEMENTS.contains(name.to_lowercase().as_str()) {
                caps[0].to_string()
            } else {
                let attrs = caps.get(2).map_or("", |m| m.as_str());
                format!("<{}{}></{}>", name, attrs, name)
            }
        })
        .into_owned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// DOM CONVERSION
// ═══════════════════════════════════════════════════════════════════════════════

struct Converter<'s> {
    source_file: &'s str,
    source_code: &'s str,
    placeholders: Vec<Placeholder>,
}

impl Converter<'_> {
    fn placeholder(&self, index: &str) -> Option<&Placeholder> {
        index.parse::<usize>().ok().and_then(|i| self.placeholders.get(i))
    }

    /// Puts interpolations back into `text`, returning them in order.
    fn restore(&self, text: &str) -> (String, Vec<TemplateExpression>) {
        let mut expressions = Vec::new();
        let restored = PLACEHOLDER_REGEX
            .replace_all(text, |caps: &Captures| match self.placeholder(&caps[1]) {
                Some(placeholder) => {
                    expressions.push(placeholder.expression.clone());
                    if placeholder.braced {
                        format!("{{{}}}", placeholder.expression.text)
                    } else {
                        placeholder.expression.text.clone()
                    }
                }
                None => caps[0].to_string(),
            })
            .into_owned();
        (restored, expressions)
    }

    fn convert_attribute(&self, name: &str, value: &str, tag_start: Option<usize>) -> Result<Attribute> {
        if let Some(caps) = PLACEHOLDER_REGEX.captures(name) {
            if let Some(placeholder) = self.placeholder(&caps[1]) {
                let expression = &placeholder.expression;
                let leading = expression.text.len() - expression.text.trim_start().len();
                return match expression.text.trim_start().strip_prefix("...") {
                    Some(rest) => Ok(Attribute::spread(TemplateExpression::new(
                        expression.start + leading + 3,
                        rest,
                    ))),
                    None => Err(CompilerError::syntax(
                        ERR_BARE_ATTRIBUTE_EXPRESSION,
                        &format!("Unexpected expression `{}` in attribute position", expression.text.trim()),
                        self.source_file,
                        self.source_code,
                        expression.start,
                    )
                    .with_context(expression.text.clone())),
                };
            }
        }

        let (value, expressions) = self.restore(value);
        let is_boolean = BOOLEAN_ATTRIBUTES.contains(name);
        Ok(Attribute {
            name: Some(name.to_string()),
            value: if value.is_empty() && expressions.is_empty() {
                None
            } else {
                Some(value)
            },
            expressions,
            is_boolean,
            is_spread: false,
            start: tag_start.map_or(0, |start| attribute_offset(self.source_code, start, name)),
        })
    }

    fn convert_children(&self, handle: &Handle, raw: bool) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        for child in handle.children.borrow().iter() {
            if let Some(node) = self.convert(child, raw)? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }

    fn convert(&self, handle: &Handle, raw: bool) -> Result<Option<Node>> {
        match &handle.data {
            NodeData::Text { contents } => {
                let (text, expressions) = self.restore(&contents.borrow());
                let text = STRAY_MARKER_REGEX.replace_all(&text, "").into_owned();
                if expressions.is_empty() && text.trim().is_empty() && text.contains('\n') {
                    return Ok(None);
                }
                Ok(Some(Node {
                    node_type: NodeType::Text,
                    text: Some(text),
                    expressions,
                    is_raw: raw,
                    ..Node::default()
                }))
            }
            NodeData::Element {
                name,
                attrs,
                template_contents,
                ..
            } => {
                let tag = name.local.to_string();
                let attrs = attrs.borrow();
                let tag_start = attrs.iter().find_map(|attr| {
                    TAG_MARKER_REGEX
                        .captures(&attr.name.local)
                        .and_then(|caps| caps[1].parse::<usize>().ok())
                });
                let mut attributes = Vec::new();
                for attr in attrs.iter() {
                    if TAG_MARKER_REGEX.is_match(&attr.name.local) {
                        continue;
                    }
                    attributes.push(self.convert_attribute(&attr.name.local, &attr.value, tag_start)?);
                }

                let raw_children = tag == "script" || tag == "style";
                let nodes = if tag == TEMPLATE_TAG {
                    match template_contents.borrow().as_ref() {
                        Some(contents) => self.convert_children(contents, raw_children)?,
                        None => Vec::new(),
                    }
                } else {
                    self.convert_children(handle, raw_children)?
                };

                Ok(Some(Node {
                    node_type: NodeType::Tag,
                    is_custom: tag.contains('-'),
                    is_void: VOID_ELEMENTS.contains(tag.as_str()),
                    name: Some(tag),
                    attributes,
                    nodes,
                    ..Node::default()
                }))
            }
            _ => Ok(None),
        }
    }

    /// Top-level elements, with the html/head/body wrappers html5ever adds
    /// flattened away.
    fn collect_top_level(&self, handle: &Handle, roots: &mut Vec<Node>) -> Result<()> {
        match &handle.data {
            NodeData::Document => {
                for child in handle.children.borrow().iter() {
                    self.collect_top_level(child, roots)?;
                }
            }
            NodeData::Element { name, .. } => {
                let tag = name.local.to_string();
                if tag == "html" || tag == "head" || tag == "body" {
                    for child in handle.children.borrow().iter() {
                        self.collect_top_level(child, roots)?;
                    }
                } else if tag == "script" || tag == "style" {
                    tracing::warn!(tag = %tag, "ignoring top-level block outside the component");
                } else if let Some(node) = self.convert(handle, false)? {
                    roots.push(node);
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Parses a component source into its sections.
pub fn parse_component(source: &str, source_file: &str) -> Result<ParsedComponent> {
    let (script_ranges, javascript) = find_blocks(source, &SCRIPT_REGEX);
    let (style_ranges, css) = find_blocks(source, &STYLE_REGEX);

    let mut skip: Vec<(usize, usize)> = script_ranges.into_iter().chain(style_ranges).collect();
    skip.sort_unstable();

    // Only the compiled blocks leave the markup.
    let mut extracted: Vec<(usize, usize)> = Vec::new();
    for block in javascript.iter().chain(css.iter()) {
        if let Some(&range) = skip.iter().find(|(s, e)| *s <= block.start && block.end <= *e) {
            extracted.push(range);
        }
    }

    let normalized = normalize_expressions(source, &skip);
    let mut markup = normalized.html.clone();
    // Offsets shift between source and normalized text, so blocks are
    // blanked by searching for their normalized copy.
    for &(start, end) in &extracted {
        let block = &source[start..end];
        markup = markup.replacen(block, "", 1);
    }
    let markup = expand_self_closing_tags(&markup);

    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut markup.as_bytes())
        .map_err(|e| {
            CompilerError::syntax(
                ERR_MARKUP,
                &format!("Failed to parse markup: {}", e),
                source_file,
                source,
                0,
            )
        })?;

    let converter = Converter {
        source_file,
        source_code: source,
        placeholders: normalized.placeholders,
    };
    let mut roots = Vec::new();
    converter.collect_top_level(&dom.document, &mut roots)?;

    if roots.len() > 1 {
        let names: Vec<&str> = roots.iter().map(|n| n.name()).collect();
        return Err(CompilerError::structural(
            ERR_MARKUP,
            &format!("Expected a single root tag, found <{}>", names.join(">, <")),
            source_file,
            source,
            0,
        ));
    }

    tracing::debug!(
        file = source_file,
        has_template = !roots.is_empty(),
        has_css = css.is_some(),
        has_javascript = javascript.is_some(),
        "parsed component sections"
    );

    Ok(ParsedComponent {
        template: roots.into_iter().next(),
        css,
        javascript,
    })
}
