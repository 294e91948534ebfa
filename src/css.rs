//! Component CSS scoping.
//!
//! Rules are prefixed with the component tag so they only match inside it:
//! `p {}` in `<my-card>` becomes `my-card p,[is="my-card"] p{}`, and `:host`
//! is replaced by the tag itself. At-rules that contain rules are scoped
//! recursively; everything else is copied through.

use lazy_static::lazy_static;
use regex::Regex;

const HOST: &str = ":host";

/// At-rules whose blocks hold ordinary style rules.
const NESTING_AT_RULES: [&str; 5] = ["@media", "@supports", "@container", "@layer", "@document"];

lazy_static! {
    static ref COMMENT_REGEX: Regex = Regex::new(r"(?s)/\*.*?\*/").unwrap();
    static ref WHITESPACE_REGEX: Regex = Regex::new(r"\s+").unwrap();
    static ref HOST_REGEX: Regex = Regex::new(r":host(?:\(([^)]*)\))?").unwrap();
}

fn compact(text: &str) -> String {
    WHITESPACE_REGEX.replace_all(text.trim(), " ").into_owned()
}

/// Index of the first `needle` outside strings and parentheses.
fn find_top_level(text: &str, needle: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    for (i, &c) in bytes.iter().enumerate() {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            b'"' | b'\'' => quote = Some(c),
            b'(' => depth += 1,
            b')' => depth = depth.saturating_sub(1),
            _ if c == needle && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Index of the `}` closing the `{` at `open`.
fn find_block_end(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    for (i, &c) in text.as_bytes().iter().enumerate().skip(open) {
        if let Some(q) = quote {
            if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            b'"' | b'\'' => quote = Some(c),
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

fn split_selector_list(list: &str) -> Vec<&str> {
    let mut selectors = Vec::new();
    let mut rest = list;
    while let Some(comma) = find_top_level(rest, b',') {
        selectors.push(&rest[..comma]);
        rest = &rest[comma + 1..];
    }
    selectors.push(rest);
    selectors
}

fn scope_selector(tag: &str, selector: &str) -> String {
    let selector = compact(selector);
    if selector.is_empty() {
        return selector;
    }
    if !selector.contains(HOST) {
        return format!("{tag} {selector},[is=\"{tag}\"] {selector}");
    }
    let with_host = |host: &str| {
        HOST_REGEX
            .replace_all(&selector, |caps: &regex::Captures| {
                format!("{}{}", host, caps.get(1).map_or("", |m| m.as_str()))
            })
            .into_owned()
    };
    format!("{},{}", with_host(tag), with_host(&format!("[is=\"{tag}\"]")))
}

pub fn scope_selector_list(tag: &str, list: &str) -> String {
    split_selector_list(list)
        .into_iter()
        .map(|selector| scope_selector(tag, selector))
        .filter(|selector| !selector.is_empty())
        .collect::<Vec<_>>()
        .join(",")
}

fn scope_rules(tag: &str, css: &str, out: &mut String) {
    let mut rest = css;
    loop {
        let Some(open) = rest.find('{') else {
            out.push_str(&compact(rest));
            return;
        };
        let Some(close) = find_block_end(rest, open) else {
            out.push_str(&compact(rest));
            return;
        };

        // Statement at-rules (`@import ...;`) end before the prelude.
        let mut prelude = &rest[..open];
        if let Some(semicolon) = prelude.rfind(';') {
            out.push_str(&compact(&prelude[..=semicolon]));
            prelude = &prelude[semicolon + 1..];
        }
        let prelude = compact(prelude);
        let body = &rest[open + 1..close];

        if prelude.starts_with('@') {
            if NESTING_AT_RULES.iter().any(|rule| prelude.starts_with(rule)) {
                out.push_str(&prelude);
                out.push('{');
                scope_rules(tag, body, out);
                out.push('}');
            } else {
                out.push_str(&prelude);
                out.push('{');
                out.push_str(&compact(body));
                out.push('}');
            }
        } else {
            out.push_str(&scope_selector_list(tag, &prelude));
            out.push('{');
            out.push_str(&compact(body));
            out.push('}');
        }
        rest = &rest[close + 1..];
    }
}

/// Scopes every rule of `css` to `tag`.
pub fn scope_css(tag: &str, css: &str) -> String {
    let css = COMMENT_REGEX.replace_all(css, "");
    let mut out = String::with_capacity(css.len() * 2);
    scope_rules(tag, &css, &mut out);
    out
}

/// CSS of a component: scoped to its tag, or only compacted.
pub fn generate_css(tag: Option<&str>, css: &str, scoped: bool) -> Option<String> {
    let generated = match (scoped, tag) {
        (true, Some(tag)) => scope_css(tag, css),
        _ => compact(&COMMENT_REGEX.replace_all(css, "")),
    };
    if generated.is_empty() {
        None
    } else {
        Some(generated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rules_are_prefixed() {
        let css = "\n  p, .title > span { color: red; }\n";
        assert_eq!(
            scope_css("my-card", css),
            "my-card p,[is=\"my-card\"] p,my-card .title > span,[is=\"my-card\"] .title > span{color: red;}"
        );
    }

    #[test]
    fn test_host_is_replaced() {
        assert_eq!(
            scope_css("my-card", ":host { display: block }"),
            "my-card,[is=\"my-card\"]{display: block}"
        );
        assert_eq!(
            scope_css("my-card", ":host(.active) p { color: blue }"),
            "my-card.active p,[is=\"my-card\"].active p{color: blue}"
        );
    }

    #[test]
    fn test_media_is_recursed_and_keyframes_kept() {
        let css = "@media (max-width: 600px) { p { margin: 0 } } @keyframes spin { from { opacity: 0 } to { opacity: 1 } }";
        assert_eq!(
            scope_css("x-a", css),
            "@media (max-width: 600px){x-a p,[is=\"x-a\"] p{margin: 0}}@keyframes spin{from { opacity: 0 } to { opacity: 1 }}"
        );
    }

    #[test]
    fn test_comments_and_imports() {
        let css = "/* note */ @import url('a.css'); :is(a, b) { color: red }";
        assert_eq!(
            scope_css("x-a", css),
            "@import url('a.css');x-a :is(a, b),[is=\"x-a\"] :is(a, b){color: red}"
        );
    }

    #[test]
    fn test_unscoped_css_is_compacted() {
        assert_eq!(
            generate_css(Some("x-a"), " p {  color: red } ", false).as_deref(),
            Some("p { color: red }")
        );
        assert_eq!(generate_css(None, "   ", true), None);
    }
}
