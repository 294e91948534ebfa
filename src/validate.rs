use crate::error::{CompilerError, Result, ERR_SPREAD_WITH_DIRECTIVE};
use crate::ir::{Node, EACH_DIRECTIVE, KEY_ATTRIBUTE};
use crate::visitor::{walk_tag, NodeVisitor};

/// Structural checks run over the whole template before anything is built.
pub struct TemplateValidator<'s> {
    source_file: &'s str,
    source_code: &'s str,
    pub errors: Vec<CompilerError>,
    pub warnings: Vec<String>,
}

impl<'s> TemplateValidator<'s> {
    pub fn new(source_file: &'s str, source_code: &'s str) -> Self {
        Self {
            source_file,
            source_code,
            errors: Vec::new(),
            warnings: Vec::new(),
        }
    }

    fn check_spread(&mut self, node: &Node) {
        let Some(spread) = node.attributes.iter().find(|attr| attr.is_spread) else {
            return;
        };
        let Some(directive) = node.attributes.iter().find(|attr| attr.is_directive()) else {
            return;
        };
        let offset = spread.expressions.first().map(|e| e.start).unwrap_or(0);
        self.errors.push(
            CompilerError::structural(
                ERR_SPREAD_WITH_DIRECTIVE,
                &format!(
                    "<{}> combines a spread attribute with the `{}` directive",
                    node.name(),
                    directive.name()
                ),
                self.source_file,
                self.source_code,
                offset,
            )
            .with_hint("Move the spread attribute to a child element."),
        );
    }

    fn check_key(&mut self, node: &Node) {
        if node.has_attribute(KEY_ATTRIBUTE) && !node.has_attribute(EACH_DIRECTIVE) {
            let message = format!("<{}> has a `key` without `each`; it is ignored", node.name());
            tracing::warn!(file = self.source_file, "{}", message);
            self.warnings.push(message);
        }
    }
}

impl NodeVisitor for TemplateValidator<'_> {
    fn visit_tag(&mut self, node: &Node) {
        self.check_spread(node);
        self.check_key(node);
        walk_tag(self, node);
    }
}

/// Returns the first structural error of the template, if any.
pub fn validate_template(root: &Node, source_file: &str, source_code: &str) -> Result<Vec<String>> {
    let mut validator = TemplateValidator::new(source_file, source_code);
    validator.visit_node(root);
    match validator.errors.into_iter().next() {
        Some(error) => Err(error),
        None => Ok(validator.warnings),
    }
}
