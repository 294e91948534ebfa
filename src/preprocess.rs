use crate::error::{CompilerError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessorKind {
    Template,
    Css,
    Javascript,
}

impl fmt::Display for ProcessorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProcessorKind::Template => "template",
            ProcessorKind::Css => "css",
            ProcessorKind::Javascript => "javascript",
        };
        f.write_str(name)
    }
}

/// What a processor knows about the source it transforms.
#[derive(Debug, Clone, Default)]
pub struct ProcessorMeta {
    pub file: String,
    /// Root tag of the component, when already known.
    pub tag_name: Option<String>,
    /// Attributes of the `<style>`/`<script>` block being processed.
    pub attributes: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Processed {
    pub code: String,
    pub map: Option<String>,
}

impl Processed {
    pub fn code(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            map: None,
        }
    }
}

pub type Processor = Box<dyn Fn(&str, &ProcessorMeta) -> Result<Processed> + Send + Sync>;

/// Pluggable source transforms: preprocessors keyed by kind and name, and an
/// ordered chain of postprocessors run on the generated code.
#[derive(Default)]
pub struct Processors {
    preprocessors: HashMap<(ProcessorKind, String), Processor>,
    postprocessors: Vec<Processor>,
}

impl fmt::Debug for Processors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<String> = self
            .preprocessors
            .keys()
            .map(|(kind, name)| format!("{}:{}", kind, name))
            .collect();
        names.sort();
        f.debug_struct("Processors")
            .field("preprocessors", &names)
            .field("postprocessors", &self.postprocessors.len())
            .finish()
    }
}

impl Processors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_preprocessor<F>(&mut self, kind: ProcessorKind, name: &str, processor: F)
    where
        F: Fn(&str, &ProcessorMeta) -> Result<Processed> + Send + Sync + 'static,
    {
        tracing::debug!(kind = %kind, name, "registering preprocessor");
        self.preprocessors
            .insert((kind, name.to_string()), Box::new(processor));
    }

    /// Returns whether a preprocessor was removed.
    pub fn unregister_preprocessor(&mut self, kind: ProcessorKind, name: &str) -> bool {
        self.preprocessors
            .remove(&(kind, name.to_string()))
            .is_some()
    }

    pub fn has_preprocessor(&self, kind: ProcessorKind, name: &str) -> bool {
        self.preprocessors.contains_key(&(kind, name.to_string()))
    }

    pub fn preprocess(
        &self,
        kind: ProcessorKind,
        name: &str,
        meta: &ProcessorMeta,
        source: &str,
    ) -> Result<Processed> {
        let Some(processor) = self.preprocessors.get(&(kind, name.to_string())) else {
            return Err(CompilerError::processor(
                &format!("No {} preprocessor named `{}` is registered", kind, name),
                &meta.file,
            ));
        };
        tracing::debug!(kind = %kind, name, file = %meta.file, "running preprocessor");
        processor(source, meta)
    }

    pub fn register_postprocessor<F>(&mut self, processor: F)
    where
        F: Fn(&str, &ProcessorMeta) -> Result<Processed> + Send + Sync + 'static,
    {
        self.postprocessors.push(Box::new(processor));
    }

    /// Runs every postprocessor in registration order. The last map produced
    /// wins.
    pub fn postprocess(&self, meta: &ProcessorMeta, processed: Processed) -> Result<Processed> {
        let mut current = processed;
        for processor in &self.postprocessors {
            let next = processor(&current.code, meta)?;
            current = Processed {
                code: next.code,
                map: next.map.or(current.map),
            };
        }
        Ok(current)
    }
}
