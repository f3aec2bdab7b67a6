//! Pass-through plugin that records the document in the diagnostic log.

use crate::diagnostics::{Category, DiagnosticSink};
use crate::plugin::{Document, PluginError, ResponsePlugin, Step, Transform};

pub const NAME: &str = "trace";

const DEFAULT_LABEL: &str = "trace";

/// Records the current document under the `plugin` category.
/// `label` names the record; defaults to `trace`.
pub struct TraceDocument {
    transforms: Vec<Box<dyn Transform>>,
}

impl TraceDocument {
    pub fn boxed() -> Box<dyn ResponsePlugin> {
        Box::new(Self {
            transforms: Vec::new(),
        })
    }
}

impl ResponsePlugin for TraceDocument {
    fn configure(&mut self, options: &[(String, String)]) -> Result<(), PluginError> {
        let mut label = DEFAULT_LABEL.to_string();
        for (key, value) in options {
            match key.as_str() {
                "label" if value.is_empty() => {
                    return Err(PluginError::InvalidOption {
                        key: key.clone(),
                        reason: "label must not be empty".to_string(),
                    })
                }
                "label" => label = value.clone(),
                other => return Err(PluginError::UnknownOption(other.to_string())),
            }
        }

        let step: Box<dyn Transform> = Box::new(
            move |document: &Document, sink: &DiagnosticSink<'_>| -> Result<Step, PluginError> {
                if sink.is_enabled(Category::Plugin) {
                    sink.log(Category::Plugin, &label, Some(document.as_str()));
                }
                Ok(Step::Continue(document.clone()))
            },
        );
        self.transforms = vec![step];
        Ok(())
    }

    fn default_config(&self) -> String {
        format!("# Name of the record written for each response.\nlabel = {}\n", DEFAULT_LABEL)
    }

    fn transforms(&self) -> &[Box<dyn Transform>] {
        &self.transforms
    }
}
