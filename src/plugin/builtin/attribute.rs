//! Attribute rewriting, e.g. remapping brand codes.

use crate::diagnostics::{Category, DiagnosticSink};
use crate::plugin::document::elements_named;
use crate::plugin::{Document, PluginError, ResponsePlugin, Step, Transform};

pub const NAME: &str = "attribute";

/// Each `Element@attr = value` option registers one step that sets `attr`
/// to `value` on every element with local name `Element`.
#[derive(Default)]
pub struct AttributeRewrite {
    transforms: Vec<Box<dyn Transform>>,
}

impl AttributeRewrite {
    pub fn boxed() -> Box<dyn ResponsePlugin> {
        Box::<Self>::default()
    }
}

fn split_target(key: &str) -> Option<(&str, &str)> {
    let (element, attribute) = key.split_once('@')?;
    if element.is_empty() || attribute.is_empty() || attribute.contains('@') {
        return None;
    }
    Some((element, attribute))
}

impl ResponsePlugin for AttributeRewrite {
    fn configure(&mut self, options: &[(String, String)]) -> Result<(), PluginError> {
        self.transforms.clear();
        for (key, value) in options {
            let (element, attribute) =
                split_target(key).ok_or_else(|| PluginError::UnknownOption(key.clone()))?;
            let element = element.to_string();
            let attribute = attribute.to_string();
            let value = value.clone();

            self.transforms.push(Box::new(
                move |document: &Document, sink: &DiagnosticSink<'_>| -> Result<Step, PluginError> {
                    let mut touched = 0;
                    let edited = document.edit(|doc| {
                        for node in elements_named(&doc, &element) {
                            node.set_attribute_value(attribute.as_str(), value.as_str());
                            touched += 1;
                        }
                    })?;
                    if sink.is_enabled(Category::Plugin) {
                        sink.log(
                            Category::Plugin,
                            &format!("attribute: set {}@{}={} on {} elements", element, attribute, value, touched),
                            None,
                        );
                    }
                    Ok(Step::Continue(edited))
                },
            ));
        }
        Ok(())
    }

    fn default_config(&self) -> String {
        "# One option per rewrite: <Element>@<attribute> = <new value>\n# Brand@code = XYZ\n"
            .to_string()
    }

    fn transforms(&self) -> &[Box<dyn Transform>] {
        &self.transforms
    }
}
