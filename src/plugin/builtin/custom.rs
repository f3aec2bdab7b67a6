//! Fixed-reply plugin.

use crate::diagnostics::{Category, DiagnosticSink};
use crate::plugin::{Document, PluginError, ResponsePlugin, Step, Transform};

pub const NAME: &str = "custom";

/// `text=<literal>` terminates the pipeline with that literal.
#[derive(Default)]
pub struct CustomText {
    transforms: Vec<Box<dyn Transform>>,
}

impl CustomText {
    pub fn boxed() -> Box<dyn ResponsePlugin> {
        Box::<Self>::default()
    }
}

impl ResponsePlugin for CustomText {
    fn configure(&mut self, options: &[(String, String)]) -> Result<(), PluginError> {
        self.transforms.clear();
        for (key, value) in options {
            match key.as_str() {
                "text" => {
                    let text = value.clone();
                    self.transforms.push(Box::new(
                        move |_: &Document, sink: &DiagnosticSink<'_>| -> Result<Step, PluginError> {
                            sink.log(Category::Plugin, "custom: replying with literal text", Some(text.as_str()));
                            Ok(Step::Terminate(text.clone()))
                        },
                    ));
                }
                other => return Err(PluginError::UnknownOption(other.to_string())),
            }
        }
        Ok(())
    }

    fn default_config(&self) -> String {
        "# Reply with this text instead of the upstream response.\n# text = <literal reply>\n"
            .to_string()
    }

    fn transforms(&self) -> &[Box<dyn Transform>] {
        &self.transforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CategoryRegistry, DiagnosticLog};
    use std::net::{IpAddr, Ipv4Addr};

    #[test]
    fn test_text_terminates() {
        let mut plugin = CustomText::default();
        plugin
            .configure(&[("text".to_string(), "FOO".to_string())])
            .unwrap();

        let log = DiagnosticLog::new(CategoryRegistry::all_enabled());
        let sink = log.sink(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let mut steps = plugin.apply(Document::from_xml("<r/>").unwrap(), &sink);

        assert_eq!(steps.next().unwrap().unwrap(), Step::Terminate("FOO".into()));
        assert!(steps.next().is_none());
        assert_eq!(log.count_all(), 1);
    }

    #[test]
    fn test_no_options_means_no_steps() {
        let mut plugin = CustomText::default();
        plugin.configure(&[]).unwrap();
        assert!(plugin.transforms().is_empty());
    }

    #[test]
    fn test_unknown_option_rejected() {
        let mut plugin = CustomText::default();
        let err = plugin
            .configure(&[("txt".to_string(), "FOO".to_string())])
            .unwrap_err();
        assert_eq!(err.to_string(), "unknown option `txt`");
    }
}
