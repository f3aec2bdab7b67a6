//! Transformation pipeline driver.
//!
//! Runs every plugin of a chain, in order, over one response document.
//!
//! - `Terminate(text)` from any step ends the whole pipeline with `text`.
//! - `Continue(doc)` makes `doc` the current document.
//! - An error (or panic) inside a plugin's step sequence is logged and the
//!   driver moves on to the next plugin. The current document keeps the
//!   effect of the failing plugin's completed steps; nothing is rolled back.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use crate::diagnostics::{Category, DiagnosticSink};
use crate::error::report;
use crate::observability::metrics;
use crate::plugin::{Document, PluginChain, Step};

/// Result of running a chain over a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutput {
    /// A step declared the final reply.
    Terminated { plugin: String, text: String },
    /// Every plugin ran; this is the final document.
    Completed(Document),
}

impl PipelineOutput {
    pub fn is_terminated(&self) -> bool {
        matches!(self, PipelineOutput::Terminated { .. })
    }

    pub fn as_str(&self) -> &str {
        match self {
            PipelineOutput::Terminated { text, .. } => text,
            PipelineOutput::Completed(document) => document.as_str(),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            PipelineOutput::Terminated { text, .. } => text.into_bytes(),
            PipelineOutput::Completed(document) => document.to_bytes(),
        }
    }
}

/// Run `chain` over `document`.
pub fn run(chain: &PluginChain, mut document: Document, sink: &DiagnosticSink<'_>) -> PipelineOutput {
    for plugin in chain.iter() {
        let mut steps = plugin.instance().apply(document.clone(), sink);
        let mut index = 0usize;

        loop {
            let next = panic::catch_unwind(AssertUnwindSafe(|| steps.next()));
            let failure = match next {
                Ok(None) => break,
                Ok(Some(Ok(Step::Continue(next_document)))) => {
                    document = next_document;
                    index += 1;
                    continue;
                }
                Ok(Some(Ok(Step::Terminate(text)))) => {
                    tracing::debug!(plugin = %plugin.name(), step = index, "Pipeline terminated early");
                    metrics::record_termination(plugin.name());
                    return PipelineOutput::Terminated {
                        plugin: plugin.name().to_string(),
                        text,
                    };
                }
                Ok(Some(Err(e))) => report(&e),
                Err(payload) => format!("step panicked: {}", panic_message(payload.as_ref())),
            };

            tracing::warn!(
                plugin = %plugin.name(),
                step = index,
                error = %failure,
                "Plugin step failed, continuing with next plugin"
            );
            metrics::record_step_failure(plugin.name());
            if sink.is_enabled(Category::Error) {
                sink.log(
                    Category::Error,
                    &format!("plugin `{}` failed at step {}", plugin.name(), index),
                    Some(failure.as_str()),
                );
            }
            break;
        }
    }

    PipelineOutput::Completed(document)
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{CategoryRegistry, DiagnosticLog};
    use crate::plugin::{Plugin, PluginError, ResponsePlugin, Transform};
    use std::net::{IpAddr, Ipv4Addr};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Scripted {
        transforms: Vec<Box<dyn Transform>>,
    }

    impl ResponsePlugin for Scripted {
        fn configure(&mut self, _options: &[(String, String)]) -> Result<(), PluginError> {
            Ok(())
        }

        fn default_config(&self) -> String {
            String::new()
        }

        fn transforms(&self) -> &[Box<dyn Transform>] {
            &self.transforms
        }
    }

    fn plugin(name: &str, transforms: Vec<Box<dyn Transform>>) -> Plugin {
        Plugin::new(name, Box::new(Scripted { transforms }))
    }

    /// Appends `<tag/>` inside the root and counts invocations.
    fn append(tag: &'static str, calls: &Arc<AtomicUsize>) -> Box<dyn Transform> {
        let calls = Arc::clone(calls);
        Box::new(move |doc: &Document, _: &DiagnosticSink<'_>| -> Result<Step, PluginError> {
            calls.fetch_add(1, Ordering::SeqCst);
            let xml = doc.as_str().replace("</r>", &format!("<{}/></r>", tag));
            Ok(Step::Continue(Document::from_xml(&xml)?))
        })
    }

    fn terminate(text: &'static str) -> Box<dyn Transform> {
        Box::new(move |_: &Document, _: &DiagnosticSink<'_>| -> Result<Step, PluginError> {
            Ok(Step::Terminate(text.to_string()))
        })
    }

    fn fail() -> Box<dyn Transform> {
        Box::new(|_: &Document, _: &DiagnosticSink<'_>| -> Result<Step, PluginError> {
            Err(PluginError::Step("brand table missing".into()))
        })
    }

    fn start() -> Document {
        Document::from_xml("<r></r>").unwrap()
    }

    fn with_sink<T>(f: impl FnOnce(&DiagnosticSink<'_>, &DiagnosticLog) -> T) -> T {
        let log = DiagnosticLog::new(CategoryRegistry::all_enabled());
        let sink = log.sink(IpAddr::V4(Ipv4Addr::LOCALHOST));
        f(&sink, &log)
    }

    #[test]
    fn test_empty_chain_returns_input() {
        let output = with_sink(|sink, _| run(&PluginChain::default(), start(), sink));
        assert_eq!(output, PipelineOutput::Completed(start()));
    }

    #[test]
    fn test_plugins_run_in_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = PluginChain::new(vec![
            plugin("first", vec![append("a", &calls), append("b", &calls)]),
            plugin("second", vec![append("c", &calls)]),
        ]);

        let output = with_sink(|sink, _| run(&chain, start(), sink));
        assert_eq!(output.as_str(), "<r><a/><b/><c/></r>");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_terminate_short_circuits_everything_after() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = PluginChain::new(vec![
            plugin(
                "p",
                vec![append("a", &calls), terminate("X"), append("never", &calls)],
            ),
            plugin("after", vec![append("never", &calls)]),
        ]);

        let output = with_sink(|sink, _| run(&chain, start(), sink));
        assert_eq!(
            output,
            PipelineOutput::Terminated {
                plugin: "p".into(),
                text: "X".into()
            }
        );
        assert_eq!(output.into_bytes(), b"X");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_step_keeps_completed_effects() {
        let calls = Arc::new(AtomicUsize::new(0));
        let seen_by_next = Arc::new(std::sync::Mutex::new(String::new()));
        let seen = Arc::clone(&seen_by_next);
        let recorder: Box<dyn Transform> = Box::new(
            move |doc: &Document, _: &DiagnosticSink<'_>| -> Result<Step, PluginError> {
                *seen.lock().unwrap() = doc.as_str().to_string();
                Ok(Step::Continue(doc.clone()))
            },
        );

        let chain = PluginChain::new(vec![
            plugin("p", vec![append("a", &calls), fail(), append("never", &calls)]),
            plugin("next", vec![recorder]),
        ]);

        let (output, errors) = with_sink(|sink, log| {
            let output = run(&chain, start(), sink);
            (output, log.count_all())
        });

        assert_eq!(*seen_by_next.lock().unwrap(), "<r><a/></r>");
        assert_eq!(output.as_str(), "<r><a/></r>");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(errors, 1);
    }

    #[test]
    fn test_panicking_plugin_is_isolated() {
        let calls = Arc::new(AtomicUsize::new(0));
        let boom: Box<dyn Transform> = Box::new(
            |_: &Document, _: &DiagnosticSink<'_>| -> Result<Step, PluginError> {
                panic!("plugin bug")
            },
        );
        let chain = PluginChain::new(vec![
            plugin("broken", vec![boom]),
            plugin("healthy", vec![append("ok", &calls)]),
        ]);

        let output = with_sink(|sink, log| {
            let output = run(&chain, start(), sink);
            let client = log.for_client(IpAddr::V4(Ipv4Addr::LOCALHOST));
            assert!(client.records[0]
                .long
                .as_deref()
                .unwrap()
                .contains("plugin bug"));
            output
        });
        assert_eq!(output.as_str(), "<r><ok/></r>");
    }

    #[test]
    fn test_failure_in_first_step_passes_document_unchanged() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = PluginChain::new(vec![
            plugin("p", vec![fail(), append("never", &calls)]),
            plugin("q", vec![terminate("from q")]),
        ]);

        let output = with_sink(|sink, _| run(&chain, start(), sink));
        assert_eq!(output.as_str(), "from q");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
