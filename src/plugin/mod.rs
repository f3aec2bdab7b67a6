//! Response plugins.
//!
//! A plugin is configured from its ini section, registers one or more
//! transformation steps, and is applied to every proxied response as a
//! lazy sequence of [`Step`]s.
//!
//! # Data Flow
//! ```text
//! plugin directory ──▶ loader.rs (discover <name>_plugin markers)
//!                          │
//!                          ▼
//!                     registry.rs (name → constructor)
//!                          │ configure(options)
//!                          ▼
//!                     PluginChain ──▶ pipeline driver
//! ```

pub mod builtin;
pub mod document;
pub mod loader;
pub mod registry;

use std::fmt;

use thiserror::Error;

use crate::diagnostics::DiagnosticSink;

pub use document::{Document, DocumentError};
pub use loader::{discover, load_plugins, Candidate, LoadError, PluginLoader, PLUGIN_SUFFIX};
pub use registry::PluginRegistry;

/// Outcome of one transformation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// Hand this document to the next step.
    Continue(Document),
    /// Stop the whole pipeline and reply with this literal text.
    Terminate(String),
}

/// Errors raised by plugins while configuring or transforming.
#[derive(Debug, Error)]
pub enum PluginError {
    #[error("unknown option `{0}`")]
    UnknownOption(String),

    #[error("invalid value for option `{key}`: {reason}")]
    InvalidOption { key: String, reason: String },

    #[error("step failed: {0}")]
    Step(String),

    #[error(transparent)]
    Document(#[from] DocumentError),
}

/// A single registered transformation.
pub trait Transform: Send + Sync {
    fn run(&self, document: &Document, sink: &DiagnosticSink<'_>) -> Result<Step, PluginError>;
}

impl<F> Transform for F
where
    F: Fn(&Document, &DiagnosticSink<'_>) -> Result<Step, PluginError> + Send + Sync,
{
    fn run(&self, document: &Document, sink: &DiagnosticSink<'_>) -> Result<Step, PluginError> {
        self(document, sink)
    }
}

/// The capability every plugin type provides.
pub trait ResponsePlugin: Send + Sync {
    /// Parse options and register transformation steps.
    /// Must reject keys it does not understand.
    fn configure(&mut self, options: &[(String, String)]) -> Result<(), PluginError>;

    /// A self-documenting default configuration block (without the
    /// section header).
    fn default_config(&self) -> String;

    /// Steps registered by `configure`, in application order.
    fn transforms(&self) -> &[Box<dyn Transform>];

    /// Apply the registered steps lazily, each consuming the document
    /// produced by the previous one.
    fn apply<'a, 's>(&'a self, document: Document, sink: &'a DiagnosticSink<'s>) -> Steps<'a, 's> {
        Steps {
            transforms: self.transforms().iter(),
            current: document,
            sink,
            finished: false,
        }
    }
}

/// Lazy sequence of step outcomes for one plugin.
///
/// Ends after the last step, after a `Terminate`, or after the first error.
pub struct Steps<'a, 's> {
    transforms: std::slice::Iter<'a, Box<dyn Transform>>,
    current: Document,
    sink: &'a DiagnosticSink<'s>,
    finished: bool,
}

impl<'a, 's> Iterator for Steps<'a, 's> {
    type Item = Result<Step, PluginError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let transform = self.transforms.next()?;
        let outcome = transform.run(&self.current, self.sink);
        match &outcome {
            Ok(Step::Continue(document)) => self.current = document.clone(),
            Ok(Step::Terminate(_)) | Err(_) => self.finished = true,
        }
        Some(outcome)
    }
}

/// A loaded, configured plugin.
pub struct Plugin {
    name: String,
    instance: Box<dyn ResponsePlugin>,
}

impl Plugin {
    pub fn new(name: impl Into<String>, instance: Box<dyn ResponsePlugin>) -> Self {
        Self {
            name: name.into(),
            instance,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn instance(&self) -> &dyn ResponsePlugin {
        self.instance.as_ref()
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("steps", &self.instance.transforms().len())
            .finish()
    }
}

/// Plugins in application order. Replaced as a whole, never edited.
#[derive(Debug, Default)]
pub struct PluginChain {
    plugins: Vec<Plugin>,
}

impl PluginChain {
    pub fn new(plugins: Vec<Plugin>) -> Self {
        Self { plugins }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Plugin> {
        self.plugins.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(Plugin::name).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}
