//! Compiled-in plugin types.
//!
//! Discovery decides *which* plugins run; this registry decides *what*
//! a discovered name means. A name with no registered constructor cannot
//! be loaded.

use std::fmt::Write;

use crate::plugin::builtin;
use crate::plugin::ResponsePlugin;

/// Creates an unconfigured plugin instance.
pub type Constructor = fn() -> Box<dyn ResponsePlugin>;

#[derive(Clone, Default)]
pub struct PluginRegistry {
    entries: Vec<(String, Constructor)>,
}

impl PluginRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in plugin.
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry
            .register(builtin::custom::NAME, builtin::custom::CustomText::boxed)
            .register(builtin::attribute::NAME, builtin::attribute::AttributeRewrite::boxed)
            .register(builtin::trace::NAME, builtin::trace::TraceDocument::boxed);
        registry
    }

    /// Register `constructor` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: &str, constructor: Constructor) -> &mut Self {
        self.entries.retain(|(n, _)| n != name);
        self.entries.push((name.to_string(), constructor));
        self
    }

    pub fn get(&self, name: &str) -> Option<Constructor> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, constructor)| *constructor)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    /// Every plugin's default configuration block, as ini text.
    pub fn default_config(&self) -> String {
        let mut out = String::new();
        for (name, constructor) in &self.entries {
            if !out.is_empty() {
                out.push('\n');
            }
            let _ = writeln!(out, "[{}]", name);
            out.push_str(&constructor().default_config());
        }
        out
    }
}

impl std::fmt::Debug for PluginRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PluginConfig;

    #[test]
    fn test_builtin_names() {
        let registry = PluginRegistry::builtin();
        let names: Vec<_> = registry.names().collect();
        assert_eq!(names, ["custom", "attribute", "trace"]);
        assert!(registry.get("custom").is_some());
        assert!(registry.get("brand").is_none());
    }

    #[test]
    fn test_default_config_is_loadable() {
        let registry = PluginRegistry::builtin();
        let text = registry.default_config();
        let config = PluginConfig::parse(&text).unwrap();

        for name in registry.names() {
            let options = config.section(name).unwrap();
            let mut plugin = registry.get(name).unwrap()();
            plugin.configure(options).unwrap();
        }
    }
}
