//! Log categories and the startup-time registry of which are enabled.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::config::DiagnosticsConfig;

/// The fixed set of diagnostic log categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    Request,
    Upstream,
    Response,
    Plugin,
    Error,
    Config,
}

impl Category {
    pub const COUNT: usize = 6;

    pub const ALL: [Category; Category::COUNT] = [
        Category::Request,
        Category::Upstream,
        Category::Response,
        Category::Plugin,
        Category::Error,
        Category::Config,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Category::Request => "request",
            Category::Upstream => "upstream",
            Category::Response => "response",
            Category::Plugin => "plugin",
            Category::Error => "error",
            Category::Config => "config",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::Request => "Requests received from clients, with their bodies",
            Category::Upstream => "Raw responses received from the upstream service",
            Category::Response => "Responses sent back after the plugin pipeline",
            Category::Plugin => "Messages emitted by plugins while transforming a response",
            Category::Error => "Upstream failures and plugin step failures",
            Category::Config => "Plugin reconfigurations",
        }
    }

    fn default_enabled(self) -> bool {
        !matches!(self, Category::Upstream | Category::Plugin)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log category `{0}`")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

/// A category together with its enabled flag, as shown on the log page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogCategory {
    pub category: Category,
    pub enabled: bool,
}

impl LogCategory {
    pub fn name(&self) -> &'static str {
        self.category.name()
    }

    pub fn description(&self) -> &'static str {
        self.category.description()
    }
}

/// Which categories are enabled. Fixed once the process has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryRegistry {
    enabled: [bool; Category::COUNT],
}

impl CategoryRegistry {
    pub fn with_defaults() -> Self {
        let mut enabled = [false; Category::COUNT];
        for category in Category::ALL {
            enabled[category.index()] = category.default_enabled();
        }
        Self { enabled }
    }

    /// Every category enabled. Mostly useful in tests.
    pub fn all_enabled() -> Self {
        Self {
            enabled: [true; Category::COUNT],
        }
    }

    /// Defaults, then `enable`, then `disable`.
    pub fn from_config(config: &DiagnosticsConfig) -> Result<Self, UnknownCategory> {
        let mut registry = Self::with_defaults();
        for name in &config.enable {
            registry.set(name.parse()?, true);
        }
        for name in &config.disable {
            registry.set(name.parse()?, false);
        }
        Ok(registry)
    }

    pub fn set(&mut self, category: Category, enabled: bool) {
        self.enabled[category.index()] = enabled;
    }

    pub fn is_enabled(&self, category: Category) -> bool {
        self.enabled[category.index()]
    }

    pub fn categories(&self) -> impl Iterator<Item = LogCategory> + '_ {
        Category::ALL.into_iter().map(|category| LogCategory {
            category,
            enabled: self.is_enabled(category),
        })
    }
}

impl Default for CategoryRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
