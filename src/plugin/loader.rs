//! Plugin discovery and loading.
//!
//! The plugin directory holds one marker entry per enabled plugin, named
//! `<name>_plugin` with an optional extension (`custom_plugin`,
//! `custom_plugin.ini`, ...). Each name is resolved in the
//! [`PluginRegistry`] and configured from its ini section.
//!
//! Loading is all-or-nothing: any failure aborts the batch and no partial
//! chain is ever returned.
//!
//! Plugins come back in directory-listing order. That order is whatever
//! the filesystem enumerates and differs between platforms.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::config::PluginConfig;
use crate::plugin::registry::PluginRegistry;
use crate::plugin::{Plugin, PluginChain, PluginError};

/// Marker suffix, after the plugin name and before any extension.
pub const PLUGIN_SUFFIX: &str = "_plugin";

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot list plugin directory {}", path.display())]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("plugin `{name}` ({}) is not a known plugin type", path.display())]
    UnknownPlugin { name: String, path: PathBuf },

    #[error("plugin `{name}` rejected its configuration")]
    Configure {
        name: String,
        #[source]
        source: PluginError,
    },
}

/// A directory entry that looks like a plugin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub name: String,
    pub path: PathBuf,
}

fn plugin_name(path: &Path) -> Option<&str> {
    let file_name = path.file_name()?.to_str()?;
    if file_name.starts_with('.') {
        return None;
    }
    let stem = file_name.split('.').next()?;
    stem.strip_suffix(PLUGIN_SUFFIX).filter(|name| !name.is_empty())
}

/// List plugin candidates in `directory`, in listing order.
///
/// A name that appears more than once (e.g. `x_plugin` and `x_plugin.ini`)
/// is reported once, at its first position.
pub fn discover(directory: &Path) -> Result<Vec<Candidate>, LoadError> {
    let discovery_error = |source| LoadError::Discovery {
        path: directory.to_path_buf(),
        source,
    };

    let mut seen = HashSet::new();
    let mut candidates = Vec::new();
    for entry in fs::read_dir(directory).map_err(discovery_error)? {
        let path = entry.map_err(discovery_error)?.path();
        let Some(name) = plugin_name(&path) else {
            continue;
        };
        if seen.insert(name.to_string()) {
            candidates.push(Candidate {
                name: name.to_string(),
                path: path.clone(),
            });
        }
    }
    Ok(candidates)
}

/// Discover, instantiate and configure plugins.
///
/// - `config == None`: every candidate is loaded with no options.
/// - `config == Some(c)`: a candidate without a `[name]` section in `c`
///   is skipped.
pub fn load_plugins(
    registry: &PluginRegistry,
    directory: &Path,
    config: Option<&PluginConfig>,
) -> Result<PluginChain, LoadError> {
    let mut plugins = Vec::new();

    for candidate in discover(directory)? {
        let options = match config {
            None => &[][..],
            Some(config) => match config.section(&candidate.name) {
                Some(options) => options,
                None => {
                    tracing::debug!(plugin = %candidate.name, "No config section, skipping plugin");
                    continue;
                }
            },
        };

        let constructor = registry
            .get(&candidate.name)
            .ok_or_else(|| LoadError::UnknownPlugin {
                name: candidate.name.clone(),
                path: candidate.path.clone(),
            })?;

        let mut instance = constructor();
        instance
            .configure(options)
            .map_err(|source| LoadError::Configure {
                name: candidate.name.clone(),
                source,
            })?;

        tracing::debug!(
            plugin = %candidate.name,
            steps = instance.transforms().len(),
            "Plugin loaded"
        );
        plugins.push(Plugin::new(candidate.name, instance));
    }

    Ok(PluginChain::new(plugins))
}

/// A registry bound to the fixed plugin directory.
#[derive(Debug, Clone)]
pub struct PluginLoader {
    registry: Arc<PluginRegistry>,
    directory: PathBuf,
}

impl PluginLoader {
    pub fn new(registry: PluginRegistry, directory: impl Into<PathBuf>) -> Self {
        Self {
            registry: Arc::new(registry),
            directory: directory.into(),
        }
    }

    pub fn load(&self, config: Option<&PluginConfig>) -> Result<PluginChain, LoadError> {
        load_plugins(&self.registry, &self.directory, config)
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }
}
