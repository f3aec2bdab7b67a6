//! Plugin configuration text.
//!
//! Ini-style: one `[section]` per plugin name, `key=value` (or `key: value`)
//! lines inside it. Keys are case-sensitive. Lines starting with `#` or `;`
//! are comments. Section and option order is preserved so that the text
//! served back on `GET /config` reads like what was posted.

use std::fmt;

use thiserror::Error;

/// Errors produced while parsing plugin configuration text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IniError {
    #[error("line {line}: malformed section header `{text}`")]
    BadSection { line: usize, text: String },

    #[error("line {line}: option `{key}` appears before any section header")]
    OrphanOption { line: usize, key: String },

    #[error("line {line}: expected `key=value`, found `{text}`")]
    BadOption { line: usize, text: String },

    #[error("line {line}: section [{name}] is declared twice")]
    DuplicateSection { line: usize, name: String },

    #[error("line {line}: option `{key}` is repeated in section [{section}]")]
    DuplicateOption {
        line: usize,
        section: String,
        key: String,
    },
}

/// One `[name]` block and its options in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub name: String,
    pub options: Vec<(String, String)>,
}

/// Parsed plugin configuration: an ordered map of section name to options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginConfig {
    sections: Vec<Section>,
}

impl PluginConfig {
    /// Parse configuration text.
    pub fn parse(text: &str) -> Result<Self, IniError> {
        let mut config = PluginConfig::default();

        for (idx, raw) in text.lines().enumerate() {
            let line = idx + 1;
            let trimmed = raw.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with(';') {
                continue;
            }

            if let Some(rest) = trimmed.strip_prefix('[') {
                let name = rest
                    .strip_suffix(']')
                    .map(str::trim)
                    .filter(|n| !n.is_empty() && !n.contains(['[', ']']))
                    .ok_or_else(|| IniError::BadSection {
                        line,
                        text: trimmed.to_string(),
                    })?;
                if config.has_section(name) {
                    return Err(IniError::DuplicateSection {
                        line,
                        name: name.to_string(),
                    });
                }
                config.sections.push(Section {
                    name: name.to_string(),
                    options: Vec::new(),
                });
                continue;
            }

            let split = trimmed
                .find(['=', ':'])
                .map(|pos| (trimmed[..pos].trim(), trimmed[pos + 1..].trim()));
            let (key, value) = match split {
                Some((key, value)) if !key.is_empty() => (key, value),
                _ => {
                    return Err(IniError::BadOption {
                        line,
                        text: trimmed.to_string(),
                    })
                }
            };

            let section = config.sections.last_mut().ok_or_else(|| IniError::OrphanOption {
                line,
                key: key.to_string(),
            })?;
            if section.options.iter().any(|(k, _)| k == key) {
                return Err(IniError::DuplicateOption {
                    line,
                    section: section.name.clone(),
                    key: key.to_string(),
                });
            }
            section.options.push((key.to_string(), value.to_string()));
        }

        Ok(config)
    }

    /// Options of the named section, if the section exists.
    pub fn section(&self, name: &str) -> Option<&[(String, String)]> {
        self.sections
            .iter()
            .find(|s| s.name == name)
            .map(|s| s.options.as_slice())
    }

    pub fn has_section(&self, name: &str) -> bool {
        self.sections.iter().any(|s| s.name == name)
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

impl fmt::Display for PluginConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, section) in self.sections.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            writeln!(f, "[{}]", section.name)?;
            for (key, value) in &section.options {
                writeln!(f, "{} = {}", key, value)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sections_and_options() {
        let text = "# leading comment\n[custom]\ntext=FOO\n\n[attribute]\nBrand@code: XYZ\n; trailing\n";
        let config = PluginConfig::parse(text).unwrap();

        assert_eq!(config.sections().len(), 2);
        assert_eq!(
            config.section("custom").unwrap(),
            &[("text".to_string(), "FOO".to_string())]
        );
        assert_eq!(
            config.section("attribute").unwrap(),
            &[("Brand@code".to_string(), "XYZ".to_string())]
        );
        assert!(config.section("missing").is_none());
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let config = PluginConfig::parse("[p]\nKey=1\nkey=2\n").unwrap();
        assert_eq!(config.section("p").unwrap().len(), 2);
    }

    #[test]
    fn test_value_may_contain_separators() {
        let config = PluginConfig::parse("[custom]\ntext = a=b: c\n").unwrap();
        assert_eq!(config.section("custom").unwrap()[0].1, "a=b: c");
    }

    #[test]
    fn test_empty_text_has_no_sections() {
        let config = PluginConfig::parse("\n  \n# nothing\n").unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_rejects_malformed_input() {
        assert!(matches!(
            PluginConfig::parse("text=FOO"),
            Err(IniError::OrphanOption { line: 1, .. })
        ));
        assert!(matches!(
            PluginConfig::parse("[custom\ntext=FOO"),
            Err(IniError::BadSection { line: 1, .. })
        ));
        assert!(matches!(
            PluginConfig::parse("[custom]\njust some words"),
            Err(IniError::BadOption { line: 2, .. })
        ));
        assert!(matches!(
            PluginConfig::parse("[a]\n[a]"),
            Err(IniError::DuplicateSection { line: 2, .. })
        ));
        assert!(matches!(
            PluginConfig::parse("[a]\nx=1\nx=2"),
            Err(IniError::DuplicateOption { line: 3, .. })
        ));
    }

    #[test]
    fn test_display_reparses_to_same_config() {
        let config = PluginConfig::parse("[custom]\ntext=FOO\n[trace]\nlabel=in\n").unwrap();
        let text = config.to_string();
        assert_eq!(text, "[custom]\ntext = FOO\n\n[trace]\nlabel = in\n");
        assert_eq!(PluginConfig::parse(&text).unwrap(), config);
    }
}
