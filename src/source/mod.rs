//! Lead sources and registry
//!
//! A source is anything that can hand the reconciliation engine a batch of
//! rows. Which sources exist comes from the `sources` section of the config;
//! disabled ones are never registered.

mod json;

pub use json::JsonSource;

use crate::config::Config;
use crate::error::Result;
use crate::reconcile::{ReconcileMode, SourceRow};

/// Rows read from a source in one pass
#[derive(Debug, Clone, Default)]
pub struct SourceBatch {
    /// Stable tag for this exact content, written to `import_batch`
    pub tag: String,
    pub rows: Vec<SourceRow>,
    /// Lines or records that could not be decoded at all
    pub errors: Vec<String>,
}

/// Lead source trait
pub trait LeadSource: Send + Sync {
    /// Config name of the source
    fn id(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> String;

    /// Whether rows need a business name
    fn mode(&self) -> ReconcileMode;

    /// Check if this source's data exists
    fn is_available(&self) -> bool;

    /// Read the current batch
    fn load(&self) -> Result<SourceBatch>;
}

/// Registry of configured sources
pub struct SourceRegistry {
    sources: Vec<Box<dyn LeadSource>>,
}

impl SourceRegistry {
    pub fn new(config: &Config) -> Self {
        let mut registry = Self { sources: vec![] };

        let mut names: Vec<&String> = config.sources.keys().collect();
        names.sort();
        for name in names {
            if !config.is_source_enabled(name) {
                continue;
            }
            if let Some(source) = config.sources.get(name) {
                let path = shellexpand::tilde(&source.path).to_string();
                registry.register(Box::new(JsonSource::new(name, path, source.mode)));
            }
        }

        registry
    }

    pub fn register(&mut self, source: Box<dyn LeadSource>) {
        self.sources.push(source);
    }

    pub fn available_sources(&self) -> Vec<&dyn LeadSource> {
        self.sources
            .iter()
            .filter(|s| s.is_available())
            .map(|s| s.as_ref())
            .collect()
    }

    pub fn get_source(&self, id: &str) -> Option<&dyn LeadSource> {
        self.sources
            .iter()
            .find(|s| s.id() == id)
            .map(|s| s.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;

    #[test]
    fn test_registry_skips_disabled_sources() {
        let mut config = Config::default();
        config.sources.insert(
            "sheet".to_string(),
            SourceConfig {
                enabled: true,
                path: "/tmp/does-not-exist/*.json".to_string(),
                mode: ReconcileMode::Sheet,
            },
        );
        config.sources.insert(
            "old".to_string(),
            SourceConfig {
                enabled: false,
                path: "/tmp/old.json".to_string(),
                mode: ReconcileMode::Import,
            },
        );

        let registry = SourceRegistry::new(&config);
        assert!(registry.get_source("sheet").is_some());
        assert!(registry.get_source("old").is_none());
        assert!(registry.available_sources().is_empty());
    }
}
