use jsonapi::{ResourceSettings, DEFAULT_PER_PAGE};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Configuration for the prefectures module (`modules.prefectures`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PrefecturesConfig {
    #[serde(default = "default_per_page")]
    pub default_per_page: u64,
    /// Adds executed queries to list responses.
    #[serde(default)]
    pub debug: bool,
    /// Static entries merged into `meta` of list responses.
    #[serde(default)]
    pub metadata: Map<String, Value>,
    /// Load the bundled dataset into an empty database.
    #[serde(default = "default_seed")]
    pub seed: bool,
}

impl Default for PrefecturesConfig {
    fn default() -> Self {
        Self {
            default_per_page: default_per_page(),
            debug: false,
            metadata: Map::new(),
            seed: default_seed(),
        }
    }
}

fn default_per_page() -> u64 {
    DEFAULT_PER_PAGE
}

fn default_seed() -> bool {
    true
}

impl PrefecturesConfig {
    /// Copy the shared list settings onto a resource's settings.
    pub fn apply(&self, settings: &mut ResourceSettings) {
        settings.default_per_page = self.default_per_page.max(1);
        settings.debug = self.debug;
        settings.metadata = self.metadata.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn partial_section_keeps_defaults() {
        let cfg: PrefecturesConfig =
            serde_json::from_value(json!({"debug": true, "metadata": {"source": "census 2010"}}))
                .unwrap();
        assert_eq!(cfg.default_per_page, DEFAULT_PER_PAGE);
        assert!(cfg.debug);
        assert!(cfg.seed);

        let mut settings = ResourceSettings::default();
        cfg.apply(&mut settings);
        assert!(settings.debug);
        assert_eq!(settings.metadata["source"], "census 2010");
    }

    #[test]
    fn zero_page_size_is_raised_to_one() {
        let cfg = PrefecturesConfig {
            default_per_page: 0,
            ..Default::default()
        };
        let mut settings = ResourceSettings::default();
        cfg.apply(&mut settings);
        assert_eq!(settings.default_per_page, 1);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(serde_json::from_value::<PrefecturesConfig>(json!({"per_page": 5})).is_err());
    }
}
