use serde::{Deserialize, Serialize};

/// What a composite level reports when several of its children fail.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorPolicy {
    /// Keep only the most recent failure at each level; earlier sibling
    /// failures are dropped.
    #[default]
    KeepLast,
    /// Keep every failure, in traversal order.
    CollectAll,
}

/// Configuration for a [`Deinitializer`](crate::Deinitializer).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How sibling failures are aggregated.
    pub error_policy: ErrorPolicy,
    /// Maximum number of nested composites the engine will enter. `None`
    /// means unbounded; the traversal stack lives on the heap either way.
    pub max_depth: Option<usize>,
}

impl EngineConfig {
    /// Report every cleanup failure instead of only the last one per level.
    pub fn collect_all() -> Self {
        Self {
            error_policy: ErrorPolicy::CollectAll,
            ..Default::default()
        }
    }

    pub fn with_max_depth(mut self, limit: usize) -> Self {
        self.max_depth = Some(limit);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_keeps_last_and_is_unbounded() {
        let config = EngineConfig::default();
        assert_eq!(config.error_policy, ErrorPolicy::KeepLast);
        assert_eq!(config.max_depth, None);
    }

    #[test]
    fn parses_from_toml() {
        let config: EngineConfig = toml::from_str(
            r#"
            error_policy = "collect-all"
            max_depth = 64
            "#,
        )
        .unwrap();
        assert_eq!(config, EngineConfig::collect_all().with_max_depth(64));
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config: EngineConfig = toml::from_str("max_depth = 8").unwrap();
        assert_eq!(config.error_policy, ErrorPolicy::KeepLast);
        assert_eq!(config.max_depth, Some(8));
    }
}
