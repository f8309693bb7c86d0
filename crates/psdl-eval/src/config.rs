//! Evaluator configuration

use psdl_ast::WindowSpec;
use serde::{Deserialize, Serialize};

/// Tunables for an [`Evaluator`](crate::Evaluator)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluatorConfig {
    /// History requested for window-less `last` trends
    ///
    /// `None` requests the whole series up to the reference time.
    pub last_lookback: Option<WindowSpec>,
    /// Sort fetched points by timestamp before applying operators
    pub sort_points: bool,
    /// Turn data fetch failures into hard errors
    pub strict_data: bool,
}

impl EvaluatorConfig {
    pub fn builder() -> EvaluatorConfigBuilder {
        EvaluatorConfigBuilder::default()
    }
}

/// Builder for [`EvaluatorConfig`]
#[derive(Debug, Clone, Default)]
pub struct EvaluatorConfigBuilder {
    config: EvaluatorConfig,
}

impl EvaluatorConfigBuilder {
    /// Limit the history fetched for window-less `last`
    pub fn last_lookback(mut self, window: WindowSpec) -> Self {
        self.config.last_lookback = Some(window);
        self
    }

    pub fn sort_points(mut self, sort: bool) -> Self {
        self.config.sort_points = sort;
        self
    }

    pub fn strict_data(mut self, strict: bool) -> Self {
        self.config.strict_data = strict;
        self
    }

    pub fn build(self) -> EvaluatorConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_and_overrides() {
        assert_eq!(EvaluatorConfig::builder().build(), EvaluatorConfig::default());

        let config = EvaluatorConfig::builder()
            .last_lookback(WindowSpec::days(3))
            .sort_points(true)
            .strict_data(true)
            .build();
        assert_eq!(config.last_lookback, Some(WindowSpec::days(3)));
        assert!(config.sort_points);
        assert!(config.strict_data);
    }
}
