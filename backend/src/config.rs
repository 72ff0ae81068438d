//! Coordinator configuration loaded via OrthoConfig.

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::JoinCoordinatorConfig;

/// Configuration values for the pool write paths.
#[derive(Debug, Clone, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "GROUPBUY")]
pub struct CoordinatorSettings {
    /// Attempts per join or close before a version conflict is surfaced.
    #[ortho_config(default = 3)]
    pub max_join_attempts: u32,
}

impl CoordinatorSettings {
    /// Return the configured attempt budget, clamped to the accepted range.
    pub fn max_join_attempts(&self) -> u32 {
        self.retry_policy().max_attempts()
    }

    /// Build the retry policy shared by joins and closes.
    pub fn retry_policy(&self) -> JoinCoordinatorConfig {
        JoinCoordinatorConfig::with_max_attempts(self.max_join_attempts)
    }
}
