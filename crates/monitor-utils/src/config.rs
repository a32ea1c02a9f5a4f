//! Application-level settings

use serde::{Deserialize, Serialize};

/// Settings shared by every component of the monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application name, used as the log target prefix and user agent
    pub app_name: String,
    /// Environment (development, production, ...)
    pub environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "ai-market-monitor".to_string(),
            environment: "development".to_string(),
        }
    }
}

impl AppConfig {
    /// User agent sent with every upstream request
    pub fn user_agent(&self) -> String {
        format!("{}/{} ({})", self.app_name, env!("CARGO_PKG_VERSION"), self.environment)
    }
}
