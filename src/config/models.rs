// src/config/models.rs
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub target: TargetConfig,
    #[serde(default)]
    pub refresh: RefreshConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// What to resolve: a plain hostname combined with a fixed port, or an SRV
/// record set where every target carries its own port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TargetConfig {
    Direct {
        name: String,
        port: u16,
    },
    Srv {
        #[serde(default)]
        service: String,
        #[serde(default)]
        proto: String,
        domain: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_lookup_timeout_ms")]
    pub lookup_timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be at least 1ms")]
    ZeroDuration(&'static str),

    #[error("Target {0} must not be empty")]
    EmptyTarget(&'static str),

    #[error("Direct target port must not be 0")]
    ZeroPort,

    #[error("Metrics path must start with '/': {0}")]
    InvalidMetricsPath(String),
}

fn default_interval_ms() -> u64 {
    5_000
}

fn default_lookup_timeout_ms() -> u64 {
    2_000
}

fn default_metrics_port() -> u16 {
    9090
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            lookup_timeout_ms: default_lookup_timeout_ms(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            port: default_metrics_port(),
            path: default_metrics_path(),
        }
    }
}

impl RefreshConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroDuration("refresh interval"));
        }
        if self.lookup_timeout_ms == 0 {
            return Err(ConfigError::ZeroDuration("lookup timeout"));
        }
        Ok(())
    }
}

impl TargetConfig {
    /// Human readable name used in logs and metric labels.
    pub fn display_name(&self) -> String {
        match self {
            TargetConfig::Direct { name, port } => format!("{}:{}", name, port),
            TargetConfig::Srv {
                service,
                proto,
                domain,
            } => crate::resolver::srv_query_name(service, proto, domain),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            TargetConfig::Direct { name, port } => {
                if name.trim().is_empty() {
                    return Err(ConfigError::EmptyTarget("name"));
                }
                if *port == 0 {
                    return Err(ConfigError::ZeroPort);
                }
            }
            TargetConfig::Srv { domain, .. } => {
                if domain.trim().is_empty() {
                    return Err(ConfigError::EmptyTarget("domain"));
                }
            }
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.target.validate()?;
        self.refresh.validate()?;
        if self.metrics.enabled && !self.metrics.path.starts_with('/') {
            return Err(ConfigError::InvalidMetricsPath(self.metrics.path.clone()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_applied_to_minimal_yaml() {
        let yaml = r#"
target:
  type: direct
  name: backend.internal
  port: 8080
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(
            config.target,
            TargetConfig::Direct {
                name: "backend.internal".to_string(),
                port: 8080,
            }
        );
        assert_eq!(config.refresh.interval(), Duration::from_secs(5));
        assert_eq!(config.refresh.lookup_timeout(), Duration::from_secs(2));
        assert!(!config.metrics.enabled);
        assert_eq!(config.metrics.path, "/metrics");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_srv_target_from_json() {
        let json = r#"{
            "target": { "type": "srv", "service": "http", "proto": "tcp", "domain": "backend.svc.cluster.local" },
            "refresh": { "interval_ms": 1000 }
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.refresh.interval_ms, 1000);
        assert_eq!(config.refresh.lookup_timeout_ms, 2000);
        assert_eq!(
            config.target.display_name(),
            "_http._tcp.backend.svc.cluster.local"
        );
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let refresh = RefreshConfig {
            interval_ms: 0,
            lookup_timeout_ms: 100,
        };
        assert_eq!(
            refresh.validate(),
            Err(ConfigError::ZeroDuration("refresh interval"))
        );

        let target = TargetConfig::Direct {
            name: "backend".to_string(),
            port: 0,
        };
        assert_eq!(target.validate(), Err(ConfigError::ZeroPort));

        let target = TargetConfig::Srv {
            service: "http".to_string(),
            proto: "tcp".to_string(),
            domain: " ".to_string(),
        };
        assert_eq!(target.validate(), Err(ConfigError::EmptyTarget("domain")));
    }
}
