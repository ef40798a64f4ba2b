use serde::Deserialize;
use std::path::PathBuf;

use super::{ConfigError, ServerConfig, TlsConfig};

/// YAML configuration file structure.
///
/// All fields are optional so a partial file can override just the values it
/// names; anything absent keeps its environment or default value.
///
/// # Example YAML structure
/// ```yaml
/// server:
///   host: "0.0.0.0"
///   port: 3000
///   public_host: "gateway.example.com"
///   tls:
///     cert_path: "/etc/tls/cert.pem"
///     key_path: "/etc/tls/key.pem"
///
/// realtime:
///   api_key: "sk-..."
///   model: "gpt-4o-realtime-preview"
///   turn_timeout_secs: 30
///
/// leads:
///   clients_dir: "clients"
///   webhook_url: "https://crm.example.com/leads"
///
/// security:
///   rate_limit_requests_per_second: 60
///   rate_limit_burst_size: 10
///   max_concurrent_calls: 50
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub server: Option<ServerYaml>,
    pub realtime: Option<RealtimeYaml>,
    pub leads: Option<LeadsYaml>,
    pub security: Option<SecurityYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct ServerYaml {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_host: Option<String>,
    pub tls: Option<TlsYaml>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct TlsYaml {
    pub cert_path: Option<String>,
    pub key_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RealtimeYaml {
    pub api_key: Option<String>,
    pub model: Option<String>,
    pub turn_timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct LeadsYaml {
    pub clients_dir: Option<String>,
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct SecurityYaml {
    pub rate_limit_requests_per_second: Option<u32>,
    pub rate_limit_burst_size: Option<u32>,
    pub max_concurrent_calls: Option<usize>,
}

impl YamlConfig {
    /// Load and parse a YAML configuration file.
    pub fn from_file(path: &PathBuf) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        serde_yaml::from_str(&contents).map_err(|source| ConfigError::Yaml {
            path: path.clone(),
            source,
        })
    }

    /// Overlay the values present in this file onto `config`.
    pub fn apply_to(self, config: &mut ServerConfig) {
        if let Some(server) = self.server {
            if let Some(host) = server.host {
                config.host = host;
            }
            if let Some(port) = server.port {
                config.port = port;
            }
            if let Some(public_host) = server.public_host {
                config.public_host = public_host;
            }
            if let Some(tls) = server.tls
                && let (Some(cert), Some(key)) = (tls.cert_path, tls.key_path)
            {
                config.tls = Some(TlsConfig {
                    cert_path: PathBuf::from(cert),
                    key_path: PathBuf::from(key),
                });
            }
        }
        if let Some(realtime) = self.realtime {
            if let Some(api_key) = realtime.api_key {
                config.openai_api_key = Some(api_key);
            }
            if let Some(model) = realtime.model {
                config.realtime_model = model;
            }
            if let Some(secs) = realtime.turn_timeout_secs {
                config.turn_timeout_secs = Some(secs);
            }
        }
        if let Some(leads) = self.leads {
            if let Some(dir) = leads.clients_dir {
                config.clients_dir = PathBuf::from(dir);
            }
            if let Some(url) = leads.webhook_url {
                config.lead_webhook_url = Some(url);
            }
        }
        if let Some(security) = self.security {
            if let Some(rps) = security.rate_limit_requests_per_second {
                config.rate_limit_requests_per_second = rps;
            }
            if let Some(burst) = security.rate_limit_burst_size {
                config.rate_limit_burst_size = burst;
            }
            if let Some(max) = security.max_concurrent_calls {
                config.max_concurrent_calls = max;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_yaml_overrides() {
        let yaml = r#"
server:
  port: 8443
  public_host: "gw.example.com"
realtime:
  model: "gpt-4o-mini-realtime-preview"
security:
  max_concurrent_calls: 5
"#;
        let parsed: YamlConfig = serde_yaml::from_str(yaml).unwrap();

        let mut config = ServerConfig {
            host: "0.0.0.0".to_string(),
            port: 3000,
            tls: None,
            public_host: "localhost:3000".to_string(),
            openai_api_key: None,
            realtime_model: "gpt-4o-realtime-preview".to_string(),
            turn_timeout_secs: None,
            clients_dir: PathBuf::from("clients"),
            lead_webhook_url: None,
            rate_limit_requests_per_second: 60,
            rate_limit_burst_size: 10,
            max_concurrent_calls: 50,
        };
        parsed.apply_to(&mut config);

        assert_eq!(config.port, 8443);
        assert_eq!(config.public_host, "gw.example.com");
        assert_eq!(config.realtime_model, "gpt-4o-mini-realtime-preview");
        assert_eq!(config.max_concurrent_calls, 5);
        // Untouched values survive the overlay.
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.rate_limit_burst_size, 10);
    }

    #[test]
    fn test_from_file_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "server: [not, a, mapping").unwrap();
        let err = YamlConfig::from_file(&file.path().to_path_buf()).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = YamlConfig::from_file(&PathBuf::from("/nonexistent/config.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
