//! Configuration types.

use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Where raw inbound messages are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectStoreConfig {
    /// `<root>/<container>/<key>` on the local filesystem.
    Filesystem { root: PathBuf },
    /// Path-style `GET <endpoint>/<container>/<key>`.
    Http { endpoint: String },
}

impl ObjectStoreConfig {
    /// `http://` and `https://` values select the HTTP store, anything else is a directory.
    pub fn parse(value: &str) -> Self {
        if value.starts_with("http://") || value.starts_with("https://") {
            Self::Http {
                endpoint: value.trim_end_matches('/').to_string(),
            }
        } else {
            Self::Filesystem {
                root: PathBuf::from(value),
            }
        }
    }
}

/// SMTP relay settings.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    /// STARTTLS with credentials when true, plaintext otherwise (local sinks only).
    pub tls: bool,
}

/// Outbound transport selection.
#[derive(Debug, Clone)]
pub enum TransportConfig {
    Smtp(SmtpConfig),
    /// Write `.eml` files into a directory instead of sending.
    Outbox { dir: PathBuf },
}

/// Relay configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Forwarding domain; the synthesized From uses `<noreply_local_part>@<domain>`.
    pub domain: String,
    pub noreply_local_part: String,
    /// Known list names (lower-cased).
    pub lists: Vec<String>,
    /// Parameter namespace, e.g. `/robin/lists`.
    pub parameter_namespace: String,
    pub parameter_root: PathBuf,
    /// Keys outside this prefix are ignored. `None` accepts every key.
    pub key_prefix: Option<String>,
    pub bind_addr: SocketAddr,
    pub object_store: ObjectStoreConfig,
    pub transport: TransportConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            domain: "chirpy.studio".to_string(),
            noreply_local_part: "noreply".to_string(),
            lists: vec!["alerts".to_string(), "info".to_string()],
            parameter_namespace: "/robin/lists".to_string(),
            parameter_root: PathBuf::from("./data/params"),
            key_prefix: Some("incoming/".to_string()),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            object_store: ObjectStoreConfig::Filesystem {
                root: PathBuf::from("./data/objects"),
            },
            transport: TransportConfig::Outbox {
                dir: PathBuf::from("./data/outbox"),
            },
        }
    }
}

impl RelayConfig {
    /// Build config from environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let domain = lookup("RELAY_DOMAIN").unwrap_or(defaults.domain);
        let noreply_local_part =
            lookup("RELAY_NOREPLY_LOCAL_PART").unwrap_or(defaults.noreply_local_part);

        let lists = match lookup("RELAY_LISTS") {
            Some(raw) => parse_lists(&raw),
            None => defaults.lists,
        };
        if lists.is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "RELAY_LISTS".into(),
                message: "at least one list name is required".into(),
            });
        }

        let parameter_namespace = lookup("RELAY_PARAMETER_NAMESPACE")
            .map(|s| s.trim_end_matches('/').to_string())
            .unwrap_or(defaults.parameter_namespace);

        let parameter_root = lookup("RELAY_PARAMETER_ROOT")
            .map(PathBuf::from)
            .unwrap_or(defaults.parameter_root);

        let key_prefix = match lookup("RELAY_KEY_PREFIX") {
            Some(prefix) if prefix.is_empty() => None,
            Some(prefix) => Some(prefix),
            None => defaults.key_prefix,
        };

        let bind_addr = match lookup("RELAY_BIND_ADDR") {
            Some(raw) => raw.parse().map_err(|e| ConfigError::InvalidValue {
                key: "RELAY_BIND_ADDR".into(),
                message: format!("{e}"),
            })?,
            None => defaults.bind_addr,
        };

        let object_store = lookup("RELAY_OBJECT_STORE")
            .map(|s| ObjectStoreConfig::parse(&s))
            .unwrap_or(defaults.object_store);

        let transport = match lookup("RELAY_TRANSPORT").as_deref() {
            None | Some("outbox") => TransportConfig::Outbox {
                dir: lookup("RELAY_OUTBOX_DIR")
                    .map(PathBuf::from)
                    .unwrap_or_else(|| PathBuf::from("./data/outbox")),
            },
            Some("smtp") => TransportConfig::Smtp(smtp_from_lookup(&lookup)?),
            Some(other) => {
                return Err(ConfigError::InvalidValue {
                    key: "RELAY_TRANSPORT".into(),
                    message: format!("expected `smtp` or `outbox`, got `{other}`"),
                });
            }
        };

        Ok(Self {
            domain,
            noreply_local_part,
            lists,
            parameter_namespace,
            parameter_root,
            key_prefix,
            bind_addr,
            object_store,
            transport,
        })
    }

    /// The fixed no-reply sender address at the forwarding domain.
    pub fn noreply_address(&self) -> String {
        format!("{}@{}", self.noreply_local_part, self.domain)
    }
}

fn smtp_from_lookup<F>(lookup: &F) -> Result<SmtpConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let host = lookup("SMTP_HOST").ok_or_else(|| ConfigError::MissingEnvVar("SMTP_HOST".into()))?;

    let port: u16 = match lookup("SMTP_PORT") {
        Some(raw) => raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "SMTP_PORT".into(),
            message: format!("`{raw}` is not a port number"),
        })?,
        None => 587,
    };

    let tls = lookup("SMTP_TLS")
        .map(|s| !matches!(s.to_ascii_lowercase().as_str(), "false" | "0" | "no"))
        .unwrap_or(true);

    Ok(SmtpConfig {
        host,
        port,
        username: lookup("SMTP_USERNAME").unwrap_or_default(),
        password: SecretString::from(lookup("SMTP_PASSWORD").unwrap_or_default()),
        tls,
    })
}

fn parse_lists(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
