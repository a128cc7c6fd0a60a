use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Listener and admin listener cannot share {0}")]
    ListenerConflict(String),

    #[error("Catalog page size must be greater than 0")]
    InvalidPageSize,

    #[error("Catalog URL must use http or https: {0}")]
    UnsupportedScheme(String),

    #[error("{0} timeout must be greater than 0")]
    ZeroTimeout(&'static str),
}

/// Network listener configuration
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Listener {
    pub host: String,
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }

    fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Listener {
    fn default() -> Self {
        Listener {
            host: "127.0.0.1".into(),
            port: 8000,
        }
    }
}

fn default_admin_listener() -> Listener {
    Listener {
        host: "127.0.0.1".into(),
        port: 8001,
    }
}

/// External launch catalog
#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Catalog {
    pub url: Url,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default = "default_catalog_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_page_size() -> u64 {
    50
}

fn default_catalog_timeout_secs() -> u64 {
    10
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Planets {
    /// JSON dump of Kepler objects of interest.
    pub path: PathBuf,
}

fn default_store_timeout_ms() -> u64 {
    2000
}

#[derive(Clone, Deserialize, Debug, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub listener: Listener,
    #[serde(default = "default_admin_listener")]
    pub admin_listener: Listener,
    pub catalog: Catalog,
    pub planets: Planets,
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// Resynchronize with the catalog on this interval. No periodic refresh
    /// when absent.
    pub refresh_interval_secs: Option<u64>,
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.listener.address() == self.admin_listener.address() {
            return Err(ValidationError::ListenerConflict(self.listener.address()));
        }

        if self.catalog.page_size == 0 {
            return Err(ValidationError::InvalidPageSize);
        }

        if !matches!(self.catalog.url.scheme(), "http" | "https") {
            return Err(ValidationError::UnsupportedScheme(
                self.catalog.url.to_string(),
            ));
        }

        if self.catalog.timeout_secs == 0 {
            return Err(ValidationError::ZeroTimeout("Catalog"));
        }
        if self.store_timeout_ms == 0 {
            return Err(ValidationError::ZeroTimeout("Store"));
        }

        Ok(())
    }

    pub fn catalog_timeout(&self) -> Duration {
        Duration::from_secs(self.catalog.timeout_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }

    pub fn refresh_interval(&self) -> Option<Duration> {
        self.refresh_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}
