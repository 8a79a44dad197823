use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use url::Url;

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "retention.toml";

/// Prefix for environment overrides, e.g. `RETENTION__POLICY__KEEP=3`.
pub const ENV_PREFIX: &str = "RETENTION__";

/// Retention policy settings, still in their textual form.
///
/// Tier and mode are validated when the policy is constructed, not here.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Tier to promote into and prune. Empty means the snapshot (root) tier.
    ///
    /// Env: RETENTION__POLICY__PERIOD
    #[serde(default)]
    pub period: String,

    /// Comparison mode, `count` or `datetime`.
    ///
    /// Env: RETENTION__POLICY__MODE
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Number of artifacts to keep in the tier.
    ///
    /// Env: RETENTION__POLICY__KEEP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep: Option<usize>,

    /// Explicit age window for datetime mode.
    ///
    /// Env: RETENTION__POLICY__MAX_AGE
    #[serde(
        default,
        with = "humantime_serde",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_age: Option<Duration>,

    /// Log copies and deletes instead of executing them.
    ///
    /// Env: RETENTION__POLICY__DRY_RUN
    #[serde(default)]
    pub dry_run: bool,
}

fn default_mode() -> String {
    "count".to_string()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            period: String::new(),
            mode: default_mode(),
            keep: None,
            max_age: None,
            dry_run: false,
        }
    }
}

/// Storage backend selector and its connection parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// One of `local`, `s3` or `memory`.
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Root directory for the local backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,

    /// Bucket name for the s3 backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// Custom endpoint for S3-compatible stores (MinIO etc).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Region override; falls back to AWS_DEFAULT_REGION / AWS_REGION.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

fn default_backend() -> String {
    "local".to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            dir: None,
            bucket: None,
            endpoint: None,
            region: None,
        }
    }
}

/// A storage selection that has passed validation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Local {
        dir: String,
    },
    S3 {
        bucket: String,
        endpoint: Option<Url>,
        region: Option<String>,
    },
    /// Empty in-memory bucket, for smoke testing the CLI.
    Memory,
}

impl StorageConfig {
    /// Resolve the backend selector into a typed backend description.
    pub fn backend(&self) -> anyhow::Result<StorageBackend> {
        match self.backend.as_str() {
            "local" => {
                let dir = self.dir.as_deref().unwrap_or_default();
                if dir.is_empty() {
                    anyhow::bail!("dir cannot be empty when local backend is selected");
                }
                Ok(StorageBackend::Local {
                    dir: dir.to_string(),
                })
            }
            "s3" => {
                let bucket = self.bucket.as_deref().unwrap_or_default();
                if bucket.is_empty() {
                    anyhow::bail!("bucket cannot be empty when s3 backend is selected");
                }
                let endpoint = self
                    .endpoint
                    .as_deref()
                    .map(|raw| {
                        Url::parse(raw)
                            .map_err(|e| anyhow::anyhow!("Invalid S3 endpoint '{}': {}", raw, e))
                    })
                    .transpose()?;
                Ok(StorageBackend::S3 {
                    bucket: bucket.to_string(),
                    endpoint,
                    region: self.region.clone(),
                })
            }
            "memory" => Ok(StorageBackend::Memory),
            other => anyhow::bail!("backend must be one of local, s3 or memory (got '{other}')"),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    /// Retention policy to enforce
    #[serde(default)]
    pub policy: PolicyConfig,
    /// Storage backend the policy runs against
    #[serde(default)]
    pub storage: StorageConfig,
}

impl Configuration {
    fn figment(file: &Path) -> Figment {
        Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Load from `retention.toml` in the working directory plus environment.
    pub fn load() -> Result<Self, Box<figment::Error>> {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_FILE))
    }

    /// Load from the given TOML file plus environment. A missing file is not an error.
    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        let config = Self::figment(path).extract().map_err(Box::new)?;

        Ok(config)
    }
}
