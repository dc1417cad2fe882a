use std::path::Path;

use aws_config::BehaviorVersion;
use aws_sdk_s3::config::Region;
use aws_sdk_s3::Client;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

pub const ENV_REGION: &str = "JSONBUCKET_REGION";
pub const ENV_ENDPOINT_URL: &str = "JSONBUCKET_ENDPOINT_URL";
pub const ENV_PROFILE: &str = "JSONBUCKET_PROFILE";
pub const ENV_FORCE_PATH_STYLE: &str = "JSONBUCKET_FORCE_PATH_STYLE";

/// Client settings for the S3 backend.
///
/// Every field is optional; unset fields fall back to the AWS environment
/// (`AWS_REGION`, `AWS_PROFILE`, `~/.aws/config`, ...).
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// Region override, e.g. `us-east-1`.
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible services (MinIO, LocalStack, ...).
    pub endpoint_url: Option<String>,
    /// Named profile from the shared AWS config files.
    pub profile: Option<String>,
    /// Address buckets as `endpoint/bucket` instead of `bucket.endpoint`.
    pub force_path_style: bool,
}

impl S3Config {
    /// Parse a TOML document.
    pub fn from_toml_str(s: &str) -> ConfigResult<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Read a TOML config file.
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Overlay `JSONBUCKET_*` environment variables.
    pub fn with_env(self) -> ConfigResult<Self> {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Overlay values from `lookup`, keyed by the `JSONBUCKET_*` names.
    pub fn with_overrides<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(region) = lookup(ENV_REGION) {
            self.region = Some(region);
        }
        if let Some(endpoint) = lookup(ENV_ENDPOINT_URL) {
            self.endpoint_url = Some(endpoint);
        }
        if let Some(profile) = lookup(ENV_PROFILE) {
            self.profile = Some(profile);
        }
        if let Some(raw) = lookup(ENV_FORCE_PATH_STYLE) {
            self.force_path_style = parse_bool(ENV_FORCE_PATH_STYLE, &raw)?;
        }
        Ok(self)
    }

    /// Resolve the shared SDK configuration and build an S3 client.
    pub async fn client(&self) -> Client {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &self.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(profile) = &self.profile {
            loader = loader.profile_name(profile);
        }
        if let Some(endpoint) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint);
        }
        let shared = loader.load().await;
        let conf = aws_sdk_s3::config::Builder::from(&shared)
            .force_path_style(self.force_path_style)
            .build();
        Client::from_conf(conf)
    }
}

fn parse_bool(name: &str, raw: &str) -> ConfigResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            name: name.to_string(),
            value: raw.to_string(),
        }),
    }
}
