use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;
use tracing::{debug, warn};

pub const ACCESS_TOKEN_VAR: &str = "PATREON_ACCESS_TOKEN";
pub const CAMPAIGN_ID_VAR: &str = "PATREON_CAMPAIGN_ID";

/// Token and campaign used for one run. Empty fields mean "not configured".
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: String,
    pub campaign_id: String,
}

// The token must never end up in logs.
impl Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &if self.access_token.is_empty() { "" } else { "***" })
            .field("campaign_id", &self.campaign_id)
            .finish()
    }
}

#[derive(thiserror::Error, Debug)]
pub enum CredentialsFileError {
    #[error("{0} does not exist")]
    Missing(String),
    #[error(transparent)]
    Dotenv(dotenvy::Error),
}

/// Key/value pairs read from a dotenv style credentials file.
#[derive(Debug, Clone, Default)]
pub struct CredentialsFile(HashMap<String, String>);

impl CredentialsFile {
    #[tracing::instrument]
    pub fn read(path: impl AsRef<Path> + Debug) -> Result<Self, CredentialsFileError> {
        let path = path.as_ref();
        let iter = dotenvy::from_path_iter(path).map_err(|e| {
            if e.not_found() {
                CredentialsFileError::Missing(path.display().to_string())
            } else {
                CredentialsFileError::Dotenv(e)
            }
        })?;
        let mut values = HashMap::new();
        for item in iter {
            let (key, value) = item.map_err(CredentialsFileError::Dotenv)?;
            values.insert(key, value);
        }
        Ok(Self(values))
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
}

impl Credentials {
    pub fn is_complete(&self) -> bool {
        !self.access_token.is_empty() && !self.campaign_id.is_empty()
    }

    /// Resolves credentials from the process environment, falling back to `path`.
    pub fn resolve(path: impl AsRef<Path>) -> Self {
        Self::resolve_with(|key| std::env::var(key).ok(), path)
    }

    pub fn resolve_with(env: impl Fn(&str) -> Option<String>, path: impl AsRef<Path>) -> Self {
        let mut credentials = Credentials {
            access_token: env(ACCESS_TOKEN_VAR).unwrap_or_default(),
            campaign_id: env(CAMPAIGN_ID_VAR).unwrap_or_default(),
        };
        if credentials.is_complete() {
            return credentials;
        }

        let path = path.as_ref();
        match CredentialsFile::read(path) {
            Ok(file) => {
                debug!("Filling missing credentials from {}", path.display());
                if credentials.access_token.is_empty() {
                    credentials.access_token =
                        file.get(ACCESS_TOKEN_VAR).unwrap_or_default().to_string();
                }
                if credentials.campaign_id.is_empty() {
                    credentials.campaign_id =
                        file.get(CAMPAIGN_ID_VAR).unwrap_or_default().to_string();
                }
            }
            Err(CredentialsFileError::Missing(_)) => {}
            Err(e) => warn!(
                "Could not parse configuration from {}: {e}",
                path.display()
            ),
        }
        credentials
    }
}
