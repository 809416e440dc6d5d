use std::fmt;

use serde::Serialize;

/// Identity of the running binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildInfo {
    pub name: String,
    pub version: String,
    /// Short commit hash, when the build had access to git.
    pub git_hash: Option<String>,
}

impl BuildInfo {
    pub fn current() -> Self {
        BuildInfo {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            git_hash: option_env!("LOGSNAP_GIT_HASH")
                .filter(|hash| !hash.is_empty())
                .map(str::to_string),
        }
    }
}

impl fmt::Display for BuildInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.git_hash {
            Some(hash) => write!(f, "{} {} ({})", self.name, self.version, hash),
            None => write!(f, "{} {}", self.name, self.version),
        }
    }
}
