//! Kind name to log source factory mapping.
//!
//! The registry is the only place that knows which providers make up which
//! kind and where each kind keeps its logs under the common log root. Adding a
//! kind means registering one more factory.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::collectors::provider::FileSourceProvider;
use crate::collectors::source::{LogSource, SourceConfig};
use crate::collectors::sources::{cpp_log, json_task, server_log, user_op};
use crate::error::{CollectError, CollectResult};

/// The built-in log kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    XyzHmi,
    XyzMaxHmiServer,
    XyzStudioMax,
    XyzBinPacking,
    VisionLogViewer,
    RobotDriverNode,
}

impl SourceKind {
    pub const ALL: [SourceKind; 6] = [
        SourceKind::XyzHmi,
        SourceKind::XyzMaxHmiServer,
        SourceKind::XyzStudioMax,
        SourceKind::XyzBinPacking,
        SourceKind::VisionLogViewer,
        SourceKind::RobotDriverNode,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::XyzHmi => "xyz-hmi",
            SourceKind::XyzMaxHmiServer => "xyz-max-hmi-server",
            SourceKind::XyzStudioMax => "xyz-studio-max",
            SourceKind::XyzBinPacking => "xyz-bin-packing",
            SourceKind::VisionLogViewer => "vision-log-viewer",
            SourceKind::RobotDriverNode => "robot-driver-node",
        }
    }

    /// Location of this kind's logs below the log root; also its output subdirectory.
    pub fn subdir(&self) -> &'static str {
        match self {
            SourceKind::XyzHmi => "xyz_hmi",
            SourceKind::XyzMaxHmiServer => "xyz_max_hmi/server",
            SourceKind::XyzStudioMax => "xyz_studio_max",
            SourceKind::XyzBinPacking => "xyz_bin_packing",
            SourceKind::VisionLogViewer => "vision_log_viewer",
            SourceKind::RobotDriverNode => "xyz_robot_driver_node",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            SourceKind::XyzHmi => "HMI program logs and operator actions",
            SourceKind::XyzMaxHmiServer => "HMI server logs, current and zip-archived",
            SourceKind::XyzStudioMax => "Studio Max program logs",
            SourceKind::XyzBinPacking => "bin-packing program logs and JSON task dumps",
            SourceKind::VisionLogViewer => "vision log viewer program logs",
            SourceKind::RobotDriverNode => "robot driver node program logs",
        }
    }

    /// Providers making up this kind.
    pub fn providers(&self) -> Result<Vec<Box<dyn FileSourceProvider>>> {
        let providers: Vec<Box<dyn FileSourceProvider>> = match self {
            SourceKind::XyzHmi => vec![
                Box::new(user_op::provider()?),
                Box::new(cpp_log::provider()?),
            ],
            SourceKind::XyzMaxHmiServer => vec![
                Box::new(server_log::current_provider()?),
                Box::new(server_log::archive_provider()?),
            ],
            SourceKind::XyzBinPacking => vec![
                Box::new(json_task::provider()?),
                Box::new(cpp_log::provider()?),
            ],
            SourceKind::XyzStudioMax
            | SourceKind::VisionLogViewer
            | SourceKind::RobotDriverNode => vec![Box::new(cpp_log::provider()?)],
        };
        Ok(providers)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SourceKind {
    type Err = CollectError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SourceKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| CollectError::UnsupportedSource(s.to_string()))
    }
}

/// Builds the providers of one kind.
pub type ProviderFactory = Arc<dyn Fn() -> Result<Vec<Box<dyn FileSourceProvider>>> + Send + Sync>;

#[derive(Clone)]
struct Registration {
    subdir: String,
    factory: ProviderFactory,
}

/// Registered log kinds by name.
#[derive(Clone, Default)]
pub struct SourceRegistry {
    entries: BTreeMap<String, Registration>,
}

impl SourceRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every [`SourceKind`].
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        for kind in SourceKind::ALL {
            registry.register(kind.as_str(), kind.subdir(), Arc::new(move || kind.providers()));
        }
        registry
    }

    /// Register (or replace) a kind.
    ///
    /// `subdir` locates the kind's logs under the log root and its output
    /// under the output root.
    pub fn register(&mut self, name: &str, subdir: &str, factory: ProviderFactory) {
        self.entries.insert(
            name.to_string(),
            Registration {
                subdir: subdir.to_string(),
                factory,
            },
        );
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Build the source `name` rooted at `log_root/<subdir>`.
    ///
    /// `output_root` is the relative directory of a run's workspace under which
    /// the source's own `<subdir>` is placed; pass an empty path for the top.
    pub fn create(&self, name: &str, log_root: &Path, output_root: &Path) -> CollectResult<LogSource> {
        let registration = self
            .entries
            .get(name)
            .ok_or_else(|| CollectError::UnsupportedSource(name.to_string()))?;

        let providers = (registration.factory)()
            .map_err(|e| CollectError::Workspace(e.context(format!("Failed to build providers for {}", name))))?;

        let config = SourceConfig {
            name: name.to_string(),
            log_dir: log_root.join(&registration.subdir),
            output_subdir: output_root.join(&registration.subdir),
        };

        Ok(LogSource::new(config, providers))
    }
}

impl fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceRegistry")
            .field("names", &self.names())
            .finish()
    }
}
