use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProbeConfig {
    /// Where the report is written
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Disk override table, used instead of live partitions when it has content
    #[serde(default = "default_disk_override_path")]
    pub disk_override_path: Option<PathBuf>,
}

fn default_output_path() -> PathBuf {
    PathBuf::from("node_attribute_information.json")
}

fn default_disk_override_path() -> Option<PathBuf> {
    Some(PathBuf::from("host_disk_info.txt"))
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            output_path: default_output_path(),
            disk_override_path: default_disk_override_path(),
        }
    }
}

impl ProbeConfig {
    /// Default config file path for this platform
    pub fn default_path() -> PathBuf {
        if let Some(dirs) = directories::ProjectDirs::from("com", "node-probe", "node-probe") {
            dirs.config_dir().join("config.json")
        } else {
            PathBuf::from("node-probe.json")
        }
    }

    /// Load config from a file path
    pub fn load(path: &Path) -> Result<Self> {
        let data = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config from {}", path.display()))?;
        let config: Self = serde_json::from_str(&data)
            .with_context(|| format!("failed to parse config JSON in {}", path.display()))?;
        Ok(config)
    }

    /// Save config to a file path
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config dir {}", parent.display()))?;
        }
        let data = serde_json::to_string_pretty(self)?;
        std::fs::write(path, data)
            .with_context(|| format!("failed to write config to {}", path.display()))?;
        Ok(())
    }
}
