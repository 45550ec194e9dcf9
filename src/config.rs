//! Project configuration file.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::ports::FileSystem;

/// Region used when neither the config file nor the environment sets one.
pub const DEFAULT_REGION: &str = "us-east-1";

fn default_cluster() -> String {
    "default".to_string()
}

fn default_timeout() -> u64 {
    300
}

/// Settings read from the YAML config file.
///
/// ```yaml
/// region: ap-northeast-1
/// cluster: default
/// service: web
/// task_definition: ecs-task-def.json
/// service_definition: ecs-service-def.json
/// timeout: 300
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    /// Region; falls back to `AWS_REGION`, then [`DEFAULT_REGION`].
    #[serde(default)]
    pub region: Option<String>,
    /// Cluster name.
    #[serde(default = "default_cluster")]
    pub cluster: String,
    /// Service name; when unset the service definition's own name is used.
    #[serde(default)]
    pub service: Option<String>,
    /// Local task definition file.
    pub task_definition: PathBuf,
    /// Local service definition file.
    #[serde(default)]
    pub service_definition: Option<PathBuf>,
    /// Deadline for a whole command, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Config {
    /// Parses a config document. Relative paths resolve against `base`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when the document does not parse or names
    /// no task definition.
    pub fn from_yaml(text: &str, base: &Path) -> Result<Self> {
        let mut config: Self = serde_yaml::from_str(text)
            .map_err(|e| Error::Config(format!("invalid config: {e}")))?;
        if config.task_definition.as_os_str().is_empty() {
            return Err(Error::Config("task_definition is required".into()));
        }
        config.task_definition = base.join(&config.task_definition);
        config.service_definition = config.service_definition.map(|p| base.join(p));
        Ok(config)
    }

    /// Reads the config file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or does not parse.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        let text = fs
            .read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read config {}", path.display()), &e))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        let mut config = Self::from_yaml(&text, base)?;
        if config.region.is_none() {
            config.region = std::env::var("AWS_REGION").ok().filter(|r| !r.is_empty());
        }
        tracing::debug!(path = %path.display(), cluster = %config.cluster, "loaded config");
        Ok(config)
    }

    /// The effective region.
    #[must_use]
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or(DEFAULT_REGION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::live::LocalFileSystem;

    #[test]
    fn applies_defaults_and_resolves_paths() {
        let config =
            Config::from_yaml("task_definition: td.json\n", Path::new("/srv/app")).unwrap();
        assert_eq!(config.cluster, "default");
        assert_eq!(config.timeout, 300);
        assert_eq!(config.task_definition, PathBuf::from("/srv/app/td.json"));
        assert_eq!(config.service_definition, None);
    }

    #[test]
    fn keeps_absolute_paths() {
        let config = Config::from_yaml(
            "region: eu-west-1\nservice: web\ntask_definition: /abs/td.json\nservice_definition: sv.yaml\n",
            Path::new("conf"),
        )
        .unwrap();
        assert_eq!(config.region(), "eu-west-1");
        assert_eq!(config.task_definition, PathBuf::from("/abs/td.json"));
        assert_eq!(config.service_definition, Some(PathBuf::from("conf/sv.yaml")));
    }

    #[test]
    fn requires_task_definition() {
        assert!(matches!(Config::from_yaml("cluster: x\n", Path::new("")), Err(Error::Config(_))));
        assert!(matches!(
            Config::from_yaml("task_definition: ''\n", Path::new("")),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn loads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ecs-reconcile.yml");
        std::fs::write(&path, "region: ap-northeast-1\ntask_definition: td.json\n").unwrap();
        let config = Config::load(&LocalFileSystem, &path).unwrap();
        assert_eq!(config.region(), "ap-northeast-1");
        assert_eq!(config.task_definition, dir.path().join("td.json"));
    }
}
