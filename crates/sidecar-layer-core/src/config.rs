use crate::error::SidecarError;
use crate::resolver::{ExecutableResolver, PackagingMode};
use anyhow::Context;
use derive_builder::Builder;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for how long shutdown waits on a termination outcome
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShutdownConfig {
    /// Interval between checks of the completion flag (in milliseconds)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Upper bound on the wait (in milliseconds). `None` waits until the
    /// termination strategy reports completion, however long that takes.
    #[serde(default = "default_max_wait_ms")]
    pub max_wait_ms: Option<u64>,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_wait_ms: default_max_wait_ms(),
        }
    }
}

impl ShutdownConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Poll until the strategy reports completion, with no upper bound
    pub fn unbounded() -> Self {
        Self {
            max_wait_ms: None,
            ..Self::default()
        }
    }

    /// Validate the configuration and return errors if invalid
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.poll_interval_ms == 0 {
            return Err(anyhow::anyhow!("poll_interval_ms must be greater than zero"));
        }

        if self.poll_interval_ms > 1_000 {
            return Err(anyhow::anyhow!(
                "poll_interval_ms should not exceed 1 second to keep shutdown responsive"
            ));
        }

        if let Some(max_wait_ms) = self.max_wait_ms {
            if max_wait_ms < self.poll_interval_ms {
                return Err(anyhow::anyhow!(
                    "max_wait_ms cannot be smaller than poll_interval_ms"
                ));
            }
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait_ms.map(Duration::from_millis)
    }
}

/// Main sidecar configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Builder)]
#[builder(setter(into))]
#[serde(rename_all = "camelCase")]
pub struct SidecarConfig {
    /// Base name of the sidecar, without extension
    #[builder(default = "default_module_name()")]
    #[serde(default = "default_module_name")]
    pub module_name: String,

    /// Extension of the interpreted script used in development trees
    #[builder(default = "default_script_extension()")]
    #[serde(default = "default_script_extension")]
    pub script_extension: String,

    /// Interpreter binary used to run the script in development trees
    #[builder(default = "default_interpreter()")]
    #[serde(default = "default_interpreter")]
    pub interpreter: String,

    /// TCP port passed to the sidecar as its only argument
    #[builder(default = "default_port()")]
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory where packaged builds place the platform executables
    pub resources_dir: PathBuf,

    /// Directory holding the interpreted script in development trees
    pub dev_script_dir: PathBuf,

    /// Mode the shell believes it runs in. Filesystem probing has the final say.
    #[builder(default)]
    #[serde(default)]
    pub requested_mode: PackagingMode,

    #[builder(default)]
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl SidecarConfig {
    pub fn builder() -> SidecarConfigBuilder {
        SidecarConfigBuilder::default()
    }

    pub fn from_json_str(json: &str) -> Result<Self, SidecarError> {
        let config: SidecarConfig = serde_json::from_str(json)
            .map_err(|e| SidecarError::configuration(format!("Invalid sidecar config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SidecarError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read sidecar config {}", path.display()))
            .map_err(|e| SidecarError::configuration(format!("{e:#}")))?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), SidecarError> {
        if self.module_name.is_empty() {
            return Err(SidecarError::configuration("module_name cannot be empty"));
        }

        if self.module_name.contains(['/', '\\']) {
            return Err(SidecarError::configuration(format!(
                "module_name must be a bare file name, got {}",
                self.module_name
            )));
        }

        if self.interpreter.is_empty() {
            return Err(SidecarError::configuration("interpreter cannot be empty"));
        }

        if self.port == 0 {
            return Err(SidecarError::configuration("port must be a fixed, non-zero port"));
        }

        self.shutdown
            .validate()
            .map_err(|e| SidecarError::configuration(format!("Invalid shutdown config: {e}")))
    }

    pub fn resolver(&self) -> ExecutableResolver {
        ExecutableResolver::new(
            self.module_name.clone(),
            self.script_extension.clone(),
            self.resources_dir.clone(),
            self.dev_script_dir.clone(),
        )
    }
}

// Default value functions for serde and the builder
fn default_poll_interval_ms() -> u64 {
    30
}
fn default_max_wait_ms() -> Option<u64> {
    Some(10_000)
}
fn default_module_name() -> String {
    "api".to_string()
}
fn default_script_extension() -> String {
    "py".to_string()
}
fn default_interpreter() -> String {
    "python".to_string()
}
fn default_port() -> u16 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> SidecarConfig {
        SidecarConfig::builder()
            .resources_dir("/opt/app/resources")
            .dev_script_dir("/src/app/pyflask")
            .build()
            .expect("Failed to create test SidecarConfig")
    }

    #[test]
    fn test_builder_defaults() {
        let config = test_config();
        assert_eq!(config.module_name, "api");
        assert_eq!(config.script_extension, "py");
        assert_eq!(config.interpreter, "python");
        assert_eq!(config.port, 5000);
        assert_eq!(config.requested_mode, PackagingMode::Development);
        assert_eq!(config.shutdown, ShutdownConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_requires_directories() {
        let result = SidecarConfig::builder().module_name("api").build();
        assert!(result.is_err());
    }

    #[test]
    fn test_default_shutdown_config() {
        let config = ShutdownConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poll_interval(), Duration::from_millis(30));
        assert_eq!(config.max_wait(), Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_unbounded_shutdown_config() {
        let config = ShutdownConfig::unbounded();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_wait(), None);
    }

    #[test]
    fn test_invalid_shutdown_config() {
        let mut config = ShutdownConfig {
            poll_interval_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.poll_interval_ms = 5_000;
        assert!(config.validate().is_err());

        config.poll_interval_ms = 100;
        config.max_wait_ms = Some(50);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_sidecar_config() {
        let mut config = test_config();
        config.module_name = String::new();
        assert!(matches!(
            config.validate(),
            Err(SidecarError::Configuration(_))
        ));

        let mut config = test_config();
        config.module_name = "bin/api".to_string();
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.port = 0;
        assert!(config.validate().is_err());

        let mut config = test_config();
        config.shutdown.poll_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_applies_defaults() {
        let config = SidecarConfig::from_json_str(
            r#"{"resourcesDir": "/opt/app/resources", "devScriptDir": "/src/pyflask"}"#,
        )
        .unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.module_name, "api");
        assert_eq!(config.shutdown.max_wait_ms, Some(10_000));
    }

    #[test]
    fn test_from_json_null_max_wait_is_unbounded() {
        let config = SidecarConfig::from_json_str(
            r#"{
                "resourcesDir": "/opt/app/resources",
                "devScriptDir": "/src/pyflask",
                "port": 7632,
                "requestedMode": "packaged",
                "shutdown": {"pollIntervalMs": 50, "maxWaitMs": null}
            }"#,
        )
        .unwrap();
        assert_eq!(config.port, 7632);
        assert_eq!(config.requested_mode, PackagingMode::Packaged);
        assert_eq!(config.shutdown.poll_interval_ms, 50);
        assert_eq!(config.shutdown.max_wait(), None);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        let result = SidecarConfig::from_json_str(r#"{"resourcesDir": "/opt"}"#);
        assert!(matches!(result, Err(SidecarError::Configuration(_))));

        let result = SidecarConfig::from_json_str(
            r#"{"resourcesDir": "/opt", "devScriptDir": "/src", "port": 0}"#,
        );
        assert!(matches!(result, Err(SidecarError::Configuration(_))));
    }

    #[test]
    fn test_from_json_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sidecar.json");
        std::fs::write(
            &path,
            r#"{"resourcesDir": "res", "devScriptDir": "src/pyflask", "interpreter": "python3"}"#,
        )
        .unwrap();

        let config = SidecarConfig::from_json_file(&path).unwrap();
        assert_eq!(config.interpreter, "python3");

        let missing = SidecarConfig::from_json_file(dir.path().join("missing.json"));
        assert!(matches!(missing, Err(SidecarError::Configuration(_))));
    }
}
