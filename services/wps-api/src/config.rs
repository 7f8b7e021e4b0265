//! Service configuration loading and validation.
//!
//! Configuration comes from an optional YAML file, with individual values
//! overridable from the command line or environment. It is validated once
//! at startup and then passed explicitly to the components that need it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::download::DownloadConfig;
use crate::outputs::OutputNaming;

/// Top-level service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen address.
    pub listen: String,

    /// Public URL of the WPS endpoint, used in response documents.
    pub service_url: String,

    /// Host (and port) of the geoserver providing features.
    pub geoserver_host: String,

    /// Root directory for process outputs.
    pub output_path: PathBuf,

    /// Public URL the output root is reachable at.
    pub output_url: String,

    /// Directory for downloaded copies of remote datasets.
    pub scratch_dir: PathBuf,

    /// Output naming policy.
    pub output_naming: OutputNaming,

    pub download: DownloadSettings,
    pub probe: ProbeSettings,
    pub compute: ComputeSettings,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: "0.0.0.0:8094".to_string(),
            service_url: "http://localhost:8094/wps".to_string(),
            geoserver_host: String::new(),
            output_path: PathBuf::from("/data/wpsoutputs"),
            output_url: "http://localhost:8094/outputs".to_string(),
            scratch_dir: std::env::temp_dir(),
            output_naming: OutputNaming::default(),
            download: DownloadSettings::default(),
            probe: ProbeSettings::default(),
            compute: ComputeSettings::default(),
        }
    }
}

/// Timeouts for the download fallback.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            request_timeout_secs: 600,
            connect_timeout_secs: 30,
        }
    }
}

impl DownloadSettings {
    pub fn to_download_config(&self) -> DownloadConfig {
        DownloadConfig {
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
        }
    }
}

/// Dataset probe settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    /// `ncdump` executable.
    pub command: String,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            command: "ncdump".to_string(),
        }
    }
}

/// Computation backend settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeSettings {
    /// Command line of the backend program, operation arguments excluded.
    pub command: Vec<String>,
}

impl Default for ComputeSettings {
    fn default() -> Self {
        Self {
            command: vec!["ncgeo".to_string()],
        }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {:?}", path))?;
        serde_yaml::from_str(&content).with_context(|| format!("Failed to parse config: {:?}", path))
    }

    /// Load from `path` if given, otherwise start from defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from_file(path),
            None => {
                tracing::warn!("No config file given, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// WFS GetFeature base URL derived from the geoserver host.
    pub fn wfs_base_url(&self) -> String {
        crate::geometry::wfs_base_url(&self.geoserver_host)
    }

    /// Check the configuration for values that cannot work.
    pub fn validate(&self) -> Result<()> {
        if self.geoserver_host.trim().is_empty() {
            bail!("geoserver_host must be set (config file or GEOSERVER_HOST)");
        }
        if self.geoserver_host.contains("://") {
            bail!(
                "geoserver_host must be a host[:port], not a URL: {}",
                self.geoserver_host
            );
        }
        for (name, url) in [("service_url", &self.service_url), ("output_url", &self.output_url)] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                bail!("{} must be an absolute http(s) URL: {}", name, url);
            }
        }
        if self.download.request_timeout_secs == 0 || self.download.connect_timeout_secs == 0 {
            bail!("download timeouts must be greater than zero");
        }
        if self.probe.command.trim().is_empty() {
            bail!("probe.command must not be empty");
        }
        if self.compute.command.is_empty() {
            bail!("compute.command must not be empty");
        }
        Ok(())
    }

    /// Create the output, status and scratch directories if missing.
    pub fn prepare_directories(&self) -> Result<()> {
        for dir in [
            self.output_path.clone(),
            self.output_path.join("status"),
            self.scratch_dir.clone(),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create directory: {:?}", dir))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> ServerConfig {
        ServerConfig {
            geoserver_host: "geoserver:8080".to_string(),
            ..ServerConfig::default()
        }
    }

    #[test]
    fn test_defaults_need_geoserver_host() {
        let err = ServerConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("geoserver_host"));
        assert!(valid().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = valid();
        config.geoserver_host = "http://geoserver".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.output_url = "/outputs".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.download.request_timeout_secs = 0;
        assert!(config.validate().is_err());

        let mut config = valid();
        config.compute.command.clear();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let yaml = r#"
geoserver_host: geoserver:8080
output_path: /srv/outputs
output_naming: request_scoped
download:
  request_timeout_secs: 60
compute:
  command: ["python", "-m", "ncgeo"]
"#;
        let config: ServerConfig = serde_yaml::from_str(yaml).unwrap();

        assert_eq!(config.output_path, PathBuf::from("/srv/outputs"));
        assert_eq!(config.output_naming, OutputNaming::RequestScoped);
        assert_eq!(config.download.request_timeout_secs, 60);
        assert_eq!(config.download.connect_timeout_secs, 30);
        assert_eq!(config.probe.command, "ncdump");
        assert_eq!(config.compute.command, vec!["python", "-m", "ncgeo"]);
        assert_eq!(config.listen, "0.0.0.0:8094");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_wfs_base_url() {
        assert_eq!(
            valid().wfs_base_url(),
            "http://geoserver:8080/geoserver/ows?service=WFS&version=1.0.0&request=GetFeature&typeName="
        );
    }

    #[test]
    fn test_load_from_file_and_prepare() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("outputs");
        let path = dir.path().join("wps.yaml");
        std::fs::write(
            &path,
            format!(
                "geoserver_host: localhost:8087\noutput_path: {}\nscratch_dir: {}\n",
                output.display(),
                dir.path().join("scratch").display()
            ),
        )
        .unwrap();

        let config = ServerConfig::load(Some(&path)).unwrap();
        config.prepare_directories().unwrap();

        assert!(output.join("status").is_dir());
        assert!(dir.path().join("scratch").is_dir());
    }

    #[test]
    fn test_missing_file() {
        assert!(ServerConfig::load(Some(Path::new("/nonexistent/wps.yaml"))).is_err());
    }
}
