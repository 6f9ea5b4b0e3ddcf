use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerCfg {
    #[serde(default = "default_bind")]
    pub bind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageCfg {
    #[serde(default = "default_resource_dir")]
    pub resource_dir: PathBuf,
    /// Prefix for the URLs the gallery hands out. The server itself serves
    /// `resource_dir` under `/files`, so the default resolves locally.
    #[serde(default = "default_files_base_url")]
    pub files_base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisCfg {
    /// Perceptual hash edge size; 8 gives the usual 8x8 average hash.
    #[serde(default = "default_hash_size")]
    pub hash_size: u32,
    /// Max Hamming distance for two photos to land in the same group.
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerCfg,
    #[serde(default)]
    pub storage: StorageCfg,
    #[serde(default)]
    pub analysis: AnalysisCfg,
}

fn default_bind() -> String {
    "127.0.0.1:8080".into()
}
fn default_resource_dir() -> PathBuf {
    PathBuf::from("resources")
}
fn default_files_base_url() -> String {
    "/files".into()
}
fn default_hash_size() -> u32 {
    8
}
fn default_similarity_threshold() -> u32 {
    10
}

impl Default for ServerCfg {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

impl Default for StorageCfg {
    fn default() -> Self {
        Self {
            resource_dir: default_resource_dir(),
            files_base_url: default_files_base_url(),
        }
    }
}

impl Default for AnalysisCfg {
    fn default() -> Self {
        Self {
            hash_size: default_hash_size(),
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerCfg::default(),
            storage: StorageCfg::default(),
            analysis: AnalysisCfg::default(),
        }
    }
}

impl AppConfig {
    /// Load from a YAML file, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => {
                let txt = std::fs::read_to_string(p)
                    .context(format!("failed to read config file: {}", p.display()))?;
                let cfg: AppConfig =
                    serde_yaml::from_str(&txt).context("failed to parse config YAML")?;
                Ok(cfg)
            }
            None => Ok(AppConfig::default()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_no_file() {
        let cfg = AppConfig::load(None).unwrap();
        assert_eq!(cfg.server.bind, "127.0.0.1:8080");
        assert_eq!(cfg.storage.files_base_url, "/files");
        assert_eq!(cfg.analysis.hash_size, 8);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let cfg: AppConfig =
            serde_yaml::from_str("storage:\n  files_base_url: https://cdn.example.com\n").unwrap();
        assert_eq!(cfg.storage.files_base_url, "https://cdn.example.com");
        assert_eq!(cfg.storage.resource_dir, PathBuf::from("resources"));
        assert_eq!(cfg.analysis.similarity_threshold, 10);
    }
}
