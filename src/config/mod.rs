// src/config/mod.rs
//! Application config loaded from TOML, with env fallbacks.
//!
//! Lookup order for the file:
//! 1) $AUTHLAYER_CONFIG_PATH
//! 2) config/authlayer.toml
//! 3) built-in defaults (every section is optional)
//!
//! Secret fields set to `"ENV"` are resolved from the environment:
//! `EBAY_APP_ID`, `EBAY_CERT_ID`, `OPENAI_API_KEY`.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::knowledge::DEFAULT_TOP_K;
use crate::listing::EbayConfig;
use crate::vision::VisionConfig;

pub const ENV_CONFIG_PATH: &str = "AUTHLAYER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/authlayer.toml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ebay: EbayConfig,
    #[serde(default)]
    pub vision: VisionConfig,
    #[serde(default)]
    pub knowledge: KnowledgeConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_kb_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

fn default_kb_dir() -> PathBuf {
    PathBuf::from("knowledge_base")
}
fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            dir: default_kb_dir(),
            top_k: default_top_k(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Expose `/metrics` (Prometheus).
    #[serde(default)]
    pub metrics: bool,
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: AppConfig = toml::from_str(s).context("parsing authlayer config")?;
        Ok(cfg)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        Self::from_toml_str(&data)
    }

    /// Env path → default path → defaults. Secrets are resolved afterwards.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            Self::load_from_file(&pb)?
        } else {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if default.exists() {
                Self::load_from_file(&default)?
            } else {
                Self::default()
            }
        };
        cfg.resolve_secrets();
        Ok(cfg)
    }

    /// Replace `"ENV"` markers with environment values. Missing variables leave
    /// the field empty; providers report that as a data-level failure.
    pub fn resolve_secrets(&mut self) {
        resolve_env(&mut self.ebay.app_id, "EBAY_APP_ID");
        resolve_env(&mut self.ebay.cert_id, "EBAY_CERT_ID");
        resolve_env(&mut self.vision.api_key, "OPENAI_API_KEY");
        self.knowledge.top_k = self.knowledge.top_k.max(1);
    }
}

fn resolve_env(field: &mut String, var: &str) {
    if field.trim().eq_ignore_ascii_case("env") {
        *field = env::var(var).unwrap_or_default();
    }
}
