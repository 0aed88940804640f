// ⚙️ Configuration - environment driven, `.env` aware
//
//   RECON_BIND_ADDR          server listen address     (0.0.0.0:9000)
//   RECON_MIN_SHARED_TOKENS  partial match threshold   (1)
//   RECON_MAX_UPLOAD_MB      per-request body limit    (25)
//   RECON_JUNK_KEYWORDS      extra denylist, comma sep ("")
//   RECON_FILLER_CHAR        redaction mask letter     (X)

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::env;

use crate::classifier::LineClassifier;
use crate::cleanup::NameCleaner;
use crate::reconciliation::Reconciler;
use crate::segmentation::Segmenter;

#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub bind_addr: String,
    pub min_shared_tokens: usize,
    pub max_upload_bytes: usize,
    pub extra_junk_keywords: Vec<String>,
    pub filler: char,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            bind_addr: "0.0.0.0:9000".to_string(),
            min_shared_tokens: 1,
            max_upload_bytes: 25 * 1024 * 1024,
            extra_junk_keywords: Vec::new(),
            filler: crate::cleanup::DEFAULT_FILLER,
        }
    }
}

impl AppConfig {
    /// Load `.env` (if present) and read the process environment
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = AppConfig::default();

        if let Some(addr) = lookup("RECON_BIND_ADDR") {
            config.bind_addr = addr;
        }

        if let Some(raw) = lookup("RECON_MIN_SHARED_TOKENS") {
            config.min_shared_tokens = raw
                .trim()
                .parse()
                .with_context(|| format!("RECON_MIN_SHARED_TOKENS is not a number: {:?}", raw))?;
        }

        if let Some(raw) = lookup("RECON_MAX_UPLOAD_MB") {
            let mb: usize = raw
                .trim()
                .parse()
                .with_context(|| format!("RECON_MAX_UPLOAD_MB is not a number: {:?}", raw))?;
            if mb == 0 {
                bail!("RECON_MAX_UPLOAD_MB must be at least 1");
            }
            config.max_upload_bytes = mb * 1024 * 1024;
        }

        if let Some(raw) = lookup("RECON_JUNK_KEYWORDS") {
            config.extra_junk_keywords = raw
                .split(',')
                .map(|k| k.trim().to_string())
                .filter(|k| !k.is_empty())
                .collect();
        }

        if let Some(raw) = lookup("RECON_FILLER_CHAR") {
            let mut chars = raw.trim().chars();
            match (chars.next(), chars.next()) {
                (Some(c), None) if c.is_alphabetic() => config.filler = c.to_ascii_uppercase(),
                _ => bail!("RECON_FILLER_CHAR must be a single letter, got {:?}", raw),
            }
        }

        Ok(config)
    }

    pub fn segmenter(&self) -> Segmenter {
        Segmenter::new()
            .with_classifier(LineClassifier::new().with_keywords(&self.extra_junk_keywords))
            .with_cleaner(NameCleaner::new().with_filler(self.filler))
    }

    pub fn reconciler(&self) -> Reconciler {
        Reconciler::with_min_shared_tokens(self.min_shared_tokens)
    }
}
