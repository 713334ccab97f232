//! Configuration file (`wcr.toml`).
//!
//! Every section and field is optional; anything left out takes the default
//! shown on the field. Paths to external tools are resolved here once, never
//! searched for at extraction time.

use crate::error::WcrError;
use crate::extraction::assist::HttpAssistant;
use crate::extraction::ocr::TesseractOcr;
use crate::extraction::pdftotext::PopplerTools;
use crate::extraction::source::UploadDir;
use crate::store::SqliteStore;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "wcr.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub documents: DocumentsConfig,
    pub store: StoreConfig,
    pub ocr: OcrConfig,
    pub poppler: PopplerConfig,
    pub assist: AssistConfig,
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DocumentsConfig {
    /// Directory document references are resolved in. Default `uploads`.
    pub upload_dir: PathBuf,
}

impl Default for DocumentsConfig {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// SQLite database holding canonical records. Default `oilgas.db`.
    pub database: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("oilgas.db"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OcrConfig {
    /// Tesseract executable. Default `tesseract` (looked up on `PATH`).
    pub tesseract: PathBuf,
    pub language: String,
    /// Tesseract page segmentation mode. Default 6 (single uniform block).
    pub psm: u8,
    /// Resolution regions are rasterized at. Default 300.
    pub dpi: u32,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            tesseract: PathBuf::from("tesseract"),
            language: "eng".to_string(),
            psm: 6,
            dpi: 300,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PopplerConfig {
    /// Directory holding pdfinfo, pdftotext and pdftoppm. `PATH` when unset.
    pub bin_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AssistConfig {
    /// Base URL of the assisted extraction service. Assisted extraction and
    /// assisted column mapping are off when unset.
    pub endpoint: Option<String>,
    pub model: String,
    /// Environment variable the bearer token is read from.
    pub api_key_env: String,
    pub timeout_secs: u64,
}

impl Default for AssistConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            model: "default".to_string(),
            api_key_env: "WCR_ASSIST_API_KEY".to_string(),
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScanConfig {
    pub workers: usize,
    pub assisted: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            assisted: false,
        }
    }
}

/// Load `path`, or the defaults when the file does not exist.
pub fn load_config(path: &Path) -> Result<Config, WcrError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = std::fs::read_to_string(path).map_err(|e| WcrError::Config {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_config(&contents).map_err(|reason| WcrError::Config {
        path: path.to_path_buf(),
        reason,
    })
}

fn parse_config(contents: &str) -> Result<Config, String> {
    let config: Config = toml::from_str(contents).map_err(|e| e.to_string())?;
    if config.scan.workers == 0 {
        return Err("scan.workers must be at least 1".to_string());
    }
    Ok(config)
}

impl Config {
    pub fn poppler_tools(&self) -> PopplerTools {
        PopplerTools::new(self.poppler.bin_dir.clone())
    }

    pub fn upload_dir(&self) -> UploadDir {
        UploadDir::new(
            self.documents.upload_dir.clone(),
            self.poppler_tools(),
            self.ocr.dpi,
        )
    }

    pub fn tesseract(&self) -> TesseractOcr {
        TesseractOcr::new(self.ocr.tesseract.clone(), &self.ocr.language, self.ocr.psm)
    }

    /// HTTP assistant, when an endpoint is configured.
    pub fn assistant(&self) -> Result<Option<HttpAssistant>, WcrError> {
        let Some(endpoint) = &self.assist.endpoint else {
            return Ok(None);
        };
        let api_key = std::env::var(&self.assist.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        HttpAssistant::new(
            endpoint,
            &self.assist.model,
            api_key,
            Duration::from_secs(self.assist.timeout_secs),
        )
        .map(Some)
    }

    pub fn open_store(&self) -> Result<SqliteStore, WcrError> {
        SqliteStore::open(&self.store.database)
    }
}
