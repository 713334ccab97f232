use crate::error::WcrError;
use crate::extraction::pdftotext::{PopplerDocument, PopplerTools};
use crate::extraction::raster::{is_image_path, ImageDocument};
use crate::extraction::Document;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Resolves document references to opened documents.
pub trait DocumentSource: Send + Sync {
    fn open(&self, reference: &str) -> Result<Box<dyn Document>, WcrError>;
}

/// Documents stored as files in an upload directory, referenced by file name.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
    tools: PopplerTools,
    render_dpi: u32,
}

impl UploadDir {
    pub fn new(root: impl Into<PathBuf>, tools: PopplerTools, render_dpi: u32) -> Self {
        Self {
            root: root.into(),
            tools,
            render_dpi,
        }
    }

    /// Path for a reference, using only its final component so references
    /// cannot escape the upload directory.
    pub fn resolve(&self, reference: &str) -> Result<PathBuf, WcrError> {
        let file_name = Path::new(reference.trim())
            .file_name()
            .ok_or_else(|| WcrError::DocumentUnavailable {
                reference: reference.to_string(),
                reason: "reference has no file name".into(),
            })?;
        let path = self.root.join(file_name);
        if !path.is_file() {
            return Err(WcrError::DocumentUnavailable {
                reference: reference.to_string(),
                reason: format!("{} does not exist", path.display()),
            });
        }
        Ok(path)
    }
}

impl DocumentSource for UploadDir {
    fn open(&self, reference: &str) -> Result<Box<dyn Document>, WcrError> {
        let path = self.resolve(reference)?;
        debug!(path = %path.display(), "resolved document");
        if is_image_path(&path) {
            Ok(Box::new(ImageDocument::open(&path)?))
        } else {
            Ok(Box::new(PopplerDocument::open(
                &path,
                self.tools.clone(),
                self.render_dpi,
            )?))
        }
    }
}
