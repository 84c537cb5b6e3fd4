use crate::domain::ports::Storage;
use crate::utils::error::{EtlError, Result};
use std::fs;
use std::path::PathBuf;

/// Writes output files under a local directory.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

impl Storage for LocalStorage {
    fn prepare(&self) -> Result<()> {
        if self.base_path.is_dir() {
            return Ok(());
        }

        tracing::debug!("Creating output directory {}", self.base_path.display());
        fs::create_dir_all(&self.base_path).map_err(|source| EtlError::OutputDirError {
            path: self.base_path.clone(),
            source,
        })
    }

    fn write_file(&self, path: &str, data: &[u8]) -> Result<String> {
        let full_path = self.base_path.join(path);

        fs::write(&full_path, data).map_err(|e| EtlError::XmlWriteError {
            path: full_path.clone(),
            message: e.to_string(),
        })?;

        tracing::debug!("Wrote {} ({} bytes)", full_path.display(), data.len());
        Ok(full_path.display().to_string())
    }
}
