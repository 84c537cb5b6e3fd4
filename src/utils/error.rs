use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("XML processing error: {0}")]
    XmlError(#[from] quick_xml::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Excel file not found: {}", path.display())]
    InputNotFound { path: PathBuf },

    #[error("Unsupported file format: {}. Use .xlsx", path.display())]
    UnsupportedFormat { path: PathBuf },

    #[error("Worksheet '{sheet}' not found.")]
    SheetNotFound { sheet: String },

    #[error("Malformed workbook: {message}")]
    WorkbookError { message: String },

    #[error("Failed to create output directory {}: {source}", path.display())]
    OutputDirError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {message}", path.display())]
    XmlWriteError { path: PathBuf, message: String },

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation failed for '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration '{field}'")]
    MissingConfigError { field: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Output,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::ZipError(_)
            | EtlError::InputNotFound { .. }
            | EtlError::UnsupportedFormat { .. }
            | EtlError::SheetNotFound { .. }
            | EtlError::WorkbookError { .. } => ErrorCategory::Input,
            EtlError::IoError(_)
            | EtlError::OutputDirError { .. }
            | EtlError::XmlWriteError { .. } => ErrorCategory::Output,
            EtlError::XmlError(_) | EtlError::SerializationError(_) => ErrorCategory::Processing,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Configuration => ErrorSeverity::High,
            ErrorCategory::Input => ErrorSeverity::High,
            ErrorCategory::Output => ErrorSeverity::Critical,
            ErrorCategory::Processing => ErrorSeverity::Medium,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::InputNotFound { .. } => {
                "Check ExcelPath and ExcelName in the configuration file"
            }
            EtlError::UnsupportedFormat { .. } => "Save the workbook as .xlsx and try again",
            EtlError::SheetNotFound { .. } => {
                "Check SheetName against the worksheet tabs of the workbook"
            }
            EtlError::ZipError(_) | EtlError::WorkbookError { .. } => {
                "Open and re-save the workbook in Excel; the file may be damaged"
            }
            EtlError::OutputDirError { .. } | EtlError::XmlWriteError { .. } | EtlError::IoError(_) => {
                "Check that XmlOutputPath is writable and the disk is not full"
            }
            EtlError::ConfigError { .. }
            | EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => {
                "Fix appsettings.json (ExcelPath, ExcelName, SheetName, XmlOutputPath)"
            }
            EtlError::XmlError(_) | EtlError::SerializationError(_) => {
                "Re-run with --verbose for details"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::Input => format!("Cannot read the workbook: {}", self),
            ErrorCategory::Output => format!("Cannot write XML output: {}", self),
            ErrorCategory::Processing => format!("Something went wrong: {}", self),
        }
    }
}

pub type Result<T> = std::result::Result<T, EtlError>;

/// 單列處理失敗，只影響該列
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RowError {
    #[error("{column} required")]
    MissingField { column: &'static str },

    #[error("invalid {column} value '{value}'")]
    InvalidNumber { column: &'static str, value: String },

    #[error("invalid date '{value}'")]
    InvalidDate { value: String },

    #[error("unexpected {column} cell: {detail}")]
    UnexpectedCell { column: &'static str, detail: String },
}
