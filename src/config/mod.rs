#[cfg(feature = "cli")]
pub mod cli;

use crate::core::ConfigProvider;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const DEFAULT_CONFIG_FILE: &str = "appsettings.json";

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("valid env var pattern"));

/// Run settings, read from `appsettings.json` or a TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AppConfig {
    /// Directory containing the workbook.
    pub excel_path: String,
    /// Workbook file name inside `excel_path`.
    pub excel_name: String,
    pub sheet_name: String,
    /// Directory the XML files are written to.
    pub xml_output_path: String,
}

impl AppConfig {
    /// 從 JSON 或 TOML 檔案載入配置 (依副檔名判斷)
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(EtlError::ConfigError {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.eq_ignore_ascii_case("toml"))
            .unwrap_or(false);

        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content);
        serde_json::from_str(&processed).map_err(|e| EtlError::ConfigValidationError {
            field: "json_parsing".to_string(),
            message: format!("JSON parsing error: {}", e),
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = substitute_env_vars(content);
        toml::from_str(&processed).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    pub fn excel_full_path(&self) -> PathBuf {
        Path::new(&self.excel_path).join(&self.excel_name)
    }
}

/// 替換環境變數 (例如 ${DATA_DIR})，未設定的保持原樣
fn substitute_env_vars(content: &str) -> String {
    ENV_VAR
        .replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .into_owned()
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("ExcelPath", &self.excel_path),
            ("ExcelName", &self.excel_name),
            ("SheetName", &self.sheet_name),
            ("XmlOutputPath", &self.xml_output_path),
        ] {
            if value.is_empty() {
                return Err(EtlError::MissingConfigError {
                    field: field.to_string(),
                });
            }
        }

        validation::validate_path("ExcelPath", &self.excel_path)?;
        validation::validate_file_name("ExcelName", &self.excel_name)?;
        validation::validate_non_empty_string("SheetName", &self.sheet_name)?;
        validation::validate_path("XmlOutputPath", &self.xml_output_path)?;
        Ok(())
    }
}

impl ConfigProvider for AppConfig {
    fn excel_file(&self) -> PathBuf {
        self.excel_full_path()
    }

    fn sheet_name(&self) -> &str {
        &self.sheet_name
    }

    fn output_path(&self) -> &str {
        &self.xml_output_path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const JSON: &str = r#"{
        "ExcelPath": "./data",
        "ExcelName": "Sales.xlsx",
        "SheetName": "Orders",
        "XmlOutputPath": "./xml"
    }"#;

    #[test]
    fn test_json_config() {
        let config = AppConfig::from_json_str(JSON).unwrap();
        assert_eq!(config.sheet_name, "Orders");
        assert_eq!(config.excel_file(), Path::new("./data").join("Sales.xlsx"));
        assert_eq!(config.output_path(), "./xml");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_file_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(
            &path,
            "ExcelPath = \"in\"\nExcelName = \"a.xlsx\"\nSheetName = \"S\"\nXmlOutputPath = \"out\"\n",
        )
        .unwrap();

        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.excel_name, "a.xlsx");
        assert_eq!(config.xml_output_path, "out");
    }

    #[test]
    fn test_env_substitution() {
        std::env::set_var("SHIPORDER_TEST_SHEET", "FromEnv");
        let config = AppConfig::from_json_str(
            r#"{"ExcelPath": ".", "ExcelName": "a.xlsx", "SheetName": "${SHIPORDER_TEST_SHEET}", "XmlOutputPath": "${SHIPORDER_TEST_UNSET}"}"#,
        )
        .unwrap();
        assert_eq!(config.sheet_name, "FromEnv");
        assert_eq!(config.xml_output_path, "${SHIPORDER_TEST_UNSET}");
    }

    #[test]
    fn test_missing_key_fails_validation() {
        let config = AppConfig::from_json_str(r#"{"ExcelPath": ".", "ExcelName": "a.xlsx"}"#).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, EtlError::MissingConfigError { ref field } if field == "SheetName"));
    }

    #[test]
    fn test_excel_name_must_not_be_a_path() {
        let mut config = AppConfig::from_json_str(JSON).unwrap();
        config.excel_name = "data/Sales.xlsx".to_string();
        assert!(matches!(
            config.validate(),
            Err(EtlError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_missing_file_and_bad_json() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            AppConfig::from_file(dir.path().join("appsettings.json")),
            Err(EtlError::ConfigError { .. })
        ));

        let path = dir.path().join("appsettings.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AppConfig::from_file(&path),
            Err(EtlError::ConfigValidationError { .. })
        ));
    }
}
