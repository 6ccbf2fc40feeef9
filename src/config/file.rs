use crate::utils::error::{BoardError, Result};
use crate::utils::validation::{validate_path, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional TOML configuration for the board CLI. Everything here can also
/// be given as command-line flags; the file exists so a long-lived board
/// install carries its settings with its data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardConfig {
    pub board: BoardSection,
    pub export: Option<ExportSection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoardSection {
    pub name: String,
    pub data_path: Option<String>,
    pub data_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSection {
    pub filename: Option<String>,
    pub include_state: Option<bool>,
}

impl BoardConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(BoardError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed = Self::substitute_env_vars(content);
        let config: BoardConfig = toml::from_str(&processed)?;
        Ok(config)
    }

    /// Replace `${VAR}` references with environment values; unknown
    /// variables are left as-is so validation reports them in context.
    fn substitute_env_vars(content: &str) -> String {
        use regex::Regex;
        static RE: std::sync::OnceLock<Regex> = std::sync::OnceLock::new();
        let re = RE.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").unwrap());

        re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        })
        .to_string()
    }

    pub fn data_path(&self) -> Option<&str> {
        self.board.data_path.as_deref()
    }

    pub fn data_file(&self) -> Option<&str> {
        self.board.data_file.as_deref()
    }

    pub fn export_filename(&self) -> &str {
        self.export
            .as_ref()
            .and_then(|e| e.filename.as_deref())
            .unwrap_or("board_export.zip")
    }

    pub fn export_includes_state(&self) -> bool {
        self.export
            .as_ref()
            .and_then(|e| e.include_state)
            .unwrap_or(false)
    }
}

impl Validate for BoardConfig {
    fn validate(&self) -> Result<()> {
        if self.board.name.trim().is_empty() {
            return Err(BoardError::ConfigError {
                message: "board.name cannot be empty".to_string(),
            });
        }
        if let Some(path) = &self.board.data_path {
            validate_path("board.data_path", path)?;
        }
        if let Some(file) = &self.board.data_file {
            validate_path("board.data_file", file)?;
        }
        if let Some(export) = &self.export {
            if let Some(filename) = &export.filename {
                validate_path("export.filename", filename)?;
                if !filename.ends_with(".zip") {
                    return Err(BoardError::ConfigError {
                        message: "export.filename must end in .zip".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_basic_config() {
        let toml_content = r#"
[board]
name = "demon-board"
data_path = "./data"
data_file = "board.json"

[export]
filename = "public.zip"
include_state = true
"#;

        let config = BoardConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.board.name, "demon-board");
        assert_eq!(config.data_path(), Some("./data"));
        assert_eq!(config.export_filename(), "public.zip");
        assert!(config.export_includes_state());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_defaults_when_export_missing() {
        let config = BoardConfig::from_toml_str("[board]\nname = \"b\"\n").unwrap();
        assert_eq!(config.export_filename(), "board_export.zip");
        assert!(!config.export_includes_state());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("TEST_BOARD_DATA", "/srv/board");

        let config = BoardConfig::from_toml_str(
            "[board]\nname = \"b\"\ndata_path = \"${TEST_BOARD_DATA}\"\n",
        )
        .unwrap();
        assert_eq!(config.data_path(), Some("/srv/board"));

        std::env::remove_var("TEST_BOARD_DATA");
    }

    #[test]
    fn test_validation_rejects_bad_export_name() {
        let config = BoardConfig::from_toml_str(
            "[board]\nname = \"b\"\n\n[export]\nfilename = \"notzip.tar\"\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[board]\nname = \"file-board\"\n")
            .unwrap();

        let config = BoardConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.board.name, "file-board");
    }
}
