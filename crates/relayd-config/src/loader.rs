//! Configuration file loading and error types.

use std::{fs, path::Path};

use crate::Config;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("yaml: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("toml: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("unsupported config format")]
    UnsupportedFormat,
    #[error("validation: {0}")]
    Validation(String),
}

pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let data = fs::read_to_string(path)?;
    match path.extension().and_then(|s| s.to_str()).unwrap_or("") {
        "json" | "jsonc" => {
            let stripped = json_comments::StripComments::new(data.as_bytes());
            Ok(serde_json::from_reader(stripped)?)
        }
        "yaml" | "yml" => Ok(serde_yaml::from_str(&data)?),
        "toml" => Ok(toml::from_str(&data)?),
        _ => Err(ConfigError::UnsupportedFormat),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_tmp(ext: &str, contents: &str) -> tempfile::TempPath {
        let mut f = tempfile::Builder::new()
            .suffix(&format!(".{ext}"))
            .tempfile()
            .unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f.into_temp_path()
    }

    #[test]
    fn loads_toml() {
        let path = write_tmp("toml", "[relay]\nport = 8443\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.relay.port, 8443);
    }

    #[test]
    fn loads_jsonc_with_comments() {
        let path = write_tmp(
            "jsonc",
            r#"{
  // relay section
  "relay": { "port": 8443 }
}"#,
        );
        let config = load_config(&path).unwrap();
        assert_eq!(config.relay.port, 8443);
    }

    #[test]
    fn loads_yaml() {
        let path = write_tmp("yaml", "relay:\n  port: 8443\n");
        let config = load_config(&path).unwrap();
        assert_eq!(config.relay.port, 8443);
    }

    #[test]
    fn rejects_unknown_extension() {
        let path = write_tmp("ini", "port=1\n");
        assert!(matches!(
            load_config(&path),
            Err(ConfigError::UnsupportedFormat)
        ));
    }
}
