//! 配置模块，负责从JSON配置文件加载字段 schema

use crate::schema::FieldSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// schema 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file does not exist: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("cannot read config file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse config file {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// schema 配置文件结构，所有键都可省略
///
/// ```json
/// {
///   "aliases": { "svc": "service_name" },
///   "numeric_fields": ["latency_ms"],
///   "raw_text_column": "line",
///   "extend_builtin": true
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaConfig {
    /// 字段别名到列名的映射
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    #[serde(default)]
    pub numeric_fields: Vec<String>,
    #[serde(default)]
    pub raw_text_column: Option<String>,
    /// 为 true 时在内置 schema 之上合并，否则完全替换
    #[serde(default = "default_extend_builtin")]
    pub extend_builtin: bool,
}

fn default_extend_builtin() -> bool {
    true
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            aliases: HashMap::new(),
            numeric_fields: Vec::new(),
            raw_text_column: None,
            extend_builtin: true,
        }
    }
}

impl SchemaConfig {
    /// 从JSON文件加载 schema 配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(ConfigError::NotFound {
                path: path_ref.to_path_buf(),
            });
        }

        // 读取文件内容
        let content = fs::read_to_string(path_ref).map_err(|source| ConfigError::Io {
            path: path_ref.to_path_buf(),
            source,
        })?;

        // 解析JSON
        serde_json::from_str(&content).map_err(|source| ConfigError::Json {
            path: path_ref.to_path_buf(),
            source,
        })
    }

    /// 构建最终的 schema
    pub fn into_schema(self) -> FieldSchema {
        let mut schema = if self.extend_builtin {
            FieldSchema::builtin()
        } else {
            FieldSchema::new([], [], crate::schema::DEFAULT_RAW_TEXT_COLUMN)
        };
        schema.extend_aliases(self.aliases);
        schema.extend_numeric_fields(self.numeric_fields);
        if let Some(column) = self.raw_text_column {
            schema.set_raw_text_column(column);
        }
        schema
    }
}

/// 加载 schema 文件；任何错误都交给调用者决定是否回退到内置 schema
pub fn load_schema<P: AsRef<Path>>(path: P) -> Result<FieldSchema, ConfigError> {
    let schema = SchemaConfig::from_json_file(path)?.into_schema();
    tracing::debug!(aliases = schema.aliases().len(), "loaded field schema");
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", content).unwrap();
        file
    }

    #[test]
    fn test_load_valid_json_config() {
        let file = write_config(
            r#"{
                "aliases": { "Svc": "service_name", "type": "event_type" },
                "numeric_fields": ["latency_ms"],
                "raw_text_column": "line"
            }"#,
        );

        let schema = load_schema(file.path()).unwrap();
        assert_eq!(schema.resolve("svc"), "service_name");
        // 覆盖内置别名
        assert_eq!(schema.resolve("type"), "event_type");
        // 保留其余内置别名
        assert_eq!(schema.resolve("duration"), "duration_ms");
        assert!(schema.is_numeric("latency_ms"));
        assert!(schema.is_numeric("duration_ms"));
        assert_eq!(schema.raw_text_column(), "line");
    }

    #[test]
    fn test_replace_builtin() {
        let file = write_config(r#"{ "aliases": { "svc": "service_name" }, "extend_builtin": false }"#);

        let schema = load_schema(file.path()).unwrap();
        assert_eq!(schema.resolve("svc"), "service_name");
        assert_eq!(schema.resolve("duration"), "duration");
        assert!(!schema.is_numeric("duration_ms"));
        assert_eq!(schema.raw_text_column(), "raw_message");
    }

    #[test]
    fn test_empty_object_is_builtin() {
        let file = write_config("{}");
        assert_eq!(load_schema(file.path()).unwrap(), FieldSchema::builtin());
        assert_eq!(SchemaConfig::default().into_schema(), FieldSchema::builtin());
    }

    #[test]
    fn test_invalid_json_config() {
        let file = write_config("invalid json");
        let result = SchemaConfig::from_json_file(file.path());
        assert!(matches!(result, Err(ConfigError::Json { .. })));
    }

    #[test]
    fn test_missing_file() {
        let result = SchemaConfig::from_json_file("non_existent_file.json");
        assert!(matches!(result, Err(ConfigError::NotFound { .. })));
    }
}
