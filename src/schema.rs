//! 字段别名表与数值字段集合
//!
//! 启动时构建一次，之后只读，可以在任意多个并发编译之间共享。

use std::collections::{HashMap, HashSet};

/// 内置的字段别名 → 列名映射
const BUILTIN_ALIASES: &[(&str, &str)] = &[
    ("type", "log_type"),
    ("duration", "duration_ms"),
    ("status", "success"),
    ("user", "username"),
    ("db", "database_name"),
    ("database", "database_name"),
    ("host", "host"),
    ("level", "severity"),
    ("severity", "severity"),
    ("msg", "message"),
    ("message", "message"),
    ("query", "query_text"),
    ("sql", "query_text"),
    ("error", "error_message"),
    ("time", "timestamp"),
    ("timestamp", "timestamp"),
    ("app", "application_name"),
    ("pid", "process_id"),
    ("client", "client_addr"),
];

/// 全文索引中按数值处理的列
const BUILTIN_NUMERIC_FIELDS: &[&str] = &["duration_ms"];

/// 全文检索叶子在结构化存储中匹配的原始文本列
pub const DEFAULT_RAW_TEXT_COLUMN: &str = "raw_message";

/// 字段解析规则
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSchema {
    /// 小写别名 → 列名
    aliases: HashMap<String, String>,
    numeric_fields: HashSet<String>,
    raw_text_column: String,
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self::builtin()
    }
}

impl FieldSchema {
    /// 内置的日志记录 schema
    pub fn builtin() -> Self {
        Self::new(
            BUILTIN_ALIASES.iter().map(|(a, c)| (a.to_string(), c.to_string())),
            BUILTIN_NUMERIC_FIELDS.iter().map(|c| c.to_string()),
            DEFAULT_RAW_TEXT_COLUMN,
        )
    }

    /// 别名在存入时统一转为小写
    pub fn new(
        aliases: impl IntoIterator<Item = (String, String)>,
        numeric_fields: impl IntoIterator<Item = String>,
        raw_text_column: impl Into<String>,
    ) -> Self {
        Self {
            aliases: aliases
                .into_iter()
                .map(|(alias, column)| (alias.to_lowercase(), column))
                .collect(),
            numeric_fields: numeric_fields.into_iter().collect(),
            raw_text_column: raw_text_column.into(),
        }
    }

    /// 获取字段对应的列名，不区分大小写；未知字段原样返回
    pub fn resolve<'s>(&'s self, field: &'s str) -> &'s str {
        self.aliases
            .get(&field.to_lowercase())
            .map(String::as_str)
            .unwrap_or(field)
    }

    pub fn is_numeric(&self, column: &str) -> bool {
        self.numeric_fields.contains(column)
    }

    pub fn raw_text_column(&self) -> &str {
        &self.raw_text_column
    }

    pub fn aliases(&self) -> &HashMap<String, String> {
        &self.aliases
    }

    /// 用另一组别名覆盖（或补充）当前映射
    pub(crate) fn extend_aliases(&mut self, aliases: impl IntoIterator<Item = (String, String)>) {
        self.aliases
            .extend(aliases.into_iter().map(|(alias, column)| (alias.to_lowercase(), column)));
    }

    pub(crate) fn extend_numeric_fields(&mut self, columns: impl IntoIterator<Item = String>) {
        self.numeric_fields.extend(columns);
    }

    pub(crate) fn set_raw_text_column(&mut self, column: String) {
        self.raw_text_column = column;
    }
}
