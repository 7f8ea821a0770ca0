use anyhow::Result;
use kql::config::load_schema;
use kql::{parse, FieldSchema, IndexCompiler, SqlCompiler};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// 环境变量：schema 配置文件路径
const SCHEMA_ENV: &str = "KQL_SCHEMA";

/// 加载 schema，优先使用JSON配置，失败时使用内置 schema
fn load_field_schema() -> FieldSchema {
    let Ok(path) = std::env::var(SCHEMA_ENV) else {
        return FieldSchema::builtin();
    };
    match load_schema(&path) {
        Ok(schema) => {
            tracing::info!(path = %path, "loaded field schema");
            schema
        }
        Err(e) => {
            tracing::warn!("{}, using built-in field schema", e);
            FieldSchema::builtin()
        }
    }
}

/// 错误位置是字节偏移，终端按字符对齐
fn caret_line(query: &str, position: usize) -> String {
    let column = match query.get(..position) {
        Some(prefix) => prefix.chars().count(),
        None => query.chars().count(),
    };
    format!("{}^", " ".repeat(column))
}

/// 解析并编译一条查询，打印查询树、SQL 谓词和索引查询
fn run_query(query: &str, sql: &SqlCompiler, index: &IndexCompiler) -> Result<()> {
    let tree = match parse(query) {
        Ok(tree) => tree,
        Err(e) => {
            tracing::warn!(position = e.position(), "rejected query: {}", e);
            println!("✗ {}", e);
            println!("  {}", query);
            println!("  {}", caret_line(query, e.position()));
            return Ok(());
        }
    };

    match &tree {
        Some(node) => println!("[tree]      {}", node),
        None => println!("[tree]      (empty query, matches everything)"),
    }

    let predicate = sql.compile(tree.as_ref());
    println!("[sql]       {}", predicate.sql);
    println!("[bound]     {:?}", predicate.values);

    let index_query = index.compile(tree.as_ref());
    println!("[index]     {}", serde_json::to_string_pretty(&index_query)?);
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let schema = load_field_schema();
    let sql = SqlCompiler::with_schema(schema.clone());
    let index = IndexCompiler::with_schema(schema);

    // 带参数时只编译一次
    let args: Vec<String> = std::env::args().skip(1).collect();
    if !args.is_empty() {
        return run_query(&args.join(" "), &sql, &index);
    }

    println!("--- KQL: 查询到 SQL 谓词 / 索引查询 编译器 ---");
    println!("输入查询，Ctrl-D 退出\n");

    let mut editor = DefaultEditor::new()?;
    loop {
        match editor.readline("kql> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                editor.add_history_entry(line.as_str())?;
                run_query(&line, &sql, &index)?;
                println!();
            }
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
