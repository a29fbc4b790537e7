//! 错误类型定义（编译 / 引擎 / 单文件扫描）
use std::io;
use thiserror::Error;

/// 规则编译错误
#[derive(Error, Debug)]
pub enum CompileError {
    #[error("读取规则文件失败：{0}")]
    Io(#[from] io::Error),
    #[error("规则文件解析失败：{0}")]
    Parse(#[from] toml::de::Error),
    #[error("规则 `{rule}` 正则编译失败：{source}")]
    Regex {
        rule: String,
        #[source]
        source: regex::Error,
    },
    #[error("字面量自动机构建失败：{0}")]
    Automaton(#[from] aho_corasick::BuildError),
    #[error("规则 `{rule}` 引用了未声明的变量 `{variable}`（规则组 {group}）")]
    UndeclaredVariable {
        rule: String,
        variable: String,
        group: &'static str,
    },
    #[error("无效规则：{0}")]
    InvalidRule(String),
}

/// 规则引擎错误（绑定 / 扫描 / 超时）
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("变量绑定失败 `{name}`：{reason}")]
    Binding { name: String, reason: String },
    #[error("引擎扫描失败：{0}")]
    Scan(String),
    #[error("扫描超时（预算 {0:?}）")]
    Timeout(std::time::Duration),
}

/// 单文件扫描错误（向宿主框架传播）
#[derive(Error, Debug)]
pub enum ScanFileError {
    #[error("变量绑定失败 `{name}`：{reason}")]
    Binding { name: String, reason: String },
    #[error("获取文件信息失败：{0}")]
    FileInfo(#[source] io::Error),
    #[error("读取文件失败：{0}")]
    FileRead(#[source] io::Error),
    #[error("引擎扫描失败：{0}")]
    Scan(String),
    #[error("扫描超时（预算 {0:?}）")]
    Timeout(std::time::Duration),
}

impl From<EngineError> for ScanFileError {
    fn from(e: EngineError) -> Self {
        match e {
            EngineError::Binding { name, reason } => ScanFileError::Binding { name, reason },
            EngineError::Scan(msg) => ScanFileError::Scan(msg),
            EngineError::Timeout(budget) => ScanFileError::Timeout(budget),
        }
    }
}
