//! 扫描配置、限制与统计信息（模块）
use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 单次引擎扫描的固定时间预算
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(60);

/// 规则源：规则文件路径或内联 TOML 文本
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleSource {
    Path(PathBuf),
    Inline(String),
}

/// 扫描限制（扫描期间只读）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// 最大文件大小（字节）；<= 0 表示不限
    pub max_file_size: i64,
    pub timeout: Duration,
}

impl ScanLimits {
    pub fn new(max_file_size: i64) -> Self {
        Self { max_file_size, timeout: SCAN_TIMEOUT }
    }

    /// 是否超过配置的最大文件大小
    pub fn exceeds(&self, size: u64) -> bool {
        self.max_file_size > 0 && size > self.max_file_size as u64
    }
}

impl Default for ScanLimits {
    fn default() -> Self { Self::new(0) }
}

/// 扫描配置（可由 TOML 文件加载）
#[derive(Debug, Clone, Deserialize)]
pub struct ScanConfig {
    /// 最大文件大小（字节）；<= 0 表示不限
    #[serde(default)]
    pub max_file_size: i64,
    /// 本扫描器规则组的规则源；默认 ./rules/default.toml
    #[serde(default = "default_rules")]
    pub rules: RuleSource,
    /// 线程数（同时也是引擎实例数）：None 表示自动（等于 CPU 核数）
    #[serde(default)]
    pub threads: Option<usize>,
}

fn default_rules() -> RuleSource {
    RuleSource::Path(PathBuf::from("./rules/default.toml"))
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self { max_file_size: 0, rules: default_rules(), threads: None }
    }
}

impl ScanConfig {
    /// 从 TOML 配置文件加载
    pub fn load(path: &Path) -> Result<Self> {
        let txt = std::fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
        let cfg: ScanConfig = toml::from_str(&txt).with_context(|| format!("parse config {}", path.display()))?;
        Ok(cfg)
    }

    pub fn limits(&self) -> ScanLimits {
        ScanLimits::new(self.max_file_size)
    }

    /// 引擎实例数：显式配置优先，否则按 CPU 核数
    pub fn workers(&self) -> usize {
        self.threads.filter(|&n| n >= 1).unwrap_or_else(num_cpus::get)
    }
}

/// 扫描统计信息（便于 CLI 打印）
#[derive(Debug, Default, Clone)]
pub struct ScanStats {
    pub files_scanned: usize,
    pub files_failed: usize,
    pub matches: usize,
    pub skipped_large: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn non_positive_max_never_exceeds() {
        for max in [0i64, -1, i64::MIN] {
            let l = ScanLimits::new(max);
            assert!(!l.exceeds(0));
            assert!(!l.exceeds(u64::MAX));
        }
    }

    #[test]
    fn positive_max_is_exclusive_bound() {
        let l = ScanLimits::new(100);
        assert!(!l.exceeds(100));
        assert!(l.exceeds(101));
        assert_eq!(l.timeout, SCAN_TIMEOUT);
    }

    #[test]
    fn loads_config_from_toml() {
        let mut tmp = tempfile::NamedTempFile::new().unwrap();
        writeln!(tmp, "max_file_size = 1048576").unwrap();
        writeln!(tmp, "threads = 3").unwrap();
        writeln!(tmp, "[rules]").unwrap();
        writeln!(tmp, "inline = '''").unwrap();
        writeln!(tmp, "[[rules]]").unwrap();
        writeln!(tmp, "id = \"x\"").unwrap();
        writeln!(tmp, "strings = [\"x\"]").unwrap();
        writeln!(tmp, "'''").unwrap();
        tmp.flush().unwrap();

        let cfg = ScanConfig::load(tmp.path()).unwrap();
        assert_eq!(cfg.max_file_size, 1_048_576);
        assert_eq!(cfg.workers(), 3);
        assert!(matches!(cfg.rules, RuleSource::Inline(ref s) if s.contains("id = \"x\"")));
    }

    #[test]
    fn defaults_point_at_default_rules() {
        let cfg: ScanConfig = toml::from_str("").unwrap();
        assert_eq!(cfg.rules, RuleSource::Path(PathBuf::from("./rules/default.toml")));
        assert_eq!(cfg.limits(), ScanLimits::default());
        assert!(cfg.workers() >= 1);
    }
}
