//! 单文件扫描流程
//!
//! 每次调用按固定顺序执行：绑定变量 → stat → 大小策略 → 选择扫描原语 → 上报命中 → 返回。
//! 过大文件只上报 `large-file-skip`，扫描照常进行（提示性质，不中断）。
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::engine::{compile, MatchResult, RuleEngine, RuleSet};
use crate::error::{CompileError, ScanFileError};
use crate::findings::{Finding, FindingKind};
use crate::handle::{FileHandle, ScanSource};
use crate::options::{ScanConfig, ScanLimits};
use crate::pool::EnginePool;
use crate::report::Reporter;
use crate::rules::FILESCAN;

/// 扫描器名称（宿主注册表使用）
pub const SCANNER_NAME: &str = "YARA-file";
/// 上报记录的来源标签
pub const SOURCE_LABEL: &str = "yara";

/// 宿主框架看到的文件扫描器接口
pub trait Scanner: Send + Sync {
    fn name(&self) -> &'static str;
    fn scan_file(&self, handle: &mut dyn FileHandle) -> Result<(), ScanFileError>;
}

/// 单次扫描的上下文变量
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchContext {
    pub filename: String,
    pub filepath: String,
    pub extension: String,
}

impl MatchContext {
    /// 非 UTF-8 字节按 U+FFFD 替换后绑定（规则变量只接受字符串）
    pub fn from_path(path: &Path) -> Self {
        let filepath = to_slash(&path.to_string_lossy());
        let filename = match path.file_name() {
            Some(name) => to_slash(&name.to_string_lossy()),
            None => filepath.clone(),
        };
        // 基名中最后一个 '.' 起的后缀（含 '.'）
        let extension = filename.rfind('.').map(|i| filename[i..].to_string()).unwrap_or_default();
        Self { filename, filepath, extension }
    }

    /// 按 filename / filepath / extension 顺序绑定；任何一个失败立即返回
    pub fn bind(&self, engine: &mut RuleEngine) -> Result<(), ScanFileError> {
        engine.define_variable("filename", self.filename.as_str())?;
        engine.define_variable("filepath", self.filepath.as_str())?;
        engine.define_variable("extension", self.extension.as_str())?;
        Ok(())
    }
}

/// 把宿主路径分隔符统一成 '/'
fn to_slash(s: &str) -> String {
    to_slash_from(s, std::path::MAIN_SEPARATOR)
}

fn to_slash_from(s: &str, sep: char) -> String {
    if sep == '/' {
        s.to_string()
    } else {
        s.replace(sep, "/")
    }
}

/// 文件扫描器：共享规则集 + 每 worker 引擎 + 上报出口
pub struct FileScanner {
    engines: EnginePool,
    limits: ScanLimits,
    reporter: Arc<dyn Reporter>,
}

impl FileScanner {
    /// 按配置编译 filescan 规则组并创建引擎池
    pub fn init(config: &ScanConfig, reporter: Arc<dyn Reporter>) -> Result<Self, CompileError> {
        let rules = compile(FILESCAN, &config.rules)?;
        let workers = config.workers();
        info!(rules = rules.len(), workers, max_file_size = config.max_file_size, "scanner initialized");
        Ok(Self::with_rules(Arc::new(rules), config.limits(), workers, reporter))
    }

    pub fn with_rules(rules: Arc<RuleSet>, limits: ScanLimits, workers: usize, reporter: Arc<dyn Reporter>) -> Self {
        Self { engines: EnginePool::new(rules, workers), limits, reporter }
    }

    pub fn limits(&self) -> ScanLimits { self.limits }

    pub fn engines(&self) -> &EnginePool { &self.engines }

    /// 在当前 worker 的引擎上扫描一个文件
    pub fn scan_file(&self, handle: &mut dyn FileHandle) -> Result<(), ScanFileError> {
        self.engines.with_engine(|engine| self.scan_with(engine, handle))
    }

    /// 在给定引擎上执行完整扫描流程（调用方需保证引擎独占）
    pub fn scan_with(&self, engine: &mut RuleEngine, handle: &mut dyn FileHandle) -> Result<(), ScanFileError> {
        let ctx = MatchContext::from_path(handle.path());
        ctx.bind(engine)?;

        let info = match handle.stat() {
            Ok(info) => info,
            Err(e) => {
                warn!(file = %ctx.filepath, error = %e, "stat failed");
                self.report(&ctx, FindingKind::FileInfoError, "Error accessing file information", "error", e.to_string());
                return Err(ScanFileError::FileInfo(e));
            }
        };

        if self.limits.exceeds(info.size) {
            debug!(file = %ctx.filepath, size = info.size, max = self.limits.max_file_size, "large file");
            self.report(&ctx, FindingKind::LargeFileSkip, "Skipping large file", "max_size", self.limits.max_file_size.to_string());
        }

        let timeout = self.limits.timeout;
        let result = match handle.source() {
            ScanSource::Descriptor(file) => {
                debug!(file = %ctx.filepath, size = info.size, "descriptor scan");
                engine.scan_descriptor(file, timeout)
            }
            ScanSource::Stream(reader) => {
                debug!(file = %ctx.filepath, size = info.size, "buffer scan");
                let mut buf = Vec::new();
                if let Err(e) = reader.read_to_end(&mut buf) {
                    warn!(file = %ctx.filepath, error = %e, "read failed");
                    self.report(&ctx, FindingKind::FileReadError, "Error reading file", "error", e.to_string());
                    return Err(ScanFileError::FileRead(e));
                }
                engine.scan_buffer(&buf, timeout)
            }
        };

        let matches: MatchResult = result?;
        for rule in matches {
            self.report(&ctx, FindingKind::RuleMatch, "Rule match", "rule", rule);
        }
        Ok(())
    }

    fn report(&self, ctx: &MatchContext, kind: FindingKind, message: &str, key: &str, value: String) {
        let finding = Finding::new(ctx.filepath.clone(), SOURCE_LABEL, kind, message).with_detail(key, value);
        self.reporter.record(finding);
    }
}

impl Scanner for FileScanner {
    fn name(&self) -> &'static str { SCANNER_NAME }

    fn scan_file(&self, handle: &mut dyn FileHandle) -> Result<(), ScanFileError> {
        FileScanner::scan_file(self, handle)
    }
}
