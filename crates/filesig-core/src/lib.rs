//! 文件签名扫描单元
//!
//! 设计要点：
//! - 规则集（`RuleSet`）编译一次、只读共享；变量绑定状态属于各自的 `RuleEngine` 实例。
//! - 每个文件绑定 filename / filepath / extension 三个变量后再扫描内容。
//! - 真实文件走描述符（定位读取）扫描，虚拟 / 内存句柄走整读缓冲扫描，两条路径结果一致。
//! - 所有命中与异常通过 `Reporter` 上报，错误同时返回给调用方，不会中断其他文件。

mod engine;
mod error;
mod findings;
mod handle;
mod options;
mod pool;
mod prefilter;
mod report;
mod rules;
mod scan;

pub use engine::{compile, MatchResult, RuleEngine, RuleSet, Value, ValueKind};
pub use error::{CompileError, EngineError, ScanFileError};
pub use findings::{Finding, FindingKind};
pub use handle::{FileHandle, FileInfo, MemFile, OsFile, ScanSource};
pub use options::{RuleSource, ScanConfig, ScanLimits, ScanStats, SCAN_TIMEOUT};
pub use pool::EnginePool;
pub use report::{ChannelReporter, JsonLinesReporter, MemoryReporter, Reporter};
pub use rules::{Condition, RuleGroup, FILESCAN};
pub use scan::{FileScanner, MatchContext, Scanner, SCANNER_NAME, SOURCE_LABEL};
