//! 上报出口
//!
//! 扫描器持有一个 `Reporter`，每条记录调用一次 `record`。
//! - `MemoryReporter`：内存收集（测试 / 嵌入式宿主）
//! - `JsonLinesReporter`：每行一个 JSON 对象
//! - `ChannelReporter`：worker → writer 通道，写出由单线程完成
use crossbeam_channel::{Receiver, Sender};
use std::io::Write;
use std::sync::{Mutex, MutexGuard};
use tracing::warn;

use crate::findings::Finding;

pub trait Reporter: Send + Sync {
    fn record(&self, finding: Finding);
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// 内存收集
#[derive(Debug, Default)]
pub struct MemoryReporter {
    findings: Mutex<Vec<Finding>>,
}

impl MemoryReporter {
    pub fn new() -> Self { Self::default() }

    /// 当前已收集记录的快照（按上报顺序）
    pub fn findings(&self) -> Vec<Finding> {
        lock(&self.findings).clone()
    }

    /// 取走并清空
    pub fn take(&self) -> Vec<Finding> {
        std::mem::take(&mut *lock(&self.findings))
    }
}

impl Reporter for MemoryReporter {
    fn record(&self, finding: Finding) {
        lock(&self.findings).push(finding);
    }
}

/// JSON Lines 输出
pub struct JsonLinesReporter<W: Write + Send> {
    out: Mutex<W>,
}

impl<W: Write + Send> JsonLinesReporter<W> {
    pub fn new(out: W) -> Self {
        Self { out: Mutex::new(out) }
    }

    pub fn into_inner(self) -> W {
        self.out.into_inner().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl<W: Write + Send> Reporter for JsonLinesReporter<W> {
    fn record(&self, finding: Finding) {
        let mut out = lock(&self.out);
        // 写出失败不影响扫描结果，只记录日志
        let res = serde_json::to_writer(&mut *out, &finding)
            .map_err(std::io::Error::from)
            .and_then(|_| out.write_all(b"\n"));
        if let Err(e) = res {
            warn!(file = %finding.file, error = %e, "failed to write finding");
        }
    }
}

/// 通道上报：接收端由调用方在单线程内消费
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: Sender<Finding>,
}

impl ChannelReporter {
    /// 有界通道；接收端全部关闭后记录被丢弃
    pub fn bounded(cap: usize) -> (Self, Receiver<Finding>) {
        let (tx, rx) = crossbeam_channel::bounded(cap);
        (Self { tx }, rx)
    }
}

impl Reporter for ChannelReporter {
    fn record(&self, finding: Finding) {
        if self.tx.send(finding).is_err() {
            warn!("finding receiver dropped");
        }
    }
}
