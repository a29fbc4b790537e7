//! 每个 worker 一个引擎实例
//!
//! 变量绑定状态属于引擎实例而不是规则集，所以并发扫描必须各用各的实例。
//! 规则集只编译一次，所有实例共享同一个 `Arc<RuleSet>`。
//! 每个槽位再加一把锁，覆盖整个 bind + scan 过程：即使两个线程落到同一槽位也只会串行。
use std::sync::{Arc, Mutex};

use crate::engine::{RuleEngine, RuleSet};

#[derive(Debug)]
pub struct EnginePool {
    slots: Vec<Mutex<RuleEngine>>,
}

impl EnginePool {
    pub fn new(rules: Arc<RuleSet>, workers: usize) -> Self {
        let slots = (0..workers.max(1)).map(|_| Mutex::new(RuleEngine::new(Arc::clone(&rules)))).collect();
        Self { slots }
    }

    pub fn len(&self) -> usize { self.slots.len() }

    pub fn is_empty(&self) -> bool { self.slots.is_empty() }

    /// 当前线程对应的槽位：rayon worker 序号取模，池外线程使用 0 号
    pub fn current_slot(&self) -> usize {
        rayon::current_thread_index().unwrap_or(0) % self.slots.len()
    }

    /// 在当前线程的引擎上独占执行 `f`
    pub fn with_engine<T>(&self, f: impl FnOnce(&mut RuleEngine) -> T) -> T {
        self.with_slot(self.current_slot(), f)
    }

    /// 在指定槽位（取模）的引擎上独占执行 `f`
    pub fn with_slot<T>(&self, slot: usize, f: impl FnOnce(&mut RuleEngine) -> T) -> T {
        let mut engine = self.slots[slot % self.slots.len()]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut engine)
    }
}
