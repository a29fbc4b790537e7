//! 规则文件加载（TOML）与规则组声明
use serde::Deserialize;
use std::collections::{BTreeMap, HashSet};

use crate::engine::ValueKind;
use crate::error::CompileError;
use crate::options::RuleSource;

/// 规则组：逻辑分组名 + 该组允许绑定的外部变量（名称与类型）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleGroup {
    pub name: &'static str,
    pub variables: &'static [(&'static str, ValueKind)],
}

impl RuleGroup {
    pub const fn new(name: &'static str, variables: &'static [(&'static str, ValueKind)]) -> Self {
        Self { name, variables }
    }

    /// 查询变量声明类型
    pub fn declared(&self, name: &str) -> Option<ValueKind> {
        self.variables.iter().find(|(n, _)| *n == name).map(|(_, k)| *k)
    }
}

/// 文件扫描规则组：filename / filepath / extension 三个字符串变量
pub const FILESCAN: RuleGroup = RuleGroup::new(
    "filescan",
    &[
        ("filename", ValueKind::String),
        ("filepath", ValueKind::String),
        ("extension", ValueKind::String),
    ],
);

/// 内容条件的组合方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Condition {
    #[default]
    Any,
    All,
}

/// 单条规则的配置（支持 pattern 或 regex 字段）
#[derive(Debug, Clone, Deserialize)]
struct RuleEntry {
    pub id: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub regex: Option<String>,
    #[serde(default)]
    pub strings: Vec<String>,
    #[serde(default)]
    pub condition: Condition,
    #[serde(default)]
    pub nocase: bool,
    #[serde(default)]
    pub when: BTreeMap<String, String>,
}

/// 顶层规则文件结构
#[derive(Debug, Clone, Deserialize)]
struct RuleFile {
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

/// 归一化后的规则规格（内部使用）
#[derive(Debug, Clone)]
pub(crate) struct RuleSpec {
    pub id: String,
    pub pat: Option<String>,
    pub strings: Vec<String>,
    pub condition: Condition,
    pub nocase: bool,
    pub when: Vec<(String, String)>,
}

impl RuleSpec {
    pub(crate) fn pattern(&self) -> Option<&str> { self.pat.as_deref() }

    pub(crate) fn has_content(&self) -> bool {
        self.pat.is_some() || !self.strings.is_empty()
    }
}

/// 读取规则源文本（内联或文件）
pub(crate) fn read_rule_source(source: &RuleSource) -> Result<String, CompileError> {
    match source {
        RuleSource::Inline(txt) => Ok(txt.clone()),
        RuleSource::Path(path) => Ok(std::fs::read_to_string(path)?),
    }
}

/// 解析 TOML 规则文本并归一化为 RuleSpec 列表，同时校验规则组变量声明
pub(crate) fn parse_rule_specs(txt: &str, group: &RuleGroup) -> Result<Vec<RuleSpec>, CompileError> {
    let parsed: RuleFile = toml::from_str(txt)?;
    let mut out = Vec::with_capacity(parsed.rules.len());
    let mut ids: HashSet<String> = HashSet::new();

    for e in parsed.rules {
        if e.id.trim().is_empty() {
            return Err(CompileError::InvalidRule("规则 id 不能为空".into()));
        }
        if !ids.insert(e.id.clone()) {
            return Err(CompileError::InvalidRule(format!("重复的规则 id `{}`", e.id)));
        }
        // 兼容两种字段名：pattern 或 regex
        let pat = e.pattern.or(e.regex);
        if e.strings.iter().any(|s| s.is_empty()) {
            return Err(CompileError::InvalidRule(format!("规则 `{}` 含空字面量", e.id)));
        }
        for var in e.when.keys() {
            if group.declared(var).is_none() {
                return Err(CompileError::UndeclaredVariable {
                    rule: e.id,
                    variable: var.clone(),
                    group: group.name,
                });
            }
        }

        let spec = RuleSpec {
            id: e.id,
            pat,
            strings: e.strings,
            condition: e.condition,
            nocase: e.nocase,
            when: e.when.into_iter().collect(),
        };
        if !spec.has_content() && spec.when.is_empty() {
            return Err(CompileError::InvalidRule(format!("规则 `{}` 既无内容条件也无变量条件", spec.id)));
        }
        out.push(spec);
    }

    Ok(out)
}
