//! 上报记录（Finding）
use serde::Serialize;
use std::collections::BTreeMap;

/// 记录类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    FileInfoError,
    LargeFileSkip,
    FileReadError,
    RuleMatch,
}

/// 单条上报记录：针对某个文件，带来源标签、可读消息和结构化明细
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub file: String,
    pub source: &'static str,
    pub kind: FindingKind,
    pub message: String,
    pub details: BTreeMap<String, String>,
}

impl Finding {
    pub fn new(file: impl Into<String>, source: &'static str, kind: FindingKind, message: impl Into<String>) -> Self {
        Self { file: file.into(), source, kind, message: message.into(), details: BTreeMap::new() }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details.get(key).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_kind_in_kebab_case() {
        let f = Finding::new("dir/a.exe", "yara", FindingKind::RuleMatch, "Rule match").with_detail("rule", "eicar");
        let v = serde_json::to_value(&f).unwrap();
        assert_eq!(v["kind"], "rule-match");
        assert_eq!(v["source"], "yara");
        assert_eq!(v["details"]["rule"], "eicar");
        assert_eq!(f.detail("rule"), Some("eicar"));
        assert_eq!(f.detail("missing"), None);
    }
}
