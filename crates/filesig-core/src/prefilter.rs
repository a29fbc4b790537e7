//! 字面量索引（全局 Aho-Corasick）
//!
//! 所有规则的 `strings` 字面量去重后构建一个自动机，扫描时一次遍历收集命中，
//! 再按锚点 -> (规则, 字面量) 的反向映射回填每条规则的命中表。
//! 大小写敏感与不敏感的字面量分开构建两个自动机。

use std::collections::HashMap;

use aho_corasick::{AhoCorasick, AhoCorasickBuilder, MatchKind};

use crate::engine::Deadline;
use crate::error::{CompileError, EngineError};
use crate::rules::RuleSpec;

/// 每处理这么多个命中检查一次超时
const DEADLINE_STRIDE: usize = 1024;

/// 字面量索引（只读，可跨线程共享）
#[derive(Debug)]
pub(crate) struct LiteralIndex {
    /// 全局锚点自动机；没有任何字面量时为 None
    ac: Option<AhoCorasick>,
    /// 锚点索引 -> (规则索引, 规则内字面量索引)
    anchor_to_terms: Vec<Vec<(usize, usize)>>,
}

/// 每条规则的字面量命中表（下标与 RuleSpec::strings 一致）
pub(crate) type LiteralHits = Vec<Vec<bool>>;

impl LiteralIndex {
    /// 从 RuleSpec 列表构建索引；`nocase` 选择只收录对应大小写模式的规则
    pub(crate) fn build(specs: &[RuleSpec], nocase: bool) -> Result<Self, CompileError> {
        let mut anchors: Vec<Vec<u8>> = Vec::new();
        let mut anchor_index: HashMap<Vec<u8>, usize> = HashMap::new();
        let mut anchor_to_terms: Vec<Vec<(usize, usize)>> = Vec::new();

        for (rule_idx, spec) in specs.iter().enumerate() {
            if spec.nocase != nocase {
                continue;
            }
            for (term_idx, s) in spec.strings.iter().enumerate() {
                // 不敏感模式下按小写去重，与自动机的 ASCII 折叠一致
                let key = if nocase { s.to_ascii_lowercase().into_bytes() } else { s.as_bytes().to_vec() };
                let id = match anchor_index.get(&key) {
                    Some(id) => *id,
                    None => {
                        let id = anchors.len();
                        anchors.push(key.clone());
                        anchor_index.insert(key, id);
                        anchor_to_terms.push(Vec::new());
                        id
                    }
                };
                anchor_to_terms[id].push((rule_idx, term_idx));
            }
        }

        let ac = if anchors.is_empty() {
            None
        } else {
            // 需要重叠匹配，只能使用 Standard 语义
            Some(
                AhoCorasickBuilder::new()
                    .match_kind(MatchKind::Standard)
                    .ascii_case_insensitive(nocase)
                    .build(&anchors)?,
            )
        };

        Ok(Self { ac, anchor_to_terms })
    }

    pub(crate) fn anchor_count(&self) -> usize {
        self.anchor_to_terms.len()
    }

    /// 扫描数据并回填命中表；所有锚点都已命中时提前结束
    pub(crate) fn collect_hits(&self, data: &[u8], hits: &mut LiteralHits, deadline: &Deadline) -> Result<(), EngineError> {
        let ac = match &self.ac { Some(ac) => ac, None => return Ok(()) };
        let mut seen = vec![false; self.anchor_count()];
        let mut remaining = seen.len();

        for (n, m) in ac.find_overlapping_iter(data).enumerate() {
            if n % DEADLINE_STRIDE == 0 {
                deadline.check()?;
            }
            let aid = m.pattern().as_usize();
            if seen[aid] {
                continue;
            }
            seen[aid] = true;
            for &(rule_idx, term_idx) in &self.anchor_to_terms[aid] {
                hits[rule_idx][term_idx] = true;
            }
            remaining -= 1;
            if remaining == 0 {
                break;
            }
        }
        // 无命中时整个遍历不会触发上面的检查
        deadline.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{parse_rule_specs, FILESCAN};
    use std::time::Duration;

    fn specs(txt: &str) -> Vec<RuleSpec> {
        parse_rule_specs(txt, &FILESCAN).unwrap()
    }

    fn empty_hits(specs: &[RuleSpec]) -> LiteralHits {
        specs.iter().map(|s| vec![false; s.strings.len()]).collect()
    }

    #[test]
    fn shared_literal_is_indexed_once() {
        let specs = specs(r#"
            [[rules]]
            id = "a"
            strings = ["EICAR", "foo"]
            [[rules]]
            id = "b"
            strings = ["EICAR"]
        "#);
        let idx = LiteralIndex::build(&specs, false).unwrap();
        assert_eq!(idx.anchor_count(), 2);

        let mut hits = empty_hits(&specs);
        idx.collect_hits(b"xxEICARxx", &mut hits, &Deadline::new(Duration::from_secs(60))).unwrap();
        assert_eq!(hits, vec![vec![true, false], vec![true]]);
    }

    #[test]
    fn overlapping_literals_both_hit() {
        let specs = specs(r#"
            [[rules]]
            id = "a"
            strings = ["abcd", "bc"]
            condition = "all"
        "#);
        let idx = LiteralIndex::build(&specs, false).unwrap();
        let mut hits = empty_hits(&specs);
        idx.collect_hits(b"abcd", &mut hits, &Deadline::new(Duration::from_secs(60))).unwrap();
        assert_eq!(hits, vec![vec![true, true]]);
    }

    #[test]
    fn nocase_rules_use_their_own_automaton() {
        let specs = specs(r#"
            [[rules]]
            id = "exact"
            strings = ["Secret"]
            [[rules]]
            id = "loose"
            strings = ["Secret"]
            nocase = true
        "#);
        let exact = LiteralIndex::build(&specs, false).unwrap();
        let loose = LiteralIndex::build(&specs, true).unwrap();
        let deadline = Deadline::new(Duration::from_secs(60));

        let mut hits = empty_hits(&specs);
        exact.collect_hits(b"SECRET", &mut hits, &deadline).unwrap();
        loose.collect_hits(b"SECRET", &mut hits, &deadline).unwrap();
        assert_eq!(hits, vec![vec![false], vec![true]]);
    }

    #[test]
    fn no_literals_builds_empty_index() {
        let specs = specs(r#"
            [[rules]]
            id = "re_only"
            pattern = "a+b"
        "#);
        let idx = LiteralIndex::build(&specs, false).unwrap();
        assert_eq!(idx.anchor_count(), 0);
        let mut hits = empty_hits(&specs);
        idx.collect_hits(b"aab", &mut hits, &Deadline::new(Duration::ZERO)).unwrap();
    }

    #[test]
    fn hitless_pass_over_budget_times_out() {
        let specs = specs(r#"
            [[rules]]
            id = "a"
            strings = ["needle"]
        "#);
        let idx = LiteralIndex::build(&specs, false).unwrap();
        let mut hits = empty_hits(&specs);
        let res = idx.collect_hits(&vec![b'x'; 1 << 20], &mut hits, &Deadline::new(Duration::ZERO));
        assert!(matches!(res, Err(EngineError::Timeout(_))));
        assert_eq!(hits, vec![vec![false]]);
    }
}
