//! 规则执行器
//!
//! 自顶向下递归求值规则树，逻辑组短路求值。条件节点的任何失败
//! （路径不存在、类型不匹配、比较器未注册、操作符无法识别）都折叠为 false，
//! 不会影响兄弟节点的求值。

use crate::aggregator;
use crate::comparators::ComparatorRegistry;
use crate::matcher;
use crate::models::{Condition, LogicalGroup, Rule};
use crate::operators::LogicalOperator;
use crate::resolver::{self, PathSyntax, Resolved};
use serde::Serialize;
use serde_json::Value as JsonValue;
use tracing::{debug, warn};

/// 评估结果
///
/// `reason` 与 `evaluation_trace` 只用于诊断，不会改变 `matched`。
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EvaluationResult {
    pub matched: bool,
    /// 第一个未命中条件的原因
    pub reason: Option<String>,
    pub matched_conditions: Vec<String>,
    pub evaluation_trace: Vec<String>,
}

/// 规则执行器
pub struct RuleExecutor<'a> {
    registry: &'a ComparatorRegistry,
    syntax: &'a PathSyntax,
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl<'a> RuleExecutor<'a> {
    pub fn new(registry: &'a ComparatorRegistry, syntax: &'a PathSyntax) -> Self {
        Self {
            registry,
            syntax,
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    /// 只求布尔结果
    pub fn evaluate(&self, rule: &Rule, record: &JsonValue) -> bool {
        self.evaluate_node(rule, record, None, "root")
    }

    /// 求值并收集诊断信息
    pub fn execute(&self, rule: &Rule, record: &JsonValue) -> EvaluationResult {
        let mut result = EvaluationResult::default();
        let matched = self.evaluate_node(rule, record, Some(&mut result), "root");
        result.matched = matched;
        result
    }

    fn evaluate_node(
        &self,
        node: &Rule,
        record: &JsonValue,
        result: Option<&mut EvaluationResult>,
        path: &str,
    ) -> bool {
        match node {
            Rule::Leaf(cond) => self.evaluate_condition(cond, record, result, path),
            Rule::Group(group) => self.evaluate_group(group, record, result, path),
        }
    }

    /// 评估条件节点
    fn evaluate_condition(
        &self,
        cond: &Condition,
        record: &JsonValue,
        result: Option<&mut EvaluationResult>,
        path: &str,
    ) -> bool {
        let (matched, reason) = match self.check_condition(cond, record) {
            Ok(matched) => (matched, None),
            Err(reason) => {
                debug!(path, condition = %cond, %reason, "条件未生效");
                (false, Some(reason))
            }
        };

        if let Some(result) = result {
            if self.trace_enabled {
                result.evaluation_trace.push(format!(
                    "{}: {} => {}",
                    path,
                    cond,
                    if matched { "MATCHED" } else { "NOT_MATCHED" }
                ));
            }

            if matched {
                result.matched_conditions.push(format!("{}: {}", path, cond));
            } else if result.reason.is_none() {
                result.reason =
                    Some(reason.unwrap_or_else(|| format!("{}: 条件不满足 ({})", path, cond)));
            }
        }

        matched
    }

    /// 路径解析 → 类型匹配 → 比较器查找 → 比较（必要时多值聚合）
    ///
    /// 返回 Err 表示条件未生效，原因仅用于诊断。
    fn check_condition(&self, cond: &Condition, record: &JsonValue) -> Result<bool, String> {
        let resolved = resolver::resolve(record, &cond.path, self.syntax)
            .map_err(|miss| format!("{}: {}", cond.path, miss))?;

        if let Some(mismatch) = matcher::first_mismatch(&resolved, &cond.value) {
            return Err(format!(
                "{}: 类型不匹配, 字面量 {} 与值 {} ({})",
                cond.path,
                cond.value,
                mismatch,
                mismatch.kind()
            ));
        }

        let comparator = self
            .registry
            .get(&cond.comparator)
            .ok_or_else(|| format!("比较器未注册: {}", cond.comparator))?;

        match &resolved {
            Resolved::Single(value) => Ok(comparator.compare(value, &cond.value)),
            Resolved::Groups(groups) => {
                let operator = cond.fold_operator();
                if let LogicalOperator::Unrecognized(op) = &operator {
                    return Err(format!("{}: 无法识别的折叠操作符 '{}'", cond.path, op));
                }
                Ok(aggregator::fold_groups(
                    groups,
                    comparator,
                    &cond.value,
                    &operator,
                ))
            }
        }
    }

    /// 评估逻辑组节点（短路求值）
    fn evaluate_group(
        &self,
        group: &LogicalGroup,
        record: &JsonValue,
        mut result: Option<&mut EvaluationResult>,
        path: &str,
    ) -> bool {
        if self.trace_enabled {
            if let Some(result) = result.as_deref_mut() {
                result.evaluation_trace.push(format!(
                    "{}: 开始评估 {} 组 (共 {} 个子节点)",
                    path,
                    group.operator,
                    group.rules.len()
                ));
            }
        }

        // AND 遇到 false 立即返回，OR 遇到 true 立即返回
        let short_circuit_on = match &group.operator {
            LogicalOperator::And => false,
            LogicalOperator::Or => true,
            LogicalOperator::Unrecognized(op) => {
                warn!(path, operator = %op, "无法识别的逻辑操作符，按不匹配处理");
                if let Some(result) = result {
                    if result.reason.is_none() {
                        result.reason = Some(format!("{}: 无法识别的逻辑操作符 '{}'", path, op));
                    }
                }
                return false;
            }
        };

        for (i, child) in group.rules.iter().enumerate() {
            let child_path = format!("{}.rules[{}]", path, i);
            let child_matched =
                self.evaluate_node(child, record, result.as_deref_mut(), &child_path);

            if child_matched == short_circuit_on {
                if self.trace_enabled {
                    if let Some(result) = result.as_deref_mut() {
                        result
                            .evaluation_trace
                            .push(format!("{}: {} 短路 - 子节点 {}", path, group.operator, i));
                    }
                }
                return short_circuit_on;
            }
        }

        !short_circuit_on
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record() -> JsonValue {
        json!({
            "name": {"first": "anakin", "last": "skywalker"},
            "age": 22,
            "children": ["luke", "leia"],
            "order": "jedi",
            "friends": [
                {"first": "r2d2", "order": "republic", "age": 13, "episodes": [1, 2, 3, 4, 5, 6, 7, 8, 9]},
                {"first": "ben", "order": "jedi", "age": 38, "episodes": [1, 2, 3, 4, 5, 6]},
                {"first": "sheev", "order": "sith", "age": 63, "episodes": [1, 2, 3, 5, 6, 9]}
            ]
        })
    }

    fn run(rule_json: &str) -> EvaluationResult {
        let registry = ComparatorRegistry::with_defaults();
        let syntax = PathSyntax::default();
        let rule = Rule::from_json(rule_json).unwrap();
        RuleExecutor::new(&registry, &syntax)
            .with_trace()
            .execute(&rule, &record())
    }

    #[test]
    fn test_simple_condition_match() {
        let result = run(r#"{"path": "name.first", "comparator": "equals", "value": "anakin"}"#);
        assert!(result.matched);
        assert_eq!(result.matched_conditions.len(), 1);
        assert!(result.reason.is_none());
    }

    #[test]
    fn test_simple_condition_not_match() {
        let result = run(r#"{"path": "name.first", "comparator": "equals", "value": "ANAKIN"}"#);
        assert!(!result.matched);
        assert!(result.reason.unwrap().contains("条件不满足"));
    }

    #[test]
    fn test_missing_path() {
        let result = run(r#"{"path": "name.middle", "comparator": "equals", "value": "x"}"#);
        assert!(!result.matched);
        assert!(result.reason.unwrap().contains("路径不存在"));
    }

    #[test]
    fn test_type_mismatch_skips_comparator() {
        let registry = {
            let mut registry = ComparatorRegistry::with_defaults();
            registry.register_element("always-true", |_, _| true);
            registry
        };
        let syntax = PathSyntax::default();
        let rule = Rule::leaf("age", "always-true", "22");

        let result = RuleExecutor::new(&registry, &syntax).execute(&rule, &record());
        assert!(!result.matched);
        assert!(result.reason.unwrap().contains("类型不匹配"));
    }

    #[test]
    fn test_unknown_comparator() {
        let result = run(r#"{"path": "age", "comparator": "fubar", "value": 22}"#);
        assert!(!result.matched);
        assert!(result.reason.unwrap().contains("fubar"));
    }

    #[test]
    fn test_array_per_element_or() {
        let result = run(
            r#"{"operator": "or", "path": "children", "comparator": "equals", "value": "luke"}"#,
        );
        assert!(result.matched);
    }

    #[test]
    fn test_wildcard_contains_and() {
        let result = run(
            r#"{"comparator": "contains", "operator": "and", "path": "friends.#.episodes", "value": 1}"#,
        );
        assert!(result.matched);

        let result = run(
            r#"{"comparator": "contains", "operator": "and", "path": "friends.#.episodes", "value": 7}"#,
        );
        assert!(!result.matched);

        let result = run(
            r#"{"comparator": "contains", "operator": "or", "path": "friends.#.episodes", "value": 7}"#,
        );
        assert!(result.matched);
    }

    #[test]
    fn test_wildcard_empty_episode_list() {
        let registry = ComparatorRegistry::with_defaults();
        let syntax = PathSyntax::default();
        let executor = RuleExecutor::new(&registry, &syntax);
        let record = json!({"friends": [{"episodes": [1, 2]}, {"episodes": []}]});

        let contains_all = Rule::Leaf(
            Condition::new("friends.#.episodes", "contains", 1).with_operator(LogicalOperator::And),
        );
        assert!(!executor.evaluate(&contains_all, &record));

        let missing_any = Rule::Leaf(
            Condition::new("friends.#.episodes", "not-contains", 1)
                .with_operator(LogicalOperator::Or),
        );
        assert!(executor.evaluate(&missing_any, &record));
    }

    #[test]
    fn test_unrecognized_fold_operator() {
        let result = run(
            r#"{"comparator": "contains", "operator": "xor", "path": "friends.#.episodes", "value": 1}"#,
        );
        assert!(!result.matched);
        assert!(result.reason.unwrap().contains("xor"));
    }

    #[test]
    fn test_and_group_short_circuit() {
        let result = run(
            r#"
            {
                "operator": "and",
                "rules": [
                    {"path": "order", "comparator": "equals", "value": "sith"},
                    {"path": "age", "comparator": "greater-than", "value": 20}
                ]
            }
            "#,
        );

        assert!(!result.matched);
        assert!(result.evaluation_trace.iter().any(|t| t.contains("短路")));
        // 第二个条件不会被评估
        assert!(!result.evaluation_trace.iter().any(|t| t.contains("age")));
    }

    #[test]
    fn test_or_group_first_match() {
        let result = run(
            r#"
            {
                "operator": "or",
                "rules": [
                    {"path": "order", "comparator": "equals", "value": "jedi"},
                    {"path": "order", "comparator": "equals", "value": "sith"}
                ]
            }
            "#,
        );

        assert!(result.matched);
        assert!(result.evaluation_trace.iter().any(|t| t.contains("短路")));
        assert_eq!(result.matched_conditions.len(), 1);
    }

    #[test]
    fn test_unrecognized_group_operator() {
        let result = run(
            r#"
            {
                "operator": "unknown",
                "rules": [
                    {"path": "order", "comparator": "equals", "value": "jedi"}
                ]
            }
            "#,
        );

        assert!(!result.matched);
        assert!(result.reason.unwrap().contains("unknown"));
    }

    #[test]
    fn test_bad_leaf_does_not_abort_siblings() {
        let result = run(
            r#"
            {
                "operator": "or",
                "rules": [
                    {"path": "missing", "comparator": "equals", "value": 1},
                    {"path": "age", "comparator": "fubar", "value": 1},
                    {"path": "age", "comparator": "greater-than", "value": 20}
                ]
            }
            "#,
        );

        assert!(result.matched);
        assert!(result.reason.unwrap().contains("路径不存在"));
    }

    #[test]
    fn test_nested_groups() {
        let result = run(
            r#"
            {
                "operator": "or",
                "rules": [
                    {
                        "operator": "and",
                        "rules": [
                            {"path": "name.first", "comparator": "equals", "value": "darth"},
                            {"path": "name.last", "comparator": "equals", "value": "vader"}
                        ]
                    },
                    {
                        "operator": "or",
                        "rules": [
                            {"path": "order", "comparator": "equals", "value": "first world order"},
                            {"operator": "or", "path": "friends.#.order", "comparator": "contains", "value": "sith"}
                        ]
                    }
                ]
            }
            "#,
        );

        assert!(result.matched);
    }

    /// 收集日志输出，用于检查诊断信息
    #[derive(Clone, Default)]
    struct CapturedLogs(std::sync::Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_miss_log_carries_node_location() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let registry = ComparatorRegistry::with_defaults();
        let syntax = PathSyntax::default();
        let rule = Rule::and(vec![
            Rule::leaf("name.first", "equals", "anakin"),
            Rule::leaf("name.middle", "equals", "x"),
        ]);

        let matched = tracing::subscriber::with_default(subscriber, || {
            RuleExecutor::new(&registry, &syntax).evaluate(&rule, &record())
        });

        assert!(!matched);
        let output = String::from_utf8(logs.0.lock().clone()).unwrap();
        assert!(output.contains("root.rules[1]"), "{}", output);
    }

    #[test]
    fn test_evaluate_matches_execute() {
        let registry = ComparatorRegistry::with_defaults();
        let syntax = PathSyntax::default();
        let executor = RuleExecutor::new(&registry, &syntax);
        let rule = Rule::and(vec![
            Rule::leaf("name.first", "equals", "anakin"),
            Rule::leaf("friends.#.age", "greater-than", 10),
        ]);

        assert!(executor.evaluate(&rule, &record()));
        assert!(executor.execute(&rule, &record()).matched);
        // 未启用追踪时不记录
        assert!(executor.execute(&rule, &record()).evaluation_trace.is_empty());
    }
}
