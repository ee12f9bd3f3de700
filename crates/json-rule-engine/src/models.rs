//! 规则引擎领域模型
//!
//! 规则树的线上格式：每个节点要么是条件 `{"path", "comparator", "value"}`，
//! 要么是逻辑组 `{"operator", "rules"}`，两者互斥。条件节点可以额外带一个
//! `operator`，用于多值（数组）路径的结果折叠。

use crate::error::{Result, RuleError};
use crate::literal::Literal;
use crate::operators::LogicalOperator;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::fmt;

/// 规则节点（条件或逻辑组）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawRule", into = "RawRule")]
pub enum Rule {
    Leaf(Condition),
    Group(LogicalGroup),
}

/// 条件节点
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub path: String,
    pub comparator: String,
    pub value: Literal,
    /// 路径命中多个值时的折叠方式，未设置时按 AND 处理
    pub operator: Option<LogicalOperator>,
}

impl Condition {
    pub fn new(
        path: impl Into<String>,
        comparator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self {
            path: path.into(),
            comparator: comparator.into(),
            value: Literal::new(value),
            operator: None,
        }
    }

    pub fn with_operator(mut self, operator: LogicalOperator) -> Self {
        self.operator = Some(operator);
        self
    }

    /// 多值折叠使用的操作符
    pub fn fold_operator(&self) -> LogicalOperator {
        self.operator.clone().unwrap_or_default()
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.path, self.comparator, self.value)
    }
}

/// 逻辑组节点
#[derive(Debug, Clone, PartialEq)]
pub struct LogicalGroup {
    pub operator: LogicalOperator,
    pub rules: Vec<Rule>,
}

impl LogicalGroup {
    pub fn new(operator: LogicalOperator, rules: Vec<Rule>) -> Self {
        Self { operator, rules }
    }
}

impl Rule {
    pub fn leaf(
        path: impl Into<String>,
        comparator: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        Self::Leaf(Condition::new(path, comparator, value))
    }

    pub fn and(rules: Vec<Rule>) -> Self {
        Self::Group(LogicalGroup::new(LogicalOperator::And, rules))
    }

    pub fn or(rules: Vec<Rule>) -> Self {
        Self::Group(LogicalGroup::new(LogicalOperator::Or, rules))
    }

    /// 从 JSON 字符串解析并校验规则
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: RawRule = serde_json::from_str(json)?;
        Self::try_from(raw)
    }

    /// 从已解析的 JSON 值构造规则
    pub fn from_value(value: JsonValue) -> Result<Self> {
        let raw: RawRule = serde_json::from_value(value)?;
        Self::try_from(raw)
    }

    /// 编码回线上格式
    pub fn to_json(&self) -> JsonValue {
        serde_json::to_value(RawRule::from(self.clone())).unwrap_or(JsonValue::Null)
    }

    /// 规则中读取的所有字段路径（去重、有序）
    pub fn fields(&self) -> BTreeSet<String> {
        let mut fields = BTreeSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields(&self, fields: &mut BTreeSet<String>) {
        match self {
            Self::Leaf(cond) => {
                fields.insert(cond.path.clone());
            }
            Self::Group(group) => {
                for child in &group.rules {
                    child.collect_fields(fields);
                }
            }
        }
    }

    /// 嵌套深度，单个条件为 1
    pub fn depth(&self) -> usize {
        match self {
            Self::Leaf(_) => 1,
            Self::Group(group) => 1 + group.rules.iter().map(Self::depth).max().unwrap_or(0),
        }
    }
}

/// 线上格式的镜像结构，所有字段都可选，校验在转换为 [`Rule`] 时完成
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comparator: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<JsonValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<LogicalOperator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<RawRule>>,
}

impl TryFrom<RawRule> for Rule {
    type Error = RuleError;

    fn try_from(raw: RawRule) -> Result<Self> {
        convert(raw, "root")
    }
}

pub(crate) fn convert(raw: RawRule, at: &str) -> Result<Rule> {
    let RawRule {
        path,
        comparator,
        value,
        operator,
        rules,
    } = raw;

    let has_leaf = path.is_some() || comparator.is_some() || value.is_some();

    match (rules, has_leaf) {
        (Some(_), true) => Err(RuleError::BothForms { at: at.to_string() }),
        (Some(rules), false) => {
            let operator = operator.ok_or_else(|| RuleError::MissingField {
                at: at.to_string(),
                field: "operator",
            })?;

            if rules.is_empty() {
                return Err(RuleError::EmptyGroup { at: at.to_string() });
            }

            let rules = rules
                .into_iter()
                .enumerate()
                .map(|(i, child)| convert(child, &format!("{}.rules[{}]", at, i)))
                .collect::<Result<Vec<_>>>()?;

            Ok(Rule::Group(LogicalGroup::new(operator, rules)))
        }
        (None, true) => {
            let path = non_empty(path, at, "path")?;
            let comparator = non_empty(comparator, at, "comparator")?;
            let value = value.ok_or_else(|| RuleError::MissingField {
                at: at.to_string(),
                field: "value",
            })?;

            let value = Value::from_json(&value).ok_or_else(|| RuleError::InvalidLiteral {
                at: at.to_string(),
                reason: format!("只支持字符串、数值、布尔及其数组，实际为 {}", value),
            })?;

            Ok(Rule::Leaf(Condition {
                path,
                comparator,
                value: Literal::new(value),
                operator,
            }))
        }
        (None, false) => Err(RuleError::NeitherForm { at: at.to_string() }),
    }
}

fn non_empty(field: Option<String>, at: &str, name: &'static str) -> Result<String> {
    match field {
        Some(s) if !s.is_empty() => Ok(s),
        _ => Err(RuleError::MissingField {
            at: at.to_string(),
            field: name,
        }),
    }
}

impl From<Rule> for RawRule {
    fn from(rule: Rule) -> Self {
        match rule {
            Rule::Leaf(cond) => Self {
                path: Some(cond.path),
                comparator: Some(cond.comparator),
                value: Some(cond.value.value().to_json()),
                operator: cond.operator,
                rules: None,
            },
            Rule::Group(group) => Self {
                operator: Some(group.operator),
                rules: Some(group.rules.into_iter().map(Self::from).collect()),
                ..Self::default()
            },
        }
    }
}
