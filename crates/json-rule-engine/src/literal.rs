//! 编译后的规则字面量
//!
//! 列表字面量在解析时就建好成员集合，one-of/none-of 判断不再逐个扫描；
//! 字符串字面量在第一次用作正则时编译并缓存。

use crate::value::{MemberKey, Value, ValueKind};
use regex::Regex;
use std::collections::HashSet;
use std::fmt;
use std::sync::OnceLock;

/// 规则中的字面量
#[derive(Clone)]
pub struct Literal {
    value: Value,
    members: Option<HashSet<MemberKey>>,
    pattern: OnceLock<Option<Regex>>,
}

impl Literal {
    pub fn new(value: impl Into<Value>) -> Self {
        let value = value.into();
        let members = value
            .as_sequence()
            .map(|items| items.iter().filter_map(Value::member_key).collect());

        Self {
            value,
            members,
            pattern: OnceLock::new(),
        }
    }

    /// 原始值，编码时按声明顺序原样写回
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// 列表字面量的成员集合
    pub fn members(&self) -> Option<&HashSet<MemberKey>> {
        self.members.as_ref()
    }

    /// 判断标量是否属于列表字面量；非列表字面量一律返回 false
    pub fn has_member(&self, candidate: &Value) -> bool {
        match (&self.members, candidate.member_key()) {
            (Some(members), Some(key)) => members.contains(&key),
            _ => false,
        }
    }

    /// 把字面量当作正则表达式，非法模式返回 None（结果会被缓存）
    pub fn regex(&self) -> Option<&Regex> {
        self.pattern
            .get_or_init(|| {
                let pattern = self.value.as_str()?;
                match Regex::new(pattern) {
                    Ok(re) => Some(re),
                    Err(e) => {
                        tracing::debug!(pattern, error = %e, "无效的正则表达式");
                        None
                    }
                }
            })
            .as_ref()
    }

    /// 类型匹配时允许的值类型：标量取自身类型，列表取其元素类型
    pub fn kinds(&self) -> Vec<ValueKind> {
        match &self.value {
            Value::Sequence(items) => {
                let mut kinds = Vec::new();
                for kind in items.iter().map(Value::kind) {
                    if !kinds.contains(&kind) {
                        kinds.push(kind);
                    }
                }
                kinds
            }
            scalar => vec![scalar.kind()],
        }
    }
}

impl PartialEq for Literal {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl fmt::Debug for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Literal").field(&self.value).finish()
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl From<Value> for Literal {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
