//! 规则值模型
//!
//! 比较器只会看到四种值：字符串、数值（统一为 f64）、布尔以及它们组成的序列。
//! `null` 与对象永远不会进入比较器。

use serde_json::Value as JsonValue;
use std::fmt;

/// 规范化后的值
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Number(f64),
    Bool(bool),
    Sequence(Vec<Value>),
}

/// 值的类型标签
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    String,
    Number,
    Boolean,
    Sequence,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Sequence => "sequence",
        };
        write!(f, "{}", s)
    }
}

impl Value {
    /// 从 JSON 值转换，整数统一转为 f64；`null` 和对象返回 `None`
    pub fn from_json(json: &JsonValue) -> Option<Self> {
        match json {
            JsonValue::String(s) => Some(Self::String(s.clone())),
            JsonValue::Number(n) => n.as_f64().map(Self::Number),
            JsonValue::Bool(b) => Some(Self::Bool(*b)),
            JsonValue::Array(arr) => arr
                .iter()
                .map(Self::from_json)
                .collect::<Option<Vec<_>>>()
                .map(Self::Sequence),
            JsonValue::Null | JsonValue::Object(_) => None,
        }
    }

    /// 转回 JSON，整数值的数字按整数输出（`20` 不会变成 `20.0`）
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Number(n) => number_to_json(*n),
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Sequence(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::String(_) => ValueKind::String,
            Self::Number(_) => ValueKind::Number,
            Self::Bool(_) => ValueKind::Boolean,
            Self::Sequence(_) => ValueKind::Sequence,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_sequence(&self) -> Option<&[Value]> {
        match self {
            Self::Sequence(items) => Some(items),
            _ => None,
        }
    }

    pub fn is_scalar(&self) -> bool {
        !matches!(self, Self::Sequence(_))
    }

    /// 生成用于集合成员判断的键，序列没有键
    pub fn member_key(&self) -> Option<MemberKey> {
        match self {
            Self::String(s) => Some(MemberKey::String(s.clone())),
            Self::Number(n) => Some(MemberKey::Number(normalized_bits(*n))),
            Self::Bool(b) => Some(MemberKey::Bool(*b)),
            Self::Sequence(_) => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_json())
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Self::Sequence(items.into_iter().map(Into::into).collect())
    }
}

/// 标量值的可哈希投影
///
/// 数值按规范化后的位模式哈希，`-0.0` 与 `0.0` 视为同一个键。
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MemberKey {
    String(String),
    Number(u64),
    Bool(bool),
}

fn normalized_bits(n: f64) -> u64 {
    if n == 0.0 { 0.0_f64.to_bits() } else { n.to_bits() }
}

fn number_to_json(n: f64) -> JsonValue {
    // 2^53 以内的整数可以无损地按 i64 输出
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9_007_199_254_740_992.0 {
        JsonValue::from(n as i64)
    } else {
        serde_json::Number::from_f64(n)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null)
    }
}
