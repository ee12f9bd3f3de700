//! 比较器注册表
//!
//! 比较器是纯函数 `(解析值, 字面量) -> bool`，必须是全函数：类型不符、形状不对、
//! 正则非法都返回 false，绝不 panic。每个比较器自己再做一次类型检查，
//! 不依赖前置的类型匹配。

use crate::literal::Literal;
use crate::value::Value;
use chrono::{DateTime, NaiveDate, Utc};
use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// 比较函数
pub type ComparatorFn = Arc<dyn Fn(&Value, &Literal) -> bool + Send + Sync>;

/// 多值路径下比较器的作用方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Application {
    /// 对分组中的每个元素分别比较
    PerElement,
    /// 把整个分组作为一个序列传给比较器
    PerGroup,
}

/// 注册表中的比较器
#[derive(Clone)]
pub struct Comparator {
    func: ComparatorFn,
    application: Application,
}

impl Comparator {
    pub fn per_group<F>(func: F) -> Self
    where
        F: Fn(&Value, &Literal) -> bool + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            application: Application::PerGroup,
        }
    }

    pub fn per_element<F>(func: F) -> Self
    where
        F: Fn(&Value, &Literal) -> bool + Send + Sync + 'static,
    {
        Self {
            func: Arc::new(func),
            application: Application::PerElement,
        }
    }

    pub fn application(&self) -> Application {
        self.application
    }

    pub fn compare(&self, resolved: &Value, literal: &Literal) -> bool {
        (self.func)(resolved, literal)
    }
}

impl fmt::Debug for Comparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Comparator")
            .field("application", &self.application)
            .finish_non_exhaustive()
    }
}

/// 内置比较器
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinComparator {
    // 通用比较
    Equals,
    NotEquals,

    // 排序比较（字符串按字典序，数值按大小）
    LessThan,
    LessOrEqual,
    GreaterThan,
    GreaterOrEqual,
    Between,

    // 包含检查
    Contains,
    NotContains,
    ContainsAny,
    ContainsAll,
    OneOf,
    NoneOf,

    // 字符串操作
    StartsWith,
    EndsWith,
    RegexMatch,

    // 时间操作
    Before,
    After,
}

impl BuiltinComparator {
    pub const ALL: [Self; 18] = [
        Self::Equals,
        Self::NotEquals,
        Self::LessThan,
        Self::LessOrEqual,
        Self::GreaterThan,
        Self::GreaterOrEqual,
        Self::Between,
        Self::Contains,
        Self::NotContains,
        Self::ContainsAny,
        Self::ContainsAll,
        Self::OneOf,
        Self::NoneOf,
        Self::StartsWith,
        Self::EndsWith,
        Self::RegexMatch,
        Self::Before,
        Self::After,
    ];

    /// 规范名称
    pub fn name(self) -> &'static str {
        match self {
            Self::Equals => "equals",
            Self::NotEquals => "not-equals",
            Self::LessThan => "less-than",
            Self::LessOrEqual => "less-or-equal",
            Self::GreaterThan => "greater-than",
            Self::GreaterOrEqual => "greater-or-equal",
            Self::Between => "between",
            Self::Contains => "contains",
            Self::NotContains => "not-contains",
            Self::ContainsAny => "contains-any",
            Self::ContainsAll => "contains-all",
            Self::OneOf => "one-of",
            Self::NoneOf => "none-of",
            Self::StartsWith => "starts-with",
            Self::EndsWith => "ends-with",
            Self::RegexMatch => "regex-match",
            Self::Before => "before",
            Self::After => "after",
        }
    }

    /// 兼容旧规则格式的别名
    pub fn aliases(self) -> &'static [&'static str] {
        match self {
            Self::Equals => &["eq"],
            Self::NotEquals => &["neq"],
            Self::LessThan => &["lt"],
            Self::LessOrEqual => &["lte"],
            Self::GreaterThan => &["gt"],
            Self::GreaterOrEqual => &["gte"],
            Self::Between => &[],
            Self::Contains => &[],
            Self::NotContains => &["ncontains"],
            Self::ContainsAny => &["contains_any"],
            Self::ContainsAll => &["contains_all"],
            Self::OneOf => &["oneof", "in"],
            Self::NoneOf => &["noneof", "not_in"],
            Self::StartsWith => &["starts_with"],
            Self::EndsWith => &["ends_with"],
            Self::RegexMatch => &["regex"],
            Self::Before => &[],
            Self::After => &[],
        }
    }

    pub fn application(self) -> Application {
        match self {
            Self::Contains | Self::NotContains | Self::ContainsAny | Self::ContainsAll => {
                Application::PerGroup
            }
            _ => Application::PerElement,
        }
    }

    pub fn compare(self, resolved: &Value, literal: &Literal) -> bool {
        let expected = literal.value();
        match self {
            Self::Equals => equals(resolved, expected),
            Self::NotEquals => {
                resolved.kind() == expected.kind() && !equals(resolved, expected)
            }
            Self::LessThan => ordering(resolved, expected, Ordering::is_lt),
            Self::LessOrEqual => ordering(resolved, expected, Ordering::is_le),
            Self::GreaterThan => ordering(resolved, expected, Ordering::is_gt),
            Self::GreaterOrEqual => ordering(resolved, expected, Ordering::is_ge),
            Self::Between => between(resolved, expected),
            Self::Contains => contains(resolved, expected).unwrap_or(false),
            Self::NotContains => contains(resolved, expected).is_some_and(|found| !found),
            Self::ContainsAny => contains_any(resolved, literal),
            Self::ContainsAll => contains_all(resolved, expected),
            Self::OneOf => resolved.is_scalar() && literal.has_member(resolved),
            Self::NoneOf => {
                resolved.is_scalar() && literal.members().is_some() && !literal.has_member(resolved)
            }
            Self::StartsWith => strings(resolved, expected).is_some_and(|(s, p)| s.starts_with(p)),
            Self::EndsWith => strings(resolved, expected).is_some_and(|(s, p)| s.ends_with(p)),
            Self::RegexMatch => match (resolved.as_str(), literal.regex()) {
                (Some(s), Some(re)) => re.is_match(s),
                _ => false,
            },
            Self::Before => time_compare(resolved, expected, |a, b| a < b),
            Self::After => time_compare(resolved, expected, |a, b| a > b),
        }
    }

    fn into_comparator(self) -> Comparator {
        Comparator {
            func: Arc::new(move |resolved: &Value, literal: &Literal| {
                self.compare(resolved, literal)
            }),
            application: self.application(),
        }
    }
}

impl fmt::Display for BuiltinComparator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 相等比较，类型不同一律不等
fn equals(resolved: &Value, expected: &Value) -> bool {
    resolved == expected
}

/// 排序比较，只支持同类型的字符串或数值
fn ordering(resolved: &Value, expected: &Value, accept: fn(Ordering) -> bool) -> bool {
    let ord = match (resolved, expected) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        _ => None,
    };
    ord.is_some_and(accept)
}

/// 范围比较，expected 为 [min, max]（闭区间）
fn between(resolved: &Value, expected: &Value) -> bool {
    match expected.as_sequence() {
        Some([min, max]) => {
            ordering(resolved, min, Ordering::is_ge) && ordering(resolved, max, Ordering::is_le)
        }
        _ => false,
    }
}

/// 字符串/序列包含检查
///
/// 形状不对（既不是序列也不是字符串，或字面量不是标量）时返回 None，
/// contains 与 not-contains 此时都为 false。
fn contains(resolved: &Value, expected: &Value) -> Option<bool> {
    if !expected.is_scalar() {
        return None;
    }
    match (resolved, expected) {
        (Value::Sequence(items), _) => Some(items.iter().any(|item| item == expected)),
        (Value::String(s), Value::String(sub)) => Some(s.contains(sub.as_str())),
        _ => None,
    }
}

/// 序列包含字面量列表中的任意一个
fn contains_any(resolved: &Value, literal: &Literal) -> bool {
    match resolved.as_sequence() {
        Some(items) if literal.members().is_some() => {
            items.iter().any(|item| literal.has_member(item))
        }
        _ => false,
    }
}

/// 序列包含字面量列表中的全部元素
fn contains_all(resolved: &Value, expected: &Value) -> bool {
    match (resolved.as_sequence(), expected.as_sequence()) {
        (Some(items), Some(required)) => required.iter().all(|r| items.contains(r)),
        _ => false,
    }
}

fn strings<'a>(resolved: &'a Value, expected: &'a Value) -> Option<(&'a str, &'a str)> {
    Some((resolved.as_str()?, expected.as_str()?))
}

/// 时间比较，任一侧无法解析时返回 false
fn time_compare<F>(resolved: &Value, expected: &Value, cmp: F) -> bool
where
    F: Fn(DateTime<Utc>, DateTime<Utc>) -> bool,
{
    match (parse_datetime(resolved), parse_datetime(expected)) {
        (Some(a), Some(b)) => cmp(a, b),
        _ => false,
    }
}

/// 解析 RFC 3339 时间或 `YYYY-MM-DD` 日期
fn parse_datetime(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?;

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// 比较器注册表
///
/// 按名称查找比较器。注册会覆盖同名条目；注册表在求值期间只读。
#[derive(Debug, Clone, Default)]
pub struct ComparatorRegistry {
    entries: HashMap<String, Comparator>,
}

impl ComparatorRegistry {
    /// 空注册表
    pub fn empty() -> Self {
        Self::default()
    }

    /// 带全部内置比较器（含别名）的注册表
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        for builtin in BuiltinComparator::ALL {
            let comparator = builtin.into_comparator();
            for alias in builtin.aliases() {
                registry.insert(*alias, comparator.clone());
            }
            registry.insert(builtin.name(), comparator);
        }
        registry
    }

    /// 注册比较器，多值路径下接收整个分组
    pub fn register<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&Value, &Literal) -> bool + Send + Sync + 'static,
    {
        self.insert(name, Comparator::per_group(func))
    }

    /// 注册逐元素比较器，多值路径下对每个元素分别调用
    pub fn register_element<F>(&mut self, name: impl Into<String>, func: F) -> &mut Self
    where
        F: Fn(&Value, &Literal) -> bool + Send + Sync + 'static,
    {
        self.insert(name, Comparator::per_element(func))
    }

    pub fn insert(&mut self, name: impl Into<String>, comparator: Comparator) -> &mut Self {
        self.entries.insert(name.into(), comparator);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Comparator> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// 已注册的名称（排序后）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
