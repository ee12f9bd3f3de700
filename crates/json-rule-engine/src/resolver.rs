//! 路径解析
//!
//! 按点号分隔的路径从记录中取值。路径段可以是：
//! - 字段名：进入对象
//! - 数字：按下标进入数组，如 `items.0.name`
//! - 通配符（默认 `#`）：对数组中每个元素继续解析剩余路径，如 `friends.#.episodes`
//!
//! 落在标量上得到单个值；落在数组上或经过通配符时得到按分支分组的值。

use crate::value::Value;
use serde_json::Value as JsonValue;
use std::fmt;

/// 路径语法
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSyntax {
    pub separator: char,
    pub wildcard: String,
}

impl Default for PathSyntax {
    fn default() -> Self {
        Self {
            separator: '.',
            wildcard: "#".to_string(),
        }
    }
}

/// 解析结果
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// 路径落在标量上
    Single(Value),
    /// 路径落在数组上或经过了通配符，每个分支一组
    Groups(Vec<Vec<Value>>),
}

impl Resolved {
    /// 遍历所有解析出的值
    pub fn values(&self) -> Box<dyn Iterator<Item = &Value> + '_> {
        match self {
            Self::Single(value) => Box::new(std::iter::once(value)),
            Self::Groups(groups) => Box::new(groups.iter().flatten()),
        }
    }
}

/// 解析失败的原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Miss {
    NotFound,
    /// 命中了无法作为比较值的 JSON 类型
    Unsupported(&'static str),
}

impl fmt::Display for Miss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "路径不存在"),
            Self::Unsupported(kind) => write!(f, "路径命中了不支持的类型 {}", kind),
        }
    }
}

/// 路径遍历的中间结果，借用记录中的数据
enum Found<'a> {
    Json(&'a JsonValue),
    Fanout(Vec<Found<'a>>),
}

/// 从记录中解析路径
pub fn resolve(record: &JsonValue, path: &str, syntax: &PathSyntax) -> Result<Resolved, Miss> {
    let segments: Vec<&str> = path.split(syntax.separator).collect();
    let found = walk(record, &segments, &syntax.wildcard).ok_or(Miss::NotFound)?;

    match &found {
        Found::Json(JsonValue::Array(_)) | Found::Fanout(_) => {
            let mut groups = Vec::new();
            collect_groups(&found, &mut groups)?;
            Ok(Resolved::Groups(groups))
        }
        Found::Json(json) => scalar(json).map(Resolved::Single),
    }
}

fn walk<'a>(current: &'a JsonValue, segments: &[&str], wildcard: &str) -> Option<Found<'a>> {
    let Some((head, rest)) = segments.split_first() else {
        return Some(Found::Json(current));
    };

    if *head == wildcard {
        let branches: Vec<Found<'a>> = current
            .as_array()?
            .iter()
            .filter_map(|item| walk(item, rest, wildcard))
            .collect();

        if branches.is_empty() {
            return None;
        }
        return Some(Found::Fanout(branches));
    }

    match current {
        JsonValue::Object(map) => walk(map.get(*head)?, rest, wildcard),
        JsonValue::Array(arr) => {
            let index: usize = head.parse().ok()?;
            walk(arr.get(index)?, rest, wildcard)
        }
        _ => None,
    }
}

/// 数组的直接标量组成一组，嵌套数组各自递归展开成组
///
/// 空数组仍然是一个（空的）候选集合，经过通配符到达时也不会被丢弃。
fn collect_groups(node: &Found<'_>, groups: &mut Vec<Vec<Value>>) -> Result<(), Miss> {
    let mut own = Vec::new();

    match node {
        Found::Json(JsonValue::Array(items)) if items.is_empty() => {
            groups.push(own);
            return Ok(());
        }
        Found::Json(JsonValue::Array(items)) => {
            for item in items {
                visit(&Found::Json(item), &mut own, groups)?;
            }
        }
        Found::Fanout(branches) => {
            for branch in branches {
                visit(branch, &mut own, groups)?;
            }
        }
        Found::Json(json) => own.push(scalar(json)?),
    }

    if !own.is_empty() {
        groups.push(own);
    }
    Ok(())
}

fn visit(
    node: &Found<'_>,
    own: &mut Vec<Value>,
    groups: &mut Vec<Vec<Value>>,
) -> Result<(), Miss> {
    match node {
        Found::Json(JsonValue::Array(_)) | Found::Fanout(_) => collect_groups(node, groups),
        Found::Json(json) => {
            own.push(scalar(json)?);
            Ok(())
        }
    }
}

fn scalar(json: &JsonValue) -> Result<Value, Miss> {
    match json {
        JsonValue::Null => Err(Miss::Unsupported("null")),
        JsonValue::Object(_) => Err(Miss::Unsupported("object")),
        other => Value::from_json(other).ok_or(Miss::Unsupported("number")),
    }
}
