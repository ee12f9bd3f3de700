//! 类型匹配
//!
//! 比较器运行前，解析出的每个值（数组逐元素递归）都必须与字面量同类型，
//! 任何一个元素不匹配都使整个条件不成立，且不会调用比较器。

use crate::literal::Literal;
use crate::resolver::Resolved;
use crate::value::{Value, ValueKind};

/// 检查解析结果是否与字面量类型一致
pub fn matches(resolved: &Resolved, literal: &Literal) -> bool {
    let kinds = literal.kinds();
    resolved.values().all(|value| value_matches(value, &kinds))
}

/// 第一个类型不匹配的值，用于诊断信息
pub fn first_mismatch<'a>(resolved: &'a Resolved, literal: &Literal) -> Option<&'a Value> {
    let kinds = literal.kinds();
    resolved.values().find(|value| !value_matches(value, &kinds))
}

fn value_matches(value: &Value, kinds: &[ValueKind]) -> bool {
    match value {
        Value::Sequence(items) => items.iter().all(|item| value_matches(item, kinds)),
        scalar => kinds.contains(&scalar.kind()),
    }
}
