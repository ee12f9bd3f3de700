//! 多值聚合
//!
//! 路径命中数组或经过通配符时，解析结果是若干分组。例如
//! `friends.#.episodes` 每个 friend 贡献一组 episodes。
//!
//! - 分组比较器（如 contains）对每个分组整体调用一次；
//! - 逐元素比较器（如 equals）对分组内每个元素调用，组内与组间使用同一个操作符折叠。
//!
//! 折叠操作符来自条件自身：`or` 任一为真即可，`and`（默认）要求全部为真。

use crate::comparators::{Application, Comparator};
use crate::literal::Literal;
use crate::operators::LogicalOperator;
use crate::value::Value;
use tracing::trace;

/// 对分组应用比较器并折叠结果
pub fn fold_groups(
    groups: &[Vec<Value>],
    comparator: &Comparator,
    literal: &Literal,
    operator: &LogicalOperator,
) -> bool {
    if groups.is_empty() {
        return false;
    }

    let matched = operator.fold(
        groups
            .iter()
            .map(|group| evaluate_group(group, comparator, literal, operator)),
    );

    trace!(groups = groups.len(), %operator, matched, "多值折叠完成");
    matched
}

fn evaluate_group(
    group: &[Value],
    comparator: &Comparator,
    literal: &Literal,
    operator: &LogicalOperator,
) -> bool {
    match comparator.application() {
        Application::PerGroup => comparator.compare(&Value::Sequence(group.to_vec()), literal),
        // 空分组没有可比较的元素
        Application::PerElement if group.is_empty() => false,
        Application::PerElement => operator.fold(
            group
                .iter()
                .map(|value| comparator.compare(value, literal)),
        ),
    }
}
