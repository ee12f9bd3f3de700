//! 规则编译器
//!
//! 校验规则树并预提取字段路径。结构性校验（两种形式互斥、字段齐全）在解析时完成，
//! 这里负责与引擎配置相关的校验，例如嵌套深度上限。

use crate::error::{Result, RuleError};
use crate::models::{Condition, Rule};
use std::collections::BTreeSet;
use tracing::debug;

/// 编译后的规则
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledRule {
    /// 原始规则
    pub rule: Rule,
    /// 规则中使用的所有字段路径
    pub required_fields: BTreeSet<String>,
    /// 规则树深度
    pub depth: usize,
}

impl CompiledRule {
    /// 获取根节点
    pub fn root(&self) -> &Rule {
        &self.rule
    }
}

/// 规则编译器
#[derive(Debug, Clone)]
pub struct RuleCompiler {
    max_depth: usize,
}

impl RuleCompiler {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// 从 JSON 字符串编译规则
    pub fn compile_from_json(&self, json: &str) -> Result<CompiledRule> {
        self.compile(Rule::from_json(json)?)
    }

    /// 编译规则
    ///
    /// 代码构造的规则没有经过线上格式的解析校验，这里重新校验一遍结构。
    pub fn compile(&self, rule: Rule) -> Result<CompiledRule> {
        self.validate_node(&rule, "root")?;

        let depth = rule.depth();
        if depth > self.max_depth {
            return Err(RuleError::TooDeep {
                depth,
                max: self.max_depth,
            });
        }

        let required_fields = rule.fields();
        debug!(depth, fields = required_fields.len(), "规则编译完成");

        Ok(CompiledRule {
            rule,
            required_fields,
            depth,
        })
    }

    /// 验证规则节点
    fn validate_node(&self, node: &Rule, path: &str) -> Result<()> {
        match node {
            Rule::Leaf(cond) => self.validate_condition(cond, path)?,
            Rule::Group(group) => {
                if group.rules.is_empty() {
                    return Err(RuleError::EmptyGroup {
                        at: path.to_string(),
                    });
                }

                for (i, child) in group.rules.iter().enumerate() {
                    let child_path = format!("{}.rules[{}]", path, i);
                    self.validate_node(child, &child_path)?;
                }
            }
        }

        Ok(())
    }

    /// 验证条件
    fn validate_condition(&self, cond: &Condition, path: &str) -> Result<()> {
        let missing = if cond.path.is_empty() {
            Some("path")
        } else if cond.comparator.is_empty() {
            Some("comparator")
        } else {
            None
        };

        match missing {
            Some(field) => Err(RuleError::MissingField {
                at: path.to_string(),
                field,
            }),
            None => Ok(()),
        }
    }
}

impl Default for RuleCompiler {
    fn default() -> Self {
        Self::new(64)
    }
}
