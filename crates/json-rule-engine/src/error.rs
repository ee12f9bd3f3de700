//! 规则引擎错误类型
//!
//! 只有构造阶段（解析、校验、加载配置）会返回错误，求值阶段的任何失败都折叠为 `false`。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("规则 '{at}' 同时设置了 path/comparator/value 与 operator/rules，两种形式只能选择一种")]
    BothForms { at: String },

    #[error("规则 '{at}' 必须设置 path/comparator/value 或 operator/rules 其中一种形式")]
    NeitherForm { at: String },

    #[error("规则 '{at}' 缺少字段: {field}")]
    MissingField { at: String, field: &'static str },

    #[error("逻辑组 '{at}' 的 rules 不能为空")]
    EmptyGroup { at: String },

    #[error("规则 '{at}' 的 value 无效: {reason}")]
    InvalidLiteral { at: String, reason: String },

    #[error("规则嵌套过深: 深度 {depth} 超过上限 {max}")]
    TooDeep { depth: usize, max: usize },

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("配置加载失败: {0}")]
    ConfigError(#[from] config::ConfigError),
}

pub type Result<T> = std::result::Result<T, RuleError>;
