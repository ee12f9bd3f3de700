//! JSON 规则引擎
//!
//! 对 JSON 记录求值声明式布尔规则，支持：
//! - JSON 规则定义和结构校验
//! - 点分路径与通配符多值解析
//! - 可扩展的比较器注册表
//! - 多值结果按 AND/OR 折叠
//! - 短路求值与评估追踪

pub mod aggregator;
pub mod comparators;
pub mod compiler;
pub mod config;
pub mod engine;
pub mod error;
pub mod executor;
pub mod literal;
pub mod matcher;
pub mod models;
pub mod operators;
pub mod resolver;
pub mod value;

pub use comparators::{Application, BuiltinComparator, Comparator, ComparatorRegistry};
pub use compiler::{CompiledRule, RuleCompiler};
pub use crate::config::EngineConfig;
pub use engine::{Engine, SharedEngine};
pub use error::{Result, RuleError};
pub use executor::{EvaluationResult, RuleExecutor};
pub use literal::Literal;
pub use models::{Condition, LogicalGroup, RawRule, Rule};
pub use operators::LogicalOperator;
pub use resolver::{resolve, Miss, PathSyntax, Resolved};
pub use value::{Value, ValueKind};
