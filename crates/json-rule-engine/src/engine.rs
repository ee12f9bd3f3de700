//! 规则引擎入口
//!
//! `Engine` 持有比较器注册表和一棵或多棵顶层规则树（多棵之间按 AND 组合），
//! 构造一次、对不同记录反复求值。求值只读，可以在多线程间共享；
//! 注册比较器属于构造阶段操作，需要在共享前完成。构造完成后仍需注册时使用
//! [`SharedEngine`]，由读写锁保证注册与求值互斥。

use crate::comparators::{Comparator, ComparatorRegistry};
use crate::compiler::{CompiledRule, RuleCompiler};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::executor::{EvaluationResult, RuleExecutor};
use crate::literal::Literal;
use crate::models::{self, RawRule, Rule};
use crate::resolver::PathSyntax;
use crate::value::Value;
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, instrument};

/// 多棵规则树的线上格式
#[derive(Debug, Deserialize)]
struct CompositeDocument {
    composites: Vec<RawRule>,
}

/// 规则引擎
#[derive(Debug, Clone)]
pub struct Engine {
    rules: Vec<CompiledRule>,
    registry: ComparatorRegistry,
    compiler: RuleCompiler,
    syntax: PathSyntax,
    trace_enabled: bool,
}

impl Engine {
    /// 使用默认配置和内置比较器创建空引擎
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            rules: Vec::new(),
            registry: ComparatorRegistry::with_defaults(),
            compiler: RuleCompiler::new(config.max_depth),
            syntax: config.path_syntax(),
            trace_enabled: config.trace,
        }
    }

    /// 由单棵规则树创建引擎
    pub fn from_rule(rule: Rule) -> Result<Self> {
        let mut engine = Self::new();
        engine.add_rule(rule)?;
        Ok(engine)
    }

    /// 从 JSON 字符串创建引擎
    ///
    /// 接受单个规则，或 `{"composites": [规则, ...]}` 形式的多棵规则树。
    pub fn from_json(json: &str) -> Result<Self> {
        let value: JsonValue = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// 从已解析的 JSON 值创建引擎
    pub fn from_value(value: JsonValue) -> Result<Self> {
        Self::new().load_value(value)
    }

    /// 在当前配置下加载 JSON 规则定义
    #[instrument(skip(self, value))]
    pub fn load_value(mut self, value: JsonValue) -> Result<Self> {
        if value.get("composites").is_some() {
            let document: CompositeDocument = serde_json::from_value(value)?;
            for (i, raw) in document.composites.into_iter().enumerate() {
                let rule = models::convert(raw, &format!("composites[{}]", i))?;
                self.add_rule(rule)?;
            }
        } else {
            self.add_rule(Rule::from_value(value)?)?;
        }

        info!("规则已加载: {} 棵规则树", self.rules.len());
        Ok(self)
    }

    /// 添加一棵顶层规则树
    pub fn add_rule(&mut self, rule: Rule) -> Result<&mut Self> {
        let compiled = self.compiler.compile(rule)?;
        self.rules.push(compiled);
        Ok(self)
    }

    /// 注册比较器（多值路径下接收整个分组），同名覆盖
    pub fn register_comparator<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value, &Literal) -> bool + Send + Sync + 'static,
    {
        self.insert_comparator(name.into(), Comparator::per_group(func));
        self
    }

    /// 注册逐元素比较器，同名覆盖
    pub fn register_element_comparator<F>(mut self, name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value, &Literal) -> bool + Send + Sync + 'static,
    {
        self.insert_comparator(name.into(), Comparator::per_element(func));
        self
    }

    fn insert_comparator(&mut self, name: String, comparator: Comparator) {
        info!(comparator = %name, "注册比较器");
        self.registry.insert(name, comparator);
    }

    pub fn registry(&self) -> &ComparatorRegistry {
        &self.registry
    }

    pub fn rules(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter().map(CompiledRule::root)
    }

    /// 所有规则树读取的字段路径
    pub fn required_fields(&self) -> BTreeSet<String> {
        self.rules
            .iter()
            .flat_map(|compiled| compiled.required_fields.iter().cloned())
            .collect()
    }

    fn executor(&self) -> RuleExecutor<'_> {
        let executor = RuleExecutor::new(&self.registry, &self.syntax);
        if self.trace_enabled {
            executor.with_trace()
        } else {
            executor
        }
    }

    /// 对记录求值，所有规则树都满足时返回 true；没有规则时返回 true
    pub fn evaluate(&self, record: &JsonValue) -> bool {
        let executor = self.executor();
        self.rules
            .iter()
            .all(|compiled| executor.evaluate(compiled.root(), record))
    }

    /// 解析 JSON 记录后求值
    pub fn evaluate_json(&self, record: &str) -> Result<bool> {
        let record: JsonValue = serde_json::from_str(record)?;
        Ok(self.evaluate(&record))
    }

    /// 求值并返回诊断信息，遇到第一棵不满足的规则树即停止
    pub fn execute(&self, record: &JsonValue) -> EvaluationResult {
        let executor = self.executor();
        let mut combined = EvaluationResult {
            matched: true,
            ..EvaluationResult::default()
        };

        for compiled in &self.rules {
            let result = executor.execute(compiled.root(), record);
            combined.matched_conditions.extend(result.matched_conditions);
            combined.evaluation_trace.extend(result.evaluation_trace);
            if !result.matched {
                combined.matched = false;
                combined.reason = result.reason;
                break;
            }
        }

        combined
    }

    /// 编码回线上格式：单棵规则树直接输出，否则使用 composites 包装
    pub fn to_json(&self) -> JsonValue {
        match self.rules.as_slice() {
            [single] => single.rule.to_json(),
            rules => json!({
                "composites": rules.iter().map(|c| c.rule.to_json()).collect::<Vec<_>>()
            }),
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

/// 可在线程间共享、构造后仍可注册比较器的引擎
///
/// 求值持有读锁，注册和添加规则持有写锁。
#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<RwLock<Engine>>,
}

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    pub fn evaluate(&self, record: &JsonValue) -> bool {
        self.inner.read().evaluate(record)
    }

    pub fn execute(&self, record: &JsonValue) -> EvaluationResult {
        self.inner.read().execute(record)
    }

    pub fn register_comparator<F>(&self, name: impl Into<String>, func: F)
    where
        F: Fn(&Value, &Literal) -> bool + Send + Sync + 'static,
    {
        self.inner
            .write()
            .insert_comparator(name.into(), Comparator::per_group(func));
    }

    pub fn register_element_comparator<F>(&self, name: impl Into<String>, func: F)
    where
        F: Fn(&Value, &Literal) -> bool + Send + Sync + 'static,
    {
        self.inner
            .write()
            .insert_comparator(name.into(), Comparator::per_element(func));
    }

    pub fn add_rule(&self, rule: Rule) -> Result<()> {
        self.inner.write().add_rule(rule)?;
        Ok(())
    }

    /// 当前引擎的快照
    pub fn snapshot(&self) -> Engine {
        self.inner.read().clone()
    }
}

impl From<Engine> for SharedEngine {
    fn from(engine: Engine) -> Self {
        Self::new(engine)
    }
}
