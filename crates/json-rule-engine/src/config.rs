//! 引擎配置
//!
//! 支持从配置文件加载，环境变量覆盖。

use crate::error::Result;
use crate::resolver::PathSyntax;
use config::{Config, Environment, File, Map};
use serde::Deserialize;
use std::path::Path;

/// 引擎配置
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// 路径分隔符
    pub separator: char,
    /// 通配符路径段，对数组的每个元素展开
    pub wildcard: String,
    /// 规则树允许的最大嵌套深度
    pub max_depth: usize,
    /// 是否记录评估追踪
    pub trace: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            separator: '.',
            wildcard: "#".to_string(),
            max_depth: 64,
            trace: false,
        }
    }
}

impl EngineConfig {
    /// 从配置目录和环境变量加载配置
    ///
    /// 加载顺序（后加载的会覆盖先加载的同名配置项）：
    /// 1. 内置默认值
    /// 2. {config_dir}/rule-engine.toml（可选）
    /// 3. 环境变量（RULE_ENGINE_ 前缀，如 RULE_ENGINE_MAX_DEPTH -> max_depth）
    pub fn load(config_dir: impl AsRef<Path>) -> Result<Self> {
        Self::load_with_env(config_dir, None)
    }

    /// 同 [`EngineConfig::load`]，`env` 为 `Some` 时用给定的变量表代替进程环境变量
    fn load_with_env(
        config_dir: impl AsRef<Path>,
        env: Option<Map<String, String>>,
    ) -> Result<Self> {
        let defaults = Self::default();

        let config: Self = Config::builder()
            .set_default("separator", defaults.separator.to_string())?
            .set_default("wildcard", defaults.wildcard)?
            .set_default("max_depth", defaults.max_depth as i64)?
            .set_default("trace", defaults.trace)?
            .add_source(File::from(config_dir.as_ref().join("rule-engine.toml")).required(false))
            .add_source(
                Environment::with_prefix("RULE_ENGINE")
                    .prefix_separator("_")
                    .try_parsing(true)
                    .source(env),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    pub fn path_syntax(&self) -> PathSyntax {
        PathSyntax {
            separator: self.separator,
            wildcard: self.wildcard.clone(),
        }
    }
}
