//! 逻辑操作符定义

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 逻辑操作符
///
/// 无法识别的操作符不会导致解析失败，而是原样保留，求值时一律返回 false。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalOperator {
    And,
    Or,
    Unrecognized(String),
}

impl LogicalOperator {
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("and") {
            Self::And
        } else if s.eq_ignore_ascii_case("or") {
            Self::Or
        } else {
            Self::Unrecognized(s.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Unrecognized(s) => s,
        }
    }

    /// 按操作符折叠布尔序列（短路）
    pub fn fold<I>(&self, results: I) -> bool
    where
        I: IntoIterator<Item = bool>,
    {
        let mut results = results.into_iter();
        match self {
            Self::And => results.all(|r| r),
            Self::Or => results.any(|r| r),
            Self::Unrecognized(_) => false,
        }
    }
}

impl Default for LogicalOperator {
    fn default() -> Self {
        Self::And
    }
}

impl fmt::Display for LogicalOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::And => write!(f, "AND"),
            Self::Or => write!(f, "OR"),
            Self::Unrecognized(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for LogicalOperator {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl Serialize for LogicalOperator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for LogicalOperator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Self::parse(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_case_insensitive() {
        assert_eq!(LogicalOperator::parse("and"), LogicalOperator::And);
        assert_eq!(LogicalOperator::parse("AND"), LogicalOperator::And);
        assert_eq!(LogicalOperator::parse("Or"), LogicalOperator::Or);
        assert_eq!(
            LogicalOperator::parse("xor"),
            LogicalOperator::Unrecognized("xor".to_string())
        );
    }

    #[test]
    fn test_fold() {
        assert!(LogicalOperator::And.fold([true, true]));
        assert!(!LogicalOperator::And.fold([true, false]));
        assert!(LogicalOperator::Or.fold([false, true]));
        assert!(!LogicalOperator::Or.fold([false, false]));
        assert!(!LogicalOperator::parse("xor").fold([true, true]));
    }

    #[test]
    fn test_serde_round_trip() {
        let op: LogicalOperator = serde_json::from_str(r#""OR""#).unwrap();
        assert_eq!(op, LogicalOperator::Or);
        assert_eq!(serde_json::to_string(&op).unwrap(), r#""or""#);

        let op: LogicalOperator = serde_json::from_str(r#""nand""#).unwrap();
        assert_eq!(serde_json::to_string(&op).unwrap(), r#""nand""#);
    }
}
