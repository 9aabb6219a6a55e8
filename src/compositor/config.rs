//! ### English
//! Swapper configuration with environment overrides.
//!
//! | Variable                     | Values              | Default |
//! |------------------------------|---------------------|---------|
//! | `COMPOSITOR_SWAPPER_KIND`    | `double` / `multi`  | `multi` |
//! | `COMPOSITOR_SWAPPER_BUFFERS` | `2..=5`             | `3`     |
//!
//! Unparseable values fall back to the default; range checking happens when the strategy is
//! built, so a bad count surfaces as [`crate::StrategyError::InvalidBufferCount`].
//!
//! ### 中文
//! 支持环境变量覆盖的 swapper 配置。
//!
//! 无法解析的值回退到默认值；范围检查在构建策略时进行，非法数量会以
//! [`crate::StrategyError::InvalidBufferCount`] 报告。
use std::str::FromStr;

use super::error::ParseSwapperKindError;
use super::strategy::SwapperKind;

pub const ENV_SWAPPER_KIND: &str = "COMPOSITOR_SWAPPER_KIND";
pub const ENV_SWAPPER_BUFFERS: &str = "COMPOSITOR_SWAPPER_BUFFERS";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SwapperConfig {
    pub kind: SwapperKind,
    pub buffer_count: usize,
}

impl Default for SwapperConfig {
    fn default() -> Self {
        Self {
            kind: SwapperKind::Multi,
            buffer_count: 3,
        }
    }
}

impl FromStr for SwapperKind {
    type Err = ParseSwapperKindError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "double" => Ok(Self::Double),
            "multi" => Ok(Self::Multi),
            _ => Err(ParseSwapperKindError(value.to_owned())),
        }
    }
}

impl SwapperConfig {
    /// ### English
    /// Reads overrides from the process environment.
    ///
    /// ### 中文
    /// 从进程环境变量读取覆盖值。
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// ### English
    /// Reads overrides through `lookup` (the environment, a config file, a test map...).
    ///
    /// Choosing `double` without an explicit count implies two buffers.
    ///
    /// ### 中文
    /// 通过 `lookup` 读取覆盖值（环境变量、配置文件、测试用 map 等）。
    ///
    /// 选择 `double` 且未显式指定数量时，数量默认为 2。
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let kind = lookup_parsed(&lookup, ENV_SWAPPER_KIND).unwrap_or(defaults.kind);
        let implied_count = match kind {
            SwapperKind::Double => 2,
            SwapperKind::Multi => defaults.buffer_count,
        };
        let buffer_count = lookup_parsed(&lookup, ENV_SWAPPER_BUFFERS).unwrap_or(implied_count);
        Self { kind, buffer_count }
    }
}

#[inline]
fn lookup_parsed<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(err) => {
            log::warn!("ignoring {key}={raw:?}: {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> SwapperConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        SwapperConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_triple_buffering() {
        assert_eq!(config(&[]), SwapperConfig::default());
        assert_eq!(SwapperConfig::default().kind, SwapperKind::Multi);
        assert_eq!(SwapperConfig::default().buffer_count, 3);
    }

    #[test]
    fn double_implies_two_buffers() {
        let config = config(&[(ENV_SWAPPER_KIND, "Double")]);
        assert_eq!(config.kind, SwapperKind::Double);
        assert_eq!(config.buffer_count, 2);
    }

    #[test]
    fn explicit_count_wins() {
        let config = config(&[(ENV_SWAPPER_KIND, "multi"), (ENV_SWAPPER_BUFFERS, " 5 ")]);
        assert_eq!(config.kind, SwapperKind::Multi);
        assert_eq!(config.buffer_count, 5);
    }

    #[test]
    fn garbage_falls_back_to_defaults() {
        let config = config(&[(ENV_SWAPPER_KIND, "quad"), (ENV_SWAPPER_BUFFERS, "lots")]);
        assert_eq!(config, SwapperConfig::default());
    }

    #[test]
    fn unknown_kind_reports_the_value() {
        assert_eq!("Double ".parse::<SwapperKind>(), Ok(SwapperKind::Double));
        let err = "quad".parse::<SwapperKind>().unwrap_err();
        assert_eq!(err, ParseSwapperKindError("quad".to_owned()));
        assert!(err.to_string().contains("quad"));
    }

    #[test]
    fn unset_environment_yields_defaults() {
        // The test harness never sets these variables.
        if std::env::var(ENV_SWAPPER_KIND).is_err() && std::env::var(ENV_SWAPPER_BUFFERS).is_err() {
            assert_eq!(SwapperConfig::from_env(), SwapperConfig::default());
        }
    }
}
