//! Configuration validation.
//!
//! Builds the run settings, `RiskConfig` and `Strategy` from a `ConfigPort`,
//! reporting the offending section and key for every malformed value.

use crate::domain::composite::{CompositeConfig, CompositeWeights};
use crate::domain::condition::{ConditionGroup, OrderType};
use crate::domain::condition_parser::parse_condition;
use crate::domain::error::StratsimError;
use crate::domain::risk::{ExecutionTiming, ProductType, RiskConfig};
use crate::domain::strategy::{ConditionRules, SignalMode, Strategy};
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub const DEFAULT_INTERVAL: &str = "1h";

/// Where the candles for a run come from.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub symbols: Vec<String>,
    pub interval: String,
    pub data_dir: Option<String>,
    pub start_ms: Option<i64>,
    pub end_ms: Option<i64>,
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StratsimError {
    StratsimError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn non_empty(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn read_parsed<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, StratsimError> {
    match non_empty(config, section, key) {
        None => Ok(default),
        Some(s) => s
            .parse::<T>()
            .map_err(|_| invalid(section, key, format!("cannot parse '{}'", s))),
    }
}

fn read_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, StratsimError> {
    let value: f64 = read_parsed(config, section, key, default)?;
    if !value.is_finite() {
        return Err(invalid(section, key, "must be a finite number"));
    }
    Ok(value)
}

fn read_period(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, StratsimError> {
    let value: usize = read_parsed(config, section, key, default)?;
    if value == 0 {
        return Err(invalid(section, key, "must be at least 1"));
    }
    Ok(value)
}

fn parse_date(config: &dyn ConfigPort, key: &str) -> Result<Option<NaiveDate>, StratsimError> {
    match non_empty(config, "backtest", key) {
        None => Ok(None),
        Some(s) => NaiveDate::parse_from_str(&s, "%Y-%m-%d")
            .map(Some)
            .map_err(|_| invalid("backtest", key, format!("invalid {} format, expected YYYY-MM-DD", key))),
    }
}

fn day_start_ms(date: NaiveDate) -> Option<i64> {
    date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc().timestamp_millis())
}

fn day_end_ms(date: NaiveDate) -> Option<i64> {
    date.and_hms_milli_opt(23, 59, 59, 999)
        .map(|dt| dt.and_utc().timestamp_millis())
}

pub fn build_run_settings(config: &dyn ConfigPort) -> Result<RunSettings, StratsimError> {
    let symbols: Vec<String> = match (
        non_empty(config, "backtest", "symbols"),
        non_empty(config, "backtest", "symbol"),
    ) {
        (Some(list), _) => list
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect(),
        (None, Some(single)) => vec![single.to_uppercase()],
        (None, None) => Vec::new(),
    };
    if symbols.is_empty() {
        return Err(StratsimError::ConfigMissing {
            section: "backtest".to_string(),
            key: "symbol".to_string(),
        });
    }

    let interval =
        non_empty(config, "backtest", "interval").unwrap_or_else(|| DEFAULT_INTERVAL.to_string());

    let start = parse_date(config, "start_date")?;
    let end = parse_date(config, "end_date")?;
    if let (Some(s), Some(e)) = (start, end) {
        if s > e {
            return Err(invalid(
                "backtest",
                "start_date",
                "start_date must not be after end_date",
            ));
        }
    }

    Ok(RunSettings {
        symbols,
        interval,
        data_dir: non_empty(config, "backtest", "data_dir"),
        start_ms: start.and_then(day_start_ms),
        end_ms: end.and_then(day_end_ms),
    })
}

pub fn build_risk_config(config: &dyn ConfigPort) -> Result<RiskConfig, StratsimError> {
    let defaults = RiskConfig::default();
    let execution_timing = match non_empty(config, "risk", "execution_timing") {
        None => ExecutionTiming::default(),
        Some(s) => s
            .parse()
            .map_err(|reason: String| invalid("risk", "execution_timing", reason))?,
    };
    let product_type = match non_empty(config, "risk", "product_type") {
        None => ProductType::default(),
        Some(s) => s
            .parse()
            .map_err(|reason: String| invalid("risk", "product_type", reason))?,
    };

    let risk = RiskConfig {
        initial_balance: read_double(config, "risk", "initial_balance", defaults.initial_balance)?,
        stop_loss_percent: read_double(config, "risk", "stop_loss_percent", 0.0)?,
        take_profit_percent: read_double(config, "risk", "take_profit_percent", 0.0)?,
        position_size_percent: read_double(
            config,
            "risk",
            "position_size_percent",
            defaults.position_size_percent,
        )?,
        leverage: read_double(config, "risk", "leverage", defaults.leverage)?,
        maker_fee_percent: read_double(config, "risk", "maker_fee_percent", 0.0)?,
        taker_fee_percent: read_double(config, "risk", "taker_fee_percent", 0.0)?,
        slippage_percent: read_double(config, "risk", "slippage_percent", 0.0)?,
        execution_timing,
        product_type,
    };

    risk.validate().map_err(|e| match e {
        StratsimError::InvalidRiskConfig { field, reason } => invalid("risk", field, reason),
        other => other,
    })?;
    Ok(risk)
}

/// `<prefix>` followed by `<prefix>_1`, `<prefix>_2`, ... up to the first gap.
fn condition_lines(config: &dyn ConfigPort, prefix: &str) -> Vec<(String, String)> {
    let mut lines = Vec::new();
    if let Some(line) = non_empty(config, "strategy", prefix) {
        lines.push((prefix.to_string(), line));
    }
    for n in 1.. {
        let key = format!("{}_{}", prefix, n);
        match non_empty(config, "strategy", &key) {
            Some(line) => lines.push((key, line)),
            None => break,
        }
    }
    lines
}

/// Numbered `prefix_N` keys that `condition_lines` never reaches because
/// the numbering has a gap before them.
fn unreachable_condition_keys(
    config: &dyn ConfigPort,
    prefix: &str,
    read: &[(String, String)],
) -> Vec<String> {
    config
        .keys("strategy")
        .into_iter()
        .filter(|key| {
            key.strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix('_'))
                .is_some_and(|n| n.parse::<usize>().is_ok())
        })
        .filter(|key| !read.iter().any(|(k, _)| k == key))
        .collect()
}

fn build_group(
    config: &dyn ConfigPort,
    prefix: &str,
    order_type: OrderType,
) -> Result<ConditionGroup, StratsimError> {
    let lines = condition_lines(config, prefix);
    for key in unreachable_condition_keys(config, prefix, &lines) {
        tracing::warn!(key = %key, "condition key ignored: numbered keys must be contiguous from 1");
    }
    let mut conditions = Vec::new();
    for (key, line) in lines {
        match parse_condition(&line, order_type) {
            Ok(condition) => conditions.push(condition),
            Err(e) => {
                return Err(StratsimError::InvalidCondition {
                    key,
                    line,
                    source: Box::new(e),
                })
            }
        }
    }
    Ok(ConditionGroup::new(conditions))
}

fn build_composite(config: &dyn ConfigPort) -> Result<CompositeConfig, StratsimError> {
    let d = CompositeConfig::default();
    let band_mult = read_double(
        config,
        "composite",
        "band_stddev_mult",
        d.band_stddev_mult_x100 as f64 / 100.0,
    )?;
    if band_mult < 0.0 {
        return Err(invalid("composite", "band_stddev_mult", "must be non-negative"));
    }

    let composite = CompositeConfig {
        weights: CompositeWeights {
            momentum: read_double(config, "composite", "momentum_weight", d.weights.momentum)?,
            trend: read_double(config, "composite", "trend_weight", d.weights.trend)?,
            volatility: read_double(config, "composite", "volatility_weight", d.weights.volatility)?,
            relative_strength: read_double(
                config,
                "composite",
                "relative_strength_weight",
                d.weights.relative_strength,
            )?,
        },
        smoothing_period: read_period(config, "composite", "smoothing_period", d.smoothing_period)?,
        long_threshold: read_double(config, "composite", "long_threshold", d.long_threshold)?,
        exit_threshold: read_double(config, "composite", "exit_threshold", d.exit_threshold)?,
        short_threshold: read_double(config, "composite", "short_threshold", d.short_threshold)?,
        rsi_period: read_period(config, "composite", "rsi_period", d.rsi_period)?,
        trend_fast_period: read_period(config, "composite", "trend_fast_period", d.trend_fast_period)?,
        trend_slow_period: read_period(config, "composite", "trend_slow_period", d.trend_slow_period)?,
        band_period: read_period(config, "composite", "band_period", d.band_period)?,
        band_stddev_mult_x100: (band_mult * 100.0).round() as u32,
        roc_period: read_period(config, "composite", "roc_period", d.roc_period)?,
    };
    composite.validate()?;
    Ok(composite)
}

pub fn build_strategy(config: &dyn ConfigPort) -> Result<Strategy, StratsimError> {
    let name = non_empty(config, "strategy", "name").ok_or_else(|| StratsimError::ConfigMissing {
        section: "strategy".to_string(),
        key: "name".to_string(),
    })?;
    let description = non_empty(config, "strategy", "description").unwrap_or_default();

    let mode_name = non_empty(config, "strategy", "mode")
        .unwrap_or_else(|| "conditions".to_string())
        .to_ascii_lowercase();
    let mode = match mode_name.as_str() {
        "conditions" => {
            let rules = ConditionRules {
                entry_long: build_group(config, "entry_long", OrderType::Entry)?,
                exit_long: build_group(config, "exit_long", OrderType::Exit)?,
                entry_short: build_group(config, "entry_short", OrderType::Entry)?,
                exit_short: build_group(config, "exit_short", OrderType::Exit)?,
            };
            if rules.entry_long.is_empty() && rules.entry_short.is_empty() {
                return Err(StratsimError::ConfigMissing {
                    section: "strategy".to_string(),
                    key: "entry_long_1".to_string(),
                });
            }
            SignalMode::Conditions(rules)
        }
        "composite" => SignalMode::Composite(build_composite(config)?),
        other => {
            return Err(invalid(
                "strategy",
                "mode",
                format!("expected 'conditions' or 'composite', got '{}'", other),
            ));
        }
    };

    let strategy = Strategy {
        name,
        description,
        mode,
    };
    strategy.validate()?;
    Ok(strategy)
}

/// Validate everything a backtest needs and warn about settings that will
/// silently do nothing.
pub fn validate_config(
    config: &dyn ConfigPort,
) -> Result<(RunSettings, RiskConfig, Strategy), StratsimError> {
    let settings = build_run_settings(config)?;
    let risk = build_risk_config(config)?;
    let strategy = build_strategy(config)?;

    if strategy.has_short_rules() && !risk.product_type.allows_short() {
        tracing::warn!(
            strategy = %strategy.name,
            "short rules are ignored for spot products"
        );
    }
    Ok((settings, risk, strategy))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::condition::{Comparison, Operand};
    use crate::domain::indicator::IndicatorKind;
    use std::collections::HashMap;

    struct MockConfig {
        values: HashMap<(String, String), String>,
    }

    impl MockConfig {
        fn new(entries: &[(&str, &str, &str)]) -> Self {
            let values = entries
                .iter()
                .map(|(s, k, v)| ((s.to_string(), k.to_string()), v.to_string()))
                .collect();
            Self { values }
        }
    }

    impl ConfigPort for MockConfig {
        fn get_string(&self, section: &str, key: &str) -> Option<String> {
            self.values
                .get(&(section.to_string(), key.to_string()))
                .cloned()
        }
        fn keys(&self, section: &str) -> Vec<String> {
            let mut keys: Vec<String> = self
                .values
                .keys()
                .filter(|(s, _)| s == section)
                .map(|(_, k)| k.clone())
                .collect();
            keys.sort();
            keys
        }
    }

    fn base_entries() -> Vec<(&'static str, &'static str, &'static str)> {
        vec![
            ("backtest", "symbol", "btcusdt"),
            ("backtest", "interval", "1h"),
            ("risk", "initial_balance", "5000"),
            ("risk", "taker_fee_percent", "0.05"),
            ("strategy", "name", "SMA Cross"),
            ("strategy", "entry_long_1", "SMA(10) CROSSES_ABOVE SMA(30)"),
            ("strategy", "exit_long_1", "SMA(10) CROSSES_BELOW SMA(30)"),
        ]
    }

    fn with(extra: &[(&'static str, &'static str, &'static str)]) -> MockConfig {
        let mut entries = base_entries();
        entries.extend_from_slice(extra);
        MockConfig::new(&entries)
    }

    fn assert_invalid(result: Result<impl std::fmt::Debug, StratsimError>, expected_key: &str) {
        match result {
            Err(StratsimError::ConfigInvalid { key, .. }) => assert_eq!(key, expected_key),
            other => panic!("expected ConfigInvalid for {expected_key}, got {other:?}"),
        }
    }

    #[test]
    fn valid_config_passes() {
        let (settings, risk, strategy) = validate_config(&with(&[])).unwrap();
        assert_eq!(settings.symbols, vec!["BTCUSDT".to_string()]);
        assert_eq!(settings.interval, "1h");
        assert!((risk.initial_balance - 5000.0).abs() < f64::EPSILON);
        assert!((risk.taker_fee_percent - 0.05).abs() < f64::EPSILON);
        assert_eq!(strategy.name, "SMA Cross");
    }

    #[test]
    fn symbols_list_wins_over_symbol() {
        let settings = build_run_settings(&with(&[("backtest", "symbols", "ethusdt, solusdt")])).unwrap();
        assert_eq!(settings.symbols, vec!["ETHUSDT", "SOLUSDT"]);
    }

    #[test]
    fn missing_symbol() {
        let config = MockConfig::new(&[("backtest", "interval", "1h")]);
        assert!(matches!(
            build_run_settings(&config),
            Err(StratsimError::ConfigMissing { ref key, .. }) if key == "symbol"
        ));
    }

    #[test]
    fn dates_become_millisecond_bounds() {
        let settings = build_run_settings(&with(&[
            ("backtest", "start_date", "2024-01-01"),
            ("backtest", "end_date", "2024-01-02"),
        ]))
        .unwrap();
        assert_eq!(settings.start_ms, Some(1_704_067_200_000));
        assert_eq!(settings.end_ms, Some(1_704_239_999_999));
    }

    #[test]
    fn inverted_dates_rejected() {
        assert_invalid(
            build_run_settings(&with(&[
                ("backtest", "start_date", "2024-02-01"),
                ("backtest", "end_date", "2024-01-01"),
            ])),
            "start_date",
        );
    }

    #[test]
    fn malformed_date_rejected() {
        assert_invalid(
            build_run_settings(&with(&[("backtest", "start_date", "01/02/2024")])),
            "start_date",
        );
    }

    #[test]
    fn malformed_number_rejected() {
        assert_invalid(
            build_risk_config(&with(&[("risk", "slippage_percent", "lots")])),
            "slippage_percent",
        );
    }

    #[test]
    fn negative_fee_rejected_with_key() {
        assert_invalid(
            build_risk_config(&with(&[("risk", "maker_fee_percent", "-0.01")])),
            "maker_fee_percent",
        );
    }

    #[test]
    fn unknown_execution_timing_rejected() {
        assert_invalid(
            build_risk_config(&with(&[("risk", "execution_timing", "limit")])),
            "execution_timing",
        );
    }

    #[test]
    fn swap_with_leverage() {
        let risk = build_risk_config(&with(&[
            ("risk", "product_type", "swap"),
            ("risk", "leverage", "5"),
        ]))
        .unwrap();
        assert_eq!(risk.product_type, ProductType::Swap);
        assert!((risk.leverage - 5.0).abs() < f64::EPSILON);
    }

    #[test]
    fn numbered_conditions_stop_at_gap() {
        let strategy = build_strategy(&with(&[
            ("strategy", "entry_long_2", "RSI(14) < 70"),
            ("strategy", "entry_long_4", "RSI(14) > 1000"),
        ]))
        .unwrap();
        match strategy.mode {
            SignalMode::Conditions(rules) => {
                assert_eq!(rules.entry_long.len(), 2);
                assert_eq!(rules.entry_long.conditions[1].indicator, IndicatorKind::Rsi(14));
                assert_eq!(
                    rules.entry_long.conditions[1].comparison,
                    Comparison::LessThan(Operand::Value(70.0))
                );
                assert_eq!(rules.exit_long.conditions[0].order_type, OrderType::Exit);
            }
            other => panic!("expected condition mode, got {other:?}"),
        }
    }

    #[test]
    fn parse_error_names_key() {
        let config = MockConfig::new(&[
            ("backtest", "symbol", "X"),
            ("strategy", "name", "broken"),
            ("strategy", "entry_long_1", "SMA(10 > 1"),
        ]);
        match build_strategy(&config) {
            Err(StratsimError::InvalidCondition { key, line, source }) => {
                assert_eq!(key, "entry_long_1");
                assert_eq!(line, "SMA(10 > 1");
                assert!(matches!(*source, StratsimError::RuleParse(_)));
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn unknown_indicator_surfaces() {
        let config = MockConfig::new(&[
            ("strategy", "name", "x"),
            ("strategy", "entry_long_1", "CLOSE > 0"),
            ("strategy", "exit_long_1", "KAMA(10) > 1"),
        ]);
        match build_strategy(&config) {
            Err(StratsimError::InvalidCondition { key, source, .. }) => {
                assert_eq!(key, "exit_long_1");
                assert!(matches!(*source, StratsimError::UnknownIndicator { .. }));
            }
            other => panic!("expected unknown indicator, got {other:?}"),
        }
    }

    #[test]
    fn numbering_gap_leaves_later_keys_unread() {
        let config = MockConfig::new(&[
            ("strategy", "name", "x"),
            ("strategy", "entry_long_1", "CLOSE > 0"),
            ("strategy", "entry_long_3", "CLOSE > 1"),
            ("strategy", "entry_long_count", "2"),
            ("strategy", "exit_long_1", "CLOSE < 0"),
        ]);
        let lines = condition_lines(&config, "entry_long");
        assert_eq!(lines.len(), 1);
        assert_eq!(
            unreachable_condition_keys(&config, "entry_long", &lines),
            vec!["entry_long_3".to_string()]
        );
        let exit = condition_lines(&config, "exit_long");
        assert!(unreachable_condition_keys(&config, "exit_long", &exit).is_empty());
    }

    #[test]
    fn unknown_operator_names_key() {
        let config = MockConfig::new(&[
            ("strategy", "name", "x"),
            ("strategy", "entry_short_1", "SMA(5) SIDEWAYS SMA(20)"),
        ]);
        let err = build_strategy(&config).unwrap_err();
        assert!(err.to_string().contains("entry_short_1"));
        assert!(matches!(
            err,
            StratsimError::InvalidCondition { ref source, .. }
                if matches!(**source, StratsimError::UnknownOperator { .. })
        ));
    }

    #[test]
    fn missing_entry_conditions() {
        let config = MockConfig::new(&[("strategy", "name", "x")]);
        assert!(matches!(
            build_strategy(&config),
            Err(StratsimError::ConfigMissing { .. })
        ));
    }

    #[test]
    fn composite_mode_uses_defaults() {
        let config = MockConfig::new(&[("strategy", "name", "regime"), ("strategy", "mode", "Composite")]);
        let strategy = build_strategy(&config).unwrap();
        assert_eq!(strategy.mode, SignalMode::Composite(CompositeConfig::default()));
    }

    #[test]
    fn composite_overrides() {
        let config = MockConfig::new(&[
            ("strategy", "name", "regime"),
            ("strategy", "mode", "composite"),
            ("composite", "long_threshold", "40"),
            ("composite", "band_stddev_mult", "2.5"),
        ]);
        match build_strategy(&config).unwrap().mode {
            SignalMode::Composite(c) => {
                assert!((c.long_threshold - 40.0).abs() < f64::EPSILON);
                assert_eq!(c.band_stddev_mult_x100, 250);
            }
            other => panic!("expected composite mode, got {other:?}"),
        }
    }

    #[test]
    fn composite_zero_period_rejected() {
        let config = MockConfig::new(&[
            ("strategy", "name", "regime"),
            ("strategy", "mode", "composite"),
            ("composite", "rsi_period", "0"),
        ]);
        assert_invalid(build_strategy(&config), "rsi_period");
    }

    #[test]
    fn unknown_mode_rejected() {
        let config = MockConfig::new(&[("strategy", "name", "x"), ("strategy", "mode", "ml")]);
        assert_invalid(build_strategy(&config), "mode");
    }
}
