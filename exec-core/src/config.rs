use std::path::Path;
use std::time::Duration;

use engine_execution::gates::{FatFingerConfig, LiquidityConfig, ThrottleConfig};
use engine_execution::EngineConfig;
use engine_guardian::GuardianConfig;
use rust_decimal::Decimal;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read { path: std::path::PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    Parse { path: std::path::PathBuf, source: serde_json::Error },
}

/// The on-disk configuration schema. Every field is a recognized key of the external config
/// contract; durations are expressed in seconds since JSON has no native duration type.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    #[serde(rename = "QUOTE_STALE_MS")]
    pub quote_stale_ms: i64,
    #[serde(rename = "QUOTE_HARD_STALE_MS")]
    pub quote_hard_stale_ms: i64,

    #[serde(rename = "AUTO_ORDER_TIMEOUT_ACK_S")]
    pub auto_order_timeout_ack_s: u64,
    #[serde(rename = "AUTO_ORDER_TIMEOUT_FILL_S")]
    pub auto_order_timeout_fill_s: u64,
    #[serde(rename = "AUTO_ORDER_TIMEOUT_CANCEL_S")]
    pub auto_order_timeout_cancel_s: u64,

    #[serde(rename = "AUTO_ORDER_MAX_RETRY")]
    pub auto_order_max_retry: u32,
    #[serde(rename = "AUTO_ORDER_MAX_CHASE")]
    pub auto_order_max_chase: u32,
    #[serde(rename = "CHASE_TICK_OFFSET")]
    pub chase_tick_offset: Decimal,

    #[serde(rename = "LIQ_MAX_SPREAD_TICKS")]
    pub liq_max_spread_ticks: Decimal,
    #[serde(rename = "LIQ_MIN_BIDASK_VOL")]
    pub liq_min_bidask_vol: u32,
    #[serde(rename = "FATFINGER_MAX_QTY")]
    pub fatfinger_max_qty: Decimal,
    #[serde(rename = "FATFINGER_MAX_NOTIONAL")]
    pub fatfinger_max_notional: Decimal,
    #[serde(rename = "FATFINGER_MAX_PRICE_DEV")]
    pub fatfinger_max_price_dev: Decimal,
    #[serde(rename = "THROTTLE_MAX_ORDERS_PER_MIN")]
    pub throttle_max_orders_per_min: usize,
    #[serde(rename = "THROTTLE_5S_LIMIT")]
    pub throttle_5s_limit: usize,
    #[serde(rename = "THROTTLE_DAILY_LIMIT")]
    pub throttle_daily_limit: usize,

    #[serde(rename = "REDUCE_ONLY_COOLDOWN_S")]
    pub reduce_only_cooldown_s: u64,
    #[serde(rename = "ORDER_STUCK_TIMEOUT_S")]
    pub order_stuck_timeout_s: u64,
    #[serde(rename = "POSITION_DRIFT_THRESHOLD")]
    pub position_drift_threshold: Decimal,
    #[serde(rename = "LEG_IMBALANCE_THRESHOLD")]
    pub leg_imbalance_threshold: Decimal,
    #[serde(rename = "RECONCILE_INTERVAL_S")]
    pub reconcile_interval_s: u64,
    #[serde(rename = "MARGIN_WARNING_LEVEL")]
    pub margin_warning_level: Decimal,
    #[serde(rename = "MARGIN_DANGER_LEVEL")]
    pub margin_danger_level: Decimal,
    #[serde(rename = "EXPIRY_BLOCK_DAYS", default = "default_expiry_block_days")]
    pub expiry_block_days: i64,

    #[serde(rename = "REPLAY_EXCLUDE_FIELDS", default = "engine_replay::default_excluded_fields")]
    pub replay_exclude_fields: std::collections::HashSet<String>,

    pub instrument_bundle_path: std::path::PathBuf,
    pub audit_dir: std::path::PathBuf,
}

fn default_expiry_block_days() -> i64 {
    1
}

impl RunConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        serde_json::from_reader(std::io::BufReader::new(file))
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn engine_config(&self) -> EngineConfig {
        let defaults = EngineConfig::default();
        EngineConfig {
            ack_timeout: Duration::from_secs(self.auto_order_timeout_ack_s),
            fill_timeout: Duration::from_secs(self.auto_order_timeout_fill_s),
            cancel_timeout: Duration::from_secs(self.auto_order_timeout_cancel_s),
            max_retry_submit: self.auto_order_max_retry,
            max_retry_cancel: self.auto_order_max_retry,
            max_chase: self.auto_order_max_chase,
            chase_tick_offset: self.chase_tick_offset,
            ..defaults
        }
    }

    pub fn guardian_config(&self) -> GuardianConfig {
        GuardianConfig {
            reduce_only_cooldown: Duration::from_secs(self.reduce_only_cooldown_s),
            order_stuck_timeout: Duration::from_secs(self.order_stuck_timeout_s),
            position_drift_threshold: self.position_drift_threshold,
            leg_imbalance_threshold: self.leg_imbalance_threshold,
            quote_hard_stale_ms: self.quote_hard_stale_ms,
            margin_warning_level: self.margin_warning_level,
            margin_danger_level: self.margin_danger_level,
        }
    }

    pub fn throttle_config(&self) -> ThrottleConfig {
        ThrottleConfig {
            max_orders_per_minute_global: self.throttle_max_orders_per_min,
            max_orders_per_minute_per_symbol: self.throttle_max_orders_per_min,
            min_inter_order_interval: Duration::from_millis(0),
            regulatory_5s_limit: self.throttle_5s_limit,
            regulatory_daily_limit: self.throttle_daily_limit,
        }
    }

    pub fn fat_finger_config(&self) -> FatFingerConfig {
        FatFingerConfig {
            max_qty: self.fatfinger_max_qty,
            max_notional: self.fatfinger_max_notional,
            max_price_deviation: self.fatfinger_max_price_dev,
        }
    }

    pub fn liquidity_config(&self) -> LiquidityConfig {
        LiquidityConfig {
            max_spread_ticks: self.liq_max_spread_ticks,
            min_bid_ask_vol: self.liq_min_bidask_vol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> serde_json::Value {
        serde_json::json!({
            "QUOTE_STALE_MS": 2000,
            "QUOTE_HARD_STALE_MS": 10000,
            "AUTO_ORDER_TIMEOUT_ACK_S": 3,
            "AUTO_ORDER_TIMEOUT_FILL_S": 10,
            "AUTO_ORDER_TIMEOUT_CANCEL_S": 3,
            "AUTO_ORDER_MAX_RETRY": 3,
            "AUTO_ORDER_MAX_CHASE": 2,
            "CHASE_TICK_OFFSET": "2",
            "LIQ_MAX_SPREAD_TICKS": "3",
            "LIQ_MIN_BIDASK_VOL": 5,
            "FATFINGER_MAX_QTY": "100",
            "FATFINGER_MAX_NOTIONAL": "1000000",
            "FATFINGER_MAX_PRICE_DEV": "0.05",
            "THROTTLE_MAX_ORDERS_PER_MIN": 60,
            "THROTTLE_5S_LIMIT": 50,
            "THROTTLE_DAILY_LIMIT": 20000,
            "REDUCE_ONLY_COOLDOWN_S": 60,
            "ORDER_STUCK_TIMEOUT_S": 30,
            "POSITION_DRIFT_THRESHOLD": "5",
            "LEG_IMBALANCE_THRESHOLD": "5",
            "RECONCILE_INTERVAL_S": 30,
            "MARGIN_WARNING_LEVEL": "0.7",
            "MARGIN_DANGER_LEVEL": "0.9",
            "instrument_bundle_path": "instruments.json",
            "audit_dir": "audit"
        })
    }

    #[test]
    fn parses_a_complete_config_file_and_fills_defaults() {
        let config: RunConfig = serde_json::from_value(sample_json()).unwrap();
        assert_eq!(config.expiry_block_days, 1);
        assert!(config.replay_exclude_fields.contains("ts"));
    }

    #[test]
    fn translates_into_engine_config() {
        let config: RunConfig = serde_json::from_value(sample_json()).unwrap();
        let engine_config = config.engine_config();
        assert_eq!(engine_config.ack_timeout, Duration::from_secs(3));
        assert_eq!(engine_config.max_chase, 2);
    }

    #[test]
    fn translates_into_guardian_config() {
        let config: RunConfig = serde_json::from_value(sample_json()).unwrap();
        let guardian_config = config.guardian_config();
        assert_eq!(guardian_config.reduce_only_cooldown, Duration::from_secs(60));
        assert_eq!(guardian_config.quote_hard_stale_ms, 10000);
    }
}
