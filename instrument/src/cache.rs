use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{exchange::ExchangeId, instrument::Instrument, symbol::Symbol};

#[derive(Debug, Error)]
pub enum InstrumentCacheError {
    #[error("failed to read instrument bundle at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse instrument bundle at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to persist instrument bundle at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Read-only, load-once-per-day contract metadata lookup.
///
/// Built from a JSON bundle at startup and never mutated afterwards; a fresh `InstrumentCache`
/// is constructed (and the old one dropped) when the trading day rolls over. `get` never
/// panics on a missing symbol — an unknown symbol is the AOE's signal to reject the intent,
/// not a programmer error.
#[derive(Debug, Clone)]
pub struct InstrumentCache {
    by_symbol: HashMap<Symbol, Instrument>,
}

impl InstrumentCache {
    pub fn from_instruments<I>(instruments: I) -> Self
    where
        I: IntoIterator<Item = Instrument>,
    {
        Self {
            by_symbol: instruments.into_iter().map(|inst| (inst.symbol.clone(), inst)).collect(),
        }
    }

    /// Loads a bundle previously written by [`Self::persist`].
    pub fn load(path: &Path) -> Result<Self, InstrumentCacheError> {
        let raw = fs::read_to_string(path).map_err(|source| InstrumentCacheError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let instruments: Vec<Instrument> =
            serde_json::from_str(&raw).map_err(|source| InstrumentCacheError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::from_instruments(instruments))
    }

    /// Persists the bundle by writing to a `.tmp` sibling and renaming it over `path`, so a
    /// reader never observes a torn file mid-write.
    pub fn persist(&self, path: &Path) -> Result<(), InstrumentCacheError> {
        let tmp_path = path.with_extension("json.tmp");
        let file = File::create(&tmp_path).map_err(|source| InstrumentCacheError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        let mut writer = BufWriter::new(file);
        let instruments: Vec<&Instrument> = self.by_symbol.values().collect();
        serde_json::to_writer_pretty(&mut writer, &instruments).map_err(|source| InstrumentCacheError::Parse {
            path: tmp_path.clone(),
            source,
        })?;
        writer.flush().map_err(|source| InstrumentCacheError::Write {
            path: tmp_path.clone(),
            source,
        })?;
        fs::rename(&tmp_path, path).map_err(|source| InstrumentCacheError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn get(&self, symbol: &Symbol) -> Option<&Instrument> {
        self.by_symbol.get(symbol)
    }

    pub fn products_of(&self, exchange: ExchangeId) -> impl Iterator<Item = &Symbol> {
        self.by_symbol
            .values()
            .filter(move |inst| inst.exchange == exchange)
            .map(|inst| &inst.product)
    }

    pub fn len(&self) -> usize {
        self.by_symbol.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_symbol.is_empty()
    }
}

// Blanket impl so callers can `serde_json::from_str::<Vec<Instrument>>` directly without this
// cache pulling in a bespoke bundle wrapper type.
impl Serialize for InstrumentCache {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let instruments: Vec<&Instrument> = self.by_symbol.values().collect();
        instruments.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for InstrumentCache {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let instruments = Vec::<Instrument>::deserialize(deserializer)?;
        Ok(Self::from_instruments(instruments))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instrument::{FeeSpec, TradingSession};
    use chrono::{NaiveDate, NaiveTime};
    use rust_decimal_macros::dec;

    fn sample() -> Instrument {
        Instrument {
            symbol: Symbol::new("rb2410"),
            product: Symbol::new("rb"),
            exchange: ExchangeId::Shfe,
            expire_date: NaiveDate::from_ymd_opt(2024, 10, 15).unwrap(),
            tick_size: dec!(1),
            multiplier: dec!(10),
            upper_limit_pct: dec!(0.05),
            lower_limit_pct: dec!(0.05),
            margin_rate: dec!(0.1),
            spec_margin_rate: None,
            trading_sessions: vec![TradingSession::new(
                NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
                NaiveTime::from_hms_opt(15, 0, 0).unwrap(),
            )],
            max_order_volume: 500,
            position_limit: 2000,
            fee_spec: FeeSpec::ByRate {
                rate: dec!(0.0001),
                close_today_rate: None,
            },
        }
    }

    #[test]
    fn get_and_products_of() {
        let cache = InstrumentCache::from_instruments(vec![sample()]);
        assert!(cache.get(&Symbol::new("rb2410")).is_some());
        assert!(cache.get(&Symbol::new("unknown")).is_none());
        let products: Vec<_> = cache.products_of(ExchangeId::Shfe).collect();
        assert_eq!(products, vec![&Symbol::new("rb")]);
    }

    #[test]
    fn persist_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instruments.json");
        let cache = InstrumentCache::from_instruments(vec![sample()]);
        cache.persist(&path).unwrap();

        let loaded = InstrumentCache::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);
        assert!(loaded.get(&Symbol::new("rb2410")).is_some());
    }
}
