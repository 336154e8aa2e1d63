use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Identifies the futures exchange a contract trades on.
///
/// `Simulated` and `Mock` back the deterministic broker used by tests and the replay verifier;
/// the remainder are the domestic futures exchanges this core is wired against.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Deserialize, Serialize, Display,
)]
#[serde(rename = "exchange", rename_all = "snake_case")]
pub enum ExchangeId {
    Simulated,
    Mock,
    /// Shanghai Futures Exchange.
    Shfe,
    /// Dalian Commodity Exchange.
    Dce,
    /// Zhengzhou Commodity Exchange.
    Czce,
    /// China Financial Futures Exchange.
    Cffex,
    /// Shanghai International Energy Exchange.
    Ine,
    /// Guangzhou Futures Exchange.
    Gfex,
}

impl ExchangeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExchangeId::Simulated => "simulated",
            ExchangeId::Mock => "mock",
            ExchangeId::Shfe => "shfe",
            ExchangeId::Dce => "dce",
            ExchangeId::Czce => "czce",
            ExchangeId::Cffex => "cffex",
            ExchangeId::Ine => "ine",
            ExchangeId::Gfex => "gfex",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn de_exchange_id() {
        assert_eq!(
            serde_json::from_str::<ExchangeId>(r#""shfe""#).unwrap(),
            ExchangeId::Shfe
        );
    }
}
