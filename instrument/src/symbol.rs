use derive_more::Display;
use smol_str::{SmolStr, StrExt};
use std::borrow::Borrow;

/// Cheap, cloneable contract identifier, eg/ `"rb2410"` or `"IF2409"`.
///
/// Stored lowercase so lookups are unaffected by a counterparty's casing convention; the
/// exchange-native spelling (if it differs) belongs in the instrument record, not the key.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, serde::Serialize, Display)]
pub struct Symbol(SmolStr);

impl Symbol {
    pub fn new<S>(raw: S) -> Self
    where
        S: Into<SmolStr>,
    {
        let raw = raw.into();
        if raw.chars().all(char::is_lowercase) {
            Self(raw)
        } else {
            Self(raw.to_lowercase_smolstr())
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<&str> for Symbol {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Symbol {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        self.0.borrow()
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        self.0.as_ref()
    }
}

impl<'de> serde::de::Deserialize<'de> for Symbol {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        let raw = std::borrow::Cow::<'de, str>::deserialize(deserializer)?;
        Ok(Symbol::new(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lowercases_on_construction() {
        assert_eq!(Symbol::new("RB2410").as_str(), "rb2410");
    }

    #[test]
    fn deserializes_and_lowercases() {
        let symbol: Symbol = serde_json::from_str(r#""IF2409""#).unwrap();
        assert_eq!(symbol.as_str(), "if2409");
    }
}
