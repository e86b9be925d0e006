use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Provider identifier - mostly static constants
pub type ProviderId = Cow<'static, str>;

/// Opaque ticker identifier, unique across the scanner.
///
/// Symbols are trimmed and upper-cased on construction so that `btc/usd`
/// and `BTC/USD ` name the same key in every map.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Symbol(Arc<str>);

impl Symbol {
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(Arc::from(raw.as_ref().trim().to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
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

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_normalizes_case_and_whitespace() {
        assert_eq!(Symbol::new(" btc/usd "), Symbol::new("BTC/USD"));
        assert_eq!(Symbol::new("eth").as_str(), "ETH");
    }

    #[test]
    fn test_symbol_serde_is_plain_string() {
        let json = serde_json::to_string(&Symbol::new("sol")).unwrap();
        assert_eq!(json, "\"SOL\"");

        let back: Symbol = serde_json::from_str("\"xrp\"").unwrap();
        assert_eq!(back.as_str(), "XRP");
    }
}
