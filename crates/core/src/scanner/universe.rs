use std::collections::HashSet;
use std::path::Path;

use signalgate_market_data::Symbol;

use crate::errors::Result;

/// The bounded set of symbols a cycle scans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolUniverse {
    symbols: Vec<Symbol>,
}

impl SymbolUniverse {
    /// Normalizes and de-duplicates, keeping first occurrence order.
    pub fn new<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut seen = HashSet::new();
        let symbols = symbols
            .into_iter()
            .map(Symbol::new)
            .filter(|s| !s.is_empty() && seen.insert(s.clone()))
            .collect();
        Self { symbols }
    }

    /// One symbol per line; blank lines and `#` comments are skipped.
    pub fn parse(contents: &str) -> Self {
        Self::new(
            contents
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::parse(&contents))
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
