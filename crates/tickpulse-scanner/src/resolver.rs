//! Scan-order resolution for the instrument universe.

use std::collections::HashMap;

use tickpulse_core::{Instrument, Symbol};

/// Orders the raw universe so watchlist symbols are fetched first.
///
/// Watchlist entries keep their configured order; the remainder keeps the
/// provider's order. Watchlist symbols missing from the universe are skipped,
/// and duplicate universe rows collapse to the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct WatchlistResolver {
    watchlist: Vec<Symbol>,
}

impl WatchlistResolver {
    pub fn new(watchlist: Vec<Symbol>) -> Self {
        Self { watchlist }
    }

    pub fn resolve(&self, universe: Vec<Instrument>) -> Vec<Instrument> {
        let mut by_symbol: HashMap<Symbol, Instrument> = HashMap::with_capacity(universe.len());
        let mut provider_order: Vec<Symbol> = Vec::with_capacity(universe.len());

        for instrument in universe {
            if !by_symbol.contains_key(&instrument.symbol) {
                provider_order.push(instrument.symbol.clone());
                by_symbol.insert(instrument.symbol.clone(), instrument);
            }
        }

        let mut ordered = Vec::with_capacity(by_symbol.len());
        for symbol in &self.watchlist {
            if let Some(instrument) = by_symbol.remove(symbol) {
                ordered.push(instrument);
            }
        }
        for symbol in &provider_order {
            if let Some(instrument) = by_symbol.remove(symbol) {
                ordered.push(instrument);
            }
        }

        ordered
    }
}
