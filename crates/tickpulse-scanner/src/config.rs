//! Scanner configuration.

use std::time::Duration;

use tickpulse_core::{Symbol, MIN_LOOKBACK_DAYS};

/// Index constituents scanned before the rest of the universe so the most
/// watched instruments converge first after a cold start.
const DEFAULT_WATCHLIST: [&str; 50] = [
    "ADANIENT",
    "ADANIPORTS",
    "APOLLOHOSP",
    "ASIANPAINT",
    "AXISBANK",
    "BAJAJ-AUTO",
    "BAJAJFINSV",
    "BAJFINANCE",
    "BEL",
    "BHARTIARTL",
    "BPCL",
    "BRITANNIA",
    "CIPLA",
    "COALINDIA",
    "DRREDDY",
    "EICHERMOT",
    "GRASIM",
    "HCLTECH",
    "HDFCBANK",
    "HDFCLIFE",
    "HEROMOTOCO",
    "HINDALCO",
    "HINDUNILVR",
    "ICICIBANK",
    "INDUSINDBK",
    "INFY",
    "ITC",
    "JSWSTEEL",
    "KOTAKBANK",
    "LT",
    "M&M",
    "MARUTI",
    "NESTLEIND",
    "NTPC",
    "ONGC",
    "POWERGRID",
    "RELIANCE",
    "SBILIFE",
    "SBIN",
    "SHRIRAMFIN",
    "SUNPHARMA",
    "TATACONSUM",
    "TATAMOTORS",
    "TATASTEEL",
    "TCS",
    "TECHM",
    "TITAN",
    "TRENT",
    "ULTRACEMCO",
    "WIPRO",
];

/// Runtime knobs for the scan scheduler.
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerConfig {
    /// Pause between the end of one successful cycle and the next.
    pub scan_interval: Duration,
    /// Longer pause taken after a cycle-fatal failure.
    pub recovery_delay: Duration,
    /// Upper bound on concurrently in-flight historical fetches.
    pub fetch_pool_size: usize,
    /// Calendar days of daily history requested per instrument.
    pub lookback_days: u32,
    /// Symbols scanned ahead of the rest of the universe, in this order.
    pub watchlist: Vec<Symbol>,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(15),
            recovery_delay: Duration::from_secs(30),
            fetch_pool_size: 52,
            lookback_days: MIN_LOOKBACK_DAYS,
            watchlist: default_watchlist(),
        }
    }
}

impl ScannerConfig {
    /// Defaults overridden by `TICKPULSE_*` environment variables where set.
    ///
    /// `TICKPULSE_LOOKBACK_DAYS` is clamped up to the minimum the breakout
    /// windows need; the other knobs take any positive value.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            scan_interval: env_secs("TICKPULSE_SCAN_INTERVAL_SECS")
                .unwrap_or(defaults.scan_interval),
            recovery_delay: env_secs("TICKPULSE_RECOVERY_DELAY_SECS")
                .unwrap_or(defaults.recovery_delay),
            fetch_pool_size: env_parse("TICKPULSE_FETCH_POOL_SIZE")
                .filter(|&size: &usize| size > 0)
                .unwrap_or(defaults.fetch_pool_size),
            lookback_days: env_parse("TICKPULSE_LOOKBACK_DAYS")
                .map(|days: u32| days.max(MIN_LOOKBACK_DAYS))
                .unwrap_or(defaults.lookback_days),
            watchlist: defaults.watchlist,
        }
    }
}

fn default_watchlist() -> Vec<Symbol> {
    DEFAULT_WATCHLIST
        .iter()
        .filter_map(|raw| Symbol::parse(raw).ok())
        .collect()
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok()?.parse().ok()
}

fn env_secs(name: &str) -> Option<Duration> {
    env_parse(name)
        .filter(|&secs: &u64| secs > 0)
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_operating_profile() {
        let config = ScannerConfig::default();
        assert_eq!(config.scan_interval, Duration::from_secs(15));
        assert_eq!(config.recovery_delay, Duration::from_secs(30));
        assert_eq!(config.fetch_pool_size, 52);
        assert_eq!(config.lookback_days, 400);
        assert_eq!(config.watchlist.len(), 50);
    }

    #[test]
    fn watchlist_symbols_all_validate() {
        // Every constituent, including M&M and BAJAJ-AUTO, must survive
        // symbol validation.
        assert_eq!(default_watchlist().len(), DEFAULT_WATCHLIST.len());
    }
}
