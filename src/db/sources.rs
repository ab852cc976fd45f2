//! Sync ledger source names used by the updater

pub const STOCK_HISTORY: &str = "moex_stock_history";
pub const LIVE: &str = "moex_live";
pub const DIVIDENDS: &str = "moex_dividends";
pub const CURRENCY_HISTORY: &str = "currency_history";
pub const BRENT_HISTORY: &str = "brent_history";
pub const TRADING_VOLUMES: &str = "trading_volumes";
pub const WORLD_BANK: &str = "world_bank_indicators";
pub const GLOBAL_EXCHANGES: &str = "global_exchanges";
pub const KEY_RATES: &str = "key_rates";

/// Ledger source for one index series; each ticker resumes independently
pub fn index_history(ticker: &str) -> String {
    format!("index_history_{}", ticker)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn index_source_embeds_ticker() {
        assert_eq!(index_history("IMOEX"), "index_history_IMOEX");
    }
}
