//! Built-in tools that ship with the crate.

use std::sync::Arc;

use crate::config::Settings;
use crate::tools::registry::ToolRegistry;
use crate::tools::tool::ToolError;

mod solana;
mod stocks;

pub use solana::{SolanaTokenClient, TokenOverviewTool, TokenPriceTool, TokenProfileTool};
pub use stocks::{StockHistoryTool, StockQuoteTool, YahooFinanceClient};

/// Build a registry with every built-in tool registered.
pub fn default_registry(settings: &Settings) -> Result<ToolRegistry, ToolError> {
    let mut registry = ToolRegistry::new(settings.retry.clone());

    let yahoo = Arc::new(YahooFinanceClient::new(settings));
    registry.register(Arc::new(StockQuoteTool::new(Arc::clone(&yahoo))))?;
    registry.register(Arc::new(StockHistoryTool::new(yahoo)))?;

    let solana = Arc::new(SolanaTokenClient::new(settings));
    registry.register(Arc::new(TokenPriceTool::new(Arc::clone(&solana))))?;
    registry.register(Arc::new(TokenOverviewTool::new(Arc::clone(&solana))))?;
    registry.register(Arc::new(TokenProfileTool::new(solana)))?;

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_contents() {
        let registry = default_registry(&Settings::default()).unwrap();

        let names: Vec<String> = registry.schemas().into_iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "stock_history",
                "stock_quote",
                "token_overview",
                "token_price",
                "token_profile",
            ]
        );
    }
}
