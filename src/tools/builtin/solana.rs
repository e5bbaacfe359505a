//! Solana token market data tools.
//!
//! Wraps the public Jupiter price and token APIs, the DexScreener pairs
//! API, and the CoinGecko contract lookup. Each tool call performs its own
//! upstream requests; nothing is cached between invocations.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::config::Settings;
use crate::tools::tool::{Tool, ToolError, ToolOutput};

/// Client for Solana token data providers.
pub struct SolanaTokenClient {
    client: Client,
    jupiter_base: String,
    dexscreener_base: String,
    coingecko_base: String,
    coingecko_api_key: Option<SecretString>,
}

impl SolanaTokenClient {
    /// Create a new client from settings.
    pub fn new(settings: &Settings) -> Self {
        let client = Client::builder()
            .timeout(settings.http.timeout)
            .user_agent(settings.http.user_agent.clone())
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            jupiter_base: settings.providers.jupiter_base_url.clone(),
            dexscreener_base: settings.providers.dexscreener_base_url.clone(),
            coingecko_base: settings.providers.coingecko_base_url.clone(),
            coingecko_api_key: settings.providers.coingecko_api_key.clone(),
        }
    }

    /// Fetch prices for one or more mint addresses from Jupiter.
    pub async fn price(&self, mints: &str, vs_token: Option<&str>) -> Result<Value, ToolError> {
        let mint_list = split_mints(mints)?;

        let url = format!("{}/price/v2", self.jupiter_base);
        tracing::debug!(mints = %mints, "fetching Jupiter prices");

        let mut query: Vec<(&str, String)> = vec![("ids", mint_list.join(","))];
        if let Some(vs) = vs_token {
            query.push(("vsToken", vs.to_string()));
        }

        let body = self.get_json(&url, &query).await?;
        let parsed: JupiterPriceResponse =
            serde_json::from_value(body).map_err(|e| ToolError::Provider {
                status: None,
                message: format!("undecodable price response: {e}"),
            })?;

        let prices: HashMap<String, Option<f64>> = parsed
            .data
            .into_iter()
            .map(|(mint, entry)| (mint, entry.and_then(|e| value_as_f64(&e.price))))
            .collect();

        Ok(json!({
            "prices": prices,
            "vs_token": vs_token,
        }))
    }

    /// Fetch token metadata for a mint address from Jupiter.
    pub async fn token(&self, mint: &str) -> Result<Value, ToolError> {
        validate_mint(mint)?;

        let url = format!("{}/tokens/v1/token/{}", self.jupiter_base, mint);
        tracing::debug!(%mint, "fetching Jupiter token metadata");

        let body = self.get_json(&url, &[]).await?;
        let token: JupiterToken =
            serde_json::from_value(body).map_err(|e| ToolError::Provider {
                status: None,
                message: format!("undecodable token response: {e}"),
            })?;

        Ok(json!({
            "address": token.address,
            "name": token.name,
            "symbol": token.symbol,
            "decimals": token.decimals,
            "tags": token.tags,
        }))
    }

    /// Fetch a DEX pair snapshot from DexScreener.
    pub async fn pair(&self, network: &str, pair_address: &str) -> Result<Value, ToolError> {
        validate_mint(pair_address)?;

        let url = format!("{}/pairs/{}/{}", self.dexscreener_base, network, pair_address);
        tracing::debug!(%network, %pair_address, "fetching DexScreener pair");

        let body = self.get_json(&url, &[]).await?;
        let parsed: DexScreenerResponse =
            serde_json::from_value(body).map_err(|e| ToolError::Provider {
                status: None,
                message: format!("undecodable pair response: {e}"),
            })?;

        let pair = parsed
            .pairs
            .and_then(|mut pairs| {
                if pairs.is_empty() {
                    None
                } else {
                    Some(pairs.remove(0))
                }
            })
            .or(parsed.pair)
            .ok_or_else(|| {
                ToolError::InvalidInput(format!("no pair found at '{pair_address}' on {network}"))
            })?;

        Ok(json!({
            "dex": pair.dex_id,
            "pair_address": pair.pair_address,
            "base_token": pair.base_token,
            "quote_token": pair.quote_token,
            "price_native": value_as_f64(&pair.price_native),
            "price_usd": value_as_f64(&pair.price_usd),
            "liquidity_usd": pair.liquidity.and_then(|l| l.usd),
        }))
    }

    /// Fetch a market profile for a mint address from CoinGecko.
    pub async fn coin_profile(&self, mint: &str) -> Result<Value, ToolError> {
        validate_mint(mint)?;

        let url = format!("{}/coins/solana/contract/{}", self.coingecko_base, mint);
        tracing::debug!(%mint, "fetching CoinGecko profile");

        let mut request = self.client.get(&url);
        if let Some(key) = &self.coingecko_api_key {
            request = request.header("x-cg-demo-api-key", key.expose_secret());
        }

        let response = request.send().await.map_err(map_request_error)?;
        let body = check_status(response).await?;

        let profile: CoinGeckoProfile =
            serde_json::from_value(body).map_err(|e| ToolError::Provider {
                status: None,
                message: format!("undecodable profile response: {e}"),
            })?;

        Ok(json!({
            "id": profile.id,
            "symbol": profile.symbol,
            "name": profile.name,
            "price_usd": profile.market_data.as_ref().and_then(|m| m.current_price.get("usd")),
            "market_cap_usd": profile.market_data.as_ref().and_then(|m| m.market_cap.get("usd")),
        }))
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, ToolError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(map_request_error)?;

        check_status(response).await
    }
}

/// Split a comma-separated mint list, validating each entry.
fn split_mints(mints: &str) -> Result<Vec<String>, ToolError> {
    let list: Vec<String> = mints
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
        .collect();

    if list.is_empty() {
        return Err(ToolError::InvalidInput(
            "at least one mint address is required".into(),
        ));
    }

    for mint in &list {
        validate_mint(mint)?;
    }

    Ok(list)
}

/// Base58 shape check before spending an upstream request.
fn validate_mint(address: &str) -> Result<(), ToolError> {
    let base58 = |c: char| c.is_ascii_alphanumeric() && !matches!(c, '0' | 'O' | 'I' | 'l');

    if address.len() < 32 || address.len() > 44 || !address.chars().all(base58) {
        return Err(ToolError::InvalidInput(format!(
            "invalid address '{address}': not a base58 Solana address"
        )));
    }

    Ok(())
}

/// Classify a reqwest transport error.
fn map_request_error(e: reqwest::Error) -> ToolError {
    if e.is_timeout() || e.is_connect() {
        ToolError::Transient(e.to_string())
    } else {
        ToolError::Provider {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}

/// Turn an HTTP response into its JSON body or a classified error.
async fn check_status(response: reqwest::Response) -> Result<Value, ToolError> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(map_request_error)?;

    if status == 404 {
        return Err(ToolError::InvalidInput(
            "unknown token or pair address".into(),
        ));
    }
    if status >= 400 {
        return Err(ToolError::Provider {
            status: Some(status),
            message: format!("HTTP {status}: {}", truncate(&body, 200)),
        });
    }

    serde_json::from_str(&body).map_err(|e| ToolError::Provider {
        status: Some(status),
        message: format!("undecodable response body: {e}"),
    })
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Read a JSON number or numeric string as f64.
///
/// Jupiter's price API delivers prices as strings; DexScreener mixes both.
fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct JupiterPriceResponse {
    #[serde(default)]
    data: HashMap<String, Option<JupiterPriceEntry>>,
}

#[derive(Debug, Deserialize)]
struct JupiterPriceEntry {
    #[serde(default)]
    price: Value,
}

#[derive(Debug, Deserialize)]
struct JupiterToken {
    address: String,
    name: String,
    symbol: String,
    decimals: u8,
    #[serde(default)]
    tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct DexScreenerResponse {
    #[serde(default)]
    pairs: Option<Vec<DexPair>>,
    #[serde(default)]
    pair: Option<DexPair>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DexPair {
    #[serde(default)]
    dex_id: String,
    #[serde(default)]
    pair_address: String,
    #[serde(default)]
    base_token: Value,
    #[serde(default)]
    quote_token: Value,
    #[serde(default)]
    price_native: Value,
    #[serde(default)]
    price_usd: Value,
    #[serde(default)]
    liquidity: Option<DexLiquidity>,
}

#[derive(Debug, Deserialize)]
struct DexLiquidity {
    #[serde(default)]
    usd: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CoinGeckoProfile {
    id: String,
    symbol: String,
    name: String,
    #[serde(default)]
    market_data: Option<CoinGeckoMarketData>,
}

#[derive(Debug, Default, Deserialize)]
struct CoinGeckoMarketData {
    #[serde(default)]
    current_price: HashMap<String, f64>,
    #[serde(default)]
    market_cap: HashMap<String, f64>,
}

/// Embed a per-source failure instead of failing the aggregate.
fn merge_source(result: Result<Value, ToolError>) -> Value {
    match result {
        Ok(value) => value,
        Err(e) => json!({
            "error": { "kind": e.kind(), "message": e.to_string() }
        }),
    }
}

/// Tool returning Jupiter prices for one or more mint addresses.
pub struct TokenPriceTool {
    client: Arc<SolanaTokenClient>,
}

impl TokenPriceTool {
    pub fn new(client: Arc<SolanaTokenClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for TokenPriceTool {
    fn name(&self) -> &str {
        "token_price"
    }

    fn description(&self) -> &str {
        "Get current prices for one or more Solana tokens by mint address, in USD or versus another token."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "mints": {
                    "type": "string",
                    "description": "Comma-separated mint addresses"
                },
                "vs_token": {
                    "type": "string",
                    "description": "Mint address to price against (default: USD)"
                }
            },
            "required": ["mints"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let mints = params
            .get("mints")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidInput("missing 'mints' parameter".into()))?;
        let vs_token = params.get("vs_token").and_then(|v| v.as_str());

        let result = self.client.price(mints, vs_token).await?;
        Ok(ToolOutput::success(result, start.elapsed()))
    }
}

/// Tool aggregating price, metadata, and optionally a DEX pair snapshot
/// for a single token in one call.
pub struct TokenOverviewTool {
    client: Arc<SolanaTokenClient>,
}

impl TokenOverviewTool {
    pub fn new(client: Arc<SolanaTokenClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for TokenOverviewTool {
    fn name(&self) -> &str {
        "token_overview"
    }

    fn description(&self) -> &str {
        "Get a combined view of a Solana token: current price, token metadata, and optionally a DEX pair snapshot. Sources that fail are reported inline."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "mint": {
                    "type": "string",
                    "description": "Token mint address"
                },
                "network": {
                    "type": "string",
                    "description": "DEX network for the pair lookup (default: solana)"
                },
                "pair_address": {
                    "type": "string",
                    "description": "DEX pair address to include a liquidity snapshot"
                }
            },
            "required": ["mint"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let mint = params
            .get("mint")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidInput("missing 'mint' parameter".into()))?;
        validate_mint(mint)?;

        let network = params
            .get("network")
            .and_then(|v| v.as_str())
            .unwrap_or("solana");
        let pair_address = params.get("pair_address").and_then(|v| v.as_str());

        let (price, token) = tokio::join!(self.client.price(mint, None), self.client.token(mint));

        let mut result = json!({
            "mint": mint,
            "price": merge_source(price),
            "token": merge_source(token),
        });

        if let Some(pair_address) = pair_address {
            let pair = self.client.pair(network, pair_address).await;
            result["pair"] = merge_source(pair);
        }

        Ok(ToolOutput::success(result, start.elapsed()))
    }
}

/// Tool returning a CoinGecko market profile for a token.
pub struct TokenProfileTool {
    client: Arc<SolanaTokenClient>,
}

impl TokenProfileTool {
    pub fn new(client: Arc<SolanaTokenClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for TokenProfileTool {
    fn name(&self) -> &str {
        "token_profile"
    }

    fn description(&self) -> &str {
        "Get a CoinGecko market profile (price, market cap) for a Solana token by mint address."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "mint": {
                    "type": "string",
                    "description": "Token mint address"
                }
            },
            "required": ["mint"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let mint = params
            .get("mint")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidInput("missing 'mint' parameter".into()))?;

        let result = self.client.coin_profile(mint).await?;
        Ok(ToolOutput::success(result, start.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const SOL_MINT: &str = "So11111111111111111111111111111111111111112";

    #[test]
    fn test_mint_validation() {
        assert!(validate_mint(SOL_MINT).is_ok());
        assert!(validate_mint("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v").is_ok());

        assert!(validate_mint("").is_err());
        assert!(validate_mint("too-short").is_err());
        // 'l' is not in the base58 alphabet.
        assert!(validate_mint("l111111111111111111111111111111111111111111").is_err());
    }

    #[test]
    fn test_split_mints() {
        let list = split_mints(&format!("{SOL_MINT}, {SOL_MINT}")).unwrap();
        assert_eq!(list.len(), 2);

        assert!(matches!(
            split_mints(""),
            Err(ToolError::InvalidInput(_))
        ));
        assert!(matches!(
            split_mints("not a mint"),
            Err(ToolError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_jupiter_price_decoding() {
        let body = json!({
            "data": {
                SOL_MINT: {
                    "id": SOL_MINT,
                    "type": "derivedPrice",
                    "price": "178.23"
                },
                "missing111111111111111111111111111111111112": null
            },
            "timeTaken": 0.002
        });

        let parsed: JupiterPriceResponse = serde_json::from_value(body).unwrap();
        let sol = parsed.data.get(SOL_MINT).unwrap().as_ref().unwrap();
        assert_eq!(value_as_f64(&sol.price), Some(178.23));
        assert!(parsed.data["missing111111111111111111111111111111111112"].is_none());
    }

    #[test]
    fn test_dexscreener_pair_decoding() {
        let body = json!({
            "schemaVersion": "1.0.0",
            "pairs": [{
                "chainId": "solana",
                "dexId": "raydium",
                "pairAddress": "58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2",
                "baseToken": { "address": SOL_MINT, "symbol": "SOL" },
                "quoteToken": { "symbol": "USDC" },
                "priceNative": "1.0000",
                "priceUsd": "178.01",
                "liquidity": { "usd": 12_345_678.9 }
            }]
        });

        let parsed: DexScreenerResponse = serde_json::from_value(body).unwrap();
        let pair = parsed.pairs.unwrap().remove(0);
        assert_eq!(pair.dex_id, "raydium");
        assert_eq!(value_as_f64(&pair.price_usd), Some(178.01));
        assert_eq!(pair.liquidity.unwrap().usd, Some(12_345_678.9));
    }

    #[test]
    fn test_coingecko_profile_decoding() {
        let body = json!({
            "id": "wrapped-solana",
            "symbol": "sol",
            "name": "Wrapped SOL",
            "market_data": {
                "current_price": { "usd": 178.11, "eur": 163.0 },
                "market_cap": { "usd": 84_000_000_000.0 }
            }
        });

        let parsed: CoinGeckoProfile = serde_json::from_value(body).unwrap();
        let market = parsed.market_data.unwrap();
        assert_eq!(market.current_price.get("usd"), Some(&178.11));
        assert_eq!(parsed.symbol, "sol");
    }

    #[test]
    fn test_value_as_f64() {
        assert_eq!(value_as_f64(&json!(1.5)), Some(1.5));
        assert_eq!(value_as_f64(&json!("2.75")), Some(2.75));
        assert_eq!(value_as_f64(&json!("not a number")), None);
        assert_eq!(value_as_f64(&json!(null)), None);
    }

    #[test]
    fn test_merge_source_embeds_error() {
        let merged = merge_source(Err(ToolError::Transient("reset".into())));
        assert_eq!(merged["error"]["kind"], "transient_network");

        let merged = merge_source(Ok(json!({"price": 1.0})));
        assert_eq!(merged["price"], 1.0);
    }
}
