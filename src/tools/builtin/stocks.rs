//! Stock market data tools backed by the Yahoo Finance chart API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::Settings;
use crate::tools::tool::{Tool, ToolError, ToolOutput};

const RANGES: [&str; 9] = ["1d", "5d", "1mo", "3mo", "6mo", "1y", "2y", "5y", "max"];
const INTERVALS: [&str; 7] = ["1m", "5m", "15m", "1h", "1d", "1wk", "1mo"];

/// Client for the Yahoo Finance chart API.
pub struct YahooFinanceClient {
    client: Client,
    base_url: String,
}

impl YahooFinanceClient {
    /// Create a new client from settings.
    pub fn new(settings: &Settings) -> Self {
        let client = Client::builder()
            .timeout(settings.http.timeout)
            .user_agent(settings.http.user_agent.clone())
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url: settings.providers.yahoo_base_url.clone(),
        }
    }

    /// Fetch the latest quote for a symbol.
    pub async fn quote(&self, symbol: &str) -> Result<Quote, ToolError> {
        let chart = self.fetch_chart(symbol, "1d", "1d").await?;
        chart.to_quote()
    }

    /// Fetch historical bars for a symbol.
    pub async fn history(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<Vec<Bar>, ToolError> {
        let chart = self.fetch_chart(symbol, range, interval).await?;
        Ok(chart.to_bars())
    }

    async fn fetch_chart(
        &self,
        symbol: &str,
        range: &str,
        interval: &str,
    ) -> Result<ChartResult, ToolError> {
        validate_symbol(symbol)?;

        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        tracing::debug!(%symbol, %range, %interval, "fetching chart data");

        let response = self
            .client
            .get(&url)
            .query(&[("range", range), ("interval", interval)])
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(map_request_error)?;

        let parsed: ChartResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(_) if status >= 400 => {
                return Err(ToolError::Provider {
                    status: Some(status),
                    message: format!("HTTP {status} from quote provider"),
                });
            }
            Err(e) => {
                return Err(ToolError::Provider {
                    status: Some(status),
                    message: format!("undecodable chart response: {e}"),
                });
            }
        };

        if let Some(error) = parsed.chart.error {
            // Yahoo reports unknown or delisted symbols as a 404 with an
            // error payload; that is an input problem, not an outage.
            if status == 404 {
                return Err(ToolError::InvalidInput(format!(
                    "unknown symbol '{}': {}",
                    symbol, error.description
                )));
            }
            return Err(ToolError::Provider {
                status: Some(status),
                message: format!("{}: {}", error.code, error.description),
            });
        }

        if status >= 400 {
            return Err(ToolError::Provider {
                status: Some(status),
                message: format!("HTTP {status} from quote provider"),
            });
        }

        parsed
            .chart
            .result
            .and_then(|mut results| {
                if results.is_empty() {
                    None
                } else {
                    Some(results.remove(0))
                }
            })
            .ok_or_else(|| ToolError::Provider {
                status: Some(status),
                message: "chart response contained no result".to_string(),
            })
    }
}

/// Reject symbols Yahoo could never know before spending a request.
fn validate_symbol(symbol: &str) -> Result<(), ToolError> {
    if symbol.is_empty() || symbol.len() > 12 {
        return Err(ToolError::InvalidInput(format!(
            "invalid symbol '{symbol}': must be 1-12 characters"
        )));
    }

    if !symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^' | '='))
    {
        return Err(ToolError::InvalidInput(format!(
            "invalid symbol '{symbol}': unexpected characters"
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

/// Normalized latest quote.
#[derive(Debug, Clone, Serialize)]
pub struct Quote {
    pub symbol: String,
    pub price: f64,
    pub currency: Option<String>,
    pub exchange: Option<String>,
    /// Exchange timestamp of the price, RFC 3339.
    pub timestamp: Option<String>,
    pub previous_close: Option<f64>,
}

/// One normalized OHLCV bar.
#[derive(Debug, Clone, Serialize)]
pub struct Bar {
    pub timestamp: String,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: f64,
    pub volume: Option<f64>,
}

// --- Wire types ---

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    #[serde(default)]
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Option<Vec<i64>>,
    #[serde(default)]
    indicators: Indicators,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    exchange_name: Option<String>,
    #[serde(default)]
    regular_market_price: Option<f64>,
    #[serde(default)]
    regular_market_time: Option<i64>,
    #[serde(default)]
    chart_previous_close: Option<f64>,
}

#[derive(Debug, Default, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteBlock>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteBlock {
    #[serde(default)]
    open: Option<Vec<Option<f64>>>,
    #[serde(default)]
    high: Option<Vec<Option<f64>>>,
    #[serde(default)]
    low: Option<Vec<Option<f64>>>,
    #[serde(default)]
    close: Option<Vec<Option<f64>>>,
    #[serde(default)]
    volume: Option<Vec<Option<f64>>>,
}

impl ChartResult {
    fn to_quote(&self) -> Result<Quote, ToolError> {
        let price = self
            .meta
            .regular_market_price
            .ok_or_else(|| ToolError::Provider {
                status: None,
                message: format!("no market price for '{}'", self.meta.symbol),
            })?;

        Ok(Quote {
            symbol: self.meta.symbol.clone(),
            price,
            currency: self.meta.currency.clone(),
            exchange: self.meta.exchange_name.clone(),
            timestamp: self.meta.regular_market_time.and_then(format_timestamp),
            previous_close: self.meta.chart_previous_close,
        })
    }

    fn to_bars(&self) -> Vec<Bar> {
        let Some(timestamps) = &self.timestamp else {
            return Vec::new();
        };
        let Some(block) = self.indicators.quote.first() else {
            return Vec::new();
        };

        let series = |field: &Option<Vec<Option<f64>>>, i: usize| -> Option<f64> {
            field.as_ref().and_then(|v| v.get(i).copied().flatten())
        };

        timestamps
            .iter()
            .enumerate()
            .filter_map(|(i, ts)| {
                // Yahoo pads sparse series with nulls; a bar without a close
                // carries no information.
                let close = series(&block.close, i)?;
                Some(Bar {
                    timestamp: format_timestamp(*ts)?,
                    open: series(&block.open, i),
                    high: series(&block.high, i),
                    low: series(&block.low, i),
                    close,
                    volume: series(&block.volume, i),
                })
            })
            .collect()
    }
}

fn format_timestamp(secs: i64) -> Option<String> {
    chrono::DateTime::from_timestamp(secs, 0).map(|t| t.to_rfc3339())
}

/// Tool returning the latest quote for a stock symbol.
pub struct StockQuoteTool {
    client: Arc<YahooFinanceClient>,
}

impl StockQuoteTool {
    pub fn new(client: Arc<YahooFinanceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for StockQuoteTool {
    fn name(&self) -> &str {
        "stock_quote"
    }

    fn description(&self) -> &str {
        "Get the latest market price for a stock ticker symbol, with currency and exchange timestamp."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "Ticker symbol, e.g. AAPL or BTC-USD"
                }
            },
            "required": ["symbol"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let symbol = params
            .get("symbol")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidInput("missing 'symbol' parameter".into()))?;

        let quote = self.client.quote(symbol).await?;
        let result = serde_json::to_value(&quote).map_err(|e| ToolError::Provider {
            status: None,
            message: format!("failed to encode quote: {e}"),
        })?;

        Ok(ToolOutput::success(result, start.elapsed()))
    }
}

/// Tool returning historical OHLCV bars for a stock symbol.
pub struct StockHistoryTool {
    client: Arc<YahooFinanceClient>,
}

impl StockHistoryTool {
    pub fn new(client: Arc<YahooFinanceClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Tool for StockHistoryTool {
    fn name(&self) -> &str {
        "stock_history"
    }

    fn description(&self) -> &str {
        "Get historical OHLCV price bars for a stock ticker symbol over a chosen range and interval."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {
                "symbol": {
                    "type": "string",
                    "description": "Ticker symbol, e.g. AAPL"
                },
                "range": {
                    "type": "string",
                    "enum": RANGES,
                    "description": "How far back to fetch (default: 1mo)"
                },
                "interval": {
                    "type": "string",
                    "enum": INTERVALS,
                    "description": "Bar width (default: 1d)"
                }
            },
            "required": ["symbol"]
        })
    }

    async fn execute(&self, params: serde_json::Value) -> Result<ToolOutput, ToolError> {
        let start = std::time::Instant::now();

        let symbol = params
            .get("symbol")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidInput("missing 'symbol' parameter".into()))?;
        let range = params
            .get("range")
            .and_then(|v| v.as_str())
            .unwrap_or("1mo");
        let interval = params
            .get("interval")
            .and_then(|v| v.as_str())
            .unwrap_or("1d");

        let bars = self.client.history(symbol, range, interval).await?;
        let result = serde_json::json!({
            "symbol": symbol,
            "range": range,
            "interval": interval,
            "bars": bars,
        });

        Ok(ToolOutput::success(result, start.elapsed()))
    }
}
