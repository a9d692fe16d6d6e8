//! Market data provider client.
//!
//! Daily bars come from the Yahoo Finance chart endpoint
//! (`/v8/finance/chart/{symbol}?range=5d&interval=1d`). The provider sits
//! behind [`MarketDataProvider`] so the sync service can run against a fake.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use chrono_tz::Tz;
use reqwest::{StatusCode, Url};
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, warn};

pub const YAHOO_BASE_URL: &str = "https://query1.finance.yahoo.com";

/// Trailing window requested on every refresh.
pub const HISTORY_RANGE: &str = "5d";
const HISTORY_INTERVAL: &str = "1d";

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// One daily observation as returned by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}

#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("request to market data provider failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("market data provider returned HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("market data provider error: {0}")]
    Provider(String),
    #[error("failed to decode market data response: {0}")]
    Decode(String),
}

#[async_trait]
pub trait MarketDataProvider: Send + Sync {
    /// Short identifier used in logs.
    fn id(&self) -> &'static str;

    /// Daily bars for the last [`HISTORY_RANGE`], oldest first.
    ///
    /// An unknown symbol yields an empty list rather than an error.
    async fn daily_history(&self, symbol: &str) -> Result<Vec<DailyBar>, MarketDataError>;
}

/// Yahoo Finance chart API client
pub struct YahooClient {
    client: reqwest::Client,
    base_url: Url,
}

impl YahooClient {
    pub fn new(base_url: &str) -> Result<Self, MarketDataError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| MarketDataError::Provider(format!("invalid base url '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(MarketDataError::Provider(format!(
                "invalid base url '{}'",
                base_url
            )));
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, base_url })
    }

    fn chart_url(&self, symbol: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments
                .pop_if_empty()
                .extend(["v8", "finance", "chart", symbol]);
        }
        url
    }
}

#[async_trait]
impl MarketDataProvider for YahooClient {
    fn id(&self) -> &'static str {
        "YAHOO"
    }

    async fn daily_history(&self, symbol: &str) -> Result<Vec<DailyBar>, MarketDataError> {
        let url = self.chart_url(symbol);
        debug!("Fetching {} daily history for {} from {}", HISTORY_RANGE, symbol, url);

        let response = self
            .client
            .get(url)
            .query(&[("range", HISTORY_RANGE), ("interval", HISTORY_INTERVAL)])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if status == StatusCode::NOT_FOUND {
            warn!("Yahoo has no chart for symbol {}", symbol);
            return Ok(Vec::new());
        }
        if !status.is_success() {
            return Err(MarketDataError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let chart: ChartResponse =
            serde_json::from_str(&body).map_err(|e| MarketDataError::Decode(e.to_string()))?;
        bars_from_chart(chart)
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartEnvelope,
}

#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    exchange_timezone_name: Option<String>,
    #[serde(default)]
    gmtoffset: i64,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

fn bars_from_chart(response: ChartResponse) -> Result<Vec<DailyBar>, MarketDataError> {
    if let Some(err) = response.chart.error {
        if err.code == "Not Found" {
            return Ok(Vec::new());
        }
        return Err(MarketDataError::Provider(format!(
            "{}: {}",
            err.code,
            err.description.unwrap_or_default()
        )));
    }

    let Some(result) = response.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };
    let Some(quote) = result.indicators.quote.first() else {
        return Ok(Vec::new());
    };

    let tz = result
        .meta
        .exchange_timezone_name
        .as_deref()
        .and_then(|name| name.parse::<Tz>().ok());

    let mut bars = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
        ) else {
            debug!("Skipping incomplete bar at {}", ts);
            continue;
        };
        let Some(date) = trading_date(ts, tz, result.meta.gmtoffset) else {
            warn!("Skipping bar with out-of-range timestamp {}", ts);
            continue;
        };

        bars.push(DailyBar {
            timestamp: date.and_time(NaiveTime::MIN),
            open,
            high,
            low,
            close,
            volume: at(&quote.volume, i).map(|v| v.round() as i64).unwrap_or(0),
        });
    }

    Ok(bars)
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

/// Calendar date of a bar in the exchange's time zone.
fn trading_date(ts: i64, tz: Option<Tz>, gmtoffset: i64) -> Option<NaiveDate> {
    let utc = DateTime::from_timestamp(ts, 0)?;
    Some(match tz {
        Some(tz) => utc.with_timezone(&tz).date_naive(),
        None => (utc + chrono::Duration::seconds(gmtoffset)).date_naive(),
    })
}
