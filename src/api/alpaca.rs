use super::{Brokerage, MarketData};
use crate::models::{Bar, Holding, MarketClock, Order, Quote, TradingDay};
use crate::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use governor::{Quota, RateLimiter};
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use std::sync::Arc;
use uuid::Uuid;

const RATE_LIMIT_RPM: u32 = 200; // Trading API: 200 requests per minute
const BARS_PAGE_LIMIT: u32 = 1000;

type AlpacaRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// Client for the Alpaca trading and market data APIs
///
/// Implements both gateways. Every call is rate limited and
/// none are retried - errors go straight back to the caller.
#[derive(Clone)]
pub struct AlpacaClient {
    client: Client,
    trading_url: String,
    data_url: String,
    feed: String,
    rate_limiter: Arc<AlpacaRateLimiter>,
}

// ============== Response Types ==============

#[derive(Debug, Deserialize)]
struct AccountResponse {
    non_marginable_buying_power: Decimal,
}

#[derive(Debug, Deserialize)]
struct PositionResponse {
    symbol: String,
    qty: Decimal,
}

#[derive(Debug, Deserialize)]
struct LatestQuoteResponse {
    symbol: String,
    quote: QuoteData,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(rename = "ap")]
    ask_price: Decimal,
    #[serde(rename = "t")]
    timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct BarsResponse {
    #[serde(default)]
    bars: Option<Vec<BarData>>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BarData {
    #[serde(rename = "t")]
    timestamp: DateTime<Utc>,
    #[serde(rename = "c")]
    close: Decimal,
}

// ============== Request Types ==============

#[derive(Debug, Serialize)]
struct NotionalOrderRequest<'a> {
    symbol: &'a str,
    notional: String,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
}

// ============== Implementation ==============

impl AlpacaClient {
    pub fn new(
        api_key: &str,
        secret_key: &str,
        trading_url: impl Into<String>,
        data_url: impl Into<String>,
        feed: impl Into<String>,
    ) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert("apca-api-key-id", header_value(api_key)?);
        headers.insert("apca-api-secret-key", header_value(secret_key)?);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let rpm = NonZeroU32::new(RATE_LIMIT_RPM).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            client,
            trading_url: trading_url.into().trim_end_matches('/').to_string(),
            data_url: data_url.into().trim_end_matches('/').to_string(),
            feed: feed.into(),
            rate_limiter,
        })
    }

    /// Send a rate-limited request and decode the JSON body
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.json().await?)
    }
}

fn header_value(secret: &str) -> Result<HeaderValue> {
    let mut value = HeaderValue::from_str(secret)
        .map_err(|_| Error::Secrets("API credential is not a valid header value".to_string()))?;
    value.set_sensitive(true);
    Ok(value)
}

#[async_trait]
impl MarketData for AlpacaClient {
    /// Endpoint: GET /v2/stocks/{symbol}/quotes/latest
    async fn latest_quote(&self, symbol: &str) -> Result<Quote> {
        let url = format!("{}/v2/stocks/{}/quotes/latest", self.data_url, symbol);
        let request = self.client.get(&url).query(&[("feed", self.feed.as_str())]);

        let data: LatestQuoteResponse = self.send(request).await?;

        tracing::debug!(
            symbol = %data.symbol,
            ask = %data.quote.ask_price,
            "Fetched latest quote"
        );

        Ok(Quote {
            symbol: data.symbol,
            ask_price: data.quote.ask_price,
            timestamp: data.quote.timestamp,
        })
    }

    /// Endpoint: GET /v2/stocks/{symbol}/bars?timeframe=1Day
    ///
    /// Follows `next_page_token` until the range is exhausted.
    async fn daily_bars(&self, symbol: &str, start: NaiveDate) -> Result<Vec<Bar>> {
        let url = format!("{}/v2/stocks/{}/bars", self.data_url, symbol);
        let start = start.format("%Y-%m-%d").to_string();
        let limit = BARS_PAGE_LIMIT.to_string();

        let mut bars = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut query = vec![
                ("timeframe", "1Day"),
                ("start", start.as_str()),
                ("limit", limit.as_str()),
                ("feed", self.feed.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("page_token", token));
            }

            let request = self.client.get(&url).query(&query);
            let page: BarsResponse = self.send(request).await?;

            bars.extend(page.bars.unwrap_or_default().into_iter().map(|bar| Bar {
                symbol: symbol.to_string(),
                date: bar.timestamp.date_naive(),
                close: bar.close,
            }));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        bars.sort_by_key(|bar| bar.date);

        tracing::debug!("Fetched {} daily bars for {}", bars.len(), symbol);

        Ok(bars)
    }

    /// Endpoint: GET /v2/calendar?start={start}&end={end}
    async fn trading_days(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<TradingDay>> {
        let url = format!("{}/v2/calendar", self.trading_url);
        let request = self.client.get(&url).query(&[
            ("start", start.format("%Y-%m-%d").to_string()),
            ("end", end.format("%Y-%m-%d").to_string()),
        ]);

        let mut days: Vec<TradingDay> = self.send(request).await?;
        days.sort_by_key(|day| day.date);

        Ok(days)
    }
}

#[async_trait]
impl Brokerage for AlpacaClient {
    /// Endpoint: GET /v2/account
    async fn cash_available(&self) -> Result<Decimal> {
        let url = format!("{}/v2/account", self.trading_url);
        let account: AccountResponse = self.send(self.client.get(&url)).await?;
        Ok(account.non_marginable_buying_power)
    }

    /// Endpoint: GET /v2/positions
    async fn positions(&self) -> Result<Vec<Holding>> {
        let url = format!("{}/v2/positions", self.trading_url);
        let positions: Vec<PositionResponse> = self.send(self.client.get(&url)).await?;

        Ok(positions
            .into_iter()
            .map(|p| Holding {
                symbol: p.symbol,
                quantity: p.qty,
            })
            .collect())
    }

    /// Endpoint: POST /v2/orders
    async fn submit_notional_buy(&self, symbol: &str, notional: Decimal) -> Result<Order> {
        let url = format!("{}/v2/orders", self.trading_url);
        let body = NotionalOrderRequest {
            symbol,
            notional: notional.to_string(),
            side: "buy",
            order_type: "market",
            time_in_force: "day",
        };

        self.send(self.client.post(&url).json(&body)).await
    }

    /// Endpoint: DELETE /v2/positions/{symbol}
    async fn close_position(&self, symbol: &str) -> Result<Order> {
        let url = format!("{}/v2/positions/{}", self.trading_url, symbol);
        self.send(self.client.delete(&url)).await
    }

    /// Endpoint: GET /v2/orders/{id}
    async fn order(&self, id: Uuid) -> Result<Order> {
        let url = format!("{}/v2/orders/{}", self.trading_url, id);
        self.send(self.client.get(&url)).await
    }

    /// Endpoint: GET /v2/clock
    async fn clock(&self) -> Result<MarketClock> {
        let url = format!("{}/v2/clock", self.trading_url);
        self.send(self.client.get(&url)).await
    }
}
