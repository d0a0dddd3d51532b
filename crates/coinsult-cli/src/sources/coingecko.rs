//! CoinGecko price and market data

use async_trait::async_trait;
use coinsult_agent::{MarketData, PriceQuote, PriceSource, SourceError};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{http_error, read_json, status_error};

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const SERVICE: &str = "coingecko";

/// Well-known tickers and the CoinGecko ids they stand for
const TICKERS: &[(&str, &str)] = &[
    ("btc", "bitcoin"),
    ("eth", "ethereum"),
    ("xrp", "ripple"),
    ("sol", "solana"),
    ("ada", "cardano"),
    ("doge", "dogecoin"),
    ("dot", "polkadot"),
    ("matic", "polygon-ecosystem-token"),
    ("avax", "avalanche-2"),
    ("link", "chainlink"),
    ("bnb", "binancecoin"),
    ("ltc", "litecoin"),
    ("ton", "the-open-network"),
    ("trx", "tron"),
    ("shib", "shiba-inu"),
    ("usdt", "tether"),
    ("usdc", "usd-coin"),
];

/// Map a ticker or name to a CoinGecko id
pub fn resolve_coin_id(coin: &str) -> String {
    let coin = coin.trim().to_lowercase();
    TICKERS
        .iter()
        .find(|(ticker, _)| *ticker == coin)
        .map(|(_, id)| id.to_string())
        .unwrap_or(coin)
}

#[derive(Debug, Deserialize)]
struct MarketsItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
    current_price: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    market_cap: Option<f64>,
    total_volume: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CoinDetail {
    #[serde(default)]
    name: String,
    #[serde(default)]
    symbol: String,
    #[serde(default)]
    market_data: DetailMarketData,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct DetailMarketData {
    current_price: Usd,
    price_change_percentage_24h: Option<f64>,
    price_change_percentage_7d: Option<f64>,
    price_change_percentage_30d: Option<f64>,
    market_cap: Usd,
    total_volume: Usd,
    ath: Usd,
    ath_change_percentage: Usd,
}

/// A per-currency map; only the USD entry is read
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Usd {
    usd: Option<f64>,
}

fn quote_from_markets(coin_id: &str, items: Vec<MarketsItem>) -> Result<PriceQuote, SourceError> {
    let Some(item) = items.into_iter().next() else {
        return Err(SourceError::NotFound(format!("coin '{coin_id}' not found")));
    };
    Ok(PriceQuote {
        name: item.name,
        symbol: item.symbol.to_uppercase(),
        price_usd: item.current_price,
        price_change_24h_pct: item.price_change_percentage_24h,
        market_cap_usd: item.market_cap,
        total_volume_usd: item.total_volume,
    })
}

fn market_from_detail(detail: CoinDetail) -> MarketData {
    let data = detail.market_data;
    MarketData {
        name: detail.name,
        symbol: detail.symbol.to_uppercase(),
        price_usd: data.current_price.usd,
        price_change_24h_pct: data.price_change_percentage_24h,
        price_change_7d_pct: data.price_change_percentage_7d,
        price_change_30d_pct: data.price_change_percentage_30d,
        market_cap_usd: data.market_cap.usd,
        total_volume_usd: data.total_volume.usd,
        ath_usd: data.ath.usd,
        ath_change_pct: data.ath_change_percentage.usd,
    }
}

/// CoinGecko public API adapter
pub struct CoinGecko {
    client: Client,
}

impl CoinGecko {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PriceSource for CoinGecko {
    async fn price(&self, coin: &str) -> Result<PriceQuote, SourceError> {
        let coin_id = resolve_coin_id(coin);
        let response = self
            .client
            .get(format!("{BASE_URL}/coins/markets"))
            .query(&[
                ("vs_currency", "usd"),
                ("ids", coin_id.as_str()),
                ("order", "market_cap_desc"),
                ("sparkline", "false"),
                ("price_change_percentage", "24h"),
            ])
            .send()
            .await
            .map_err(http_error)?;

        if !response.status().is_success() {
            return Err(status_error(SERVICE, response).await);
        }

        let items: Vec<MarketsItem> = read_json(response).await?;
        quote_from_markets(&coin_id, items)
    }

    async fn market_data(&self, coin: &str) -> Result<MarketData, SourceError> {
        let coin_id = resolve_coin_id(coin);
        let response = self
            .client
            .get(format!("{BASE_URL}/coins/{coin_id}"))
            .query(&[
                ("localization", "false"),
                ("tickers", "false"),
                ("community_data", "false"),
                ("developer_data", "false"),
            ])
            .send()
            .await
            .map_err(http_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => {
                return Err(SourceError::NotFound(format!("coin '{coin_id}' not found")));
            }
            status if !status.is_success() => return Err(status_error(SERVICE, response).await),
            _ => {}
        }

        let detail: CoinDetail = read_json(response).await?;
        Ok(market_from_detail(detail))
    }
}
