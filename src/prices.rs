use std::collections::HashMap;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info};

use crate::{
    consts::{COINGECKO_TIMEOUT, USD_PROXY_COINGECKO_ID},
    errors::BotError,
    types::Symbol,
};

#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub price_usd: f64,
    pub price_rub: f64,
    pub change_24h_pct: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PriceSnapshot {
    pub quotes: HashMap<Symbol, PriceQuote>,
    /// `None` when the feed did not return the USD proxy coin.
    pub usd_to_rub: Option<f64>,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct SimplePrice {
    usd: Option<f64>,
    rub: Option<f64>,
    usd_24h_change: Option<f64>,
}

/// Parses a CoinGecko `simple/price` body. `ids` maps our symbols to
/// CoinGecko ids; coins missing from the body or without a USD price are
/// skipped.
pub fn parse_simple_price(
    body: &str,
    ids: &[(Symbol, String)],
    fetched_at: DateTime<Utc>,
) -> Result<PriceSnapshot, serde_json::Error> {
    let parsed: HashMap<String, SimplePrice> = serde_json::from_str(body)?;

    let mut quotes = HashMap::new();
    for (symbol, coingecko_id) in ids {
        match parsed.get(coingecko_id) {
            Some(SimplePrice {
                usd: Some(usd),
                rub,
                usd_24h_change,
            }) if usd.is_finite() && *usd >= 0.0 => {
                quotes.insert(
                    symbol.clone(),
                    PriceQuote {
                        price_usd: *usd,
                        price_rub: rub.unwrap_or(0.0),
                        change_24h_pct: usd_24h_change.unwrap_or(0.0),
                    },
                );
            }
            _ => debug!("No price for {} ({})", symbol, coingecko_id),
        }
    }

    let usd_to_rub = parsed
        .get(USD_PROXY_COINGECKO_ID)
        .and_then(|x| x.rub)
        .filter(|x| x.is_finite() && *x > 0.0);

    Ok(PriceSnapshot {
        quotes,
        usd_to_rub,
        fetched_at,
    })
}

pub struct PriceFeed {
    client: Client,
    base_url: String,
}

impl PriceFeed {
    pub fn new(base_url: &str) -> Result<PriceFeed, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(COINGECKO_TIMEOUT)
            .build()?;

        Ok(PriceFeed {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn fetch(&self, ids: &[(Symbol, String)]) -> Result<PriceSnapshot, BotError> {
        let mut query_ids: Vec<&str> = ids.iter().map(|x| x.1.as_str()).collect();
        if !query_ids.contains(&USD_PROXY_COINGECKO_ID) {
            query_ids.push(USD_PROXY_COINGECKO_ID);
        }

        let url = format!("{}/simple/price", self.base_url);
        let ids_param = query_ids.join(",");
        let response = self
            .client
            .get(&url)
            .query(&[
                ("ids", ids_param.as_str()),
                ("vs_currencies", "usd,rub"),
                ("include_24hr_change", "true"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        let snapshot = parse_simple_price(&body, ids, Utc::now())?;
        info!(
            "Fetched {} prices from CoinGecko, USD/RUB {:?}",
            snapshot.quotes.len(),
            snapshot.usd_to_rub
        );

        Ok(snapshot)
    }
}
