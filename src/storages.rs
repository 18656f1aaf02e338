use std::collections::{BTreeMap, HashMap};

use chrono::Utc;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sqlx::{Pool, Postgres};
use tracing::{error, info, warn};

use crate::{
    algorithm::Algorithm,
    consts::{default_coin, FALLBACK_USD_TO_RUB},
    hashrate::{HashRate, HashRateUnit},
    models::{
        AsicModel, BotUser, CoinNetwork, CoinQuote, SellOffer, SellRequest, SellRequestStatus,
        UsedDeviceGuide,
    },
    prices::PriceSnapshot,
    types::{ModelId, Symbol, TgUserId},
};

pub async fn ensure_schema(db: &Pool<Postgres>) -> Result<(), sqlx::Error> {
    sqlx::query("CREATE TABLE IF NOT EXISTS bot_state (key TEXT PRIMARY KEY, value TEXT NOT NULL)")
        .execute(db)
        .await?;
    Ok(())
}

/// Engines are kept in memory and dumped to `bot_state` as one JSON document
/// per engine.
pub trait DbSerializable: Serialize + DeserializeOwned + Sized {
    const KEY: &'static str;

    fn fresh() -> Self;

    async fn deserialize(db: &Pool<Postgres>) -> Self {
        let value = Self::deserialize_load(db, Self::KEY).await;
        if let Some(encoded) = value {
            return match serde_json::from_str::<Self>(&encoded) {
                Ok(engine) => engine,
                Err(err) => {
                    error!("Failed to deserialize state for {}: {}", Self::KEY, err);
                    Self::fresh()
                }
            };
        }
        Self::fresh()
    }

    async fn serialize(&self, db: &Pool<Postgres>) {
        match serde_json::to_string(self) {
            Ok(serialized) => Self::serialize_to_db(db, Self::KEY, serialized).await,
            Err(err) => error!("Failed to serialize state for {}: {}", Self::KEY, err),
        }
    }

    async fn deserialize_load(db: &Pool<Postgres>, key: &str) -> Option<String> {
        match sqlx::query_scalar("SELECT value FROM bot_state WHERE key = $1")
            .bind(key)
            .fetch_one(db)
            .await
        {
            Ok(it) => it,
            Err(err) => {
                match err {
                    sqlx::Error::RowNotFound => warn!("No saved state for {}", key),
                    _ => {
                        warn!("Failed to load state for {} {:?}", key, err);
                    }
                }

                None
            }
        }
    }

    async fn serialize_to_db(db: &Pool<Postgres>, key: &str, serialized: String) {
        match sqlx::query(
            "INSERT INTO bot_state (key, value) VALUES ($1, $2) ON CONFLICT (key) DO UPDATE SET value = $2",
        )
        .bind(key)
        .bind(serialized)
        .execute(db)
        .await
        {
            Ok(_) => {}
            Err(err) => error!(
                "Failed to serialize and save state for {}: {:?}",
                key, err
            ),
        };
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct MarketEngine {
    pub quotes: HashMap<Symbol, CoinQuote>,
    pub networks: HashMap<Symbol, CoinNetwork>,
    pub usd_to_rub: Option<f64>,
}

fn quote(symbol: &str, name: &str, coingecko_id: &str, algorithm: Option<Algorithm>) -> CoinQuote {
    CoinQuote {
        symbol: symbol.to_string(),
        name: name.to_string(),
        coingecko_id: coingecko_id.to_string(),
        algorithm,
        price_usd: 0.0,
        price_rub: 0.0,
        change_24h_pct: 0.0,
        updated_at: None,
    }
}

fn network(
    symbol: &str,
    magnitude: f64,
    unit: HashRateUnit,
    block_reward: f64,
    block_time_override: Option<f64>,
) -> CoinNetwork {
    CoinNetwork {
        symbol: symbol.to_string(),
        network_hashrate: HashRate::new(magnitude, unit),
        block_reward,
        block_time_override,
    }
}

impl MarketEngine {
    /// Supported coins with seed network data. Prices arrive with the first
    /// feed refresh; network data is edited by the admin.
    pub fn with_defaults() -> Self {
        let quotes = [
            quote("BTC", "Bitcoin", "bitcoin", Some(Algorithm::Sha256)),
            quote("BCH", "Bitcoin Cash", "bitcoin-cash", Some(Algorithm::Sha256)),
            quote("BSV", "Bitcoin SV", "bitcoin-sv", Some(Algorithm::Sha256)),
            quote("LTC", "Litecoin", "litecoin", Some(Algorithm::Scrypt)),
            quote("DOGE", "Dogecoin", "dogecoin", Some(Algorithm::Scrypt)),
            quote("ETC", "Ethereum Classic", "ethereum-classic", Some(Algorithm::Etchash)),
            quote("ETHW", "Ethereum PoW", "ethereum-pow-iou", Some(Algorithm::Etchash)),
            quote("KAS", "Kaspa", "kaspa", Some(Algorithm::KHeavyHash)),
            quote("KDA", "Kadena", "kadena", Some(Algorithm::Blake2s)),
            quote("HNS", "Handshake", "handshake", Some(Algorithm::Blake2bSha3)),
            quote("ETH", "Ethereum", "ethereum", None),
            quote("USDT", "Tether", "tether", None),
        ];
        let networks = [
            network("BTC", 1_068_844_948.0, HashRateUnit::Ths, 3.125, None),
            network("BCH", 5_000_000.0, HashRateUnit::Ths, 3.125, None),
            network("BSV", 600_000.0, HashRateUnit::Ths, 3.125, None),
            network("LTC", 3_464_270.0, HashRateUnit::Ghs, 6.25, None),
            network("DOGE", 2_958_883.0, HashRateUnit::Ghs, 10_000.0, Some(60.0)),
            network("ETC", 387_376_804.0, HashRateUnit::Mhs, 2.56, None),
            network("KAS", 300_000.0, HashRateUnit::Ths, 100.0, None),
            network("KDA", 3_000.0, HashRateUnit::Ths, 3.5, None),
            network("HNS", 250_000.0, HashRateUnit::Ghs, 1_000.0, Some(600.0)),
        ];

        MarketEngine {
            quotes: quotes
                .into_iter()
                .map(|x| (x.symbol.clone(), x))
                .collect(),
            networks: networks
                .into_iter()
                .map(|x| (x.symbol.clone(), x))
                .collect(),
            usd_to_rub: None,
        }
    }
}

pub enum MarketUpdateDecision {
    Updated,
    UnknownCoin,
}

/// Read access used to assemble calculation requests.
#[cfg_attr(test, mockall::automock)]
pub trait MarketEngineTrait {
    fn get_quote(&self, symbol: &str) -> Option<CoinQuote>;
    fn get_network(&self, symbol: &str) -> Option<CoinNetwork>;
    fn get_usd_to_rub(&self) -> f64;
    fn get_default_coin(&self, algorithm: Algorithm) -> Option<Symbol>;
}

impl MarketEngineTrait for MarketEngine {
    fn get_quote(&self, symbol: &str) -> Option<CoinQuote> {
        self.quotes.get(symbol).cloned()
    }

    fn get_network(&self, symbol: &str) -> Option<CoinNetwork> {
        self.networks.get(symbol).cloned()
    }

    fn get_usd_to_rub(&self) -> f64 {
        self.usd_to_rub.unwrap_or(FALLBACK_USD_TO_RUB)
    }

    fn get_default_coin(&self, algorithm: Algorithm) -> Option<Symbol> {
        let symbol = default_coin(algorithm);
        if self.quotes.contains_key(symbol) && self.networks.contains_key(symbol) {
            return Some(symbol.to_string());
        }
        // any coin of the algorithm that has network data
        let mut candidates: Vec<&CoinQuote> = self
            .quotes
            .values()
            .filter(|x| x.algorithm == Some(algorithm) && self.networks.contains_key(&x.symbol))
            .collect();
        candidates.sort_unstable_by(|a, b| a.symbol.cmp(&b.symbol));
        candidates.first().map(|x| x.symbol.clone())
    }
}

impl MarketEngine {
    pub fn get_size(&self) -> usize {
        self.quotes.len()
    }

    /// (symbol, coingecko id) pairs to request from the price feed.
    pub fn get_feed_ids(&self) -> Vec<(Symbol, String)> {
        let mut ids: Vec<(Symbol, String)> = self
            .quotes
            .values()
            .map(|x| (x.symbol.clone(), x.coingecko_id.clone()))
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Applies a feed snapshot; returns how many quotes were updated.
    pub fn apply_price_snapshot(&mut self, snapshot: &PriceSnapshot) -> usize {
        let mut updated = 0;
        for (symbol, price) in snapshot.quotes.iter() {
            if let Some(quote) = self.quotes.get_mut(symbol) {
                quote.price_usd = price.price_usd;
                quote.price_rub = price.price_rub;
                quote.change_24h_pct = price.change_24h_pct;
                quote.updated_at = Some(snapshot.fetched_at);
                updated += 1;
            }
        }
        if let Some(rate) = snapshot.usd_to_rub {
            self.usd_to_rub = Some(rate);
        }
        updated
    }

    pub fn set_price(&mut self, symbol: &str, price_usd: f64) -> MarketUpdateDecision {
        let rate = self.get_usd_to_rub();
        match self.quotes.get_mut(symbol) {
            Some(quote) => {
                quote.price_usd = price_usd;
                quote.price_rub = price_usd * rate;
                quote.updated_at = Some(Utc::now());
                MarketUpdateDecision::Updated
            }
            None => MarketUpdateDecision::UnknownCoin,
        }
    }

    pub fn set_network(&mut self, network: CoinNetwork) -> MarketUpdateDecision {
        if !self.quotes.contains_key(&network.symbol) {
            return MarketUpdateDecision::UnknownCoin;
        }
        info!(
            "Network data for {} set to {} | reward {} | block time {:?}",
            network.symbol, network.network_hashrate, network.block_reward, network.block_time_override
        );
        self.networks.insert(network.symbol.clone(), network);
        MarketUpdateDecision::Updated
    }

    /// Quotes in a stable display order.
    pub fn get_price_list(&self, symbols: &[&str]) -> Vec<&CoinQuote> {
        symbols.iter().filter_map(|x| self.quotes.get(*x)).collect()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CatalogEngine {
    pub models: HashMap<ModelId, AsicModel>,
}

pub enum CatalogDecision {
    New,
    NotChanged,
    Updated,
}

#[allow(clippy::too_many_arguments)]
fn asic(
    id: &str,
    manufacturer: &str,
    line: &str,
    name: &str,
    algorithm: Algorithm,
    hash_rate: HashRate,
    power_watts: f64,
    coins: &[&str],
) -> AsicModel {
    AsicModel {
        id: id.to_string(),
        manufacturer: manufacturer.to_string(),
        line: line.to_string(),
        name: name.to_string(),
        algorithm,
        hash_rate,
        power_watts,
        coins: coins.iter().map(|x| x.to_string()).collect(),
        price_rub: None,
    }
}

impl CatalogEngine {
    pub fn with_defaults() -> Self {
        use Algorithm::*;
        use HashRateUnit::*;
        const SHA: [&str; 3] = ["BTC", "BCH", "BSV"];

        let models = [
            asic("s19xp-141", "Bitmain", "S19", "Antminer S19 XP 141 TH/s", Sha256, HashRate::new(141.0, Ths), 3050.0, &SHA),
            asic("s19kpro-120", "Bitmain", "S19", "Antminer S19K PRO 120 TH/s", Sha256, HashRate::new(120.0, Ths), 3000.0, &SHA),
            asic("s21-200", "Bitmain", "S21", "Antminer S21 200 TH/s", Sha256, HashRate::new(200.0, Ths), 3500.0, &SHA),
            asic("s21pro-234", "Bitmain", "S21", "Antminer S21 Pro 234 TH/s", Sha256, HashRate::new(234.0, Ths), 3500.0, &SHA),
            asic("s21xphyd-473", "Bitmain", "S21", "Antminer S21 XP Hydro 473 TH/s", Sha256, HashRate::new(473.0, Ths), 5680.0, &SHA),
            asic("m60s-186", "Whatsminer", "M60", "M60S 186 TH/s", Sha256, HashRate::new(186.0, Ths), 3441.0, &SHA),
            asic("l7-9500", "Bitmain", "L7", "Antminer L7 9500 MH/s", Scrypt, HashRate::new(9_500.0, Mhs), 3425.0, &["LTC", "DOGE"]),
            asic("l9-16", "Bitmain", "L9", "Antminer L9 16 GH/s", Scrypt, HashRate::new(16.0, Ghs), 3360.0, &["LTC", "DOGE"]),
            asic("e9pro-3680", "Bitmain", "E9", "Antminer E9 Pro 3680 MH/s", Etchash, HashRate::new(3_680.0, Mhs), 2200.0, &["ETC", "ETHW"]),
            asic("ks0pro-200", "Ice River", "KS0", "KS0 PRO 200 GH/s", KHeavyHash, HashRate::new(200.0, Ghs), 100.0, &["KAS"]),
            asic("ks5l-12", "Ice River", "KS5", "KS5L 12 TH/s", KHeavyHash, HashRate::new(12.0, Ths), 3400.0, &["KAS"]),
            asic("ka3-166", "Bitmain", "KA3", "Antminer KA3 166 TH/s", Blake2s, HashRate::new(166.0, Ths), 3154.0, &["KDA"]),
            asic("hs3-9", "Goldshell", "HS", "HS3 9 GH/s", Blake2bSha3, HashRate::new(9.0, Ghs), 2000.0, &["HNS"]),
        ];

        CatalogEngine {
            models: models.into_iter().map(|x| (x.id.clone(), x)).collect(),
        }
    }
}

pub trait CatalogEngineTrait {
    fn get_size(&self) -> usize;
    fn get_model(&self, id: &str) -> Option<&AsicModel>;
    fn get_models(&self, filter: &str) -> Vec<&AsicModel>;
    fn upsert_model(&mut self, model: AsicModel) -> CatalogDecision;
    fn remove_model(&mut self, id: &str) -> bool;
}

impl CatalogEngineTrait for CatalogEngine {
    fn get_size(&self) -> usize {
        self.models.len()
    }

    fn get_model(&self, id: &str) -> Option<&AsicModel> {
        self.models.get(id.trim())
    }

    /// Models whose manufacturer, line or name contains `filter`, ordered by
    /// manufacturer, line and name. An empty filter lists everything.
    fn get_models(&self, filter: &str) -> Vec<&AsicModel> {
        let filter = filter.trim().to_lowercase();
        let mut result: Vec<&AsicModel> = self
            .models
            .values()
            .filter(|x| {
                filter.is_empty()
                    || x.manufacturer.to_lowercase().contains(&filter)
                    || x.line.to_lowercase().contains(&filter)
                    || x.name.to_lowercase().contains(&filter)
            })
            .collect();
        result.sort_unstable_by(|a, b| {
            (&a.manufacturer, &a.line, &a.name).cmp(&(&b.manufacturer, &b.line, &b.name))
        });
        result
    }

    fn upsert_model(&mut self, model: AsicModel) -> CatalogDecision {
        let id = model.id.clone();
        match self.models.insert(id, model) {
            Some(old_model) => {
                let new_model = &self.models[&old_model.id];
                match old_model.has_any_important_changes(new_model) {
                    true => CatalogDecision::Updated,
                    false => CatalogDecision::NotChanged,
                }
            }
            None => CatalogDecision::New,
        }
    }

    fn remove_model(&mut self, id: &str) -> bool {
        self.models.remove(id.trim()).is_some()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct UserEngine {
    pub users: HashMap<TgUserId, BotUser>,
}

impl UserEngine {
    pub fn new() -> Self {
        UserEngine {
            users: HashMap::new(),
        }
    }

    pub fn get_size(&self) -> usize {
        self.users.len()
    }

    /// Returns true for a first-time user.
    pub fn register(&mut self, chat_id: TgUserId, username: Option<String>) -> bool {
        match self.users.get_mut(&chat_id) {
            Some(user) => {
                user.username = username;
                false
            }
            None => {
                self.users.insert(
                    chat_id,
                    BotUser {
                        chat_id,
                        username,
                        joined_at: Utc::now(),
                        notifications: true,
                    },
                );
                true
            }
        }
    }

    /// Flips the notification flag; `None` for an unknown user.
    pub fn toggle_notifications(&mut self, chat_id: TgUserId) -> Option<bool> {
        let user = self.users.get_mut(&chat_id)?;
        user.notifications = !user.notifications;
        Some(user.notifications)
    }

    pub fn get_broadcast_recipients(&self) -> Vec<TgUserId> {
        let mut result: Vec<TgUserId> = self
            .users
            .values()
            .filter(|x| x.notifications)
            .map(|x| x.chat_id)
            .collect();
        result.sort_unstable();
        result
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct GuideEngine {
    pub guide: Option<UsedDeviceGuide>,
}

impl GuideEngine {
    pub fn new() -> Self {
        GuideEngine { guide: None }
    }

    pub fn get_guide(&self) -> Option<&UsedDeviceGuide> {
        self.guide.as_ref()
    }

    pub fn update_guide(&mut self, title: String, content: String, updated_by: TgUserId) {
        info!("Guide '{}' updated by {}", title, updated_by);
        self.guide = Some(UsedDeviceGuide {
            title,
            content,
            updated_by,
            updated_at: Utc::now(),
        });
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SellRequestEngine {
    pub requests: BTreeMap<u64, SellRequest>,
    pub next_id: u64,
}

impl SellRequestEngine {
    pub fn new() -> Self {
        SellRequestEngine {
            requests: BTreeMap::new(),
            next_id: 1,
        }
    }

    pub fn get_size(&self) -> usize {
        self.requests.len()
    }

    pub fn get_request(&self, id: u64) -> Option<&SellRequest> {
        self.requests.get(&id)
    }

    /// Stores a pending request and returns its id.
    pub fn create(&mut self, chat_id: TgUserId, from: String, offer: SellOffer) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.requests.insert(
            id,
            SellRequest {
                id,
                chat_id,
                from,
                equipment: offer.equipment,
                price: offer.price,
                condition: offer.condition,
                contact: offer.contact,
                status: SellRequestStatus::Pending,
                created_at: Utc::now(),
            },
        );
        id
    }

    /// Pending requests, newest first.
    pub fn get_pending(&self) -> Vec<&SellRequest> {
        self.requests
            .values()
            .rev()
            .filter(|x| x.status == SellRequestStatus::Pending)
            .collect()
    }

    pub fn update_status(&mut self, id: u64, status: SellRequestStatus) -> bool {
        match self.requests.get_mut(&id) {
            Some(request) => {
                request.status = status;
                true
            }
            None => false,
        }
    }
}

impl DbSerializable for MarketEngine {
    const KEY: &'static str = "market_engine";

    fn fresh() -> Self {
        MarketEngine::with_defaults()
    }
}

impl DbSerializable for CatalogEngine {
    const KEY: &'static str = "catalog_engine";

    fn fresh() -> Self {
        CatalogEngine::with_defaults()
    }
}

impl DbSerializable for UserEngine {
    const KEY: &'static str = "user_engine";

    fn fresh() -> Self {
        UserEngine::new()
    }
}

impl DbSerializable for GuideEngine {
    const KEY: &'static str = "guide_engine";

    fn fresh() -> Self {
        GuideEngine::new()
    }
}

impl DbSerializable for SellRequestEngine {
    const KEY: &'static str = "sell_request_engine";

    fn fresh() -> Self {
        SellRequestEngine::new()
    }
}
