use core::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    algorithm::{Algorithm, AlgorithmProfile},
    errors::{BotError, InputError},
    hashrate::HashRate,
    types::{ModelId, Symbol, TgUserId},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Currency {
    Usd,
    Rub,
}

impl Currency {
    pub fn code(self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Rub => "RUB",
        }
    }
}

impl Display for Currency {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "usd" | "$" | "dollar" | "dollars" => Ok(Currency::Usd),
            "rub" | "₽" | "руб" | "rur" => Ok(Currency::Rub),
            _ => Err(BotError::UnknownCurrency(s.trim().to_string())),
        }
    }
}

fn ensure_finite(value: f64, field: &'static str) -> Result<f64, InputError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(InputError::NonFinite { field })
    }
}

fn ensure_positive(value: f64, field: &'static str) -> Result<f64, InputError> {
    if ensure_finite(value, field)? > 0.0 {
        Ok(value)
    } else {
        Err(InputError::NonPositive { field })
    }
}

fn ensure_non_negative(value: f64, field: &'static str) -> Result<f64, InputError> {
    if ensure_finite(value, field)? >= 0.0 {
        Ok(value)
    } else {
        Err(InputError::Negative { field })
    }
}

/// Physical miner: a catalog model or hardware entered by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinerConfiguration {
    pub hash_rate: HashRate,
    pub power_watts: f64,
}

impl MinerConfiguration {
    pub fn new(hash_rate: HashRate, power_watts: f64) -> Result<MinerConfiguration, InputError> {
        let miner = MinerConfiguration {
            hash_rate,
            power_watts,
        };
        miner.validate()?;
        Ok(miner)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        ensure_positive(self.hash_rate.magnitude, "miner hash rate")?;
        ensure_non_negative(self.power_watts, "power consumption")?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostModel {
    pub electricity_price_per_kwh: f64,
    pub currency: Currency,
    pub pool_fee_fraction: f64,
    /// Local currency units per 1 USD.
    pub usd_to_local: f64,
}

impl CostModel {
    pub fn new(
        electricity_price_per_kwh: f64,
        currency: Currency,
        pool_fee_fraction: f64,
        usd_to_local: f64,
    ) -> Result<CostModel, InputError> {
        let cost = CostModel {
            electricity_price_per_kwh,
            currency,
            pool_fee_fraction,
            usd_to_local,
        };
        cost.validate()?;
        Ok(cost)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        ensure_non_negative(self.electricity_price_per_kwh, "electricity price")?;
        ensure_positive(self.usd_to_local, "exchange rate")?;
        let fee = ensure_finite(self.pool_fee_fraction, "pool fee")?;
        if !(0.0..1.0).contains(&fee) {
            return Err(InputError::PoolFeeOutOfRange { value: fee });
        }
        Ok(())
    }

    /// Electricity price in USD per kWh. Local prices are converted here and
    /// only here.
    #[inline]
    pub fn electricity_price_usd(&self) -> f64 {
        match self.currency {
            Currency::Usd => self.electricity_price_per_kwh,
            Currency::Rub => self.electricity_price_per_kwh / self.usd_to_local,
        }
    }
}

/// One candidate coin mineable by the miner, with point-in-time network data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinMarketSnapshot {
    pub symbol: Symbol,
    pub price_usd: f64,
    pub network_hashrate: HashRate,
    pub block_reward: f64,
    pub algorithm: AlgorithmProfile,
    pub block_time_override: Option<f64>,
}

impl CoinMarketSnapshot {
    pub fn new(
        symbol: &str,
        price_usd: f64,
        network_hashrate: HashRate,
        block_reward: f64,
        algorithm: AlgorithmProfile,
        block_time_override: Option<f64>,
    ) -> Result<CoinMarketSnapshot, InputError> {
        let snapshot = CoinMarketSnapshot {
            symbol: symbol.trim().to_uppercase(),
            price_usd,
            network_hashrate,
            block_reward,
            algorithm,
            block_time_override,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn validate(&self) -> Result<(), InputError> {
        if self.symbol.is_empty() {
            return Err(InputError::EmptySymbol);
        }
        ensure_non_negative(self.price_usd, "coin price")?;
        ensure_positive(self.network_hashrate.magnitude, "network hash rate")?;
        ensure_non_negative(self.block_reward, "block reward")?;
        if let Some(block_time) = self.block_time_override {
            ensure_positive(block_time, "block time")?;
        }
        Ok(())
    }

    #[inline]
    pub fn block_time_seconds(&self) -> f64 {
        self.block_time_override
            .unwrap_or(self.algorithm.block_time_seconds)
    }
}

/// Price feed record for a coin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinQuote {
    pub symbol: Symbol,
    pub name: String,
    pub coingecko_id: String,
    /// `None` for coins that are listed for prices only (ETH, USDT).
    pub algorithm: Option<Algorithm>,
    pub price_usd: f64,
    pub price_rub: f64,
    pub change_24h_pct: f64,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Admin-editable network statistics of a coin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoinNetwork {
    pub symbol: Symbol,
    pub network_hashrate: HashRate,
    pub block_reward: f64,
    #[serde(default)]
    pub block_time_override: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AsicModel {
    pub id: ModelId,
    pub manufacturer: String,
    pub line: String,
    pub name: String,
    pub algorithm: Algorithm,
    pub hash_rate: HashRate,
    pub power_watts: f64,
    /// Coins the model can mine, most relevant first.
    pub coins: Vec<Symbol>,
    #[serde(default)]
    pub price_rub: Option<f64>,
}

impl AsicModel {
    pub fn title(&self) -> String {
        format!("{} {}", self.manufacturer, self.name)
    }

    pub fn has_any_important_changes(&self, other: &AsicModel) -> bool {
        self.hash_rate != other.hash_rate
            || self.power_watts != other.power_watts
            || self.algorithm != other.algorithm
            || self.coins != other.coins
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotUser {
    pub chat_id: TgUserId,
    pub username: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub notifications: bool,
}

/// Admin-written advice on buying used hardware, shown by /guide.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsedDeviceGuide {
    pub title: String,
    pub content: String,
    pub updated_by: TgUserId,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SellRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl SellRequestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SellRequestStatus::Pending => "pending",
            SellRequestStatus::Accepted => "accepted",
            SellRequestStatus::Rejected => "rejected",
        }
    }
}

impl Display for SellRequestStatus {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SellRequestStatus {
    type Err = BotError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(SellRequestStatus::Pending),
            "accepted" | "accept" => Ok(SellRequestStatus::Accepted),
            "rejected" | "reject" => Ok(SellRequestStatus::Rejected),
            _ => Err(BotError::UnknownStatus(s.trim().to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SellOffer {
    pub equipment: String,
    pub price: String,
    pub condition: String,
    pub contact: String,
}

/// A user's offer to sell equipment, kept until the admin handles it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellRequest {
    pub id: u64,
    pub chat_id: TgUserId,
    pub from: String,
    pub equipment: String,
    pub price: String,
    pub condition: String,
    pub contact: String,
    pub status: SellRequestStatus,
    pub created_at: DateTime<Utc>,
}
