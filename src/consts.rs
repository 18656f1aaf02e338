use crate::{algorithm::Algorithm, models::Currency};

pub const SECONDS_PER_DAY: f64 = 86_400.0;

// Electricity prices may be entered in USD or RUB; every local figure is RUB.
pub const LOCAL_CURRENCY: Currency = Currency::Rub;

// CoinGecko `tether.rub` is used as USD/RUB. This value is only used until the
// first successful fetch.
pub const FALLBACK_USD_TO_RUB: f64 = 80.0;

pub const COINGECKO_BASE_URL: &str = "https://api.coingecko.com/api/v3";
pub const COINGECKO_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(30);
pub const USD_PROXY_COINGECKO_ID: &str = "tether";

// Prices are refreshed once a day plus on demand (/refresh).
pub const DEFAULT_PRICE_REFRESH_INTERVAL: tokio::time::Duration =
    tokio::time::Duration::from_secs(24 * 60 * 60);

// State is small (a few hundred catalog models), saving every 5 minutes is
// enough to survive restarts without losing admin edits.
pub const DB_SAVE_INTERVAL: tokio::time::Duration = tokio::time::Duration::from_secs(5 * 60);

// Telegram allows ~30 messages per second to different chats.
pub const BROADCAST_MESSAGE_INTERVAL: std::time::Duration = std::time::Duration::from_millis(50);

// /prices order.
pub const PRICE_LIST_SYMBOLS: [&str; 10] =
    ["BTC", "ETH", "LTC", "DOGE", "ETC", "KAS", "KDA", "BCH", "BSV", "HNS"];

// Results show at most this many coins.
pub const MAX_DISPLAY_COINS: usize = 5;

pub const DEFAULT_POOL_FEE: f64 = 0.0;

/// Coin mined with `algorithm` when neither the user nor the catalog says
/// otherwise.
pub fn default_coin(algorithm: Algorithm) -> &'static str {
    match algorithm {
        Algorithm::Sha256 => "BTC",
        Algorithm::Scrypt => "LTC",
        Algorithm::Etchash => "ETC",
        Algorithm::KHeavyHash => "KAS",
        Algorithm::Blake2s => "KDA",
        Algorithm::Blake2bSha3 => "HNS",
    }
}

// (parent, child): mining the parent also yields the child via merge mining.
pub const MERGE_MINED: [(&str, &str); 1] = [("LTC", "DOGE")];
