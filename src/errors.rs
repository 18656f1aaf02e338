use thiserror::Error;

use crate::{algorithm::Algorithm, types::Symbol};

/// Precondition failures of the profitability engine inputs.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InputError {
    #[error("{field} must be greater than zero")]
    NonPositive { field: &'static str },
    #[error("{field} must be non-negative")]
    Negative { field: &'static str },
    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },
    #[error("pool fee {value} is outside of [0, 1)")]
    PoolFeeOutOfRange { value: f64 },
    #[error("at least one coin is required")]
    EmptyCoinList,
    #[error("coin symbol cannot be empty")]
    EmptySymbol,
    #[error("coin {symbol} is listed more than once")]
    DuplicateCoin { symbol: Symbol },
}

/// Errors returned by the profitability engine and its lookup tables.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CalcError {
    #[error("invalid input: {0}")]
    InvalidInput(#[from] InputError),
    #[error("unknown algorithm '{name}'")]
    UnknownAlgorithm { name: String },
    #[error("unrecognized hash rate unit '{unit}'")]
    Configuration { unit: String },
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{var} has invalid value '{value}'")]
    Invalid { var: &'static str, value: String },
}

/// Everything a command handler can fail with.
#[derive(Debug, Error)]
pub enum BotError {
    #[error(transparent)]
    Calc(#[from] CalcError),
    #[error("usage: {0}")]
    Usage(&'static str),
    #[error("'{0}' is not a number")]
    NotANumber(String),
    #[error("unknown currency '{0}', expected usd or rub")]
    UnknownCurrency(String),
    #[error("model '{0}' is not in the catalog")]
    UnknownModel(String),
    #[error("no market data for {0}")]
    MissingMarketData(Symbol),
    #[error("{symbol} is not mined with {algorithm}")]
    AlgorithmMismatch { symbol: Symbol, algorithm: Algorithm },
    #[error("unknown request status '{0}', expected accepted, rejected or pending")]
    UnknownStatus(String),
    #[error("sell request #{0} does not exist")]
    UnknownRequest(u64),
    #[error("send /start first")]
    NotRegistered,
    #[error("{0} is not configured")]
    NotConfigured(&'static str),
    #[error("price feed request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("price feed response is malformed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("telegram request failed: {0}")]
    Telegram(#[from] teloxide::RequestError),
}

impl From<InputError> for BotError {
    fn from(err: InputError) -> Self {
        BotError::Calc(CalcError::InvalidInput(err))
    }
}
