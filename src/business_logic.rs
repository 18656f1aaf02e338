use tracing::debug;

use crate::{
    algorithm::Algorithm,
    calculator::{self, ProfitabilityResult},
    consts::{default_coin, MERGE_MINED},
    errors::{BotError, CalcError},
    hashrate::HashRate,
    models::{AsicModel, CoinMarketSnapshot, CostModel, Currency, MinerConfiguration},
    storages::MarketEngineTrait,
    types::Symbol,
};

/// Electricity and pool terms entered by the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElectricityInput {
    pub price_per_kwh: f64,
    pub currency: Currency,
    pub pool_fee: f64,
}

/// Everything one engine call needs.
#[derive(Debug, Clone, PartialEq)]
pub struct CalculationRequest {
    pub miner: MinerConfiguration,
    pub cost: CostModel,
    pub snapshots: Vec<CoinMarketSnapshot>,
}

impl CalculationRequest {
    pub fn compute(&self) -> Result<ProfitabilityResult, CalcError> {
        calculator::compute(&self.miner, &self.cost, &self.snapshots)
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.snapshots.iter().map(|x| x.symbol.clone()).collect()
    }
}

#[inline]
fn is_mineable(market: &impl MarketEngineTrait, symbol: &str, algorithm: Algorithm) -> bool {
    match market.get_quote(symbol) {
        Some(quote) => {
            quote.algorithm == Some(algorithm) && market.get_network(symbol).is_some()
        }
        None => false,
    }
}

/// Builds a validated snapshot of `symbol` from the market state.
pub fn snapshot_for(
    market: &impl MarketEngineTrait,
    symbol: &str,
    algorithm: Algorithm,
) -> Result<CoinMarketSnapshot, BotError> {
    let quote = market
        .get_quote(symbol)
        .ok_or_else(|| BotError::MissingMarketData(symbol.to_string()))?;
    if quote.algorithm != Some(algorithm) {
        return Err(BotError::AlgorithmMismatch {
            symbol: symbol.to_string(),
            algorithm,
        });
    }
    let network = market
        .get_network(symbol)
        .ok_or_else(|| BotError::MissingMarketData(symbol.to_string()))?;

    Ok(CoinMarketSnapshot::new(
        symbol,
        quote.price_usd,
        network.network_hashrate,
        network.block_reward,
        algorithm.profile(),
        network.block_time_override,
    )?)
}

/// Picks the coins a miner of `algorithm` is credited with: the first of
/// `preferred` that has market data (or the algorithm's default coin), plus
/// coins merge-mined alongside it.
pub fn select_coins(
    market: &impl MarketEngineTrait,
    algorithm: Algorithm,
    preferred: &[Symbol],
) -> Vec<Symbol> {
    let primary = preferred
        .iter()
        .find(|x| is_mineable(market, x, algorithm))
        .cloned()
        .or_else(|| market.get_default_coin(algorithm))
        .filter(|x| is_mineable(market, x, algorithm));

    let primary = match primary {
        Some(x) => x,
        None => return vec![],
    };

    let mut coins = vec![primary];
    for (parent, child) in MERGE_MINED {
        if coins[0] == parent && is_mineable(market, child, algorithm) {
            coins.push(child.to_string());
        }
    }
    coins
}

fn cost_model(
    market: &impl MarketEngineTrait,
    electricity: &ElectricityInput,
) -> Result<CostModel, BotError> {
    Ok(CostModel::new(
        electricity.price_per_kwh,
        electricity.currency,
        electricity.pool_fee,
        market.get_usd_to_rub(),
    )?)
}

pub fn request_for_model(
    market: &impl MarketEngineTrait,
    model: &AsicModel,
    electricity: &ElectricityInput,
) -> Result<CalculationRequest, BotError> {
    let coins = select_coins(market, model.algorithm, &model.coins);
    if coins.is_empty() {
        return Err(BotError::MissingMarketData(
            default_coin(model.algorithm).to_string(),
        ));
    }
    debug!("Model {} mines {:?}", model.id, coins);

    let snapshots = coins
        .iter()
        .map(|x| snapshot_for(market, x, model.algorithm))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CalculationRequest {
        miner: MinerConfiguration::new(model.hash_rate, model.power_watts)?,
        cost: cost_model(market, electricity)?,
        snapshots,
    })
}

/// Hardware entered by hand. An explicit coin list is taken as is; an empty
/// one falls back to the default coin selection.
pub fn request_for_manual(
    market: &impl MarketEngineTrait,
    hash_rate: HashRate,
    power_watts: f64,
    algorithm: Algorithm,
    coins: &[Symbol],
    electricity: &ElectricityInput,
) -> Result<CalculationRequest, BotError> {
    let coins = match coins.is_empty() {
        true => select_coins(market, algorithm, &[]),
        false => coins.to_vec(),
    };
    if coins.is_empty() {
        return Err(BotError::MissingMarketData(default_coin(algorithm).to_string()));
    }

    let snapshots = coins
        .iter()
        .map(|x| snapshot_for(market, x, algorithm))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(CalculationRequest {
        miner: MinerConfiguration::new(hash_rate, power_watts)?,
        cost: cost_model(market, electricity)?,
        snapshots,
    })
}
