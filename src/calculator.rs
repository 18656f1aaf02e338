use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;
use tracing::trace;

use crate::{
    consts::{LOCAL_CURRENCY, SECONDS_PER_DAY},
    errors::{CalcError, InputError},
    models::{CoinMarketSnapshot, CostModel, Currency, MinerConfiguration},
    types::Symbol,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Period {
    Day,
    Week,
    Month,
    Year,
}

impl Period {
    pub const ALL: [Period; 4] = [Period::Day, Period::Week, Period::Month, Period::Year];

    pub fn days(self) -> u32 {
        match self {
            Period::Day => 1,
            Period::Week => 7,
            Period::Month => 30,
            Period::Year => 365,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoinYield {
    pub symbol: Symbol,
    pub share: f64,
    pub blocks_per_day: f64,
    pub daily_coins_gross: f64,
    pub daily_coins: f64,
    pub daily_income_usd: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodProjection {
    pub period: Period,
    pub coins: HashMap<Symbol, f64>,
    pub income_usd: f64,
    pub income_local: f64,
    pub electricity_cost_usd: f64,
    pub electricity_cost_local: f64,
    pub profit_usd: f64,
    pub profit_local: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfitabilityResult {
    /// Per-coin breakdown in input order.
    pub coins: Vec<CoinYield>,
    pub per_coin_daily_yield: HashMap<Symbol, f64>,
    pub daily_income_usd: f64,
    pub daily_income_local: f64,
    pub daily_electricity_cost_usd: f64,
    pub daily_electricity_cost_local: f64,
    pub daily_profit_usd: f64,
    pub daily_profit_local: f64,
    pub periods: BTreeMap<Period, PeriodProjection>,
    pub local_currency: Currency,
    pub usd_to_local: f64,
}

impl ProfitabilityResult {
    pub fn period(&self, period: Period) -> &PeriodProjection {
        // every period is inserted by `compute`
        &self.periods[&period]
    }

    pub fn symbols(&self) -> Vec<Symbol> {
        self.coins.iter().map(|x| x.symbol.clone()).collect()
    }
}

fn validate(
    miner: &MinerConfiguration,
    cost: &CostModel,
    snapshots: &[CoinMarketSnapshot],
) -> Result<(), InputError> {
    miner.validate()?;
    cost.validate()?;
    if snapshots.is_empty() {
        return Err(InputError::EmptyCoinList);
    }

    let mut seen: HashSet<&str> = HashSet::new();
    for snapshot in snapshots {
        snapshot.validate()?;
        if !seen.insert(snapshot.symbol.as_str()) {
            return Err(InputError::DuplicateCoin {
                symbol: snapshot.symbol.clone(),
            });
        }
    }
    Ok(())
}

/// Derived figures can overflow even when every input is finite.
fn finite(value: f64, field: &'static str) -> Result<f64, InputError> {
    match value.is_finite() {
        true => Ok(value),
        false => Err(InputError::NonFinite { field }),
    }
}

fn coin_yield(
    miner_hs: f64,
    pool_fee: f64,
    snapshot: &CoinMarketSnapshot,
) -> Result<CoinYield, InputError> {
    let network_hs = finite(
        snapshot.network_hashrate.hashes_per_second(),
        "network hash rate",
    )?;
    let share = miner_hs / network_hs;
    let blocks_per_day = finite(SECONDS_PER_DAY / snapshot.block_time_seconds(), "block time")?;
    let daily_coins_gross = finite(share * blocks_per_day * snapshot.block_reward, "daily yield")?;
    let daily_coins = daily_coins_gross * (1.0 - pool_fee);

    Ok(CoinYield {
        symbol: snapshot.symbol.clone(),
        share,
        blocks_per_day,
        daily_coins_gross,
        daily_coins,
        daily_income_usd: finite(daily_coins * snapshot.price_usd, "daily income")?,
    })
}

/// Expected daily yield, income, electricity cost and profit of `miner`
/// mining every coin in `snapshots` at once, projected linearly over a day,
/// week, month and year.
///
/// All snapshots share the miner's physical hash rate: the result's income
/// is the sum over coins, which models merge-mined pairs such as LTC+DOGE.
/// Every precondition is checked before anything is computed.
pub fn compute(
    miner: &MinerConfiguration,
    cost: &CostModel,
    snapshots: &[CoinMarketSnapshot],
) -> Result<ProfitabilityResult, CalcError> {
    validate(miner, cost, snapshots)?;

    let miner_hs = finite(miner.hash_rate.hashes_per_second(), "miner hash rate")?;
    let coins = snapshots
        .iter()
        .map(|snapshot| coin_yield(miner_hs, cost.pool_fee_fraction, snapshot))
        .collect::<Result<Vec<CoinYield>, InputError>>()?;

    for x in coins.iter() {
        trace!(
            "{}: share {:e} | {} blocks/day | {} coins/day net",
            x.symbol,
            x.share,
            x.blocks_per_day,
            x.daily_coins
        );
    }

    let rate = cost.usd_to_local;
    let daily_income_usd = finite(
        coins.iter().map(|x| x.daily_income_usd).sum(),
        "daily income",
    )?;
    let daily_electricity_cost_usd = finite(
        miner.power_watts / 1000.0 * 24.0 * cost.electricity_price_usd(),
        "electricity cost",
    )?;
    let daily_profit_usd = daily_income_usd - daily_electricity_cost_usd;

    let daily_income_local = daily_income_usd * rate;
    let daily_electricity_cost_local = daily_electricity_cost_usd * rate;
    let daily_profit_local = daily_profit_usd * rate;

    let per_coin_daily_yield: HashMap<Symbol, f64> = coins
        .iter()
        .map(|x| (x.symbol.clone(), x.daily_coins))
        .collect();

    let periods: BTreeMap<Period, PeriodProjection> = Period::ALL
        .into_iter()
        .map(|period| {
            let m = period.days() as f64;
            let projection = PeriodProjection {
                period,
                coins: per_coin_daily_yield
                    .iter()
                    .map(|(symbol, daily)| (symbol.clone(), daily * m))
                    .collect(),
                income_usd: daily_income_usd * m,
                income_local: daily_income_local * m,
                electricity_cost_usd: daily_electricity_cost_usd * m,
                electricity_cost_local: daily_electricity_cost_local * m,
                profit_usd: daily_profit_usd * m,
                profit_local: daily_profit_local * m,
            };
            (period, projection)
        })
        .collect();

    // the year is the largest figure
    let year = &periods[&Period::Year];
    for value in [
        year.income_usd,
        year.income_local,
        year.electricity_cost_usd,
        year.electricity_cost_local,
        year.profit_usd,
        year.profit_local,
    ] {
        finite(value, "yearly projection")?;
    }

    Ok(ProfitabilityResult {
        coins,
        per_coin_daily_yield,
        daily_income_usd,
        daily_income_local,
        daily_electricity_cost_usd,
        daily_electricity_cost_local,
        daily_profit_usd,
        daily_profit_local,
        periods,
        local_currency: LOCAL_CURRENCY,
        usd_to_local: rate,
    })
}
