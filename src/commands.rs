use teloxide::utils::command::BotCommands;

use crate::{
    algorithm::{lookup, Algorithm},
    business_logic::ElectricityInput,
    consts::DEFAULT_POOL_FEE,
    errors::{BotError, InputError},
    hashrate::{HashRate, HashRateUnit},
    models::{AsicModel, CoinNetwork, Currency, MinerConfiguration, SellOffer, SellRequestStatus},
    types::{ModelId, Symbol},
    utils::{parse_number, parse_percent, parse_symbols, split_fields},
};

#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(
    rename_rule = "lowercase",
    description = "ASIC profitability calculator. Commands:"
)]
pub enum Command {
    #[command(description = "register and show the welcome message.")]
    Start,
    #[command(description = "show this text.")]
    Help,
    #[command(description = "current coin prices.")]
    Prices,
    #[command(description = "ASIC catalog, optionally filtered: /models bitmain")]
    Models(String),
    #[command(
        description = "manual calculation: /calc 100 TH/s 3250 5.5 rub sha256 [BTC] [1.5%]"
    )]
    Calc(String),
    #[command(description = "catalog model calculation: /model s21-200 5.5 rub [1.5%]")]
    Model(String),
    #[command(description = "sell equipment: /sell model; price; condition; contact")]
    Sell(String),
    #[command(description = "ask for a better price: /quote model; comment")]
    Quote(String),
    #[command(description = "how to buy used equipment.")]
    Guide,
    #[command(description = "delivery and payment.")]
    Faq,
    #[command(description = "turn news and broadcasts on or off.")]
    Notify,
}

/// Only reachable for the configured administrator.
#[derive(BotCommands, Clone, Debug, PartialEq)]
#[command(rename_rule = "lowercase", description = "Admin commands:")]
pub enum AdminCommand {
    #[command(description = "network data: /setnet LTC 3.4 PH/s 6.25 [150]")]
    SetNet(String),
    #[command(description = "manual price: /setprice KAS 0.12")]
    SetPrice(String),
    #[command(description = "add or update a catalog model.")]
    AddModel(String),
    #[command(description = "remove a catalog model: /delmodel s19xp-141")]
    DelModel(String),
    #[command(description = "refresh prices now.")]
    Refresh,
    #[command(description = "send a message to every subscribed user.")]
    Broadcast(String),
    #[command(description = "replace the used equipment guide: /setguide title; text")]
    SetGuide(String),
    #[command(description = "pending sell requests.")]
    Requests,
    #[command(description = "handle a sell request: /setstatus 3 accepted")]
    SetStatus(String),
}

pub const CALC_USAGE: &str =
    "/calc <hash rate> <unit> <watts> <kWh price> <usd|rub> <algorithm> [coins] [fee%]";
pub const MODEL_USAGE: &str = "/model <id> <kWh price> <usd|rub> [fee%]";
pub const SELL_USAGE: &str = "/sell <model>; <price>; <condition>; <contact>";
pub const QUOTE_USAGE: &str = "/quote <model>; <comment>";
pub const SETNET_USAGE: &str = "/setnet <symbol> <hash rate> <unit> <block reward> [block time]";
pub const SETPRICE_USAGE: &str = "/setprice <symbol> <usd>";
pub const ADDMODEL_USAGE: &str =
    "/addmodel <id>; <manufacturer>; <line>; <name>; <algorithm>; <hash rate> <unit>; <watts>; <coins>";
pub const DELMODEL_USAGE: &str = "/delmodel <id>";
pub const SETGUIDE_USAGE: &str = "/setguide <title>; <text>";
pub const SETSTATUS_USAGE: &str = "/setstatus <request id> <accepted|rejected|pending>";

#[derive(Debug, Clone, PartialEq)]
pub struct CalcArgs {
    pub hash_rate: HashRate,
    pub power_watts: f64,
    pub electricity: ElectricityInput,
    pub algorithm: Algorithm,
    pub coins: Vec<Symbol>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelArgs {
    pub id: ModelId,
    pub electricity: ElectricityInput,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRequest {
    pub equipment: String,
    pub comment: String,
}

fn parse_hash_rate(magnitude: &str, unit: &str) -> Result<HashRate, BotError> {
    Ok(HashRate::new(
        parse_number(magnitude)?,
        unit.parse::<HashRateUnit>()?,
    ))
}

/// Trailing optional tokens: a fee ends with '%', anything else is a coin
/// list. A bare number is neither.
fn parse_optional_fee(tokens: &[&str]) -> Result<(f64, Vec<Symbol>), BotError> {
    let mut fee = DEFAULT_POOL_FEE;
    let mut coins = vec![];
    for token in tokens {
        if token.ends_with('%') {
            fee = parse_percent(token)?;
        } else if parse_number(token).is_ok() {
            return Err(BotError::Usage(CALC_USAGE));
        } else {
            coins.extend(parse_symbols(token));
        }
    }
    Ok((fee, coins))
}

pub fn parse_calc_args(input: &str) -> Result<CalcArgs, BotError> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    if tokens.len() < 6 {
        return Err(BotError::Usage(CALC_USAGE));
    }

    let hash_rate = parse_hash_rate(tokens[0], tokens[1])?;
    let power_watts = parse_number(tokens[2])?;
    let price_per_kwh = parse_number(tokens[3])?;
    let currency = tokens[4].parse::<Currency>()?;
    let algorithm = lookup(tokens[5])?.algorithm;
    let (pool_fee, coins) = parse_optional_fee(&tokens[6..])?;

    Ok(CalcArgs {
        hash_rate,
        power_watts,
        electricity: ElectricityInput {
            price_per_kwh,
            currency,
            pool_fee,
        },
        algorithm,
        coins,
    })
}

pub fn parse_model_args(input: &str) -> Result<ModelArgs, BotError> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    if tokens.len() < 3 || tokens.len() > 4 {
        return Err(BotError::Usage(MODEL_USAGE));
    }

    let pool_fee = match tokens.get(3) {
        Some(fee) => parse_percent(fee)?,
        None => DEFAULT_POOL_FEE,
    };

    Ok(ModelArgs {
        id: tokens[0].to_lowercase(),
        electricity: ElectricityInput {
            price_per_kwh: parse_number(tokens[1])?,
            currency: tokens[2].parse::<Currency>()?,
            pool_fee,
        },
    })
}

pub fn parse_sell_args(input: &str) -> Result<SellOffer, BotError> {
    match split_fields(input)[..] {
        [equipment, price, condition, contact] => Ok(SellOffer {
            equipment: equipment.to_string(),
            price: price.to_string(),
            condition: condition.to_string(),
            contact: contact.to_string(),
        }),
        _ => Err(BotError::Usage(SELL_USAGE)),
    }
}

pub fn parse_quote_args(input: &str) -> Result<QuoteRequest, BotError> {
    match split_fields(input)[..] {
        [equipment] => Ok(QuoteRequest {
            equipment: equipment.to_string(),
            comment: String::new(),
        }),
        [equipment, comment] => Ok(QuoteRequest {
            equipment: equipment.to_string(),
            comment: comment.to_string(),
        }),
        _ => Err(BotError::Usage(QUOTE_USAGE)),
    }
}

pub fn parse_setnet_args(input: &str) -> Result<CoinNetwork, BotError> {
    let tokens: Vec<&str> = input.split_whitespace().collect();
    if tokens.len() < 4 || tokens.len() > 5 {
        return Err(BotError::Usage(SETNET_USAGE));
    }

    let block_time_override = match tokens.get(4) {
        Some(x) => Some(parse_number(x)?),
        None => None,
    };

    let network_hashrate = parse_hash_rate(tokens[1], tokens[2])?;
    if network_hashrate.magnitude <= 0.0 {
        return Err(InputError::NonPositive {
            field: "network hash rate",
        }
        .into());
    }
    let block_reward = parse_number(tokens[3])?;
    if block_reward < 0.0 {
        return Err(InputError::Negative {
            field: "block reward",
        }
        .into());
    }
    if matches!(block_time_override, Some(x) if x <= 0.0) {
        return Err(InputError::NonPositive {
            field: "block time",
        }
        .into());
    }

    Ok(CoinNetwork {
        symbol: tokens[0].to_uppercase(),
        network_hashrate,
        block_reward,
        block_time_override,
    })
}

pub fn parse_setprice_args(input: &str) -> Result<(Symbol, f64), BotError> {
    match input.split_whitespace().collect::<Vec<_>>()[..] {
        [symbol, price] => match parse_number(price)? {
            x if x < 0.0 => Err(InputError::Negative { field: "coin price" }.into()),
            x => Ok((symbol.to_uppercase(), x)),
        },
        _ => Err(BotError::Usage(SETPRICE_USAGE)),
    }
}

pub fn parse_addmodel_args(input: &str) -> Result<AsicModel, BotError> {
    let fields = split_fields(input);
    let [id, manufacturer, line, name, algorithm, hash_rate, watts, coins] = fields[..] else {
        return Err(BotError::Usage(ADDMODEL_USAGE));
    };

    let hash_rate = match hash_rate.split_whitespace().collect::<Vec<_>>()[..] {
        [magnitude, unit] => parse_hash_rate(magnitude, unit)?,
        _ => hash_rate.parse::<HashRate>()?,
    };
    let miner = MinerConfiguration::new(hash_rate, parse_number(watts)?)?;
    let coins = parse_symbols(coins);
    if coins.is_empty() {
        return Err(BotError::Usage(ADDMODEL_USAGE));
    }

    Ok(AsicModel {
        id: id.to_lowercase(),
        manufacturer: manufacturer.to_string(),
        line: line.to_string(),
        name: name.to_string(),
        algorithm: algorithm.parse::<Algorithm>()?,
        hash_rate: miner.hash_rate,
        power_watts: miner.power_watts,
        coins,
        price_rub: None,
    })
}

pub fn parse_delmodel_args(input: &str) -> Result<ModelId, BotError> {
    match input.split_whitespace().collect::<Vec<_>>()[..] {
        [id] => Ok(id.to_lowercase()),
        _ => Err(BotError::Usage(DELMODEL_USAGE)),
    }
}

/// Title and text; the text may contain ';' itself.
pub fn parse_setguide_args(input: &str) -> Result<(String, String), BotError> {
    match input.split_once(';') {
        Some((title, content)) if !title.trim().is_empty() && !content.trim().is_empty() => {
            Ok((title.trim().to_string(), content.trim().to_string()))
        }
        _ => Err(BotError::Usage(SETGUIDE_USAGE)),
    }
}

pub fn parse_setstatus_args(input: &str) -> Result<(u64, SellRequestStatus), BotError> {
    match input.split_whitespace().collect::<Vec<_>>()[..] {
        [id, status] => {
            let id = id
                .trim_start_matches('#')
                .parse::<u64>()
                .map_err(|_| BotError::Usage(SETSTATUS_USAGE))?;
            Ok((id, status.parse::<SellRequestStatus>()?))
        }
        _ => Err(BotError::Usage(SETSTATUS_USAGE)),
    }
}
