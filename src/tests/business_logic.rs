use crate::{
    algorithm::Algorithm,
    business_logic::{request_for_manual, request_for_model, select_coins, ElectricityInput},
    consts::default_coin,
    errors::BotError,
    hashrate::{HashRate, HashRateUnit},
    models::{AsicModel, CoinNetwork, CoinQuote, Currency},
    storages::{MarketEngine, MockMarketEngineTrait},
};

fn quote(symbol: &str, algorithm: Algorithm, price_usd: f64) -> CoinQuote {
    CoinQuote {
        symbol: symbol.to_string(),
        name: symbol.to_string(),
        coingecko_id: symbol.to_lowercase(),
        algorithm: Some(algorithm),
        price_usd,
        price_rub: price_usd * 90.0,
        change_24h_pct: 0.0,
        updated_at: None,
    }
}

fn network(symbol: &str, magnitude: f64, unit: HashRateUnit, reward: f64) -> CoinNetwork {
    CoinNetwork {
        symbol: symbol.to_string(),
        network_hashrate: HashRate::new(magnitude, unit),
        block_reward: reward,
        block_time_override: match symbol {
            "DOGE" => Some(60.0),
            _ => None,
        },
    }
}

/// BTC, LTC and DOGE are fully known; KAS has a price but no network data.
fn market_mock() -> MockMarketEngineTrait {
    let mut mock = MockMarketEngineTrait::new();
    mock.expect_get_quote().returning(|symbol| match symbol {
        "BTC" => Some(quote("BTC", Algorithm::Sha256, 92_355.92)),
        "LTC" => Some(quote("LTC", Algorithm::Scrypt, 83.66)),
        "DOGE" => Some(quote("DOGE", Algorithm::Scrypt, 0.1642)),
        "KAS" => Some(quote("KAS", Algorithm::KHeavyHash, 0.1)),
        _ => None,
    });
    mock.expect_get_network().returning(|symbol| match symbol {
        "BTC" => Some(network("BTC", 1_068_844_948.0, HashRateUnit::Ths, 3.125)),
        "LTC" => Some(network("LTC", 3_367_490.0, HashRateUnit::Ghs, 6.25)),
        "DOGE" => Some(network("DOGE", 2_958_883.0, HashRateUnit::Ghs, 10_000.0)),
        _ => None,
    });
    mock.expect_get_default_coin()
        .returning(|algorithm| Some(default_coin(algorithm).to_string()));
    mock.expect_get_usd_to_rub().return_const(90.0);
    mock
}

fn electricity() -> ElectricityInput {
    ElectricityInput {
        price_per_kwh: 5.5,
        currency: Currency::Rub,
        pool_fee: 0.015,
    }
}

fn model(algorithm: Algorithm, coins: &[&str]) -> AsicModel {
    AsicModel {
        id: "test".to_string(),
        manufacturer: "Bitmain".to_string(),
        line: "T".to_string(),
        name: "Test".to_string(),
        algorithm,
        hash_rate: HashRate::new(9.5, HashRateUnit::Ghs),
        power_watts: 3425.0,
        coins: coins.iter().map(|x| x.to_string()).collect(),
        price_rub: None,
    }
}

#[test]
fn test_merge_mined_partner_is_added() {
    let market = market_mock();
    assert_eq!(
        select_coins(&market, Algorithm::Scrypt, &["LTC".to_string()]),
        vec!["LTC".to_string(), "DOGE".to_string()]
    );
    assert_eq!(
        select_coins(&market, Algorithm::Scrypt, &["DOGE".to_string()]),
        vec!["DOGE".to_string()]
    );
}

#[test]
fn test_unusable_preferred_coin_falls_back_to_default() {
    let market = market_mock();
    // XYZ is unknown, BTC belongs to another algorithm
    assert_eq!(
        select_coins(
            &market,
            Algorithm::Scrypt,
            &["XYZ".to_string(), "BTC".to_string()]
        ),
        vec!["LTC".to_string(), "DOGE".to_string()]
    );
    // no network data for the default coin
    assert!(select_coins(&market, Algorithm::KHeavyHash, &[]).is_empty());
}

#[test]
fn test_request_for_model() {
    let market = market_mock();
    let request = request_for_model(
        &market,
        &model(Algorithm::Scrypt, &["LTC", "DOGE"]),
        &electricity(),
    )
    .unwrap();

    assert_eq!(request.symbols(), vec!["LTC".to_string(), "DOGE".to_string()]);
    assert_eq!(request.snapshots[0].block_time_seconds(), 150.0);
    assert_eq!(request.snapshots[1].block_time_seconds(), 60.0);
    assert_eq!(request.cost.usd_to_local, 90.0);
    assert_eq!(request.cost.pool_fee_fraction, 0.015);
    assert_eq!(request.miner.power_watts, 3425.0);

    let result = request.compute().unwrap();
    assert_eq!(result.coins.len(), 2);
    assert!(result.daily_income_usd > 0.0);
}

#[test]
fn test_request_for_model_without_market_data() {
    let market = market_mock();
    let err = request_for_model(
        &market,
        &model(Algorithm::KHeavyHash, &["KAS"]),
        &electricity(),
    )
    .unwrap_err();
    assert!(matches!(err, BotError::MissingMarketData(symbol) if symbol == "KAS"));
}

#[test]
fn test_manual_request_uses_listed_coins_only() {
    let market = market_mock();
    let request = request_for_manual(
        &market,
        HashRate::new(100.0, HashRateUnit::Ghs),
        3000.0,
        Algorithm::Scrypt,
        &["DOGE".to_string()],
        &electricity(),
    )
    .unwrap();
    assert_eq!(request.symbols(), vec!["DOGE".to_string()]);

    let request = request_for_manual(
        &market,
        HashRate::new(100.0, HashRateUnit::Ths),
        3250.0,
        Algorithm::Sha256,
        &[],
        &electricity(),
    )
    .unwrap();
    assert_eq!(request.symbols(), vec!["BTC".to_string()]);
}

#[test]
fn test_manual_request_errors() {
    let market = market_mock();
    let manual = |coins: &[&str], power_watts: f64| {
        let coins: Vec<String> = coins.iter().map(|x| x.to_string()).collect();
        request_for_manual(
            &market,
            HashRate::new(100.0, HashRateUnit::Ghs),
            power_watts,
            Algorithm::Scrypt,
            &coins,
            &electricity(),
        )
    };

    assert!(matches!(
        manual(&["XYZ"], 3000.0),
        Err(BotError::MissingMarketData(symbol)) if symbol == "XYZ"
    ));
    assert!(matches!(
        manual(&["BTC"], 3000.0),
        Err(BotError::AlgorithmMismatch {
            algorithm: Algorithm::Scrypt,
            ..
        })
    ));
    assert!(matches!(manual(&["LTC"], -1.0), Err(BotError::Calc(_))));
}

#[test]
fn test_seeded_market_serves_every_algorithm() {
    let market = MarketEngine::with_defaults();
    for algorithm in [
        Algorithm::Sha256,
        Algorithm::Scrypt,
        Algorithm::Etchash,
        Algorithm::KHeavyHash,
        Algorithm::Blake2s,
        Algorithm::Blake2bSha3,
    ] {
        let coins = select_coins(&market, algorithm, &[]);
        assert_eq!(coins[0], default_coin(algorithm), "{}", algorithm);
    }
}
