use chrono::{TimeZone, Utc};

use crate::{
    algorithm::Algorithm,
    calculator::compute,
    formatter::{
        format_guide, format_model_list, format_result, format_sell_requests, DisplayMeta,
        Presentation,
    },
    hashrate::{HashRate, HashRateUnit},
    models::{
        CoinMarketSnapshot, CostModel, Currency, MinerConfiguration, SellOffer, SellRequestStatus,
    },
    storages::{CatalogEngine, CatalogEngineTrait, GuideEngine, SellRequestEngine},
};

fn scrypt_result(currency: Currency, price: f64) -> crate::calculator::ProfitabilityResult {
    let miner = MinerConfiguration::new(HashRate::new(9.5, HashRateUnit::Ghs), 3425.0).unwrap();
    let cost = CostModel::new(price, currency, 0.0, 90.0).unwrap();
    let snapshots = [
        CoinMarketSnapshot::new(
            "LTC",
            83.66,
            HashRate::new(3_367_490.0, HashRateUnit::Ghs),
            6.25,
            Algorithm::Scrypt.profile(),
            None,
        )
        .unwrap(),
        CoinMarketSnapshot::new(
            "DOGE",
            0.1642,
            HashRate::new(2_958_883.0, HashRateUnit::Ghs),
            10_000.0,
            Algorithm::Scrypt.profile(),
            Some(60.0),
        )
        .unwrap(),
    ];
    compute(&miner, &cost, &snapshots).unwrap()
}

#[test]
fn test_format_result_local_primary() {
    let result = scrypt_result(Currency::Rub, 5.5);
    let symbols = result.symbols();
    let meta = DisplayMeta {
        title: Some("Bitmain Antminer L7"),
        symbols: &symbols,
        hash_rate: Some(HashRate::new(9.5, HashRateUnit::Ghs)),
        power_watts: 3425.0,
        as_of: Utc.with_ymd_and_hms(2025, 3, 1, 12, 30, 0).unwrap(),
    };

    let text = format_result(&result, &meta, Presentation::LocalPrimary);
    assert!(text.starts_with("🔧 Equipment: Bitmain Antminer L7\n"));
    assert!(text.contains("⚙️ Hash rate: 9.5 GH/s"));
    assert!(text.contains("💰 Coins: LTC, DOGE"));
    assert!(text.contains("🔄 USD/RUB: 90.00"));
    assert!(text.contains("🪙 Daily income by coin:"));
    assert!(text.contains("💵 Income (RUB):"));
    // 3.425 kW * 24 h * 5.5 RUB
    assert!(text.contains("⚡ Electricity (RUB):\n— per day: 452.10 RUB"));
    assert!(text.contains("Net profit per day in USD: "));
    assert!(text.ends_with("🕒 As of 01.03.2025 12:30 UTC"));
}

#[test]
fn test_format_result_usd_primary_single_coin() {
    let mut result = scrypt_result(Currency::Usd, 0.05);
    result.coins.truncate(1);
    let symbols = vec!["LTC".to_string()];
    let meta = DisplayMeta {
        title: None,
        symbols: &symbols,
        hash_rate: None,
        power_watts: 3425.0,
        as_of: Utc::now(),
    };

    let text = format_result(&result, &meta, Presentation::UsdPrimary);
    assert!(text.starts_with("💰 Coins: LTC\n"));
    assert!(!text.contains("Daily income by coin"));
    // 3.425 kW * 24 h * $0.05
    assert!(text.contains("⚡ Electricity (USD):\n— per day: $4.11"));
    assert!(text.contains("Net profit per day in RUB: "));
}

#[test]
fn test_format_model_list_groups_by_line() {
    let catalog = CatalogEngine::with_defaults();
    let text = format_model_list(&catalog.get_models("bitmain"));
    assert!(text.contains("Bitmain S21 (SHA-256)"));
    assert!(text.contains("[/model s21-200]"));
    assert!(!text.contains("Ice River"));
    assert_eq!(text.matches("Bitmain S21 (SHA-256)").count(), 1);

    assert_eq!(format_model_list(&catalog.get_models("nothing")), "No models found");
}

#[test]
fn test_format_guide() {
    let mut guide = GuideEngine::new();
    assert_eq!(format_guide(guide.get_guide()), "❌ The guide is not available yet");

    guide.update_guide("Used ASICs".to_string(), "Ask for a video".to_string(), 1);
    assert_eq!(format_guide(guide.get_guide()), "📖 Used ASICs\n\nAsk for a video");
}

#[test]
fn test_format_pending_sell_requests() {
    let mut requests = SellRequestEngine::new();
    assert_eq!(format_sell_requests(&requests.get_pending()), "No pending sell requests");

    for equipment in ["Antminer S19", "Antminer L7"] {
        let offer = SellOffer {
            equipment: equipment.to_string(),
            price: "500$".to_string(),
            condition: "used".to_string(),
            contact: "@seller".to_string(),
        };
        requests.create(1, "@seller".to_string(), offer);
    }
    requests.update_status(1, SellRequestStatus::Rejected);

    let text = format_sell_requests(&requests.get_pending());
    assert!(text.starts_with("💼 Sell request #2 from @seller\nEquipment: Antminer L7"));
    assert!(!text.contains("Antminer S19"));
    assert!(text.ends_with("/setstatus <id> accepted|rejected"));
}
