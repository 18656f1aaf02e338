use teloxide::utils::command::BotCommands;

use crate::{
    algorithm::Algorithm,
    commands::{
        parse_addmodel_args, parse_calc_args, parse_delmodel_args, parse_model_args,
        parse_quote_args, parse_sell_args, parse_setguide_args, parse_setnet_args,
        parse_setprice_args, parse_setstatus_args, AdminCommand, Command,
    },
    errors::{BotError, CalcError, InputError},
    hashrate::{HashRate, HashRateUnit},
    models::{Currency, SellRequestStatus},
};

#[test]
fn test_command_parsing() {
    assert_eq!(
        Command::parse("/calc 100 TH/s 3250 5,5 rub sha256", "asic_bot").unwrap(),
        Command::Calc("100 TH/s 3250 5,5 rub sha256".to_string())
    );
    assert_eq!(Command::parse("/notify", "asic_bot").unwrap(), Command::Notify);
    assert_eq!(
        AdminCommand::parse("/setnet LTC 3.4 PH/s 6.25", "asic_bot").unwrap(),
        AdminCommand::SetNet("LTC 3.4 PH/s 6.25".to_string())
    );
    assert_eq!(
        AdminCommand::parse("/refresh", "asic_bot").unwrap(),
        AdminCommand::Refresh
    );
    assert_eq!(
        AdminCommand::parse("/setstatus 3 accepted", "asic_bot").unwrap(),
        AdminCommand::SetStatus("3 accepted".to_string())
    );
}

#[test]
fn test_admin_commands_are_not_public() {
    for text in ["/setnet LTC 3.4 PH/s 6.25", "/refresh", "/broadcast hi", "/requests"] {
        assert!(Command::parse(text, "asic_bot").is_err(), "{}", text);
    }
    assert!(AdminCommand::parse("/calc 100 TH/s", "asic_bot").is_err());

    let public = Command::descriptions().to_string();
    assert!(public.contains("/calc"));
    assert!(!public.contains("/setnet"));
    assert!(!public.contains("/broadcast"));
    assert!(AdminCommand::descriptions().to_string().contains("/setguide"));
}

#[test]
fn test_parse_calc_args() {
    let args = parse_calc_args("100 TH/s 3250 5,5 rub sha256").unwrap();
    assert_eq!(args.hash_rate, HashRate::new(100.0, HashRateUnit::Ths));
    assert_eq!(args.power_watts, 3250.0);
    assert_eq!(args.electricity.price_per_kwh, 5.5);
    assert_eq!(args.electricity.currency, Currency::Rub);
    assert_eq!(args.electricity.pool_fee, 0.0);
    assert_eq!(args.algorithm, Algorithm::Sha256);
    assert!(args.coins.is_empty());

    let args = parse_calc_args("9500 mh 3425 0.06 usd scrypt ltc,doge 1.5%").unwrap();
    assert_eq!(args.hash_rate, HashRate::new(9500.0, HashRateUnit::Mhs));
    assert_eq!(args.coins, vec!["LTC".to_string(), "DOGE".to_string()]);
    assert!((args.electricity.pool_fee - 0.015).abs() < 1e-12);
}

#[test]
fn test_parse_calc_args_errors() {
    assert!(matches!(
        parse_calc_args("100 TH/s 3250"),
        Err(BotError::Usage(_))
    ));
    assert!(matches!(
        parse_calc_args("100 PH/s 3250 5 rub sha256"),
        Err(BotError::Calc(CalcError::Configuration { .. }))
    ));
    assert!(matches!(
        parse_calc_args("100 TH/s 3250 5 eur sha256"),
        Err(BotError::UnknownCurrency(_))
    ));
    assert!(matches!(
        parse_calc_args("100 TH/s 3250 5 rub x11"),
        Err(BotError::Calc(CalcError::UnknownAlgorithm { .. }))
    ));
    assert!(matches!(
        parse_calc_args("100 TH/s lots 5 rub sha256"),
        Err(BotError::NotANumber(_))
    ));
}

#[test]
fn test_fee_without_percent_sign_is_rejected() {
    assert!(matches!(
        parse_calc_args("100 TH/s 3250 5 rub sha256 1.5"),
        Err(BotError::Usage(_))
    ));
    assert!(matches!(
        parse_calc_args("100 TH/s 3250 5 rub sha256 BTC 2"),
        Err(BotError::Usage(_))
    ));

    let args = parse_calc_args("100 TH/s 3250 5 rub sha256 BTC 1.5%").unwrap();
    assert_eq!(args.coins, vec!["BTC".to_string()]);
    assert!((args.electricity.pool_fee - 0.015).abs() < 1e-12);
}

#[test]
fn test_parse_model_args() {
    let args = parse_model_args("S21-200 0.05 usd 2%").unwrap();
    assert_eq!(args.id, "s21-200");
    assert_eq!(args.electricity.currency, Currency::Usd);
    assert!((args.electricity.pool_fee - 0.02).abs() < 1e-12);

    assert!(matches!(parse_model_args("s21-200"), Err(BotError::Usage(_))));
}

#[test]
fn test_parse_forwarded_requests() {
    let offer = parse_sell_args("Antminer S19 95T; 40000 RUB; used, 1 year; @me").unwrap();
    assert_eq!(offer.equipment, "Antminer S19 95T");
    assert_eq!(offer.condition, "used, 1 year");
    assert!(parse_sell_args("Antminer S19; 40000").is_err());

    let request = parse_quote_args("L9 16 GH/s; need 10 pcs").unwrap();
    assert_eq!(request.comment, "need 10 pcs");
    assert!(parse_quote_args("").is_err());
}

#[test]
fn test_parse_admin_args() {
    let network = parse_setnet_args("doge 2958883 GH/s 10000 60").unwrap();
    assert_eq!(network.symbol, "DOGE");
    assert_eq!(network.network_hashrate.unit, HashRateUnit::Ghs);
    assert_eq!(network.block_time_override, Some(60.0));
    assert!(parse_setnet_args("doge 0 GH/s 10000").is_err());
    assert!(parse_setnet_args("doge 1 GH/s 10000 0").is_err());

    assert_eq!(
        parse_setprice_args("kas 0.12").unwrap(),
        ("KAS".to_string(), 0.12)
    );
    assert!(parse_setprice_args("kas -1").is_err());

    let model = parse_addmodel_args(
        "L9-16; Bitmain; L9; Antminer L9 16 GH/s; scrypt; 16 GH/s; 3360; LTC, DOGE",
    )
    .unwrap();
    assert_eq!(model.id, "l9-16");
    assert_eq!(model.algorithm, Algorithm::Scrypt);
    assert_eq!(model.hash_rate, HashRate::new(16.0, HashRateUnit::Ghs));
    assert_eq!(model.coins, vec!["LTC".to_string(), "DOGE".to_string()]);
    assert!(parse_addmodel_args("l9; Bitmain").is_err());

    assert!(matches!(
        parse_addmodel_args("bad; Bitmain; S; Zero; sha256; 0 TH/s; -5; BTC"),
        Err(BotError::Calc(CalcError::InvalidInput(InputError::NonPositive {
            field: "miner hash rate"
        })))
    ));
    assert!(matches!(
        parse_addmodel_args("bad; Bitmain; S; Cold; sha256; 100 TH/s; -5; BTC"),
        Err(BotError::Calc(CalcError::InvalidInput(InputError::Negative {
            field: "power consumption"
        })))
    ));

    assert_eq!(parse_delmodel_args(" L9-16 ").unwrap(), "l9-16");
    assert!(parse_delmodel_args("").is_err());
}

#[test]
fn test_parse_guide_and_status_args() {
    let (title, content) =
        parse_setguide_args("Buying used ASICs; Ask for a video; check the boards").unwrap();
    assert_eq!(title, "Buying used ASICs");
    assert_eq!(content, "Ask for a video; check the boards");
    assert!(matches!(parse_setguide_args("no text"), Err(BotError::Usage(_))));
    assert!(matches!(parse_setguide_args("title; "), Err(BotError::Usage(_))));

    assert_eq!(
        parse_setstatus_args("#3 Accepted").unwrap(),
        (3, SellRequestStatus::Accepted)
    );
    assert_eq!(
        parse_setstatus_args("4 rejected").unwrap(),
        (4, SellRequestStatus::Rejected)
    );
    assert!(matches!(parse_setstatus_args("x accepted"), Err(BotError::Usage(_))));
    assert!(matches!(
        parse_setstatus_args("3 sold"),
        Err(BotError::UnknownStatus(_))
    ));
}
