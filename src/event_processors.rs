use std::sync::Arc;

use chrono::{DateTime, Utc};
use teloxide::{
    prelude::*,
    types::{Recipient, User},
    utils::command::BotCommands,
};
use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::{
    business_logic::{request_for_manual, request_for_model},
    commands::{
        parse_addmodel_args, parse_calc_args, parse_delmodel_args, parse_model_args,
        parse_quote_args, parse_sell_args, parse_setguide_args, parse_setnet_args,
        parse_setprice_args, parse_setstatus_args, AdminCommand, CalcArgs, Command, ModelArgs,
        QuoteRequest,
    },
    config::Settings,
    consts::{BROADCAST_MESSAGE_INTERVAL, PRICE_LIST_SYMBOLS},
    errors::BotError,
    formatter::{
        format_guide, format_model_list, format_price_list, format_result, format_sell_request,
        format_sell_requests, DisplayMeta, Presentation,
    },
    models::{SellRequest, SellRequestStatus},
    prices::PriceFeed,
    storages::{
        CatalogDecision, CatalogEngine, CatalogEngineTrait, GuideEngine, MarketEngine,
        MarketEngineTrait, MarketUpdateDecision, SellRequestEngine, UserEngine,
    },
    types::TgUserId,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct BotState {
    pub market: Arc<Mutex<MarketEngine>>,
    pub catalog: Arc<Mutex<CatalogEngine>>,
    pub users: Arc<Mutex<UserEngine>>,
    pub guide: Arc<Mutex<GuideEngine>>,
    pub sell_requests: Arc<Mutex<SellRequestEngine>>,
    pub feed: Arc<PriceFeed>,
    pub settings: Arc<Settings>,
}

const WELCOME: &str = "Hi! I estimate ASIC mining profitability from current coin prices \
and network statistics.\n\nPick a model from /models and run /model, or describe your \
hardware with /calc. /help lists every command.";

const FAQ: &str = "📦 We ship equipment:\n\
— with any transport company you like (CDEK, Delovye Linii and others)\n\
— from our office, if you pick it up yourself\n\
— through your escrow agent\n\n\
💰 Payment:\n\
— cash on delivery in person\n\
— USDT, the manager will tell you the current rate\n\n\
/quote asks a manager for a price, /sell offers your equipment to us.";

pub fn answer_calc(
    market: &impl MarketEngineTrait,
    args: &CalcArgs,
    as_of: DateTime<Utc>,
) -> Result<String, BotError> {
    let request = request_for_manual(
        market,
        args.hash_rate,
        args.power_watts,
        args.algorithm,
        &args.coins,
        &args.electricity,
    )?;
    let result = request.compute()?;
    let symbols = request.symbols();
    let meta = DisplayMeta {
        title: None,
        symbols: &symbols,
        hash_rate: Some(args.hash_rate.in_unit(args.algorithm.profile().canonical_unit)),
        power_watts: args.power_watts,
        as_of,
    };

    Ok(format_result(
        &result,
        &meta,
        Presentation::from(args.electricity.currency),
    ))
}

pub fn answer_model(
    market: &impl MarketEngineTrait,
    catalog: &impl CatalogEngineTrait,
    args: &ModelArgs,
    as_of: DateTime<Utc>,
) -> Result<String, BotError> {
    let model = catalog
        .get_model(&args.id)
        .ok_or_else(|| BotError::UnknownModel(args.id.clone()))?;
    let request = request_for_model(market, model, &args.electricity)?;
    let result = request.compute()?;
    let symbols = request.symbols();
    let title = model.title();
    let meta = DisplayMeta {
        title: Some(&title),
        symbols: &symbols,
        hash_rate: Some(model.hash_rate),
        power_watts: model.power_watts,
        as_of,
    };

    Ok(format_result(
        &result,
        &meta,
        Presentation::from(args.electricity.currency),
    ))
}

fn describe_user(user: Option<&User>, chat_id: ChatId) -> String {
    match user {
        Some(user) => match &user.username {
            Some(username) => format!("@{} (id {})", username, user.id),
            None => format!("{} (id {})", user.full_name(), user.id),
        },
        None => format!("chat {}", chat_id),
    }
}

pub fn format_quote_request(request: &QuoteRequest, from: &str) -> String {
    let comment = match request.comment.is_empty() {
        true => "-",
        false => request.comment.as_str(),
    };
    format!(
        "🏷 Better price request from {}\nEquipment: {}\nComment: {}",
        from, request.equipment, comment
    )
}

pub fn error_reply(err: &BotError) -> String {
    match err {
        BotError::Http(_) | BotError::Json(_) | BotError::Telegram(_) => {
            "⚠️ Something went wrong, please try again later".to_string()
        }
        _ => format!("⚠️ {}", err),
    }
}

/// Fetches fresh prices without holding the market lock across the request.
pub async fn refresh_prices(
    feed: &PriceFeed,
    market: &Mutex<MarketEngine>,
) -> Result<usize, BotError> {
    let ids = {
        let market_locked = market.lock().await;
        market_locked.get_feed_ids()
    };

    let snapshot = feed.fetch(&ids).await?;

    let mut market_locked = market.lock().await;
    Ok(market_locked.apply_price_snapshot(&snapshot))
}

async fn forward_to_admin(bot: &Bot, settings: &Settings, text: String) -> Result<(), BotError> {
    let admin_id = settings.admin_id.ok_or(BotError::NotConfigured("ADMIN_ID"))?;
    bot.send_message(Recipient::Id(ChatId(admin_id)), text)
        .await?;
    Ok(())
}

/// Telegram text sent to the seller when the admin closes a request.
pub fn format_status_notice(request: &SellRequest) -> Option<String> {
    match request.status {
        SellRequestStatus::Pending => None,
        SellRequestStatus::Accepted => Some(format!(
            "✅ Your sell request #{} ({}) was accepted, a manager will contact you",
            request.id, request.equipment
        )),
        SellRequestStatus::Rejected => Some(format!(
            "❌ Your sell request #{} ({}) was declined",
            request.id, request.equipment
        )),
    }
}

pub fn is_admin_message(msg: &Message, settings: &Settings) -> bool {
    msg.from()
        .is_some_and(|x| settings.is_admin(x.id.0 as TgUserId))
}

fn spawn_broadcast(bot: Bot, recipients: Vec<TgUserId>, text: String) {
    tokio::spawn(async move {
        let mut failed = 0;
        for chat_id in recipients.iter() {
            if let Err(err) = bot
                .send_message(Recipient::Id(ChatId(*chat_id)), text.clone())
                .await
            {
                warn!("Failed to deliver broadcast to {}: {:?}", chat_id, err);
                failed += 1;
            }
            tokio::time::sleep(BROADCAST_MESSAGE_INTERVAL).await;
        }
        info!(
            "Broadcast finished | recipients {} | failed {}",
            recipients.len(),
            failed
        );
    });
}

async fn execute_command(
    bot: &Bot,
    msg: &Message,
    cmd: Command,
    state: &BotState,
) -> Result<String, BotError> {
    match cmd {
        Command::Start => {
            let username = msg.from().and_then(|x| x.username.clone());
            let mut users_locked = state.users.lock().await;
            if users_locked.register(msg.chat.id.0, username) {
                info!(
                    "New user {} | total {}",
                    msg.chat.id,
                    users_locked.get_size()
                );
            }
            Ok(WELCOME.to_string())
        }
        Command::Help => match is_admin_message(msg, &state.settings) {
            true => Ok(format!(
                "{}\n\n{}",
                Command::descriptions(),
                AdminCommand::descriptions()
            )),
            false => Ok(Command::descriptions().to_string()),
        },
        Command::Prices => {
            let market_locked = state.market.lock().await;
            let quotes = market_locked.get_price_list(&PRICE_LIST_SYMBOLS);
            Ok(format_price_list(&quotes, market_locked.get_usd_to_rub()))
        }
        Command::Models(filter) => {
            let catalog_locked = state.catalog.lock().await;
            Ok(format_model_list(&catalog_locked.get_models(&filter)))
        }
        Command::Calc(text) => {
            let args = parse_calc_args(&text)?;
            let market_locked = state.market.lock().await;
            answer_calc(&*market_locked, &args, Utc::now())
        }
        Command::Model(text) => {
            let args = parse_model_args(&text)?;
            let catalog_locked = state.catalog.lock().await;
            let market_locked = state.market.lock().await;
            answer_model(&*market_locked, &*catalog_locked, &args, Utc::now())
        }
        Command::Sell(text) => {
            let offer = parse_sell_args(&text)?;
            let from = describe_user(msg.from(), msg.chat.id);
            let forwarded = {
                let mut requests_locked = state.sell_requests.lock().await;
                let id = requests_locked.create(msg.chat.id.0, from, offer);
                info!("Sell request #{} from {}", id, msg.chat.id);
                requests_locked.get_request(id).map(format_sell_request)
            };
            // the request stays listed in /requests even if forwarding fails
            if let Some(text) = forwarded {
                if let Err(err) = forward_to_admin(bot, &state.settings, text).await {
                    warn!("Failed to forward sell request: {}", err);
                }
            }
            Ok("✅ Your offer has been saved, we will contact you soon".to_string())
        }
        Command::Quote(text) => {
            let request = parse_quote_args(&text)?;
            let from = describe_user(msg.from(), msg.chat.id);
            forward_to_admin(bot, &state.settings, format_quote_request(&request, &from))
                .await?;
            Ok("✅ Request sent, a manager will reply with a price".to_string())
        }
        Command::Guide => {
            let guide_locked = state.guide.lock().await;
            Ok(format_guide(guide_locked.get_guide()))
        }
        Command::Faq => Ok(FAQ.to_string()),
        Command::Notify => {
            let mut users_locked = state.users.lock().await;
            match users_locked.toggle_notifications(msg.chat.id.0) {
                Some(true) => Ok("🔔 Notifications are on".to_string()),
                Some(false) => Ok("🔕 Notifications are off".to_string()),
                None => Err(BotError::NotRegistered),
            }
        }
    }
}

async fn execute_admin_command(
    bot: &Bot,
    msg: &Message,
    cmd: AdminCommand,
    state: &BotState,
) -> Result<String, BotError> {
    match cmd {
        AdminCommand::SetNet(text) => {
            let network = parse_setnet_args(&text)?;
            let symbol = network.symbol.clone();
            let mut market_locked = state.market.lock().await;
            match market_locked.set_network(network) {
                MarketUpdateDecision::Updated => Ok(format!("Network data for {} updated", symbol)),
                MarketUpdateDecision::UnknownCoin => Err(BotError::MissingMarketData(symbol)),
            }
        }
        AdminCommand::SetPrice(text) => {
            let (symbol, price_usd) = parse_setprice_args(&text)?;
            let mut market_locked = state.market.lock().await;
            match market_locked.set_price(&symbol, price_usd) {
                MarketUpdateDecision::Updated => {
                    info!("Price of {} set to ${} manually", symbol, price_usd);
                    Ok(format!("Price of {} set to ${}", symbol, price_usd))
                }
                MarketUpdateDecision::UnknownCoin => Err(BotError::MissingMarketData(symbol)),
            }
        }
        AdminCommand::AddModel(text) => {
            let model = parse_addmodel_args(&text)?;
            let id = model.id.clone();
            let mut catalog_locked = state.catalog.lock().await;
            let reply = match catalog_locked.upsert_model(model) {
                CatalogDecision::New => format!("Model {} added", id),
                CatalogDecision::Updated => format!("Model {} updated", id),
                CatalogDecision::NotChanged => format!("Model {} saved, nothing changed", id),
            };
            Ok(reply)
        }
        AdminCommand::DelModel(text) => {
            let id = parse_delmodel_args(&text)?;
            let mut catalog_locked = state.catalog.lock().await;
            match catalog_locked.remove_model(&id) {
                true => Ok(format!("Model {} removed", id)),
                false => Err(BotError::UnknownModel(id)),
            }
        }
        AdminCommand::Refresh => {
            let updated = refresh_prices(&state.feed, &state.market).await?;
            Ok(format!("Prices refreshed for {} coins", updated))
        }
        AdminCommand::Broadcast(text) => {
            let text = text.trim().to_string();
            if text.is_empty() {
                return Err(BotError::Usage("/broadcast <text>"));
            }
            let recipients = {
                let users_locked = state.users.lock().await;
                users_locked.get_broadcast_recipients()
            };
            let count = recipients.len();
            spawn_broadcast(bot.clone(), recipients, text);
            Ok(format!("Broadcast to {} users started", count))
        }
        AdminCommand::SetGuide(text) => {
            let (title, content) = parse_setguide_args(&text)?;
            let updated_by = msg.from().map(|x| x.id.0 as TgUserId).unwrap_or(msg.chat.id.0);
            let mut guide_locked = state.guide.lock().await;
            guide_locked.update_guide(title, content, updated_by);
            Ok("Guide updated".to_string())
        }
        AdminCommand::Requests => {
            let requests_locked = state.sell_requests.lock().await;
            Ok(format_sell_requests(&requests_locked.get_pending()))
        }
        AdminCommand::SetStatus(text) => {
            let (id, status) = parse_setstatus_args(&text)?;
            let request = {
                let mut requests_locked = state.sell_requests.lock().await;
                if !requests_locked.update_status(id, status) {
                    return Err(BotError::UnknownRequest(id));
                }
                requests_locked.get_request(id).cloned()
            };
            if let Some(request) = request {
                if let Some(notice) = format_status_notice(&request) {
                    if let Err(err) = bot
                        .send_message(Recipient::Id(ChatId(request.chat_id)), notice)
                        .await
                    {
                        warn!("Failed to notify seller {}: {:?}", request.chat_id, err);
                    }
                }
            }
            Ok(format!("Request #{} marked {}", id, status))
        }
    }
}

async fn send_reply(
    bot: &Bot,
    msg: &Message,
    result: Result<String, BotError>,
) -> ResponseResult<()> {
    let reply = match result {
        Ok(reply) => reply,
        Err(err) => {
            match &err {
                BotError::Http(_) | BotError::Json(_) | BotError::Telegram(_) => {
                    error!("Command from {} failed: {:?}", msg.chat.id, err)
                }
                _ => warn!("Command from {} rejected: {}", msg.chat.id, err),
            }
            error_reply(&err)
        }
    };

    bot.send_message(msg.chat.id, reply).await?;
    Ok(())
}

pub async fn process_command(
    bot: Bot,
    msg: Message,
    cmd: Command,
    state: BotState,
) -> ResponseResult<()> {
    let result = execute_command(&bot, &msg, cmd, &state).await;
    send_reply(&bot, &msg, result).await
}

pub async fn process_admin_command(
    bot: Bot,
    msg: Message,
    cmd: AdminCommand,
    state: BotState,
) -> ResponseResult<()> {
    info!("Admin command from {}: {:?}", msg.chat.id, cmd);
    let result = execute_admin_command(&bot, &msg, cmd, &state).await;
    send_reply(&bot, &msg, result).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn priced_market() -> MarketEngine {
        let mut market = MarketEngine::with_defaults();
        for (symbol, price) in [("BTC", 92_355.92), ("LTC", 83.66), ("DOGE", 0.1642)] {
            market.set_price(symbol, price);
        }
        market
    }

    #[test]
    fn test_answer_model() {
        let market = priced_market();
        let catalog = CatalogEngine::with_defaults();

        let args = parse_model_args("s21-200 5.5 rub").unwrap();
        let text = answer_model(&market, &catalog, &args, Utc::now()).unwrap();
        assert!(text.starts_with("🔧 Equipment: Bitmain Antminer S21 200 TH/s\n"));
        assert!(text.contains("💰 Coins: BTC\n"));
        assert!(text.contains("📈 Net profit (RUB):"));

        let args = parse_model_args("l7-9500 0.05 usd 1%").unwrap();
        let text = answer_model(&market, &catalog, &args, Utc::now()).unwrap();
        assert!(text.contains("💰 Coins: LTC, DOGE\n"));
        assert!(text.contains("💵 Income (USD):"));

        let args = parse_model_args("s99 5.5 rub").unwrap();
        assert!(matches!(
            answer_model(&market, &catalog, &args, Utc::now()),
            Err(BotError::UnknownModel(id)) if id == "s99"
        ));
    }

    #[test]
    fn test_answer_calc_shows_canonical_unit() {
        let market = priced_market();
        let args = parse_calc_args("9500 MH/s 3425 5.5 rub scrypt").unwrap();
        let text = answer_calc(&market, &args, Utc::now()).unwrap();
        assert!(text.contains("⚙️ Hash rate: 9.5 GH/s"));
        assert!(text.contains("💰 Coins: LTC, DOGE"));
    }

    #[test]
    fn test_error_reply_hides_internal_errors() {
        let err: BotError = serde_json::from_str::<u32>("x").unwrap_err().into();
        assert!(!error_reply(&err).contains("malformed"));

        let err = BotError::UnknownModel("s99".to_string());
        assert_eq!(error_reply(&err), "⚠️ model 's99' is not in the catalog");
    }

    #[test]
    fn test_forwarded_texts() {
        let offer = parse_sell_args("Antminer S19; 500$; used; @seller").unwrap();
        let mut requests = SellRequestEngine::new();
        let id = requests.create(1, "@seller (id 1)".to_string(), offer);
        let text = format_sell_request(requests.get_request(id).unwrap());
        assert!(text.starts_with("💼 Sell request #1 from @seller (id 1)\n"));
        assert!(text.contains("Equipment: Antminer S19"));
        assert!(text.contains("Contact: @seller"));
        assert!(text.contains("Status: pending"));

        let request = parse_quote_args("Antminer L7").unwrap();
        assert!(format_quote_request(&request, "x").ends_with("Comment: -"));
    }

    #[test]
    fn test_status_notice() {
        let offer = parse_sell_args("Antminer L7; 900$; new; @seller").unwrap();
        let mut requests = SellRequestEngine::new();
        let id = requests.create(42, "@seller".to_string(), offer);
        assert!(format_status_notice(requests.get_request(id).unwrap()).is_none());

        requests.update_status(id, SellRequestStatus::Accepted);
        let notice = format_status_notice(requests.get_request(id).unwrap()).unwrap();
        assert!(notice.contains("#1 (Antminer L7) was accepted"));

        requests.update_status(id, SellRequestStatus::Rejected);
        let notice = format_status_notice(requests.get_request(id).unwrap()).unwrap();
        assert!(notice.contains("was declined"));
    }
}
