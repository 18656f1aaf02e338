use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::{
    calculator::{Period, PeriodProjection, ProfitabilityResult},
    consts::MAX_DISPLAY_COINS,
    hashrate::HashRate,
    models::{AsicModel, CoinQuote, Currency, SellRequest, UsedDeviceGuide},
    types::Symbol,
};

const MAX_DECIMALS: usize = 12;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presentation {
    UsdPrimary,
    LocalPrimary,
}

impl From<Currency> for Presentation {
    fn from(currency: Currency) -> Self {
        match currency {
            Currency::Usd => Presentation::UsdPrimary,
            Currency::Rub => Presentation::LocalPrimary,
        }
    }
}

pub struct DisplayMeta<'a> {
    pub title: Option<&'a str>,
    pub symbols: &'a [Symbol],
    pub hash_rate: Option<HashRate>,
    pub power_watts: f64,
    pub as_of: DateTime<Utc>,
}

fn decimals_for(value: f64, min_decimals: usize) -> usize {
    let abs = value.abs();
    if abs == 0.0 || abs >= 1.0 {
        return min_decimals;
    }
    // keep two significant digits
    let leading_zeros = (-abs.log10()).floor().max(0.0) as usize;
    (leading_zeros + 2).clamp(min_decimals, MAX_DECIMALS.max(min_decimals))
}

/// Formats `value` with at least `min_decimals` places, adding places for
/// small magnitudes so a nonzero value never prints as zero.
pub fn format_amount(value: f64, min_decimals: usize) -> String {
    if value == 0.0 {
        return format!("{:.*}", min_decimals, 0.0);
    }
    if value.abs() < 10f64.powi(-(MAX_DECIMALS as i32)) {
        return format!("{:.2e}", value);
    }
    format!("{:.*}", decimals_for(value, min_decimals), value)
}

pub fn format_coins(value: f64, symbol: &str) -> String {
    let min_decimals = match symbol {
        "BTC" | "BCH" | "BSV" => 8,
        _ if value.abs() >= 1.0 => 2,
        _ => 4,
    };
    format!("{} {}", format_amount(value, min_decimals), symbol)
}

pub fn format_money(value: f64, currency: Currency) -> String {
    let amount = format_amount(value, 2);
    match currency {
        Currency::Usd => match amount.strip_prefix('-') {
            Some(abs) => format!("-${}", abs),
            None => format!("${}", amount),
        },
        Currency::Rub => format!("{} RUB", amount),
    }
}

fn period_label(period: Period) -> &'static str {
    match period {
        Period::Day => "per day",
        Period::Week => "per week",
        Period::Month => "per month",
        Period::Year => "per year",
    }
}

fn write_money_section(
    text: &mut String,
    header: &str,
    result: &ProfitabilityResult,
    currency: Currency,
    pick: impl Fn(&PeriodProjection, Currency) -> f64,
) {
    let _ = writeln!(text, "\n{}", header);
    for period in Period::ALL {
        let value = pick(result.period(period), currency);
        let _ = writeln!(
            text,
            "— {}: {}",
            period_label(period),
            format_money(value, currency)
        );
    }
}

/// Renders a calculation result. `presentation` picks the currency of the
/// money sections; the other currency is summarised on the last line.
pub fn format_result(
    result: &ProfitabilityResult,
    meta: &DisplayMeta,
    presentation: Presentation,
) -> String {
    let (primary, secondary) = match presentation {
        Presentation::UsdPrimary => (Currency::Usd, result.local_currency),
        Presentation::LocalPrimary => (result.local_currency, Currency::Usd),
    };
    let display: Vec<&Symbol> = meta.symbols.iter().take(MAX_DISPLAY_COINS).collect();
    let mut text = String::new();

    if let Some(title) = meta.title {
        let _ = writeln!(text, "🔧 Equipment: {}", title);
    }
    if let Some(hash_rate) = meta.hash_rate {
        let _ = writeln!(text, "⚙️ Hash rate: {}", hash_rate);
    }
    let coin_list: Vec<&str> = display.iter().map(|x| x.as_str()).collect();
    let _ = writeln!(text, "💰 Coins: {}", coin_list.join(", "));
    let _ = writeln!(text, "🔌 Power: {:.1} W", meta.power_watts);
    let _ = writeln!(
        text,
        "🔄 USD/{}: {:.2}",
        result.local_currency, result.usd_to_local
    );

    let _ = writeln!(text, "\n📊 Mined coins:");
    for period in Period::ALL {
        let projection = result.period(period);
        let coins: Vec<String> = display
            .iter()
            .map(|symbol| {
                let amount = projection.coins.get(*symbol).copied().unwrap_or(0.0);
                format_coins(amount, symbol)
            })
            .collect();
        let _ = writeln!(text, "— {}: {}", period_label(period), coins.join(" | "));
    }

    if result.coins.len() > 1 {
        let _ = writeln!(text, "\n🪙 Daily income by coin:");
        for x in result.coins.iter().filter(|x| display.contains(&&x.symbol)) {
            let value = match primary {
                Currency::Usd => x.daily_income_usd,
                Currency::Rub => x.daily_income_usd * result.usd_to_local,
            };
            let _ = writeln!(text, "— {}: {}", x.symbol, format_money(value, primary));
        }
    }

    write_money_section(
        &mut text,
        &format!("💵 Income ({}):", primary),
        result,
        primary,
        |p, c| match c {
            Currency::Usd => p.income_usd,
            Currency::Rub => p.income_local,
        },
    );
    write_money_section(
        &mut text,
        &format!("⚡ Electricity ({}):", primary),
        result,
        primary,
        |p, c| match c {
            Currency::Usd => p.electricity_cost_usd,
            Currency::Rub => p.electricity_cost_local,
        },
    );
    write_money_section(
        &mut text,
        &format!("📈 Net profit ({}):", primary),
        result,
        primary,
        |p, c| match c {
            Currency::Usd => p.profit_usd,
            Currency::Rub => p.profit_local,
        },
    );

    let secondary_profit = match secondary {
        Currency::Usd => result.daily_profit_usd,
        Currency::Rub => result.daily_profit_local,
    };
    let _ = writeln!(
        text,
        "\nNet profit per day in {}: {}",
        secondary,
        format_money(secondary_profit, secondary)
    );
    let _ = write!(
        text,
        "🕒 As of {}",
        meta.as_of.format("%d.%m.%Y %H:%M UTC")
    );

    text
}

pub fn format_price_list(quotes: &[&CoinQuote], usd_to_rub: f64) -> String {
    let mut text = String::new();
    let _ = writeln!(text, "Coin prices (USD/RUB {:.2}):\n", usd_to_rub);
    for quote in quotes {
        let icon = if quote.change_24h_pct >= 0.0 { "📈" } else { "📉" };
        let _ = writeln!(
            text,
            "🔸 {} ({})\n   {} | {}\n   {} {:+.1}%",
            quote.symbol,
            quote.name,
            format_money(quote.price_usd, Currency::Usd),
            format_money(quote.price_rub, Currency::Rub),
            icon,
            quote.change_24h_pct,
        );
    }
    text
}

pub fn format_model_list(models: &[&AsicModel]) -> String {
    if models.is_empty() {
        return "No models found".to_string();
    }
    let mut text = String::new();
    let mut current_group: Option<(&str, &str)> = None;
    for model in models {
        let group = (model.manufacturer.as_str(), model.line.as_str());
        if current_group != Some(group) {
            let _ = writeln!(text, "\n{} {} ({})", group.0, group.1, model.algorithm);
            current_group = Some(group);
        }
        let price = match model.price_rub {
            Some(price) => format!(" | {}", format_money(price, Currency::Rub)),
            None => String::new(),
        };
        let _ = writeln!(
            text,
            "• {} — {}, {:.0} W{} [/model {}]",
            model.name, model.hash_rate, model.power_watts, price, model.id
        );
    }
    text
}

pub fn format_guide(guide: Option<&UsedDeviceGuide>) -> String {
    match guide {
        Some(guide) => format!("📖 {}\n\n{}", guide.title, guide.content),
        None => "❌ The guide is not available yet".to_string(),
    }
}

pub fn format_sell_request(request: &SellRequest) -> String {
    format!(
        "💼 Sell request #{} from {}\nEquipment: {}\nPrice: {}\nCondition: {}\nContact: {}\nStatus: {} | {}",
        request.id,
        request.from,
        request.equipment,
        request.price,
        request.condition,
        request.contact,
        request.status,
        request.created_at.format("%d.%m.%Y %H:%M UTC")
    )
}

pub fn format_sell_requests(requests: &[&SellRequest]) -> String {
    if requests.is_empty() {
        return "No pending sell requests".to_string();
    }
    let mut text = String::new();
    for request in requests {
        let _ = writeln!(text, "{}\n", format_sell_request(request));
    }
    let _ = write!(text, "Close one with /setstatus <id> accepted|rejected");
    text
}
