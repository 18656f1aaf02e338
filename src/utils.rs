use crate::errors::BotError;

/// Parses user-entered numbers, accepting both "5.5" and "5,5".
pub fn parse_number(input: &str) -> Result<f64, BotError> {
    let cleaned: String = input
        .trim()
        .chars()
        .filter(|c| *c != ' ' && *c != '_')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => Ok(value),
        _ => Err(BotError::NotANumber(input.trim().to_string())),
    }
}

/// "1.5%" -> 0.015
pub fn parse_percent(input: &str) -> Result<f64, BotError> {
    let trimmed = input.trim();
    let number = trimmed.strip_suffix('%').unwrap_or(trimmed);
    Ok(parse_number(number)? / 100.0)
}

/// Splits `a; b; c` style command arguments, dropping empty trailing parts.
pub fn split_fields(input: &str) -> Vec<&str> {
    input
        .split(';')
        .map(|x| x.trim())
        .filter(|x| !x.is_empty())
        .collect()
}

pub fn parse_symbols(input: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for symbol in input.split(',').map(|x| x.trim().to_uppercase()) {
        if !symbol.is_empty() && !symbols.contains(&symbol) {
            symbols.push(symbol);
        }
    }
    symbols
}
