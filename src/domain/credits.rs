use std::fmt;

/// Credits are whole units; there is no fractional part.
pub type Credits = i64;

/// Balance every new account starts with.
pub const INITIAL_CREDITS: Credits = 50;

/// Format a balance with thousands separators.
/// Example: 50 -> "50", -1234 -> "-1,234"
pub fn format_credits(credits: Credits) -> String {
    let sign = if credits < 0 { "-" } else { "" };
    let digits = credits.unsigned_abs().to_string();

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("{}{}", sign, grouped)
}

/// Format a transaction amount with an explicit sign.
/// Example: 10 -> "+10", -5 -> "-5", 0 -> "0"
pub fn format_delta(amount: Credits) -> String {
    if amount > 0 {
        format!("+{}", format_credits(amount))
    } else {
        format_credits(amount)
    }
}

/// Parse a signed whole number of credits.
/// Example: "10" -> 10, "+10" -> 10, "-5" -> -5, "1,000" -> 1000
pub fn parse_credits(input: &str) -> Result<Credits, ParseCreditsError> {
    let input = input.trim();
    let (negative, digits) = match input.as_bytes().first() {
        Some(b'-') => (true, &input[1..]),
        Some(b'+') => (false, &input[1..]),
        _ => (false, input),
    };

    let digits: String = digits.chars().filter(|c| *c != ',').collect();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseCreditsError::InvalidFormat);
    }

    let value: Credits = digits.parse().map_err(|_| ParseCreditsError::OutOfRange)?;
    Ok(if negative { -value } else { value })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseCreditsError {
    InvalidFormat,
    OutOfRange,
}

impl fmt::Display for ParseCreditsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseCreditsError::InvalidFormat => write!(f, "invalid credit amount"),
            ParseCreditsError::OutOfRange => write!(f, "credit amount out of range"),
        }
    }
}

impl std::error::Error for ParseCreditsError {}
