//! Lenient coercion of CSV and report cells into dates and decimals.

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

fn ymd(year: &str, month: &str, day: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(
        year.trim().parse().ok()?,
        month.trim().parse().ok()?,
        day.trim().parse().ok()?,
    )
}

/// Parse a calendar date from `YYYY-MM-DD`, `DD/MM/YYYY`, `YYYY/MM/DD` or
/// `DD-MM-YYYY`. A trailing time component (`2025-01-15T10:00:00Z`,
/// `15/01/2025 10:00`) is ignored; no timezone conversion happens.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim().trim_matches('"').trim();
    let date_part = trimmed
        .split(['T', ' '])
        .next()
        .unwrap_or_default();

    let separator = if date_part.contains('/') { '/' } else { '-' };
    let parts: Vec<&str> = date_part.split(separator).collect();
    let [a, b, c] = parts.as_slice() else {
        return None;
    };

    if a.len() == 4 {
        ymd(a, b, c)
    } else if c.len() == 4 {
        ymd(c, b, a)
    } else {
        None
    }
}

/// Keep only the characters that can form a decimal literal. An exponent
/// marker survives only directly after a digit, so `1.5e3` stays scientific
/// while letters in surrounding text are dropped.
fn strip_decoration(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        let keep = match c {
            '0'..='9' | '.' | '-' => true,
            'e' | 'E' => out.ends_with(|p: char| p.is_ascii_digit()),
            _ => false,
        };
        if keep {
            out.push(c);
        }
    }
    out
}

/// Parse a decimal amount, ignoring currency symbols, thousands separators
/// and percent signs. Unparseable input yields zero.
#[must_use]
pub fn parse_amount(raw: &str) -> Decimal {
    let cleaned = strip_decoration(raw);
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }
    cleaned
        .parse::<Decimal>()
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .unwrap_or(Decimal::ZERO)
}

/// Parse a non-negative count. Fractions are truncated; negative or
/// unparseable input yields zero.
#[must_use]
pub fn parse_count(raw: &str) -> u32 {
    let amount = parse_amount(raw).trunc();
    if amount.is_sign_negative() {
        return 0;
    }
    amount.to_u32().unwrap_or(u32::MAX)
}
