use crate::error::SnapshotError;
use chrono::{Datelike, NaiveDate};
use std::fmt;

/// Contract-type letter carried by OCC-style identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionType {
    Call,
    Put,
}

impl OptionType {
    fn from_letter(c: char) -> Option<Self> {
        match c {
            'C' => Some(OptionType::Call),
            'P' => Some(OptionType::Put),
            _ => None,
        }
    }

    pub fn letter(self) -> char {
        match self {
            OptionType::Call => 'C',
            OptionType::Put => 'P',
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// Typed fields recovered from an option symbol like `BTC251231150000`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSymbol {
    pub underlying: String,
    pub expires: NaiveDate,
    pub option_type: Option<OptionType>,
    pub price: u64,
}

/// Decode `<UNDERLYING><YY><MM><DD>[C|P]<PRICE>`.
///
/// The symbol has no delimiters, so the underlying length must be known up
/// front. The 6 characters after it are the date (year is `2000 + YY`) and
/// everything after that is the strike, optionally preceded by one `C`/`P`.
pub fn decode_symbol(symbol: &str, underlying_len: usize) -> Result<DecodedSymbol, SnapshotError> {
    let date_end = underlying_len + 6;

    if !symbol.is_ascii() {
        return Err(SnapshotError::malformed(symbol, "contains non-ASCII characters"));
    }
    if symbol.len() < date_end {
        return Err(SnapshotError::malformed(
            symbol,
            format!("expected at least {} characters, got {}", date_end, symbol.len()),
        ));
    }

    let underlying = &symbol[..underlying_len];
    let date_part = &symbol[underlying_len..date_end];

    let year = parse_digits(symbol, &date_part[0..2], "year")? as i32 + 2000;
    let month = parse_digits(symbol, &date_part[2..4], "month")? as u32;
    let day = parse_digits(symbol, &date_part[4..6], "day")? as u32;

    let expires = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
        SnapshotError::malformed(
            symbol,
            format!("{:04}-{:02}-{:02} is not a calendar date", year, month, day),
        )
    })?;

    let mut rest = &symbol[date_end..];
    let option_type = rest.chars().next().and_then(OptionType::from_letter);
    if option_type.is_some() {
        rest = &rest[1..];
    }

    let price = parse_digits(symbol, rest, "price")?;

    Ok(DecodedSymbol {
        underlying: underlying.to_string(),
        expires,
        option_type,
        price,
    })
}

/// Inverse of [`decode_symbol`]. The strike is written without padding.
pub fn encode_symbol(decoded: &DecodedSymbol) -> String {
    let type_letter = decoded
        .option_type
        .map(|t| t.letter().to_string())
        .unwrap_or_default();

    format!(
        "{}{:02}{:02}{:02}{}{}",
        decoded.underlying,
        decoded.expires.year() % 100,
        decoded.expires.month(),
        decoded.expires.day(),
        type_letter,
        decoded.price
    )
}

fn parse_digits(symbol: &str, field: &str, what: &str) -> Result<u64, SnapshotError> {
    if field.is_empty() {
        return Err(SnapshotError::malformed(symbol, format!("{} is empty", what)));
    }
    if !field.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SnapshotError::malformed(
            symbol,
            format!("{} '{}' is not numeric", what, field),
        ));
    }
    field
        .parse::<u64>()
        .map_err(|e| SnapshotError::malformed(symbol, format!("{} '{}': {}", what, field, e)))
}
