// Statement Normalizer - Field Extractors
// Pure per-cell heuristics: amount, date, currency, location, scope

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};

use crate::transaction::{Currency, Scope};

/// Cities recognised in transaction descriptions.
pub const KNOWN_CITIES: [&str; 17] = [
    "delhi",
    "mumbai",
    "bangalore",
    "chennai",
    "kolkata",
    "hyderabad",
    "pune",
    "ahmedabad",
    "jaipur",
    "gurgaon",
    "noida",
    "gurugram",
    "newyork",
    "california",
    "berlin",
    "katunayake",
    "dusseldor",
];

const INTERNATIONAL_KEYWORDS: [&str; 8] = [
    "international",
    "foreign",
    "overseas",
    "euro",
    "usd",
    "eur",
    "dollar",
    "pound",
];

/// Numeric layouts are listed month-first before day-first, so an
/// out-of-range month falls through to the day-first reading.
const DATE_FORMATS: [&str; 24] = [
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%m/%d/%Y",
    "%d/%m/%Y",
    "%m.%d.%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y.%m.%d",
    "%m-%d-%y",
    "%d-%m-%y",
    "%m/%d/%y",
    "%d/%m/%y",
    "%d %b %Y",
    "%d-%b-%Y",
    "%d %B %Y",
    "%d-%B-%Y",
    "%b %d %Y",
    "%b %d, %Y",
    "%B %d %Y",
    "%B %d, %Y",
    "%d %b %y",
    "%d-%b-%y",
    "%d/%b/%Y",
];

const DATETIME_FORMATS: [&str; 8] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m-%d-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];

// ============================================================================
// AMOUNTS
// ============================================================================

/// Clean an amount cell into a nonnegative number.
///
/// Drops currency glyphs, thousands separators, a trailing `cr` marker and
/// anything else that is not a digit or a dot. Whether the amount is a
/// credit is decided by the caller (see [`has_credit_suffix`]).
///
/// ```
/// use statement_normalizer::extract::amount_clean;
/// assert_eq!(amount_clean("₹1,234.50 CR"), 1234.50);
/// assert_eq!(amount_clean("n/a"), 0.0);
/// ```
pub fn amount_clean(text: &str) -> f64 {
    let lowered = text.trim().to_lowercase();
    let without_marker = lowered.strip_suffix("cr").unwrap_or(lowered.as_str());

    let cleaned: String = without_marker
        .chars()
        .filter(|c| !matches!(*c, '₹' | '$' | '€' | '£' | ','))
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();

    cleaned
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
        .unwrap_or(0.0)
}

/// Whether an amount cell carries the trailing credit marker (`cr`, any case).
pub fn has_credit_suffix(text: &str) -> bool {
    text.trim().to_lowercase().ends_with("cr")
}

// ============================================================================
// DATES
// ============================================================================

/// Normalize a date cell to `DD-MM-YYYY`.
///
/// Returns an empty string when the text is not a date; callers drop such rows.
pub fn date_normalize(text: &str) -> String {
    let text = text.trim();
    let candidate = swap_month_day(text).unwrap_or_else(|| text.to_string());

    parse_tolerant(&candidate)
        .map(|date| date.format("%d-%m-%Y").to_string())
        .unwrap_or_default()
}

/// `MM-DD-YYYY...` with a plausible month and day becomes `DD-MM-YYYY...`.
fn swap_month_day(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    if bytes.len() < 10 {
        return None;
    }
    let shape_ok = bytes[..10].iter().enumerate().all(|(i, b)| match i {
        2 | 5 => *b == b'-',
        _ => b.is_ascii_digit(),
    });
    if !shape_ok {
        return None;
    }

    let first: u32 = text[0..2].parse().ok()?;
    let second: u32 = text[3..5].parse().ok()?;
    if first > 12 || second > 31 {
        return None;
    }

    Some(format!("{}-{}-{}", &text[3..5], &text[0..2], &text[6..]))
}

fn parse_tolerant(text: &str) -> Option<NaiveDate> {
    if text.is_empty() {
        return None;
    }

    let dates = DATE_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok().map(|d| (fmt, d)));
    let datetimes = DATETIME_FORMATS.iter().filter_map(|fmt| {
        NaiveDateTime::parse_from_str(text, fmt)
            .ok()
            .map(|dt| (fmt, dt.date()))
    });

    // timestamps with an offset or `Z` keep their local calendar date
    let zoned = DateTime::parse_from_rfc3339(text)
        .ok()
        .map(|dt| dt.date_naive());

    // %Y reads "23" as the year 23 and "+12345" as 12345
    dates
        .chain(datetimes)
        .map(|(_, date)| date)
        .chain(zoned)
        .find(|date| (1000..=9999).contains(&date.year()))
}

// ============================================================================
// CURRENCY, LOCATION, SCOPE
// ============================================================================

/// Detect the currency of a row, preferring what the amount cell says.
pub fn currency_detect(description: &str, amount_text: &str) -> Currency {
    if amount_text.contains("EUR") {
        Currency::Eur
    } else if amount_text.contains("USD") {
        Currency::Usd
    } else if amount_text.contains("POUND") || amount_text.contains('£') {
        Currency::Pound
    } else if description.contains("EUR") || description.contains("EURO") {
        Currency::Eur
    } else if description.contains("USD") || description.contains("DOLLAR") {
        Currency::Usd
    } else if description.contains("POUND") || description.contains('£') {
        Currency::Pound
    } else {
        Currency::Inr
    }
}

/// Best-effort merchant location: a known city, else the cleaned last word.
pub fn location_extract(description: &str) -> String {
    let words: Vec<&str> = description.split_whitespace().collect();
    if words.len() <= 1 {
        return String::new();
    }

    let last_word = words[words.len() - 1].to_lowercase();
    if let Some(city) = KNOWN_CITIES.iter().find(|city| last_word.contains(*city)) {
        return city.to_string();
    }

    let lowered = description.to_lowercase();
    if let Some(city) = KNOWN_CITIES.iter().find(|city| lowered.contains(*city)) {
        return city.to_string();
    }

    last_word
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

/// Keyword-based scope guess for a single row.
///
/// The emitted scope comes from the section map; this is only compared
/// against it (see `parser::StatementParser`).
pub fn scope_from_keywords(description: &str, currency: Currency) -> Scope {
    if currency != Currency::Inr {
        return Scope::International;
    }

    let lowered = description.to_lowercase();
    if INTERNATIONAL_KEYWORDS.iter().any(|kw| lowered.contains(kw)) {
        Scope::International
    } else {
        Scope::Domestic
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_amount_clean_rupee_credit() {
        assert_eq!(amount_clean("₹1,234.50 CR"), 1234.50);
    }

    #[test]
    fn test_amount_clean_other_glyphs() {
        assert_eq!(amount_clean("$45.99"), 45.99);
        assert_eq!(amount_clean("€ 1.000,00"), 1.0);
        assert_eq!(amount_clean("£12"), 12.0);
        assert_eq!(amount_clean("-450.00"), 450.0);
        assert_eq!(amount_clean("100 USD"), 100.0);
    }

    #[test]
    fn test_amount_clean_failures_are_zero() {
        assert_eq!(amount_clean(""), 0.0);
        assert_eq!(amount_clean("   "), 0.0);
        assert_eq!(amount_clean("n/a"), 0.0);
        assert_eq!(amount_clean("1.2.3"), 0.0);
    }

    #[test]
    fn test_amount_clean_idempotent() {
        for raw in ["₹1,234.50 CR", "450.00", "$0.99", "12,00,000", "junk", "7 Cr"] {
            let once = amount_clean(raw);
            assert_eq!(amount_clean(&once.to_string()), once, "input {raw:?}");
        }
    }

    #[test]
    fn test_credit_suffix() {
        assert!(has_credit_suffix("1,200.00 Cr"));
        assert!(has_credit_suffix("500CR "));
        assert!(!has_credit_suffix("500.00"));
        assert!(!has_credit_suffix(""));
    }

    #[test]
    fn test_date_us_order_is_swapped() {
        assert_eq!(date_normalize("07-15-2023"), "15-07-2023");
    }

    #[test]
    fn test_date_iso() {
        assert_eq!(date_normalize("2023-07-15"), "15-07-2023");
    }

    #[test]
    fn test_date_ambiguous_keeps_day_first() {
        // swapped to 04-03, then read month-first: 3 April
        assert_eq!(date_normalize("03-04-2023"), "03-04-2023");
    }

    #[test]
    fn test_date_day_over_twelve() {
        assert_eq!(date_normalize("13-05-2023"), "13-05-2023");
        assert_eq!(date_normalize("25/12/2023"), "25-12-2023");
    }

    #[test]
    fn test_date_other_layouts() {
        assert_eq!(date_normalize("15 Jul 2023"), "15-07-2023");
        assert_eq!(date_normalize("Jul 15, 2023"), "15-07-2023");
        assert_eq!(date_normalize("12/25/2023"), "25-12-2023");
        assert_eq!(date_normalize("2023-07-15 10:30:00"), "15-07-2023");
        assert_eq!(date_normalize("15-Jul-23"), "15-07-2023");
    }

    #[test]
    fn test_date_invalid_is_empty() {
        assert_eq!(date_normalize(""), "");
        assert_eq!(date_normalize("Date"), "");
        assert_eq!(date_normalize("SWIGGY MUMBAI"), "");
        assert_eq!(date_normalize("45-45-2023"), "");
    }

    #[test]
    fn test_date_year_outside_four_digits_is_empty() {
        assert_eq!(date_normalize("15-07-+12345"), "");
        assert_eq!(date_normalize("15-07-0023"), "");
        assert_eq!(date_normalize("+12345-07-15"), "");
    }

    #[test]
    fn test_date_with_offset_or_utc_marker() {
        assert_eq!(date_normalize("2023-07-15T10:30:00Z"), "15-07-2023");
        assert_eq!(date_normalize("2023-07-15T23:30:00+05:30"), "15-07-2023");
    }

    #[test]
    fn test_date_output_shape() {
        let shape = regex::Regex::new(r"^\d{2}-\d{2}-\d{4}$").unwrap();
        for input in [
            "07-15-2023",
            "2023-07-15",
            "15 Jul 2023",
            "15-Jul-23",
            "2023-07-15T10:30:00Z",
            "15-07-+12345",
            "not a date",
        ] {
            let out = date_normalize(input);
            assert!(out.is_empty() || shape.is_match(&out), "{input} -> {out}");
        }
    }

    #[test]
    fn test_currency_detect() {
        assert_eq!(currency_detect("PAYMENT IN USD", ""), Currency::Usd);
        assert_eq!(currency_detect("LOCAL SHOP", ""), Currency::Inr);
        assert_eq!(currency_detect("HOTEL BERLIN", "120.00 EUR"), Currency::Eur);
        assert_eq!(currency_detect("HARRODS LONDON", "£40"), Currency::Pound);
    }

    #[test]
    fn test_currency_amount_wins_over_description() {
        assert_eq!(currency_detect("PAID IN DOLLAR", "10 EUR"), Currency::Eur);
    }

    #[test]
    fn test_location_city_last_word() {
        assert_eq!(location_extract("POS PURCHASE MUMBAI"), "mumbai");
        assert_eq!(location_extract("UBER BANGALORE560001"), "bangalore");
    }

    #[test]
    fn test_location_city_anywhere() {
        assert_eq!(location_extract("DELHI METRO RECHARGE"), "delhi");
    }

    #[test]
    fn test_location_falls_back_to_last_word() {
        assert_eq!(location_extract("AMAZON PAY INDIA*"), "india");
    }

    #[test]
    fn test_location_single_token_is_empty() {
        assert_eq!(location_extract("NETFLIX"), "");
        assert_eq!(location_extract("   "), "");
    }

    #[test]
    fn test_scope_from_keywords() {
        assert_eq!(scope_from_keywords("LOCAL SHOP", Currency::Usd), Scope::International);
        assert_eq!(scope_from_keywords("Overseas fee", Currency::Inr), Scope::International);
        assert_eq!(scope_from_keywords("SWIGGY MUMBAI", Currency::Inr), Scope::Domestic);
    }
}
