//! Text and date normalization
//!
//! Roster spreadsheets arrive with every representation imaginable: accented
//! and re-cased names, dates as text in three layouts or as Excel day
//! serials, headers with stray punctuation. Everything funnels through here
//! before validation so the rest of the pipeline only sees canonical forms.

use chrono::{Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

static DATE_BR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2})/(\d{2})/(\d{4})$").expect("static regex")
});
static DATE_DMY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{2})[/\-](\d{2})[/\-](\d{4})$").expect("static regex")
});
static DATE_YMD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{4})[/\-](\d{2})[/\-](\d{2})$").expect("static regex")
});

/// Normalize a person's name for comparison: lowercase, strip diacritics,
/// collapse whitespace runs, trim.
pub fn normalize_name(s: &str) -> String {
    let stripped: String = s
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalize a column header for matching: lowercase, strip diacritics,
/// keep only ASCII letters and digits. "Nome da Mãe" and "nome_da_mae"
/// collapse to the same key.
pub fn normalize_key(s: &str) -> String {
    s.to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

/// Check a `DD/MM/YYYY` string against the real calendar: the pattern must
/// match exactly and the components must form a date that round-trips
/// (rejects `31/02/2000`, `29/02/2001`).
pub fn is_date_br(s: &str) -> bool {
    let Some(caps) = DATE_BR.captures(s) else {
        return false;
    };
    let (Ok(dd), Ok(mm), Ok(yyyy)) = (
        caps[1].parse::<u32>(),
        caps[2].parse::<u32>(),
        caps[3].parse::<i32>(),
    ) else {
        return false;
    };
    NaiveDate::from_ymd_opt(yyyy, mm, dd).is_some()
}

/// Convert an Excel day serial (1900 epoch: serial 0 = 1899-12-30, serial
/// 25569 = 1970-01-01) to `DD/MM/YYYY`. The fractional part carries the time
/// of day and is discarded. The epoch keeps Excel's phantom 1900 leap day,
/// so serials before March 1900 inherit that off-by-one.
pub fn excel_serial_to_br_date(serial: f64) -> Option<String> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.floor() as i64;
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    let date = epoch.checked_add_signed(Duration::days(days))?;
    Some(date.format("%d/%m/%Y").to_string())
}

/// Rewrite the date layouts we accept (`DD/MM/YYYY`, `DD-MM-YYYY`,
/// `YYYY-MM-DD`, `YYYY/MM/DD`) into `DD/MM/YYYY`. Anything else passes
/// through trimmed and will fail [`is_date_br`] downstream.
pub fn normalize_date_str(s: &str) -> String {
    let s = s.trim();
    if let Some(caps) = DATE_DMY.captures(s) {
        return format!("{}/{}/{}", &caps[1], &caps[2], &caps[3]);
    }
    if let Some(caps) = DATE_YMD.captures(s) {
        return format!("{}/{}/{}", &caps[3], &caps[2], &caps[1]);
    }
    s.to_string()
}
