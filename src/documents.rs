//! Brazilian document validation and masking
//!
//! Check-digit verification for CPF (11 digits) and CNPJ (14 digits), plus
//! the display masks the rest of the pipeline applies before validating.
//! All functions here are pure and never panic; malformed input simply
//! yields `false` or a partial mask.

/// Strip every character that is not an ASCII digit.
pub fn only_digits(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Weighted modulo-11 check digit: remainder < 2 maps to 0, else 11 - remainder.
fn check_digit(digits: &[u32], weights: &[u32]) -> u32 {
    let sum: u32 = digits.iter().zip(weights).map(|(d, w)| d * w).sum();
    let r = sum % 11;
    if r < 2 {
        0
    } else {
        11 - r
    }
}

fn all_identical(digits: &[u32]) -> bool {
    digits.windows(2).all(|w| w[0] == w[1])
}

/// Validate a CPF (individual taxpayer ID) by its two check digits.
///
/// Accepts masked or unmasked input; anything that does not strip to exactly
/// 11 digits, or whose digits are all identical, is invalid.
pub fn validate_cpf(cpf: &str) -> bool {
    let digits: Vec<u32> = only_digits(cpf)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    if digits.len() != 11 || all_identical(&digits) {
        return false;
    }

    let dv1 = check_digit(&digits[..9], &[10, 9, 8, 7, 6, 5, 4, 3, 2]);
    let mut with_dv1 = digits[..9].to_vec();
    with_dv1.push(dv1);
    let dv2 = check_digit(&with_dv1, &[11, 10, 9, 8, 7, 6, 5, 4, 3, 2]);

    digits[9] == dv1 && digits[10] == dv2
}

/// Validate a CNPJ (company taxpayer ID) by its two check digits.
pub fn validate_cnpj(cnpj: &str) -> bool {
    let digits: Vec<u32> = only_digits(cnpj)
        .chars()
        .filter_map(|c| c.to_digit(10))
        .collect();

    if digits.len() != 14 || all_identical(&digits) {
        return false;
    }

    let dv1 = check_digit(&digits[..12], &[5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);
    let mut with_dv1 = digits[..12].to_vec();
    with_dv1.push(dv1);
    let dv2 = check_digit(&with_dv1, &[6, 5, 4, 3, 2, 9, 8, 7, 6, 5, 4, 3, 2]);

    digits[12] == dv1 && digits[13] == dv2
}

/// Telephone with area code: 10 digits (landline) or 11 (mobile).
pub fn is_valid_phone(s: &str) -> bool {
    let len = only_digits(s).len();
    len == 10 || len == 11
}

/// Re-apply the `000.000.000-00` CPF mask, truncating to 11 digits.
/// Partial input renders a partial mask (used while the user is typing).
pub fn format_cpf(s: &str) -> String {
    let d = only_digits(s);
    let d = &d[..d.len().min(11)];

    let mut out = String::with_capacity(14);
    for (i, c) in d.chars().enumerate() {
        match i {
            3 | 6 => out.push('.'),
            9 => out.push('-'),
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Re-apply the `DD/MM/YYYY` mask while typing: strip non-digits, cap at
/// eight digits, insert slashes after the day and month.
pub fn mask_date(s: &str) -> String {
    let d = only_digits(s);
    let d = &d[..d.len().min(8)];

    let mut out = String::with_capacity(10);
    for (i, c) in d.chars().enumerate() {
        if i == 2 || i == 4 {
            out.push('/');
        }
        out.push(c);
    }
    out
}

/// Format a CEP (postal code) as `00000-000`; `None` unless exactly 8 digits.
pub fn format_cep(s: &str) -> Option<String> {
    let d = only_digits(s);
    if d.len() != 8 {
        return None;
    }
    Some(format!("{}-{}", &d[..5], &d[5..]))
}
