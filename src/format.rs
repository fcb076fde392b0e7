//! Brazilian number formatting for labels and metric tiles.

/// Group the digits of a non-negative integer string with `sep`.
fn group_digits(digits: &str, sep: char) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

/// `1234567` -> `"1.234.567"`
pub fn thousands(n: i64) -> String {
    let grouped = group_digits(&n.unsigned_abs().to_string(), '.');
    if n < 0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Round to an integer and group thousands. Non-finite values render as `"-"`.
pub fn thousands_f64(x: f64) -> String {
    if !x.is_finite() {
        return "-".to_string();
    }
    thousands(x.round() as i64)
}

/// `1234.5, 1` -> `"1.234,5"`
pub fn decimal_br(x: f64, decimals: usize) -> String {
    if !x.is_finite() {
        return "-".to_string();
    }
    let fixed = format!("{:.*}", decimals, x.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };
    let mut out = String::new();
    // "-0,0" reads oddly; only keep the sign when something non-zero survives rounding
    if x < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    out.push_str(&group_digits(int_part, '.'));
    if let Some(frac) = frac_part {
        out.push(',');
        out.push_str(frac);
    }
    out
}

/// Percentage label as the charts print it: `12.345, 1` -> `"12.3%"`.
pub fn pct(x: f64, decimals: usize) -> String {
    format!("{:.*}%", decimals, x)
}

/// Signed percentage change: `"+12.3%"`, `"-4.0%"`.
pub fn signed_pct(x: f64, decimals: usize) -> String {
    format!("{:+.*}%", decimals, x)
}
