/// Whole-franc amount with Swiss apostrophe grouping, e.g. `CHF 12'345`.
pub fn format_chf(amount: f64) -> String {
    if !amount.is_finite() {
        return "CHF -".to_string();
    }
    let rounded = amount.round();
    let sign = if rounded < 0.0 { "-" } else { "" };
    let digits = format!("{:.0}", rounded.abs());

    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (idx, ch) in digits.chars().enumerate() {
        if idx > 0 && (digits.len() - idx) % 3 == 0 {
            grouped.push('\'');
        }
        grouped.push(ch);
    }
    format!("CHF {sign}{grouped}")
}

/// Percentage given in percent units, e.g. `3.5` -> `3.5 %`.
pub fn format_percent(value: f64) -> String {
    format!("{value:.1} %")
}
