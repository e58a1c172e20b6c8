/// Shown in place of any value that could not be fetched.
pub const PLACEHOLDER: &str = "--";

/// Sompi in one hundredth of a KAS.
const SOMPI_PER_CENTI_KAS: u64 = 1_000_000;

/// Format elapsed time in human-readable format
pub fn format_elapsed_time(now: u64, timestamp: u64) -> String {
    let elapsed = now.saturating_sub(timestamp);
    if elapsed < 60 {
        format!("{}s ago", elapsed)
    } else if elapsed < 3600 {
        format!("{}m ago", elapsed / 60)
    } else if elapsed < 86400 {
        format!("{}h ago", elapsed / 3600)
    } else {
        format!("{}d ago", elapsed / 86400)
    }
}

/// Format a hashrate given in GH/s with an appropriate unit (MH/s .. EH/s)
pub fn format_hashrate_ghs(ghs: f64) -> String {
    if !ghs.is_finite() || ghs < 0.0 {
        return PLACEHOLDER.to_string();
    }

    if ghs >= 1_000_000_000.0 {
        format!("{:.2} EH/s", ghs / 1_000_000_000.0)
    } else if ghs >= 1_000_000.0 {
        format!("{:.2} PH/s", ghs / 1_000_000.0)
    } else if ghs >= 1_000.0 {
        format!("{:.2} TH/s", ghs / 1_000.0)
    } else if ghs >= 1.0 || ghs == 0.0 {
        format!("{:.2} GH/s", ghs)
    } else {
        format!("{:.2} MH/s", ghs * 1_000.0)
    }
}

/// Format an optional hashrate, falling back to the placeholder
pub fn format_optional_hashrate(ghs: Option<f64>) -> String {
    ghs.map(format_hashrate_ghs)
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Format a sompi amount as KAS with two decimals and thousands separators
pub fn format_kas(sompi: u64) -> String {
    // Round half up to the nearest hundredth of a KAS
    let round_up = sompi % SOMPI_PER_CENTI_KAS >= SOMPI_PER_CENTI_KAS / 2;
    let centi = sompi / SOMPI_PER_CENTI_KAS + u64::from(round_up);
    format!("{}.{:02} KAS", group_thousands(centi / 100), centi % 100)
}

/// Format a USD price; sub-dollar prices keep four decimals
pub fn format_usd(price: f64) -> String {
    if !price.is_finite() || price < 0.0 {
        PLACEHOLDER.to_string()
    } else if price < 1.0 {
        format!("${:.4}", price)
    } else {
        format!("${:.2}", price)
    }
}

/// Shorten a hash to `keep` characters on each side, joined by an ellipsis
pub fn shorten_hash(hash: &str, keep: usize) -> String {
    let chars: Vec<char> = hash.chars().collect();
    if keep == 0 || chars.len() <= keep * 2 {
        return hash.to_string();
    }
    let head: String = chars[..keep].iter().collect();
    let tail: String = chars[chars.len() - keep..].iter().collect();
    format!("{}…{}", head, tail)
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    grouped
}
