use itertools::Itertools;
use num_format::{Locale, ToFormattedString};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};

use crate::geography::{impact_per_100k, Territory};

pub const INCREASE: &str = "🔺";
pub const DECREASE: &str = "🔻";
pub const UNCHANGED: &str = "🔙";

fn rounded(value: f64) -> Decimal {
    Decimal::from_f64(value)
        .unwrap_or_default()
        .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
}

/// Spanish formatting: `.` groups thousands and `,` separates decimals.
/// The value must already be rounded.
pub fn format_decimal(value: Decimal) -> String {
    let value = value.normalize();
    let abs = value.abs();
    let int_part = abs.trunc().to_u128().unwrap_or_default();
    let mut out = String::new();
    if value.is_sign_negative() && !value.is_zero() {
        out.push('-');
    }
    out.push_str(&int_part.to_formatted_string(&Locale::es));
    let frac = abs.fract().normalize().to_string();
    if let Some(digits) = frac.strip_prefix("0.") {
        out.push(',');
        out.push_str(digits);
    }
    out
}

/// Every number in a report goes through here: two decimals at most, no
/// trailing zeros.
pub fn format_number(value: f64) -> String {
    format_decimal(rounded(value))
}

/// Like [`format_number`] but always with an explicit sign.
pub fn format_signed(value: f64) -> String {
    let value = rounded(value);
    if value.is_sign_negative() && !value.is_zero() {
        format_decimal(value)
    } else {
        format!("+{}", format_decimal(value))
    }
}

/// Compare today against yesterday.  Nothing is said when yesterday is
/// unknown.
pub fn trend_indicator(today: f64, yesterday: Option<f64>) -> String {
    let Some(yesterday) = yesterday else {
        return String::new();
    };
    let (t, y) = (rounded(today), rounded(yesterday));
    if t > y {
        format!("{INCREASE}{}", format_decimal(t - y))
    } else if t < y {
        format!("{DECREASE}{}", format_decimal(y - t))
    } else {
        UNCHANGED.to_string()
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().join(" ")
}

/// `"{label}: {+today} {trend} (Totales: {accumulated})"`.  The totals are
/// left out when unknown or zero.
pub fn format_region_sentence(
    label: &str,
    today: f64,
    yesterday: Option<f64>,
    accumulated: Option<f64>,
) -> String {
    let totals = match accumulated {
        Some(x) if x != 0.0 => format!("(Totales: {})", format_number(x)),
        _ => String::new(),
    };
    collapse_whitespace(&format!(
        "{}: {} {} {}",
        label,
        format_signed(today),
        trend_indicator(today, yesterday),
        totals
    ))
}

/// For ratios: the current value with its unit, no sign.
pub fn format_incidence_sentence(
    label: &str,
    today: f64,
    yesterday: Option<f64>,
    unit_suffix: &str,
) -> String {
    collapse_whitespace(&format!(
        "{}: {}{} {}",
        label,
        format_number(today),
        unit_suffix,
        trend_indicator(today, yesterday)
    ))
}

/// `"💉 Dosis: 1.234 (+12) 45,6%"`.  The percentage is optional.
pub fn format_vaccination_sentence(
    label: &str,
    accumulated: f64,
    today: f64,
    percentage: Option<f64>,
) -> String {
    let percentage = percentage
        .map(|p| format!("{}%", format_number(p)))
        .unwrap_or_default();
    collapse_whitespace(&format!(
        "{}: {} ({}) {}",
        label,
        format_number(accumulated),
        format_signed(today),
        percentage
    ))
}

/// `"12,34/100.000 hab."`, empty when there is nothing to report.
pub fn impact_string(total: f64, territory: Territory) -> String {
    if total > 0.0 {
        format!("{}/100.000 hab.", format_number(impact_per_100k(total, territory)))
    } else {
        String::new()
    }
}
