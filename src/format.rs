// src/format.rs
use alloy::primitives::U256;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Convert a raw fixed-point amount to whole units as a `Decimal`.
/// Amounts past `Decimal` range collapse to zero instead of failing a pass.
pub fn scaled_units(raw: U256, decimals: u32) -> Decimal {
    let units = u128::try_from(raw).unwrap_or(u128::MAX);
    let scale = 10u128
        .checked_pow(decimals)
        .and_then(Decimal::from_u128)
        .unwrap_or(Decimal::ONE);
    Decimal::from_u128(units).unwrap_or(Decimal::ZERO) / scale
}

/// First 6 + last 4 characters joined by an ellipsis. Display only, never
/// a lookup key.
pub fn shorten_address(address: &str) -> String {
    if address.len() <= 10 {
        return address.to_string();
    }
    format!("{}...{}", &address[..6], &address[address.len() - 4..])
}

/// Bucketed "time ago" label. `now` must be sampled once per response so
/// every row in a list agrees on the reference point.
pub fn relative_time(now: u64, timestamp: u64) -> String {
    let diff = now.saturating_sub(timestamp);
    if diff < 60 {
        "just now".to_string()
    } else if diff < 3_600 {
        format!("{}m ago", diff / 60)
    } else if diff < 86_400 {
        format!("{}h ago", diff / 3_600)
    } else {
        format!("{}d ago", diff / 86_400)
    }
}

/// Human display form of a raw fixed-point amount.
///
/// Tiers: zero formats as "0"; positive values under 0.01 get six fraction
/// digits; 1M and up get a one-decimal "M" suffix; 1K and up a one-decimal
/// "K" suffix; everything else rounds to `max_decimals` with trailing
/// zeros dropped.
pub fn format_scaled_amount(raw: U256, decimals: u32, max_decimals: u32) -> String {
    let value = scaled_units(raw, decimals);

    if value.is_zero() {
        return "0".to_string();
    }

    if value > Decimal::ZERO && value < Decimal::new(1, 2) {
        let mut v = value.round_dp_with_strategy(6, RoundingStrategy::MidpointAwayFromZero);
        v.rescale(6);
        return v.to_string();
    }

    if value >= Decimal::from(1_000_000) {
        let mut v = (value / Decimal::from(1_000_000))
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
        v.rescale(1);
        return format!("{}M", v);
    }

    if value >= Decimal::from(1_000) {
        let mut v = (value / Decimal::from(1_000))
            .round_dp_with_strategy(1, RoundingStrategy::MidpointAwayFromZero);
        v.rescale(1);
        return format!("{}K", v);
    }

    value
        .round_dp_with_strategy(max_decimals, RoundingStrategy::MidpointAwayFromZero)
        .normalize()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    const WEI: u64 = 1_000_000_000_000_000_000; // 1.0 at 18 decimals

    fn units(n: u64) -> U256 {
        U256::from(n) * U256::from(WEI)
    }

    #[test]
    fn zero_formats_as_zero() {
        assert_eq!(format_scaled_amount(U256::ZERO, 18, 2), "0");
    }

    #[test]
    fn small_amounts_get_six_decimals() {
        // 0.005 at 18 decimals
        assert_eq!(
            format_scaled_amount(U256::from(5_000_000_000_000_000u64), 18, 2),
            "0.005000"
        );
    }

    #[test]
    fn thousands_get_k_suffix() {
        assert_eq!(format_scaled_amount(units(1_500), 18, 2), "1.5K");
        assert_eq!(format_scaled_amount(units(1_000), 18, 2), "1.0K");
    }

    #[test]
    fn millions_get_m_suffix() {
        assert_eq!(format_scaled_amount(units(2_500_000), 18, 2), "2.5M");
    }

    #[test]
    fn mid_range_drops_trailing_zeros() {
        assert_eq!(format_scaled_amount(units(5), 18, 2), "5");
        // 999.99
        assert_eq!(
            format_scaled_amount(U256::from(999_990_000_000_000_000_000u128), 18, 2),
            "999.99"
        );
    }

    #[test]
    fn scaled_units_divides_by_decimals() {
        assert_eq!(scaled_units(units(500), 18), Decimal::from(500));
        assert_eq!(
            scaled_units(U256::from(1_500u64), 3),
            Decimal::from_str("1.5").unwrap()
        );
    }

    #[test]
    fn shortens_long_addresses_only() {
        assert_eq!(
            shorten_address("0x1F49814E3aa4f8582c69a00421FBE9C2273046Ef"),
            "0x1F49...46Ef"
        );
        assert_eq!(shorten_address("0x1234"), "0x1234");
    }

    #[test]
    fn relative_time_buckets() {
        let now = 1_000_000;
        assert_eq!(relative_time(now, now - 30), "just now");
        assert_eq!(relative_time(now, now - 90), "1m ago");
        assert_eq!(relative_time(now, now - 3_599), "59m ago");
        assert_eq!(relative_time(now, now - 7_200), "2h ago");
        assert_eq!(relative_time(now, now - 90_000), "1d ago");
        // clock skew never panics
        assert_eq!(relative_time(now, now + 100), "just now");
    }
}
