//! Display formatting for addresses and amounts.

use crate::types::{Address, Amount, UNITS_PER_COIN};

/// Fixed-width truncated address for headers and cards: the `0x` prefix plus
/// the first four and last four hex digits.
pub fn short_address(address: &Address) -> String {
    let s = address.as_str();
    format!("{}...{}", &s[..6], &s[s.len() - 4..])
}

/// Native balance with exactly four decimal places, rounding half up.
pub fn format_balance(amount: &Amount) -> String {
    const QUANTUM: u128 = UNITS_PER_COIN / 10_000;
    let rounded = amount.base_units().saturating_add(QUANTUM / 2) / QUANTUM;
    format!("{}.{:04}", rounded / 10_000, rounded % 10_000)
}

/// Funding percentage with two decimal places, e.g. `25.00%`.
pub fn format_percent(percent: f64) -> String {
    format!("{percent:.2}%")
}
