//! Decimal helpers
//!
//! Quantities and money are `BigDecimal` everywhere inside the workspace.
//! JSON requests and responses carry plain numbers, so conversion happens
//! only at the edges through these helpers.

use bigdecimal::{BigDecimal, ToPrimitive};
use std::str::FromStr;

use crate::error::{Error, Result};

/// Parse a decimal from its textual form
pub fn parse(value: &str) -> Result<BigDecimal> {
    BigDecimal::from_str(value.trim())
        .map_err(|e| Error::invalid_input(format!("invalid decimal '{}': {}", value, e)))
}

/// Convert a wire number into a decimal.
///
/// Goes through the shortest round-trip text form of the float, so `10.1`
/// becomes exactly `10.1` rather than its binary expansion.
pub fn from_f64(value: f64) -> Result<BigDecimal> {
    if !value.is_finite() {
        return Err(Error::invalid_input(format!("non-finite number: {}", value)));
    }
    parse(&value.to_string())
}

/// Convert a decimal into a wire number
///
/// Fails when the value has no finite `f64` form, so callers never emit a
/// JSON `null` in place of an amount.
pub fn to_f64(value: &BigDecimal) -> Result<f64> {
    value
        .to_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| Error::internal(format!("{} has no finite f64 form", value)))
}
