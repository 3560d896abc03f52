//! Fee-related protocol parameters

use num_rational::Ratio;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParameterError {
    #[error("Not a decimal number: {0}")]
    NotDecimal(String),

    #[error("Decimal {0} does not fit an exact u64 ratio")]
    Overflow(String),
}

/// The parameters the fee formula reads, snapshotted per request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolParameters {
    /// Lovelace per transaction byte
    pub min_fee_a: u64,
    /// Constant lovelace per transaction
    pub min_fee_b: u64,
    pub min_fee_ref_script_cost_per_byte: Ratio<u64>,
    pub price_mem: Ratio<u64>,
    pub price_step: Ratio<u64>,
}

/// Exact value of a decimal literal, scaling by ten until it is integral.
/// Accepts plain (`0.0577`) and exponent (`7.21e-5`) forms.
pub fn decimal_to_ratio(text: &str) -> Result<Ratio<u64>, ParameterError> {
    let not_decimal = || ParameterError::NotDecimal(text.to_string());
    let overflow = || ParameterError::Overflow(text.to_string());

    let (mantissa, exponent) = match text.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<i32>().map_err(|_| not_decimal())?),
        None => (text, 0),
    };
    let (whole, fraction) = mantissa.split_once('.').unwrap_or((mantissa, ""));
    if whole.is_empty() && fraction.is_empty() {
        return Err(not_decimal());
    }
    if !whole.bytes().chain(fraction.bytes()).all(|b| b.is_ascii_digit()) {
        return Err(not_decimal());
    }

    let digits = format!("{whole}{fraction}");
    let digits = digits.trim_start_matches('0');
    let mut numerator: u64 = if digits.is_empty() {
        0
    } else {
        digits.parse().map_err(|_| overflow())?
    };

    let scale = fraction.len() as i32 - exponent;
    let mut denominator: u64 = 1;
    if scale >= 0 {
        for _ in 0..scale {
            denominator = denominator.checked_mul(10).ok_or_else(overflow)?;
        }
    } else {
        for _ in 0..-scale {
            numerator = numerator.checked_mul(10).ok_or_else(overflow)?;
        }
    }

    Ok(Ratio::new(numerator, denominator))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("0.0577", 577, 10000)]
    #[test_case("0.0000721", 721, 10_000_000)]
    #[test_case("7.21e-5", 721, 10_000_000)]
    #[test_case("15", 15, 1)]
    #[test_case("44.0", 44, 1)]
    #[test_case("1.5E2", 150, 1)]
    #[test_case("0", 0, 1)]
    fn parses_decimal_exactly(text: &str, numer: u64, denom: u64) {
        assert_eq!(decimal_to_ratio(text).unwrap(), Ratio::new(numer, denom));
    }

    #[test_case("")]
    #[test_case("abc")]
    #[test_case("-1")]
    #[test_case("1.2.3")]
    fn rejects_non_decimals(text: &str) {
        assert!(matches!(decimal_to_ratio(text), Err(ParameterError::NotDecimal(_))));
    }

    #[test]
    fn rejects_unrepresentable_precision() {
        assert!(matches!(
            decimal_to_ratio("1e-40"),
            Err(ParameterError::Overflow(_))
        ));
    }
}
