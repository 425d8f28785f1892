use bigdecimal::BigDecimal;
use num_bigint::{BigInt, Sign};
use num_traits::{ToPrimitive, Zero};

use crate::error::Error;
use crate::model::UiTokenAmount;

/// A raw token amount shifted by its mint's decimals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScaledAmount {
    pub value: BigDecimal,
    /// Trailing zeros trimmed, as in RPC `uiAmountString`.
    pub display: String,
}

/// Places the decimal point `scale` digits from the right of `mantissa`.
fn plain_string(mantissa: &BigInt, scale: usize) -> String {
    let magnitude = mantissa.magnitude().to_string();
    let digits = if magnitude.len() <= scale {
        format!("{}{magnitude}", "0".repeat(scale + 1 - magnitude.len()))
    } else {
        magnitude
    };
    let (integer, fraction) = digits.split_at(digits.len() - scale);
    let fraction = fraction.trim_end_matches('0');

    let mut out = String::with_capacity(digits.len() + 2);
    if mantissa.sign() == Sign::Minus {
        out.push('-');
    }
    out.push_str(integer);
    if !fraction.is_empty() {
        out.push('.');
        out.push_str(fraction);
    }
    out
}

/// Computes `raw / 10^decimals` exactly, for any amount and any `u8` decimals.
///
/// `location` describes where the amount came from and is only used in errors.
pub fn scale(raw: &str, decimals: u8, location: &str) -> Result<ScaledAmount, Error> {
    if raw == "0" {
        return Ok(ScaledAmount {
            value: BigDecimal::zero(),
            display: "0".to_string(),
        });
    }

    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::NumericParse {
            field: "token amount",
            value: raw.to_string(),
            location: location.to_string(),
            reason: "not an integer".to_string(),
        });
    }

    let mantissa: BigInt = raw.parse().map_err(|e| Error::NumericParse {
        field: "token amount",
        value: raw.to_string(),
        location: location.to_string(),
        reason: format!("{e}"),
    })?;

    Ok(ScaledAmount {
        display: plain_string(&mantissa, usize::from(decimals)),
        value: BigDecimal::new(mantissa, i64::from(decimals)).normalized(),
    })
}

/// Builds the RPC token amount for a raw amount string.
pub fn ui_token_amount(raw: &str, decimals: u8, location: &str) -> Result<UiTokenAmount, Error> {
    let scaled = scale(raw, decimals, location)?;
    Ok(UiTokenAmount {
        amount: raw.to_string(),
        decimals,
        ui_amount: scaled.value.to_f64(),
        ui_amount_string: scaled.display,
    })
}
