//! Price normalization.
//!
//! Converts a raw deposit (wei) into its USD value with 18 decimals so it
//! can be compared against the minimum funding value. Division truncates;
//! a deposit worth 4.999… USD is below a 5 USD minimum.

use crate::types::{PriceReading, WAD};
use crate::{FundMeError, Result};

/// Source of oracle readings.
pub trait PriceFeed: Send + Sync {
    /// Latest usable reading, or `None` when the feed has nothing fresh.
    fn latest_reading(&self) -> Option<PriceReading>;

    /// Interface version reported by the feed.
    fn version(&self) -> u64;
}

/// Rescale the oracle answer to 18 decimals.
pub fn price_in_wad(reading: &PriceReading) -> Result<u128> {
    if reading.answer <= 0 {
        return Err(FundMeError::InvalidPrice);
    }
    let answer = reading.answer as u128;
    let decimals = u32::from(reading.decimals);
    if decimals <= 18 {
        let factor = 10u128.pow(18 - decimals);
        answer.checked_mul(factor).ok_or(FundMeError::Overflow)
    } else {
        let divisor = 10u128
            .checked_pow(decimals - 18)
            .ok_or(FundMeError::Overflow)?;
        match answer / divisor {
            0 => Err(FundMeError::InvalidPrice),
            price => Ok(price),
        }
    }
}

/// `price_wad * amount / WAD`, floor.
pub fn normalize(price_wad: u128, amount: u128) -> Result<u128> {
    if price_wad == 0 {
        return Err(FundMeError::InvalidPrice);
    }
    mul_div(price_wad, amount, WAD)
}

/// Convert a deposit using the feed's latest reading.
pub fn conversion_rate(reading: &PriceReading, amount: u128) -> Result<u128> {
    normalize(price_in_wad(reading)?, amount)
}

fn gcd(mut a: u128, mut b: u128) -> u128 {
    while b != 0 {
        let r = a % b;
        a = b;
        b = r;
    }
    a
}

// (a*b)/c == ((a/g1)*(b/g2))/(c/(g1*g2)) exactly, so the floor is preserved.
fn mul_div(a: u128, b: u128, c: u128) -> Result<u128> {
    if a == 0 || b == 0 {
        return Ok(0);
    }
    let g1 = gcd(a, c);
    let (a1, c1) = (a / g1, c / g1);
    let g2 = gcd(b, c1);
    let (b1, c2) = (b / g2, c1 / g2);

    let product = a1.checked_mul(b1).ok_or(FundMeError::Overflow)?;
    Ok(product / c2)
}
