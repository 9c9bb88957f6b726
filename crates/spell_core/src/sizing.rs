//! Bit length and hash count for a target capacity and false-positive rate.

use crate::errors::{BloomError, Result};
use std::f64::consts::LN_2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sizing {
    pub bit_length: usize,
    pub hash_count: u32,
}

/// `m = ceil(-n ln p / (ln 2)^2)`, never below `n`; `k = max(1, round(m/n * ln 2))`.
pub fn size_for(capacity: u64, false_positive_target: f64) -> Result<Sizing> {
    check_params(capacity, false_positive_target)?;

    let n = capacity as f64;
    let raw = (-(n * false_positive_target.ln()) / (LN_2 * LN_2)).ceil();
    if !raw.is_finite() || raw >= usize::MAX as f64 {
        return Err(BloomError::InvalidParameter(format!(
            "capacity {capacity} at p={false_positive_target} needs more bits than addressable"
        )));
    }
    let bit_length = (raw as usize).max(capacity as usize);

    let k = ((bit_length as f64 / n) * LN_2).round();
    let hash_count = (k as u32).max(1);

    Ok(Sizing { bit_length, hash_count })
}

pub(crate) fn check_params(capacity: u64, false_positive_target: f64) -> Result<()> {
    if capacity == 0 {
        return Err(BloomError::InvalidParameter("capacity must be at least 1".into()));
    }
    if capacity > usize::MAX as u64 {
        return Err(BloomError::InvalidParameter(format!(
            "capacity {capacity} exceeds the platform word size"
        )));
    }
    // NaN fails both comparisons
    if !(false_positive_target > 0.0 && false_positive_target < 1.0) {
        return Err(BloomError::InvalidParameter(format!(
            "false positive probability must be in (0, 1), got {false_positive_target}"
        )));
    }
    Ok(())
}
