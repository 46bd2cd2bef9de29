//! Shared probability helpers and range checks.

use anyhow::{Context, Result, bail};
use rand::Rng;
use rand_distr::{Bernoulli, Distribution};
use std::{fmt::Debug, ops::RangeBounds};

/// Perform a Bernoulli test which succeeds with probability `prob`.
///
/// `prob = 0` never succeeds and `prob = 1` always does.
///
/// # Errors
/// Returns an error if `prob` lies outside `[0, 1]`.
pub fn draw<R: Rng + ?Sized>(rng: &mut R, prob: f64) -> Result<bool> {
    let dist = Bernoulli::new(prob).with_context(|| format!("invalid probability {prob}"))?;
    Ok(dist.sample(rng))
}

/// Check that `num` lies in `range`.
pub fn check_num<T, R>(num: T, range: R) -> Result<()>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        bail!("number must be in the range {range:?}, but is {num:?}");
    }
    Ok(())
}

/// Check that `prob` is a valid probability (NaN is rejected).
pub fn check_prob(prob: f64) -> Result<()> {
    check_num(prob, 0.0..=1.0)
}
