//! Aggregate statistics over efficiency values.
//!
//! Zero handling is part of each statistic's contract: the harmonic mean and
//! the performance portability map any zero to 0 (a platform without a result
//! zeroes the aggregate), the harmonic standard deviations map any zero to NaN.

use crate::error::{Error, Result};
use std::cmp::Ordering;

fn require(statistic: &'static str, values: &[f64], needed: usize) -> Result<()> {
    if values.len() < needed {
        Err(Error::TooFewValues {
            statistic,
            needed,
            got: values.len(),
        })
    } else {
        Ok(())
    }
}

fn contains_zero(values: &[f64]) -> bool {
    values.iter().any(|&x| x == 0.0)
}

fn sorted(values: &[f64]) -> Vec<f64> {
    let mut v = values.to_vec();
    v.sort_by(f64::total_cmp);
    v
}

/// `N / Σ(1/x)`, or 0 if any value is 0 or there are no values.
pub fn harmonic_mean(values: &[f64]) -> f64 {
    if values.is_empty() || contains_zero(values) {
        return 0.0;
    }
    let s: f64 = values.iter().map(|x| 1.0 / x).sum();
    values.len() as f64 / s
}

/// Performance portability: the harmonic mean of efficiencies over a platform set.
pub fn performance_portability(values: &[f64]) -> f64 {
    harmonic_mean(values)
}

pub fn arithmetic_mean(values: &[f64]) -> Result<f64> {
    require("arithmetic mean", values, 1)?;
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// `(Π x)^(1/N)`.
pub fn geometric_mean(values: &[f64]) -> Result<f64> {
    require("geometric mean", values, 1)?;
    let product: f64 = values.iter().product();
    Ok(product.powf(1.0 / values.len() as f64))
}

/// `exp(sqrt(mean(ln(x/g)²)))`, 0 when the geometric mean is 0.
pub fn geometric_stdev(values: &[f64]) -> Result<f64> {
    let g = geometric_mean(values)?;
    if g == 0.0 {
        return Ok(0.0);
    }
    let s: f64 = values.iter().map(|x| (x / g).ln().powi(2)).sum();
    Ok((s / values.len() as f64).sqrt().exp())
}

pub fn minimum(values: &[f64]) -> Result<f64> {
    require("minimum", values, 1)?;
    Ok(values.iter().copied().fold(f64::INFINITY, f64::min))
}

pub fn maximum(values: &[f64]) -> Result<f64> {
    require("maximum", values, 1)?;
    Ok(values.iter().copied().fold(f64::NEG_INFINITY, f64::max))
}

/// Middle value, mean of the two middle values for even counts.
pub fn median(values: &[f64]) -> Result<f64> {
    require("median", values, 1)?;
    let v = sorted(values);
    let n = v.len();
    if n % 2 == 1 {
        Ok(v[n / 2])
    } else {
        Ok((v[n / 2 - 1] + v[n / 2]) / 2.0)
    }
}

/// Median, with the same zero dominance as the performance portability.
pub fn pp_median(values: &[f64]) -> Result<f64> {
    require("median", values, 1)?;
    if contains_zero(values) {
        return Ok(0.0);
    }
    median(values)
}

/// Sample variance.
pub fn variance(values: &[f64]) -> Result<f64> {
    require("variance", values, 2)?;
    let mean = arithmetic_mean(values)?;
    let ss: f64 = values.iter().map(|x| (x - mean).powi(2)).sum();
    Ok(ss / (values.len() - 1) as f64)
}

/// Sample standard deviation.
pub fn stdev(values: &[f64]) -> Result<f64> {
    Ok(variance(values)?.sqrt())
}

pub fn range(values: &[f64]) -> Result<f64> {
    Ok(maximum(values)? - minimum(values)?)
}

pub fn median_absolute_deviation(values: &[f64]) -> Result<f64> {
    let m = median(values)?;
    let deviations: Vec<f64> = values.iter().map(|x| (x - m).abs()).collect();
    median(&deviations)
}

/// Published definitions of the harmonic standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarmonicStdev {
    /// Martinez & Bartholomew (2017), as used by Bertoni et al. (2020):
    /// `h² · sqrt(Σ(1/xᵢ − 1/h)² / (n−1))`.
    Martinez,
    /// Lam et al. (1985): jackknife over the leave-one-out harmonic means.
    Lam,
}

/// Harmonic standard deviation, NaN if any value is 0.
pub fn harmonic_stdev(values: &[f64], method: HarmonicStdev) -> Result<f64> {
    require("harmonic standard deviation", values, 2)?;
    if contains_zero(values) {
        return Ok(f64::NAN);
    }
    let n = values.len() as f64;
    match method {
        HarmonicStdev::Martinez => {
            let h = harmonic_mean(values);
            let s: f64 = values
                .iter()
                .map(|x| (1.0 / x - 1.0 / h).powi(2) / (n - 1.0))
                .sum();
            Ok(h.powi(2) * s.sqrt())
        }
        HarmonicStdev::Lam => {
            let leave_one_out: Vec<f64> = (0..values.len())
                .map(|i| {
                    let s: f64 = values
                        .iter()
                        .enumerate()
                        .filter(|&(c, _)| c != i)
                        .map(|(_, v)| 1.0 / v)
                        .sum();
                    (n - 1.0) / s
                })
                .collect();
            let mean = leave_one_out.iter().sum::<f64>() / n;
            let s: f64 = leave_one_out.iter().map(|h| (h - mean).powf(2.0)).sum();
            Ok(((n - 1.0) * s).sqrt())
        }
    }
}

/// Quantile of sorted data, linear interpolation between order statistics.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Result<f64> {
    require("quantile", sorted, 1)?;
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    let frac = pos - lower as f64;
    Ok(sorted[lower] + (sorted[upper] - sorted[lower]) * frac)
}

/// Box plot summary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FiveNumberSummary {
    pub min: f64,
    pub q1: f64,
    pub median: f64,
    pub q3: f64,
    pub max: f64,
}

impl FiveNumberSummary {
    pub fn new(values: &[f64]) -> Result<Self> {
        let v = sorted(values);
        Ok(Self {
            min: quantile_sorted(&v, 0.0)?,
            q1: quantile_sorted(&v, 0.25)?,
            median: quantile_sorted(&v, 0.5)?,
            q3: quantile_sorted(&v, 0.75)?,
            max: quantile_sorted(&v, 1.0)?,
        })
    }

    pub fn iqr(&self) -> f64 {
        self.q3 - self.q1
    }
}

/// Orders NaN after every number, so undefined statistics sort last.
pub fn nan_last(a: &f64, b: &f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => a.total_cmp(b),
    }
}
