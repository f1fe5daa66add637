//! Efficiency cascade: how the performance portability of an application evolves
//! as its worst platforms are dropped one at a time.

use crate::statistics::harmonic_mean;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadePoint<P> {
    pub efficiency: f64,
    /// Harmonic mean of this point and every later (higher) one.
    pub portability: f64,
    pub platform: P,
}

/// Sorts the valid efficiencies ascending and emits, for every position, the
/// harmonic mean of the suffix starting there.
///
/// Entries that are not strictly positive and finite are discarded first. The
/// sort is stable, so equal efficiencies keep their input order.
pub fn efficiency_cascade<P>(entries: impl IntoIterator<Item = (P, f64)>) -> Vec<CascadePoint<P>> {
    let mut valid: Vec<(P, f64)> = entries
        .into_iter()
        .filter(|(_, e)| *e > 0.0 && e.is_finite())
        .collect();
    valid.sort_by(|a, b| a.1.total_cmp(&b.1));
    let effs: Vec<f64> = valid.iter().map(|(_, e)| *e).collect();
    valid
        .into_iter()
        .enumerate()
        .map(|(i, (platform, efficiency))| CascadePoint {
            efficiency,
            portability: harmonic_mean(&effs[i..]),
            platform,
        })
        .collect()
}

/// Plot series of a cascade, indexed by the number of platforms kept.
///
/// Index `k` (1-based) holds the values with the `k` best platforms, so the
/// series read left to right as platforms are added from the best one down.
/// Both series end with a closing `(n, 0.0)` point.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeSeries<P> {
    pub portability: Vec<(usize, f64)>,
    pub efficiency: Vec<(usize, f64)>,
    /// Platforms in the same order as the series.
    pub platforms: Vec<P>,
}

impl<P: Clone> CascadeSeries<P> {
    pub fn new(cascade: &[CascadePoint<P>]) -> Option<Self> {
        if cascade.is_empty() {
            return None;
        }
        let n = cascade.len();
        let mut portability: Vec<(usize, f64)> = cascade
            .iter()
            .rev()
            .enumerate()
            .map(|(i, p)| (i + 1, p.portability))
            .collect();
        portability.push((n, 0.0));
        let mut efficiency: Vec<(usize, f64)> = cascade
            .iter()
            .rev()
            .enumerate()
            .map(|(i, p)| (i + 1, p.efficiency))
            .collect();
        efficiency.push((n, 0.0));
        let platforms = cascade.iter().rev().map(|p| p.platform.clone()).collect();
        Some(Self {
            portability,
            efficiency,
            platforms,
        })
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }
}
