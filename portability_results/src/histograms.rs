use core::ops::{AddAssign, Index};
#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};
use std::iter::zip;

/**********
 * Consts *
 **********/

/// Number of efficiency bins, the "did not run" bin included.
pub const N_BINS: usize = 11;

/// Upper edges of the bins. Each bin counts values at its right edge
/// inclusively; the first bin `[0, ε]` also includes its left edge.
pub const UPPER_EDGES: [f64; N_BINS] = [
    f64::EPSILON,
    0.1,
    0.2,
    0.3,
    0.4,
    0.5,
    0.6,
    0.7,
    0.8,
    0.9,
    1.0,
];

/***********
 * Structs *
 ***********/

#[derive(Debug, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct EfficiencyBin(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct EfficiencyHistogram {
    data: [u32; N_BINS],
}

/***********
 *  Impls  *
 ***********/

/* Bin */
impl EfficiencyBin {
    pub const DID_NOT_RUN: EfficiencyBin = EfficiencyBin(0);
    pub const MAX: EfficiencyBin = EfficiencyBin(N_BINS - 1);

    /// Bin of an efficiency, `None` when outside `[0, 1]` or NaN.
    pub fn of(efficiency: f64) -> Option<Self> {
        if !(efficiency >= 0.0) {
            return None;
        }
        UPPER_EDGES
            .iter()
            .position(|&edge| efficiency <= edge)
            .map(EfficiencyBin)
    }

    pub fn all() -> impl Iterator<Item = EfficiencyBin> {
        (0..N_BINS).map(EfficiencyBin)
    }

    pub fn index(self) -> usize {
        self.0
    }

    pub fn lower_edge(self) -> f64 {
        match self.0 {
            0 => 0.0,
            i => UPPER_EDGES[i - 1],
        }
    }

    pub fn upper_edge(self) -> f64 {
        UPPER_EDGES[self.0]
    }

    /// Axis label, `Did not run` or `(a, b]` with edges rounded to 3 decimals.
    pub fn label(self) -> String {
        match self.0 {
            0 => "Did not run".to_string(),
            _ => format!(
                "({:.1}, {:.1}]",
                round3(self.lower_edge()),
                round3(self.upper_edge())
            ),
        }
    }
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

/* Histogram */
impl EfficiencyHistogram {
    pub fn empty() -> Self {
        Self { data: [0; N_BINS] }
    }

    /// Histogram of one application's efficiencies. Values outside `[0, 1]` are dropped.
    pub fn from_efficiencies<'a>(efficiencies: impl IntoIterator<Item = &'a f64>) -> Self {
        let mut h = Self::empty();
        for &e in efficiencies {
            h.insert(e);
        }
        h
    }

    /// Returns false if the value was dropped.
    pub fn insert(&mut self, efficiency: f64) -> bool {
        match EfficiencyBin::of(efficiency) {
            Some(bin) => {
                self.data[bin.0] += 1;
                true
            }
            None => false,
        }
    }

    pub fn total(&self) -> u64 {
        self.data.iter().map(|&c| c as u64).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (EfficiencyBin, u32)> + '_ {
        zip(EfficiencyBin::all(), self.data.iter().copied())
    }

    /// Share of each bin in percent. All zeros for an empty histogram.
    pub fn percentages(&self) -> [f64; N_BINS] {
        let total = self.total();
        let mut r = [0.0; N_BINS];
        if total == 0 {
            return r;
        }
        for (p, &c) in r.iter_mut().zip(&self.data) {
            *p = c as f64 / total as f64 * 100.0;
        }
        r
    }
}

impl Default for EfficiencyHistogram {
    fn default() -> Self {
        EfficiencyHistogram::empty()
    }
}

impl Index<EfficiencyBin> for EfficiencyHistogram {
    type Output = u32;

    fn index(&self, index: EfficiencyBin) -> &Self::Output {
        &self.data[index.0]
    }
}

impl AddAssign<&Self> for EfficiencyHistogram {
    fn add_assign(&mut self, rhs: &Self) {
        for i in 0..N_BINS {
            self.data[i] += rhs.data[i];
        }
    }
}
