//! Per-application summaries of an efficiency table.

use crate::error::Result;
use crate::statistics::{self, HarmonicStdev};
use crate::table::EfficiencyTable;
#[cfg(feature = "use_std")]
use rayon::prelude::*;
#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};

/// A statistic evaluated over the platform efficiencies of one application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub enum Statistic {
    Minimum,
    ArithmeticMean,
    GeometricMean,
    GeometricStdev,
    /// NaN when a zero is present, to tell it apart from the portability.
    HarmonicMean,
    Median,
    PpMedian,
    PerformancePortability,
    StandardDeviation,
    Variance,
    HarmonicStdevMartinez,
    HarmonicStdevLam,
    MedianAbsoluteDeviation,
    Range,
}

impl Statistic {
    pub const AVERAGES: [Statistic; 6] = [
        Statistic::Minimum,
        Statistic::ArithmeticMean,
        Statistic::GeometricMean,
        Statistic::HarmonicMean,
        Statistic::Median,
        Statistic::PerformancePortability,
    ];

    pub const CONSISTENCY: [Statistic; 5] = [
        Statistic::StandardDeviation,
        Statistic::HarmonicStdevMartinez,
        Statistic::HarmonicStdevLam,
        Statistic::MedianAbsoluteDeviation,
        Statistic::Range,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Statistic::Minimum => "Minimum",
            Statistic::ArithmeticMean => "Arithmetic Mean",
            Statistic::GeometricMean => "Geometric Mean",
            Statistic::GeometricStdev => "Geometric Standard Deviation",
            Statistic::HarmonicMean => "Harmonic Mean",
            Statistic::Median => "Median",
            Statistic::PpMedian => "Performance Portability (Median)",
            Statistic::PerformancePortability => "Performance Portability",
            Statistic::StandardDeviation => "Standard Deviation",
            Statistic::Variance => "Variance",
            Statistic::HarmonicStdevMartinez => "Harmonic Standard Deviation (Martinez)",
            Statistic::HarmonicStdevLam => "Harmonic Standard Deviation (Lam)",
            Statistic::MedianAbsoluteDeviation => "Median Absolute Deviation",
            Statistic::Range => "Range",
        }
    }

    pub fn evaluate(self, values: &[f64]) -> Result<f64> {
        match self {
            Statistic::Minimum => statistics::minimum(values),
            Statistic::ArithmeticMean => statistics::arithmetic_mean(values),
            Statistic::GeometricMean => statistics::geometric_mean(values),
            Statistic::GeometricStdev => statistics::geometric_stdev(values),
            Statistic::HarmonicMean => {
                if values.contains(&0.0) {
                    Ok(f64::NAN)
                } else {
                    Ok(statistics::harmonic_mean(values))
                }
            }
            Statistic::Median => statistics::median(values),
            Statistic::PpMedian => statistics::pp_median(values),
            Statistic::PerformancePortability => Ok(statistics::performance_portability(values)),
            Statistic::StandardDeviation => statistics::stdev(values),
            Statistic::Variance => statistics::variance(values),
            Statistic::HarmonicStdevMartinez => {
                statistics::harmonic_stdev(values, HarmonicStdev::Martinez)
            }
            Statistic::HarmonicStdevLam => statistics::harmonic_stdev(values, HarmonicStdev::Lam),
            Statistic::MedianAbsoluteDeviation => statistics::median_absolute_deviation(values),
            Statistic::Range => statistics::range(values),
        }
    }

    /// Like [`Statistic::evaluate`], with undefined results reported as NaN.
    pub fn evaluate_or_nan(self, values: &[f64]) -> f64 {
        match self.evaluate(values) {
            Ok(v) => v,
            Err(e) => {
                log::debug!("{} undefined: {}", self.name(), e);
                f64::NAN
            }
        }
    }
}

/// Statistics (rows) by application (columns).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub struct SummaryTable {
    pub statistics: Vec<Statistic>,
    pub applications: Vec<String>,
    /// `values[s][a]`: statistic `s` of application `a`.
    pub values: Vec<Vec<f64>>,
}

fn evaluate_column(column: &[f64], statistics: &[Statistic]) -> Vec<f64> {
    statistics.iter().map(|s| s.evaluate_or_nan(column)).collect()
}

impl SummaryTable {
    pub fn new(table: &EfficiencyTable, statistics: &[Statistic]) -> Self {
        let n = table.applications().len();
        #[cfg(feature = "use_std")]
        let by_application: Vec<Vec<f64>> = (0..n)
            .into_par_iter()
            .map(|a| evaluate_column(&table.column(a), statistics))
            .collect();
        #[cfg(not(feature = "use_std"))]
        let by_application: Vec<Vec<f64>> = (0..n)
            .map(|a| evaluate_column(&table.column(a), statistics))
            .collect();

        let values = (0..statistics.len())
            .map(|s| by_application.iter().map(|col| col[s]).collect())
            .collect();
        Self {
            statistics: statistics.to_vec(),
            applications: table.applications().to_vec(),
            values,
        }
    }

    pub fn averages(table: &EfficiencyTable) -> Self {
        Self::new(table, &Statistic::AVERAGES)
    }

    pub fn consistency(table: &EfficiencyTable) -> Self {
        Self::new(table, &Statistic::CONSISTENCY)
    }

    pub fn get(&self, statistic: Statistic, application: &str) -> Option<f64> {
        let s = self.statistics.iter().position(|&x| x == statistic)?;
        let a = self.applications.iter().position(|x| x == application)?;
        Some(self.values[s][a])
    }

    pub fn row(&self, statistic: Statistic) -> Option<&[f64]> {
        let s = self.statistics.iter().position(|&x| x == statistic)?;
        Some(&self.values[s])
    }

    /// Reorders the application columns.
    pub fn reorder(&mut self, order: &[usize]) {
        self.applications = order.iter().map(|&i| self.applications[i].clone()).collect();
        for row in self.values.iter_mut() {
            *row = order.iter().map(|&i| row[i]).collect();
        }
    }

    /// Sorts columns by ascending performance portability of the source table.
    pub fn sort_by_portability(&mut self, table: &EfficiencyTable) {
        let order = table.portability_order();
        let names: Vec<&String> = order.iter().map(|&i| &table.applications()[i]).collect();
        let order: Vec<usize> = names
            .iter()
            .filter_map(|n| self.applications.iter().position(|a| a == *n))
            .collect();
        self.reorder(&order);
    }
}

impl EfficiencyTable {
    /// Application indices by ascending performance portability.
    pub fn portability_order(&self) -> Vec<usize> {
        let pp: Vec<f64> = self
            .columns()
            .map(|(_, c)| statistics::performance_portability(&c))
            .collect();
        let mut order: Vec<usize> = (0..pp.len()).collect();
        order.sort_by(|&a, &b| pp[a].total_cmp(&pp[b]));
        order
    }

    /// Application indices ranked by unsupported platform count (most first),
    /// then by ascending harmonic mean.
    pub fn ranking(&self) -> Vec<usize> {
        let key: Vec<(usize, f64)> = (0..self.applications().len())
            .map(|a| {
                (
                    self.unsupported_count(a),
                    statistics::harmonic_mean(&self.column(a)),
                )
            })
            .collect();
        let mut order: Vec<usize> = (0..key.len()).collect();
        order.sort_by(|&a, &b| {
            key[b]
                .0
                .cmp(&key[a].0)
                .then_with(|| key[a].1.total_cmp(&key[b].1))
        });
        order
    }

    pub fn ranked(&self) -> Self {
        self.with_application_order(&self.ranking())
    }
}

/// Statistic per application as platforms are removed one by one.
#[derive(Debug, Clone, PartialEq)]
pub struct SubsetSeries {
    pub statistic: Statistic,
    pub applications: Vec<String>,
    /// `(platforms kept, value per application)`, starting with every platform.
    pub points: Vec<(usize, Vec<f64>)>,
}

impl SubsetSeries {
    /// Names in `removal_order` that are not in the table are skipped.
    pub fn new(table: &EfficiencyTable, removal_order: &[&str], statistic: Statistic) -> Self {
        let mut kept: Vec<usize> = (0..table.platforms().len()).collect();
        let evaluate = |kept: &[usize]| -> Vec<f64> {
            (0..table.applications().len())
                .map(|a| {
                    let values: Vec<f64> = kept.iter().map(|&p| table.row(p)[a]).collect();
                    statistic.evaluate_or_nan(&values)
                })
                .collect()
        };
        let mut points = vec![(kept.len(), evaluate(&kept))];
        for name in removal_order {
            let Some(p) = table.platform_index(name) else {
                log::debug!("Platform {} not in table, not removed", name);
                continue;
            };
            let Some(pos) = kept.iter().position(|&k| k == p) else {
                continue;
            };
            kept.remove(pos);
            points.push((kept.len(), evaluate(&kept)));
        }
        Self {
            statistic,
            applications: table.applications().to_vec(),
            points,
        }
    }
}
