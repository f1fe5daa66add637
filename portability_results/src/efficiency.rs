//! Raw performance numbers to efficiencies.

use crate::error::{Error, Result};
use crate::statistics::harmonic_mean;
use crate::table::{EfficiencyTable, Measurement, PerformanceTable};
use itertools::Itertools;
use std::collections::HashMap;

/// Which direction is better for a raw performance number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// Higher is better (bandwidth, FLOP/s).
    Throughput,
    /// Lower is better (run time).
    #[default]
    Time,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EfficiencyMode {
    /// Relative to the best value of each platform row.
    Application(Orientation),
    /// Cells already hold efficiencies, multiplied by `scaling` (percentages use 0.01).
    Raw { scaling: f64 },
}

impl EfficiencyMode {
    pub const RAW_PERCENT: EfficiencyMode = EfficiencyMode::Raw { scaling: 0.01 };
}

/// Normalizes one comparison row.
///
/// Throughput rows are divided by their maximum, time rows divide their
/// minimum. Extrema only consider valid cells; missing, non-positive and
/// infinite cells map to 0. A row without any valid cell maps to all zeros.
pub fn efficiency_row(row: &[Measurement], orientation: Orientation) -> Vec<f64> {
    let extrema = row
        .iter()
        .filter_map(|m| m.valid_value())
        .minmax_by(|a, b| a.total_cmp(b))
        .into_option();
    let reference = extrema.map(|(min, max)| match orientation {
        Orientation::Throughput => max,
        Orientation::Time => min,
    });
    let Some(reference) = reference else {
        return vec![0.0; row.len()];
    };
    row.iter()
        .map(|m| match m.valid_value() {
            Some(v) => match orientation {
                Orientation::Throughput => v / reference,
                Orientation::Time => reference / v,
            },
            None => 0.0,
        })
        .collect()
}

fn raw_row(row: &[Measurement], scaling: f64) -> Vec<f64> {
    row.iter()
        .map(|m| match m.value() {
            Some(v) if v.is_finite() => v * scaling,
            _ => 0.0,
        })
        .collect()
}

impl EfficiencyTable {
    /// Derives efficiencies from raw measurements, one platform row at a time.
    pub fn from_performance(table: &PerformanceTable, mode: EfficiencyMode) -> Self {
        let rows = table
            .rows()
            .map(|(_platform, row)| match mode {
                EfficiencyMode::Application(orientation) => efficiency_row(row, orientation),
                EfficiencyMode::Raw { scaling } => raw_row(row, scaling),
            })
            .collect();
        EfficiencyTable::from_parts(
            table.applications().to_vec(),
            table.platforms().to_vec(),
            rows,
        )
    }
}

/// Platform metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Platform {
    pub name: String,
    /// Architectural peak bandwidth or throughput.
    pub arch_bw: f64,
    pub categories: Vec<String>,
    /// Best observed value across applications, once known.
    pub best_bw: Option<f64>,
}

impl Platform {
    pub fn new(name: impl Into<String>, arch_bw: f64, categories: Vec<String>) -> Self {
        Self {
            name: name.into(),
            arch_bw,
            categories,
            best_bw: None,
        }
    }

    pub fn arch_efficiency(&self, perf: f64, orientation: Orientation) -> f64 {
        match orientation {
            Orientation::Throughput => perf / self.arch_bw,
            Orientation::Time => self.arch_bw / perf,
        }
    }

    /// Efficiency relative to the best application on this platform, if known.
    pub fn app_efficiency(&self, perf: f64, orientation: Orientation) -> Option<f64> {
        let best = self.best_bw?;
        Some(match orientation {
            Orientation::Throughput => perf / best,
            Orientation::Time => best / perf,
        })
    }
}

/// Reference for an efficiency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    Architectural,
    Application,
}

/// The platforms of one input load.
#[derive(Debug, Clone, Default)]
pub struct PlatformSet {
    platforms: HashMap<String, Platform>,
}

impl PlatformSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, platform: Platform) -> Result<()> {
        if self.platforms.contains_key(&platform.name) {
            return Err(Error::DuplicatePlatform(platform.name));
        }
        self.platforms.insert(platform.name.clone(), platform);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&Platform> {
        self.platforms.get(name)
    }

    pub fn len(&self) -> usize {
        self.platforms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.platforms.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.platforms.keys().map(String::as_str)
    }

    /// Fills in `best_bw` from the table and drops platforms without a usable best value.
    ///
    /// Platforms unknown to the table are dropped as well.
    pub fn resolve_best(&mut self, table: &PerformanceTable, orientation: Orientation) {
        self.platforms.retain(|name, platform| {
            let best = table.platform_index(name).and_then(|i| {
                let valid = table.row(i).iter().filter_map(|m| m.valid_value());
                match orientation {
                    Orientation::Throughput => valid.reduce(f64::max),
                    Orientation::Time => valid.reduce(f64::min),
                }
            });
            platform.best_bw = best;
            if best.is_none() {
                log::warn!("Dropping platform {} without a usable result", name);
            }
            best.is_some()
        });
    }

    /// Platforms named by the table rows, with unit peak, resolved against the table.
    pub fn from_table(table: &PerformanceTable, orientation: Orientation) -> Self {
        let mut set = PlatformSet::new();
        for name in table.platforms() {
            set.platforms
                .insert(name.clone(), Platform::new(name.clone(), 1.0, Vec::new()));
        }
        set.resolve_best(table, orientation);
        set
    }
}

impl EfficiencyTable {
    /// Efficiencies against platform metadata instead of the table rows.
    ///
    /// Rows of platforms absent from `platforms`, and cells without a usable
    /// measurement, are zero.
    pub fn with_basis(
        table: &PerformanceTable,
        platforms: &PlatformSet,
        basis: Basis,
        orientation: Orientation,
    ) -> Self {
        let rows = table
            .rows()
            .map(|(name, row)| {
                let Some(platform) = platforms.get(name) else {
                    log::warn!("No metadata for platform {}, its efficiencies are zero", name);
                    return vec![0.0; row.len()];
                };
                row.iter()
                    .map(|m| {
                        m.valid_value()
                            .and_then(|perf| match basis {
                                Basis::Architectural => {
                                    Some(platform.arch_efficiency(perf, orientation))
                                }
                                Basis::Application => platform.app_efficiency(perf, orientation),
                            })
                            .unwrap_or(0.0)
                    })
                    .collect()
            })
            .collect();
        EfficiencyTable::from_parts(
            table.applications().to_vec(),
            table.platforms().to_vec(),
            rows,
        )
    }
}

/// Performance portability of one application over a platform subset.
///
/// Zero when the application has no usable measurement on one of the platforms,
/// or when a platform is not part of `platforms`.
pub fn application_pp(
    table: &PerformanceTable,
    platforms: &PlatformSet,
    application: &str,
    subset: &[&str],
    basis: Basis,
    orientation: Orientation,
) -> Result<f64> {
    let app = table
        .application_index(application)
        .ok_or_else(|| Error::UnknownApplication(application.to_string()))?;
    let mut effs = Vec::with_capacity(subset.len());
    for name in subset {
        let (Some(platform), Some(row)) = (platforms.get(name), table.platform_index(name)) else {
            return Ok(0.0);
        };
        let Some(perf) = table.row(row)[app].valid_value() else {
            return Ok(0.0);
        };
        let eff = match basis {
            Basis::Architectural => platform.arch_efficiency(perf, orientation),
            Basis::Application => match platform.app_efficiency(perf, orientation) {
                Some(e) => e,
                None => return Ok(0.0),
            },
        };
        effs.push(eff);
    }
    Ok(harmonic_mean(&effs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(v: &[f64]) -> Vec<Measurement> {
        v.iter().map(|&x| Measurement::Value(x)).collect()
    }

    #[test]
    fn time_row() {
        assert_eq!(
            efficiency_row(&row(&[10., 20., 40.]), Orientation::Time),
            vec![1.0, 0.5, 0.25]
        );
    }

    #[test]
    fn throughput_row() {
        assert_eq!(
            efficiency_row(&row(&[10., 20., 40.]), Orientation::Throughput),
            vec![0.25, 0.5, 1.0]
        );
    }

    #[test]
    fn invalid_cells_are_zero() {
        let r = vec![
            Measurement::Value(10.0),
            Measurement::Missing,
            Measurement::Value(0.0),
            Measurement::Value(f64::INFINITY),
            Measurement::Value(-3.0),
            Measurement::Value(5.0),
        ];
        assert_eq!(
            efficiency_row(&r, Orientation::Time),
            vec![0.5, 0.0, 0.0, 0.0, 0.0, 1.0]
        );
        assert_eq!(
            efficiency_row(&r, Orientation::Throughput),
            vec![1.0, 0.0, 0.0, 0.0, 0.0, 0.5]
        );
    }

    #[test]
    fn all_missing_row() {
        let r = vec![Measurement::Missing; 4];
        assert_eq!(efficiency_row(&r, Orientation::Time), vec![0.0; 4]);
        assert_eq!(efficiency_row(&[], Orientation::Throughput), Vec::<f64>::new());
    }

    fn table() -> PerformanceTable {
        PerformanceTable::from_rows(
            vec!["a".into(), "b".into()],
            vec![
                ("p0".to_string(), row(&[2.0, 4.0])),
                ("p1".to_string(), vec![Measurement::Missing, 3.0.into()]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn table_transform() {
        let effs = EfficiencyTable::from_performance(&table(), EfficiencyMode::Application(Orientation::Time));
        assert_eq!(effs.row(0), &[1.0, 0.5]);
        assert_eq!(effs.row(1), &[0.0, 1.0]);

        let raw = EfficiencyTable::from_performance(&table(), EfficiencyMode::RAW_PERCENT);
        approx::assert_relative_eq!(raw.row(0)[0], 0.02);
        approx::assert_relative_eq!(raw.row(0)[1], 0.04);
        assert_eq!(raw.row(1)[0], 0.0);
        approx::assert_relative_eq!(raw.row(1)[1], 0.03);
    }

    #[test]
    fn platform_set_best() {
        let mut set = PlatformSet::new();
        set.insert(Platform::new("p0", 8.0, vec!["CPU".into()])).unwrap();
        set.insert(Platform::new("p1", 16.0, vec!["GPU".into()])).unwrap();
        set.insert(Platform::new("p2", 16.0, vec![])).unwrap();
        assert!(set.insert(Platform::new("p0", 1.0, vec![])).is_err());
        set.resolve_best(&table(), Orientation::Throughput);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("p0").unwrap().best_bw, Some(4.0));
        assert_eq!(set.get("p1").unwrap().best_bw, Some(3.0));
        assert!(set.get("p2").is_none());
    }

    #[test]
    fn platform_set_from_rows() {
        let t = table();
        let set = PlatformSet::from_table(&t, Orientation::Time);
        assert_eq!(set.len(), 2);
        assert_eq!(set.get("p0").unwrap().best_bw, Some(2.0));
        assert_eq!(set.get("p1").unwrap().best_bw, Some(3.0));
        // per-platform bests reproduce the row transform
        let effs = EfficiencyTable::with_basis(&t, &set, Basis::Application, Orientation::Time);
        assert_eq!(
            effs,
            EfficiencyTable::from_performance(&t, EfficiencyMode::Application(Orientation::Time))
        );

        let t = PerformanceTable::from_rows(
            vec!["a".into()],
            vec![
                ("p0".to_string(), row(&[5.0])),
                ("p1".to_string(), vec![Measurement::Missing]),
            ],
        )
        .unwrap();
        let set = PlatformSet::from_table(&t, Orientation::Throughput);
        assert_eq!(set.names().collect::<Vec<_>>(), vec!["p0"]);
    }

    #[test]
    fn pp_over_subsets() {
        let t = table();
        let mut set = PlatformSet::new();
        set.insert(Platform::new("p0", 8.0, vec![])).unwrap();
        set.insert(Platform::new("p1", 6.0, vec![])).unwrap();
        set.resolve_best(&t, Orientation::Throughput);

        let pp = application_pp(&t, &set, "b", &["p0", "p1"], Basis::Application, Orientation::Throughput)
            .unwrap();
        assert!((pp - 1.0).abs() < 1e-12);
        let pp = application_pp(&t, &set, "b", &["p0", "p1"], Basis::Architectural, Orientation::Throughput)
            .unwrap();
        assert!((pp - 0.5).abs() < 1e-12);
        // a did not run on p1
        let pp = application_pp(&t, &set, "a", &["p0", "p1"], Basis::Application, Orientation::Throughput)
            .unwrap();
        assert_eq!(pp, 0.0);
        let pp = application_pp(&t, &set, "a", &["p0", "p9"], Basis::Application, Orientation::Throughput)
            .unwrap();
        assert_eq!(pp, 0.0);
        assert!(application_pp(&t, &set, "z", &["p0"], Basis::Application, Orientation::Time).is_err());
    }

    #[test]
    fn architectural_table() {
        let t = table();
        let mut set = PlatformSet::new();
        set.insert(Platform::new("p0", 8.0, vec![])).unwrap();
        let effs = EfficiencyTable::with_basis(&t, &set, Basis::Architectural, Orientation::Throughput);
        assert_eq!(effs.row(0), &[0.25, 0.5]);
        // no metadata for p1
        assert_eq!(effs.row(1), &[0.0, 0.0]);

        set.resolve_best(&t, Orientation::Throughput);
        let effs = EfficiencyTable::with_basis(&t, &set, Basis::Application, Orientation::Throughput);
        assert_eq!(effs.row(0), &[0.5, 1.0]);
    }

    proptest! {
        #[test]
        fn throughput_in_unit_interval(v in prop::collection::vec(1e-3f64..1e6, 1..20)) {
            let effs = efficiency_row(&row(&v), Orientation::Throughput);
            let max = v.iter().cloned().fold(f64::MIN, f64::max);
            for (e, x) in effs.iter().zip(v.iter()) {
                prop_assert!(*e > 0.0 && *e <= 1.0);
                if *x == max {
                    prop_assert_eq!(*e, 1.0);
                }
            }
        }

        #[test]
        fn time_in_unit_interval(v in prop::collection::vec(1e-3f64..1e6, 1..20)) {
            let effs = efficiency_row(&row(&v), Orientation::Time);
            let min = v.iter().cloned().fold(f64::MAX, f64::min);
            for (e, x) in effs.iter().zip(v.iter()) {
                prop_assert!(*e > 0.0 && *e <= 1.0);
                if *x == min {
                    prop_assert_eq!(*e, 1.0);
                }
            }
        }
    }
}
