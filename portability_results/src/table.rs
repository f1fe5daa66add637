//! Platform × application tables.
//!
//! Rows are platforms, columns are applications. Raw measurements are typed
//! once, at ingestion, as [`Measurement`]; efficiency tables are always derived
//! from a [`PerformanceTable`] and never edited in place.

use crate::error::{Error, Result};
#[cfg(feature = "serde_support")]
use rmp_serde::{Deserializer, Serializer};
#[cfg(feature = "serde_support")]
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt::{Display, Formatter};

/// One cell of a performance table.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub enum Measurement {
    Value(f64),
    /// No run on this platform.
    Missing,
}

impl Measurement {
    pub fn value(self) -> Option<f64> {
        match self {
            Measurement::Value(v) => Some(v),
            Measurement::Missing => None,
        }
    }

    /// A value usable as a performance number: strictly positive and finite.
    pub fn valid_value(self) -> Option<f64> {
        match self {
            Measurement::Value(v) if v > 0.0 && v.is_finite() => Some(v),
            _ => None,
        }
    }

    pub fn is_missing(self) -> bool {
        matches!(self, Measurement::Missing)
    }
}

impl From<f64> for Measurement {
    fn from(value: f64) -> Self {
        Measurement::Value(value)
    }
}

impl From<Option<f64>> for Measurement {
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) => Measurement::Value(v),
            None => Measurement::Missing,
        }
    }
}

impl Display for Measurement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Measurement::Value(v) => write!(f, "{}", v),
            Measurement::Missing => write!(f, "-"),
        }
    }
}

fn check_unique(names: &[String], err: fn(String) -> Error) -> Result<()> {
    let mut seen = HashSet::with_capacity(names.len());
    for name in names {
        if !seen.insert(name.as_str()) {
            return Err(err(name.clone()));
        }
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceTable {
    applications: Vec<String>,
    platforms: Vec<String>,
    rows: Vec<Vec<Measurement>>,
}

impl PerformanceTable {
    pub fn new(applications: Vec<String>) -> Result<Self> {
        check_unique(&applications, Error::DuplicateApplication)?;
        Ok(Self {
            applications,
            platforms: Vec::new(),
            rows: Vec::new(),
        })
    }

    pub fn from_rows(
        applications: Vec<String>,
        rows: impl IntoIterator<Item = (String, Vec<Measurement>)>,
    ) -> Result<Self> {
        let mut table = Self::new(applications)?;
        for (platform, cells) in rows {
            table.push_row(platform, cells)?;
        }
        Ok(table)
    }

    pub fn push_row(&mut self, platform: impl Into<String>, cells: Vec<Measurement>) -> Result<()> {
        let platform = platform.into();
        if cells.len() != self.applications.len() {
            return Err(Error::RowShape {
                platform,
                expected: self.applications.len(),
                got: cells.len(),
            });
        }
        if self.platforms.contains(&platform) {
            return Err(Error::DuplicatePlatform(platform));
        }
        self.platforms.push(platform);
        self.rows.push(cells);
        Ok(())
    }

    pub fn applications(&self) -> &[String] {
        &self.applications
    }

    pub fn platforms(&self) -> &[String] {
        &self.platforms
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[Measurement])> {
        self.platforms
            .iter()
            .map(String::as_str)
            .zip(self.rows.iter().map(Vec::as_slice))
    }

    pub fn row(&self, platform: usize) -> &[Measurement] {
        &self.rows[platform]
    }

    pub fn column(&self, application: usize) -> Vec<Measurement> {
        self.rows.iter().map(|r| r[application]).collect()
    }

    pub fn platform_index(&self, platform: &str) -> Option<usize> {
        self.platforms.iter().position(|p| p == platform)
    }

    pub fn application_index(&self, application: &str) -> Option<usize> {
        self.applications.iter().position(|a| a == application)
    }

    pub fn get(&self, platform: &str, application: &str) -> Option<Measurement> {
        let p = self.platform_index(platform)?;
        let a = self.application_index(application)?;
        Some(self.rows[p][a])
    }

    /// Count of non-missing cells per application.
    pub fn counts(&self) -> Vec<usize> {
        (0..self.applications.len())
            .map(|a| self.rows.iter().filter(|r| !r[a].is_missing()).count())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Efficiencies in `[0, 1]`, same shape as the table they were derived from.
///
/// A zero means the application did not run on that platform, or produced an
/// unusable value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde_support", serde(try_from = "RawEfficiencyTable"))]
pub struct EfficiencyTable {
    applications: Vec<String>,
    platforms: Vec<String>,
    rows: Vec<Vec<f64>>,
}

/// Unchecked on-disk form of an [`EfficiencyTable`].
#[cfg(feature = "serde_support")]
#[derive(Deserialize)]
struct RawEfficiencyTable {
    applications: Vec<String>,
    platforms: Vec<String>,
    rows: Vec<Vec<f64>>,
}

#[cfg(feature = "serde_support")]
impl TryFrom<RawEfficiencyTable> for EfficiencyTable {
    type Error = Error;

    fn try_from(raw: RawEfficiencyTable) -> Result<Self> {
        EfficiencyTable::try_from_parts(raw.applications, raw.platforms, raw.rows)
    }
}

impl EfficiencyTable {
    /// Checks that names are unique, that there is one row per platform and
    /// one cell per application in every row.
    pub fn try_from_parts(
        applications: Vec<String>,
        platforms: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self> {
        check_unique(&applications, Error::DuplicateApplication)?;
        check_unique(&platforms, Error::DuplicatePlatform)?;
        if platforms.len() != rows.len() {
            return Err(Error::RowCount {
                expected: platforms.len(),
                got: rows.len(),
            });
        }
        if let Some((platform, row)) = platforms
            .iter()
            .zip(&rows)
            .find(|(_, r)| r.len() != applications.len())
        {
            return Err(Error::RowShape {
                platform: platform.clone(),
                expected: applications.len(),
                got: row.len(),
            });
        }
        Ok(Self {
            applications,
            platforms,
            rows,
        })
    }

    pub(crate) fn from_parts(
        applications: Vec<String>,
        platforms: Vec<String>,
        rows: Vec<Vec<f64>>,
    ) -> Self {
        debug_assert_eq!(platforms.len(), rows.len());
        Self {
            applications,
            platforms,
            rows,
        }
    }

    pub fn applications(&self) -> &[String] {
        &self.applications
    }

    pub fn platforms(&self) -> &[String] {
        &self.platforms
    }

    pub fn row(&self, platform: usize) -> &[f64] {
        &self.rows[platform]
    }

    pub fn column(&self, application: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[application]).collect()
    }

    pub fn column_by_name(&self, application: &str) -> Result<Vec<f64>> {
        let index = self
            .application_index(application)
            .ok_or_else(|| Error::UnknownApplication(application.to_string()))?;
        Ok(self.column(index))
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, Vec<f64>)> {
        self.applications
            .iter()
            .enumerate()
            .map(|(i, name)| (name.as_str(), self.column(i)))
    }

    /// `(platform, efficiency)` pairs of one application, in platform order.
    pub fn platform_efficiencies(&self, application: usize) -> Vec<(&str, f64)> {
        self.platforms
            .iter()
            .map(String::as_str)
            .zip(self.rows.iter().map(|r| r[application]))
            .collect()
    }

    pub fn application_index(&self, application: &str) -> Option<usize> {
        self.applications.iter().position(|a| a == application)
    }

    pub fn platform_index(&self, platform: &str) -> Option<usize> {
        self.platforms.iter().position(|p| p == platform)
    }

    pub fn get(&self, platform: &str, application: &str) -> Option<f64> {
        let p = self.platform_index(platform)?;
        let a = self.application_index(application)?;
        Some(self.rows[p][a])
    }

    /// New table with the application columns in the given order.
    pub fn with_application_order(&self, order: &[usize]) -> Self {
        let applications = order.iter().map(|&i| self.applications[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|r| order.iter().map(|&i| r[i]).collect())
            .collect();
        Self {
            applications,
            platforms: self.platforms.clone(),
            rows,
        }
    }

    /// Every efficiency multiplied by `factor`, e.g. 100 for percentages.
    pub fn scaled(&self, factor: f64) -> Self {
        let rows = self
            .rows
            .iter()
            .map(|r| r.iter().map(|e| e * factor).collect())
            .collect();
        Self {
            applications: self.applications.clone(),
            platforms: self.platforms.clone(),
            rows,
        }
    }

    /// Number of platforms where the application has a zero efficiency.
    pub fn unsupported_count(&self, application: usize) -> usize {
        self.rows.iter().filter(|r| r[application] == 0.0).count()
    }
}

#[cfg(feature = "serde_support")]
impl EfficiencyTable {
    pub const EXTENSION: &'static str = "effs.msgpack";
    pub const EXTENSION_ZSTD: &'static str = "effs.msgpack.zst";

    pub fn read_msgpack(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let buf = std::fs::read(path)?;
        let mut deserializer = Deserializer::new(&buf[..]);
        EfficiencyTable::deserialize(&mut deserializer)
            .map_err(|e| Error::Serialization(format!("{:?}", e)))
    }

    pub fn write_msgpack(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let mut f1 = std::fs::File::create(path)?;
        let mut s = Serializer::new(&mut f1);
        self.serialize(&mut s)
            .map_err(|e| Error::Serialization(format!("{:?}", e)))
    }

    #[cfg(feature = "use_std")]
    pub fn read_msgpack_zstd(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let buf = std::fs::read(path)?;
        let mut decoder = zstd::Decoder::new(&buf[..])?;
        let mut deserializer = Deserializer::new(&mut decoder);
        EfficiencyTable::deserialize(&mut deserializer)
            .map_err(|e| Error::Serialization(format!("{:?}", e)))
    }

    #[cfg(feature = "use_std")]
    pub fn write_msgpack_zstd(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        let f1 = std::fs::File::create(path)?;
        let mut encoder = zstd::Encoder::new(f1, 0)?.auto_finish();
        let mut s = Serializer::new(&mut encoder);
        self.serialize(&mut s)
            .map_err(|e| Error::Serialization(format!("{:?}", e)))
    }
}
