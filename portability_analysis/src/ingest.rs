//! CSV input: performance tables and platform descriptions.
//!
//! A performance CSV has one header row. Its first column names the platforms,
//! every other column is an application. Cells are numbers, empty, or start
//! with the missing-value token (any case).

use crate::error::{AnalysisError, Result};
use portability_results::{Measurement, PerformanceTable};
use std::io::Read;
use std::path::Path;

#[cfg(feature = "serde_support")]
use portability_results::efficiency::{Platform, PlatformSet};
#[cfg(feature = "serde_support")]
use serde::Deserialize;

pub const DEFAULT_MISSING_TOKEN: &str = "X";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvOptions {
    pub missing_token: String,
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            missing_token: DEFAULT_MISSING_TOKEN.to_string(),
        }
    }
}

impl CsvOptions {
    pub fn new(missing_token: impl Into<String>) -> Self {
        Self {
            missing_token: missing_token.into(),
        }
    }

    pub fn is_missing(&self, cell: &str) -> bool {
        let cell = cell.trim();
        cell.is_empty()
            || (!self.missing_token.is_empty()
                && cell
                    .to_lowercase()
                    .starts_with(&self.missing_token.to_lowercase()))
    }

    pub fn parse_cell(&self, cell: &str, line: u64, column: &str) -> Result<Measurement> {
        if self.is_missing(cell) {
            return Ok(Measurement::Missing);
        }
        let cell = cell.trim();
        cell.parse::<f64>()
            .map(Measurement::Value)
            .map_err(|_| AnalysisError::Parse {
                line,
                column: column.to_string(),
                value: cell.to_string(),
            })
    }
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader)
}

pub fn read_performance<R: Read>(reader: R, options: &CsvOptions) -> Result<PerformanceTable> {
    let mut reader = csv_reader(reader);
    let headers = reader.headers()?.clone();
    if headers.len() < 2 {
        return Err(AnalysisError::MissingHeader);
    }
    let applications: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    let mut table = PerformanceTable::new(applications)?;

    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        let Some(platform) = record.get(0) else {
            continue;
        };
        if platform.is_empty() && record.iter().all(str::is_empty) {
            continue;
        }
        let cells = record
            .iter()
            .skip(1)
            .zip(headers.iter().skip(1))
            .map(|(cell, column)| options.parse_cell(cell, line, column))
            .collect::<Result<Vec<Measurement>>>()?;
        table.push_row(platform, cells)?;
    }
    log::debug!(
        "Read {} platforms x {} applications",
        table.platforms().len(),
        table.applications().len()
    );
    Ok(table)
}

pub fn read_performance_file(
    path: impl AsRef<Path>,
    options: &CsvOptions,
) -> Result<PerformanceTable> {
    let file = std::fs::File::open(path)?;
    read_performance(file, options)
}

#[cfg(feature = "serde_support")]
#[derive(Debug, Deserialize)]
struct PlatformRecord {
    #[serde(rename = "Architecture")]
    architecture: String,
    #[serde(rename = "Mem BW")]
    mem_bw: f64,
    #[serde(rename = "Category", default)]
    category: String,
}

/// Reads platform descriptions (`Architecture`, `Mem BW`, `Category` columns).
///
/// Several categories can be given separated by `;`.
#[cfg(feature = "serde_support")]
pub fn read_platforms<R: Read>(reader: R) -> Result<PlatformSet> {
    let mut reader = csv_reader(reader);
    let mut set = PlatformSet::new();
    for record in reader.deserialize() {
        let record: PlatformRecord = record?;
        let categories = record
            .category
            .split(';')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string)
            .collect();
        set.insert(Platform::new(record.architecture, record.mem_bw, categories))?;
    }
    Ok(set)
}

#[cfg(feature = "serde_support")]
pub fn read_platforms_file(path: impl AsRef<Path>) -> Result<PlatformSet> {
    let file = std::fs::File::open(path)?;
    read_platforms(file)
}
