#![deny(unsafe_op_in_unsafe_fn)]

pub mod error;
pub mod ingest;
pub mod latex;
pub mod plots;

use crate::error::Result;
use crate::ingest::{CsvOptions, read_performance_file};
use crate::plots::{
    HeatmapCells, HeatmapOptions, OutputLocation, binned_picture, box_picture, cascade_picture,
    density_picture, heatmap_picture, violin_picture, write_picture,
};
use clap::ValueEnum;
use portability_results::akde::AkdeConfig;
use portability_results::efficiency::{Basis, PlatformSet};
use portability_results::summary::{Statistic, SubsetSeries, SummaryTable};
use portability_results::{EfficiencyMode, EfficiencyTable, Orientation, PerformanceTable};
use std::path::{Path, PathBuf};

/// Figures `pp_vis` can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Visualization {
    /// Box and whiskers chart
    Box,
    /// Binned efficiency chart
    Bins,
    /// Efficiency cascade
    Casc,
    /// Estimated density chart
    Epdf,
    /// Violin plot of efficiencies
    Violin,
    /// Heatmap of efficiencies in percent
    Heat,
}

impl Visualization {
    pub fn suffix(self) -> &'static str {
        match self {
            Visualization::Box => "_box_chart",
            Visualization::Bins => "_binned_chart",
            Visualization::Casc => "_eff_cascade",
            Visualization::Epdf => "_estimated_density_chart",
            Visualization::Violin => "_violin_chart",
            Visualization::Heat => "_heatmap",
        }
    }
}

/// Drops repeated entries, keeping the first occurrence.
pub fn dedup_visualizations(requested: &[Visualization]) -> Vec<Visualization> {
    let mut out: Vec<Visualization> = Vec::with_capacity(requested.len());
    for &v in requested {
        if out.contains(&v) {
            log::warn!("Duplicate visualization type {:?}, skipping", v);
        } else {
            out.push(v);
        }
    }
    out
}

#[derive(Debug, Clone)]
pub struct VisOptions {
    pub mode: EfficiencyMode,
    pub output_prefix: String,
    pub visualizations: Vec<Visualization>,
    pub pdf: bool,
    pub log_density: bool,
    pub csv: CsvOptions,
    pub akde: AkdeConfig,
    pub save_efficiencies: bool,
}

/// Efficiencies of one input, columns ranked for display.
pub fn load_efficiencies(
    path: impl AsRef<Path>,
    mode: EfficiencyMode,
    csv: &CsvOptions,
) -> Result<EfficiencyTable> {
    let table = read_performance_file(path, csv)?;
    Ok(EfficiencyTable::from_performance(&table, mode).ranked())
}

/// Produces every requested figure for one input file. Returns the files written.
pub fn run_visualizations(input: &Path, options: &VisOptions) -> Result<Vec<PathBuf>> {
    let effs = load_efficiencies(input, options.mode, &options.csv)?;
    log::info!(
        "{}: {} platforms, {} applications",
        input.display(),
        effs.platforms().len(),
        effs.applications().len()
    );
    let location = OutputLocation::new(&options.output_prefix, input);
    let mut written = Vec::new();

    #[cfg(all(feature = "serde_support", feature = "use_std"))]
    if options.save_efficiencies {
        std::fs::create_dir_all(&location.folder)?;
        let path = location
            .folder
            .join(format!("{}.{}", location.prefix, EfficiencyTable::EXTENSION_ZSTD));
        effs.write_msgpack_zstd(&path)?;
        log::info!("Wrote {}", path.display());
        written.push(path);
    }
    #[cfg(not(all(feature = "serde_support", feature = "use_std")))]
    if options.save_efficiencies {
        log::warn!("Built without serde_support and use_std, efficiencies not saved");
    }

    for &vis in &options.visualizations {
        let picture = match vis {
            Visualization::Box => box_picture(&effs),
            Visualization::Bins => binned_picture(&effs),
            Visualization::Casc => cascade_picture(&effs),
            Visualization::Epdf => density_picture(&effs, &options.akde, options.log_density),
            Visualization::Violin => violin_picture(&effs, &options.akde),
            Visualization::Heat => heatmap_picture(
                &HeatmapCells::from_efficiencies(&effs),
                &HeatmapOptions {
                    higher_is_better: true,
                    factor: 1.0,
                    percent: true,
                },
            ),
        };
        written.push(write_picture(&picture, &location, vis.suffix(), options.pdf)?);
    }
    Ok(written)
}

#[derive(Debug, Clone)]
pub struct TableOptions {
    pub calc_efficiency: bool,
    pub orientation: Orientation,
    pub sort: bool,
    pub consistency: bool,
    pub csv: CsvOptions,
    /// Architectural efficiencies against these platforms instead.
    pub platforms: Option<PlatformSet>,
}

/// Efficiencies in percent, as the summary tables report them.
pub fn table_efficiencies(table: &PerformanceTable, options: &TableOptions) -> EfficiencyTable {
    if let Some(platforms) = &options.platforms {
        log::info!("Calculating architectural efficiency...");
        EfficiencyTable::with_basis(table, platforms, Basis::Architectural, options.orientation)
            .scaled(100.0)
    } else if options.calc_efficiency {
        log::info!("Calculating application efficiency...");
        EfficiencyTable::from_performance(table, EfficiencyMode::Application(options.orientation))
            .scaled(100.0)
    } else {
        log::warn!("Using input data as efficiencies");
        EfficiencyTable::from_performance(table, EfficiencyMode::Raw { scaling: 1.0 })
    }
}

pub fn summary_table(effs: &EfficiencyTable, options: &TableOptions) -> SummaryTable {
    let mut summary = if options.consistency {
        SummaryTable::consistency(effs)
    } else {
        SummaryTable::averages(effs)
    };
    if options.sort {
        summary.sort_by_portability(effs);
    }
    summary
}

/// Reads `input`, writes the summary tabular to `output`. Returns the efficiencies
/// and their summary.
pub fn run_table(
    input: &Path,
    output: &Path,
    options: &TableOptions,
) -> Result<(EfficiencyTable, SummaryTable)> {
    let table = read_performance_file(input, &options.csv)?;
    log::info!("Input file: {}", input.display());
    for (application, count) in table.applications().iter().zip(table.counts()) {
        log::info!("{}: {} data items", application, count);
    }
    let effs = table_efficiencies(&table, options);
    let summary = summary_table(&effs, options);
    std::fs::write(output, latex::summary_tabular(&summary))?;
    log::info!("Wrote {}", output.display());
    Ok((effs, summary))
}

/// Heatmap of the raw measurements of `input`, written as `output` (`.tex`, or
/// `.pdf` when `pdf` is set). Returns the file written.
pub fn run_heatmap(
    input: &Path,
    output: &Path,
    options: &HeatmapOptions,
    csv: &CsvOptions,
    pdf: bool,
) -> Result<PathBuf> {
    let table = read_performance_file(input, csv)?;
    let cells = HeatmapCells::from_performance(&table);
    log::info!(
        "{}: {} of {} platforms with results",
        input.display(),
        cells.rows.len(),
        table.platforms().len()
    );
    let location = OutputLocation {
        folder: match output.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        },
        prefix: output
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    write_picture(&heatmap_picture(&cells, options), &location, "", pdf)
}

/// Statistics reported for platform-subset series.
pub const SUBSET_STATISTICS: [Statistic; 11] = [
    Statistic::Minimum,
    Statistic::ArithmeticMean,
    Statistic::StandardDeviation,
    Statistic::Variance,
    Statistic::GeometricMean,
    Statistic::GeometricStdev,
    Statistic::HarmonicMean,
    Statistic::PerformancePortability,
    Statistic::Median,
    Statistic::MedianAbsoluteDeviation,
    Statistic::PpMedian,
];

/// One CSV block per statistic: a header, then `platforms, value per application`.
pub fn subset_series_csv(effs: &EfficiencyTable, removal_order: &[&str]) -> String {
    let mut out = String::new();
    for statistic in SUBSET_STATISTICS {
        let series = SubsetSeries::new(effs, removal_order, statistic);
        out.push_str(&format!(
            "{}, {}\n",
            statistic.name(),
            series.applications.join(", ")
        ));
        for (kept, values) in &series.points {
            let values: Vec<String> = values.iter().map(|v| v.to_string()).collect();
            out.push_str(&format!("{}, {}\n", kept, values.join(", ")));
        }
        out.push('\n');
    }
    out
}

/// `info` unless `RUST_LOG` says otherwise.
pub fn init_logger() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
}
