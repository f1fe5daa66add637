//! pgfplots figures of an efficiency table.

use crate::error::{AnalysisError, Result};
use crate::latex::escape;
use pgfplots::axis::plot::coordinate::Coordinate2D;
use pgfplots::axis::plot::{Plot2D, PlotKey};
use pgfplots::axis::{Axis, AxisKey};
use pgfplots::{Engine, Picture};
use portability_results::{EfficiencyTable, PerformanceTable};
use portability_results::Result as ResultsResult;
use portability_results::akde::{AkdeConfig, DensityEstimate};
use portability_results::cascade::{CascadeSeries, efficiency_cascade};
use portability_results::histograms::{EfficiencyBin, EfficiencyHistogram, N_BINS};
use portability_results::statistics::FiveNumberSummary;
#[cfg(feature = "use_std")]
use rayon::prelude::*;
use std::path::{Path, PathBuf};

/// The density curves are drawn slightly past `[0, 1]`, flat, so the domain edges stay visible.
pub const DENSITY_EXTENSION: f64 = 0.035;

const PALETTE: [&str; 10] = [
    "1F77B4", "FF7F0E", "2CA02C", "D62728", "9467BD", "8C564B", "E377C2", "7F7F7F", "BCBD22",
    "17BECF",
];

fn color(i: usize) -> String {
    format!("AppColor{}", i % PALETTE.len())
}

fn palette_preamble() -> String {
    PALETTE
        .iter()
        .enumerate()
        .map(|(i, hex)| format!("\\definecolor{{AppColor{}}}{{HTML}}{{{}}}\n", i, hex))
        .collect()
}

fn legend_entries<'a>(names: impl IntoIterator<Item = &'a str>) -> AxisKey {
    let entries: Vec<String> = names
        .into_iter()
        .map(|n| format!("{{{}}}", escape(n)))
        .collect();
    AxisKey::Custom(format!("legend entries={{{}}}", entries.join(",")))
}

fn new_picture(extra_preamble: &[&str]) -> Picture {
    let mut picture = Picture::new();
    let mut preamble = vec![palette_preamble()];
    preamble.extend(extra_preamble.iter().map(|s| s.to_string()));
    picture.add_to_preamble(preamble);
    picture
}

/// Per application: PP (dashed, squares) and efficiency (solid, circles) against the
/// number of platforms kept, best platforms first.
pub fn cascade_picture(effs: &EfficiencyTable) -> Picture {
    let mut axis = Axis::new();
    axis.set_title("Efficiency cascade");
    let mut legend = Vec::new();
    let mut max_platforms = 0;

    for (i, (name, _)) in effs.columns().enumerate() {
        let cascade = efficiency_cascade(effs.platform_efficiencies(i));
        let Some(series) = CascadeSeries::new(&cascade) else {
            log::warn!("{}: no valid efficiency, left out of the cascade", name);
            continue;
        };
        log::debug!("{} cascade order: {:?}", name, series.platforms);
        max_platforms = max_platforms.max(series.len());

        let mut pp = Plot2D::new();
        pp.add_key(PlotKey::Custom(format!(
            "color={}, dashed, very thick, mark=square*",
            color(i)
        )));
        pp.coordinates = series
            .portability
            .iter()
            .map(|&(k, v)| Coordinate2D::from((k as f64, v)))
            .collect();

        let mut eff = Plot2D::new();
        eff.add_key(PlotKey::Custom(format!(
            "color={}, solid, very thick, mark=*",
            color(i)
        )));
        eff.coordinates = series
            .efficiency
            .iter()
            .map(|&(k, v)| Coordinate2D::from((k as f64, v)))
            .collect();

        axis.plots.push(pp);
        axis.plots.push(eff);
        legend.push(format!("{} PP", name));
        legend.push(format!("{} eff.", name));
    }

    axis.add_key(AxisKey::Custom(format!(
        "height=8cm, width=8cm, xmin=0, xmax={}, ymin=0, ymax=1.1, xtick distance=1, grid=major, \
         xlabel={{\\# of platforms}}, ylabel={{App PP (dashed)/efficiency (solid)}}, \
         legend pos=outer north east",
        max_platforms + 1
    )));
    axis.add_key(legend_entries(legend.iter().map(String::as_str)));

    let mut picture = new_picture(&[]);
    picture.axes.push(Box::new(axis));
    picture
}

/// Each column with its density estimate, estimated in parallel.
fn column_densities<'a>(
    effs: &'a EfficiencyTable,
    config: &AkdeConfig,
) -> Vec<(&'a str, Vec<f64>, ResultsResult<DensityEstimate>)> {
    let columns: Vec<(&str, Vec<f64>)> = effs.columns().collect();
    #[cfg(feature = "use_std")]
    let estimates: Vec<_> = columns
        .par_iter()
        .map(|(_, column)| config.efficiency_density(column))
        .collect();
    #[cfg(not(feature = "use_std"))]
    let estimates: Vec<_> = columns
        .iter()
        .map(|(_, column)| config.efficiency_density(column))
        .collect();
    columns
        .into_iter()
        .zip(estimates)
        .map(|((name, column), estimate)| (name, column, estimate))
        .collect()
}

/// Adaptive density estimate of each application's efficiencies.
pub fn density_picture(
    effs: &EfficiencyTable,
    config: &AkdeConfig,
    log_density: bool,
) -> Picture {
    let mut axis = Axis::new();
    let mut legend = Vec::new();

    for (i, (name, _, estimate)) in column_densities(effs, config).into_iter().enumerate() {
        let pdf = match estimate {
            Ok(pdf) => pdf,
            Err(e) => {
                log::warn!("{}: no density estimate ({})", name, e);
                continue;
            }
        };
        let (Some(&first), Some(&last)) = (pdf.density().first(), pdf.density().last()) else {
            continue;
        };
        let mut plot = Plot2D::new();
        plot.add_key(PlotKey::Custom(format!("color={}, thick, no marks", color(i))));
        plot.coordinates.push(Coordinate2D::from((-DENSITY_EXTENSION, first)));
        plot.coordinates
            .extend(pdf.points().map(Coordinate2D::from));
        plot.coordinates.push(Coordinate2D::from((1.0 + DENSITY_EXTENSION, last)));
        axis.plots.push(plot);
        legend.push(name);
    }

    let ylabel = if log_density {
        "ymode=log, unbounded coords=jump, ylabel={Density (log)}"
    } else {
        "ylabel={Density}"
    };
    axis.add_key(AxisKey::Custom(format!(
        "height=6cm, width=10cm, xmin=0, xmax=1, grid=both, clip=false, \
         xlabel={{Efficiency}}, {}, legend pos=north west",
        ylabel
    )));
    axis.add_key(legend_entries(legend));

    let mut picture = new_picture(&[]);
    picture.axes.push(Box::new(axis));
    picture
}

/// Share of platforms per efficiency bin, one bar group per bin.
pub fn binned_picture(effs: &EfficiencyTable) -> Picture {
    let mut axis = Axis::new();
    let mut legend = Vec::new();
    let n = effs.applications().len().max(1);
    let bar_width = 24.0 / n as f64;

    for (i, (name, column)) in effs.columns().enumerate() {
        let histogram = EfficiencyHistogram::from_efficiencies(&column);
        let mut plot = Plot2D::new();
        plot.add_key(PlotKey::Custom(format!("draw={}, fill={}", color(i), color(i))));
        plot.coordinates = histogram
            .percentages()
            .iter()
            .enumerate()
            .map(|(b, &p)| Coordinate2D::from((b as f64, p)))
            .collect();
        axis.plots.push(plot);
        legend.push(name);
    }

    let labels: Vec<String> = EfficiencyBin::all()
        .map(|b| format!("{{{}}}", b.label()))
        .collect();
    axis.add_key(AxisKey::Custom(format!(
        "ybar=0pt, bar width={:.1}pt, height=6cm, width=12cm, ymin=0, ymax=100, xmin=-0.5, xmax={}, \
         xtick={{0,...,{}}}, xticklabels={{{}}}, \
         x tick label style={{rotate=45, anchor=east}}, ymajorgrids, \
         xlabel={{Efficiency}}, ylabel={{Frequency in \\%}}, legend pos=north west",
        bar_width,
        N_BINS as f64 - 0.5,
        N_BINS - 1,
        labels.join(",")
    )));
    axis.add_key(legend_entries(legend));

    let mut picture = new_picture(&[]);
    picture.axes.push(Box::new(axis));
    picture
}

/// Box and whiskers per application, whiskers at the extremes.
pub fn box_picture(effs: &EfficiencyTable) -> Picture {
    let mut axis = Axis::new();
    let mut labels = Vec::new();

    for (i, (name, column)) in effs.columns().enumerate() {
        let summary = match FiveNumberSummary::new(&column) {
            Ok(s) => s,
            Err(e) => {
                log::warn!("{}: no box plot ({})", name, e);
                continue;
            }
        };
        let mut plot = Plot2D::new();
        plot.add_key(PlotKey::Custom(format!(
            "boxplot prepared={{draw position={}, lower whisker={}, lower quartile={}, \
             median={}, upper quartile={}, upper whisker={}}}, draw=AppColor0, \
             boxplot/every median/.style={{very thick}}, solid",
            i + 1,
            summary.min,
            summary.q1,
            summary.median,
            summary.q3,
            summary.max
        )));
        axis.plots.push(plot);
        labels.push(format!("{{{}}}", escape(name)));
    }

    axis.add_key(AxisKey::Custom(format!(
        "height=6cm, width=10cm, xmin=0.5, xmax={}, xtick={{1,...,{}}}, xticklabels={{{}}}, \
         x tick label style={{rotate=45, anchor=east}}, ymajorgrids, ylabel={{Efficiency}}",
        labels.len() as f64 + 0.5,
        labels.len().max(1),
        labels.join(",")
    )));

    let mut picture = new_picture(&["\\usepgfplotslibrary{statistics}"]);
    picture.axes.push(Box::new(axis));
    picture
}

/// Half width of the widest violin, in application slots.
const VIOLIN_HALF_WIDTH: f64 = 0.4;

/// Violin per application: its density estimate mirrored around the slot, cut
/// to the observed range, with extrema and median bars.
pub fn violin_picture(effs: &EfficiencyTable, config: &AkdeConfig) -> Picture {
    let mut axis = Axis::new();
    let mut labels = Vec::new();

    for (i, (name, column, estimate)) in column_densities(effs, config).into_iter().enumerate() {
        let (pdf, summary) = match (estimate, FiveNumberSummary::new(&column)) {
            (Ok(pdf), Ok(summary)) => (pdf, summary),
            (Err(e), _) | (_, Err(e)) => {
                log::warn!("{}: no violin ({})", name, e);
                continue;
            }
        };
        let center = (i + 1) as f64;
        labels.push(format!("{{{}}}", escape(name)));

        let peak = pdf.density().iter().copied().fold(0.0, f64::max);
        let inside: Vec<(f64, f64)> = pdf
            .points()
            .filter(|&(y, _)| y >= summary.min && y <= summary.max)
            .map(|(y, d)| (y, if peak > 0.0 { VIOLIN_HALF_WIDTH * d / peak } else { 0.0 }))
            .collect();
        if !inside.is_empty() {
            let mut outline = Plot2D::new();
            outline.add_key(PlotKey::Custom(format!(
                "draw={}, fill={}, fill opacity=0.4, no marks",
                color(i),
                color(i)
            )));
            outline.coordinates = inside
                .iter()
                .map(|&(y, w)| Coordinate2D::from((center + w, y)))
                .chain(inside.iter().rev().map(|&(y, w)| Coordinate2D::from((center - w, y))))
                .collect();
            if let Some(&first) = outline.coordinates.first() {
                outline.coordinates.push(first);
            }
            axis.plots.push(outline);
        }

        let mut stem = Plot2D::new();
        stem.add_key(PlotKey::Custom(format!("draw={}, no marks", color(i))));
        stem.coordinates = vec![
            Coordinate2D::from((center, summary.min)),
            Coordinate2D::from((center, summary.max)),
        ];
        axis.plots.push(stem);
        for (y, style) in [
            (summary.min, "thin"),
            (summary.max, "thin"),
            (summary.median, "very thick"),
        ] {
            let mut bar = Plot2D::new();
            bar.add_key(PlotKey::Custom(format!("draw={}, {}, no marks", color(i), style)));
            bar.coordinates = vec![
                Coordinate2D::from((center - VIOLIN_HALF_WIDTH / 2.0, y)),
                Coordinate2D::from((center + VIOLIN_HALF_WIDTH / 2.0, y)),
            ];
            axis.plots.push(bar);
        }
    }

    axis.add_key(AxisKey::Custom(format!(
        "height=6cm, width=10cm, xmin=0.5, xmax={}, ymin=0, ymax=1, xtick={{1,...,{}}}, \
         xticklabels={{{}}}, x tick label style={{rotate=45, anchor=east}}, ymajorgrids, \
         xlabel={{Programming models}}, ylabel={{Efficiency}}",
        labels.len() as f64 + 0.5,
        labels.len().max(1),
        labels.join(",")
    )));

    let mut picture = new_picture(&[]);
    picture.axes.push(Box::new(axis));
    picture
}

/// Cells of a heatmap, rows top to bottom. `None` marks a missing result.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatmapCells {
    pub columns: Vec<String>,
    pub rows: Vec<(String, Vec<Option<f64>>)>,
}

impl HeatmapCells {
    /// Raw measurements. Platforms without any result are left out.
    pub fn from_performance(table: &PerformanceTable) -> Self {
        let rows = table
            .rows()
            .filter(|(_, row)| row.iter().any(|m| !m.is_missing()))
            .map(|(name, row)| (name.to_string(), row.iter().map(|m| m.value()).collect()))
            .collect();
        Self {
            columns: table.applications().to_vec(),
            rows,
        }
    }

    /// Efficiencies in percent; unsupported cells are missing.
    pub fn from_efficiencies(effs: &EfficiencyTable) -> Self {
        let rows = effs
            .platforms()
            .iter()
            .enumerate()
            .map(|(p, name)| {
                let cells = effs
                    .row(p)
                    .iter()
                    .map(|&e| (e > 0.0).then_some(100.0 * e))
                    .collect();
                (name.clone(), cells)
            })
            .collect();
        Self {
            columns: effs.applications().to_vec(),
            rows,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeatmapOptions {
    /// Brighter cells for higher values.
    pub higher_is_better: bool,
    /// Every value is divided by this.
    pub factor: f64,
    /// Label cells as percentages.
    pub percent: bool,
}

impl Default for HeatmapOptions {
    fn default() -> Self {
        Self {
            higher_is_better: false,
            factor: 1.0,
            percent: false,
        }
    }
}

/// Values below this are drawn as missing.
const HEATMAP_VMIN: f64 = 1e-6;

/// Black body ramp, `t` in `[0, 1]` from black to white.
fn gist_heat(t: f64) -> (u8, u8, u8) {
    let channel = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
    (channel(1.5 * t), channel(2.0 * t - 1.0), channel(4.0 * t - 3.0))
}

fn heatmap_label(value: Option<f64>, percent: bool) -> String {
    match value {
        None => String::from("-"),
        Some(v) if percent => format!("{:.0}\\%", v),
        Some(v) if v < 100.0 => format!("{:.1}", v),
        Some(v) => format!("{:.0}", v),
    }
}

/// One filled square per cell, labelled with its value.
pub fn heatmap_picture(cells: &HeatmapCells, options: &HeatmapOptions) -> Picture {
    let mut axis = Axis::new();
    let scaled: Vec<Vec<Option<f64>>> = cells
        .rows
        .iter()
        .map(|(_, row)| row.iter().map(|v| v.map(|v| v / options.factor)).collect())
        .collect();
    let (vmin, vmax) = scaled
        .iter()
        .flatten()
        .flatten()
        .copied()
        .filter(|&v| v >= HEATMAP_VMIN)
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    let span = if vmax > vmin { vmax - vmin } else { 1.0 };

    for (j, row) in scaled.iter().enumerate() {
        for (i, &value) in row.iter().enumerate() {
            let fill = match value {
                Some(v) if v >= HEATMAP_VMIN => {
                    let t = (v - vmin) / span;
                    let (r, g, b) = gist_heat(if options.higher_is_better { t } else { 1.0 - t });
                    format!("{{rgb,255:red,{};green,{};blue,{}}}", r, g, b)
                }
                _ => String::from("white"),
            };
            let (x0, y0) = (i as f64, j as f64);
            let mut cell = Plot2D::new();
            cell.add_key(PlotKey::Custom(format!("draw=black, fill={}, no marks", fill)));
            cell.coordinates = vec![
                Coordinate2D::from((x0, y0)),
                Coordinate2D::from((x0 + 1.0, y0)),
                Coordinate2D::from((x0 + 1.0, y0 + 1.0)),
                Coordinate2D::from((x0, y0 + 1.0)),
                Coordinate2D::from((x0, y0)),
            ];
            axis.plots.push(cell);

            let mut label = Plot2D::new();
            label.add_key(PlotKey::Custom(format!(
                "draw=none, no marks, nodes near coords={{{}}}, nodes near coords align=center, \
                 every node near coord/.append style={{font=\\small, color=HeatLabel}}",
                heatmap_label(value, options.percent)
            )));
            label.coordinates = vec![Coordinate2D::from((x0 + 0.5, y0 + 0.5))];
            axis.plots.push(label);
        }
    }

    let columns: Vec<String> = cells.columns.iter().map(|c| format!("{{{}}}", escape(c))).collect();
    let rows: Vec<String> = cells.rows.iter().map(|(p, _)| format!("{{{}}}", escape(p))).collect();
    axis.add_key(AxisKey::Custom(format!(
        "width=10cm, height=7.5cm, axis on top, enlargelimits=false, y dir=reverse, \
         xmin=0, xmax={}, ymin=0, ymax={}, xtick={{{}}}, xticklabels={{{}}}, \
         ytick={{{}}}, yticklabels={{{}}}, x tick label style={{rotate=45, anchor=north east}}, \
         colormap={{heat}}{{{}}}, colorbar, point meta min={}, point meta max={}",
        columns.len(),
        rows.len(),
        ticks(columns.len()),
        columns.join(","),
        ticks(rows.len()),
        rows.join(","),
        colormap_stops(options.higher_is_better),
        if vmin.is_finite() { vmin } else { 0.0 },
        if vmax.is_finite() { vmax } else { 1.0 },
    )));

    let mut picture = new_picture(&["\\definecolor{HeatLabel}{HTML}{B9C5BF}"]);
    picture.axes.push(Box::new(axis));
    picture
}

/// Cell centers `0.5, 1.5, ...`.
fn ticks(n: usize) -> String {
    (0..n)
        .map(|i| format!("{}", i as f64 + 0.5))
        .collect::<Vec<_>>()
        .join(",")
}

fn colormap_stops(higher_is_better: bool) -> String {
    (0..=8)
        .map(|k| {
            let t = k as f64 / 8.0;
            let (r, g, b) = gist_heat(if higher_is_better { t } else { 1.0 - t });
            format!("rgb255=({},{},{})", r, g, b)
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Where the figures of one input go: a folder and a job name prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    pub folder: PathBuf,
    pub prefix: String,
}

impl OutputLocation {
    /// `prefix` is prepended to the input file stem. A prefix ending in `/` is a folder.
    pub fn new(prefix: &str, input: &Path) -> Self {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let prefix_path = Path::new(prefix);
        if prefix.is_empty() || prefix.ends_with('/') {
            let folder = if prefix.is_empty() {
                PathBuf::from(".")
            } else {
                prefix_path.to_path_buf()
            };
            return Self {
                folder,
                prefix: stem,
            };
        }
        let folder = match prefix_path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let name = prefix_path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            folder,
            prefix: format!("{}{}", name, stem),
        }
    }

    pub fn jobname(&self, suffix: &str) -> String {
        format!("{}{}", self.prefix, suffix)
    }
}

/// Writes `<jobname>.tex` and, if asked, compiles it with LuaLaTeX.
pub fn write_picture(
    picture: &Picture,
    location: &OutputLocation,
    suffix: &str,
    pdf: bool,
) -> Result<PathBuf> {
    let jobname = location.jobname(suffix);
    std::fs::create_dir_all(&location.folder)?;
    let tex = location.folder.join(format!("{}.tex", jobname));
    std::fs::write(&tex, picture.standalone_string())?;
    log::info!("Wrote {}", tex.display());
    if !pdf {
        return Ok(tex);
    }
    picture
        .to_pdf(&location.folder, &jobname, Engine::LuaLatex)
        .map_err(|e| AnalysisError::Pdf {
            jobname: jobname.clone(),
            message: format!("{:?}", e),
        })?;
    let out = location.folder.join(format!("{}.pdf", jobname));
    log::info!("Wrote {}", out.display());
    Ok(out)
}
