use portability_analysis::ingest::{CsvOptions, read_performance};
use portability_analysis::plots::{OutputLocation, write_picture};
use portability_analysis::{
    TableOptions, VisOptions, Visualization, dedup_visualizations, run_table, run_visualizations,
    subset_series_csv, table_efficiencies,
};
use portability_results::akde::AkdeConfig;
use portability_results::summary::Statistic;
use portability_results::{EfficiencyMode, EfficiencyTable, Measurement, Orientation};
use std::path::{Path, PathBuf};

const BABELSTREAM: &str = "\
Device, OpenMP, Kokkos, CUDA
Skylake, 10, 20, X
K20, 40, 20, 10
Radeon VII , x, 15 , 5
";

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("pp-analysis-{}-{}", name, std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn table_options() -> TableOptions {
    TableOptions {
        calc_efficiency: true,
        orientation: Orientation::Time,
        sort: false,
        consistency: false,
        csv: CsvOptions::default(),
        platforms: None,
    }
}

#[test]
fn reads_performance_csv() {
    let t = read_performance(BABELSTREAM.as_bytes(), &CsvOptions::default()).unwrap();
    assert_eq!(t.applications(), &["OpenMP", "Kokkos", "CUDA"]);
    assert_eq!(t.platforms(), &["Skylake", "K20", "Radeon VII"]);
    assert_eq!(t.get("Skylake", "CUDA"), Some(Measurement::Missing));
    assert_eq!(t.get("Radeon VII", "OpenMP"), Some(Measurement::Missing));
    assert_eq!(t.get("Radeon VII", "Kokkos"), Some(Measurement::Value(15.0)));
    assert_eq!(t.counts(), vec![2, 3, 2]);
}

#[test]
fn rejects_bad_cells_and_duplicates() {
    let bad = "Device, a\np0, fast\n";
    assert!(read_performance(bad.as_bytes(), &CsvOptions::default()).is_err());
    let dup = "Device, a\np0, 1\np0, 2\n";
    assert!(read_performance(dup.as_bytes(), &CsvOptions::default()).is_err());
    let ragged = "Device, a, b\np0, 1\n";
    assert!(read_performance(ragged.as_bytes(), &CsvOptions::default()).is_err());
}

#[test]
fn custom_missing_token() {
    let csv = "Device, a, b\np0, n/a, 2\n";
    assert!(read_performance(csv.as_bytes(), &CsvOptions::default()).is_err());
    let t = read_performance(csv.as_bytes(), &CsvOptions::new("N/A")).unwrap();
    assert_eq!(t.get("p0", "a"), Some(Measurement::Missing));
}

#[test]
fn time_efficiencies() {
    let t = read_performance(BABELSTREAM.as_bytes(), &CsvOptions::default()).unwrap();
    let e = EfficiencyTable::from_performance(&t, EfficiencyMode::Application(Orientation::Time));
    assert_eq!(e.row(0), &[1.0, 0.5, 0.0]);
    assert_eq!(e.row(1), &[0.25, 0.5, 1.0]);
    assert_eq!(e.row(2), &[0.0, 1.0 / 3.0, 1.0]);
    // OpenMP and CUDA both miss one platform; equal keys keep the input order
    let ranked = e.ranked();
    assert_eq!(ranked.applications(), &["OpenMP", "CUDA", "Kokkos"]);
}

#[test]
fn percent_tables() {
    let t = read_performance(BABELSTREAM.as_bytes(), &CsvOptions::default()).unwrap();
    let effs = table_efficiencies(&t, &table_options());
    assert_eq!(effs.get("K20", "OpenMP"), Some(25.0));
    assert_eq!(effs.get("K20", "CUDA"), Some(100.0));
}

#[test]
fn writes_summary_table() {
    let dir = scratch("table");
    let input = dir.join("babelstream.csv");
    let output = dir.join("averages.tex");
    std::fs::write(&input, BABELSTREAM).unwrap();
    let mut options = table_options();
    options.sort = true;
    let (effs, summary) = run_table(&input, &output, &options).unwrap();
    assert_eq!(effs.platforms().len(), 3);
    assert_eq!(summary.statistics, Statistic::AVERAGES.to_vec());
    // Kokkos has the only non-zero portability
    assert_eq!(summary.applications.last().map(String::as_str), Some("Kokkos"));
    let tex = std::fs::read_to_string(&output).unwrap();
    assert!(tex.starts_with("\\begin{tabular}{lrrr}"));
    assert!(tex.contains("Performance Portability"));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn subset_series_blocks() {
    let t = read_performance(BABELSTREAM.as_bytes(), &CsvOptions::default()).unwrap();
    let e = EfficiencyTable::from_performance(&t, EfficiencyMode::Application(Orientation::Time));
    let csv = subset_series_csv(&e, &["Radeon VII", "Skylake"]);
    let pp_block: Vec<&str> = csv
        .split("\n\n")
        .find(|b| b.starts_with("Performance Portability,"))
        .unwrap()
        .lines()
        .collect();
    assert_eq!(pp_block.len(), 4);
    assert!(pp_block[1].starts_with("3, "));
    assert_eq!(pp_block[3], "1, 0.25, 0.5, 1");
}

#[test]
fn writes_figures() {
    let dir = scratch("vis");
    let input = dir.join("babelstream.csv");
    std::fs::write(&input, BABELSTREAM).unwrap();
    let options = VisOptions {
        mode: EfficiencyMode::Application(Orientation::Time),
        output_prefix: format!("{}/", dir.display()),
        visualizations: dedup_visualizations(&[
            Visualization::Box,
            Visualization::Bins,
            Visualization::Casc,
            Visualization::Box,
        ]),
        pdf: false,
        log_density: false,
        csv: CsvOptions::default(),
        akde: AkdeConfig {
            grid_points: 200,
            ..AkdeConfig::default()
        },
        save_efficiencies: false,
    };
    let written = run_visualizations(&input, &options).unwrap();
    let names: Vec<String> = written
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        names,
        vec![
            "babelstream_box_chart.tex",
            "babelstream_binned_chart.tex",
            "babelstream_eff_cascade.tex"
        ]
    );
    for path in &written {
        assert!(std::fs::metadata(path).unwrap().len() > 0);
    }
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn density_figure() {
    let dir = scratch("epdf");
    let t = read_performance(BABELSTREAM.as_bytes(), &CsvOptions::default()).unwrap();
    let e = EfficiencyTable::from_performance(&t, EfficiencyMode::Application(Orientation::Time));
    let config = AkdeConfig {
        grid_points: 200,
        iterations: 3,
        ..AkdeConfig::default()
    };
    let picture = portability_analysis::plots::density_picture(&e, &config, true);
    let location = OutputLocation::new(&format!("{}/", dir.display()), Path::new("in.csv"));
    let path = write_picture(&picture, &location, "_estimated_density_chart", false).unwrap();
    assert!(path.ends_with("in_estimated_density_chart.tex"));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[cfg(feature = "serde_support")]
#[test]
fn reads_platforms() {
    use portability_analysis::ingest::read_platforms;
    let csv = "Architecture, Mem BW, Category\nSkylake, 256, CPU\nK20, 208, GPU;NVIDIA\n";
    let set = read_platforms(csv.as_bytes()).unwrap();
    assert_eq!(set.len(), 2);
    let k20 = set.get("K20").unwrap();
    assert_eq!(k20.arch_bw, 208.0);
    assert_eq!(k20.categories, vec!["GPU", "NVIDIA"]);
}

#[cfg(feature = "serde_support")]
#[test]
fn architectural_percent_tables() {
    use portability_analysis::ingest::read_platforms;
    let platforms = "Architecture, Mem BW, Category\nSkylake, 5, CPU\nK20, 10, GPU\n";
    let t = read_performance(BABELSTREAM.as_bytes(), &CsvOptions::default()).unwrap();
    let mut options = table_options();
    options.calc_efficiency = false;
    options.platforms = Some(read_platforms(platforms.as_bytes()).unwrap());
    let effs = table_efficiencies(&t, &options);
    assert_eq!(effs.row(0), &[50.0, 25.0, 0.0]);
    assert_eq!(effs.row(1), &[25.0, 50.0, 100.0]);
    // no description for Radeon VII
    assert_eq!(effs.row(2), &[0.0, 0.0, 0.0]);
}

#[cfg(all(feature = "serde_support", feature = "use_std"))]
#[test]
fn saved_efficiencies_read_back() {
    let dir = scratch("save");
    let input = dir.join("babelstream.csv");
    std::fs::write(&input, BABELSTREAM).unwrap();
    let options = VisOptions {
        mode: EfficiencyMode::Application(Orientation::Time),
        output_prefix: format!("{}/", dir.display()),
        visualizations: Vec::new(),
        pdf: false,
        log_density: false,
        csv: CsvOptions::default(),
        akde: AkdeConfig::default(),
        save_efficiencies: true,
    };
    let written = run_visualizations(&input, &options).unwrap();
    assert_eq!(written.len(), 1);
    let saved = EfficiencyTable::read_msgpack_zstd(&written[0]).unwrap();
    assert_eq!(saved.applications(), &["OpenMP", "CUDA", "Kokkos"]);
    assert_eq!(saved.get("K20", "CUDA"), Some(1.0));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn heatmap_of_raw_results() {
    use portability_analysis::plots::{HeatmapCells, HeatmapOptions};
    let csv = format!("{}Fiji, X, x, \n", BABELSTREAM);
    let t = read_performance(csv.as_bytes(), &CsvOptions::default()).unwrap();
    let cells = HeatmapCells::from_performance(&t);
    // Fiji has no result at all
    assert_eq!(cells.rows.len(), 3);
    assert_eq!(cells.rows[2], ("Radeon VII".to_string(), vec![None, Some(15.0), Some(5.0)]));

    let dir = scratch("heat");
    let input = dir.join("babelstream.csv");
    std::fs::write(&input, &csv).unwrap();
    let output = dir.join("heat.pdf");
    let options = HeatmapOptions {
        factor: 10.0,
        ..HeatmapOptions::default()
    };
    let path = portability_analysis::run_heatmap(&input, &output, &options, &CsvOptions::default(), false)
        .unwrap();
    assert_eq!(path, dir.join("heat.tex"));
    let tex = std::fs::read_to_string(&path).unwrap();
    assert!(tex.contains("nodes near coords={1.5}"));
    assert!(tex.contains("nodes near coords={-}"));
    assert!(!tex.contains("Fiji"));
    std::fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn violin_and_heatmap_figures() {
    let dir = scratch("violin");
    let input = dir.join("babelstream.csv");
    std::fs::write(&input, BABELSTREAM).unwrap();
    let options = VisOptions {
        mode: EfficiencyMode::Application(Orientation::Time),
        output_prefix: format!("{}/", dir.display()),
        visualizations: vec![Visualization::Violin, Visualization::Heat],
        pdf: false,
        log_density: false,
        csv: CsvOptions::default(),
        akde: AkdeConfig {
            grid_points: 200,
            iterations: 3,
            ..AkdeConfig::default()
        },
        save_efficiencies: false,
    };
    let written = run_visualizations(&input, &options).unwrap();
    assert_eq!(written.len(), 2);
    assert!(written[0].ends_with("babelstream_violin_chart.tex"));
    assert!(written[1].ends_with("babelstream_heatmap.tex"));
    let heat = std::fs::read_to_string(&written[1]).unwrap();
    // K20 runs CUDA best
    assert!(heat.contains(r"nodes near coords={100\%}"));
    let violin = std::fs::read_to_string(&written[0]).unwrap();
    assert!(violin.contains("fill opacity=0.4"));
    std::fs::remove_dir_all(&dir).unwrap();
}
