use clap::Parser;
use portability_analysis::ingest::CsvOptions;
use portability_analysis::{
    VisOptions, Visualization, dedup_visualizations, init_logger, run_visualizations,
};
use portability_results::akde::AkdeConfig;
use portability_results::{EfficiencyMode, Orientation};
use rayon::prelude::*;
use std::path::PathBuf;
use std::process::ExitCode;

/// Performance portability visualization.
#[derive(Parser, Debug)]
#[command(about)]
struct Args {
    /// Interpret CSV contents as raw efficiencies, in percent.
    #[arg(short, long, conflicts_with = "throughput")]
    raw_effs: bool,

    /// Interpret CSV contents as throughput numbers (higher is better).
    #[arg(short, long)]
    throughput: bool,

    /// Write output files with this prefix.
    #[arg(short, long, default_value = "./")]
    output_prefix: String,

    /// Visualizations to produce.
    #[arg(
        short = 'V',
        long,
        value_enum,
        value_delimiter = ',',
        default_value = "box,bins,casc,epdf"
    )]
    vis_types: Vec<Visualization>,

    /// Compile the figures to PDF with LuaLaTeX.
    #[arg(long)]
    pdf: bool,

    /// Logarithmic density axis.
    #[arg(long)]
    log_density: bool,

    /// Cells starting with this token (any case) are missing results.
    #[arg(long, default_value = portability_analysis::ingest::DEFAULT_MISSING_TOKEN)]
    missing_token: String,

    /// Also save the efficiency tables (MessagePack, zstd).
    #[arg(long)]
    save_effs: bool,

    #[arg(required = true, value_name = "CSV-FILE")]
    csv_files: Vec<PathBuf>,
}

fn main() -> ExitCode {
    init_logger();
    let args = Args::parse();

    let mode = if args.raw_effs {
        EfficiencyMode::RAW_PERCENT
    } else if args.throughput {
        EfficiencyMode::Application(Orientation::Throughput)
    } else {
        EfficiencyMode::Application(Orientation::Time)
    };
    let options = VisOptions {
        mode,
        output_prefix: args.output_prefix,
        visualizations: dedup_visualizations(&args.vis_types),
        pdf: args.pdf,
        log_density: args.log_density,
        csv: CsvOptions::new(args.missing_token),
        akde: AkdeConfig::default(),
        save_efficiencies: args.save_effs,
    };

    let failures = args
        .csv_files
        .par_iter()
        .filter(|input| match run_visualizations(input, &options) {
            Ok(written) => {
                log::debug!("{}: {} files written", input.display(), written.len());
                false
            }
            Err(e) => {
                log::error!("{}: {}", input.display(), e);
                true
            }
        })
        .count();

    if failures > 0 {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
