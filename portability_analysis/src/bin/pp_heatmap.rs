use clap::Parser;
use portability_analysis::ingest::{CsvOptions, DEFAULT_MISSING_TOKEN};
use portability_analysis::plots::HeatmapOptions;
use portability_analysis::{init_logger, run_heatmap};
use std::path::PathBuf;
use std::process::ExitCode;

/// Heatmap of raw results, one cell per platform and application.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// CSV input file
    input: PathBuf,

    /// Output file; its stem names the TeX job
    output: PathBuf,

    /// High numbers are better than low numbers (e.g. when plotting bandwidth)
    #[arg(long)]
    higher_is_better: bool,

    /// Divide all input results by this number
    #[arg(long, default_value_t = 1.0)]
    factorize: f64,

    /// Input is in percent
    #[arg(long)]
    percent: bool,

    /// Compile the figure to PDF with LuaLaTeX
    #[arg(long)]
    pdf: bool,

    /// Cells starting with this token (any case) are missing results
    #[arg(long, default_value = DEFAULT_MISSING_TOKEN)]
    missing_token: String,
}

fn main() -> ExitCode {
    init_logger();
    let args = Args::parse();
    if args.factorize == 0.0 {
        log::error!("--factorize must not be zero");
        return ExitCode::FAILURE;
    }
    let options = HeatmapOptions {
        higher_is_better: args.higher_is_better,
        factor: args.factorize,
        percent: args.percent,
    };
    let csv = CsvOptions::new(args.missing_token);
    match run_heatmap(&args.input, &args.output, &options, &csv, args.pdf) {
        Ok(path) => {
            log::debug!("Wrote {}", path.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
