use clap::Parser;
use portability_analysis::ingest::{CsvOptions, DEFAULT_MISSING_TOKEN};
use portability_analysis::{TableOptions, init_logger, run_table, subset_series_csv};
use portability_results::Orientation;
use std::path::PathBuf;
use std::process::ExitCode;

/// Produce a table of "average" (or consistency) efficiencies per application.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// CSV file containing performance data
    input_file: PathBuf,

    /// Output TeX file
    output_file: PathBuf,

    /// Calculate application efficiency
    #[arg(long)]
    calc_efficiency: bool,

    /// Treat the data as throughput (higher is better)
    #[arg(long)]
    input_is_throughput: bool,

    /// Sort columns according to performance portability
    #[arg(long)]
    sort: bool,

    /// Report consistency measures instead of averages
    #[arg(long)]
    consistency: bool,

    /// Cells starting with this token (any case) are missing results
    #[arg(long, default_value = DEFAULT_MISSING_TOKEN)]
    missing_token: String,

    /// Platform description CSV (Architecture, Mem BW, Category); switches to
    /// architectural efficiency
    #[arg(long, value_name = "PLATFORMS-CSV")]
    platforms: Option<PathBuf>,

    /// Also print every statistic while removing these platforms in turn
    #[arg(long, value_delimiter = ',', value_name = "PLATFORM")]
    remove_order: Vec<String>,
}

fn main() -> ExitCode {
    init_logger();
    let args = Args::parse();

    if args.input_is_throughput && !args.calc_efficiency && args.platforms.is_none() {
        log::warn!("--input-is-throughput only matters with --calc-efficiency or --platforms");
    }

    #[cfg(feature = "serde_support")]
    let platforms = match &args.platforms {
        None => None,
        Some(path) => match portability_analysis::ingest::read_platforms_file(path) {
            Ok(set) => Some(set),
            Err(e) => {
                log::error!("Failed to read platforms: {}", e);
                return ExitCode::FAILURE;
            }
        },
    };
    #[cfg(not(feature = "serde_support"))]
    let platforms = match &args.platforms {
        None => None,
        Some(_) => {
            log::error!("Built without serde_support, --platforms is unavailable");
            return ExitCode::FAILURE;
        }
    };

    let options = TableOptions {
        calc_efficiency: args.calc_efficiency,
        orientation: if args.input_is_throughput {
            Orientation::Throughput
        } else {
            Orientation::Time
        },
        sort: args.sort,
        consistency: args.consistency,
        csv: CsvOptions::new(args.missing_token),
        platforms,
    };

    let effs = match run_table(&args.input_file, &args.output_file, &options) {
        Ok((effs, _)) => effs,
        Err(e) => {
            log::error!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if !args.remove_order.is_empty() {
        let order: Vec<&str> = args.remove_order.iter().map(String::as_str).collect();
        print!("{}", subset_series_csv(&effs, &order));
    }
    ExitCode::SUCCESS
}
