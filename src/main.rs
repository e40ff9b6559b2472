// External crates
use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use log::info;
use std::path::PathBuf;

// Local modules
use candle_lens::build_info;
use candle_lens::config::Settings;
use candle_lens::constants::{
    DEFAULT_FORECAST_GAP, DEFAULT_FORECAST_HORIZON, DEFAULT_STRIDE, DEFAULT_WINDOW_SIZE, TRAINING_SPLIT_RATIO,
    VALIDATION_SPLIT_RATIO,
};
use candle_lens::dataset::pipeline::{create_dataset, DatasetConfig};
use candle_lens::dataset::step_1_candle_source::{
    calculate_start_time, candles_file_name, candles_to_raw_dataframe, download_latest_candles,
    BinanceClient, KlineInterval,
};
use candle_lens::dataset::step_2_class_up::{add_class_up, class_up_file_name, drop_unlabeled_rows};
use candle_lens::dataset::step_5_sliding_windows::{transform_into_sliding_windows, windows_file_name};
use candle_lens::dataset::step_7_persistence::write_windowed_dataset;
use candle_lens::util::file_utils::{read_csv, write_csv};

#[derive(Debug, Parser)]
#[command(version, about = "Builds labelled sliding-window datasets from exchange candles")]
struct Cli {
    /// Directory holding config.toml and config-local.toml
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Download the latest candlestick history and save it to CSV
    Download {
        /// The currency pair
        symbol: String,
        /// Duration of each candlestick
        #[arg(default_value = "30m")]
        interval: KlineInterval,
        /// Number of latest complete candlesticks
        #[arg(default_value_t = 1000)]
        number_candles: usize,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Add the class "up" to a candle CSV
    ClassUp {
        /// Path of the input dataset
        input_dataset_path: PathBuf,
        /// Number of future rows scanned for a profitable close
        forecast_horizon: usize,
        /// Fee as a percentage of the asset purchased
        trading_fee_percentage: f64,
        /// Rows between the reference "close" and the forecast horizon
        #[arg(short = 'g', long, default_value_t = DEFAULT_FORECAST_GAP)]
        forecast_gap: usize,
        /// Drop the trailing rows whose class cannot be computed
        #[arg(long)]
        drop_unlabeled: bool,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Transform a CSV with class "up" into sliding windows
    SlidingWindows {
        /// Path of the input dataset
        input_dataset_path: PathBuf,
        /// Rows per window
        #[arg(default_value_t = DEFAULT_WINDOW_SIZE)]
        window_size: usize,
        /// Rows between consecutive windows
        #[arg(short, long, default_value_t = DEFAULT_STRIDE)]
        stride: usize,
        #[command(flatten)]
        output: OutputArgs,
    },
    /// Download, label, augment, clean, window and split in one go
    CreateDataset {
        /// The currency pair
        symbol: String,
        /// Duration of each candlestick
        interval: KlineInterval,
        /// Start of the range, epoch milliseconds
        start_time: i64,
        /// End of the range, epoch milliseconds (defaults to now)
        end_time: Option<i64>,
        /// Forecast horizons to build datasets for
        #[arg(short = 'f', long = "forecast-horizon", num_args = 1.., default_values_t = [1, 3, 5, 7])]
        forecast_horizons: Vec<usize>,
        /// Fee as a percentage of the asset purchased
        #[arg(short = 't', long, default_value_t = 0.0)]
        trading_fee_percentage: f64,
        #[arg(short = 'g', long, default_value_t = DEFAULT_FORECAST_GAP)]
        forecast_gap: usize,
        #[arg(short, long, default_value_t = DEFAULT_WINDOW_SIZE)]
        window_size: usize,
        #[arg(short, long, default_value_t = DEFAULT_STRIDE)]
        stride: usize,
        #[arg(long, default_value_t = TRAINING_SPLIT_RATIO)]
        training_size: f64,
        #[arg(long, default_value_t = VALIDATION_SPLIT_RATIO)]
        validation_size: f64,
        #[command(flatten)]
        output: OutputArgs,
    },
}

#[derive(Debug, Args)]
struct OutputArgs {
    /// Destination directory (defaults to the configured dataset directory)
    #[arg(long = "output-dataset-directory")]
    output_dataset_directory: Option<PathBuf>,
}

impl OutputArgs {
    fn directory(&self, settings: &Settings) -> PathBuf {
        self.output_dataset_directory
            .clone()
            .unwrap_or_else(|| settings.dataset.directory.clone())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    info!(
        "{} {} ({}, rustc {})",
        build_info::PKG_NAME,
        build_info::PKG_VERSION,
        build_info::TARGET,
        build_info::RUSTC_VERSION
    );

    let cli = Cli::parse();
    let settings = Settings::load_from_dir(&cli.config_dir).context("Failed to load configuration")?;

    match cli.command {
        Command::Download {
            symbol,
            interval,
            number_candles,
            output,
        } => {
            let client = BinanceClient::new(&settings.binance)?;
            let now = Utc::now();
            let start_time = calculate_start_time(interval, number_candles + 1, now)?;
            let candles = download_latest_candles(&client, &symbol, interval, number_candles, now)
                .context("Failed to download candles")?;

            let df = candles_to_raw_dataframe(&candles)?;
            let path = output
                .directory(&settings)
                .join(candles_file_name(&symbol, candles.len(), interval, start_time));
            write_csv(&df, &path)?;
            println!("{}", path.display());
        }
        Command::ClassUp {
            input_dataset_path,
            forecast_horizon,
            trading_fee_percentage,
            forecast_gap,
            drop_unlabeled,
            output,
        } => {
            let df = read_csv(&input_dataset_path)?;
            let mut labelled = add_class_up(&df, forecast_horizon, trading_fee_percentage, forecast_gap)?;
            if drop_unlabeled {
                labelled = drop_unlabeled_rows(&labelled)?;
            }

            let path = output.directory(&settings).join(class_up_file_name(
                &input_dataset_path,
                forecast_gap,
                forecast_horizon,
                trading_fee_percentage,
            ));
            write_csv(&labelled, &path)?;
            println!("{}", path.display());
        }
        Command::SlidingWindows {
            input_dataset_path,
            window_size,
            stride,
            output,
        } => {
            let df = read_csv(&input_dataset_path)?;
            let dataset = transform_into_sliding_windows(&df, window_size, stride)?;

            let path = output
                .directory(&settings)
                .join(windows_file_name(&input_dataset_path, window_size, stride));
            write_windowed_dataset(&dataset, &path)?;
            println!("{}", path.display());
        }
        Command::CreateDataset {
            symbol,
            interval,
            start_time,
            end_time,
            forecast_horizons,
            trading_fee_percentage,
            forecast_gap,
            window_size,
            stride,
            training_size,
            validation_size,
            output,
        } => {
            let client = BinanceClient::new(&settings.binance)?;
            let end_time = end_time.unwrap_or_else(|| Utc::now().timestamp_millis());

            let config = DatasetConfig {
                forecast_gap,
                window_size,
                stride,
                training_size,
                validation_size,
                ..DatasetConfig::new(
                    forecast_horizons.first().copied().unwrap_or(DEFAULT_FORECAST_HORIZON),
                    trading_fee_percentage,
                )
            };
            let directories = create_dataset(
                &client,
                &symbol,
                interval,
                start_time,
                end_time,
                &forecast_horizons,
                &config,
                output.directory(&settings).as_path(),
            )?;
            for directory in directories {
                println!("{}", directory.display());
            }
        }
    }

    Ok(())
}
