// Column names shared across the pipeline
pub const CLOSE_COLUMN: &str = "close";
pub const UP_COLUMN: &str = "up";

// Raw candle columns, in exchange order (the trailing "ignore" field is never kept)
pub const CANDLE_COLUMNS: [&str; 11] = [
    "open_time",
    "open",
    "high",
    "low",
    "close",
    "volume",
    "close_time",
    "quote_asset_volume",
    "number_of_trades",
    "taker_buy_base_asset_volume",
    "taker_buy_quote_asset_volume",
];

// Exchange API
pub const BINANCE_BASE_URL: &str = "https://api.binance.com";
pub const BINANCE_KLINES_ENDPOINT: &str = "/api/v3/klines";
pub const BINANCE_API_KEY_HEADER: &str = "X-MBX-APIKEY";
pub const KLINES_PAGE_LIMIT: usize = 1000;

// Labelling defaults
pub const DEFAULT_FORECAST_HORIZON: usize = 5;
pub const DEFAULT_FORECAST_GAP: usize = 0;

// Windowing defaults
pub const DEFAULT_WINDOW_SIZE: usize = 100;
pub const DEFAULT_STRIDE: usize = 1;

// Data splitting
pub const TRAINING_SPLIT_RATIO: f64 = 0.7;
pub const VALIDATION_SPLIT_RATIO: f64 = 0.15;

// Cleaning
pub const HAMPEL_WINDOW_SIZE: usize = 15;
pub const HAMPEL_N_SIGMAS: f64 = 3.0;
pub const SAVGOL_WINDOW_SIZE: usize = 51;
pub const SAVGOL_POLYNOMIAL_DEGREE: usize = 5;

// Output locations
pub const DEFAULT_DATASET_DIRECTORY: &str = "datasets";
pub const CONFIG_FILE_NAME: &str = "config.toml";
pub const LOCAL_CONFIG_FILE_NAME: &str = "config-local.toml";

// Binary container
pub const ARCHIVE_FORMAT_VERSION: u32 = 1;
pub const WINDOWS_ARRAY_NAME: &str = "x";
pub const LABELS_ARRAY_NAME: &str = "up";
pub const COLUMNS_ATTRIBUTE: &str = "columns";
