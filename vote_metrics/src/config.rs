// ********* Filter domains ***********

use std::path::PathBuf;

use datafusion::arrow::error::ArrowError;
use datafusion::error::DataFusionError;
use snafu::Snafu;

/// The sentinel accepted by the state, zone and section filters.
pub const ALL: &str = "ALL";

/// The 27 federative units, plus `ZZ` for votes cast abroad.
pub const STATES: [&str; 28] = [
    "AC", "AL", "AP", "AM", "BA", "CE", "DF", "ES", "GO", "MA", "MT", "MS", "MG", "PA", "PB", "PR",
    "PE", "PI", "RJ", "RN", "RS", "RO", "RR", "SC", "SP", "SE", "TO", "ZZ",
];

/// Highest zone or section number present in the dataset.
pub const MAX_CODE: u16 = 799;

/// Width of a zone group bucket.
pub const ZONE_GROUP_WIDTH: u16 = 20;

pub fn is_known_state(code: &str) -> bool {
    STATES.contains(&code)
}

/// Election round.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Round {
    First,
    Second,
}

impl Round {
    /// The token stored in the `turno` column.
    pub fn token(&self) -> &'static str {
        match self {
            Round::First => "1",
            Round::Second => "2",
        }
    }
}

/// A state filter: a single federative unit or every one of them.
#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub enum StateFilter {
    All,
    Uf(String),
}

/// A zone or section filter.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum CodeFilter {
    All,
    Code(u16),
}

/// A raw filter, as received from the outside world (query strings, command line).
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Filter {
    pub state: String,
    pub round: String,
    pub zone: String,
    pub section: String,
}

impl Filter {
    pub fn new(state: &str, round: &str, zone: &str, section: &str) -> Filter {
        Filter {
            state: state.to_string(),
            round: round.to_string(),
            zone: zone.to_string(),
            section: section.to_string(),
        }
    }
}

/// The tokens the storage layer expects.
///
/// `uf` is a membership list: it holds a single code, or every code plus `ALL`
/// when the whole country is selected, so that both the per-state rows and the
/// precomputed national aggregate are matched.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct NormalizedFilter {
    pub uf: Vec<String>,
    pub turno: String,
    pub zone_group: String,
    pub zone_code: String,
    pub section_code: String,
}

// ********* Store configuration ***********

/// Where and how the partitioned metrics dataset is read.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct StoreOptions {
    /// Root of the hive-partitioned tree (`turno=*/uf=*/zone_group=*/*.parquet`).
    pub dataset_root: PathBuf,
    /// Directory-level partition columns, outermost first. Always read as strings.
    pub partition_columns: Vec<String>,
    /// Worker threads of the query runtime. Uses the tokio default when not set.
    pub worker_threads: Option<usize>,
}

impl StoreOptions {
    pub const DEFAULT_ROOT: &'static str = "/src/VOTES_TIME_METRICS.parquet";

    pub fn new(dataset_root: impl Into<PathBuf>) -> StoreOptions {
        StoreOptions {
            dataset_root: dataset_root.into(),
            partition_columns: DEFAULT_PARTITION_COLUMNS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            worker_threads: None,
        }
    }
}

impl Default for StoreOptions {
    fn default() -> Self {
        StoreOptions::new(StoreOptions::DEFAULT_ROOT)
    }
}

pub const DEFAULT_PARTITION_COLUMNS: [&str; 3] = ["turno", "uf", "zone_group"];

// ********* Result rows ***********

/// Columns every query returns.
pub const METRIC_COLUMNS: [&str; 9] = [
    "uf",
    "turno",
    "zone_group",
    "zone_code",
    "section_code",
    "total_votos",
    "total_secoes",
    "tempo_voto_medio",
    "tempo_biometria_medio",
];

/// One row of the metrics dataset.
///
/// Measures are optional: the aggregates may be missing for partitions without
/// biometric data.
#[derive(PartialEq, Debug, Clone)]
pub struct MetricsRow {
    pub uf: String,
    pub turno: String,
    pub zone_group: String,
    pub zone_code: String,
    pub section_code: String,
    pub total_votos: Option<i64>,
    pub total_secoes: Option<i64>,
    /// Seconds.
    pub tempo_voto_medio: Option<f64>,
    /// Seconds.
    pub tempo_biometria_medio: Option<f64>,
}

impl MetricsRow {
    /// True for the precomputed national aggregate row.
    pub fn is_national_aggregate(&self) -> bool {
        self.uf == ALL
    }
}

// ********* Errors ***********

/// Errors raised by the normalizer and the query engine.
///
/// None of them are retried: a query either returns its full row set or fails.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum MetricsError {
    #[snafu(display("invalid {field} filter {value:?}: {reason}"))]
    InvalidFilter {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
    #[snafu(display("{field} {value} is outside [0, {max}]", max = MAX_CODE))]
    OutOfRange { field: &'static str, value: i64 },
    #[snafu(display("metrics dataset at {path} is unavailable: {reason}"))]
    StoreUnavailable { path: String, reason: String },
    #[snafu(display("failed to read the metrics dataset at {path}"))]
    StoreRead {
        path: String,
        source: DataFusionError,
    },
    #[snafu(display("failed to plan the metrics query"))]
    QueryFailed { source: DataFusionError },
    #[snafu(display("failed to start the query runtime"))]
    Runtime { source: std::io::Error },
    #[snafu(display("failed to render the result set"))]
    Render { source: ArrowError },
    #[snafu(display("column {column} cannot be read as {expected}"))]
    MalformedResult {
        column: String,
        expected: &'static str,
    },
}

impl MetricsError {
    pub fn is_invalid_filter(&self) -> bool {
        matches!(self, MetricsError::InvalidFilter { .. })
    }

    /// Missing or unreadable dataset files.
    pub fn is_store_unavailable(&self) -> bool {
        matches!(
            self,
            MetricsError::StoreUnavailable { .. } | MetricsError::StoreRead { .. }
        )
    }
}

pub type MetricsResult<T> = Result<T, MetricsError>;
