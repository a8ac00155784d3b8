use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use vote_metrics::*;

use std::fs;

use datafusion::error::DataFusionError;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::{Args, Command, QueryArgs};
use crate::dash::config_reader::*;

pub mod config_reader;
pub mod convert;
pub mod params;
pub mod widgets;

#[derive(Debug, Snafu)]
pub enum DashError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("{source}"))]
    Metrics { source: MetricsError },
    #[snafu(display("Error listing logs in {path}"))]
    ReadingLogs {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Invalid state {state}"))]
    InvalidState { state: String },
    #[snafu(display("Failed to convert the logs of {state}"))]
    Conversion {
        state: String,
        source: DataFusionError,
    },
    #[snafu(display("Failed to start the conversion runtime"))]
    ConversionRuntime { source: std::io::Error },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type DashResult<T> = Result<T, DashError>;

pub fn run(args: &Args) -> DashResult<()> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => DashConfig::default(),
    };
    if let Some(dataset) = &args.dataset {
        config.dataset_root = Some(dataset.clone());
    }
    debug!("run: config {:?}", config);

    match &args.command {
        Command::Query(qa) => run_query(&config, qa),
        Command::Convert { state } => {
            let out = convert::convert_state(state, &config)?;
            println!("{}", out.display());
            Ok(())
        }
    }
}

/// Opens the dataset once, renders the dashboard figures and releases the dataset.
pub fn run_query(config: &DashConfig, qa: &QueryArgs) -> DashResult<()> {
    let params = params::resolve(qa);
    info!("run_query: params {:?}", params);

    let engine = MetricsEngine::connect(&config.store_options()).context(MetricsSnafu {})?;
    let res = render_query(&engine, &params, qa);
    engine.close();
    res
}

fn render_query(
    engine: &MetricsEngine,
    params: &params::DashParams,
    qa: &QueryArgs,
) -> DashResult<()> {
    let (summary, rs) = widgets::build_dashboard(engine, params)?;

    let js = serde_json::to_value(&summary).context(ParsingJsonSnafu {})?;
    let pretty_js = serde_json::to_string_pretty(&js).context(ParsingJsonSnafu {})?;
    match qa.out.as_deref() {
        None | Some("") | Some("stdout") => println!("{}", pretty_js),
        Some(path) => {
            fs::write(path, &pretty_js).context(WritingOutputSnafu { path })?;
            info!("render_query: summary written to {}", path);
        }
    }

    if qa.table {
        println!("{}", rs.pretty().context(MetricsSnafu {})?);
    }

    // The reference summary, if provided for comparison
    if let Some(reference) = &qa.reference {
        let summary_ref = read_summary(reference)?;
        let pretty_js_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_ref != pretty_js {
            warn!("Found differences with the reference summary");
            print_diff(pretty_js_ref.as_str(), pretty_js.as_str(), "\n");
            whatever!("Difference detected between computed summary and reference summary")
        }
    }
    Ok(())
}

pub fn read_summary(path: &str) -> DashResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})
}

#[cfg(test)]
pub(crate) mod test_data {
    use std::path::Path;

    use vote_metrics::fixtures::{self, SampleRow};

    /// Round 1 totals for the country, SP and RJ.
    pub const NATIONAL: [SampleRow; 3] = [
        SampleRow::state_total("1", "ALL", 1_234_567, 4_000, 95.0, Some(12.0)),
        SampleRow::state_total("1", "SP", 800_000, 2_500, 90.0, Some(11.0)),
        SampleRow::state_total("1", "RJ", 434_567, 1_500, 104.0, Some(14.0)),
    ];

    pub fn write_dataset(root: &Path) {
        fixtures::write_dataset(root, &NATIONAL).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn query_args(params: &str) -> QueryArgs {
        QueryArgs {
            uf: None,
            turno: None,
            zona: None,
            secao: None,
            params: Some(params.to_string()),
            lenient: false,
            out: None,
            reference: None,
            table: false,
        }
    }

    fn setup() -> (TempDir, DashConfig) {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = TempDir::new().unwrap();
        let dataset = dir.path().join("metrics");
        test_data::write_dataset(&dataset);
        let config = DashConfig {
            dataset_root: Some(dataset.display().to_string()),
            ..DashConfig::default()
        };
        (dir, config)
    }

    #[test]
    fn writes_summary_and_matches_reference() {
        let (dir, config) = setup();
        let out = dir.path().join("summary.json");
        let mut qa = query_args("uf=ALL&turno=1");
        qa.out = Some(out.display().to_string());
        run_query(&config, &qa).unwrap();

        let js = read_summary(out.to_str().unwrap()).unwrap();
        assert_eq!(js["votos"], "1 234 567");
        assert_eq!(js["tempo_medio"], "1m 35s");

        // Running again against the first output as the reference succeeds.
        let mut qa2 = query_args("uf=ALL&turno=1");
        qa2.out = Some(dir.path().join("again.json").display().to_string());
        qa2.reference = Some(out.display().to_string());
        run_query(&config, &qa2).unwrap();
    }

    #[test]
    fn reference_mismatch_fails() {
        let (dir, config) = setup();
        let reference = dir.path().join("reference.json");
        fs::write(&reference, "{\"votos\": \"0\"}").unwrap();
        let mut qa = query_args("uf=SP");
        qa.out = Some(dir.path().join("summary.json").display().to_string());
        qa.reference = Some(reference.display().to_string());
        let e = run_query(&config, &qa).unwrap_err();
        assert!(matches!(e, DashError::Whatever { .. }), "{:?}", e);
    }

    #[test]
    fn strict_flags_reach_the_core() {
        let (_dir, config) = setup();
        let mut qa = query_args("");
        qa.params = None;
        qa.uf = Some("XX".to_string());
        let e = run_query(&config, &qa).unwrap_err();
        match e {
            DashError::Metrics { source } => assert!(source.is_invalid_filter()),
            e => panic!("unexpected error {:?}", e),
        }
    }

    #[test]
    fn missing_dataset() {
        let dir = TempDir::new().unwrap();
        let config = DashConfig {
            dataset_root: Some(dir.path().join("nothing").display().to_string()),
            ..DashConfig::default()
        };
        let e = run_query(&config, &query_args("")).unwrap_err();
        match e {
            DashError::Metrics { source } => assert!(source.is_store_unavailable()),
            e => panic!("unexpected error {:?}", e),
        }
    }
}
