pub mod builder;
mod config;
#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;
pub mod manual;
mod normalize;

use log::{debug, info};
use snafu::prelude::*;

use std::path::PathBuf;
use std::time::{Duration, Instant};

use datafusion::arrow::array::{ArrayRef, AsArray};
use datafusion::arrow::compute::cast;
use datafusion::arrow::datatypes::{DataType, Float64Type, Int64Type, SchemaRef};
use datafusion::arrow::record_batch::RecordBatch;
use datafusion::arrow::util::pretty::pretty_format_batches;
use datafusion::logical_expr::SortExpr;
use datafusion::prelude::{col, lit, Expr, ParquetReadOptions, SessionContext};

pub use crate::config::*;
pub use crate::normalize::*;

/// Name under which the dataset is registered in the session.
const METRICS_TABLE: &str = "vote_time_metrics";

/// Key columns, in the order used to sort every result set.
const SORT_COLUMNS: [&str; 4] = ["uf", "zone_group", "zone_code", "section_code"];

/// The connection to the partitioned metrics dataset.
///
/// It is built once at startup and shared by reference. Each query blocks the
/// caller until the scan is done; queries must not be issued from inside another
/// tokio runtime.
pub struct MetricsEngine {
    runtime: tokio::runtime::Runtime,
    ctx: SessionContext,
    root: PathBuf,
    path: String,
}

impl MetricsEngine {
    /// Opens the dataset and checks that it exposes all the metric columns.
    pub fn connect(options: &StoreOptions) -> MetricsResult<MetricsEngine> {
        let path = options.dataset_root.display().to_string();
        ensure!(
            options.dataset_root.is_dir(),
            StoreUnavailableSnafu {
                path: &path,
                reason: "not a directory",
            }
        );
        let root = std::fs::canonicalize(&options.dataset_root).map_err(|e| {
            MetricsError::StoreUnavailable {
                path: path.clone(),
                reason: e.to_string(),
            }
        })?;
        // A trailing separator marks the location as a directory to list.
        let table_path = format!("{}/", root.display().to_string().trim_end_matches('/'));

        let mut rt_builder = tokio::runtime::Builder::new_multi_thread();
        if let Some(n) = options.worker_threads.filter(|n| *n > 0) {
            rt_builder.worker_threads(n);
        }
        let runtime = rt_builder.enable_all().build().context(RuntimeSnafu {})?;

        let partition_cols: Vec<(String, DataType)> = options
            .partition_columns
            .iter()
            .map(|c| (c.clone(), DataType::Utf8))
            .collect();
        let read_options = ParquetReadOptions::default().table_partition_cols(partition_cols);

        let ctx = SessionContext::new();
        info!(
            "connect: registering {:?} with partitions {:?}",
            table_path, options.partition_columns
        );
        runtime
            .block_on(ctx.register_parquet(METRICS_TABLE, &table_path, read_options))
            .context(StoreReadSnafu { path: &path })?;

        let provider = runtime
            .block_on(ctx.table_provider(METRICS_TABLE))
            .context(StoreReadSnafu { path: &path })?;
        let schema = provider.schema();
        debug!("connect: table schema {:?}", schema);
        for c in METRIC_COLUMNS {
            if schema.column_with_name(c).is_none() {
                return StoreUnavailableSnafu {
                    path: &path,
                    reason: format!("missing column {}", c),
                }
                .fail();
            }
        }

        Ok(MetricsEngine {
            runtime,
            ctx,
            root,
            path,
        })
    }

    /// Normalizes the raw filter values and returns every matching row.
    ///
    /// Selecting `ALL` states returns the per-state rows along with the
    /// precomputed national aggregate (`uf == "ALL"`); telling them apart is up to
    /// the caller.
    pub fn get_vote_time_metrics(
        &self,
        state: &str,
        round: &str,
        zone: &str,
        section: &str,
    ) -> MetricsResult<ResultSet> {
        let filter = Filter::new(state, round, zone, section).normalize()?;
        self.query(&filter)
    }

    /// Runs an already normalized filter.
    ///
    /// The dataset is listed again on every scan, so a root that went away after
    /// `connect` fails here instead of matching nothing.
    pub fn query(&self, filter: &NormalizedFilter) -> MetricsResult<ResultSet> {
        let start = Instant::now();
        ensure!(
            self.root.is_dir(),
            StoreUnavailableSnafu {
                path: &self.path,
                reason: "not a directory",
            }
        );
        let predicate = filter_predicate(filter);
        debug!("query: predicate {}", predicate);

        let df = self
            .runtime
            .block_on(self.ctx.table(METRICS_TABLE))
            .context(QueryFailedSnafu {})?
            .filter(predicate)
            .context(QueryFailedSnafu {})?
            .sort(sort_keys())
            .context(QueryFailedSnafu {})?;
        let schema: SchemaRef = df.schema().inner().clone();
        let batches = self
            .runtime
            .block_on(df.collect())
            .context(StoreReadSnafu { path: &self.path })?;

        let rs = ResultSet { schema, batches };
        info!(
            "query: turno={} uf={:?} zone_code={} section_code={}: {} rows in {:?}",
            filter.turno,
            filter.uf,
            filter.zone_code,
            filter.section_code,
            rs.num_rows(),
            start.elapsed()
        );
        Ok(rs)
    }

    /// Releases the connection. Pending scans are given a short grace period.
    pub fn close(self) {
        let MetricsEngine { runtime, ctx, path, .. } = self;
        drop(ctx);
        runtime.shutdown_timeout(Duration::from_secs(1));
        info!("close: released connection to {}", path);
    }
}

fn filter_predicate(filter: &NormalizedFilter) -> Expr {
    let ufs: Vec<Expr> = filter.uf.iter().map(|s| lit(s.as_str())).collect();
    col("turno")
        .eq(lit(filter.turno.as_str()))
        .and(col("uf").in_list(ufs, false))
        .and(col("zone_group").eq(lit(filter.zone_group.as_str())))
        .and(col("zone_code").eq(lit(filter.zone_code.as_str())))
        .and(col("section_code").eq(lit(filter.section_code.as_str())))
}

fn sort_keys() -> Vec<SortExpr> {
    SORT_COLUMNS.iter().map(|c| col(*c).sort(true, false)).collect()
}

/// The rows returned by one query, with every column of the dataset.
#[derive(PartialEq, Debug, Clone)]
pub struct ResultSet {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl ResultSet {
    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn batches(&self) -> &[RecordBatch] {
        &self.batches
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(|b| b.num_rows()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.num_rows() == 0
    }

    /// Typed view over the metric columns.
    pub fn rows(&self) -> MetricsResult<Vec<MetricsRow>> {
        let mut res: Vec<MetricsRow> = Vec::with_capacity(self.num_rows());
        for batch in self.batches.iter() {
            let uf = key_column(batch, "uf")?;
            let turno = key_column(batch, "turno")?;
            let zone_group = key_column(batch, "zone_group")?;
            let zone_code = key_column(batch, "zone_code")?;
            let section_code = key_column(batch, "section_code")?;
            let total_votos = int_column(batch, "total_votos")?;
            let total_secoes = int_column(batch, "total_secoes")?;
            let tempo_voto_medio = float_column(batch, "tempo_voto_medio")?;
            let tempo_biometria_medio = float_column(batch, "tempo_biometria_medio")?;
            for i in 0..batch.num_rows() {
                res.push(MetricsRow {
                    uf: uf[i].clone(),
                    turno: turno[i].clone(),
                    zone_group: zone_group[i].clone(),
                    zone_code: zone_code[i].clone(),
                    section_code: section_code[i].clone(),
                    total_votos: total_votos[i],
                    total_secoes: total_secoes[i],
                    tempo_voto_medio: tempo_voto_medio[i],
                    tempo_biometria_medio: tempo_biometria_medio[i],
                });
            }
        }
        Ok(res)
    }

    /// The rows as an ASCII table.
    pub fn pretty(&self) -> MetricsResult<String> {
        let table = pretty_format_batches(&self.batches).context(RenderSnafu {})?;
        Ok(table.to_string())
    }
}

fn cast_column(
    batch: &RecordBatch,
    name: &str,
    to: &DataType,
    expected: &'static str,
) -> MetricsResult<ArrayRef> {
    let malformed = MalformedResultSnafu {
        column: name,
        expected,
    };
    let arr = batch.column_by_name(name).context(malformed)?;
    cast(arr, to).ok().context(malformed)
}

// Key columns are never null.
fn key_column(batch: &RecordBatch, name: &str) -> MetricsResult<Vec<String>> {
    let arr = cast_column(batch, name, &DataType::Utf8, "string")?;
    let malformed = MalformedResultSnafu {
        column: name,
        expected: "non-null string",
    };
    let strings = arr.as_string_opt::<i32>().context(malformed)?;
    strings
        .iter()
        .map(|s| s.map(|s| s.to_string()).context(malformed))
        .collect()
}

fn int_column(batch: &RecordBatch, name: &str) -> MetricsResult<Vec<Option<i64>>> {
    let arr = cast_column(batch, name, &DataType::Int64, "integer")?;
    let ints = arr
        .as_primitive_opt::<Int64Type>()
        .context(MalformedResultSnafu {
            column: name,
            expected: "integer",
        })?;
    Ok(ints.iter().collect())
}

fn float_column(batch: &RecordBatch, name: &str) -> MetricsResult<Vec<Option<f64>>> {
    let arr = cast_column(batch, name, &DataType::Float64, "float")?;
    let floats = arr
        .as_primitive_opt::<Float64Type>()
        .context(MalformedResultSnafu {
            column: name,
            expected: "float",
        })?;
    Ok(floats.iter().collect())
}
