// One-shot conversion of the CSV logs of a state to Parquet.

use std::path::{Path, PathBuf};
use std::time::Instant;

use datafusion::dataframe::{DataFrame, DataFrameWriteOptions};
use datafusion::prelude::{lit, CsvReadOptions, SessionContext};

use crate::dash::*;

/// Column added to every converted row, holding the path of its source log.
pub const FILENAME_COLUMN: &str = "filename";

/// Reads `<logs_root>/2_<state>/*.csv` and writes `<output_directory>/<state>.parquet`.
///
/// Each log comes from one voting machine, so every row keeps the path of the
/// file it was read from in the `filename` column. Returns the path of the
/// written file.
pub fn convert_state(state: &str, config: &DashConfig) -> DashResult<PathBuf> {
    ensure!(is_known_state(state), InvalidStateSnafu { state });

    let input_dir = config.logs_root().join(format!("2_{}", state));
    ensure_whatever!(
        input_dir.is_dir(),
        "No logs found for {} in {}",
        state,
        input_dir.display()
    );
    let files = list_logs(&input_dir)?;
    let Some((first, rest)) = files.split_first() else {
        whatever!("No CSV logs for {} in {}", state, input_dir.display())
    };

    let output_dir = config.output_directory();
    fs::create_dir_all(&output_dir).context(WritingOutputSnafu {
        path: output_dir.display().to_string(),
    })?;
    let output = output_dir.join(format!("{}.parquet", state));

    let delimiter = config.csv_delimiter()?;
    let output_path = output.display().to_string();
    info!(
        "convert_state: {} files in {} -> {}",
        files.len(),
        input_dir.display(),
        output_path
    );

    let start = Instant::now();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context(ConversionRuntimeSnafu {})?;
    let ctx = SessionContext::new();
    runtime
        .block_on(async {
            let mut df = read_log(&ctx, first, delimiter).await?;
            for path in rest {
                df = df.union(read_log(&ctx, path, delimiter).await?)?;
            }
            df.write_parquet(
                output_path.as_str(),
                DataFrameWriteOptions::new().with_single_file_output(true),
                None,
            )
            .await
        })
        .context(ConversionSnafu { state })?;

    info!(
        "Time taken to convert {} to parquet: {:?}",
        state,
        start.elapsed()
    );
    Ok(output)
}

/// The `.csv` files directly under `dir`, sorted by path.
fn list_logs(dir: &Path) -> DashResult<Vec<String>> {
    let path = dir.display().to_string();
    let mut files: Vec<String> = Vec::new();
    for entry in fs::read_dir(dir).context(ReadingLogsSnafu { path: &path })? {
        let p = entry.context(ReadingLogsSnafu { path: &path })?.path();
        if p.is_file() && p.extension().map_or(false, |e| e == "csv") {
            files.push(p.display().to_string());
        }
    }
    files.sort();
    debug!("list_logs: {:?}", files);
    Ok(files)
}

async fn read_log(
    ctx: &SessionContext,
    path: &str,
    delimiter: u8,
) -> datafusion::error::Result<DataFrame> {
    let options = CsvReadOptions::new()
        .has_header(true)
        .delimiter(delimiter)
        .file_extension(".csv");
    ctx.read_csv(path, options)
        .await?
        .with_column(FILENAME_COLUMN, lit(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use datafusion::arrow::array::AsArray;
    use datafusion::arrow::compute::cast;
    use datafusion::arrow::datatypes::{DataType, Int64Type};
    use datafusion::parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
    use datafusion::parquet::file::reader::{FileReader, SerializedFileReader};
    use std::fs::File;
    use tempfile::TempDir;

    fn config(dir: &TempDir) -> DashConfig {
        DashConfig {
            logs_root: Some(dir.path().join("logs").display().to_string()),
            output_directory: Some(dir.path().join("out").display().to_string()),
            csv_delimiter: Some(";".to_string()),
            ..DashConfig::default()
        }
    }

    // (source file name, zone_code) for every row of a converted file.
    fn row_sources(path: &Path) -> Vec<(String, i64)> {
        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let mut res = Vec::new();
        for batch in reader {
            let batch = batch.unwrap();
            let names = cast(batch.column_by_name(FILENAME_COLUMN).unwrap(), &DataType::Utf8)
                .unwrap();
            let zones = cast(batch.column_by_name("zone_code").unwrap(), &DataType::Int64)
                .unwrap();
            let names = names.as_string::<i32>();
            let zones = zones.as_primitive::<Int64Type>();
            for i in 0..batch.num_rows() {
                let name = Path::new(names.value(i))
                    .file_name()
                    .unwrap()
                    .to_string_lossy()
                    .to_string();
                res.push((name, zones.value(i)));
            }
        }
        res.sort();
        res
    }

    #[test]
    fn converts_every_csv_of_the_state() {
        let _ = env_logger::builder().is_test(true).try_init();
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs").join("2_SP");
        fs::create_dir_all(&logs).unwrap();
        let header = "zone_code;section_code;tempo_voto\n";
        fs::write(logs.join("a.csv"), format!("{}37;5;61\n37;5;80\n", header)).unwrap();
        fs::write(logs.join("b.csv"), format!("{}38;1;45\n", header)).unwrap();
        fs::write(logs.join("notes.txt"), "ignored").unwrap();

        let out = convert_state("SP", &config(&dir)).unwrap();
        assert_eq!(out, dir.path().join("out").join("SP.parquet"));

        let reader = SerializedFileReader::new(File::open(&out).unwrap()).unwrap();
        assert_eq!(reader.metadata().file_metadata().num_rows(), 3);
        let columns: Vec<String> = reader
            .metadata()
            .file_metadata()
            .schema_descr()
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(
            columns,
            vec!["zone_code", "section_code", "tempo_voto", FILENAME_COLUMN]
        );

        assert_eq!(
            row_sources(&out),
            vec![
                ("a.csv".to_string(), 37),
                ("a.csv".to_string(), 37),
                ("b.csv".to_string(), 38),
            ]
        );
    }

    #[test]
    fn filename_is_the_full_log_path() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs").join("2_AC");
        fs::create_dir_all(&logs).unwrap();
        fs::write(logs.join("urna_1.csv"), "zone_code;section_code\n1;2\n").unwrap();

        let out = convert_state("AC", &config(&dir)).unwrap();
        let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(&out).unwrap())
            .unwrap()
            .build()
            .unwrap();
        let batches: Vec<_> = reader.map(|b| b.unwrap()).collect();
        let names = cast(
            batches[0].column_by_name(FILENAME_COLUMN).unwrap(),
            &DataType::Utf8,
        )
        .unwrap();
        assert_eq!(
            names.as_string::<i32>().value(0),
            logs.join("urna_1.csv").display().to_string()
        );
    }

    #[test]
    fn rejects_unknown_state() {
        let dir = TempDir::new().unwrap();
        let e = convert_state("XX", &config(&dir)).unwrap_err();
        assert!(matches!(e, DashError::InvalidState { .. }), "{:?}", e);
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn missing_logs() {
        let dir = TempDir::new().unwrap();
        let e = convert_state("RJ", &config(&dir)).unwrap_err();
        assert!(matches!(e, DashError::Whatever { .. }), "{:?}", e);
    }

    #[test]
    fn directory_without_csv() {
        let dir = TempDir::new().unwrap();
        let logs = dir.path().join("logs").join("2_RJ");
        fs::create_dir_all(&logs).unwrap();
        fs::write(logs.join("notes.txt"), "ignored").unwrap();
        let e = convert_state("RJ", &config(&dir)).unwrap_err();
        assert!(matches!(e, DashError::Whatever { .. }), "{:?}", e);
        assert!(!dir.path().join("out").exists());
    }
}
