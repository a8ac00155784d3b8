use crate::dash::*;

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

pub const DEFAULT_LOGS_ROOT: &str = "/data/logs";

/// The configuration file. Every entry is optional.
///
/// Relative paths are resolved against the directory holding the file.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct DashConfig {
    #[serde(rename = "datasetRoot")]
    pub dataset_root: Option<String>,
    #[serde(rename = "logsRoot")]
    pub logs_root: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
    #[serde(rename = "csvDelimiter")]
    pub csv_delimiter: Option<String>,
    #[serde(rename = "partitionColumns")]
    pub partition_columns: Option<Vec<String>>,
    #[serde(rename = "workerThreads")]
    pub worker_threads: Option<usize>,
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl DashConfig {
    fn resolve(&self, path: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) if Path::new(path).is_relative() => base.join(path),
            _ => PathBuf::from(path),
        }
    }

    pub fn store_options(&self) -> StoreOptions {
        let mut options = match &self.dataset_root {
            Some(root) => StoreOptions::new(self.resolve(root)),
            None => StoreOptions::default(),
        };
        if let Some(cols) = &self.partition_columns {
            options.partition_columns = cols.clone();
        }
        options.worker_threads = self.worker_threads;
        options
    }

    pub fn logs_root(&self) -> PathBuf {
        self.resolve(self.logs_root.as_deref().unwrap_or(DEFAULT_LOGS_ROOT))
    }

    /// Where the converted files go. Defaults to the working directory.
    pub fn output_directory(&self) -> PathBuf {
        self.resolve(self.output_directory.as_deref().unwrap_or("."))
    }

    pub fn csv_delimiter(&self) -> DashResult<u8> {
        match self.csv_delimiter.as_deref() {
            None => Ok(b','),
            Some("\\t") => Ok(b'\t'),
            Some(s) if s.len() == 1 && s.is_ascii() => Ok(s.as_bytes()[0]),
            Some(s) => whatever!("csvDelimiter must be a single ASCII character, got {:?}", s),
        }
    }
}

pub fn read_config(path: &str) -> DashResult<DashConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let mut config: DashConfig =
        serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    config.base_dir = Path::new(path).parent().map(|p| p.to_path_buf());
    info!("config: {:?}", config);
    Ok(config)
}
