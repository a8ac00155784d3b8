use clap::{Parser, Subcommand};

/// Voting-time metrics for the Brazilian elections.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) JSON file with the locations of the dataset and of the logs.
    /// Options given on the command line take precedence over the file.
    #[clap(short, long, value_parser, global = true)]
    pub config: Option<String>,

    /// (directory, optional) Root of the partitioned metrics dataset.
    #[clap(long, value_parser, global = true)]
    pub dataset: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false, global = true)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Queries the metrics and prints the dashboard figures.
    Query(QueryArgs),
    /// Converts the CSV logs of one state to a Parquet file.
    Convert {
        /// Two-letter state code (ZZ for votes abroad).
        #[clap(value_parser)]
        state: String,
    },
}

#[derive(clap::Args, Debug, Clone)]
pub struct QueryArgs {
    /// (default ALL) State code.
    #[clap(long, value_parser)]
    pub uf: Option<String>,

    /// (default 1) Round, 1 or 2.
    #[clap(long, value_parser)]
    pub turno: Option<String>,

    /// (default ALL) Zone number, between 0 and 799.
    #[clap(long, value_parser)]
    pub zona: Option<String>,

    /// (default ALL) Section number, between 0 and 799.
    #[clap(long, value_parser)]
    pub secao: Option<String>,

    /// (query string, optional) Dashboard parameters such as 'uf=SP&turno=2&zona=37'.
    /// Unknown or invalid values fall back to the defaults.
    #[clap(long, value_parser)]
    pub params: Option<String>,

    /// If passed, invalid values given with --uf, --turno, --zona or --secao fall back to
    /// the defaults instead of failing.
    #[clap(long, takes_value = false)]
    pub lenient: bool,

    /// (file path, 'stdout' or empty) Where to write the JSON summary. Defaults to stdout.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference summary in JSON format. If provided, votetime checks that
    /// the computed summary matches it.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// If passed, also prints the matching rows as a table.
    #[clap(long, takes_value = false)]
    pub table: bool,
}
