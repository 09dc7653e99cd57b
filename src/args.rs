use clap::Parser;

/// This is a seat apportionment program for parliamentary elections.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file describing the input tables, the lists and the rules.
    /// Paths inside the file are relative to the location of the file.
    /// See the manual of the apportionment crate for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The table of the districts: identifier, name, number of seats and number of
    /// valid votes. Setting this option overrides the path that may be specified with --config.
    #[clap(short, long, value_parser)]
    pub districts: Option<String>,

    /// (file path) The table of the results: the votes of every list in every district.
    /// Setting this option overrides the path that may be specified with --config.
    #[clap(long, value_parser)]
    pub results: Option<String>,

    /// (default csv) The type of the input tables: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default ;) The delimiter of the CSV input tables.
    #[clap(long, value_parser)]
    pub delimiter: Option<String>,

    /// (default: first worksheet) The worksheet holding the tables, for xlsx inputs.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (default constituencial-sainte-lague) The apportionment method. One of:
    /// constituencial-dhondt, constituencial-dhondt-no-threshold, global-dhondt,
    /// global-dhondt-no-threshold, squared-dhondt, constituencial-sainte-lague,
    /// constituencial-sainte-lague-no-threshold, global-sainte-lague,
    /// global-sainte-lague-no-threshold, fair-vote-weight-dhondt
    #[clap(short, long, value_parser)]
    pub apportionment: Option<String>,

    /// (directory path, 'stdout' or empty) If specified, the seats and the additional information
    /// are written in this directory. Otherwise, or with 'stdout', the summary is printed in JSON.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) An expected summary in JSON format. When given, the run fails with a diff
    /// if the computed summary differs from it.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// Turns on debug logging.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
