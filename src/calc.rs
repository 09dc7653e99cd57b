use log::{debug, info, warn};

use apportionment::*;
use snafu::{prelude::*, ErrorCompat, Snafu};

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::calc::config_reader::*;
use crate::calc::io_common::{parse_count, simplify_file_name, RawTable};

pub mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;

#[derive(Debug, Snafu)]
pub enum CalcError {
    #[snafu(display("Error opening CSV file {path}"))]
    OpeningCsv { source: csv::Error, path: String },
    #[snafu(display("Error reading line {lineno} of {path}"))]
    CsvLine {
        source: csv::Error,
        path: String,
        lineno: usize,
    },
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Worksheet not found in {path}"))]
    MissingWorksheet { path: String },
    #[snafu(display("Cell of unexpected type in {path}, line {lineno}: {content}"))]
    ExcelWrongCellType {
        path: String,
        lineno: usize,
        content: String,
    },
    #[snafu(display("Error reading file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing JSON"))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display("Expected a positive integer in the configuration"))]
    ParsingJsonNumber {},
    #[snafu(display("Column {column:?} not found in {path}"))]
    MissingColumn { column: String, path: String },
    #[snafu(display(
        "Could not read a number from {content:?} in {path} (line {lineno}, column {column:?})"
    ))]
    ParsingNumber {
        content: String,
        path: String,
        lineno: usize,
        column: String,
    },
    #[snafu(display("Error writing {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing CSV file {path}"))]
    WritingCsv { source: csv::Error, path: String },
    #[snafu(display("Could not read the current directory"))]
    CurrentDir { source: std::io::Error },
    #[snafu(display("Could not find the directory of the configuration file"))]
    MissingParentDir {},
    #[snafu(display("Apportionment failed: {source}"))]
    Apportionment { source: ApportionmentErrors },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type CalcResult<T> = Result<T, CalcError>;

fn margin_to_json(m: &Option<LastSeatMargin>) -> JSValue {
    match m {
        Some(m) => json!(m.to_string()),
        None => JSValue::Null,
    }
}

fn strength_table_to_json(table: &[DistrictStrength]) -> Vec<JSValue> {
    table
        .iter()
        .map(|ds| {
            json!({
                "district": ds.district,
                "seats": ds.seats,
                "trueProportion": ds.true_proportion,
                "voterStrength": ds.voter_strength,
            })
        })
        .collect()
}

fn diagnostics_to_json(diagnostics: &Diagnostics) -> JSValue {
    match diagnostics {
        Diagnostics::Empty => JSValue::Null,
        Diagnostics::LastSeat(m) => json!({ "last_seat_data": margin_to_json(m) }),
        Diagnostics::LastSeatByDistrict(by_district) => {
            let mut res: JSMap<String, JSValue> = JSMap::new();
            for (label, m) in by_district.iter() {
                res.insert(label.clone(), margin_to_json(m));
            }
            JSValue::Object(res)
        }
        Diagnostics::VoteWeight(report) => json!({
            "Vote Strength before": report.before.to_string(),
            "Vote Strength after": report.after.to_string(),
            "Full comparison before": strength_table_to_json(&report.comparison_before),
            "Full comparison after": strength_table_to_json(&report.comparison_after),
            "rounding_offset": report.rounding_offset,
        }),
    }
}

fn seats_to_json(seats: &[(String, u32)]) -> Vec<JSValue> {
    seats
        .iter()
        .map(|(party, count)| json!({"party": party, "seats": count}))
        .collect()
}

fn build_summary_js(
    config: &CalcConfig,
    strategy_name: StrategyName,
    dataset: &ElectionDataset,
    result: &ApportionmentResult,
) -> JSValue {
    let contest = match &config.output_settings.contest_name {
        Some(name) => name.clone(),
        None => simplify_file_name(config.results_source.file_path.as_str()),
    };
    json!({
        "config": {
            "contest": contest,
            "apportionment": strategy_name.as_str(),
            "seats": dataset.seats(),
            "votes": dataset.votes(),
        },
        "results": seats_to_json(&result.seats),
        "additionalInfo": diagnostics_to_json(&result.diagnostics),
    })
}

fn read_table(root_p: &Path, cfs: &FileSource) -> CalcResult<RawTable> {
    let p: PathBuf = root_p.join(&cfs.file_path);
    let path = p.as_path().display().to_string();
    info!("Attempting to read table {:?}", path);
    match cfs.provider.as_str() {
        "csv" => io_csv::read_csv_table(path, cfs),
        "xlsx" | "excel" => io_excel::read_excel_table(path, cfs),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

fn read_districts(table: &RawTable, cfs: &FileSource) -> CalcResult<Vec<DistrictInfo>> {
    let id_col = cfs.id_column.as_deref().unwrap_or(DEFAULT_ID_COLUMN);
    let name_col = cfs.name_column.as_deref().unwrap_or(DEFAULT_NAME_COLUMN);
    let seats_col = cfs.seats_column.as_deref().unwrap_or(DEFAULT_SEATS_COLUMN);
    let votes_col = cfs
        .valid_votes_column
        .as_deref()
        .unwrap_or(DEFAULT_VALID_VOTES_COLUMN);
    let id_idx = table.column_index(id_col)?;
    let name_idx = table.column_index(name_col)?;
    let seats_idx = table.column_index(seats_col)?;
    let votes_idx = table.column_index(votes_col)?;

    let mut res: Vec<DistrictInfo> = Vec::new();
    for (idx, row) in table.rows.iter().enumerate() {
        let lineno = table.lineno(idx);
        if table.cell(row, id_idx).trim().is_empty() {
            debug!("read_districts: skipping line {} without identifier", lineno);
            continue;
        }
        let id = table.read_id(row, id_idx, lineno)?;
        let seats = parse_count(table.cell(row, seats_idx), &table.path, lineno, seats_col)?;
        let seats = u32::try_from(seats).ok().context(ParsingNumberSnafu {
            content: table.cell(row, seats_idx),
            path: table.path.clone(),
            lineno,
            column: seats_col,
        })?;
        let valid_votes = parse_count(table.cell(row, votes_idx), &table.path, lineno, votes_col)?;
        res.push(DistrictInfo {
            id,
            name: table.cell(row, name_idx).trim().to_string(),
            seats,
            valid_votes,
        });
    }
    info!("read_districts: {} districts in {}", res.len(), table.path);
    Ok(res)
}

type DistrictResults = Vec<(u32, Vec<(String, u64)>)>;

/// Reads the votes of every list in every district.
///
/// Returns the names of the lists, in the order of the columns, and the votes by district.
fn read_results(table: &RawTable, cfs: &FileSource) -> CalcResult<(Vec<String>, DistrictResults)> {
    let first_col = cfs.first_list_column_index()?;
    let marker = cfs.list_column_marker();
    let list_cols: Vec<(usize, String)> = table
        .header
        .iter()
        .enumerate()
        .skip(first_col)
        .filter(|(_, h)| h.contains(marker))
        .map(|(idx, h)| (idx, h.trim().to_string()))
        .collect();
    debug!("read_results: list columns: {:?}", list_cols);
    if list_cols.is_empty() {
        whatever!(
            "No list column found in {} (first column {}, marker {:?})",
            table.path,
            first_col + 1,
            marker
        )
    }
    let id_idx_o = match &cfs.id_column {
        Some(c) => Some(table.column_index(c)?),
        None => None,
    };

    let mut res: DistrictResults = Vec::new();
    let mut position: u32 = 0;
    for (idx, row) in table.rows.iter().enumerate() {
        let lineno = table.lineno(idx);
        if row.iter().all(|c| c.trim().is_empty()) {
            debug!("read_results: skipping empty line {}", lineno);
            continue;
        }
        position += 1;
        let id = match id_idx_o {
            Some(id_idx) => table.read_id(row, id_idx, lineno)?,
            None => position,
        };
        let mut votes: Vec<(String, u64)> = Vec::new();
        for (col, name) in list_cols.iter() {
            let count = parse_count(table.cell(row, *col), &table.path, lineno, name)?;
            votes.push((name.clone(), count));
        }
        debug!("read_results: district {}: {:?}", id, votes);
        res.push((id, votes));
    }
    let names = list_cols.into_iter().map(|(_, name)| name).collect();
    Ok((names, res))
}

/// Assigns a category to every list: from the explicit entries of the configuration
/// first, otherwise from the markers found in the name.
fn categorize_lists(names: &[String], config: &CalcConfig) -> CalcResult<Vec<CompetingList>> {
    let mut explicit: HashMap<&str, ListCategory> = HashMap::new();
    for entry in config.lists.iter() {
        explicit.insert(entry.name.as_str(), entry.category()?);
        if !names.contains(&entry.name) {
            warn!(
                "categorize_lists: list {:?} from the configuration is not in the results",
                entry.name
            );
        }
    }
    let coalition_marker = config.category_markers.coalition();
    let minority_marker = config.category_markers.minority();

    let res: Vec<CompetingList> = names
        .iter()
        .map(|name| {
            let category = match explicit.get(name.as_str()) {
                Some(c) => *c,
                None if name.contains(minority_marker) => ListCategory::Minority,
                None if name.contains(coalition_marker) => ListCategory::Coalition,
                None => ListCategory::Ordinary,
            };
            CompetingList::new(name, category)
        })
        .collect();
    debug!("categorize_lists: {:?}", res);
    Ok(res)
}

fn load_dataset(config: &CalcConfig, root_p: &Path) -> CalcResult<ElectionDataset> {
    let district_table = read_table(root_p, &config.district_source)?;
    let districts = read_districts(&district_table, &config.district_source)?;
    let results_table = read_table(root_p, &config.results_source)?;
    let (names, results) = read_results(&results_table, &config.results_source)?;
    let lists = categorize_lists(&names, config)?;

    let mut builder = DatasetBuilder::new()
        .lists(&lists)
        .context(ApportionmentSnafu {})?;
    for d in districts {
        builder.add_district(d).context(ApportionmentSnafu {})?;
    }
    for (id, votes) in results.iter() {
        builder
            .add_results(*id, votes)
            .context(ApportionmentSnafu {})?;
    }
    builder.build().context(ApportionmentSnafu {})
}

fn absolute_path(p: &str) -> CalcResult<String> {
    let cwd = std::env::current_dir().context(CurrentDirSnafu {})?;
    Ok(cwd.join(p).display().to_string())
}

/// Reads the configuration (if any) and applies the command line overrides.
///
/// Returns the configuration and the directory the paths of the configuration are relative to.
fn resolve_config(args: &Args) -> CalcResult<(CalcConfig, PathBuf)> {
    let (mut config, root_p) = match &args.config {
        Some(config_path) => {
            let config = read_config(config_path)?;
            let root_p = Path::new(config_path.as_str())
                .parent()
                .context(MissingParentDirSnafu {})?
                .to_path_buf();
            (config, root_p)
        }
        None => match (&args.districts, &args.results) {
            (Some(_), Some(_)) => (CalcConfig::default_for("", ""), PathBuf::new()),
            _ => whatever!("Both --districts and --results are required when no --config is given"),
        },
    };

    if let Some(p) = &args.districts {
        config.district_source.file_path = absolute_path(p)?;
    }
    if let Some(p) = &args.results {
        config.results_source.file_path = absolute_path(p)?;
    }
    for cfs in [&mut config.district_source, &mut config.results_source] {
        if let Some(x) = &args.input_type {
            cfs.provider = x.clone();
        }
        if let Some(x) = &args.delimiter {
            cfs.delimiter = Some(x.clone());
        }
        if let Some(x) = &args.excel_worksheet_name {
            cfs.excel_worksheet_name = Some(x.clone());
        }
    }
    if let Some(x) = &args.apportionment {
        config.rules.apportionment = Some(x.clone());
    }
    match args.out.as_deref() {
        None => {}
        Some(x) if x.is_empty() || x == "stdout" => {
            config.output_settings.output_directory = Some(x.to_string());
        }
        // Relative to the current directory, unlike an outputDirectory from the file.
        Some(x) => {
            config.output_settings.output_directory = Some(absolute_path(x)?);
        }
    }
    Ok((config, root_p))
}

fn write_outputs(
    out_dir: &str,
    strategy_name: StrategyName,
    result: &ApportionmentResult,
) -> CalcResult<()> {
    fs::create_dir_all(out_dir).context(WritingOutputSnafu { path: out_dir })?;

    let seats_p = Path::new(out_dir).join(format!("{}-seats.csv", strategy_name));
    let seats_path = seats_p.display().to_string();
    let mut wtr = csv::Writer::from_path(&seats_p).context(WritingCsvSnafu {
        path: seats_path.clone(),
    })?;
    wtr.write_record(["party", "seats"])
        .context(WritingCsvSnafu {
            path: seats_path.clone(),
        })?;
    for (party, seats) in result.seats.iter() {
        wtr.write_record([party.clone(), seats.to_string()])
            .context(WritingCsvSnafu {
                path: seats_path.clone(),
            })?;
    }
    wtr.flush().context(WritingOutputSnafu {
        path: seats_path.clone(),
    })?;
    info!("Seats written to {}", seats_path);

    let info_p = Path::new(out_dir).join(format!("{}-additional-info.json", strategy_name));
    let info_path = info_p.display().to_string();
    let pretty_js = serde_json::to_string_pretty(&diagnostics_to_json(&result.diagnostics))
        .context(ParsingJsonSnafu {})?;
    fs::write(&info_p, pretty_js).context(WritingOutputSnafu {
        path: info_path.clone(),
    })?;
    info!("Additional information written to {}", info_path);
    Ok(())
}

fn check_reference(summary_p: &str, summary: &JSValue) -> CalcResult<()> {
    let summary_ref = read_summary(summary_p)?;
    debug!("reference summary: {:?}", summary_ref);
    if summary_ref != *summary {
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        let pretty_js_stats = serde_json::to_string_pretty(summary).context(ParsingJsonSnafu {})?;
        warn!("Found differences with the reference summary");
        print_diff(
            pretty_js_summary_ref.as_str(),
            pretty_js_stats.as_ref(),
            "\n",
        );
        whatever!("Difference detected between calculated summary and reference summary")
    }
    Ok(())
}

/// Runs an apportionment as described by the command line and returns its summary.
pub fn run_apportionment(args: &Args) -> CalcResult<JSValue> {
    let (config, root_p) = resolve_config(args)?;
    info!("config: {:?}", config);

    let strategy_name = config.rules.strategy_name()?;
    let strategy = strategy_name.strategy_with(config.rules.rounding_rules());

    let dataset = load_dataset(&config, &root_p)?;
    let result = calculate(&dataset, &strategy).context(ApportionmentSnafu {})?;
    info!("result: {:?}", result.seats);

    let summary = build_summary_js(&config, strategy_name, &dataset, &result);

    match config.output_settings.output_directory.as_deref() {
        None | Some("") | Some("stdout") => {
            let pretty_js = serde_json::to_string_pretty(&summary).context(ParsingJsonSnafu {})?;
            println!("{}", pretty_js);
        }
        Some(out_dir) => {
            let out_p = root_p.join(out_dir);
            write_outputs(&out_p.display().to_string(), strategy_name, &result)?;
        }
    }

    if let Some(summary_p) = &args.reference {
        check_reference(summary_p, &summary)?;
    }

    Ok(summary)
}

/// Prints an error and its trace, if any.
pub fn report_error(e: &CalcError) {
    warn!("Error occured {:?}", e);
    eprintln!("An error occured: {}", e);
    if let Some(bt) = ErrorCompat::backtrace(e) {
        eprintln!("trace: {}", bt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(name: &str) -> String {
        format!("{}/tests/fixtures/{}", env!("CARGO_MANIFEST_DIR"), name)
    }

    fn args_for(apportionment: &str) -> Args {
        Args {
            config: Some(fixture("sejm_mini/sejm_mini_config.json")),
            apportionment: Some(apportionment.to_string()),
            out: Some("stdout".to_string()),
            ..Args::default()
        }
    }

    fn run_reference_test(apportionment: &str) {
        let args = Args {
            reference: Some(fixture(&format!(
                "sejm_mini/{}_expected_summary.json",
                apportionment
            ))),
            ..args_for(apportionment)
        };
        let res = run_apportionment(&args);
        if let Err(e) = &res {
            report_error(e);
        }
        assert!(res.is_ok());
    }

    #[test]
    fn constituencial_dhondt_summary() {
        run_reference_test("constituencial-dhondt");
    }

    #[test]
    fn global_sainte_lague_summary() {
        run_reference_test("global-sainte-lague");
    }

    #[test]
    fn excel_input_summary() {
        let args = Args {
            config: Some(fixture("sejm_mini/sejm_mini_xlsx_config.json")),
            out: Some("stdout".to_string()),
            reference: Some(fixture(
                "sejm_mini/constituencial-dhondt_expected_summary.json",
            )),
            ..Args::default()
        };
        let res = run_apportionment(&args);
        if let Err(e) = &res {
            report_error(e);
        }
        assert!(res.is_ok());
    }

    #[test]
    fn missing_parent_dir_has_a_message() {
        assert_eq!(
            CalcError::MissingParentDir {}.to_string(),
            "Could not find the directory of the configuration file"
        );
    }

    #[test]
    fn global_dhondt_reports_the_last_seat() {
        let summary = run_apportionment(&args_for("global-dhondt")).unwrap();
        assert_eq!(summary["config"]["seats"], json!(10));
        assert_eq!(summary["config"]["votes"], json!(2020));
        assert_eq!(
            summary["additionalInfo"]["last_seat_data"],
            json!("KOMITET WYBORCZY A won last seat over KOMITET WYBORCZY B by 100 votes")
        );
    }

    #[test]
    fn categories_follow_the_markers() {
        // The coalition C has 7.4% of the votes: it only takes part without threshold.
        let summary = run_apportionment(&args_for("global-sainte-lague-no-threshold")).unwrap();
        let parties: Vec<&str> = summary["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["party"].as_str().unwrap())
            .collect();
        assert_eq!(parties.len(), 5);
        assert_eq!(
            summary["results"][2],
            json!({"party": "KOALICYJNY KOMITET WYBORCZY C", "seats": 1})
        );

        let summary = run_apportionment(&args_for("global-sainte-lague")).unwrap();
        let parties: Vec<&str> = summary["results"]
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["party"].as_str().unwrap())
            .collect();
        assert_eq!(
            parties,
            vec![
                "KOMITET WYBORCZY A",
                "KOMITET WYBORCZY B",
                "KOMITET WYBORCZY MNIEJSZOŚĆ D"
            ]
        );
    }

    #[test]
    fn fair_vote_weight_reports_both_comparisons() {
        let summary = run_apportionment(&args_for("fair-vote-weight-dhondt")).unwrap();
        let info = &summary["additionalInfo"];
        assert!(info["Vote Strength before"]
            .as_str()
            .unwrap()
            .starts_with("Voters in "));
        assert_eq!(info["Full comparison before"].as_array().unwrap().len(), 3);
        assert_eq!(info["Full comparison after"].as_array().unwrap().len(), 3);
        assert_eq!(info["rounding_offset"], json!(0.0));
        assert_eq!(summary["results"][0]["seats"], json!(7));
    }

    #[test]
    fn command_line_paths_without_config() {
        let args = Args {
            districts: Some(fixture("sejm_mini/districts.csv")),
            results: Some(fixture("sejm_mini/results.csv")),
            apportionment: Some("constituencial-dhondt".to_string()),
            ..Args::default()
        };
        // The default layout of the results starts at the 26th column: nothing is found.
        assert!(run_apportionment(&args).is_err());
    }

    #[test]
    fn writes_the_output_files() {
        let out_dir = std::env::temp_dir().join("seatcalc-test-output");
        let args = Args {
            out: Some(out_dir.display().to_string()),
            ..args_for("global-dhondt")
        };
        run_apportionment(&args).unwrap();

        let seats = fs::read_to_string(out_dir.join("global-dhondt-seats.csv")).unwrap();
        let lines: Vec<&str> = seats.lines().collect();
        assert_eq!(
            lines,
            vec![
                "party,seats",
                "KOMITET WYBORCZY A,6",
                "KOMITET WYBORCZY B,4",
                "KOMITET WYBORCZY MNIEJSZOŚĆ D,0"
            ]
        );
        let info = read_summary(
            out_dir
                .join("global-dhondt-additional-info.json")
                .display()
                .to_string()
                .as_str(),
        )
        .unwrap();
        assert_eq!(
            info,
            json!({"last_seat_data": "KOMITET WYBORCZY A won last seat over KOMITET WYBORCZY B by 100 votes"})
        );
    }

    #[test]
    fn relative_out_is_resolved_against_the_current_directory() {
        let out_rel = "target/seatcalc-test-relative-out";
        let args = Args {
            out: Some(out_rel.to_string()),
            ..args_for("global-sainte-lague")
        };
        run_apportionment(&args).unwrap();

        let cwd = std::env::current_dir().unwrap();
        assert!(cwd
            .join(out_rel)
            .join("global-sainte-lague-seats.csv")
            .exists());
        assert!(!Path::new(&fixture("sejm_mini"))
            .join(out_rel)
            .exists());
    }

    #[test]
    fn unknown_strategy_is_an_error() {
        let res = run_apportionment(&args_for("largest-remainder"));
        assert!(matches!(
            res,
            Err(CalcError::Apportionment {
                source: ApportionmentErrors::UnknownStrategy(_)
            })
        ));
    }

    #[test]
    fn reference_mismatch_is_an_error() {
        let args = Args {
            reference: Some(fixture(
                "sejm_mini/constituencial-dhondt_expected_summary.json",
            )),
            ..args_for("global-dhondt")
        };
        assert!(run_apportionment(&args).is_err());
    }
}
