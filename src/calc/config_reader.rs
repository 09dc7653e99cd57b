use crate::calc::*;

use serde::{Deserialize, Serialize};
use serde_json::Value as JSValue;

// Defaults following the files published for the elections to the Polish Sejm.
pub const DEFAULT_ID_COLUMN: &str = "Numer okręgu";
pub const DEFAULT_NAME_COLUMN: &str = "Siedziba OKW";
pub const DEFAULT_SEATS_COLUMN: &str = "Liczba mandatów";
pub const DEFAULT_VALID_VOTES_COLUMN: &str =
    "Liczba głosów ważnych oddanych łącznie na wszystkie listy kandydatów";
/// 1-based, as in spreadsheets.
pub const DEFAULT_FIRST_LIST_COLUMN_INDEX: usize = 26;
pub const DEFAULT_LIST_COLUMN_MARKER: &str = "KOMITET";
pub const DEFAULT_COALITION_MARKER: &str = "KOALICYJNY";
pub const DEFAULT_MINORITY_MARKER: &str = "MNIEJSZOŚĆ";
pub const DEFAULT_APPORTIONMENT: StrategyName = StrategyName::ConstituencialSainteLague;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct OutputSettings {
    #[serde(rename = "contestName")]
    pub contest_name: Option<String>,
    #[serde(rename = "outputDirectory")]
    pub output_directory: Option<String>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct FileSource {
    pub provider: String,
    #[serde(rename = "filePath")]
    pub file_path: String,
    pub delimiter: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "idColumn")]
    pub id_column: Option<String>,
    #[serde(rename = "nameColumn")]
    pub name_column: Option<String>,
    #[serde(rename = "seatsColumn")]
    pub seats_column: Option<String>,
    #[serde(rename = "validVotesColumn")]
    pub valid_votes_column: Option<String>,
    #[serde(rename = "firstListColumnIndex")]
    _first_list_column_index: Option<JSValue>,
    #[serde(rename = "listColumnMarker")]
    pub list_column_marker: Option<String>,
}

impl FileSource {
    pub fn new(provider: &str, file_path: &str) -> FileSource {
        FileSource {
            provider: provider.to_string(),
            file_path: file_path.to_string(),
            delimiter: None,
            excel_worksheet_name: None,
            id_column: None,
            name_column: None,
            seats_column: None,
            valid_votes_column: None,
            _first_list_column_index: None,
            list_column_marker: None,
        }
    }

    /// The index (0-based) of the first column that may hold the votes of a list.
    pub fn first_list_column_index(&self) -> CalcResult<usize> {
        let x = match &self._first_list_column_index {
            None => DEFAULT_FIRST_LIST_COLUMN_INDEX,
            Some(_) => read_js_int(&self._first_list_column_index)?,
        };
        if x == 0 {
            whatever!("firstListColumnIndex starts at 1, got 0")
        }
        Ok(x - 1)
    }

    pub fn list_column_marker(&self) -> &str {
        self.list_column_marker
            .as_deref()
            .unwrap_or(DEFAULT_LIST_COLUMN_MARKER)
    }

    pub fn delimiter(&self) -> CalcResult<u8> {
        match self.delimiter.as_deref() {
            None => Ok(b';'),
            Some("\\t") | Some("tab") => Ok(b'\t'),
            Some(s) if s.len() == 1 => Ok(s.as_bytes()[0]),
            Some(s) => whatever!("Delimiter must be a single ASCII character, got {:?}", s),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct ListEntry {
    pub name: String,
    pub category: String,
}

impl ListEntry {
    pub fn category(&self) -> CalcResult<ListCategory> {
        match self.category.as_str() {
            "ordinary" => Ok(ListCategory::Ordinary),
            "coalition" => Ok(ListCategory::Coalition),
            "minority" => Ok(ListCategory::Minority),
            x => whatever!("Unknown category {:?} for list {:?}", x, self.name),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct CategoryMarkers {
    pub coalition: Option<String>,
    pub minority: Option<String>,
}

impl CategoryMarkers {
    pub fn coalition(&self) -> &str {
        self.coalition.as_deref().unwrap_or(DEFAULT_COALITION_MARKER)
    }

    pub fn minority(&self) -> &str {
        self.minority.as_deref().unwrap_or(DEFAULT_MINORITY_MARKER)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct CalcRules {
    pub apportionment: Option<String>,
    #[serde(rename = "roundingMaxIterations")]
    pub rounding_max_iterations: Option<u32>,
}

impl CalcRules {
    pub fn strategy_name(&self) -> CalcResult<StrategyName> {
        match &self.apportionment {
            None => Ok(DEFAULT_APPORTIONMENT),
            Some(s) => s.parse::<StrategyName>().context(ApportionmentSnafu {}),
        }
    }

    pub fn rounding_rules(&self) -> RoundingRules {
        match self.rounding_max_iterations {
            Some(max_iterations) => RoundingRules { max_iterations },
            None => RoundingRules::DEFAULT_RULES,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CalcConfig {
    #[serde(rename = "outputSettings", default)]
    pub output_settings: OutputSettings,
    #[serde(rename = "districtSource")]
    pub district_source: FileSource,
    #[serde(rename = "resultsSource")]
    pub results_source: FileSource,
    #[serde(default)]
    pub lists: Vec<ListEntry>,
    #[serde(rename = "categoryMarkers", default)]
    pub category_markers: CategoryMarkers,
    #[serde(default)]
    pub rules: CalcRules,
}

impl CalcConfig {
    /// A configuration with all the defaults, reading two CSV files.
    pub fn default_for(districts_path: &str, results_path: &str) -> CalcConfig {
        CalcConfig {
            output_settings: OutputSettings::default(),
            district_source: FileSource::new("csv", districts_path),
            results_source: FileSource::new("csv", results_path),
            lists: Vec::new(),
            category_markers: CategoryMarkers::default(),
            rules: CalcRules::default(),
        }
    }
}

pub fn read_config(path: &str) -> CalcResult<CalcConfig> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    let config: CalcConfig = serde_json::from_str(&contents).context(ParsingJsonSnafu {})?;
    Ok(config)
}

pub fn read_summary(path: &str) -> CalcResult<JSValue> {
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path })?;
    debug!("read content: {:?}", contents);
    let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
    Ok(js)
}

fn read_js_int(x: &Option<JSValue>) -> CalcResult<usize> {
    match x {
        Some(JSValue::Number(n)) => n
            .as_u64()
            .map(|x| x as usize)
            .context(ParsingJsonNumberSnafu {}),
        Some(JSValue::String(s)) => s.parse::<usize>().ok().context(ParsingJsonNumberSnafu {}),
        _ => None.context(ParsingJsonNumberSnafu {}),
    }
}
