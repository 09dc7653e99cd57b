use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};

pub use crate::config::*;

/// The metadata of one district, as provided by the electoral commission.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DistrictInfo {
    pub id: u32,
    pub name: String,
    pub seats: u32,
    pub valid_votes: u64,
}

/// One row of the election dataset: a district, or the nationwide total.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct DistrictRow {
    pub id: u32,
    pub name: String,
    pub seats: u32,
    pub valid_votes: u64,
    /// Votes for each list, aligned with the lists of the dataset.
    pub votes: Vec<u64>,
}

impl DistrictRow {
    /// The label used to report per-district information.
    pub fn label(&self) -> String {
        format!("C-{} ({})", self.id, self.name)
    }
}

/// The joined results of an election.
///
/// Invariant: the total row is the column-wise sum of the district rows.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ElectionDataset {
    lists: Vec<CompetingList>,
    districts: Vec<DistrictRow>,
    total: DistrictRow,
}

pub const TOTAL_ROW_NAME: &str = "Total";

impl ElectionDataset {
    pub fn lists(&self) -> &[CompetingList] {
        &self.lists
    }

    /// The districts, by increasing identifier.
    pub fn districts(&self) -> &[DistrictRow] {
        &self.districts
    }

    pub fn total(&self) -> &DistrictRow {
        &self.total
    }

    /// The number of seats available nationwide.
    pub fn seats(&self) -> u32 {
        self.total.seats
    }

    /// The number of valid votes cast nationwide.
    pub fn votes(&self) -> u64 {
        self.total.valid_votes
    }

    /// The indexes of the lists that take part in the allocation under the given policy.
    ///
    /// The threshold is always evaluated against the nationwide totals.
    pub fn eligible_lists(&self, policy: ThresholdPolicy) -> Vec<usize> {
        let res: Vec<usize> = self
            .lists
            .iter()
            .enumerate()
            .filter(|(idx, l)| policy.accepts(l, self.total.votes[*idx], self.total.valid_votes))
            .map(|(idx, _)| idx)
            .collect();
        info!(
            "eligible_lists: {} of {} lists pass the threshold policy {:?}",
            res.len(),
            self.lists.len(),
            policy
        );
        res
    }
}

/// A builder that joins the district metadata with the results per district.
///
/// ```
/// use apportionment::dataset::*;
///
/// let mut builder = DatasetBuilder::new().lists(&[
///     CompetingList::ordinary("A"),
///     CompetingList::new("B", ListCategory::Minority),
/// ])?;
/// builder.add_district(DistrictInfo { id: 1, name: "North".to_string(), seats: 3, valid_votes: 110 })?;
/// builder.add_results(1, &[("A".to_string(), 100), ("B".to_string(), 10)])?;
/// let dataset = builder.build()?;
/// assert_eq!(dataset.seats(), 3);
/// assert_eq!(dataset.total().votes, vec![100, 10]);
///
/// # Ok::<(), ApportionmentErrors>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct DatasetBuilder {
    _lists: Vec<CompetingList>,
    _districts: BTreeMap<u32, DistrictInfo>,
    _results: BTreeMap<u32, HashMap<String, u64>>,
}

impl DatasetBuilder {
    pub fn new() -> DatasetBuilder {
        DatasetBuilder::default()
    }

    /// Registers the competing lists. Their order is kept in all the outputs.
    pub fn lists(self, lists: &[CompetingList]) -> Result<DatasetBuilder, ApportionmentErrors> {
        let mut seen: HashSet<&str> = HashSet::new();
        for l in lists.iter() {
            if !seen.insert(l.name.as_str()) {
                return Err(ApportionmentErrors::DuplicateList(l.name.clone()));
            }
        }
        Ok(DatasetBuilder {
            _lists: lists.to_vec(),
            ..self
        })
    }

    /// Adds the metadata of a district. A second call for the same district replaces the first one.
    pub fn add_district(&mut self, info: DistrictInfo) -> Result<(), ApportionmentErrors> {
        if let Some(previous) = self._districts.insert(info.id, info) {
            warn!(
                "add_district: district {} was provided twice, keeping the last entry",
                previous.id
            );
        }
        Ok(())
    }

    /// Adds the votes of some lists in a district. Votes provided several times are added up.
    pub fn add_results(
        &mut self,
        district_id: u32,
        votes: &[(String, u64)],
    ) -> Result<(), ApportionmentErrors> {
        let row = self._results.entry(district_id).or_default();
        for (name, count) in votes.iter() {
            if !self._lists.iter().any(|l| l.name == *name) {
                return Err(ApportionmentErrors::UnknownList(name.clone()));
            }
            let entry = row.entry(name.clone()).or_insert(0);
            *entry = entry
                .checked_add(*count)
                .ok_or_else(|| ApportionmentErrors::CountOverflow(name.clone()))?;
        }
        Ok(())
    }

    /// Joins the metadata and the results.
    ///
    /// Districts that only appear on one side are kept: the missing values are
    /// filled with zeros.
    pub fn build(self) -> Result<ElectionDataset, ApportionmentErrors> {
        if self._lists.is_empty() {
            return Err(ApportionmentErrors::EmptyElection);
        }
        let ids: BTreeSet<u32> = self
            ._districts
            .keys()
            .chain(self._results.keys())
            .cloned()
            .collect();
        if ids.is_empty() {
            return Err(ApportionmentErrors::EmptyElection);
        }

        let mut districts: Vec<DistrictRow> = Vec::new();
        for id in ids {
            let info = match self._districts.get(&id) {
                Some(info) => info.clone(),
                None => {
                    warn!("build: district {} has results but no metadata, using zero seats", id);
                    DistrictInfo {
                        id,
                        name: String::new(),
                        seats: 0,
                        valid_votes: 0,
                    }
                }
            };
            let votes: Vec<u64> = match self._results.get(&id) {
                Some(res) => self
                    ._lists
                    .iter()
                    .map(|l| res.get(&l.name).cloned().unwrap_or(0))
                    .collect(),
                None => {
                    warn!("build: district {} has no results, using zero votes", id);
                    vec![0; self._lists.len()]
                }
            };
            debug!("build: district {:?} votes: {:?}", info, votes);
            districts.push(DistrictRow {
                id: info.id,
                name: info.name,
                seats: info.seats,
                valid_votes: info.valid_votes,
                votes,
            });
        }

        let mut total = DistrictRow {
            id: 0,
            name: TOTAL_ROW_NAME.to_string(),
            seats: 0,
            valid_votes: 0,
            votes: vec![0; self._lists.len()],
        };
        for d in districts.iter() {
            total.seats = total
                .seats
                .checked_add(d.seats)
                .ok_or_else(|| ApportionmentErrors::CountOverflow("seats".to_string()))?;
            total.valid_votes = total
                .valid_votes
                .checked_add(d.valid_votes)
                .ok_or_else(|| ApportionmentErrors::CountOverflow("valid votes".to_string()))?;
            for ((t, v), l) in total
                .votes
                .iter_mut()
                .zip(d.votes.iter())
                .zip(self._lists.iter())
            {
                *t = t
                    .checked_add(*v)
                    .ok_or_else(|| ApportionmentErrors::CountOverflow(l.name.clone()))?;
            }
        }
        info!(
            "build: {} districts, {} lists, {} seats, {} valid votes",
            districts.len(),
            self._lists.len(),
            total.seats,
            total.valid_votes
        );

        Ok(ElectionDataset {
            lists: self._lists,
            districts,
            total,
        })
    }
}
