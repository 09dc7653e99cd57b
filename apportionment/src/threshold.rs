use log::debug;

use crate::config::*;

/// Minimum share (in percent of the valid votes) for an ordinary list.
pub const ORDINARY_THRESHOLD_PERCENT: u64 = 5;
/// Minimum share (in percent of the valid votes) for a coalition list.
pub const COALITION_THRESHOLD_PERCENT: u64 = 8;
pub const MINORITY_THRESHOLD_PERCENT: u64 = 0;

impl ListCategory {
    pub fn threshold_percent(&self) -> u64 {
        match self {
            ListCategory::Ordinary => ORDINARY_THRESHOLD_PERCENT,
            ListCategory::Coalition => COALITION_THRESHOLD_PERCENT,
            ListCategory::Minority => MINORITY_THRESHOLD_PERCENT,
        }
    }
}

/// Checks the statutory threshold for a list.
///
/// A list is eligible when its share of the valid votes is at least the threshold
/// of its category. Reaching the threshold exactly is enough. The comparison is
/// done on integers, there is no rounding of the share.
///
/// If no valid vote was cast, the share is undefined and only the categories
/// without threshold are eligible.
pub fn is_eligible(category: ListCategory, list_votes: u64, total_valid_votes: u64) -> bool {
    let threshold = category.threshold_percent();
    if threshold == 0 {
        return true;
    }
    if total_valid_votes == 0 {
        return false;
    }
    100 * (list_votes as u128) >= (threshold as u128) * (total_valid_votes as u128)
}

impl ThresholdPolicy {
    pub fn accepts(&self, list: &CompetingList, list_votes: u64, total_valid_votes: u64) -> bool {
        let res = match self {
            ThresholdPolicy::Statutory => is_eligible(list.category, list_votes, total_valid_votes),
            ThresholdPolicy::NoThreshold => true,
        };
        debug!(
            "accepts: {:?} {} ({:?}): {} / {} votes -> {}",
            self, list.name, list.category, list_votes, total_valid_votes, res
        );
        res
    }
}
