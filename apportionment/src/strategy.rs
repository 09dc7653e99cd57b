use log::{debug, info, warn};

use crate::config::*;
use crate::dataset::{DistrictRow, ElectionDataset};
use crate::{allocate_scaled, log_allocation};

/// Apportions the seats of an election according to a strategy.
///
/// Only the lists that pass the threshold policy of the strategy (evaluated on
/// the nationwide totals) are part of the result.
///
/// ```
/// use apportionment::*;
///
/// let mut builder = DatasetBuilder::new().lists(&[
///     CompetingList::ordinary("A"),
///     CompetingList::ordinary("B"),
/// ])?;
/// builder.add_district(DistrictInfo { id: 1, name: "North".to_string(), seats: 5, valid_votes: 1000 })?;
/// builder.add_results(1, &[("A".to_string(), 700), ("B".to_string(), 300)])?;
/// let dataset = builder.build()?;
///
/// let strategy: StrategyName = "global-dhondt".parse()?;
/// let res = calculate(&dataset, &strategy.strategy())?;
/// assert_eq!(res.seats, vec![("A".to_string(), 4), ("B".to_string(), 1)]);
///
/// # Ok::<(), ApportionmentErrors>(())
/// ```
pub fn calculate(
    dataset: &ElectionDataset,
    strategy: &Strategy,
) -> Result<ApportionmentResult, ApportionmentErrors> {
    info!("calculate: strategy {:?}", strategy);
    let eligible = dataset.eligible_lists(strategy.threshold);
    let names: Vec<String> = eligible
        .iter()
        .map(|idx| dataset.lists()[*idx].name.clone())
        .collect();
    debug!("calculate: eligible lists: {:?}", names);

    let (seats, last_seat_diagnostics) = match strategy.scope {
        Scope::Nationwide => {
            let allocation = allocate_row(dataset.total(), &eligible, &names, strategy, dataset.seats())?;
            (allocation.seats, Diagnostics::LastSeat(allocation.last_seat))
        }
        Scope::Constituency => {
            let mut sums: Vec<u32> = vec![0; names.len()];
            let mut last_seats: Vec<(String, Option<LastSeatMargin>)> = Vec::new();
            for district in dataset.districts() {
                let allocation = allocate_row(district, &eligible, &names, strategy, district.seats)?;
                for (sum, (_, s)) in sums.iter_mut().zip(allocation.seats.iter()) {
                    *sum += *s;
                }
                last_seats.push((district.label(), allocation.last_seat));
            }
            let seats: Vec<(String, u32)> = names.iter().cloned().zip(sums).collect();
            (seats, Diagnostics::LastSeatByDistrict(last_seats))
        }
    };
    log_allocation("calculate", &seats);

    let diagnostics = match (strategy.vote_weight_report, strategy.method) {
        (Some(rules), _) => Diagnostics::VoteWeight(vote_weight_report(dataset, rules)?),
        (None, DivisorMethod::DHondt) => last_seat_diagnostics,
        (None, DivisorMethod::SainteLague) => Diagnostics::Empty,
    };

    Ok(ApportionmentResult { seats, diagnostics })
}

// Runs the divisor engine over one row of the dataset, restricted to the eligible lists.
fn allocate_row(
    row: &DistrictRow,
    eligible: &[usize],
    names: &[String],
    strategy: &Strategy,
    seats: u32,
) -> Result<Allocation, ApportionmentErrors> {
    let entries: Vec<(String, u64)> = eligible
        .iter()
        .zip(names.iter())
        .map(|(idx, name)| (name.clone(), row.votes[*idx]))
        .collect();
    let (weighted, scale) = transform_votes(&entries, strategy.transform)?;
    debug!(
        "allocate_row: district {} ({} seats): {:?}",
        row.id, seats, weighted
    );
    allocate_scaled(strategy.method, &weighted, seats, scale)
}

/// Applies the vote transform. The weighted votes are returned as integers,
/// in units of `1/scale` votes.
///
/// For the squared transform, `votes * (1 + votes / total)` is computed as
/// `votes * (total + votes)` with a scale of `total`, where `total` is the sum
/// of the votes of all the entries.
pub fn transform_votes(
    entries: &[(String, u64)],
    transform: VoteTransform,
) -> Result<(Vec<(String, u64)>, u64), ApportionmentErrors> {
    match transform {
        VoteTransform::Identity => Ok((entries.to_vec(), 1)),
        VoteTransform::Squared => {
            let total: u128 = entries.iter().map(|(_, v)| *v as u128).sum();
            if total == 0 {
                return Ok((entries.to_vec(), 1));
            }
            let scale = u64::try_from(total)
                .map_err(|_| ApportionmentErrors::VoteOverflow("total".to_string()))?;
            let mut res: Vec<(String, u64)> = Vec::new();
            for (name, votes) in entries.iter() {
                let w = *votes as u128 * (total + *votes as u128);
                let w = u64::try_from(w)
                    .map_err(|_| ApportionmentErrors::VoteOverflow(name.clone()))?;
                res.push((name.clone(), w));
            }
            Ok((res, scale))
        }
    }
}

/// Finds an offset `p` in `[-1, 1]` such that the sum of `round(x + p)` over the
/// proportions is exactly `target`. Rounding is half-to-even.
///
/// The search is a bisection: the sum is non-decreasing in `p`. It may not have
/// a solution (several proportions crossing a rounding boundary at the same
/// point), so the number of steps is capped.
pub fn find_rounding_offset(
    proportions: &[f64],
    target: u64,
    max_iterations: u32,
) -> Result<f64, ApportionmentErrors> {
    let target = target as i64;
    let mut low = -1.0_f64;
    let mut high = 1.0_f64;
    for iteration in 0..max_iterations {
        let p = (low + high) / 2.0;
        let val: i64 = proportions
            .iter()
            .map(|x| (x + p).round_ties_even() as i64)
            .sum();
        debug!(
            "find_rounding_offset: iteration {}: p={} sum={} target={}",
            iteration, p, val, target
        );
        match val.cmp(&target) {
            std::cmp::Ordering::Equal => {
                info!(
                    "find_rounding_offset: found offset {} after {} iterations",
                    p,
                    iteration + 1
                );
                return Ok(p);
            }
            std::cmp::Ordering::Less => low = p,
            std::cmp::Ordering::Greater => high = p,
        }
    }
    warn!(
        "find_rounding_offset: no offset found after {} iterations (last interval [{}, {}])",
        max_iterations, low, high
    );
    Err(ApportionmentErrors::NoConvergence {
        iterations: max_iterations,
    })
}

/// The ideal (fractional) number of seats of each district: its share of the
/// valid votes times the number of seats.
pub fn true_proportions(dataset: &ElectionDataset) -> Result<Vec<f64>, ApportionmentErrors> {
    if dataset.votes() == 0 {
        return Err(ApportionmentErrors::EmptyElection);
    }
    let seats = dataset.seats() as f64;
    let votes = dataset.votes() as f64;
    Ok(dataset
        .districts()
        .iter()
        .map(|d| d.valid_votes as f64 * seats / votes)
        .collect())
}

/// Analyses how much a single vote weighs in each district, then reseats the
/// districts by rounding their true proportions with an offset chosen so that
/// the number of seats is preserved, and analyses the result again.
///
/// The offset is searched over all the rows of the dataset, including the
/// nationwide row (whose true proportion is the number of seats), with a target
/// of twice the number of seats.
pub fn vote_weight_report(
    dataset: &ElectionDataset,
    rules: RoundingRules,
) -> Result<VoteWeightReport, ApportionmentErrors> {
    let props = true_proportions(dataset)?;
    let current_seats: Vec<u32> = dataset.districts().iter().map(|d| d.seats).collect();
    let comparison_before = strength_table(dataset.districts(), &current_seats, &props);
    let before = summarize(&comparison_before)?;
    info!("vote_weight_report: before: {}", before);

    let mut rows = props.clone();
    rows.push(dataset.total().valid_votes as f64 * dataset.seats() as f64 / dataset.votes() as f64);
    let rounding_offset =
        find_rounding_offset(&rows, 2 * dataset.seats() as u64, rules.max_iterations)?;

    let reseated: Vec<u32> = props
        .iter()
        .map(|tp| (tp + rounding_offset).round_ties_even().max(0.0) as u32)
        .collect();
    debug!("vote_weight_report: reseated districts: {:?}", reseated);
    let comparison_after = strength_table(dataset.districts(), &reseated, &props);
    let after = summarize(&comparison_after)?;
    info!("vote_weight_report: after: {}", after);

    Ok(VoteWeightReport {
        before,
        after,
        rounding_offset,
        comparison_before,
        comparison_after,
    })
}

// Sorted by increasing strength. Districts without any vote have no meaningful
// strength and are left out.
fn strength_table(districts: &[DistrictRow], seats: &[u32], props: &[f64]) -> Vec<DistrictStrength> {
    let mut res: Vec<DistrictStrength> = Vec::new();
    for ((d, s), tp) in districts.iter().zip(seats.iter()).zip(props.iter()) {
        if *tp <= 0.0 {
            warn!(
                "strength_table: district {} has no valid votes, skipping it",
                d.label()
            );
            continue;
        }
        res.push(DistrictStrength {
            district: d.name.clone(),
            seats: *s,
            true_proportion: *tp,
            voter_strength: 100.0 * (*s as f64) / tp - 100.0,
        });
    }
    res.sort_by(|a, b| a.voter_strength.total_cmp(&b.voter_strength));
    res
}

fn summarize(table: &[DistrictStrength]) -> Result<VoteStrengthSummary, ApportionmentErrors> {
    let weakest = table.first().ok_or(ApportionmentErrors::EmptyElection)?;
    let strongest = table.last().ok_or(ApportionmentErrors::EmptyElection)?;
    Ok(VoteStrengthSummary {
        strongest: strongest.district.clone(),
        weakest: weakest.district.clone(),
        ratio: (strongest.voter_strength + 100.0) / (weakest.voter_strength + 100.0),
    })
}
