mod config;
pub mod dataset;
pub mod manual;
mod strategy;
mod threshold;

use log::{debug, info};

use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, HashSet},
};

pub use crate::config::*;
pub use crate::dataset::{DatasetBuilder, DistrictInfo, DistrictRow, ElectionDataset};
pub use crate::strategy::*;
pub use crate::threshold::*;

/// A competing list while the seats of one scope are being distributed.
///
/// Two nodes are equal when they have the same name. Within a scope the names are
/// unique, which makes the ordering below a total order.
#[derive(Debug, Clone)]
pub struct QuotientNode {
    pub name: String,
    pub votes: u64,
    pub seats: u32,
    method: DivisorMethod,
}

impl QuotientNode {
    pub fn new(name: &str, votes: u64, method: DivisorMethod) -> QuotientNode {
        QuotientNode {
            name: name.to_string(),
            votes,
            seats: 0,
            method,
        }
    }

    fn denominator(&self) -> u64 {
        self.method.denominator(self.seats)
    }

    /// The current quotient of this list. Only meant for display, the
    /// comparisons are done exactly.
    pub fn priority_key(&self) -> f64 {
        self.votes as f64 / self.denominator() as f64
    }

    /// True if this list should receive the next seat before the other one.
    pub fn has_priority_over(&self, other: &QuotientNode) -> bool {
        self.cmp(other) == Ordering::Greater
    }
}

impl PartialEq for QuotientNode {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for QuotientNode {}

impl Ord for QuotientNode {
    // Greater means higher priority for the next seat. The quotients are compared
    // by cross-multiplication. Equal quotients go to the smallest name.
    fn cmp(&self, other: &Self) -> Ordering {
        if self.name == other.name {
            return Ordering::Equal;
        }
        let lhs = self.votes as u128 * other.denominator() as u128;
        let rhs = other.votes as u128 * self.denominator() as u128;
        lhs.cmp(&rhs).then_with(|| other.name.cmp(&self.name))
    }
}

impl PartialOrd for QuotientNode {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Distributes seats one at a time to the list with the highest quotient.
///
/// Arguments:
/// * `method` the divisor method
/// * `entries` the name and the number of votes of every list. The names must be unique.
/// * `seats` the number of seats to distribute
///
/// Every entry is present in the output, in the same order, possibly with zero seats.
/// For the D'Hondt method, the margin by which the last seat was won is also returned.
///
/// ```
/// use apportionment::*;
///
/// let res = allocate(
///     DivisorMethod::DHondt,
///     &[("A".to_string(), 600), ("B".to_string(), 250), ("C".to_string(), 150)],
///     5,
/// )?;
/// assert_eq!(res.seats_of("A"), Some(4));
/// assert_eq!(res.seats_of("C"), Some(0));
///
/// # Ok::<(), ApportionmentErrors>(())
/// ```
pub fn allocate(
    method: DivisorMethod,
    entries: &[(String, u64)],
    seats: u32,
) -> Result<Allocation, ApportionmentErrors> {
    allocate_scaled(method, entries, seats, 1)
}

/// Same as [allocate], for vote counts that are expressed in `1/scale` units.
///
/// The allocation does not depend on the scale, only the last seat margin does.
pub(crate) fn allocate_scaled(
    method: DivisorMethod,
    entries: &[(String, u64)],
    seats: u32,
    scale: u64,
) -> Result<Allocation, ApportionmentErrors> {
    debug!(
        "allocate: {:?} {} seats among {} lists",
        method,
        seats,
        entries.len()
    );
    let mut seen: HashSet<&str> = HashSet::new();
    for (name, _) in entries.iter() {
        if !seen.insert(name.as_str()) {
            return Err(ApportionmentErrors::DuplicateList(name.clone()));
        }
    }
    if entries.is_empty() && seats > 0 {
        return Err(ApportionmentErrors::EmptyElection);
    }

    let mut queue: BinaryHeap<QuotientNode> = entries
        .iter()
        .map(|(name, votes)| QuotientNode::new(name, *votes, method))
        .collect();

    let mut last_winner: Option<String> = None;
    for seat in 1..=seats {
        let mut node = queue.pop().ok_or(ApportionmentErrors::EmptyElection)?;
        debug!(
            "allocate: seat {}: {} (quotient {:.2}, votes {}, seats {})",
            seat,
            node.name,
            node.priority_key(),
            node.votes,
            node.seats
        );
        node.seats += 1;
        last_winner = Some(node.name.clone());
        queue.push(node);
    }

    let last_seat = match (method, last_winner) {
        (DivisorMethod::DHondt, Some(winner_name)) => {
            find_runner_up(&queue, &winner_name).map(|(winner, runner_up)| {
                last_seat_margin(winner, runner_up, scale)
            })
        }
        _ => None,
    };
    if let Some(ls) = last_seat.as_ref() {
        debug!("allocate: {}", ls);
    }

    let final_seats: HashMap<String, u32> = queue
        .into_vec()
        .into_iter()
        .map(|node| (node.name, node.seats))
        .collect();
    let seats_res: Vec<(String, u32)> = entries
        .iter()
        .map(|(name, _)| (name.clone(), final_seats.get(name).cloned().unwrap_or(0)))
        .collect();

    Ok(Allocation {
        seats: seats_res,
        last_seat,
    })
}

// The runner-up is the list that would get the next seat, skipping the winner
// of the last seat if it would also win the next one.
fn find_runner_up<'a>(
    queue: &'a BinaryHeap<QuotientNode>,
    winner_name: &str,
) -> Option<(&'a QuotientNode, &'a QuotientNode)> {
    let winner = queue.iter().find(|n| n.name == winner_name)?;
    let runner_up = queue.iter().filter(|n| n.name != winner_name).max()?;
    Some((winner, runner_up))
}

// floor(winner.votes - runner_up.votes * winner.seats / (runner_up.seats + 1))
//
// The seats of the runner-up are counted as if it had received the next seat.
// The result is never negative: the winner had the highest quotient when it got
// its last seat, and the runner-up has not changed since.
fn last_seat_margin(winner: &QuotientNode, runner_up: &QuotientNode, scale: u64) -> LastSeatMargin {
    let next_seats = runner_up.seats as u128 + 1;
    let lead = winner.votes as u128 * next_seats;
    let needed = runner_up.votes as u128 * winner.seats as u128;
    let margin = lead.saturating_sub(needed) / (next_seats * scale.max(1) as u128);
    LastSeatMargin {
        winner: winner.name.clone(),
        runner_up: runner_up.name.clone(),
        margin: margin as u64,
    }
}

/// Logs an allocation, one line per list.
pub(crate) fn log_allocation(context: &str, allocation: &[(String, u32)]) {
    for (name, seats) in allocation.iter() {
        info!("{}: {:>5} {}", context, seats, name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn entries(data: &[(&str, u64)]) -> Vec<(String, u64)> {
        data.iter().map(|(n, v)| (n.to_string(), *v)).collect()
    }

    fn seat_vector(a: &Allocation) -> Vec<u32> {
        a.seats.iter().map(|(_, s)| *s).collect()
    }

    fn polish_2023() -> Vec<(String, u64)> {
        entries(&[
            ("KO", 741_286),
            ("PIS", 345_380),
            ("NL", 230_648),
            ("TD", 227_127),
            ("KF", 124_220),
        ])
    }

    #[test]
    fn priority_keys() {
        let mut a = QuotientNode::new("A", 100, DivisorMethod::DHondt);
        let b = QuotientNode::new("B", 60, DivisorMethod::DHondt);
        assert!(a.has_priority_over(&b));
        a.seats = 1;
        // 100 / 2 < 60
        assert!(b.has_priority_over(&a));
        assert_eq!(a.priority_key(), 50.0);

        let mut c = QuotientNode::new("C", 100, DivisorMethod::SainteLague);
        let d = QuotientNode::new("D", 40, DivisorMethod::SainteLague);
        c.seats = 1;
        // 100 / 3 < 40
        assert!(d.has_priority_over(&c));
    }

    #[test]
    fn equal_quotients_go_to_the_smallest_name() {
        let a = QuotientNode::new("A", 100, DivisorMethod::DHondt);
        let mut b = QuotientNode::new("B", 200, DivisorMethod::DHondt);
        b.seats = 1;
        assert!(a.has_priority_over(&b));
        assert!(!b.has_priority_over(&a));
    }

    #[test]
    fn nodes_are_equal_by_name() {
        let a = QuotientNode::new("A", 100, DivisorMethod::DHondt);
        let a2 = QuotientNode::new("A", 5, DivisorMethod::DHondt);
        assert_eq!(a, a2);
        assert_eq!(a.cmp(&a2), Ordering::Equal);
    }

    #[test]
    fn golden_dhondt() {
        init();
        let res = allocate(DivisorMethod::DHondt, &polish_2023(), 20).unwrap();
        assert_eq!(seat_vector(&res), vec![9, 4, 3, 3, 1]);
        assert_eq!(res.total_seats(), 20);
        let ls = res.last_seat.unwrap();
        assert_eq!(ls.winner, "TD");
        assert_eq!(ls.runner_up, "KO");
        assert_eq!(ls.margin, 4741);
        assert_eq!(ls.to_string(), "TD won last seat over KO by 4741 votes");
    }

    #[test]
    fn golden_sainte_lague() {
        init();
        let res = allocate(DivisorMethod::SainteLague, &polish_2023(), 20).unwrap();
        assert_eq!(seat_vector(&res), vec![9, 4, 3, 3, 1]);
        assert_eq!(res.last_seat, None);
    }

    #[test]
    fn small_district() {
        let data = entries(&[
            ("KO", 161_241),
            ("PIS", 150_022),
            ("NL", 34_763),
            ("TD", 61_155),
            ("KF", 31_150),
            ("MN", 25_778),
        ]);
        let dh = allocate(DivisorMethod::DHondt, &data, 12).unwrap();
        assert_eq!(seat_vector(&dh), vec![5, 4, 1, 1, 1, 0]);
        assert_eq!(
            dh.last_seat.unwrap().to_string(),
            "KF won last seat over TD by 572 votes"
        );
        let sl = allocate(DivisorMethod::SainteLague, &data, 12).unwrap();
        assert_eq!(seat_vector(&sl), vec![4, 4, 1, 1, 1, 1]);
    }

    #[test]
    fn dhondt_favours_the_largest_list() {
        let data = entries(&[("A", 1000), ("B", 300), ("C", 300), ("D", 300)]);
        let dh = allocate(DivisorMethod::DHondt, &data, 5).unwrap();
        let sl = allocate(DivisorMethod::SainteLague, &data, 5).unwrap();
        assert_eq!(seat_vector(&dh), vec![3, 1, 1, 0]);
        assert_eq!(seat_vector(&sl), vec![2, 1, 1, 1]);
        assert!(dh.seats_of("A") > sl.seats_of("A"));
    }

    #[test]
    fn seat_total_is_exact() {
        let distributions: Vec<Vec<(String, u64)>> = vec![
            polish_2023(),
            entries(&[("A", 0), ("B", 0), ("C", 0)]),
            entries(&[("A", 1), ("B", 0)]),
            entries(&[("A", 7), ("B", 7), ("C", 7), ("D", 7)]),
            entries(&[("A", u64::MAX), ("B", u64::MAX - 1)]),
        ];
        for data in distributions.iter() {
            for seats in [0, 1, 2, 3, 7, 20, 101] {
                for method in [DivisorMethod::DHondt, DivisorMethod::SainteLague] {
                    let res = allocate(method, data, seats).unwrap();
                    assert_eq!(res.total_seats(), seats, "{:?} {:?} {}", method, data, seats);
                    assert_eq!(res.seats.len(), data.len());
                }
            }
        }
    }

    #[test]
    fn monotone_in_own_votes() {
        let others = [("B", 3_400), ("C", 2_100), ("D", 900)];
        for method in [DivisorMethod::DHondt, DivisorMethod::SainteLague] {
            let mut previous = 0;
            for a_votes in (0..12_000).step_by(250) {
                let mut data = entries(&others);
                data.push(("A".to_string(), a_votes));
                let res = allocate(method, &data, 15).unwrap();
                let a_seats = res.seats_of("A").unwrap();
                assert!(a_seats >= previous, "{:?} {}", method, a_votes);
                previous = a_seats;
            }
        }
    }

    #[test]
    fn deterministic_under_permutation() {
        let data = polish_2023();
        let reference = allocate(DivisorMethod::DHondt, &data, 20).unwrap();
        let mut reversed = data.clone();
        reversed.reverse();
        let mut rotated = data.clone();
        rotated.rotate_left(2);
        for permuted in [reversed, rotated, data.clone()] {
            let res = allocate(DivisorMethod::DHondt, &permuted, 20).unwrap();
            for (name, seats) in reference.seats.iter() {
                assert_eq!(res.seats_of(name), Some(*seats));
            }
            assert_eq!(res.last_seat, reference.last_seat);
        }
    }

    #[test]
    fn ties_are_broken_by_name() {
        let res = allocate(
            DivisorMethod::DHondt,
            &entries(&[("B", 100), ("A", 100)]),
            1,
        )
        .unwrap();
        assert_eq!(res.seats, vec![("B".to_string(), 0), ("A".to_string(), 1)]);
        assert_eq!(
            res.last_seat,
            Some(LastSeatMargin {
                winner: "A".to_string(),
                runner_up: "B".to_string(),
                margin: 0
            })
        );

        let res = allocate(
            DivisorMethod::SainteLague,
            &entries(&[("Z", 30), ("Y", 10), ("X", 10)]),
            2,
        )
        .unwrap();
        // 30 / 3 == 10: the tie goes to X.
        assert_eq!(res.seats_of("Z"), Some(1));
        assert_eq!(res.seats_of("X"), Some(1));
        assert_eq!(res.seats_of("Y"), Some(0));
    }

    #[test]
    fn runner_up_is_another_list() {
        // A takes every seat and would also take the next one.
        let res = allocate(
            DivisorMethod::DHondt,
            &entries(&[("A", 1000), ("B", 10)]),
            3,
        )
        .unwrap();
        let ls = res.last_seat.unwrap();
        assert_eq!(ls.winner, "A");
        assert_eq!(ls.runner_up, "B");
        // 1000 - 10 * 3 / 1
        assert_eq!(ls.margin, 970);
    }

    #[test]
    fn no_margin_without_competition() {
        let single = allocate(DivisorMethod::DHondt, &entries(&[("A", 10)]), 4).unwrap();
        assert_eq!(single.seats_of("A"), Some(4));
        assert_eq!(single.last_seat, None);

        let no_seat = allocate(DivisorMethod::DHondt, &polish_2023(), 0).unwrap();
        assert_eq!(no_seat.total_seats(), 0);
        assert_eq!(no_seat.last_seat, None);
    }

    #[test]
    fn invalid_entries() {
        assert_eq!(
            allocate(DivisorMethod::DHondt, &entries(&[("A", 1), ("A", 2)]), 2),
            Err(ApportionmentErrors::DuplicateList("A".to_string()))
        );
        assert_eq!(
            allocate(DivisorMethod::DHondt, &[], 2),
            Err(ApportionmentErrors::EmptyElection)
        );
        assert_eq!(
            allocate(DivisorMethod::DHondt, &[], 0).map(|a| a.seats),
            Ok(vec![])
        );
    }

    #[test]
    fn idempotent() {
        let a = allocate(DivisorMethod::SainteLague, &polish_2023(), 33).unwrap();
        let b = allocate(DivisorMethod::SainteLague, &polish_2023(), 33).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn scaled_margin() {
        // Same allocation, the margin is expressed in the original units.
        let plain = allocate(DivisorMethod::DHondt, &polish_2023(), 20).unwrap();
        let scaled: Vec<(String, u64)> = polish_2023()
            .into_iter()
            .map(|(n, v)| (n, v * 1000))
            .collect();
        let res = allocate_scaled(DivisorMethod::DHondt, &scaled, 20, 1000).unwrap();
        assert_eq!(res.seats, plain.seats);
        assert_eq!(res.last_seat, plain.last_seat);
    }
}
