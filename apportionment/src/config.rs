// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;
use std::str::FromStr;

/// How a competing list is treated by the statutory threshold.
///
/// The category is decided once, when the data is loaded. The library never
/// looks at the content of a list name to guess it.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ListCategory {
    /// A list registered by a single party or by voters.
    Ordinary,
    /// A list registered by a coalition of parties. Subject to a higher threshold.
    Coalition,
    /// A list registered by a national minority. Exempt from the threshold.
    Minority,
}

#[derive(Eq, PartialEq, Debug, Clone, Hash)]
pub struct CompetingList {
    pub name: String,
    pub category: ListCategory,
}

impl CompetingList {
    pub fn new(name: &str, category: ListCategory) -> CompetingList {
        CompetingList {
            name: name.to_string(),
            category,
        }
    }

    pub fn ordinary(name: &str) -> CompetingList {
        CompetingList::new(name, ListCategory::Ordinary)
    }
}

// ******** Output data structures *********

/// The estimated vote deficit by which the runner-up missed the last seat of a scope.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct LastSeatMargin {
    pub winner: String,
    pub runner_up: String,
    pub margin: u64,
}

impl Display for LastSeatMargin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} won last seat over {} by {} votes",
            self.winner, self.runner_up, self.margin
        )
    }
}

/// The outcome of one run of the divisor engine over a single scope.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct Allocation {
    /// The seats of every list, in the order of the input entries.
    pub seats: Vec<(String, u32)>,
    /// Only computed for the D'Hondt method.
    pub last_seat: Option<LastSeatMargin>,
}

impl Allocation {
    pub fn seats_of(&self, name: &str) -> Option<u32> {
        self.seats
            .iter()
            .find_map(|(n, s)| if n == name { Some(*s) } else { None })
    }

    pub fn total_seats(&self) -> u32 {
        self.seats.iter().map(|(_, s)| *s).sum()
    }
}

/// One row of the vote strength comparison table.
#[derive(PartialEq, Debug, Clone)]
pub struct DistrictStrength {
    pub district: String,
    pub seats: u32,
    pub true_proportion: f64,
    /// 0 means that a vote in this district weighs exactly its fair share,
    /// 25 means that it weighs 25% more, and so on.
    pub voter_strength: f64,
}

/// The two extreme districts for the strength of a single vote.
#[derive(PartialEq, Debug, Clone)]
pub struct VoteStrengthSummary {
    pub strongest: String,
    pub weakest: String,
    pub ratio: f64,
}

impl Display for VoteStrengthSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Voters in {} have vote {:.4}x as strong as voters in {}",
            self.strongest, self.ratio, self.weakest
        )
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct VoteWeightReport {
    pub before: VoteStrengthSummary,
    pub after: VoteStrengthSummary,
    /// The offset added to the true proportions before rounding them.
    pub rounding_offset: f64,
    /// Sorted by increasing voter strength.
    pub comparison_before: Vec<DistrictStrength>,
    /// Sorted by increasing voter strength.
    pub comparison_after: Vec<DistrictStrength>,
}

/// The additional information that comes with a seat allocation. Its shape depends on the strategy.
#[derive(PartialEq, Debug, Clone)]
pub enum Diagnostics {
    Empty,
    LastSeat(Option<LastSeatMargin>),
    /// Indexed by district label.
    LastSeatByDistrict(Vec<(String, Option<LastSeatMargin>)>),
    VoteWeight(VoteWeightReport),
}

#[derive(PartialEq, Debug, Clone)]
pub struct ApportionmentResult {
    /// The eligible lists, in dataset order.
    pub seats: Vec<(String, u32)>,
    pub diagnostics: Diagnostics,
}

impl ApportionmentResult {
    pub fn seats_of(&self, name: &str) -> Option<u32> {
        self.seats
            .iter()
            .find_map(|(n, s)| if n == name { Some(*s) } else { None })
    }
}

/// Errors that prevent an apportionment from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ApportionmentErrors {
    /// No list or no district to work with.
    EmptyElection,
    /// The same list name was provided twice in one scope.
    DuplicateList(String),
    /// Results were provided for a list that was not registered.
    UnknownList(String),
    UnknownStrategy(String),
    /// The rounding offset search did not land on its target.
    NoConvergence { iterations: u32 },
    /// The weighted vote count of a list does not fit in 64 bits.
    VoteOverflow(String),
    /// A sum over the districts (seats, valid votes or the votes of a list) does not fit.
    CountOverflow(String),
}

impl Error for ApportionmentErrors {}

impl Display for ApportionmentErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApportionmentErrors::EmptyElection => write!(f, "no list or no district to apportion"),
            ApportionmentErrors::DuplicateList(name) => {
                write!(f, "list {:?} appears more than once", name)
            }
            ApportionmentErrors::UnknownList(name) => write!(f, "list {:?} is not registered", name),
            ApportionmentErrors::UnknownStrategy(name) => {
                write!(f, "unknown apportionment method {:?}", name)
            }
            ApportionmentErrors::NoConvergence { iterations } => write!(
                f,
                "the rounding offset search did not converge after {} iterations",
                iterations
            ),
            ApportionmentErrors::VoteOverflow(name) => {
                write!(f, "weighted vote count of list {:?} overflows", name)
            }
            ApportionmentErrors::CountOverflow(what) => {
                write!(f, "the nationwide total of {} overflows", what)
            }
        }
    }
}

// ********* Configuration **********

/// The highest-averages methods.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum DivisorMethod {
    /// Divisors 1, 2, 3, ...
    DHondt,
    /// Divisors 1, 3, 5, ...
    SainteLague,
}

impl DivisorMethod {
    /// The divisor applied to the votes of a list that already holds `seats` seats.
    pub fn denominator(&self, seats: u32) -> u64 {
        match self {
            DivisorMethod::DHondt => seats as u64 + 1,
            DivisorMethod::SainteLague => 2 * seats as u64 + 1,
        }
    }
}

/// The geographic unit over which the divisor engine runs.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum Scope {
    /// Once per district, with the seats of that district. The results are summed.
    Constituency,
    /// Once, over the nationwide totals and the nationwide number of seats.
    Nationwide,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ThresholdPolicy {
    /// 5% for ordinary lists, 8% for coalitions, none for minorities.
    Statutory,
    /// Every list takes part in the allocation.
    NoThreshold,
}

/// A transformation of the vote counts applied before running the engine.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum VoteTransform {
    Identity,
    /// `votes * (1 + votes / total)`: a bonus that grows with the share of the list.
    Squared,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub struct RoundingRules {
    pub max_iterations: u32,
}

impl RoundingRules {
    pub const DEFAULT_RULES: RoundingRules = RoundingRules {
        max_iterations: 200,
    };
}

/// A complete description of how to apportion the seats.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub struct Strategy {
    pub scope: Scope,
    pub method: DivisorMethod,
    pub threshold: ThresholdPolicy,
    pub transform: VoteTransform,
    /// If set, the vote strength of every district is analysed and the
    /// districts are reseated as a diagnostic. The allocation is unchanged.
    pub vote_weight_report: Option<RoundingRules>,
}

impl Strategy {
    pub const fn new(scope: Scope, method: DivisorMethod, threshold: ThresholdPolicy) -> Strategy {
        Strategy {
            scope,
            method,
            threshold,
            transform: VoteTransform::Identity,
            vote_weight_report: None,
        }
    }
}

/// The named strategies that can be selected from the command line.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum StrategyName {
    ConstituencialDHondt,
    ConstituencialDHondtNoThreshold,
    GlobalDHondt,
    GlobalDHondtNoThreshold,
    SquaredDHondt,
    ConstituencialSainteLague,
    ConstituencialSainteLagueNoThreshold,
    GlobalSainteLague,
    GlobalSainteLagueNoThreshold,
    FairVoteWeightDHondt,
}

impl StrategyName {
    pub const ALL: [StrategyName; 10] = [
        StrategyName::ConstituencialDHondt,
        StrategyName::ConstituencialDHondtNoThreshold,
        StrategyName::GlobalDHondt,
        StrategyName::GlobalDHondtNoThreshold,
        StrategyName::SquaredDHondt,
        StrategyName::ConstituencialSainteLague,
        StrategyName::ConstituencialSainteLagueNoThreshold,
        StrategyName::GlobalSainteLague,
        StrategyName::GlobalSainteLagueNoThreshold,
        StrategyName::FairVoteWeightDHondt,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyName::ConstituencialDHondt => "constituencial-dhondt",
            StrategyName::ConstituencialDHondtNoThreshold => "constituencial-dhondt-no-threshold",
            StrategyName::GlobalDHondt => "global-dhondt",
            StrategyName::GlobalDHondtNoThreshold => "global-dhondt-no-threshold",
            StrategyName::SquaredDHondt => "squared-dhondt",
            StrategyName::ConstituencialSainteLague => "constituencial-sainte-lague",
            StrategyName::ConstituencialSainteLagueNoThreshold => {
                "constituencial-sainte-lague-no-threshold"
            }
            StrategyName::GlobalSainteLague => "global-sainte-lague",
            StrategyName::GlobalSainteLagueNoThreshold => "global-sainte-lague-no-threshold",
            StrategyName::FairVoteWeightDHondt => "fair-vote-weight-dhondt",
        }
    }

    /// The strategy behind the name, using the default rounding rules where relevant.
    pub fn strategy(&self) -> Strategy {
        self.strategy_with(RoundingRules::DEFAULT_RULES)
    }

    pub fn strategy_with(&self, rounding: RoundingRules) -> Strategy {
        use DivisorMethod::*;
        use Scope::*;
        use ThresholdPolicy::*;
        match self {
            StrategyName::ConstituencialDHondt => Strategy::new(Constituency, DHondt, Statutory),
            StrategyName::ConstituencialDHondtNoThreshold => {
                Strategy::new(Constituency, DHondt, NoThreshold)
            }
            StrategyName::GlobalDHondt => Strategy::new(Nationwide, DHondt, Statutory),
            StrategyName::GlobalDHondtNoThreshold => Strategy::new(Nationwide, DHondt, NoThreshold),
            StrategyName::SquaredDHondt => Strategy {
                transform: VoteTransform::Squared,
                ..Strategy::new(Nationwide, DHondt, Statutory)
            },
            StrategyName::ConstituencialSainteLague => {
                Strategy::new(Constituency, SainteLague, Statutory)
            }
            StrategyName::ConstituencialSainteLagueNoThreshold => {
                Strategy::new(Constituency, SainteLague, NoThreshold)
            }
            StrategyName::GlobalSainteLague => Strategy::new(Nationwide, SainteLague, Statutory),
            StrategyName::GlobalSainteLagueNoThreshold => {
                Strategy::new(Nationwide, SainteLague, NoThreshold)
            }
            StrategyName::FairVoteWeightDHondt => Strategy {
                vote_weight_report: Some(rounding),
                ..Strategy::new(Constituency, DHondt, Statutory)
            },
        }
    }
}

impl FromStr for StrategyName {
    type Err = ApportionmentErrors;

    fn from_str(s: &str) -> Result<StrategyName, ApportionmentErrors> {
        StrategyName::ALL
            .iter()
            .find(|sn| sn.as_str() == s)
            .cloned()
            .ok_or_else(|| ApportionmentErrors::UnknownStrategy(s.to_string()))
    }
}

impl Display for StrategyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
