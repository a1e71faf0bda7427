use crate::card_utils::Deal;
use crate::error::{SolverError, SolverResult};
use crate::evaluator::HandEvaluator;
use itertools::Itertools;
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;

pub type Chips = u32;
pub type Utilities = [f64; NUM_PLAYERS];

pub const NUM_PLAYERS: usize = 3;
pub const STARTING_STACK: Chips = 20_000;
pub const SMALL_BLIND: Chips = 10;
pub const BIG_BLIND: Chips = 20;

// Seats. The small blind is first to act after the flop, the seat that posts
// nothing is first to act preflop.
pub const SMALL_BLIND_SEAT: usize = 0;
pub const BIG_BLIND_SEAT: usize = 1;
pub const BUTTON_SEAT: usize = 2;

// Size of the closed action set. For sizing SmallVecs and node arrays.
pub const NUM_ACTIONS: usize = 7;

pub type ActionList = SmallVec<[Action; NUM_ACTIONS]>;
pub type Strategy = SmallVec<[f64; NUM_ACTIONS]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Street {
    Preflop,
    Flop,
    Turn,
    River,
    Showdown,
}

impl Street {
    pub fn next(self) -> Street {
        match self {
            Street::Preflop => Street::Flop,
            Street::Flop => Street::Turn,
            Street::Turn => Street::River,
            Street::River | Street::Showdown => Street::Showdown,
        }
    }

    pub fn first_to_act(self) -> usize {
        match self {
            Street::Preflop => BUTTON_SEAT,
            _ => SMALL_BLIND_SEAT,
        }
    }
}

impl fmt::Display for Street {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Street::Preflop => "preflop",
            Street::Flop => "flop",
            Street::Turn => "turn",
            Street::River => "river",
            Street::Showdown => "showdown",
        };
        write!(f, "{}", s)
    }
}

/// The abstract actions. The declaration order is the canonical sort order
/// used when histories are compressed into multisets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Action {
    Fold,
    Check,
    Call,
    Small,
    Medium,
    Large,
    AllIn,
}

pub const ALL_ACTIONS: [Action; NUM_ACTIONS] = [
    Action::Fold,
    Action::Check,
    Action::Call,
    Action::Small,
    Action::Medium,
    Action::Large,
    Action::AllIn,
];

// Pot-relative bet sizes, in the order they are offered
pub const BET_SIZES: [(Action, f64); 3] = [
    (Action::Small, 0.5),
    (Action::Medium, 1.0),
    (Action::Large, 2.0),
];

impl Action {
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_aggressive(self) -> bool {
        matches!(self, Action::Small | Action::Medium | Action::Large | Action::AllIn)
    }

    pub fn pot_fraction(self) -> Option<f64> {
        BET_SIZES.iter().find(|(a, _)| *a == self).map(|(_, f)| *f)
    }

    pub fn label(self) -> &'static str {
        match self {
            Action::Fold => "fold",
            Action::Check => "check",
            Action::Call => "call",
            Action::Small => "small",
            Action::Medium => "medium",
            Action::Large => "large",
            Action::AllIn => "all_in",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// How the action history of a street is folded into the infoset key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAbstraction {
    /// Histories with the same multiset of actions share a key.
    #[default]
    Sorted,
    /// Histories are kept in order of play.
    Ordered,
}

impl HistoryAbstraction {
    pub fn canonicalize(self, history: &[Action]) -> Vec<Action> {
        let mut history = history.to_vec();
        if self == HistoryAbstraction::Sorted {
            history.sort();
        }
        history
    }
}

#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
pub struct InfosetKey {
    pub street: Street,
    pub bucket: u8,
    pub history: Vec<Action>,
    pub facing_bet: bool,
}

impl InfosetKey {
    pub fn new(
        street: Street,
        bucket: u8,
        history: &[Action],
        facing_bet: bool,
        abstraction: HistoryAbstraction,
    ) -> InfosetKey {
        InfosetKey {
            street,
            bucket,
            history: abstraction.canonicalize(history),
            facing_bet,
        }
    }
}

impl fmt::Display for InfosetKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}|{}",
            self.street,
            self.bucket,
            self.history.iter().map(|a| a.label()).join(","),
            if self.facing_bet { "facing" } else { "open" }
        )
    }
}

// Raise increment for a pot-sized bet, before the minimum raise floor is applied
fn bet_increment(action: Action, pot_so_far: Chips) -> Option<Chips> {
    action
        .pot_fraction()
        .map(|fraction| (fraction * pot_so_far as f64).floor() as Chips)
}

/// Returns the abstract actions allowed for `seat`. `carried_pot` is what
/// earlier streets left in the middle.
pub fn legal_actions(
    seat: usize,
    stacks: &[Chips; NUM_PLAYERS],
    to_call: Chips,
    street_contributions: &[Chips; NUM_PLAYERS],
    carried_pot: Chips,
    min_raise: Chips,
) -> ActionList {
    let mut actions = ActionList::new();
    let stack = stacks[seat];
    if to_call > 0 {
        actions.push(Action::Fold);
        if stack > to_call {
            actions.push(Action::Call);
        }
    } else {
        actions.push(Action::Check);
    }

    let pot_so_far = carried_pot + street_contributions.iter().sum::<Chips>();
    for (action, _) in BET_SIZES {
        if let Some(increment) = bet_increment(action, pot_so_far) {
            if increment >= min_raise && stack > to_call + increment {
                actions.push(action);
            }
        }
    }
    if stack > to_call {
        actions.push(Action::AllIn);
    }
    actions
}

/// Everything about a hand in progress except the cards. Each step of the
/// traversal produces a fresh copy, so sibling branches never share state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandState {
    pub street: Street,
    pub stacks: [Chips; NUM_PLAYERS],
    pub contributions: [Chips; NUM_PLAYERS],
    // Chips moved into the middle on earlier streets
    pub pot: Chips,
    pub min_raise: Chips,
    pub acted: [bool; NUM_PLAYERS],
    pub alive: [bool; NUM_PLAYERS],
    pub history: Vec<Action>,
    pub depth: u32,
}

impl HandState {
    /// A fresh hand with the blinds posted.
    pub fn new() -> HandState {
        let mut stacks = [STARTING_STACK; NUM_PLAYERS];
        let mut contributions = [0; NUM_PLAYERS];
        stacks[SMALL_BLIND_SEAT] -= SMALL_BLIND;
        contributions[SMALL_BLIND_SEAT] = SMALL_BLIND;
        stacks[BIG_BLIND_SEAT] -= BIG_BLIND;
        contributions[BIG_BLIND_SEAT] = BIG_BLIND;
        HandState {
            street: Street::Preflop,
            stacks,
            contributions,
            pot: 0,
            min_raise: BIG_BLIND,
            acted: [false; NUM_PLAYERS],
            alive: [true; NUM_PLAYERS],
            history: Vec::new(),
            depth: 0,
        }
    }

    pub fn current_bet(&self) -> Chips {
        self.contributions.iter().copied().max().unwrap_or(0)
    }

    pub fn to_call(&self, seat: usize) -> Chips {
        self.current_bet() - self.contributions[seat]
    }

    pub fn pot_total(&self) -> Chips {
        self.pot + self.contributions.iter().sum::<Chips>()
    }

    pub fn total_chips(&self) -> Chips {
        self.stacks.iter().sum::<Chips>() + self.pot_total()
    }

    pub fn num_alive(&self) -> usize {
        self.alive.iter().filter(|a| **a).count()
    }

    pub fn is_all_in(&self, seat: usize) -> bool {
        self.stacks[seat] == 0
    }

    // Folded and all-in seats take no decisions.
    pub fn can_act(&self, seat: usize) -> bool {
        self.alive[seat] && !self.is_all_in(seat)
    }

    pub fn legal_actions(&self, seat: usize) -> ActionList {
        if !self.can_act(seat) {
            return ActionList::new();
        }
        legal_actions(
            seat,
            &self.stacks,
            self.to_call(seat),
            &self.contributions,
            self.pot,
            self.min_raise,
        )
    }

    /// True once everyone who can still bet has acted since the last
    /// aggression and matched the highest contribution. All-in seats are
    /// settled by definition. A lone seat with chips only has to match.
    pub fn betting_closed(&self) -> bool {
        let current_bet = self.current_bet();
        let active: Vec<usize> = (0..NUM_PLAYERS).filter(|&s| self.can_act(s)).collect();
        if active.len() <= 1 {
            return active.iter().all(|&s| self.contributions[s] == current_bet);
        }
        active
            .iter()
            .all(|&s| self.acted[s] && self.contributions[s] == current_bet)
    }

    /// Applies an abstract action for `seat` and returns the resulting state.
    pub fn apply(&self, seat: usize, action: Action) -> SolverResult<HandState> {
        if !self.legal_actions(seat).contains(&action) {
            return Err(SolverError::IllegalAction { seat, action });
        }
        let mut next = self.clone();
        let to_call = self.to_call(seat);
        next.acted[seat] = true;
        match action {
            Action::Fold => next.alive[seat] = false,
            Action::Check => {}
            Action::Call => {
                let payment = to_call.min(next.stacks[seat]);
                next.stacks[seat] -= payment;
                next.contributions[seat] += payment;
            }
            _ => {
                let wager = match bet_increment(action, self.pot_total()) {
                    Some(increment) => (to_call + increment).max(to_call + self.min_raise),
                    None => next.stacks[seat],
                };
                let wager = wager.min(next.stacks[seat]);
                next.min_raise = wager - to_call;
                next.stacks[seat] -= wager;
                next.contributions[seat] += wager;
                // A bet or raise re-opens the action
                for other in 0..NUM_PLAYERS {
                    if other != seat && next.alive[other] {
                        next.acted[other] = false;
                    }
                }
            }
        }
        next.history.push(action);
        Ok(next)
    }

    // If one seat put in more than anyone else could match, the excess goes
    // back to them.
    fn return_uncalled(&mut self) {
        let current_bet = self.current_bet();
        let top: Vec<usize> = (0..NUM_PLAYERS)
            .filter(|&s| self.contributions[s] == current_bet)
            .collect();
        if let [seat] = *top.as_slice() {
            let matched = (0..NUM_PLAYERS)
                .filter(|&s| s != seat)
                .map(|s| self.contributions[s])
                .max()
                .unwrap_or(0);
            let excess = current_bet - matched;
            self.contributions[seat] -= excess;
            self.stacks[seat] += excess;
        }
    }

    /// Closes the current street and deals the next one.
    pub fn next_street(&self) -> HandState {
        let mut next = self.clone();
        next.return_uncalled();
        next.pot += next.contributions.iter().sum::<Chips>();
        next.contributions = [0; NUM_PLAYERS];
        next.acted = [false; NUM_PLAYERS];
        next.min_raise = BIG_BLIND;
        next.history.clear();
        next.street = self.street.next();
        next
    }

    /// Pays out the pot and returns each seat's net result for the hand.
    pub fn terminal_utility<E: HandEvaluator + ?Sized>(&self, deal: &Deal, evaluator: &E) -> Utilities {
        let mut state = self.clone();
        state.return_uncalled();
        let pot = state.pot_total();
        let mut final_stacks = state.stacks;

        let alive: Vec<usize> = (0..NUM_PLAYERS).filter(|&s| state.alive[s]).collect();
        let winners: Vec<usize> = if alive.len() <= 1 {
            alive
        } else {
            let scores: Vec<(usize, u64)> = alive
                .iter()
                .map(|&s| (s, evaluator.evaluate(&deal.board, deal.hole(s))))
                .collect();
            let best = scores.iter().map(|(_, score)| *score).min().unwrap_or(0);
            scores
                .into_iter()
                .filter(|(_, score)| *score == best)
                .map(|(s, _)| s)
                .collect()
        };

        if !winners.is_empty() {
            let share = pot / winners.len() as Chips;
            let odd_chips = (pot % winners.len() as Chips) as usize;
            // Seats are already in order from the small blind
            for (i, &w) in winners.iter().enumerate() {
                final_stacks[w] += share + if i < odd_chips { 1 } else { 0 };
            }
        }

        let mut utilities = [0.0; NUM_PLAYERS];
        for seat in 0..NUM_PLAYERS {
            utilities[seat] = final_stacks[seat] as f64 - STARTING_STACK as f64;
        }
        utilities
    }
}

impl Default for HandState {
    fn default() -> Self {
        HandState::new()
    }
}

// Normalizes the values so that they sum to 1. All zeros gives a uniform
// distribution.
pub fn normalize(values: &[f64]) -> Strategy {
    let sum: f64 = values.iter().sum();
    if sum > 0.0 {
        values.iter().map(|v| v / sum).collect()
    } else {
        let n = values.len() as f64;
        values.iter().map(|_| 1.0 / n).collect()
    }
}

/// Randomly samples an action given a strategy aligned with `actions`.
pub fn sample_action_from_strategy<R: Rng + ?Sized>(
    actions: &[Action],
    strategy: &[f64],
    rng: &mut R,
) -> SolverResult<Action> {
    if actions.is_empty() {
        return Err(SolverError::NoLegalActions);
    }
    let dist = WeightedIndex::new(strategy).map_err(|_| SolverError::NoLegalActions)?;
    Ok(actions[dist.sample(rng)])
}
