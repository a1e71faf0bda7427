use crate::card_abstraction::Bucketer;
use crate::card_utils::Card;
use crate::error::{SolverError, SolverResult};
use crate::evaluator::HandEvaluator;
use crate::trainer_utils::*;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

pub type StrategyMap = HashMap<Action, f64>;

/// The trained average strategy: a probability distribution over abstract
/// actions for every information set that was reached during training.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Blueprint {
    pub history_abstraction: HistoryAbstraction,
    strategies: HashMap<InfosetKey, StrategyMap>,
}

impl Blueprint {
    pub fn new(history_abstraction: HistoryAbstraction, strategies: HashMap<InfosetKey, StrategyMap>) -> Blueprint {
        Blueprint {
            history_abstraction,
            strategies,
        }
    }

    pub fn get(&self, infoset: &InfosetKey) -> Option<&StrategyMap> {
        self.strategies.get(infoset)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&InfosetKey, &StrategyMap)> {
        self.strategies.iter()
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    pub fn save(&self, path: &str) -> SolverResult<()> {
        let file = File::create(path).map_err(|e| SolverError::io(path, e))?;
        let mut buf_writer = BufWriter::new(file);
        bincode::serialize_into(&mut buf_writer, self)?;
        buf_writer.flush().map_err(|e| SolverError::io(path, e))?;
        log::info!("Saved strategy for {} infosets to {}", self.len(), path);
        Ok(())
    }

    pub fn load(path: &str) -> SolverResult<Blueprint> {
        log::info!("Loading strategy at {} ...", path);
        let file = File::open(path).map_err(|e| SolverError::io(path, e))?;
        let blueprint: Blueprint = bincode::deserialize_from(BufReader::new(file))?;
        log::info!("Done loading strategy: {} infosets.", blueprint.len());
        Ok(blueprint)
    }

    /// A readable rendering keyed by `street|bucket|history|facing`, with
    /// keys sorted so the output is stable.
    pub fn to_json(&self) -> SolverResult<String> {
        let readable: BTreeMap<String, BTreeMap<&str, f64>> = self
            .strategies
            .iter()
            .map(|(infoset, strategy)| {
                let strategy = strategy.iter().map(|(a, p)| (a.label(), *p)).collect();
                (infoset.to_string(), strategy)
            })
            .collect();
        Ok(serde_json::to_string_pretty(&readable)?)
    }

    pub fn write_json(&self, path: &str) -> SolverResult<()> {
        let json = self.to_json()?;
        let mut file = File::create(path).map_err(|e| SolverError::io(path, e))?;
        file.write_all(json.as_bytes())
            .map_err(|e| SolverError::io(path, e))?;
        log::info!("Wrote JSON strategy to {}", path);
        Ok(())
    }
}

// Policy for situations training never reached
pub fn default_strategy(facing_bet: bool) -> StrategyMap {
    let action = if facing_bet { Action::Fold } else { Action::Check };
    StrategyMap::from([(action, 1.0)])
}

/// Looks up the blueprint strategy for live situations.
pub struct Bot<E: HandEvaluator> {
    blueprint: Blueprint,
    bucketer: Bucketer,
    evaluator: E,
}

impl<E: HandEvaluator> Bot<E> {
    pub fn new(blueprint: Blueprint, evaluator: E) -> Bot<E> {
        Bot {
            blueprint,
            bucketer: Bucketer::new(),
            evaluator,
        }
    }

    pub fn blueprint(&self) -> &Blueprint {
        &self.blueprint
    }

    pub fn infoset<R: Rng + ?Sized>(
        &self,
        hole: &[Card],
        board: &[Card],
        street: Street,
        history: &[Action],
        facing_bet: bool,
        rng: &mut R,
    ) -> SolverResult<InfosetKey> {
        let bucket = self.bucketer.bucket(&self.evaluator, hole, board, street, rng)?;
        Ok(InfosetKey::new(
            street,
            bucket,
            history,
            facing_bet,
            self.blueprint.history_abstraction,
        ))
    }

    // Missing infosets are expected at inference time and fall back to
    // default_strategy.
    pub fn get_strategy<R: Rng + ?Sized>(
        &self,
        hole: &[Card],
        board: &[Card],
        street: Street,
        history: &[Action],
        facing_bet: bool,
        rng: &mut R,
    ) -> SolverResult<StrategyMap> {
        let infoset = self.infoset(hole, board, street, history, facing_bet, rng)?;
        match self.blueprint.get(&infoset) {
            Some(strategy) => Ok(strategy.clone()),
            None => {
                log::debug!("{} not in blueprint, using default", infoset);
                Ok(default_strategy(facing_bet))
            }
        }
    }

    /// The most likely action of the strategy for this situation.
    pub fn best_action<R: Rng + ?Sized>(
        &self,
        hole: &[Card],
        board: &[Card],
        street: Street,
        history: &[Action],
        facing_bet: bool,
        rng: &mut R,
    ) -> SolverResult<Action> {
        let strategy = self.get_strategy(hole, board, street, history, facing_bet, rng)?;
        strategy
            .into_iter()
            .max_by(|(a1, p1), (a2, p2)| p1.total_cmp(p2).then(a2.cmp(a1)))
            .map(|(action, _)| action)
            .ok_or(SolverError::NoLegalActions)
    }

    pub fn get_action<R: Rng + ?Sized>(
        &self,
        hole: &[Card],
        board: &[Card],
        street: Street,
        history: &[Action],
        facing_bet: bool,
        rng: &mut R,
    ) -> SolverResult<Action> {
        let strategy = self.get_strategy(hole, board, street, history, facing_bet, rng)?;
        let (actions, probs): (Vec<Action>, Vec<f64>) = strategy.into_iter().unzip();
        sample_action_from_strategy(&actions, &probs, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card_utils::str2cards;
    use crate::evaluator::RsPokerEvaluator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn blueprint_with(infoset: InfosetKey, strategy: StrategyMap) -> Blueprint {
        Blueprint::new(HistoryAbstraction::Sorted, HashMap::from([(infoset, strategy)]))
    }

    #[test]
    fn missing_infoset_uses_default() {
        let bot = Bot::new(Blueprint::default(), RsPokerEvaluator);
        let mut rng = StdRng::seed_from_u64(1);
        let hole = str2cards("7h2c").unwrap();
        let facing = bot
            .get_strategy(&hole, &[], Street::Preflop, &[], true, &mut rng)
            .unwrap();
        assert_eq!(facing, default_strategy(true));
        let open = bot
            .best_action(&hole, &[], Street::Preflop, &[], false, &mut rng)
            .unwrap();
        assert_eq!(open, Action::Check);
    }

    #[test]
    fn looks_up_trained_strategy() {
        let hole = str2cards("AsKs").unwrap();
        let bucket = Bucketer::preflop_bucket([hole[0], hole[1]]);
        let infoset = InfosetKey::new(
            Street::Preflop,
            bucket,
            &[Action::Medium, Action::Call],
            true,
            HistoryAbstraction::Sorted,
        );
        let strategy = StrategyMap::from([(Action::Fold, 0.1), (Action::AllIn, 0.9)]);
        let bot = Bot::new(blueprint_with(infoset, strategy.clone()), RsPokerEvaluator);
        let mut rng = StdRng::seed_from_u64(2);
        // Same multiset in a different order hits the same infoset
        let history = [Action::Call, Action::Medium];
        let found = bot
            .get_strategy(&hole, &[], Street::Preflop, &history, true, &mut rng)
            .unwrap();
        assert_eq!(found, strategy);
        let best = bot
            .best_action(&hole, &[], Street::Preflop, &history, true, &mut rng)
            .unwrap();
        assert_eq!(best, Action::AllIn);
    }

    #[test]
    fn json_uses_readable_keys() {
        let infoset = InfosetKey::new(Street::Turn, 7, &[Action::Check], false, HistoryAbstraction::Sorted);
        let blueprint = blueprint_with(infoset, StrategyMap::from([(Action::Check, 1.0)]));
        let json: serde_json::Value = serde_json::from_str(&blueprint.to_json().unwrap()).unwrap();
        assert_eq!(json["turn|7|check|open"]["check"], 1.0);
    }

    #[test]
    fn short_hand_is_an_error() {
        let bot = Bot::new(Blueprint::default(), RsPokerEvaluator);
        let mut rng = StdRng::seed_from_u64(3);
        let hole = str2cards("Ah").unwrap();
        let result = bot.get_strategy(&hole, &[], Street::Preflop, &[], true, &mut rng);
        assert!(matches!(result, Err(SolverError::HoleCards(1))));
    }
}
