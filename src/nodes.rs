use crate::bot::{Blueprint, StrategyMap};
use crate::error::{SolverError, SolverResult};
use crate::trainer_utils::*;
use ahash::RandomState;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

/// The learning table: one node per information set, created on first visit.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Nodes {
    dashmap: DashMap<InfosetKey, Node, RandomState>,
}

impl Nodes {
    pub fn new() -> Nodes {
        Nodes::default()
    }

    pub fn get(&self, infoset: &InfosetKey) -> Option<Node> {
        self.dashmap.get(infoset).map(|n| n.clone())
    }

    // Current regret-matching policy at this infoset. Creates the node if it
    // doesn't exist yet. The shard lock is released before returning.
    pub fn policy(&self, infoset: &InfosetKey, actions: &[Action]) -> SolverResult<Strategy> {
        if let Some(node) = self.dashmap.get(infoset) {
            return node.policy(actions);
        }
        self.dashmap
            .entry(infoset.clone())
            .or_default()
            .policy(actions)
    }

    /// Applies one outcome-sampling update to the node at `infoset`.
    pub fn update(
        &self,
        infoset: &InfosetKey,
        actions: &[Action],
        policy: &[f64],
        sampled: Action,
        utility: f64,
    ) {
        self.dashmap
            .entry(infoset.clone())
            .or_default()
            .update(actions, policy, sampled, utility);
    }

    /// Adds every accumulator of `other` into this table. Regret and strategy
    /// sums are additive, so merging per-worker tables is exact.
    pub fn merge(&self, other: Nodes) {
        for (infoset, node) in other.dashmap.into_iter() {
            self.dashmap.entry(infoset).or_default().merge(&node);
        }
    }

    pub fn len(&self) -> usize {
        self.dashmap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dashmap.is_empty()
    }

    /// Normalizes every node's strategy sum into the time-averaged strategy.
    pub fn average_strategy(&self, history_abstraction: HistoryAbstraction) -> Blueprint {
        let strategies = self
            .dashmap
            .iter()
            .filter_map(|entry| {
                entry
                    .value()
                    .average_strategy()
                    .map(|s| (entry.key().clone(), s))
            })
            .collect();
        Blueprint::new(history_abstraction, strategies)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Node {
    regrets: [f64; NUM_ACTIONS],
    strategy_sum: [f64; NUM_ACTIONS],
    // Bit i is set once ALL_ACTIONS[i] has been legal here
    seen: u8,
}

impl Node {
    pub fn new() -> Node {
        Node::default()
    }

    pub fn regret(&self, action: Action) -> f64 {
        self.regrets[action.index()]
    }

    pub fn strategy_sum(&self, action: Action) -> f64 {
        self.strategy_sum[action.index()]
    }

    // Regret matching: play in proportion to positive regret, uniformly if no
    // action has any.
    pub fn policy(&self, actions: &[Action]) -> SolverResult<Strategy> {
        if actions.is_empty() {
            return Err(SolverError::NoLegalActions);
        }
        let positive_regrets: Strategy = actions
            .iter()
            .map(|a| self.regrets[a.index()].max(0.0))
            .collect();
        Ok(normalize(&positive_regrets))
    }

    // regret[a] += u·[a sampled] − σ(a)·u and strategy_sum[a] += σ(a) for
    // every legal action.
    pub fn update(&mut self, actions: &[Action], policy: &[f64], sampled: Action, utility: f64) {
        for (&action, &prob) in actions.iter().zip(policy) {
            let i = action.index();
            let realized = if action == sampled { utility } else { 0.0 };
            self.regrets[i] += realized - prob * utility;
            self.strategy_sum[i] += prob;
            self.seen |= 1 << i;
        }
    }

    pub fn merge(&mut self, other: &Node) {
        for i in 0..NUM_ACTIONS {
            self.regrets[i] += other.regrets[i];
            self.strategy_sum[i] += other.strategy_sum[i];
        }
        self.seen |= other.seen;
    }

    /// The average strategy over the actions ever legal here, or None if the
    /// node has accumulated nothing.
    pub fn average_strategy(&self) -> Option<StrategyMap> {
        let actions: Vec<Action> = ALL_ACTIONS
            .iter()
            .copied()
            .filter(|a| self.seen & (1 << a.index()) != 0)
            .collect();
        let total: f64 = actions.iter().map(|a| self.strategy_sum[a.index()]).sum();
        if total <= 0.0 {
            return None;
        }
        Some(
            actions
                .into_iter()
                .map(|a| (a, self.strategy_sum[a.index()] / total))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACTIONS: [Action; 3] = [Action::Fold, Action::Call, Action::AllIn];

    fn key() -> InfosetKey {
        InfosetKey::new(Street::Preflop, 4, &[], true, HistoryAbstraction::Sorted)
    }

    #[test]
    fn uniform_when_no_positive_regret() {
        let mut node = Node::new();
        assert_eq!(node.policy(&ACTIONS).unwrap().as_slice(), &[1.0 / 3.0; 3]);
        node.update(&ACTIONS, &[1.0 / 3.0; 3], Action::Fold, 30.0);
        // Only fold has positive regret now
        let policy = node.policy(&ACTIONS).unwrap();
        assert_eq!(policy.as_slice(), &[1.0, 0.0, 0.0]);

        let mut node = Node::new();
        node.regrets = [-5.0; NUM_ACTIONS];
        node.regrets[Action::Call.index()] = 0.0;
        assert_eq!(node.policy(&ACTIONS).unwrap().as_slice(), &[1.0 / 3.0; 3]);
    }

    #[test]
    fn policy_is_a_distribution() {
        let mut node = Node::new();
        node.update(&ACTIONS, &[0.2, 0.3, 0.5], Action::AllIn, 100.0);
        node.update(&ACTIONS, &[0.2, 0.3, 0.5], Action::Call, 40.0);
        let policy = node.policy(&ACTIONS).unwrap();
        assert!(policy.iter().all(|p| *p >= 0.0));
        assert!((policy.iter().sum::<f64>() - 1.0).abs() < 1e-9);
        assert!(node.policy(&[]).is_err());
    }

    #[test]
    fn regret_update_matches_outcome_sampling() {
        let mut node = Node::new();
        node.update(&ACTIONS, &[0.25, 0.25, 0.5], Action::Call, 100.0);
        assert_eq!(node.regret(Action::Fold), -25.0);
        assert_eq!(node.regret(Action::Call), 75.0);
        assert_eq!(node.regret(Action::AllIn), -50.0);
        assert_eq!(node.strategy_sum(Action::AllIn), 0.5);
    }

    #[test]
    fn average_strategy_covers_legal_actions() {
        let mut node = Node::new();
        assert!(node.average_strategy().is_none());
        node.update(&ACTIONS, &[1.0, 0.0, 0.0], Action::Fold, 0.0);
        node.update(&ACTIONS, &[0.0, 1.0, 0.0], Action::Call, 0.0);
        let avg = node.average_strategy().unwrap();
        assert_eq!(avg.len(), 3);
        assert_eq!(avg[&Action::Fold], 0.5);
        assert_eq!(avg[&Action::Call], 0.5);
        assert_eq!(avg[&Action::AllIn], 0.0);
    }

    #[test]
    fn nodes_are_created_lazily_and_merge() {
        let nodes = Nodes::new();
        assert!(nodes.get(&key()).is_none());
        let policy = nodes.policy(&key(), &ACTIONS).unwrap();
        assert_eq!(nodes.len(), 1);
        nodes.update(&key(), &ACTIONS, &policy, Action::Call, 9.0);

        let other = Nodes::new();
        other.update(&key(), &ACTIONS, &policy, Action::Call, 9.0);
        nodes.merge(other);
        let node = nodes.get(&key()).unwrap();
        assert_eq!(node.regret(Action::Call), 12.0);
        assert_eq!(node.strategy_sum(Action::Fold), 2.0 / 3.0);
    }
}
