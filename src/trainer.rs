use crate::bot::Blueprint;
use crate::card_abstraction::Bucketer;
use crate::card_utils::{self, Deal};
use crate::config::Config;
use crate::error::{SolverError, SolverResult};
use crate::evaluator::{HandEvaluator, RsPokerEvaluator};
use crate::nodes::Nodes;
use crate::trainer_utils::*;
use rand::prelude::*;
use rayon::prelude::*;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

/// Trains a blueprint with the default configuration and returns the
/// average strategy.
pub fn train(iterations: u64) -> SolverResult<Blueprint> {
    Trainer::new(Config::default()).train(iterations)
}

/// Owns the learning table for the length of a training run and drives
/// outcome-sampling MCCFR over independently dealt hands.
pub struct Trainer<E: HandEvaluator = RsPokerEvaluator> {
    config: Config,
    nodes: Nodes,
    bucketer: Bucketer,
    evaluator: E,
}

impl Trainer<RsPokerEvaluator> {
    pub fn new(config: Config) -> Trainer<RsPokerEvaluator> {
        Trainer::with_evaluator(config, RsPokerEvaluator)
    }
}

impl<E: HandEvaluator> Trainer<E> {
    pub fn with_evaluator(config: Config, evaluator: E) -> Trainer<E> {
        Trainer {
            config,
            nodes: Nodes::new(),
            bucketer: Bucketer::new(),
            evaluator,
        }
    }

    // Continue from previously trained nodes
    pub fn with_nodes(mut self, nodes: Nodes) -> Trainer<E> {
        self.nodes = nodes;
        self
    }

    pub fn nodes(&self) -> &Nodes {
        &self.nodes
    }

    pub fn bucketer(&self) -> &Bucketer {
        &self.bucketer
    }

    pub fn train(&self, iters: u64) -> SolverResult<Blueprint> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()?;
        let report_every = self.config.report_every.max(1);
        let num_epochs = iters.div_ceil(report_every);
        log::info!(
            "Beginning training: {} iterations on {} threads.",
            iters,
            pool.current_num_threads()
        );

        let mut done = 0;
        for epoch in 0..num_epochs {
            let batch = report_every.min(iters - done);
            log::info!("Training epoch {}/{}", epoch + 1, num_epochs);
            let bar = card_utils::pbar(batch);
            pool.install(|| {
                (done..done + batch).into_par_iter().try_for_each(|i| {
                    let mut rng = self.rng_for(i);
                    self.cfr_iteration(&mut rng)?;
                    bar.inc(1);
                    Ok::<(), SolverError>(())
                })
            })?;
            bar.finish_and_clear();
            done += batch;
            log::info!("Iteration: {}/{} | Nodes: {}", done, iters, self.nodes.len());
            if let Some(path) = &self.config.nodes_path {
                save_nodes(&self.nodes, path)?;
            }
        }

        let blueprint = self.nodes.average_strategy(self.config.history_abstraction);
        log::info!("Training done: {} infosets in the average strategy.", blueprint.len());
        Ok(blueprint)
    }

    // Seeded runs give every iteration its own stream so results don't depend
    // on which worker picks it up.
    fn rng_for(&self, iteration: u64) -> StdRng {
        match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed ^ iteration.wrapping_mul(0x9E37_79B9_7F4A_7C15)),
            None => StdRng::from_entropy(),
        }
    }

    /// Deals a fresh hand and plays it out once.
    pub fn cfr_iteration<R: Rng + ?Sized>(&self, rng: &mut R) -> SolverResult<Utilities> {
        let deal = Deal::new(rng)?;
        self.play_hand(&deal, rng)
    }

    /// Posts the blinds and traverses the hand from the first seat to act.
    pub fn play_hand<R: Rng + ?Sized>(&self, deal: &Deal, rng: &mut R) -> SolverResult<Utilities> {
        let state = HandState::new();
        self.traverse(state.street.first_to_act(), state, deal, rng)
    }

    /// Walks one sampled line of play from `state` and returns every seat's
    /// utility. On the way back the acting seat's node is updated.
    pub fn traverse<R: Rng + ?Sized>(
        &self,
        seat: usize,
        mut state: HandState,
        deal: &Deal,
        rng: &mut R,
    ) -> SolverResult<Utilities> {
        debug_assert_eq!(state.total_chips(), NUM_PLAYERS as Chips * STARTING_STACK);

        if state.num_alive() <= 1 || state.street == Street::Showdown {
            return Ok(state.terminal_utility(deal, &self.evaluator));
        }
        if state.depth > self.config.depth_cap {
            log::debug!("Depth cap hit on the {}, forcing the hand to end", state.street);
            return Ok(state.terminal_utility(deal, &self.evaluator));
        }

        if state.betting_closed() {
            let mut next = state.next_street();
            next.depth += 1;
            return self.traverse(next.street.first_to_act(), next, deal, rng);
        }

        let next_seat = (seat + 1) % NUM_PLAYERS;
        let actions = state.legal_actions(seat);
        if actions.is_empty() {
            // Folded or all-in
            state.depth += 1;
            return self.traverse(next_seat, state, deal, rng);
        }

        let bucket = self.bucketer.bucket(
            &self.evaluator,
            deal.hole(seat),
            deal.board_for(state.street),
            state.street,
            rng,
        )?;
        let infoset = InfosetKey::new(
            state.street,
            bucket,
            &state.history,
            state.to_call(seat) > 0,
            self.config.history_abstraction,
        );
        let policy = self.nodes.policy(&infoset, &actions)?;
        let action = sample_action_from_strategy(&actions, &policy, rng)?;

        let mut next = state.apply(seat, action)?;
        next.depth += 1;
        let utilities = self.traverse(next_seat, next, deal, rng)?;

        self.nodes
            .update(&infoset, &actions, &policy, action, utilities[seat]);
        Ok(utilities)
    }
}

pub fn load_nodes(path: &str) -> SolverResult<Nodes> {
    log::info!("Loading nodes at {} ...", path);
    let file = File::open(path).map_err(|e| SolverError::io(path, e))?;
    let nodes: Nodes = bincode::deserialize_from(BufReader::new(file))?;
    log::info!("Done loading nodes: {} infosets.", nodes.len());
    Ok(nodes)
}

pub fn save_nodes(nodes: &Nodes, path: &str) -> SolverResult<()> {
    let file = File::create(path).map_err(|e| SolverError::io(path, e))?;
    let mut buf_writer = BufWriter::new(file);
    bincode::serialize_into(&mut buf_writer, nodes)?;
    buf_writer.flush().map_err(|e| SolverError::io(path, e))?;
    log::info!("Saved {} nodes to {}.", nodes.len(), path);
    Ok(())
}
