// This is the main interface for card abstractions. You can think of this as a
// black box that maps a poker hand to a bucket number. Similar hands land in
// the same bucket, so we can treat them as the same to keep the number of
// information sets small.

use crate::card_utils::{Card, Deck};
use crate::error::{SolverError, SolverResult};
use crate::evaluator::HandEvaluator;
use crate::trainer_utils::Street;
use ahash::RandomState;
use dashmap::DashMap;
use rand::Rng;
use std::sync::atomic::{AtomicU64, Ordering};

pub const NUM_BUCKETS: u8 = 12;

// Opponent hands drawn to estimate the hand strength percentile postflop
pub const OPPONENT_SAMPLES: usize = 25;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct BucketKey {
    hole: [Card; 2],
    board: Vec<Card>,
    street: Street,
}

impl BucketKey {
    fn new(hole: [Card; 2], board: &[Card], street: Street) -> BucketKey {
        let mut sorted_hole = hole;
        sorted_hole.sort();
        let mut board = board.to_vec();
        board.sort();
        BucketKey {
            hole: sorted_hole,
            board,
            street,
        }
    }
}

/// Caches the bucket of every (hole, board, street) it has seen. Shared by
/// all training workers.
#[derive(Debug, Default)]
pub struct Bucketer {
    cache: DashMap<BucketKey, u8, RandomState>,
    sampling_runs: AtomicU64,
}

impl Bucketer {
    pub fn new() -> Bucketer {
        Bucketer::default()
    }

    /// Returns the bucket in `0..NUM_BUCKETS` for the hand. Anything but two
    /// hole cards is an error.
    pub fn bucket<E, R>(
        &self,
        evaluator: &E,
        hole: &[Card],
        board: &[Card],
        street: Street,
        rng: &mut R,
    ) -> SolverResult<u8>
    where
        E: HandEvaluator + ?Sized,
        R: Rng + ?Sized,
    {
        let hole: [Card; 2] = hole
            .try_into()
            .map_err(|_| SolverError::HoleCards(hole.len()))?;
        let key = BucketKey::new(hole, board, street);
        if let Some(bucket) = self.cache.get(&key) {
            return Ok(*bucket);
        }
        let bucket = if board.is_empty() {
            Bucketer::preflop_bucket(hole)
        } else {
            self.sampling_runs.fetch_add(1, Ordering::Relaxed);
            Bucketer::postflop_bucket(evaluator, &hole, board, rng)?
        };
        self.cache.insert(key, bucket);
        Ok(bucket)
    }

    // Closed-form score from the two ranks. AA and KK would overflow the top
    // bucket so the result is clamped.
    pub fn preflop_bucket(hole: [Card; 2]) -> u8 {
        let [c1, c2] = hole;
        let is_pair = c1.rank == c2.rank;
        let is_suited = c1.suit == c2.suit;
        let score = c1.rank as u32
            + c2.rank as u32
            + if is_pair { 20 } else { 0 }
            + if is_suited { 10 } else { 0 };
        (score / 4).min(NUM_BUCKETS as u32 - 1) as u8
    }

    // Percentile of hero's strength among randomly sampled opponent hands.
    // Each trial draws two cards and puts them back afterwards.
    fn postflop_bucket<E, R>(evaluator: &E, hole: &[Card], board: &[Card], rng: &mut R) -> SolverResult<u8>
    where
        E: HandEvaluator + ?Sized,
        R: Rng + ?Sized,
    {
        let hero = evaluator.evaluate(board, hole);
        let mut deck = Deck::without(&[hole, board].concat());
        let mut wins = 0;
        for _ in 0..OPPONENT_SAMPLES {
            let opponent = deck.draw_random(2, rng)?;
            if hero < evaluator.evaluate(board, &opponent) {
                wins += 1;
            }
            deck.put_back(&opponent);
        }
        let percentile = wins as f64 / OPPONENT_SAMPLES as f64;
        let bucket = (percentile * NUM_BUCKETS as f64).floor() as u8;
        Ok(bucket.min(NUM_BUCKETS - 1))
    }

    /// Number of times the opponent sampling loop has run.
    pub fn sampling_runs(&self) -> u64 {
        self.sampling_runs.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card_utils::{str2cards, Deal};
    use crate::evaluator::RsPokerEvaluator;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn preflop_buckets() {
        let bucket = |s: &str| {
            let cards = str2cards(s).unwrap();
            Bucketer::preflop_bucket([cards[0], cards[1]])
        };
        // 2 + 7 = 9
        assert_eq!(bucket("2c7d"), 2);
        // 14 + 13 + 10 = 37
        assert_eq!(bucket("AsKs"), 9);
        // 14 + 13 = 27
        assert_eq!(bucket("AsKd"), 6);
        // 14 + 14 + 20 = 48, clamped
        assert_eq!(bucket("AsAd"), 11);
        assert_eq!(bucket("KsKd"), 11);
        assert_eq!(bucket("2s2d"), 6);
    }

    #[test]
    fn nuts_and_air_on_the_river() {
        let bucketer = Bucketer::new();
        let mut rng = StdRng::seed_from_u64(5);
        let board = str2cards("QsJsTs2c3d").unwrap();
        let nuts = bucketer
            .bucket(&RsPokerEvaluator, &str2cards("AsKs").unwrap(), &board, Street::River, &mut rng)
            .unwrap();
        assert_eq!(nuts, NUM_BUCKETS - 1);
        let air = bucketer
            .bucket(&RsPokerEvaluator, &str2cards("4h5c").unwrap(), &board, Street::River, &mut rng)
            .unwrap();
        assert!(air <= 2);
    }

    #[test]
    fn bucket_range_over_random_deals() {
        let bucketer = Bucketer::new();
        let mut rng = StdRng::seed_from_u64(17);
        for _ in 0..200 {
            let deal = Deal::new(&mut rng).unwrap();
            for street in [Street::Preflop, Street::Flop, Street::Turn, Street::River] {
                let bucket = bucketer
                    .bucket(&RsPokerEvaluator, deal.hole(0), deal.board_for(street), street, &mut rng)
                    .unwrap();
                assert!(bucket < NUM_BUCKETS);
            }
        }
    }

    #[test]
    fn wrong_number_of_hole_cards_is_an_error() {
        let bucketer = Bucketer::new();
        let mut rng = StdRng::seed_from_u64(8);
        for hole in ["Ah", "AhKdQc", ""] {
            let hole = str2cards(hole).unwrap();
            let result = bucketer.bucket(&RsPokerEvaluator, &hole, &[], Street::Preflop, &mut rng);
            assert!(matches!(result, Err(SolverError::HoleCards(n)) if n == hole.len()));
        }
        let flop = str2cards("Ac7s2d").unwrap();
        let result = bucketer.bucket(&RsPokerEvaluator, &flop[..1], &flop, Street::Flop, &mut rng);
        assert!(result.is_err());
        assert!(bucketer.is_empty());
    }
}
