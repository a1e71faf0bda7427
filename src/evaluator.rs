// Hand strength is an external primitive. The rest of the crate only sees the
// HandEvaluator trait; RsPokerEvaluator adapts the rs_poker ranker to it.

use crate::card_utils::Card;
use rs_poker::core::{Hand, Rank, Rankable, Suit, Value};

/// Lower scores are stronger hands.
pub type Score = u64;

pub trait HandEvaluator: Sync {
    /// Scores two hole cards combined with 0, 3, 4 or 5 board cards.
    fn evaluate(&self, board: &[Card], hole: &[Card]) -> Score;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RsPokerEvaluator;

impl HandEvaluator for RsPokerEvaluator {
    fn evaluate(&self, board: &[Card], hole: &[Card]) -> Score {
        let cards: Option<Vec<rs_poker::core::Card>> = hole.iter().chain(board).map(to_rs_poker).collect();
        debug_assert!(cards.is_some(), "card out of range in {:?} {:?}", hole, board);
        match cards {
            Some(cards) => Score::MAX - strength(&Hand::new_with_cards(cards).rank()),
            // A malformed hand never wins a showdown
            None => Score::MAX,
        }
    }
}

fn to_rs_poker(card: &Card) -> Option<rs_poker::core::Card> {
    let value = Value::from_char(*b"23456789TJQKA".get(card.rank.checked_sub(2)? as usize)? as char)?;
    let suit = Suit::from_char(*b"cdhs".get(card.suit as usize)? as char)?;
    Some(rs_poker::core::Card { value, suit })
}

// Category in the high word, rs_poker's in-category ordering in the low word.
fn strength(rank: &Rank) -> u64 {
    let (category, within) = match *rank {
        Rank::HighCard(v) => (0, v),
        Rank::OnePair(v) => (1, v),
        Rank::TwoPair(v) => (2, v),
        Rank::ThreeOfAKind(v) => (3, v),
        Rank::Straight(v) => (4, v),
        Rank::Flush(v) => (5, v),
        Rank::FullHouse(v) => (6, v),
        Rank::FourOfAKind(v) => (7, v),
        Rank::StraightFlush(v) => (8, v),
    };
    (category << 32) | within as u64
}
