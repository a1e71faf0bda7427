use crate::error::{SolverError, SolverResult};
use crate::trainer_utils::Street;
use itertools::Itertools;
use once_cell::sync::Lazy;
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const RANK_CHARS: &str = "23456789TJQKA";
const SUIT_CHARS: &str = "cdhs";

static DECK: Lazy<Vec<Card>> = Lazy::new(|| {
    let mut deck = Vec::with_capacity(52);
    for rank in 2..15 {
        for suit in 0..4 {
            deck.push(Card { rank, suit });
        }
    }
    deck
});

// Fields are declared rank first so the derived order sorts by rank, then suit.
#[derive(Hash, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Card {
    pub rank: u8,
    pub suit: u8,
}

impl FromStr for Card {
    type Err = SolverError;

    fn from_str(card: &str) -> SolverResult<Card> {
        let mut chars = card.chars();
        let (rank, suit) = match (chars.next(), chars.next(), chars.next()) {
            (Some(r), Some(s), None) => (r, s),
            _ => return Err(SolverError::InvalidCard(card.to_string())),
        };
        let rank = RANK_CHARS
            .find(rank.to_ascii_uppercase())
            .ok_or_else(|| SolverError::InvalidCard(card.to_string()))?;
        let suit = SUIT_CHARS
            .find(suit.to_ascii_lowercase())
            .ok_or_else(|| SolverError::InvalidCard(card.to_string()))?;
        Ok(Card {
            rank: rank as u8 + 2,
            suit: suit as u8,
        })
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let rank = RANK_CHARS
            .chars()
            .nth(self.rank.saturating_sub(2) as usize)
            .unwrap_or('?');
        let suit = SUIT_CHARS.chars().nth(self.suit as usize).unwrap_or('?');
        write!(f, "{}{}", rank, suit)
    }
}

/// All 52 cards in (rank, suit) order.
pub fn deck() -> Vec<Card> {
    DECK.clone()
}

pub fn cards2str(cards: &[Card]) -> String {
    cards.iter().map(|c| c.to_string()).collect()
}

// Parses a run of two-character cards such as "AhKd7c".
pub fn str2cards(cards: &str) -> SolverResult<Vec<Card>> {
    if cards.len() % 2 != 0 {
        return Err(SolverError::InvalidCard(cards.to_string()));
    }
    (0..cards.len())
        .step_by(2)
        .map(|i| {
            cards
                .get(i..i + 2)
                .ok_or_else(|| SolverError::InvalidCard(cards.to_string()))
                .and_then(Card::from_str)
        })
        .collect()
}

pub fn strvec2cards(strvec: &[&str]) -> SolverResult<Vec<Card>> {
    strvec.iter().map(|s| s.parse()).collect()
}

pub fn pbar(n: u64) -> indicatif::ProgressBar {
    let bar = indicatif::ProgressBar::new(n);
    let style = indicatif::ProgressStyle::with_template(
        "[{elapsed_precise}/{eta_precise}] {wide_bar} {pos:>7}/{len:7} {msg}",
    )
    .unwrap_or_else(|_| indicatif::ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

/// A pool of cards that can be shuffled, drawn from and refilled.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn new() -> Deck {
        Deck { cards: deck() }
    }

    // Deck of every card except the given ones
    pub fn without(known: &[Card]) -> Deck {
        let mut deck = Deck::new();
        deck.remove(known);
        deck
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, card: &Card) -> bool {
        self.cards.contains(card)
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
    }

    pub fn remove(&mut self, cards: &[Card]) {
        self.cards.retain(|c| !cards.contains(c));
    }

    /// Draws from the top of the deck.
    pub fn draw(&mut self, n: usize) -> SolverResult<Vec<Card>> {
        if n > self.cards.len() {
            return Err(SolverError::NotEnoughCards {
                requested: n,
                available: self.cards.len(),
            });
        }
        let at = self.cards.len() - n;
        Ok(self.cards.split_off(at))
    }

    fn draw_array<const N: usize>(&mut self) -> SolverResult<[Card; N]> {
        let cards = self.draw(N)?;
        cards.try_into().map_err(|cards: Vec<Card>| SolverError::NotEnoughCards {
            requested: N,
            available: cards.len(),
        })
    }

    /// Draws `n` cards uniformly at random without replacement, without
    /// shuffling the rest of the deck.
    pub fn draw_random<R: Rng + ?Sized>(&mut self, n: usize, rng: &mut R) -> SolverResult<Vec<Card>> {
        if n > self.cards.len() {
            return Err(SolverError::NotEnoughCards {
                requested: n,
                available: self.cards.len(),
            });
        }
        let mut drawn = Vec::with_capacity(n);
        for _ in 0..n {
            let i = rng.gen_range(0..self.cards.len());
            drawn.push(self.cards.swap_remove(i));
        }
        Ok(drawn)
    }

    pub fn put_back(&mut self, cards: &[Card]) {
        self.cards.extend_from_slice(cards);
    }
}

impl Default for Deck {
    fn default() -> Self {
        Deck::new()
    }
}

pub fn board_length(street: Street) -> usize {
    match street {
        Street::Preflop => 0,
        Street::Flop => 3,
        Street::Turn => 4,
        Street::River | Street::Showdown => 5,
    }
}

/// Hole cards for all three seats and the full five-card board. Read-only
/// once dealt; every branch of a traversal shares it by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deal {
    pub hands: [[Card; 2]; 3],
    pub board: [Card; 5],
}

impl Deal {
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> SolverResult<Deal> {
        let mut deck = Deck::new();
        deck.shuffle(rng);
        Ok(Deal {
            hands: [deck.draw_array()?, deck.draw_array()?, deck.draw_array()?],
            board: deck.draw_array()?,
        })
    }

    pub fn hole(&self, seat: usize) -> &[Card] {
        &self.hands[seat]
    }

    // Community cards visible on the given street
    pub fn board_for(&self, street: Street) -> &[Card] {
        &self.board[..board_length(street)]
    }
}

impl fmt::Display for Deal {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let hands = self.hands.iter().map(|h| cards2str(h)).join(" ");
        write!(f, "{} | {}", hands, cards2str(&self.board))
    }
}
