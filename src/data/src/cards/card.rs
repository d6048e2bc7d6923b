// Copyright © cabo 2024-present
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   https://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use enum_iterator::Sequence;
use serde::{Deserialize, Serialize};

/// The suit of a standard playing card. Absent for [Rank::Joker].
///
/// See <https://en.wikipedia.org/wiki/Suit_(cards)>
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Sequence)]
pub enum Suit {
    Hearts,
    Diamonds,
    Clubs,
    Spades,
}

impl Suit {
    /// Red suits (hearts, diamonds) give the king of that suit a special
    /// negative scoring value. See [Rank::score].
    pub fn is_red(&self) -> bool {
        matches!(self, Suit::Hearts | Suit::Diamonds)
    }
}

/// The rank of a standard playing card, plus the joker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Sequence)]
pub enum Rank {
    Ace,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Jack,
    Queen,
    King,
    Joker,
}

impl Rank {
    /// A card is "special" if its rank triggers a player-driven effect after
    /// it is played: 7/8 (view own), 9/10 (view opponent), J/Q (swap), K
    /// (view then swap).
    pub fn is_special(&self) -> bool {
        matches!(
            self,
            Rank::Seven
                | Rank::Eight
                | Rank::Nine
                | Rank::Ten
                | Rank::Jack
                | Rank::Queen
                | Rank::King
        )
    }

    /// Face value used when this rank is not the king, which has a
    /// suit-dependent score. See [Card::score].
    fn face_value(&self) -> i32 {
        match self {
            Rank::Ace => 1,
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten => 10,
            Rank::Jack => 11,
            Rank::Queen => 12,
            Rank::King => 13,
            Rank::Joker => 0,
        }
    }
}

/// An immutable playing card value. Cards are never mutated once created;
/// the deck and player hands hold these by value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub rank: Rank,
    /// `None` only for [Rank::Joker].
    pub suit: Option<Suit>,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { rank, suit: Some(suit) }
    }

    pub fn joker() -> Self {
        Self { rank: Rank::Joker, suit: None }
    }

    pub fn is_special(&self) -> bool {
        self.rank.is_special()
    }

    /// Scoring value of this card: JOKER=0, red king=-1, other king=13,
    /// ace=1, 2-10=face value, jack=11, queen=12.
    pub fn score(&self) -> i32 {
        if self.rank == Rank::King {
            match self.suit {
                Some(suit) if suit.is_red() => -1,
                _ => 13,
            }
        } else {
            self.rank.face_value()
        }
    }
}

/// Sums the scoring value of every card in a hand.
pub fn score_hand(hand: &[Card]) -> i32 {
    hand.iter().map(Card::score).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joker_scores_zero() {
        assert_eq!(Card::joker().score(), 0);
    }

    #[test]
    fn red_king_scores_negative_one() {
        assert_eq!(Card::new(Rank::King, Suit::Hearts).score(), -1);
        assert_eq!(Card::new(Rank::King, Suit::Diamonds).score(), -1);
    }

    #[test]
    fn black_king_scores_thirteen() {
        assert_eq!(Card::new(Rank::King, Suit::Clubs).score(), 13);
        assert_eq!(Card::new(Rank::King, Suit::Spades).score(), 13);
    }

    #[test]
    fn face_cards_score_correctly() {
        assert_eq!(Card::new(Rank::Ace, Suit::Spades).score(), 1);
        assert_eq!(Card::new(Rank::Jack, Suit::Spades).score(), 11);
        assert_eq!(Card::new(Rank::Queen, Suit::Spades).score(), 12);
        assert_eq!(Card::new(Rank::Seven, Suit::Spades).score(), 7);
    }

    #[test]
    fn special_ranks() {
        for rank in [Rank::Seven, Rank::Eight, Rank::Nine, Rank::Ten, Rank::Jack, Rank::Queen, Rank::King] {
            assert!(rank.is_special(), "{rank:?} should be special");
        }
        for rank in [Rank::Ace, Rank::Two, Rank::Three, Rank::Four, Rank::Five, Rank::Six] {
            assert!(!rank.is_special(), "{rank:?} should not be special");
        }
        assert!(!Rank::Joker.is_special());
    }

    #[test]
    fn score_hand_sums_cards() {
        let hand = vec![Card::new(Rank::Ace, Suit::Hearts), Card::new(Rank::King, Suit::Hearts), Card::joker()];
        assert_eq!(score_hand(&hand), 1 + -1 + 0);
    }
}
