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

use enum_iterator::all;
use rand::seq::SliceRandom;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::cards::card::{Card, Rank, Suit};

/// The 52-card standard deck plus 2 jokers, shuffled uniformly at game
/// creation. Cards are drawn LIFO from the top, i.e. from the end of
/// [Self::cards].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    /// Builds a new shuffled deck. The caller supplies the RNG so that it can
    /// be the game's own seeded generator rather than a source derived from
    /// game inputs (see [crate::game_states::game_state::GameState::rng]).
    pub fn new_shuffled(rng: &mut impl RngCore) -> Self {
        let mut cards = Vec::with_capacity(54);
        for rank in all::<Rank>() {
            if rank == Rank::Joker {
                continue;
            }
            for suit in all::<Suit>() {
                cards.push(Card::new(rank, suit));
            }
        }
        cards.push(Card::joker());
        cards.push(Card::joker());
        cards.shuffle(rng);
        Self { cards }
    }

    /// Draws the top card of the deck, or `None` if the deck is empty.
    pub fn draw(&mut self) -> Option<Card> {
        self.cards.pop()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Test-only helper that stacks a known sequence of cards on top of the
    /// deck so that the next `len` draws are deterministic, without
    /// disturbing cards already beneath them.
    #[cfg(any(test, feature = "test-support"))]
    pub fn stack_top(&mut self, mut cards: Vec<Card>) {
        self.cards.append(&mut cards);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::mock::StepRng;

    #[test]
    fn new_shuffled_deck_has_54_cards() {
        let mut rng = StepRng::new(0, 1);
        let deck = Deck::new_shuffled(&mut rng);
        assert_eq!(deck.len(), 54);
    }

    #[test]
    fn draw_is_lifo() {
        let mut deck = Deck::default();
        deck.stack_top(vec![Card::new(Rank::Ace, Suit::Spades), Card::new(Rank::King, Suit::Hearts)]);
        assert_eq!(deck.draw(), Some(Card::new(Rank::King, Suit::Hearts)));
        assert_eq!(deck.draw(), Some(Card::new(Rank::Ace, Suit::Spades)));
        assert_eq!(deck.draw(), None);
    }

    #[test]
    fn draw_from_empty_deck_is_none() {
        let mut deck = Deck::default();
        assert!(deck.is_empty());
        assert_eq!(deck.draw(), None);
    }
}
