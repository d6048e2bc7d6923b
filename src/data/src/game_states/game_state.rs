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

use rand_xoshiro::Xoshiro256StarStar;
use serde::{Deserialize, Serialize};

use crate::cards::card::Card;
use crate::cards::deck::Deck;
use crate::core::primitives::{GameId, PlayerId};
use crate::events::event::GameEvent;
use crate::game_states::phase::{GamePhase, SpecialActionKind};
use crate::game_states::player_state::PlayerState;
use crate::game_states::timers::Timers;
use crate::game_states::visibility::VisibilityMap;

/// Options controlling overall gameplay, set at room "start game" time and
/// immutable for the life of the game.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GameConfiguration {
    pub min_players: u8,
    pub max_players: u8,

    /// If true, the game's RNG is seeded deterministically (for tests)
    /// rather than from OS entropy.
    pub deterministic: bool,
}

impl Default for GameConfiguration {
    fn default() -> Self {
        Self { min_players: 2, max_players: 8, deterministic: false }
    }
}

/// In-memory ring of the most recent engine events, kept alongside (not
/// instead of) the durable event stream; useful for debugging and for
/// in-process observability without a store round-trip.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GameHistory {
    events: Vec<GameEvent>,
    capacity: usize,
}

impl GameHistory {
    pub fn new(capacity: usize) -> Self {
        Self { events: Vec::new(), capacity }
    }

    pub fn push(&mut self, event: GameEvent) {
        if self.capacity == 0 {
            return;
        }
        self.events.push(event);
        if self.events.len() > self.capacity {
            self.events.remove(0);
        }
    }

    pub fn recent(&self) -> &[GameEvent] {
        &self.events
    }
}

/// Bookkeeping for the special-action phase following a 7/8/9/10/J/Q play.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpecialAction {
    pub player: PlayerId,
    pub kind: SpecialActionKind,
}

/// Bookkeeping for the King phases: the viewed card, its owner, and slot
/// index, kept so that `KING_SWAP_CARDS`/`KING_SKIP_SWAP` know what was
/// seen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct KingViewState {
    pub card: Card,
    pub target: PlayerId,
    pub index: usize,
}

/// The full authoritative state of one ongoing game of Cabo.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameState {
    pub id: GameId,
    pub phase: GamePhase,
    pub configuration: GameConfiguration,

    /// Players in fixed seating order.
    pub players: Vec<PlayerState>,
    pub current_player_index: usize,

    pub deck: Deck,
    pub discard_pile: Vec<Card>,

    /// The current player's drawn card, if any. Clearable state: must be
    /// `None` at the end of every turn transition.
    pub drawn_card: Option<Card>,

    pub stack_caller: Option<PlayerId>,
    pub special_action: Option<SpecialAction>,
    pub king_view: Option<KingViewState>,

    pub end_caller: Option<PlayerId>,
    pub final_round_started: bool,
    pub winner: Option<PlayerId>,

    pub timers: Timers,
    pub visibility: VisibilityMap,

    pub history: GameHistory,

    /// Seeded per-game RNG, not derived from any game input.
    pub rng: Xoshiro256StarStar,
}

impl GameState {
    /// Returns the card that was most recently played, i.e. the top of the
    /// discard pile. Public to all players.
    pub fn played_card(&self) -> Option<Card> {
        self.discard_pile.last().copied()
    }

    pub fn current_player(&self) -> &PlayerState {
        &self.players[self.current_player_index]
    }

    pub fn current_player_id(&self) -> PlayerId {
        self.current_player().id
    }

    pub fn player(&self, id: PlayerId) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    pub fn player_index(&self, id: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| p.id == id)
    }

    /// Seat index of the player after `index`, wrapping around the table.
    pub fn next_seat(&self, index: usize) -> usize {
        (index + 1) % self.players.len()
    }

    pub fn total_card_count(&self) -> usize {
        let hands: usize = self.players.iter().map(|p| p.hand.len()).sum();
        hands + self.discard_pile.len() + self.drawn_card.map_or(0, |_| 1) + self.deck.len()
    }
}
