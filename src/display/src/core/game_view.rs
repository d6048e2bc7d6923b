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

use data::cards::card::Card;
use data::core::primitives::{GameId, PlayerId};
use data::game_states::phase::GamePhase;
use serde::{Deserialize, Serialize};

use crate::core::card_view::CardView;

/// Represents the full visual state of an ongoing game, as seen by one
/// particular `viewer`. Sent as the payload of a `game_checkpoint` message
/// and rebuilt fresh for each recipient since every player's redaction
/// differs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameView {
    pub game_id: GameId,
    pub phase: GamePhase,
    pub viewer: PlayerId,
    pub current_player: PlayerId,
    pub your_turn: bool,
    pub players: Vec<PlayerView>,
    pub deck_count: usize,
    pub discard_top: Option<Card>,
    /// The current player's freshly-drawn card, present only when `viewer`
    /// is that player; nobody else may see it.
    pub drawn_card: Option<Card>,
    pub stack_caller: Option<PlayerId>,
    pub end_caller: Option<PlayerId>,
    pub winner: Option<PlayerId>,
}

/// Visual state of one seat in the game.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub id: PlayerId,
    pub display_name: String,
    pub hand: Vec<CardView>,
    pub hand_size: usize,
    pub called_cabo: bool,
}
