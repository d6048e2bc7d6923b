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
use data::core::primitives::PlayerId;
use data::events::event::EventKind;
use serde::{Deserialize, Serialize};

/// [EventKind] with every card value redacted for a particular recipient.
/// The Engine always emits the raw card (see
/// [data::events::event::EventKind]'s doc comment); this is the one place
/// that decision gets undone before a message leaves the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", content = "data", rename_all = "snake_case")]
pub enum RedactedEvent {
    GameStarted { starting_player: PlayerId },
    CardDrawn { player: PlayerId },
    CardPlayed { player: PlayerId, card: Card },
    CardReplacedAndPlayed { player: PlayerId, hand_index: usize, card: Card },
    StackCalled { caller: PlayerId },
    StackSuccess { caller: PlayerId, self_stack: bool, card: Option<Card>, target: Option<PlayerId> },
    StackFailed { caller: PlayerId, penalty_card: Option<Card> },
    StackTimeout { caller: PlayerId, penalty_card: Option<Card> },
    CaboCalled { player: PlayerId },
    TurnChanged { player: PlayerId },
    GamePhaseChanged { phase: String },
    CardViewed { viewer: PlayerId, owner: PlayerId, index: usize, card: Option<Card> },
    OpponentCardViewed { viewer: PlayerId, owner: PlayerId, index: usize, card: Option<Card> },
    CardsSwapped { initiator: PlayerId, own_index: usize, target: PlayerId, target_index: usize },
    KingCardViewed { viewer: PlayerId, owner: PlayerId, index: usize, card: Option<Card> },
    KingCardsSwapped { initiator: PlayerId, own_index: usize, target: PlayerId, target_index: usize },
    KingSwapSkipped { player: PlayerId },
    SpecialActionTimeout { player: PlayerId },
    GameEnded { final_scores: Vec<(PlayerId, i32)>, winner: PlayerId },
}

/// Redacts `kind` for `recipient`. A card stays attached only where the
/// recipient already has (or is gaining) legitimate knowledge of it:
/// cards that are already public (the played card, final scores) are
/// never redacted; a `card_viewed`/`opponent_card_viewed`/`king_card_viewed`
/// card is kept only for the viewer named in the event; a stack penalty
/// card is kept only for whoever's hand it landed in.
pub fn redact(kind: &EventKind, recipient: PlayerId) -> RedactedEvent {
    match kind {
        &EventKind::GameStarted { starting_player } => RedactedEvent::GameStarted { starting_player },
        &EventKind::CardDrawn { player } => RedactedEvent::CardDrawn { player },
        &EventKind::CardPlayed { player, card } => RedactedEvent::CardPlayed { player, card },
        &EventKind::CardReplacedAndPlayed { player, hand_index, card } => {
            RedactedEvent::CardReplacedAndPlayed { player, hand_index, card }
        }
        &EventKind::StackCalled { caller } => RedactedEvent::StackCalled { caller },
        &EventKind::StackSuccess { caller, self_stack, card, target } => RedactedEvent::StackSuccess {
            caller,
            self_stack,
            card: (recipient == caller || Some(recipient) == target).then_some(card),
            target,
        },
        &EventKind::StackFailed { caller, penalty_card } => RedactedEvent::StackFailed {
            caller,
            penalty_card: (recipient == caller).then_some(penalty_card).flatten(),
        },
        &EventKind::StackTimeout { caller, penalty_card } => RedactedEvent::StackTimeout {
            caller,
            penalty_card: (recipient == caller).then_some(penalty_card).flatten(),
        },
        &EventKind::CaboCalled { player } => RedactedEvent::CaboCalled { player },
        &EventKind::TurnChanged { player } => RedactedEvent::TurnChanged { player },
        EventKind::GamePhaseChanged { phase } => RedactedEvent::GamePhaseChanged { phase: phase.clone() },
        &EventKind::CardViewed { viewer, owner, index, card } => {
            RedactedEvent::CardViewed { viewer, owner, index, card: (recipient == viewer).then_some(card) }
        }
        &EventKind::OpponentCardViewed { viewer, owner, index, card } => {
            RedactedEvent::OpponentCardViewed { viewer, owner, index, card: (recipient == viewer).then_some(card) }
        }
        &EventKind::CardsSwapped { initiator, own_index, target, target_index } => {
            RedactedEvent::CardsSwapped { initiator, own_index, target, target_index }
        }
        &EventKind::KingCardViewed { viewer, owner, index, card } => {
            RedactedEvent::KingCardViewed { viewer, owner, index, card: (recipient == viewer).then_some(card) }
        }
        &EventKind::KingCardsSwapped { initiator, own_index, target, target_index } => {
            RedactedEvent::KingCardsSwapped { initiator, own_index, target, target_index }
        }
        &EventKind::KingSwapSkipped { player } => RedactedEvent::KingSwapSkipped { player },
        &EventKind::SpecialActionTimeout { player } => RedactedEvent::SpecialActionTimeout { player },
        EventKind::GameEnded { final_scores, winner } => {
            RedactedEvent::GameEnded { final_scores: final_scores.clone(), winner: *winner }
        }
    }
}

#[cfg(test)]
mod tests {
    use data::core::primitives::PlayerId;

    use super::*;

    #[test]
    fn card_viewed_hidden_from_non_viewer() {
        let viewer = PlayerId::new();
        let owner = PlayerId::new();
        let bystander = PlayerId::new();
        let kind = EventKind::CardViewed { viewer, owner, index: 0, card: data::cards::card::Card::joker() };

        match redact(&kind, viewer) {
            RedactedEvent::CardViewed { card, .. } => assert!(card.is_some()),
            other => panic!("unexpected {other:?}"),
        }
        match redact(&kind, bystander) {
            RedactedEvent::CardViewed { card, .. } => assert!(card.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn stack_penalty_card_hidden_from_bystander() {
        let caller = PlayerId::new();
        let bystander = PlayerId::new();
        let kind = EventKind::StackFailed { caller, penalty_card: Some(data::cards::card::Card::joker()) };

        match redact(&kind, caller) {
            RedactedEvent::StackFailed { penalty_card, .. } => assert!(penalty_card.is_some()),
            other => panic!("unexpected {other:?}"),
        }
        match redact(&kind, bystander) {
            RedactedEvent::StackFailed { penalty_card, .. } => assert!(penalty_card.is_none()),
            other => panic!("unexpected {other:?}"),
        }
    }
}
