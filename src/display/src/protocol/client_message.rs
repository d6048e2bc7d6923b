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

use data::actions::message::PlayerIntent;
use data::core::primitives::PlayerId;
use serde::{Deserialize, Serialize};

/// Everything a client may send over the WebSocket, exactly as it arrives
/// off the wire. The twelve game-action variants map 1:1 onto
/// [PlayerIntent] via [ClientMessage::into_player_intent]; the remainder
/// (`ack_seq`, `ping`, `pong`, `get_session_info`, `update_nickname`) are
/// handled by the Connection Manager and never reach the Engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    DrawCard,
    PlayDrawnCard,
    ReplaceAndPlay { hand_index: usize },
    CallStack,
    ExecuteStack { card_index: usize, target_player_id: Option<PlayerId> },
    CallCabo,
    ViewOwnCard { card_index: usize },
    ViewOpponentCard { target_player_id: PlayerId, card_index: usize },
    SwapCards { own_index: usize, target_player_id: PlayerId, target_index: usize },
    KingViewCard { target_player_id: PlayerId, card_index: usize },
    KingSwapCards { own_index: usize, target_player_id: PlayerId, target_index: usize },
    KingSkipSwap,

    AckSeq { seq_num: u64 },
    Ping,
    Pong,
    GetSessionInfo,
    UpdateNickname { nickname: String },
}

impl ClientMessage {
    /// Translates the game-action variants into the Engine's own message
    /// type. Returns `None` for the connection-management variants, which
    /// the caller is expected to have already handled.
    pub fn into_player_intent(self) -> Option<PlayerIntent> {
        match self {
            Self::DrawCard => Some(PlayerIntent::DrawCard),
            Self::PlayDrawnCard => Some(PlayerIntent::PlayDrawnCard),
            Self::ReplaceAndPlay { hand_index } => Some(PlayerIntent::ReplaceAndPlay { hand_index }),
            Self::CallStack => Some(PlayerIntent::CallStack),
            Self::ExecuteStack { card_index, target_player_id } => {
                Some(PlayerIntent::ExecuteStack { card_index, target: target_player_id })
            }
            Self::CallCabo => Some(PlayerIntent::CallCabo),
            Self::ViewOwnCard { card_index } => Some(PlayerIntent::ViewOwnCard { card_index }),
            Self::ViewOpponentCard { target_player_id, card_index } => {
                Some(PlayerIntent::ViewOpponentCard { target: target_player_id, card_index })
            }
            Self::SwapCards { own_index, target_player_id, target_index } => {
                Some(PlayerIntent::SwapCards { own_index, target: target_player_id, target_index })
            }
            Self::KingViewCard { target_player_id, card_index } => {
                Some(PlayerIntent::KingViewCard { target: target_player_id, card_index })
            }
            Self::KingSwapCards { own_index, target_player_id, target_index } => {
                Some(PlayerIntent::KingSwapCards { own_index, target: target_player_id, target_index })
            }
            Self::KingSkipSwap => Some(PlayerIntent::KingSkipSwap),
            Self::AckSeq { .. }
            | Self::Ping
            | Self::Pong
            | Self::GetSessionInfo
            | Self::UpdateNickname { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_actions_round_trip_into_intents() {
        assert_eq!(ClientMessage::DrawCard.into_player_intent(), Some(PlayerIntent::DrawCard));
        assert_eq!(
            ClientMessage::ReplaceAndPlay { hand_index: 2 }.into_player_intent(),
            Some(PlayerIntent::ReplaceAndPlay { hand_index: 2 })
        );
    }

    #[test]
    fn connection_management_variants_have_no_intent() {
        assert_eq!(ClientMessage::Ping.into_player_intent(), None);
        assert_eq!(ClientMessage::GetSessionInfo.into_player_intent(), None);
        assert_eq!(
            ClientMessage::UpdateNickname { nickname: "x".to_string() }.into_player_intent(),
            None
        );
    }

    #[test]
    fn deserializes_tagged_json() {
        let json = r#"{"type":"execute_stack","card_index":1,"target_player_id":null}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert_eq!(msg, ClientMessage::ExecuteStack { card_index: 1, target_player_id: None });
    }
}
