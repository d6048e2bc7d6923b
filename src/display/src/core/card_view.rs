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
use serde::{Deserialize, Serialize};

/// Visual state of a single hand slot as seen by one particular viewer.
/// `card` is `None` whenever the viewer's [data::game_states::visibility::VisibilityMap]
/// does not currently grant them knowledge of this slot; the index is
/// always sent so the client can render a face-down placeholder in the
/// right position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardView {
    pub index: usize,
    pub card: Option<Card>,
}

impl CardView {
    pub fn new(index: usize, card: Card, visible: bool) -> Self {
        Self { index, card: visible.then_some(card) }
    }
}
