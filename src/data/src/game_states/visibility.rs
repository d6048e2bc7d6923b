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

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::core::primitives::PlayerId;

/// A single hand slot, identified by its owner and index rather than by
/// card identity. Swaps move cards between slots but do not move
/// visibility entries, so a viewer's knowledge tracks the slot, not the
/// card that happens to be sitting in it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Slot {
    pub owner: PlayerId,
    pub index: usize,
}

impl Slot {
    pub fn new(owner: PlayerId, index: usize) -> Self {
        Self { owner, index }
    }
}

/// Tracks, for each viewer, exactly which hand slots they are currently
/// permitted to know the contents of. Any slot not in a viewer's set must
/// be rendered as hidden in messages sent to that viewer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VisibilityMap {
    viewers: HashMap<PlayerId, HashSet<Slot>>,
}

impl VisibilityMap {
    /// Grants `viewer` knowledge of the given slot.
    pub fn reveal(&mut self, viewer: PlayerId, slot: Slot) {
        self.viewers.entry(viewer).or_default().insert(slot);
    }

    /// Returns true if `viewer` currently knows the contents of `slot`.
    pub fn can_see(&self, viewer: PlayerId, slot: Slot) -> bool {
        self.viewers.get(&viewer).is_some_and(|slots| slots.contains(&slot))
    }

    /// Clears every viewer's visibility set. Called on `SETUP_TIMEOUT` and
    /// `TURN_TRANSITION_TIMEOUT`.
    pub fn clear_all(&mut self) {
        self.viewers.clear();
    }

    #[cfg(test)]
    pub fn visible_slots(&self, viewer: PlayerId) -> HashSet<Slot> {
        self.viewers.get(&viewer).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reveal_and_query() {
        let mut map = VisibilityMap::default();
        let viewer = PlayerId::new();
        let owner = PlayerId::new();
        let slot = Slot::new(owner, 0);
        assert!(!map.can_see(viewer, slot));
        map.reveal(viewer, slot);
        assert!(map.can_see(viewer, slot));
    }

    #[test]
    fn clear_all_empties_every_viewer() {
        let mut map = VisibilityMap::default();
        let viewer = PlayerId::new();
        let slot = Slot::new(viewer, 0);
        map.reveal(viewer, slot);
        map.clear_all();
        assert!(!map.can_see(viewer, slot));
    }
}
