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

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::primitives::TimerId;

/// A single armed timer: its id (used to detect staleness) and wall-clock
/// expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArmedTimer {
    pub id: TimerId,
    pub expires_at: DateTime<Utc>,
}

impl ArmedTimer {
    pub fn arm(now: DateTime<Utc>, duration: chrono::Duration) -> Self {
        Self { id: TimerId::new(), expires_at: now + duration }
    }
}

/// The game's pending timers, one slot per timer-bearing phase. A timeout
/// message is only honored if its carried [TimerId] matches the id stored
/// here; the Engine nils the relevant slot whenever it advances past the
/// phase that armed the timer, which makes late-delivered timeouts inert
/// without requiring active cancellation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Timers {
    pub setup: Option<ArmedTimer>,
    pub turn_transition: Option<ArmedTimer>,
    pub special_action: Option<ArmedTimer>,
    pub stack: Option<ArmedTimer>,
}

impl Timers {
    /// Returns true if `id` matches the currently-armed setup timer.
    pub fn is_current_setup(&self, id: TimerId) -> bool {
        self.setup.is_some_and(|t| t.id == id)
    }

    pub fn is_current_turn_transition(&self, id: TimerId) -> bool {
        self.turn_transition.is_some_and(|t| t.id == id)
    }

    pub fn is_current_special_action(&self, id: TimerId) -> bool {
        self.special_action.is_some_and(|t| t.id == id)
    }

    pub fn is_current_stack(&self, id: TimerId) -> bool {
        self.stack.is_some_and(|t| t.id == id)
    }
}
