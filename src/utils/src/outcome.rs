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

use color_eyre::Report;

/// Possible reasons why engine processing of a message should halt without
/// producing any state change.
#[derive(Debug)]
#[must_use]
pub enum StopCondition {
    /// The message was not legal for the current game state. A rejection is
    /// a silent no-op from the caller's perspective: no events, no state
    /// change, no follow-up messages.
    Rejected(String),

    /// An unexpected internal error occurred.
    Error(Report),
}

/// Represents the result of some game mutation which may be rejected.
///
/// The "outcome" system is a wrapper around [Result] that lets rule handlers
/// bail out early via `?` both for illegal actions (caught and converted to
/// a no-op by the engine's top-level dispatch) and for genuine internal
/// errors.
pub type Outcome = Result<(), StopCondition>;

/// Equivalent alias to [Outcome] which wraps a returned value.
pub type Value<T> = Result<T, StopCondition>;

/// Mutation completed successfully, execution can continue.
pub const OK: Outcome = Ok(());

impl From<Report> for StopCondition {
    fn from(report: Report) -> Self {
        StopCondition::Error(report)
    }
}

/// Returns `true` if this [StopCondition] represents a rejected action as
/// opposed to an internal error.
pub fn is_rejection(condition: &StopCondition) -> bool {
    matches!(condition, StopCondition::Rejected(_))
}

/// Bails out of the current function with [StopCondition::Rejected] unless
/// `condition` holds.
#[macro_export]
macro_rules! verify {
    ($condition:expr $(,)?) => {
        if !$condition {
            return Err($crate::outcome::StopCondition::Rejected(
                format!("Validation failed: {}", stringify!($condition))
            ));
        }
    };
    ($condition:expr, $($arg:tt)+) => {
        if !$condition {
            return Err($crate::outcome::StopCondition::Rejected(format!($($arg)+)));
        }
    };
}

/// Unconditionally bails out of the current function with
/// [StopCondition::Rejected].
#[macro_export]
macro_rules! fail {
    ($($arg:tt)+) => {
        return Err($crate::outcome::StopCondition::Rejected(format!($($arg)+)))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(condition: bool) -> Outcome {
        verify!(condition, "condition was false");
        OK
    }

    #[test]
    fn verify_macro_passes_through_success() {
        assert!(check(true).is_ok());
    }

    #[test]
    fn verify_macro_rejects_on_false() {
        match check(false) {
            Err(StopCondition::Rejected(message)) => assert_eq!(message, "condition was false"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }
}
