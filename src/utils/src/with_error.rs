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

use color_eyre::eyre::Context;
use color_eyre::Result;

/// Extension trait providing a uniform way to attach debugging context to a
/// fallible result, regardless of whether the error came from `color_eyre`,
/// `sled`, or `serde_json`.
pub trait WithError<T> {
    fn with_error(self, message: impl FnOnce() -> String) -> Result<T>;
}

impl<T, E> WithError<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn with_error(self, message: impl FnOnce() -> String) -> Result<T> {
        self.with_context(message)
    }
}
