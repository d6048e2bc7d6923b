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

use std::time::Duration;

use color_eyre::Result;
use serde::{Deserialize, Serialize};

/// Orchestration-level timing and capacity constants. These govern the room
/// loop, broadcast pump, and connection manager; they are distinct from the
/// Engine's own timer durations (SETUP_TIMEOUT, STACK_TIMEOUT, etc., in
/// `rules::mutations`), which are rules of the game itself and not
/// deployment-tunable.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,

    /// Directory the embedded durable store opens its database under.
    pub data_dir: String,

    /// How long the room loop sleeps when an iteration processed no
    /// messages.
    pub room_loop_idle_sleep_ms: u64,

    /// Interval at which the connection manager pings each connection.
    pub heartbeat_ping_interval_secs: u64,

    /// A connection is moved to grace if this long passes without a pong.
    pub heartbeat_ping_timeout_secs: u64,

    /// How long a disconnected session retains its room seat before the
    /// connection manager gives up on it.
    pub grace_period_secs: u64,

    /// Maximum outbox entries retained per session for reconnect replay.
    pub outbox_capacity: usize,

    /// Base and max delay for the room loop's durable-store retry backoff.
    pub store_retry_base_ms: u64,
    pub store_retry_max_ms: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            data_dir: "./cabo-data".to_string(),
            room_loop_idle_sleep_ms: 100,
            heartbeat_ping_interval_secs: 10,
            heartbeat_ping_timeout_secs: 20,
            grace_period_secs: 60,
            outbox_capacity: 100,
            store_retry_base_ms: 50,
            store_retry_max_ms: 5_000,
        }
    }
}

impl ServerConfig {
    /// Loads configuration from (in ascending priority) built-in defaults,
    /// an optional `cabo.toml` in the working directory, and `CABO_`
    /// prefixed environment variables.
    pub fn load() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(config::File::with_name("cabo").required(false))
            .add_source(config::Environment::with_prefix("CABO").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn room_loop_idle_sleep(&self) -> Duration {
        Duration::from_millis(self.room_loop_idle_sleep_ms)
    }

    pub fn heartbeat_ping_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_ping_interval_secs)
    }

    pub fn heartbeat_ping_timeout(&self) -> Duration {
        Duration::from_secs(self.heartbeat_ping_timeout_secs)
    }

    pub fn grace_period(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.grace_period_secs as i64)
    }

    pub fn store_retry_backoff(&self) -> utils::backoff::Backoff {
        utils::backoff::Backoff::new(
            Duration::from_millis(self.store_retry_base_ms),
            Duration::from_millis(self.store_retry_max_ms),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = ServerConfig::default();
        assert_eq!(config.room_loop_idle_sleep(), Duration::from_millis(100));
        assert_eq!(config.heartbeat_ping_timeout(), Duration::from_secs(20));
        assert_eq!(config.grace_period(), chrono::Duration::seconds(60));
    }
}
