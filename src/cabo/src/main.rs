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

use std::sync::Arc;

use axum::routing::get;
use axum::Router;
use color_eyre::Result;
use database::SledStore;
use server::config::ServerConfig;
use server::connection::ConnectionManager;
use server::name_service::InMemoryNameService;
use server::rooms::RoomManager;
use server::ws::{self, AppState};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sled=warn"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .with(env_filter)
        .with(tracing_error::ErrorLayer::default())
        .init();
}

async fn health() -> &'static str {
    "ok"
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_logging();

    let config = ServerConfig::load()?;
    info!(bind_address = %config.bind_address, "starting cabo server");

    let store = Arc::new(SledStore::open(&config.data_dir)?);
    let connections = Arc::new(ConnectionManager::new(config.clone()));
    let rooms =
        Arc::new(RoomManager::new(store.clone(), store.clone(), store.clone(), connections.clone(), config.clone()));

    let recovered = rooms.recover().await?;
    if recovered > 0 {
        info!(recovered, "resumed in-progress rooms from durable store");
    }
    rooms.clone().spawn_grace_sweep();

    let state = AppState {
        rooms,
        connections,
        checkpoints: store.clone(),
        stream: store,
        names: Arc::new(InMemoryNameService::new()),
    };

    let app = Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws::upgrade))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
