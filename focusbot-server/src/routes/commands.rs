//! Command ingestion route.
//!
//! The external messaging layer forwards each inbound chat message here and
//! posts the returned reply, if any, back to the room.

use axum::{extract::State, routing::post, Json, Router};
use focusbot_core::Participant;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::commands::CommandContext;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/commands", post(run_command))
}

#[derive(Debug, Deserialize)]
pub struct CommandRequest {
    pub room_id: i64,
    pub user_id: i64,
    pub display_name: String,
    /// Whether the caller holds the room-management capability.
    #[serde(default)]
    pub privileged: bool,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct CommandResponse {
    /// None when the message was not a command; nothing should be posted.
    pub reply: Option<String>,
}

async fn run_command(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CommandRequest>,
) -> Json<CommandResponse> {
    let ctx = CommandContext {
        room_id: req.room_id,
        user: Participant::new(req.user_id, req.display_name),
        privileged: req.privileged,
    };
    let reply = state.commands.dispatch(&ctx, &req.text).await;
    Json(CommandResponse { reply })
}
