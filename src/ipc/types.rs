use std::path::PathBuf;

use crossbeam_channel::Receiver;
use serde::Deserialize;

use crate::engine::Engine;
use crate::events::Event;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub engine: Option<Engine>,
    /// The IPC client's own bus subscription, drained via `events.drain`.
    pub events: Option<Receiver<Event>>,
}

impl AppState {
    pub fn new() -> AppState {
        AppState {
            workspace: None,
            engine: None,
            events: None,
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        AppState::new()
    }
}
