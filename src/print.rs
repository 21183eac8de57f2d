// Read-only print sheet for a single game.
// Prefers staged edits from the local buffer so operators can print before publishing.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::board::BoardLayout;
use crate::buffer::KeyValueStore;
use crate::layout::LayoutParams;
use crate::types::{parse_snapshot, Game};

/// Print presentation state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PrintSheet {
    Ready { game: Game, layout: BoardLayout },
    NotFound { game_id: String },
}

/// Print view over the buffer (if any) and the durable snapshot.
pub struct PrintView<'a, B: KeyValueStore + ?Sized> {
    buffer: &'a B,
    buffer_key: &'a str,
    published: &'a [Game],
    params: &'a LayoutParams,
}

impl<'a, B: KeyValueStore + ?Sized> PrintView<'a, B> {
    pub fn new(
        buffer: &'a B,
        buffer_key: &'a str,
        published: &'a [Game],
        params: &'a LayoutParams,
    ) -> Self {
        PrintView {
            buffer,
            buffer_key,
            published,
            params,
        }
    }

    /// Games the sheet draws from: staged edits if readable, otherwise the durable snapshot.
    pub fn source(&self) -> Vec<Game> {
        match self.buffer.load(self.buffer_key) {
            Ok(Some(json)) => match parse_snapshot(&json) {
                Ok(games) => return games,
                Err(e) => warn!(error = %e, "Print view ignoring unreadable buffer"),
            },
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Print view buffer unavailable"),
        }
        self.published.to_vec()
    }

    pub fn render(&self, game_id: &str) -> PrintSheet {
        match self.source().into_iter().find(|g| g.game_id == game_id) {
            Some(game) => {
                let layout = BoardLayout::compute(self.params, game.steps.len());
                PrintSheet::Ready { game, layout }
            }
            None => PrintSheet::NotFound {
                game_id: game_id.to_string(),
            },
        }
    }
}
