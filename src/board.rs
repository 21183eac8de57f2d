// Interactive board view-model: positions, path, and container height for the active game.
// Recomputes only when the game, its step count, or the column threshold changes.
// Owns one viewport resize subscription between attach and detach (or drop).

use std::cell::Cell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::events::{ResizeEvent, SharedViewportEvents, Subscription};
use crate::layout::{LayoutParams, ResponsiveLayout};
use crate::path::{build_path, Segment};
use crate::types::{Game, Point};

/// Everything the view needs to draw one game's cards and path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BoardLayout {
    pub columns: u32,
    /// Card top-left corners, in step order.
    pub positions: Vec<Point>,
    pub segments: Vec<Segment>,
    /// SVG `d` attribute for the connecting path.
    pub svg_path: String,
    pub height: f32,
}

impl BoardLayout {
    pub fn compute(params: &LayoutParams, step_count: usize) -> Self {
        let positions = params.positions(step_count);
        let path = build_path(&positions, params.center_offset);
        let svg_path = path.to_svg_path();
        let segments = path.collect();
        BoardLayout {
            columns: params.columns_per_row(),
            height: params.container_height(step_count),
            positions,
            segments,
            svg_path,
        }
    }
}

/// Responsive board for the student view and editor.
#[derive(Debug)]
pub struct Board {
    presets: ResponsiveLayout,
    viewport_width: Rc<Cell<f32>>,
    stale: Rc<Cell<bool>>,
    subscription: Option<Subscription<ResizeEvent>>,
    active_game: Option<String>,
    step_count: usize,
    current: BoardLayout,
}

impl Board {
    pub fn new(presets: ResponsiveLayout, viewport_width: f32) -> Self {
        let current = BoardLayout::compute(presets.for_width(viewport_width), 0);
        Board {
            presets,
            viewport_width: Rc::new(Cell::new(viewport_width)),
            stale: Rc::new(Cell::new(false)),
            subscription: None,
            active_game: None,
            step_count: 0,
            current,
        }
    }

    /// Subscribe to viewport resizes. Re-attaching replaces the old subscription.
    pub fn attach(&mut self, events: &SharedViewportEvents) {
        self.detach();
        let presets = self.presets.clone();
        let width = Rc::clone(&self.viewport_width);
        let stale = Rc::clone(&self.stale);
        self.subscription = Some(Subscription::new(events, move |event: &ResizeEvent| {
            if presets.crosses_threshold(width.get(), event.width) {
                stale.set(true);
            }
            width.set(event.width);
        }));
    }

    /// Drop the resize subscription. Dropping the board does the same.
    pub fn detach(&mut self) -> bool {
        self.subscription.take().is_some()
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    pub fn active_game(&self) -> Option<&str> {
        self.active_game.as_deref()
    }

    pub fn select_game(&mut self, game_id: &str) {
        if self.active_game.as_deref() != Some(game_id) {
            self.active_game = Some(game_id.to_string());
            self.stale.set(true);
        }
    }

    pub fn params(&self) -> &LayoutParams {
        self.presets.for_width(self.viewport_width.get())
    }

    pub fn layout(&self) -> &BoardLayout {
        &self.current
    }

    /// Bring the layout up to date with `games`. Returns true if it was recomputed.
    /// An unknown active game lays out as an empty board.
    pub fn refresh(&mut self, games: &[Game]) -> bool {
        let step_count = self
            .active_game
            .as_deref()
            .and_then(|id| games.iter().find(|g| g.game_id == id))
            .map_or(0, |g| g.steps.len());
        if !self.stale.get() && step_count == self.step_count {
            return false;
        }
        self.current = BoardLayout::compute(self.params(), step_count);
        self.step_count = step_count;
        self.stale.set(false);
        debug!(
            game_id = self.active_game.as_deref().unwrap_or(""),
            steps = step_count,
            columns = self.current.columns,
            "Board layout recomputed"
        );
        true
    }
}
