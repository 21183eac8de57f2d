// Drag-to-reorder state machine, independent of any input API.
// Every hover over a new target commits a reorder immediately, so the visible order is the
// stored order. The auto-scroll loop lives exactly as long as the drag.

use tracing::debug;

use crate::buffer::KeyValueStore;
use crate::error::{Result, RoadmapError};
use crate::scroll::{AutoScroller, FrameScheduler, ScrollSettings, ScrollViewport};
use crate::store::StagedStore;

/// Drag gesture state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragState {
    Idle,
    Dragging { game_id: String, source_index: usize },
}

/// Drives step order from `drag start / enter target / end` events.
#[derive(Debug)]
pub struct ReorderController<S: FrameScheduler> {
    state: DragState,
    scroller: AutoScroller<S>,
}

impl<S: FrameScheduler> ReorderController<S> {
    pub fn new(settings: ScrollSettings, scheduler: S) -> Self {
        ReorderController {
            state: DragState::Idle,
            scroller: AutoScroller::new(settings, scheduler),
        }
    }

    pub fn state(&self) -> &DragState {
        &self.state
    }

    pub fn is_dragging(&self) -> bool {
        matches!(self.state, DragState::Dragging { .. })
    }

    pub fn scroller(&self) -> &AutoScroller<S> {
        &self.scroller
    }

    /// Begin dragging the step at `index`. A second start mid-drag only re-targets the source.
    pub fn on_drag_start(&mut self, game_id: &str, index: usize) {
        debug!(game_id, index, "Drag start");
        self.state = DragState::Dragging {
            game_id: game_id.to_string(),
            source_index: index,
        };
        self.scroller.start();
    }

    /// Pointer entered the step at `index`. Commits the move and returns true if the order changed.
    /// A rejected move leaves the source alone. A move that was applied but not buffered still
    /// re-targets the source before the `PersistFailure` is returned.
    pub fn on_drag_enter_target<B: KeyValueStore>(
        &mut self,
        store: &mut StagedStore<B>,
        index: usize,
    ) -> Result<bool> {
        let DragState::Dragging {
            game_id,
            source_index,
        } = &mut self.state
        else {
            return Ok(false);
        };
        if *source_index == index {
            return Ok(false);
        }
        let result = store.reorder_step(game_id, *source_index, index);
        if let Err(err) = &result {
            if !matches!(err, RoadmapError::PersistFailure(_)) {
                return Err(err.clone());
            }
        }
        debug!(game_id = %game_id, from = *source_index, to = index, "Drag reorder");
        *source_index = index;
        result.map(|()| true)
    }

    /// Drop or release anywhere. Always returns to idle and stops auto-scroll.
    pub fn on_drag_end(&mut self) {
        if self.is_dragging() {
            debug!("Drag end");
        }
        self.state = DragState::Idle;
        self.scroller.cancel();
    }

    /// Pointer movement during a drag, relative to the viewport top.
    /// Apply before the frame tick of the same frame.
    pub fn pointer_moved(&mut self, pointer_y: f32) {
        if self.is_dragging() {
            self.scroller.pointer_moved(pointer_y);
        }
    }

    /// Frame tick. Scrolls only while dragging.
    pub fn on_frame<V: ScrollViewport>(&mut self, viewport: &mut V) -> f32 {
        self.scroller.on_frame(viewport)
    }
}
