// roadmap_core: step roadmap engine for the student board, print sheet, and admin editor.
// All layout, ordering, and staging rules live here; the JS view only renders and forwards events.

mod board;
mod buffer;
mod error;
mod events;
mod layout;
mod path;
mod print;
mod reorder;
mod scroll;
mod store;
mod types;

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;

pub use board::{Board, BoardLayout};
#[cfg(target_arch = "wasm32")]
pub use buffer::LocalStorageBuffer;
pub use buffer::{KeyValueStore, MemoryBuffer};
pub use error::RoadmapError;
pub use events::{
    ListenerId, Listeners, ResizeEvent, SharedViewportEvents, Subscription, ViewportEvents,
};
pub use layout::{
    columns_for_width, default_board_layout, default_compact_layout, default_print_layout,
    position, LayoutParams, ResponsiveLayout,
};
pub use path::{build_path, build_path_for, Segment, Segments};
pub use print::{PrintSheet, PrintView};
pub use reorder::{DragState, ReorderController};
pub use scroll::{
    AutoScroller, FrameHandle, FrameScheduler, ManualFrames, ScrollSettings, ScrollViewport,
};
pub use store::{SaveEndpoint, StagedStore};
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn js_err(err: RoadmapError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn open_buffer() -> Box<dyn KeyValueStore> {
    #[cfg(target_arch = "wasm32")]
    {
        match LocalStorageBuffer::open() {
            Ok(storage) => return Box::new(storage),
            Err(e) => tracing::warn!(error = %e, "Falling back to in-memory staged buffer"),
        }
    }
    Box::new(MemoryBuffer::new())
}

/// Scroll offsets requested by the core during one host frame.
struct HostViewport {
    height: f32,
    scrolled: f32,
}

impl ScrollViewport for HostViewport {
    fn height(&self) -> f32 {
        self.height
    }

    fn scroll_by(&mut self, dy: f32) {
        self.scrolled += dy;
    }
}

/// Editor session exposed to JavaScript.
/// Data crosses the boundary as JSON strings in the published roadmap schema.
#[wasm_bindgen]
pub struct RoadmapEditor {
    config: RoadmapConfig,
    store: StagedStore<Box<dyn KeyValueStore>>,
    reorder: ReorderController<ManualFrames>,
    board: Board,
    viewport: SharedViewportEvents,
}

#[wasm_bindgen]
impl RoadmapEditor {
    /// `published_json` is the durable snapshot; `config_json` may be `"{}"` for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(
        published_json: &str,
        config_json: &str,
        viewport_width: f32,
    ) -> std::result::Result<RoadmapEditor, JsValue> {
        let config = RoadmapConfig::from_json(config_json).map_err(js_err)?;
        let store = StagedStore::from_json(published_json, open_buffer(), &config.buffer_key)
            .map_err(js_err)?;
        let reorder = ReorderController::new(config.scroll.clone(), ManualFrames::new());
        let viewport = Rc::new(RefCell::new(ViewportEvents::new()));
        let mut board = Board::new(config.board.clone(), viewport_width);
        board.attach(&viewport);
        if let Some(first) = store.games().first() {
            board.select_game(&first.game_id);
        }

        Ok(RoadmapEditor {
            config,
            store,
            reorder,
            board,
            viewport,
        })
    }

    pub fn games_json(&self) -> std::result::Result<String, JsValue> {
        serde_json::to_string(self.store.games()).map_err(|e| js_err(e.into()))
    }

    pub fn has_local_edits(&self) -> bool {
        self.store.has_local_edits()
    }

    /// Call `callback(gamesJson)` after every committed mutation. Returns the id for `unsubscribe`.
    pub fn subscribe(&mut self, callback: js_sys::Function) -> u64 {
        let id = self.store.subscribe(move |games: &[Game]| {
            let json = match serde_json::to_string(games) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(error = %e, "Could not serialize games for observer");
                    return;
                }
            };
            if let Err(e) = callback.call1(&JsValue::NULL, &JsValue::from_str(&json)) {
                tracing::warn!(error = ?e, "Observer callback threw");
            }
        });
        id.as_u64()
    }

    pub fn unsubscribe(&mut self, id: u64) -> bool {
        self.store.unsubscribe(ListenerId::from(id))
    }

    /// Returns the new game as JSON.
    pub fn create_game(&mut self) -> std::result::Result<String, JsValue> {
        let game = self.store.create_game().map_err(js_err)?;
        serde_json::to_string(&game).map_err(|e| js_err(e.into()))
    }

    /// `field` is a schema key: `gameId`, `gameName`, or `description`.
    pub fn update_game(
        &mut self,
        game_id: &str,
        field: &str,
        value: &str,
    ) -> std::result::Result<(), JsValue> {
        let field: GameField = field.parse().map_err(js_err)?;
        self.store
            .update_game(game_id, field, value)
            .map_err(js_err)?;
        if field == GameField::GameId && self.board.active_game() == Some(game_id) {
            self.board.select_game(value);
        }
        Ok(())
    }

    pub fn delete_game(&mut self, game_id: &str) -> std::result::Result<(), JsValue> {
        self.store.delete_game(game_id).map_err(js_err)
    }

    /// Returns the new step as JSON.
    pub fn create_step(&mut self, game_id: &str) -> std::result::Result<String, JsValue> {
        let step = self.store.create_step(game_id).map_err(js_err)?;
        serde_json::to_string(&step).map_err(|e| js_err(e.into()))
    }

    /// `field` is a schema key: `title`, `content`, `type`, or `image`.
    pub fn update_step(
        &mut self,
        game_id: &str,
        step_id: u32,
        field: &str,
        value: &str,
    ) -> std::result::Result<(), JsValue> {
        let field: StepField = field.parse().map_err(js_err)?;
        self.store
            .update_step(game_id, step_id, field, value)
            .map_err(js_err)
    }

    pub fn delete_step(
        &mut self,
        game_id: &str,
        step_id: u32,
    ) -> std::result::Result<(), JsValue> {
        self.store.delete_step(game_id, step_id).map_err(js_err)
    }

    pub fn reorder_step(
        &mut self,
        game_id: &str,
        from: usize,
        to: usize,
    ) -> std::result::Result<(), JsValue> {
        self.store.reorder_step(game_id, from, to).map_err(js_err)
    }

    /// Export artifact for manual publish.
    pub fn export_snapshot(&self) -> std::result::Result<String, JsValue> {
        self.store.export_snapshot().map_err(js_err)
    }

    pub fn reset_to_published(&mut self) -> std::result::Result<(), JsValue> {
        self.store.reset_to_published().map_err(js_err)
    }

    /// Publish through `save_fn(artifact)`. A `false` return or a throw is a failure.
    pub fn publish(&mut self, save_fn: &js_sys::Function) -> std::result::Result<(), JsValue> {
        let mut endpoint = |artifact: &str| -> std::result::Result<(), String> {
            match save_fn.call1(&JsValue::NULL, &JsValue::from_str(artifact)) {
                Ok(result) if result.as_bool() == Some(false) => {
                    Err("save endpoint reported failure".to_string())
                }
                Ok(_) => Ok(()),
                Err(e) => Err(e.as_string().unwrap_or_else(|| format!("{:?}", e))),
            }
        };
        self.store.publish(&mut endpoint).map_err(js_err)
    }

    pub fn select_game(&mut self, game_id: &str) {
        self.board.select_game(game_id);
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport
            .borrow_mut()
            .emit(&ResizeEvent { width, height });
    }

    /// Current board layout for the selected game as JSON.
    pub fn layout_json(&mut self) -> std::result::Result<String, JsValue> {
        self.board.refresh(self.store.games());
        serde_json::to_string(self.board.layout()).map_err(|e| js_err(e.into()))
    }

    /// Print sheet for `game_id` as JSON, tagged `ready` or `not_found`.
    pub fn print_json(&self, game_id: &str) -> std::result::Result<String, JsValue> {
        let view = PrintView::new(
            self.store.buffer(),
            self.store.buffer_key(),
            self.store.published(),
            &self.config.print,
        );
        serde_json::to_string(&view.render(game_id)).map_err(|e| js_err(e.into()))
    }

    pub fn drag_start(&mut self, game_id: &str, index: usize) {
        self.reorder.on_drag_start(game_id, index);
    }

    /// Returns true if the hover committed a reorder.
    pub fn drag_enter(&mut self, index: usize) -> std::result::Result<bool, JsValue> {
        self.reorder
            .on_drag_enter_target(&mut self.store, index)
            .map_err(js_err)
    }

    pub fn drag_end(&mut self) {
        self.reorder.on_drag_end();
    }

    pub fn is_dragging(&self) -> bool {
        self.reorder.is_dragging()
    }

    pub fn pointer_move(&mut self, pointer_y: f32) {
        self.reorder.pointer_moved(pointer_y);
    }

    /// True while the auto-scroll loop wants another animation frame.
    pub fn wants_frame(&self) -> bool {
        self.reorder.scroller().is_running()
    }

    /// Run one auto-scroll tick and return the offset the host should scroll by.
    pub fn frame(&mut self, viewport_height: f32) -> f32 {
        let mut viewport = HostViewport {
            height: viewport_height,
            scrolled: 0.0,
        };
        self.reorder.on_frame(&mut viewport);
        viewport.scrolled
    }
}

impl Drop for RoadmapEditor {
    fn drop(&mut self) {
        self.reorder.on_drag_end();
        self.board.detach();
    }
}
