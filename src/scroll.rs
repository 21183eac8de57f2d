// Auto-scroll while dragging near the viewport edges.
// The frame loop is an explicit schedulable tick so start/cancel can be tested without a display.

use serde::{Deserialize, Serialize};

/// Auto-scroll tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrollSettings {
    /// Distance from an edge (px) inside which scrolling kicks in.
    #[serde(default = "default_threshold")]
    pub threshold: f32,
    /// Scroll speed at the very edge (px per frame).
    #[serde(default = "default_max_speed")]
    pub max_speed: f32,
}

fn default_threshold() -> f32 {
    100.0
}

fn default_max_speed() -> f32 {
    15.0
}

impl Default for ScrollSettings {
    fn default() -> Self {
        ScrollSettings {
            threshold: default_threshold(),
            max_speed: default_max_speed(),
        }
    }
}

impl ScrollSettings {
    /// Scroll velocity for a pointer at `pointer_y` within a viewport of `viewport_height`.
    /// Negative scrolls up. Zero outside both edge bands.
    pub fn velocity(&self, pointer_y: f32, viewport_height: f32) -> f32 {
        let threshold = self.threshold;
        let from_top = pointer_y;
        let from_bottom = viewport_height - pointer_y;

        if from_top < threshold {
            -self.max_speed * (threshold - from_top.max(0.0)) / threshold
        } else if from_bottom < threshold {
            self.max_speed * (threshold - from_bottom.max(0.0)) / threshold
        } else {
            0.0
        }
    }
}

/// Handle for a requested frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameHandle(pub u64);

/// Source of animation-frame ticks.
pub trait FrameScheduler {
    fn request_frame(&mut self) -> FrameHandle;
    fn cancel_frame(&mut self, handle: FrameHandle);
}

/// Scrollable region being auto-scrolled.
pub trait ScrollViewport {
    fn height(&self) -> f32;
    fn scroll_by(&mut self, dy: f32);
}

/// Scheduler that only records requests. The host (or a test) pumps frames by calling
/// `AutoScroller::on_frame` while `pending()` is set.
#[derive(Debug, Default)]
pub struct ManualFrames {
    next: u64,
    pending: Option<FrameHandle>,
    requested: u64,
    cancelled: u64,
}

impl ManualFrames {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pending(&self) -> Option<FrameHandle> {
        self.pending
    }

    /// Total frames requested since creation.
    pub fn requested(&self) -> u64 {
        self.requested
    }

    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }
}

impl FrameScheduler for ManualFrames {
    fn request_frame(&mut self) -> FrameHandle {
        self.next += 1;
        self.requested += 1;
        let handle = FrameHandle(self.next);
        self.pending = Some(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if self.pending == Some(handle) {
            self.pending = None;
            self.cancelled += 1;
        }
    }
}

/// Frame-driven scroller. Runs only between `start` and `cancel`.
#[derive(Debug)]
pub struct AutoScroller<S: FrameScheduler> {
    settings: ScrollSettings,
    scheduler: S,
    pending: Option<FrameHandle>,
    pointer_y: Option<f32>,
}

impl<S: FrameScheduler> AutoScroller<S> {
    pub fn new(settings: ScrollSettings, scheduler: S) -> Self {
        AutoScroller {
            settings,
            scheduler,
            pending: None,
            pointer_y: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.pending.is_some()
    }

    pub fn settings(&self) -> &ScrollSettings {
        &self.settings
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    /// Start the loop. Does nothing if already running.
    pub fn start(&mut self) {
        if self.pending.is_none() {
            self.pending = Some(self.scheduler.request_frame());
        }
    }

    /// Stop the loop and forget the pointer. Safe to call when stopped.
    pub fn cancel(&mut self) {
        if let Some(handle) = self.pending.take() {
            self.scheduler.cancel_frame(handle);
        }
        self.pointer_y = None;
    }

    /// Record the latest pointer position, relative to the viewport top.
    pub fn pointer_moved(&mut self, pointer_y: f32) {
        self.pointer_y = Some(pointer_y);
    }

    /// Run one tick: apply this frame's velocity and schedule the next frame.
    /// Returns the applied offset. A frame arriving after `cancel` is ignored.
    pub fn on_frame<V: ScrollViewport>(&mut self, viewport: &mut V) -> f32 {
        if self.pending.is_none() {
            return 0.0;
        }
        let velocity = self
            .pointer_y
            .map(|y| self.settings.velocity(y, viewport.height()))
            .unwrap_or(0.0);
        if velocity != 0.0 {
            viewport.scroll_by(velocity);
        }
        self.pending = Some(self.scheduler.request_frame());
        velocity
    }
}

impl<S: FrameScheduler> Drop for AutoScroller<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}
