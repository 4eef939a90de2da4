//! Boundary to the widget renderers
//!
//! Widgets are external collaborators: the bridge owns their surfaces and
//! decides when they draw, but what they draw is up to them.

use crate::Result;
use crate::game_data::LiveGameData;
use crate::surface::{Resolution, TextureSurface};

use super::clock::ClockSignals;

/// Where a widget's surface sits on screen and how large it is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WidgetPlacement {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WidgetPlacement {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// One HUD element rendering into its own texture surface.
pub trait Widget {
    /// Stable name used for visibility bindings and logs.
    fn name(&self) -> &str;

    /// Surface size and position for the given screen resolution.
    fn placement(&self, resolution: Resolution) -> WidgetPlacement;

    /// Draw the current frame.
    ///
    /// Errors and panics are contained by the bridge: the frame is dropped
    /// and the widget is asked for a complete redraw on the next one.
    fn render(&mut self, ctx: &mut DrawContext<'_>) -> Result<()>;
}

/// Supplies the active widget set on every reconfiguration.
pub trait WidgetSource {
    /// Build the widgets from the current configuration.
    ///
    /// Failure keeps the bridge disabled.
    fn load_widgets(&mut self) -> Result<Vec<Box<dyn Widget>>>;
}

impl<F> WidgetSource for F
where
    F: FnMut() -> Result<Vec<Box<dyn Widget>>>,
{
    fn load_widgets(&mut self) -> Result<Vec<Box<dyn Widget>>> {
        self()
    }
}

/// Everything a widget may touch while rendering one frame.
pub struct DrawContext<'a> {
    surface: &'a mut TextureSurface,
    game: &'a LiveGameData,
    clock: ClockSignals,
    complete_redraw: bool,
    frame_token: u64,
}

impl<'a> DrawContext<'a> {
    pub(crate) fn new(
        surface: &'a mut TextureSurface,
        game: &'a LiveGameData,
        clock: ClockSignals,
        complete_redraw: bool,
        frame_token: u64,
    ) -> Self {
        Self { surface, game, clock, complete_redraw, frame_token }
    }

    pub fn surface(&mut self) -> &mut TextureSurface {
        self.surface
    }

    pub fn game_data(&self) -> &LiveGameData {
        self.game
    }

    /// Slow cadence signal, for values that change rarely (lap times, standings).
    pub fn coarse_tick(&self) -> bool {
        self.clock.coarse
    }

    /// Fast cadence signal, for values that change every few frames (rpm, speed).
    pub fn fine_tick(&self) -> bool {
        self.clock.fine
    }

    /// The surface was reallocated or a full redraw was forced; every pixel
    /// must be drawn, not just the parts that changed.
    pub fn needs_complete_redraw(&self) -> bool {
        self.complete_redraw
    }

    pub fn frame_token(&self) -> u64 {
        self.frame_token
    }
}
