//! Host-facing frame bridge
//!
//! The host calls [`FrameBridge::update`] once per simulation frame on its own
//! thread. The bridge decides whether anything needs to happen, reloads the
//! widget set when the plugin becomes enabled, lets widgets draw, computes the
//! dirty rectangles of every surface and answers with a [`StatusCode`].
//!
//! ## State machine
//!
//! ```text
//! Disabled --enable--> Reloading --ok--> Enabled --disable--> Disabled
//!                          |                |
//!                          +--failure--> Disabled (until enable is re-signalled or the resolution changes)
//!                                           |
//!                      Enabled --resolution change / request_reconfigure--> Reloading
//! ```
//!
//! `Reloading` is entered and left within a single `update` call: the frame
//! that observes the enable signal also renders, reporting full-surface dirty
//! rects and [`StatusCode::RenderAndPublishTextureInfo`].
//!
//! ## Failure containment
//!
//! Nothing returns an error to the host. Render failures (errors or panics in
//! a widget) drop that frame to [`StatusCode::Quiescent`]; reconfiguration
//! failures leave the plugin disabled. Both are logged.
//!
//! ## Usage Example
//!
//! ```rust
//! use hudbridge::{BridgeConfig, FrameBridge, FrameInputs, Resolution, StatusCode, Widget};
//!
//! let source = || -> hudbridge::Result<Vec<Box<dyn Widget>>> { Ok(Vec::new()) };
//! let mut bridge = FrameBridge::new(BridgeConfig::default(), source).unwrap();
//!
//! let inputs = FrameInputs { plugin_enabled: true, resolution: Resolution::new(1920, 1080) };
//! assert_eq!(bridge.update(inputs), StatusCode::RenderAndPublishTextureInfo);
//! assert_eq!(bridge.update(inputs), StatusCode::Quiescent);
//! ```

mod clock;
mod drawing;
mod texture_info;
mod widget;

pub use clock::{ClockSignals, FrameClock};
pub use drawing::DrawingManager;
pub use texture_info::{
    DirtyRectExport, RECT_SIZE, TEXTURE_ENTRY_SIZE, TEXTURE_NAME_LEN, TextureInfo, TextureInfoExport,
};
pub use widget::{DrawContext, Widget, WidgetPlacement, WidgetSource};

use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, info, trace, warn};

use crate::capsule::{ByteOrder, InputDeviceInfo};
use crate::config::BridgeConfig;
use crate::game_data::LiveGameData;
use crate::input::{InputAction, InputFeed, InputFeedScanner, InputRouter};
use crate::surface::{DirtyRect, Resolution, TextureSurface};
use crate::{BridgeError, Result};

/// Answer to the host for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum StatusCode {
    /// Nothing to upload.
    Quiescent = 0,
    /// Dirty rects were published.
    Render = 1,
    /// Dirty rects were published and the texture topology changed.
    RenderAndPublishTextureInfo = 2,
}

impl StatusCode {
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

/// Per-frame inputs from the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameInputs {
    pub plugin_enabled: bool,
    pub resolution: Resolution,
}

/// Enable state of the bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BridgeState {
    Disabled,
    Reloading,
    Enabled,
}

/// `update_input` result: this call disabled the plugin.
pub const INPUT_PLUGIN_DISABLED: i8 = -1;
/// `update_input` result: nothing visible changed.
pub const INPUT_UNCHANGED: i8 = 0;
/// `update_input` result: an action changed what is shown.
pub const INPUT_STATE_CHANGED: i8 = 1;
/// `update_input` result: this call enabled the plugin.
pub const INPUT_PLUGIN_ENABLED: i8 = 2;

/// The in-process bridge between the host and the widget renderers.
pub struct FrameBridge<S: WidgetSource> {
    config: BridgeConfig,
    source: S,
    state: BridgeState,
    frame_token: u64,
    resolution: Resolution,
    game: LiveGameData,
    drawing: DrawingManager,
    input: InputRouter,
    fired: Vec<InputAction>,
    user_enabled: bool,
    /// Resolution of the last failed reload. Retries wait for it to change.
    reload_blocked_at: Option<Resolution>,
    reconfigure_requested: bool,
    redraw_requested: bool,
    topology_changed: bool,
}

impl<S: WidgetSource> FrameBridge<S> {
    /// Create a disabled bridge. Fails if `config` does not validate or its
    /// byte order setting needs a probe (use [`with_probe`](Self::with_probe)).
    pub fn new(config: BridgeConfig, source: S) -> Result<Self> {
        Self::with_probe(config, source, None)
    }

    /// Create a disabled bridge, resolving the byte order from the host's probe marker.
    pub fn with_probe(config: BridgeConfig, source: S, probe: Option<[u8; 4]>) -> Result<Self> {
        config.validate()?;
        let order = config.byte_order.resolve(probe)?;
        info!(order = ?order.permutation(), widgets_enabled = false, "Frame bridge created");

        Ok(Self {
            drawing: DrawingManager::new(config.dirty, config.clock, order),
            input: InputRouter::new(config.bindings.clone()),
            game: LiveGameData::new(order),
            config,
            source,
            state: BridgeState::Disabled,
            frame_token: 0,
            resolution: Resolution::default(),
            fired: Vec::new(),
            user_enabled: true,
            reload_blocked_at: None,
            reconfigure_requested: false,
            redraw_requested: false,
            topology_changed: false,
        })
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn state(&self) -> BridgeState {
        self.state
    }

    pub fn byte_order(&self) -> &ByteOrder {
        self.game.byte_order()
    }

    /// Token of the most recent `update` call. Starts at zero.
    pub fn frame_token(&self) -> u64 {
        self.frame_token
    }

    /// Capsules the host fills before calling [`update`](Self::update).
    pub fn game_data(&self) -> &LiveGameData {
        &self.game
    }

    pub fn game_data_mut(&mut self) -> &mut LiveGameData {
        &mut self.game
    }

    pub fn drawing(&self) -> &DrawingManager {
        &self.drawing
    }

    pub fn texture_info(&self) -> &TextureInfoExport {
        self.drawing.texture_info()
    }

    pub fn surface(&self, widget: &str) -> Option<&TextureSurface> {
        self.drawing.surface(widget)
    }

    pub fn dirty_rects(&self, widget: &str) -> Option<&[DirtyRect]> {
        self.drawing.dirty_rects(widget)
    }

    pub fn dirty_export(&self, widget: &str) -> Option<&DirtyRectExport> {
        self.drawing.dirty_export(widget)
    }

    /// Whether the user has the plugin switched on (independent of the host signal).
    pub fn user_enabled(&self) -> bool {
        self.user_enabled
    }

    /// Rebuild widgets and surfaces on the next update.
    pub fn request_reconfigure(&mut self) {
        self.reconfigure_requested = true;
        self.reload_blocked_at = None;
    }

    /// Ask every widget for a complete redraw. The next update reports at least
    /// [`StatusCode::Render`].
    pub fn force_complete_redraw(&mut self) {
        self.drawing.force_complete_redraw();
        self.redraw_requested = true;
        debug!("Complete redraw forced");
    }

    /// Run one host frame.
    pub fn update(&mut self, inputs: FrameInputs) -> StatusCode {
        self.frame_token += 1;
        match panic::catch_unwind(AssertUnwindSafe(|| self.step(inputs))) {
            Ok(status) => status,
            Err(_) => {
                error!(token = self.frame_token, "Frame update panicked");
                StatusCode::Quiescent
            }
        }
    }

    fn step(&mut self, inputs: FrameInputs) -> StatusCode {
        let enabled = inputs.plugin_enabled && self.user_enabled;

        if !enabled {
            if self.state != BridgeState::Disabled {
                self.disable();
            }
            self.reload_blocked_at = None;
            return StatusCode::Quiescent;
        }

        if let Some(failed) = self.reload_blocked_at {
            if failed == inputs.resolution {
                return StatusCode::Quiescent;
            }
            debug!(
                width = inputs.resolution.width,
                height = inputs.resolution.height,
                "Resolution changed, retrying reload"
            );
            self.reload_blocked_at = None;
        }

        let needs_reload = match self.state {
            BridgeState::Disabled | BridgeState::Reloading => true,
            BridgeState::Enabled => self.reconfigure_requested || inputs.resolution != self.resolution,
        };
        if needs_reload {
            if let Err(e) = self.reload(inputs.resolution) {
                error!(error = %e, "Reconfiguration failed, plugin stays disabled");
                self.drawing.clear();
                self.state = BridgeState::Disabled;
                self.reload_blocked_at = Some(inputs.resolution);
                return StatusCode::Quiescent;
            }
        }

        self.render_frame()
    }

    fn reload(&mut self, resolution: Resolution) -> Result<()> {
        debug!(from = ?self.state, width = resolution.width, height = resolution.height, "Reloading widgets");
        self.state = BridgeState::Reloading;
        self.reconfigure_requested = false;

        let widgets = panic::catch_unwind(AssertUnwindSafe(|| self.source.load_widgets()))
            .map_err(|_| BridgeError::reconfiguration_failed("widget source panicked"))?
            .map_err(|e| match e {
                BridgeError::Reconfiguration { .. } => e,
                other => BridgeError::reconfiguration_failed_with_source("loading widgets", Box::new(other)),
            })?;

        self.drawing.rebuild(widgets, resolution)?;
        self.resolution = resolution;
        self.state = BridgeState::Enabled;
        self.topology_changed = true;
        info!(widgets = self.drawing.widget_count(), "Plugin enabled");
        Ok(())
    }

    fn disable(&mut self) {
        info!(token = self.frame_token, "Plugin disabled");
        self.drawing.clear();
        self.state = BridgeState::Disabled;
    }

    fn render_frame(&mut self) -> StatusCode {
        let token = self.frame_token;

        if let Err(e) = self.drawing.render(token, &self.game) {
            warn!(token, error = %e, "Frame dropped after render failure");
            return StatusCode::Quiescent;
        }

        let rects = self.drawing.collect_dirty_rects(token);
        let topology_changed = std::mem::take(&mut self.topology_changed);
        let redraw_requested = std::mem::take(&mut self.redraw_requested);

        let status = if topology_changed {
            StatusCode::RenderAndPublishTextureInfo
        } else if rects > 0 || redraw_requested {
            StatusCode::Render
        } else {
            StatusCode::Quiescent
        };
        trace!(token, rects, status = ?status, "Frame updated");
        status
    }

    /// Decode the host's input device descriptor and resolve bindings against it.
    ///
    /// A malformed descriptor is logged and the previous device set is kept.
    pub fn init_input(&mut self, descriptor: &[u8]) {
        match InputDeviceInfo::decode(descriptor, self.game.byte_order()) {
            Ok(devices) => self.input.set_devices(devices),
            Err(e) => error!(error = %e, "Ignoring input device descriptor"),
        }
    }

    pub fn input_devices(&self) -> &InputDeviceInfo {
        self.input.devices()
    }

    /// Per-control state the host writes before [`update_input`](Self::update_input).
    pub fn input_state_mut(&mut self) -> &mut [u8] {
        self.input.state_mut()
    }

    /// Feed of input snapshots for polling scanners.
    pub fn input_feed(&self) -> &InputFeed {
        self.input.feed()
    }

    /// Scanner that detects controls from the state written through this bridge.
    pub fn input_scanner(&self) -> InputFeedScanner {
        InputFeedScanner::new(self.input.feed().clone())
    }

    /// Apply bindings for the current input state.
    ///
    /// Returns [`INPUT_PLUGIN_DISABLED`] or [`INPUT_PLUGIN_ENABLED`] when this
    /// call toggled the plugin, [`INPUT_STATE_CHANGED`] when another action
    /// changed what is shown, [`INPUT_UNCHANGED`] otherwise.
    pub fn update_input(&mut self, modifier_mask: u32) -> i8 {
        let mut fired = std::mem::take(&mut self.fired);
        fired.clear();
        self.input.poll(modifier_mask, &mut fired);

        let mut result = INPUT_UNCHANGED;
        for action in &fired {
            let outcome = self.apply_action(action);
            result = merge_input_results(result, outcome);
        }

        self.fired = fired;
        result
    }

    fn apply_action(&mut self, action: &InputAction) -> i8 {
        debug!(action = ?action, "Input action");
        match action {
            InputAction::TogglePluginEnabled => {
                self.user_enabled = !self.user_enabled;
                info!(enabled = self.user_enabled, "Plugin toggled by input");
                if self.user_enabled { INPUT_PLUGIN_ENABLED } else { INPUT_PLUGIN_DISABLED }
            }
            InputAction::ToggleWidgetVisible { widget } => {
                let (_, affected) = self.drawing.toggle_visible(widget);
                if affected && self.state == BridgeState::Enabled {
                    self.topology_changed = true;
                    INPUT_STATE_CHANGED
                } else {
                    INPUT_UNCHANGED
                }
            }
            InputAction::ForceCompleteRedraw => {
                self.force_complete_redraw();
                if self.state == BridgeState::Enabled { INPUT_STATE_CHANGED } else { INPUT_UNCHANGED }
            }
        }
    }
}

/// Plugin toggles outrank other changes; two toggles in one call cancel out
/// to the last one.
fn merge_input_results(current: i8, next: i8) -> i8 {
    match (current, next) {
        (_, INPUT_PLUGIN_DISABLED | INPUT_PLUGIN_ENABLED) => next,
        (INPUT_PLUGIN_DISABLED | INPUT_PLUGIN_ENABLED, _) => current,
        _ => current.max(next),
    }
}
