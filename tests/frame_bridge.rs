//! Frame bridge lifecycle as the host drives it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use hudbridge::bridge::{DrawContext, WidgetPlacement};
use hudbridge::capsule::{InputDevice, InputDeviceInfo};
use hudbridge::config::BindingConfig;
use hudbridge::input::InputAction;
use hudbridge::{
    BridgeConfig, BridgeError, BridgeState, DirtyRect, FrameBridge, FrameInputs, Resolution, StatusCode, Widget,
};

const BACKGROUND: u32 = 0xFF00_0000;
const BAR: u32 = 0xFF00_C000;
const BAR_HEIGHT: u32 = 8;

/// Draws a bar whose length follows engine rpm (one pixel per 100 rpm).
struct RpmBar {
    fail: Arc<AtomicBool>,
}

impl Widget for RpmBar {
    fn name(&self) -> &str {
        "rpm"
    }

    fn placement(&self, resolution: Resolution) -> WidgetPlacement {
        WidgetPlacement::new(0, resolution.height as i32 - 64, resolution.width / 4, 64)
    }

    fn render(&mut self, ctx: &mut DrawContext<'_>) -> hudbridge::Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(BridgeError::render_failed("rpm", "gauge texture missing"));
        }
        let complete = ctx.needs_complete_redraw();
        if !complete && !ctx.fine_tick() {
            return Ok(());
        }

        let rpm = ctx.game_data().telemetry().engine_rpm().max(0.0);
        let surface = ctx.surface();
        let length = ((rpm / 100.0) as u32).min(surface.width());
        if complete {
            surface.clear(BACKGROUND);
        } else {
            surface.fill_rect(DirtyRect::new(0, 0, surface.width(), BAR_HEIGHT), BACKGROUND);
        }
        surface.fill_rect(DirtyRect::new(0, 0, length, BAR_HEIGHT), BAR);
        Ok(())
    }
}

struct Harness {
    bridge: FrameBridge<Box<dyn FnMut() -> hudbridge::Result<Vec<Box<dyn Widget>>>>>,
    fail: Arc<AtomicBool>,
}

fn harness(config: BridgeConfig) -> Result<Harness> {
    let fail = Arc::new(AtomicBool::new(false));
    let shared = Arc::clone(&fail);
    let source: Box<dyn FnMut() -> hudbridge::Result<Vec<Box<dyn Widget>>>> =
        Box::new(move || Ok(vec![Box::new(RpmBar { fail: Arc::clone(&shared) }) as Box<dyn Widget>]));
    let bridge = FrameBridge::new(config, source).context("creating bridge")?;
    Ok(Harness { bridge, fail })
}

fn frame(enabled: bool) -> FrameInputs {
    FrameInputs { plugin_enabled: enabled, resolution: Resolution::new(1280, 720) }
}

/// Run frames until one reports something, at most `limit`.
fn run_until_render(bridge: &mut Harness, limit: usize) -> StatusCode {
    for _ in 0..limit {
        let status = bridge.bridge.update(frame(true));
        if status != StatusCode::Quiescent {
            return status;
        }
    }
    StatusCode::Quiescent
}

#[test]
fn enable_renders_full_surface_then_goes_quiet() -> Result<()> {
    let mut h = harness(BridgeConfig::default())?;

    assert_eq!(h.bridge.update(frame(false)), StatusCode::Quiescent);
    assert_eq!(h.bridge.update(frame(true)), StatusCode::RenderAndPublishTextureInfo);
    assert_eq!(h.bridge.state(), BridgeState::Enabled);

    let info = h.bridge.texture_info().texture(0).context("texture info for rpm")?;
    assert_eq!((info.name.as_str(), info.width, info.height, info.y), ("rpm", 320, 64, 656));
    assert_eq!(h.bridge.dirty_export("rpm").context("rpm export")?.rects(), [DirtyRect::new(0, 0, 320, 64)]);

    for _ in 0..5 {
        assert_eq!(h.bridge.update(frame(true)), StatusCode::Quiescent);
    }
    Ok(())
}

#[test]
fn telemetry_change_reports_only_the_bar() -> Result<()> {
    let mut h = harness(BridgeConfig::default())?;
    h.bridge.update(frame(true));

    h.bridge.game_data_mut().telemetry_mut().set_engine_rpm(6400.0);
    assert_eq!(run_until_render(&mut h, 4), StatusCode::Render);

    let rects = h.bridge.dirty_rects("rpm").context("rpm rects")?;
    assert!(!rects.is_empty());
    for rect in rects {
        assert!(rect.y < BAR_HEIGHT + 16, "{rect:?} is below the bar");
        assert!(rect.right() <= 80, "{rect:?} extends past the bar");
    }
    let surface = h.bridge.surface("rpm").context("rpm surface")?;
    assert_eq!(surface.pixel(63, 0), Some(BAR));
    assert_eq!(surface.pixel(64, 0), Some(BACKGROUND));
    Ok(())
}

#[test]
fn disabling_mid_run_stays_quiescent_until_enabled() -> Result<()> {
    let mut h = harness(BridgeConfig::default())?;
    h.bridge.update(frame(true));

    for rpm in [1000.0, 3000.0, 5000.0] {
        h.bridge.game_data_mut().telemetry_mut().set_engine_rpm(rpm);
        assert_eq!(h.bridge.update(frame(false)), StatusCode::Quiescent);
    }
    assert_eq!(h.bridge.state(), BridgeState::Disabled);
    assert!(h.bridge.surface("rpm").is_none());
    assert_eq!(h.bridge.texture_info().texture_count(), 0);

    assert_eq!(h.bridge.update(frame(true)), StatusCode::RenderAndPublishTextureInfo);
    assert_eq!(h.bridge.dirty_rects("rpm").context("rpm rects")?, [DirtyRect::new(0, 0, 320, 64)]);
    assert_eq!(h.bridge.surface("rpm").context("rpm surface")?.pixel(49, 0), Some(BAR));
    Ok(())
}

#[test]
fn forced_redraw_reports_render_without_changes() -> Result<()> {
    let mut h = harness(BridgeConfig::default())?;
    h.bridge.update(frame(true));
    h.bridge.update(frame(true));

    h.bridge.force_complete_redraw();
    assert_eq!(h.bridge.update(frame(true)), StatusCode::Render);
    assert_eq!(h.bridge.dirty_rects("rpm").context("rpm rects")?, [DirtyRect::new(0, 0, 320, 64)]);
    assert_eq!(h.bridge.update(frame(true)), StatusCode::Quiescent);
    Ok(())
}

#[test]
fn resolution_change_reconfigures_in_the_same_frame() -> Result<()> {
    let mut h = harness(BridgeConfig::default())?;
    h.bridge.update(frame(true));

    let wide = FrameInputs { plugin_enabled: true, resolution: Resolution::new(2560, 1440) };
    assert_eq!(h.bridge.update(wide), StatusCode::RenderAndPublishTextureInfo);

    let surface = h.bridge.surface("rpm").context("rpm surface")?;
    assert_eq!((surface.width(), surface.height()), (640, 64));
    assert_eq!(h.bridge.dirty_rects("rpm").context("rpm rects")?, [DirtyRect::new(0, 0, 640, 64)]);
    Ok(())
}

#[test]
fn render_failure_drops_the_frame_and_recovers() -> Result<()> {
    let mut h = harness(BridgeConfig::default())?;
    h.bridge.update(frame(true));

    h.fail.store(true, Ordering::SeqCst);
    h.bridge.game_data_mut().telemetry_mut().set_engine_rpm(2000.0);
    for _ in 0..3 {
        assert_eq!(h.bridge.update(frame(true)), StatusCode::Quiescent);
    }
    assert_eq!(h.bridge.state(), BridgeState::Enabled);

    h.fail.store(false, Ordering::SeqCst);
    assert_eq!(h.bridge.update(frame(true)), StatusCode::Render);
    let rects = h.bridge.dirty_rects("rpm").context("rpm rects")?;
    assert!(rects.iter().any(|r| r.contains(&DirtyRect::new(0, 0, 16, BAR_HEIGHT))));
    Ok(())
}

#[test]
fn input_bindings_toggle_plugin_and_visibility() -> Result<()> {
    let config = BridgeConfig {
        bindings: vec![
            BindingConfig {
                device: "Keyboard".into(),
                control: "F9".into(),
                modifiers: 0,
                action: InputAction::TogglePluginEnabled,
            },
            BindingConfig {
                device: "Keyboard".into(),
                control: "F10".into(),
                modifiers: 1,
                action: InputAction::ToggleWidgetVisible { widget: "rpm".into() },
            },
        ],
        ..BridgeConfig::default()
    };
    let mut h = harness(config)?;

    let devices = InputDeviceInfo::new(vec![InputDevice {
        name: "Keyboard".into(),
        controls: vec!["F9".into(), "F10".into()],
    }]);
    h.bridge.init_input(&devices.encode(h.bridge.byte_order()));
    assert_eq!(h.bridge.input_state_mut().len(), 2);
    h.bridge.update(frame(true));

    // F10 without its modifier does nothing.
    h.bridge.input_state_mut()[1] = 1;
    assert_eq!(h.bridge.update_input(0), 0);
    h.bridge.input_state_mut()[1] = 0;
    h.bridge.update_input(0);

    h.bridge.input_state_mut()[1] = 1;
    assert_eq!(h.bridge.update_input(1), 1);
    assert_eq!(h.bridge.update(frame(true)), StatusCode::RenderAndPublishTextureInfo);
    assert!(!h.bridge.texture_info().texture(0).context("rpm info")?.visible);
    h.bridge.input_state_mut()[1] = 0;

    h.bridge.input_state_mut()[0] = 1;
    assert_eq!(h.bridge.update_input(0), -1);
    assert_eq!(h.bridge.update(frame(true)), StatusCode::Quiescent);
    assert_eq!(h.bridge.state(), BridgeState::Disabled);

    h.bridge.input_state_mut()[0] = 0;
    assert_eq!(h.bridge.update_input(0), 0);
    h.bridge.input_state_mut()[0] = 1;
    assert_eq!(h.bridge.update_input(0), 2);
    assert_eq!(h.bridge.update(frame(true)), StatusCode::RenderAndPublishTextureInfo);
    Ok(())
}

#[test]
fn malformed_descriptor_keeps_previous_devices() -> Result<()> {
    let mut h = harness(BridgeConfig::default())?;
    let devices = InputDeviceInfo::new(vec![InputDevice { name: "Pad".into(), controls: vec!["X".into()] }]);
    h.bridge.init_input(&devices.encode(h.bridge.byte_order()));

    h.bridge.init_input(&[0xFF, 0xFF]);
    assert_eq!(h.bridge.input_devices().control_count(), 1);
    assert_eq!(h.bridge.input_state_mut().len(), 1);
    Ok(())
}
