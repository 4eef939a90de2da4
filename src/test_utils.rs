//! Test doubles shared by unit tests, integration tests and benches
//!
//! - [`FillWidget`] / [`PanickingWidget`]: fixed-behaviour widgets.
//! - [`ProbeWidget`] + [`WidgetProbe`]: a widget whose next frames are scripted
//!   from the test and which counts what it was asked to do.
//! - [`FakeWidgetSource`]: a [`WidgetSource`] handing out probe widgets, able
//!   to fail on demand.
//! - [`ManualScanner`]: a [`DeviceScanner`] the test actuates by hand.
//! - [`sample_game_data`]: populated capsules for recordings and benches.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::bridge::{DrawContext, Widget, WidgetPlacement, WidgetSource};
use crate::capsule::{ByteOrder, Vector3};
use crate::game_data::LiveGameData;
use crate::input::DeviceScanner;
use crate::surface::{DirtyRect, Resolution};
use crate::{BridgeError, Result};

/// Paints its whole surface on every complete redraw and nothing otherwise.
#[derive(Debug, Clone)]
pub struct FillWidget {
    name: String,
    width: u32,
    height: u32,
}

impl FillWidget {
    pub const COLOR: u32 = 0xFF20_4080;

    pub fn new(name: impl Into<String>, width: u32, height: u32) -> Self {
        Self { name: name.into(), width, height }
    }
}

impl Widget for FillWidget {
    fn name(&self) -> &str {
        &self.name
    }

    fn placement(&self, _resolution: Resolution) -> WidgetPlacement {
        WidgetPlacement::new(0, 0, self.width, self.height)
    }

    fn render(&mut self, ctx: &mut DrawContext<'_>) -> Result<()> {
        if ctx.needs_complete_redraw() {
            ctx.surface().clear(Self::COLOR);
        }
        Ok(())
    }
}

/// Panics on every render.
#[derive(Debug, Clone)]
pub struct PanickingWidget {
    name: String,
}

impl PanickingWidget {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Widget for PanickingWidget {
    fn name(&self) -> &str {
        &self.name
    }

    fn placement(&self, _resolution: Resolution) -> WidgetPlacement {
        WidgetPlacement::new(0, 0, 8, 8)
    }

    fn render(&mut self, _ctx: &mut DrawContext<'_>) -> Result<()> {
        panic!("{} exploded", self.name);
    }
}

#[derive(Debug, Default)]
struct ProbeState {
    renders: u32,
    complete_redraws: u32,
    fail_next: bool,
    panic_next: bool,
    fills: Vec<(DirtyRect, u32)>,
}

/// Test-side handle to a [`ProbeWidget`]. Survives reconfigurations.
#[derive(Debug, Clone, Default)]
pub struct WidgetProbe {
    state: Arc<Mutex<ProbeState>>,
}

impl WidgetProbe {
    pub fn renders(&self) -> u32 {
        self.state.lock().renders
    }

    pub fn complete_redraws(&self) -> u32 {
        self.state.lock().complete_redraws
    }

    /// Return an error from the next render.
    pub fn fail_next(&self) {
        self.state.lock().fail_next = true;
    }

    /// Panic in the next render.
    pub fn panic_next(&self) {
        self.state.lock().panic_next = true;
    }

    /// Paint `rect` with `color` in the next render.
    pub fn fill_next(&self, rect: DirtyRect, color: u32) {
        self.state.lock().fills.push((rect, color));
    }
}

/// Widget driven by a [`WidgetProbe`]. Clears to black on complete redraws.
#[derive(Debug)]
pub struct ProbeWidget {
    name: String,
    placement: WidgetPlacement,
    probe: WidgetProbe,
}

impl ProbeWidget {
    pub fn new(name: impl Into<String>, placement: WidgetPlacement, probe: WidgetProbe) -> Self {
        Self { name: name.into(), placement, probe }
    }
}

impl Widget for ProbeWidget {
    fn name(&self) -> &str {
        &self.name
    }

    fn placement(&self, _resolution: Resolution) -> WidgetPlacement {
        self.placement
    }

    fn render(&mut self, ctx: &mut DrawContext<'_>) -> Result<()> {
        let (fills, fail, panic) = {
            let mut state = self.probe.state.lock();
            state.renders += 1;
            if ctx.needs_complete_redraw() {
                state.complete_redraws += 1;
            }
            (
                std::mem::take(&mut state.fills),
                std::mem::take(&mut state.fail_next),
                std::mem::take(&mut state.panic_next),
            )
        };

        if panic {
            panic!("{} was told to panic", self.name);
        }
        if ctx.needs_complete_redraw() {
            ctx.surface().clear(0);
        }
        for (rect, color) in fills {
            ctx.surface().fill_rect(rect, color);
        }
        if fail {
            return Err(BridgeError::render_failed(self.name.clone(), "scripted failure"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SourceState {
    widgets: Mutex<Vec<(String, WidgetPlacement, WidgetProbe)>>,
    loads: AtomicU32,
    fail_loads: AtomicBool,
}

/// Widget source handing out [`ProbeWidget`]s. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct FakeWidgetSource {
    state: Arc<SourceState>,
}

impl FakeWidgetSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a widget loaded from the next reconfiguration onwards.
    pub fn add_widget(&self, name: impl Into<String>, placement: WidgetPlacement) -> WidgetProbe {
        let probe = WidgetProbe::default();
        self.state.widgets.lock().push((name.into(), placement, probe.clone()));
        probe
    }

    pub fn remove_widget(&self, name: &str) {
        self.state.widgets.lock().retain(|(n, _, _)| n != name);
    }

    pub fn fail_loads(&self, fail: bool) {
        self.state.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Number of load attempts, failed ones included.
    pub fn loads(&self) -> u32 {
        self.state.loads.load(Ordering::SeqCst)
    }
}

impl WidgetSource for FakeWidgetSource {
    fn load_widgets(&mut self) -> Result<Vec<Box<dyn Widget>>> {
        self.state.loads.fetch_add(1, Ordering::SeqCst);
        if self.state.fail_loads.load(Ordering::SeqCst) {
            return Err(BridgeError::reconfiguration_failed("widget configuration unavailable"));
        }
        Ok(self
            .state
            .widgets
            .lock()
            .iter()
            .map(|(name, placement, probe)| {
                Box::new(ProbeWidget::new(name.clone(), *placement, probe.clone())) as Box<dyn Widget>
            })
            .collect())
    }
}

/// Scanner that detects whatever the test last passed to [`actuate`](Self::actuate).
///
/// An actuated control stays actuated until [`release`](Self::release), so a
/// scan started afterwards detects it immediately.
#[derive(Debug, Clone)]
pub struct ManualScanner {
    tx: Arc<watch::Sender<Option<String>>>,
    fail: bool,
}

impl Default for ManualScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualScanner {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx), fail: false }
    }

    /// A scanner whose scans fail immediately.
    pub fn failing() -> Self {
        Self { fail: true, ..Self::new() }
    }

    pub fn actuate(&self, control: impl Into<String>) {
        self.tx.send_replace(Some(control.into()));
    }

    pub fn release(&self) {
        self.tx.send_replace(None);
    }
}

#[async_trait::async_trait]
impl DeviceScanner for ManualScanner {
    async fn scan(&self, _label: &str, cancel: &CancellationToken) -> Result<Option<String>> {
        if self.fail {
            return Err(BridgeError::input_descriptor("scripted scanner failure"));
        }

        let mut rx = self.tx.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if current.is_some() {
                return Ok(current);
            }
            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                changed = rx.changed() => {
                    if changed.is_err() {
                        return Ok(None);
                    }
                }
            }
        }
    }
}

/// Capsules describing a short race: player in P2, `vehicles` cars spaced
/// 10 m apart along x, camera near car 0.
pub fn sample_game_data(order: ByteOrder, vehicles: usize) -> LiveGameData {
    let mut data = LiveGameData::new(order);

    let graphics = data.graphics_mut();
    graphics.set_camera_position(Vector3::new(1.0, 0.5, 0.0));

    let telemetry = data.telemetry_mut();
    telemetry.set_lap_number(3);
    telemetry.set_vehicle_name("Formula Test");
    telemetry.set_track_name("Test Ring");
    telemetry.set_gear(4);
    telemetry.set_engine_rpm(8450.0);
    telemetry.set_fuel(42.5);

    let scoring = data.scoring_mut();
    scoring.set_track_name("Test Ring");
    scoring.set_session(10);
    scoring.set_current_et(512.25);
    scoring.set_num_vehicles(vehicles as i32);
    scoring.set_game_phase(5);
    scoring.set_in_realtime(true);
    scoring.set_player_name("Test Driver");

    for (i, vehicle) in data.vehicles_mut(vehicles).iter_mut().enumerate() {
        vehicle.set_driver_name(&format!("Driver {i}"));
        vehicle.set_vehicle_name(&format!("Car #{i}"));
        vehicle.set_place((i + 1) as u8);
        vehicle.set_total_laps(3);
        vehicle.set_position(Vector3::new(i as f32 * 10.0, 0.0, 0.0));
        vehicle.set_is_player(i == 1);
    }
    data
}
