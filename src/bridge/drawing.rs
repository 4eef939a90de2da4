//! Drawing manager: widgets, their surfaces and per-frame dirty rects

use std::collections::HashSet;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, trace, warn};

use super::clock::{ClockSignals, FrameClock};
use super::texture_info::{DirtyRectExport, TextureInfo, TextureInfoExport};
use super::widget::{DrawContext, Widget};
use crate::capsule::ByteOrder;
use crate::config::{ClockConfig, DirtyRectConfig};
use crate::dirty::{DirtyRectBuffer, DirtyRectTracker};
use crate::game_data::LiveGameData;
use crate::surface::{DirtyRect, Resolution, TextureSurface};
use crate::{BridgeError, Result};

struct ManagedWidget {
    widget: Box<dyn Widget>,
    x: i32,
    y: i32,
    surface: TextureSurface,
    tracker: DirtyRectTracker,
    dirty: DirtyRectBuffer,
    export: DirtyRectExport,
    visible: bool,
    needs_complete_redraw: bool,
}

/// Owns every widget surface between two reconfigurations.
pub struct DrawingManager {
    dirty_config: DirtyRectConfig,
    order: ByteOrder,
    clock: FrameClock,
    widgets: Vec<ManagedWidget>,
    hidden: HashSet<String>,
    texture_info: TextureInfoExport,
}

impl DrawingManager {
    pub fn new(dirty_config: DirtyRectConfig, clock_config: ClockConfig, order: ByteOrder) -> Self {
        Self {
            dirty_config,
            order,
            clock: FrameClock::new(clock_config),
            widgets: Vec::new(),
            hidden: HashSet::new(),
            texture_info: TextureInfoExport::new(order),
        }
    }

    /// Replace the widget set and allocate fresh surfaces sized for `resolution`.
    ///
    /// Every surface starts with a full redraw pending.
    pub fn rebuild(&mut self, widgets: Vec<Box<dyn Widget>>, resolution: Resolution) -> Result<()> {
        if resolution.is_empty() {
            return Err(BridgeError::reconfiguration_failed(format!(
                "host resolution {}x{} has no area",
                resolution.width, resolution.height
            )));
        }

        let mut names = HashSet::new();
        let mut managed = Vec::with_capacity(widgets.len());
        for widget in widgets {
            if !names.insert(widget.name().to_string()) {
                return Err(BridgeError::reconfiguration_failed(format!(
                    "duplicate widget name '{}'",
                    widget.name()
                )));
            }

            let placement = widget.placement(resolution);
            let width = placement.width.min(resolution.width);
            let height = placement.height.min(resolution.height);
            let visible = !self.hidden.contains(widget.name());

            managed.push(ManagedWidget {
                surface: TextureSurface::new(widget.name(), width, height),
                x: placement.x,
                y: placement.y,
                tracker: DirtyRectTracker::new(self.dirty_config),
                dirty: DirtyRectBuffer::with_capacity(self.dirty_config.max_rects),
                export: DirtyRectExport::new(self.dirty_config.max_rects, self.order),
                visible,
                needs_complete_redraw: true,
                widget,
            });
        }

        self.widgets = managed;
        self.clock.reset();
        self.publish_texture_info();
        debug!(widgets = self.widgets.len(), width = resolution.width, height = resolution.height, "Surfaces rebuilt");
        Ok(())
    }

    /// Drop every widget and surface.
    pub fn clear(&mut self) {
        self.widgets.clear();
        self.publish_texture_info();
    }

    pub fn widget_count(&self) -> usize {
        self.widgets.len()
    }

    /// Render every visible widget.
    ///
    /// All widgets get their turn even if an earlier one fails; the first
    /// failure is returned. Failed widgets keep their write hint so whatever
    /// they managed to draw is still diffed on the next successful frame.
    pub fn render(&mut self, token: u64, game: &LiveGameData) -> Result<()> {
        let clock = self.clock.advance();
        let mut first_failure = None;

        for managed in self.widgets.iter_mut().filter(|m| m.visible) {
            if let Err(e) = render_widget(managed, token, game, clock) {
                warn!(widget = managed.widget.name(), token, error = %e, "Widget render failed");
                managed.needs_complete_redraw = true;
                first_failure.get_or_insert(e);
            }
        }

        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Compute and export dirty rects for every surface. Returns the total count.
    pub fn collect_dirty_rects(&mut self, token: u64) -> usize {
        let mut total = 0;
        for managed in &mut self.widgets {
            if managed.visible {
                total += managed.tracker.compute_dirty_rects(token, &mut managed.surface, &mut managed.dirty);
                managed.export.publish(&managed.dirty);
            } else {
                managed.dirty.clear();
                managed.export.clear();
            }
        }
        trace!(token, rects = total, "Dirty rects collected");
        total
    }

    /// Ask every widget for a complete redraw and report full surfaces next frame.
    pub fn force_complete_redraw(&mut self) {
        for managed in &mut self.widgets {
            managed.needs_complete_redraw = true;
            managed.tracker.force_full_redraw();
        }
        self.clock.reset();
    }

    /// Flip the visibility of `name`, remembered across reconfigurations.
    ///
    /// Returns the new visibility, and whether a loaded widget was affected.
    pub fn toggle_visible(&mut self, name: &str) -> (bool, bool) {
        let visible = if self.hidden.remove(name) {
            true
        } else {
            self.hidden.insert(name.to_string());
            false
        };

        let mut affected = false;
        for managed in self.widgets.iter_mut().filter(|m| m.widget.name() == name) {
            managed.visible = visible;
            if visible {
                managed.needs_complete_redraw = true;
                managed.tracker.force_full_redraw();
            }
            affected = true;
        }
        if affected {
            self.publish_texture_info();
        }
        debug!(widget = name, visible, affected, "Widget visibility toggled");
        (visible, affected)
    }

    pub fn is_visible(&self, name: &str) -> bool {
        !self.hidden.contains(name)
    }

    pub fn texture_info(&self) -> &TextureInfoExport {
        &self.texture_info
    }

    pub fn surface(&self, name: &str) -> Option<&TextureSurface> {
        self.find(name).map(|m| &m.surface)
    }

    pub fn dirty_rects(&self, name: &str) -> Option<&[DirtyRect]> {
        self.find(name).map(|m| m.dirty.as_slice())
    }

    pub fn dirty_export(&self, name: &str) -> Option<&DirtyRectExport> {
        self.find(name).map(|m| &m.export)
    }

    /// Dirty-rect exports in texture info order.
    pub fn dirty_exports(&self) -> impl Iterator<Item = &DirtyRectExport> {
        self.widgets.iter().map(|m| &m.export)
    }

    fn find(&self, name: &str) -> Option<&ManagedWidget> {
        self.widgets.iter().find(|m| m.widget.name() == name)
    }

    fn publish_texture_info(&mut self) {
        let infos: Vec<TextureInfo> = self
            .widgets
            .iter()
            .map(|m| TextureInfo {
                name: m.widget.name().to_string(),
                x: m.x,
                y: m.y,
                width: m.surface.width(),
                height: m.surface.height(),
                visible: m.visible,
            })
            .collect();
        self.texture_info.publish(&infos);
    }
}

fn render_widget(managed: &mut ManagedWidget, token: u64, game: &LiveGameData, clock: ClockSignals) -> Result<()> {
    let complete = managed.needs_complete_redraw;
    let clock = if complete { ClockSignals::ALL } else { clock };
    let name = managed.widget.name().to_string();

    let widget = &mut managed.widget;
    let surface = &mut managed.surface;
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut ctx = DrawContext::new(surface, game, clock, complete, token);
        widget.render(&mut ctx)
    }));

    match outcome {
        Ok(Ok(())) => {
            managed.needs_complete_redraw = false;
            Ok(())
        }
        Ok(Err(BridgeError::Render { widget, reason })) => Err(BridgeError::Render { widget, reason }),
        Ok(Err(e)) => Err(BridgeError::render_failed(name, e.to_string())),
        Err(payload) => Err(BridgeError::render_failed(name, panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {s}")
    } else {
        "panicked".to_string()
    }
}
