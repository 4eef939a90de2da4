//! Input bindings and per-frame input state
//!
//! The host describes its input devices once ([`InputRouter::set_devices`])
//! and then writes one byte per control into the state buffer every frame. A
//! control whose byte goes from zero to non-zero fires the bindings attached
//! to it, provided the modifier mask matches exactly.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::capsule::InputDeviceInfo;
use crate::config::BindingConfig;

/// What a binding does when its control is pressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputAction {
    TogglePluginEnabled,
    ToggleWidgetVisible { widget: String },
    ForceCompleteRedraw,
}

/// A binding whose device and control were found in the current descriptor.
#[derive(Debug, Clone)]
struct ResolvedBinding {
    control: usize,
    modifiers: u32,
    action: InputAction,
}

/// Input state shared with polling scanners.
#[derive(Debug, Clone, Default)]
pub struct InputSnapshot {
    /// Bumped on every published update.
    pub sequence: u64,
    pub devices: Arc<InputDeviceInfo>,
    /// One byte per control, in descriptor order.
    pub state: Vec<u8>,
}

/// Publishing side of the input state feed.
///
/// Updates are copied into the watch slot in place, so publishing allocates
/// nothing once the state buffer has reached its size. Receivers are only
/// woken when the state actually changed.
#[derive(Debug, Clone)]
pub struct InputFeed {
    tx: Arc<watch::Sender<InputSnapshot>>,
}

impl Default for InputFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl InputFeed {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(InputSnapshot::default());
        Self { tx: Arc::new(tx) }
    }

    pub fn subscribe(&self) -> watch::Receiver<InputSnapshot> {
        self.tx.subscribe()
    }

    pub fn has_subscribers(&self) -> bool {
        self.tx.receiver_count() > 0
    }

    fn publish_devices(&self, devices: Arc<InputDeviceInfo>) {
        self.tx.send_modify(|snapshot| {
            snapshot.sequence += 1;
            snapshot.state.clear();
            snapshot.state.resize(devices.control_count(), 0);
            snapshot.devices = devices;
        });
    }

    fn publish_state(&self, state: &[u8]) {
        self.tx.send_if_modified(|snapshot| {
            if snapshot.state == state {
                return false;
            }
            snapshot.sequence += 1;
            snapshot.state.clear();
            snapshot.state.extend_from_slice(state);
            true
        });
    }
}

/// Resolves rising control edges into [`InputAction`]s.
#[derive(Debug)]
pub struct InputRouter {
    devices: Arc<InputDeviceInfo>,
    bindings: Vec<BindingConfig>,
    resolved: Vec<ResolvedBinding>,
    state: Vec<u8>,
    previous: Vec<u8>,
    feed: InputFeed,
}

impl InputRouter {
    pub fn new(bindings: Vec<BindingConfig>) -> Self {
        Self {
            devices: Arc::new(InputDeviceInfo::default()),
            bindings,
            resolved: Vec::new(),
            state: Vec::new(),
            previous: Vec::new(),
            feed: InputFeed::new(),
        }
    }

    /// Replace the device set and re-resolve bindings against it.
    pub fn set_devices(&mut self, devices: InputDeviceInfo) {
        let controls = devices.control_count();
        self.devices = Arc::new(devices);
        self.state = vec![0; controls];
        self.previous = vec![0; controls];

        self.resolved.clear();
        for binding in &self.bindings {
            match self.devices.control_index(&binding.device, &binding.control) {
                Some(control) => self.resolved.push(ResolvedBinding {
                    control,
                    modifiers: binding.modifiers,
                    action: binding.action.clone(),
                }),
                None => warn!(
                    device = %binding.device,
                    control = %binding.control,
                    "Binding refers to an unknown control"
                ),
            }
        }

        debug!(
            devices = self.devices.devices().len(),
            controls,
            bindings = self.resolved.len(),
            "Input devices initialised"
        );
        self.feed.publish_devices(Arc::clone(&self.devices));
    }

    pub fn devices(&self) -> &InputDeviceInfo {
        &self.devices
    }

    /// Per-control state buffer the host writes into before each poll.
    pub fn state_mut(&mut self) -> &mut [u8] {
        &mut self.state
    }

    pub fn feed(&self) -> &InputFeed {
        &self.feed
    }

    /// Process the current state buffer and push fired actions into `fired`.
    pub fn poll(&mut self, modifier_mask: u32, fired: &mut Vec<InputAction>) {
        self.feed.publish_state(&self.state);

        for binding in &self.resolved {
            let now = self.state[binding.control] != 0;
            let before = self.previous[binding.control] != 0;
            if now && !before && binding.modifiers == modifier_mask {
                fired.push(binding.action.clone());
            }
        }
        self.previous.copy_from_slice(&self.state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capsule::InputDevice;

    fn binding(control: &str, modifiers: u32, action: InputAction) -> BindingConfig {
        BindingConfig { device: "Wheel".into(), control: control.into(), modifiers, action }
    }

    fn router() -> InputRouter {
        let mut router = InputRouter::new(vec![
            binding("A", 0, InputAction::TogglePluginEnabled),
            binding("B", 2, InputAction::ForceCompleteRedraw),
            binding("Missing", 0, InputAction::ForceCompleteRedraw),
        ]);
        router.set_devices(InputDeviceInfo::new(vec![InputDevice {
            name: "Wheel".into(),
            controls: vec!["A".into(), "B".into()],
        }]));
        router
    }

    #[test]
    fn actions_fire_on_rising_edge_only() {
        let mut router = router();
        let mut fired = Vec::new();

        router.state_mut()[0] = 1;
        router.poll(0, &mut fired);
        assert_eq!(fired, [InputAction::TogglePluginEnabled]);

        fired.clear();
        router.poll(0, &mut fired);
        assert!(fired.is_empty(), "held control must not repeat");

        router.state_mut()[0] = 0;
        router.poll(0, &mut fired);
        router.state_mut()[0] = 1;
        router.poll(0, &mut fired);
        assert_eq!(fired, [InputAction::TogglePluginEnabled]);
    }

    #[test]
    fn modifiers_must_match_exactly() {
        let mut router = router();
        let mut fired = Vec::new();

        router.state_mut()[1] = 1;
        router.poll(0, &mut fired);
        assert!(fired.is_empty());

        router.state_mut()[1] = 0;
        router.poll(2, &mut fired);
        router.state_mut()[1] = 1;
        router.poll(2, &mut fired);
        assert_eq!(fired, [InputAction::ForceCompleteRedraw]);
    }

    #[test]
    fn subscribers_see_published_state() {
        let mut router = router();
        let mut rx = router.feed().subscribe();
        assert_eq!(rx.borrow_and_update().state, [0, 0]);

        router.state_mut()[1] = 7;
        router.poll(0, &mut Vec::new());

        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update();
        assert_eq!(snapshot.state, [0, 7]);
        assert_eq!(snapshot.devices.control_at(1), Some(("Wheel", "B")));
        drop(snapshot);

        router.poll(0, &mut Vec::new());
        assert!(!rx.has_changed().unwrap());
    }
}
