//! Input polling sessions driven through the frame bridge's input state.

use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use hudbridge::capsule::{InputDevice, InputDeviceInfo};
use hudbridge::input::{InputFeed, InputFeedScanner, InputPollingBridge, PollOutcome};
use hudbridge::{BridgeConfig, FrameBridge, Widget};

const WAIT: Duration = Duration::from_secs(5);

type Source = fn() -> hudbridge::Result<Vec<Box<dyn Widget>>>;

fn no_widgets() -> hudbridge::Result<Vec<Box<dyn Widget>>> {
    Ok(Vec::new())
}

fn bridge_with_keyboard() -> Result<FrameBridge<Source>> {
    let mut bridge = FrameBridge::new(BridgeConfig::default(), no_widgets as Source)?;
    let devices = InputDeviceInfo::new(vec![
        InputDevice { name: "Keyboard".into(), controls: vec!["F9".into(), "F10".into()] },
        InputDevice { name: "Wheel".into(), controls: vec!["Paddle L".into(), "Paddle R".into()] },
    ]);
    bridge.init_input(&devices.encode(bridge.byte_order()));
    Ok(bridge)
}

fn wait_for_subscriber(feed: &InputFeed) -> Result<()> {
    let deadline = Instant::now() + WAIT;
    while !feed.has_subscribers() {
        if Instant::now() > deadline {
            bail!("scanner never subscribed to the input feed");
        }
        thread::sleep(Duration::from_millis(5));
    }
    Ok(())
}

/// Press and release `control` once per host frame until the session completes.
fn tap_until_complete<S: hudbridge::WidgetSource>(
    bridge: &mut FrameBridge<S>,
    control: usize,
    rx: &Receiver<PollOutcome>,
) -> Result<PollOutcome> {
    let deadline = Instant::now() + WAIT;
    loop {
        bridge.input_state_mut()[control] = 1;
        bridge.update_input(0);
        if let Ok(outcome) = rx.recv_timeout(Duration::from_millis(20)) {
            return Ok(outcome);
        }
        bridge.input_state_mut()[control] = 0;
        bridge.update_input(0);
        if Instant::now() > deadline {
            bail!("polling session never completed");
        }
    }
}

#[test]
fn feed_scanner_detects_the_pressed_control() -> Result<()> {
    let mut bridge = bridge_with_keyboard()?;
    let polling = InputPollingBridge::new(bridge.input_scanner());
    let (tx, rx) = mpsc::channel();

    assert!(polling.start_polling("Toggle overlay", move |outcome| {
        let _ = tx.send(outcome);
    }));
    wait_for_subscriber(bridge.input_feed())?;

    let outcome = tap_until_complete(&mut bridge, 3, &rx)?;
    assert_eq!(outcome, PollOutcome::Detected("Wheel/Paddle R".into()));
    assert!(!polling.is_polling());
    Ok(())
}

#[test]
fn held_control_must_be_released_before_it_counts() -> Result<()> {
    let mut bridge = bridge_with_keyboard()?;
    bridge.input_state_mut()[0] = 1;
    bridge.update_input(0);

    let polling = InputPollingBridge::new(bridge.input_scanner());
    let (tx, rx) = mpsc::channel();
    polling.start_polling("Next page", move |outcome| {
        let _ = tx.send(outcome);
    });
    wait_for_subscriber(bridge.input_feed())?;

    // F9 stays held across several frames while nothing else changes.
    for _ in 0..5 {
        bridge.update_input(0);
        assert!(rx.recv_timeout(Duration::from_millis(10)).is_err());
    }
    bridge.input_state_mut()[0] = 0;
    bridge.update_input(0);

    let outcome = tap_until_complete(&mut bridge, 1, &rx)?;
    assert_eq!(outcome.control_id(), Some("Keyboard/F10"));
    Ok(())
}

#[test]
fn interrupt_while_host_is_idle_cancels() -> Result<()> {
    let bridge = bridge_with_keyboard()?;
    let polling = InputPollingBridge::new(bridge.input_scanner());
    let (tx, rx) = mpsc::channel();

    assert!(polling.start_polling("Toggle standings", move |outcome| {
        let _ = tx.send(outcome);
    }));
    assert!(!polling.start_polling("Toggle standings", |_| {}));
    polling.interrupt();

    let outcome = rx.recv_timeout(WAIT).context("waiting for the cancelled session")?;
    assert!(outcome.is_cancelled());
    assert!(!polling.is_polling());
    Ok(())
}

#[test]
fn next_session_can_start_from_the_callback() -> Result<()> {
    let bridge = bridge_with_keyboard()?;
    let polling = std::sync::Arc::new(InputPollingBridge::new(bridge.input_scanner()));
    let (tx, rx) = mpsc::channel();

    let chained = std::sync::Arc::clone(&polling);
    let first_tx = tx.clone();
    polling.start_polling("first", move |outcome| {
        let _ = first_tx.send(("first", outcome));
        let restarted = chained.start_polling("second", move |outcome| {
            let _ = tx.send(("second", outcome));
        });
        assert!(restarted);
    });
    polling.interrupt();

    let (who, outcome) = rx.recv_timeout(WAIT).context("first session")?;
    assert_eq!((who, outcome.is_cancelled()), ("first", true));

    let deadline = Instant::now() + WAIT;
    while polling.active_label().as_deref() != Some("second") {
        if Instant::now() > deadline {
            bail!("second session never started");
        }
        thread::sleep(Duration::from_millis(5));
    }
    polling.interrupt();
    let (who, outcome) = rx.recv_timeout(WAIT).context("second session")?;
    assert_eq!((who, outcome.is_cancelled()), ("second", true));
    Ok(())
}
