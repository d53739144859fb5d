//! The presence poller.
//!
//! One cycle, in order:
//! 1. daily reset (once per date, at the reset hour): back to Auto mode and
//!    clear the reboot flag;
//! 2. manual override set: do nothing, wait the manual pause;
//! 3. outside active hours: stop the slideshow, power the display off if
//!    this device is the monitor's active input, wait the sleeping interval;
//! 4. phone present: make sure the slideshow is running and the display
//!    is on, wait the home interval;
//! 5. phone absent: wait the confirm delay and scan again. Still absent:
//!    stop the slideshow, power off, and once per day update and reboot.
//!
//! Every wait ends early when the mode changes, so a dashboard action is
//! picked up immediately. A change that lands during a presence scan
//! abandons the cycle before the display is touched.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use hf_core::config::{MonitorConfig, ScheduleConfig};
use hf_core::devices::Devices;
use hf_core::mode::{Mode, ModeHandle};
use hf_core::monitor::is_active_source;
use hf_core::presence::PresenceReport;
use hf_core::schedule::{ActiveWindow, DailyReset};
use hf_core::status::{CycleOutcome, SharedStatus};

use crate::shutdown::ShutdownSignal;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Source of local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

/// The system's local time zone.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalClock;

impl Clock for LocalClock {
    fn now(&self) -> NaiveDateTime {
        chrono::Local::now().naive_local()
    }
}

/// A clock that always reports the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Cycle results
// ---------------------------------------------------------------------------

/// What one cycle did and how long to wait before the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cycle {
    pub outcome: CycleOutcome,
    pub presence: Option<PresenceReport>,
    pub wait: Duration,
}

impl Cycle {
    fn new(outcome: CycleOutcome, wait: Duration) -> Self {
        Self {
            outcome,
            presence: None,
            wait,
        }
    }

    fn with_presence(mut self, presence: PresenceReport) -> Self {
        self.presence = Some(presence);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pause {
    Elapsed,
    ModeChanged,
}

// ---------------------------------------------------------------------------
// Poller
// ---------------------------------------------------------------------------

pub struct Poller {
    devices: Devices,
    mode: ModeHandle,
    mode_rx: watch::Receiver<Mode>,
    status: SharedStatus,
    schedule: ScheduleConfig,
    monitor: MonitorConfig,
    window: ActiveWindow,
    reset: DailyReset,
    clock: Arc<dyn Clock>,
}

impl Poller {
    pub fn new(
        devices: Devices,
        mode: ModeHandle,
        status: SharedStatus,
        schedule: ScheduleConfig,
        monitor: MonitorConfig,
    ) -> Self {
        let mode_rx = mode.subscribe();
        Self {
            devices,
            mode,
            mode_rx,
            status,
            window: ActiveWindow::from_config(&schedule),
            reset: DailyReset::new(schedule.daily_reset_hour),
            schedule,
            monitor,
            clock: Arc::new(LocalClock),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Run cycles until shutdown, after the configured startup delay.
    pub async fn run(mut self, shutdown: ShutdownSignal) {
        let mut shutdown_rx = shutdown.subscribe();
        if shutdown.is_shutting_down() {
            return;
        }

        let delay = self.schedule.startup_delay();
        info!(delay_secs = delay.as_secs(), "poller waiting for the desktop session");
        tokio::select! {
            _ = shutdown_rx.recv() => {
                info!("poller stopped before first cycle");
                return;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        info!("poller started");
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("poller shutting down");
                    break;
                }
                _ = self.step() => {}
            }
        }
    }

    /// One cycle plus the wait that follows it.
    async fn step(&mut self) {
        let now = self.clock.now();
        let cycle = self.run_cycle(now).await;
        info!(
            outcome = cycle.outcome.as_str(),
            wait_secs = cycle.wait.as_secs(),
            "cycle finished"
        );
        self.status
            .write()
            .await
            .record(cycle.outcome, cycle.presence);
        self.pause(cycle.wait).await;
    }

    /// Execute one cycle at wall-clock time `now`.
    ///
    /// Only the confirmation wait of the absent branch happens inside the
    /// cycle; the wait after it is returned in [`Cycle::wait`].
    pub async fn run_cycle(&mut self, now: NaiveDateTime) -> Cycle {
        if self.reset.check(now) {
            self.daily_reset(now.date());
        }

        // The flag is read fresh below; only later changes count as mid-cycle.
        self.mode_rx.borrow_and_update();
        if self.mode.flags().is_manual_override() {
            debug!("manual override active, skipping cycle");
            return Cycle::new(CycleOutcome::ManualOverride, self.schedule.manual_pause());
        }

        if !self.window.contains(now) {
            info!(hour = %now.format("%H:%M"), "outside active hours");
            self.devices.slideshow.stop().await;
            self.power_off_if_active().await;
            return Cycle::new(CycleOutcome::Sleeping, self.schedule.sleeping_interval());
        }

        let presence = self.devices.presence.check().await;
        if self.take_mode_change() {
            return Cycle::new(CycleOutcome::Interrupted, Duration::ZERO).with_presence(presence);
        }
        if presence.is_present() {
            self.show().await;
            return Cycle::new(CycleOutcome::Home, self.schedule.home_interval()).with_presence(presence);
        }

        let confirm = self.schedule.confirm_delay();
        info!(confirm_secs = confirm.as_secs(), "phone not found, waiting to confirm");
        if self.pause(confirm).await == Pause::ModeChanged {
            info!("mode changed while confirming absence");
            return Cycle::new(CycleOutcome::Interrupted, Duration::ZERO).with_presence(presence);
        }

        let presence = self.devices.presence.check().await;
        if presence.is_present() {
            info!("phone is back");
            return Cycle::new(CycleOutcome::Redetected, Duration::ZERO).with_presence(presence);
        }

        if self.take_mode_change() {
            return Cycle::new(CycleOutcome::Interrupted, Duration::ZERO).with_presence(presence);
        }

        info!("absence confirmed, turning the frame off");
        self.devices.slideshow.stop().await;
        self.power_off_if_active().await;
        let outcome = self.maintenance().await;
        Cycle::new(outcome, self.schedule.away_interval()).with_presence(presence)
    }

    fn daily_reset(&mut self, today: NaiveDate) {
        info!(%today, "daily reset");
        if let Err(e) = self.mode.set(Mode::Auto, today) {
            error!(error = %e, "could not clear manual override");
        }
        if let Err(e) = self.mode.flags().clear_reboot_done() {
            error!(error = %e, "could not clear reboot flag");
        }
    }

    /// Slideshow running, then display on.
    async fn show(&self) {
        let slideshow = &self.devices.slideshow;
        if !slideshow.is_running().await {
            info!("starting slideshow");
            slideshow.start().await;
            tokio::time::sleep(slideshow.config().warmup()).await;
        }
        self.devices.display.on().await;
    }

    async fn power_off_if_active(&self) {
        let active = !self.monitor.power_off_requires_active_source
            || is_active_source(self.devices.monitor.as_ref(), self.monitor.expected_input).await;
        if active {
            self.devices.display.off().await;
        } else {
            info!("monitor is showing another input, leaving its power alone");
        }
    }

    /// Once-a-day update and reboot while nobody is home.
    async fn maintenance(&self) -> CycleOutcome {
        let flags = self.mode.flags();
        if flags.is_reboot_done() {
            debug!("maintenance already done today");
            return CycleOutcome::Away;
        }
        if !self.devices.system.auto_update() {
            return CycleOutcome::Away;
        }
        if let Err(e) = flags.set_reboot_done() {
            // Without the flag the reboot would repeat every cycle.
            error!(error = %e, "could not write reboot flag, skipping maintenance");
            return CycleOutcome::Away;
        }

        info!("running system update");
        if let Err(e) = self.devices.system.update().await {
            error!(error = %e, "system update failed, not rebooting");
            return CycleOutcome::UpdateFailed;
        }
        if let Err(e) = self.devices.system.reboot().await {
            error!(error = %e, "reboot command failed");
        }
        CycleOutcome::Rebooting
    }

    /// True when the mode changed while a scan was running. The change is
    /// consumed so the next cycle starts from the flag on disk.
    fn take_mode_change(&mut self) -> bool {
        if !matches!(self.mode_rx.has_changed(), Ok(true)) {
            return false;
        }
        let mode = *self.mode_rx.borrow_and_update();
        info!(%mode, "mode changed during presence scan, abandoning cycle");
        true
    }

    /// Sleep for `duration` unless the mode changes first.
    async fn pause(&mut self, duration: Duration) -> Pause {
        if duration.is_zero() {
            return Pause::Elapsed;
        }
        tokio::select! {
            _ = tokio::time::sleep(duration) => Pause::Elapsed,
            changed = self.mode_rx.changed() => match changed {
                Ok(()) => {
                    let mode = *self.mode_rx.borrow_and_update();
                    info!(%mode, "mode changed, waking poller");
                    Pause::ModeChanged
                }
                Err(_) => {
                    warn!("mode channel closed");
                    tokio::time::sleep(duration).await;
                    Pause::Elapsed
                }
            },
        }
    }
}
