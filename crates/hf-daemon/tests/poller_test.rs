use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use tempfile::TempDir;
use tokio::sync::RwLock;
use tokio::time::Instant;

use hf_core::command::{CommandError, CommandOutput, CommandRunner, CommandSpec, ScriptedRunner};
use hf_core::config::Config;
use hf_core::devices::Devices;
use hf_core::flags::FlagStore;
use hf_core::mode::{Mode, ModeHandle};
use hf_core::status::{CycleOutcome, PollerStatus, SharedStatus};
use hf_daemon::poller::{FixedClock, Poller};
use hf_daemon::shutdown::ShutdownSignal;

const WIFI: &str = "9C:73:B1:F5:40:1B";
const BT: &str = "9C:73:B1:F5:40:1A";

const NMAP_HIT: &str = "Nmap scan report for 192.168.1.42\nHost is up.\nMAC Address: 9C:73:B1:F5:40:1B (Apple)\n";
const NMAP_MISS: &str = "Nmap scan report for 192.168.1.10\nHost is up.\nMAC Address: AA:BB:CC:DD:EE:FF (Unknown)\n";
const INPUT_THIS_PI: &str = "VCP code 0x60 (Input Source): HDMI-1 (sl=0x11)\n";
const INPUT_OTHER: &str = "VCP code 0x60 (Input Source): DisplayPort-1 (sl=0x0f)\n";

struct Harness {
    poller: Poller,
    runner: ScriptedRunner,
    mode: ModeHandle,
    status: SharedStatus,
    _dir: TempDir,
}

impl Harness {
    fn new(runner: ScriptedRunner) -> Self {
        Self::wrapped(runner, |_, runner| -> Arc<dyn CommandRunner> { Arc::new(runner) })
    }

    /// Harness whose devices go through `wrap(mode, runner)`.
    fn wrapped(
        runner: ScriptedRunner,
        wrap: impl FnOnce(&ModeHandle, ScriptedRunner) -> Arc<dyn CommandRunner>,
    ) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.flags.dir = dir.path().to_path_buf();
        config.presence.wifi_mac = WIFI.to_string();
        config.presence.bluetooth_mac = BT.to_string();
        config.slideshow.start_command = PathBuf::from("/home/pi/start_picframe.sh");

        let mode = ModeHandle::new(FlagStore::new(&config.flags));
        let devices = Devices::from_config(&config, wrap(&mode, runner.clone()));
        let status: SharedStatus = Arc::new(RwLock::new(PollerStatus::default()));
        let poller = Poller::new(
            devices,
            mode.clone(),
            status.clone(),
            config.schedule.clone(),
            config.monitor.clone(),
        );
        Self {
            poller,
            runner,
            mode,
            status,
            _dir: dir,
        }
    }

    fn flags(&self) -> &FlagStore {
        self.mode.flags()
    }
}

fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 15).unwrap()
}

fn at(hour: u32, minute: u32) -> NaiveDateTime {
    day().and_hms_opt(hour, minute, 0).unwrap()
}

fn absent() -> ScriptedRunner {
    ScriptedRunner::new()
        .on("nmap", CommandOutput::ok(NMAP_MISS))
        .on("l2ping", CommandOutput::exit(1, "Can't connect: Host is down"))
}

// ---------------------------------------------------------------------------
// Present
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn present_starts_slideshow_then_waits_before_display_on() {
    let mut h = Harness::new(
        ScriptedRunner::new()
            .on("nmap", CommandOutput::ok(NMAP_HIT))
            .on("pgrep", CommandOutput::exit(1, "")),
    );

    let start = Instant::now();
    let cycle = h.poller.run_cycle(at(10, 0)).await;

    assert_eq!(cycle.outcome, CycleOutcome::Home);
    assert_eq!(cycle.wait, Duration::from_secs(300));
    assert!(cycle.presence.unwrap().wifi);
    assert!(start.elapsed() >= Duration::from_secs(20), "warmup before display on");
    assert_eq!(
        h.runner.calls(),
        vec![
            "sudo nmap -sn 192.168.1.0/24",
            "pgrep -f picframe",
            "/home/pi/start_picframe.sh",
            "wlr-randr --output HDMI-A-1 --on --mode 1920x1080",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn present_with_running_slideshow_only_powers_display() {
    let mut h = Harness::new(
        ScriptedRunner::new()
            .on("nmap", CommandOutput::ok(NMAP_MISS))
            .on("l2ping", CommandOutput::ok("1 sent, 1 received, 0% loss\n"))
            .on("pgrep", CommandOutput::ok("812\n")),
    );

    let start = Instant::now();
    let cycle = h.poller.run_cycle(at(10, 0)).await;

    assert_eq!(cycle.outcome, CycleOutcome::Home);
    assert!(cycle.presence.unwrap().bluetooth);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(h.runner.count("start_picframe.sh"), 0);
    assert_eq!(h.runner.count("--on"), 1);
}

// ---------------------------------------------------------------------------
// Absent
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn absent_twice_turns_off_and_updates_once() {
    let mut h = Harness::new(absent().on("getvcp 60", CommandOutput::ok(INPUT_THIS_PI)));

    let l2ping = format!("sudo l2ping -c 1 {BT}");
    let start = Instant::now();
    let cycle = h.poller.run_cycle(at(10, 0)).await;

    assert!(start.elapsed() >= Duration::from_secs(300), "absence is confirmed after a wait");
    assert_eq!(cycle.outcome, CycleOutcome::Rebooting);
    assert_eq!(cycle.wait, Duration::from_secs(60));
    assert!(h.flags().is_reboot_done());
    assert_eq!(
        h.runner.calls(),
        vec![
            "sudo nmap -sn 192.168.1.0/24",
            l2ping.as_str(),
            "sudo nmap -sn 192.168.1.0/24",
            l2ping.as_str(),
            "pkill -f picframe",
            "ddcutil getvcp 60",
            "wlr-randr --output HDMI-A-1 --off",
            "sudo apt-get update",
            "sudo apt-get upgrade -y",
            "sudo reboot",
        ]
    );

    // Still away on the next cycle: the flag blocks a second attempt.
    h.runner.clear_calls();
    let cycle = h.poller.run_cycle(at(10, 6)).await;
    assert_eq!(cycle.outcome, CycleOutcome::Away);
    assert_eq!(h.runner.count("apt-get"), 0);
    assert_eq!(h.runner.count("reboot"), 0);
}

#[tokio::test(start_paused = true)]
async fn redetected_during_confirmation_continues_immediately() {
    let mut h = Harness::new(
        ScriptedRunner::new()
            .once("nmap", CommandOutput::ok(NMAP_MISS))
            .on("nmap", CommandOutput::ok(NMAP_HIT))
            .on("l2ping", CommandOutput::exit(1, "")),
    );

    let cycle = h.poller.run_cycle(at(12, 0)).await;

    assert_eq!(cycle.outcome, CycleOutcome::Redetected);
    assert_eq!(cycle.wait, Duration::ZERO);
    assert_eq!(h.runner.count("nmap"), 2);
    assert_eq!(h.runner.count("pkill"), 0);
    assert_eq!(h.runner.count("--off"), 0);
}

#[tokio::test(start_paused = true)]
async fn failed_update_skips_reboot_but_keeps_flag() {
    let mut h = Harness::new(absent().on("apt-get update", CommandOutput::exit(100, "E: Could not get lock")));

    let cycle = h.poller.run_cycle(at(14, 0)).await;

    assert_eq!(cycle.outcome, CycleOutcome::UpdateFailed);
    assert_eq!(cycle.wait, Duration::from_secs(60));
    assert!(h.flags().is_reboot_done());
    assert_eq!(h.runner.count("upgrade"), 0);
    assert_eq!(h.runner.count("reboot"), 0);
}

#[tokio::test(start_paused = true)]
async fn mode_change_during_confirmation_aborts_cycle() {
    let mut h = Harness::new(absent());
    let mode = h.mode.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(30)).await;
        mode.set(Mode::Manual, day()).unwrap();
    });

    let start = Instant::now();
    let cycle = h.poller.run_cycle(at(10, 0)).await;

    assert_eq!(cycle.outcome, CycleOutcome::Interrupted);
    assert!(start.elapsed() < Duration::from_secs(300));
    assert_eq!(h.runner.count("nmap"), 1);
    assert_eq!(h.runner.count("pkill"), 0);

    let cycle = h.poller.run_cycle(at(10, 1)).await;
    assert_eq!(cycle.outcome, CycleOutcome::ManualOverride);
}

/// Switches to manual mode during the `nth` (0-based) command containing
/// `trigger`, the way a dashboard click lands in the middle of a slow scan.
struct ManualDuringCommand {
    inner: ScriptedRunner,
    mode: ModeHandle,
    trigger: &'static str,
    nth: usize,
    seen: AtomicUsize,
}

#[async_trait]
impl CommandRunner for ManualDuringCommand {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let out = self.inner.run(spec).await;
        if spec.command_line().contains(self.trigger)
            && self.seen.fetch_add(1, Ordering::SeqCst) == self.nth
        {
            self.mode.set(Mode::Manual, day()).unwrap();
        }
        out
    }

    async fn spawn(&self, spec: &CommandSpec) -> Result<(), CommandError> {
        self.inner.spawn(spec).await
    }
}

fn manual_during(
    trigger: &'static str,
    nth: usize,
) -> impl FnOnce(&ModeHandle, ScriptedRunner) -> Arc<dyn CommandRunner> {
    move |mode: &ModeHandle, inner: ScriptedRunner| -> Arc<dyn CommandRunner> {
        Arc::new(ManualDuringCommand {
            inner,
            mode: mode.clone(),
            trigger,
            nth,
            seen: AtomicUsize::new(0),
        })
    }
}

#[tokio::test(start_paused = true)]
async fn manual_switch_during_scan_leaves_display_alone() {
    let mut h = Harness::wrapped(
        ScriptedRunner::new()
            .on("nmap", CommandOutput::ok(NMAP_HIT))
            .on("pgrep", CommandOutput::exit(1, "")),
        manual_during("nmap", 0),
    );

    let cycle = h.poller.run_cycle(at(10, 0)).await;

    assert_eq!(cycle.outcome, CycleOutcome::Interrupted);
    assert_eq!(cycle.wait, Duration::ZERO);
    assert_eq!(h.runner.calls(), vec!["sudo nmap -sn 192.168.1.0/24"]);

    let cycle = h.poller.run_cycle(at(10, 0)).await;
    assert_eq!(cycle.outcome, CycleOutcome::ManualOverride);
    assert_eq!(h.runner.count("wlr-randr"), 0);
}

#[tokio::test(start_paused = true)]
async fn manual_switch_during_confirming_scan_skips_teardown() {
    let mut h = Harness::wrapped(absent(), manual_during("l2ping", 1));

    let cycle = h.poller.run_cycle(at(10, 0)).await;

    assert_eq!(cycle.outcome, CycleOutcome::Interrupted);
    assert_eq!(h.runner.count("nmap"), 2);
    assert_eq!(h.runner.count("pkill"), 0);
    assert_eq!(h.runner.count("--off"), 0);
    assert_eq!(h.runner.count("apt-get"), 0);
    assert!(!h.flags().is_reboot_done());
}

// ---------------------------------------------------------------------------
// Schedule and override
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn outside_active_hours_never_scans() {
    let mut h = Harness::new(ScriptedRunner::new().on("getvcp 60", CommandOutput::ok(INPUT_THIS_PI)));

    let cycle = h.poller.run_cycle(at(2, 0)).await;

    assert_eq!(cycle.outcome, CycleOutcome::Sleeping);
    assert_eq!(cycle.wait, Duration::from_secs(1800));
    assert_eq!(
        h.runner.calls(),
        vec![
            "pkill -f picframe",
            "ddcutil getvcp 60",
            "wlr-randr --output HDMI-A-1 --off",
        ]
    );

    h.runner.clear_calls();
    h.poller.run_cycle(at(23, 0)).await;
    assert_eq!(h.runner.count("nmap"), 0);
}

#[tokio::test(start_paused = true)]
async fn outside_active_hours_leaves_other_input_powered() {
    let mut h = Harness::new(ScriptedRunner::new().on("getvcp 60", CommandOutput::ok(INPUT_OTHER)));

    let cycle = h.poller.run_cycle(at(2, 0)).await;

    assert_eq!(cycle.outcome, CycleOutcome::Sleeping);
    assert_eq!(h.runner.count("pkill"), 1);
    assert_eq!(h.runner.count("wlr-randr"), 0);
}

#[tokio::test(start_paused = true)]
async fn manual_override_short_circuits_everything() {
    let mut h = Harness::new(ScriptedRunner::new());
    h.flags().set_manual_override(day()).unwrap();

    for now in [at(2, 0), at(10, 0), at(22, 59)] {
        let cycle = h.poller.run_cycle(now).await;
        assert_eq!(cycle.outcome, CycleOutcome::ManualOverride);
        assert_eq!(cycle.wait, Duration::from_secs(60));
    }
    assert!(h.runner.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn daily_reset_clears_flags_once_per_day() {
    let mut h = Harness::new(ScriptedRunner::new().on("nmap", CommandOutput::ok(NMAP_HIT)));
    h.flags().set_manual_override(day()).unwrap();
    h.flags().set_reboot_done().unwrap();

    let cycle = h.poller.run_cycle(at(8, 0)).await;
    assert_eq!(cycle.outcome, CycleOutcome::Home);
    assert!(!h.flags().is_manual_override());
    assert!(!h.flags().is_reboot_done());
    assert_eq!(h.mode.current(), Mode::Auto);

    // Override set again later the same hour survives.
    h.flags().set_manual_override(day()).unwrap();
    let cycle = h.poller.run_cycle(at(8, 30)).await;
    assert_eq!(cycle.outcome, CycleOutcome::ManualOverride);

    // Next morning the reset runs again.
    let next = day().succ_opt().unwrap().and_hms_opt(8, 2, 0).unwrap();
    let cycle = h.poller.run_cycle(next).await;
    assert_eq!(cycle.outcome, CycleOutcome::Home);
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn run_loop_wakes_on_mode_change_and_stops_on_shutdown() {
    let h = Harness::new(ScriptedRunner::new());
    h.flags().set_manual_override(day()).unwrap();
    let Harness {
        poller,
        runner,
        mode,
        status,
        _dir,
    } = h;

    let shutdown = ShutdownSignal::new();
    let handle = tokio::spawn(
        poller
            .with_clock(Arc::new(FixedClock(at(2, 0))))
            .run(shutdown.clone()),
    );

    // Startup delay is 10s; nothing happens before it.
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(status.read().await.last_outcome.is_none());

    tokio::time::sleep(Duration::from_secs(6)).await;
    assert_eq!(status.read().await.last_outcome, Some(CycleOutcome::ManualOverride));

    // Back to auto well before the 60s manual pause ends.
    mode.set(Mode::Auto, day()).unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(status.read().await.last_outcome, Some(CycleOutcome::Sleeping));
    assert_eq!(runner.count("pkill"), 1);

    shutdown.trigger();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("poller exits on shutdown")
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_during_startup_delay_skips_cycles() {
    let h = Harness::new(ScriptedRunner::new());
    let runner = h.runner.clone();
    let shutdown = ShutdownSignal::new();
    let handle = tokio::spawn(h.poller.run(shutdown.clone()));

    tokio::time::sleep(Duration::from_secs(2)).await;
    shutdown.trigger();
    handle.await.unwrap();
    assert!(runner.calls().is_empty());
}
