//! External command execution.
//!
//! Everything homeframe does to the outside world (scans, display power,
//! DDC/CI queries, process control, updates) is an invocation of an OS
//! binary. [`CommandRunner`] is the single seam those invocations go
//! through: [`SystemRunner`] spawns real processes with `tokio::process`,
//! [`ScriptedRunner`] answers from canned output and records what was asked.

use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::config::DisplaySession;

// ---------------------------------------------------------------------------
// CommandSpec
// ---------------------------------------------------------------------------

/// A fully described invocation: program, arguments, extra environment,
/// optional timeout, and whether it needs `sudo`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub timeout: Option<Duration>,
    pub privileged: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            timeout: None,
            privileged: false,
        }
    }

    /// Build a spec from an argv vector. Returns `None` for an empty vector.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone()).args(args.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Attach the graphical session variables.
    pub fn session(mut self, session: &DisplaySession) -> Self {
        for (k, v) in session.env() {
            self.env.push((k.to_string(), v.to_string()));
        }
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Run through `sudo` when `privileged` is true.
    pub fn privileged(mut self, privileged: bool) -> Self {
        self.privileged = privileged;
        self
    }

    /// Program and arguments as actually executed, `sudo` included.
    pub fn argv(&self) -> Vec<String> {
        let mut argv = Vec::with_capacity(self.args.len() + 2);
        if self.privileged {
            argv.push("sudo".to_string());
        }
        argv.push(self.program.clone());
        argv.extend(self.args.iter().cloned());
        argv
    }

    /// Space-joined argv, for logs and test assertions.
    pub fn command_line(&self) -> String {
        self.argv().join(" ")
    }

    fn to_command(&self) -> tokio::process::Command {
        let argv = self.argv();
        let mut cmd = tokio::process::Command::new(&argv[0]);
        cmd.args(&argv[1..]);
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        cmd
    }
}

// ---------------------------------------------------------------------------
// CommandOutput / CommandError
// ---------------------------------------------------------------------------

/// Captured result of a finished command.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    /// Exit code; `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// A zero exit with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// A non-zero exit with the given stderr.
    pub fn exit(code: i32, stderr: impl Into<String>) -> Self {
        Self {
            code: Some(code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Turn a non-zero exit into [`CommandError::Failed`].
    pub fn check(self, program: &str) -> Result<Self, CommandError> {
        if self.success() {
            Ok(self)
        } else {
            Err(CommandError::Failed {
                program: program.to_string(),
                code: self.code,
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandError {
    #[error("failed to start {program}: {message}")]
    Spawn { program: String, message: String },

    #[error("{program} timed out after {}s", after.as_secs())]
    Timeout { program: String, after: Duration },

    #[error("{program} exited with {code:?}: {stderr}")]
    Failed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },
}

// ---------------------------------------------------------------------------
// CommandRunner trait
// ---------------------------------------------------------------------------

/// Executes external commands.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run to completion and capture output. A non-zero exit is *not* an
    /// error at this level; callers decide with [`CommandOutput::check`].
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError>;

    /// Start a detached background process and return immediately.
    async fn spawn(&self, spec: &CommandSpec) -> Result<(), CommandError>;
}

// ---------------------------------------------------------------------------
// SystemRunner
// ---------------------------------------------------------------------------

/// Runs commands as real child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        debug!(command = %spec.command_line(), "running command");
        let mut cmd = spec.to_command();
        cmd.stdin(Stdio::null()).kill_on_drop(true);

        let output = match spec.timeout {
            Some(after) => tokio::time::timeout(after, cmd.output())
                .await
                .map_err(|_| CommandError::Timeout {
                    program: spec.program.clone(),
                    after,
                })?,
            None => cmd.output().await,
        }
        .map_err(|e| CommandError::Spawn {
            program: spec.program.clone(),
            message: e.to_string(),
        })?;

        Ok(CommandOutput {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }

    async fn spawn(&self, spec: &CommandSpec) -> Result<(), CommandError> {
        debug!(command = %spec.command_line(), "spawning detached command");
        let mut cmd = spec.to_command();
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        // The child handle is dropped on purpose; tokio reaps it in the background.
        cmd.spawn().map(drop).map_err(|e| CommandError::Spawn {
            program: spec.program.clone(),
            message: e.to_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// ScriptedRunner
// ---------------------------------------------------------------------------

/// One recorded invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command_line: String,
    pub env: Vec<(String, String)>,
    pub detached: bool,
}

struct Rule {
    pattern: String,
    response: Result<CommandOutput, CommandError>,
    /// `None` = sticky, `Some(n)` = answers `n` more times.
    remaining: Option<usize>,
}

/// A command runner that answers from scripted responses.
///
/// Rules are matched in insertion order against the full command line
/// (substring match). One-shot rules are consumed when they answer. An
/// invocation that matches no rule succeeds with empty output.
#[derive(Clone, Default)]
pub struct ScriptedRunner {
    rules: Arc<Mutex<Vec<Rule>>>,
    calls: Arc<Mutex<Vec<Invocation>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every matching invocation with `output`.
    pub fn on(self, pattern: &str, output: CommandOutput) -> Self {
        self.push(pattern, Ok(output), None);
        self
    }

    /// Answer the next matching invocation with `output`.
    pub fn once(self, pattern: &str, output: CommandOutput) -> Self {
        self.push(pattern, Ok(output), Some(1));
        self
    }

    /// Fail every matching invocation with `error`.
    pub fn fail(self, pattern: &str, error: CommandError) -> Self {
        self.push(pattern, Err(error), None);
        self
    }

    /// Fail the next matching invocation with `error`.
    pub fn fail_once(self, pattern: &str, error: CommandError) -> Self {
        self.push(pattern, Err(error), Some(1));
        self
    }

    fn push(&self, pattern: &str, response: Result<CommandOutput, CommandError>, remaining: Option<usize>) {
        self.rules.lock().unwrap().push(Rule {
            pattern: pattern.to_string(),
            response,
            remaining,
        });
    }

    fn answer(&self, line: &str) -> Result<CommandOutput, CommandError> {
        let mut rules = self.rules.lock().unwrap();
        let idx = rules
            .iter()
            .position(|r| r.remaining != Some(0) && line.contains(&r.pattern));
        match idx {
            Some(i) => {
                let rule = &mut rules[i];
                if let Some(n) = rule.remaining.as_mut() {
                    *n -= 1;
                }
                rule.response.clone()
            }
            None => Ok(CommandOutput::ok("")),
        }
    }

    fn record(&self, spec: &CommandSpec, detached: bool) -> String {
        let line = spec.command_line();
        self.calls.lock().unwrap().push(Invocation {
            command_line: line.clone(),
            env: spec.env.clone(),
            detached,
        });
        line
    }

    /// Every invocation so far, in order.
    pub fn invocations(&self) -> Vec<Invocation> {
        self.calls.lock().unwrap().clone()
    }

    /// Command lines of every invocation so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.invocations()
            .into_iter()
            .map(|i| i.command_line)
            .collect()
    }

    /// How many invocations contained `pattern`.
    pub fn count(&self, pattern: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|i| i.command_line.contains(pattern))
            .count()
    }

    /// Index of the first invocation containing `pattern`.
    pub fn position(&self, pattern: &str) -> Option<usize> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .position(|i| i.command_line.contains(pattern))
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

#[async_trait]
impl CommandRunner for ScriptedRunner {
    async fn run(&self, spec: &CommandSpec) -> Result<CommandOutput, CommandError> {
        let line = self.record(spec, false);
        self.answer(&line)
    }

    async fn spawn(&self, spec: &CommandSpec) -> Result<(), CommandError> {
        let line = self.record(spec, true);
        self.answer(&line).map(drop)
    }
}

impl std::fmt::Debug for ScriptedRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let patterns: Vec<String> = self
            .rules
            .lock()
            .map(|r| r.iter().map(|rule| rule.pattern.clone()).collect())
            .unwrap_or_default();
        f.debug_struct("ScriptedRunner")
            .field("patterns", &patterns)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn privileged_commands_are_prefixed_with_sudo() {
        let spec = CommandSpec::new("nmap")
            .args(["-sn", "192.168.1.0/24"])
            .privileged(true);
        assert_eq!(spec.command_line(), "sudo nmap -sn 192.168.1.0/24");
        assert_eq!(CommandSpec::new("pgrep").arg("-f").command_line(), "pgrep -f");
    }

    #[test]
    fn session_adds_display_env() {
        let spec = CommandSpec::new("wlr-randr").session(&DisplaySession::default());
        assert!(spec.env.contains(&("DISPLAY".to_string(), ":0".to_string())));
        assert!(spec
            .env
            .contains(&("XDG_RUNTIME_DIR".to_string(), "/run/user/1000".to_string())));
    }

    #[test]
    fn from_argv_rejects_empty() {
        assert!(CommandSpec::from_argv(&[]).is_none());
        let spec = CommandSpec::from_argv(&["apt-get".into(), "update".into()]).unwrap();
        assert_eq!(spec.program, "apt-get");
        assert_eq!(spec.args, vec!["update"]);
    }

    #[test]
    fn check_maps_non_zero_exit() {
        let err = CommandOutput::exit(100, "E: lock held\n")
            .check("apt-get")
            .unwrap_err();
        assert_eq!(
            err,
            CommandError::Failed {
                program: "apt-get".into(),
                code: Some(100),
                stderr: "E: lock held".into(),
            }
        );
        assert!(CommandOutput::ok("").check("true").is_ok());
    }

    #[tokio::test]
    async fn scripted_runner_consumes_once_rules_then_falls_through() {
        let runner = ScriptedRunner::new()
            .once("pgrep", CommandOutput::exit(1, ""))
            .on("pgrep", CommandOutput::ok("1234\n"));
        let spec = CommandSpec::new("pgrep").args(["-f", "picframe"]);

        assert_eq!(runner.run(&spec).await.unwrap().code, Some(1));
        assert_eq!(runner.run(&spec).await.unwrap().stdout, "1234\n");
        assert_eq!(runner.run(&spec).await.unwrap().stdout, "1234\n");
        assert_eq!(runner.count("pgrep -f picframe"), 3);
    }

    #[tokio::test]
    async fn scripted_runner_defaults_to_success_and_records_spawns() {
        let runner = ScriptedRunner::new();
        runner
            .spawn(&CommandSpec::new("/home/pi/start_picframe.sh"))
            .await
            .unwrap();
        let calls = runner.invocations();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].detached);
    }

    #[tokio::test]
    async fn system_runner_captures_output() {
        let out = SystemRunner::new()
            .run(&CommandSpec::new("sh").args(["-c", "echo hello; exit 3"]))
            .await
            .unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.code, Some(3));
    }

    #[tokio::test]
    async fn system_runner_times_out() {
        let err = SystemRunner::new()
            .run(&CommandSpec::new("sleep").arg("5").timeout(Duration::from_millis(50)))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Timeout { .. }));
    }

    #[tokio::test]
    async fn system_runner_reports_missing_binary() {
        let err = SystemRunner::new()
            .run(&CommandSpec::new("definitely-not-a-real-binary-hf"))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Spawn { .. }));
    }
}
