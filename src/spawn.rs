//! Running external programs.
//!
//! Everything the window manager and the bar modules launch goes through the
//! [Spawner] trait so that tests can script the replies.
use std::{
    io::Write,
    os::unix::process::CommandExt,
    process::{Child, Command, Stdio},
    thread,
};

use regex::Regex;

/// Launch helpers in one of several modes.
///
/// All modes other than [Spawner::spawn] block the calling thread until the
/// child exits. A program that cannot be started is logged and treated as
/// having produced nothing.
pub trait Spawner: Send + Sync {
    /// Fire and forget
    fn spawn(&self, argv: &[&str]);

    /// Run to completion and return the exit code
    fn spawn_wait(&self, argv: &[&str]) -> Option<i32>;

    /// Run to completion and return stdout
    fn capture(&self, argv: &[&str]) -> String;

    /// Feed `input` on stdin, then return stdout
    fn capture_with_stdin(&self, argv: &[&str], input: &str) -> String;

    /// Lines of stdout matching `pattern`
    fn capture_filtered(&self, argv: &[&str], pattern: &Regex) -> Vec<String> {
        self.capture(argv)
            .lines()
            .filter(|l| pattern.is_match(l))
            .map(str::to_string)
            .collect()
    }

    /// Feed `input` on stdin and parse the reply as an integer
    fn read_int_with_stdin(&self, argv: &[&str], input: &str) -> Option<i64> {
        self.capture_with_stdin(argv, input).trim().parse().ok()
    }

    fn count_lines(&self, argv: &[&str]) -> usize {
        self.capture(argv).lines().filter(|l| !l.trim().is_empty()).count()
    }
}

/// [Spawner] backed by [std::process::Command].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemSpawner;

impl SystemSpawner {
    fn command(argv: &[&str]) -> Option<Command> {
        let (prog, args) = argv.split_first()?;
        let mut cmd = Command::new(prog);
        cmd.args(args).stdin(Stdio::null()).stderr(Stdio::null());
        Some(cmd)
    }

    fn start(mut cmd: Command, argv: &[&str]) -> Option<Child> {
        match cmd.spawn() {
            Ok(child) => Some(child),
            Err(e) => {
                warn!("error spawning {:?}: {}", argv, e);
                None
            }
        }
    }
}

impl Spawner for SystemSpawner {
    fn spawn(&self, argv: &[&str]) {
        let mut cmd = match Self::command(argv) {
            Some(c) => c,
            None => return,
        };
        // own process group so the child outlives us and ignores our signals
        cmd.stdout(Stdio::null()).process_group(0);
        if let Some(mut child) = Self::start(cmd, argv) {
            let name = argv[0].to_string();
            let reaper = thread::Builder::new()
                .name("reaper".into())
                .spawn(move || {
                    if let Err(e) = child.wait() {
                        debug!("waiting on {} failed: {}", name, e);
                    }
                });
            if let Err(e) = reaper {
                warn!("unable to start reaper thread: {}", e);
            }
        }
    }

    fn spawn_wait(&self, argv: &[&str]) -> Option<i32> {
        let mut cmd = Self::command(argv)?;
        cmd.stdout(Stdio::null());
        let mut child = Self::start(cmd, argv)?;
        child.wait().ok()?.code()
    }

    fn capture(&self, argv: &[&str]) -> String {
        let mut cmd = match Self::command(argv) {
            Some(c) => c,
            None => return String::new(),
        };
        cmd.stdout(Stdio::piped());
        Self::start(cmd, argv)
            .and_then(|child| child.wait_with_output().ok())
            .map(|out| String::from_utf8_lossy(&out.stdout).into_owned())
            .unwrap_or_default()
    }

    fn capture_with_stdin(&self, argv: &[&str], input: &str) -> String {
        let mut cmd = match Self::command(argv) {
            Some(c) => c,
            None => return String::new(),
        };
        cmd.stdin(Stdio::piped()).stdout(Stdio::piped());
        let mut child = match Self::start(cmd, argv) {
            Some(c) => c,
            None => return String::new(),
        };
        if let Some(mut stdin) = child.stdin.take() {
            if let Err(e) = stdin.write_all(input.as_bytes()) {
                debug!("writing to {:?} failed: {}", argv, e);
            }
            // stdin is closed on drop so the child sees EOF
        }
        child
            .wait_with_output()
            .map(|out| String::from_utf8_lossy(&out.stdout).into_owned())
            .unwrap_or_default()
    }
}
