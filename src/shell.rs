//! Shell seam: how the tool talks to `zfs` and `ssh`.
//!
//! Two operations cover everything the replicator needs:
//! - capture(argv): run, wait, return stdout (non-zero exit => ExecError::Failed)
//! - pipe(producer, consumer): producer.stdout -> consumer.stdin, both must succeed
//!
//! A failed pipe names the side that caused it. When the consumer exits early the
//! producer dies of SIGPIPE, so the consumer's status is the one reported.
//! Both sides' stderr is captured into the error.
//!
//! SystemShell runs real processes (blocking, no timeouts). Tests plug in a scripted fake.

use std::io::Read;
use std::process::{Child, ChildStderr, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use log::debug;

use crate::error::ExecError;

pub trait Shell {
    fn capture(&self, argv: &[String]) -> Result<String>;
    fn pipe(&self, producer: &[String], consumer: &[String]) -> Result<()>;
}

impl<S: Shell + ?Sized> Shell for &S {
    fn capture(&self, argv: &[String]) -> Result<String> {
        (**self).capture(argv)
    }

    fn pipe(&self, producer: &[String], consumer: &[String]) -> Result<()> {
        (**self).pipe(producer, consumer)
    }
}

/// Render argv as one command line (for logs, errors and the audit log).
pub fn render(argv: &[String]) -> String {
    argv.join(" ")
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemShell;

impl SystemShell {
    pub fn new() -> Self {
        Self
    }
}

fn split(argv: &[String]) -> Result<(&String, &[String])> {
    argv.split_first()
        .ok_or_else(|| anyhow::anyhow!("empty command line"))
}

fn spawn_err(program: &str, e: std::io::Error) -> ExecError {
    ExecError::Spawn {
        program: program.to_string(),
        source: e,
    }
}

impl Shell for SystemShell {
    fn capture(&self, argv: &[String]) -> Result<String> {
        let (program, args) = split(argv)?;
        debug!("shell: capture `{}`", render(argv));
        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| spawn_err(program, e))?;

        if !output.status.success() {
            return Err(ExecError::Failed {
                command: render(argv),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            }
            .into());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn pipe(&self, producer: &[String], consumer: &[String]) -> Result<()> {
        let (p_prog, p_args) = split(producer)?;
        let (c_prog, c_args) = split(consumer)?;
        debug!("shell: pipe `{} | {}`", render(producer), render(consumer));

        let mut send = Command::new(p_prog)
            .args(p_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| spawn_err(p_prog, e))?;

        let Some(send_out) = send.stdout.take() else {
            reap(&mut send);
            return Err(anyhow::anyhow!("no stdout handle for `{}`", render(producer)));
        };
        let send_err = send.stderr.take().map(collect_stderr);

        let recv = Command::new(c_prog)
            .args(c_args)
            .stdin(Stdio::from(send_out))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let mut recv = match recv {
            Ok(c) => c,
            Err(e) => {
                reap(&mut send);
                return Err(spawn_err(c_prog, e).into());
            }
        };
        let recv_err = recv.stderr.take().map(collect_stderr);

        // receive side prints nothing useful on stdout; drain so it never blocks
        if let Some(mut out) = recv.stdout.take() {
            let mut sink = Vec::new();
            if let Err(e) = out.read_to_end(&mut sink) {
                reap(&mut recv);
                reap(&mut send);
                return Err(e).with_context(|| format!("read stdout of `{}`", render(consumer)));
            }
        }

        let recv_status = recv
            .wait()
            .with_context(|| format!("wait for `{}`", render(consumer)))?;
        let send_status = send
            .wait()
            .with_context(|| format!("wait for `{}`", render(producer)))?;
        let send_err = join_stderr(send_err);
        let recv_err = join_stderr(recv_err);

        // Receiver gone first: the sender dies of SIGPIPE, the receiver is the cause.
        if !recv_status.success() && (send_status.success() || broken_pipe(&send_status)) {
            return Err(failed(consumer, &recv_status, recv_err));
        }
        if !send_status.success() {
            return Err(failed(producer, &send_status, send_err));
        }
        for (argv, text) in [(producer, &send_err), (consumer, &recv_err)] {
            if !text.trim().is_empty() {
                debug!("shell: `{}` stderr: {}", render(argv), text.trim());
            }
        }
        Ok(())
    }
}

fn failed(argv: &[String], status: &ExitStatus, stderr: String) -> anyhow::Error {
    ExecError::Failed {
        command: render(argv),
        code: status.code(),
        stderr,
    }
    .into()
}

fn reap(child: &mut Child) {
    let _ = child.kill();
    let _ = child.wait();
}

fn collect_stderr(mut err: ChildStderr) -> JoinHandle<std::io::Result<String>> {
    thread::spawn(move || -> std::io::Result<String> {
        let mut buf = Vec::new();
        err.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    })
}

fn join_stderr(handle: Option<JoinHandle<std::io::Result<String>>>) -> String {
    match handle.map(JoinHandle::join) {
        Some(Ok(Ok(text))) => text,
        Some(Ok(Err(e))) => {
            debug!("shell: stderr unreadable: {}", e);
            String::new()
        }
        Some(Err(_)) | None => String::new(),
    }
}

#[cfg(unix)]
fn broken_pipe(status: &ExitStatus) -> bool {
    use std::os::unix::process::ExitStatusExt;
    // SIGPIPE
    status.signal() == Some(13)
}

#[cfg(not(unix))]
fn broken_pipe(_status: &ExitStatus) -> bool {
    false
}
