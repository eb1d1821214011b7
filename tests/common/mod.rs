// Общие хелперы интеграционных тестов: уникальные каталоги + скриптуемый Shell.
#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Result;

use snapmirror::error::ExecError;
use snapmirror::shell::{render, Shell};
use snapmirror::ReplicationConfig;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub fn unique_root(prefix: &str) -> PathBuf {
    let pid = std::process::id();
    let t = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    let base = std::env::temp_dir();
    let root = base.join(format!("snapmirror-test-{prefix}-{pid}-{t}-{id}"));
    std::fs::create_dir_all(&root).expect("create test root");
    root
}

/// Config for pools tank -> pool2 on host "bk", audit log inside `root`.
pub fn test_config(root: &Path) -> ReplicationConfig {
    ReplicationConfig::new("tank", "pool2", "bk")
        .with_weekly_tag("weekly")
        .with_commands_log(root.join("commands_output.txt"))
}

pub const PRIMARY_LIST: &str = "zfs list";
pub const PRIMARY_SNAPS: &str = "zfs list -t snapshot";
pub const BACKUP_SNAPS: &str = "ssh bk zfs list -t snapshot";

/// `zfs list` text: header, root row, then the given volumes.
pub fn volume_listing(root: &str, volumes: &[&str]) -> String {
    let mut s = String::from("NAME      USED  AVAIL  REFER  MOUNTPOINT\n");
    s.push_str(&format!("{root}      1.0T  2.0T   96K    /{root}\n"));
    for v in volumes {
        s.push_str(&format!("{v}      10G   2.0T   10G    /{v}\n"));
    }
    s
}

/// `zfs list -t snapshot` text for the given snapshot names (listing order kept).
pub fn snapshot_listing(names: &[&str]) -> String {
    let mut s = String::from("NAME      USED  AVAIL  REFER  MOUNTPOINT\n");
    for n in names {
        s.push_str(&format!("{n}      0B    -      10G    -\n"));
    }
    s
}

/// Executable `#!/bin/sh` script in `dir`, for runs through the real SystemShell.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}")).expect("write script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod script");
    path
}

/// Scripted shell: canned stdout / exit codes per rendered command line, records every call.
#[derive(Default)]
pub struct FakeShell {
    captures: HashMap<String, std::result::Result<String, i32>>,
    failing_sends: HashMap<String, i32>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output(mut self, cmd: &str, stdout: String) -> Self {
        self.captures.insert(cmd.to_string(), Ok(stdout));
        self
    }

    pub fn with_failure(mut self, cmd: &str, code: i32) -> Self {
        self.captures.insert(cmd.to_string(), Err(code));
        self
    }

    /// Make the pipe whose send side renders as `send` fail with `code`.
    pub fn with_failing_send(mut self, send: &str, code: i32) -> Self {
        self.failing_sends.insert(send.to_string(), code);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn pipes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.contains(" | "))
            .collect()
    }
}

impl Shell for FakeShell {
    fn capture(&self, argv: &[String]) -> Result<String> {
        let line = render(argv);
        self.calls.borrow_mut().push(line.clone());
        match self.captures.get(&line) {
            Some(Ok(out)) => Ok(out.clone()),
            Some(Err(code)) => Err(ExecError::Failed {
                command: line,
                code: Some(*code),
                stderr: "ssh: connect to host bk port 22: Connection refused".into(),
            }
            .into()),
            None => Err(ExecError::Failed {
                command: line,
                code: Some(127),
                stderr: "not scripted".into(),
            }
            .into()),
        }
    }

    fn pipe(&self, producer: &[String], consumer: &[String]) -> Result<()> {
        let send = render(producer);
        self.calls
            .borrow_mut()
            .push(format!("{} | {}", send, render(consumer)));
        if let Some(code) = self.failing_sends.get(&send) {
            return Err(ExecError::Failed {
                command: send,
                code: Some(*code),
                stderr: String::new(),
            }
            .into());
        }
        Ok(())
    }
}
