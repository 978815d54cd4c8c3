// Process liveness checks
//
// The run record only ever asks one question of the operating system:
// is this pid still alive? Launching and reaping processes happens elsewhere.

use tracing::debug;

/// Answers "is this process id currently alive?"
///
/// Implementations must never fail: unknown ids and id 0 report `false`.
pub trait ProcessSupervisor: Send + Sync {
    fn pid_exists(&self, pid: u32) -> bool;
}

/// Any `Fn(u32) -> bool` is a supervisor
impl<F> ProcessSupervisor for F
where
    F: Fn(u32) -> bool + Send + Sync,
{
    fn pid_exists(&self, pid: u32) -> bool {
        self(pid)
    }
}

/// Supervisor backed by the host operating system
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemSupervisor;

impl SystemSupervisor {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessSupervisor for SystemSupervisor {
    fn pid_exists(&self, pid: u32) -> bool {
        // 0 is the "never launched" sentinel, and kill(0, ..) would address
        // our own process group.
        if pid == 0 || pid > i32::MAX as u32 {
            return false;
        }

        let alive = process_exists(pid);
        debug!(pid = pid, alive = alive, "Checked process liveness");
        alive
    }
}

/// Check if a process with the given PID exists
///
/// Uses platform-specific methods:
/// - Unix: kill(pid, 0) to check existence without sending signal
/// - Windows: sysinfo crate to look the process up
#[cfg(target_family = "unix")]
fn process_exists(pid: u32) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    // EPERM means the process exists but belongs to another user
    match kill(Pid::from_raw(pid as i32), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(target_family = "windows")]
fn process_exists(pid: u32) -> bool {
    use sysinfo::{Pid, ProcessesToUpdate, System};

    let pid = Pid::from_u32(pid);
    let mut system = System::new();
    system.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    system.process(pid).is_some()
}
