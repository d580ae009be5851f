//! Per-cycle busy time and memory accounting.

use parking_lot::Mutex;
use serde::Serialize;
use std::time::Duration;
use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};

/// Source of a process-wide "bytes in use" reading.
pub trait MemoryProbe: Send + Sync {
    fn used_bytes(&self) -> u64;
}

/// Resident memory of the current process, read through `sysinfo`.
pub struct ProcessMemory {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl ProcessMemory {
    pub fn new() -> Self {
        let pid = sysinfo::get_current_pid().ok();
        if pid.is_none() {
            tracing::warn!("Cannot determine own pid, memory accounting disabled");
        }
        Self {
            system: Mutex::new(System::new()),
            pid,
        }
    }
}

impl Default for ProcessMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProbe for ProcessMemory {
    fn used_bytes(&self) -> u64 {
        let Some(pid) = self.pid else {
            return 0;
        };
        let mut system = self.system.lock();
        system.refresh_processes_specifics(
            ProcessesToUpdate::Some(&[pid]),
            false,
            ProcessRefreshKind::nothing().with_memory(),
        );
        system.process(pid).map(|p| p.memory()).unwrap_or(0)
    }
}

/// Probe that always reads zero.
pub struct NoMemoryProbe;

impl MemoryProbe for NoMemoryProbe {
    fn used_bytes(&self) -> u64 {
        0
    }
}

/// Running totals over all busy cycles of a stage.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CycleAccounting {
    pub busy_cycles: u64,
    pub busy_time: Duration,
    pub memory_use: u64,
}

impl CycleAccounting {
    /// Adds one cycle.
    ///
    /// A reading that went down means memory was reclaimed while the job ran;
    /// the real cost is unknown, so the cycle is charged the running average of
    /// the previous cycles instead of a negative delta.
    pub fn record(&mut self, busy: Duration, mem_before: u64, mem_after: u64) {
        let delta = if mem_after >= mem_before {
            mem_after - mem_before
        } else if self.busy_cycles > 0 {
            self.memory_use / self.busy_cycles
        } else {
            0
        };
        self.memory_use += delta;
        self.busy_cycles += 1;
        self.busy_time += busy;
    }

    pub fn average_memory(&self) -> u64 {
        if self.busy_cycles == 0 {
            0
        } else {
            self.memory_use / self.busy_cycles
        }
    }

    pub fn average_busy_time(&self) -> Duration {
        if self.busy_cycles == 0 {
            Duration::ZERO
        } else {
            self.busy_time / self.busy_cycles as u32
        }
    }
}
