use std::time::{Duration, Instant};

use sysinfo::{ProcessExt, System, SystemExt};

/// Resident set size of this process in KB, or 0 when unavailable.
pub fn get_rss_memory() -> u64 {
    let Ok(pid) = sysinfo::get_current_pid() else {
        return 0;
    };
    let mut system = System::new();
    if !system.refresh_process(pid) {
        return 0;
    }
    system
        .process(pid)
        .map(|process| process.memory() / 1024)
        .unwrap_or(0)
}

/// Wall time and memory growth across one import run.
pub struct RunProfile {
    start: Instant,
    initial_memory: u64,
}

impl RunProfile {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            initial_memory: get_rss_memory(),
        }
    }

    /// Elapsed time and memory growth in KB.
    pub fn finish(&self) -> (Duration, u64) {
        let final_memory = get_rss_memory();
        (
            self.start.elapsed(),
            final_memory.saturating_sub(self.initial_memory),
        )
    }
}
