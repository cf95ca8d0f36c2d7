//! Process discovery.
//!
//! Finds the remote desktop client among running processes by name using
//! the `sysinfo` crate.

use sysinfo::{ProcessesToUpdate, System};
use tracing::{debug, warn};

use crate::session::ProcessHandle;

/// Finds running processes by name.
///
/// # Example
///
/// ```
/// use session_keepalive::ProcessFinder;
///
/// let mut finder = ProcessFinder::new();
/// match finder.find_process("mstsc.exe") {
///     Some(process) => println!("Found {} with PID {}", process.name, process.pid),
///     None => println!("Remote desktop client is not running"),
/// }
/// ```
pub struct ProcessFinder {
    system: System,
}

impl Default for ProcessFinder {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessFinder {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }

    /// Returns the lowest-PID process whose name matches `process_name`.
    pub fn find_process(&mut self, process_name: &str) -> Option<ProcessHandle> {
        self.system.refresh_processes(ProcessesToUpdate::All, true);

        let mut matches: Vec<ProcessHandle> = self
            .system
            .processes()
            .iter()
            .filter_map(|(pid, process)| {
                let name = process.name().to_string_lossy();
                name_matches(&name, process_name).then(|| ProcessHandle::new(pid.as_u32(), name))
            })
            .collect();

        matches.sort_by_key(|process| process.pid);
        if matches.len() > 1 {
            warn!(
                name = process_name,
                count = matches.len(),
                "several matching processes, using the lowest PID"
            );
        }

        let found = matches.into_iter().next();
        debug!(name = process_name, found = ?found, "process lookup");
        found
    }
}

/// Case-insensitive name equality; a missing `.exe` on either side is tolerated.
pub fn name_matches(candidate: &str, wanted: &str) -> bool {
    fn stem(name: &str) -> String {
        let lower = name.trim().to_lowercase();
        match lower.strip_suffix(".exe") {
            Some(stem) => stem.to_string(),
            None => lower,
        }
    }

    let wanted = stem(wanted);
    !wanted.is_empty() && stem(candidate) == wanted
}
