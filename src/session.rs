//! Session lifecycle collaborator.
//!
//! The engine only needs a connected client process to search for the
//! target window. [`SessionController`] is that seam; [`ProcessSession`]
//! implements it by polling for the client, starting it from a connection
//! file when one is configured, and waiting until it has opened its main
//! window.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{KeepAliveError, Result};
use crate::injector::SessionKeyboard;
use crate::platform::WindowTree;
use crate::process_finder::ProcessFinder;

/// A running remote desktop client process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessHandle {
    pub pid: u32,
    pub name: String,
}

impl ProcessHandle {
    pub fn new(pid: u32, name: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.into(),
        }
    }
}

pub trait SessionController {
    /// Finds the client process that hosts the session.
    fn resolve_target_process(&mut self) -> impl Future<Output = Result<ProcessHandle>> + Send;

    /// Resolves once the session is connected and its windows exist.
    fn wait_until_ready(
        &mut self,
        process: &ProcessHandle,
    ) -> impl Future<Output = Result<()>> + Send;

    /// Keyboard channel of the connected session, when the client exposes
    /// one. `None` means input goes to the session window instead.
    fn session_keyboard(&self) -> Option<Arc<dyn SessionKeyboard>>;

    /// Releases anything held for the session. Safe to call more than once.
    fn release(&mut self);
}

pub struct ProcessSession {
    finder: ProcessFinder,
    tree: Arc<dyn WindowTree>,
    process_name: String,
    max_retries: u32,
    retry_delay: Duration,
    connection_file: Option<PathBuf>,
    keyboard: Option<Arc<dyn SessionKeyboard>>,
    launched: bool,
    active: Option<ProcessHandle>,
}

impl ProcessSession {
    pub fn new(
        tree: Arc<dyn WindowTree>,
        process_name: impl Into<String>,
        max_retries: u32,
        retry_delay: Duration,
    ) -> Self {
        Self {
            finder: ProcessFinder::new(),
            tree,
            process_name: process_name.into(),
            max_retries: max_retries.max(1),
            retry_delay,
            connection_file: None,
            keyboard: None,
            launched: false,
            active: None,
        }
    }

    /// Starts the client with `path` if it is not running on the first lookup.
    pub fn with_connection_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.connection_file = Some(path.into());
        self
    }

    /// Delivers input through `keyboard` instead of the session window.
    pub fn with_keyboard(mut self, keyboard: Arc<dyn SessionKeyboard>) -> Self {
        self.keyboard = Some(keyboard);
        self
    }

    pub fn active_process(&self) -> Option<&ProcessHandle> {
        self.active.as_ref()
    }

    /// Launches the client once with the connection file. The child is left
    /// running on its own; the process lookup picks it up.
    fn launch_client(&mut self) -> Result<()> {
        let Some(file) = &self.connection_file else {
            return Ok(());
        };
        if self.launched {
            return Ok(());
        }
        self.launched = true;

        let child = tokio::process::Command::new(&self.process_name)
            .arg(file)
            .spawn()
            .map_err(|e| KeepAliveError::client_launch(&self.process_name, e.to_string()))?;
        info!(
            program = %self.process_name,
            pid = child.id(),
            file = %file.display(),
            "client started from connection file"
        );
        Ok(())
    }
}

impl SessionController for ProcessSession {
    async fn resolve_target_process(&mut self) -> Result<ProcessHandle> {
        for attempt in 1..=self.max_retries {
            if let Some(process) = self.finder.find_process(&self.process_name) {
                info!(pid = process.pid, name = %process.name, "client process found");
                self.active = Some(process.clone());
                return Ok(process);
            }
            debug!(attempt, max = self.max_retries, name = %self.process_name, "client process not running yet");
            self.launch_client()?;
            if attempt < self.max_retries {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        Err(KeepAliveError::process_not_found(
            &self.process_name,
            self.max_retries,
        ))
    }

    async fn wait_until_ready(&mut self, process: &ProcessHandle) -> Result<()> {
        for attempt in 1..=self.max_retries {
            if let Some(window) = self.tree.main_window(process.pid) {
                info!(pid = process.pid, main_window = %window, "session ready");
                return Ok(());
            }
            debug!(attempt, pid = process.pid, "waiting for the session window");
            if attempt < self.max_retries {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        Err(KeepAliveError::session_not_ready(
            &process.name,
            self.max_retries,
        ))
    }

    fn session_keyboard(&self) -> Option<Arc<dyn SessionKeyboard>> {
        self.keyboard.clone()
    }

    fn release(&mut self) {
        if let Some(process) = self.active.take() {
            info!(pid = process.pid, "session released");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::mock::{MockSessionKeyboard, MockWindowTree};
    use crate::platform::WindowHandle;

    fn session(tree: MockWindowTree) -> ProcessSession {
        ProcessSession::new(Arc::new(tree), "mstsc.exe", 3, Duration::from_secs(1))
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_when_main_window_exists() {
        let tree = MockWindowTree::new().with_main_window(77, WindowHandle(0x10));
        let mut session = session(tree);
        let process = ProcessHandle::new(77, "mstsc.exe");
        assert!(session.wait_until_ready(&process).await.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_ready_after_retries() {
        let mut session = session(MockWindowTree::new());
        let process = ProcessHandle::new(77, "mstsc.exe");

        let started = tokio::time::Instant::now();
        let err = session.wait_until_ready(&process).await.unwrap_err();

        assert!(matches!(
            err,
            KeepAliveError::SessionNotReady { retries: 3, .. }
        ));
        assert_eq!(started.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_process_reports_retries() {
        let mut session = ProcessSession::new(
            Arc::new(MockWindowTree::new()),
            "nonexistent_process_xyz_123456",
            2,
            Duration::from_millis(10),
        );
        let err = session.resolve_target_process().await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "process 'nonexistent_process_xyz_123456' not found after 2 attempts"
        );
        assert!(session.active_process().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_launch_failure_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("desktop.rdp");
        std::fs::write(&file, "full address:s:host").unwrap();

        let mut session = ProcessSession::new(
            Arc::new(MockWindowTree::new()),
            "nonexistent_client_xyz_123456",
            3,
            Duration::from_secs(1),
        )
        .with_connection_file(&file);

        let started = tokio::time::Instant::now();
        let err = session.resolve_target_process().await.unwrap_err();

        assert!(matches!(err, KeepAliveError::ClientLaunch { .. }));
        assert!(err.is_fatal());
        assert!(err.to_string().contains("nonexistent_client_xyz_123456"));
        assert_eq!(started.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_launch_without_connection_file() {
        let mut session = ProcessSession::new(
            Arc::new(MockWindowTree::new()),
            "nonexistent_client_xyz_123456",
            2,
            Duration::from_millis(10),
        );
        let err = session.resolve_target_process().await.unwrap_err();
        assert!(matches!(err, KeepAliveError::ProcessNotFound { .. }));
        assert!(!session.launched);
    }

    #[test]
    fn test_keyboard_channel_is_opt_in() {
        let session = session(MockWindowTree::new());
        assert!(session.session_keyboard().is_none());

        let session = session.with_keyboard(Arc::new(MockSessionKeyboard::new()));
        assert!(session.session_keyboard().is_some());
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut session = session(MockWindowTree::new());
        session.active = Some(ProcessHandle::new(1, "mstsc.exe"));
        session.release();
        session.release();
        assert!(session.active_process().is_none());
    }
}
