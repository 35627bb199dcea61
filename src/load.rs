//! Remote model load sessions.
//!
//! A [`LoadSession`] asks the remote to load a model by URL, then polls its
//! status until it reaches a terminal status. The session runs on its own
//! task and publishes its state and final [`LoadResult`] through a watch
//! channel. Each progress observer has its own queue, so a slow observer
//! still receives every update.
//!
//! ```text
//! Requested ─► Polling ─► Finished(success | error)
//!     │           │
//!     └───────────┴──── abort() ─► Finished(error(cancelled))
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::stream::{self, Stream, StreamExt};
use tokio::sync::{mpsc, watch};

use crate::api::{Commands, INVALID_HANDLE};
use crate::config::LoadConfig;

/// Status tag reported by `getLoadStatus`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadStatus {
    Unknown,
    Downloading,
    Loading,
    Done,
    FailedToDownload,
    FailedToLoad,
}

impl LoadStatus {
    /// Unrecognised tags are [`LoadStatus::Unknown`].
    pub fn from_wire(tag: i32) -> Self {
        match tag {
            1 => LoadStatus::Downloading,
            2 => LoadStatus::Loading,
            3 => LoadStatus::Done,
            4 => LoadStatus::FailedToDownload,
            5 => LoadStatus::FailedToLoad,
            _ => LoadStatus::Unknown,
        }
    }

    pub fn to_wire(self) -> i32 {
        match self {
            LoadStatus::Unknown => 0,
            LoadStatus::Downloading => 1,
            LoadStatus::Loading => 2,
            LoadStatus::Done => 3,
            LoadStatus::FailedToDownload => 4,
            LoadStatus::FailedToLoad => 5,
        }
    }

    /// Polling stops at a terminal status.
    pub fn is_terminal(self) -> bool {
        !matches!(self, LoadStatus::Downloading | LoadStatus::Loading)
    }

    /// Error kind a failed status terminates with, `None` for the others.
    fn failure(self) -> Option<LoadErrorKind> {
        match self {
            LoadStatus::FailedToDownload => Some(LoadErrorKind::DownloadingError),
            LoadStatus::FailedToLoad => Some(LoadErrorKind::LoadingError),
            LoadStatus::Unknown => Some(LoadErrorKind::Unknown),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoadErrorKind {
    DownloadingError,
    LoadingError,
    Unknown,
    Cancelled,
}

/// Why a load did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind:?}: {detail}")]
pub struct LoadError {
    pub kind: LoadErrorKind,
    pub detail: String,
}

impl LoadError {
    pub fn new(kind: LoadErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

/// Terminal outcome of a load session.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadResult {
    /// The model is loaded under this handle.
    Success(u32),
    Error(LoadError),
}

impl LoadResult {
    fn error(kind: LoadErrorKind, detail: impl Into<String>) -> Self {
        LoadResult::Error(LoadError::new(kind, detail))
    }

    pub fn is_success(&self) -> bool {
        matches!(self, LoadResult::Success(_))
    }

    /// Handle of the loaded model, if the load succeeded.
    pub fn handle(&self) -> Option<u32> {
        match self {
            LoadResult::Success(handle) => Some(*handle),
            LoadResult::Error(_) => None,
        }
    }

    pub fn err(&self) -> Option<&LoadError> {
        match self {
            LoadResult::Success(_) => None,
            LoadResult::Error(e) => Some(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPhase {
    /// Waiting for `loadModel` to return a handle.
    Requested,
    Polling,
    Finished,
}

/// Progress queues of live observers. Dropped when the session finishes.
type Observers = Arc<Mutex<Vec<mpsc::UnboundedSender<f32>>>>;

fn lock(observers: &Observers) -> MutexGuard<'_, Vec<mpsc::UnboundedSender<f32>>> {
    observers.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone)]
struct Snapshot {
    phase: LoadPhase,
    handle: Option<u32>,
    progress: f32,
    result: Option<LoadResult>,
}

impl Snapshot {
    fn requested() -> Self {
        Self {
            phase: LoadPhase::Requested,
            handle: None,
            progress: 0.0,
            result: None,
        }
    }
}

/// A model load in progress.
///
/// Dropping the session does not stop the load; call [`LoadSession::abort`]
/// for that.
#[derive(Debug)]
pub struct LoadSession {
    url: String,
    state: watch::Receiver<Snapshot>,
    cancel: watch::Sender<bool>,
    observers: Observers,
}

impl LoadSession {
    /// Start loading `url` on a new task.
    ///
    /// Must be called within a Tokio runtime. The URL is sent as given.
    pub fn start(commands: Commands, url: impl Into<String>, config: LoadConfig) -> Self {
        let url = url.into();
        let (state_tx, state) = watch::channel(Snapshot::requested());
        let (cancel, cancel_rx) = watch::channel(false);
        let observers = Observers::default();

        let poller = Poller {
            commands,
            url: url.clone(),
            config,
            state: state_tx,
            cancel: cancel_rx,
            observers: observers.clone(),
        };
        tokio::spawn(poller.run());

        Self {
            url,
            state,
            cancel,
            observers,
        }
    }

    /// A session that finished before it started.
    pub(crate) fn failed(url: impl Into<String>, error: LoadError) -> Self {
        let (_, state) = watch::channel(Snapshot {
            phase: LoadPhase::Finished,
            handle: None,
            progress: 0.0,
            result: Some(LoadResult::Error(error)),
        });
        let (cancel, _) = watch::channel(false);
        Self {
            url: url.into(),
            state,
            cancel,
            observers: Observers::default(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn phase(&self) -> LoadPhase {
        self.state.borrow().phase
    }

    /// Handle returned by `loadModel`, once known.
    pub fn handle(&self) -> Option<u32> {
        self.state.borrow().handle
    }

    /// Most recent progress fraction.
    pub fn current_progress(&self) -> f32 {
        self.state.borrow().progress
    }

    pub fn is_terminal(&self) -> bool {
        self.state.borrow().result.is_some()
    }

    /// Stop the session with `error(cancelled)`.
    ///
    /// If a handle was already obtained the remote is asked to unload it.
    /// No effect once the session is terminal.
    pub fn abort(&self) {
        let _ = self.cancel.send(true);
    }

    /// Wait for the terminal result. May be awaited any number of times.
    pub async fn completion(&self) -> LoadResult {
        let mut state = self.state.clone();
        let finished = state.wait_for(|s| s.result.is_some()).await;
        match finished {
            Ok(snapshot) => match &snapshot.result {
                Some(result) => result.clone(),
                None => LoadResult::error(LoadErrorKind::Unknown, "load session ended"),
            },
            Err(_) => LoadResult::error(LoadErrorKind::Unknown, "load session ended without a result"),
        }
    }

    /// Progress observer.
    ///
    /// Yields `0` first. For a finished session it then yields the final
    /// progress and ends; otherwise every update until the session finishes.
    /// Updates queue up until the observer reads them.
    pub fn progress(&self) -> impl Stream<Item = f32> + Send + 'static {
        enum Stage {
            Last(f32),
            Follow(mpsc::UnboundedReceiver<f32>),
            Done,
        }

        // Registered under the lock so no update falls between the
        // snapshot and the queue.
        let stage = {
            let mut observers = lock(&self.observers);
            let snapshot = self.state.borrow();
            if snapshot.result.is_some() {
                Stage::Last(snapshot.progress)
            } else {
                let (tx, rx) = mpsc::unbounded_channel();
                observers.push(tx);
                Stage::Follow(rx)
            }
        };

        let updates = stream::unfold(stage, |stage| async move {
            match stage {
                Stage::Last(progress) => Some((progress, Stage::Done)),
                Stage::Follow(mut rx) => {
                    let progress = rx.recv().await?;
                    Some((progress, Stage::Follow(rx)))
                }
                Stage::Done => None,
            }
        });
        stream::iter([0.0]).chain(updates)
    }
}

/// The task side of a session.
struct Poller {
    commands: Commands,
    url: String,
    config: LoadConfig,
    state: watch::Sender<Snapshot>,
    cancel: watch::Receiver<bool>,
    observers: Observers,
}

impl Poller {
    async fn run(mut self) {
        let result = self.drive().await;
        match &result {
            LoadResult::Success(handle) => {
                tracing::debug!("Loaded {} as handle {}", self.url, handle)
            }
            LoadResult::Error(e) => tracing::warn!("Loading {} failed: {}", self.url, e),
        }
        let mut observers = lock(&self.observers);
        self.state.send_modify(|s| {
            s.phase = LoadPhase::Finished;
            s.result = Some(result);
        });
        observers.clear();
    }

    /// Store a reported progress and pass it to every observer.
    ///
    /// Progress stays in `[0, 1]` and never decreases. NaN keeps the
    /// previous value.
    fn publish(&self, reported: f32) -> f32 {
        let mut observers = lock(&self.observers);
        let mut progress = 0.0;
        self.state.send_modify(|s| {
            s.progress = s.progress.max(reported.clamp(0.0, 1.0));
            progress = s.progress;
        });
        observers.retain(|tx| tx.send(progress).is_ok());
        progress
    }

    async fn drive(&mut self) -> LoadResult {
        let requested = tokio::select! {
            biased;
            _ = cancelled(&mut self.cancel) => return cancelled_result(),
            r = self.commands.load_model(&self.url) => r,
        };
        let handle = match requested {
            Ok(INVALID_HANDLE) => {
                return LoadResult::error(
                    LoadErrorKind::DownloadingError,
                    format!("remote refused to load {}", self.url),
                )
            }
            Ok(handle) => handle,
            Err(e) => return LoadResult::error(LoadErrorKind::DownloadingError, e.to_string()),
        };
        self.state.send_modify(|s| {
            s.phase = LoadPhase::Polling;
            s.handle = Some(handle);
        });

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            let polled = tokio::select! {
                biased;
                _ = cancelled(&mut self.cancel) => return self.abandon(handle),
                r = poll_once(&self.commands, &mut ticker, handle) => r,
            };

            let (tag, reported) = match polled {
                Ok(polled) => polled,
                Err(e) => {
                    self.commands.unload_model(handle);
                    return LoadResult::error(LoadErrorKind::Unknown, e.to_string());
                }
            };
            // Republished on every poll, changed or not.
            let progress = self.publish(reported);

            let status = LoadStatus::from_wire(tag);
            tracing::debug!("Load {} status {:?} progress {}", handle, status, progress);

            if status == LoadStatus::Done {
                return LoadResult::Success(handle);
            }
            if let Some(kind) = status.failure() {
                self.commands.unload_model(handle);
                let detail = tokio::select! {
                    biased;
                    _ = cancelled(&mut self.cancel) => return cancelled_result(),
                    r = self.commands.get_last_error() => match r {
                        Ok(detail) => detail,
                        Err(e) => e.to_string(),
                    },
                };
                return LoadResult::error(kind, detail);
            }
        }
    }

    fn abandon(&self, handle: u32) -> LoadResult {
        self.commands.unload_model(handle);
        cancelled_result()
    }
}

async fn poll_once(
    commands: &Commands,
    ticker: &mut tokio::time::Interval,
    handle: u32,
) -> crate::Result<(i32, f32)> {
    ticker.tick().await;
    commands.get_load_status(handle).await
}

/// Resolves once `abort` was called. Never resolves if the session handle
/// was dropped without aborting.
async fn cancelled(cancel: &mut watch::Receiver<bool>) {
    if cancel.wait_for(|aborted| *aborted).await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn cancelled_result() -> LoadResult {
    LoadResult::error(LoadErrorKind::Cancelled, "load aborted")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_tags() {
        for status in [
            LoadStatus::Unknown,
            LoadStatus::Downloading,
            LoadStatus::Loading,
            LoadStatus::Done,
            LoadStatus::FailedToDownload,
            LoadStatus::FailedToLoad,
        ] {
            assert_eq!(LoadStatus::from_wire(status.to_wire()), status);
        }
        assert_eq!(LoadStatus::from_wire(42), LoadStatus::Unknown);
        assert_eq!(LoadStatus::from_wire(-1), LoadStatus::Unknown);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!LoadStatus::Downloading.is_terminal());
        assert!(!LoadStatus::Loading.is_terminal());
        assert!(LoadStatus::Done.is_terminal());
        assert!(LoadStatus::Unknown.is_terminal());
        assert_eq!(LoadStatus::Done.failure(), None);
        assert_eq!(
            LoadStatus::FailedToLoad.failure(),
            Some(LoadErrorKind::LoadingError)
        );
        assert_eq!(
            LoadStatus::FailedToDownload.failure(),
            Some(LoadErrorKind::DownloadingError)
        );
        assert_eq!(LoadStatus::Unknown.failure(), Some(LoadErrorKind::Unknown));
    }

    #[test]
    fn test_result_helpers() {
        let ok = LoadResult::Success(7);
        assert!(ok.is_success());
        assert_eq!(ok.handle(), Some(7));
        assert!(ok.err().is_none());

        let failed = LoadResult::error(LoadErrorKind::LoadingError, "bad format");
        assert!(!failed.is_success());
        assert_eq!(failed.handle(), None);
        assert_eq!(failed.err().unwrap().detail, "bad format");
        assert_eq!(failed.err().unwrap().to_string(), "LoadingError: bad format");
    }

    #[tokio::test]
    async fn test_failed_session_is_terminal() {
        use futures_util::StreamExt;

        let session = LoadSession::failed(
            "nope",
            LoadError::new(LoadErrorKind::DownloadingError, "bad url"),
        );
        assert!(session.is_terminal());
        assert_eq!(session.phase(), LoadPhase::Finished);
        assert_eq!(session.handle(), None);

        let result = session.completion().await;
        assert_eq!(result.err().unwrap().kind, LoadErrorKind::DownloadingError);
        assert_eq!(session.completion().await, result);

        let progress: Vec<f32> = session.progress().collect().await;
        assert_eq!(progress, vec![0.0, 0.0]);

        session.abort();
        assert_eq!(session.completion().await, result);
    }
}
