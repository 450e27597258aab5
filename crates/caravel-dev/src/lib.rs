//! Build-and-supervise concurrency core for caravel.
//!
//! Two independent drivers — the filesystem watcher ([`DevLoop`]) and the
//! remote sync poller ([`SyncPoller`]) — both end in "restart the one
//! supervised child process". The [`ProcessSupervisor`] owns that child
//! exclusively; drivers share it behind `Arc<tokio::sync::Mutex<_>>` so
//! only one replace/stop is ever in flight.
//!
//! ```text
//! notify watcher ──► DevLoop ──► build ──┐
//!                                        ├──► ProcessSupervisor::replace
//! interval timer ──► SyncPoller ── S3 ───┘
//! ```

pub mod dev_loop;
pub mod poller;
pub mod supervisor;
pub mod watcher;

pub use dev_loop::{DevLoop, LoopState, RebuildDriver};
pub use poller::{RemoteStore, SyncError, SyncPoller, MARKER_KEY};
pub use supervisor::{NodeSpawner, ProcessHandle, ProcessSpawner, ProcessSupervisor, SupervisionError};
pub use watcher::{ChangeEvent, ChangeKind, SourceWatcher};
