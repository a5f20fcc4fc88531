//! Applies template changes as the files under the view roots change.
//!
//! Change notifications are filtered on the notification thread and sent over
//! a channel to one worker thread, which waits for each file to become
//! readable and applies it to the [`ViewEngine`]. Renders are never blocked
//! on the wait, only on applying the change.

use crate::{
    engine::ViewEngine,
    log::{Error, ErrorKind},
};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::{
    collections::BTreeSet,
    fs::File,
    io,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        mpsc::{self, Receiver, RecvTimeoutError},
        Arc,
    },
    thread::{self, JoinHandle},
    time::Duration,
};
use tracing::{debug, warn};

/// Keeps a view root subscription alive. Dropping it stops watching.
pub struct WatchHandle {
    stop: Arc<AtomicBool>,
    watcher: Option<RecommendedWatcher>,
    worker: Option<JoinHandle<()>>,
}

impl WatchHandle {
    /// Stop watching and wait for the worker to finish the change it is
    /// applying, if any.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Return true while the worker is running.
    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    fn shutdown(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        // Dropping the watcher closes the channel, which ends the worker.
        self.watcher.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("view watch worker panicked");
            }
        }
    }
}

impl Drop for WatchHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

/// Subscribe to changes under the view roots of `engine`.
pub(crate) fn spawn(engine: ViewEngine) -> Result<WatchHandle, Error> {
    let (sender, receiver) = mpsc::channel();
    let store = engine.store().clone();

    let filter = store.clone();
    let mut watcher = notify::recommended_watcher(move |event: notify::Result<Event>| {
        let event = match event {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "view watch error");
                return;
            }
        };
        if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
            return;
        }
        for path in event.paths.into_iter().filter(|p| filter.is_template(p)) {
            // The worker is gone once the handle is dropped.
            let _ = sender.send(path);
        }
    })
    .map_err(error_watch)?;

    for root in store.roots() {
        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(error_watch)?;
        debug!(root = %root.display(), "watching view root");
    }

    let stop = Arc::new(AtomicBool::new(false));
    let worker = thread::Builder::new()
        .name("vellum-watch".into())
        .spawn({
            let stop = stop.clone();
            move || work(&engine, &receiver, &stop)
        })
        .map_err(error_watch)?;

    Ok(WatchHandle {
        stop,
        watcher: Some(watcher),
        worker: Some(worker),
    })
}

/// Apply queued changes until `stop` is set or the channel closes.
fn work(engine: &ViewEngine, receiver: &Receiver<PathBuf>, stop: &AtomicBool) {
    let interval = engine.config().poll_interval();

    while !stop.load(Ordering::SeqCst) {
        let first = match receiver.recv_timeout(interval) {
            Ok(path) => path,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };

        // One save often raises several events, so apply each path once.
        let queued: BTreeSet<PathBuf> = std::iter::once(first)
            .chain(receiver.try_iter())
            .collect();
        for path in queued {
            if !wait_until_readable(&path, interval, stop) {
                continue;
            }
            match engine.apply_change(&path) {
                Ok(rebuilt) if !rebuilt.is_empty() => {
                    if let Err(e) = engine.persist() {
                        warn!("{e:#}");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), "{e:#}"),
            }
        }
    }
}

/// Block until the file at `path` can be opened, checking every `interval`.
///
/// Returns false if the file no longer exists or `stop` was set.
pub fn wait_until_readable(path: &Path, interval: Duration, stop: &AtomicBool) -> bool {
    loop {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        match File::open(path) {
            Ok(_) => return true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "changed template is gone");
                return false;
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "waiting for template");
                thread::sleep(interval);
            }
        }
    }
}

fn error_watch(cause: impl std::fmt::Display) -> Error {
    Error::build("unable to watch view roots")
        .with_kind(ErrorKind::Io)
        .with_help(cause.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_wait_until_readable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("Home.html");
        let stop = AtomicBool::new(false);
        fs::write(&path, "home").unwrap();

        assert!(wait_until_readable(&path, Duration::from_millis(1), &stop));
        assert!(!wait_until_readable(
            &dir.path().join("Gone.html"),
            Duration::from_millis(1),
            &stop
        ));

        stop.store(true, Ordering::SeqCst);
        assert!(!wait_until_readable(&path, Duration::from_millis(1), &stop));
    }
}
