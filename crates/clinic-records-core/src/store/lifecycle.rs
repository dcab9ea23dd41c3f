//! Store lifecycle: `Closed` until an open completes, then `Open`.

use log::{debug, error};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

use super::{CollectionSpec, LocalStore, StoreError, StoreResult};

/// Everything needed to open a store.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreOptions {
    /// Database file; `None` opens an in-memory store
    pub path: Option<PathBuf>,
    pub name: String,
    pub version: u32,
    pub collections: Vec<CollectionSpec>,
}

impl StoreOptions {
    /// Open synchronously.
    pub fn open(&self) -> StoreResult<LocalStore> {
        match &self.path {
            Some(path) => LocalStore::open(path, &self.name, self.version, &self.collections),
            None => LocalStore::open_in_memory(&self.name, self.version, &self.collections),
        }
    }

    /// Start opening on a background thread and return immediately.
    pub fn open_in_background(self) -> PendingOpen {
        let (sender, receiver) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name("clinic-store-open".into())
            .spawn({
                let sender = sender.clone();
                move || {
                    // The receiver may be gone if the caller gave up waiting.
                    let _ = sender.send(self.open());
                }
            });

        if let Err(err) = spawned {
            error!("event=store_open module=store status=error error_code=spawn_failed error={err}");
            let _ = sender.send(Err(StoreError::OpenAborted(err.to_string())));
        }
        PendingOpen { receiver }
    }
}

/// An open started with [`StoreOptions::open_in_background`].
pub struct PendingOpen {
    receiver: Receiver<StoreResult<LocalStore>>,
}

impl PendingOpen {
    /// Non-blocking check for the completion signal.
    pub fn try_complete(&self) -> Option<StoreResult<LocalStore>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(result),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(StoreError::OpenAborted(
                "open worker exited without a result".into(),
            ))),
        }
    }

    /// Block until the open completes.
    pub fn wait(self) -> StoreResult<LocalStore> {
        self.receiver.recv().unwrap_or_else(|_| {
            Err(StoreError::OpenAborted(
                "open worker exited without a result".into(),
            ))
        })
    }
}

/// Lifecycle of the store as seen by its owner.
#[derive(Debug, Default)]
pub enum StoreState {
    #[default]
    Closed,
    Open(LocalStore),
}

impl StoreState {
    pub fn is_open(&self) -> bool {
        matches!(self, Self::Open(_))
    }

    pub fn store(&self) -> StoreResult<&LocalStore> {
        match self {
            Self::Open(store) => Ok(store),
            Self::Closed => {
                debug!("event=store_access module=store status=closed");
                Err(StoreError::Closed)
            }
        }
    }

    pub fn store_mut(&mut self) -> StoreResult<&mut LocalStore> {
        match self {
            Self::Open(store) => Ok(store),
            Self::Closed => {
                debug!("event=store_access module=store status=closed");
                Err(StoreError::Closed)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> StoreOptions {
        StoreOptions {
            path: None,
            name: "patientDB".into(),
            version: 1,
            collections: vec![CollectionSpec::new("patients", "name")],
        }
    }

    #[test]
    fn test_closed_rejects_access() {
        let state = StoreState::default();
        assert!(!state.is_open());
        assert!(matches!(state.store(), Err(StoreError::Closed)));
    }

    #[test]
    fn test_background_open_completes() {
        let pending = options().open_in_background();
        let store = pending.wait().unwrap();
        assert_eq!(store.version(), 1);

        let state = StoreState::Open(store);
        assert!(state.is_open());
    }

    #[test]
    fn test_background_open_reports_failure() {
        let mut opts = options();
        opts.version = 0;
        let result = opts.open_in_background().wait();
        assert!(matches!(result, Err(StoreError::InvalidVersion)));
    }
}
