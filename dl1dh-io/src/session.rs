//! Process-wide bookkeeping of open DL1 readers.
//!
//! Only one DL1 event source is meant to be open at a time. Opening another
//! one while a session is live is reported but not prevented.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

static OPEN_READERS: AtomicUsize = AtomicUsize::new(0);

/// Guard held by an event source for as long as its file is open.
///
/// Dropping the guard releases the session.
#[derive(Debug)]
pub struct ReaderSession {
    concurrent: bool,
}

impl ReaderSession {
    /// Registers a new open reader for `path`.
    pub fn acquire(path: &Path) -> Self {
        let previous = OPEN_READERS.fetch_add(1, Ordering::SeqCst);
        if previous > 0 {
            log::warn!(
                "Only one DL1DH event source allowed at a time ({previous} already open); \
                 opening {} anyway",
                path.display()
            );
        }
        Self {
            concurrent: previous > 0,
        }
    }

    /// True if another session was live when this one was acquired.
    #[must_use]
    pub fn was_concurrent(&self) -> bool {
        self.concurrent
    }

    /// Number of sessions currently live in the process.
    #[must_use]
    pub fn active() -> usize {
        OPEN_READERS.load(Ordering::SeqCst)
    }
}

impl Drop for ReaderSession {
    fn drop(&mut self) {
        OPEN_READERS.fetch_sub(1, Ordering::SeqCst);
    }
}
