//! Shared state of one harvest pass
//!
//! Everything the two scanners coordinate through lives in [`HarvestState`],
//! held behind an `Arc` by both tasks: the known-URL registry, the guarded
//! store, the convergence cursors and the cancellation signal.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use crate::registry::KnownUrlRegistry;
use crate::store::SharedStore;

/// Which end of the catalog a scanner walks from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScanDirection {
    Forward,
    Backward,
}

impl fmt::Display for ScanDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Forward => "forward",
            Self::Backward => "backward",
        })
    }
}

/// Result of trying to move a cursor onto its next page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The scanner now owns `page` and may process it.
    Claimed(usize),
    /// The next page belongs to the other scanner; this direction is done.
    Crossed,
}

#[derive(Debug)]
struct Cursors {
    forward: usize,
    backward: Option<usize>,
}

/// Page cursors of both scanners behind one lock.
///
/// Pages `forward` and below belong to the forward scanner, pages `backward`
/// and above to the backward one. A move is granted only while the two sets
/// stay disjoint, so no page is processed twice.
#[derive(Debug)]
pub struct ConvergenceCursors {
    inner: Mutex<Cursors>,
}

impl Default for ConvergenceCursors {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Cursors {
                forward: 1,
                backward: None,
            }),
        }
    }
}

impl ConvergenceCursors {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Place the backward cursor on `last_page`.
    ///
    /// Refused when the forward scanner already owns that page, which
    /// includes a catalog of a single page.
    pub fn begin_backward(&self, last_page: usize) -> bool {
        let mut cursors = self.inner.lock();
        if cursors.backward.is_some() || last_page <= cursors.forward {
            return false;
        }
        cursors.backward = Some(last_page);
        true
    }

    /// Claim the next page in `direction`.
    pub fn advance(&self, direction: ScanDirection) -> Advance {
        let mut cursors = self.inner.lock();
        match direction {
            ScanDirection::Forward => {
                let next = cursors.forward + 1;
                if cursors.backward.is_some_and(|b| next >= b) {
                    return Advance::Crossed;
                }
                cursors.forward = next;
                Advance::Claimed(next)
            }
            ScanDirection::Backward => {
                let Some(current) = cursors.backward else {
                    return Advance::Crossed;
                };
                let next = current - 1;
                if next <= cursors.forward {
                    return Advance::Crossed;
                }
                cursors.backward = Some(next);
                Advance::Claimed(next)
            }
        }
    }

    #[must_use]
    pub fn forward(&self) -> usize {
        self.inner.lock().forward
    }

    #[must_use]
    pub fn backward(&self) -> Option<usize> {
        self.inner.lock().backward
    }
}

/// Why a pass was asked to stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CancelReason {
    /// A scanner ran out of pages in its direction.
    Exhausted(ScanDirection),
    /// The cursors met.
    Crossed(ScanDirection),
    /// A scanner hit an unrecoverable error.
    Failed(ScanDirection, String),
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exhausted(d) => write!(f, "{d} scanner ran out of pages"),
            Self::Crossed(d) => write!(f, "{d} scanner met the other cursor"),
            Self::Failed(d, message) => write!(f, "{d} scanner failed: {message}"),
        }
    }
}

/// One-shot cancellation flag. The first reason raised is kept.
#[derive(Debug, Default)]
pub struct CancelSignal {
    raised: AtomicBool,
    reason: Mutex<Option<CancelReason>>,
}

impl CancelSignal {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the signal; returns `true` if this call raised it.
    pub fn raise(&self, reason: CancelReason) -> bool {
        let mut slot = self.reason.lock();
        if slot.is_some() {
            return false;
        }
        *slot = Some(reason);
        self.raised.store(true, Ordering::Release);
        true
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn reason(&self) -> Option<CancelReason> {
        self.reason.lock().clone()
    }
}

/// State shared by the scanners of one pass.
#[derive(Debug)]
pub struct HarvestState {
    pub registry: KnownUrlRegistry,
    pub store: SharedStore,
    pub cursors: ConvergenceCursors,
    pub cancel: CancelSignal,
}

impl HarvestState {
    #[must_use]
    pub fn new(store: SharedStore) -> Arc<Self> {
        Arc::new(Self {
            registry: KnownUrlRegistry::new(),
            store,
            cursors: ConvergenceCursors::new(),
            cancel: CancelSignal::new(),
        })
    }
}
