//! Cooperative cancellation.
//!
//! A cheap `Arc<AtomicBool>` handle the packer and the streaming decoder
//! check between files, between chunks, and inside the file-scanning loop
//! (`spec.md` §5). There is no cooperative yield inside a single chunk
//! decode — cancellation takes effect at the next checkpoint, not mid-chunk.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
