use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A cancellation handle threaded through every chunk-store operation (spec.md §5:
/// "Callers pass a cancellation handle (a context) threaded through every operation").
/// Cloning shares the same underlying flag; there is no parent/child hierarchy since
/// nothing in this crate needs one.
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

    pub fn check(&self) -> Result<(), crate::ChunkStoreError> {
        if self.is_cancelled() {
            Err(crate::ChunkStoreError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_observed() {
        let token = CancellationToken::new();
        assert!(token.check().is_ok());
        token.cancel();
        assert!(token.check().is_err());
        // A clone observes the same cancellation.
        let clone = token.clone();
        assert!(clone.check().is_err());
    }
}
