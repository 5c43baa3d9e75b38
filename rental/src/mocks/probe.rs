//! Mock readiness probe for testing.

use crate::error::{RentalError, Result};
use crate::server::health::ReadinessProbe;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Readiness probe whose answer tests control.
#[derive(Debug, Clone)]
pub struct MockProbe {
    healthy: Arc<AtomicBool>,
}

impl MockProbe {
    /// A healthy probe.
    #[must_use]
    pub fn new() -> Self {
        Self {
            healthy: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Flip the probe's answer.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }
}

impl Default for MockProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadinessProbe for MockProbe {
    async fn ping(&self) -> Result<()> {
        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(RentalError::Database("connection refused".to_string()))
        }
    }
}
