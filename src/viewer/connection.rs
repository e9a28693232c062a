use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reports whether the device connection is currently up.
pub trait ConnectionStatus: Send + Sync {
    fn is_connected(&self) -> bool;
}

/// Connection flag shared between whoever owns the transport and its readers.
#[derive(Debug, Clone, Default)]
pub struct SharedConnection {
    connected: Arc<AtomicBool>,
}

impl SharedConnection {
    pub fn new(connected: bool) -> Self {
        Self {
            connected: Arc::new(AtomicBool::new(connected)),
        }
    }

    pub fn set(&self, connected: bool) {
        let was = self.connected.swap(connected, Ordering::Relaxed);
        if was != connected {
            tracing::debug!(connected, "connection status changed");
        }
    }
}

impl ConnectionStatus for SharedConnection {
    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }
}
