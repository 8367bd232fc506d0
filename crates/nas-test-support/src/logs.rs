//! In-memory capture of tracing output.

use std::io;
use std::sync::{Arc, Mutex};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;

/// Formatted log lines written while the capture guard is alive.
#[derive(Clone, Default)]
pub struct CapturedLogs {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    /// Installs a thread-local fmt subscriber that records every event down
    /// to trace level. Dropping the guard restores the previous subscriber.
    pub fn install() -> (Self, DefaultGuard) {
        let logs = Self::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(logs.clone())
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .finish();
        (logs, tracing::subscriber::set_default(subscriber))
    }

    pub fn contents(&self) -> String {
        let buf = self.buf.lock().expect("log buffer poisoned");
        String::from_utf8_lossy(&buf).into_owned()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.contents().contains(needle)
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self.buf.lock().expect("log buffer poisoned");
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, error};

    #[test]
    fn test_capture_records_levels_and_targets() {
        let (logs, _guard) = CapturedLogs::install();
        error!(target: "nas_ip", "Failed CMD: /sbin/ip link");
        debug!("quiet");
        assert!(logs.contains("ERROR"));
        assert!(logs.contains("nas_ip: Failed CMD: /sbin/ip link"));
        assert!(logs.contains("quiet"));
    }

    #[test]
    fn test_capture_ends_with_guard() {
        let (logs, guard) = CapturedLogs::install();
        drop(guard);
        error!("after");
        assert!(!logs.contains("after"));
    }
}
