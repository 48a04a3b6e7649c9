//! Progress-event seam for long-running batch operations.
//!
//! Sinks observe scan progress without the scanner depending on any
//! particular reporting backend. Implementations must be cheap and must not
//! panic; the scanner treats emission as fire-and-forget.

use crate::domain::signal::Signal;

#[derive(Debug, Clone)]
pub enum ScanEvent {
    /// Batch accepted; total candidate count.
    Started { total: usize },
    /// One symbol scored successfully.
    Scored { symbol: String, signal: Signal },
    /// One symbol failed; the batch continues.
    Failed { symbol: String, reason: String },
    /// Batch complete.
    Finished { scored: usize, failed: usize },
}

/// Sinks are shared across scanner worker threads.
pub trait EventSink: Sync {
    fn emit(&self, event: ScanEvent);
}

/// Default sink: discards everything.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: ScanEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_sink_accepts_all_events() {
        let sink = NullSink;
        sink.emit(ScanEvent::Started { total: 3 });
        sink.emit(ScanEvent::Finished {
            scored: 2,
            failed: 1,
        });
    }
}
