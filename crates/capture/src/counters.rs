//! Session counters for instrumentation.

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Counters {
    pub flushes: u64,
    pub records_emitted: u64,
    /// Flushes that produced an empty record and emitted nothing.
    pub suppressed_flushes: u64,
    /// Pending adds discarded because their position never resolved.
    pub abandoned_adds: u64,
    /// Text or attribute updates filtered because the target was no longer tracked.
    pub stale_updates: u64,
    pub frame_timeouts: u64,
}
