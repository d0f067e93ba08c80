//! Write-only sink for debug recordings.
//!
//! Recordings are emitted as `tracing` events on the [`DUMP_TARGET`] target at
//! `TRACE` level, so they cost a level check when no subscriber listens. Nothing
//! recorded here is ever read back by the signal path.

/// Target of every recording event.
pub const DUMP_TARGET: &str = "webrtc_fixed_digital::dump";

/// Records named values for offline inspection, keyed by an instance index
/// chosen by the owning controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApmDataDumper {
    instance_index: usize,
}

impl ApmDataDumper {
    pub fn new(instance_index: usize) -> Self {
        Self { instance_index }
    }

    pub fn instance_index(&self) -> usize {
        self.instance_index
    }

    /// Records an array of samples or factors.
    pub fn dump_raw(&self, name: &str, values: &[f32]) {
        if !tracing::enabled!(target: DUMP_TARGET, tracing::Level::TRACE) {
            return;
        }
        tracing::trace!(
            target: DUMP_TARGET,
            instance = self.instance_index,
            key = name,
            len = values.len(),
            values = ?values,
        );
    }

    /// Records a single scalar.
    pub fn dump_value(&self, name: &str, value: f64) {
        tracing::trace!(
            target: DUMP_TARGET,
            instance = self.instance_index,
            key = name,
            value,
        );
    }
}
