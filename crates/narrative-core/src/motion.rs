//! # Master Motion
//!
//! The single horizontal-translation motion every dependent trigger keys off.
//!
//! `MasterMotion` is the writer side and is owned by the timeline composer; it
//! is not `Clone`. Everybody else holds a `MotionHandle`, a cheap read-only
//! reference to the same cell. Releasing the writer invalidates every handle,
//! so a late callback reading a released handle sees "no motion" rather than
//! stale geometry.

use crate::errors::NarrativeError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug)]
struct MotionCell {
    generation: u64,
    travel_distance: f64,
    viewport_width: f64,
    /// `f64` bits of the travel progress; NaN while travel has not started.
    progress_bits: AtomicU64,
    live: AtomicBool,
}

impl MotionCell {
    fn progress(&self) -> Option<f64> {
        if !self.live.load(Ordering::Acquire) {
            return None;
        }
        let value = f64::from_bits(self.progress_bits.load(Ordering::Acquire));
        if value.is_nan() {
            None
        } else {
            Some(value)
        }
    }
}

/// Writer side of the master motion.
#[derive(Debug)]
pub struct MasterMotion {
    cell: Arc<MotionCell>,
}

impl MasterMotion {
    /// Creates a motion for one timeline build. `travel_distance` must be positive.
    pub fn new(generation: u64, travel_distance: f64, viewport_width: f64) -> Self {
        Self {
            cell: Arc::new(MotionCell {
                generation,
                travel_distance,
                viewport_width,
                progress_bits: AtomicU64::new(f64::NAN.to_bits()),
                live: AtomicBool::new(true),
            }),
        }
    }

    /// Returns a read-only handle to share with dependent components.
    pub fn handle(&self) -> MotionHandle {
        MotionHandle {
            cell: self.cell.clone(),
        }
    }

    /// Sets the travel progress (`0.0..=1.0`), or `None` while the timeline is
    /// still in its pre-travel phases.
    pub fn set_progress(&self, progress: Option<f64>) {
        let bits = match progress {
            Some(p) => p.clamp(0.0, 1.0).to_bits(),
            None => f64::NAN.to_bits(),
        };
        self.cell.progress_bits.store(bits, Ordering::Release);
    }

    /// Invalidates every outstanding handle.
    pub fn release(&self) {
        if self.cell.live.swap(false, Ordering::AcqRel) {
            debug!(generation = self.cell.generation, "master motion released");
        }
    }
}

impl Drop for MasterMotion {
    fn drop(&mut self) {
        self.release();
    }
}

/// Shared, read-only view of the master motion.
#[derive(Debug, Clone)]
pub struct MotionHandle {
    cell: Arc<MotionCell>,
}

impl MotionHandle {
    /// Travel progress in `0.0..=1.0`, `None` before travel starts or after release.
    pub fn progress(&self) -> Option<f64> {
        self.cell.progress()
    }

    /// Current horizontal offset of the track in pixels.
    pub fn offset(&self) -> Option<f64> {
        self.progress().map(|p| p * self.cell.travel_distance)
    }

    pub fn travel_distance(&self) -> f64 {
        self.cell.travel_distance
    }

    pub fn viewport_width(&self) -> f64 {
        self.cell.viewport_width
    }

    pub fn generation(&self) -> u64 {
        self.cell.generation
    }

    pub fn is_live(&self) -> bool {
        self.cell.live.load(Ordering::Acquire)
    }

    /// Converts a track offset in pixels into a fraction of the motion.
    ///
    /// The result is not clamped: windows may begin before or end after travel.
    pub fn offset_to_progress(&self, offset: f64) -> f64 {
        offset / self.cell.travel_distance
    }

    /// Whether both handles point at the same motion.
    pub fn same_motion(&self, other: &MotionHandle) -> bool {
        Arc::ptr_eq(&self.cell, &other.cell)
    }
}

/// Read-only broadcast slot for the current motion handle.
///
/// The value starts empty and is published at most once per build. Consumers
/// that read `None` must skip creating dependent triggers.
#[derive(Debug, Default)]
pub struct MotionChannel {
    current: Option<MotionHandle>,
}

impl MotionChannel {
    pub fn new() -> Self {
        Self { current: None }
    }

    /// Returns the published handle, if any and still live.
    pub fn get(&self) -> Option<MotionHandle> {
        self.current.as_ref().filter(|h| h.is_live()).cloned()
    }

    pub fn is_active(&self) -> bool {
        self.get().is_some()
    }

    /// Publishes the handle for the current build.
    pub fn publish(&mut self, handle: MotionHandle) -> Result<(), NarrativeError> {
        if self.current.is_some() {
            return Err(NarrativeError::AlreadyPublished);
        }
        info!(
            generation = handle.generation(),
            travel = handle.travel_distance(),
            "master motion published"
        );
        self.current = Some(handle);
        Ok(())
    }

    /// Clears the slot so the next build can publish again.
    pub fn reset(&mut self) {
        self.current = None;
    }
}
