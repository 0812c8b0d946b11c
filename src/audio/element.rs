//! Audio-producing element handles.
//!
//! A `MediaElement` is what the playback engine hands to the visualizer: a
//! shared queue of decoded mono samples plus a stable identity. The playback
//! side may live on another thread, so the queue is behind a mutex.

use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::params::audio_constants::MAX_PENDING_SAMPLES;

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one element; never reused within a process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "element#{}", self.0)
    }
}

/// Audio-producing element fed by the playback engine
pub struct MediaElement {
    id: ElementId,
    label: String,
    pending: Mutex<VecDeque<f32>>,
    /// Set once any context wraps this element
    captured: AtomicBool,
}

impl MediaElement {
    pub fn new(label: impl Into<String>) -> Arc<Self> {
        Arc::new(Self {
            id: ElementId(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed)),
            label: label.into(),
            pending: Mutex::new(VecDeque::new()),
            captured: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Queue mono samples for the next graph pump
    pub fn push_samples(&self, samples: &[f32]) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.extend(samples.iter().copied());

        let overflow = pending.len().saturating_sub(MAX_PENDING_SAMPLES);
        if overflow > 0 {
            pending.drain(..overflow);
        }
    }

    /// Queue interleaved frames, averaging channels down to mono
    pub fn push_interleaved(&self, samples: &[f32], channels: usize) {
        if channels <= 1 {
            self.push_samples(samples);
            return;
        }
        let mono: Vec<f32> = samples
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        self.push_samples(&mono);
    }

    /// Number of samples waiting to be pulled
    pub fn pending_len(&self) -> usize {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether a source node has ever wrapped this element
    pub fn is_captured(&self) -> bool {
        self.captured.load(Ordering::Acquire)
    }

    /// Claim the element for a source node; false if already claimed
    pub(crate) fn try_capture(&self) -> bool {
        self.captured
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Move all pending samples into `out`
    pub(crate) fn drain_into(&self, out: &mut Vec<f32>) {
        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        out.extend(pending.drain(..));
    }
}

impl fmt::Debug for MediaElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaElement")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("captured", &self.is_captured())
            .finish()
    }
}
