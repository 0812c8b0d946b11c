//! Audio-processing context: owns the destination and creates source nodes.

use std::cell::{Cell, RefCell};
use std::sync::Arc;
use tracing::{debug, warn};

use super::destination::{Destination, DeviceDestination, NullDestination, WavDestination};
use super::element::MediaElement;
use super::source::SourceNode;
use crate::error::{AudioError, Result};
use crate::params::{OutputBackend, OutputConfig};

pub struct AudioContext {
    /// Taken out while `attach` runs so no borrow spans the callback
    destination: RefCell<Option<Box<dyn Destination>>>,
    destination_name: String,
    sample_rate_hz: u32,
    sources_created: Cell<usize>,
}

impl AudioContext {
    /// Open a context on the configured backend.
    ///
    /// Any failure to reach the backend is reported as
    /// `AudioError::ContextUnavailable`.
    pub fn open(config: &OutputConfig) -> Result<Self> {
        let destination: Box<dyn Destination> = match &config.backend {
            OutputBackend::Device => Box::new(DeviceDestination::open(config)?),
            OutputBackend::Null => Box::new(NullDestination::new(config.sample_rate_hz)),
            OutputBackend::Wav(path) => Box::new(
                WavDestination::create(path, config.sample_rate_hz).map_err(|e| {
                    AudioError::ContextUnavailable(format!(
                        "Failed to create {}: {}",
                        path.display(),
                        e
                    ))
                })?,
            ),
        };
        Ok(Self::with_destination(destination))
    }

    pub fn with_destination(destination: Box<dyn Destination>) -> Self {
        Self {
            sample_rate_hz: destination.sample_rate_hz(),
            destination_name: destination.name().to_string(),
            destination: RefCell::new(Some(destination)),
            sources_created: Cell::new(0),
        }
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    pub fn destination_name(&self) -> &str {
        &self.destination_name
    }

    /// Number of source nodes this context has ever created
    pub fn sources_created(&self) -> usize {
        self.sources_created.get()
    }

    /// Wrap `element` in a new source node.
    ///
    /// An element can be wrapped once in its lifetime. Callers should go
    /// through `AudioEnvironment::get_or_create_source`, which caches the
    /// node; calling this directly for an element that is already wrapped
    /// fails with `SourceConflict`.
    pub fn create_media_element_source(
        &self,
        element: &Arc<MediaElement>,
    ) -> Result<Arc<SourceNode>> {
        if !element.try_capture() {
            warn!("{} ({}) is already wrapped", element.id(), element.label());
            return Err(AudioError::SourceConflict(element.id()));
        }

        let node = Arc::new(SourceNode::new(element));
        self.sources_created.set(self.sources_created.get() + 1);
        debug!(
            "Source node {} wraps {} ({})",
            node.node_id(),
            element.id(),
            element.label()
        );
        Ok(node)
    }

    /// Run the destination's `attach` hook.
    ///
    /// The destination is detached from the context for the duration of the
    /// call, so the hook may re-enter the environment freely.
    pub(crate) fn attach_destination(&self) -> Result<()> {
        let taken = self.destination.borrow_mut().take();
        let Some(mut destination) = taken else {
            // Already inside an attach further up the stack
            return Ok(());
        };
        let result = destination.attach();
        *self.destination.borrow_mut() = Some(destination);
        result
    }

    pub(crate) fn render(&self, samples: &[f32]) -> Result<()> {
        match self.destination.borrow_mut().as_mut() {
            Some(destination) => destination.render(samples),
            None => {
                debug!("Destination attaching, dropped {} samples", samples.len());
                Ok(())
            }
        }
    }
}
