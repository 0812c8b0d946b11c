//! Shared audio-analysis environment.

use std::cell::{Cell, RefCell};
use std::sync::Arc;
use tracing::{debug, warn};

use super::context::AudioContext;
use super::element::MediaElement;
use super::fft::AnalyserNode;
use super::source::{SourceCache, SourceNode};
use crate::error::Result;
use crate::params::AnalyserConfig;

/// The one audio graph behind every visualizer on this thread.
///
/// Sources feed a single analyser, which passes audio through to the
/// context's destination. The analyser is wired downstream exactly once, on
/// the first successful source binding. Once that succeeds the `connected`
/// flag is never reset.
pub struct AudioEnvironment {
    context: AudioContext,
    analyser: RefCell<AnalyserNode>,
    connected: Cell<bool>,
    sources: RefCell<SourceCache>,
}

impl AudioEnvironment {
    pub fn new(context: AudioContext, analyser_config: AnalyserConfig) -> Result<Self> {
        Ok(Self {
            analyser: RefCell::new(AnalyserNode::new(analyser_config)?),
            context,
            connected: Cell::new(false),
            sources: RefCell::new(SourceCache::new()),
        })
    }

    pub fn context(&self) -> &AudioContext {
        &self.context
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.context.sample_rate_hz()
    }

    /// Whether the analyser has been wired to the destination
    pub fn is_connected(&self) -> bool {
        self.connected.get()
    }

    /// Length of every frequency snapshot
    pub fn frequency_bin_count(&self) -> usize {
        self.analyser.borrow().frequency_bin_count()
    }

    pub fn analyser_config(&self) -> AnalyserConfig {
        self.analyser.borrow().config().clone()
    }

    pub fn set_smoothing_time_constant(&self, value: f32) {
        self.analyser.borrow_mut().set_smoothing_time_constant(value);
    }

    /// Number of bound elements that are still alive
    pub fn source_count(&self) -> usize {
        let mut sources = self.sources.borrow_mut();
        sources.purge();
        sources.len()
    }

    /// Drop cache entries for elements that no longer exist
    pub fn purge_sources(&self) -> usize {
        let removed = self.sources.borrow_mut().purge();
        if removed > 0 {
            debug!("Reclaimed {} source node(s)", removed);
        }
        removed
    }

    /// Source node for `element`, creating and wiring it on first use.
    ///
    /// Repeated calls for the same element return the same node and have no
    /// graph side effects. Fails with `SourceConflict` if the element was
    /// wrapped outside this environment's cache. If the destination refused
    /// to attach on an earlier call, every bind retries the connection and
    /// reports its error.
    pub fn get_or_create_source(&self, element: &Arc<MediaElement>) -> Result<Arc<SourceNode>> {
        self.purge_sources();
        let cached = self.sources.borrow().get(element);
        let node = match cached {
            Some(node) => node,
            None => {
                let node = self.context.create_media_element_source(element)?;
                self.sources.borrow_mut().insert(element, Arc::clone(&node));
                node
            }
        };

        self.connect_downstream()?;
        Ok(node)
    }

    /// Wire the analyser to the destination unless already wired.
    ///
    /// The flag is raised before the destination's `attach` hook runs, so a
    /// bind nested inside the hook sees the analyser as connected. A failed
    /// attach lowers it again.
    fn connect_downstream(&self) -> Result<()> {
        if self.connected.get() {
            return Ok(());
        }

        self.analyser.borrow_mut().connect_downstream()?;
        self.connected.set(true);

        if let Err(e) = self.context.attach_destination() {
            self.analyser.borrow_mut().abort_downstream();
            self.connected.set(false);
            warn!(
                "Failed to attach {}: {}",
                self.context.destination_name(),
                e
            );
            return Err(e);
        }

        debug!("Analyser connected to {}", self.context.destination_name());
        Ok(())
    }

    /// Move pending audio from every live source through the analyser to
    /// the destination. Returns the number of mixed samples.
    pub fn pump(&self) -> Result<usize> {
        if !self.connected.get() {
            return Ok(0);
        }

        let mut mix: Vec<f32> = Vec::new();
        {
            let mut sources = self.sources.borrow_mut();
            sources.purge();

            let mut block = Vec::new();
            for node in sources.live_nodes() {
                block.clear();
                node.pull(&mut block);
                if block.len() > mix.len() {
                    mix.resize(block.len(), 0.0);
                }
                for (mixed, sample) in mix.iter_mut().zip(&block) {
                    *mixed += sample;
                }
            }
        }

        if mix.is_empty() {
            return Ok(0);
        }

        self.analyser.borrow_mut().write_time_domain(&mix);
        self.context.render(&mix)?;
        Ok(mix.len())
    }

    /// Current byte spectrum, `frequency_bin_count()` long.
    ///
    /// Analyses the window as last filled by `pump`; element queues and the
    /// destination are left alone. All zeros until the first source is bound.
    pub fn read_frequencies(&self) -> Vec<u8> {
        let mut out = vec![0; self.frequency_bin_count()];
        self.read_frequencies_into(&mut out);
        out
    }

    /// Like `read_frequencies`, writing into a caller-owned buffer
    pub fn read_frequencies_into(&self, out: &mut [u8]) {
        out.fill(0);
        if !self.connected.get() {
            return;
        }
        self.analyser.borrow_mut().byte_frequency_data(out);
    }
}
