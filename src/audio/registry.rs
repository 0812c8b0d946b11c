//! Registry holding the single shared `AudioEnvironment`.
//!
//! Consumers receive a registry by reference and ask it for the environment;
//! they never build one themselves. The registry outlives the consumers, so a
//! visualizer that is torn down and rebuilt (navigation, reload) gets the
//! same environment back and the audio graph is not re-wired.
//!
//! The environment is `!Send`: it belongs to the thread that owns the audio
//! output, and `EnvironmentRegistry::shared()` is scoped to that thread.

use std::cell::RefCell;
use std::rc::Rc;
use tracing::{info, warn};

use super::context::AudioContext;
use super::system::AudioEnvironment;
use crate::error::Result;
use crate::params::{AnalyserConfig, OutputConfig};

type ContextFactory = Box<dyn Fn() -> Result<AudioContext>>;

thread_local! {
    static SHARED: Rc<EnvironmentRegistry> = Rc::new(EnvironmentRegistry::new(
        OutputConfig::default(),
        AnalyserConfig::default(),
    ));
}

pub struct EnvironmentRegistry {
    factory: ContextFactory,
    analyser: AnalyserConfig,
    slot: RefCell<Option<Rc<AudioEnvironment>>>,
}

impl EnvironmentRegistry {
    /// Registry that opens its context from `output` on first access
    pub fn new(output: OutputConfig, analyser: AnalyserConfig) -> Self {
        Self::with_factory(analyser, move || AudioContext::open(&output))
    }

    /// Registry with a custom context constructor
    pub fn with_factory(
        analyser: AnalyserConfig,
        factory: impl Fn() -> Result<AudioContext> + 'static,
    ) -> Self {
        Self {
            factory: Box::new(factory),
            analyser,
            slot: RefCell::new(None),
        }
    }

    /// This thread's shared registry (default device output)
    pub fn shared() -> Rc<Self> {
        SHARED.with(Rc::clone)
    }

    /// The shared environment, built on first call.
    ///
    /// Construction is attempted once per call and never automatically. A
    /// failure leaves the registry empty, so a later call attempts it afresh.
    pub fn get_environment(&self) -> Result<Rc<AudioEnvironment>> {
        if let Some(environment) = self.slot.borrow().as_ref() {
            return Ok(Rc::clone(environment));
        }

        let context = match (self.factory)() {
            Ok(context) => context,
            Err(e) => {
                warn!("Audio environment unavailable: {}", e);
                return Err(e);
            }
        };
        let environment = Rc::new(AudioEnvironment::new(context, self.analyser.clone())?);
        info!(
            "Audio environment ready: {} @ {}Hz, {} bins",
            environment.context().destination_name(),
            environment.sample_rate_hz(),
            environment.frequency_bin_count()
        );

        // The factory may have re-entered us; keep whichever landed first
        let mut slot = self.slot.borrow_mut();
        Ok(Rc::clone(slot.get_or_insert(environment)))
    }

    /// Whether the environment has been built
    pub fn is_initialized(&self) -> bool {
        self.slot.borrow().is_some()
    }
}

/// The environment from this thread's shared registry
pub fn get_environment() -> Result<Rc<AudioEnvironment>> {
    EnvironmentRegistry::shared().get_environment()
}
