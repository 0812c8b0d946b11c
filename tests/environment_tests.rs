//! End-to-end behaviour of the shared analysis environment.

use std::cell::{Cell, RefCell};
use std::f32::consts::PI;
use std::rc::{Rc, Weak};
use std::sync::Arc;
use std::thread;

use lyricscope::audio::{AudioContext, AudioEnvironment, Destination};
use lyricscope::params::{AnalyserConfig, OutputConfig, VisualizerConfig};
use lyricscope::{AudioError, EnvironmentRegistry, MediaElement, Result, Visualizer};

/// Destination that counts how often it is wired up and fed
struct CountingDestination {
    attaches: Rc<Cell<usize>>,
    rendered: Rc<Cell<usize>>,
}

impl Destination for CountingDestination {
    fn name(&self) -> &str {
        "counting"
    }

    fn sample_rate_hz(&self) -> u32 {
        44100
    }

    fn attach(&mut self) -> Result<()> {
        self.attaches.set(self.attaches.get() + 1);
        Ok(())
    }

    fn render(&mut self, samples: &[f32]) -> Result<()> {
        self.rendered.set(self.rendered.get() + samples.len());
        Ok(())
    }
}

fn counting_registry() -> (EnvironmentRegistry, Rc<Cell<usize>>, Rc<Cell<usize>>) {
    let attaches = Rc::new(Cell::new(0));
    let rendered = Rc::new(Cell::new(0));
    let (a, r) = (Rc::clone(&attaches), Rc::clone(&rendered));
    let registry = EnvironmentRegistry::with_factory(AnalyserConfig::default(), move || {
        Ok(AudioContext::with_destination(Box::new(CountingDestination {
            attaches: Rc::clone(&a),
            rendered: Rc::clone(&r),
        })))
    });
    (registry, attaches, rendered)
}

fn tone(freq_hz: f32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| 0.5 * (2.0 * PI * freq_hz * i as f32 / 44100.0).sin())
        .collect()
}

#[test]
fn test_bind_read_rebind_scenario() {
    let (registry, attaches, _) = counting_registry();
    let env = registry.get_environment().unwrap();
    assert!(!env.is_connected());

    let a = MediaElement::new("a");
    let node_a = env.get_or_create_source(&a).unwrap();
    assert!(env.is_connected());

    let snapshot = env.read_frequencies();
    assert_eq!(snapshot.len(), env.frequency_bin_count());

    let again = env.get_or_create_source(&a).unwrap();
    assert!(Arc::ptr_eq(&node_a, &again));

    let b = MediaElement::new("b");
    let node_b = env.get_or_create_source(&b).unwrap();
    assert!(!Arc::ptr_eq(&node_a, &node_b));

    assert_eq!(attaches.get(), 1);
    assert_eq!(env.context().sources_created(), 2);
}

#[test]
fn test_downstream_connection_happens_once_for_many_sources() {
    let (registry, attaches, _) = counting_registry();
    let env = registry.get_environment().unwrap();

    let elements: Vec<_> = (0..16)
        .map(|i| MediaElement::new(format!("track {}", i)))
        .collect();
    for element in &elements {
        env.get_or_create_source(element).unwrap();
        env.get_or_create_source(element).unwrap();
    }

    assert_eq!(attaches.get(), 1);
    assert_eq!(env.source_count(), 16);
}

#[test]
fn test_identical_labels_are_distinct_elements() {
    let (registry, _, _) = counting_registry();
    let env = registry.get_environment().unwrap();

    let first = MediaElement::new("same.flac");
    let second = MediaElement::new("same.flac");
    let a = env.get_or_create_source(&first).unwrap();
    let b = env.get_or_create_source(&second).unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
    assert_ne!(a.element_id(), b.element_id());
}

#[test]
fn test_environment_identity_across_consumers() {
    let (registry, attaches, _) = counting_registry();
    let element = MediaElement::new("song");

    // Simulate a view being rebuilt several times
    let mut environments = Vec::new();
    for _ in 0..3 {
        let visualizer = Visualizer::new(&registry, VisualizerConfig::default()).unwrap();
        visualizer.attach(&element).unwrap();
        environments.push(Rc::clone(visualizer.environment()));
    }

    assert!(environments.windows(2).all(|w| Rc::ptr_eq(&w[0], &w[1])));
    assert_eq!(attaches.get(), 1);
    assert_eq!(environments[0].context().sources_created(), 1);
}

#[test]
fn test_released_element_is_reclaimed() {
    let (registry, _, _) = counting_registry();
    let env = registry.get_environment().unwrap();

    let keep = MediaElement::new("keep");
    let release = MediaElement::new("release");
    let weak = Arc::downgrade(&release);
    env.get_or_create_source(&keep).unwrap();
    let node = env.get_or_create_source(&release).unwrap();

    drop(release);
    assert!(weak.upgrade().is_none());
    assert!(!node.is_live());
    assert_eq!(env.purge_sources(), 1);
    assert_eq!(env.source_count(), 1);

    // Reading after reclamation still works
    keep.push_samples(&tone(440.0, 1024));
    assert_eq!(env.read_frequencies().len(), env.frequency_bin_count());
}

#[test]
fn test_wrap_outside_cache_conflicts() {
    let (registry, attaches, _) = counting_registry();
    let env = registry.get_environment().unwrap();
    let element = MediaElement::new("bypassed");

    env.context().create_media_element_source(&element).unwrap();
    let result = env.get_or_create_source(&element);

    assert!(matches!(result, Err(AudioError::SourceConflict(id)) if id == element.id()));
    assert_eq!(attaches.get(), 0);
    assert!(!env.is_connected());
}

#[test]
fn test_zero_snapshot_before_binding() {
    let (registry, _, rendered) = counting_registry();
    let env = registry.get_environment().unwrap();

    let snapshot = env.read_frequencies();
    assert_eq!(snapshot.len(), AnalyserConfig::default().fft_size / 2);
    assert!(snapshot.iter().all(|&b| b == 0));
    assert_eq!(rendered.get(), 0);
}

#[test]
fn test_audio_from_playback_thread_reaches_destination() {
    let (registry, _, rendered) = counting_registry();
    let env = registry.get_environment().unwrap();
    let element = MediaElement::new("threaded");
    env.get_or_create_source(&element).unwrap();

    let producer = Arc::clone(&element);
    thread::spawn(move || producer.push_samples(&tone(2000.0, 2048)))
        .join()
        .unwrap();

    assert_eq!(env.pump().unwrap(), 2048);
    let snapshot = env.read_frequencies();
    assert_eq!(rendered.get(), 2048);
    assert!(snapshot.iter().any(|&b| b > 0));
}

#[test]
fn test_failed_construction_reports_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let output = OutputConfig::wav(dir.path().join("missing").join("out.wav"));
    let registry = EnvironmentRegistry::new(output, AnalyserConfig::default());

    assert!(matches!(
        registry.get_environment(),
        Err(AudioError::ContextUnavailable(_))
    ));
    assert!(!registry.is_initialized());
    assert!(Visualizer::new(&registry, VisualizerConfig::default()).is_err());
}

#[test]
fn test_wav_backend_records_the_mix() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("mix.wav");
    let registry = EnvironmentRegistry::new(OutputConfig::wav(&path), AnalyserConfig::default());
    let env = registry.get_environment().unwrap();

    let element = MediaElement::new("song");
    env.get_or_create_source(&element).unwrap();
    element.push_samples(&tone(440.0, 500));
    env.pump().unwrap();

    let reader = hound::WavReader::open(&path).unwrap();
    assert_eq!(reader.len(), 500);
}

/// Destination whose first `attach` fails, as a device that is briefly busy
struct FlakyDestination {
    attempts: Rc<Cell<usize>>,
}

impl Destination for FlakyDestination {
    fn name(&self) -> &str {
        "flaky"
    }

    fn sample_rate_hz(&self) -> u32 {
        44100
    }

    fn attach(&mut self) -> Result<()> {
        self.attempts.set(self.attempts.get() + 1);
        if self.attempts.get() == 1 {
            return Err(AudioError::ContextUnavailable("device busy".to_string()));
        }
        Ok(())
    }

    fn render(&mut self, _samples: &[f32]) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_rebind_after_failed_attach_connects() {
    let attempts = Rc::new(Cell::new(0));
    let context = AudioContext::with_destination(Box::new(FlakyDestination {
        attempts: Rc::clone(&attempts),
    }));
    let env = AudioEnvironment::new(context, AnalyserConfig::default()).unwrap();
    let element = MediaElement::new("song");

    assert!(matches!(
        env.get_or_create_source(&element),
        Err(AudioError::ContextUnavailable(_))
    ));
    assert!(!env.is_connected());

    // The element is already cached, so this is a cache hit
    env.get_or_create_source(&element).unwrap();
    assert!(env.is_connected());
    assert_eq!(attempts.get(), 2);
    assert_eq!(env.context().sources_created(), 1);

    element.push_samples(&tone(1000.0, 2048));
    assert_eq!(env.pump().unwrap(), 2048);
    assert!(env.read_frequencies().iter().any(|&b| b > 0));

    env.get_or_create_source(&element).unwrap();
    assert_eq!(attempts.get(), 2);
}

/// Destination whose `attach` binds more elements into the same environment
struct ReentrantDestination {
    env: Rc<RefCell<Weak<AudioEnvironment>>>,
    elements: Vec<Arc<MediaElement>>,
    attaches: Rc<Cell<usize>>,
}

impl Destination for ReentrantDestination {
    fn name(&self) -> &str {
        "reentrant"
    }

    fn sample_rate_hz(&self) -> u32 {
        44100
    }

    fn attach(&mut self) -> Result<()> {
        self.attaches.set(self.attaches.get() + 1);
        if let Some(env) = self.env.borrow().upgrade() {
            for element in &self.elements {
                env.get_or_create_source(element)?;
            }
        }
        Ok(())
    }

    fn render(&mut self, _samples: &[f32]) -> Result<()> {
        Ok(())
    }
}

#[test]
fn test_bind_from_inside_attach() {
    let first = MediaElement::new("first");
    let second = MediaElement::new("second");
    let slot = Rc::new(RefCell::new(Weak::new()));
    let attaches = Rc::new(Cell::new(0));

    let context = AudioContext::with_destination(Box::new(ReentrantDestination {
        env: Rc::clone(&slot),
        elements: vec![Arc::clone(&second), Arc::clone(&first)],
        attaches: Rc::clone(&attaches),
    }));
    let env = Rc::new(AudioEnvironment::new(context, AnalyserConfig::default()).unwrap());
    *slot.borrow_mut() = Rc::downgrade(&env);

    let node = env.get_or_create_source(&first).unwrap();

    assert_eq!(attaches.get(), 1);
    assert!(env.is_connected());
    assert_eq!(env.source_count(), 2);
    assert_eq!(env.context().sources_created(), 2);
    assert!(Arc::ptr_eq(&node, &env.get_or_create_source(&first).unwrap()));

    second.push_samples(&[0.25; 64]);
    assert_eq!(env.pump().unwrap(), 64);
}
