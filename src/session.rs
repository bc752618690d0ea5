use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::export;
use crate::sequence::compositor::{AnimationMeta, CompositedFrame};
use crate::sequence::progress::{Progress, ProgressSink, ProgressTracker};
use crate::sequence::Sequence;

/// A loaded gif and everything derived from it.
#[derive(Debug)]
pub struct Session {
  pub source_name: String,
  pub base_name: String,
  sequence: Sequence,
}

impl Session {
  pub fn new(source_name: &str, sequence: Sequence) -> Session {
    Session {
      source_name: source_name.to_owned(),
      base_name: export::base_name(source_name),
      sequence,
    }
  }

  pub fn meta(&self) -> &AnimationMeta {
    &self.sequence.meta
  }

  pub fn frames(&self) -> &[CompositedFrame] {
    &self.sequence.frames
  }

  pub fn summary(&self) -> Summary {
    let meta = self.meta();
    let frames = self
      .frames()
      .iter()
      .map(|frame| FrameSummary {
        index: frame.index,
        badge: format!("{:03}", frame.index + 1),
        delay_ms: frame.delay_ms,
        file_name: export::frame_file_name(&self.base_name, frame.index),
        route: frame_route(frame.index),
      })
      .collect();

    Summary {
      source: self.source_name.clone(),
      width: meta.width,
      height: meta.height,
      dimensions: meta.dimensions_label(),
      frame_count: meta.frame_count,
      total_duration_ms: meta.total_duration_ms,
      duration: meta.duration_label(),
      frames,
    }
  }
}

/// Route serving the frame at zero based `index`.
pub fn frame_route(index: usize) -> String {
  format!("/frames/{}", index + 1)
}

#[derive(Debug, Serialize)]
pub struct FrameSummary {
  pub index: usize,
  pub badge: String,
  pub delay_ms: u32,
  pub file_name: String,
  pub route: String,
}

#[derive(Debug, Serialize)]
pub struct Summary {
  pub source: String,
  pub width: u32,
  pub height: u32,
  pub dimensions: String,
  pub frame_count: usize,
  pub total_duration_ms: u64,
  pub duration: String,
  pub frames: Vec<FrameSummary>,
}

/// Holds the current session. Each load or reset starts a new generation,
/// and only the load of the latest generation may install its result.
#[derive(Debug, Default)]
pub struct SessionStore {
  session: Mutex<Option<Arc<Session>>>,
  generation: AtomicU64,
  progress: ProgressTracker,
}

impl SessionStore {
  /// Releases the current session before a new source is decoded.
  pub fn begin_load(&self) -> u64 {
    let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
    let released = self.lock().take();
    if let Some(session) = released {
      debug!(
        "releasing {} frames of {}",
        session.frames().len(),
        session.source_name,
      );
    }
    self.progress.begin();
    generation
  }

  pub fn install(&self, generation: u64, session: Session) -> Result<()> {
    let mut current = self.lock();
    if !self.is_current(generation) {
      return Err(Error::Superseded);
    }
    info!(
      "loaded {}: {} frames",
      session.source_name,
      session.frames().len(),
    );
    *current = Some(Arc::new(session));
    self.progress.finish();
    Ok(())
  }

  /// Drops whatever a failed load left behind, unless a newer one took over.
  pub fn abandon(&self, generation: u64) {
    let mut current = self.lock();
    if self.is_current(generation) {
      current.take();
      self.progress.clear();
    }
  }

  pub fn reset(&self) {
    self.generation.fetch_add(1, Ordering::SeqCst);
    self.lock().take();
    self.progress.clear();
  }

  pub fn with_session<T, F>(&self, f: F) -> Result<T>
  where
    F: FnOnce(&Session) -> T,
  {
    self.lock().as_deref().map(f).ok_or(Error::NoSession)
  }

  /// Shares the current session without keeping the store locked, for work
  /// that takes a while such as encoding.
  pub fn current(&self) -> Result<Arc<Session>> {
    self.lock().as_ref().cloned().ok_or(Error::NoSession)
  }

  pub fn progress(&self) -> &ProgressTracker {
    &self.progress
  }

  /// Progress sink for the load of `generation`, silenced once it is stale.
  pub fn progress_sink(&self, generation: u64) -> LoadProgress<'_> {
    LoadProgress {
      store: self,
      generation,
    }
  }

  fn is_current(&self, generation: u64) -> bool {
    self.generation.load(Ordering::SeqCst) == generation
  }

  fn lock(&self) -> MutexGuard<'_, Option<Arc<Session>>> {
    self.session.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

pub struct LoadProgress<'a> {
  store: &'a SessionStore,
  generation: u64,
}

impl<'a> ProgressSink for LoadProgress<'a> {
  fn report(&mut self, progress: Progress) {
    if self.store.is_current(self.generation) {
      (&self.store.progress).report(progress);
    }
  }
}
