use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Progress {
  pub current: usize,
  pub total: usize,
}

impl Progress {
  pub fn new(current: usize, total: usize) -> Progress {
    Progress { current, total }
  }

  pub fn percent(&self) -> f32 {
    if self.total == 0 {
      return 0.0;
    }
    self.current as f32 / self.total as f32 * 100.0
  }

  pub fn label(&self) -> String {
    format!("Frame {} of {}", self.current, self.total)
  }

  pub fn is_done(&self) -> bool {
    self.total > 0 && self.current >= self.total
  }
}

/// Receives a report after every composited frame.
pub trait ProgressSink {
  fn report(&mut self, progress: Progress);
}

impl<F> ProgressSink for F
where
  F: FnMut(Progress),
{
  fn report(&mut self, progress: Progress) {
    (*self)(progress)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressReport {
  pub current: usize,
  pub total: usize,
  pub percent: f32,
  pub label: String,
  pub active: bool,
}

/// Progress of the load in flight, shared with `GET /progress`.
#[derive(Debug, Default)]
pub struct ProgressTracker {
  state: Mutex<(Progress, bool)>,
}

impl ProgressTracker {
  pub fn begin(&self) {
    *self.lock() = (Progress::default(), true);
  }

  pub fn finish(&self) {
    self.lock().1 = false;
  }

  pub fn clear(&self) {
    *self.lock() = (Progress::default(), false);
  }

  pub fn snapshot(&self) -> ProgressReport {
    let (progress, active) = *self.lock();
    ProgressReport {
      current: progress.current,
      total: progress.total,
      percent: progress.percent(),
      label: progress.label(),
      active,
    }
  }

  fn lock(&self) -> std::sync::MutexGuard<'_, (Progress, bool)> {
    self.state.lock().unwrap_or_else(PoisonError::into_inner)
  }
}

impl ProgressSink for &ProgressTracker {
  fn report(&mut self, progress: Progress) {
    self.lock().0 = progress;
  }
}
