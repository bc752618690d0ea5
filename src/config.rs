use std::path::PathBuf;

use rocket::data::{ByteUnit, Limits, ToByteUnit};

use crate::sequence::compositor::DEFAULT_DELAY_MS;

/// Application settings, read from `Rocket.toml` and `ROCKET_*` variables
/// next to Rocket's own configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// Gif to load at startup.
  pub sample: Option<PathBuf>,
  pub default_delay_ms: u32,
  /// Frames to composite between yields to the runtime.
  pub yield_every: usize,
  /// Spacing between individual downloads when the archive can't be built.
  pub stagger_ms: u64,
}

impl Default for Settings {
  fn default() -> Settings {
    Settings {
      sample: None,
      default_delay_ms: DEFAULT_DELAY_MS,
      yield_every: 2,
      stagger_ms: 100,
    }
  }
}

impl Settings {
  pub fn yield_every(&self) -> usize {
    self.yield_every.max(1)
  }
}

pub fn upload_limit(limits: &Limits) -> ByteUnit {
  limits.get("gif").unwrap_or_else(|| 32.mebibytes())
}
