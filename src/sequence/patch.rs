use crate::error::{Error, Result};

pub type Dimensions = (u32, u32);

/// What happens to the accumulator before the next patch is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposal {
  #[default]
  Unspecified,
  Keep,
  Background,
  Previous,
}

impl From<gif::DisposalMethod> for Disposal {
  fn from(method: gif::DisposalMethod) -> Disposal {
    match method {
      gif::DisposalMethod::Any => Disposal::Unspecified,
      gif::DisposalMethod::Keep => Disposal::Keep,
      gif::DisposalMethod::Background => Disposal::Background,
      gif::DisposalMethod::Previous => Disposal::Previous,
    }
  }
}

/// The changed region of one frame, as handed over by the decoder.
/// Read-only once built, so the buffer always matches the dimensions.
#[derive(Debug, Clone)]
pub struct RawFramePatch {
  pixels: Vec<u8>,
  width: u32,
  height: u32,
  left: u32,
  top: u32,
  disposal: Disposal,
  delay_ms: u32,
}

impl RawFramePatch {
  pub fn new(
    pixels: Vec<u8>,
    width: u32,
    height: u32,
    left: u32,
    top: u32,
  ) -> Result<RawFramePatch> {
    let expected = width as usize * height as usize * 4;
    if pixels.len() != expected {
      return Err(Error::PatchSize {
        expected,
        actual: pixels.len(),
      });
    }
    Ok(RawFramePatch {
      pixels,
      width,
      height,
      left,
      top,
      disposal: Disposal::Unspecified,
      delay_ms: 0,
    })
  }

  pub fn with_disposal(mut self, disposal: Disposal) -> RawFramePatch {
    self.disposal = disposal;
    self
  }

  pub fn with_delay(mut self, delay_ms: u32) -> RawFramePatch {
    self.delay_ms = delay_ms;
    self
  }

  /// RGBA, row major, `width * height * 4` bytes.
  pub fn pixels(&self) -> &[u8] {
    &self.pixels
  }

  pub fn width(&self) -> u32 {
    self.width
  }

  pub fn height(&self) -> u32 {
    self.height
  }

  pub fn left(&self) -> u32 {
    self.left
  }

  pub fn top(&self) -> u32 {
    self.top
  }

  pub fn disposal(&self) -> Disposal {
    self.disposal
  }

  /// Zero when the source carried no delay.
  pub fn delay_ms(&self) -> u32 {
    self.delay_ms
  }

  /// The delay to display this frame for, substituting `default_ms` for a
  /// missing one.
  pub fn effective_delay(&self, default_ms: u32) -> u32 {
    if self.delay_ms == 0 {
      default_ms
    } else {
      self.delay_ms
    }
  }

  pub fn fits_within(&self, dimensions: Dimensions) -> bool {
    let right = self.left.checked_add(self.width);
    let bottom = self.top.checked_add(self.height);
    matches!(right, Some(right) if right <= dimensions.0)
      && matches!(bottom, Some(bottom) if bottom <= dimensions.1)
  }
}

/// Everything the decoder produced for one gif.
#[derive(Debug)]
pub struct Decoded {
  pub dimensions: Dimensions,
  pub patches: Vec<RawFramePatch>,
}
