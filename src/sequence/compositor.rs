//! Reconstructs full frames from gif patches.
//!
//! A single accumulator canvas of the animation's size is carried from frame
//! to frame. Before patch `i` is drawn the disposal of patch `i - 1` is
//! applied to it, and after drawing, the accumulator is copied out as the
//! composited frame `i`.
//!
//! Restore-to-previous is handled by replaying earlier patches onto a cleared
//! accumulator rather than by keeping snapshots. That is quadratic in the
//! number of frames for animations that use it on every frame, which is fine
//! for the frame counts gifs have in practice.

use image::{Rgba, RgbaImage};
use tracing::warn;

use super::patch::{Dimensions, Disposal, RawFramePatch};
use super::progress::{Progress, ProgressSink};
use crate::error::{Error, Result};

pub const DEFAULT_DELAY_MS: u32 = 100;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnimationMeta {
  pub width: u32,
  pub height: u32,
  pub frame_count: usize,
  pub total_duration_ms: u64,
}

impl AnimationMeta {
  pub fn new(
    dimensions: Dimensions,
    patches: &[RawFramePatch],
    default_delay_ms: u32,
  ) -> AnimationMeta {
    let total_duration_ms = patches
      .iter()
      .map(|patch| u64::from(patch.effective_delay(default_delay_ms)))
      .sum();
    AnimationMeta {
      width: dimensions.0,
      height: dimensions.1,
      frame_count: patches.len(),
      total_duration_ms,
    }
  }

  pub fn dimensions(&self) -> Dimensions {
    (self.width, self.height)
  }

  pub fn dimensions_label(&self) -> String {
    format!("{}×{}", self.width, self.height)
  }

  /// Total duration in seconds with one decimal, e.g. `2.3s`.
  pub fn duration_label(&self) -> String {
    format!("{:.1}s", self.total_duration_ms as f64 / 1000.0)
  }
}

#[derive(Debug, Clone)]
pub struct CompositedFrame {
  pub image: RgbaImage,
  pub delay_ms: u32,
  pub index: usize,
}

/// Yields one composited frame per call to `next`.
pub struct Compositor<'a> {
  patches: &'a [RawFramePatch],
  canvas: RgbaImage,
  default_delay_ms: u32,
  next: usize,
}

impl<'a> Compositor<'a> {
  pub fn new(
    meta: &AnimationMeta,
    patches: &'a [RawFramePatch],
    default_delay_ms: u32,
  ) -> Result<Compositor<'a>> {
    if patches.is_empty() {
      return Err(Error::NoFrames);
    }
    Ok(Compositor {
      patches,
      canvas: RgbaImage::from_pixel(meta.width, meta.height, TRANSPARENT),
      default_delay_ms,
      next: 0,
    })
  }

  pub fn total(&self) -> usize {
    self.patches.len()
  }

  fn dispose_before(&mut self, index: usize) {
    let patches = self.patches;
    match patches[index - 1].disposal() {
      Disposal::Unspecified | Disposal::Keep => {},
      Disposal::Background => clear(&mut self.canvas),
      // frame 0 has no earlier state to go back to
      Disposal::Previous if index > 1 => {
        clear(&mut self.canvas);
        for j in 0..index - 1 {
          // a patch drawn right after a restore-to-previous was rolled back
          // before it could stick, so it is not part of the replayed state
          let rolled_back = j > 0 && patches[j - 1].disposal() == Disposal::Previous;
          if !rolled_back {
            draw_patch(&mut self.canvas, &patches[j]);
          }
        }
      },
      Disposal::Previous => {},
    }
  }
}

impl<'a> Iterator for Compositor<'a> {
  type Item = CompositedFrame;

  fn next(&mut self) -> Option<CompositedFrame> {
    let index = self.next;
    let patches = self.patches;
    let patch = patches.get(index)?;
    self.next += 1;

    if index > 0 {
      self.dispose_before(index);
    }
    if !patch.fits_within(self.canvas.dimensions()) {
      warn!(
        "patch {} at ({}, {}) sized {}x{} exceeds the {}x{} canvas, clipping",
        index,
        patch.left(),
        patch.top(),
        patch.width(),
        patch.height(),
        self.canvas.width(),
        self.canvas.height(),
      );
    }
    draw_patch(&mut self.canvas, patch);

    Some(CompositedFrame {
      image: self.canvas.clone(),
      delay_ms: patch.effective_delay(self.default_delay_ms),
      index,
    })
  }

  fn size_hint(&self) -> (usize, Option<usize>) {
    let left = self.patches.len() - self.next;
    (left, Some(left))
  }
}

impl<'a> ExactSizeIterator for Compositor<'a> {}

pub fn composite(
  meta: &AnimationMeta,
  patches: &[RawFramePatch],
  default_delay_ms: u32,
) -> Result<Vec<CompositedFrame>> {
  Ok(Compositor::new(meta, patches, default_delay_ms)?.collect())
}

pub fn composite_with_progress<S: ProgressSink>(
  meta: &AnimationMeta,
  patches: &[RawFramePatch],
  default_delay_ms: u32,
  sink: &mut S,
) -> Result<Vec<CompositedFrame>> {
  let compositor = Compositor::new(meta, patches, default_delay_ms)?;
  let total = compositor.total();
  let mut frames = Vec::with_capacity(total);
  for frame in compositor {
    frames.push(frame);
    sink.report(Progress::new(frames.len(), total));
  }
  Ok(frames)
}

fn clear(canvas: &mut RgbaImage) {
  for pixel in canvas.pixels_mut() {
    *pixel = TRANSPARENT;
  }
}

fn draw_patch(canvas: &mut RgbaImage, patch: &RawFramePatch) {
  let (canvas_width, canvas_height) = canvas.dimensions();
  let pixels = patch.pixels();
  let row_len = patch.width() as usize * 4;

  for y in 0..patch.height() {
    let canvas_y = patch.top().saturating_add(y);
    if canvas_y >= canvas_height {
      break;
    }
    let row = &pixels[y as usize * row_len..(y as usize + 1) * row_len];
    for (x, src) in row.chunks_exact(4).enumerate() {
      let canvas_x = patch.left().saturating_add(x as u32);
      if canvas_x >= canvas_width {
        break;
      }
      blend(canvas.get_pixel_mut(canvas_x, canvas_y), [src[0], src[1], src[2], src[3]]);
    }
  }
}

/// Source-over on straight (non premultiplied) alpha.
fn blend(dst: &mut Rgba<u8>, src: [u8; 4]) {
  let src_alpha = u32::from(src[3]);
  match src_alpha {
    0 => {},
    255 => dst.0 = src,
    _ => {
      let dst_alpha = u32::from(dst.0[3]);
      let dst_weight = dst_alpha * (255 - src_alpha);
      let src_weight = src_alpha * 255;
      let out_alpha = src_weight + dst_weight;
      for c in 0..3 {
        let value = u32::from(src[c]) * src_weight + u32::from(dst.0[c]) * dst_weight;
        dst.0[c] = ((value + out_alpha / 2) / out_alpha) as u8;
      }
      dst.0[3] = ((out_alpha + 127) / 255) as u8;
    },
  }
}
