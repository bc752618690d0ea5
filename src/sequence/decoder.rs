use tracing::trace;

use super::image_formats::SourceFormat;
use super::patch::{Decoded, RawFramePatch};
use crate::error::{Error, Result};

/// Gif delays are stored in hundredths of a second.
const DELAY_UNIT_MS: u32 = 10;

/// Decodes the raw, uncomposited patches of a gif.
pub fn decode(bytes: &[u8]) -> Result<Decoded> {
  let format = SourceFormat::sniff(bytes)?;

  let mut options = gif::DecodeOptions::new();
  options.set_color_output(gif::ColorOutput::RGBA);
  let mut decoder = options.read_info(bytes)?;
  let dimensions = (u32::from(decoder.width()), u32::from(decoder.height()));

  let mut patches = Vec::new();
  while let Some(frame) = decoder.read_next_frame()? {
    trace!(
      "frame {}: {}x{} at ({}, {}), dispose {:?}, delay {}",
      patches.len(),
      frame.width,
      frame.height,
      frame.left,
      frame.top,
      frame.dispose,
      frame.delay,
    );
    let patch = RawFramePatch::new(
      frame.buffer.to_vec(),
      u32::from(frame.width),
      u32::from(frame.height),
      u32::from(frame.left),
      u32::from(frame.top),
    )?
    .with_disposal(frame.dispose.into())
    .with_delay(u32::from(frame.delay) * DELAY_UNIT_MS);
    patches.push(patch);
  }

  if patches.is_empty() {
    return Err(Error::NoFrames);
  }
  trace!("{:?} with {} frames", format, patches.len());

  Ok(Decoded {
    dimensions,
    patches,
  })
}
