pub mod compositor;
pub mod decoder;
pub mod image_formats;
pub mod patch;
pub mod progress;

use tracing::{debug, info};

use self::compositor::{AnimationMeta, CompositedFrame, Compositor};
use self::patch::Decoded;
use self::progress::{Progress, ProgressSink};
use crate::error::Result;
use crate::timestamp::{elapsed_ms, timestamp};

/// The composited frames of one gif.
#[derive(Debug)]
pub struct Sequence {
  pub meta: AnimationMeta,
  pub frames: Vec<CompositedFrame>,
}

impl Sequence {
  /// Decodes and composites `bytes` in one go.
  pub fn new<S: ProgressSink>(
    bytes: &[u8],
    default_delay_ms: u32,
    sink: &mut S,
  ) -> Result<Sequence> {
    let Decoded { dimensions, patches } = decode_timed(bytes)?;
    let meta = AnimationMeta::new(dimensions, &patches, default_delay_ms);

    let composite_start = timestamp();
    let frames = compositor::composite_with_progress(
      &meta,
      &patches,
      default_delay_ms,
      sink,
    )?;
    debug!("composite: {:.1}ms", elapsed_ms(composite_start));

    Ok(Sequence { meta, frames })
  }

  /// Like `new`, but hands control back to the runtime every `yield_every`
  /// frames so a long compositing pass doesn't starve other requests.
  pub async fn composite_cooperatively<S: ProgressSink + Send>(
    bytes: &[u8],
    default_delay_ms: u32,
    yield_every: usize,
    sink: &mut S,
  ) -> Result<Sequence> {
    let yield_every = yield_every.max(1);
    let Decoded { dimensions, patches } = decode_timed(bytes)?;
    let meta = AnimationMeta::new(dimensions, &patches, default_delay_ms);
    info!(
      "compositing {} frames on a {} canvas, {}",
      meta.frame_count,
      meta.dimensions_label(),
      meta.duration_label(),
    );

    let composite_start = timestamp();
    let compositor = Compositor::new(&meta, &patches, default_delay_ms)?;
    let total = compositor.total();
    let mut frames = Vec::with_capacity(total);
    sink.report(Progress::new(0, total));
    for frame in compositor {
      frames.push(frame);
      let progress = Progress::new(frames.len(), total);
      sink.report(progress);
      if progress.current % yield_every == 0 && !progress.is_done() {
        rocket::tokio::task::yield_now().await;
      }
    }
    debug!("composite: {:.1}ms", elapsed_ms(composite_start));

    Ok(Sequence { meta, frames })
  }

  pub fn len(&self) -> usize {
    self.frames.len()
  }

  pub fn is_empty(&self) -> bool {
    self.frames.is_empty()
  }
}

fn decode_timed(bytes: &[u8]) -> Result<Decoded> {
  let decode_start = timestamp();
  let decoded = decoder::decode(bytes)?;
  debug!(
    "decode: {:.1}ms, {} patches",
    elapsed_ms(decode_start),
    decoded.patches.len(),
  );
  Ok(decoded)
}
