pub mod archive;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use rayon::prelude::*;
use tracing::{debug, warn};

pub use self::archive::{Archiver, ZipArchiver};

use crate::error::{Error, Result};
use crate::sequence::compositor::CompositedFrame;
use crate::session::{frame_route, Session};
use crate::timestamp::{elapsed_ms, timestamp};

const FALLBACK_BASE_NAME: &str = "frames";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
  pub name: String,
  pub bytes: Vec<u8>,
}

/// One single-frame download the client should start after `delay_ms`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledExport {
  pub file_name: String,
  pub route: String,
  pub delay_ms: u64,
}

#[derive(Debug)]
pub enum BulkExport {
  /// Nothing loaded, nothing to export.
  Empty,
  Archive(ExportedFile),
  /// The archive could not be built, download frame by frame instead.
  Individual(Vec<ScheduledExport>),
}

/// The file name without its extension, used as prefix for exports.
pub fn base_name(file_name: &str) -> String {
  let file_name = file_name
    .rsplit(|c: char| c == '/' || c == '\\')
    .next()
    .unwrap_or(file_name);
  // only a dot followed by at least one character starts an extension
  let stem = match file_name.rfind('.') {
    Some(dot) if dot + 1 < file_name.len() => &file_name[..dot],
    _ => file_name,
  };
  let stem: String = stem
    .chars()
    .filter(|c| !c.is_control() && *c != '"')
    .collect();
  if stem.is_empty() {
    FALLBACK_BASE_NAME.to_owned()
  } else {
    stem
  }
}

pub fn frame_file_name(base_name: &str, index: usize) -> String {
  format!("{}_{:03}.png", base_name, index + 1)
}

pub fn archive_file_name(base_name: &str) -> String {
  format!("{}_frames.zip", base_name)
}

pub fn encode_png(frame: &CompositedFrame) -> Result<Vec<u8>> {
  let mut bytes = Vec::new();
  PngEncoder::new(&mut bytes).write_image(
    frame.image.as_raw(),
    frame.image.width(),
    frame.image.height(),
    ExtendedColorType::Rgba8,
  )?;
  Ok(bytes)
}

pub fn export_frame(session: &Session, index: usize) -> Result<ExportedFile> {
  let frames = session.frames();
  let frame = frames.get(index).ok_or(Error::FrameOutOfRange {
    number: index + 1,
    count: frames.len(),
  })?;
  Ok(ExportedFile {
    name: frame_file_name(&session.base_name, index),
    bytes: encode_png(frame)?,
  })
}

/// Bundles every frame into one archive, or schedules single downloads
/// `stagger_ms` apart when bundling fails.
pub fn export_all<A: Archiver + ?Sized>(
  base_name: &str,
  frames: &[CompositedFrame],
  archiver: &A,
  stagger_ms: u64,
) -> BulkExport {
  if frames.is_empty() {
    return BulkExport::Empty;
  }

  match bundle(base_name, frames, archiver) {
    Ok(archive) => BulkExport::Archive(archive),
    Err(err) => {
      warn!(
        "bundling {} frames failed, falling back to single downloads: {}",
        frames.len(),
        err,
      );
      let scheduled = frames
        .iter()
        .enumerate()
        .map(|(i, frame)| ScheduledExport {
          file_name: frame_file_name(base_name, frame.index),
          route: frame_route(frame.index),
          delay_ms: i as u64 * stagger_ms,
        })
        .collect();
      BulkExport::Individual(scheduled)
    },
  }
}

fn bundle<A: Archiver + ?Sized>(
  base_name: &str,
  frames: &[CompositedFrame],
  archiver: &A,
) -> Result<ExportedFile> {
  let encode_start = timestamp();
  let files: Result<Vec<ExportedFile>> = frames
    .par_iter()
    .map(|frame| {
      Ok(ExportedFile {
        name: frame_file_name(base_name, frame.index),
        bytes: encode_png(frame)?,
      })
    })
    .collect();
  let files = files?;
  debug!("png encode: {:.1}ms", elapsed_ms(encode_start));

  let bytes = archiver.bundle(&files)?;
  Ok(ExportedFile {
    name: archive_file_name(base_name),
    bytes,
  })
}
