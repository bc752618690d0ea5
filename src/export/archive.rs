use std::io::{Cursor, Write};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::ExportedFile;
use crate::error::Result;

/// Packs named buffers into one downloadable file.
pub trait Archiver {
  fn bundle(&self, files: &[ExportedFile]) -> Result<Vec<u8>>;
}

/// Writes a zip archive. Entries are stored, png data is already deflated.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZipArchiver;

impl Archiver for ZipArchiver {
  fn bundle(&self, files: &[ExportedFile]) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);
    for file in files {
      writer.start_file(file.name.as_str(), options)?;
      writer.write_all(&file.bytes)?;
    }
    Ok(writer.finish()?.into_inner())
  }
}
