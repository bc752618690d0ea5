use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
  GIF87a,
  GIF89a,
}

impl SourceFormat {
  pub fn sniff(bytes: &[u8]) -> Result<SourceFormat> {
    match bytes.get(..6) {
      Some(b"GIF87a") => Ok(SourceFormat::GIF87a),
      Some(b"GIF89a") => Ok(SourceFormat::GIF89a),
      _ => Err(Error::UnsupportedFormat),
    }
  }
}
