use std::io;
use std::path::PathBuf;

use rocket::data::ByteUnit;
use rocket::http::Status;
use rocket::request::Request;
use rocket::response::{self, status::Custom, Responder};
use rocket::serde::json::Json;

pub type Result<T> = std::result::Result<T, Error>;

/// Pipeline and export errors
#[derive(thiserror::Error, Debug)]
pub enum Error {
  #[error("could not decode gif: {0}")]
  Decode(#[from] gif::DecodingError),

  #[error("no frames found in gif")]
  NoFrames,

  #[error("unsupported image format, expected a gif")]
  UnsupportedFormat,

  #[error("patch buffer holds {actual} bytes, expected {expected}")]
  PatchSize { expected: usize, actual: usize },

  #[error("image error: {0}")]
  Image(#[from] image::ImageError),

  #[error("archive error: {0}")]
  Archive(#[from] zip::result::ZipError),

  #[error("io error: {0}")]
  Io(#[from] io::Error),

  /// `number` counts from 1, the way frames are presented.
  #[error("frame {number} out of range, {count} frames loaded")]
  FrameOutOfRange { number: usize, count: usize },

  #[error("upload exceeds the {limit} limit")]
  TooLarge { limit: ByteUnit },

  #[error("no gif loaded")]
  NoSession,

  /// A newer load or a reset started while this one was compositing.
  #[error("load was superseded")]
  Superseded,

  #[error("could not read sample {}: {source}", .path.display())]
  Sample {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

impl Error {
  pub fn status(&self) -> Status {
    match self {
      Error::Decode(_) | Error::NoFrames | Error::PatchSize { .. } => {
        Status::UnprocessableEntity
      },
      Error::UnsupportedFormat => Status::UnsupportedMediaType,
      Error::TooLarge { .. } => Status::PayloadTooLarge,
      Error::FrameOutOfRange { .. } | Error::NoSession => Status::NotFound,
      Error::Superseded => Status::Conflict,
      Error::Image(_) | Error::Archive(_) | Error::Io(_) | Error::Sample { .. } => {
        Status::InternalServerError
      },
    }
  }
}

#[derive(Debug, Serialize)]
struct ErrorBody {
  error: String,
}

impl<'r> Responder<'r, 'static> for Error {
  fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
    let status = self.status();
    if status == Status::InternalServerError {
      tracing::error!("{} {}: {}", req.method(), req.uri(), self);
    } else {
      tracing::warn!("{} {}: {}", req.method(), req.uri(), self);
    }
    Custom(status, Json(ErrorBody { error: self.to_string() })).respond_to(req)
  }
}
