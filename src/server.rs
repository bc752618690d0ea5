use rocket::data::{Data, Limits};
use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use rocket::http::Header;
use rocket::response::status::NoContent;
use rocket::serde::json::Json;
use rocket::{Build, Orbit, Rocket, State};
use tracing::{error, info};

use crate::config::{self, Settings};
use crate::error::{Error, Result};
use crate::export::{self, Archiver, BulkExport, ScheduledExport, ZipArchiver};
use crate::sequence::progress::ProgressReport;
use crate::sequence::Sequence;
use crate::session::{Session, SessionStore, Summary};

pub type SharedArchiver = Box<dyn Archiver + Send + Sync>;

const UPLOAD_NAME: &str = "upload.gif";
const SAMPLE_NAME: &str = "sample.gif";

#[derive(Responder)]
pub enum Download {
  #[response(content_type = "image/png")]
  Png(Vec<u8>, Header<'static>),
  #[response(content_type = "application/zip")]
  Zip(Vec<u8>, Header<'static>),
  /// Frames to fetch one by one after the archive failed.
  Individual(Json<Vec<ScheduledExport>>),
  #[response(status = 204)]
  Empty(()),
}

fn attachment(file_name: &str) -> Header<'static> {
  Header::new(
    "Content-Disposition",
    format!("attachment; filename=\"{}\"", file_name),
  )
}

#[post("/gif?<name>", data = "<data>")]
async fn upload(
  data: Data<'_>,
  name: Option<&str>,
  limits: &Limits,
  store: &State<SessionStore>,
  settings: &State<Settings>,
) -> Result<Json<Summary>> {
  let limit = config::upload_limit(limits);
  let bytes = data.open(limit).into_bytes().await?;
  if !bytes.is_complete() {
    store.reset();
    return Err(Error::TooLarge { limit });
  }
  let summary = load(store, settings, name.unwrap_or(UPLOAD_NAME), &bytes).await?;
  Ok(Json(summary))
}

#[get("/summary")]
fn summary(store: &State<SessionStore>) -> Result<Json<Summary>> {
  store.with_session(Session::summary).map(Json)
}

#[get("/progress")]
fn progress(store: &State<SessionStore>) -> Json<ProgressReport> {
  Json(store.progress().snapshot())
}

#[get("/frames/<number>")]
fn frame(number: usize, store: &State<SessionStore>) -> Result<Download> {
  let session = store.current()?;
  let file = match number.checked_sub(1) {
    Some(index) => export::export_frame(&session, index)?,
    None => {
      return Err(Error::FrameOutOfRange {
        number,
        count: session.frames().len(),
      });
    },
  };
  let disposition = attachment(&file.name);
  Ok(Download::Png(file.bytes, disposition))
}

#[get("/frames.zip")]
fn frames_zip(
  store: &State<SessionStore>,
  settings: &State<Settings>,
  archiver: &State<SharedArchiver>,
) -> Download {
  let bulk = match store.current() {
    Ok(session) => export::export_all(
      &session.base_name,
      session.frames(),
      &**archiver.inner(),
      settings.stagger_ms,
    ),
    Err(_) => BulkExport::Empty,
  };

  match bulk {
    BulkExport::Empty => Download::Empty(()),
    BulkExport::Archive(file) => {
      let disposition = attachment(&file.name);
      Download::Zip(file.bytes, disposition)
    },
    BulkExport::Individual(scheduled) => Download::Individual(Json(scheduled)),
  }
}

#[delete("/gif")]
fn reset(store: &State<SessionStore>) -> NoContent {
  store.reset();
  NoContent
}

#[get("/health")]
fn health() -> &'static str {
  "ok"
}

/// Decodes and composites `bytes`, replacing whatever was loaded before.
pub async fn load(
  store: &SessionStore,
  settings: &Settings,
  name: &str,
  bytes: &[u8],
) -> Result<Summary> {
  let generation = store.begin_load();
  let mut sink = store.progress_sink(generation);
  let sequence = Sequence::composite_cooperatively(
    bytes,
    settings.default_delay_ms,
    settings.yield_every(),
    &mut sink,
  )
  .await;

  match sequence {
    Ok(sequence) => {
      let session = Session::new(name, sequence);
      let summary = session.summary();
      store.install(generation, session)?;
      Ok(summary)
    },
    Err(err) => {
      store.abandon(generation);
      Err(err)
    },
  }
}

async fn load_sample(rocket: &Rocket<Orbit>) {
  let (Some(store), Some(settings)) = (
    rocket.state::<SessionStore>(),
    rocket.state::<Settings>(),
  ) else {
    return;
  };
  let Some(path) = settings.sample.as_ref() else {
    return;
  };

  let loaded = match rocket::tokio::fs::read(path).await {
    Ok(bytes) => {
      let name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(SAMPLE_NAME);
      load(store, settings, name, &bytes).await
    },
    Err(source) => Err(Error::Sample {
      path: path.clone(),
      source,
    }),
  };

  match loaded {
    Ok(summary) => info!("sample {} ready, {} frames", summary.source, summary.frame_count),
    Err(err) => error!("could not load sample gif: {}", err),
  }
}

pub fn build(figment: Figment) -> Rocket<Build> {
  build_with(figment, Box::new(ZipArchiver))
}

pub fn build_with(figment: Figment, archiver: SharedArchiver) -> Rocket<Build> {
  rocket::custom(figment)
    .manage(SessionStore::default())
    .manage(archiver)
    .attach(AdHoc::config::<Settings>())
    .attach(AdHoc::on_liftoff("Sample gif", |rocket| {
      Box::pin(load_sample(rocket))
    }))
    .mount(
      "/",
      routes![upload, summary, progress, frame, frames_zip, reset, health],
    )
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::export::ExportedFile;
  use crate::test_utils::{encode_gif, quadrant_gif, TestFrame, RED};
  use image::ImageFormat;
  use rocket::data::ToByteUnit;
  use rocket::http::Status;
  use rocket::local::blocking::Client;
  use serde_json::Value;

  fn figment() -> Figment {
    Figment::from(rocket::Config::default()).merge(("log_level", "off"))
  }

  fn client() -> Client {
    Client::tracked(build(figment())).unwrap()
  }

  fn upload_quadrant(client: &Client) -> Value {
    let response = client.post("/gif?name=ryo.gif").body(quadrant_gif()).dispatch();
    assert_eq!(response.status(), Status::Ok);
    response.into_json::<Value>().unwrap()
  }

  struct FailingArchiver;

  impl Archiver for FailingArchiver {
    fn bundle(&self, _files: &[ExportedFile]) -> Result<Vec<u8>> {
      Err(Error::Archive(zip::result::ZipError::FileNotFound))
    }
  }

  #[test]
  fn upload_returns_the_film_strip() {
    let client = client();
    let summary = upload_quadrant(&client);

    assert_eq!(summary["source"], "ryo.gif");
    assert_eq!(summary["dimensions"], "10×10");
    assert_eq!(summary["frame_count"], 3);
    assert_eq!(summary["total_duration_ms"], 400);
    assert_eq!(summary["duration"], "0.4s");
    assert_eq!(summary["frames"][0]["badge"], "001");
    assert_eq!(summary["frames"][2]["file_name"], "ryo_003.png");
    assert_eq!(summary["frames"][1]["route"], "/frames/2");

    let again = client.get("/summary").dispatch().into_json::<Value>().unwrap();
    assert_eq!(again, summary);

    let progress = client.get("/progress").dispatch().into_json::<Value>().unwrap();
    assert_eq!(progress["current"], 3);
    assert_eq!(progress["total"], 3);
    assert_eq!(progress["percent"], 100.0);
    assert_eq!(progress["active"], false);
  }

  #[test]
  fn single_frame_download() {
    let client = client();
    upload_quadrant(&client);

    let response = client.get("/frames/1").dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(response.content_type(), Some(rocket::http::ContentType::PNG));
    assert_eq!(
      response.headers().get_one("Content-Disposition"),
      Some("attachment; filename=\"ryo_001.png\""),
    );
    let png = response.into_bytes().unwrap();
    let image = image::load_from_memory_with_format(&png, ImageFormat::Png)
      .unwrap()
      .to_rgba8();
    assert_eq!(image.dimensions(), (10, 10));
    assert!(image.pixels().all(|p| p.0 == RED));
  }

  #[test]
  fn frame_numbers_outside_the_strip() {
    let client = client();
    assert_eq!(client.get("/frames/1").dispatch().status(), Status::NotFound);

    upload_quadrant(&client);
    assert_eq!(client.get("/frames/0").dispatch().status(), Status::NotFound);
    assert_eq!(client.get("/frames/4").dispatch().status(), Status::NotFound);
  }

  #[test]
  fn bulk_download_is_a_zip() {
    let client = client();
    upload_quadrant(&client);

    let response = client.get("/frames.zip").dispatch();
    assert_eq!(response.status(), Status::Ok);
    assert_eq!(
      response.headers().get_one("Content-Disposition"),
      Some("attachment; filename=\"ryo_frames.zip\""),
    );
    let bytes = response.into_bytes().unwrap();
    let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let names: Vec<&str> = archive.file_names().collect();
    assert_eq!(names.len(), 3);
    assert!(names.contains(&"ryo_002.png"));
  }

  #[test]
  fn bulk_download_with_nothing_loaded() {
    let client = client();
    let response = client.get("/frames.zip").dispatch();
    assert_eq!(response.status(), Status::NoContent);
    assert!(response.into_bytes().unwrap_or_default().is_empty());
  }

  #[test]
  fn bulk_download_falls_back_when_bundling_fails() {
    let client = Client::tracked(build_with(figment(), Box::new(FailingArchiver))).unwrap();
    upload_quadrant(&client);

    let response = client.get("/frames.zip").dispatch();
    assert_eq!(response.status(), Status::Ok);
    let scheduled = response.into_json::<Value>().unwrap();
    assert_eq!(scheduled.as_array().unwrap().len(), 3);
    assert_eq!(scheduled[1]["file_name"], "ryo_002.png");
    assert_eq!(scheduled[1]["delay_ms"], 100);
    assert_eq!(scheduled[2]["route"], "/frames/3");
  }

  #[test]
  fn bad_upload_resets_the_session() {
    let client = client();
    upload_quadrant(&client);

    let response = client.post("/gif?name=notes.txt").body("hello").dispatch();
    assert_eq!(response.status(), Status::UnsupportedMediaType);
    let body = response.into_json::<Value>().unwrap();
    assert_eq!(body["error"], "unsupported image format, expected a gif");

    assert_eq!(client.get("/summary").dispatch().status(), Status::NotFound);
    let progress = client.get("/progress").dispatch().into_json::<Value>().unwrap();
    assert_eq!(progress["active"], false);
  }

  #[test]
  fn broken_gif_is_unprocessable() {
    let client = client();
    let bytes = encode_gif(4, 4, &[TestFrame::solid(4, 4, RED)]);
    let response = client
      .post("/gif?name=broken.gif")
      .body(&bytes[..bytes.len() / 2])
      .dispatch();
    assert_eq!(response.status(), Status::UnprocessableEntity);
  }

  #[test]
  fn upload_over_the_limit() {
    let limits = Limits::default().limit("gif", 64.bytes());
    let client = Client::tracked(build(figment().merge(("limits", limits)))).unwrap();
    let response = client.post("/gif?name=ryo.gif").body(quadrant_gif()).dispatch();
    assert_eq!(response.status(), Status::PayloadTooLarge);
  }

  #[test]
  fn unnamed_upload() {
    let client = client();
    let response = client.post("/gif").body(quadrant_gif()).dispatch();
    let summary = response.into_json::<Value>().unwrap();
    assert_eq!(summary["frames"][0]["file_name"], "upload_001.png");
  }

  #[test]
  fn reset_clears_everything() {
    let client = client();
    upload_quadrant(&client);

    assert_eq!(client.delete("/gif").dispatch().status(), Status::NoContent);
    assert_eq!(client.get("/summary").dispatch().status(), Status::NotFound);
    let progress = client.get("/progress").dispatch().into_json::<Value>().unwrap();
    assert_eq!(progress["total"], 0);
  }

  #[test]
  fn sample_is_loaded_at_liftoff() {
    let path = std::env::temp_dir().join(format!("gifstrip-sample-{}.gif", std::process::id()));
    std::fs::write(&path, quadrant_gif()).unwrap();

    let client = Client::tracked(build(figment().merge(("sample", &path)))).unwrap();
    let summary = client.get("/summary").dispatch().into_json::<Value>().unwrap();
    let _ = std::fs::remove_file(&path);

    assert_eq!(summary["frame_count"], 3);
    assert!(summary["frames"][0]["file_name"]
      .as_str()
      .unwrap()
      .ends_with("_001.png"));
  }

  #[test]
  fn missing_sample_keeps_the_service_up() {
    let figment = figment().merge(("sample", "/nonexistent/gifstrip/sample.gif"));
    let client = Client::tracked(build(figment)).unwrap();

    assert_eq!(client.get("/health").dispatch().into_string().unwrap(), "ok");
    assert_eq!(client.get("/summary").dispatch().status(), Status::NotFound);
    upload_quadrant(&client);
  }
}
