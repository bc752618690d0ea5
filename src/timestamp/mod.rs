use time::OffsetDateTime;

pub type Timestamp = OffsetDateTime;

pub fn timestamp() -> Timestamp {
  OffsetDateTime::now_utc()
}

/// Milliseconds since `start`.
pub fn elapsed_ms(start: Timestamp) -> f64 {
  (timestamp() - start).as_seconds_f64() * 1000.0
}
