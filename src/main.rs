use rocket::{launch, Build, Config, Rocket};
use tracing_subscriber::EnvFilter;

#[launch]
fn rocket() -> Rocket<Build> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    )
    .init();

  gifstrip::build(Config::figment())
}
