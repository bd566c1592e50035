use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use clap::Parser;
use log::info;
use tracing_subscriber::EnvFilter;
use vouali::{
  config::Config,
  search::SearchOptions,
  server::{AppState, serve},
  store::MemoryStore,
};

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// Port to listen on. Falls back to the configuration.
  #[arg(short, long)]
  port: Option<u16>,

  /// JSON dataset to serve. New places are saved back to it.
  #[arg(short, long)]
  data: Option<PathBuf>,

  /// Number of suggestions per search.
  #[arg(short, long)]
  quota: Option<usize>,

  /// Listens on all interfaces instead of localhost only.
  #[arg(long)]
  public: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_target(false)
    .with_env_filter(EnvFilter::from_default_env())
    .compact()
    .init();

  let args = Args::parse();
  let config = Config::new();

  let data_file = args.data.or_else(|| config.data_file.clone());
  let store = match &data_file {
    Some(path) if path.exists() => MemoryStore::load(path)?,
    Some(path) => {
      info!("{} does not exist yet, starting empty", path.display());
      MemoryStore::default()
    }
    None => MemoryStore::default(),
  };

  let quota = args.quota.unwrap_or_else(|| config.quota());
  let state = AppState::with_registry(Arc::new(store), quota, data_file).with_defaults(
    SearchOptions {
      sort_by_distance: config.sort_by_distance,
      include_distance: config.include_distance,
    },
  );

  let ip = if args.public {
    [0, 0, 0, 0]
  } else {
    [127, 0, 0, 1]
  };
  let addr = SocketAddr::from((ip, args.port.unwrap_or_else(|| config.port())));
  serve(addr, state).await
}
