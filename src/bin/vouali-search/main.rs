use std::path::PathBuf;

use anyhow::bail;
use clap::Parser;
use log::error;
use tokio::{
  io::{AsyncBufRead, AsyncBufReadExt, BufReader},
  sync::mpsc::unbounded_channel,
  time::sleep,
};
use vouali::{
  client::SearchClient,
  config::DEFAULT_PORT,
  debounce::{LEADING_DELAY, ResponseGate, SearchRequest, SearchThrottle, TRAILING_DELAY},
  geo::{BIAS_RADIUS_M, BoundingBox, LatLng},
  search::{INITIAL_SUGGESTIONS, SearchOptions, SearchResult},
};

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// Running vouali server.
  #[arg(short, long)]
  server: Option<String>,

  /// Position to search around, as "lat,lng".
  #[arg(short, long, default_value = "-8.0631,-34.8711", allow_hyphen_values = true)]
  origin: LatLng,

  /// Sorts the suggestions by distance to the origin.
  #[arg(long)]
  sort_by_distance: bool,

  /// Shows the distance of every suggestion.
  #[arg(long)]
  include_distance: bool,

  /// Asks for the suggestions around the origin before any input.
  #[arg(short, long)]
  initial: bool,

  /// Milliseconds to wait after every line, to replay typing.
  #[arg(short, long, default_value_t = 0)]
  typing_delay: u64,

  /// Successive search box values, one per line. stdin is used if this is not provided.
  file: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  env_logger::init();
  let args = Args::parse();

  let server = args
    .server
    .unwrap_or_else(|| format!("http://localhost:{DEFAULT_PORT}"));
  let client = SearchClient::new(server.clone());
  if !client.healthcheck().await {
    bail!("No vouali server responding at {server}");
  }

  let origin = args.origin;
  let viewport = BoundingBox::around(origin.lat, origin.lng, BIAS_RADIUS_M);
  let options = SearchOptions {
    sort_by_distance: args.sort_by_distance,
    include_distance: args.include_distance,
  };

  let (request_tx, mut request_rx) = unbounded_channel::<SearchRequest>();
  let (response_tx, mut response_rx) =
    unbounded_channel::<(SearchRequest, anyhow::Result<Vec<SearchResult>>)>();

  let requester = tokio::spawn(async move {
    while let Some(request) = request_rx.recv().await {
      let client = client.clone();
      let response_tx = response_tx.clone();
      tokio::spawn(async move {
        let result = client
          .search(origin, &request.query, Some(viewport), options)
          .await;
        let _ = response_tx.send((request, result));
      });
    }
  });

  let printer = tokio::spawn(async move {
    let mut gate = ResponseGate::default();
    while let Some((request, result)) = response_rx.recv().await {
      if !gate.accept(request.seq) {
        continue;
      }
      match result {
        Ok(suggestions) => {
          println!("{} ({}):", request.query, suggestions.len());
          for suggestion in suggestions {
            println!("  {suggestion}");
          }
        }
        Err(e) => error!("Search for '{}' failed: {e:#}", request.query),
      }
    }
  });

  let mut throttle = SearchThrottle::new(request_tx);
  if args.initial {
    throttle.input(INITIAL_SUGGESTIONS);
  }

  let reader: Box<dyn AsyncBufRead + Unpin> = if let Some(file) = args.file {
    Box::new(BufReader::new(tokio::fs::File::open(file).await?))
  } else {
    Box::new(BufReader::new(tokio::io::stdin()))
  };
  let mut lines = reader.lines();
  while let Some(line) = lines.next_line().await? {
    throttle.input(line.trim_end());
    if args.typing_delay > 0 {
      sleep(std::time::Duration::from_millis(args.typing_delay)).await;
    }
  }

  // Let pending timers fire before closing the request channel.
  sleep(LEADING_DELAY + TRAILING_DELAY).await;
  drop(throttle);
  requester.await?;
  printer.await?;
  Ok(())
}
