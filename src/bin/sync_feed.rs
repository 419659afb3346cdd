//! One-shot feed tool.
//!
//! `sync_feed parse <url|file>` prints the events a feed parses into.
//! `sync_feed sync <calendar_id> <owner_id>` runs one reconciliation against
//! the configured store and prints the report.

use familysync::components::event_store::EventStore;
use familysync::components::feed_sync::{fetch_and_parse, HttpFeedFetcher, Reconciler};
use familysync::config::Config;
use familysync::error::{input_error, SyncResult};
use familysync::ical::IcalParser;
use familysync::startup;
use std::sync::Arc;
use std::time::Duration;

const USAGE: &str = "usage: sync_feed parse <url|file> | sync_feed sync <calendar_id> <owner_id>";

#[tokio::main]
async fn main() -> miette::Result<()> {
    startup::init_logging()?;

    let config = Config::load()?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["parse", source] => parse_command(&config, source).await?,
        ["sync", calendar_id, owner_id] => sync_command(&config, calendar_id, owner_id).await?,
        _ => return Err(input_error(USAGE).into()),
    }

    Ok(())
}

fn fetcher(config: &Config) -> SyncResult<HttpFeedFetcher> {
    HttpFeedFetcher::new(
        &config.user_agent,
        Duration::from_secs(config.fetch_timeout_secs),
    )
}

async fn parse_command(config: &Config, source: &str) -> SyncResult<()> {
    let parser = IcalParser::default();
    let events = if source.contains("://") {
        fetch_and_parse(&fetcher(config)?, &parser, source).await?
    } else {
        parser.parse(&std::fs::read_to_string(source)?)
    };

    println!("{}", serde_json::to_string_pretty(&events)?);
    eprintln!("{} events", events.len());
    Ok(())
}

async fn sync_command(config: &Config, calendar_id: &str, owner_id: &str) -> SyncResult<()> {
    let store: Arc<dyn EventStore> = startup::build_store(config).await;
    startup::seed_feeds(store.as_ref(), config).await?;

    let reconciler = Reconciler::from_config(config, store, Arc::new(fetcher(config)?))?;
    let report = reconciler.sync(calendar_id, owner_id).await?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
