//! # sv-cli — The "Moat" of SIEVE
//!
//! Command line front end over a journal file.
//!
//! - `sieve append` — Append one event.
//! - `sieve import` — Append events from a JSON-lines file.
//! - `sieve read` — Read one filtered page and print its feed links.
//! - `sieve follow` — Live-tail the all-stream through a filter.
//! - `sieve head` — Print the head position.

mod config;
mod feed;

use std::error::Error;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sv_core::{Direction, TFPos};
use sv_filter::{EventFilter, EventFilterBuilder, FilterRequest};
use sv_io::{
    scan, EventData, FilteredSubscription, Journal, RecordSource, ScanRequest, SubscriptionItem,
};

use crate::config::Config;
use crate::feed::FeedLinks;

/// SIEVE — filtered reads over an append-only event journal.
#[derive(Parser)]
#[command(name = "sieve", version, about, long_about = None)]
struct Cli {
    /// Path to config file.
    #[arg(long, global = true, default_value = "sieve.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Append one event.
    Append {
        #[command(flatten)]
        journal: JournalArg,

        #[arg(long)]
        stream: String,

        #[arg(long)]
        event_type: String,

        /// JSON payload.
        #[arg(long)]
        data: Option<String>,
    },

    /// Append every event in a JSON-lines file.
    Import {
        #[command(flatten)]
        journal: JournalArg,

        /// One `{"stream": .., "type": .., "data": ..}` object per line.
        #[arg(long)]
        file: PathBuf,
    },

    /// Read one page of the all-stream.
    Read {
        #[command(flatten)]
        journal: JournalArg,

        /// Start position: `head` or 32 hex digits. Defaults to the start of
        /// the log going forward and the head going backward.
        #[arg(long)]
        from: Option<TFPos>,

        #[arg(long, default_value = "forward")]
        direction: Direction,

        /// Page size (default from config).
        #[arg(long)]
        count: Option<usize>,

        /// Search window (default from config).
        #[arg(long)]
        window: Option<usize>,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Live-tail the all-stream. Ctrl-C stops.
    Follow {
        #[command(flatten)]
        journal: JournalArg,

        /// Start position (default: head).
        #[arg(long, default_value = "head")]
        from: TFPos,

        #[command(flatten)]
        filter: FilterArgs,
    },

    /// Print the head position.
    Head {
        #[command(flatten)]
        journal: JournalArg,
    },
}

#[derive(Args)]
struct JournalArg {
    /// Path to the journal file (default from config).
    #[arg(long)]
    journal: Option<PathBuf>,
}

#[derive(Args)]
struct FilterArgs {
    /// `CONTEXT:TYPE:a,b` e.g. `eventtype:prefix:order-`. Repeatable; any
    /// matching clause admits a record.
    #[arg(long = "filter", value_name = "CONTEXT:TYPE:DATA")]
    filters: Vec<FilterRequest>,

    /// Admit records whose event type does not start with `$`. Joins the
    /// `--filter` clauses as one more alternative.
    #[arg(long)]
    exclude_system: bool,
}

impl FilterArgs {
    fn build(&self) -> Result<EventFilter, Box<dyn Error>> {
        if self.exclude_system {
            let mut builder = EventFilterBuilder::new().exclude_system_events();
            for request in &self.filters {
                builder = builder.with_spec(request.validate()?);
            }
            return Ok(builder.build()?);
        }
        Ok(EventFilter::from_requests(&self.filters)?)
    }
}

#[derive(Deserialize)]
struct ImportLine {
    stream: String,
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    data: serde_json::Value,
}

fn open_journal(arg: &JournalArg, config: &Config) -> Result<Journal, Box<dyn Error>> {
    let path = arg.journal.as_ref().unwrap_or(&config.journal.path);
    Ok(Journal::open(path, config.journal.size)?)
}

fn json_event(stream: String, event_type: String, data: &serde_json::Value) -> Result<EventData, Box<dyn Error>> {
    if data.is_null() {
        return Ok(EventData::new(stream, event_type, Vec::new()));
    }
    Ok(EventData::json(stream, event_type, serde_json::to_vec(data)?))
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "sieve=info,sv_io=info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::load(&cli.config)?;

    match cli.command {
        Commands::Append {
            journal,
            stream,
            event_type,
            data,
        } => {
            let journal = open_journal(&journal, &config)?;
            let data = match data {
                Some(raw) => serde_json::from_str(&raw)?,
                None => serde_json::Value::Null,
            };
            let position = journal.append(&json_event(stream, event_type, &data)?)?;
            journal.flush()?;
            println!("{}", position);
        }

        Commands::Import { journal, file } => {
            let journal = open_journal(&journal, &config)?;
            let reader = BufReader::new(std::fs::File::open(&file)?);
            let mut imported = 0usize;
            for (n, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                let item: ImportLine = serde_json::from_str(&line)
                    .map_err(|e| format!("{}:{}: {}", file.display(), n + 1, e))?;
                journal.append(&json_event(item.stream, item.event_type, &item.data)?)?;
                imported += 1;
            }
            journal.flush()?;
            tracing::info!(imported, head = %journal.head(), "import finished");
            println!("imported {} events, head {}", imported, journal.head());
        }

        Commands::Read {
            journal,
            from,
            direction,
            count,
            window,
            filter,
        } => {
            let journal = open_journal(&journal, &config)?;
            let filter = filter.build()?;
            let start = from.unwrap_or(match direction {
                Direction::Forward => TFPos::ZERO,
                Direction::Backward => TFPos::HEAD,
            });
            let request = ScanRequest {
                start,
                direction,
                max_records: count.unwrap_or(config.scan.page_size),
                max_search_window: window.unwrap_or(config.scan.search_window),
            };

            let page = scan(&journal, &request, &filter, &CancellationToken::new())?;
            println!("{}", feed::render_records(&page.records));
            println!(
                "{} matched, {} examined{}",
                page.records.len(),
                page.examined,
                if page.is_end_of_stream { ", end of stream" } else { "" }
            );
            println!("{}", FeedLinks::for_page(&request, &page));
        }

        Commands::Follow {
            journal,
            from,
            filter,
        } => {
            let journal: Arc<dyn RecordSource> = Arc::new(open_journal(&journal, &config)?);
            let filter = Arc::new(filter.build()?);
            let options =
                config.subscription_options(config.scan.page_size, config.scan.search_window);

            let cancel = CancellationToken::new();
            let mut subscription =
                FilteredSubscription::new(journal, filter, from, options, cancel.clone())?;

            let rt = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()?;
            rt.block_on(async move {
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.is_ok() {
                        cancel.cancel();
                    }
                });
                follow(&mut subscription).await
            })?;
        }

        Commands::Head { journal } => {
            let journal = open_journal(&journal, &config)?;
            println!("{}", journal.head());
        }
    }

    Ok(())
}

async fn follow(subscription: &mut FilteredSubscription) -> Result<(), Box<dyn Error>> {
    loop {
        match subscription.next().await {
            Ok(SubscriptionItem::Records(records)) => {
                for record in &records {
                    println!("{}", feed::record_json(record));
                }
            }
            Ok(SubscriptionItem::Checkpoint(position)) => {
                tracing::info!(%position, "checkpoint");
            }
            Err(sv_io::Error::Cancelled) => {
                tracing::info!(position = %subscription.position(), "follow stopped");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        }
    }
}
