mod cli;

use anyhow::Context;
use clap::Parser;
use cli::Args;
use collector::{
    default_file_name, write_csv, Accumulator, CollectionEngine, DatasetAssembler,
    RateLimitedCaller, RetryConfig, StopSignal,
};
use harvest_core::{AppConfig, CollectionEvent, CoreError, ErrorReporter, ProgressEvent};
use reddit_client::{RedditApiClient, RedditAuthenticator, RedditProvider};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str =
    "reddit_harvest=info,collector=info,reddit_client=info,harvest_core=info";

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Logs events as they arrive; warnings are already logged by the engine.
async fn log_events(mut events: UnboundedReceiver<CollectionEvent>) {
    let mut last_percent = None;
    while let Some(event) = events.recv().await {
        match event {
            CollectionEvent::ProgressUpdate(ProgressEvent::Fraction(fraction)) => {
                let percent = (fraction * 100.0).floor() as u32;
                if last_percent != Some(percent) {
                    info!("Progress: {}%", percent);
                    last_percent = Some(percent);
                }
            }
            CollectionEvent::ProgressUpdate(ProgressEvent::Count(count)) => {
                debug!("Processed {} posts", count);
            }
            CollectionEvent::PostCollected(post) => {
                debug!("Post {} from r/{}: {}", post.post_id, post.community, post.title);
            }
            CollectionEvent::CommentCollected(_) | CollectionEvent::Warning(_) => {}
        }
    }
}

async fn run(args: Args) -> Result<(), CoreError> {
    let config = AppConfig::load(args.config.as_deref())?;
    let request = args.collection_request(config.collection.sleep_seconds)?;
    let credentials = config.credentials()?;

    let api = RedditApiClient::new(credentials.user_agent.clone())?;
    let authenticator = RedditAuthenticator::new(credentials.into())?;
    let session = authenticator.authenticate(&api).await?;
    session.ensure_write_capable()?;

    let provider = RedditProvider::new(api, session)
        .with_replace_more_limit(config.collection.replace_more_limit as usize);
    let caller = RateLimitedCaller::new(RetryConfig::from(&config.retry));
    let engine = CollectionEngine::new(provider, caller)
        .with_max_unbounded_posts(config.collection.max_unbounded_posts);

    let stop = StopSignal::new();
    tokio::spawn({
        let stop = stop.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Ctrl+C received - finishing the current post and exporting");
                stop.request_stop();
            }
        }
    });

    let (tx, rx) = unbounded_channel();
    let logger = tokio::spawn(log_events(rx));

    let mut accumulator = Accumulator::new();
    let summary = engine
        .collect(&request, &mut (&mut accumulator, tx), &stop)
        .await?;
    if logger.await.is_err() {
        debug!("Event logger ended abnormally");
    }

    if summary.cancelled {
        warn!("Collection was stopped early; exporting what was collected");
    }

    let options = args.assembler_options();
    let rows = DatasetAssembler::new(options).assemble(accumulator.posts(), accumulator.comments());
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| default_file_name(&request.communities, options.join).into());
    write_csv(&rows, &output)?;

    info!(
        "Exported {} rows ({} posts, {} comments, {} warnings) to {}",
        rows.len(),
        accumulator.posts().len(),
        accumulator.comments().len(),
        accumulator.warnings().len(),
        output.display()
    );
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();
    info!("Starting reddit-harvest");

    let reporter = ErrorReporter::new();
    if let Err(e) = run(args).await {
        reporter.report_error(&e);
        return Err(e).context("collection failed");
    }
    Ok(())
}
