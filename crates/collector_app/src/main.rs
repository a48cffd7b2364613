//! Incremental collector for paginated procurement APIs.

mod args;
mod logging;
mod sources;

use anyhow::{anyhow, Context, Result};
use collector_engine::{execute_run, FetchSettings, IncrementalStore, ReqwestFetcher};
use collector_logging::collect_info;

fn main() -> Result<()> {
    let cli = args::parse(std::env::args().skip(1)).map_err(|message| anyhow!(message))?;
    logging::initialize(cli.log_destination);

    let source = sources::by_name(&cli.source).ok_or_else(|| {
        anyhow!(
            "unknown source {:?}; available sources: {}",
            cli.source,
            sources::names().join(", ")
        )
    })?;

    let settings = FetchSettings::default();
    let fetcher = ReqwestFetcher::new(&settings).context("building the HTTP client")?;
    let mut store =
        IncrementalStore::open(&cli.database).context("opening the collector database")?;

    let runtime = tokio::runtime::Runtime::new().context("starting the tokio runtime")?;
    let report = runtime.block_on(execute_run(
        source.as_ref(),
        &fetcher,
        &mut store,
        &cli.files_store,
        &cli.params,
        settings.max_in_flight,
    ))?;

    if report.no_new_data {
        collect_info!("finished: no new data since the last run");
    } else {
        for sink in &report.sinks {
            match sink.stored {
                Some(stored) => collect_info!(
                    "finished sink {}: {} records this run, {} rows stored",
                    sink.name,
                    sink.routed,
                    stored
                ),
                None => collect_info!(
                    "finished sink {}: {} records this run (file export only)",
                    sink.name,
                    sink.routed
                ),
            }
        }
        if report.dropped > 0 {
            collect_info!("{} records matched no sink", report.dropped);
        }
    }
    collect_info!("completed after {} fetches", report.fetches);

    Ok(())
}
