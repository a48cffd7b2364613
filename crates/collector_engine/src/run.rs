use std::collections::VecDeque;
use std::path::Path;

use chrono::NaiveDateTime;
use collector_core::{
    now_naive, parse_checkpoint, parse_crawl_time, resolve_window, DateError, DateWindow,
    FirstPageOutcome, HarvestedRecord, ItemRouter, PaginationPlanner, RunContext, RunParams,
    SinkFormat,
};
use futures_util::stream::FuturesUnordered;
use futures_util::StreamExt;
use serde_json::{Map, Value};
use thiserror::Error;

use collector_logging::{collect_info, collect_warn, set_run_source};

use crate::export::{export_dir, read_jsonlines, ExportError, SinkExporter};
use crate::fetch::{FetchDescriptor, FetchError, Fetcher};
use crate::source::{ParseError, ParsedItem, SourceProtocol};
use crate::store::{IncrementalStore, StoreError};

#[derive(Debug, Error)]
pub enum RunError {
    #[error(transparent)]
    Date(#[from] DateError),
    /// A planned fetch failed in transport. The run is aborted before any
    /// table replace: a lost page would leave a gap in the stored extent.
    #[error("page fetch failed for {url}: {source}")]
    LostPage {
        url: String,
        #[source]
        source: FetchError,
    },
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Per-sink outcome of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinkReport {
    pub name: String,
    /// Records routed to the sink during this run.
    pub routed: usize,
    /// Rows in the replaced table, when the sink feeds one.
    pub stored: Option<usize>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub context: RunContext,
    pub no_new_data: bool,
    pub fetches: usize,
    /// Records matching no sink. Dropped by design, counted for diagnostics.
    pub dropped: usize,
    pub sinks: Vec<SinkReport>,
}

/// Records accumulated by one run, per sink, before the write path runs.
pub struct Harvest {
    pub sink_records: Vec<Vec<HarvestedRecord>>,
    pub dropped: usize,
    pub fetches: usize,
    pub no_new_data: bool,
}

enum TaskKind {
    FirstPage { variant: usize },
    Page,
    Detail { carry: Map<String, Value> },
}

/// One pending fetch. Pending fetches form an explicit queue drained by the
/// run loop; response handling may enqueue further tasks but never
/// dispatches one itself.
struct FetchTask {
    descriptor: FetchDescriptor,
    kind: TaskKind,
}

/// Drives one source through a complete run: first page per variant,
/// planned page windows, detail expansion, routing.
pub struct Runner<'a> {
    source: &'a dyn SourceProtocol,
    fetcher: &'a dyn Fetcher,
    max_in_flight: usize,
}

impl<'a> Runner<'a> {
    pub fn new(source: &'a dyn SourceProtocol, fetcher: &'a dyn Fetcher, max_in_flight: usize) -> Self {
        Self {
            source,
            fetcher,
            max_in_flight: max_in_flight.max(1),
        }
    }

    /// Validates run parameters and resolves the run's date window before
    /// any network activity. A stored checkpoint stands in for the default
    /// lower bound; an explicit `from_date` always wins.
    pub fn resolve_context(
        &self,
        params: &RunParams,
        checkpoint: Option<NaiveDateTime>,
    ) -> Result<(RunContext, DateWindow), DateError> {
        let config = self.source.config();

        let crawl_time = match &params.crawl_time {
            Some(raw) => parse_crawl_time(raw)?,
            None => now_naive(),
        };

        let checkpoint_string = checkpoint
            .map(|instant| config.date_format.format(config.date_format.truncate(instant)));
        let from_override = params.from_date.as_deref().or(checkpoint_string.as_deref());

        let window = resolve_window(
            from_override,
            params.until_date.as_deref(),
            config.date_required,
            config.default_from_date.as_deref(),
            config.default_until_date.as_deref(),
            config.date_format,
            now_naive,
        )?;

        let context = RunContext {
            from_instant: window.from,
            until_instant: window.until,
            previous_total_count: params.last_total_count,
            page_size: config.page_size,
            crawl_time,
        };
        Ok((context, window))
    }

    /// Fetches everything the run needs and routes every record.
    ///
    /// Windows are planned in increasing offset order but completion order
    /// is not guaranteed; only completeness matters. The first transport
    /// failure aborts the run.
    pub async fn harvest(
        &self,
        context: &RunContext,
        dates: &DateWindow,
    ) -> Result<Harvest, RunError> {
        let config = self.source.config();
        let router = ItemRouter::new(config.sinks.clone());
        let planner = PaginationPlanner::new(context.page_size);
        let variants = self.source.variants();

        // The zero-delta comparison is against one source-reported total;
        // with several independent entry points the totals are not
        // comparable, so the shortcut is skipped.
        let previous = if variants.len() == 1 {
            context.previous_total_count
        } else {
            if context.previous_total_count.is_some() {
                collect_warn!("last_total_count ignored: source has several request variants");
            }
            None
        };

        let mut pending: VecDeque<FetchTask> = variants
            .iter()
            .enumerate()
            .map(|(index, variant)| FetchTask {
                descriptor: self
                    .source
                    .page_request(planner.plan_first_request(), dates, variant),
                kind: TaskKind::FirstPage { variant: index },
            })
            .collect();

        let mut harvest = Harvest {
            sink_records: vec![Vec::new(); router.sinks().len()],
            dropped: 0,
            fetches: 0,
            no_new_data: false,
        };

        let mut in_flight = FuturesUnordered::new();
        loop {
            while in_flight.len() < self.max_in_flight {
                let Some(task) = pending.pop_front() else { break };
                let fetcher = self.fetcher;
                in_flight.push(async move {
                    let result = fetcher.fetch(&task.descriptor).await;
                    (task, result)
                });
            }
            let Some((task, result)) = in_flight.next().await else {
                break;
            };
            let body = result.map_err(|source| RunError::LostPage {
                url: task.descriptor.url.clone(),
                source,
            })?;
            harvest.fetches += 1;

            match task.kind {
                TaskKind::FirstPage { variant } => {
                    let total = self.source.total_count(&body);
                    collect_info!("source reports {} items in total", total);
                    match planner.on_first_response(total, previous) {
                        FirstPageOutcome::NoNewData => {
                            // The first page is discarded too: re-ingesting
                            // it would duplicate rows in incremental sinks.
                            collect_info!("total unchanged since the last run; nothing to fetch");
                            harvest.no_new_data = true;
                        }
                        FirstPageOutcome::Windows(windows) => {
                            for window in windows {
                                pending.push_back(FetchTask {
                                    descriptor: self.source.page_request(
                                        window,
                                        dates,
                                        &variants[variant],
                                    ),
                                    kind: TaskKind::Page,
                                });
                            }
                            self.ingest_page(body, &router, &mut harvest, &mut pending)?;
                        }
                    }
                }
                TaskKind::Page => {
                    self.ingest_page(body, &router, &mut harvest, &mut pending)?;
                }
                TaskKind::Detail { carry } => {
                    for record in self.source.parse_detail(body, &carry)? {
                        route_record(record, &router, &mut harvest);
                    }
                }
            }
        }

        Ok(harvest)
    }

    fn ingest_page(
        &self,
        body: Value,
        router: &ItemRouter,
        harvest: &mut Harvest,
        pending: &mut VecDeque<FetchTask>,
    ) -> Result<(), RunError> {
        for item in self.source.parse_page(body)? {
            match item {
                ParsedItem::Record(record) => route_record(record, router, harvest),
                ParsedItem::Detail { descriptor, carry } => pending.push_back(FetchTask {
                    descriptor,
                    kind: TaskKind::Detail { carry },
                }),
            }
        }
        Ok(())
    }
}

fn route_record(record: HarvestedRecord, router: &ItemRouter, harvest: &mut Harvest) {
    let matched = router.route(&record);
    if matched.is_empty() {
        harvest.dropped += 1;
        return;
    }
    // A record accepted by several sinks is owned by each of them; it is
    // read-only from this point.
    for sink in matched {
        harvest.sink_records[sink].push(record.clone());
    }
}

/// One complete run, lifecycle steps in fixed order: checkpoint query,
/// date-window resolution, fetch and route, file export, table replace.
pub async fn execute_run(
    source: &dyn SourceProtocol,
    fetcher: &dyn Fetcher,
    store: &mut IncrementalStore,
    files_store: &Path,
    params: &RunParams,
    max_in_flight: usize,
) -> Result<RunReport, RunError> {
    let config = source.config();
    set_run_source(&config.name);
    collect_info!("run parameters: {:?}", params);

    let mut checkpoint = None;
    if params.from_date.is_none() {
        if let Some(main) = config.main_sink() {
            if let Some(column) = &main.date_column {
                if let Some(raw) = store.resume_checkpoint(&main.name, column)? {
                    match parse_checkpoint(&raw) {
                        Some(instant) => {
                            collect_info!("resuming the crawl from {}", raw);
                            checkpoint = Some(instant);
                        }
                        None => {
                            collect_warn!("stored checkpoint {:?} is not a date; ignoring", raw);
                        }
                    }
                }
            }
        }
    }

    let runner = Runner::new(source, fetcher, max_in_flight);
    let (context, dates) = runner.resolve_context(params, checkpoint)?;
    let harvest = runner.harvest(&context, &dates).await?;

    let mut sinks = Vec::new();
    if harvest.no_new_data {
        collect_info!("no new data; leaving exported files and tables untouched");
        for spec in &config.sinks {
            sinks.push(SinkReport {
                name: spec.name.clone(),
                routed: 0,
                stored: None,
            });
        }
    } else {
        let exporter = SinkExporter::new(export_dir(files_store, &config.name, context.crawl_time));
        for (spec, records) in config.sinks.iter().zip(&harvest.sink_records) {
            exporter.write_sink(spec, records)?;
            // The table is rebuilt from the sink's full accumulated file,
            // not just this run's batch; the export directory must survive
            // between crawls for incremental sinks.
            let stored = if spec.formats.contains(&SinkFormat::JsonLines) {
                let accumulated = read_jsonlines(&exporter.jsonlines_path(spec))?;
                Some(store.replace(&spec.name, &accumulated, spec.index.as_deref())?)
            } else {
                None
            };
            sinks.push(SinkReport {
                name: spec.name.clone(),
                routed: records.len(),
                stored,
            });
        }
    }

    Ok(RunReport {
        context,
        no_new_data: harvest.no_new_data,
        fetches: harvest.fetches,
        dropped: harvest.dropped,
        sinks,
    })
}
