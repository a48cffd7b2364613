//! Command-line surface: one source name plus run parameter flags.

use std::path::PathBuf;

use collector_core::RunParams;

use crate::logging::LogDestination;

pub const USAGE: &str = "\
usage: collector_app <source> [options]

options:
    --from-date <date>          date from which to download data
    --until-date <date>         date until which to download data
    --crawl-time <Y-m-d H:M:S>  override the crawl's start time
    --last-total-count <n>      the previous run's observed total
    --database <path>           sqlite database file (default collector.sqlite3)
    --files-store <dir>         export directory root (default files_store)
    --log <terminal|file|both>  log destination (default terminal)";

#[derive(Debug, PartialEq)]
pub struct CliArgs {
    pub source: String,
    pub params: RunParams,
    pub database: PathBuf,
    pub files_store: PathBuf,
    pub log_destination: LogDestination,
}

pub fn parse(args: impl Iterator<Item = String>) -> Result<CliArgs, String> {
    let mut args = args;

    let source = match args.next() {
        Some(name) if !name.starts_with("--") => name,
        _ => return Err(format!("a source name must be set\n\n{USAGE}")),
    };

    let mut parsed = CliArgs {
        source,
        params: RunParams::default(),
        database: PathBuf::from("collector.sqlite3"),
        files_store: PathBuf::from("files_store"),
        log_destination: LogDestination::Terminal,
    };

    while let Some(flag) = args.next() {
        let mut value = |flag: &str| {
            args.next()
                .ok_or_else(|| format!("{flag} requires a value\n\n{USAGE}"))
        };
        match flag.as_str() {
            "--from-date" => parsed.params.from_date = Some(value("--from-date")?),
            "--until-date" => parsed.params.until_date = Some(value("--until-date")?),
            "--crawl-time" => parsed.params.crawl_time = Some(value("--crawl-time")?),
            "--last-total-count" => {
                let raw = value("--last-total-count")?;
                let count = raw
                    .parse()
                    .map_err(|_| format!("--last-total-count: not a number: {raw:?}"))?;
                parsed.params.last_total_count = Some(count);
            }
            "--database" => parsed.database = PathBuf::from(value("--database")?),
            "--files-store" => parsed.files_store = PathBuf::from(value("--files-store")?),
            "--log" => {
                parsed.log_destination = match value("--log")?.as_str() {
                    "terminal" => LogDestination::Terminal,
                    "file" => LogDestination::File,
                    "both" => LogDestination::Both,
                    other => return Err(format!("--log: unknown destination {other:?}")),
                }
            }
            other => return Err(format!("unknown option {other:?}\n\n{USAGE}")),
        }
    }

    Ok(parsed)
}
