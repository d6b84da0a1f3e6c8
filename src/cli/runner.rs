use crate::Database;
use crate::errors::DbError;
use crate::logsink::LogEntry;
use crate::query::{Filter, parse_filter_json};
use crate::store::CappedOptions;
use crate::utils::slug::slugify;
use bson::doc;
use std::io::Write;
use std::time::Duration;

use super::command::Command;
use super::util::json_line;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum OutputMode {
    Human,
    Plain,
    Json,
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Run `cmd` against `db`, printing human-readable output to stdout.
///
/// # Errors
/// Any store, query or I/O error of the command.
pub fn run(db: &Database, cmd: Command) -> Result<(), Box<dyn std::error::Error>> {
    run_with_format(db, cmd, OutputMode::Human, &mut std::io::stdout().lock())
}

/// # Errors
/// Any store, query or I/O error of the command.
pub fn run_with_format(
    db: &Database,
    cmd: Command,
    mode: OutputMode,
    out: &mut dyn Write,
) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        Command::Demo { collection, count, interval_ms, filter_json } => {
            let filter = match filter_json.as_deref() {
                Some(f) => parse_filter_json(f)?,
                None => Filter::True,
            };
            if !db.store().collection_names().contains(&collection) {
                db.create_capped(&collection, CappedOptions::by_count(count.max(1)))?;
            }
            db.insert(&collection, doc! {"seq": 0_i64, "kind": "seed"})?;
            let producer = {
                let store = db.clone();
                let collection = collection.clone();
                std::thread::spawn(move || {
                    for seq in 1..i64::try_from(count).unwrap_or(i64::MAX) {
                        std::thread::sleep(Duration::from_millis(interval_ms));
                        let tick = doc! {"seq": seq, "kind": "tick"};
                        if let Err(e) = store.insert(&collection, tick) {
                            log::warn!("demo producer stopped: {e}");
                            break;
                        }
                    }
                })
            };
            let tail = db.tail(&collection, filter)?;
            for item in tail.take(count) {
                let d = item?;
                match mode {
                    OutputMode::Json => writeln!(out, "{}", json_line(&d.to_raw()))?,
                    OutputMode::Plain => writeln!(out, "{}", d.id)?,
                    OutputMode::Human => writeln!(out, "{} {}", d.id, json_line(&d.data))?,
                }
            }
            producer.join().map_err(|_| "demo producer panicked")?;
            Ok(())
        }
        Command::Logs { service, count } => {
            db.ensure_log_collection()?;
            let handler = db.log_handler();
            for i in 0..count {
                log::Log::log(
                    &handler,
                    &log::Record::builder()
                        .args(format_args!("log line {i}"))
                        .level(log::Level::Info)
                        .target(&service)
                        .module_path(Some(module_path!()))
                        .file(Some(file!()))
                        .line(Some(line!()))
                        .build(),
                );
            }
            log::Log::flush(&handler);
            let tail = db.tail_logs(Filter::eq("s", service.as_str()))?;
            for item in tail.take(count) {
                let entry: LogEntry = item?;
                match mode {
                    OutputMode::Json => writeln!(out, "{}", json_line(&entry.to_document()))?,
                    OutputMode::Plain => writeln!(out, "{}", entry.message)?,
                    OutputMode::Human => writeln!(out, "{entry}")?,
                }
            }
            Ok(())
        }
        Command::Slug { text } => {
            let s = slugify(&text);
            match mode {
                OutputMode::Json => writeln!(out, "{}", serde_json::json!({"slug": s}))?,
                OutputMode::Plain | OutputMode::Human => writeln!(out, "{s}")?,
            }
            Ok(())
        }
        Command::Info => {
            let cfg = db.config();
            let timeout = cfg.tail_options().timeout;
            let capped = cfg.log_collection_options();
            let collections: Vec<_> = db
                .store()
                .collection_names()
                .into_iter()
                .map(|name| -> Result<_, DbError> {
                    let store = db.store();
                    Ok((store.options(&name)?, store.len(&name)?, name))
                })
                .collect::<Result<_, _>>()?;
            match mode {
                OutputMode::Json => {
                    let cols: Vec<_> = collections
                        .iter()
                        .map(|(opts, len, name)| {
                            serde_json::json!({"name": name, "len": len, "capped": opts.capped})
                        })
                        .collect();
                    writeln!(
                        out,
                        "{}",
                        serde_json::json!({
                            "version": env!("CARGO_PKG_VERSION"),
                            "tail_timeout_ms": timeout.map(millis),
                            "await_ms": millis(cfg.await_window()),
                            "log_collection": cfg.log_collection_name(),
                            "log_capped": capped,
                            "log_buffer_capacity": cfg.log_buffer_capacity(),
                            "collections": cols,
                        })
                    )?;
                }
                OutputMode::Plain => {
                    for (_, _, name) in &collections {
                        writeln!(out, "{name}")?;
                    }
                }
                OutputMode::Human => {
                    writeln!(out, "cappedlite {}", env!("CARGO_PKG_VERSION"))?;
                    match timeout {
                        Some(t) => writeln!(out, "tail timeout: {t:?}")?,
                        None => writeln!(out, "tail timeout: none (tails forever)")?,
                    }
                    writeln!(out, "await window: {:?}", cfg.await_window())?;
                    writeln!(
                        out,
                        "log collection: {} (max {} documents, {} bytes, buffer {})",
                        cfg.log_collection_name(),
                        capped.max_documents.map_or_else(|| "-".to_string(), |n| n.to_string()),
                        capped.max_size,
                        cfg.log_buffer_capacity()
                    )?;
                    for (opts, len, name) in &collections {
                        writeln!(out, "{name} len={len} capped={:?}", opts.capped)?;
                    }
                }
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn db() -> Database {
        Database::with_config(AppConfig {
            tail_timeout_secs: Some(2.0),
            await_ms: Some(20),
            ..AppConfig::default()
        })
    }

    fn run_to_string(db: &Database, cmd: Command, mode: OutputMode) -> String {
        let mut out = Vec::new();
        run_with_format(db, cmd, mode, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn demo_tails_produced_records() {
        let out = run_to_string(
            &db(),
            Command::Demo {
                collection: "ticks".into(),
                count: 4,
                interval_ms: 5,
                filter_json: None,
            },
            OutputMode::Json,
        );
        let seqs: Vec<i64> = out
            .lines()
            .map(|l| serde_json::from_str::<serde_json::Value>(l).unwrap()["seq"].as_i64().unwrap())
            .collect();
        assert_eq!(seqs, [0, 1, 2, 3]);
    }

    #[test]
    fn logs_round_trip_through_capped_collection() {
        let db = db();
        let cmd = Command::Logs { service: "billing".into(), count: 3 };
        let out = run_to_string(&db, cmd, OutputMode::Plain);
        assert_eq!(out.lines().collect::<Vec<_>>(), ["log line 0", "log line 1", "log line 2"]);
        assert_eq!(db.store().len("log").unwrap(), 3);
    }

    #[test]
    fn slug_prints_slug() {
        let cmd = Command::Slug { text: "Hello, World!".into() };
        let out = run_to_string(&db(), cmd, OutputMode::Plain);
        assert_eq!(out.trim(), "hello-world");
    }

    #[test]
    fn info_reports_the_effective_configuration() {
        let out = run_to_string(&db(), Command::Info, OutputMode::Json);
        let v: serde_json::Value = serde_json::from_str(out.trim()).unwrap();
        assert_eq!(v["tail_timeout_ms"], 2000);
        assert_eq!(v["await_ms"], 20);
        assert_eq!(v["log_collection"], "log");
        assert_eq!(v["collections"].as_array().unwrap().len(), 0);

        let human = run_to_string(&db(), Command::Info, OutputMode::Human);
        assert!(human.contains("tail timeout: 2s"), "{human}");
        assert!(human.contains("log collection: log"), "{human}");
    }

    #[test]
    fn info_lists_existing_collections() {
        let db = db();
        db.create_capped("ticks", CappedOptions::by_count(5)).unwrap();
        db.insert("ticks", doc! {"n": 1}).unwrap();
        let out = run_to_string(&db, Command::Info, OutputMode::Human);
        assert!(out.contains("ticks len=1"), "{out}");
    }
}
