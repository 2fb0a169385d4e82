use std::process::ExitCode;

use anyhow::Result;
use apirun_config::Config;
use apirun_engine::history_store;
use apirun_storage::HistoryEntry;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

pub fn handle(config: &Config) -> Result<ExitCode> {
    let store = history_store(config);
    let entries = store.list_entries()?;

    if entries.is_empty() {
        println!("No history entries in {}", store.root().display());
        return Ok(ExitCode::SUCCESS);
    }

    println!(
        "History ({} of {} retained) in {}:",
        entries.len(),
        store.retention(),
        store.root().display()
    );
    for entry in &entries {
        println!("  {}", describe(entry)?);
    }

    Ok(ExitCode::SUCCESS)
}

fn describe(entry: &HistoryEntry) -> Result<String> {
    let modified = OffsetDateTime::from(entry.modified).format(&Rfc3339)?;
    let files = entry.files()?.len();
    Ok(format!("{}  {} file(s), written {}", entry.id, files, modified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    #[test]
    fn test_describe_entry() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("2026-10-18T09-00-00-000000000Z");
        std::fs::create_dir_all(&path).unwrap();
        std::fs::write(path.join("history.json"), "{}").unwrap();
        std::fs::write(path.join("history-trend.json"), "[]").unwrap();

        let entry = HistoryEntry {
            id: "2026-10-18T09-00-00-000000000Z".to_string(),
            path,
            modified: SystemTime::UNIX_EPOCH + Duration::from_secs(1_792_314_000),
        };

        assert_eq!(
            describe(&entry).unwrap(),
            "2026-10-18T09-00-00-000000000Z  2 file(s), written 2026-10-18T09:00:00Z"
        );
    }
}
