//! Snapshot files — one JSON and one CSV dump per run, plus the retention sweep.
//!
//! File names carry the run's local wall-clock time: `jobs_2026-01-18_08-00.json`.
//! Sorting by name is therefore chronological, and retention reads the date
//! straight from the name.

use std::collections::HashSet;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::SentinelError;
use crate::models::job::{JobPosting, Site};

const PREFIX: &str = "jobs_";
const STAMP_FORMAT: &str = "%Y-%m-%d_%H-%M";
const STAMP_LEN: usize = "2026-01-18_08-00".len();
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Body of a JSON snapshot file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotFile {
    pub timestamp: String,
    pub count: usize,
    pub jobs: Vec<JobPosting>,
}

/// Paths written for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedSnapshot {
    pub json_path: PathBuf,
    pub csv_path: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SnapshotStats {
    pub json_files: usize,
    pub csv_files: usize,
    pub total_files: usize,
    pub total_jobs: usize,
    pub total_size_bytes: u64,
    pub oldest_file: Option<String>,
    pub newest_file: Option<String>,
}

impl SnapshotStats {
    pub fn total_size_mb(&self) -> f64 {
        self.total_size_bytes as f64 / (1024.0 * 1024.0)
    }
}

/// One row of the merged CSV: a posting plus the run it came from.
#[derive(Debug, Serialize)]
struct MergedRow<'a> {
    scraped_at: &'a str,
    title: &'a str,
    company: &'a str,
    location: &'a str,
    job_url: &'a str,
    description: &'a str,
    site: Site,
    date_posted: Option<NaiveDate>,
    search_term: &'a str,
    search_location: &'a str,
}

pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Uses `dir` for snapshots, creating it if needed.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `jobs_<YYYY-MM-DD_HH-MM>` for the given run time.
    pub fn file_stem(timestamp: NaiveDateTime) -> String {
        format!("{PREFIX}{}", timestamp.format(STAMP_FORMAT))
    }

    /// First stem for `timestamp` with no JSON or CSV file yet. A second run in
    /// the same minute gets `-1`, then `-2`, and so on.
    fn free_stem(&self, timestamp: NaiveDateTime) -> String {
        let base = Self::file_stem(timestamp);
        let taken = |stem: &str| {
            self.dir.join(format!("{stem}.json")).exists() || self.dir.join(format!("{stem}.csv")).exists()
        };
        if !taken(&base) {
            return base;
        }
        (1..)
            .map(|n| format!("{base}-{n}"))
            .find(|stem| !taken(stem))
            .unwrap_or(base)
    }

    /// Writes this run's JSON and CSV snapshots under one fresh stem.
    pub fn save_run(
        &self,
        jobs: &[JobPosting],
        timestamp: NaiveDateTime,
    ) -> Result<SavedSnapshot, SentinelError> {
        let stem = self.free_stem(timestamp);
        Ok(SavedSnapshot {
            json_path: self.save_jobs(&stem, jobs, timestamp)?,
            csv_path: self.save_jobs_csv(&stem, jobs)?,
        })
    }

    /// Writes `<stem>.json`. Never overwrites an existing file.
    pub fn save_jobs(
        &self,
        stem: &str,
        jobs: &[JobPosting],
        timestamp: NaiveDateTime,
    ) -> Result<PathBuf, SentinelError> {
        let path = self.dir.join(format!("{stem}.json"));
        let body = SnapshotFile {
            timestamp: timestamp.format(TIMESTAMP_FORMAT).to_string(),
            count: jobs.len(),
            jobs: jobs.to_vec(),
        };

        let mut writer = BufWriter::new(create_new(&path)?);
        serde_json::to_writer_pretty(&mut writer, &body)?;
        writer.flush()?;

        info!("Saved {} jobs to {}", jobs.len(), path.display());
        Ok(path)
    }

    /// Writes `<stem>.csv`, one row per posting. Never overwrites an existing file.
    pub fn save_jobs_csv(&self, stem: &str, jobs: &[JobPosting]) -> Result<PathBuf, SentinelError> {
        let path = self.dir.join(format!("{stem}.csv"));
        let mut writer = csv::Writer::from_writer(create_new(&path)?);
        for job in jobs {
            writer.serialize(job)?;
        }
        writer.flush()?;

        info!("Saved {} jobs to {}", jobs.len(), path.display());
        Ok(path)
    }

    pub fn load_jobs(&self, file_name: &str) -> Result<SnapshotFile, SentinelError> {
        let path = self.dir.join(file_name);
        let file = File::open(&path)?;
        let data: SnapshotFile = serde_json::from_reader(io::BufReader::new(file))?;
        info!("Loaded {} jobs from {}", data.count, path.display());
        Ok(data)
    }

    /// `jobs_*.<extension>` files in chronological order: by stamp, then by
    /// same-minute suffix (`-1` after the bare stem, `-10` after `-2`).
    pub fn list_data_files(&self, extension: &str) -> io::Result<Vec<PathBuf>> {
        let suffix = format!(".{extension}");
        let mut files = Vec::new();
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if name.starts_with(PREFIX) && name.ends_with(&suffix) && path.is_file() {
                files.push(path);
            }
        }
        files.sort_by_cached_key(|p| run_order(&file_name(p)));
        Ok(files)
    }

    /// Deletes snapshots whose date (from the file name) is more than `days`
    /// before `now`. Names that do not parse are skipped. Returns the count deleted.
    pub fn cleanup_old_files(&self, days: u32, now: NaiveDateTime) -> io::Result<usize> {
        let Some(cutoff) = now.checked_sub_signed(Duration::days(i64::from(days))) else {
            info!("Retention of {days} days reaches before any date, nothing to clean up");
            return Ok(0);
        };
        let mut deleted = 0;

        for extension in ["json", "csv"] {
            for path in self.list_data_files(extension)? {
                let name = file_name(&path);
                let Some(file_date) = date_from_file_name(&name) else {
                    warn!("Skipping file with invalid name: {name}");
                    continue;
                };

                if file_date.and_hms_opt(0, 0, 0).is_some_and(|d| d < cutoff) {
                    fs::remove_file(&path)?;
                    info!("Deleted old file: {name}");
                    deleted += 1;
                }
            }
        }

        if deleted > 0 {
            info!("Cleaned up {deleted} old files (older than {days} days)");
        } else {
            info!("No old files to clean up");
        }
        Ok(deleted)
    }

    pub fn statistics(&self) -> io::Result<SnapshotStats> {
        let json_files = self.list_data_files("json")?;
        let csv_files = self.list_data_files("csv")?;

        let total_jobs = json_files
            .iter()
            .filter_map(|p| File::open(p).ok())
            .filter_map(|f| serde_json::from_reader::<_, CountOnly>(io::BufReader::new(f)).ok())
            .map(|c| c.count)
            .sum();

        let total_size_bytes = json_files
            .iter()
            .chain(csv_files.iter())
            .filter_map(|p| fs::metadata(p).ok())
            .map(|m| m.len())
            .sum();

        Ok(SnapshotStats {
            json_files: json_files.len(),
            csv_files: csv_files.len(),
            total_files: json_files.len() + csv_files.len(),
            total_jobs,
            total_size_bytes,
            oldest_file: json_files.first().map(|p| file_name(p)),
            newest_file: json_files.last().map(|p| file_name(p)),
        })
    }

    /// Merges every JSON snapshot into one CSV with a `scraped_at` column,
    /// keeping the first row per posting. Returns `None` when there is nothing to merge.
    pub fn merge_all_jobs(&self, output_file: &str) -> Result<Option<PathBuf>, SentinelError> {
        let mut snapshots = Vec::new();
        for path in self.list_data_files("json")? {
            match self.load_jobs(&file_name(&path)) {
                Ok(snapshot) => snapshots.push(snapshot),
                Err(e) => warn!("Error loading {}: {e}", path.display()),
            }
        }

        let mut seen = HashSet::new();
        let rows: Vec<MergedRow<'_>> = snapshots
            .iter()
            .flat_map(|s| s.jobs.iter().map(move |job| (s.timestamp.as_str(), job)))
            .filter(|(_, job)| seen.insert(job.job_key()))
            .map(|(scraped_at, job)| MergedRow {
                scraped_at,
                title: &job.title,
                company: &job.company,
                location: &job.location,
                job_url: &job.job_url,
                description: &job.description,
                site: job.site,
                date_posted: job.date_posted,
                search_term: &job.search_term,
                search_location: &job.search_location,
            })
            .collect();

        if rows.is_empty() {
            warn!("No jobs to merge");
            return Ok(None);
        }

        let output_path = self.dir.join(output_file);
        let mut writer = csv::Writer::from_path(&output_path)?;
        for row in &rows {
            writer.serialize(row)?;
        }
        writer.flush()?;

        info!("Merged {} unique jobs into {}", rows.len(), output_path.display());
        Ok(Some(output_path))
    }
}

#[derive(Deserialize)]
struct CountOnly {
    count: usize,
}

fn create_new(path: &Path) -> io::Result<File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Sort key for a snapshot name: `(base stem, same-minute suffix, name)`.
/// `jobs_2026-01-18_08-00-2.json` → `("jobs_2026-01-18_08-00", 2, ..)`.
fn run_order(name: &str) -> (String, u64, String) {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let suffixed = stem
        .rsplit_once('-')
        .filter(|(base, _)| base.len() == PREFIX.len() + STAMP_LEN)
        .and_then(|(base, n)| n.parse::<u64>().ok().map(|n| (base, n)));
    let (base, n) = suffixed.unwrap_or((stem, 0));
    (base.to_string(), n, name.to_string())
}

/// `jobs_2026-01-18_08-00.json` → 2026-01-18
fn date_from_file_name(name: &str) -> Option<NaiveDate> {
    let date_part = name.split('_').nth(1)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::posting;
    use tempfile::TempDir;

    fn ts(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn store() -> (TempDir, SnapshotStore) {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(dir.path().join("data")).unwrap();
        (dir, store)
    }

    fn touch(store: &SnapshotStore, name: &str) {
        fs::write(store.dir().join(name), "{}").unwrap();
    }

    #[test]
    fn test_file_stem_format() {
        assert_eq!(SnapshotStore::file_stem(ts(18, 8, 0)), "jobs_2026-10-18_08-00");
    }

    #[test]
    fn test_save_run_writes_json_and_csv() {
        let (_dir, store) = store();
        let jobs = vec![posting("https://x.com/1", "rust"), posting("https://x.com/2", "go")];

        let saved = store.save_run(&jobs, ts(16, 8, 0)).unwrap();
        assert!(saved.json_path.ends_with("jobs_2026-10-16_08-00.json"));
        assert!(saved.csv_path.ends_with("jobs_2026-10-16_08-00.csv"));

        let loaded = store.load_jobs("jobs_2026-10-16_08-00.json").unwrap();
        assert_eq!(loaded.count, 2);
        assert_eq!(loaded.timestamp, "2026-10-16T08:00:00");
        assert_eq!(loaded.jobs, jobs);

        let csv = fs::read_to_string(&saved.csv_path).unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("title,company,location,job_url"));
        assert_eq!(lines.count(), 2);
    }

    #[test]
    fn test_same_minute_runs_never_overwrite() {
        let (_dir, store) = store();
        let first = store.save_run(&[posting("https://x.com/1", "rust")], ts(16, 8, 0)).unwrap();
        let second = store.save_run(&[], ts(16, 8, 0)).unwrap();

        assert_ne!(first.json_path, second.json_path);
        assert!(second.json_path.ends_with("jobs_2026-10-16_08-00-1.json"));
        assert!(second.csv_path.ends_with("jobs_2026-10-16_08-00-1.csv"));
        assert_eq!(store.load_jobs("jobs_2026-10-16_08-00.json").unwrap().count, 1);
    }

    #[test]
    fn test_list_data_files_sorted_and_filtered() {
        let (_dir, store) = store();
        touch(&store, "jobs_2026-10-15_08-00.json");
        touch(&store, "jobs_2026-10-14_08-00.json");
        touch(&store, "all_jobs.csv");
        touch(&store, "notes.json");
        touch(&store, "jobs_2026-10-14_08-00.csv");

        let names: Vec<_> = store
            .list_data_files("json")
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(
            names,
            vec!["jobs_2026-10-14_08-00.json", "jobs_2026-10-15_08-00.json"]
        );
        assert_eq!(store.list_data_files("csv").unwrap().len(), 1);
    }

    #[test]
    fn test_same_minute_runs_list_in_run_order() {
        let (_dir, store) = store();
        for term in ["first", "second", "third"] {
            store.save_run(&[posting("https://x.com/1", term)], ts(16, 8, 0)).unwrap();
        }
        for n in 3..=10 {
            touch(&store, &format!("jobs_2026-10-16_08-00-{n}.json"));
        }
        touch(&store, "jobs_2026-10-16_07-59.json");

        let names: Vec<_> = store
            .list_data_files("json")
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(names[0], "jobs_2026-10-16_07-59.json");
        assert_eq!(names[1], "jobs_2026-10-16_08-00.json");
        assert_eq!(names[2], "jobs_2026-10-16_08-00-1.json");
        assert_eq!(names[3], "jobs_2026-10-16_08-00-2.json");
        assert_eq!(names.last().map(String::as_str), Some("jobs_2026-10-16_08-00-10.json"));

        let stats = store.statistics().unwrap();
        assert_eq!(stats.newest_file.as_deref(), Some("jobs_2026-10-16_08-00-10.json"));

        // The earliest run's row wins the merge.
        let path = store.merge_all_jobs("all_jobs.csv").unwrap().unwrap();
        let mut reader = csv::Reader::from_path(path).unwrap();
        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][8], "first");
    }

    #[test]
    fn test_cleanup_with_unbounded_retention_keeps_everything() {
        let (_dir, store) = store();
        touch(&store, "jobs_2020-01-01_08-00.json");

        assert_eq!(store.cleanup_old_files(u32::MAX, ts(16, 12, 0)).unwrap(), 0);
        assert!(store.dir().join("jobs_2020-01-01_08-00.json").exists());
    }

    #[test]
    fn test_cleanup_deletes_only_files_before_cutoff() {
        let (_dir, store) = store();
        // now = 10-16 12:00, days = 7 → cutoff 10-09 12:00
        touch(&store, "jobs_2026-10-08_18-00.json");
        touch(&store, "jobs_2026-10-08_18-00.csv");
        touch(&store, "jobs_2026-10-09_08-00.json");
        touch(&store, "jobs_2026-10-10_08-00.json");
        touch(&store, "jobs_garbage.json");
        touch(&store, "unrelated_2020-01-01.json");

        let deleted = store.cleanup_old_files(7, ts(16, 12, 0)).unwrap();
        assert_eq!(deleted, 3);

        let remaining: Vec<_> = store
            .list_data_files("json")
            .unwrap()
            .iter()
            .map(|p| file_name(p))
            .collect();
        assert_eq!(
            remaining,
            vec!["jobs_2026-10-10_08-00.json", "jobs_garbage.json"]
        );
        assert!(store.dir().join("unrelated_2020-01-01.json").exists());
    }

    #[test]
    fn test_statistics() {
        let (_dir, store) = store();
        assert_eq!(store.statistics().unwrap(), SnapshotStats::default());

        store.save_run(&[posting("https://x.com/1", "rust")], ts(14, 8, 0)).unwrap();
        store
            .save_run(
                &[posting("https://x.com/2", "rust"), posting("https://x.com/3", "rust")],
                ts(15, 8, 0),
            )
            .unwrap();
        touch(&store, "jobs_2026-10-16_08-00.json"); // unreadable as a snapshot

        let stats = store.statistics().unwrap();
        assert_eq!(stats.json_files, 3);
        assert_eq!(stats.csv_files, 2);
        assert_eq!(stats.total_files, 5);
        assert_eq!(stats.total_jobs, 3);
        assert!(stats.total_size_bytes > 0);
        assert_eq!(stats.oldest_file.as_deref(), Some("jobs_2026-10-14_08-00.json"));
        assert_eq!(stats.newest_file.as_deref(), Some("jobs_2026-10-16_08-00.json"));
    }

    #[test]
    fn test_merge_all_jobs_dedupes_and_stamps() {
        let (_dir, store) = store();
        assert_eq!(store.merge_all_jobs("all_jobs.csv").unwrap(), None);

        store
            .save_run(&[posting("https://x.com/1", "rust"), posting("https://x.com/2", "rust")], ts(14, 8, 0))
            .unwrap();
        store
            .save_run(&[posting("https://x.com/2", "go"), posting("https://x.com/3", "go")], ts(15, 8, 0))
            .unwrap();

        let path = store.merge_all_jobs("all_jobs.csv").unwrap().unwrap();
        let mut reader = csv::Reader::from_path(path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(&headers[0], "scraped_at");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(&rows[1][0], "2026-10-14T08:00:00");
        assert_eq!(&rows[1][4], "https://x.com/2");
        assert_eq!(&rows[1][8], "rust");
        assert_eq!(&rows[2][0], "2026-10-15T08:00:00");
    }
}
