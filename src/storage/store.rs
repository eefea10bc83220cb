//! File-backed job store
//!
//! Every job lives in its own directory, `store/<id>/record`, under the
//! store root. Each public operation takes the store-wide lock, re-derives
//! whatever it needs from disk, and releases the lock on return. Nothing is
//! cached between calls, so any number of processes can share a root.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::warn;
use thiserror::Error;

use crate::domain::Job;
use crate::storage::config::StoreConfig;
use crate::storage::id::next_id;
use crate::storage::lock::{LockGuard, StoreLock};

const STORE_DIR: &str = "store";
const TRASH_DIR: &str = "delete";
const LOCK_FILE: &str = ".lock";
const RECORD_FILE: &str = "record";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no job with id {id}")]
    NotFound { id: i64 },

    #[error("timed out waiting for the store lock after {waited:?}")]
    LockTimeout { waited: Duration },
}

/// Handle to a job store rooted at a directory on the local filesystem.
pub struct JobStore {
    store_dir: PathBuf,
    lock: StoreLock,
    lock_timeout: Option<Duration>,
}

impl JobStore {
    /// Opens the store at `root`, creating the directory layout if needed.
    ///
    /// Opening is idempotent; an existing store is left untouched.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        let store_dir = root.join(STORE_DIR);
        let trash_dir = root.join(TRASH_DIR);

        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create store root: {}", root.display()))?;
        fs::create_dir_all(&store_dir)
            .with_context(|| format!("failed to create store dir: {}", store_dir.display()))?;
        // Reserved for a retention policy; nothing in the store touches it yet.
        fs::create_dir_all(&trash_dir)
            .with_context(|| format!("failed to create trash dir: {}", trash_dir.display()))?;

        let config = StoreConfig::load(&root)?;

        Ok(Self {
            store_dir,
            lock: StoreLock::new(root.join(LOCK_FILE)),
            lock_timeout: config.lock_timeout(),
        })
    }

    /// Adds `job` to the store, assigning it the next free id.
    ///
    /// The assigned id is stamped onto `job` and returned.
    pub fn add(&self, job: &mut Job) -> Result<i64> {
        let _guard = self.lock()?;

        let id = next_id(&self.store_dir).with_context(|| {
            format!("failed to scan store dir: {}", self.store_dir.display())
        })?;
        job.set_id(id);

        let dir = self.job_dir(id);
        fs::create_dir(&dir)
            .with_context(|| format!("failed to create job dir: {}", dir.display()))?;

        if let Err(err) = self.write_record(&dir, job) {
            if let Err(cleanup) = fs::remove_dir_all(&dir) {
                warn!("failed to clean up job dir {}: {}", dir.display(), cleanup);
            }
            return Err(err);
        }
        Ok(id)
    }

    /// Reads the job with the given id.
    pub fn get(&self, id: i64) -> Result<Job> {
        let _guard = self.lock()?;
        self.read_job(id)
    }

    /// Writes `job` back to the store under its current id.
    ///
    /// The record is replaced atomically, so a concurrent reader sees either
    /// the old record or the new one, never a torn write. A job that does not
    /// exist yet is created, which lets executors report results for jobs
    /// deleted while they ran.
    pub fn update(&self, job: &Job) -> Result<()> {
        let _guard = self.lock()?;

        let dir = self.job_dir(job.id());
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create job dir: {}", dir.display()))?;
        self.write_record(&dir, job)
    }

    /// Deletes the job with the given id.
    ///
    /// Deleting an absent id is not an error; the outcome is the same.
    pub fn delete(&self, id: i64) -> Result<()> {
        let _guard = self.lock()?;

        let dir = self.job_dir(id);
        match fs::remove_dir_all(&dir) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("failed to delete job dir: {}", dir.display()))
            }
        }
    }

    /// Lists every readable job in the store, ordered by id.
    pub fn list(&self) -> Result<Vec<Job>> {
        let _guard = self.lock()?;
        self.scan()
    }

    /// Lists jobs whose name contains `name` as a substring, ordered by id.
    pub fn search_by_name(&self, name: &str) -> Result<Vec<Job>> {
        let _guard = self.lock()?;
        let mut jobs = self.scan()?;
        jobs.retain(|job| job.name().contains(name));
        Ok(jobs)
    }

    fn lock(&self) -> Result<LockGuard> {
        match self.lock_timeout {
            None => Ok(self.lock.acquire()),
            Some(timeout) => self
                .lock
                .acquire_timeout(timeout)
                .ok_or_else(|| StoreError::LockTimeout { waited: timeout }.into()),
        }
    }

    fn job_dir(&self, id: i64) -> PathBuf {
        self.store_dir.join(id.to_string())
    }

    /// Encodes `job` and replaces `dir`'s record atomically via a temp file
    /// in the same directory.
    fn write_record(&self, dir: &Path, job: &Job) -> Result<()> {
        let bytes = job.encode()?;
        let tmp = dir.join("record.tmp");
        let path = dir.join(RECORD_FILE);

        fs::write(&tmp, bytes)
            .with_context(|| format!("failed to write record: {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("failed to replace record: {}", path.display()))
    }

    /// Reads and decodes a single record. Caller must hold the lock.
    fn read_job(&self, id: i64) -> Result<Job> {
        let path = self.job_dir(id).join(RECORD_FILE);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound { id }.into());
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to read record: {}", path.display()));
            }
        };
        Job::decode(&bytes)
            .with_context(|| format!("failed to decode record for job {}", id))
    }

    /// Collects every decodable job, skipping entries that cannot be read.
    /// Caller must hold the lock.
    fn scan(&self) -> Result<Vec<Job>> {
        let entries = self.store_dir.read_dir().with_context(|| {
            format!("failed to read store dir: {}", self.store_dir.display())
        })?;

        let mut jobs = Vec::new();
        for entry in entries {
            let entry = entry.with_context(|| {
                format!("failed to read store dir: {}", self.store_dir.display())
            })?;
            if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
                continue;
            }
            let name = entry.file_name();
            let id = match name.to_string_lossy().parse::<i64>() {
                Ok(id) => id,
                Err(_) => {
                    warn!(
                        "ignoring non-numeric entry in job store: {}",
                        name.to_string_lossy()
                    );
                    continue;
                }
            };
            match self.read_job(id) {
                Ok(job) => jobs.push(job),
                // One bad record must not take down the whole listing.
                Err(err) => warn!("skipping unreadable job {}: {:#}", id, err),
            }
        }
        jobs.sort_by_key(Job::id);
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RecordError;
    use std::thread;
    use tempfile::TempDir;

    fn open_in(dir: &TempDir) -> JobStore {
        JobStore::open(dir.path()).unwrap()
    }

    #[test]
    fn open_creates_the_layout() {
        let dir = TempDir::new().unwrap();
        open_in(&dir);

        assert!(dir.path().join("store").is_dir());
        assert!(dir.path().join("delete").is_dir());

        // Reopening an existing store is fine.
        open_in(&dir);
    }

    #[test]
    fn add_assigns_sequential_ids() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);

        let mut first = Job::shell("a", "true");
        let mut second = Job::shell("b", "false");
        assert_eq!(store.add(&mut first).unwrap(), 1);
        assert_eq!(store.add(&mut second).unwrap(), 2);
        assert_eq!(first.id(), 1);
        assert_eq!(second.id(), 2);
    }

    #[test]
    fn add_get_list_delete_round_trip() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);

        let mut job = Job::shell("myjob", "echo hello");
        let id = store.add(&mut job).unwrap();
        assert_eq!(id, 1);

        let info = store.get(id).unwrap().info();
        assert!(info.contains("myjob"));
        assert!(info.contains("echo hello"));

        assert_eq!(store.list().unwrap().len(), 1);

        store.delete(id).unwrap();
        let err = store.get(id).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::NotFound { id: 1 })
        ));

        // The store is empty again, so the id is free again.
        let mut again = Job::shell("myjob", "echo hello");
        assert_eq!(store.add(&mut again).unwrap(), 1);
    }

    #[test]
    fn delete_of_an_absent_id_is_ok() {
        let dir = TempDir::new().unwrap();
        open_in(&dir).delete(42).unwrap();
    }

    #[test]
    fn deleting_a_middle_job_does_not_free_its_id() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);

        for name in ["a", "b", "c"] {
            store.add(&mut Job::shell(name, "true")).unwrap();
        }
        store.delete(2).unwrap();

        assert_eq!(store.add(&mut Job::shell("d", "true")).unwrap(), 4);
    }

    #[test]
    fn update_rewrites_the_record_in_place() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);

        let mut job = Job::shell("myjob", "echo hello");
        let id = store.add(&mut job).unwrap();

        match &mut job {
            Job::Shell(shell) => shell.command = "echo goodbye".to_string(),
        }
        store.update(&job).unwrap();

        let loaded = store.get(id).unwrap();
        assert_eq!(loaded, job);
        assert_eq!(store.list().unwrap().len(), 1);
    }

    #[test]
    fn update_of_an_absent_id_writes_the_record() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);

        let mut job = Job::shell("ghost", "true");
        job.set_id(5);
        store.update(&job).unwrap();

        assert_eq!(store.get(5).unwrap(), job);
    }

    #[test]
    fn a_corrupt_record_does_not_poison_the_listing() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);

        store.add(&mut Job::shell("good", "true")).unwrap();
        store.add(&mut Job::shell("bad", "true")).unwrap();
        fs::write(dir.path().join("store/2/record"), "not a record").unwrap();

        let jobs = store.list().unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].name(), "good");

        let err = store.get(2).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecordError>(),
            Some(RecordError::Malformed(_))
        ));
    }

    #[test]
    fn an_unknown_kind_surfaces_on_get() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);

        store.add(&mut Job::shell("x", "true")).unwrap();
        fs::write(
            dir.path().join("store/1/record"),
            br#"{"kind":"cron","id":1,"name":"x"}"#,
        )
        .unwrap();

        let err = store.get(1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<RecordError>(),
            Some(RecordError::UnknownKind(kind)) if kind == "cron"
        ));
    }

    #[test]
    fn search_matches_name_substrings() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);

        store.add(&mut Job::shell("nightly-backup", "true")).unwrap();
        store.add(&mut Job::shell("weekly-backup", "true")).unwrap();
        store.add(&mut Job::shell("cleanup", "true")).unwrap();

        let hits = store.search_by_name("backup").unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].name(), "nightly-backup");
        assert_eq!(hits[1].name(), "weekly-backup");

        assert!(store.search_by_name("deploy").unwrap().is_empty());
    }

    #[test]
    fn list_is_ordered_by_id_and_skips_stray_entries() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);

        for name in ["a", "b", "c"] {
            store.add(&mut Job::shell(name, "true")).unwrap();
        }
        fs::create_dir(dir.path().join("store/notes")).unwrap();
        fs::write(dir.path().join("store/stray-file"), "").unwrap();

        let ids: Vec<i64> = store.list().unwrap().iter().map(Job::id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn concurrent_adds_assign_unique_ids() {
        let dir = TempDir::new().unwrap();
        open_in(&dir);

        let mut handles = Vec::new();
        for t in 0..4 {
            let root = dir.path().to_path_buf();
            handles.push(thread::spawn(move || {
                let store = JobStore::open(root).unwrap();
                let mut ids = Vec::new();
                for i in 0..5 {
                    let mut job = Job::shell(format!("job-{}-{}", t, i), "true");
                    ids.push(store.add(&mut job).unwrap());
                }
                ids
            }));
        }

        let mut ids: Vec<i64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 20);
    }

    #[test]
    fn readers_never_observe_a_torn_update() {
        let dir = TempDir::new().unwrap();
        let store = open_in(&dir);

        let mut job = Job::shell("flip", "aaaaaaaaaaaaaaaa");
        let id = store.add(&mut job).unwrap();

        let root = dir.path().to_path_buf();
        let writer = thread::spawn(move || {
            let store = JobStore::open(root).unwrap();
            for i in 0..50 {
                let command = if i % 2 == 0 {
                    "bbbbbbbbbbbbbbbb"
                } else {
                    "aaaaaaaaaaaaaaaa"
                };
                let mut job = Job::shell("flip", command);
                job.set_id(id);
                store.update(&job).unwrap();
            }
        });

        for _ in 0..50 {
            let seen = store.get(id).unwrap();
            match seen {
                Job::Shell(shell) => {
                    assert!(
                        shell.command == "aaaaaaaaaaaaaaaa" || shell.command == "bbbbbbbbbbbbbbbb",
                        "torn command: {}",
                        shell.command
                    );
                }
            }
        }
        writer.join().unwrap();
    }

    #[test]
    fn lock_timeout_surfaces_as_a_store_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.toml"), "lock_timeout_ms = 50\n").unwrap();
        let store = open_in(&dir);

        let blocker = StoreLock::new(dir.path().join(".lock"));
        let _held = blocker.acquire();

        let err = store.list().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<StoreError>(),
            Some(StoreError::LockTimeout { .. })
        ));
    }
}
