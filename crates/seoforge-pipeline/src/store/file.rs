use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use seoforge_types::{JobId, Result, SeoforgeError};

use super::{JobRecord, JobStore, Mutation};

/// One JSON document per job under a directory.
///
/// Writes go to `<id>.json.tmp` and are renamed over `<id>.json`, so a reader
/// never observes a half-written record. Updates to the same job are
/// serialised by a per-job lock held in this process; a lock is dropped from
/// the map once no operation holds or awaits it.
pub struct FileJobStore {
    dir: PathBuf,
    locks: DashMap<JobId, Arc<Mutex<()>>>,
}

impl FileJobStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            locks: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: JobId) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    fn lock_for(&self, id: JobId) -> Arc<Mutex<()>> {
        self.locks
            .entry(id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Forget the job's lock if nobody else holds a handle to it. Must be
    /// called after the caller's own handle is dropped.
    fn release(&self, id: JobId) {
        self.locks.remove_if(&id, |_, lock| Arc::strong_count(lock) == 1);
    }

    async fn create_locked(&self, record: &JobRecord) -> Result<()> {
        let lock = self.lock_for(record.id);
        let _guard = lock.lock().await;
        if tokio::fs::try_exists(self.path_for(record.id)).await? {
            return Err(SeoforgeError::Persistence(format!(
                "job {} already exists",
                record.id
            )));
        }
        self.write(record).await
    }

    async fn update_locked(&self, id: JobId, mutation: Mutation) -> Result<JobRecord> {
        let lock = self.lock_for(id);
        let _guard = lock.lock().await;
        let mut record = self.read(id).await?;
        mutation(&mut record)?;
        self.write(&record).await?;
        Ok(record)
    }

    async fn read(&self, id: JobId) -> Result<JobRecord> {
        let path = self.path_for(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(b) => b,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SeoforgeError::JobNotFound(id))
            }
            Err(e) => return Err(persistence(&path, e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| persistence(&path, e))
    }

    async fn write(&self, record: &JobRecord) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| persistence(&self.dir, e))?;
        let path = self.path_for(record.id);
        let tmp = path.with_extension("json.tmp");
        let bytes = serde_json::to_vec_pretty(record)?;
        tokio::fs::write(&tmp, bytes)
            .await
            .map_err(|e| persistence(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| persistence(&path, e))
    }
}

fn persistence(path: &Path, err: impl std::fmt::Display) -> SeoforgeError {
    SeoforgeError::Persistence(format!("{}: {err}", path.display()))
}

#[async_trait]
impl JobStore for FileJobStore {
    async fn create(&self, record: JobRecord) -> Result<()> {
        let result = self.create_locked(&record).await;
        self.release(record.id);
        result?;
        tracing::debug!(job_id = %record.id, dir = %self.dir.display(), "Job created");
        Ok(())
    }

    async fn get_record(&self, id: JobId) -> Result<JobRecord> {
        let result = {
            let lock = self.lock_for(id);
            let _guard = lock.lock().await;
            self.read(id).await
        };
        self.release(id);
        result
    }

    async fn update(&self, id: JobId, mutation: Mutation) -> Result<JobRecord> {
        let result = self.update_locked(id, mutation).await;
        self.release(id);
        result
    }

    async fn list_records(&self) -> Result<Vec<JobRecord>> {
        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(persistence(&self.dir, e)),
        };

        let mut records = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| persistence(&self.dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let parsed = tokio::fs::read(&path)
                .await
                .map_err(|e| e.to_string())
                .and_then(|b| serde_json::from_slice::<JobRecord>(&b).map_err(|e| e.to_string()));
            match parsed {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable job file");
                }
            }
        }
        Ok(records)
    }
}
