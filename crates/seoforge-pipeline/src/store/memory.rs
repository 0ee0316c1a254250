use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::Mutex;

use seoforge_types::{JobId, Result, SeoforgeError};

use super::{JobRecord, JobStore, Mutation};

/// Process-local store. Records are lost when the process exits.
#[derive(Default)]
pub struct MemoryJobStore {
    jobs: DashMap<JobId, Arc<Mutex<JobRecord>>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    // Clone the Arc out so the shard guard is released before any await.
    fn entry(&self, id: JobId) -> Result<Arc<Mutex<JobRecord>>> {
        self.jobs
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(SeoforgeError::JobNotFound(id))
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, record: JobRecord) -> Result<()> {
        let id = record.id;
        match self.jobs.entry(id) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(SeoforgeError::Persistence(
                format!("job {id} already exists"),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::new(Mutex::new(record)));
                tracing::debug!(job_id = %id, "Job created");
                Ok(())
            }
        }
    }

    async fn get_record(&self, id: JobId) -> Result<JobRecord> {
        let entry = self.entry(id)?;
        let record = entry.lock().await;
        Ok(record.clone())
    }

    async fn update(&self, id: JobId, mutation: Mutation) -> Result<JobRecord> {
        let entry = self.entry(id)?;
        let mut guard = entry.lock().await;
        let mut next = guard.clone();
        mutation(&mut next)?;
        *guard = next.clone();
        Ok(next)
    }

    async fn list_records(&self) -> Result<Vec<JobRecord>> {
        let entries: Vec<_> = self.jobs.iter().map(|e| e.value().clone()).collect();
        let mut out = Vec::with_capacity(entries.len());
        for entry in entries {
            out.push(entry.lock().await.clone());
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::exercise_store;
    use super::*;
    use seoforge_types::{ArticleRequest, JobStatus};

    #[tokio::test]
    async fn memory_store_behaviour() {
        let store = MemoryJobStore::new();
        exercise_store(&store).await;
    }

    #[tokio::test]
    async fn duplicate_create_is_rejected() {
        let store = MemoryJobStore::new();
        let record = JobRecord::new(&ArticleRequest::new("topic here"));
        store.create(record.clone()).await.unwrap();
        assert!(matches!(
            store.create(record).await,
            Err(SeoforgeError::Persistence(_))
        ));
    }

    #[tokio::test]
    async fn failed_mutation_leaves_record_untouched() {
        let store = MemoryJobStore::new();
        let record = JobRecord::new(&ArticleRequest::new("topic here"));
        let id = record.id;
        store.create(record).await.unwrap();

        let result = store
            .update(
                id,
                Box::new(|r| {
                    r.status = JobStatus::Generating;
                    Err(SeoforgeError::Other("nope".into()))
                }),
            )
            .await;
        assert!(result.is_err());
        assert_eq!(store.get(id).await.unwrap().status, JobStatus::Pending);
    }

    #[tokio::test]
    async fn concurrent_updates_on_one_job_are_serialised() {
        let store = Arc::new(MemoryJobStore::new());
        let record = JobRecord::new(&ArticleRequest::new("topic here"));
        let id = record.id;
        store.create(record).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..50 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .update(
                        id,
                        Box::new(|r| {
                            r.progress += 1.0;
                            Ok(())
                        }),
                    )
                    .await
                    .unwrap();
            }));
        }
        for h in handles {
            h.await.unwrap();
        }
        assert_eq!(store.get(id).await.unwrap().progress, 50.0);
    }
}
