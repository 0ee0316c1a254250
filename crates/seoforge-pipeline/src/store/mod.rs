//! Durable job records and stage checkpoints.
//!
//! A [`JobStore`] implementation supplies four primitives (create, read one,
//! mutate one, read all). Every higher-level operation is a single mutation
//! applied under the job's lock, so concurrent writers on the same job are
//! serialised while different jobs never contend.

mod file;
mod memory;

pub use file::FileJobStore;
pub use memory::MemoryJobStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use seoforge_types::checkpoint::{self, CheckpointPayload};
use seoforge_types::{
    Article, ArticleRequest, Job, JobId, JobStatus, Outline, ResearchResult, Result,
    SeoforgeError,
};

// ---------------------------------------------------------------------------
// JobRecord
// ---------------------------------------------------------------------------

/// The persisted form of a job. Stage artifacts are kept as checkpoint blobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: f64,
    pub current_step: String,
    pub topic: String,
    pub target_word_count: u32,
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outline_data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_data: Option<String>,
    #[serde(default)]
    pub research_collected: bool,
    #[serde(default)]
    pub outline_generated: bool,
    #[serde(default)]
    pub content_generated: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    pub fn new(request: &ArticleRequest) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4(),
            status: JobStatus::Pending,
            progress: 0.0,
            current_step: JobStatus::Pending.entry_step().into(),
            topic: request.topic.clone(),
            target_word_count: request.target_word_count,
            language: request.language.clone(),
            research_data: None,
            outline_data: None,
            result_data: None,
            research_collected: false,
            outline_generated: false,
            content_generated: false,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    /// Caller-facing view. Stage flags and the result reflect only blobs that
    /// decode.
    pub fn to_job(&self) -> Job {
        let result = self
            .result_data
            .as_deref()
            .and_then(|blob| checkpoint::decode::<Article>(blob).ok())
            .map(|c| c.data);
        Job {
            id: self.id,
            status: self.status,
            progress: self.progress,
            current_step: self.current_step.clone(),
            topic: self.topic.clone(),
            target_word_count: self.target_word_count,
            language: self.language.clone(),
            research_collected: has_valid::<ResearchResult>(self.research_data.as_deref()),
            outline_generated: has_valid::<Outline>(self.outline_data.as_deref()),
            content_generated: result.is_some(),
            result,
            error_message: self.error_message.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            completed_at: self.completed_at,
        }
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn apply_progress(&mut self, status: JobStatus, progress: f64, step: &str) {
        self.status = status;
        self.progress = progress;
        self.current_step = step.to_string();
        if status != JobStatus::Failed {
            self.error_message = None;
        }
        self.completed_at = if status == JobStatus::Completed {
            Some(Utc::now())
        } else {
            None
        };
        self.touch();
    }

    /// Take the job for a run: the status moves to the first stage that has
    /// no readable checkpoint. Only PENDING and FAILED jobs can be claimed.
    pub fn claim(&mut self) -> Result<()> {
        if !self.status.is_resumable() {
            return Err(SeoforgeError::NotResumable {
                id: self.id,
                status: self.status,
            });
        }
        let status = if !has_valid::<ResearchResult>(self.research_data.as_deref()) {
            JobStatus::Researching
        } else if !has_valid::<Outline>(self.outline_data.as_deref()) {
            JobStatus::Outlining
        } else {
            JobStatus::Generating
        };
        self.apply_progress(status, status.entry_progress().unwrap_or(0.0), status.entry_step());
        Ok(())
    }

    /// Store the research checkpoint. A readable existing checkpoint is kept.
    pub fn attach_research(&mut self, blob: String) {
        if has_valid::<ResearchResult>(self.research_data.as_deref()) {
            return;
        }
        self.research_data = Some(blob);
        self.research_collected = true;
        self.touch();
    }

    /// Store the outline checkpoint. A readable existing checkpoint is kept.
    pub fn attach_outline(&mut self, blob: String) {
        if has_valid::<Outline>(self.outline_data.as_deref()) {
            return;
        }
        self.outline_data = Some(blob);
        self.outline_generated = true;
        self.touch();
    }

    pub fn complete(&mut self, blob: String) {
        self.result_data = Some(blob);
        self.content_generated = true;
        self.apply_progress(JobStatus::Completed, 100.0, JobStatus::Completed.entry_step());
    }

    /// Progress and step are left where the failure happened.
    pub fn fail(&mut self, message: &str) {
        self.status = JobStatus::Failed;
        self.error_message = Some(message.to_string());
        self.completed_at = None;
        self.touch();
    }
}

fn has_valid<T: CheckpointPayload>(blob: Option<&str>) -> bool {
    blob.is_some_and(|b| checkpoint::decode::<T>(b).is_ok())
}

/// Checkpoints available to a resumed run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResumableData {
    pub research: Option<ResearchResult>,
    pub outline: Option<Outline>,
}

/// A single read-modify-write on one job record.
pub type Mutation = Box<dyn FnOnce(&mut JobRecord) -> Result<()> + Send>;

// ---------------------------------------------------------------------------
// JobStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a new record. The id must not exist yet.
    async fn create(&self, record: JobRecord) -> Result<()>;

    /// Read one record; `JobNotFound` for an unknown id.
    async fn get_record(&self, id: JobId) -> Result<JobRecord>;

    /// Apply `mutation` atomically under the job's lock and persist the result.
    /// If the mutation fails nothing is written.
    async fn update(&self, id: JobId, mutation: Mutation) -> Result<JobRecord>;

    /// All records, in no particular order.
    async fn list_records(&self) -> Result<Vec<JobRecord>>;

    async fn get(&self, id: JobId) -> Result<Job> {
        Ok(self.get_record(id).await?.to_job())
    }

    async fn update_progress(
        &self,
        id: JobId,
        status: JobStatus,
        progress: f64,
        step: &str,
    ) -> Result<()> {
        let step = step.to_string();
        self.update(
            id,
            Box::new(move |r| {
                r.apply_progress(status, progress, &step);
                Ok(())
            }),
        )
        .await
        .map(|_| ())
    }

    async fn save_research_checkpoint(&self, id: JobId, research: &ResearchResult) -> Result<()> {
        let blob = checkpoint::encode(research)?;
        self.update(
            id,
            Box::new(move |r| {
                r.attach_research(blob);
                Ok(())
            }),
        )
        .await
        .map(|_| ())
    }

    async fn save_outline_checkpoint(&self, id: JobId, outline: &Outline) -> Result<()> {
        let blob = checkpoint::encode(outline)?;
        self.update(
            id,
            Box::new(move |r| {
                r.attach_outline(blob);
                Ok(())
            }),
        )
        .await
        .map(|_| ())
    }

    /// Store the article and mark the job COMPLETED at 100.
    async fn save_final_result(&self, id: JobId, article: &Article) -> Result<()> {
        let blob = checkpoint::encode(article)?;
        self.update(
            id,
            Box::new(move |r| {
                r.complete(blob);
                Ok(())
            }),
        )
        .await
        .map(|_| ())
    }

    /// Returns the failed record so callers can report where the job stopped.
    async fn mark_failed(&self, id: JobId, message: &str) -> Result<JobRecord> {
        let message = message.to_string();
        self.update(
            id,
            Box::new(move |r| {
                r.fail(&message);
                Ok(())
            }),
        )
        .await
    }

    /// Atomically check that the job may run and move it into its first
    /// outstanding stage. Of two concurrent claims at most one succeeds.
    async fn claim(&self, id: JobId) -> Result<JobRecord> {
        self.update(id, Box::new(|r| r.claim())).await
    }

    /// Newest first, optionally filtered by status.
    async fn list(&self, status: Option<JobStatus>, limit: usize) -> Result<Vec<Job>> {
        let mut records = self.list_records().await?;
        records.retain(|r| status.map_or(true, |s| r.status == s));
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records.iter().take(limit).map(JobRecord::to_job).collect())
    }

    /// Decode each checkpoint independently. Unreadable blobs count as absent.
    async fn get_resumable_data(&self, id: JobId) -> Result<ResumableData> {
        let record = self.get_record(id).await?;
        Ok(ResumableData {
            research: decode_or_warn(id, record.research_data.as_deref()),
            outline: decode_or_warn(id, record.outline_data.as_deref()),
        })
    }
}

fn decode_or_warn<T: CheckpointPayload>(id: JobId, blob: Option<&str>) -> Option<T> {
    match checkpoint::decode::<T>(blob?) {
        Ok(c) => Some(c.data),
        Err(e) => {
            tracing::warn!(job_id = %id, kind = T::KIND, error = %e, "Ignoring unreadable checkpoint");
            None
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn new_record_is_pending() {
        let r = JobRecord::new(&ArticleRequest::new("topic here").with_word_count(800));
        assert_eq!(r.status, JobStatus::Pending);
        assert_eq!(r.progress, 0.0);
        assert_eq!(r.target_word_count, 800);
        assert!(!r.research_collected);
    }

    #[test]
    fn progress_clears_error_and_sets_completion() {
        let mut r = JobRecord::new(&ArticleRequest::new("topic here"));
        r.fail("boom");
        r.apply_progress(JobStatus::Researching, 10.0, "again");
        assert!(r.error_message.is_none());
        assert!(r.completed_at.is_none());
        r.apply_progress(JobStatus::Completed, 100.0, "done");
        assert!(r.completed_at.is_some());
    }

    #[test]
    fn unreadable_checkpoint_is_replaced() {
        let mut r = JobRecord::new(&ArticleRequest::new("topic here"));
        r.research_data = Some("{not json".into());
        let blob = checkpoint::encode(&research("fresh")).unwrap();
        r.attach_research(blob.clone());
        assert_eq!(r.research_data.as_deref(), Some(blob.as_str()));
        assert!(r.research_collected);
    }

    #[test]
    fn unreadable_result_blob_reads_as_absent() {
        let mut r = JobRecord::new(&ArticleRequest::new("topic here"));
        r.result_data = Some("garbage".into());
        assert!(r.to_job().result.is_none());
    }

    #[test]
    fn stage_flags_follow_readable_blobs() {
        let mut r = JobRecord::new(&ArticleRequest::new("topic here"));
        r.research_data = Some("{not json".into());
        r.research_collected = true;
        r.outline_data = Some(checkpoint::encode(&outline("Plan")).unwrap());
        r.content_generated = true;
        let job = r.to_job();
        assert!(!job.research_collected);
        assert!(job.outline_generated);
        assert!(!job.content_generated);
    }

    #[test]
    fn claim_starts_at_first_missing_checkpoint() {
        let mut r = JobRecord::new(&ArticleRequest::new("topic here"));
        r.claim().unwrap();
        assert_eq!(r.status, JobStatus::Researching);
        assert_eq!(r.progress, 10.0);
        assert_eq!(r.current_step, "Fetching search results");

        let mut r = JobRecord::new(&ArticleRequest::new("topic here"));
        r.research_data = Some(checkpoint::encode(&research("q")).unwrap());
        r.fail("outline stage failed: boom");
        r.claim().unwrap();
        assert_eq!(r.status, JobStatus::Outlining);
        assert_eq!(r.progress, 35.0);
        assert!(r.error_message.is_none());
    }

    #[test]
    fn claim_rejects_running_and_completed_jobs() {
        let mut r = JobRecord::new(&ArticleRequest::new("topic here"));
        r.apply_progress(JobStatus::Outlining, 35.0, "Creating article outline");
        assert!(matches!(
            r.claim(),
            Err(SeoforgeError::NotResumable { status: JobStatus::Outlining, .. })
        ));
        assert_eq!(r.status, JobStatus::Outlining);

        r.complete("blob".into());
        assert!(matches!(
            r.claim(),
            Err(SeoforgeError::NotResumable { status: JobStatus::Completed, .. })
        ));
    }

    #[test]
    fn future_schema_version_is_absent() {
        let mut r = JobRecord::new(&ArticleRequest::new("topic here"));
        r.outline_data = Some(r#"{"schema_version": 99, "kind": "outline", "data": {}}"#.into());
        assert!(decode_or_warn::<Outline>(r.id, r.outline_data.as_deref()).is_none());
    }
}
