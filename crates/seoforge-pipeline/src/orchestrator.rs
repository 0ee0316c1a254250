//! Job orchestration: drives one article job through the stage sequence.
//!
//! `PENDING → RESEARCHING → ANALYZING → OUTLINING → GENERATING → VALIDATING →
//! COMPLETED`, with `FAILED` on any unrecovered stage error. Research and
//! outline artifacts are checkpointed as soon as they exist; a rerun of a
//! failed job reuses them instead of calling the providers again.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;

use seoforge_llm::{AnthropicAdapter, GenerationClient, LoggingMiddleware, OpenAiAdapter};
use seoforge_types::{
    Article, ArticleRequest, JobId, JobStatus, Outline, ResearchResult, Result, SeoforgeError,
    Stage,
};

use crate::analyzer::{ContentRecommendations, SerpAnalyzer};
use crate::config::{LlmProviderKind, Settings};
use crate::content::ContentGenerator;
use crate::events::{NoopSink, ProgressEvent, ProgressSink};
use crate::outline::OutlineGenerator;
use crate::quality::QualityScorer;
use crate::research::{ResearchService, SerpApiProvider};
use crate::store::{JobRecord, JobStore};
use crate::text::round_to;
use crate::validation::SeoValidator;

const DEFAULT_RESULT_COUNT: usize = 10;

// ---------------------------------------------------------------------------
// Construction from settings
// ---------------------------------------------------------------------------

/// Build the generation client selected by `settings.llm`.
pub fn generation_client(settings: &Settings) -> Result<GenerationClient> {
    let llm = &settings.llm;
    let client = match llm.provider {
        LlmProviderKind::Openai => {
            let key = llm.openai_api_key.clone().ok_or_else(|| {
                SeoforgeError::Config("OPENAI_API_KEY is not set".into())
            })?;
            GenerationClient::new(
                OpenAiAdapter::new(key).with_default_model(llm.openai_model.clone()),
            )
        }
        LlmProviderKind::Anthropic => {
            let key = llm.anthropic_api_key.clone().ok_or_else(|| {
                SeoforgeError::Config("ANTHROPIC_API_KEY is not set".into())
            })?;
            GenerationClient::new(
                AnthropicAdapter::new(key).with_default_model(llm.anthropic_model.clone()),
            )
        }
    };
    Ok(client
        .with_retry_policy(settings.retry.policy())
        .with_middleware(LoggingMiddleware))
}

/// SerpAPI when a key is configured, synthetic results otherwise.
pub fn research_service(settings: &Settings) -> ResearchService {
    match &settings.research.serpapi_key {
        Some(key) => ResearchService::with_provider(Arc::new(
            SerpApiProvider::new(key.clone())
                .with_timeout(Duration::from_secs(settings.research.timeout_secs)),
        )),
        None => ResearchService::synthetic(),
    }
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

/// Runs article jobs against a shared [`JobStore`]. Cheap to clone.
#[derive(Clone)]
pub struct Orchestrator {
    store: Arc<dyn JobStore>,
    research: ResearchService,
    analyzer: SerpAnalyzer,
    outlines: OutlineGenerator,
    content: ContentGenerator,
    validator: Arc<SeoValidator>,
    scorer: QualityScorer,
    sink: Arc<dyn ProgressSink>,
    result_count: usize,
}

impl Orchestrator {
    /// Orchestrator with synthetic research and no progress observer.
    pub fn new(store: Arc<dyn JobStore>, client: GenerationClient) -> Self {
        Self {
            store,
            research: ResearchService::synthetic(),
            analyzer: SerpAnalyzer::new(Some(client.clone())),
            outlines: OutlineGenerator::new(client.clone()),
            content: ContentGenerator::new(client.clone()),
            validator: Arc::new(SeoValidator::new()),
            scorer: QualityScorer::new(Some(client)),
            sink: Arc::new(NoopSink),
            result_count: DEFAULT_RESULT_COUNT,
        }
    }

    pub fn from_settings(
        settings: &Settings,
        store: Arc<dyn JobStore>,
        client: GenerationClient,
    ) -> Self {
        Self::new(store, client)
            .with_research(research_service(settings))
            .with_result_count(settings.research.result_count)
    }

    pub fn with_research(mut self, research: ResearchService) -> Self {
        self.research = research;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_result_count(mut self, count: usize) -> Self {
        self.result_count = count;
        self
    }

    pub fn store(&self) -> &Arc<dyn JobStore> {
        &self.store
    }

    /// Validate and persist a new PENDING job. No external calls are made.
    pub async fn submit(&self, request: ArticleRequest) -> Result<JobId> {
        let request = request.validate()?;
        let record = JobRecord::new(&request);
        let id = record.id;
        self.store.create(record).await?;
        tracing::info!(job_id = %id, topic = %request.topic, "Job submitted");
        self.sink.notify(ProgressEvent::new(
            id,
            JobStatus::Pending,
            0.0,
            JobStatus::Pending.entry_step(),
        ));
        Ok(id)
    }

    /// Run a PENDING job, or resume a FAILED one from its checkpoints.
    ///
    /// The job is claimed atomically first, so concurrent calls for one job
    /// yield a single run and `NotResumable` for the others.
    pub async fn run(&self, job_id: JobId) -> Result<Article> {
        let job = self.store.claim(job_id).await?.to_job();
        tracing::info!(job_id = %job_id, status = %job.status, "Starting job");
        self.sink.notify(ProgressEvent::new(
            job_id,
            job.status,
            job.progress,
            job.current_step.as_str(),
        ));

        match self.execute(job_id, &job.request(), job.status).await {
            Ok(article) => {
                tracing::info!(
                    job_id = %job_id,
                    words = article.word_count,
                    seconds = article.generation_time_seconds,
                    "Job completed"
                );
                Ok(article)
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Job failed");
                let message = e.to_string();
                let progress = match self.store.mark_failed(job_id, &message).await {
                    Ok(record) => record.progress,
                    Err(store_err) => {
                        tracing::warn!(job_id = %job_id, error = %store_err, "Could not record failure");
                        job.progress
                    }
                };
                self.sink.notify(ProgressEvent::new(
                    job_id,
                    JobStatus::Failed,
                    progress,
                    message,
                ));
                Err(e)
            }
        }
    }

    /// Run the job on its own task.
    pub fn spawn(&self, job_id: JobId) -> JoinHandle<Result<Article>> {
        let this = self.clone();
        tokio::spawn(async move { this.run(job_id).await })
    }

    /// Research and analysis only, outside any job.
    pub async fn research_topic(&self, topic: &str) -> ResearchResult {
        tracing::info!(topic, "Researching topic");
        let raw = self.research.fetch(topic, self.result_count).await;
        self.analyzer.analyze(raw).await
    }

    /// Outline only, outside any job. Researches first when no research is given.
    pub async fn generate_outline(
        &self,
        request: ArticleRequest,
        research: Option<ResearchResult>,
    ) -> Result<Outline> {
        let request = request.validate()?;
        let research = match research {
            Some(r) => r,
            None => self.research_topic(&request.topic).await,
        };
        self.outlines.generate(&request, Some(&research)).await
    }

    pub fn content_recommendations(&self, research: &ResearchResult) -> ContentRecommendations {
        self.analyzer.recommendations(research)
    }

    // -----------------------------------------------------------------------
    // Stage sequence
    // -----------------------------------------------------------------------

    /// `claimed` is the status the claim already entered; that transition is
    /// not repeated.
    async fn execute(
        &self,
        id: JobId,
        request: &ArticleRequest,
        claimed: JobStatus,
    ) -> Result<Article> {
        let started = Instant::now();
        let resumable = self.store.get_resumable_data(id).await?;

        let research = match resumable.research {
            Some(research) => {
                tracing::info!(job_id = %id, "Reusing research checkpoint");
                research
            }
            None => {
                self.enter(id, claimed, JobStatus::Researching)
                    .await
                    .map_err(|e| SeoforgeError::in_stage(Stage::Research, &e))?;
                let raw = self.research.fetch(&request.topic, self.result_count).await;

                self.stage(Stage::Analysis, async {
                    self.enter(id, claimed, JobStatus::Analyzing).await?;
                    let analyzed = self.analyzer.analyze(raw).await;
                    self.store.save_research_checkpoint(id, &analyzed).await?;
                    Ok(analyzed)
                })
                .await?
            }
        };

        let outline = match resumable.outline {
            Some(outline) => {
                tracing::info!(job_id = %id, "Reusing outline checkpoint");
                outline
            }
            None => {
                self.stage(Stage::Outline, async {
                    self.enter(id, claimed, JobStatus::Outlining).await?;
                    let outline = self.outlines.generate(request, Some(&research)).await?;
                    self.store.save_outline_checkpoint(id, &outline).await?;
                    Ok(outline)
                })
                .await?
            }
        };

        let mut article = self
            .stage(Stage::Generation, async {
                self.enter(id, claimed, JobStatus::Generating).await?;
                self.content.generate(&outline, Some(&research)).await
            })
            .await?;

        self.stage(Stage::Validation, async {
            self.enter(id, claimed, JobStatus::Validating).await?;
            article.validation = Some(self.validator.validate(&article));
            Ok(())
        })
        .await?;

        self.stage(Stage::Scoring, async {
            self.transition(id, JobStatus::Validating, 90.0, "Scoring content quality")
                .await?;
            article.quality = Some(self.scorer.assess(&article).await);
            Ok(())
        })
        .await?;

        article.generation_time_seconds = round_to(started.elapsed().as_secs_f64(), 2);
        self.stage(Stage::Finalize, self.store.save_final_result(id, &article))
            .await?;
        self.sink.notify(ProgressEvent::new(
            id,
            JobStatus::Completed,
            100.0,
            JobStatus::Completed.entry_step(),
        ));
        Ok(article)
    }

    async fn stage<T>(
        &self,
        stage: Stage,
        fut: impl std::future::Future<Output = Result<T>>,
    ) -> Result<T> {
        fut.await.map_err(|e| SeoforgeError::in_stage(stage, &e))
    }

    /// Enter `status` at its entry progress unless the claim already did.
    async fn enter(&self, id: JobId, claimed: JobStatus, status: JobStatus) -> Result<()> {
        if status == claimed {
            return Ok(());
        }
        let progress = status.entry_progress().unwrap_or(0.0);
        self.transition(id, status, progress, status.entry_step()).await
    }

    async fn transition(
        &self,
        id: JobId,
        status: JobStatus,
        progress: f64,
        step: &str,
    ) -> Result<()> {
        self.store.update_progress(id, status, progress, step).await?;
        tracing::debug!(job_id = %id, status = %status, progress, step, "Job transition");
        self.sink.notify(ProgressEvent::new(id, status, progress, step));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;

    #[test]
    fn missing_provider_key_is_a_config_error() {
        let settings = Settings::default();
        assert!(matches!(
            generation_client(&settings),
            Err(SeoforgeError::Config(_))
        ));
    }

    #[test]
    fn client_uses_configured_model() {
        let mut settings = Settings::default();
        settings.llm.provider = LlmProviderKind::Anthropic;
        settings.llm.anthropic_api_key = Some("sk-ant-test".into());
        settings.llm.anthropic_model = "claude-custom".into();
        let client = generation_client(&settings).unwrap();
        assert_eq!(client.provider_name(), "anthropic");
        assert_eq!(client.model(), "claude-custom");
    }
}
