//! CLI binary for generating and managing seoforge article jobs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::task::JoinHandle;
use tracing_subscriber::EnvFilter;

use seoforge_llm::UsageTrackingMiddleware;
use seoforge_pipeline::{
    generation_client, EventEmitter, FileJobStore, JobStore, Orchestrator, Settings,
};
use seoforge_types::{Article, ArticleRequest, Job, JobId, JobStatus};

#[derive(Parser)]
#[command(name = "seoforge", version, about = "Resumable SEO article generation")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (default: ./seoforge.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Job store directory (overrides settings)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a new article job and run it to completion
    Generate {
        /// Topic or primary keyword
        topic: String,

        /// Target word count (500-10000)
        #[arg(short, long)]
        words: Option<u32>,

        /// Article language code
        #[arg(short, long)]
        language: Option<String>,

        /// Write the finished markdown here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Rerun a pending or failed job from its last checkpoint
    Resume {
        job_id: JobId,

        /// Write the finished markdown here
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show one job
    Status {
        job_id: JobId,

        /// Print the full job as JSON
        #[arg(long)]
        json: bool,
    },

    /// List jobs, newest first
    List {
        /// Only jobs in this status
        #[arg(short, long)]
        status: Option<JobStatus>,

        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Research a topic without creating a job
    Research {
        topic: String,
    },

    /// Produce an outline without creating a job
    Outline {
        topic: String,

        #[arg(short, long)]
        words: Option<u32>,

        #[arg(short, long)]
        language: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut settings = Settings::load_from(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        settings.data_dir = dir;
    }

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.log_level))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();
    tracing::debug!(
        data_dir = %settings.data_dir.display(),
        provider = ?settings.llm.provider,
        "Settings loaded"
    );

    match cli.command {
        Commands::Generate {
            topic,
            words,
            language,
            output,
        } => {
            let request = build_request(&settings, topic, words, language);
            cmd_generate(&settings, request, output.as_deref()).await?;
        }
        Commands::Resume { job_id, output } => {
            cmd_resume(&settings, job_id, output.as_deref()).await?;
        }
        Commands::Status { job_id, json } => {
            cmd_status(&settings, job_id, json).await?;
        }
        Commands::List { status, limit } => {
            cmd_list(&settings, status, limit).await?;
        }
        Commands::Research { topic } => {
            cmd_research(&settings, &topic).await?;
        }
        Commands::Outline {
            topic,
            words,
            language,
        } => {
            let request = build_request(&settings, topic, words, language);
            cmd_outline(&settings, request).await?;
        }
    }

    Ok(())
}

fn build_request(
    settings: &Settings,
    topic: String,
    words: Option<u32>,
    language: Option<String>,
) -> ArticleRequest {
    ArticleRequest::new(topic)
        .with_word_count(words.unwrap_or(settings.default_word_count))
        .with_language(language.unwrap_or_else(|| settings.default_language.clone()))
}

fn open_store(settings: &Settings) -> Arc<FileJobStore> {
    Arc::new(FileJobStore::new(&settings.data_dir))
}

// ---------------------------------------------------------------------------
// Running jobs
// ---------------------------------------------------------------------------

/// An orchestrator wired to the file store with a live progress printer.
struct Runner {
    orchestrator: Orchestrator,
    usage: UsageTrackingMiddleware,
    printer: JoinHandle<()>,
}

impl Runner {
    fn new(settings: &Settings) -> anyhow::Result<Self> {
        let usage = UsageTrackingMiddleware::new();
        let client = generation_client(settings)?.with_middleware(usage.clone());

        let emitter = EventEmitter::new(settings.event_capacity);
        let printer = emitter.spawn_observer(|event| {
            println!(
                "[{:>5.1}%] {:<11} {}",
                event.progress,
                event.status.as_str(),
                event.step
            );
        });

        let orchestrator = Orchestrator::from_settings(settings, open_store(settings), client)
            .with_sink(Arc::new(emitter));
        Ok(Self {
            orchestrator,
            usage,
            printer,
        })
    }

    /// Run the job, wait for the printer to drain, then report.
    async fn run(self, job_id: JobId, output: Option<&Path>) -> anyhow::Result<()> {
        let Runner {
            orchestrator,
            usage,
            printer,
        } = self;

        let result = orchestrator.run(job_id).await;
        drop(orchestrator);
        printer.await.ok();

        match result {
            Ok(article) => {
                print_article_summary(job_id, &article);
                println!(
                    "Tokens: {} in / {} out over {} calls",
                    usage.total_input_tokens(),
                    usage.total_output_tokens(),
                    usage.calls()
                );
                if let Some(path) = output {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::write(path, &article.full_content)?;
                    println!("Written to {}", path.display());
                }
                Ok(())
            }
            Err(e) => {
                eprintln!("Job {job_id} failed. Resume with: seoforge resume {job_id}");
                Err(e.into())
            }
        }
    }
}

async fn cmd_generate(
    settings: &Settings,
    request: ArticleRequest,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let runner = Runner::new(settings)?;
    let job_id = runner.orchestrator.submit(request).await?;
    println!("Job {job_id} submitted");
    runner.run(job_id, output).await
}

async fn cmd_resume(settings: &Settings, job_id: JobId, output: Option<&Path>) -> anyhow::Result<()> {
    let runner = Runner::new(settings)?;
    let job = runner.orchestrator.store().get(job_id).await?;
    println!(
        "Resuming job {job_id} ({}, research {}, outline {})",
        job.status,
        checkmark(job.research_collected),
        checkmark(job.outline_generated)
    );
    runner.run(job_id, output).await
}

fn checkmark(done: bool) -> &'static str {
    if done {
        "cached"
    } else {
        "pending"
    }
}

fn print_article_summary(job_id: JobId, article: &Article) {
    println!("\nJob {job_id} completed in {:.2}s", article.generation_time_seconds);
    println!("Title: {}", article.title);
    println!("Words: {}", article.word_count);
    if let Some(validation) = &article.validation {
        println!(
            "SEO checks: {:.1}% ({})",
            validation.score,
            if validation.is_valid { "valid" } else { "needs work" }
        );
        for issue in &validation.issues {
            println!("  - {issue}");
        }
    }
    if let Some(quality) = &article.quality {
        println!(
            "Quality: {:.1} (readability {:.1}, seo {:.1})",
            quality.overall_score, quality.readability_score, quality.seo_score
        );
        if quality.needs_revision {
            println!("Revision recommended:");
            for suggestion in &quality.improvement_suggestions {
                println!("  - {suggestion}");
            }
            if let Some(notes) = &quality.revision_notes {
                println!("Notes:\n{notes}");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Inspecting jobs
// ---------------------------------------------------------------------------

async fn cmd_status(settings: &Settings, job_id: JobId, json: bool) -> anyhow::Result<()> {
    let job = open_store(settings).get(job_id).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&job)?);
        return Ok(());
    }

    println!("Job: {}", job.id);
    println!("Topic: {}", job.topic);
    println!("Status: {} ({:.1}%)", job.status, job.progress);
    println!("Step: {}", job.current_step);
    println!(
        "Stages: research={} outline={} content={}",
        job.research_collected, job.outline_generated, job.content_generated
    );
    if let Some(error) = &job.error_message {
        println!("Error: {error}");
    }
    println!("Created: {}", job.created_at.to_rfc3339());
    if let Some(done) = job.completed_at {
        println!("Completed: {}", done.to_rfc3339());
    }
    Ok(())
}

async fn cmd_list(settings: &Settings, status: Option<JobStatus>, limit: usize) -> anyhow::Result<()> {
    let jobs = open_store(settings).list(status, limit).await?;
    if jobs.is_empty() {
        println!("No jobs");
        return Ok(());
    }
    for job in &jobs {
        print_job_line(job);
    }
    Ok(())
}

fn print_job_line(job: &Job) {
    println!(
        "{}  {:<10} {:>5.1}%  {}  {}",
        job.id,
        job.status.as_str(),
        job.progress,
        job.created_at.format("%Y-%m-%d %H:%M"),
        job.topic
    );
}

// ---------------------------------------------------------------------------
// Stand-alone stages
// ---------------------------------------------------------------------------

async fn cmd_research(settings: &Settings, topic: &str) -> anyhow::Result<()> {
    let client = generation_client(settings)?;
    let orchestrator = Orchestrator::from_settings(settings, open_store(settings), client);
    let research = orchestrator.research_topic(topic).await;
    let recommendations = orchestrator.content_recommendations(&research);
    let report = serde_json::json!({
        "research": research,
        "recommendations": recommendations,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn cmd_outline(settings: &Settings, request: ArticleRequest) -> anyhow::Result<()> {
    let client = generation_client(settings)?;
    let orchestrator = Orchestrator::from_settings(settings, open_store(settings), client);
    let outline = orchestrator.generate_outline(request, None).await?;
    println!("{}", serde_json::to_string_pretty(&outline)?);
    Ok(())
}
