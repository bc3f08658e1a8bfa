//! Job commands: submit, upload, watch, status, health.

use chrono::Local;
use clap::Args;
use elev_common::ReqwestClient;
use elev_ingest::{
    IngestionRequest, Job, JobEvent, JobId, JobState, JobSubmissionClient, LocalFile,
    StatusChannel, WebSocketConnector,
};
use std::path::PathBuf;
use tracing::info;

use crate::{CliError, Config};

/// Arguments for `elev submit`.
#[derive(Debug, Args)]
pub struct SubmitArgs {
    /// Region or country code (e.g. "uk", "es")
    #[arg(long)]
    pub region: String,

    /// Bounding box as minX,minY,maxX,maxY in degrees
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
    pub bbox: Vec<f64>,

    /// Source GeoTIFF or WCS URL (repeatable)
    #[arg(long = "source", required = true)]
    pub sources: Vec<String>,

    /// Follow the job until it finishes
    #[arg(long)]
    pub watch: bool,
}

/// Arguments for `elev upload`.
#[derive(Debug, Args)]
pub struct UploadArgs {
    /// Region or country code
    #[arg(long)]
    pub region: String,

    /// Elevation file to upload
    #[arg(long)]
    pub file: PathBuf,

    /// Optional bounding box as minX,minY,maxX,maxY in degrees
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true)]
    pub bbox: Option<Vec<f64>>,

    /// Follow the job until it finishes
    #[arg(long)]
    pub watch: bool,
}

/// Arguments for `elev watch`.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Job id returned by submit/upload
    pub job_id: String,
}

/// Arguments for `elev status`.
#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Job id returned by submit/upload
    pub job_id: String,
}

fn client(config: &Config) -> Result<JobSubmissionClient<ReqwestClient>, CliError> {
    let http = ReqwestClient::with_timeout(config.request_timeout())?;
    Ok(JobSubmissionClient::new(http, config.endpoints()))
}

/// Submit a remote-URL ingestion.
pub async fn submit(args: SubmitArgs, config: &Config) -> Result<(), CliError> {
    let request = IngestionRequest::remote(args.region, args.bbox, args.sources);
    let job = client(config)?
        .submit(&request, &config.credentials())
        .await?;
    report_accepted(&job);
    if args.watch {
        follow(job, config).await
    } else {
        Ok(())
    }
}

/// Upload a local file for ingestion.
pub async fn upload(args: UploadArgs, config: &Config) -> Result<(), CliError> {
    let file = LocalFile::read(&args.file).map_err(|source| CliError::Read {
        path: args.file.clone(),
        source,
    })?;
    let mut request = IngestionRequest::upload(args.region, Some(file));
    if let Some(bbox) = args.bbox {
        request = request.with_bbox(bbox);
    }
    let job = client(config)?
        .submit(&request, &config.credentials())
        .await?;
    report_accepted(&job);
    if args.watch {
        follow(job, config).await
    } else {
        Ok(())
    }
}

/// Follow an existing job.
pub async fn watch(args: WatchArgs, config: &Config) -> Result<(), CliError> {
    follow(Job::new(args.job_id, JobState::Queued, None), config).await
}

/// Poll a job once.
pub async fn status(args: StatusArgs, config: &Config) -> Result<(), CliError> {
    let status = client(config)?
        .job_status(&JobId::new(args.job_id), &config.credentials())
        .await?;

    let state = status
        .state
        .map(|s| s.to_string())
        .unwrap_or_else(|| "UNKNOWN".to_string());
    println!("Job:    {}", status.job_id);
    println!("Status: {} ({})", state, status.raw_status);
    if let Some(error) = &status.error {
        println!("Error:  {error}");
    }
    if let Some(result) = &status.result {
        println!("Result: {result}");
    }
    Ok(())
}

/// Check backend health.
pub async fn health(config: &Config) -> Result<(), CliError> {
    let health = client(config)?.health().await?;
    println!(
        "{} {} {}",
        health.status,
        health.module.as_deref().unwrap_or("-"),
        health.version.as_deref().unwrap_or("-")
    );
    Ok(())
}

fn report_accepted(job: &Job) {
    println!("Job {} accepted ({})", job.id(), job.state());
    if let Some(message) = job.message() {
        println!("  {message}");
    }
}

async fn follow(mut job: Job, config: &Config) -> Result<(), CliError> {
    let connector = WebSocketConnector::new(config.endpoints(), config.credentials());
    let mut channel = StatusChannel::open(job.id().clone(), &connector, config.channel()).await;
    info!(job_id = %job.id(), "watching job");

    while let Some(event) = channel.next_event().await {
        println!("{}", format_event(&event));
        job.apply(&event);
    }

    match job.state() {
        JobState::Succeeded => Ok(()),
        state => Err(CliError::JobFailed {
            job_id: job.id().to_string(),
            message: job
                .message()
                .map(str::to_string)
                .unwrap_or_else(|| format!("tracking ended in state {state}")),
        }),
    }
}

fn format_event(event: &JobEvent) -> String {
    let time = Local::now().format("%H:%M:%S");
    let progress = event
        .progress()
        .map(|p| format!("{p:>3}%"))
        .unwrap_or_else(|| "    ".to_string());
    let state = event.state().to_string();
    match event.message() {
        Some(message) => format!("[{time}] {state:<9} {progress}  {message}"),
        None => format!("[{time}] {state:<9} {progress}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_event() {
        let line = format_event(&JobEvent::Running {
            progress: Some(65),
            message: Some("Extracting tiles".into()),
        });
        assert!(line.ends_with("RUNNING    65%  Extracting tiles"), "{line}");

        let line = format_event(&JobEvent::Queued { message: None });
        assert!(line.contains("QUEUED"));
    }
}
