use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{info, info_span, warn, Instrument, Span};

use super::error::JobError;
use super::hooks::HookRegistry;
use super::locks::JobLocks;
use super::{JobStatus, JobType};
use crate::events::{JobEvent, JobEventBroadcaster};
use crate::media::{MediaAcquirer, MediaArtifacts};
use crate::repository::SourceRepository;
use crate::resolver::resolve_video_id;
use crate::sanitize;
use crate::source::{Source, SourceUpdate};

/// Result of a completed job invocation.
#[derive(Debug, Clone, Serialize)]
pub struct JobOutcome {
    /// The source as persisted after the final status write.
    pub source: Source,
    /// Set for imports.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifacts: Option<MediaArtifacts>,
}

/// A job whose preconditions have been checked against a fresh read.
struct Prepared {
    source: Source,
    job: JobType,
    /// Resolved for imports only.
    video_id: Option<String>,
}

/// Drives job invocations through the status state machine.
///
/// Cloning is cheap; clones share the lock registry, so serialization per
/// `(source_id, job_type)` holds across all of them.
#[derive(Clone)]
pub struct JobRunner {
    repo: Arc<dyn SourceRepository>,
    acquirer: Arc<MediaAcquirer>,
    hooks: Arc<HookRegistry>,
    locks: Arc<JobLocks>,
    events: JobEventBroadcaster,
    submit_timeout: Option<Duration>,
}

fn job_span(source_id: &str, job: JobType) -> Span {
    info_span!("job", source_id = %source_id, job_type = %job)
}

impl JobRunner {
    pub fn new(repo: Arc<dyn SourceRepository>, acquirer: Arc<MediaAcquirer>) -> Self {
        Self {
            repo,
            acquirer,
            hooks: Arc::new(HookRegistry::new()),
            locks: Arc::new(JobLocks::new()),
            events: JobEventBroadcaster::default(),
            submit_timeout: None,
        }
    }

    pub fn with_hooks(mut self, hooks: HookRegistry) -> Self {
        self.hooks = Arc::new(hooks);
        self
    }

    pub fn with_events(mut self, events: JobEventBroadcaster) -> Self {
        self.events = events;
        self
    }

    /// Limit applied to jobs started through [`JobRunner::submit`].
    pub fn with_submit_timeout(mut self, limit: Duration) -> Self {
        self.submit_timeout = Some(limit);
        self
    }

    pub fn repository(&self) -> &Arc<dyn SourceRepository> {
        &self.repo
    }

    pub fn acquirer(&self) -> &Arc<MediaAcquirer> {
        &self.acquirer
    }

    pub fn events(&self) -> &JobEventBroadcaster {
        &self.events
    }

    /// Runs `job` on `source_id` to completion.
    ///
    /// Waits for any in-flight invocation of the same job on the same
    /// source. Never retries.
    pub async fn run(&self, source_id: &str, job: JobType) -> Result<JobOutcome, JobError> {
        async {
            let _guard = self.locks.acquire(source_id, job).await;
            self.run_locked(source_id, job).await
        }
        .instrument(job_span(source_id, job))
        .await
    }

    /// Like [`JobRunner::run`], but gives up after `limit` and records the
    /// job as failed. Time spent waiting for the lock does not count.
    pub async fn run_with_timeout(
        &self,
        source_id: &str,
        job: JobType,
        limit: Duration,
    ) -> Result<JobOutcome, JobError> {
        async {
            let _guard = self.locks.acquire(source_id, job).await;
            self.within(source_id, job, limit, self.run_locked(source_id, job))
                .await
        }
        .instrument(job_span(source_id, job))
        .await
    }

    /// Validates the job, marks it `Pending` and runs the rest in the
    /// background. Fails with `Conflict` instead of waiting when the job is
    /// already in flight. Returns the source as it looks after the `Pending`
    /// write.
    pub async fn submit(&self, source_id: &str, job: JobType) -> Result<Source, JobError> {
        let span = job_span(source_id, job);
        let guard = self
            .locks
            .try_acquire(source_id, job)
            .ok_or_else(|| JobError::Conflict {
                source_id: source_id.to_string(),
                job,
            })?;

        let mut prepared = self
            .prepare(source_id, job)
            .instrument(span.clone())
            .await?;

        let current = prepared.source.status(job);
        self.transition(source_id, job, current, JobStatus::Pending)
            .await?;
        prepared.source.set_status(job, JobStatus::Pending);
        self.events
            .send(JobEvent::new(source_id, job, JobStatus::Pending));
        span.in_scope(|| info!("Job queued"));

        let queued = prepared.source.clone();
        let runner = self.clone();
        tokio::spawn(
            async move {
                let _guard = guard;
                let id = prepared.source.source_id.clone();
                let result = match runner.submit_timeout {
                    Some(limit) => {
                        runner
                            .within(&id, job, limit, runner.execute(prepared))
                            .await
                    }
                    None => runner.execute(prepared).await,
                };
                if let Err(e) = result {
                    warn!(error = %e, "Background job failed");
                }
            }
            .instrument(span),
        );

        Ok(queued)
    }

    /// Marks jobs left `Pending` or `Processing` by a previous process as
    /// `Failed`. Call once at startup before accepting work.
    pub async fn recover_interrupted(&self) -> Result<usize, JobError> {
        let mut recovered = 0;
        for source in self.repo.list().await? {
            for job in JobType::ALL {
                let status = source.status(job);
                if !matches!(status, JobStatus::Pending | JobStatus::Processing) {
                    continue;
                }
                if self
                    .repo
                    .compare_and_set_status(&source.source_id, job, status, JobStatus::Failed)
                    .await?
                {
                    recovered += 1;
                    self.events.send(JobEvent::failed(
                        &source.source_id,
                        job,
                        "interrupted by shutdown",
                    ));
                }
            }
        }
        if recovered > 0 {
            warn!(count = recovered, "Marked interrupted jobs as failed");
        }
        Ok(recovered)
    }

    /// Acquires `video_id` into the source's media folder without running
    /// the import job. Statuses are untouched.
    ///
    /// Holds the source's import lock for the whole acquisition and fails
    /// with `Conflict` instead of waiting, so it never writes the folder
    /// while an import does.
    pub async fn acquire_for_source(
        &self,
        source_id: &str,
        video_id: &str,
    ) -> Result<MediaArtifacts, JobError> {
        let conflict = || JobError::Conflict {
            source_id: source_id.to_string(),
            job: JobType::ImportSource,
        };
        let _guard = self
            .locks
            .try_acquire(source_id, JobType::ImportSource)
            .ok_or_else(conflict)?;

        let source = self
            .repo
            .get(source_id)
            .await?
            .ok_or_else(|| JobError::NotFound(source_id.to_string()))?;
        // An import left in flight by another process still owns the folder.
        if matches!(
            source.import_status,
            JobStatus::Pending | JobStatus::Processing
        ) {
            return Err(conflict());
        }

        let artifacts = self
            .acquirer
            .acquire(video_id, &source.media_folder())
            .await?;
        info!(source_id = %source_id, video_id = %video_id, "Media added to source");
        Ok(artifacts)
    }

    async fn run_locked(&self, source_id: &str, job: JobType) -> Result<JobOutcome, JobError> {
        let prepared = self.prepare(source_id, job).await?;
        self.execute(prepared).await
    }

    /// Fresh read plus the checks that must not touch any status.
    async fn prepare(&self, source_id: &str, job: JobType) -> Result<Prepared, JobError> {
        let source = self
            .repo
            .get(source_id)
            .await?
            .ok_or_else(|| JobError::NotFound(source_id.to_string()))?;

        if let Some(prerequisite) = job.prerequisite() {
            let status = source.status(prerequisite);
            if status != JobStatus::Completed {
                return Err(JobError::PreconditionFailed {
                    job,
                    prerequisite,
                    status,
                });
            }
        }

        let video_id = match job {
            JobType::ImportSource => {
                let resolved = source.url.as_deref().and_then(resolve_video_id);
                match resolved {
                    Some(id) => Some(id),
                    None => {
                        return Err(JobError::UnsupportedSource {
                            source_id: source.source_id.clone(),
                            url: source.url.as_deref().map(sanitize::redact_url),
                        })
                    }
                }
            }
            _ => None,
        };

        Ok(Prepared {
            source,
            job,
            video_id,
        })
    }

    /// Conditional status write; a stale `current` or a transition the
    /// state machine forbids is reported as `Conflict`.
    async fn transition(
        &self,
        source_id: &str,
        job: JobType,
        current: JobStatus,
        next: JobStatus,
    ) -> Result<(), JobError> {
        let conflict = || JobError::Conflict {
            source_id: source_id.to_string(),
            job,
        };
        if !current.can_transition_to(next) {
            return Err(conflict());
        }
        if !self
            .repo
            .compare_and_set_status(source_id, job, current, next)
            .await?
        {
            return Err(conflict());
        }
        Ok(())
    }

    async fn execute(&self, prepared: Prepared) -> Result<JobOutcome, JobError> {
        let Prepared {
            mut source,
            job,
            video_id,
        } = prepared;
        let id = source.source_id.clone();

        self.transition(&id, job, source.status(job), JobStatus::Processing)
            .await?;
        source.set_status(job, JobStatus::Processing);
        self.events
            .send(JobEvent::new(&id, job, JobStatus::Processing));
        info!("Job started");

        let result = match video_id {
            Some(video_id) => self.import(&mut source, &video_id).await.map(Some),
            None => self.invoke_hook(&source, job).await.map(|()| None),
        };

        let artifacts = match result {
            Ok(artifacts) => artifacts,
            Err(err) => {
                self.mark_failed(&id, job, &err).await;
                return Err(err);
            }
        };

        // Conditional so a completion that lands after a timeout was
        // recorded cannot overwrite the `Failed` status.
        match self
            .repo
            .compare_and_set_status(&id, job, JobStatus::Processing, JobStatus::Completed)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                warn!("Status changed while the job was running; completion discarded");
                return Err(JobError::Conflict {
                    source_id: id,
                    job,
                });
            }
            Err(err) => {
                let err = JobError::from(err);
                self.mark_failed(&id, job, &err).await;
                return Err(err);
            }
        }
        source.set_status(job, JobStatus::Completed);
        self.events
            .send(JobEvent::new(&id, job, JobStatus::Completed));
        info!("Job completed");

        Ok(JobOutcome { source, artifacts })
    }

    /// Acquires media and records the combined file on the source.
    async fn import(
        &self,
        source: &mut Source,
        video_id: &str,
    ) -> Result<MediaArtifacts, JobError> {
        let artifacts = self
            .acquirer
            .acquire(video_id, &source.media_folder())
            .await?;

        let changes = SourceUpdate {
            video: Some(Some(artifacts.combined.key.clone())),
            ..Default::default()
        };
        *source = self.repo.update(&source.source_id, changes).await?;
        Ok(artifacts)
    }

    async fn invoke_hook(&self, source: &Source, job: JobType) -> Result<(), JobError> {
        self.hooks
            .get(job)
            .run(source)
            .instrument(info_span!("hook"))
            .await
            .map_err(|e| JobError::Hook {
                job,
                message: e.message,
            })
    }

    /// Best effort: the original error is what the caller sees.
    async fn mark_failed(&self, source_id: &str, job: JobType, err: &JobError) {
        warn!(error = %err, "Job failed");
        if let Err(e) = self
            .repo
            .set_status(source_id, job, JobStatus::Failed)
            .await
        {
            warn!(error = %e, "Failed to record job failure");
            return;
        }
        self.events
            .send(JobEvent::failed(source_id, job, &err.to_string()));
    }

    async fn within<F>(
        &self,
        source_id: &str,
        job: JobType,
        limit: Duration,
        fut: F,
    ) -> Result<JobOutcome, JobError>
    where
        F: Future<Output = Result<JobOutcome, JobError>>,
    {
        match tokio::time::timeout(limit, fut).await {
            Ok(result) => result,
            Err(_) => {
                let err = JobError::Timeout(limit);
                warn!(limit_secs = limit.as_secs(), "Job timed out");
                match self
                    .repo
                    .compare_and_set_status(source_id, job, JobStatus::Processing, JobStatus::Failed)
                    .await
                {
                    Ok(true) => self
                        .events
                        .send(JobEvent::failed(source_id, job, &err.to_string())),
                    // The completion write won the race; report what is stored.
                    Ok(false) => {
                        if let Ok(Some(source)) = self.repo.get(source_id).await {
                            if source.status(job) == JobStatus::Completed {
                                info!("Job completed as the timeout elapsed");
                                return Ok(JobOutcome {
                                    source,
                                    artifacts: None,
                                });
                            }
                        }
                    }
                    Err(e) => warn!(error = %e, "Failed to record job timeout"),
                }
                Err(err)
            }
        }
    }
}
