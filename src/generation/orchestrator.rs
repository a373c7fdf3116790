//! Session Orchestrator
//!
//! Turns one prompt into a session of N artifacts and drives their
//! generation jobs:
//!
//! 1. create the session with N streaming placeholders and make it current;
//! 2. plan N style labels and write them onto the artifacts;
//! 3. launch one job per artifact, each `stagger` after the previous one;
//! 4. every job opens a stream (with retry), merges fragments as they
//!    arrive, then finalizes to `complete` or lands in `error`.
//!
//! Jobs are isolated: a failing job only ever touches its own artifact.
//! Completion is observed through the store; the orchestrator itself only
//! refuses a second submission while one is still in flight.

use crate::config::FlashConfig;
use crate::error::ApiError;
use crate::generation::adapter::GenerationAdapter;
use crate::generation::merger::{ArtifactStreamMerger, StreamSummary};
use crate::generation::prompts::artifact_prompt;
use crate::generation::retry::RetryPolicy;
use crate::generation::styles::{PlanSource, StylePlanner};
use crate::session::Session;
use crate::state::{SessionStore, UpdateOutcome};
use crate::types::{ArtifactId, SessionId};
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Orchestration knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSettings {
    /// Delay between launching consecutive jobs of one session.
    pub stagger: Duration,
    pub max_variations: usize,
    /// Style label shown until planning finishes.
    pub placeholder_label: String,
}

impl GenerationSettings {
    pub fn from_config(config: &FlashConfig) -> Self {
        Self {
            stagger: Duration::from_millis(config.generation.stagger_ms),
            max_variations: config.generation.max_variations,
            placeholder_label: config.styles.placeholder_label.clone(),
        }
    }
}

/// Delay before launching the job at `position`: `stagger * position`,
/// saturating.
fn launch_delay(stagger: Duration, position: usize) -> Duration {
    stagger.saturating_mul(u32::try_from(position).unwrap_or(u32::MAX))
}

/// Cycle the variation count 1 -> 2 -> ... -> max -> 1.
pub fn next_variation_count(current: usize, max: usize) -> usize {
    if current >= max.max(1) {
        1
    } else {
        current + 1
    }
}

/// Outcome of one artifact job.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub artifact: ArtifactId,
    pub style: String,
    pub result: Result<StreamSummary, String>,
}

/// Outcome of a whole submission, once every job ended.
#[derive(Debug, Clone)]
pub struct SessionReport {
    pub session_id: SessionId,
    pub plan_source: PlanSource,
    pub jobs: Vec<JobOutcome>,
}

impl SessionReport {
    pub fn completed(&self) -> usize {
        self.jobs.iter().filter(|job| job.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.jobs.len() - self.completed()
    }
}

/// A submission running in the background.
pub struct Submission {
    session_id: SessionId,
    handle: JoinHandle<SessionReport>,
}

impl Submission {
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Wait for every job of the submission to end.
    pub async fn wait(self) -> Result<SessionReport, ApiError> {
        self.handle
            .await
            .map_err(|e| ApiError::GenerationFailed(format!("Submission task failed: {}", e)))
    }
}

/// Clears the in-flight flag when the submission ends, however it ends.
struct InFlightGuard(Arc<AtomicBool>);

impl InFlightGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(Arc::clone(flag)))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct SessionOrchestrator {
    store: Arc<SessionStore>,
    adapter: Arc<dyn GenerationAdapter>,
    planner: Arc<StylePlanner>,
    merger: ArtifactStreamMerger,
    retry: RetryPolicy,
    settings: GenerationSettings,
    in_flight: Arc<AtomicBool>,
}

impl SessionOrchestrator {
    pub fn new(
        store: Arc<SessionStore>,
        adapter: Arc<dyn GenerationAdapter>,
        config: &FlashConfig,
    ) -> Self {
        let retry = RetryPolicy::from(&config.retry);
        let planner = StylePlanner::new(Arc::clone(&adapter), retry, &config.styles);
        Self::with_parts(store, adapter, planner, retry, GenerationSettings::from_config(config))
    }

    pub fn with_parts(
        store: Arc<SessionStore>,
        adapter: Arc<dyn GenerationAdapter>,
        planner: StylePlanner,
        retry: RetryPolicy,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            merger: ArtifactStreamMerger::new(Arc::clone(&store)),
            store,
            adapter,
            planner: Arc::new(planner),
            retry,
            settings,
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn settings(&self) -> &GenerationSettings {
        &self.settings
    }

    /// True while a submission is running.
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Create the session and start generating in the background.
    ///
    /// Spawns onto the current Tokio runtime and panics outside one; use
    /// [`SessionOrchestrator::run`] to drive the session on the caller's task
    /// instead. The session is visible in the store when this returns.
    pub fn submit(&self, prompt: &str, variations: usize) -> Result<Submission, ApiError> {
        let (guard, session) = self.begin(prompt, variations)?;
        let session_id = session.id().clone();
        let run = self.clone();
        let handle = tokio::spawn(async move {
            let _guard = guard;
            run.run_session(session).await
        });
        Ok(Submission { session_id, handle })
    }

    /// Create the session and drive it to the end on the current task.
    ///
    /// Nothing is spawned. A Tokio timer is only needed when a stagger or
    /// retry backoff actually sleeps.
    pub async fn run(&self, prompt: &str, variations: usize) -> Result<SessionReport, ApiError> {
        let (_guard, session) = self.begin(prompt, variations)?;
        Ok(self.run_session(session).await)
    }

    fn begin(&self, prompt: &str, variations: usize) -> Result<(InFlightGuard, Session), ApiError> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(ApiError::EmptyPrompt);
        }
        if variations == 0 || variations > self.settings.max_variations {
            return Err(ApiError::InvalidVariationCount {
                requested: variations,
                max: self.settings.max_variations,
            });
        }
        let guard = InFlightGuard::acquire(&self.in_flight).ok_or(ApiError::SubmissionInFlight)?;
        let session = self
            .store
            .create_session(prompt, variations, &self.settings.placeholder_label);
        info!(
            session = %session.id(),
            variations,
            "Created generation session"
        );
        Ok((guard, session))
    }

    async fn run_session(&self, session: Session) -> SessionReport {
        let session_id = session.id();
        let count = session.artifacts().len();

        let plan = self.planner.plan(session.prompt(), count).await;
        info!(
            session = %session_id,
            labels = ?plan.labels,
            fallback = plan.source == PlanSource::Fallback,
            "Planned artifact styles"
        );
        if let Err(err) = self.store.apply_style_labels(session_id, &plan.labels) {
            warn!(session = %session_id, error = %err, "Session removed before styles were applied");
        }

        let prompt = session.prompt();
        let mut jobs: FuturesUnordered<_> = session
            .artifacts()
            .iter()
            .zip(plan.labels.iter())
            .enumerate()
            .map(|(position, (artifact, style))| {
                let delay = launch_delay(self.settings.stagger, position);
                async move {
                    if !delay.is_zero() {
                        sleep(delay).await;
                    }
                    self.run_artifact_job(session_id, artifact.id(), prompt, style)
                        .await
                }
            })
            .collect();

        let mut outcomes = Vec::with_capacity(count);
        while let Some(outcome) = jobs.next().await {
            outcomes.push(outcome);
        }
        // Report in artifact order rather than completion order.
        outcomes.sort_by_key(|job: &JobOutcome| {
            session
                .artifacts()
                .iter()
                .position(|a| a.id() == &job.artifact)
        });

        let report = SessionReport {
            session_id: session_id.clone(),
            plan_source: plan.source,
            jobs: outcomes,
        };
        info!(
            session = %session_id,
            completed = report.completed(),
            failed = report.failed(),
            "Generation session finished"
        );
        report
    }

    async fn run_artifact_job(
        &self,
        session: &SessionId,
        artifact: &ArtifactId,
        user_prompt: &str,
        style: &str,
    ) -> JobOutcome {
        info!(session = %session, artifact = %artifact, style, "Launching artifact job");
        let prompt = artifact_prompt(user_prompt, style);

        let result = async {
            let stream = self
                .retry
                .run("generate_artifact", || {
                    self.adapter.generate_artifact_stream(&prompt)
                })
                .await?;
            self.merger.drain(session, artifact, stream).await
        }
        .await;

        let result = match result {
            Ok(summary) => match self.merger.finalize(session, artifact) {
                UpdateOutcome::Applied => {
                    info!(
                        artifact = %artifact,
                        fragments = summary.fragments,
                        bytes = summary.bytes,
                        "Artifact complete"
                    );
                    Ok(summary)
                }
                dropped => {
                    debug!(artifact = %artifact, outcome = %dropped, "Finalize dropped");
                    Err(format!("not finalized: {}", dropped))
                }
            },
            Err(err) => {
                let outcome = self.merger.fail(session, artifact);
                if !outcome.is_applied() {
                    debug!(artifact = %artifact, outcome = %outcome, "Failure status dropped");
                }
                warn!(artifact = %artifact, error = %err, "Artifact generation failed");
                Err(err.to_string())
            }
        };

        JobOutcome {
            artifact: artifact.clone(),
            style: style.to_string(),
            result,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StylesConfig;
    use crate::generation::adapter::testing::{Failure, Script, ScriptedAdapter};
    use crate::generation::merger::EDITABLE_TRAILER;
    use crate::session::ArtifactStatus;
    use tokio::time::Instant;

    const STAGGER: Duration = Duration::from_millis(800);

    fn orchestrator(adapter: ScriptedAdapter) -> (SessionOrchestrator, Arc<ScriptedAdapter>) {
        let adapter = Arc::new(adapter);
        let store = Arc::new(SessionStore::new());
        let retry = RetryPolicy::new(3, Duration::from_millis(1500));
        let planner = StylePlanner::new(adapter.clone(), retry, &StylesConfig::default());
        let settings = GenerationSettings {
            stagger: STAGGER,
            max_variations: 3,
            placeholder_label: "Initializing...".to_string(),
        };
        let orchestrator =
            SessionOrchestrator::with_parts(store, adapter.clone(), planner, retry, settings);
        (orchestrator, adapter)
    }

    #[test]
    fn test_variation_toggle_cycles() {
        assert_eq!(next_variation_count(1, 3), 2);
        assert_eq!(next_variation_count(2, 3), 3);
        assert_eq!(next_variation_count(3, 3), 1);
        assert_eq!(next_variation_count(1, 1), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mixed_outcome_session() {
        let (orchestrator, adapter) = orchestrator(
            ScriptedAdapter::new(Ok("Here: [\"Minimal\",\"Bold\"]"))
                .with_script("Minimal", Script::fragments(&["<h1>", "A</h1>"]))
                .with_script("Bold", Script::failing(Failure::RateLimit)),
        );

        let report = orchestrator.run("card", 2).await.unwrap();
        assert_eq!(report.completed(), 1);
        assert_eq!(report.failed(), 1);
        assert_eq!(adapter.open_calls("Bold"), 3);

        let session = orchestrator.store().session(&report.session_id).unwrap();
        let first = &session.artifacts()[0];
        assert_eq!(first.style_name(), "Minimal");
        assert_eq!(first.status(), ArtifactStatus::Complete);
        assert_eq!(first.html(), format!("<h1>A</h1>{EDITABLE_TRAILER}"));
        let second = &session.artifacts()[1];
        assert_eq!(second.style_name(), "Bold");
        assert_eq!(second.status(), ArtifactStatus::Error);
        assert!(session.is_finished());
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_mid_stream_failure_is_isolated() {
        let broken = Script {
            fragments: vec!["<div>half".to_string()],
            mid_stream_failure: Some(Failure::Permanent),
            ..Script::default()
        };
        let (orchestrator, _) = orchestrator(
            ScriptedAdapter::new(Ok("[\"A\",\"B\",\"C\"]"))
                .with_script("A", Script::fragments(&["<a>"]))
                .with_script("B", broken)
                .with_script("C", Script::fragments(&["<c>"])),
        );

        let report = orchestrator.run("card", 3).await.unwrap();
        let session = orchestrator.store().session(&report.session_id).unwrap();
        let statuses: Vec<_> = session.artifacts().iter().map(|a| a.status()).collect();
        assert_eq!(
            statuses,
            vec![
                ArtifactStatus::Complete,
                ArtifactStatus::Error,
                ArtifactStatus::Complete
            ]
        );
        assert_eq!(session.artifacts()[1].html(), "<div>half");
        let order: Vec<_> = report.jobs.iter().map(|j| j.style.as_str()).collect();
        assert_eq!(order, vec!["A", "B", "C"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_launches_are_staggered() {
        let (orchestrator, adapter) = orchestrator(
            ScriptedAdapter::new(Ok("[\"A\",\"B\",\"C\"]"))
                .with_script("A", Script::fragments(&["a"]))
                .with_script("B", Script::fragments(&["b"]))
                .with_script("C", Script::fragments(&["c"])),
        );
        let started = Instant::now();
        orchestrator.run("card", 3).await.unwrap();

        let offsets: Vec<Duration> = ["A", "B", "C"]
            .iter()
            .map(|style| adapter.first_open(style).unwrap() - started)
            .collect();
        assert_eq!(offsets, vec![Duration::ZERO, STAGGER, STAGGER * 2]);
    }

    #[test]
    fn test_launch_delay_saturates() {
        assert_eq!(launch_delay(STAGGER, 0), Duration::ZERO);
        assert_eq!(launch_delay(STAGGER, 2), STAGGER * 2);
        assert_eq!(
            launch_delay(STAGGER, usize::MAX),
            STAGGER.saturating_mul(u32::MAX)
        );
        assert_eq!(launch_delay(Duration::MAX, 2), Duration::MAX);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_creates_all_placeholders_for_each_count() {
        let (orchestrator, _) = orchestrator(
            ScriptedAdapter::new(Ok("[\"A\",\"B\",\"C\"]"))
                .with_script("A", Script::fragments(&["a"]))
                .with_script("B", Script::fragments(&["b"]))
                .with_script("C", Script::fragments(&["c"])),
        );

        for n in 1..=3 {
            let submission = orchestrator.submit("card", n).unwrap();
            let created = orchestrator.store().session(submission.session_id()).unwrap();
            assert_eq!(created.artifacts().len(), n);
            assert!(created
                .artifacts()
                .iter()
                .all(|a| a.status() == ArtifactStatus::Streaming));

            let report = submission.wait().await.unwrap();
            assert_eq!(report.jobs.len(), n);
            assert_eq!(report.completed(), n);
        }
        assert_eq!(orchestrator.store().len(), 3);
    }

    #[test]
    fn test_run_drives_session_without_spawning() {
        let adapter = Arc::new(
            ScriptedAdapter::new(Ok("[\"A\",\"B\"]"))
                .with_script("A", Script::fragments(&["a"]))
                .with_script("B", Script::fragments(&["b"])),
        );
        let retry = RetryPolicy::new(3, Duration::from_millis(1500));
        let planner = StylePlanner::new(adapter.clone(), retry, &StylesConfig::default());
        let settings = GenerationSettings {
            stagger: Duration::ZERO,
            max_variations: 3,
            placeholder_label: "Initializing...".to_string(),
        };
        let orchestrator = SessionOrchestrator::with_parts(
            Arc::new(SessionStore::new()),
            adapter,
            planner,
            retry,
            settings,
        );

        let report = futures::executor::block_on(orchestrator.run("card", 2)).unwrap();
        assert_eq!(report.completed(), 2);
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_submission_rejected_while_in_flight() {
        let (orchestrator, _) = orchestrator(
            ScriptedAdapter::new(Ok("[\"A\",\"B\"]"))
                .with_script("A", Script::fragments(&["a"]))
                .with_script("B", Script::fragments(&["b"])),
        );

        let submission = orchestrator.submit("card", 2).unwrap();
        let created = orchestrator.store().session(submission.session_id()).unwrap();
        assert_eq!(created.artifacts().len(), 2);
        assert!(created
            .artifacts()
            .iter()
            .all(|a| a.status() == ArtifactStatus::Streaming));

        assert!(matches!(
            orchestrator.submit("another", 2),
            Err(ApiError::SubmissionInFlight)
        ));
        assert_eq!(orchestrator.store().len(), 1);

        let report = submission.wait().await.unwrap();
        assert_eq!(report.completed(), 2);
        assert!(orchestrator.submit("another", 1).is_ok());
    }

    #[tokio::test]
    async fn test_rejects_invalid_input() {
        let (orchestrator, _) = orchestrator(ScriptedAdapter::new(Ok("[]")));
        assert!(matches!(
            orchestrator.run("   ", 2).await,
            Err(ApiError::EmptyPrompt)
        ));
        assert!(matches!(
            orchestrator.run("card", 4).await,
            Err(ApiError::InvalidVariationCount { requested: 4, max: 3 })
        ));
        assert!(orchestrator.store().is_empty());
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test(start_paused = true)]
    async fn test_removed_session_does_not_break_jobs() {
        let (orchestrator, _) = orchestrator(
            ScriptedAdapter::new(Ok("[\"A\",\"B\"]"))
                .with_script("A", Script::fragments(&["a"]))
                .with_script("B", Script::fragments(&["b"])),
        );
        let submission = orchestrator.submit("card", 2).unwrap();
        let id = submission.session_id().clone();
        orchestrator.store().remove_session(&id).unwrap();

        let report = submission.wait().await.unwrap();
        assert_eq!(report.jobs.len(), 2);
        assert_eq!(report.completed(), 0);
        assert_eq!(report.failed(), 2);
        assert!(report
            .jobs
            .iter()
            .all(|job| job.result == Err("not finalized: session removed".to_string())));
        assert!(orchestrator.store().session(&id).is_none());
    }
}
