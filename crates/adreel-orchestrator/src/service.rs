//! The `AdOrchestrator` facade.
//!
//! Every operation loads the project by id, runs one phase against the
//! persisted state, and saves the result with a version check. Nothing is
//! held in memory between calls, so any phase can be resumed from the id
//! alone.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;
use uuid::Uuid;

use adreel_batch::BatchService;
use adreel_firestore::{ClipLibrary, ProjectStore};
use adreel_llm_client::{NarrationSynthesizer, TextAnalysisService};
use adreel_models::{
    Project, ProjectId, ProjectStatus, RenderOptions, SegmentConstraints, StepPayload,
    WorkflowStep,
};
use adreel_storage::{keys, ObjectStore, StorageError};

use crate::config::OrchestratorConfig;
use crate::dispatcher::{self, DEFAULT_FAILURE_REASON};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::logging::ProjectLogger;
use crate::matcher::{self, MatchResult, MatchStrategy};
use crate::metrics::{record_degraded_segments, record_phase};
use crate::packager;
use crate::planner;
use crate::retry::retry_async;
use crate::workflow;

const VOICEOVER_CONTENT_TYPE: &str = "audio/mpeg";

/// Entry point for all project operations.
#[derive(Clone)]
pub struct AdOrchestrator {
    projects: Arc<dyn ProjectStore>,
    clips: Arc<dyn ClipLibrary>,
    objects: Arc<dyn ObjectStore>,
    analysis: Arc<dyn TextAnalysisService>,
    batch: Arc<dyn BatchService>,
    narration: Option<Arc<dyn NarrationSynthesizer>>,
    config: OrchestratorConfig,
}

impl AdOrchestrator {
    pub fn new(
        projects: Arc<dyn ProjectStore>,
        clips: Arc<dyn ClipLibrary>,
        objects: Arc<dyn ObjectStore>,
        analysis: Arc<dyn TextAnalysisService>,
        batch: Arc<dyn BatchService>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            projects,
            clips,
            objects,
            analysis,
            batch,
            narration: None,
            config,
        }
    }

    /// Enable `synthesize_voiceover`.
    pub fn with_narration(mut self, narration: Arc<dyn NarrationSynthesizer>) -> Self {
        self.narration = Some(narration);
        self
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub async fn create_project(&self, user_id: &str, title: &str) -> OrchestratorResult<Project> {
        observed("create", async {
            if user_id.trim().is_empty() {
                return Err(OrchestratorError::invalid_input("user id is required"));
            }
            if title.trim().is_empty() {
                return Err(OrchestratorError::invalid_input("title is required"));
            }
            let project = Project::new(user_id.trim(), title.trim());
            let created = self.projects.create(&project).await?;
            ProjectLogger::new(&created.id, "create").log_completion("project created");
            Ok(created)
        })
        .await
    }

    pub async fn get_project(&self, id: &ProjectId) -> OrchestratorResult<Project> {
        self.load(id).await
    }

    /// Plan segments for `script` and replace the project's segments.
    ///
    /// Any existing scene list is dropped, since it refers to the old
    /// segments. On failure the project is not touched.
    pub async fn plan_segments(
        &self,
        id: &ProjectId,
        script: &str,
        constraints: Option<SegmentConstraints>,
    ) -> OrchestratorResult<Project> {
        let logger = ProjectLogger::new(id, "plan");
        observed(
            "plan",
            async {
                let mut project = self.load(id).await?;
                ensure_editable(&project)?;
                let constraints = constraints.unwrap_or(self.config.default_constraints);

                logger.log_start("analyzing script");
                let segments = planner::plan(self.analysis.as_ref(), script, &constraints)
                    .await
                    .inspect_err(|e| logger.log_error(&e.to_string()))?;

                logger.log_completion(&format!("{} segments", segments.len()));
                project.script = Some(script.trim().to_string());
                project.segments = segments;
                project.scene_assignments.clear();
                project.packaged = None;
                self.save(project).await
            }
            .instrument(logger.create_span()),
        )
        .await
    }

    /// Build a scene list for the current segments.
    pub async fn match_clips(
        &self,
        id: &ProjectId,
        strategy: MatchStrategy,
    ) -> OrchestratorResult<Project> {
        let logger = ProjectLogger::new(id, "match");
        observed(
            "match",
            async {
                let mut project = self.load(id).await?;
                ensure_editable(&project)?;
                if project.segments.is_empty() {
                    return Err(OrchestratorError::invalid_input(
                        "project has no segments to match",
                    ));
                }

                let library = self.clips.list_clips(&project.user_id).await?;
                logger.log_start(&format!(
                    "{} matching over {} clips",
                    strategy,
                    library.len()
                ));
                let max_clips = self.config.max_clips_per_segment;
                let result = match strategy {
                    MatchStrategy::Tag => MatchResult::Full(matcher::match_by_tags(
                        &project.segments,
                        &library,
                        max_clips,
                    )?),
                    MatchStrategy::Contextual => {
                        let script = narration_text(&project);
                        let (result, cause) = matcher::match_contextual(
                            self.analysis.as_ref(),
                            &script,
                            &project.segments,
                            &library,
                            max_clips,
                        )
                        .await?;
                        if result.is_partial() {
                            let missing = result.missing_segment_ids();
                            record_degraded_segments(missing.len());
                            logger.log_matching_degraded(
                                missing,
                                cause.as_deref().unwrap_or("unknown"),
                            );
                        }
                        result
                    }
                };

                project.scene_assignments = result.into_assignments();
                project.packaged = None;
                logger.log_completion(&format!(
                    "{} scenes assigned",
                    project.scene_assignments.len()
                ));
                self.save(project).await
            }
            .instrument(logger.create_span()),
        )
        .await
    }

    /// Swap the clip in one slot, keeping its timing.
    pub async fn override_clip(
        &self,
        id: &ProjectId,
        segment_id: &str,
        slot: usize,
        clip_id: &str,
    ) -> OrchestratorResult<Project> {
        observed("override", async {
            let mut project = self.load(id).await?;
            ensure_editable(&project)?;
            if self
                .clips
                .get_clip(&project.user_id, clip_id)
                .await?
                .is_none()
            {
                return Err(OrchestratorError::UnknownClip(clip_id.to_string()));
            }
            project.set_slot_clip(segment_id, slot, clip_id)?;
            project.packaged = None;
            self.save(project).await
        })
        .await
    }

    /// Synthesize narration audio for the script and attach it.
    pub async fn synthesize_voiceover(
        &self,
        id: &ProjectId,
        voice: Option<&str>,
    ) -> OrchestratorResult<Project> {
        let logger = ProjectLogger::new(id, "voiceover");
        observed("voiceover", async {
            let narration = self.narration.as_ref().ok_or_else(|| {
                OrchestratorError::invalid_input("narration synthesis is not configured")
            })?;
            let mut project = self.load(id).await?;
            ensure_editable(&project)?;
            let text = narration_text(&project);
            if text.trim().is_empty() {
                return Err(OrchestratorError::invalid_input(
                    "project has no script to narrate",
                ));
            }

            logger.log_start("synthesizing narration");
            let audio = narration
                .synthesize(&text, voice)
                .await
                .map_err(|e| OrchestratorError::SynthesisFailed(e.to_string()))?;

            let key = keys::voiceover_key(
                &project.user_id,
                project.id.as_str(),
                &Uuid::new_v4().to_string(),
            )?;
            retry_async(
                &self.config.storage_retry,
                || self.objects.put(&key, audio.clone(), VOICEOVER_CONTENT_TYPE),
                StorageError::is_retryable,
            )
            .await?;
            logger.log_completion(&format!("{} bytes stored at {}", audio.len(), key));

            project.voiceover_key = Some(key);
            project.packaged = None;
            self.save(project).await
        })
        .await
    }

    /// Resolve the scene list into a render job description.
    pub async fn package_render_job(
        &self,
        id: &ProjectId,
        options: &RenderOptions,
    ) -> OrchestratorResult<Project> {
        let logger = ProjectLogger::new(id, "package");
        observed(
            "package",
            async {
                let mut project = self.load(id).await?;
                ensure_editable(&project)?;
                let packaged = packager::package(
                    &project,
                    options,
                    self.clips.as_ref(),
                    self.objects.as_ref(),
                    &self.config,
                )
                .await
                .inspect_err(|e| logger.log_error(&e.to_string()))?;

                logger.log_completion(&format!(
                    "run {} ({} bytes, {})",
                    packaged.run_id,
                    packaged.spec_bytes,
                    if packaged.spilled_key().is_some() { "spilled" } else { "inline" }
                ));
                project.packaged = Some(packaged);
                self.save(project).await
            }
            .instrument(logger.create_span()),
        )
        .await
    }

    /// Submit the packaged render job.
    pub async fn dispatch(&self, id: &ProjectId) -> OrchestratorResult<Project> {
        observed("dispatch", async {
            let project = self.load(id).await?;
            let next = dispatcher::dispatch(self.batch.as_ref(), &project, &self.config).await?;
            self.save(next).await.inspect_err(|e| {
                ProjectLogger::new(id, "dispatch")
                    .log_error(&format!("submitted job could not be recorded: {}", e));
            })
        })
        .await
    }

    /// Look up the render job once. Returns the project and whether the job
    /// has finished.
    pub async fn poll_status(&self, id: &ProjectId) -> OrchestratorResult<(Project, bool)> {
        observed("poll", async {
            let project = self.load(id).await?;
            let outcome = dispatcher::poll(self.batch.as_ref(), &project, &self.config).await?;
            let project = if outcome.changed {
                self.save(outcome.project).await?
            } else {
                outcome.project
            };
            Ok((project, outcome.done))
        })
        .await
    }

    /// Move the project to `step` and apply `payload`.
    ///
    /// A request that changes nothing is not written.
    pub async fn advance_workflow(
        &self,
        id: &ProjectId,
        step: WorkflowStep,
        payload: &StepPayload,
    ) -> OrchestratorResult<Project> {
        observed("advance", async {
            let project = self.load(id).await?;
            let mut next = project.clone();
            workflow::advance(&mut next, step, payload)?;
            if next == project {
                return Ok(project);
            }
            self.save(next).await
        })
        .await
    }

    /// Output location of a finished render.
    pub async fn render_output(&self, id: &ProjectId) -> OrchestratorResult<String> {
        let project = self.load(id).await?;
        match project.status {
            ProjectStatus::Completed => project.output_location.ok_or_else(|| {
                OrchestratorError::not_found(format!("output of project {}", id))
            }),
            ProjectStatus::Failed => Err(OrchestratorError::JobFailed(
                project
                    .error
                    .unwrap_or_else(|| DEFAULT_FAILURE_REASON.to_string()),
            )),
            _ => Err(OrchestratorError::invalid_transition(
                "render has not finished",
            )),
        }
    }

    async fn load(&self, id: &ProjectId) -> OrchestratorResult<Project> {
        self.projects
            .get(id)
            .await?
            .ok_or_else(|| OrchestratorError::not_found(format!("project {}", id)))
    }

    async fn save(&self, project: Project) -> OrchestratorResult<Project> {
        Ok(self.projects.save(&project).await?)
    }
}

fn ensure_editable(project: &Project) -> OrchestratorResult<()> {
    if project.status == ProjectStatus::Processing {
        return Err(OrchestratorError::invalid_transition(
            "project is locked while a render is in progress",
        ));
    }
    Ok(())
}

/// Script of the last planning run, or the segment texts joined.
fn narration_text(project: &Project) -> String {
    match &project.script {
        Some(script) if !script.trim().is_empty() => script.clone(),
        _ => project
            .segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join(" "),
    }
}

async fn observed<T, F>(phase: &'static str, fut: F) -> OrchestratorResult<T>
where
    F: Future<Output = OrchestratorResult<T>>,
{
    let started = Instant::now();
    let result = fut.await;
    let outcome = match &result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    record_phase(phase, outcome, started.elapsed().as_secs_f64());
    result
}
