//! Render job packaging.
//!
//! Turns a project's scene list into a fully resolved [`RenderSpec`], then
//! decides whether the spec travels inline in the job parameters or is
//! spilled to the object store and passed by key.

use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, info};
use uuid::Uuid;

use adreel_batch::{filter_reserved, param_bytes};
use adreel_firestore::ClipLibrary;
use adreel_models::{
    PackagedRender, Project, RenderInput, RenderOptions, RenderSegment, RenderSpec, SceneAssignment,
    SubtitleCue, SubtitleOptions, WatermarkOptions,
};
use adreel_storage::{keys, ObjectStore, StorageError};

use crate::config::OrchestratorConfig;
use crate::dispatcher::required_parameters;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::metrics::record_spill;
use crate::retry::retry_async;

const SPEC_CONTENT_TYPE: &str = "application/json";

/// Package `project` for rendering.
///
/// Each call uses a fresh run id, so re-packaging never overwrites the spec
/// an earlier run spilled.
pub async fn package(
    project: &Project,
    options: &RenderOptions,
    clips: &dyn ClipLibrary,
    objects: &dyn ObjectStore,
    config: &OrchestratorConfig,
) -> OrchestratorResult<PackagedRender> {
    if project.scene_assignments.is_empty() {
        return Err(OrchestratorError::invalid_input(
            "project has no scene list to package",
        ));
    }

    let run_id = Uuid::new_v4().to_string();
    let spec = build_spec(project, options, clips, objects).await?;
    let bytes = serde_json::to_vec(&spec)
        .map_err(|e| OrchestratorError::invalid_input(format!("render spec not serializable: {}", e)))?;
    let output_location = resolve_output(project, options, &run_id)?;

    let mut packaged = PackagedRender {
        run_id,
        output_location,
        input: RenderInput::Inline { spec },
        extra_params: filter_reserved(&options.extra_params),
        spec_bytes: bytes.len(),
        packaged_at: Utc::now(),
    };

    let mut spill = bytes.len() >= config.max_inline_bytes;
    if !spill {
        let inline_size = param_bytes(&required_parameters(project, &packaged, &config.job_type)?);
        if inline_size >= config.max_param_bytes {
            debug!(
                project_id = %project.id,
                inline_size,
                limit = config.max_param_bytes,
                "Inline render spec exceeds parameter cap, spilling"
            );
            spill = true;
        }
    }
    if spill {
        packaged.input = RenderInput::Spilled {
            key: keys::render_spec_key(&project.user_id, project.id.as_str(), &packaged.run_id)?,
        };
    }

    let size = param_bytes(&required_parameters(project, &packaged, &config.job_type)?);
    if size >= config.max_param_bytes {
        return Err(OrchestratorError::PackagingSizeExceeded {
            size,
            limit: config.max_param_bytes,
        });
    }

    if let RenderInput::Spilled { key } = &packaged.input {
        retry_async(
            &config.storage_retry,
            || objects.put(key, bytes.clone(), SPEC_CONTENT_TYPE),
            StorageError::is_retryable,
        )
        .await?;
        record_spill();
        info!(
            project_id = %project.id,
            run_id = %packaged.run_id,
            spec_bytes = packaged.spec_bytes,
            key = %key,
            "Spilled render spec to object store"
        );
    }

    Ok(packaged)
}

/// Resolve every clip and build the spec in timeline order.
pub async fn build_spec(
    project: &Project,
    options: &RenderOptions,
    clips: &dyn ClipLibrary,
    objects: &dyn ObjectStore,
) -> OrchestratorResult<RenderSpec> {
    let ordered = timeline_order(&project.scene_assignments);

    let mut urls: HashMap<&str, String> = HashMap::new();
    let mut segments = Vec::new();
    for assignment in &ordered {
        let mut offset = assignment.start_position_seconds;
        for slot in &assignment.clips {
            let url = match urls.get(slot.clip_id.as_str()) {
                Some(url) => url.clone(),
                None => {
                    let clip = clips
                        .get_clip(&project.user_id, &slot.clip_id)
                        .await?
                        .ok_or_else(|| OrchestratorError::UnknownClip(slot.clip_id.clone()))?;
                    let url = objects.fetch_url(&clip.storage_key).await?;
                    urls.insert(slot.clip_id.as_str(), url.clone());
                    url
                }
            };
            segments.push(RenderSegment {
                clip_url: url,
                start_time: offset,
                duration: slot.duration_seconds,
                position: segments.len() as u32,
            });
            offset += slot.duration_seconds;
        }
    }
    debug!(project_id = %project.id, entries = segments.len(), "Resolved render timeline");

    let voiceover_ref = match &project.voiceover_key {
        Some(key) => Some(objects.fetch_url(key).await?),
        None => None,
    };

    let subtitle_options = options.subtitles.enabled.then(|| SubtitleOptions {
        style: options.subtitles.style.clone(),
        font_size: options.subtitles.font_size,
        position: options.subtitles.position.clone(),
        cues: subtitle_cues(project, &ordered),
    });

    let watermark_options = if options.watermark.enabled {
        Some(watermark(options, objects).await?)
    } else {
        None
    };

    Ok(RenderSpec {
        segments,
        voiceover_ref,
        subtitle_options,
        watermark_options,
        output_format: options.output_format.clone(),
    })
}

/// Assignments by ascending start; input order wins ties.
fn timeline_order(assignments: &[SceneAssignment]) -> Vec<&SceneAssignment> {
    let mut ordered: Vec<&SceneAssignment> = assignments.iter().collect();
    ordered.sort_by(|a, b| a.start_position_seconds.total_cmp(&b.start_position_seconds));
    ordered
}

fn subtitle_cues(project: &Project, ordered: &[&SceneAssignment]) -> Vec<SubtitleCue> {
    ordered
        .iter()
        .filter_map(|assignment| {
            let segment = project.segment(&assignment.segment_id)?;
            Some(SubtitleCue {
                text: segment.text.clone(),
                start: assignment.start_position_seconds,
                end: assignment.start_position_seconds + segment.duration_seconds,
            })
        })
        .collect()
}

async fn watermark(
    options: &RenderOptions,
    objects: &dyn ObjectStore,
) -> OrchestratorResult<WatermarkOptions> {
    let settings = &options.watermark;
    if !(0.0..=1.0).contains(&settings.opacity) {
        return Err(OrchestratorError::invalid_input(format!(
            "watermark opacity {} is outside 0..=1",
            settings.opacity
        )));
    }

    let text = settings
        .text
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    let image_url = match settings.image_key.as_deref() {
        Some(key) => Some(objects.fetch_url(key).await?),
        None => None,
    };
    if text.is_none() && image_url.is_none() {
        return Err(OrchestratorError::invalid_input(
            "watermark is enabled but has neither text nor image",
        ));
    }

    Ok(WatermarkOptions {
        text,
        image_url,
        position: settings.position.clone(),
        opacity: settings.opacity,
    })
}

/// The explicit output location if given, else the per-run default.
fn resolve_output(
    project: &Project,
    options: &RenderOptions,
    run_id: &str,
) -> OrchestratorResult<String> {
    match options.output_location.as_deref().map(str::trim) {
        Some(explicit) if !explicit.is_empty() => {
            keys::validate_key(explicit)
                .map_err(|e| OrchestratorError::invalid_input(e.to_string()))?;
            Ok(explicit.to_string())
        }
        _ => Ok(keys::default_output_key(
            &project.user_id,
            project.id.as_str(),
            run_id,
        )?),
    }
}
