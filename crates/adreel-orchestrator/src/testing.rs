//! Test doubles shared by the module tests.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use mockall::mock;

use adreel_batch::{BatchResult, BatchService, JobDescription, SubmitRequest, SubmittedJob};
use adreel_llm_client::{ClipChoice, LlmError, LlmResult, SegmentDraft, TextAnalysisService};
use adreel_models::{ClipAsset, Segment, SegmentConstraints};

mock! {
    pub Batch {}

    #[async_trait]
    impl BatchService for Batch {
        async fn submit(&self, request: SubmitRequest) -> BatchResult<SubmittedJob>;
        async fn describe(&self, job_id: &str) -> BatchResult<JobDescription>;
    }
}

/// Analysis service that replays canned answers and counts calls.
pub struct ScriptedAnalysis {
    drafts: Result<Vec<SegmentDraft>, fn() -> LlmError>,
    choices: Result<Vec<ClipChoice>, fn() -> LlmError>,
    analyze_calls: AtomicUsize,
    match_calls: AtomicUsize,
}

impl ScriptedAnalysis {
    pub fn with_drafts(drafts: Vec<SegmentDraft>) -> Self {
        Self {
            drafts: Ok(drafts),
            choices: Ok(Vec::new()),
            analyze_calls: AtomicUsize::new(0),
            match_calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: fn() -> LlmError) -> Self {
        Self {
            drafts: Err(error),
            ..Self::with_drafts(Vec::new())
        }
    }

    pub fn with_choices(mut self, choices: Vec<ClipChoice>) -> Self {
        self.choices = Ok(choices);
        self
    }

    pub fn failing_matches(mut self, error: fn() -> LlmError) -> Self {
        self.choices = Err(error);
        self
    }

    pub fn analyze_calls(&self) -> usize {
        self.analyze_calls.load(Ordering::SeqCst)
    }

    pub fn match_calls(&self) -> usize {
        self.match_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextAnalysisService for ScriptedAnalysis {
    async fn analyze(
        &self,
        _script: &str,
        _constraints: &SegmentConstraints,
    ) -> LlmResult<Vec<SegmentDraft>> {
        self.analyze_calls.fetch_add(1, Ordering::SeqCst);
        match &self.drafts {
            Ok(drafts) => Ok(drafts.clone()),
            Err(make) => Err(make()),
        }
    }

    async fn match_whole(
        &self,
        _script: &str,
        _segments: &[Segment],
        _clips: &[ClipAsset],
    ) -> LlmResult<Vec<ClipChoice>> {
        self.match_calls.fetch_add(1, Ordering::SeqCst);
        match &self.choices {
            Ok(choices) => Ok(choices.clone()),
            Err(make) => Err(make()),
        }
    }
}

pub fn clip(id: &str, tags: &[&str]) -> ClipAsset {
    ClipAsset::new(
        id,
        id,
        format!("u1/clips/{}.mp4", id),
        tags.iter().map(|t| t.to_string()).collect(),
    )
}

pub fn segment(id: &str, duration: f64, keywords: &[&str]) -> Segment {
    Segment::new(
        id,
        format!("narration for {}", id),
        duration,
        keywords.iter().map(|k| k.to_string()).collect(),
    )
}

pub fn choice(segment_id: &str, clip_id: &str) -> ClipChoice {
    ClipChoice {
        segment_id: segment_id.to_string(),
        clip_id: clip_id.to_string(),
    }
}
