use std::sync::Arc;
use std::thread;
use std::time::Duration;

use neuroscan_contracts::analysis::AnalysisResult;
use neuroscan_contracts::history::ResultStore;
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::providers::{error_chain_text, Classifier};
use crate::upload::{ImagePayload, ImageUpload, UploadError};

pub const ANALYSIS_FAILED_MESSAGE: &str = "Failed to analyze image. Please try again.";

/// Where one upload-to-result workflow stands. The `enhanced` bit only
/// exists in the stages that come after enhancement has been entered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Idle,
    Uploading,
    Enhancing { enhanced: bool },
    Analyzing { enhanced: bool },
    Complete { enhanced: bool },
    Error,
}

impl SessionPhase {
    pub fn enhanced(&self) -> bool {
        match self {
            Self::Enhancing { enhanced }
            | Self::Analyzing { enhanced }
            | Self::Complete { enhanced } => *enhanced,
            Self::Idle | Self::Uploading | Self::Error => false,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        matches!(self, Self::Enhancing { .. } | Self::Analyzing { .. })
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Enhancing { .. } => "enhancing",
            Self::Analyzing { .. } => "analyzing",
            Self::Complete { .. } => "complete",
            Self::Error => "error",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("no image has been uploaded")]
    NoPreview,

    #[error("analysis can only start from an uploaded image (current state: {0})")]
    NotReady(&'static str),
}

pub type PhaseObserver = Arc<dyn Fn(&SessionPhase) + Send + Sync>;

#[derive(Default)]
struct SessionState {
    phase: SessionPhase,
    upload: Option<ImageUpload>,
    preview: Option<String>,
    result: Option<AnalysisResult>,
    error: Option<String>,
    generation: u64,
}

/// Cloneable handle on one analysis workflow. Clones share state, so a
/// reset issued from one handle supersedes work running on another.
#[derive(Clone)]
pub struct AnalysisSession {
    classifier: Arc<dyn Classifier>,
    store: Arc<ResultStore>,
    enhancement_delay: Duration,
    observer: Option<PhaseObserver>,
    state: Arc<Mutex<SessionState>>,
}

impl AnalysisSession {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        store: Arc<ResultStore>,
        enhancement_delay: Duration,
    ) -> Self {
        Self {
            classifier,
            store,
            enhancement_delay,
            observer: None,
            state: Arc::new(Mutex::new(SessionState::default())),
        }
    }

    pub fn with_observer(mut self, observer: PhaseObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.state.lock().phase
    }

    pub fn preview(&self) -> Option<String> {
        self.state.lock().preview.clone()
    }

    pub fn result(&self) -> Option<AnalysisResult> {
        self.state.lock().result.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn file_name(&self) -> Option<String> {
        self.state
            .lock()
            .upload
            .as_ref()
            .map(|upload| upload.file_name.clone())
    }

    /// Accepts a new image. Only an idle session takes a file; validation
    /// failures set the error field and leave everything else as it was.
    pub fn process_file(&self, upload: ImageUpload) -> Result<SessionPhase, UploadError> {
        let mut state = self.state.lock();
        if state.phase != SessionPhase::Idle {
            debug!(phase = state.phase.label(), "upload ignored; session busy");
            return Err(UploadError::NotIdle);
        }
        if let Err(err) = upload.validate() {
            debug!(file = %upload.file_name, error = %err, "upload rejected");
            state.error = Some(err.to_string());
            return Err(err);
        }

        debug!(file = %upload.file_name, bytes = upload.size(), "upload accepted");
        state.preview = Some(upload.to_data_url());
        state.upload = Some(upload);
        state.error = None;
        state.phase = SessionPhase::Uploading;
        drop(state);

        self.notify(&SessionPhase::Uploading);
        Ok(SessionPhase::Uploading)
    }

    /// Runs enhancement and classification to completion on the calling
    /// thread. Remote failures end in [`SessionPhase::Error`] rather than an
    /// `Err`; the returned phase is the session's phase on exit.
    pub fn start_analysis(&self) -> Result<SessionPhase, SessionError> {
        let (generation, preview) = {
            let mut state = self.state.lock();
            let Some(preview) = state.preview.clone() else {
                return Err(SessionError::NoPreview);
            };
            if state.phase != SessionPhase::Uploading {
                return Err(SessionError::NotReady(state.phase.label()));
            }
            state.phase = SessionPhase::Enhancing { enhanced: false };
            (state.generation, preview)
        };
        self.notify(&SessionPhase::Enhancing { enhanced: false });

        // Cosmetic stage: the bytes sent downstream are the uploaded ones.
        if !self.enhancement_delay.is_zero() {
            thread::sleep(self.enhancement_delay);
        }
        if !self.advance(generation, SessionPhase::Enhancing { enhanced: true }) {
            return Ok(self.phase());
        }
        if !self.advance(generation, SessionPhase::Analyzing { enhanced: true }) {
            return Ok(self.phase());
        }

        let outcome = match ImagePayload::from_data_url(&preview) {
            Some(payload) => self.classifier.classify(&payload).map_err(|err| {
                warn!(error = %error_chain_text(&err, 512), "analysis request failed");
            }),
            None => {
                warn!("preview is not a base64 data URI");
                Err(())
            }
        };

        let mut state = self.state.lock();
        if state.generation != generation {
            debug!("analysis finished after reset; result discarded");
            return Ok(state.phase);
        }

        let next = match outcome {
            Ok(assessment) => {
                let result = AnalysisResult::from_assessment(assessment);
                match self.store.append(result.clone(), preview) {
                    Ok(item) => {
                        info!(
                            id = %item.result.id,
                            diagnosis = %item.result.diagnosis,
                            confidence = %item.result.confidence,
                            "analysis complete"
                        );
                        state.result = Some(result);
                        state.error = None;
                        SessionPhase::Complete { enhanced: true }
                    }
                    Err(err) => {
                        error!(error = %err, "failed to persist analysis");
                        state.error = Some(ANALYSIS_FAILED_MESSAGE.to_string());
                        SessionPhase::Error
                    }
                }
            }
            Err(()) => {
                state.error = Some(ANALYSIS_FAILED_MESSAGE.to_string());
                SessionPhase::Error
            }
        };
        state.phase = next;
        drop(state);

        self.notify(&next);
        Ok(next)
    }

    /// Returns to `Idle` from any phase. Work still running for the old
    /// generation is ignored when it finishes.
    pub fn reset(&self) {
        {
            let mut state = self.state.lock();
            let generation = state.generation.wrapping_add(1);
            *state = SessionState {
                generation,
                ..SessionState::default()
            };
        }
        debug!("session reset");
        self.notify(&SessionPhase::Idle);
    }

    fn advance(&self, generation: u64, phase: SessionPhase) -> bool {
        {
            let mut state = self.state.lock();
            if state.generation != generation {
                debug!(phase = phase.label(), "session reset mid-analysis; stopping");
                return false;
            }
            state.phase = phase;
        }
        self.notify(&phase);
        true
    }

    fn notify(&self, phase: &SessionPhase) {
        if let Some(observer) = self.observer.as_ref() {
            observer(phase);
        }
    }
}
