use neuroscan_contracts::analysis::{Assessment, Confidence, Diagnosis, Severity};
use sha2::{Digest, Sha256};

use super::{ChatRequest, ChatService, Classifier, RemoteError};
use crate::upload::ImagePayload;

pub const DRYRUN_CHAT_REPLY: &str = "Dry run: no medical model is connected. \
Please consult a qualified physician about these results.";

/// Offline backend. The verdict is a pure function of the image bytes so
/// repeated runs over the same file agree.
#[derive(Debug, Default, Clone, Copy)]
pub struct DryrunClient;

impl Classifier for DryrunClient {
    fn classify(&self, image: &ImagePayload) -> Result<Assessment, RemoteError> {
        let digest = Sha256::digest(image.data.as_bytes());
        let diagnosis = Diagnosis::ALL[usize::from(digest[0]) % Diagnosis::ALL.len()];
        let severity = match diagnosis {
            Diagnosis::Normal => Severity::NotApplicable,
            _ => Severity::ALL[usize::from(digest[1]) % 3],
        };
        let confidence = Confidence::new(50.0 + f64::from(digest[2] % 50))
            .map_err(|_| RemoteError::NoResponse)?;
        let tag = hex::encode(&digest[..4]);

        Ok(Assessment {
            diagnosis,
            confidence,
            severity,
            findings: vec![format!("Dry run finding {tag}")],
            recommendation: "Dry run result. Not for clinical use.".to_string(),
        })
    }
}

impl ChatService for DryrunClient {
    fn reply(&self, _request: &ChatRequest) -> Result<Option<String>, RemoteError> {
        Ok(Some(DRYRUN_CHAT_REPLY.to_string()))
    }
}
