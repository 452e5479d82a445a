use std::fmt;

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Diagnosis {
    Pneumonia,
    Normal,
    Uncertain,
    #[serde(rename = "Other Findings")]
    OtherFindings,
}

impl Diagnosis {
    pub const ALL: [Diagnosis; 4] = [
        Diagnosis::Pneumonia,
        Diagnosis::Normal,
        Diagnosis::Uncertain,
        Diagnosis::OtherFindings,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Diagnosis::Pneumonia => "Pneumonia",
            Diagnosis::Normal => "Normal",
            Diagnosis::Uncertain => "Uncertain",
            Diagnosis::OtherFindings => "Other Findings",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Diagnosis::Pneumonia => Tone::Alert,
            Diagnosis::Uncertain => Tone::Caution,
            Diagnosis::Normal => Tone::Ok,
            Diagnosis::OtherFindings => Tone::Info,
        }
    }
}

impl fmt::Display for Diagnosis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Low,
    Medium,
    High,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Low,
        Severity::Medium,
        Severity::High,
        Severity::NotApplicable,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
            Severity::NotApplicable => "N/A",
        }
    }

    pub fn tone(&self) -> Tone {
        match self {
            Severity::High => Tone::Alert,
            Severity::Medium | Severity::Low => Tone::Caution,
            Severity::NotApplicable => Tone::Info,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Display hint for how alarming a diagnosis or severity reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Ok,
    Info,
    Caution,
    Alert,
}

/// Confidence percentage, always finite and within `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(value: f64) -> Result<Self, String> {
        if !value.is_finite() || !(0.0..=100.0).contains(&value) {
            return Err(format!("confidence {value} outside 0-100"));
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Confidence {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Confidence> for f64 {
    fn from(value: Confidence) -> Self {
        value.0
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// The structured verdict returned by the remote classifier, before it is
/// stamped with an id and timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub diagnosis: Diagnosis,
    pub confidence: Confidence,
    pub severity: Severity,
    pub findings: Vec<String>,
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: String,
    pub date: String,
    pub diagnosis: Diagnosis,
    pub confidence: Confidence,
    pub severity: Severity,
    pub findings: Vec<String>,
    pub recommendation: String,
}

impl AnalysisResult {
    /// Stamps an assessment with a fresh v4 id and the current UTC time.
    pub fn from_assessment(assessment: Assessment) -> Self {
        Self::with_identity(Uuid::new_v4().to_string(), now_utc_iso(), assessment)
    }

    pub fn with_identity(
        id: impl Into<String>,
        date: impl Into<String>,
        assessment: Assessment,
    ) -> Self {
        let Assessment {
            diagnosis,
            confidence,
            severity,
            findings,
            recommendation,
        } = assessment;
        Self {
            id: id.into(),
            date: date.into(),
            diagnosis,
            confidence,
            severity,
            findings,
            recommendation,
        }
    }
}

/// A stored analysis together with the data URI of the image it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryItem {
    #[serde(flatten)]
    pub result: AnalysisResult,
    #[serde(rename = "imageUrl")]
    pub image_url: String,
}

impl HistoryItem {
    pub fn id(&self) -> &str {
        &self.result.id
    }
}

fn now_utc_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
