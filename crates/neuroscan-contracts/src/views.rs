use crate::analysis::{AnalysisResult, HistoryItem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Landing,
    Analyzer,
    History,
    Chat,
    Detail,
}

impl View {
    pub fn title(&self) -> &'static str {
        match self {
            View::Landing => "NeuroScan AI",
            View::Analyzer => "Diagnostic Console",
            View::History => "Patient Records",
            View::Chat => "Dr. Neuro Assistant",
            View::Detail => "Record Details",
        }
    }
}

pub const NO_RECORD_SELECTED: &str = "No record selected";
pub const EMPTY_HISTORY: &str = "No analysis history yet.";

/// Tracks the active view and the context handed between views.
///
/// Bound context is only ever replaced, never cleared by navigation: leaving
/// Chat and coming back resumes with the same analysis context, and the
/// last selected record stays bound while browsing elsewhere.
#[derive(Debug, Clone)]
pub struct Navigator {
    view: View,
    selected_record: Option<HistoryItem>,
    active_context: Option<AnalysisResult>,
}

impl Default for Navigator {
    fn default() -> Self {
        Self::new()
    }
}

impl Navigator {
    pub fn new() -> Self {
        Self {
            view: View::Landing,
            selected_record: None,
            active_context: None,
        }
    }

    pub fn view(&self) -> View {
        self.view
    }

    /// Switches views and returns the one that was active before.
    pub fn navigate(&mut self, view: View) -> View {
        std::mem::replace(&mut self.view, view)
    }

    pub fn select_record(&mut self, record: HistoryItem) -> View {
        self.selected_record = Some(record);
        self.navigate(View::Detail)
    }

    /// Binds `context` for the assistant and switches to Chat.
    pub fn start_chat(&mut self, context: AnalysisResult) -> View {
        self.active_context = Some(context);
        self.navigate(View::Chat)
    }

    /// A freshly completed analysis becomes the current context without
    /// changing views.
    pub fn record_analysis(&mut self, result: AnalysisResult) {
        self.active_context = Some(result);
    }

    /// The bound record, only while the Detail view is showing.
    pub fn selected_record(&self) -> Option<&HistoryItem> {
        match self.view {
            View::Detail => self.selected_record.as_ref(),
            _ => None,
        }
    }

    pub fn active_context(&self) -> Option<&AnalysisResult> {
        self.active_context.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::{Navigator, View};
    use crate::analysis::{
        AnalysisResult, Assessment, Confidence, Diagnosis, HistoryItem, Severity,
    };

    fn result(id: &str, diagnosis: Diagnosis) -> AnalysisResult {
        AnalysisResult::with_identity(
            id,
            "2025-01-01T00:00:00.000Z",
            Assessment {
                diagnosis,
                confidence: Confidence::new(64.0).unwrap(),
                severity: Severity::Low,
                findings: Vec::new(),
                recommendation: String::new(),
            },
        )
    }

    fn record(id: &str) -> HistoryItem {
        HistoryItem {
            result: result(id, Diagnosis::Normal),
            image_url: "data:,".to_string(),
        }
    }

    #[test]
    fn starts_on_landing_with_nothing_bound() {
        let nav = Navigator::new();
        assert_eq!(nav.view(), View::Landing);
        assert!(nav.selected_record().is_none());
        assert!(nav.active_context().is_none());
    }

    #[test]
    fn selecting_a_record_always_opens_detail() {
        let mut nav = Navigator::new();
        nav.navigate(View::History);
        let previous = nav.select_record(record("abc123"));
        assert_eq!(previous, View::History);
        assert_eq!(nav.view(), View::Detail);
        assert_eq!(nav.selected_record().map(HistoryItem::id), Some("abc123"));
    }

    #[test]
    fn selected_record_is_only_exposed_in_detail_but_stays_bound() {
        let mut nav = Navigator::new();
        nav.select_record(record("abc123"));
        nav.navigate(View::History);
        assert!(nav.selected_record().is_none());
        nav.navigate(View::Detail);
        assert_eq!(nav.selected_record().map(HistoryItem::id), Some("abc123"));
    }

    #[test]
    fn chat_context_survives_navigation_and_is_replaced_not_cleared() {
        let mut nav = Navigator::new();
        nav.start_chat(result("first", Diagnosis::Pneumonia));
        assert_eq!(nav.view(), View::Chat);

        nav.navigate(View::History);
        nav.navigate(View::Chat);
        assert_eq!(nav.active_context().map(|ctx| ctx.id.as_str()), Some("first"));

        nav.record_analysis(result("second", Diagnosis::Uncertain));
        assert_eq!(nav.view(), View::Chat);
        assert_eq!(nav.active_context().map(|ctx| ctx.id.as_str()), Some("second"));
    }

    #[test]
    fn titles_match_dashboard_headers() {
        assert_eq!(View::Analyzer.title(), "Diagnostic Console");
        assert_eq!(View::History.title(), "Patient Records");
        assert_eq!(View::Chat.title(), "Dr. Neuro Assistant");
        assert_eq!(View::Detail.title(), "Record Details");
    }
}
