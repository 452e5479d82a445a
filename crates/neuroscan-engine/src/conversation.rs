use std::sync::Arc;

use neuroscan_contracts::analysis::AnalysisResult;
use neuroscan_contracts::conversation::{ChatMessage, ChatTurn};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::providers::{error_chain_text, ChatRequest, ChatService, NO_CONTEXT_SENTINEL};

pub const GENERIC_GREETING: &str =
    "Hello! I am Dr. Neuro, your AI medical assistant. How can I help you today?";
pub const CONNECTION_TROUBLE_REPLY: &str =
    "I'm having trouble connecting to the medical server. Please try again.";
pub const EMPTY_REPLY_FALLBACK: &str = "I apologize, I couldn't process that request.";

pub fn greeting_for(context: Option<&AnalysisResult>) -> String {
    match context {
        Some(result) => format!(
            "Hello, I'm Dr. Neuro. I see the analysis shows {} with {}% confidence. \
             How can I help you understand these results?",
            result.diagnosis, result.confidence
        ),
        None => GENERIC_GREETING.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejection {
    EmptyMessage,
    Busy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    Ignored(SendRejection),
    Replied(ChatMessage),
}

struct Transcript {
    messages: Vec<ChatMessage>,
    busy: bool,
}

/// One chat thread, optionally grounded in an analysis. The context is
/// fixed at creation and every outbound request carries it.
#[derive(Clone)]
pub struct ConversationSession {
    chat: Arc<dyn ChatService>,
    context: Option<AnalysisResult>,
    transcript: Arc<Mutex<Transcript>>,
}

impl ConversationSession {
    pub fn start(chat: Arc<dyn ChatService>, context: Option<AnalysisResult>) -> Self {
        let greeting = ChatMessage::assistant(greeting_for(context.as_ref()));
        debug!(
            context = context.as_ref().map(|result| result.id.as_str()),
            "conversation started"
        );
        Self {
            chat,
            context,
            transcript: Arc::new(Mutex::new(Transcript {
                messages: vec![greeting],
                busy: false,
            })),
        }
    }

    pub fn context(&self) -> Option<&AnalysisResult> {
        self.context.as_ref()
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.transcript.lock().messages.clone()
    }

    pub fn len(&self) -> usize {
        self.transcript.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_busy(&self) -> bool {
        self.transcript.lock().busy
    }

    /// Sends one user message and blocks until the reply (or its fallback)
    /// is in the transcript. Remote failures never reach the caller.
    pub fn send(&self, text: &str) -> SendOutcome {
        if text.trim().is_empty() {
            return SendOutcome::Ignored(SendRejection::EmptyMessage);
        }

        let history = {
            let mut transcript = self.transcript.lock();
            if transcript.busy {
                debug!("send ignored; reply still pending");
                return SendOutcome::Ignored(SendRejection::Busy);
            }
            let history: Vec<ChatTurn> = transcript.messages.iter().map(ChatTurn::from).collect();
            transcript.messages.push(ChatMessage::user(text));
            transcript.busy = true;
            history
        };

        let request = ChatRequest {
            history,
            message: text.to_string(),
            context: self.serialized_context(),
        };
        let reply_text = match self.chat.reply(&request) {
            Ok(Some(text)) if !text.trim().is_empty() => text,
            Ok(_) => EMPTY_REPLY_FALLBACK.to_string(),
            Err(err) => {
                warn!(error = %error_chain_text(&err, 512), "chat request failed");
                CONNECTION_TROUBLE_REPLY.to_string()
            }
        };

        let reply = ChatMessage::assistant(reply_text);
        let mut transcript = self.transcript.lock();
        transcript.messages.push(reply.clone());
        transcript.busy = false;
        SendOutcome::Replied(reply)
    }

    fn serialized_context(&self) -> String {
        self.context
            .as_ref()
            .and_then(|result| match serde_json::to_string(result) {
                Ok(raw) => Some(raw),
                Err(err) => {
                    warn!(error = %err, "failed to serialize chat context");
                    None
                }
            })
            .unwrap_or_else(|| NO_CONTEXT_SENTINEL.to_string())
    }
}
