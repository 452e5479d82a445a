use std::collections::BTreeMap;

use super::command_registry::{CommandSpec, NO_ARG_COMMANDS, SINGLE_ARG_COMMANDS};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Intent {
    pub action: String,
    pub raw: String,
    pub message: Option<String>,
    pub args: BTreeMap<String, String>,
}

impl Intent {
    fn new(action: &str, raw: &str) -> Self {
        Self {
            action: action.to_string(),
            raw: raw.to_string(),
            message: None,
            args: BTreeMap::new(),
        }
    }

    pub fn arg(&self, key: &str) -> Option<&str> {
        self.args
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

fn find_spec(command: &str, specs: &'static [CommandSpec]) -> Option<&'static CommandSpec> {
    specs.iter().find(|spec| spec.command == command)
}

fn parse_single_arg(arg: &str) -> String {
    if arg.trim().is_empty() {
        return String::new();
    }
    match shell_words::split(arg) {
        Ok(parts) => parts
            .into_iter()
            .filter(|value| !value.is_empty())
            .collect::<Vec<String>>()
            .join(" "),
        Err(_) => arg.trim().to_string(),
    }
}

/// Parses one line typed into the dashboard shell. Slash commands map to
/// actions; anything else is a free-text `message`.
pub fn parse_intent(text: &str) -> Intent {
    let raw_trimmed = text.trim();
    if raw_trimmed.is_empty() {
        return Intent::new("noop", text);
    }

    if let Some(slash_tail) = raw_trimmed.strip_prefix('/') {
        let command_len = slash_tail
            .chars()
            .take_while(|ch| ch.is_ascii_alphanumeric() || *ch == '_')
            .count();
        if command_len > 0 {
            let command = slash_tail[..command_len].to_ascii_lowercase();
            let arg = slash_tail[command_len..].trim();

            if let Some(spec) = find_spec(&command, SINGLE_ARG_COMMANDS) {
                let mut intent = Intent::new(spec.action, text);
                intent
                    .args
                    .insert(spec.arg_key.to_string(), parse_single_arg(arg));
                return intent;
            }

            if let Some(spec) = find_spec(&command, NO_ARG_COMMANDS) {
                return Intent::new(spec.action, text);
            }

            let mut intent = Intent::new("unknown", text);
            intent.args.insert("command".to_string(), command);
            intent.args.insert("arg".to_string(), arg.to_string());
            return intent;
        }
    }

    let mut intent = Intent::new("message", text);
    intent.message = Some(raw_trimmed.to_string());
    intent
}

#[cfg(test)]
mod tests {
    use super::parse_intent;

    #[test]
    fn blank_input_is_noop() {
        assert_eq!(parse_intent("").action, "noop");
        assert_eq!(parse_intent("   \t").action, "noop");
    }

    #[test]
    fn analyze_accepts_quoted_paths() {
        let intent = parse_intent("/analyze \"/tmp/chest scan.png\"");
        assert_eq!(intent.action, "analyze");
        assert_eq!(intent.arg("path"), Some("/tmp/chest scan.png"));

        let upload = parse_intent("  /upload xray.png  ");
        assert_eq!(upload.action, "upload");
        assert_eq!(upload.arg("path"), Some("xray.png"));
    }

    #[test]
    fn analyze_without_path_has_no_arg() {
        let intent = parse_intent("/analyze");
        assert_eq!(intent.action, "analyze");
        assert_eq!(intent.arg("path"), None);
    }

    #[test]
    fn open_and_report_capture_their_argument() {
        let open = parse_intent("/open abc123");
        assert_eq!(open.action, "open_record");
        assert_eq!(open.arg("id"), Some("abc123"));

        let report = parse_intent("/report ./reports");
        assert_eq!(report.action, "export_report");
        assert_eq!(report.arg("dir"), Some("./reports"));
    }

    #[test]
    fn navigation_commands_are_case_insensitive() {
        assert_eq!(parse_intent("/HISTORY").action, "show_history");
        assert_eq!(parse_intent("/chat").action, "show_chat");
        assert_eq!(parse_intent("/home").action, "show_landing");
        assert_eq!(parse_intent("/console").action, "show_analyzer");
        assert_eq!(parse_intent("/discuss").action, "discuss");
        assert_eq!(parse_intent("/exit").action, "quit");
    }

    #[test]
    fn free_text_becomes_message() {
        let intent = parse_intent("  What does consolidation mean?  ");
        assert_eq!(intent.action, "message");
        assert_eq!(
            intent.message.as_deref(),
            Some("What does consolidation mean?")
        );
    }

    #[test]
    fn unknown_command_keeps_name_and_arg() {
        let intent = parse_intent("/zoom 200%");
        assert_eq!(intent.action, "unknown");
        assert_eq!(intent.arg("command"), Some("zoom"));
        assert_eq!(intent.arg("arg"), Some("200%"));
    }

    #[test]
    fn lone_slash_is_a_message() {
        assert_eq!(parse_intent("/ hello").action, "message");
    }
}
