use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use neuroscan_contracts::analysis::{AnalysisResult, HistoryItem, Tone};
use neuroscan_contracts::conversation::{ChatMessage, ChatRole};
use neuroscan_contracts::report::{local_date, render_report, write_report};
use neuroscan_contracts::shell::{parse_intent, Intent, SHELL_HELP_COMMANDS};
use neuroscan_contracts::views::{Navigator, View, EMPTY_HISTORY, NO_RECORD_SELECTED};
use neuroscan_engine::session::ANALYSIS_FAILED_MESSAGE;
use neuroscan_engine::upload::ImagePayload;
use neuroscan_engine::{
    init_logging, AnalysisSession, ConversationSession, EngineConfig, ImageUpload,
    NeuroScanEngine, PhaseObserver, SendOutcome, SendRejection, SessionPhase,
};
use tracing::debug;

#[derive(Debug, Parser)]
#[command(name = "neuroscan", version, about = "NeuroScan chest X-ray analysis console")]
struct Cli {
    /// Directory holding the analysis history.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    /// Remote backend: gemini or dryrun.
    #[arg(long, global = true)]
    provider: Option<String>,
    #[arg(long, global = true)]
    model: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload and analyze one image.
    Analyze(AnalyzeArgs),
    /// List stored analyses, most recent first.
    History,
    Show(ShowArgs),
    /// Export or print the plain-text report for a record.
    Report(ReportArgs),
    /// Talk to the assistant, optionally about a stored record.
    Chat(ChatArgs),
    /// Interactive dashboard.
    Shell,
}

#[derive(Debug, Parser)]
struct AnalyzeArgs {
    #[arg(long)]
    image: PathBuf,
    /// Continue into a conversation about the result.
    #[arg(long)]
    discuss: bool,
}

#[derive(Debug, Parser)]
struct ShowArgs {
    #[arg(long)]
    id: String,
}

#[derive(Debug, Parser)]
struct ReportArgs {
    #[arg(long)]
    id: String,
    #[arg(long, conflicts_with = "print")]
    out: Option<PathBuf>,
    #[arg(long)]
    print: bool,
}

#[derive(Debug, Parser)]
struct ChatArgs {
    #[arg(long)]
    record: Option<String>,
}

const LANDING_TEXT: &str = "AI-assisted chest X-ray screening.

  1. Upload Image       PNG, JPG or JPEG, under 5MB
  2. Image Enhancement  noise reduction pass
  3. AI Analysis        pneumonia screening
  4. Get Results        diagnosis, confidence and findings

Start with /upload <path>, or /history to browse past records.
";

fn main() {
    init_logging();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("neuroscan error: {err:#}");
            std::process::exit(1);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = EngineConfig::from_env()
        .with_data_dir(cli.data_dir)
        .with_provider(cli.provider)
        .with_model(cli.model);
    debug!(
        data_dir = %config.data_dir.display(),
        provider = %config.provider,
        model = %config.model,
        "configuration resolved"
    );
    let engine = NeuroScanEngine::new(config)?;

    match cli.command {
        Command::Analyze(args) => run_analyze(&engine, args),
        Command::History => {
            print!("{}", format_history(&engine.store().list()));
            Ok(0)
        }
        Command::Show(args) => {
            let item = find_record(&engine, &args.id)?;
            print!("{}", format_record(&item));
            Ok(0)
        }
        Command::Report(args) => run_report(&engine, args),
        Command::Chat(args) => run_chat(&engine, args),
        Command::Shell => run_shell(engine),
    }
}

fn run_analyze(engine: &NeuroScanEngine, args: AnalyzeArgs) -> Result<i32> {
    let upload = ImageUpload::from_path(&args.image)?;
    let session = engine.new_session().with_observer(progress_printer());
    if let Err(err) = session.process_file(upload) {
        eprintln!("{err}");
        return Ok(2);
    }

    let phase = session.start_analysis()?;
    match (phase, session.result()) {
        (SessionPhase::Complete { .. }, Some(result)) => {
            print!("{}", format_result(&result));
            if args.discuss {
                chat_loop(&engine.start_conversation(Some(result)))?;
            }
            Ok(0)
        }
        _ => {
            eprintln!(
                "{}",
                session
                    .error()
                    .unwrap_or_else(|| ANALYSIS_FAILED_MESSAGE.to_string())
            );
            Ok(1)
        }
    }
}

fn run_report(engine: &NeuroScanEngine, args: ReportArgs) -> Result<i32> {
    let item = find_record(engine, &args.id)?;
    if args.print {
        print!("{}", render_report(&item));
        return Ok(0);
    }
    let dir = match args.out {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };
    let path = write_report(&dir, &item)
        .with_context(|| format!("failed to write report into {}", dir.display()))?;
    println!("Report saved to {}", path.display());
    Ok(0)
}

fn run_chat(engine: &NeuroScanEngine, args: ChatArgs) -> Result<i32> {
    let context = match args.record.as_deref() {
        Some(id) => Some(find_record(engine, id)?.result),
        None => None,
    };
    chat_loop(&engine.start_conversation(context))?;
    Ok(0)
}

fn find_record(engine: &NeuroScanEngine, id: &str) -> Result<HistoryItem> {
    engine
        .store()
        .get(id)
        .with_context(|| format!("no record with id {id}"))
}

fn chat_loop(conversation: &ConversationSession) -> Result<()> {
    print!("{}", format_transcript(&conversation.messages()));
    println!("Ask a question, or /quit to leave.");
    while let Some(line) = read_line("you> ")? {
        let intent = parse_intent(&line);
        match intent.action.as_str() {
            "noop" => {}
            "quit" => break,
            "message" => {
                if let Some(reply) = send_message(conversation, &intent) {
                    println!("{}", format_message(&reply));
                }
            }
            _ => println!("Only questions and /quit work here."),
        }
    }
    Ok(())
}

fn send_message(conversation: &ConversationSession, intent: &Intent) -> Option<ChatMessage> {
    let text = intent.message.as_deref().unwrap_or_default();
    match conversation.send(text) {
        SendOutcome::Replied(reply) => Some(reply),
        SendOutcome::Ignored(SendRejection::Busy) => {
            println!("Still waiting for Dr. Neuro to answer.");
            None
        }
        SendOutcome::Ignored(SendRejection::EmptyMessage) => None,
    }
}

fn run_shell(engine: NeuroScanEngine) -> Result<i32> {
    let mut dashboard = Dashboard::new(engine);
    println!("NeuroScan shell. Type /help for commands.");
    dashboard.render();

    while let Some(line) = read_line("> ")? {
        let intent = parse_intent(&line);
        if dashboard.handle(&intent)? == Flow::Quit {
            break;
        }
    }
    Ok(0)
}

fn read_line(prompt: &str) -> Result<Option<String>> {
    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("{prompt}");
        io::stdout().flush()?;
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(line.trim_end_matches(['\n', '\r']).to_string())),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) => return Err(err.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// The five views driven from one prompt. A conversation exists only while
/// the Chat view is showing.
struct Dashboard {
    engine: NeuroScanEngine,
    navigator: Navigator,
    session: AnalysisSession,
    conversation: Option<ConversationSession>,
}

impl Dashboard {
    fn new(engine: NeuroScanEngine) -> Self {
        let session = engine.new_session().with_observer(progress_printer());
        Self {
            engine,
            navigator: Navigator::new(),
            session,
            conversation: None,
        }
    }

    fn handle(&mut self, intent: &Intent) -> Result<Flow> {
        match intent.action.as_str() {
            "noop" => return Ok(Flow::Continue),
            "quit" => return Ok(Flow::Quit),
            "help" => println!("Commands: {}", SHELL_HELP_COMMANDS.join(" ")),
            "upload" => match intent.arg("path") {
                Some(path) => {
                    self.switch(View::Analyzer);
                    self.upload(path);
                    self.render();
                }
                None => println!("/upload requires a path"),
            },
            "analyze" => {
                self.switch(View::Analyzer);
                if intent.arg("path").map_or(true, |path| self.upload(path)) {
                    self.analyze();
                }
                self.render();
            }
            "reset" => {
                self.session.reset();
                self.switch(View::Analyzer);
                self.render();
            }
            "show_history" => self.go(View::History),
            "show_chat" => self.go(View::Chat),
            "show_landing" => self.go(View::Landing),
            "show_analyzer" => self.go(View::Analyzer),
            "open_record" => match intent.arg("id") {
                Some(id) => match self.engine.store().get(id) {
                    Some(item) => {
                        let previous = self.navigator.select_record(item);
                        self.sync_conversation(previous);
                        self.render();
                    }
                    None => println!("No record with id {id}"),
                },
                None => println!("/open requires a record id"),
            },
            "discuss" => match self.discussion_context() {
                Some(context) => {
                    self.navigator.start_chat(context.clone());
                    self.conversation = Some(self.engine.start_conversation(Some(context)));
                    self.render();
                }
                None => println!("Nothing to discuss yet. Analyze an image or open a record."),
            },
            "export_report" => match self.navigator.selected_record().cloned() {
                Some(item) => {
                    let dir = match intent.arg("dir") {
                        Some(dir) => PathBuf::from(dir),
                        None => std::env::current_dir()?,
                    };
                    match write_report(&dir, &item) {
                        Ok(path) => println!("Report saved to {}", path.display()),
                        Err(err) => println!("Could not save report: {err:#}"),
                    }
                }
                None => println!("Open a record first (/open <id>)."),
            },
            "print_report" => match self.navigator.selected_record() {
                Some(item) => print!("{}", render_report(item)),
                None => println!("Open a record first (/open <id>)."),
            },
            "message" => match (self.navigator.view(), self.conversation.as_ref()) {
                (View::Chat, Some(conversation)) => {
                    if let Some(reply) = send_message(conversation, intent) {
                        println!("{}", format_message(&reply));
                    }
                }
                _ => println!("Type /help for commands, or /chat to talk to Dr. Neuro."),
            },
            "unknown" => println!(
                "Unknown command /{}. Type /help for commands.",
                intent.arg("command").unwrap_or_default()
            ),
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn switch(&mut self, view: View) {
        let previous = self.navigator.navigate(view);
        self.sync_conversation(previous);
    }

    fn go(&mut self, view: View) {
        self.switch(view);
        self.render();
    }

    fn sync_conversation(&mut self, previous: View) {
        if self.navigator.view() != View::Chat {
            self.conversation = None;
        } else if previous != View::Chat || self.conversation.is_none() {
            let context = self.navigator.active_context().cloned();
            self.conversation = Some(self.engine.start_conversation(context));
        }
    }

    /// The record on screen, else the session's fresh result, else whatever
    /// context was bound last.
    fn discussion_context(&self) -> Option<AnalysisResult> {
        self.navigator
            .selected_record()
            .map(|item| item.result.clone())
            .or_else(|| self.session.result())
            .or_else(|| self.navigator.active_context().cloned())
    }

    fn upload(&self, path: &str) -> bool {
        let upload = match ImageUpload::from_path(Path::new(path)) {
            Ok(upload) => upload,
            Err(err) => {
                println!("{err:#}");
                return false;
            }
        };
        match self.session.process_file(upload) {
            Ok(_) => true,
            Err(err) => {
                println!("{err}");
                false
            }
        }
    }

    fn analyze(&mut self) {
        match self.session.start_analysis() {
            Ok(SessionPhase::Complete { .. }) => {
                if let Some(result) = self.session.result() {
                    self.navigator.record_analysis(result);
                }
            }
            Ok(_) => {}
            Err(err) => println!("{err}"),
        }
    }

    fn render(&self) {
        print!("{}", self.render_view());
    }

    fn render_view(&self) -> String {
        let view = self.navigator.view();
        let mut out = format!("\n== {} ==\n", view.title());
        match view {
            View::Landing => out.push_str(LANDING_TEXT),
            View::Analyzer => out.push_str(&self.analyzer_body()),
            View::History => out.push_str(&format_history(&self.engine.store().list())),
            View::Chat => {
                if let Some(conversation) = self.conversation.as_ref() {
                    out.push_str(&format_transcript(&conversation.messages()));
                }
            }
            View::Detail => match self.navigator.selected_record() {
                Some(item) => {
                    out.push_str(&format_record(item));
                    out.push_str("/discuss, /report [dir] or /print\n");
                }
                None => {
                    out.push_str(NO_RECORD_SELECTED);
                    out.push('\n');
                }
            },
        }
        out
    }

    fn analyzer_body(&self) -> String {
        let mut out = String::new();
        match self.session.phase() {
            SessionPhase::Idle => {
                out.push_str("Upload a chest X-ray: /upload <path> or /analyze <path>\n");
            }
            SessionPhase::Uploading => {
                let name = self.session.file_name().unwrap_or_default();
                out.push_str(&format!("Image uploaded: {name}\nRun /analyze to process.\n"));
            }
            SessionPhase::Enhancing { .. } | SessionPhase::Analyzing { .. } => {
                out.push_str("Processing...\n");
            }
            SessionPhase::Complete { .. } => {
                if let Some(result) = self.session.result() {
                    out.push_str(&format_result(&result));
                }
                out.push_str("/discuss to ask Dr. Neuro, /reset to start over.\n");
            }
            SessionPhase::Error => {
                out.push_str("/reset to try again.\n");
            }
        }
        if let Some(error) = self.session.error() {
            out.push_str(&format!("Error: {error}\n"));
        }
        out
    }
}

fn progress_printer() -> PhaseObserver {
    Arc::new(|phase: &SessionPhase| {
        if let Some(label) = progress_label(phase) {
            println!("  .. {label}");
        }
    })
}

fn progress_label(phase: &SessionPhase) -> Option<&'static str> {
    match phase {
        SessionPhase::Idle | SessionPhase::Uploading => None,
        SessionPhase::Enhancing { enhanced: false } => Some("Noise Reduction & Enhancement"),
        SessionPhase::Enhancing { enhanced: true } => Some("Enhancement complete"),
        SessionPhase::Analyzing { .. } => Some("Pattern Recognition"),
        SessionPhase::Complete { .. } => Some("Results ready"),
        SessionPhase::Error => Some("Analysis failed"),
    }
}

fn tone_marker(tone: Tone) -> &'static str {
    match tone {
        Tone::Ok => "[ok]",
        Tone::Info => "[i]",
        Tone::Caution => "[?]",
        Tone::Alert => "[!]",
    }
}

fn format_result(result: &AnalysisResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Diagnosis:      {} {}\n",
        tone_marker(result.diagnosis.tone()),
        result.diagnosis
    ));
    out.push_str(&format!("Confidence:     {}%\n", result.confidence));
    out.push_str(&format!(
        "Severity:       {} {}\n",
        tone_marker(result.severity.tone()),
        result.severity
    ));
    out.push_str("Findings:\n");
    if result.findings.is_empty() {
        out.push_str("  (none)\n");
    }
    for finding in &result.findings {
        out.push_str(&format!("  - {finding}\n"));
    }
    out.push_str(&format!("Recommendation: {}\n", result.recommendation));
    out.push_str(&format!("Record ID:      {}\n", result.id));
    out
}

fn format_record(item: &HistoryItem) -> String {
    let image = ImagePayload::from_data_url(&item.image_url)
        .map(|payload| format!("{} ({} base64 chars)", payload.mime_type, payload.data.len()))
        .unwrap_or_else(|| "unavailable".to_string());
    format!(
        "Date:           {}\nImage:          {}\n{}",
        local_date(&item.result.date),
        image,
        format_result(&item.result)
    )
}

fn format_history(items: &[HistoryItem]) -> String {
    if items.is_empty() {
        return format!("{EMPTY_HISTORY}\n");
    }
    items
        .iter()
        .map(|item| {
            format!(
                "{}  {}  {} {} ({}%, {})\n",
                local_date(&item.result.date),
                item.result.id,
                tone_marker(item.result.diagnosis.tone()),
                item.result.diagnosis,
                item.result.confidence,
                item.result.severity
            )
        })
        .collect()
}

fn format_message(message: &ChatMessage) -> String {
    let speaker = match message.role {
        ChatRole::User => "You",
        ChatRole::Assistant => "Dr. Neuro",
    };
    format!("{speaker}: {}", message.text)
}

fn format_transcript(messages: &[ChatMessage]) -> String {
    messages
        .iter()
        .map(|message| format_message(message) + "\n")
        .collect()
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::time::Duration;

    use neuroscan_contracts::analysis::{
        AnalysisResult, Assessment, Confidence, Diagnosis, HistoryItem, Severity,
    };
    use neuroscan_contracts::shell::parse_intent;
    use neuroscan_contracts::views::{View, EMPTY_HISTORY, NO_RECORD_SELECTED};
    use neuroscan_engine::{EngineConfig, NeuroScanEngine, SessionPhase};

    use super::{format_history, format_result, progress_label, Dashboard, Flow};

    fn dryrun_engine(data_dir: &Path) -> anyhow::Result<NeuroScanEngine> {
        NeuroScanEngine::new(EngineConfig {
            data_dir: data_dir.to_path_buf(),
            provider: "dryrun".to_string(),
            model: "gemini-2.5-flash".to_string(),
            api_base: "https://example.test/v1beta".to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(5),
            enhancement_delay: Duration::ZERO,
        })
    }

    fn pneumonia(id: &str) -> AnalysisResult {
        AnalysisResult::with_identity(
            id,
            "2025-03-01T10:00:00.000Z",
            Assessment {
                diagnosis: Diagnosis::Pneumonia,
                confidence: Confidence::new(88.0).unwrap(),
                severity: Severity::High,
                findings: vec!["Right lower lobe consolidation".to_string()],
                recommendation: "Follow up with pulmonologist.".to_string(),
            },
        )
    }

    #[test]
    fn history_listing_has_empty_state() {
        assert_eq!(format_history(&[]), format!("{EMPTY_HISTORY}\n"));

        let item = HistoryItem {
            result: pneumonia("abc123"),
            image_url: "data:image/png;base64,QUJD".to_string(),
        };
        let listing = format_history(&[item]);
        assert!(listing.contains("abc123"));
        assert!(listing.contains("[!] Pneumonia (88%, High)"));
    }

    #[test]
    fn result_block_lists_findings_in_order() {
        let mut result = pneumonia("r1");
        result.findings.push("Mild pleural effusion".to_string());
        let block = format_result(&result);
        let first = block.find("Right lower lobe").unwrap_or(usize::MAX);
        let second = block.find("Mild pleural").unwrap_or(0);
        assert!(first < second);
        assert!(block.contains("Confidence:     88%"));
    }

    #[test]
    fn progress_labels_cover_enhancement_steps() {
        assert_eq!(progress_label(&SessionPhase::Idle), None);
        assert_eq!(
            progress_label(&SessionPhase::Enhancing { enhanced: false }),
            Some("Noise Reduction & Enhancement")
        );
        assert_eq!(
            progress_label(&SessionPhase::Analyzing { enhanced: true }),
            Some("Pattern Recognition")
        );
    }

    #[test]
    fn dashboard_walks_analyze_open_discuss_and_report() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let image = temp.path().join("xray.png");
        std::fs::write(&image, b"not really a png")?;
        let mut dashboard = Dashboard::new(dryrun_engine(&temp.path().join("home"))?);

        let analyze = format!("/analyze \"{}\"", image.display());
        assert_eq!(dashboard.handle(&parse_intent(&analyze))?, Flow::Continue);
        assert_eq!(dashboard.navigator.view(), View::Analyzer);
        assert_eq!(dashboard.session.phase(), SessionPhase::Complete { enhanced: true });
        let result = dashboard
            .navigator
            .active_context()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("analysis did not become the active context"))?;

        dashboard.handle(&parse_intent("/chat"))?;
        let greeting = dashboard
            .conversation
            .as_ref()
            .map(|conversation| conversation.messages()[0].text.clone())
            .unwrap_or_default();
        assert!(greeting.contains(result.diagnosis.as_str()));

        dashboard.handle(&parse_intent("/history"))?;
        assert!(dashboard.conversation.is_none());

        dashboard.handle(&parse_intent(&format!("/open {}", result.id)))?;
        assert_eq!(dashboard.navigator.view(), View::Detail);
        assert!(dashboard.render_view().contains(&result.id));

        let reports = temp.path().join("reports");
        dashboard.handle(&parse_intent(&format!("/report \"{}\"", reports.display())))?;
        assert!(reports
            .join(format!("neuroscan-report-{}.txt", result.id))
            .exists());

        dashboard.handle(&parse_intent("/discuss"))?;
        assert_eq!(dashboard.navigator.view(), View::Chat);
        let before = dashboard
            .conversation
            .as_ref()
            .map(|conversation| conversation.len())
            .unwrap_or_default();
        dashboard.handle(&parse_intent("What does this mean?"))?;
        let after = dashboard
            .conversation
            .as_ref()
            .map(|conversation| conversation.len())
            .unwrap_or_default();
        assert_eq!(after, before + 2);

        assert_eq!(dashboard.handle(&parse_intent("/quit"))?, Flow::Quit);
        Ok(())
    }

    #[test]
    fn detail_without_record_and_bad_upload_are_reported_in_view() -> anyhow::Result<()> {
        let temp = tempfile::tempdir()?;
        let notes = temp.path().join("notes.txt");
        std::fs::write(&notes, b"hello")?;
        let mut dashboard = Dashboard::new(dryrun_engine(temp.path())?);

        dashboard.handle(&parse_intent(&format!("/upload \"{}\"", notes.display())))?;
        assert_eq!(dashboard.session.phase(), SessionPhase::Idle);
        assert!(dashboard
            .render_view()
            .contains("Please upload a valid image file (PNG, JPG, JPEG)."));

        dashboard.navigator.navigate(View::Detail);
        assert!(dashboard.render_view().contains(NO_RECORD_SELECTED));
        Ok(())
    }
}
