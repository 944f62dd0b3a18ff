use std::io::{self, BufRead, Write};

use anyhow::Result;
use crossterm::cursor::MoveTo;
use crossterm::queue;
use crossterm::terminal::{Clear, ClearType};
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::ChatError;
use crate::history::{ConversationHistory, Role};
use crate::i18n::{Language, MessageKey, t};
use crate::llm::ChatBackend;
use crate::llm::client::ChatClient;
use crate::sanitize;

/// Assistant replies longer than this are shortened in the `history` view.
const HISTORY_PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Quit,
    Clear,
    Reset,
    History,
    Help,
}

impl Command {
    fn parse(line: &str) -> Option<Self> {
        match line.to_lowercase().as_str() {
            "quit" | "exit" => Some(Self::Quit),
            "clear" => Some(Self::Clear),
            "reset" => Some(Self::Reset),
            "history" => Some(Self::History),
            "help" => Some(Self::Help),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Shortens `s` to `max_chars` characters, marking the cut with `...`.
fn truncate_preview(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", &s[..cut]),
        None => s.to_string(),
    }
}

/// One conversation: owns the transcript and drives either a single
/// question or the interactive prompt loop over `input`/`output`.
pub struct SessionLoop<B, R, W> {
    client: ChatClient<B>,
    provider: ProviderConfig,
    history: ConversationHistory,
    lang: Language,
    input: R,
    output: W,
}

impl<B, R, W> SessionLoop<B, R, W>
where
    B: ChatBackend,
    R: BufRead,
    W: Write,
{
    pub fn new(
        client: ChatClient<B>,
        provider: ProviderConfig,
        lang: Language,
        input: R,
        output: W,
    ) -> Self {
        Self {
            client,
            provider,
            history: ConversationHistory::new(),
            lang,
            input,
            output,
        }
    }

    /// Asks one question and returns whether it was answered.
    pub fn run_single(&mut self, question: &str) -> Result<bool> {
        let cleaned = sanitize::clean(question);
        if cleaned.is_empty() {
            writeln!(self.output, "{}", t(&self.lang, MessageKey::InvalidInput))?;
            return Ok(false);
        }
        Ok(self.exchange(&cleaned)?)
    }

    /// Prompts until `quit`/`exit` or end of input. Exchange failures are
    /// reported and the prompt comes back; only a read failure is returned.
    pub fn run_interactive(&mut self) -> Result<()> {
        self.print_welcome()?;

        let mut raw = Vec::new();
        loop {
            write!(self.output, "{}", t(&self.lang, MessageKey::PromptUser))?;
            self.output.flush()?;

            raw.clear();
            let n = match self.input.read_until(b'\n', &mut raw) {
                Ok(n) => n,
                Err(e) => {
                    let label = t(&self.lang, MessageKey::InputFailed);
                    writeln!(self.output, "\n{label}{e}")?;
                    return Err(ChatError::input("terminal read failed", e).into());
                }
            };
            if n == 0 {
                writeln!(self.output)?;
                return Ok(());
            }

            let line = String::from_utf8_lossy(&raw);
            if self.handle_line(&line)? == Flow::Quit {
                return Ok(());
            }
        }
    }

    fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Flow::Continue);
        }

        let cleaned = sanitize::clean(trimmed);
        if cleaned.is_empty() {
            writeln!(self.output, "{}", t(&self.lang, MessageKey::InvalidInput))?;
            return Ok(Flow::Continue);
        }

        match Command::parse(&cleaned) {
            Some(Command::Quit) => {
                writeln!(self.output, "{}", t(&self.lang, MessageKey::Goodbye))?;
                return Ok(Flow::Quit);
            }
            Some(Command::Clear) => self.clear_screen()?,
            Some(Command::Reset) => {
                self.history.reset();
                writeln!(self.output, "{}", t(&self.lang, MessageKey::ResetDone))?;
            }
            Some(Command::History) => self.print_history()?,
            Some(Command::Help) => self.print_help()?,
            None => {
                if cleaned != trimmed {
                    let label = t(&self.lang, MessageKey::CleanedInput);
                    writeln!(self.output, "{label}{cleaned}")?;
                }
                self.exchange(&cleaned)?;
                writeln!(self.output)?;
            }
        }
        Ok(Flow::Continue)
    }

    fn exchange(&mut self, question: &str) -> io::Result<bool> {
        match self.client.send(&self.provider, &mut self.history, question) {
            Ok(answer) => {
                writeln!(
                    self.output,
                    "{}{}",
                    t(&self.lang, MessageKey::PromptAssistant),
                    answer.text
                )?;
                let usage = answer.usage;
                writeln!(
                    self.output,
                    "\n{}{} ({}{}, {}{}) | {}{}",
                    t(&self.lang, MessageKey::UsageTokens),
                    usage.total_tokens,
                    t(&self.lang, MessageKey::UsagePrompt),
                    usage.prompt_tokens,
                    t(&self.lang, MessageKey::UsageCompletion),
                    usage.completion_tokens,
                    t(&self.lang, MessageKey::UsageTurns),
                    self.history.turn_count()
                )?;
                Ok(true)
            }
            Err(err) => {
                debug!(error = %err.chain(), "chat exchange failed");
                writeln!(
                    self.output,
                    "{}{}",
                    t(&self.lang, MessageKey::ChatFailed),
                    err.chain()
                )?;
                writeln!(self.output, "{}", t(&self.lang, MessageKey::ChatFailedHint))?;
                Ok(false)
            }
        }
    }

    fn print_welcome(&mut self) -> io::Result<()> {
        writeln!(self.output, "{}", t(&self.lang, MessageKey::Banner))?;
        writeln!(self.output, "{}", t(&self.lang, MessageKey::StartHint))?;
        self.print_commands()?;
        writeln!(self.output, "{}", t(&self.lang, MessageKey::RetryHint))?;
        writeln!(self.output, "---")
    }

    fn print_commands(&mut self) -> io::Result<()> {
        writeln!(self.output, "{}", t(&self.lang, MessageKey::CommandsHeader))?;
        for key in [
            MessageKey::CommandQuit,
            MessageKey::CommandClear,
            MessageKey::CommandReset,
            MessageKey::CommandHistory,
            MessageKey::CommandHelp,
        ] {
            writeln!(self.output, "{}", t(&self.lang, key))?;
        }
        Ok(())
    }

    fn print_help(&mut self) -> io::Result<()> {
        self.print_commands()?;
        writeln!(self.output, "{}", t(&self.lang, MessageKey::CommandAsk))
    }

    fn clear_screen(&mut self) -> io::Result<()> {
        queue!(self.output, Clear(ClearType::All), MoveTo(0, 0))?;
        writeln!(self.output, "{}", t(&self.lang, MessageKey::Banner))?;
        writeln!(
            self.output,
            "{}{}",
            t(&self.lang, MessageKey::CurrentTurns),
            self.history.turn_count()
        )?;
        writeln!(self.output, "{}", t(&self.lang, MessageKey::BannerCommandsHint))?;
        writeln!(self.output, "---")
    }

    fn print_history(&mut self) -> io::Result<()> {
        if self.history.is_empty() {
            return writeln!(self.output, "{}", t(&self.lang, MessageKey::HistoryEmpty));
        }

        writeln!(self.output, "{}", t(&self.lang, MessageKey::HistoryHeader))?;
        let user = t(&self.lang, MessageKey::PromptUser);
        let assistant = t(&self.lang, MessageKey::PromptAssistant);
        for (i, msg) in self.history.messages().iter().enumerate() {
            match msg.role {
                Role::User => {
                    writeln!(self.output, "  {}. {user}{}", i / 2 + 1, msg.content)?
                }
                Role::Assistant => writeln!(
                    self.output,
                    "     {assistant}{}",
                    truncate_preview(&msg.content, HISTORY_PREVIEW_CHARS)
                )?,
                Role::System => {}
            }
        }
        writeln!(
            self.output,
            "{}{}",
            t(&self.lang, MessageKey::HistoryTotal),
            self.history.turn_count()
        )
    }

    #[cfg(test)]
    fn history(&self) -> &ConversationHistory {
        &self.history
    }

    #[cfg(test)]
    fn client(&self) -> &ChatClient<B> {
        &self.client
    }

    #[cfg(test)]
    fn output(&self) -> &W {
        &self.output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::client::testing::ScriptedBackend;

    type TestSession<'a> = SessionLoop<ScriptedBackend, &'a [u8], Vec<u8>>;

    fn session<'a>(backend: ScriptedBackend, input: &'a [u8]) -> TestSession<'a> {
        let provider = ProviderConfig {
            api_key: "sk-demo".to_string(),
            ..ProviderConfig::default()
        };
        SessionLoop::new(
            ChatClient::new(backend),
            provider,
            Language::En,
            input,
            Vec::new(),
        )
    }

    fn output(session: &TestSession<'_>) -> String {
        String::from_utf8(session.output().clone()).unwrap()
    }

    #[test]
    fn test_command_parse_is_case_insensitive() {
        assert_eq!(Command::parse("QUIT"), Some(Command::Quit));
        assert_eq!(Command::parse("Exit"), Some(Command::Quit));
        assert_eq!(Command::parse("History"), Some(Command::History));
        assert_eq!(Command::parse("reset please"), None);
        assert_eq!(Command::parse("helpme"), None);
    }

    #[test]
    fn test_truncate_preview() {
        let long = "x".repeat(150);
        assert_eq!(
            truncate_preview(&long, 100),
            format!("{}...", "x".repeat(100))
        );
        let exact = "y".repeat(100);
        assert_eq!(truncate_preview(&exact, 100), exact);
        assert_eq!(truncate_preview("短文本", 100), "短文本");
        assert_eq!(truncate_preview("你好世界", 2), "你好...");
    }

    #[test]
    fn test_single_shot_prints_answer_and_usage() {
        let mut s = session(ScriptedBackend::new().reply("hello", 10, 5), b"");
        assert!(s.run_single("hi").unwrap());

        let out = output(&s);
        assert!(out.contains("assistant> hello"));
        assert!(out.contains("📊 Tokens: 15 (prompt: 10, completion: 5) | turns: 1"));
        assert_eq!(s.history().turn_count(), 1);
        assert_eq!(s.client().backend().call_count(), 1);
    }

    #[test]
    fn test_single_shot_with_auto_selected_provider() {
        let config: crate::config::Config =
            toml::from_str("[providers.demo]\napi_key = \"sk-demo\"\nmodel = \"demo-model\"\n")
                .unwrap();
        let (name, provider) = config.select_provider(None).unwrap();
        assert_eq!(name, "demo");

        let backend = ScriptedBackend::new().reply("hello", 10, 5);
        let mut s = SessionLoop::new(
            ChatClient::new(backend),
            provider,
            Language::En,
            &b""[..],
            Vec::new(),
        );
        assert!(s.run_single("hi").unwrap());

        let out = output(&s);
        assert!(out.contains("hello"));
        let usage_line = out.lines().find(|l| l.starts_with("📊")).unwrap();
        for expected in ["15", "10", "5", "turns: 1"] {
            assert!(usage_line.contains(expected), "{usage_line}");
        }
        let requests = s.client().backend().requests.borrow();
        assert_eq!(requests[0].model, "demo-model");
        assert_eq!(requests[0].api_key, "sk-demo");
    }

    #[test]
    fn test_single_shot_reports_failure() {
        let backend = ScriptedBackend::new().fail(ChatError::Api {
            status: 401,
            body: "invalid key".to_string(),
        });
        let mut s = session(backend, b"");
        assert!(!s.run_single("hi").unwrap());

        let out = output(&s);
        assert!(out.contains("❌ Chat failed: API returned error 401: invalid key"));
        assert!(out.contains("Check your network connection"));
    }

    #[test]
    fn test_single_shot_rejects_blank_question() {
        let mut s = session(ScriptedBackend::new(), b"");
        assert!(!s.run_single(" \x01 ").unwrap());
        assert_eq!(s.client().backend().call_count(), 0);
    }

    #[test]
    fn test_reset_then_quit_issues_no_request() {
        let mut s = session(ScriptedBackend::new(), b"reset\nquit\n");
        s.run_interactive().unwrap();

        let out = output(&s);
        assert!(out.contains("🔄 Conversation history reset"));
        assert!(out.contains("👋 Bye!"));
        assert_eq!(s.client().backend().call_count(), 0);
    }

    #[test]
    fn test_end_of_input_terminates() {
        let mut s = session(ScriptedBackend::new(), b"\n   \n");
        s.run_interactive().unwrap();
        assert!(!output(&s).contains("Bye"));
        assert_eq!(s.client().backend().call_count(), 0);
    }

    #[test]
    fn test_read_failure_ends_session() {
        struct Broken;
        impl io::Read for Broken {
            fn read(&mut self, _: &mut [u8]) -> io::Result<usize> {
                Err(io::Error::other("tty gone"))
            }
        }

        let mut s = SessionLoop::new(
            ChatClient::new(ScriptedBackend::new()),
            ProviderConfig::default(),
            Language::En,
            io::BufReader::new(Broken),
            Vec::new(),
        );
        let err = s.run_interactive().unwrap_err();
        let chat_err = err.downcast_ref::<ChatError>().unwrap();
        assert!(matches!(chat_err, ChatError::Input { .. }));
        assert!(chat_err.is_fatal());
        assert!(String::from_utf8_lossy(s.output()).contains("❌ Input error: tty gone"));
    }

    #[test]
    fn test_invalid_characters_warn_and_reprompt() {
        let mut s = session(ScriptedBackend::new(), b"\x01\x02\x1b\nexit\n");
        s.run_interactive().unwrap();

        let out = output(&s);
        assert!(out.contains("⚠️  Input contained only invalid characters"));
        assert_eq!(s.client().backend().call_count(), 0);
    }

    #[test]
    fn test_multi_turn_conversation_keeps_context() {
        let backend = ScriptedBackend::new()
            .reply("first answer", 5, 3)
            .reply("second answer", 12, 4);
        let mut s = session(backend, b"question one\nQuestion   two\n");
        s.run_interactive().unwrap();

        assert_eq!(s.history().len(), 4);
        assert_eq!(s.history().turn_count(), 2);
        let requests = s.client().backend().requests.borrow();
        assert_eq!(requests[1].messages.len(), 3);
        assert_eq!(requests[1].messages[2].content, "Question two");

        let out = output(&s);
        assert!(out.contains("📝 Cleaned input: Question two"));
        assert!(out.contains("| turns: 2"));
    }

    #[test]
    fn test_exchange_error_does_not_stop_loop() {
        let backend = ScriptedBackend::new()
            .empty()
            .reply("recovered", 1, 1);
        let mut s = session(backend, b"first\nsecond\nquit\n");
        s.run_interactive().unwrap();

        let out = output(&s);
        assert!(out.contains("API returned an empty response"));
        assert!(out.contains("assistant> recovered"));
        // The unanswered question stays in the transcript.
        assert_eq!(s.history().len(), 3);
        assert_eq!(s.history().turn_count(), 1);
    }

    #[test]
    fn test_history_command_numbers_turns_and_truncates() {
        let long = "z".repeat(150);
        let backend = ScriptedBackend::new()
            .reply(&long, 1, 1)
            .reply(&"w".repeat(100), 1, 1);
        let mut s = session(backend, b"one\ntwo\nhistory\nquit\n");
        s.run_interactive().unwrap();

        let out = output(&s);
        assert!(out.contains("  1. you> one"));
        assert!(out.contains("  2. you> two"));
        assert!(out.contains(&format!("     assistant> {}...\n", "z".repeat(100))));
        assert!(out.contains(&format!("     assistant> {}\n", "w".repeat(100))));
        assert!(out.contains("📊 Total turns: 2"));
    }

    #[test]
    fn test_history_command_on_empty_history() {
        let mut s = session(ScriptedBackend::new(), b"HISTORY\nquit\n");
        s.run_interactive().unwrap();
        assert!(output(&s).contains("📝 No conversation yet"));
    }

    #[test]
    fn test_clear_redraws_banner_with_turn_count() {
        let backend = ScriptedBackend::new().reply("a", 1, 1);
        let mut s = session(backend, b"q\nclear\nquit\n");
        s.run_interactive().unwrap();

        let out = output(&s);
        assert!(out.contains("\x1b[2J"));
        assert!(out.contains("💡 Turns so far: 1"));
    }

    #[test]
    fn test_reset_discards_context() {
        let backend = ScriptedBackend::new().reply("a1", 1, 1).reply("a2", 1, 1);
        let mut s = session(backend, b"q1\nreset\nq2\nquit\n");
        s.run_interactive().unwrap();

        let requests = s.client().backend().requests.borrow();
        assert_eq!(requests[1].messages.len(), 1);
        assert_eq!(s.history().turn_count(), 1);
    }

    #[test]
    fn test_help_lists_commands() {
        let mut s = session(ScriptedBackend::new(), b"help\nquit\n");
        s.run_interactive().unwrap();
        let out = output(&s);
        assert!(out.contains("anything else is sent as a question"));
        assert!(out.contains("reset - forget the conversation"));
    }
}
