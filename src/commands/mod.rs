/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `serve`: HTTP streaming endpoint
- `analyze`: One-shot analysis of a single image
- `chat`: Interactive session with history

The handlers are small and delegate to the analysis, session and server
components of the library.
*/

use crate::analysis::{
    FragmentKind, RequestBuilder, StreamingDelivery, SynchronousDelivery,
};
use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
use crate::config::Config;
use crate::error::{Result, VisionChatError};
use crate::providers::create_provider;
use std::path::PathBuf;

// Special commands parser for the interactive session
pub mod special_commands;

/// Serve command handler
pub mod serve {
    use super::*;

    /// Run the HTTP streaming endpoint until Ctrl-C
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    pub async fn run_serve(config: Config) -> Result<()> {
        tracing::info!("Starting HTTP server on {}", config.server.bind);
        crate::server::serve(&config).await
    }
}

/// Analyze command handler
///
/// Reads the image fully into memory, builds one request and prints the
/// response either incrementally or as a whole.
pub mod analyze {
    use super::*;
    use colored::Colorize;
    use futures::StreamExt;
    use std::io::Write;

    /// Analyze one image and print the response
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `image` - Path to the image file
    /// * `prompt` - Prompt text, defaults to `session.default_prompt`
    /// * `stream` - Print fragments as they arrive
    ///
    /// # Errors
    ///
    /// Returns error if the image cannot be read, validation fails, or the
    /// backend reports a failure. The failure detail is printed here, the
    /// returned error only marks the run as unsuccessful.
    pub async fn run_analyze(
        config: Config,
        image: PathBuf,
        prompt: Option<String>,
        stream: bool,
    ) -> Result<()> {
        let bytes = tokio::fs::read(&image).await.map_err(|e| {
            VisionChatError::Validation(format!(
                "cannot read image {}: {}",
                image.display(),
                e
            ))
        })?;
        let prompt = prompt.unwrap_or_else(|| config.session.default_prompt.clone());

        let builder = RequestBuilder::new(config.provider.ollama.model.clone());
        let request = builder.build(&prompt, bytes, None)?;
        let provider = create_provider(&config.provider)?;

        tracing::info!(
            "Analyzing {} with model {}",
            image.display(),
            request.model()
        );

        if stream {
            let mut fragments = StreamingDelivery::new(provider).stream(request);
            let mut stdout = std::io::stdout();
            let mut failure = None;
            while let Some(fragment) = fragments.next().await {
                match fragment.kind {
                    FragmentKind::Content => {
                        print!("{}", fragment.text);
                        stdout.flush()?;
                    }
                    FragmentKind::Error => failure = Some(fragment.text),
                }
            }
            println!();

            match failure {
                Some(text) => analysis_failed(&text),
                None => Ok(()),
            }
        } else {
            let result = SynchronousDelivery::new(provider).run(request).await;
            if result.is_success() {
                println!("{}", result.response);
                Ok(())
            } else {
                analysis_failed(&result.response)
            }
        }
    }

    fn analysis_failed(detail: &str) -> Result<()> {
        eprintln!("{}", detail.red());
        Err(VisionChatError::Backend(ANALYSIS_FAILED.to_string()).into())
    }

    const ANALYSIS_FAILED: &str = "analysis did not complete";

}

/// Interactive session handler
///
/// The foreground task owns the [`DesktopSession`] and is the only place its
/// state changes. Readline runs on a dedicated thread and hands lines over a
/// channel, so worker results are shown while the user is idle at the prompt.
pub mod chat {
    use super::*;
    use crate::preview::is_supported_image;
    use crate::session::desktop::{STATUS_COMPLETE, STATUS_ERROR};
    use crate::session::{DesktopSession, DesktopState, SessionMessage, TriggerOutcome};
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;
    use tokio::sync::mpsc;

    const PROMPT: &str = "visionchat> ";

    /// Input forwarded from the readline thread
    #[derive(Debug)]
    enum InputEvent {
        Line(String),
        Interrupted,
        Closed,
    }

    enum Event {
        Session(SessionMessage),
        Input(Option<InputEvent>),
    }

    /// Whether the loop keeps going after a line
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum LoopControl {
        /// Read the next line
        Continue,
        /// Leave the session
        Exit,
    }

    /// Start the interactive session
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `image` - Image to select at startup
    pub async fn run_chat(config: Config, image: Option<PathBuf>) -> Result<()> {
        tracing::info!("Starting interactive session");

        let provider = create_provider(&config.provider)?;
        let mut session = DesktopSession::new(
            RequestBuilder::new(config.provider.ollama.model.clone()),
            SynchronousDelivery::new(provider),
            config.session.default_prompt.clone(),
        );
        if let Some(path) = image {
            select_image(&mut session, path);
        }

        print_welcome_banner(&session);

        let (input_tx, mut input_rx) = mpsc::channel(1);
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<()>();
        spawn_reader(input_tx, ready_rx);

        loop {
            let event = tokio::select! {
                Some(message) = session.next_message() => Event::Session(message),
                input = input_rx.recv() => Event::Input(input),
            };

            match event {
                Event::Session(message) => {
                    session.handle(message);
                    println!();
                    print_outcome(session.state());
                }
                Event::Input(Some(InputEvent::Line(line))) => {
                    if handle_line(&mut session, &line) == LoopControl::Exit {
                        break;
                    }
                    if ready_tx.send(()).is_err() {
                        break;
                    }
                }
                Event::Input(Some(InputEvent::Interrupted)) => {
                    println!("CTRL-C");
                    break;
                }
                Event::Input(Some(InputEvent::Closed)) | Event::Input(None) => {
                    println!("CTRL-D");
                    break;
                }
            }
        }

        if session.state().guard.is_running() {
            tracing::warn!("Leaving while an analysis is still running");
        }
        println!("Goodbye!");
        Ok(())
    }

    fn spawn_reader(tx: mpsc::Sender<InputEvent>, ready: std::sync::mpsc::Receiver<()>) {
        std::thread::spawn(move || {
            let mut rl = match DefaultEditor::new() {
                Ok(rl) => rl,
                Err(e) => {
                    tracing::error!("Failed to initialize readline: {}", e);
                    let _ = tx.blocking_send(InputEvent::Closed);
                    return;
                }
            };

            loop {
                let event = match rl.readline(PROMPT) {
                    Ok(line) => {
                        if !line.trim().is_empty() {
                            let _ = rl.add_history_entry(line.as_str());
                        }
                        InputEvent::Line(line)
                    }
                    Err(ReadlineError::Interrupted) => InputEvent::Interrupted,
                    Err(ReadlineError::Eof) => InputEvent::Closed,
                    Err(e) => {
                        tracing::error!("Readline error: {}", e);
                        InputEvent::Closed
                    }
                };

                let last = !matches!(event, InputEvent::Line(_));
                if tx.blocking_send(event).is_err() || last {
                    break;
                }
                // wait until the foreground has printed its output
                if ready.recv().is_err() {
                    break;
                }
            }
        });
    }

    const ALREADY_RUNNING: &str = "An analysis is already running.";

    /// Handle one line of user input
    pub fn handle_line(session: &mut DesktopSession, line: &str) -> LoopControl {
        let command = match parse_special_command(line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e.to_string().red());
                return LoopControl::Continue;
            }
        };

        match command {
            SpecialCommand::None => {
                let text = line.trim();
                if !text.is_empty() {
                    if session.set_prompt(text) {
                        println!("Prompt set.");
                    } else {
                        println!("{}", ALREADY_RUNNING.yellow());
                    }
                }
            }
            SpecialCommand::Analyze => match session.trigger() {
                Ok(TriggerOutcome::Started) => {
                    println!("{}", session.state().status.yellow());
                    println!("{}", session.state().response_text.dimmed());
                }
                Ok(TriggerOutcome::AlreadyRunning) => {
                    println!("{}", ALREADY_RUNNING.yellow());
                }
                Err(e) => eprintln!("{}", e.to_string().red()),
            },
            SpecialCommand::SelectImage(Some(path)) => select_image(session, path),
            SpecialCommand::SelectImage(None) => {
                if session.select_image(None) {
                    println!("{}", session.state().preview);
                } else {
                    println!("{}", ALREADY_RUNNING.yellow());
                }
            }
            SpecialCommand::ShowPrompt => println!("Prompt: {}", session.state().prompt),
            SpecialCommand::ListHistory => print_history(session.state()),
            SpecialCommand::ShowEntry(index) => match session.select_history(index) {
                Ok(entry) => {
                    println!("\n{} {}", "Prompt:".bold(), entry.prompt);
                    println!("\n{}\n", entry.response);
                }
                Err(e) => eprintln!("{}", e.to_string().red()),
            },
            SpecialCommand::ShowStatus => print_status(session),
            SpecialCommand::Help => print_help(),
            SpecialCommand::Exit => return LoopControl::Exit,
        }

        LoopControl::Continue
    }

    fn select_image(session: &mut DesktopSession, path: PathBuf) {
        if !is_supported_image(&path) {
            eprintln!(
                "{}",
                format!(
                    "Unsupported image type: {} (expected png, jpg, jpeg, bmp or gif)",
                    path.display()
                )
                .red()
            );
            return;
        }
        if session.select_image(Some(path)) {
            println!("{}", session.state().preview);
        } else {
            println!("{}", ALREADY_RUNNING.yellow());
        }
    }

    fn print_outcome(state: &DesktopState) {
        let status = match state.status.as_str() {
            STATUS_COMPLETE => state.status.green(),
            STATUS_ERROR => state.status.red(),
            _ => state.status.normal(),
        };
        println!("{}\n", status);
        println!("{}\n", state.response_text);
    }

    fn print_history(state: &DesktopState) {
        if state.history.is_empty() {
            println!("No analyses yet.");
            return;
        }
        for entry in state.history.iter() {
            let marker = if state.selected == Some(entry.index) {
                "*"
            } else {
                " "
            };
            println!("{} {:>3}  {}", marker, entry.index, entry.summary());
        }
    }

    fn print_welcome_banner(session: &DesktopSession) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║           VisionChat Interactive Session - Welcome!          ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Model:  {}", session.model().cyan());
        println!("Image:  {}", session.state().preview);
        println!("Prompt: {}", session.state().prompt);
        println!("\nType text to change the prompt, '/analyze' to run, '/help' for commands, 'exit' to quit\n");
    }

    fn print_status(session: &DesktopSession) {
        let state = session.state();
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║                    VisionChat Session Status                 ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Status:  {}", state.status);
        println!("Model:   {}", session.model().cyan());
        match &state.image_path {
            Some(path) => println!("Image:   {}", path.display()),
            None => println!("Image:   (none)"),
        }
        println!("Preview: {}", state.preview);
        println!("Prompt:  {}", state.prompt);
        println!("History: {} entries", state.history.len());
        println!();
    }

}
