use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use pharmavoice::config::VoiceConfig;
use pharmavoice::kernel::controller::ControllerConfig;
use pharmavoice::kernel::mode::InteractionMode;
use pharmavoice::runtime::{DriverParts, VoiceDriver, VoiceHandle, VoiceHooks};
use pharmavoice::services::backend::HttpVoiceBackend;
use pharmavoice::speech::console::{CommandSynthesizer, LineRecognizer};

/// Prints hand-offs where the host application would start an analysis.
struct ConsoleHooks;

impl VoiceHooks for ConsoleHooks {
    fn on_mode_change(&self, _from: InteractionMode, to: InteractionMode) {
        println!("[{}]", to);
    }

    fn on_ready_for_planning(&self, prompt: &str) {
        println!("[PLAN] {}", prompt);
    }

    fn on_error(&self, message: &str) {
        eprintln!("[ERROR] {}", message);
    }
}

const HELP: &str = "Speak by typing a line. Commands: /stop /yes /no /toggle /reset /session <id> /status /quit";

/// Returns false when the console should exit.
fn handle_command(handle: &VoiceHandle, line: &str) -> anyhow::Result<bool> {
    let mut parts = line.splitn(2, ' ');
    let cmd = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).filter(|s| !s.is_empty());

    match cmd {
        "/quit" | "/exit" => return Ok(false),
        "/stop" => handle.stop_speaking()?,
        "/yes" => handle.confirm_prompt(true)?,
        "/no" => handle.confirm_prompt(false)?,
        "/toggle" => handle.toggle()?,
        "/reset" => handle.reset()?,
        "/session" => handle.set_session(arg.map(str::to_string))?,
        "/status" => println!("{}", serde_json::to_string_pretty(&handle.status())?),
        _ => println!("{}", HELP),
    }
    Ok(true)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Setup Logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")?;

    // 2. Config + backend
    let config = VoiceConfig::load().context("loading configuration")?;
    tracing::info!("Starting pharmavoice console: {:?}", config);
    let backend = HttpVoiceBackend::new(&config).context("building backend client")?;

    // 3. Engines
    let (line_tx, line_rx) = mpsc::unbounded_channel();
    let recognizer = LineRecognizer::new(line_rx, Duration::from_millis(config.silence_timeout_ms));
    let synthesizer = CommandSynthesizer::new(config.tts_command.clone());

    let parts = DriverParts {
        recognizer: Box::new(recognizer),
        synthesizer: Box::new(synthesizer),
        backend: Arc::new(backend),
        hooks: Arc::new(ConsoleHooks),
        speech: config.speech_settings(),
        controller: ControllerConfig { delays: config.restart_delays() },
        session_id: std::env::var("PHARMAVOICE_SESSION").ok().filter(|s| !s.is_empty()),
    };
    let (driver, handle) = VoiceDriver::new(parts);
    let driver_task = tokio::spawn(driver.run());

    // 4. Echo what the assistant says
    let mut status = handle.subscribe();
    tokio::spawn(async move {
        let mut last = String::new();
        while status.changed().await.is_ok() {
            let response = status.borrow_and_update().last_response.clone();
            if !response.is_empty() && response != last {
                println!("assistant> {}", response);
                last = response;
            }
        }
    });

    handle.activate()?;
    println!("{}", HELP);

    // 5. Console input
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
            line = lines.next_line() => match line? {
                Some(line) => line,
                None => break,
            },
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line.starts_with('/') {
            if !handle_command(&handle, line)? {
                break;
            }
            continue;
        }
        if line_tx.send(line.to_string()).is_err() {
            break;
        }
    }

    handle.shutdown();
    let summary = driver_task.await.context("voice driver panicked")?;
    tracing::info!(
        "Session summary: {} dispatches, {} barge-ins, {} restarts",
        summary.dispatch_stats.process_calls,
        summary.interruption_stats.barge_ins,
        summary.recovery_stats.restarts_scheduled
    );
    Ok(())
}
