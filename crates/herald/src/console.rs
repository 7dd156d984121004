//! Terminal stand-ins for the host's dialog windows.

use std::io::{BufRead, Write};

use async_trait::async_trait;
use log::{error, info};

use herald_core::surface::{AppControl, ChoiceOptions, DialogOutcome, DialogSurface};

pub struct ConsoleDialogs;

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

fn prompt_line(prompt: &str) -> Option<String> {
    let mut stdout = std::io::stdout().lock();
    let _ = write!(stdout, "{prompt}");
    let _ = stdout.flush();
    drop(stdout);

    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(line),
    }
}

fn ask_choice(message: &str, offer_suppression: bool) -> DialogOutcome {
    println!("{message}");
    let accepted = prompt_line("[y/N] ").is_some_and(|answer| is_yes(&answer));
    let suppress_requested = offer_suppression
        && prompt_line("Don't show this again? [y/N] ").is_some_and(|answer| is_yes(&answer));
    DialogOutcome {
        accepted,
        suppress_requested,
    }
}

#[async_trait]
impl DialogSurface for ConsoleDialogs {
    async fn present_choice(&self, message: &str, options: ChoiceOptions<'_>) -> DialogOutcome {
        let message = message.to_string();
        let offer_suppression = options.offer_suppression;
        tokio::task::spawn_blocking(move || ask_choice(&message, offer_suppression))
            .await
            .unwrap_or_else(|e| {
                error!("Dialog {} failed: {e}", options.identifier);
                DialogOutcome::default()
            })
    }

    async fn present_fatal(&self, message: &str) {
        let message = message.to_string();
        let acknowledged = tokio::task::spawn_blocking(move || {
            eprintln!("{message}");
            let _ = prompt_line("Press Enter to close. ");
        })
        .await;
        if let Err(e) = acknowledged {
            error!("Fatal dialog failed: {e}");
        }
    }
}

pub struct ProcessControl;

impl AppControl for ProcessControl {
    fn open_external(&self, url: &str) {
        if let Err(e) = open::that_detached(url) {
            error!("Failed to open {url}: {e}");
        }
    }

    fn terminate(&self) {
        info!("Terminating");
        log::logger().flush();
        std::process::exit(1);
    }
}
