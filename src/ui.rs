use buildkit::reconcile::update_label;
use buildkit::{CredentialSource, ItemKind, Reporter, Transition};
use colored::Colorize;

/// Print an info message
pub fn info(msg: &str) {
    println!("{} {}", "ℹ".blue(), msg);
}

/// Print a success message
pub fn success(msg: &str) {
    println!("{} {}", "✓".green(), msg);
}

/// Print a warning message
pub fn warn(msg: &str) {
    println!("{} {}", "⚠".yellow(), msg);
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}

/// Print a section header
pub fn section(title: &str) {
    println!();
    println!("{}", title.cyan().bold());
}

fn transition_label(transition: &Transition) -> String {
    match transition {
        Transition::Download => "Downloading".to_string(),
        Transition::InstallAndActivate => "Installing".to_string(),
        Transition::Activate => "Activating".to_string(),
        Transition::Update { from, to } => {
            format!("{} ({} -> {})", update_label(from, to), from, to)
        }
        Transition::Noop => "Skipping".to_string(),
    }
}

/// Reporter that renders run progress as status lines.
pub struct ConsoleReporter {
    quiet: bool,
}

impl ConsoleReporter {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl Reporter for ConsoleReporter {
    fn action_finished(
        &self,
        kind: ItemKind,
        slug: &str,
        transition: &Transition,
        error_message: Option<&str>,
    ) {
        let line = format!("{} {}: {}", kind, slug, transition_label(transition));
        match error_message {
            None => {
                if !self.quiet {
                    success(&format!("{}: done", line));
                }
            }
            Some(message) => error(&format!("{}: {}", line, message)),
        }
    }

    fn item_excluded(&self, kind: ItemKind, slug: &str) {
        if !self.quiet {
            println!("  {}", format!("{} {}: not in registry, skipped", kind, slug).dimmed());
        }
    }

    fn item_unresolved(&self, kind: ItemKind, slug: &str, message: &str) {
        warn(&format!("{} {}: registry lookup failed: {}", kind, slug, message));
    }

    fn core_phase_started(&self, phase: &str, detail: &str) {
        if !self.quiet {
            info(&format!("core {}: {}", phase, detail));
        }
    }

    fn core_phase_finished(&self, phase: &str, error_message: Option<&str>) {
        match error_message {
            None => {
                if !self.quiet {
                    success(&format!("core {}: done", phase));
                }
            }
            Some(message) => error(&format!("core {}: {}", phase, message)),
        }
    }

    fn note(&self, message: &str) {
        if !self.quiet {
            warn(message);
        }
    }
}

/// Interactive credential source backed by terminal prompts.
///
/// Password-like fields are read without echo; everything else gets a plain
/// input. Empty answers are allowed here, the engine re-asks.
pub struct PromptCredentials;

impl CredentialSource for PromptCredentials {
    fn ask(&self, field: &str, prompt: &str) -> buildkit::Result<String> {
        let answer = if field.contains("pass") {
            dialoguer::Password::new()
                .with_prompt(prompt)
                .allow_empty_password(true)
                .interact()
        } else {
            dialoguer::Input::new()
                .with_prompt(prompt)
                .allow_empty(true)
                .interact_text()
        };
        answer.map_err(|e| buildkit::Error::Prompt(e.to_string()))
    }
}

/// Credential source for `--yes` runs: a missing value is an error, never a
/// hang waiting on stdin.
pub struct NoPrompt;

impl CredentialSource for NoPrompt {
    fn ask(&self, field: &str, _prompt: &str) -> buildkit::Result<String> {
        Err(buildkit::Error::Prompt(format!(
            "'{}' is required but not set and prompting is disabled",
            field
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_labels() {
        assert_eq!(transition_label(&Transition::Download), "Downloading");
        assert_eq!(
            transition_label(&Transition::Update {
                from: "2.0.0".to_string(),
                to: "1.0.0".to_string()
            }),
            "Downgrading (2.0.0 -> 1.0.0)"
        );
    }

    #[test]
    fn test_no_prompt_refuses() {
        assert!(NoPrompt.ask("dbname", "Database name").is_err());
    }
}
