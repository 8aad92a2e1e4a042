//! Interactive prompts.

use anyhow::{Context, Result};
use awsmgr_cloud::regions::{OptInPrompt, OptInStatus};
use converge::ForceContinue;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, MultiSelect, Password, Select};
use indicatif::ProgressBar;

use crate::ui;

/// Line that ends multi-line input.
pub const END_MARKER: &str = "END";

/// Pick one of `items`, preselecting `default`.
pub fn select<T: std::fmt::Display>(prompt: &str, items: &[T], default: usize) -> Result<usize> {
    Select::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(items)
        .default(default.min(items.len().saturating_sub(1)))
        .interact()
        .context("selection aborted")
}

/// Pick any number of `items`; all are preselected.
pub fn multi_select<T: std::fmt::Display>(prompt: &str, items: &[T]) -> Result<Vec<usize>> {
    let defaults = vec![true; items.len()];
    MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .items(items)
        .defaults(&defaults)
        .interact()
        .context("selection aborted")
}

/// Yes/no question.
pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default)
        .interact()
        .context("confirmation aborted")
}

/// Free text with a default.
pub fn text(prompt: &str, default: &str) -> Result<String> {
    let value: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default.to_string())
        .allow_empty(true)
        .interact_text()
        .context("input aborted")?;
    Ok(value.trim().to_string())
}

/// Optional free text; empty means `None`.
pub fn optional_text(prompt: &str) -> Result<Option<String>> {
    let value = text(prompt, "")?;
    Ok(Some(value).filter(|v| !v.is_empty()))
}

/// A number, falling back to `default` on empty input.
pub fn number<T>(prompt: &str, default: T) -> Result<T>
where
    T: Clone + ToString + std::str::FromStr,
    <T as std::str::FromStr>::Err: ToString,
{
    Input::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default)
        .interact_text()
        .context("input aborted")
}

/// Hidden input.
pub fn secret(prompt: &str) -> Result<String> {
    Password::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .interact()
        .context("input aborted")
}

/// Collect lines until [`END_MARKER`]. An empty first line skips.
pub fn multiline(title: &str) -> Result<Option<String>> {
    ui::print_info(title);
    ui::print_info(&format!(
        "Press Enter to skip; otherwise type the script and finish with a line containing {END_MARKER}"
    ));
    let mut lines = Vec::new();
    loop {
        let line: String = Input::with_theme(&ColorfulTheme::default())
            .with_prompt(">")
            .allow_empty(true)
            .interact_text()
            .context("input aborted")?;
        if let Some(done) = collect_line(&mut lines, line) {
            return Ok(done);
        }
    }
}

/// Feed one line; returns the result once input is complete.
fn collect_line(lines: &mut Vec<String>, line: String) -> Option<Option<String>> {
    if line.is_empty() && lines.is_empty() {
        return Some(None);
    }
    if line.trim() == END_MARKER {
        return Some(Some(lines.join("\n")).filter(|s| !s.trim().is_empty()));
    }
    lines.push(line);
    None
}

/// Region opt-in questions asked on the terminal.
///
/// A running spinner is hidden while a question is on screen.
#[derive(Default)]
pub struct TerminalOptIn {
    spinner: Option<ProgressBar>,
}

impl TerminalOptIn {
    pub fn with_spinner(bar: &ProgressBar) -> Self {
        Self {
            spinner: Some(bar.clone()),
        }
    }

    fn ask(&self, question: impl FnOnce() -> bool) -> bool {
        match &self.spinner {
            Some(bar) => bar.suspend(question),
            None => question(),
        }
    }
}

impl OptInPrompt for TerminalOptIn {
    fn confirm_enable(&self, region: &str, status: &OptInStatus) -> bool {
        self.ask(|| {
            ui::print_warning(&format!("Region {region} is {status}"));
            confirm("Request opt-in for this region now?", false).unwrap_or(false)
        })
    }

    fn force_continue(&self, region: &str) -> bool {
        self.ask(|| {
            ui::print_warning(&format!("Region {region} did not report opted-in in time"));
            confirm(
                "Continue anyway? Launching may fail",
                ForceContinue::BestEffort.prompt_default(),
            )
            .unwrap_or(false)
        })
    }
}
