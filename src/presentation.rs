use anyhow::Result;
use dialoguer::{Input, Select};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::handlers::Orchestrator;
use crate::models::{AnalysisResult, AttemptPhase, AttemptStatus, CalorieLevel, ErrorState, ViewState};
use crate::services::image::validate_upload;

fn level_marker(level: CalorieLevel) -> &'static str {
    match level {
        CalorieLevel::Low => "🟢",
        CalorieLevel::Moderate => "🟡",
        CalorieLevel::High => "🔴",
        CalorieLevel::Unknown => "⚪",
    }
}

fn render_result(out: &mut String, result: &AnalysisResult) {
    let _ = writeln!(out, "📋 Analysis result");
    let _ = writeln!(out, "   🍽️ Dish:     {}", result.name);
    let _ = writeln!(
        out,
        "   🔥 Calories: {} {}",
        level_marker(result.calorie_level()),
        result.calories
    );
    let _ = writeln!(out, "   🕐 Analyzed: {}", result.timestamp);
    let _ = writeln!(out, "   🖼️ Photo:    {}", result.preview.display());
}

fn render_error(out: &mut String, error: &ErrorState) {
    let _ = writeln!(out, "❌ {}: {}", error.kind, error.message);
    if error.is_retriable() {
        let _ = writeln!(out, "   🔁 Choose \"Retry\" to try again.");
    }
}

fn render_history(out: &mut String, history: &[AnalysisResult]) {
    if history.is_empty() {
        return;
    }

    let _ = writeln!(out, "🕘 History ({})", history.len());
    for (i, entry) in history.iter().enumerate() {
        let _ = writeln!(
            out,
            "   {}. {} - {} ({})",
            i + 1,
            entry.name,
            entry.calories,
            entry.timestamp
        );
    }
}

/// Draws one frame of the session. Pure: everything comes from `view`.
pub fn render(view: &ViewState) -> String {
    let mut out = String::new();

    if let Some(preview) = &view.preview {
        let _ = writeln!(out, "🖼️ {}", preview.display());
    }

    if view.is_loading() {
        let _ = writeln!(out, "⏳ Analyzing (the model can take a while to wake up)...");
    }

    if let Some(error) = &view.error {
        render_error(&mut out, error);
    }

    if let Some(result) = &view.active {
        render_result(&mut out, result);
    }

    render_history(&mut out, &view.history);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Analyze,
    Retry,
    ShowHistory,
    ClearHistory,
    Quit,
}

impl MenuAction {
    fn label(self) -> &'static str {
        match self {
            MenuAction::Analyze => "📁 Analyze a photo",
            MenuAction::Retry => "🔁 Retry",
            MenuAction::ShowHistory => "🕘 Show a past result",
            MenuAction::ClearHistory => "🗑️ Clear history",
            MenuAction::Quit => "🚪 Quit",
        }
    }
}

pub fn menu_actions(view: &ViewState, can_retry: bool) -> Vec<MenuAction> {
    let mut actions = vec![MenuAction::Analyze];
    if can_retry {
        actions.push(MenuAction::Retry);
    }
    if !view.history.is_empty() {
        actions.push(MenuAction::ShowHistory);
        actions.push(MenuAction::ClearHistory);
    }
    actions.push(MenuAction::Quit);
    actions
}

fn progress_spinner(image: &Path) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner} {msg} [{elapsed}]")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    spinner.set_message(format!("Analyzing {}", image.display()));
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}

/// Validates the picked file and, if it is acceptable, runs one attempt.
/// Returns `None` when the file was rejected and nothing was sent.
pub async fn upload(
    orchestrator: &mut Orchestrator,
    image: PathBuf,
    max_upload_bytes: u64,
) -> Option<AttemptStatus> {
    if let Err(e) = validate_upload(&image, max_upload_bytes) {
        log::warn!("⚠️ Upload rejected: {}", e);
        println!("❌ {}", e);
        return None;
    }

    let spinner = progress_spinner(&image);
    let status = orchestrator.analyze(image).await;
    spinner.finish_and_clear();
    Some(status)
}

async fn retry(orchestrator: &mut Orchestrator) -> Option<AttemptStatus> {
    let image = orchestrator.last_upload()?.to_path_buf();
    let spinner = progress_spinner(&image);
    let status = orchestrator.retry().await;
    spinner.finish_and_clear();
    status
}

/// One line per file for `analyze --json`.
#[derive(Debug, Serialize)]
pub struct AnalysisReport {
    pub file: PathBuf,
    pub status: Option<AttemptStatus>,
    pub result: Option<AnalysisResult>,
    pub error: Option<String>,
}

impl AnalysisReport {
    pub fn rejected(file: PathBuf, reason: String) -> Self {
        Self {
            file,
            status: None,
            result: None,
            error: Some(reason),
        }
    }

    pub fn from_view(file: PathBuf, status: AttemptStatus, view: &ViewState) -> Self {
        Self {
            file,
            status: Some(status),
            result: view.active.clone(),
            error: view.error.as_ref().map(|e| e.message.clone()),
        }
    }
}

/// Interactive terminal session: upload, retry, browse and clear history.
pub async fn run_session(orchestrator: &mut Orchestrator, max_upload_bytes: u64) -> Result<()> {
    println!("🍲 Dish recognizer (VQA)");
    println!("   Supported formats: JPG, PNG, WebP, GIF, BMP. Max size: {} MB\n", max_upload_bytes / (1024 * 1024));

    loop {
        let view = orchestrator.view();
        let frame = render(&view);
        if !frame.is_empty() {
            println!("\n{}", frame);
        }

        let actions = menu_actions(&view, orchestrator.can_retry());
        let labels: Vec<&str> = actions.iter().map(|a| a.label()).collect();
        let choice = Select::new()
            .with_prompt("What next?")
            .items(&labels)
            .default(0)
            .interact()?;

        match actions[choice] {
            MenuAction::Analyze => {
                let path: String = Input::new()
                    .with_prompt("Photo path")
                    .interact_text()?;
                upload(orchestrator, PathBuf::from(path.trim()), max_upload_bytes).await;
            }
            MenuAction::Retry => {
                retry(orchestrator).await;
            }
            MenuAction::ShowHistory => {
                let entries: Vec<String> = view
                    .history
                    .iter()
                    .map(|e| format!("{} - {} ({})", e.name, e.calories, e.timestamp))
                    .collect();
                let index = Select::new()
                    .with_prompt("Past results")
                    .items(&entries)
                    .default(0)
                    .interact()?;
                orchestrator.select_history(index);
            }
            MenuAction::ClearHistory => orchestrator.clear_history(),
            MenuAction::Quit => break,
        }
    }

    Ok(())
}
