//! Terminal front end: prints session state and walks the user through
//! confirming extracted items.

use std::error::Error;
use std::io::Read;
use std::path::Path;

use chrono_tz::Tz;
use console::{Style, style};
use dialoguer::{Confirm, Select};

use gleaner::assistant::Assistant;
use gleaner::core::analysis::ItemKind;
use gleaner::core::category::{CategoryColor, CategoryInfo, EventCategory, TaskCategory};
use gleaner::core::destination::Destination;
use gleaner::core::event::ExtractedEvent;
use gleaner::core::task::ExtractedTask;
use gleaner::error::AppError;
use gleaner::fl;
use gleaner::message::Message;
use gleaner::session::{Screen, Session};

type CliResult = Result<(), Box<dyn Error>>;

fn color_style(color: CategoryColor) -> Style {
    let style = Style::new().bold();
    match color {
        CategoryColor::Blue => style.blue(),
        CategoryColor::Green => style.green(),
        CategoryColor::Red => style.red(),
        CategoryColor::Purple => style.magenta(),
        CategoryColor::Orange => style.color256(208),
        CategoryColor::Pink => style.color256(205),
        CategoryColor::Indigo => style.color256(61),
        CategoryColor::Gray => style.dim(),
    }
}

fn badge(info: &CategoryInfo) -> String {
    color_style(info.color).apply_to(format!("[{}]", info.label)).to_string()
}

pub fn print_error(error: &AppError) {
    eprintln!("{} {}", style("✗").red().bold(), error.localized());
}

/// Text from `file`, or all of stdin.
pub fn read_text(file: Option<&Path>) -> std::io::Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path),
        None => {
            if console::user_attended() {
                eprintln!("{}", style(fl!("prompt-idle")).dim());
            }
            let mut text = String::new();
            std::io::stdin().read_to_string(&mut text)?;
            Ok(text)
        }
    }
}

/// Resolve the auth handshake. A configuration problem ends the run.
pub async fn initialize(assistant: &mut Assistant) -> Result<(), AppError> {
    if assistant.context().is_demo() {
        eprintln!("{}", style(fl!("demo-mode")).yellow());
    }
    eprintln!("{}", style(fl!("loading")).dim());
    assistant.dispatch(Message::Initialize).await;

    let session = assistant.session();
    match session.screen() {
        Screen::ConfigError(detail) => Err(AppError::Configuration(detail)),
        Screen::Workspace => {
            if let Some(profile) = session.profile() {
                eprintln!(
                    "{}",
                    style(fl!("signed-in-as", name = profile.name.as_str())).green()
                );
            }
            report_error(session);
            Ok(())
        }
        _ => Ok(()),
    }
}

fn report_error(session: &Session) {
    if let Some(error) = session.error() {
        print_error(error);
    }
}

fn destination_name<D: Destination>(destinations: &[D], id: &str) -> String {
    destinations
        .iter()
        .find(|d| d.id() == id)
        .map(|d| d.display_name().to_string())
        .unwrap_or_else(|| id.to_string())
}

fn print_event(session: &Session, event: &ExtractedEvent, tz: Tz) {
    println!("  {} {}", style(&event.title).bold(), badge(&event.category.info()));
    println!("    {}: {}", fl!("field-start"), event.format_start(tz));
    println!("    {}: {}", fl!("field-end"), event.format_end(tz));
    if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
        println!("    {}: {}", fl!("field-location"), location);
    }
    if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
        println!("    {}", style(description).dim());
    }
    if let Some(id) = session.suggested_calendar(&event.id) {
        let name = destination_name(&*session.calendars(), &id);
        println!("    {}", style(fl!("suggested-destination", name = name.as_str())).cyan());
    }
}

fn print_task(session: &Session, task: &ExtractedTask) {
    println!("  {} {}", style(&task.title).bold(), badge(&task.category.info()));
    println!("    {}: {}", fl!("field-due"), task.format_due());
    if let Some(id) = session.suggested_task_list(&task.id) {
        let name = destination_name(&*session.task_lists(), &id);
        println!("    {}", style(fl!("suggested-destination", name = name.as_str())).cyan());
    }
}

pub fn print_analysis(session: &Session, tz: Tz) {
    let Some(analysis) = session.analysis() else {
        return;
    };
    if analysis.is_empty() {
        println!("{}", fl!("results-empty"));
        return;
    }
    if !analysis.events.is_empty() {
        println!("{}", style(fl!("results-events")).white().bold());
        for event in &analysis.events {
            print_event(session, event, tz);
            println!();
        }
    }
    if !analysis.tasks.is_empty() {
        println!("{}", style(fl!("results-tasks")).white().bold());
        for task in &analysis.tasks {
            print_task(session, task);
            println!();
        }
    }
}

/// Run one analysis and report failures.
pub async fn analyze(assistant: &mut Assistant, text: String) -> Result<(), AppError> {
    assistant.dispatch(Message::Analyze(text)).await;
    let session = assistant.session();
    if session.analysis().is_none() {
        if let Some(error) = session.error() {
            return Err(error.clone());
        }
    }
    print_analysis(session, assistant.context().time_zone);
    Ok(())
}

pub async fn sign_in(assistant: &mut Assistant) -> CliResult {
    assistant.dispatch(Message::SignIn).await;
    let session = assistant.session();
    match session.profile() {
        Some(profile) => {
            println!("{}", style(fl!("signed-in-as", name = profile.name.as_str())).green());
            report_error(session);
        }
        None => report_error(session),
    }
    Ok(())
}

pub async fn sign_out(assistant: &mut Assistant) -> CliResult {
    assistant.dispatch(Message::SignOut).await;
    println!("{}", fl!("signed-out"));
    Ok(())
}

pub fn print_lists(session: &Session) {
    println!("{}", style(fl!("lists-calendars")).white().bold());
    for calendar in session.calendars().iter() {
        println!("  {}  {}", calendar.summary, style(&calendar.id).dim());
    }
    println!("{}", style(fl!("lists-task-lists")).white().bold());
    for list in session.task_lists().iter() {
        println!("  {}  {}", list.title, style(&list.id).dim());
    }
}

/// Offer sign-in when the session settled signed out. Returns whether the user
/// ends up signed in.
async fn ensure_signed_in(assistant: &mut Assistant) -> Result<bool, Box<dyn Error>> {
    if assistant.session().screen() == Screen::Workspace {
        return Ok(true);
    }
    println!("{}", style(fl!("welcome-title")).white().bold());
    println!("{}", fl!("welcome-body"));
    let accepted = Confirm::new()
        .with_prompt(fl!("action-sign-in"))
        .default(true)
        .interact()?;
    if accepted {
        sign_in(assistant).await?;
    }
    Ok(assistant.session().screen() == Screen::Workspace)
}

enum ItemChoice {
    Add,
    Skip,
    ChangeCategory,
}

fn choose_action() -> Result<ItemChoice, Box<dyn Error>> {
    let items = [fl!("action-add"), fl!("action-skip"), fl!("action-change-category")];
    let choice = Select::new()
        .with_prompt(fl!("prompt-item"))
        .items(&items)
        .default(0)
        .interact()?;
    Ok(match choice {
        0 => ItemChoice::Add,
        1 => ItemChoice::Skip,
        _ => ItemChoice::ChangeCategory,
    })
}

fn choose_destination<D: Destination>(destinations: &[D], suggested: Option<&str>) -> Result<Option<String>, Box<dyn Error>> {
    if destinations.is_empty() {
        return Ok(None);
    }
    let names: Vec<&str> = destinations.iter().map(|d| d.display_name()).collect();
    let default = suggested
        .and_then(|id| destinations.iter().position(|d| d.id() == id))
        .unwrap_or(0);
    let index = Select::new()
        .with_prompt(fl!("prompt-destination"))
        .items(&names)
        .default(default)
        .interact()?;
    Ok(destinations.get(index).map(|d| d.id().to_string()))
}

async fn review_event(assistant: &mut Assistant, id: &str, tz: Tz) -> CliResult {
    loop {
        let session = assistant.session();
        let Some(event) = session.analysis().and_then(|a| a.event(id).cloned()) else {
            return Ok(());
        };
        print_event(session, &event, tz);

        match choose_action()? {
            ItemChoice::Skip => return Ok(()),
            ItemChoice::ChangeCategory => {
                let labels: Vec<String> = EventCategory::ALL.iter().map(|c| c.info().label).collect();
                let current = EventCategory::ALL.iter().position(|c| *c == event.category).unwrap_or(0);
                let index = Select::new()
                    .with_prompt(fl!("prompt-category"))
                    .items(&labels)
                    .default(current)
                    .interact()?;
                let category = EventCategory::ALL.get(index).copied().unwrap_or_default();
                assistant
                    .dispatch(Message::ChangeEventCategory {
                        item_id: id.to_string(),
                        category,
                    })
                    .await;
            }
            ItemChoice::Add => {
                let suggested = session.suggested_calendar(id);
                let destination_id = choose_destination(&*session.calendars(), suggested.as_deref())?;
                assistant
                    .dispatch(Message::Confirm {
                        kind: ItemKind::Event,
                        item_id: id.to_string(),
                        destination_id,
                    })
                    .await;
                return Ok(());
            }
        }
    }
}

async fn review_task(assistant: &mut Assistant, id: &str) -> CliResult {
    loop {
        let session = assistant.session();
        let Some(task) = session.analysis().and_then(|a| a.task(id).cloned()) else {
            return Ok(());
        };
        print_task(session, &task);

        match choose_action()? {
            ItemChoice::Skip => return Ok(()),
            ItemChoice::ChangeCategory => {
                let labels: Vec<String> = TaskCategory::ALL.iter().map(|c| c.info().label).collect();
                let current = TaskCategory::ALL.iter().position(|c| *c == task.category).unwrap_or(0);
                let index = Select::new()
                    .with_prompt(fl!("prompt-category"))
                    .items(&labels)
                    .default(current)
                    .interact()?;
                let category = TaskCategory::ALL.get(index).copied().unwrap_or_default();
                assistant
                    .dispatch(Message::ChangeTaskCategory {
                        item_id: id.to_string(),
                        category,
                    })
                    .await;
            }
            ItemChoice::Add => {
                let suggested = session.suggested_task_list(id);
                let destination_id = choose_destination(&*session.task_lists(), suggested.as_deref())?;
                assistant
                    .dispatch(Message::Confirm {
                        kind: ItemKind::Task,
                        item_id: id.to_string(),
                        destination_id,
                    })
                    .await;
                report_error(assistant.session());
                return Ok(());
            }
        }
    }
}

/// Confirm every item to its suggested destination in one batch.
async fn confirm_all(assistant: &mut Assistant) {
    let session = assistant.session();
    let Some(analysis) = session.analysis() else {
        return;
    };
    let mut messages: Vec<Message> = analysis
        .events
        .iter()
        .map(|event| Message::Confirm {
            kind: ItemKind::Event,
            item_id: event.id.clone(),
            destination_id: session.suggested_calendar(&event.id),
        })
        .collect();
    messages.extend(analysis.tasks.iter().map(|task| Message::Confirm {
        kind: ItemKind::Task,
        item_id: task.id.clone(),
        destination_id: session.suggested_task_list(&task.id),
    }));
    assistant.dispatch_all(messages).await;
}

fn failed_items(session: &Session) -> Vec<(String, String)> {
    let Some(analysis) = session.analysis() else {
        return Vec::new();
    };
    analysis
        .events
        .iter()
        .map(|e| (e.id.clone(), e.title.clone()))
        .chain(analysis.tasks.iter().map(|t| (t.id.clone(), t.title.clone())))
        .filter(|(id, _)| session.has_failed(id))
        .collect()
}

fn print_outcome(session: &Session) {
    let Some(analysis) = session.analysis() else {
        return;
    };
    let items = analysis
        .events
        .iter()
        .map(|e| (e.id.as_str(), e.title.as_str()))
        .chain(analysis.tasks.iter().map(|t| (t.id.as_str(), t.title.as_str())));
    for (id, title) in items.filter(|(id, _)| session.is_confirmed(id)) {
        if session.has_failed(id) {
            println!("  {} {} ({})", style("✗").red().bold(), title, fl!("item-failed"));
        } else {
            println!("  {} {} ({})", style("✓").green().bold(), title, fl!("item-added"));
        }
    }
}

/// Full interactive session: sign in, analyze, confirm, retry failures.
pub async fn run(assistant: &mut Assistant, text: String, all: bool) -> CliResult {
    if !ensure_signed_in(assistant).await? {
        return Ok(());
    }

    analyze(assistant, text).await?;
    let Some(analysis) = assistant.session().analysis() else {
        return Ok(());
    };
    if analysis.is_empty() {
        return Ok(());
    }

    let tz = assistant.context().time_zone;
    if all {
        confirm_all(assistant).await;
        report_error(assistant.session());
    } else {
        for event in &analysis.events {
            review_event(assistant, &event.id, tz).await?;
        }
        for task in &analysis.tasks {
            review_task(assistant, &task.id).await?;
        }
    }

    for (id, title) in failed_items(assistant.session()) {
        let retry = Confirm::new()
            .with_prompt(fl!("action-retry", title = title.as_str()))
            .default(true)
            .interact()?;
        if retry {
            assistant.dispatch(Message::RetryConfirm(id)).await;
        }
    }

    print_outcome(assistant.session());
    let session = assistant.session();
    let added = session.confirmed_count().saturating_sub(failed_items(session).len());
    println!("{}", fl!("summary-confirmed", count = added));
    Ok(())
}
