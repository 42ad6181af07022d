//! Interactive chat and one-shot ask command handlers.

use anyhow::{Context, Result};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use tokio::task::JoinHandle;

use shopchat::cache::KvStore;
use shopchat::catalog::CatalogItem;
use shopchat::chat::{ChatAssistant, ChatState, RejectReason, SubmitOutcome, COMPOSING_LABEL};
use shopchat::config::Config;
use shopchat::session::ChatMessage;

use super::common::create_assistant;

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ReplCommand {
    Exit,
    ListQuick,
    /// 1-based quick-question number as typed.
    Quick(usize),
    Say(String),
    Empty,
}

/// Commands are recognized on the trimmed line; free text is kept as typed.
pub(crate) fn parse_command(line: &str) -> ReplCommand {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return ReplCommand::Empty;
    }
    match trimmed {
        "/exit" | "/quit" => return ReplCommand::Exit,
        "/quick" => return ReplCommand::ListQuick,
        _ => {}
    }
    if let Some(rest) = trimmed.strip_prefix("/q ") {
        if let Ok(n) = rest.trim().parse::<usize>() {
            return ReplCommand::Quick(n);
        }
    }
    ReplCommand::Say(line.to_string())
}

pub(crate) fn format_product(item: &CatalogItem) -> String {
    format!("  - {} ({})  {}", item.name, item.display_price(), item.url)
}

/// Render a bot message with its product cards.
pub(crate) fn format_reply(message: &ChatMessage) -> String {
    let mut out = format!("bot> {}", message.text);
    if let Some(products) = &message.products {
        out.push_str("\n\nProductos relacionados:");
        for item in products {
            out.push('\n');
            out.push_str(&format_product(item));
        }
    }
    out
}

fn print_quick_questions<S: KvStore>(assistant: &ChatAssistant<S>) {
    println!("Preguntas rápidas:");
    for (i, q) in assistant.quick_questions().iter().enumerate() {
        println!("  {}. {}", i + 1, q);
    }
}

fn print_outcome(outcome: &SubmitOutcome) {
    match outcome {
        SubmitOutcome::Rejected(RejectReason::Busy) => {
            println!("(still waiting on the previous reply)")
        }
        SubmitOutcome::Rejected(RejectReason::UnknownQuickQuestion(n)) => {
            println!("No quick question #{}. Type /quick to list them.", n + 1)
        }
        SubmitOutcome::Rejected(RejectReason::Empty) => {}
        _ => {
            if let Some(reply) = outcome.reply() {
                println!("{}\n", format_reply(reply));
            }
        }
    }
}

/// Print the composing label each time the assistant starts waiting on the provider.
fn spawn_composing_indicator<S: KvStore>(assistant: &ChatAssistant<S>) -> JoinHandle<()> {
    let mut rx = assistant.subscribe();
    tokio::spawn(async move {
        while rx.changed().await.is_ok() {
            if *rx.borrow_and_update() == ChatState::Awaiting {
                println!("{}", COMPOSING_LABEL);
            }
        }
    })
}

/// Interactive session until `/exit` or EOF.
pub(crate) async fn cmd_chat(config: Config) -> Result<()> {
    let assistant = create_assistant(&config)?;
    let mut rl = DefaultEditor::new().with_context(|| "Failed to initialize line editor")?;
    let indicator = spawn_composing_indicator(&assistant);

    println!(
        "shopchat ({}) - type /quick for suggested questions, /exit to leave.",
        assistant.provider_name()
    );
    print_quick_questions(&assistant);
    println!();

    loop {
        let line = match rl.readline("you> ") {
            Ok(line) => line,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => return Err(e).with_context(|| "Failed to read input"),
        };

        let outcome = match parse_command(&line) {
            ReplCommand::Empty => continue,
            ReplCommand::Exit => break,
            ReplCommand::ListQuick => {
                print_quick_questions(&assistant);
                continue;
            }
            ReplCommand::Quick(0) => SubmitOutcome::Rejected(RejectReason::UnknownQuickQuestion(0)),
            ReplCommand::Quick(n) => assistant.submit_quick_question(n - 1).await,
            ReplCommand::Say(text) => {
                let _ = rl.add_history_entry(text.as_str());
                assistant.submit(&text).await
            }
        };
        print_outcome(&outcome);
    }

    indicator.abort();
    let stats = assistant.cache_stats();
    tracing::debug!(
        hits = stats.hits,
        misses = stats.misses,
        "Chat session ended"
    );
    Ok(())
}

/// Ask one question and print the reply. Fails when the provider call fails.
pub(crate) async fn cmd_ask(config: Config, text: &str) -> Result<()> {
    let assistant = create_assistant(&config)?;
    match assistant.submit(text).await {
        SubmitOutcome::Rejected(_) => anyhow::bail!("Nothing to ask: the question is empty"),
        SubmitOutcome::Failed { message, error } => {
            println!("{}", format_reply(&message));
            Err(error).with_context(|| "Provider request failed")
        }
        SubmitOutcome::Cached(message) | SubmitOutcome::Answered(message) => {
            println!("{}", format_reply(&message));
            Ok(())
        }
    }
}
