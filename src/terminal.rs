//! Interactive terminal surface, for kiosks without a browser front end.
//!
//! Runs the same gateway facade as the HTTP server, so caching, fallback,
//! and session behavior are identical across surfaces.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use uuid::Uuid;

use kiosk_core::{ChatRequest, Error, ModelId};
use kiosk_gateway::{InMemorySessionStore, LruResponseCache, ModelGateway};

const HELP: &str = "\
Commands:
  help           show this help
  models         list configured models
  model <id>     pin this session to a model (provider:model), 'model default' to unpin
  lang <code>    set the reply language hint (e.g. en, es)
  stats          show session and cache stats
  clear          start a fresh session
  exit           quit

Anything else is sent to the assistant.";

pub async fn run(
    gateway: Arc<ModelGateway>,
    sessions: Arc<InMemorySessionStore>,
    cache: Option<Arc<LruResponseCache>>,
) -> anyhow::Result<()> {
    let mut session_id = Uuid::new_v4().to_string();
    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Kiosk terminal. Type 'help' for commands, 'exit' to quit.");

    loop {
        stdout.write_all(b"> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match line.split_once(' ').unwrap_or((line, "")) {
            ("exit", _) | ("quit", _) => break,
            ("help", _) => println!("{HELP}"),
            ("models", _) => {
                let session = sessions.get_or_create(&session_id);
                let active = session
                    .current_model
                    .as_ref()
                    .or_else(|| gateway.registry().primary());
                for id in gateway.registry().chain() {
                    let marker = if Some(id) == active { "*" } else { " " };
                    println!("{marker} {id}");
                }
            }
            ("model", "") => println!("Usage: model <provider:model> | model default"),
            ("model", "default") => {
                sessions.set_model(&session_id, None);
                println!("Model override cleared.");
            }
            ("model", raw) => match raw.parse::<ModelId>() {
                Ok(id) if gateway.registry().contains(&id) => {
                    sessions.set_model(&session_id, Some(id.clone()));
                    println!("Pinned to {id}.");
                }
                Ok(id) => println!("Unknown model '{id}'. Try 'models'."),
                Err(e) => println!("{e}"),
            },
            ("lang", "") => println!("Usage: lang <code>"),
            ("lang", code) => {
                sessions.set_language(&session_id, code);
                println!("Language set to '{code}'.");
            }
            ("stats", _) => {
                let session = sessions.get_or_create(&session_id);
                println!(
                    "session {}: {} questions, {} errors",
                    session.session_id, session.question_count, session.error_count
                );
                if let Some(cache) = &cache {
                    let stats = cache.stats();
                    println!(
                        "cache: {}/{} entries, {} hits, {} misses",
                        stats.entries, stats.capacity, stats.hits, stats.misses
                    );
                }
            }
            ("clear", _) => {
                session_id = Uuid::new_v4().to_string();
                println!("New session started.");
            }
            _ => ask(&gateway, &sessions, &session_id, line).await,
        }
    }

    println!("Goodbye.");
    Ok(())
}

async fn ask(
    gateway: &ModelGateway,
    sessions: &InMemorySessionStore,
    session_id: &str,
    prompt: &str,
) {
    let session = sessions.get_or_create(session_id);
    let request = ChatRequest {
        prompt: prompt.to_string(),
        session_id: Some(session_id.to_string()),
        language_hint: session.language.clone(),
    };

    match gateway.ask(&request, session.current_model.as_ref()).await {
        Ok(answer) => {
            sessions.record_question(session_id, false);
            println!("{}", answer.text);
            if answer.cached {
                println!("  [{} | cached]", answer.model_used);
            } else {
                println!("  [{} | {:.2}s]", answer.model_used, answer.latency_seconds);
            }
        }
        Err(Error::AllProvidersExhausted { attempts }) => {
            sessions.record_question(session_id, true);
            tracing::error!(attempts = attempts.len(), "Every provider failed");
            println!("All assistants are busy right now. Please try again in a moment.");
        }
        Err(e) => {
            sessions.record_question(session_id, true);
            println!("{e}");
        }
    }
}
