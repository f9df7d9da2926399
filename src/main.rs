//! Headless driver for the quick-add dashboard.
//!
//! Reads one JSON event per line on stdin and prints each view the dashboard
//! publishes as one JSON line on stdout. Besides the dashboard's own events,
//! a `{"layout": {"x":0,"y":0,"width":200,"height":100}}` line stands in for
//! the host's layout pass: it sets the drop-zone box (or `null` for
//! unmounted) and remeasures.
//!
//! Uses the hosted service when `SUPABASE_URL` is set, otherwise an
//! in-memory store for `QUICKADD_OWNER_ID` (default `local-user`).


use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

use quickadd::backend::memory::MemoryBackend;
use quickadd::backend::supabase::{SupabaseBackend, SupabaseConfig};
use quickadd::backend::StaticIdentity;
use quickadd::config::QuickAddConfig;
use quickadd::dashboard::{Dashboard, Services, UiEvent, ViewState};
use quickadd::geometry::Rect;

const LOCAL_OWNER: &str = "local-user";

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct LayoutLine {
    layout: Option<Rect>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScriptLine {
    Layout(LayoutLine),
    Ui(UiEvent),
}

fn services() -> Result<Services, Box<dyn std::error::Error>> {
    if std::env::var_os("SUPABASE_URL").is_some() {
        let config = SupabaseConfig::from_env()?;
        let identity = StaticIdentity(config.owner_id.clone());
        let backend = Arc::new(SupabaseBackend::new(config)?);
        tracing::info!(signed_in = identity.0.is_some(), "using hosted backend");
        return Ok(Services::new(backend.clone(), backend, Arc::new(identity)));
    }
    let owner = match std::env::var("QUICKADD_OWNER_ID") {
        Ok(owner) if !owner.trim().is_empty() => owner,
        _ => LOCAL_OWNER.to_string(),
    };
    tracing::info!(%owner, "using in-memory backend");
    let backend = Arc::new(MemoryBackend::new());
    Ok(Services::new(backend.clone(), backend, Arc::new(StaticIdentity(Some(owner)))))
}

fn write_view(out: &mut impl Write, view: &ViewState) -> std::io::Result<()> {
    serde_json::to_writer(&mut *out, view)?;
    writeln!(out)
}

/// Print the current view, then every view published after it.
async fn print_views(mut views: watch::Receiver<ViewState>, mut out: impl Write) -> std::io::Result<()> {
    write_view(&mut out, &views.borrow_and_update())?;
    while views.changed().await.is_ok() {
        write_view(&mut out, &views.borrow_and_update())?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let config = QuickAddConfig::from_env();
    let layout: Arc<Mutex<Option<Rect>>> = Arc::new(Mutex::new(None));
    let probe_cell = layout.clone();
    let probe = Box::new(move || *probe_cell.lock().unwrap_or_else(PoisonError::into_inner));

    let mut dashboard = Dashboard::new(config, services()?, probe);
    let views = dashboard.subscribe();
    dashboard.refresh();

    let printer = tokio::spawn(print_views(views, std::io::stdout()));

    let (tx, rx) = mpsc::channel(64);
    let event_loop = tokio::spawn(dashboard.run(rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ScriptLine>(&line) {
            Ok(ScriptLine::Layout(LayoutLine { layout: rect })) => {
                *layout.lock().unwrap_or_else(PoisonError::into_inner) = rect;
                tx.send(UiEvent::Remeasure).await?;
            }
            Ok(ScriptLine::Ui(event)) => tx.send(event).await?,
            Err(e) => tracing::warn!(error = %e, %line, "skipping unreadable event"),
        }
    }

    drop(tx);
    event_loop.await?;
    printer.await??;
    Ok(())
}
