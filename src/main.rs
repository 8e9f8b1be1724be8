//! Terminal pairs runner (default binary).
//!
//! Uses crossterm for input and the framebuffer renderer from `tui_pairs::term`.
//! When the adapter is enabled, agents drive the same engine over TCP.

use std::fs::OpenOptions;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyEventKind};
use crossterm::terminal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tui_pairs::adapter::{Adapter, AdapterStatus, InboundPayload};
use tui_pairs::core::GameSnapshot;
use tui_pairs::engine::{Engine, GameConfig};
use tui_pairs::input::{handle_key_event, left_click, should_quit, CursorHandler};
use tui_pairs::term::{
    AdapterStatusView, FrameBuffer, GameView, TermBoard, TerminalRenderer, Viewport,
};
use tui_pairs::types::{SymbolSet, TICK_MS};

fn main() -> Result<()> {
    init_logging()?;

    let adapter = match Adapter::start_from_env() {
        Ok(adapter) => adapter,
        Err(e) => {
            warn!(error = %e, "adapter failed to start; continuing without it");
            None
        }
    };

    let mut term = TerminalRenderer::new();
    term.enter()?;

    let result = run(&mut term, adapter);

    // Always try to restore terminal state.
    let _ = term.exit();
    result
}

/// Log to `PAIRS_LOG_PATH` if set. Nothing is written to the terminal.
fn init_logging() -> Result<()> {
    let Some(path) = std::env::var_os("PAIRS_LOG_PATH").filter(|p| !p.is_empty()) else {
        return Ok(());
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("cannot open log file {}", path.to_string_lossy()))?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .init();
    Ok(())
}

fn run(term: &mut TerminalRenderer, mut adapter: Option<Adapter>) -> Result<()> {
    let config = GameConfig::from_env();
    let mut engine = Engine::new(config, SymbolSet::reference(), TermBoard::new());
    info!(seed = engine.seed(), pairs = engine.session().total_pairs(), "game started");

    let view = GameView::default();
    let mut cursor = CursorHandler::new(engine.view().len());
    let mut fb = FrameBuffer::new(0, 0);
    let mut snapshot = GameSnapshot::default();

    let tick_duration = Duration::from_millis(TICK_MS as u64);
    let mut last_tick = Instant::now();
    let mut last_status: Option<AdapterStatus> = None;
    let mut needs_draw = true;

    loop {
        let (w, h) = terminal::size().unwrap_or((80, 24));
        let viewport = Viewport::new(w, h);

        // Render only when something visible changed.
        let status = adapter.as_ref().map(Adapter::status);
        needs_draw |= engine.view_mut().take_dirty() || status != last_status;
        if needs_draw {
            let status_view = status.map(|st| AdapterStatusView {
                enabled: true,
                client_count: st.client_count,
                controller_id: st.controller_id,
                streaming_count: st.streaming_count,
            });
            view.render_into_with_adapter(
                engine.view(),
                Some(cursor.position()),
                status_view.as_ref(),
                viewport,
                &mut fb,
            );
            term.draw_swap(&mut fb)?;
            last_status = status;
            needs_draw = false;
        }

        // Input with timeout until next tick.
        let timeout = tick_duration.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if should_quit(key) {
                        info!("quit requested");
                        return Ok(());
                    }
                    if let Some(action) = handle_key_event(key) {
                        if let Some(command) = cursor.apply(action) {
                            engine.apply(command);
                        }
                        needs_draw = true;
                    }
                }
                Event::Mouse(mouse) => {
                    if let Some((x, y)) = left_click(mouse) {
                        if let Some(id) = view.card_at(engine.view(), viewport, x, y) {
                            cursor.move_to(id);
                            engine.select(id);
                            needs_draw = true;
                        }
                    }
                }
                Event::Resize(..) => {
                    term.invalidate();
                    needs_draw = true;
                }
                _ => {}
            }
        }

        // Tick.
        if last_tick.elapsed() >= tick_duration {
            last_tick = Instant::now();
            engine.tick(TICK_MS);
            cursor.resize(engine.view().len());

            if let Some(adapter) = adapter.as_mut() {
                pump_adapter(&mut engine, adapter, &mut snapshot);
            }
        }
    }
}

/// Apply queued agent commands, ack them, then broadcast the state if it moved.
fn pump_adapter(engine: &mut Engine<TermBoard>, adapter: &mut Adapter, snapshot: &mut GameSnapshot) {
    while let Some(cmd) = adapter.try_recv() {
        match cmd.payload {
            InboundPayload::Command(command) => {
                let outcome = engine.apply(command);
                adapter.ack(&cmd, outcome);
            }
            InboundPayload::SnapshotRequest => {
                engine.snapshot_into(snapshot);
                adapter.send_snapshot(cmd.client_id, snapshot);
            }
        }
    }

    engine.snapshot_into(snapshot);
    adapter.publish(snapshot);
}
