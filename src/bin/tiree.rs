//! Terminal dashboard over a live record feed.
//!
//! Logs go to stderr through env_logger, redirect them when running interactively, e.g.
//! `RUST_LOG=debug tiree 2> tiree.log`.
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use log::info;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::task::LocalSet;

use tiree::buffer::Retention;
use tiree::config::DashboardConfig;
use tiree::dashboard::{Dashboard, DashboardEvent};
use tiree::render::terminal::{body_height, draw};
use tiree::source::juno::Juno;
use tiree::source::replay::CsvReplay;
use tiree::source::ticker::TickerFeed;
use tiree::source::{FeedEvent, FeedSource};

type Term = Terminal<CrosstermBackend<Stdout>>;

#[derive(Debug, Parser)]
#[command(name = "tiree", about = "Live record dashboard")]
struct Args {
    /// JSON config file, flags below override its values.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    tick_ms: Option<u64>,
    /// Replay a CSV file (id,label,amount,timestamp) instead of generating records.
    #[arg(long)]
    replay: Option<PathBuf>,
    /// Keep only the newest N records.
    #[arg(long)]
    retain: Option<usize>,
}

fn load_config(args: &Args) -> Result<DashboardConfig> {
    let mut config = match &args.config {
        Some(path) => DashboardConfig::from_file(path)?,
        None => DashboardConfig::default(),
    };
    if let Some(tick_ms) = args.tick_ms {
        config.tick_ms = tick_ms;
    }
    if let Some(retain) = args.retain {
        config.retention = Retention::MaxRecords(retain);
    }
    config.validate()?;
    Ok(config)
}

enum Action {
    Quit,
    Apply(DashboardEvent),
    Ignore,
}

fn map_key(code: KeyCode) -> Action {
    match code {
        KeyCode::Char('q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('s') => Action::Apply(DashboardEvent::ToggleSort),
        KeyCode::Char('c') => Action::Apply(DashboardEvent::FilterClear),
        KeyCode::Char(c) if c.is_ascii_digit() || c == '.' || c == '-' => {
            Action::Apply(DashboardEvent::FilterInput(c))
        }
        KeyCode::Backspace => Action::Apply(DashboardEvent::FilterBackspace),
        KeyCode::Up => Action::Apply(DashboardEvent::ScrollBy(-1.0)),
        KeyCode::Down => Action::Apply(DashboardEvent::ScrollBy(1.0)),
        KeyCode::PageUp => Action::Apply(DashboardEvent::PageUp),
        KeyCode::PageDown => Action::Apply(DashboardEvent::PageDown),
        KeyCode::Home => Action::Apply(DashboardEvent::Home),
        KeyCode::End => Action::Apply(DashboardEvent::End),
        _ => Action::Ignore,
    }
}

fn setup_terminal() -> Result<Term> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Term) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}

async fn event_loop(
    terminal: &mut Term,
    dashboard: &mut Dashboard,
    feed: &mut UnboundedReceiver<FeedEvent>,
) -> Result<()> {
    let mut input = EventStream::new();
    let mut dirty = true;

    loop {
        if dirty {
            terminal.draw(|f| {
                let area = f.area();
                dashboard.handle(DashboardEvent::Resize(body_height(area)));
                let frame = dashboard.frame();
                draw(f, area, &frame);
            })?;
            dirty = false;
        }

        tokio::select! {
            Some(event) = feed.recv() => {
                dirty |= dashboard.handle(DashboardEvent::Feed(event));
            }
            next = input.next() => match next {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    match map_key(key.code) {
                        Action::Quit => return Ok(()),
                        Action::Apply(event) => dirty |= dashboard.handle(event),
                        Action::Ignore => {}
                    }
                }
                Some(Ok(Event::Resize(_, _))) => dirty = true,
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err.into()),
                None => return Ok(()),
            },
        }
    }
}

async fn run(args: Args, config: DashboardConfig) -> Result<()> {
    let period = Duration::from_millis(config.tick_ms);
    let mut source: Box<dyn FeedSource> = match &args.replay {
        Some(path) => {
            info!("Replaying records from {}", path.display());
            Box::new(TickerFeed::new(CsvReplay::from_path(path)?, period))
        }
        None => Box::new(TickerFeed::new(
            Juno::new(config.amount_min, config.amount_max),
            period,
        )),
    };

    let mut dashboard = Dashboard::new(&config);
    let (tx, mut rx) = unbounded_channel();
    let subscription = source.subscribe(Box::new(move |event| {
        //Receiver only goes away on shutdown
        let _ = tx.send(event);
    }));

    let mut terminal = setup_terminal()?;
    let res = event_loop(&mut terminal, &mut dashboard, &mut rx).await;
    subscription.unsubscribe();
    restore_terminal(&mut terminal)?;

    info!(
        "Shut down after ingesting {} records",
        dashboard.buffer().total_ingested()
    );
    res
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    LocalSet::new().block_on(&runtime, run(args, config))
}
