use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use effectstore::logging::init_tracing;
use effectstore::{Action, Effect, Priority, Reducer, Sender, Store, StoreConfig, Task};

/// Run a ticker store end to end: a task sends `Tick` on an interval until
/// it has sent `--ticks` of them or Ctrl-C tears the store down.
#[derive(Debug, Parser)]
#[command(name = "effectstore", version)]
struct Args {
    /// Config file (defaults to the per-user config path).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of ticks the task sends before finishing.
    #[arg(long, default_value_t = 5)]
    ticks: u32,

    /// Delay between ticks.
    #[arg(long, default_value_t = 200)]
    interval_ms: u64,
}

#[derive(Debug, Clone, Default)]
struct TickerState {
    ticks: u32,
    running: bool,
    last_error: Option<String>,
}

#[derive(Debug)]
enum TickerAction {
    Start { ticks: u32, interval: Duration },
    Tick,
    Finished,
    Failed(String),
}

impl Action for TickerAction {}

struct TickerReducer;

impl Reducer for TickerReducer {
    type State = TickerState;
    type Action = TickerAction;

    fn reduce(&self, state: &mut TickerState, action: TickerAction) -> Effect<TickerAction> {
        match action {
            TickerAction::Start { ticks, interval } => {
                if state.running {
                    return Effect::none();
                }
                state.running = true;
                Task::new(move |sender: Sender<TickerAction>| async move {
                    for _ in 0..ticks {
                        tokio::select! {
                            _ = sender.cancelled() => return Ok(()),
                            _ = tokio::time::sleep(interval) => {}
                        }
                        sender.send(TickerAction::Tick);
                    }
                    sender.send(TickerAction::Finished);
                    Ok(())
                })
                .with_priority(Priority::Medium)
                .on_error(|error, sender| async move {
                    sender.send(TickerAction::Failed(format!("{:#}", error)));
                })
                .into()
            }
            TickerAction::Tick => {
                state.ticks += 1;
                tracing::info!(ticks = state.ticks, "tick");
                Effect::none()
            }
            TickerAction::Finished => {
                state.running = false;
                Effect::none()
            }
            TickerAction::Failed(message) => {
                state.running = false;
                state.last_error = Some(message);
                Effect::none()
            }
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => StoreConfig::load_from(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => StoreConfig::load()?,
    };

    let store = Store::builder(TickerState::default(), TickerReducer)
        .config(config)
        .build()?;

    store.dispatch(TickerAction::Start {
        ticks: args.ticks,
        interval: Duration::from_millis(args.interval_ms),
    });

    tokio::select! {
        result = store.settle() => result?,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Interrupted, shutting down");
        }
    }

    if !store.shutdown().await {
        tracing::warn!("Some effect tasks did not exit before the shutdown timeout");
    }

    let state = store.state();
    println!("ticks: {}", state.ticks);
    if let Some(error) = state.last_error {
        println!("error: {}", error);
    }
    Ok(())
}
