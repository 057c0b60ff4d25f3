use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::{Duration, sleep};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stallwatch_core::config::WatchdogConfig;
use stallwatch_core::domain::{QueueTriple, WatchdogEvent, WorkId};
use stallwatch_core::impls::InMemoryStallStore;
use stallwatch_core::ports::{ChannelSink, Clock, IdGenerator, SystemClock, UlidGenerator};
use stallwatch_core::Watchdog;

#[derive(Parser, Debug)]
#[command(name = "stallwatch")]
#[command(about = "Stalled-work watchdog demo against an in-memory store", long_about = None)]
struct Args {
    /// Queue name (collections are <queue>-pending / -timeout / -stalled)
    #[arg(default_value = "jobs")]
    queue: String,

    /// Path to a JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override pollInterval (ms)
    #[arg(long)]
    poll_interval_ms: Option<u64>,

    /// Override stalledTimeout (ms)
    #[arg(long)]
    stalled_timeout_ms: Option<u64>,

    /// Number of in-flight items to simulate
    #[arg(long, default_value_t = 4)]
    items: usize,

    /// How long to run before stopping (ms)
    #[arg(long, default_value_t = 8_000)]
    run_for_ms: u64,
}

fn load_config(args: &Args) -> anyhow::Result<WatchdogConfig> {
    let mut config = match &args.config {
        Some(path) => WatchdogConfig::from_file(path)?,
        None => WatchdogConfig::default()
            .with_poll_interval(Duration::from_millis(1_000))
            .with_stalled_timeout(Duration::from_millis(3_000)),
    };
    if let Some(ms) = args.poll_interval_ms {
        config.poll_interval_ms = ms;
    }
    if let Some(ms) = args.stalled_timeout_ms {
        config.stalled_timeout_ms = ms;
    }
    config.validate()?;
    Ok(config)
}

/// 半分のアイテムだけ heartbeat を続けるワーカー
async fn heartbeat_loop(store: InMemoryStallStore, queue: QueueTriple, alive: Vec<WorkId>, every: Duration) {
    loop {
        sleep(every).await;
        for id in &alive {
            store.heartbeat(&queue, id).await;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = load_config(&args)?;
    tracing::info!(
        queue = %args.queue,
        poll_interval_ms = config.poll_interval_ms,
        stalled_timeout_ms = config.stalled_timeout_ms,
        "starting demo"
    );

    // (A) ストアを用意し、in-flight のアイテムをすべて stalled にする
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = InMemoryStallStore::new(clock.clone());
    let queue = QueueTriple::new(args.queue.clone());
    let ids = UlidGenerator::new(clock.clone());

    let mut alive = Vec::new();
    for n in 0..args.items {
        store.enqueue(&queue, ids.generate_work_id()).await;
        let Some(id) = store.claim(&queue).await else {
            continue;
        };
        store.mark_stalled(&queue, &id).await;
        if n % 2 == 1 {
            alive.push(id);
        }
    }

    // (B) 生きているワーカーは stalledTimeout より短い間隔で heartbeat
    let every = config.stalled_timeout() / 3;
    let worker = tokio::spawn(heartbeat_loop(store.clone(), queue.clone(), alive, every));

    // (C) watchdog を起動し、イベントは別タスクで表示
    let (sink, mut events) = ChannelSink::new();
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            match &event {
                WatchdogEvent::Requeued { id } => println!("{}: {id}", event.name()),
                WatchdogEvent::Fault { error } => println!("{}: {error}", event.name()),
                other => println!("{}", other.name()),
            }
            if event == WatchdogEvent::Ended {
                break;
            }
        }
    });
    let watchdog = Watchdog::builder(args.queue.clone(), Arc::new(store.clone()))
        .config(config)
        .clock(clock)
        .sink(sink)
        .spawn()?;

    // (D) しばらく動かしてから停止
    sleep(Duration::from_millis(args.run_for_ms)).await;
    watchdog.stop().await;
    worker.abort();
    printer.await?;

    println!("{}", serde_json::to_string_pretty(&watchdog.status())?);
    println!("{}", serde_json::to_string_pretty(&store.snapshot(&queue).await)?);
    Ok(())
}
