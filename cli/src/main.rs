use std::{path::PathBuf, sync::Arc};

use async_std::{io::BufReader, task};
use clap::Parser;
use instruction_writer::{
    InstructionBus, InstructionWriter, WriterDependencies, WriterSettings,
    cleanup::ChannelCleanupListener,
    metrics::{INSTRUCTIONS_WRITTEN_METRIC, InMemoryMetrics, STORAGE_ID_LABEL},
    record_store::RecordStore,
};

mod driver;
mod input;
mod logging;

/// Writes garbage collection instructions read as JSON lines from stdin into
/// the spool directory and prints records that are safe to delete upstream.
#[derive(Parser, Debug)]
#[command(name = "mako-instruction-writer")]
struct Cli {
    /// Spool root directory (defaults to $MAKO_INSTR_WRITE_PATH_PREFIX or the local data dir)
    #[arg(long)]
    spool_root: Option<PathBuf>,

    /// Instance name embedded in file names (defaults to $MAKO_INSTANCE, $ZONENAME or $HOSTNAME)
    #[arg(long)]
    instance: Option<String>,

    /// Directory for JSON log files, rotated daily
    #[arg(long)]
    log_dir: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Cli::parse();
    let _guard = logging::init_logging(args.log_dir.as_deref());
    task::block_on(run(args))
}

async fn run(args: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let settings = WriterSettings::from_env(args.spool_root, args.instance)?;

    let metrics = InMemoryMetrics::new();
    let records = Arc::new(RecordStore::new());
    let (listener, cleanup_rx) = ChannelCleanupListener::unbounded();
    let deps = WriterDependencies::new(Arc::new(listener))
        .with_record_store(records.clone())
        .with_metrics(Arc::new(metrics.clone()));

    let writer = InstructionWriter::start(settings, Arc::new(InstructionBus::new()), deps)?;

    let events = writer.lifecycle_events();
    task::spawn(async move {
        while let Ok(event) = events.recv_async().await {
            tracing::info!(%event, "instruction writer lifecycle event");
        }
    });
    let printer = task::spawn(driver::write_cleanup(cleanup_rx, records, std::io::stdout()));

    let handles = driver::read_input(BufReader::new(async_std::io::stdin()), &writer).await;

    writer.shutdown();
    let batches = handles.len();
    let mut failed = 0;
    for handle in handles {
        if handle.await.is_err() {
            failed += 1;
        }
    }
    // releases the cleanup sender so the printer sees the channel close
    drop(writer);
    printer.await;

    for (storage_id, stats) in metrics.snapshot() {
        tracing::info!(
            metric = INSTRUCTIONS_WRITTEN_METRIC,
            label = STORAGE_ID_LABEL,
            storage_id = %storage_id,
            observations = stats.observations,
            instructions = stats.instructions,
            "instruction writer summary"
        );
    }
    tracing::info!(
        batches,
        failed,
        total_instructions = metrics.total_instructions(),
        "instruction writer finished"
    );

    Ok(())
}
