use super::context::{RuntimeContext, UpgradeConfig};
use super::normalize::normalize_snapshot_names;
use super::output::OutputHandler;
use super::scan::{SkipReason, SkippedSet, scan_table_dir, select_stale};
use super::upgrader::{JobStatus, UpgradeJob, Upgrader};
use crate::core::{Result, StoreError};
use crate::maintenance::{DeletionStats, DrainOutcome, MaintenanceManager};
use crate::remote::SchemaClient;
use crate::schema::Keyspace;
use crate::sstable::{Descriptor, partitioner};
use log::{debug, info};

/// What a finished run amounted to. "Nothing to upgrade" is reported as
/// its own outcome rather than as a zero-job completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    NothingToUpgrade,
    Completed { succeeded: usize, failed: usize },
}

#[derive(Debug)]
pub struct RunResult {
    pub outcome: RunOutcome,
    pub jobs: Vec<UpgradeJob>,
    pub skipped: Vec<SkippedSet>,
    pub deletions: DeletionStats,
    pub drain: DrainOutcome,
}

/// One-shot entry point: validate the configuration, start the
/// maintenance subsystem, run the pipeline, drain, and report.
///
/// # Examples
///
/// ```no_run
/// use rustsstable::{UpgradeConfig, run_upgrade};
///
/// # async fn demo() -> rustsstable::Result<()> {
/// let config = UpgradeConfig::new("my_keyspace", "events")
///     .with_data_root("/var/lib/data")
///     .with_peer("10.0.0.5", 9160);
/// let result = run_upgrade(config).await?;
/// println!("{:?}", result.outcome);
/// # Ok(())
/// # }
/// ```
pub async fn run_upgrade(config: UpgradeConfig) -> Result<RunResult> {
    let ctx = RuntimeContext::initialize(config)?;
    let maintenance = MaintenanceManager::start();
    run_with_context(&ctx, &maintenance).await
}

/// The pipeline itself: normalize filenames, fetch metadata from the
/// peer, register the table locally, scan and filter, convert each stale
/// set in isolation, then drain maintenance work. Errors returned here
/// are fatal; per-set failures are folded into the result instead.
pub async fn run_with_context(
    ctx: &RuntimeContext,
    maintenance: &MaintenanceManager,
) -> Result<RunResult> {
    let handler = OutputHandler::new(ctx.debug());

    let table_dir = ctx.table_dir();
    if table_dir.is_dir() {
        let report = normalize_snapshot_names(&table_dir)?;
        if report.renamed > 0 {
            handler.output(format!(
                "Normalized {} snapshot filenames.",
                report.renamed
            ));
        }
    }

    debug!(
        "Fetching metadata for {}.{} from {}:{}",
        ctx.keyspace(),
        ctx.table(),
        ctx.peer_host(),
        ctx.peer_port()
    );
    let mut client = SchemaClient::connect(
        ctx.peer_host(),
        ctx.peer_port(),
        ctx.connect_timeout(),
        ctx.request_timeout(),
    )
    .await?;
    let metadata = client.fetch_table_metadata(ctx.keyspace(), ctx.table()).await?;
    drop(client);

    if !partitioner::is_supported(&metadata.partitioner) {
        return Err(StoreError::UnsupportedPartitioner(metadata.partitioner));
    }

    let keyspace = Keyspace::bootstrap_local(metadata);
    let table = keyspace.open_table_without_sstables(ctx.table(), ctx.data_root())?;

    let sets = scan_table_dir(&table)?;
    // new sets get generations above everything seen in the scan, stale
    // or not, so nothing on disk is ever shadowed
    let max_generation = sets
        .iter()
        .map(|s| s.descriptor.generation)
        .max()
        .unwrap_or(0);
    let selection = select_stale(sets, ctx.current_version());

    for skip in &selection.skipped {
        match &skip.reason {
            SkipReason::OpenFailed(cause) => {
                handler.error(format!("Error loading {}: {}", skip.descriptor, cause));
            }
            reason => {
                handler.debug(format!("Skipping {}: {}", skip.descriptor, reason));
            }
        }
    }
    handler.output(format!(
        "Found {} sstables that need upgrading.",
        selection.ready.len()
    ));

    let mut jobs = Vec::with_capacity(selection.ready.len());
    for (idx, reader) in selection.ready.iter().enumerate() {
        let source = reader.descriptor().clone();
        let target = Descriptor::new(
            source.directory.clone(),
            source.keyspace.clone(),
            source.table.clone(),
            ctx.current_version(),
            max_generation + 1 + idx as u64,
        );
        let mut job = UpgradeJob::new(source, target.clone());
        job.status = JobStatus::InProgress;

        match Upgrader::new(&table.metadata, reader, target, &handler).upgrade() {
            Ok(_) => {
                job.status = JobStatus::Succeeded;
                if !ctx.keep_source() {
                    handler.output(format!("Deleting table {}.", job.source));
                    maintenance.submit_deletion(reader.file_paths())?;
                }
            }
            Err(e) => {
                handler.error(format!("Error upgrading {}: {}", job.source, e));
                if handler.is_debug() {
                    handler.error(format!("{:?}", e));
                }
                job.status = JobStatus::Failed(e.to_string());
            }
        }
        jobs.push(job);
    }

    let drain = maintenance
        .finish_compactions_within(ctx.compaction_drain_timeout())
        .await?;
    let deletions = maintenance.wait_for_pending_deletions().await?;
    if deletions.deleted > 0 {
        handler.output(format!("Deleted {} obsolete sstable files.", deletions.deleted));
    }

    let succeeded = jobs.iter().filter(|j| j.succeeded()).count();
    let failed = jobs.len() - succeeded;
    let outcome = if jobs.is_empty() {
        RunOutcome::NothingToUpgrade
    } else {
        RunOutcome::Completed { succeeded, failed }
    };
    info!(
        "Run finished: {} upgraded, {} failed, {} skipped, {} files deleted",
        succeeded,
        failed,
        selection.skipped.len(),
        deletions.deleted
    );

    Ok(RunResult {
        outcome,
        jobs,
        skipped: selection.skipped,
        deletions,
        drain,
    })
}
