//! Run orchestration: worker pool, result collection, retry, backfill.
//!
//! The orchestrator owns scheduling only. Workers resolve rows and hand
//! results over a channel; the single collector applies them to the
//! repository, so table mutation and checkpointing stay on one task.

use crate::error::Result;
use crate::resolver::RowResolver;
use rostermark_core::{AppConfig, ColumnSet, ResolutionResult, RowKey, RowStatus};
use rostermark_store::{is_blank, ValueRepository};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

/// How long in-flight resolutions may keep delivering results after a
/// cancellation before they are abandoned.
const CANCEL_GRACE: Duration = Duration::from_secs(5);

/// Per-run options decided at startup (prompts or CLI flags).
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Worker-pool size for the main pass
    pub workers: usize,
    /// Which result columns updates may write
    pub columns: ColumnSet,
    /// 1-based row the main pass started from; the backfill scan begins a
    /// configured distance before it
    pub start_row: usize,
    /// Whether to run the backfill pass after the main run
    pub backfill: bool,
}

/// Counts reported at the end of a run.
#[derive(Debug, Default, Clone)]
pub struct RunSummary {
    /// Rows for which a result was collected (main pass + retry)
    pub processed: usize,
    /// Rows that resolved with a parsed value
    pub ok: usize,
    /// Rows that matched a profile but yielded no value
    pub value_not_found: usize,
    /// Rows with no accepted candidate
    pub no_match: usize,
    /// Rows whose acquisition failed
    pub errors: usize,
    /// Rows touched by the backfill pass
    pub backfilled: usize,
    /// Row indices still unresolved after the retry pass
    pub missing_after_retry: Vec<usize>,
    /// Whether the run was cut short by cancellation
    pub interrupted: bool,
}

impl RunSummary {
    fn record(&mut self, status: RowStatus) {
        self.processed += 1;
        match status {
            RowStatus::Ok => self.ok += 1,
            RowStatus::ValueNotFound => self.value_not_found += 1,
            RowStatus::NoMatch => self.no_match += 1,
            RowStatus::Error => self.errors += 1,
            RowStatus::Pending => {}
        }
    }
}

/// Drives a run: main worker-pool pass, sequential retry of missing rows,
/// final save, optional backfill.
pub struct Orchestrator<F> {
    config: AppConfig,
    factory: Arc<F>,
    cancel: CancellationToken,
}

impl<F, R> Orchestrator<F>
where
    F: Fn() -> Result<R> + Send + Sync + 'static,
    R: RowResolver + 'static,
{
    /// Create an orchestrator.
    ///
    /// `factory` builds one resolver per worker (each worker owns its
    /// backends); `cancel` is observed cooperatively between rows.
    pub fn new(config: AppConfig, factory: F, cancel: CancellationToken) -> Self {
        Self {
            config,
            factory: Arc::new(factory),
            cancel,
        }
    }

    /// Run the full pipeline over the given rows.
    ///
    /// Always leaves the repository flushed, including on cancellation.
    /// Only persistence failures propagate; per-row failures surface as
    /// status values.
    pub async fn run(
        &self,
        rows: Vec<RowKey>,
        repo: &mut ValueRepository,
        options: &RunOptions,
    ) -> Result<RunSummary> {
        let mut summary = RunSummary::default();

        let processed = self.main_pass(&rows, repo, options, &mut summary).await?;
        summary.interrupted = self.cancel.is_cancelled();

        if summary.interrupted {
            repo.save_final()?;
            tracing::info!(
                "Interrupted: {} of {} rows collected before shutdown",
                processed.len(),
                rows.len()
            );
            return Ok(summary);
        }

        let missing: Vec<RowKey> = rows
            .iter()
            .filter(|key| !processed.contains(&key.index))
            .cloned()
            .collect();
        summary.missing_after_retry = self
            .retry_missing(&missing, repo, options, &mut summary)
            .await?;

        repo.save_final()?;

        if options.backfill {
            self.backfill_pass(repo, options, &mut summary).await?;
        } else {
            tracing::info!("Backfill checker disabled");
        }

        summary.interrupted = self.cancel.is_cancelled();
        Ok(summary)
    }

    /// Dispatch all rows across the worker pool and collect results as
    /// they complete. Returns the set of row indices a result arrived for.
    async fn main_pass(
        &self,
        rows: &[RowKey],
        repo: &mut ValueRepository,
        options: &RunOptions,
        summary: &mut RunSummary,
    ) -> Result<HashSet<usize>> {
        let total = rows.len();
        let mut processed = HashSet::new();
        if total == 0 {
            tracing::info!("No rows to process from the selected start row");
            return Ok(processed);
        }

        let workers = options.workers.clamp(1, total);
        tracing::info!("Parallel workers: {}", workers);

        let queue: Arc<Mutex<VecDeque<RowKey>>> =
            Arc::new(Mutex::new(rows.iter().cloned().collect()));
        let (tx, mut rx) = mpsc::unbounded_channel::<(usize, ResolutionResult)>();

        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(workers);
        for worker_id in 1..=workers {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let cancel = self.cancel.clone();
            let factory = Arc::clone(&self.factory);
            handles.push(tokio::spawn(async move {
                let mut resolver = match factory() {
                    Ok(resolver) => resolver,
                    Err(e) => {
                        tracing::error!("Worker {} could not build a resolver: {}", worker_id, e);
                        return;
                    }
                };
                while !cancel.is_cancelled() {
                    let task = queue.lock().expect("task queue lock").pop_front();
                    let Some(key) = task else { break };
                    let result = resolver.resolve_row(&key).await;
                    if tx.send((key.index, result)).is_err() {
                        break;
                    }
                }
                resolver.shutdown().await;
                tracing::debug!("Worker {} finished", worker_id);
            }));
        }
        drop(tx);

        let mut since_checkpoint = 0usize;
        while processed.len() < total && !self.cancel.is_cancelled() {
            match timeout(self.config.scraping.results_timeout(), rx.recv()).await {
                Ok(Some((index, result))) => {
                    self.apply_result(
                        repo,
                        options,
                        summary,
                        &mut processed,
                        &mut since_checkpoint,
                        total,
                        index,
                        &result,
                    )?;
                }
                Ok(None) => break,
                Err(_) => {
                    if handles.iter().all(JoinHandle::is_finished) {
                        tracing::warn!(
                            "Workers exited with {} of {} results collected",
                            processed.len(),
                            total
                        );
                        break;
                    }
                    tracing::warn!(
                        "No result within {:?}; workers still running",
                        self.config.scraping.results_timeout()
                    );
                }
            }
        }

        if self.cancel.is_cancelled() {
            tracing::info!(
                "Interrupt received; draining in-flight results for up to {:?}",
                CANCEL_GRACE
            );
            let deadline = Instant::now() + CANCEL_GRACE;
            while processed.len() < total {
                let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                    break;
                };
                match timeout(remaining, rx.recv()).await {
                    Ok(Some((index, result))) => {
                        self.apply_result(
                            repo,
                            options,
                            summary,
                            &mut processed,
                            &mut since_checkpoint,
                            total,
                            index,
                            &result,
                        )?;
                    }
                    _ => break,
                }
            }
            // Whatever is still in flight past the grace window is
            // abandoned; its partial work is never written.
            for handle in &handles {
                handle.abort();
            }
        }

        Ok(processed)
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_result(
        &self,
        repo: &mut ValueRepository,
        options: &RunOptions,
        summary: &mut RunSummary,
        processed: &mut HashSet<usize>,
        since_checkpoint: &mut usize,
        total: usize,
        index: usize,
        result: &ResolutionResult,
    ) -> Result<()> {
        repo.update(index, result, &options.columns)?;
        processed.insert(index);
        summary.record(result.status);

        let done = processed.len();
        let log_every = self.config.scraping.progress_log_every.max(1);
        if result.status == RowStatus::Error || done % log_every == 0 {
            tracing::info!(
                "Processed {}/{} | row {} | status={} | value={}",
                done,
                total,
                index + 1,
                result.status,
                result.raw_value.as_deref().unwrap_or("")
            );
        }

        if self.config.scraping.write_every_row {
            repo.flush()?;
        } else if self.config.scraping.checkpoint_every > 0 {
            *since_checkpoint += 1;
            if *since_checkpoint >= self.config.scraping.checkpoint_every {
                repo.flush()?;
                *since_checkpoint = 0;
                tracing::info!(
                    "Checkpoint write ({} rows) to {}",
                    done,
                    repo.path().display()
                );
            }
        }
        Ok(())
    }

    /// Sequential second chance for rows whose results never arrived.
    /// Returns the indices that are still unresolved afterwards.
    async fn retry_missing(
        &self,
        missing: &[RowKey],
        repo: &mut ValueRepository,
        options: &RunOptions,
        summary: &mut RunSummary,
    ) -> Result<Vec<usize>> {
        if missing.is_empty() {
            return Ok(Vec::new());
        }
        tracing::warn!(
            "{} rows missing after the main pass; retrying sequentially",
            missing.len()
        );

        let mut resolver = match (self.factory)() {
            Ok(resolver) => resolver,
            Err(e) => {
                tracing::error!("Retry resolver unavailable: {}", e);
                return Ok(missing.iter().map(|key| key.index).collect());
            }
        };

        let mut still_missing = Vec::new();
        for key in missing {
            if self.cancel.is_cancelled() {
                still_missing.push(key.index);
                continue;
            }
            match timeout(
                self.config.scraping.results_timeout(),
                resolver.resolve_row(key),
            )
            .await
            {
                Ok(result) => {
                    repo.update(key.index, &result, &options.columns)?;
                    summary.record(result.status);
                    if self.config.scraping.write_every_row {
                        repo.flush()?;
                    }
                    tracing::info!("Retried {} | status={}", key, result.status);
                }
                Err(_) => {
                    tracing::warn!("Retry timed out for {}", key);
                    still_missing.push(key.index);
                }
            }
        }
        resolver.shutdown().await;
        Ok(still_missing)
    }

    /// Slow pass that re-resolves rows with a blank URL or value and fills
    /// only their gaps.
    async fn backfill_pass(
        &self,
        repo: &mut ValueRepository,
        options: &RunOptions,
        summary: &mut RunSummary,
    ) -> Result<()> {
        let start_index = options
            .start_row
            .saturating_sub(1)
            .saturating_sub(self.config.backfill.behind_rows);
        let targets: Vec<RowKey> = repo
            .rows()
            .iter()
            .enumerate()
            .skip(start_index)
            .filter(|(_, row)| !is_blank(&row.player) && row.needs_backfill())
            .map(|(index, row)| RowKey::new(row.player.clone(), row.squad.clone(), index))
            .collect();

        if targets.is_empty() {
            tracing::info!("Backfill: nothing to fill");
            return Ok(());
        }
        tracing::info!(
            "Backfill checker starting at row {} ({} candidate rows)",
            start_index + 1,
            targets.len()
        );

        let mut resolver = match (self.factory)() {
            Ok(resolver) => resolver,
            Err(e) => {
                tracing::error!("Backfill resolver unavailable: {}", e);
                return Ok(());
            }
        };

        let mut updates = 0usize;
        for key in targets {
            if self.cancel.is_cancelled() {
                break;
            }
            tracing::debug!("Backfill checking {}", key);
            let result = match timeout(
                self.config.scraping.results_timeout(),
                resolver.resolve_row(&key),
            )
            .await
            {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!("Backfill resolution timed out for {}", key);
                    continue;
                }
            };

            if repo.merge_backfill(key.index, &result)? {
                updates += 1;
                if self.config.scraping.write_every_row {
                    repo.flush()?;
                }
            }

            tokio::select! {
                () = tokio::time::sleep(self.config.backfill.delay()) => {}
                () = self.cancel.cancelled() => break,
            }
        }
        resolver.shutdown().await;

        if updates > 0 {
            repo.flush()?;
            tracing::info!("Backfill final write: {} rows touched", updates);
        }
        summary.backfilled = updates;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rostermark_core::ResultColumn;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tempfile::TempDir;

    fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.scraping.results_timeout_secs = 1;
        config.scraping.checkpoint_every = 3;
        config.scraping.progress_log_every = 1000;
        config.backfill.delay_ms = 0;
        config
    }

    fn seed_keys(count: usize) -> Vec<RowKey> {
        (0..count)
            .map(|i| RowKey::new(format!("Player {i}"), format!("Club {i}"), i))
            .collect()
    }

    fn seeded_repo(folder: &TempDir, count: usize) -> ValueRepository {
        let mut repo = ValueRepository::new(folder.path());
        repo.initialize_if_missing(&seed_keys(count))
            .expect("initialize");
        repo.load().expect("load");
        repo
    }

    fn stub_result(index: usize) -> ResolutionResult {
        ResolutionResult::matched(
            format!("Club {index}"),
            format!("https://example.com/profil/spieler/{index}"),
            Some("€1.00m".to_string()),
            Some(1_000_000),
        )
    }

    /// Resolver used by orchestrator tests: configurable delay, an
    /// optional one-shot panic, and a shared call counter.
    struct StubResolver {
        delay: Duration,
        panic_on: Option<usize>,
        panicked: Arc<AtomicBool>,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RowResolver for StubResolver {
        async fn resolve_row(&mut self, key: &RowKey) -> ResolutionResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.panic_on == Some(key.index) && !self.panicked.swap(true, Ordering::SeqCst) {
                panic!("stub worker death");
            }
            stub_result(key.index)
        }
    }

    struct StubFactory {
        delay: Duration,
        panic_on: Option<usize>,
        panicked: Arc<AtomicBool>,
        calls: Arc<AtomicUsize>,
    }

    impl StubFactory {
        fn new(delay: Duration, panic_on: Option<usize>) -> Self {
            Self {
                delay,
                panic_on,
                panicked: Arc::new(AtomicBool::new(false)),
                calls: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn factory(&self) -> impl Fn() -> Result<StubResolver> + Send + Sync + 'static {
            let delay = self.delay;
            let panic_on = self.panic_on;
            let panicked = self.panicked.clone();
            let calls = self.calls.clone();
            move || {
                Ok(StubResolver {
                    delay,
                    panic_on,
                    panicked: panicked.clone(),
                    calls: calls.clone(),
                })
            }
        }
    }

    fn run_options(workers: usize) -> RunOptions {
        RunOptions {
            workers,
            columns: ColumnSet::all(),
            start_row: 1,
            backfill: false,
        }
    }

    async fn run_to_completion(workers: usize, rows: usize) -> (RunSummary, Vec<(String, Option<u64>)>) {
        let tmp = TempDir::new().expect("create temp dir");
        let mut repo = seeded_repo(&tmp, rows);
        let stub = StubFactory::new(Duration::ZERO, None);
        let orchestrator =
            Orchestrator::new(test_config(), stub.factory(), CancellationToken::new());

        let rows = repo.rows_from(1);
        let summary = orchestrator
            .run(rows, &mut repo, &run_options(workers))
            .await
            .expect("run");

        let fields = repo
            .rows()
            .iter()
            .map(|row| (row.status.clone(), row.value_int))
            .collect();
        (summary, fields)
    }

    #[tokio::test]
    async fn test_every_row_processed_exactly_once() {
        let (summary, rows) = run_to_completion(4, 10).await;

        assert_eq!(summary.processed, 10);
        assert_eq!(summary.ok, 10);
        assert!(summary.missing_after_retry.is_empty());
        assert!(!summary.interrupted);
        assert!(rows.iter().all(|(status, value)| status == "ok" && *value == Some(1_000_000)));
    }

    #[tokio::test]
    async fn test_single_and_many_workers_agree() {
        let (_, sequential) = run_to_completion(1, 8).await;
        let (_, parallel) = run_to_completion(4, 8).await;
        assert_eq!(sequential, parallel);
    }

    #[tokio::test]
    async fn test_interrupt_yields_loadable_partial_table() {
        let tmp = TempDir::new().expect("create temp dir");
        let mut repo = seeded_repo(&tmp, 20);
        let stub = StubFactory::new(Duration::from_millis(50), None);
        let cancel = CancellationToken::new();
        let orchestrator = Orchestrator::new(test_config(), stub.factory(), cancel.clone());

        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(160)).await;
            canceller.cancel();
        });

        let rows = repo.rows_from(1);
        let summary = orchestrator
            .run(rows, &mut repo, &run_options(2))
            .await
            .expect("run");

        assert!(summary.interrupted);
        assert!(summary.processed < 20);

        // The final save happened: everything collected before the
        // interrupt is on disk and the file loads cleanly.
        let mut reloaded = ValueRepository::new(tmp.path());
        reloaded.load().expect("load after interrupt");
        assert_eq!(reloaded.len(), 20);
        let ok_rows = reloaded
            .rows()
            .iter()
            .filter(|row| row.status() == RowStatus::Ok)
            .count();
        assert_eq!(ok_rows, summary.processed);
    }

    #[tokio::test]
    async fn test_worker_death_is_recovered_by_retry() {
        let tmp = TempDir::new().expect("create temp dir");
        let mut repo = seeded_repo(&tmp, 5);
        // The only worker panics on row 2; the panic consumes that row and
        // kills the pool, so the retry pass must finish rows 2..=4.
        let stub = StubFactory::new(Duration::ZERO, Some(2));
        let orchestrator =
            Orchestrator::new(test_config(), stub.factory(), CancellationToken::new());

        let rows = repo.rows_from(1);
        let summary = orchestrator
            .run(rows, &mut repo, &run_options(1))
            .await
            .expect("run");

        assert_eq!(summary.processed, 5);
        assert!(summary.missing_after_retry.is_empty());
        assert!(repo
            .rows()
            .iter()
            .all(|row| row.status() == RowStatus::Ok));
    }

    #[tokio::test]
    async fn test_column_restriction_is_enforced() {
        let tmp = TempDir::new().expect("create temp dir");
        let mut repo = seeded_repo(&tmp, 3);
        let stub = StubFactory::new(Duration::ZERO, None);
        let orchestrator =
            Orchestrator::new(test_config(), stub.factory(), CancellationToken::new());

        let options = RunOptions {
            workers: 2,
            columns: ColumnSet::selected([ResultColumn::Status, ResultColumn::UpdatedAt]),
            start_row: 1,
            backfill: false,
        };
        let rows = repo.rows_from(1);
        orchestrator
            .run(rows, &mut repo, &options)
            .await
            .expect("run");

        for row in repo.rows() {
            assert_eq!(row.status(), RowStatus::Ok);
            assert!(!row.updated_at.is_empty());
            // Value columns were outside the selection.
            assert!(row.value_raw.is_empty());
            assert_eq!(row.value_int, None);
            assert!(row.profile_url.is_empty());
        }
    }

    #[tokio::test]
    async fn test_backfill_touches_only_incomplete_rows() {
        let tmp = TempDir::new().expect("create temp dir");
        let mut repo = seeded_repo(&tmp, 3);

        // Row 0 is complete before the backfill; rows 1 and 2 are not.
        repo.update(0, &stub_result(0), &ColumnSet::all())
            .expect("pre-fill row 0");
        repo.flush().expect("flush");

        let stub = StubFactory::new(Duration::ZERO, None);
        let calls = stub.calls.clone();
        let orchestrator =
            Orchestrator::new(test_config(), stub.factory(), CancellationToken::new());

        let options = RunOptions {
            workers: 1,
            columns: ColumnSet::all(),
            start_row: 1,
            backfill: true,
        };
        let summary = orchestrator
            .run(Vec::new(), &mut repo, &options)
            .await
            .expect("run");

        // Only the two incomplete rows were re-resolved.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(summary.backfilled, 2);
        assert!(repo.rows().iter().all(|row| row.status() == RowStatus::Ok));
    }

    #[tokio::test]
    async fn test_empty_row_set_is_a_clean_noop() {
        let tmp = TempDir::new().expect("create temp dir");
        let mut repo = seeded_repo(&tmp, 0);
        let stub = StubFactory::new(Duration::ZERO, None);
        let orchestrator =
            Orchestrator::new(test_config(), stub.factory(), CancellationToken::new());

        let summary = orchestrator
            .run(Vec::new(), &mut repo, &run_options(4))
            .await
            .expect("run");

        assert_eq!(summary.processed, 0);
        assert!(!summary.interrupted);
    }
}
