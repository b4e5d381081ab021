//! Application controller: wires input, prompts, repository, and the
//! orchestrator together for one run.

use crate::cli::Cli;
use crate::{input, prompts};
use anyhow::{Context, Result};
use rostermark_browser::SessionOptions;
use rostermark_core::{AppConfig, ColumnSet};
use rostermark_scan::{
    BrowserValueFetcher, Orchestrator, PlayerResolver, RunOptions, RunSummary, SearchClient,
};
use rostermark_store::ValueRepository;
use tokio_util::sync::CancellationToken;

/// Main application controller.
pub struct MarketValueApp {
    cli: Cli,
    config: AppConfig,
}

impl MarketValueApp {
    /// Load configuration for the dataset folder given on the command
    /// line.
    pub fn new(cli: Cli) -> Result<Self> {
        let config = AppConfig::load_with_env(&cli.folder)
            .with_context(|| format!("loading configuration from {}", cli.folder.display()))?;
        Ok(Self { cli, config })
    }

    /// Run the full enrichment flow.
    pub async fn run(self) -> Result<()> {
        let folder = self.cli.folder.clone();

        let input_path = match &self.cli.input {
            Some(path) => path.clone(),
            None => input::find_input_file(&folder)?,
        };
        tracing::info!("Input file: {}", input_path.display());

        let roster = input::load_roster(&input_path)?;
        tracing::info!("Loaded input rows: {}", roster.len());

        let mut repo = ValueRepository::new(&folder);
        repo.initialize_if_missing(&roster)
            .context("seeding the result table")?;
        repo.load().context("loading the result table")?;

        let options = self.gather_run_options(&repo)?;
        tracing::info!("Starting from row {}", options.start_row);

        let cancel = CancellationToken::new();
        let signal_cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received. Stopping workers...");
                signal_cancel.cancel();
            }
        });

        let rows = repo.rows_from(options.start_row);
        let orchestrator =
            Orchestrator::new(self.config.clone(), self.resolver_factory(), cancel);
        let summary = orchestrator.run(rows, &mut repo, &options).await?;

        report(&summary, &repo);
        Ok(())
    }

    /// Resolve run parameters from CLI flags, falling back to prompts
    /// (or defaults with `--yes`).
    fn gather_run_options(&self, repo: &ValueRepository) -> Result<RunOptions> {
        let columns = if self.cli.yes || self.cli.fill_all {
            ColumnSet::all()
        } else {
            prompts::choose_columns()?
        };

        let start_row = match self.cli.start_row {
            Some(row) => row.max(1),
            None if self.cli.yes => 1,
            None => prompts::ask_start_row()?,
        };

        let total_jobs = repo.rows_from(start_row).len();
        let recommended = prompts::recommended_workers(self.config.scraping.max_workers);
        let workers = match self.cli.workers {
            Some(workers) => workers.clamp(1, total_jobs.max(1)),
            None if self.cli.yes => recommended.clamp(1, total_jobs.max(1)),
            None => prompts::ask_worker_count(recommended, total_jobs)?,
        };

        let backfill = if self.cli.backfill {
            true
        } else if self.cli.yes {
            false
        } else {
            prompts::ask_enable_backfill()?
        };

        Ok(RunOptions {
            workers,
            columns,
            start_row,
            backfill,
        })
    }

    /// Factory handed to the orchestrator: each worker gets its own HTTP
    /// client and its own lazily launched browser session.
    fn resolver_factory(
        &self,
    ) -> impl Fn() -> rostermark_scan::Result<PlayerResolver<SearchClient, BrowserValueFetcher>>
           + Send
           + Sync
           + 'static {
        let user_agent = self.config.scraping.user_agent.clone();
        let http_timeout = self.config.scraping.http_timeout();
        let session_options = SessionOptions {
            headless: self.config.browser.headless,
            page_load_timeout: self.config.browser.page_load_timeout(),
            consent_wait: self.config.browser.consent_wait(),
            chrome_binary: self.config.browser.chrome_binary.clone(),
        };

        move || {
            let search = SearchClient::new(&user_agent, http_timeout)?;
            let fetcher = BrowserValueFetcher::new(session_options.clone());
            Ok(PlayerResolver::new(search, fetcher))
        }
    }
}

fn report(summary: &RunSummary, repo: &ValueRepository) {
    tracing::info!(
        "Done. processed={} ok={} value_not_found={} no_match={} errors={} backfilled={}",
        summary.processed,
        summary.ok,
        summary.value_not_found,
        summary.no_match,
        summary.errors,
        summary.backfilled
    );
    if !summary.missing_after_retry.is_empty() {
        let rows: Vec<usize> = summary
            .missing_after_retry
            .iter()
            .map(|index| index + 1)
            .collect();
        tracing::warn!("Rows still missing after retry: {:?}", rows);
    }
    if summary.interrupted {
        tracing::warn!(
            "Run interrupted; partial results saved to {}",
            repo.path().display()
        );
    } else {
        tracing::info!("Results written to {}", repo.path().display());
    }
}
