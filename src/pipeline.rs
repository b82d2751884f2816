//! Extraction batch orchestration.
//!
//! Coordinates one run: load store → scan images → build prompt → extract →
//! normalize → append → save. Cards are handled one at a time. A card that
//! fails at any step is logged and left out of the store, so the next run
//! tries it again. The store is saved after every card that makes it in; a
//! failed save is logged and the batch carries on with the in-memory store.

use anyhow::Result;
use std::path::Path;
use tracing::{error, info, warn};

use crate::config::{Config, ImagesConfig};
use crate::error::SkipReason;
use crate::extractor::{create_extractor, Extractor, NoContent};
use crate::models::Recipe;
use crate::normalize::normalize_response;
use crate::prompt::{build_request, Vendor};
use crate::scanner::{scan_images, Candidate, ScanResult};
use crate::store::{JsonFileStore, RecipeStore, StorePort};

/// Knobs for a single run.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Process at most this many pending cards.
    pub limit: Option<usize>,
}

/// What happened to one card.
#[derive(Debug)]
pub enum ItemOutcome {
    Added {
        id: String,
        title: String,
        vendor: Vendor,
        /// Sent without its back image.
        degraded: bool,
        /// `false` when the store could not be saved after the append.
        persisted: bool,
    },
    Skipped(SkipReason),
}

#[derive(Debug)]
pub struct ItemReport {
    pub file_name: String,
    pub outcome: ItemOutcome,
}

/// Result of [`run_pipeline`].
#[derive(Debug, Default)]
pub struct ExtractReport {
    /// Cards found that the store did not already hold.
    pub pending: usize,
    /// Front images skipped because the store already had them.
    pub already_processed: usize,
    pub items: Vec<ItemReport>,
}

impl ExtractReport {
    pub fn added(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, ItemOutcome::Added { .. }))
            .count()
    }

    pub fn skipped(&self) -> usize {
        self.items.len() - self.added()
    }

    pub fn write_failures(&self) -> usize {
        self.items
            .iter()
            .filter(|i| matches!(i.outcome, ItemOutcome::Added { persisted: false, .. }))
            .count()
    }
}

/// `cards extract`: runs the batch against the configured store and service.
pub async fn run_extract(config: &Config, limit: Option<usize>, dry_run: bool) -> Result<()> {
    let port = JsonFileStore::new(&config.store.path);

    if dry_run {
        let store = port.load()?;
        let scan = plan(&config.images, &store, port.key_root().as_deref(), limit)?;
        println!("extract (dry-run)");
        println!("  already processed: {}", scan.already_processed);
        println!("  pending: {}", scan.candidates.len());
        for candidate in &scan.candidates {
            println!(
                "    {}  [{}]",
                candidate.image_front,
                Vendor::classify(&candidate.file_name)
            );
        }
        return Ok(());
    }

    let extractor = create_extractor(&config.extractor)?;
    info!(extractor = %extractor.name(), "starting extraction");
    let report = run_pipeline(
        &config.images,
        &port,
        extractor.as_ref(),
        &ExtractOptions { limit },
    )
    .await?;

    println!("extract {}", config.images.dir.display());
    println!("  already processed: {}", report.already_processed);
    println!("  pending: {}", report.pending);
    println!("  added: {}", report.added());
    println!("  skipped: {}", report.skipped());
    if report.write_failures() > 0 {
        println!("  write failures: {}", report.write_failures());
    }
    println!("  extractor: {}", extractor.name());
    println!("  store: {}", port.describe());
    println!("ok");
    Ok(())
}

/// Loads-then-scans without touching the service.
fn plan(
    images: &ImagesConfig,
    store: &RecipeStore,
    key_root: Option<&Path>,
    limit: Option<usize>,
) -> Result<ScanResult> {
    let mut scan = scan_images(images, &store.processed_fronts(), key_root)?;
    if let Some(lim) = limit {
        scan.candidates.truncate(lim);
    }
    Ok(scan)
}

/// Runs the batch with an injected store port and extractor.
///
/// Returns an error only for the fatal cases: the store cannot be loaded or
/// the image directory cannot be listed.
pub async fn run_pipeline(
    images: &ImagesConfig,
    port: &dyn StorePort,
    extractor: &dyn Extractor,
    options: &ExtractOptions,
) -> Result<ExtractReport> {
    let mut store = port.load()?;
    let scan = plan(images, &store, port.key_root().as_deref(), options.limit)?;

    let mut report = ExtractReport {
        pending: scan.candidates.len(),
        already_processed: scan.already_processed,
        items: Vec::with_capacity(scan.candidates.len()),
    };

    let total = scan.candidates.len();
    for (n, candidate) in scan.candidates.iter().enumerate() {
        info!(file = %candidate.file_name, "processing {}/{}", n + 1, total);

        let outcome = match process_candidate(candidate, extractor, &mut store).await {
            Ok((recipe, vendor, degraded)) => {
                let persisted = match port.save(&store) {
                    Ok(()) => true,
                    Err(e) => {
                        let detail = format!("{:#}", e);
                        error!(store = %port.describe(), error = %detail, "failed to write store");
                        false
                    }
                };
                info!(
                    id = %recipe.id,
                    vendor = %vendor,
                    "successfully added: {}",
                    recipe.title
                );
                ItemOutcome::Added {
                    id: recipe.id,
                    title: recipe.title,
                    vendor,
                    degraded,
                    persisted,
                }
            }
            Err(reason) => {
                warn!(file = %candidate.file_name, "skipped: {}", reason);
                ItemOutcome::Skipped(reason)
            }
        };

        report.items.push(ItemReport {
            file_name: candidate.file_name.clone(),
            outcome,
        });
    }

    Ok(report)
}

/// Takes one card from prompt to appended record.
///
/// On success the store holds the new record and a copy is returned; on
/// failure the store is unchanged.
pub async fn process_candidate(
    candidate: &Candidate,
    extractor: &dyn Extractor,
    store: &mut RecipeStore,
) -> Result<(Recipe, Vendor, bool), SkipReason> {
    if store.contains_front(&candidate.image_front) {
        return Err(SkipReason::Duplicate);
    }

    let request = build_request(candidate)?;
    let raw = extractor.extract(&request).await.map_err(|e| {
        if e.is::<NoContent>() {
            SkipReason::EmptyResponse
        } else {
            SkipReason::Request(e)
        }
    })?;
    if raw.trim().is_empty() {
        return Err(SkipReason::EmptyResponse);
    }

    let extracted = normalize_response(&raw)?;
    let recipe = store
        .append(extracted, &candidate.image_front, &candidate.image_back)
        .map_err(|_| SkipReason::Duplicate)?
        .clone();

    Ok((recipe, request.vendor, request.degraded))
}
