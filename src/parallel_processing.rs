// WHY: Batch orchestration lives in the library so the CLI, integration tests and benchmarks
// drive the same page pipeline

use anyhow::Result;
use futures::stream::{self, StreamExt};
use image::codecs::jpeg::JpegEncoder;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

use crate::config::{MarginPolicy, PipelineConfig};
use crate::debug::write_debug;
use crate::detector::BoundaryDetector;
use crate::error::SegmentError;
use crate::extractor::extract_columns;
use crate::incremental::{
    column_file_name, debug_file_name, document_output_dir, metadata_exists, read_metadata_async,
    write_all_metadata, write_metadata, ColumnEntry, DocumentMetadata, PageMetadata,
};
use crate::raster::{Rasterizer, SourceDocument};
use crate::resolution::select_dpi;

/// Per-document processing statistics
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DocumentStats {
    /// Source path of the document
    pub path: String,
    /// Document name, also the output directory name
    pub name: String,
    /// Selected rasterization resolution; absent when the probe failed or the document was skipped
    pub dpi: Option<u32>,
    /// Pages segmented and written
    pub pages_processed: u64,
    /// Pages skipped after a page-level error
    pub pages_failed: u64,
    /// Pages that fell back to even division
    pub fallback_pages: u64,
    pub columns_extracted: u64,
    /// Processing time in milliseconds
    pub processing_time_ms: u64,
    /// Processing status (success, partial, skipped, failed)
    pub status: String,
    /// Error message if processing failed
    pub error: Option<String>,
}

impl DocumentStats {
    fn new(source: &SourceDocument) -> Self {
        Self {
            path: source.path.display().to_string(),
            name: source.name.clone(),
            dpi: None,
            pages_processed: 0,
            pages_failed: 0,
            fallback_pages: 0,
            columns_extracted: 0,
            processing_time_ms: 0,
            status: "success".to_string(),
            error: None,
        }
    }

    fn fail(&mut self, error: impl ToString) {
        self.status = "failed".to_string();
        self.error = Some(error.to_string());
    }

    fn is_failed(&self) -> bool {
        self.status == "failed"
    }
}

/// Aggregate statistics of one batch run, written as JSON via `--stats-out`
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct RunStats {
    /// Run start as seconds since the Unix epoch
    pub run_start: u64,
    pub total_processing_time_ms: u64,
    pub documents_processed: u64,
    /// Documents with some pages skipped; left incomplete so the next run retries them
    pub documents_partial: u64,
    pub documents_skipped: u64,
    pub documents_failed: u64,
    pub pages_processed: u64,
    pub pages_failed: u64,
    pub fallback_pages: u64,
    pub columns_extracted: u64,
    /// Sorted by document name
    pub document_stats: Vec<DocumentStats>,
}

impl RunStats {
    fn record(&mut self, doc: DocumentStats) {
        match doc.status.as_str() {
            "success" => self.documents_processed += 1,
            "partial" => self.documents_partial += 1,
            "skipped" => self.documents_skipped += 1,
            _ => self.documents_failed += 1,
        }
        self.pages_processed += doc.pages_processed;
        self.pages_failed += doc.pages_failed;
        self.fallback_pages += doc.fallback_pages;
        self.columns_extracted += doc.columns_extracted;
        self.document_stats.push(doc);
    }

    /// Write pretty JSON statistics to `path`
    pub async fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Batch-level behavior switches
#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub out_dir: PathBuf,
    /// Re-segment documents whose metadata already exists
    pub overwrite_all: bool,
    /// Stop starting documents after the first failed one and report it as an error
    pub fail_fast: bool,
    pub show_progress: bool,
}

/// Check whether a document still needs segmenting
/// WHY: Incremental runs skip documents whose metadata.json marks them complete
pub fn should_process_document(out_dir: &Path, source: &SourceDocument, overwrite_all: bool) -> bool {
    overwrite_all || !metadata_exists(out_dir, source)
}

/// State shared by every document of one batch
struct BatchContext<'a> {
    rasterizer: Arc<dyn Rasterizer>,
    config: &'a PipelineConfig,
    options: &'a BatchOptions,
    /// One permit per worker; held for every blocking render, so at most `workers` raster
    /// pages are alive across all documents
    slots: Arc<Semaphore>,
    progress: ProgressBar,
    /// Set once no further documents should start
    halted: AtomicBool,
}

/// Everything a page worker needs, shared read-only across workers of one document
struct PageContext {
    rasterizer: Arc<dyn Rasterizer>,
    source: SourceDocument,
    dpi: u32,
    detector: BoundaryDetector,
    margins: MarginPolicy,
    jpeg_quality: u8,
    debug: bool,
    doc_dir: PathBuf,
    /// Set once a page hits an error that abandons the document
    abandoned: AtomicBool,
}

enum PageOutcome {
    Done(PageMetadata),
    Failed { page: u32, error: SegmentError },
    /// Not attempted because the document was already abandoned
    Abandoned,
}

/// Rasterize, detect, extract and write one page; the raster page is dropped on return
fn process_page(ctx: &PageContext, page_number: u32) -> Result<PageMetadata, SegmentError> {
    let page = ctx.rasterizer.rasterize(&ctx.source, page_number, ctx.dpi)?;
    let detection = ctx.detector.detect(&page)?;
    let records = extract_columns(&page, &detection.boundaries, ctx.margins, &ctx.source.name)?;

    if ctx.debug {
        let debug_path = ctx.doc_dir.join(debug_file_name(page_number));
        write_debug(&debug_path, &page, &detection, ctx.detector.config())?;
    }
    drop(page);

    let mut columns = Vec::with_capacity(records.len());
    for record in records {
        let path = ctx.doc_dir.join(column_file_name(page_number, record.index));
        write_column_jpeg(&path, &record.image, ctx.jpeg_quality)?;
        columns.push(ColumnEntry {
            path: path.display().to_string(),
            geometry: record.geometry(),
        });
    }

    Ok(PageMetadata {
        page_num: page_number,
        boundaries: detection.boundaries,
        used_fallback: detection.used_fallback,
        columns,
    })
}

/// Write a column crop as grayscale JPEG
pub fn write_column_jpeg(path: &Path, image: &image::DynamicImage, quality: u8) -> Result<(), SegmentError> {
    let gray = image.to_luma8();
    let mut writer = BufWriter::new(File::create(path)?);
    gray.write_with_encoder(JpegEncoder::new_with_quality(&mut writer, quality))?;
    Ok(())
}

fn run_page(ctx: &PageContext, page_number: u32) -> PageOutcome {
    if ctx.abandoned.load(Ordering::Acquire) {
        return PageOutcome::Abandoned;
    }
    match process_page(ctx, page_number) {
        Ok(page) => PageOutcome::Done(page),
        Err(error) => {
            if error.abandons_document() || error.is_fatal() {
                ctx.abandoned.store(true, Ordering::Release);
            }
            PageOutcome::Failed { page: page_number, error }
        }
    }
}

fn progress_bar(show: bool) -> ProgressBar {
    if !show {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(0);
    match ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} pages {msg}")
    {
        Ok(style) => pb.set_style(style.progress_chars("#>-")),
        Err(e) => warn!("Progress template rejected: {}", e),
    }
    pb
}

/// Segment one document
///
/// Returns its metadata when every page completed; `stats` records partial and failed
/// documents. A fatal configuration error comes back as `Err` and stops the batch.
async fn process_document(
    batch: &BatchContext<'_>,
    source: &SourceDocument,
    stats: &mut DocumentStats,
) -> Result<Option<DocumentMetadata>> {
    let config = batch.config;
    let resolution = config.resolution;
    let probe_source = source.clone();
    let probe_rasterizer = Arc::clone(&batch.rasterizer);
    let permit = Arc::clone(&batch.slots).acquire_owned().await?;
    let probed = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        let dpi = select_dpi(probe_rasterizer.as_ref(), &probe_source, &resolution)?;
        let page_count = probe_rasterizer.page_count(&probe_source)?;
        Ok::<_, SegmentError>((dpi, page_count))
    })
    .await?;

    let (dpi, page_count) = match probed {
        Ok(probed) => probed,
        Err(e) => {
            warn!(document = %source.name, "Skipping document: {}", e);
            stats.fail(e);
            return Ok(None);
        }
    };
    stats.dpi = Some(dpi);

    let doc_dir = document_output_dir(&batch.options.out_dir, source);
    tokio::fs::create_dir_all(&doc_dir).await?;
    info!(document = %source.name, dpi, page_count, "Segmenting document");

    let ctx = Arc::new(PageContext {
        rasterizer: Arc::clone(&batch.rasterizer),
        source: source.clone(),
        dpi,
        detector: BoundaryDetector::new(config.detector)?,
        margins: config.margins,
        jpeg_quality: config.jpeg_quality,
        debug: config.debug,
        doc_dir: doc_dir.clone(),
        abandoned: AtomicBool::new(false),
    });

    batch.progress.inc_length(u64::from(page_count));

    let outcomes: Vec<Result<PageOutcome>> = stream::iter(1..=page_count)
        .map(|page_number| {
            let ctx = Arc::clone(&ctx);
            let slots = Arc::clone(&batch.slots);
            async move {
                let permit = slots.acquire_owned().await?;
                let outcome = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    run_page(&ctx, page_number)
                })
                .await?;
                Ok::<_, anyhow::Error>(outcome)
            }
        })
        .buffer_unordered(config.workers.max(1))
        .inspect(|_| batch.progress.inc(1))
        .collect()
        .await;

    let mut metadata = DocumentMetadata::new(source.name.clone(), dpi);
    let mut abandon_error = None;
    let mut page_error = None;
    for outcome in outcomes {
        match outcome? {
            PageOutcome::Done(page) => {
                stats.pages_processed += 1;
                stats.columns_extracted += page.columns.len() as u64;
                if page.used_fallback {
                    stats.fallback_pages += 1;
                }
                metadata.pages.push(page);
            }
            PageOutcome::Failed { page, error } => {
                stats.pages_failed += 1;
                if error.is_fatal() {
                    error!(document = %source.name, page, "Configuration error: {}", error);
                    return Err(error.into());
                }
                if error.abandons_document() {
                    error!(document = %source.name, page, "Abandoning document: {}", error);
                    abandon_error.get_or_insert(error);
                } else {
                    warn!(document = %source.name, page, "Skipping page: {}", error);
                    page_error.get_or_insert(format!("page {page}: {error}"));
                }
            }
            PageOutcome::Abandoned => stats.pages_failed += 1,
        }
    }

    if let Some(error) = abandon_error {
        stats.fail(error);
        return Ok(None);
    }

    // WHY: metadata.json marks completion; without it the next run retries the document
    if let Some(error) = page_error {
        warn!(document = %source.name, pages_failed = stats.pages_failed, "Document left incomplete");
        stats.status = "partial".to_string();
        stats.error = Some(error);
        return Ok(None);
    }

    metadata.sort_pages();
    write_metadata(&doc_dir, &metadata).await?;
    debug!(document = %source.name, pages = metadata.pages.len(), "Wrote document metadata");
    Ok(Some(metadata))
}

/// Outcome of one document within a batch
struct DocumentRun {
    stats: DocumentStats,
    metadata: Option<DocumentMetadata>,
}

/// Skip, segment or record the failure of one document
///
/// `Ok(None)` means the batch halted before the document started.
async fn run_document(batch: &BatchContext<'_>, source: &SourceDocument) -> Result<Option<DocumentRun>> {
    if batch.halted.load(Ordering::Acquire) {
        return Ok(None);
    }

    let started = Instant::now();
    let mut stats = DocumentStats::new(source);
    let out_dir = &batch.options.out_dir;

    if !should_process_document(out_dir, source, batch.options.overwrite_all) {
        info!(document = %source.name, "Skipping already segmented document");
        stats.status = "skipped".to_string();
        let metadata = match read_metadata_async(document_output_dir(out_dir, source)).await {
            Ok(existing) => {
                stats.dpi = Some(existing.dpi);
                Some(existing)
            }
            Err(e) => {
                warn!(document = %source.name, "Unreadable existing metadata: {}", e);
                None
            }
        };
        return Ok(Some(DocumentRun { stats, metadata }));
    }

    let outcome = process_document(batch, source, &mut stats).await;
    stats.processing_time_ms = started.elapsed().as_millis() as u64;

    let metadata = match outcome {
        Ok(metadata) => metadata,
        Err(e) => {
            if e.downcast_ref::<SegmentError>().is_some_and(SegmentError::is_fatal) {
                batch.halted.store(true, Ordering::Release);
                return Err(e);
            }
            stats.fail(&e);
            None
        }
    };

    if stats.is_failed() && batch.options.fail_fast {
        batch.halted.store(true, Ordering::Release);
    }
    Ok(Some(DocumentRun { stats, metadata }))
}

/// Segment every source document into column images
///
/// Documents and their pages run concurrently; one pool of `config.workers` permits gates
/// every blocking render. A failed document never aborts the batch unless `fail_fast` is set,
/// and configuration errors always do. Writes `all_metadata.json` into the output directory
/// and returns the run statistics sorted by document name.
pub async fn process_documents_parallel(
    sources: &[SourceDocument],
    rasterizer: Arc<dyn Rasterizer>,
    config: &PipelineConfig,
    options: &BatchOptions,
) -> Result<RunStats> {
    let started = Instant::now();
    let mut run = RunStats {
        run_start: SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0),
        ..RunStats::default()
    };

    let mut sources = sources.to_vec();
    sources.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.path.cmp(&b.path)));

    tokio::fs::create_dir_all(&options.out_dir).await?;
    let workers = config.workers.max(1);
    let batch = BatchContext {
        rasterizer,
        config,
        options,
        slots: Arc::new(Semaphore::new(workers)),
        progress: progress_bar(options.show_progress),
        halted: AtomicBool::new(false),
    };

    // WHY: buffered keeps results in name order while up to `workers` documents are in flight
    let results: Vec<Result<Option<DocumentRun>>> = stream::iter(&sources)
        .map(|source| run_document(&batch, source))
        .buffered(workers)
        .collect()
        .await;

    let mut completed = Vec::new();
    let mut first_failure = None;
    for result in results {
        let Some(doc) = result.inspect_err(|_| batch.progress.abandon())? else {
            continue;
        };
        if doc.stats.is_failed() && first_failure.is_none() {
            first_failure = Some((doc.stats.name.clone(), doc.stats.error.clone().unwrap_or_default()));
        }
        completed.extend(doc.metadata);
        run.record(doc.stats);
    }

    if options.fail_fast {
        if let Some((name, error)) = first_failure {
            batch.progress.abandon();
            anyhow::bail!("Document {} failed: {}", name, error);
        }
    }

    batch.progress.finish_and_clear();
    write_all_metadata(&options.out_dir, &mut completed).await?;

    run.document_stats.sort_by(|a, b| a.name.cmp(&b.name));
    run.total_processing_time_ms = started.elapsed().as_millis() as u64;
    info!(
        processed = run.documents_processed,
        partial = run.documents_partial,
        skipped = run.documents_skipped,
        failed = run.documents_failed,
        pages = run.pages_processed,
        fallback_pages = run.fallback_pages,
        columns = run.columns_extracted,
        "Batch complete"
    );
    Ok(run)
}
