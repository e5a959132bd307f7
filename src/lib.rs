pub mod config;
pub mod debug;
pub mod detector;
pub mod discovery;
pub mod error;
pub mod extractor;
pub mod incremental;
pub mod parallel_processing;
pub mod raster;
pub mod resolution;

// Re-export main types for convenient access
pub use config::{DetectorConfig, MarginPolicy, PipelineConfig, ResolutionConfig};
pub use detector::{detect_boundaries, BoundaryDetector, BoundaryList, Detection, Roi};
pub use error::{Result, SegmentError};
pub use extractor::{extract_columns, ColumnGeometry, ColumnRecord};
pub use raster::{RasterPage, Rasterizer, SourceDocument, SourceKind, SourceRasterizer};
pub use resolution::select_dpi;

// Re-export incremental processing utilities
pub use incremental::{
    document_output_dir, metadata_exists, read_metadata, read_metadata_async, DocumentMetadata,
    PageMetadata,
};

// Re-export parallel processing types and functions for benchmarking
pub use parallel_processing::{
    process_documents_parallel, should_process_document, BatchOptions, DocumentStats, RunStats,
};
