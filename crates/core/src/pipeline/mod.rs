pub mod aggregate;
pub mod preprocess;
pub mod stats;

use crate::ingest::collector::CollectorOptions;
use crate::ingest::enricher::EnrichOptions;
use crate::ingest::tmdb::TmdbOptions;
use aggregate::AggregateOptions;
use preprocess::PreprocessOptions;
use std::path::PathBuf;

const DEFAULT_DATA_DIR: &str = "data";
pub const RAW_FILE: &str = "tmdb_movies_raw.csv";
pub const CLEANED_FILE: &str = "tmdb_movies_cleaned.csv";
pub const REPORT_FILE: &str = "genre_report.json";

/// Every knob of the movie pipeline, resolved once at startup and handed to each stage.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_dir: PathBuf,
    pub tmdb: TmdbOptions,
    pub collector: CollectorOptions,
    pub enrich: EnrichOptions,
    pub preprocess: PreprocessOptions,
    pub aggregate: AggregateOptions,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            tmdb: TmdbOptions::default(),
            collector: CollectorOptions::default(),
            enrich: EnrichOptions::default(),
            preprocess: PreprocessOptions::default(),
            aggregate: AggregateOptions::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Self {
        Self {
            data_dir: std::env::var("PIPELINE_DATA_DIR")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            tmdb: TmdbOptions::from_env(),
            collector: CollectorOptions::from_env(),
            enrich: EnrichOptions::from_env(),
            preprocess: PreprocessOptions::from_env(),
            aggregate: AggregateOptions::from_env(),
        }
    }

    pub fn raw_path(&self) -> PathBuf {
        self.data_dir.join(RAW_FILE)
    }

    pub fn cleaned_path(&self) -> PathBuf {
        self.data_dir.join(CLEANED_FILE)
    }

    pub fn report_path(&self) -> PathBuf {
        self.data_dir.join(REPORT_FILE)
    }
}
