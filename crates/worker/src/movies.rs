use marquee_core::config::Settings;
use marquee_core::dataset;
use marquee_core::domain::movie::{CleanedRecord, EnrichedRecord};
use marquee_core::ingest::collector::collect_candidates;
use marquee_core::ingest::enricher::enrich_candidates;
use marquee_core::ingest::tmdb::TmdbClient;
use marquee_core::pipeline::aggregate::build_report;
use marquee_core::pipeline::preprocess::preprocess as classify_dataset;
use marquee_core::pipeline::PipelineConfig;

pub async fn collect(settings: &Settings, config: &PipelineConfig) -> anyhow::Result<()> {
    let client = TmdbClient::from_settings(settings, config.tmdb.clone())?;

    let collection = {
        let mut rng = rand::thread_rng();
        collect_candidates(&client, &config.collector, &mut rng).await
    };

    let report = enrich_candidates(&client, collection.candidates, &config.enrich).await;
    anyhow::ensure!(
        !report.records.is_empty(),
        "no candidate survived enrichment (attempted={}, failed={})",
        report.attempted,
        report.failed
    );

    let path = config.raw_path();
    dataset::write_csv(&path, &report.records)?;
    tracing::info!(
        path = %path.display(),
        attempted = report.attempted,
        admitted = report.admitted,
        "raw dataset written"
    );
    Ok(())
}

pub fn preprocess(config: &PipelineConfig) -> anyhow::Result<()> {
    let raw_path = config.raw_path();
    let raw: Vec<EnrichedRecord> = dataset::read_csv(&raw_path)?;
    tracing::info!(path = %raw_path.display(), rows = raw.len(), "raw dataset loaded");

    let out = classify_dataset(raw, &config.preprocess);

    let path = config.cleaned_path();
    dataset::write_csv(&path, &out.records)?;
    tracing::info!(
        path = %path.display(),
        rows = out.records.len(),
        dropped = out.dropped,
        "cleaned dataset written"
    );
    Ok(())
}

pub fn aggregate(config: &PipelineConfig) -> anyhow::Result<()> {
    let cleaned_path = config.cleaned_path();
    let records: Vec<CleanedRecord> = dataset::read_csv(&cleaned_path)?;
    anyhow::ensure!(
        !records.is_empty(),
        "cleaned dataset is empty: {}",
        cleaned_path.display()
    );

    let report = build_report(&records, &config.aggregate);

    let path = config.report_path();
    dataset::write_json(&path, &report)?;
    tracing::info!(path = %path.display(), "aggregate report written");
    Ok(())
}

pub async fn run_all(settings: &Settings, config: &PipelineConfig) -> anyhow::Result<()> {
    collect(settings, config).await?;
    preprocess(config)?;
    aggregate(config)
}
