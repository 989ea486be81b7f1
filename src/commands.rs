#[cfg(test)]
mod tests;

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::analysis::{AnalysisReport, analyze_records};
use crate::artifacts::source::read_source_records;
use crate::artifacts::{ClusterResults, PrototypeReport, ReportMetadata, read_json, write_json};
use crate::clustering::{KSelector, fit_clusters};
use crate::config::{Config, resolve_api_key};
use crate::embeddings::batch::embed_records;
use crate::embeddings::store::{
    apply_full_outputs, embeddings_csv_path, normalize_records, vector_lookup, write_embeddings_csv,
};
use crate::embeddings::{Embedder, GeminiClient, TextGenerator, load_embeddings, load_full_outputs};
use crate::merge::merge_clusters;
use crate::prototype::{MetadataIndex, assemble_prototype, prefilter};
use crate::summary::Summarizer;

/// Resolve the API key and build a client from the Gemini section of the config.
#[inline]
pub fn gemini_client(config: &Config) -> Result<GeminiClient> {
    let api_key = resolve_api_key(&config.gemini.api_key_env)?;
    GeminiClient::new(&config.gemini, api_key)
}

/// The client used for embedding, retrying transient failures as configured.
///
/// Summary requests keep a single attempt and fall back to a placeholder instead.
#[inline]
pub fn embedding_client(client: &GeminiClient, config: &Config) -> GeminiClient {
    client
        .clone()
        .with_retry_attempts(config.gemini.retry_attempts)
}

/// Embed every record of the input CSV and write the embeddings file, plus a flat
/// CSV copy next to it.
///
/// Returns the number of records that received a vector.
#[inline]
pub fn embed_dataset(config: &Config, embedder: &dyn Embedder) -> Result<usize> {
    let input = &config.paths.input_csv;
    let output = &config.paths.embeddings;
    info!("Embedding records from {}", input.display());

    let records = read_source_records(input)?;
    let pause = Duration::from_millis(config.gemini.request_delay_ms);
    let entries = embed_records(&records, embedder, pause);

    let embedded = entries.iter().filter(|e| e.embedding.is_some()).count();
    write_json(output, &entries)?;
    let csv_path = embeddings_csv_path(output);
    write_embeddings_csv(&csv_path, &entries)?;

    println!("Embedded {} of {} records", embedded, entries.len());
    if embedded < entries.len() {
        println!("  Failed: {}", entries.len() - embedded);
    }
    println!("Saved to: {}", output.display());
    println!("CSV copy: {}", csv_path.display());

    Ok(embedded)
}

/// Select k, fit the final model, summarize every cluster and write both artifacts.
#[inline]
pub fn run_clustering(config: &Config, generator: &dyn TextGenerator) -> Result<ClusterResults> {
    let records = load_embeddings(&config.paths.embeddings)?;
    anyhow::ensure!(
        !records.is_empty(),
        "No embeddings with vectors in {}",
        config.paths.embeddings.display()
    );

    let full_outputs = load_full_outputs(&config.paths.input_csv);
    let records = normalize_records(apply_full_outputs(records, &full_outputs));
    let vectors: Vec<Vec<f32>> = records.iter().map(|r| r.vector.clone()).collect();
    println!("Loaded {} records", records.len());

    let clustering = &config.clustering;
    println!(
        "Selecting k in [{}, {}]...",
        clustering.min_k,
        clustering.max_k.saturating_sub(1)
    );
    let selection = KSelector::new(clustering.k_range())
        .with_sample_size(clustering.sample_size)
        .with_silhouette_sample_size(clustering.silhouette_sample_size)
        .with_batch_size(clustering.batch_size)
        .with_n_init(clustering.n_init)
        .with_max_iter(clustering.max_iter)
        .with_seed(clustering.seed)
        .select(&vectors)?;
    write_json(config.k_selection_path(), &selection)?;
    println!("Selected k = {}", selection.best_k);

    let fit = fit_clusters(&vectors, selection.best_k, clustering.fit_params())?;
    let sizes = fit.sizes();
    for (cluster_id, size) in sizes.iter().enumerate() {
        println!("  Cluster {}: {} records", cluster_id, size);
    }

    println!("Summarizing {} clusters...", fit.k);
    let summarizer = Summarizer::new(generator)
        .with_delay(Duration::from_millis(config.gemini.request_delay_ms));
    let batch = summarizer.summarize_clusters(&records, &vectors, &fit, clustering.top_n);
    for (cluster_id, error) in &batch.failures {
        println!("  Cluster {cluster_id}: summary failed, placeholder used ({error})");
    }
    let cluster_summaries = batch.summaries;

    let results = ClusterResults {
        optimal_k: selection.best_k,
        k_selection_results: selection,
        cluster_summaries,
        total_samples: records.len(),
    };
    write_json(config.cluster_results_path(), &results)?;
    println!("Saved to: {}", config.cluster_results_path().display());

    Ok(results)
}

/// Turn cluster results into the prototype report.
///
/// Clusters are pre-filtered, merged by fingerprint similarity using `lookup`, then
/// enriched with metadata from `metadata`. An empty lookup leaves every cluster
/// standalone.
#[inline]
pub fn generate_report(
    results: &ClusterResults,
    lookup: &HashMap<String, Vec<f32>>,
    metadata: &MetadataIndex,
    threshold: f32,
    generation_date: String,
) -> PrototypeReport {
    let original_cluster_count = results.cluster_summaries.len();
    let (kept, pre_filtered_count) = prefilter(results.cluster_summaries.clone());
    info!(
        "Pre-filter kept {} of {} clusters",
        kept.len(),
        original_cluster_count
    );

    let merged = merge_clusters(&kept, lookup, threshold);

    let intent_prototypes: Vec<_> = merged
        .iter()
        .map(|cluster| {
            let shop_metadata =
                metadata.summarize(cluster.top_samples.iter().map(|s| s.id.as_str()));
            assemble_prototype(cluster, &shop_metadata)
        })
        .collect();

    PrototypeReport {
        metadata: ReportMetadata {
            generation_date,
            original_cluster_count,
            pre_filtered_count,
            clusters_after_prefilter: kept.len(),
            final_prototype_count: intent_prototypes.len(),
            merged_count: intent_prototypes.iter().filter(|p| p.is_merged).count(),
            total_samples: results.total_samples,
            optimal_k: results.optimal_k,
            similarity_threshold: threshold,
        },
        intent_prototypes,
    }
}

/// Build prototypes from the cluster results on disk and write the report.
#[inline]
pub fn build_prototypes(config: &Config) -> Result<PrototypeReport> {
    let results: ClusterResults = read_json(config.cluster_results_path())
        .context("Cluster results are missing, run the cluster stage first")?;
    println!(
        "Loaded {} cluster summaries",
        results.cluster_summaries.len()
    );

    let lookup = if config.paths.embeddings.exists() {
        let records = normalize_records(load_embeddings(&config.paths.embeddings)?);
        vector_lookup(&records)
    } else {
        warn!(
            "Embeddings file {} not found, skipping cluster merging",
            config.paths.embeddings.display()
        );
        HashMap::new()
    };

    let metadata = MetadataIndex::load(&config.paths.input_csv);
    info!("Metadata available for {} records", metadata.len());
    if !metadata.skipped().is_empty() {
        println!(
            "Skipped unparseable metadata for {} records: {}",
            metadata.skipped().len(),
            metadata.skipped().join(", ")
        );
    }

    let report = generate_report(
        &results,
        &lookup,
        &metadata,
        config.merge.similarity_threshold,
        chrono::Local::now().to_rfc3339(),
    );
    write_json(config.prototypes_path(), &report)?;

    let counts = &report.metadata;
    println!("Original clusters: {}", counts.original_cluster_count);
    println!("Pre-filtered out: {}", counts.pre_filtered_count);
    println!("After pre-filter: {}", counts.clusters_after_prefilter);
    println!("Final prototypes: {}", counts.final_prototype_count);
    println!("  Merged: {}", counts.merged_count);
    println!(
        "  Standalone: {}",
        counts.final_prototype_count - counts.merged_count
    );
    println!("Saved to: {}", config.prototypes_path().display());

    Ok(report)
}

/// Run the clustering and prototype stages, embedding the input first when asked
/// or when no embeddings file exists yet.
#[inline]
pub fn run_pipeline(config: &Config, client: &GeminiClient, embed: bool) -> Result<()> {
    if embed || !config.paths.embeddings.exists() {
        println!("== Embedding ==");
        embed_dataset(config, &embedding_client(client, config))?;
    }

    println!("== Clustering ==");
    run_clustering(config, client)?;

    println!("== Prototypes ==");
    build_prototypes(config)?;

    Ok(())
}

/// Tally the externally assigned clusters of the input CSV and write the analysis.
#[inline]
pub fn analyze_clusters(config: &Config) -> Result<AnalysisReport> {
    let records = read_source_records(&config.paths.input_csv)?;
    println!("Loaded {} records", records.len());

    let report = analyze_records(&records);
    if report.total_clusters == 0 {
        warn!(
            "No rows of {} carry a cluster_hit value",
            config.paths.input_csv.display()
        );
    }

    println!("Found {} clusters", report.total_clusters);
    for (cluster_id, analysis) in &report.cluster_analyses {
        println!("  Cluster {}: {} records", cluster_id, analysis.size);
        for id in &analysis.parse_failures {
            println!("    Could not parse the summary of record {id}");
        }
    }

    write_json(config.cluster_analysis_path(), &report)?;
    println!("Saved to: {}", config.cluster_analysis_path().display());

    Ok(report)
}

/// One status line for a stage artifact: its description when it loads, `(missing)`
/// when the file is absent, or the load error otherwise.
#[inline]
pub fn status_line<T>(
    label: &str,
    path: &Path,
    loaded: crate::Result<T>,
    describe: impl FnOnce(T) -> String,
) -> String {
    match loaded {
        Ok(value) => format!("{label}: {}", describe(value)),
        Err(_) if !path.exists() => format!("{label}: {} (missing)", path.display()),
        Err(e) => format!("{label}: {} (unreadable: {e})", path.display()),
    }
}

/// Print which stage artifacts exist and what they contain.
#[inline]
pub fn show_status(config: &Config) -> Result<()> {
    println!("Pipeline status");
    println!("{}", "=".repeat(50));

    let input = &config.paths.input_csv;
    println!(
        "{}",
        status_line("Input CSV", input, read_source_records(input), |records| {
            format!("{} ({} rows)", input.display(), records.len())
        })
    );

    let embeddings = &config.paths.embeddings;
    println!(
        "{}",
        status_line("Embeddings", embeddings, load_embeddings(embeddings), |records| {
            format!("{} ({} vectors)", embeddings.display(), records.len())
        })
    );

    let path = config.cluster_results_path();
    println!(
        "{}",
        status_line(
            "Cluster results",
            &path,
            read_json::<ClusterResults, _>(&path),
            |results| format!(
                "k = {}, {} summaries over {} samples",
                results.optimal_k,
                results.cluster_summaries.len(),
                results.total_samples
            ),
        )
    );

    let path = config.prototypes_path();
    println!(
        "{}",
        status_line(
            "Prototypes",
            &path,
            read_json::<PrototypeReport, _>(&path),
            |report| format!(
                "{} ({} merged), generated {}",
                report.metadata.final_prototype_count,
                report.metadata.merged_count,
                report.metadata.generation_date
            ),
        )
    );

    let path = config.cluster_analysis_path();
    println!(
        "{}",
        status_line(
            "Cluster analysis",
            &path,
            read_json::<AnalysisReport, _>(&path),
            |report| format!("{} assigned clusters", report.total_clusters),
        )
    );

    Ok(())
}
