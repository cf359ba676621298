use crate::aggregator::{aggregate, FileDocument, RunSummary, SummaryContent};
use crate::config::PipelineConfig;
use crate::error::{PipelineError, Result};
use crate::provider::FileProvider;
use crate::summary::{file_summary_chunk, overview_chunk};
use crate::writer::OutputWriter;
use codedoc_cache::{
    CacheBackend, CacheStats, CacheStore, FileCacheStore, FingerprintCache, MemoryCacheStore,
};
use codedoc_chunker::{Chunk, Chunker, Language};
use codedoc_generation::{
    GenerationScheduler, PromptTemplate, SchedulerSnapshot, TextGenerationBackend,
};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Outcome of one run: documents in provider order plus totals
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub documents: Vec<FileDocument>,
    /// Set when the project overview pass is enabled and had input
    pub project_overview: Option<SummaryContent>,
    /// Unit outcomes; summary passes are not counted
    pub summary: RunSummary,
    pub cancelled: bool,
    pub cache: CacheStats,
    pub scheduler: SchedulerSnapshot,
}

impl RunReport {
    pub fn write_to(&self, writer: &mut dyn OutputWriter) -> Result<()> {
        for document in &self.documents {
            writer.write_file(document)?;
        }
        Ok(())
    }
}

struct PlannedFile {
    path: String,
    language: Language,
    chunks: Vec<Arc<Chunk>>,
}

/// Files in, documentation out
pub struct DocPipeline {
    config: PipelineConfig,
    chunker: Chunker,
    scheduler: GenerationScheduler,
    file_summarizer: Option<GenerationScheduler>,
    overview: Option<GenerationScheduler>,
    file_store: Option<Arc<FileCacheStore>>,
}

impl DocPipeline {
    /// Pipeline with the cache backend and template version from `config`
    pub fn new(config: PipelineConfig, backend: Arc<dyn TextGenerationBackend>) -> Result<Self> {
        config.validate()?;
        let template = PromptTemplate::with_version(config.prompt_template_version.clone());
        let (cache, file_store) = open_cache(&config);
        Self::assemble(config, backend, cache, template, file_store)
    }

    /// Pipeline with caller-supplied cache and template; the template's
    /// version replaces the configured one.
    pub fn with_parts(
        mut config: PipelineConfig,
        backend: Arc<dyn TextGenerationBackend>,
        cache: FingerprintCache,
        template: PromptTemplate,
    ) -> Result<Self> {
        config.prompt_template_version = template.version.clone();
        config.validate()?;
        Self::assemble(config, backend, cache, template, None)
    }

    fn assemble(
        config: PipelineConfig,
        backend: Arc<dyn TextGenerationBackend>,
        cache: FingerprintCache,
        template: PromptTemplate,
        file_store: Option<Arc<FileCacheStore>>,
    ) -> Result<Self> {
        let chunker = Chunker::new(config.chunker_config())?;
        let settings = config.scheduler_settings();
        let summaries = &config.summaries;

        let file_summarizer = if summaries.file_summaries {
            Some(GenerationScheduler::new(
                backend.clone(),
                PromptTemplate::file_summary(summaries.file_template_version.clone()),
                cache.clone(),
                settings.clone(),
            )?)
        } else {
            None
        };
        let overview = if summaries.project_overview {
            Some(GenerationScheduler::new(
                backend.clone(),
                PromptTemplate::project_overview(summaries.overview_template_version.clone()),
                cache.clone(),
                settings.clone(),
            )?)
        } else {
            None
        };
        let scheduler = GenerationScheduler::new(backend, template, cache, settings)?;

        Ok(Self {
            config,
            chunker,
            scheduler,
            file_summarizer,
            overview,
            file_store,
        })
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Subscribe to unit events or read the concurrency gauge while a run is going
    #[must_use]
    pub fn scheduler(&self) -> &GenerationScheduler {
        &self.scheduler
    }

    /// Document every file the provider yields.
    ///
    /// A provider error or a repeated path aborts the run before any backend
    /// call. Chunk failures and cancellation do not: they show up as failure
    /// markers in the report.
    pub async fn run(
        &self,
        provider: &mut dyn FileProvider,
        cancel: &CancellationToken,
    ) -> Result<RunReport> {
        let mut files = Vec::new();
        let mut seen = HashSet::new();
        while let Some(next) = provider.next_file() {
            let file = next?;
            if !seen.insert(file.path.clone()) {
                return Err(PipelineError::DuplicatePath(file.path));
            }
            let language = file.language();
            let chunks: Vec<Arc<Chunk>> = self
                .chunker
                .chunk(&file.path, &file.text, language)
                .into_iter()
                .map(Arc::new)
                .collect();
            files.push(PlannedFile {
                path: file.path,
                language,
                chunks,
            });
        }

        let all: Vec<Arc<Chunk>> = files
            .iter()
            .flat_map(|file| file.chunks.iter().cloned())
            .collect();
        log::info!(
            "documenting {} chunks from {} files",
            all.len(),
            files.len()
        );

        let results = self.scheduler.generate(&all, cancel).await;

        let mut documents = Vec::with_capacity(files.len());
        let mut summary = RunSummary::default();
        for file in &files {
            let (document, counts) = aggregate(&file.path, file.language, &file.chunks, &results);
            summary += counts;
            documents.push(document);
        }

        if let Some(summarizer) = &self.file_summarizer {
            summarize_files(summarizer, &mut documents, cancel).await;
        }
        let project_overview = match &self.overview {
            Some(overview) => self.summarize_project(overview, &documents, cancel).await,
            None => None,
        };

        if let Some(store) = &self.file_store {
            if self.config.cache.max_bytes > 0 {
                if let Err(err) = store.prune(self.config.cache.max_bytes).await {
                    log::warn!("cache prune failed: {err}");
                }
            }
        }

        let cancelled = cancel.is_cancelled();
        log::info!(
            "run finished: {} succeeded, {} failed, {} skipped{}",
            summary.succeeded,
            summary.failed,
            summary.skipped,
            if cancelled { " (cancelled)" } else { "" }
        );

        Ok(RunReport {
            documents,
            project_overview,
            summary,
            cancelled,
            cache: self.scheduler.cache().stats(),
            scheduler: self.scheduler.snapshot(),
        })
    }

    async fn summarize_project(
        &self,
        overview: &GenerationScheduler,
        documents: &[FileDocument],
        cancel: &CancellationToken,
    ) -> Option<SummaryContent> {
        let summaries = &self.config.summaries;
        let chunk = Arc::new(overview_chunk(
            documents,
            summaries.overview_max_files,
            summaries.overview_excerpt_chars,
        )?);
        log::info!("writing project overview from {} files", chunk.units.len());
        let results = overview.generate(std::slice::from_ref(&chunk), cancel).await;
        Some(SummaryContent::from_result(results.get(&chunk.id)))
    }
}

/// Attach a summary to every document that has explanations to summarize
async fn summarize_files(
    summarizer: &GenerationScheduler,
    documents: &mut [FileDocument],
    cancel: &CancellationToken,
) {
    let planned: Vec<(usize, Arc<Chunk>)> = documents
        .iter()
        .enumerate()
        .filter_map(|(idx, document)| file_summary_chunk(document).map(|c| (idx, Arc::new(c))))
        .collect();
    if planned.is_empty() {
        return;
    }
    log::info!("summarizing {} files", planned.len());

    let chunks: Vec<Arc<Chunk>> = planned.iter().map(|(_, chunk)| chunk.clone()).collect();
    let results = summarizer.generate(&chunks, cancel).await;
    for (idx, chunk) in planned {
        documents[idx].file_summary = Some(SummaryContent::from_result(results.get(&chunk.id)));
    }
}

fn open_cache(config: &PipelineConfig) -> (FingerprintCache, Option<Arc<FileCacheStore>>) {
    let reuse = config.cache.reuse_failed_results;
    match config.cache.backend {
        CacheBackend::File => {
            let store = Arc::new(FileCacheStore::new(
                &config.cache.dir,
                &config.prompt_template_version,
            ));
            let shared: Arc<dyn CacheStore> = store.clone();
            (FingerprintCache::new(shared, reuse), Some(store))
        }
        CacheBackend::Memory => {
            let store: Arc<dyn CacheStore> = Arc::new(MemoryCacheStore::new(config.cache.capacity));
            (FingerprintCache::new(store, reuse), None)
        }
    }
}
