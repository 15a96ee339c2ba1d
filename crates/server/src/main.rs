//! Climate agent server binary
//!
//! Wires capabilities into the pipeline and serves the HTTP API. All
//! backends are constructed here; the pipeline itself owns no clients.

use std::sync::Arc;

use anyhow::Context;
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use climate_agent_cache::MemoryStore;
use climate_agent_config::{load_settings, BackendEndpoint, Settings};
use climate_agent_core::{
    CacheStore, ClassifierModel, Document, Embedder, FaithfulnessScorer, ResponseModel, Translator,
};
use climate_agent_llm::{
    ChatConfig, GeneratorConfig, HttpChatBackend, LlmFaithfulnessScorer, ResponseGenerator,
};
use climate_agent_pipeline::ClimatePipeline;
use climate_agent_rag::{
    DocumentRetriever, EmbeddingConfig, HttpEmbedder, LexicalReranker, MemoryVectorIndex,
    RetrieverConfig,
};
use climate_agent_server::{create_router, init_metrics, AppState};

/// One document in the startup corpus file
#[derive(Debug, Deserialize)]
struct CorpusDoc {
    title: String,
    #[serde(default)]
    url: String,
    content: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args().nth(1);
    let settings = load_settings(config_path.as_deref()).context("loading settings")?;
    init_metrics();

    let pipeline = build_pipeline(&settings).await?;
    let state = AppState::new(Arc::new(pipeline), Arc::new(settings.clone()));
    let app = create_router(state);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "climate agent listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    Ok(())
}

async fn build_pipeline(settings: &Settings) -> anyhow::Result<ClimatePipeline> {
    let primary = Arc::new(HttpChatBackend::new(chat_config(&settings.backend.primary))?);
    let secondary = Arc::new(HttpChatBackend::new(chat_config(&settings.backend.secondary))?);

    let embedder: Arc<dyn Embedder> = Arc::new(HttpEmbedder::new(EmbeddingConfig {
        endpoint: settings.backend.primary.endpoint.clone(),
        ..EmbeddingConfig::default()
    })?);
    let index = Arc::new(MemoryVectorIndex::new());

    if let Some(path) = &settings.server.corpus_path {
        let raw = std::fs::read_to_string(path).with_context(|| format!("reading corpus {path}"))?;
        let corpus: Vec<CorpusDoc> = serde_json::from_str(&raw).context("parsing corpus")?;
        let docs: Vec<Document> = corpus
            .into_iter()
            .map(|d| Document::new(d.title, d.url, d.content))
            .collect();
        let indexed = index
            .index_documents(&embedder, &docs)
            .await
            .map_err(|e| anyhow::anyhow!("indexing corpus: {e}"))?;
        tracing::info!(indexed, path, "corpus indexed");
    } else {
        tracing::warn!("no corpus configured; retrieval will return no documents");
    }

    let retriever = DocumentRetriever::new(
        embedder,
        index,
        Arc::new(LexicalReranker::new()),
        RetrieverConfig {
            top_k: settings.pipeline.retriever_top_k,
            final_n: settings.pipeline.retriever_final_n,
        },
    );

    let generator = ResponseGenerator::new(
        Arc::clone(&primary) as Arc<dyn ResponseModel>,
        Arc::clone(&secondary) as Arc<dyn ResponseModel>,
        Arc::clone(&primary) as Arc<dyn ClassifierModel>,
        GeneratorConfig {
            cache_enabled: settings.pipeline.generator_cache_enabled,
            ..GeneratorConfig::default()
        },
    );

    let scorer: Arc<dyn FaithfulnessScorer> = Arc::new(LlmFaithfulnessScorer::new(
        Arc::clone(&primary) as Arc<dyn ClassifierModel>,
    ));

    Ok(ClimatePipeline::new(
        Arc::clone(&primary) as Arc<dyn ClassifierModel>,
        generator,
        retriever,
        scorer,
        Arc::clone(&primary) as Arc<dyn Translator>,
        Arc::new(MemoryStore::new()) as Arc<dyn CacheStore>,
        settings.pipeline.clone(),
    ))
}

fn chat_config(endpoint: &BackendEndpoint) -> ChatConfig {
    ChatConfig {
        model: endpoint.model.clone(),
        endpoint: endpoint.endpoint.clone(),
        api_key: endpoint.api_key.clone(),
        max_tokens: endpoint.max_tokens,
        temperature: endpoint.temperature,
        timeout: std::time::Duration::from_secs(endpoint.timeout_secs),
        ..ChatConfig::default()
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
