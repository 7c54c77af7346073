//! Subcommand implementations.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use pdfchat_chat::{Answer, ChatSession, Readiness};
use pdfchat_model::groq::GroqClient;
use pdfchat_rag::{DocumentLoader, IngestPipeline, IngestReport, PdfLoader, TextLoader};
use tracing::{debug, info};

use crate::cli::{Cli, Command, EmbeddingArgs, IndexArgs, ModelArgs};
use crate::console;

/// Run the parsed command line.
pub async fn run(cli: Cli) -> Result<()> {
    match &cli.command {
        Command::Ingest { document } => {
            let report = ingest(&cli.index, &cli.embedding, document).await?;
            println!(
                "Vector store created at {} ({} pages, {} chunks).",
                report.location, report.pages, report.chunks
            );
        }
        Command::Ask { model, json, no_sources, question } => {
            let question = question.join(" ");
            match ask(&cli.index, &cli.embedding, model, &question).await? {
                Some(answer) if *json => println!("{}", serde_json::to_string_pretty(&answer)?),
                Some(answer) => println!("{}", console::render_answer(&answer, !no_sources)),
                None => debug!("blank question, nothing to answer"),
            }
        }
        Command::Chat { model, sources } => {
            let session = open_session(&cli.index, &cli.embedding, model).await?;
            console::run_repl(session, *sources).await?;
        }
    }
    Ok(())
}

/// Loader for a document path: `.txt` as plain text, anything else as PDF.
pub fn loader_for(path: &Path) -> Arc<dyn DocumentLoader> {
    let is_text = path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("txt"));
    if is_text { Arc::new(TextLoader::new()) } else { Arc::new(PdfLoader::new()) }
}

/// Build and save the vector store for `document`.
pub async fn ingest(
    index: &IndexArgs,
    embedding: &EmbeddingArgs,
    document: &Path,
) -> Result<IngestReport> {
    let pipeline = IngestPipeline::builder()
        .config(index.rag_config()?)
        .embedding_provider(embedding.embedder()?)
        .loader(loader_for(document))
        .build()?;

    let report = pipeline
        .ingest_path(document, &index.location())
        .await
        .with_context(|| format!("failed to ingest {}", document.display()))?;
    info!(location = %report.location, dimensions = report.dimensions, "vector store created");
    Ok(report)
}

/// Load the vector store and connect the model.
pub async fn open_session(
    index: &IndexArgs,
    embedding: &EmbeddingArgs,
    model: &ModelArgs,
) -> Result<ChatSession> {
    let llm = Arc::new(GroqClient::new(model.groq_config()?)?);
    let readiness = ChatSession::initialize(
        &index.location(),
        embedding.embedder()?,
        llm,
        &index.rag_config()?,
        model.generator_config(),
    )
    .await;

    match readiness {
        Readiness::Ready(session) => Ok(session),
        Readiness::NotReady(e) => bail!(
            "vector store at {} is not ready: {e}\nRun `pdfchat ingest <pdf>` first.",
            index.location()
        ),
    }
}

/// Answer one question in a fresh session.
///
/// A blank question returns `Ok(None)` before the vector store or the model
/// is touched.
pub async fn ask(
    index: &IndexArgs,
    embedding: &EmbeddingArgs,
    model: &ModelArgs,
    question: &str,
) -> Result<Option<Answer>> {
    if question.trim().is_empty() {
        return Ok(None);
    }
    let mut session = open_session(index, embedding, model).await?;
    Ok(session.ask(question).await?)
}
