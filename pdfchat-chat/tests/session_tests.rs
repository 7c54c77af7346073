//! Query-flow tests: a real index on disk, a scripted model.

use std::sync::Arc;

use pdfchat_chat::{
    ChatError, ChatSession, ConversationMode, ConversationState, GeneratorConfig, Readiness,
};
use pdfchat_model::{MockLlm, Role};
use pdfchat_rag::{
    Document, HashEmbeddingProvider, IndexLocation, IngestPipeline, RagConfig, RagError,
    TextLoader,
};
use tempfile::TempDir;

const ATLAS: &str = "Nepal is a country in South Asia.\x0C\
Kathmandu is the capital of Nepal.\x0C\
The Pacific is the largest ocean on Earth.";

async fn ingest(text: &str) -> (TempDir, IndexLocation) {
    let dir = tempfile::tempdir().unwrap();
    let location = IndexLocation::new(dir.path().join("vectorstores"), "vector_space");
    IngestPipeline::builder()
        .config(RagConfig::default())
        .embedding_provider(Arc::new(HashEmbeddingProvider::default()))
        .loader(Arc::new(TextLoader::new()))
        .build()
        .unwrap()
        .ingest(&Document::from_bytes("atlas.txt", text), &location)
        .await
        .unwrap();
    (dir, location)
}

async fn session(location: &IndexLocation, llm: Arc<MockLlm>, mode: ConversationMode) -> ChatSession {
    let readiness = ChatSession::initialize(
        location,
        Arc::new(HashEmbeddingProvider::default()),
        llm,
        &RagConfig::default(),
        GeneratorConfig::default().with_mode(mode),
    )
    .await;
    readiness.into_result().unwrap()
}

#[tokio::test]
async fn missing_index_is_not_ready() {
    let dir = tempfile::tempdir().unwrap();
    let readiness = ChatSession::initialize(
        &IndexLocation::new(dir.path(), "vector_space"),
        Arc::new(HashEmbeddingProvider::default()),
        Arc::new(MockLlm::new("mock")),
        &RagConfig::default(),
        GeneratorConfig::default(),
    )
    .await;

    assert!(!readiness.is_ready());
    assert!(matches!(readiness, Readiness::NotReady(RagError::IndexNotFound { .. })));
}

#[tokio::test]
async fn incompatible_embedder_is_not_ready() {
    let (_dir, location) = ingest("Nepal is a country in South Asia.").await;
    let readiness = ChatSession::initialize(
        &location,
        Arc::new(HashEmbeddingProvider::new(64).unwrap()),
        Arc::new(MockLlm::new("mock")),
        &RagConfig::default(),
        GeneratorConfig::default(),
    )
    .await;

    assert!(matches!(readiness, Readiness::NotReady(RagError::ConfigError(_))));
}

#[tokio::test]
async fn single_chunk_question_is_answered_from_that_chunk() {
    let (_dir, location) = ingest("Nepal is a country in South Asia.").await;
    let llm = Arc::new(MockLlm::new("mock").with_response("Nepal is in South Asia."));
    let mut session = session(&location, llm.clone(), ConversationMode::Condense).await;

    let answer = session.ask("Where is Nepal?").await.unwrap().expect("an answer");

    assert_eq!(answer.text, "Nepal is in South Asia.");
    assert_eq!(answer.standalone_question, None);
    assert_eq!(answer.sources.len(), 1);
    assert_eq!(answer.sources[0].chunk.text, "Nepal is a country in South Asia.");

    let requests = llm.requests().await;
    assert_eq!(requests.len(), 1);
    let prompt = requests[0].last_user_message().unwrap_or_default();
    assert!(prompt.contains("Nepal is a country in South Asia.\n\nQuestion: Where is Nepal?"));
    assert!(prompt.ends_with("say 'I don't know'."));
    assert_eq!(session.conversation().state(), ConversationState::Active);
}

#[tokio::test]
async fn blank_question_is_a_no_op() {
    let (_dir, location) = ingest(ATLAS).await;
    let llm = Arc::new(MockLlm::new("mock"));
    let mut session = session(&location, llm.clone(), ConversationMode::Condense).await;

    assert!(session.ask("").await.unwrap().is_none());
    assert!(session.ask("   \n").await.unwrap().is_none());
    assert_eq!(llm.call_count().await, 0);
    assert_eq!(session.conversation().state(), ConversationState::Uninitialized);
}

#[tokio::test]
async fn follow_up_is_condensed_before_retrieval() {
    let (_dir, location) = ingest(ATLAS).await;
    let llm = Arc::new(
        MockLlm::new("mock")
            .with_response("Nepal is in South Asia.")
            .with_response("What is the capital of Nepal?")
            .with_response("Kathmandu."),
    );
    let mut session = session(&location, llm.clone(), ConversationMode::Condense).await;

    session.ask("Where is Nepal?").await.unwrap();
    let answer = session.ask("And its capital?").await.unwrap().expect("an answer");

    assert_eq!(answer.text, "Kathmandu.");
    assert_eq!(answer.standalone_question.as_deref(), Some("What is the capital of Nepal?"));
    assert_eq!(answer.sources[0].chunk.text, "Kathmandu is the capital of Nepal.");

    let requests = llm.requests().await;
    assert_eq!(requests.len(), 3);
    let condense = requests[1].last_user_message().unwrap_or_default();
    assert!(condense.contains("Human: Where is Nepal?\nAssistant: Nepal is in South Asia."));
    assert!(condense.contains("Follow Up Input: And its capital?"));
    let qa = requests[2].last_user_message().unwrap_or_default();
    assert!(qa.contains("Question: What is the capital of Nepal?"));

    let turns = session.conversation().turns();
    assert_eq!(turns[1].question, "And its capital?");
}

#[tokio::test]
async fn cleared_history_is_not_sent() {
    let (_dir, location) = ingest(ATLAS).await;
    let llm = Arc::new(MockLlm::new("mock").with_response("South Asia.").with_response("Kathmandu."));
    let mut session = session(&location, llm.clone(), ConversationMode::Condense).await;

    session.ask("Where is Nepal?").await.unwrap();
    session.clear_history();
    assert_eq!(session.conversation().state(), ConversationState::Uninitialized);

    let answer = session.ask("What is the capital of Nepal?").await.unwrap().expect("an answer");
    assert_eq!(answer.standalone_question, None);
    assert_eq!(llm.call_count().await, 2);
    let last = &llm.requests().await[1];
    assert_eq!(last.messages.len(), 1);
    assert!(!last.messages[0].content.contains("Human:"));
}

#[tokio::test]
async fn transcript_mode_sends_prior_turns_as_messages() {
    let (_dir, location) = ingest(ATLAS).await;
    let llm = Arc::new(MockLlm::new("mock").with_response("South Asia.").with_response("Kathmandu."));
    let mut session = session(&location, llm.clone(), ConversationMode::Transcript).await;

    session.ask("Where is Nepal?").await.unwrap();
    session.ask("What is the capital of Nepal?").await.unwrap();

    let requests = llm.requests().await;
    assert_eq!(requests.len(), 2);
    let roles: Vec<Role> = requests[1].messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, vec![Role::User, Role::Assistant, Role::User]);
    assert_eq!(requests[1].messages[0].content, "Where is Nepal?");
}

#[tokio::test]
async fn model_failure_is_surfaced_and_not_remembered() {
    let (_dir, location) = ingest(ATLAS).await;
    let llm = Arc::new(MockLlm::new("mock").with_error("rate limit exceeded"));
    let mut session = session(&location, llm, ConversationMode::Condense).await;

    let err = session.ask("Where is Nepal?").await.unwrap_err();

    assert!(matches!(err, ChatError::Model(_)));
    assert!(err.to_string().contains("rate limit exceeded"));
    assert!(session.conversation().is_empty());
}

#[tokio::test]
async fn answered_question_is_logged_with_counts() {
    let store = pdfchat_telemetry::EventStore::new();
    let _guard = tracing::subscriber::set_default(pdfchat_telemetry::capture_subscriber(store.clone()));

    let (_dir, location) = ingest(ATLAS).await;
    let llm = Arc::new(MockLlm::new("mock").with_response("South Asia."));
    let mut session = session(&location, llm, ConversationMode::Condense).await;
    session.ask("Where is Nepal?").await.unwrap();

    let event = store.find("answered question").expect("completion event");
    assert_eq!(event.level, "INFO");
    assert_eq!(event.u64_field("source_count"), Some(3));
    assert_eq!(event.u64_field("history_turns"), Some(1));
    assert!(store.find("chat session ready").is_some());
}
