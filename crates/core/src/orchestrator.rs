//! Query-side orchestration: greeting and page-query short circuits, vector
//! retrieval with one retry, chunk selection, and answer synthesis with a
//! deterministic extraction fallback.

use crate::embeddings::EmbeddingProvider;
use crate::extract::{extract_answer, split_sentences};
use crate::generation::Generator;
use crate::models::QueryResponse;
use crate::pagequery::handle_page_query;
use crate::pages::PageIndex;
use crate::query::extract_search_terms;
use crate::retrieval::{search_documents, select_best_chunks};
use crate::traits::VectorStore;
use std::sync::Arc;
use tracing::{debug, warn};

const GREETINGS: [&str; 6] = [
    "hello",
    "hi",
    "hey",
    "good morning",
    "good afternoon",
    "good evening",
];

/// Neighbors requested from retrieval before re-ranking.
const RETRIEVAL_WIDTH: usize = 30;
const CHUNK_SEPARATOR: &str = "\n\n---\n\n";
const SOURCE_LABEL: &str = "Uploaded Document";

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant that answers questions based on provided document context.";

/// Answer length bounds applied after synthesis.
const TIDY_MAX_CHARS: usize = 800;
const TIDY_MIN_CUT_CHARS: usize = 400;
const TIDY_MIN_SENTENCE_CHARS: usize = 10;
const TIDY_DEDUPE_KEY_CHARS: usize = 100;

/// The query pipeline over an ingested corpus. Generation is optional; when
/// absent (or failing) answers come from deterministic extraction.
pub struct ChatEngine<S: VectorStore> {
    store: Arc<S>,
    pages: Arc<PageIndex>,
    embedder: Arc<EmbeddingProvider>,
    generator: Option<Arc<dyn Generator>>,
}

impl<S: VectorStore> ChatEngine<S> {
    pub fn new(
        store: Arc<S>,
        pages: Arc<PageIndex>,
        embedder: Arc<EmbeddingProvider>,
        generator: Option<Arc<dyn Generator>>,
    ) -> Self {
        Self {
            store,
            pages,
            embedder,
            generator,
        }
    }

    pub async fn query(&self, user_query: &str) -> QueryResponse {
        let query_lower = user_query.trim().to_lowercase();

        let has_documents = match self.store.count().await {
            Ok(count) => count > 0,
            Err(error) => {
                warn!(%error, "vector store count failed, treating corpus as empty");
                false
            }
        };

        if !has_documents {
            let answer = if is_greeting(&query_lower) {
                "Hello! Please upload a document (PDF, DOC, or DOCX) to ask questions about it."
            } else {
                "Please upload a document first. This chatbot answers questions based on your uploaded documents."
            };
            return QueryResponse {
                answer: answer.to_string(),
                sources: Vec::new(),
            };
        }

        if is_greeting(&query_lower) {
            return QueryResponse {
                answer: "Hello! I'm ready to answer questions about your uploaded documents. What would you like to know?".to_string(),
                sources: Vec::new(),
            };
        }

        let (page_answer, page_matched) =
            handle_page_query(&query_lower, &self.pages, self.store.as_ref()).await;
        if page_matched {
            let answer = if page_answer.is_empty() {
                "I couldn't find the requested page. Please make sure the document has been uploaded recently (page information is only available for newly uploaded documents).".to_string()
            } else {
                page_answer
            };
            return QueryResponse {
                answer,
                sources: vec![SOURCE_LABEL.to_string()],
            };
        }

        let mut hits =
            search_documents(&self.embedder, self.store.as_ref(), user_query, RETRIEVAL_WIDTH)
                .await;

        // One retry on the primary term alone; rescues queries whose framing
        // words drag the embedding away from the subject.
        if hits.is_empty() {
            if let Some(primary) = extract_search_terms(user_query).first() {
                debug!(term = %primary, "retrying retrieval with the primary term");
                hits = search_documents(
                    &self.embedder,
                    self.store.as_ref(),
                    primary,
                    RETRIEVAL_WIDTH,
                )
                .await;
            }
        }

        if hits.is_empty() {
            return QueryResponse {
                answer: format!(
                    "I couldn't find any relevant information about '{user_query}' in the uploaded documents. Please check if the term exists in the document."
                ),
                sources: Vec::new(),
            };
        }

        let chunks = select_best_chunks(user_query, &hits);
        if chunks.is_empty() {
            return QueryResponse {
                answer: "I couldn't find relevant information in the uploaded documents. Please try rephrasing your question.".to_string(),
                sources: Vec::new(),
            };
        }

        let answer = self.generate_answer(user_query, &chunks).await;
        QueryResponse {
            answer,
            sources: vec![SOURCE_LABEL.to_string()],
        }
    }

    async fn generate_answer(&self, query: &str, chunks: &[String]) -> String {
        let context = chunks.join(CHUNK_SEPARATOR);

        if let Some(generator) = &self.generator {
            let user_prompt = format!(
                "Answer this question based ONLY on the document content below. Be specific and direct.\n\nQuestion: \"{query}\"\n\nDocument Content:\n{context}\n\nAnswer only what was asked. If asking for a definition, provide the definition from the document:"
            );
            match generator.complete(SYSTEM_PROMPT, &user_prompt).await {
                Ok(answer) => return answer,
                Err(error) => {
                    warn!(%error, "generation failed, falling back to extraction");
                }
            }
        }

        let answer = extract_answer(query, &context);
        if answer.to_lowercase().contains("couldn't find") {
            return answer;
        }
        tidy_answer(&answer)
    }
}

fn is_greeting(query_lower: &str) -> bool {
    query_lower.split_whitespace().count() <= 3
        && GREETINGS
            .iter()
            .any(|greeting| query_lower.contains(greeting))
}

/// Deduplicates near-identical sentences (keyed on their lowercased leading
/// chars) and truncates overlong answers at a sentence boundary when one
/// falls late enough.
fn tidy_answer(answer: &str) -> String {
    let mut seen = Vec::new();
    let mut kept = String::new();

    for sentence in split_sentences(answer) {
        if sentence.text.chars().count() <= TIDY_MIN_SENTENCE_CHARS {
            continue;
        }
        let key: String = sentence
            .text
            .to_lowercase()
            .chars()
            .take(TIDY_DEDUPE_KEY_CHARS)
            .collect();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        kept.push_str(&sentence.text);
        kept.push_str(&sentence.punctuation);
    }

    let mut tidy = kept.trim().to_string();
    if tidy.is_empty() {
        tidy = answer.trim().to_string();
    }

    if tidy.chars().count() > TIDY_MAX_CHARS {
        let head: String = tidy.chars().take(TIDY_MAX_CHARS).collect();
        tidy = match head.rfind(['.', '!', '?']) {
            Some(index) if index > TIDY_MIN_CUT_CHARS => head[..=index].to_string(),
            _ => format!("{head}..."),
        };
    }

    tidy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embeddings::HashEmbedder;
    use crate::error::ProviderError;
    use crate::extractor::fixtures::write_docx;
    use crate::ingest::DocumentIngestor;
    use crate::models::ChunkingConfig;
    use crate::stores::DiskVectorStore;
    use async_trait::async_trait;
    use tempfile::tempdir;

    fn engine(
        store: Arc<DiskVectorStore>,
        pages: Arc<PageIndex>,
        generator: Option<Arc<dyn Generator>>,
    ) -> ChatEngine<DiskVectorStore> {
        let embedder = Arc::new(EmbeddingProvider::new(vec![Box::new(HashEmbedder::default())]));
        ChatEngine::new(store, pages, embedder, generator)
    }

    async fn seeded_engine(
        paragraphs: &[&str],
        generator: Option<Arc<dyn Generator>>,
    ) -> Result<ChatEngine<DiskVectorStore>, Box<dyn std::error::Error>> {
        let dir = tempdir()?;
        let path = dir.path().join("corpus.docx");
        write_docx(&path, paragraphs)?;

        let store = Arc::new(DiskVectorStore::in_memory());
        let pages = Arc::new(PageIndex::new());
        let embedder = Arc::new(EmbeddingProvider::new(vec![Box::new(HashEmbedder::default())]));
        let ingestor = DocumentIngestor::new(
            Arc::clone(&store),
            Arc::clone(&pages),
            Arc::clone(&embedder),
            ChunkingConfig::default(),
        );
        ingestor.ingest_file(&path).await?;

        Ok(ChatEngine::new(store, pages, embedder, generator))
    }

    struct CannedGenerator(&'static str);

    #[async_trait]
    impl Generator for CannedGenerator {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, ProviderError> {
            Ok(self.0.to_string())
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl Generator for FailingGenerator {
        async fn complete(&self, _system: &str, _user: &str) -> Result<String, ProviderError> {
            Err(ProviderError::BadResponse {
                provider: "test".to_string(),
                details: "down".to_string(),
            })
        }
    }

    #[tokio::test]
    async fn empty_corpus_asks_for_an_upload() {
        let engine = engine(
            Arc::new(DiskVectorStore::in_memory()),
            Arc::new(PageIndex::new()),
            None,
        );

        let response = engine.query("what is a complete graph").await;
        assert_eq!(
            response.answer,
            "Please upload a document first. This chatbot answers questions based on your uploaded documents."
        );
        assert!(response.sources.is_empty());
    }

    #[tokio::test]
    async fn greeting_without_documents_mentions_supported_formats() {
        let engine = engine(
            Arc::new(DiskVectorStore::in_memory()),
            Arc::new(PageIndex::new()),
            None,
        );

        let response = engine.query("Hello!").await;
        assert!(response.answer.contains("PDF, DOC, or DOCX"));
        assert!(response.sources.is_empty());
    }

    #[tokio::test]
    async fn greeting_with_documents_invites_questions() -> Result<(), Box<dyn std::error::Error>>
    {
        let engine = seeded_engine(&["A tree is a connected acyclic graph."], None).await?;

        let response = engine.query("good morning").await;
        assert!(response.answer.contains("ready to answer questions"));
        Ok(())
    }

    #[tokio::test]
    async fn long_sentences_containing_a_greeting_word_are_not_greetings(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let engine =
            seeded_engine(&["The hi-hat is a percussion instrument with two cymbals."], None)
                .await?;

        let response = engine.query("tell me about the hi-hat instrument please").await;
        assert!(!response.answer.contains("ready to answer questions"));
        Ok(())
    }

    #[tokio::test]
    async fn page_queries_short_circuit_retrieval() -> Result<(), Box<dyn std::error::Error>> {
        let engine = seeded_engine(&["Everything lives on one page here."], None).await?;

        let response = engine.query("What is on page 1?").await;
        assert!(response.answer.starts_with("**Page 1 of 1:**"));
        assert!(response.answer.contains("Everything lives on one page here."));
        assert_eq!(response.sources, vec![SOURCE_LABEL.to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn extraction_answers_definition_questions_end_to_end(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let engine = seeded_engine(
            &[
                "A complete graph is a graph in which every pair of vertices is connected by an edge.",
                "A tree is a connected acyclic graph used throughout computer science.",
            ],
            None,
        )
        .await?;

        let response = engine.query("What is a complete graph?").await;
        assert!(response.answer.contains("every pair of vertices"));
        assert_eq!(response.sources, vec![SOURCE_LABEL.to_string()]);
        Ok(())
    }

    #[tokio::test]
    async fn generator_output_is_preferred_when_available(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let engine = seeded_engine(
            &["A complete graph is a graph in which every pair of vertices is connected."],
            Some(Arc::new(CannedGenerator("Generated summary."))),
        )
        .await?;

        let response = engine.query("What is a complete graph?").await;
        assert_eq!(response.answer, "Generated summary.");
        Ok(())
    }

    #[tokio::test]
    async fn failed_generation_falls_back_to_extraction(
    ) -> Result<(), Box<dyn std::error::Error>> {
        let engine = seeded_engine(
            &["A complete graph is a graph in which every pair of vertices is connected."],
            Some(Arc::new(FailingGenerator)),
        )
        .await?;

        let response = engine.query("What is a complete graph?").await;
        assert!(response.answer.contains("every pair of vertices"));
        Ok(())
    }

    #[tokio::test]
    async fn unknown_terms_report_not_found() -> Result<(), Box<dyn std::error::Error>> {
        let engine = seeded_engine(
            &["A tree is a connected acyclic graph."],
            None,
        )
        .await?;

        let response = engine.query("What is a dodecahedron?").await;
        assert!(response.answer.to_lowercase().contains("couldn't find"));
        Ok(())
    }

    #[test]
    fn tidy_answer_drops_repeated_sentences() {
        let answer = "A graph is a set of vertices and edges. A graph is a set of vertices and edges. A tree has no cycles anywhere.";
        let tidy = tidy_answer(answer);
        assert_eq!(
            tidy,
            "A graph is a set of vertices and edges. A tree has no cycles anywhere."
        );
    }

    #[test]
    fn tidy_answer_truncates_at_a_late_sentence_boundary() {
        // Sentences are numbered so deduplication keeps all of them.
        let long: String = (0..20)
            .map(|i| format!("Sentence number {i} pads the answer out toward the limit. "))
            .collect();
        assert!(long.len() > 800);

        let tidy = tidy_answer(&long);
        assert!(tidy.chars().count() <= 800);
        assert!(tidy.ends_with('.'));
    }

    #[test]
    fn tidy_answer_appends_ellipsis_when_no_boundary_is_late_enough() {
        let long = "word ".repeat(300);
        let tidy = tidy_answer(&long);
        assert!(tidy.ends_with("..."));
        assert!(tidy.chars().count() <= 803);
    }
}
