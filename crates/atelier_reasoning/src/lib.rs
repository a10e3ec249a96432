pub mod api_types;
pub mod classifier;
pub mod extraction;
pub mod llm;
pub mod prompts;
pub mod providers;
pub mod replies;
pub mod responder;
pub mod retry;
pub mod router;

pub use classifier::{Classifier, KeywordClassifier, LlmClassifier};
pub use extraction::FilterExtractor;
pub use llm::{create_client, CompletionParams, LlmClient};
pub use responder::{CannedResponder, LlmResponder, Responder};
pub use router::{AnalysisDetails, AnalysisReport, FallbackSnapshot, PersonaRouter, Reply};
