//! Review analysis for revharvest.
//!
//! Labels harvested or imported reviews with sentiment, aspect and issue type
//! through a [`ReviewClassifier`] (an OpenAI-compatible LLM client or an
//! offline lexicon), groups them by issue type, and builds a Markdown
//! knowledge base with per-category summaries.

pub mod classifier;
pub mod error;
pub mod export;
pub mod llm;
pub mod pipeline;
pub mod scorer;
pub mod spreadsheet;
pub mod types;

pub use classifier::ReviewClassifier;
pub use error::{AnalysisError, ImportError};
pub use export::{knowledge_base_markdown, write_knowledge_base_csv};
pub use llm::{parse_labels, LlmClient};
pub use pipeline::{analyze_reviews, AnalysisOptions, AnalysisReport, AnalysisStats};
pub use scorer::{lexicon_score, LexiconClassifier};
pub use spreadsheet::{load_spreadsheet, read_spreadsheet, ImportedReview};
pub use types::{AnalyzedReview, Labels, ReviewText};
