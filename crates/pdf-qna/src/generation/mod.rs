//! Answer generation: prompt construction and the retrieval QA chain

pub mod prompt;
pub mod qa;

pub use prompt::PromptBuilder;
pub use qa::RetrievalQa;
