//! askdb-answer
//!
//! Retrieval-augmented answering: fused passages and the question go to a
//! language model, the answer comes back with its supporting passages.

pub mod answerer;
pub mod llm;

pub use answerer::{Answer, AnswerOptions, Answerer, Passage};
pub use llm::{ChatClient, ChatClientOptions};
