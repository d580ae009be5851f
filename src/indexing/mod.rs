//! Local document indexing on top of the workflow engine.

pub mod handlers;
pub mod pipeline;
pub mod stages;
pub mod tokenizer;
pub mod types;

#[cfg(test)]
mod tests;
