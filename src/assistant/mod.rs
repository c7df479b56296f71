//! Answer composition: the exchange-level entry point of the pipeline.

pub mod composer;
pub mod prompts;


pub use composer::AnswerComposer;
