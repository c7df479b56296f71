pub mod assistant;
pub mod catalog;
pub mod core;
pub mod history;
pub mod llm;
pub mod rag;
pub mod server;
pub mod session;
pub mod state;

#[cfg(test)]
mod testing;
