pub mod filters;
pub mod intent;
pub mod retrieval;
pub mod sqlite;
pub mod store;

pub use filters::Filters;
pub use intent::{IntentDecision, IntentExtractor, SearchIntent};
pub use retrieval::{Retrieval, Retriever};
pub use sqlite::{FragmentInput, SqliteVectorIndex};
pub use store::{ConstraintMap, RetrievedFragment, VectorIndex};
