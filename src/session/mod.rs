pub mod artifact;

pub use artifact::{Artifact, ArtifactContent, ArtifactError, Exchange};
