pub mod filesystem;

pub use filesystem::{ArtifactRef, MediaStorage};
