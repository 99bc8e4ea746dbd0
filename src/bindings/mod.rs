pub mod artifacts;
pub mod contracts;

pub use artifacts::{Artifact, ContractKind};
