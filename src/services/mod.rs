pub mod artifact;
pub mod enumerator;
pub mod ledger;

pub use artifact::ArtifactWatcher;
pub use enumerator::{DiscoveryReport, Enumerator};
pub use ledger::Ledger;
