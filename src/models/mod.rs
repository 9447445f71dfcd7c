pub mod leaf;

pub use leaf::{artifact_file_name, Leaf, LeafId, LeafPath, SelectOption, YearRange};
