//! Repository analysis primitives: structure normalization and heuristic
//! code scanning. Both are pure functions the pipeline drives.

pub mod scanner;
pub mod structure;

pub use scanner::{ScanResult, scan};
pub use structure::{
    DirectoryEntry, EcosystemScore, FileEntry, HierarchyNode, KeyDirectory, NodeKind,
    StructureStats, StructureTree, detect_project_types, identify_important_files,
    identify_key_directories, normalize,
};
