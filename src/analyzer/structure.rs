//! Structure Normalizer
//!
//! Turns the raw recursive tree listing reported by the repository host
//! into a filtered, categorized, depth-annotated structure plus a computed
//! hierarchy. Pure functions of the input listing: an empty or malformed
//! listing yields an empty structure, never an error.
//!
//! Secondary responsibilities for the pipeline: important-file selection,
//! key-directory identification, and ecosystem detection — all driven by
//! the ordered pattern tables in [`crate::constants::structure`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::constants::structure as tables;
use crate::github::TreeEntry;

// =============================================================================
// Normalized Structure Types
// =============================================================================

/// A directory surviving the ignore filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectoryEntry {
    pub name: String,
    pub depth: usize,
}

/// A file surviving the ignore filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileEntry {
    pub name: String,
    pub extension: String,
    pub size: Option<u64>,
    pub depth: usize,
}

/// Aggregate counts over the filtered listing
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructureStats {
    pub total_files: u64,
    pub total_dirs: u64,
    /// Extension → file count histogram
    pub files_by_type: BTreeMap<String, u64>,
}

/// One node of the computed hierarchy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: NodeKind,
    pub children: Vec<HierarchyNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Directory,
    File,
}

/// The normalized structure stored on the analysis record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructureTree {
    pub directories: BTreeMap<String, DirectoryEntry>,
    pub files: BTreeMap<String, FileEntry>,
    pub stats: StructureStats,
    pub hierarchy: HierarchyNode,
}

/// A key directory matched against the pattern table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeyDirectory {
    pub path: String,
    pub name: String,
    pub description: String,
}

/// Ecosystem detection result, ranked by confidence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EcosystemScore {
    pub ecosystem: String,
    /// Matched indicators / total indicators for this ecosystem
    pub confidence: f64,
}

// =============================================================================
// Normalizer
// =============================================================================

/// Normalize a raw recursive listing into a [`StructureTree`]
pub fn normalize(tree: &[TreeEntry]) -> StructureTree {
    let filtered: Vec<&TreeEntry> = tree
        .iter()
        .filter(|entry| (entry.is_directory() || entry.is_file()) && !is_ignored(&entry.path))
        .collect();

    let mut directories = BTreeMap::new();
    let mut files = BTreeMap::new();
    let mut stats = StructureStats::default();

    for entry in &filtered {
        let segments: Vec<&str> = entry.path.split('/').collect();
        let depth = segments.len();
        let name = segments.last().copied().unwrap_or_default().to_string();

        if entry.is_directory() {
            stats.total_dirs += 1;
            directories.insert(entry.path.clone(), DirectoryEntry { name, depth });
        } else {
            stats.total_files += 1;
            let extension = file_extension(&name);
            *stats.files_by_type.entry(extension.clone()).or_insert(0) += 1;
            files.insert(
                entry.path.clone(),
                FileEntry {
                    name,
                    extension,
                    size: entry.size,
                    depth,
                },
            );
        }
    }

    let hierarchy = build_hierarchy(&filtered);

    StructureTree {
        directories,
        files,
        stats,
        hierarchy,
    }
}

/// Check whether a path contains any ignored token
fn is_ignored(path: &str) -> bool {
    tables::IGNORED_PATH_TOKENS
        .iter()
        .any(|token| path.contains(token))
}

/// Extension after the final `.` of the file name, or the sentinel
fn file_extension(file_name: &str) -> String {
    match file_name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext.to_string(),
        _ => tables::NO_EXTENSION.to_string(),
    }
}

/// Build a single rooted hierarchy from the filtered listing.
///
/// Idempotent: each path prefix maps to exactly one node, created the
/// first time any entry requires it as an ancestor and linked once to its
/// parent. Intermediate prefixes are directories; the final segment takes
/// the entry's own kind.
fn build_hierarchy(entries: &[&TreeEntry]) -> HierarchyNode {
    let mut root = HierarchyNode {
        name: "root".to_string(),
        path: String::new(),
        kind: NodeKind::Directory,
        children: Vec::new(),
    };

    for entry in entries {
        let segments: Vec<&str> = entry.path.split('/').collect();
        let mut node = &mut root;
        let mut current_path = String::new();

        for (index, segment) in segments.iter().enumerate() {
            if !current_path.is_empty() {
                current_path.push('/');
            }
            current_path.push_str(segment);

            let is_last = index == segments.len() - 1;
            let kind = if is_last && !entry.is_directory() {
                NodeKind::File
            } else {
                NodeKind::Directory
            };

            let position = node
                .children
                .iter()
                .position(|child| child.path == current_path);
            let child_index = match position {
                Some(existing) => existing,
                None => {
                    node.children.push(HierarchyNode {
                        name: segment.to_string(),
                        path: current_path.clone(),
                        kind,
                        children: Vec::new(),
                    });
                    node.children.len() - 1
                }
            };
            node = &mut node.children[child_index];
        }
    }

    root
}

// =============================================================================
// Secondary Classification
// =============================================================================

/// Paths of files matching the important-file pattern table.
/// Ordered by path for deterministic downstream selection.
pub fn identify_important_files(structure: &StructureTree) -> Vec<String> {
    structure
        .files
        .iter()
        .filter(|(_, file)| {
            let lower = file.name.to_lowercase();
            tables::IMPORTANT_FILE_PATTERNS
                .iter()
                .any(|pattern| lower.contains(&pattern.to_lowercase()))
        })
        .map(|(path, _)| path.clone())
        .collect()
}

/// Directories matching the key-directory pattern table.
/// A directory may match several patterns; the first match in declaration
/// order provides the description.
pub fn identify_key_directories(structure: &StructureTree) -> Vec<KeyDirectory> {
    structure
        .directories
        .iter()
        .filter_map(|(path, dir)| {
            let lower = dir.name.to_lowercase();
            tables::KEY_DIRECTORY_PATTERNS
                .iter()
                .find(|(pattern, _)| lower.contains(pattern))
                .map(|(_, description)| KeyDirectory {
                    path: path.clone(),
                    name: dir.name.clone(),
                    description: (*description).to_string(),
                })
        })
        .collect()
}

/// Score each ecosystem by the fraction of its indicator files present.
/// Ranked by confidence descending; declaration order breaks ties
/// (stable sort over the ordered table).
pub fn detect_project_types(structure: &StructureTree) -> Vec<EcosystemScore> {
    let paths: Vec<&String> = structure.files.keys().collect();

    let mut scores: Vec<EcosystemScore> = tables::ECOSYSTEM_PATTERNS
        .iter()
        .filter_map(|(ecosystem, indicators)| {
            let matched = indicators
                .iter()
                .filter(|indicator| paths.iter().any(|path| path.contains(*indicator)))
                .count();
            if matched == 0 {
                return None;
            }
            Some(EcosystemScore {
                ecosystem: (*ecosystem).to_string(),
                confidence: matched as f64 / indicators.len() as f64,
            })
        })
        .collect();

    scores.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scores
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::github::EntryKind;

    fn blob(path: &str, size: u64) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            kind: EntryKind::Blob,
            size: Some(size),
        }
    }

    fn dir(path: &str) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            kind: EntryKind::Tree,
            size: None,
        }
    }

    fn sample_tree() -> Vec<TreeEntry> {
        vec![
            dir("src"),
            blob("src/index.js", 120),
            blob("src/app.test.js", 80),
            dir("docs"),
            blob("docs/intro.md", 40),
            blob("README.md", 10),
            blob("Makefile", 5),
            dir("node_modules/lodash"),
            blob("node_modules/lodash/index.js", 999),
        ]
    }

    #[test]
    fn test_ignored_paths_excluded() {
        let structure = normalize(&sample_tree());
        assert!(
            structure
                .directories
                .keys()
                .chain(structure.files.keys())
                .all(|path| !path.contains("node_modules"))
        );
    }

    #[test]
    fn test_stats_match_filtered_entries() {
        let structure = normalize(&sample_tree());
        // 7 entries survive the filter: 2 dirs + 5 files
        assert_eq!(structure.stats.total_dirs, 2);
        assert_eq!(structure.stats.total_files, 5);
        let histogram_total: u64 = structure.stats.files_by_type.values().sum();
        assert_eq!(histogram_total, structure.stats.total_files);
    }

    #[test]
    fn test_extension_classification() {
        let structure = normalize(&sample_tree());
        assert_eq!(structure.stats.files_by_type.get("js"), Some(&2));
        assert_eq!(structure.stats.files_by_type.get("md"), Some(&2));
        assert_eq!(
            structure.stats.files_by_type.get(tables::NO_EXTENSION),
            Some(&1)
        );
        assert_eq!(structure.files["src/app.test.js"].extension, "js");
    }

    #[test]
    fn test_depth_is_segment_count() {
        let structure = normalize(&sample_tree());
        assert_eq!(structure.files["README.md"].depth, 1);
        assert_eq!(structure.files["src/index.js"].depth, 2);
        assert_eq!(structure.directories["src"].depth, 1);
    }

    #[test]
    fn test_hierarchy_idempotent() {
        let tree = sample_tree();
        let first = normalize(&tree);
        let second = normalize(&tree);
        assert_eq!(first.hierarchy, second.hierarchy);

        // No duplicate nodes for shared prefixes
        let src = first
            .hierarchy
            .children
            .iter()
            .filter(|node| node.path == "src")
            .count();
        assert_eq!(src, 1);
    }

    #[test]
    fn test_hierarchy_links_ancestors_once() {
        let structure = normalize(&sample_tree());
        let src = structure
            .hierarchy
            .children
            .iter()
            .find(|node| node.path == "src")
            .expect("src node");
        assert_eq!(src.kind, NodeKind::Directory);
        assert_eq!(src.children.len(), 2);
        assert!(src.children.iter().all(|c| c.kind == NodeKind::File));
    }

    #[test]
    fn test_empty_listing_yields_empty_structure() {
        let structure = normalize(&[]);
        assert_eq!(structure.stats.total_files, 0);
        assert_eq!(structure.stats.total_dirs, 0);
        assert!(structure.hierarchy.children.is_empty());
    }

    #[test]
    fn test_important_files() {
        let structure = normalize(&sample_tree());
        let important = identify_important_files(&structure);
        assert!(important.contains(&"README.md".to_string()));
        assert!(important.contains(&"Makefile".to_string()));
        assert!(!important.contains(&"src/index.js".to_string()));
    }

    #[test]
    fn test_key_directories() {
        let structure = normalize(&sample_tree());
        let keys = identify_key_directories(&structure);
        let names: Vec<&str> = keys.iter().map(|k| k.name.as_str()).collect();
        assert!(names.contains(&"src"));
        assert!(names.contains(&"docs"));
    }

    #[test]
    fn test_project_type_ranking() {
        let tree = vec![
            blob("package.json", 1),
            blob("src/App.jsx", 1),
            blob("src/main.tsx", 1),
        ];
        let structure = normalize(&tree);
        let types = detect_project_types(&structure);
        assert!(!types.is_empty());
        // React matches all three indicators, so it ranks first
        assert_eq!(types[0].ecosystem, "React");
        assert!((types[0].confidence - 1.0).abs() < f64::EPSILON);
        for pair in types.windows(2) {
            assert!(pair[0].confidence >= pair[1].confidence);
        }
    }
}
