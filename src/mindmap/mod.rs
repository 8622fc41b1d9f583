//! Mind Map Synthesizer
//!
//! Deterministically derives a fixed-topology Mermaid flowchart — the
//! "contribution roadmap" — from the normalized structure and repository
//! metadata. The topology never varies: eight stage nodes (A–H, with D/E
//! the beginner/advanced branch pair fanning out of C and converging into
//! F) plus the terminal merged node I. Only the interpolated labels change
//! per repository.
//!
//! The directory classification helpers are exposed for reuse: they also
//! back the insight prompts.

use serde::{Deserialize, Serialize};

use crate::analyzer::StructureTree;
use crate::constants::mindmap as tables;
use crate::github::{ActivityLevel, MaintainerStats};

/// Diagram payload stored on the analysis record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MindMapData {
    pub mermaid_code: String,
}

/// Repository context interpolated into the diagram labels
#[derive(Debug, Clone, Default)]
pub struct MindMapContext {
    pub maintainer_stats: Option<MaintainerStats>,
    pub languages: Vec<String>,
    pub open_issues: u64,
}

/// A directory classified as a contribution area
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContributionArea {
    pub name: String,
    pub path: String,
    pub description: String,
    #[serde(rename = "type")]
    pub area_type: String,
}

/// An essential file ranked for the diagram's first stage
#[derive(Debug, Clone)]
pub struct EssentialFile {
    pub name: String,
    pub path: String,
    pub priority: u8,
    pub description: String,
}

// =============================================================================
// Classification Helpers
// =============================================================================

/// Directories safe for first-time contributors
pub fn beginner_friendly_areas(structure: &StructureTree) -> Vec<ContributionArea> {
    match_areas(structure, tables::BEGINNER_AREA_PATTERNS)
}

/// Directories holding core business logic
pub fn core_areas(structure: &StructureTree) -> Vec<ContributionArea> {
    match_areas(structure, tables::CORE_AREA_PATTERNS)
}

fn match_areas(
    structure: &StructureTree,
    patterns: &[(&str, &str, &str)],
) -> Vec<ContributionArea> {
    structure
        .directories
        .iter()
        .filter_map(|(path, dir)| {
            let lower = dir.name.to_lowercase();
            patterns
                .iter()
                .find(|(fragment, _, _)| lower.contains(fragment))
                .map(|(_, description, area_type)| ContributionArea {
                    name: dir.name.clone(),
                    path: path.clone(),
                    description: (*description).to_string(),
                    area_type: (*area_type).to_string(),
                })
        })
        .collect()
}

/// Directories that look test-related
pub fn test_directories(structure: &StructureTree) -> Vec<ContributionArea> {
    structure
        .directories
        .iter()
        .filter(|(_, dir)| {
            let lower = dir.name.to_lowercase();
            tables::TEST_DIRECTORY_FRAGMENTS
                .iter()
                .any(|fragment| lower.contains(fragment))
        })
        .map(|(path, dir)| ContributionArea {
            name: dir.name.clone(),
            path: path.clone(),
            description: "Test files".to_string(),
            area_type: "test-directory".to_string(),
        })
        .collect()
}

/// Essential files (readme, contribution guide, manifests), ranked by the
/// fixed priority table. Exact name match, case-insensitive.
pub fn essential_files(structure: &StructureTree) -> Vec<EssentialFile> {
    let mut found: Vec<EssentialFile> = structure
        .files
        .iter()
        .filter_map(|(path, file)| {
            tables::ESSENTIAL_FILE_PATTERNS
                .iter()
                .find(|(pattern, _, _)| file.name.eq_ignore_ascii_case(pattern))
                .map(|(_, priority, description)| EssentialFile {
                    name: file.name.clone(),
                    path: path.clone(),
                    priority: *priority,
                    description: (*description).to_string(),
                })
        })
        .collect();
    found.sort_by_key(|file| file.priority);
    found
}

/// Emoji for the maintainer responsiveness tier
fn activity_emoji(level: ActivityLevel) -> &'static str {
    match level {
        ActivityLevel::VeryActive => "⚡",
        ActivityLevel::Active => "🔥",
        ActivityLevel::Moderate => "⏳",
        ActivityLevel::Slow => "🐌",
    }
}

// =============================================================================
// Diagram Builder
// =============================================================================

/// Build the contribution roadmap diagram.
///
/// A missing structure yields a placeholder diagram with the same
/// topology, never an error.
pub fn build_mind_map(
    structure: &StructureTree,
    repo_name: &str,
    context: &MindMapContext,
) -> MindMapData {
    let primary_lang = context
        .languages
        .first()
        .cloned()
        .unwrap_or_else(|| "General".to_string());

    let beginner = beginner_friendly_areas(structure);
    let core = core_areas(structure);
    let essentials = essential_files(structure);
    let tests = test_directories(structure);

    let stats = context.maintainer_stats.clone().unwrap_or_default();
    let emoji = activity_emoji(stats.activity_level);

    let files_label = join_names(
        essentials.iter().take(3).map(|f| f.name.as_str()),
        "README",
    );
    let tech_label = join_names(
        context.languages.iter().take(3).map(String::as_str),
        "your stack",
    );
    let beginner_label = join_names(beginner.iter().take(2).map(|a| a.name.as_str()), "docs");
    let core_label = join_names(core.iter().take(2).map(|a| a.name.as_str()), "core modules");
    let test_label = tests
        .first()
        .map(|dir| dir.name.clone())
        .unwrap_or_else(|| "tests".to_string());

    let mut mermaid = String::from("flowchart TD\n");
    mermaid.push_str(
        "    classDef startNode fill:#10b981,stroke:#059669,stroke-width:3px,color:#fff\n",
    );
    mermaid
        .push_str("    classDef easyNode fill:#22c55e,stroke:#16a34a,stroke-width:2px,color:#fff\n");
    mermaid.push_str(
        "    classDef mediumNode fill:#3b82f6,stroke:#2563eb,stroke-width:2px,color:#fff\n",
    );
    mermaid
        .push_str("    classDef hardNode fill:#ef4444,stroke:#dc2626,stroke-width:2px,color:#fff\n");
    mermaid.push_str(
        "    classDef successNode fill:#fbbf24,stroke:#f59e0b,stroke-width:3px,color:#000\n\n",
    );

    mermaid.push_str(&format!(
        "    A[\"📖 Step 1: Read These First<br/>{}\"]:::easyNode\n",
        files_label
    ));
    mermaid.push_str(&format!(
        "    B[\"💻 Step 2: Learn {}<br/>Stack: {}\"]:::easyNode\n",
        primary_lang, tech_label
    ));
    mermaid.push_str("    A --> B\n\n");

    mermaid.push_str(&format!(
        "    C{{\"🚀 Step 3: Pick Your Area<br/>{} beginner | {} advanced\"}}:::startNode\n",
        beginner.len(),
        core.len()
    ));
    mermaid.push_str("    B --> C\n\n");

    mermaid.push_str(&format!(
        "    D[\"🟢 Beginner Areas<br/>Start: {}\"]:::easyNode\n",
        beginner_label
    ));
    mermaid.push_str("    C -->|\"Easy Start\"| D\n");
    mermaid.push_str(&format!(
        "    E[\"🔴 Advanced Areas<br/>Complex: {}\"]:::hardNode\n",
        core_label
    ));
    mermaid.push_str("    C -->|\"Advanced\"| E\n\n");

    mermaid.push_str(&format!(
        "    F[\"✏️ Step 4: Make Changes & Tests<br/>Add tests in: {}\"]:::mediumNode\n",
        test_label
    ));
    mermaid.push_str("    D --> F\n");
    mermaid.push_str("    E --> F\n\n");

    mermaid.push_str(&format!(
        "    G[\"✅ Step 5: Pre-PR Checklist<br/>Run {} tests + format\"]:::mediumNode\n",
        primary_lang
    ));
    mermaid.push_str("    F --> G\n\n");

    mermaid.push_str(&format!(
        "    H[\"{} Step 6: Submit PR & Review<br/>{} open issues | ~{} day response\"]:::mediumNode\n",
        emoji, context.open_issues, stats.avg_response_days
    ));
    mermaid.push_str("    G --> H\n\n");

    mermaid.push_str(&format!(
        "    I[\"🎉 Merged to {}!<br/>You're now a contributor!\"]:::successNode\n",
        repo_name
    ));
    mermaid.push_str("    H --> I\n");

    MindMapData {
        mermaid_code: mermaid,
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>, fallback: &str) -> String {
    let joined: Vec<&str> = names.collect();
    if joined.is_empty() {
        fallback.to_string()
    } else {
        joined.join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::normalize;
    use crate::github::{EntryKind, TreeEntry};

    fn entry(path: &str, kind: EntryKind) -> TreeEntry {
        TreeEntry {
            path: path.to_string(),
            kind,
            size: None,
        }
    }

    fn sample_structure() -> StructureTree {
        normalize(&[
            entry("README.md", EntryKind::Blob),
            entry("CONTRIBUTING.md", EntryKind::Blob),
            entry("package.json", EntryKind::Blob),
            entry("docs", EntryKind::Tree),
            entry("src", EntryKind::Tree),
            entry("src/services", EntryKind::Tree),
            entry("src/utils", EntryKind::Tree),
            entry("tests", EntryKind::Tree),
        ])
    }

    fn sample_context() -> MindMapContext {
        MindMapContext {
            maintainer_stats: Some(MaintainerStats {
                avg_response_days: 1,
                avg_response_hours: 18,
                activity_level: ActivityLevel::VeryActive,
            }),
            languages: vec!["Rust".into(), "TypeScript".into()],
            open_issues: 12,
        }
    }

    #[test]
    fn test_exactly_nine_node_declarations() {
        let map = build_mind_map(&sample_structure(), "widgets", &sample_context());
        let declared = map
            .mermaid_code
            .lines()
            .filter(|line| {
                let trimmed = line.trim_start();
                trimmed.len() > 1
                    && trimmed.as_bytes()[0].is_ascii_uppercase()
                    && (trimmed.as_bytes()[1] == b'[' || trimmed.as_bytes()[1] == b'{')
            })
            .count();
        assert_eq!(declared, 9);
    }

    #[test]
    fn test_branch_nodes_converge() {
        let map = build_mind_map(&sample_structure(), "widgets", &sample_context());
        assert!(map.mermaid_code.contains("D --> F"));
        assert!(map.mermaid_code.contains("E --> F"));
        assert!(map.mermaid_code.contains("C -->|\"Easy Start\"| D"));
        assert!(map.mermaid_code.contains("C -->|\"Advanced\"| E"));
    }

    #[test]
    fn test_labels_interpolated() {
        let map = build_mind_map(&sample_structure(), "widgets", &sample_context());
        assert!(map.mermaid_code.contains("README.md"));
        assert!(map.mermaid_code.contains("Learn Rust"));
        assert!(map.mermaid_code.contains("12 open issues"));
        assert!(map.mermaid_code.contains('⚡'));
        assert!(map.mermaid_code.contains("Merged to widgets!"));
    }

    #[test]
    fn test_empty_structure_yields_placeholder() {
        let empty = normalize(&[]);
        let map = build_mind_map(&empty, "ghost", &MindMapContext::default());
        assert!(map.mermaid_code.contains("flowchart TD"));
        assert!(map.mermaid_code.contains("Start: docs"));
        assert!(map.mermaid_code.contains("Learn General"));
    }

    #[test]
    fn test_essential_files_ranked() {
        let files = essential_files(&sample_structure());
        assert_eq!(files[0].name, "README.md");
        assert_eq!(files[1].name, "CONTRIBUTING.md");
        assert_eq!(files[2].name, "package.json");
    }

    #[test]
    fn test_area_classification() {
        let structure = sample_structure();
        let beginner: Vec<String> = beginner_friendly_areas(&structure)
            .into_iter()
            .map(|a| a.name)
            .collect();
        let core: Vec<String> = core_areas(&structure).into_iter().map(|a| a.name).collect();
        assert!(beginner.contains(&"docs".to_string()));
        assert!(beginner.contains(&"utils".to_string()));
        assert!(core.contains(&"services".to_string()));
        assert!(!core.contains(&"docs".to_string()));
    }

    #[test]
    fn test_test_directory_detection() {
        let dirs = test_directories(&sample_structure());
        assert_eq!(dirs.len(), 1);
        assert_eq!(dirs[0].name, "tests");
    }
}
