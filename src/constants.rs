//! Global Constants
//!
//! Centralized constants for configuration and tuning.
//! Pattern tables are ordered: where two rules tie, the earlier
//! declaration wins.

/// Structure normalizer constants
pub mod structure {
    /// Path tokens that exclude an entry from the normalized structure.
    /// Matched as substrings of the full path.
    pub const IGNORED_PATH_TOKENS: &[&str] = &[
        "node_modules",
        ".git",
        "dist",
        "build",
        "coverage",
        ".next",
        ".cache",
        "vendor",
        "__pycache__",
        ".pytest_cache",
        "venv",
        "env",
    ];

    /// Sentinel extension for files without one
    pub const NO_EXTENSION: &str = "no-ext";

    /// File names that mark a file as "important" for deep scanning.
    /// Matched case-insensitively as substrings of the file name.
    pub const IMPORTANT_FILE_PATTERNS: &[&str] = &[
        "package.json",
        "requirements.txt",
        "Cargo.toml",
        "go.mod",
        "pom.xml",
        "build.gradle",
        "Makefile",
        "Dockerfile",
        "docker-compose.yml",
        "README.md",
        "CONTRIBUTING.md",
        "LICENSE",
        ".env.example",
        "tsconfig.json",
        "webpack.config.js",
        "vite.config.js",
        "next.config.js",
    ];

    /// Directory name fragments with human-readable descriptions
    pub const KEY_DIRECTORY_PATTERNS: &[(&str, &str)] = &[
        ("src", "Source code"),
        ("lib", "Library code"),
        ("app", "Application code"),
        ("components", "UI components"),
        ("pages", "Page components"),
        ("routes", "Route definitions"),
        ("api", "API endpoints"),
        ("controllers", "Controllers"),
        ("models", "Data models"),
        ("views", "View templates"),
        ("services", "Business logic services"),
        ("utils", "Utility functions"),
        ("helpers", "Helper functions"),
        ("config", "Configuration files"),
        ("tests", "Test files"),
        ("docs", "Documentation"),
        ("public", "Public assets"),
        ("static", "Static files"),
        ("assets", "Assets"),
        ("styles", "Stylesheets"),
        ("css", "CSS files"),
        ("scripts", "Scripts"),
        ("bin", "Binary/executable files"),
        ("migrations", "Database migrations"),
        ("seeds", "Database seeds"),
    ];

    /// Ecosystem indicator files for project type detection.
    /// Confidence = matched indicators / total indicators.
    pub const ECOSYSTEM_PATTERNS: &[(&str, &[&str])] = &[
        ("React", &["package.json", "jsx", "tsx"]),
        ("Vue", &["package.json", "vue"]),
        ("Angular", &["package.json", "angular.json"]),
        ("Next.js", &["next.config.js", "package.json"]),
        ("Node.js", &["package.json", "server.js", "index.js"]),
        ("Python", &["requirements.txt", "setup.py", "pyproject.toml"]),
        ("Django", &["manage.py", "settings.py"]),
        ("Flask", &["app.py", "requirements.txt"]),
        ("FastAPI", &["main.py", "requirements.txt"]),
        ("Go", &["go.mod", "main.go"]),
        ("Rust", &["Cargo.toml", "src/main.rs"]),
        ("Java", &["pom.xml", "build.gradle"]),
        ("Spring Boot", &["pom.xml", "application.properties"]),
        ("Ruby on Rails", &["Gemfile", "config.ru"]),
        ("PHP", &["composer.json", "index.php"]),
        ("Laravel", &["artisan", "composer.json"]),
    ];

    /// How many important files the pipeline scans in depth
    pub const MAX_SCANNED_FILES: usize = 5;
}

/// Mind map constants
pub mod mindmap {
    /// Beginner-friendly directory fragments with descriptions and area types
    pub const BEGINNER_AREA_PATTERNS: &[(&str, &str, &str)] = &[
        ("docs", "Documentation files", "documentation"),
        ("public", "Static assets", "assets"),
        ("styles", "CSS/Styling", "styling"),
        ("assets", "Images & resources", "assets"),
        ("components", "UI components", "frontend"),
        ("utils", "Helper functions", "utilities"),
        ("helpers", "Utility functions", "utilities"),
    ];

    /// Core/advanced directory fragments with descriptions and area types
    pub const CORE_AREA_PATTERNS: &[(&str, &str, &str)] = &[
        ("controllers", "Business logic", "backend"),
        ("models", "Data models", "backend"),
        ("services", "Core services", "backend"),
        ("routes", "API routes", "backend"),
        ("middleware", "Request processing", "backend"),
        ("api", "API layer", "backend"),
        ("core", "Core functionality", "system"),
        ("engine", "Main engine", "system"),
    ];

    /// Name fragments marking a directory as test-related
    pub const TEST_DIRECTORY_FRAGMENTS: &[&str] = &["test", "spec", "__tests__"];

    /// Essential files ranked by display priority (lower first)
    pub const ESSENTIAL_FILE_PATTERNS: &[(&str, u8, &str)] = &[
        ("README.md", 1, "Project overview"),
        ("CONTRIBUTING.md", 2, "How to contribute"),
        ("package.json", 3, "Dependencies & scripts"),
        ("requirements.txt", 3, "Python dependencies"),
    ];
}

/// GitHub collaborator constants
pub mod github {
    /// Issue labels that mark an issue as beginner-oriented
    pub const BEGINNER_LABELS: &[&str] = &[
        "good first issue",
        "beginner-friendly",
        "easy",
        "starter",
        "help wanted",
    ];

    /// CONTRIBUTING file lookup order
    pub const CONTRIBUTING_PATHS: &[&str] = &[
        "CONTRIBUTING.md",
        "CONTRIBUTING",
        ".github/CONTRIBUTING.md",
        "docs/CONTRIBUTING.md",
    ];

    /// Fallback average maintainer response when history is unavailable
    pub const DEFAULT_RESPONSE_DAYS: u32 = 3;

    /// How many recent PRs/issues the responsiveness query inspects
    pub const RESPONSIVENESS_SAMPLE: u32 = 20;
}

/// Insight generation constants
pub mod insight {
    /// Maximum directories embedded in a structure summary
    pub const MAX_SUMMARY_DIRS: usize = 15;

    /// Maximum files embedded in a structure summary
    pub const MAX_SUMMARY_FILES: usize = 20;

    /// Maximum imports listed per scanned file
    pub const MAX_SUMMARY_IMPORTS: usize = 5;

    /// Character budget for README excerpts in prompts
    pub const MAX_README_CHARS: usize = 1500;

    /// Languages embedded in the overview prompt
    pub const MAX_PROMPT_LANGUAGES: usize = 5;

    /// Topics embedded in the overview prompt
    pub const MAX_PROMPT_TOPICS: usize = 10;
}

/// Job queue constants
pub mod queue {
    /// Maximum delivery attempts per job
    pub const MAX_ATTEMPTS: u32 = 3;

    /// Base delay for exponential backoff (milliseconds)
    pub const BASE_DELAY_MS: u64 = 5_000;

    /// Maximum delay between attempts (seconds)
    pub const MAX_DELAY_SECS: u64 = 60;

    /// Backoff multiplier
    pub const BACKOFF_FACTOR: f32 = 2.0;
}

/// HTTP surface constants
pub mod server {
    /// Maximum results returned by repository search
    pub const SEARCH_LIMIT: usize = 20;

    /// Maximum accepted request body size (bytes)
    pub const MAX_BODY_BYTES: usize = 64 * 1024;
}
