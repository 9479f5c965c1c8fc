//! Which repository files are worth sending to the model, and in what order.

/// File extensions treated as text.
const TEXT_EXTENSIONS: &[&str] = &[
    "rs", "go", "py", "js", "jsx", "mjs", "cjs", "ts", "tsx", "java", "kt", "kts", "scala", "rb",
    "php", "cs", "c", "h", "cc", "cpp", "hpp", "swift", "m", "ex", "exs", "erl", "hs", "clj",
    "lua", "dart", "zig", "sh", "bash", "sql", "html", "css", "scss", "vue", "svelte", "astro",
    "md", "txt", "toml", "yaml", "yml", "json", "xml", "gradle", "tf", "proto", "graphql", "wat",
];

/// Extension-less files treated as text.
const TEXT_FILENAMES: &[&str] = &[
    "Dockerfile",
    "Makefile",
    "Procfile",
    "Gemfile",
    "README",
    "LICENSE",
    ".env.example",
];

/// Lockfiles and generated manifests that only burn context.
const LOCKFILES: &[&str] = &[
    "package-lock.json",
    "yarn.lock",
    "pnpm-lock.yaml",
    "bun.lockb",
    "Cargo.lock",
    "Gemfile.lock",
    "poetry.lock",
    "Pipfile.lock",
    "composer.lock",
    "go.sum",
    "mix.lock",
    "pubspec.lock",
];

/// Vendored, generated or build-output directories.
const EXCLUDED_DIRS: &[&str] = &[
    "node_modules",
    "vendor",
    "third_party",
    "dist",
    "build",
    "target",
    "out",
    "coverage",
    ".git",
    ".github",
    ".next",
    ".venv",
    "venv",
    "__pycache__",
];

/// Files that describe the project and are read first.
const MANIFESTS: &[&str] = &[
    "package.json",
    "Cargo.toml",
    "go.mod",
    "pyproject.toml",
    "requirements.txt",
    "pom.xml",
    "build.gradle",
    "composer.json",
    "Gemfile",
    "wrangler.toml",
    "Dockerfile",
];

/// One candidate file from a repository listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileCandidate {
    pub path: String,
    /// Size in bytes, when the listing reports it.
    pub size: Option<u64>,
}

/// Filtering and capping rules applied by fetch adapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Maximum number of files returned.
    pub max_files: usize,
    /// Maximum size of a single file in bytes.
    pub max_file_bytes: u64,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            max_files: 40,
            max_file_bytes: 100_000,
        }
    }
}

fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn depth(path: &str) -> usize {
    path.matches('/').count()
}

impl FetchPolicy {
    /// Returns true for source, config and documentation files.
    pub fn is_text_like(path: &str) -> bool {
        let name = file_name(path);
        if TEXT_FILENAMES.contains(&name) {
            return true;
        }
        match name.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => {
                TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
            }
            _ => false,
        }
    }

    pub fn is_lockfile(path: &str) -> bool {
        LOCKFILES.contains(&file_name(path))
    }

    pub fn is_in_excluded_dir(path: &str) -> bool {
        let mut segments: Vec<&str> = path.split('/').collect();
        segments.pop();
        segments.iter().any(|segment| EXCLUDED_DIRS.contains(segment))
    }

    /// Applies every per-file rule.
    pub fn accepts(&self, candidate: &FileCandidate) -> bool {
        if Self::is_in_excluded_dir(&candidate.path) || Self::is_lockfile(&candidate.path) {
            return false;
        }
        if !Self::is_text_like(&candidate.path) {
            return false;
        }
        match candidate.size {
            Some(size) => size > 0 && size <= self.max_file_bytes,
            None => true,
        }
    }

    /// Lower sorts first: root readme, root manifests, other root files, then
    /// deeper files by depth.
    fn priority(path: &str) -> (u8, usize) {
        let name = file_name(path);
        let at_root = depth(path) == 0;
        let rank = if at_root && name.to_ascii_lowercase().starts_with("readme") {
            0
        } else if at_root && MANIFESTS.contains(&name) {
            1
        } else if at_root {
            2
        } else {
            3
        };
        (rank, depth(path))
    }

    /// Filters, orders and caps a listing. Ordering is stable, so files with
    /// equal priority keep their listing order.
    pub fn select(&self, candidates: impl IntoIterator<Item = FileCandidate>) -> Vec<FileCandidate> {
        let mut accepted: Vec<FileCandidate> =
            candidates.into_iter().filter(|c| self.accepts(c)).collect();
        accepted.sort_by_key(|c| Self::priority(&c.path));
        accepted.truncate(self.max_files);
        accepted
    }

    /// Caps downloaded content to `max_file_bytes`, cutting on a char boundary.
    pub fn clamp_content(&self, mut content: String) -> String {
        let limit = usize::try_from(self.max_file_bytes).unwrap_or(usize::MAX);
        if content.len() > limit {
            let mut cut = limit;
            while !content.is_char_boundary(cut) {
                cut -= 1;
            }
            content.truncate(cut);
        }
        content
    }
}
