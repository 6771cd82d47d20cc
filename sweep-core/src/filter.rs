//! Path inclusion policy.
//!
//! Decides, from the relative path alone, whether a file is worth sending to
//! vulnerability analysis. The decision chain is deterministic and ordered:
//! hidden-segment and directory-name exclusions short-circuit before any
//! filename or extension check, so a source-looking file inside an excluded
//! directory is still excluded.

use once_cell::sync::Lazy;
use std::collections::HashSet;
use std::path::Path;

/// Extensions considered analyzable source code (without the leading dot).
static SOURCE_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "py", "js", "jsx", "ts", "tsx", "java", "go", "c", "cpp", "cc", "cxx", "h", "hpp", "rs",
        "rb", "php", "swift", "kt", "scala", "cs", "sh", "bash", "zsh", "fish", "ps1", "bat",
        "cmd",
    ]
    .into_iter()
    .collect()
});

/// Directory names whose entire subtree is skipped (lowercase).
static EXCLUDED_DIRS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        ".git",
        ".venv",
        "venv",
        "node_modules",
        "dist",
        "build",
        "__pycache__",
        ".pytest_cache",
        ".idea",
        ".vscode",
        "target",
        "bin",
        "obj",
        ".gradle",
        ".mvn",
        "vendor",
        "bower_components",
        ".next",
        ".nuxt",
        "coverage",
        ".nyc_output",
        "out",
        "lib",
        "assets",
        "images",
        "img",
        "pictures",
        "pics",
        "media",
        "docs",
        "documentation",
        ".github",
        ".gitlab",
    ]
    .into_iter()
    .collect()
});

/// Extensions that are never source code (lowercase, without the dot).
static EXCLUDED_EXTENSIONS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Images
        "png", "jpg", "jpeg", "gif", "svg", "ico", "bmp", "tiff", "tif", "webp", "heic", "heif",
        "psd", "ai", "eps", "raw", "cr2", "nef",
        // Documents
        "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "odt", "ods",
        // Archives
        "zip", "tar", "gz", "bz2", "xz", "7z", "rar",
        // Media
        "mp3", "mp4", "avi", "mov", "wmv", "flv", "webm", "mkv", "m4v", "wav", "flac", "aac",
        "ogg", "wma",
        // Config / data
        "json", "yaml", "yml", "toml", "ini", "cfg", "conf", "xml",
        // Web assets
        "css", "scss", "sass", "less", "html", "htm", "xhtml",
        // Lockfiles and logs
        "lock", "log", "cache",
        // Text / tabular
        "md", "txt", "rtf", "csv", "tsv",
        // Databases
        "db", "sqlite", "sqlite3", "mdb", "accdb",
        // Binaries
        "exe", "dll", "so", "dylib", "a",
        // Fonts
        "woff", "woff2", "ttf", "eot", "otf",
        // Source maps
        "map",
    ]
    .into_iter()
    .collect()
});

/// Exact file names to skip regardless of location (lowercase).
static EXCLUDED_FILES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        // Package / dependency manifests
        "package.json",
        "package-lock.json",
        "yarn.lock",
        "pnpm-lock.yaml",
        "requirements.txt",
        "requirements-dev.txt",
        "pipfile",
        "pipfile.lock",
        "poetry.lock",
        "setup.py",
        "setup.cfg",
        "pyproject.toml",
        "composer.json",
        "composer.lock",
        "gemfile",
        "gemfile.lock",
        "go.mod",
        "go.sum",
        "cargo.toml",
        "cargo.lock",
        "pom.xml",
        "build.gradle",
        "build.gradle.kts",
        "gradle.properties",
        "bower.json",
        ".bowerrc",
        // Repo / tool configuration
        ".gitignore",
        ".gitattributes",
        ".gitmodules",
        ".gitkeep",
        ".env",
        ".env.local",
        ".env.development",
        ".env.production",
        ".dockerignore",
        "dockerfile",
        "docker-compose.yml",
        "docker-compose.yaml",
        ".editorconfig",
        ".prettierrc",
        ".prettierignore",
        ".eslintrc",
        ".eslintignore",
        "tsconfig.json",
        "jsconfig.json",
        "webpack.config.js",
        "vite.config.js",
        "rollup.config.js",
        ".babelrc",
        "babel.config.js",
        "jest.config.js",
        "jest.config.ts",
        ".nycrc",
        "karma.conf.js",
        "protractor.conf.js",
        ".travis.yml",
        "appveyor.yml",
        "azure-pipelines.yml",
        "makefile",
        "cmakelists.txt",
        "configure",
        "configure.ac",
        // Documentation
        "readme.md",
        "readme.txt",
        "readme.rst",
        "changelog.md",
        "license",
        "contributing.md",
        "contributors.md",
        "authors",
        "history.md",
        // OS / editor droppings
        ".ds_store",
        "thumbs.db",
        "desktop.ini",
        "favicon.ico",
        "robots.txt",
        "sitemap.xml",
    ]
    .into_iter()
    .collect()
});

/// Configurable path inclusion policy.
///
/// The defaults cover the common ecosystems; all four sets can be replaced
/// for callers with unusual trees. `should_exclude` is a pure function of
/// the path and this configuration.
#[derive(Clone, Debug)]
pub struct FilterConfig {
    /// Allow-list of source extensions (lowercase, no dot).
    pub source_extensions: HashSet<&'static str>,
    /// Directory names to skip (lowercase).
    pub excluded_dirs: HashSet<&'static str>,
    /// Exact file names to skip (lowercase).
    pub excluded_files: HashSet<&'static str>,
    /// Extensions to skip (lowercase, no dot).
    pub excluded_extensions: HashSet<&'static str>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            source_extensions: SOURCE_EXTENSIONS.clone(),
            excluded_dirs: EXCLUDED_DIRS.clone(),
            excluded_files: EXCLUDED_FILES.clone(),
            excluded_extensions: EXCLUDED_EXTENSIONS.clone(),
        }
    }
}

impl FilterConfig {
    /// Decide whether `relative_path` should be excluded from analysis.
    ///
    /// Checks, first match wins:
    /// 1. hidden path segment (unless the segment is the file itself and
    ///    carries a source extension, e.g. `.eslintrc.js`)
    /// 2. excluded directory name anywhere in the path (case-insensitive)
    /// 3. excluded file name (case-insensitive)
    /// 4. excluded extension (case-insensitive)
    /// 5. no extension at all
    /// 6. extension not on the source allow-list
    pub fn should_exclude(&self, relative_path: &Path) -> bool {
        let file_name = relative_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("");
        let extension = relative_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());

        for component in relative_path.components() {
            let part = match component.as_os_str().to_str() {
                Some(p) => p,
                // Non-UTF-8 segment: nothing downstream can cite it.
                None => return true,
            };

            if part.starts_with('.') && part != "." && part != ".." {
                let hidden_source_file = part == file_name
                    && extension
                        .as_deref()
                        .is_some_and(|e| self.source_extensions.contains(e));
                if !hidden_source_file {
                    return true;
                }
            }

            if self.excluded_dirs.contains(part.to_lowercase().as_str()) {
                return true;
            }
        }

        if self
            .excluded_files
            .contains(file_name.to_lowercase().as_str())
        {
            return true;
        }

        match extension.as_deref() {
            Some(ext) if self.excluded_extensions.contains(ext) => true,
            Some(ext) => !self.source_extensions.contains(ext),
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excluded(path: &str) -> bool {
        FilterConfig::default().should_exclude(Path::new(path))
    }

    #[test]
    fn test_source_files_included() {
        assert!(!excluded("src/main.py"));
        assert!(!excluded("app/handlers/login.ts"));
        assert!(!excluded("deep/nested/tree/util.rs"));
        assert!(!excluded("scripts/deploy.sh"));
    }

    #[test]
    fn test_excluded_directories_win_over_source_extensions() {
        // A source-looking file inside an excluded directory stays excluded.
        assert!(excluded("node_modules/lodash/index.js"));
        assert!(excluded("vendor/lib/helper.py"));
        assert!(excluded(".git/hooks/pre-commit.sh"));
    }

    #[test]
    fn test_directory_exclusion_is_case_insensitive() {
        assert!(excluded("Vendor/helper.py"));
        assert!(excluded("NODE_MODULES/a.js"));
    }

    #[test]
    fn test_hidden_segments_excluded() {
        assert!(excluded(".secrets/keys.py"));
        assert!(excluded("config/.hidden/run.sh"));
    }

    #[test]
    fn test_hidden_source_file_allowed() {
        // Hidden files that are themselves source code pass the hidden check.
        assert!(!excluded(".custom-hook.py"));
        // ...but still lose to the exact-name exclusion list.
        assert!(excluded(".eslintignore"));
    }

    #[test]
    fn test_excluded_file_names() {
        assert!(excluded("package.json"));
        assert!(excluded("sub/dir/Cargo.toml"));
        assert!(excluded("README.md"));
        assert!(excluded("Makefile"));
    }

    #[test]
    fn test_excluded_extensions() {
        assert!(excluded("logo.png"));
        assert!(excluded("styles/app.css"));
        assert!(excluded("data/config.yaml"));
        assert!(excluded("bundle.min.js.map"));
    }

    #[test]
    fn test_no_extension_excluded() {
        assert!(excluded("LICENSE-APACHE"));
        assert!(excluded("bin-stub"));
    }

    #[test]
    fn test_unknown_extension_excluded() {
        assert!(excluded("notes.org"));
        assert!(excluded("model.onnx"));
    }

    #[test]
    fn test_decision_is_deterministic() {
        let config = FilterConfig::default();
        let path = Path::new("src/app/server.go");
        let first = config.should_exclude(path);
        for _ in 0..10 {
            assert_eq!(config.should_exclude(path), first);
        }
    }
}
