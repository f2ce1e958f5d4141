/// Optional path filters applied by the walker.
///
/// With no extensions and no ignore patterns configured every regular file
/// passes, so the default walk visits the whole tree.
use glob::Pattern;
use std::path::Path;
use tracing::warn;

/// Checks if a file should be included in the search based on its extension
pub fn has_valid_extension(path: &Path, extensions: &Option<Vec<String>>) -> bool {
    match extensions {
        None => true,
        Some(exts) => {
            if let Some(ext) = path.extension() {
                if let Some(ext_str) = ext.to_str() {
                    return exts.iter().any(|e| e.eq_ignore_ascii_case(ext_str));
                }
            }
            false
        }
    }
}

/// Compiles ignore globs once per walk. Invalid globs are logged and dropped.
pub fn compile_ignore_patterns(ignore_patterns: &[String]) -> Vec<Pattern> {
    ignore_patterns
        .iter()
        .filter_map(|pattern| match Pattern::new(pattern) {
            Ok(p) => Some(p),
            Err(e) => {
                warn!("Ignoring invalid glob '{}': {}", pattern, e);
                None
            }
        })
        .collect()
}

/// Checks if a file should be ignored based on compiled ignore patterns.
/// The walker passes paths relative to the search root.
pub fn should_ignore(path: &Path, ignore_patterns: &[Pattern]) -> bool {
    if ignore_patterns.is_empty() {
        return false;
    }
    // Convert path to a format that matches the pattern style
    let normalized_path = path.to_string_lossy().replace('\\', "/");
    ignore_patterns.iter().any(|p| p.matches(&normalized_path))
}

/// Determines if a file should be included in the search
pub fn should_include_file(
    path: &Path,
    extensions: &Option<Vec<String>>,
    ignore_patterns: &[Pattern],
) -> bool {
    has_valid_extension(path, extensions) && !should_ignore(path, ignore_patterns)
}
