//! Directory and wildcard expansion.
//!
//! A reference like `C:\Videos\*.mp4` or `/home/me/lectures/` turns into a
//! sorted list of files, capped so a huge folder cannot flood a note.

use crate::notice::Notifier;
use crate::resolver::{clean_path, is_playable, normalize, strip_file_scheme};
use local_media_types::MediaReference;
use regex::{Regex, RegexBuilder};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Compile a file glob (`*.mp4`, `lecture-*`) into an anchored pattern.
pub fn glob_to_pattern(glob: &str) -> String {
    format!("^{}$", regex::escape(glob).replace(r"\*", ".*"))
}

fn compile_filter(pattern: &str, notifier: &dyn Notifier) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(regex) => Some(regex),
        Err(e) => {
            warn!("Invalid regex filter {}: {}", pattern, e);
            notifier.notice(&format!("Invalid regex filter: {}", pattern));
            None
        }
    }
}

/// Split `dir/pattern*` at the last separator.
fn split_wildcard(path: &str) -> (&str, &str) {
    match path.rfind(['/', '\\']) {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => (".", path),
    }
}

/// Expand a reference into absolute file paths.
///
/// Returns the original path unchanged when it is a plain file, when the
/// directory cannot be read, or when nothing matches. The result is never
/// empty.
pub fn expand(reference: &MediaReference, max_results: usize, notifier: &dyn Notifier) -> Vec<String> {
    let folder_path = normalize(&reference.path)
        .unwrap_or_else(|_| strip_file_scheme(&clean_path(&reference.path)).to_string());

    let explicit_filter = reference
        .filter
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .map(str::to_string);

    let wildcard = folder_path.contains('*');
    let (base_dir, filter_pattern) = if wildcard {
        let (base_dir, glob) = split_wildcard(&folder_path);
        let pattern = explicit_filter.unwrap_or_else(|| glob_to_pattern(glob));
        (base_dir.to_string(), Some(pattern))
    } else {
        (folder_path.clone(), explicit_filter)
    };

    let base = Path::new(&base_dir);
    if !base.is_dir() {
        if wildcard {
            debug!("Wildcard base {} is not a directory", base_dir);
        }
        return vec![folder_path];
    }

    let entries = match fs::read_dir(base) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Failed to read directory {}: {}", base_dir, e);
            return vec![folder_path];
        }
    };

    let regex = filter_pattern
        .as_deref()
        .and_then(|pattern| compile_filter(pattern, notifier));

    let mut names: Vec<String> = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Failed to read entry in {}: {}", base_dir, e);
                return vec![folder_path];
            }
        };

        match entry.metadata() {
            Ok(metadata) if metadata.is_dir() => continue,
            Ok(_) => {}
            Err(_) => continue,
        }

        let name = entry.file_name().to_string_lossy().into_owned();
        let keep = match (&regex, wildcard) {
            (Some(regex), true) => regex.is_match(&name),
            (Some(regex), false) => is_playable(&name) && regex.is_match(&name),
            (None, _) => is_playable(&name),
        };
        if keep {
            names.push(name);
        }
    }

    if names.is_empty() {
        debug!("No matching files in {}, keeping original path", base_dir);
        return vec![folder_path];
    }

    names.sort();
    names
        .into_iter()
        .take(max_results)
        .map(|name| base.join(name).to_string_lossy().into_owned())
        .collect()
}
