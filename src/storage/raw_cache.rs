//! On-disk cache of fetched markup
//!
//! Layout under the corpus directory:
//!
//! ```text
//! <corpus>/<site>/raw/<key>.html
//! <corpus>/<site>/raw/blocked/<key>.html
//! <corpus>/<site>/parsed/<key>.txt
//! ```

use crate::crawler::{CrawlTarget, Site};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Longest file name stem written to disk, in bytes
pub const MAX_FILE_NAME_BYTES: usize = 200;

/// Replaces characters that are invalid in file names and caps the length
pub fn sanitize_file_name(name: &str) -> String {
    let mut sanitized = String::with_capacity(name.len().min(MAX_FILE_NAME_BYTES));
    for c in name.chars() {
        let c = match c {
            '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
            other => other,
        };
        if sanitized.len() + c.len_utf8() > MAX_FILE_NAME_BYTES {
            break;
        }
        sanitized.push(c);
    }
    sanitized
}

/// Raw and parsed file tree rooted at the corpus directory
#[derive(Debug, Clone)]
pub struct RawCache {
    root: PathBuf,
}

impl RawCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn raw_dir(&self, site: Site) -> PathBuf {
        self.root.join(site.as_str()).join("raw")
    }

    pub fn blocked_dir(&self, site: Site) -> PathBuf {
        self.raw_dir(site).join("blocked")
    }

    pub fn parsed_dir(&self, site: Site) -> PathBuf {
        self.root.join(site.as_str()).join("parsed")
    }

    pub fn raw_path(&self, target: &CrawlTarget) -> PathBuf {
        self.raw_dir(target.site())
            .join(format!("{}.html", sanitize_file_name(&target.cache_key())))
    }

    pub fn blocked_path(&self, target: &CrawlTarget) -> PathBuf {
        self.blocked_dir(target.site())
            .join(format!("{}.html", sanitize_file_name(&target.cache_key())))
    }

    pub fn parsed_path(&self, target: &CrawlTarget) -> PathBuf {
        self.parsed_dir(target.site())
            .join(format!("{}.txt", sanitize_file_name(&target.cache_key())))
    }

    /// Creates the raw, blocked and parsed directories for every site
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        for site in Site::ALL {
            fs::create_dir_all(self.blocked_dir(site))?;
            fs::create_dir_all(self.parsed_dir(site))?;
        }
        Ok(())
    }

    /// Cached markup for `target`, if a file exists
    pub fn read(&self, target: &CrawlTarget) -> std::io::Result<Option<String>> {
        match fs::read_to_string(self.raw_path(target)) {
            Ok(markup) => Ok(Some(markup)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn contains(&self, target: &CrawlTarget) -> bool {
        self.raw_path(target).is_file()
    }

    /// Writes markup for `target`, returning the file path
    pub fn write(&self, target: &CrawlTarget, markup: &str) -> std::io::Result<PathBuf> {
        write_file(self.raw_path(target), markup)
    }

    /// Writes a blocked page for later inspection
    pub fn write_blocked(&self, target: &CrawlTarget, markup: &str) -> std::io::Result<PathBuf> {
        write_file(self.blocked_path(target), markup)
    }

    /// Writes the extracted text of an article
    pub fn write_parsed(&self, target: &CrawlTarget, text: &str) -> std::io::Result<PathBuf> {
        write_file(self.parsed_path(target), text)
    }
}

fn write_file(path: PathBuf, contents: &str) -> std::io::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&path, contents)?;
    Ok(path)
}
