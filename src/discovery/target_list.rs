//! CSV cache of discovered targets
//!
//! `hltv_links.csv` holds `id,slug` rows and `cybersport_links.csv` holds
//! `tag,slug` rows, each with a header line.

use crate::crawler::{CrawlTarget, Site};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize)]
struct HltvRow {
    id: u64,
    slug: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct CybersportRow {
    tag: String,
    slug: String,
}

/// Location of a site's target list inside the corpus directory
pub fn target_list_path(corpus_dir: &Path, site: Site) -> PathBuf {
    corpus_dir.join(format!("{}_links.csv", site.as_str()))
}

/// Writes the targets of `site` to `path`, replacing the file
///
/// # Returns
///
/// Number of rows written; targets of other sites are ignored
pub fn write_target_list(path: &Path, site: Site, targets: &[CrawlTarget]) -> crate::Result<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    let mut written = 0;

    match site {
        Site::Hltv => writer.write_record(["id", "slug"])?,
        Site::Cybersport => writer.write_record(["tag", "slug"])?,
    }

    for target in targets {
        match target {
            CrawlTarget::Hltv { id, slug } if site == Site::Hltv => {
                writer.write_record([id.to_string().as_str(), slug.as_str()])?;
            }
            CrawlTarget::Cybersport { tag, slug } if site == Site::Cybersport => {
                writer.write_record([tag.as_str(), slug.as_str()])?;
            }
            _ => continue,
        }
        written += 1;
    }

    writer.flush()?;
    tracing::info!("Saved {} {} targets to {}", written, site, path.display());
    Ok(written)
}

/// Reads a site's target list
///
/// Malformed rows are skipped with a warning.
pub fn read_target_list(path: &Path, site: Site) -> crate::Result<Vec<CrawlTarget>> {
    let mut reader = csv::Reader::from_path(path)?;
    let mut targets = Vec::new();

    match site {
        Site::Hltv => {
            for (line, row) in reader.deserialize::<HltvRow>().enumerate() {
                match row {
                    Ok(row) => targets.push(CrawlTarget::hltv(row.id, row.slug)),
                    Err(e) => tracing::warn!("Skipping row {} of {}: {}", line + 2, path.display(), e),
                }
            }
        }
        Site::Cybersport => {
            for (line, row) in reader.deserialize::<CybersportRow>().enumerate() {
                match row {
                    Ok(row) => targets.push(CrawlTarget::cybersport(row.tag, row.slug)),
                    Err(e) => tracing::warn!("Skipping row {} of {}: {}", line + 2, path.display(), e),
                }
            }
        }
    }

    Ok(targets)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths() {
        let root = Path::new("corpus");
        assert_eq!(
            target_list_path(root, Site::Hltv),
            PathBuf::from("corpus/hltv_links.csv")
        );
        assert_eq!(
            target_list_path(root, Site::Cybersport),
            PathBuf::from("corpus/cybersport_links.csv")
        );
    }

    #[test]
    fn test_hltv_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = target_list_path(dir.path(), Site::Hltv);
        let targets = vec![
            CrawlTarget::hltv(2, "b"),
            CrawlTarget::cybersport("cs2", "ignored"),
            CrawlTarget::hltv(1, "a"),
        ];

        let written = write_target_list(&path, Site::Hltv, &targets).unwrap();
        assert_eq!(written, 2);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "id,slug\n2,b\n1,a\n"
        );

        let read = read_target_list(&path, Site::Hltv).unwrap();
        assert_eq!(read, vec![CrawlTarget::hltv(2, "b"), CrawlTarget::hltv(1, "a")]);
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hltv_links.csv");
        std::fs::write(&path, "id,slug\nabc,x\n5,e\n").unwrap();

        let read = read_target_list(&path, Site::Hltv).unwrap();
        assert_eq!(read, vec![CrawlTarget::hltv(5, "e")]);
    }

    #[test]
    fn test_missing_file_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_target_list(&dir.path().join("nope.csv"), Site::Cybersport);
        assert!(result.is_err());
    }

    #[test]
    fn test_cybersport_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = target_list_path(dir.path(), Site::Cybersport);
        let targets = vec![CrawlTarget::cybersport("cs2", "major, recap")];

        write_target_list(&path, Site::Cybersport, &targets).unwrap();
        assert_eq!(read_target_list(&path, Site::Cybersport).unwrap(), targets);
    }
}
