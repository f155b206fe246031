//! Reprocess pass: stored markup to parsed article text

use crate::crawler::{CrawlTarget, Site};
use crate::extract::extract;
use crate::fetch::validate_article;
use crate::storage::{DocumentStore, RawCache};

/// Result of reprocessing one site
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReprocessReport {
    /// Parsed files written
    pub written: usize,
    /// Documents whose extracted text failed validation
    pub rejected: usize,
    /// Stored URLs that map to no target
    pub unrecognized: usize,
    /// Parsed files that could not be written
    pub failed: usize,
}

/// Text written for one parsed article
pub fn parsed_text(title: &str, url: &str, site: Site, body: &str) -> String {
    format!(
        "Title: {}\nURL: {}\nSource: {}\n\n{}",
        title,
        url,
        site.as_str(),
        body
    )
}

/// Extracts every stored document of `site` into the parsed directory
pub fn reprocess_site(
    store: &dyn DocumentStore,
    cache: &RawCache,
    site: Site,
) -> crate::Result<ReprocessReport> {
    let documents = store.documents_by_source(site.as_str())?;
    tracing::info!("Reprocessing {} {} documents", documents.len(), site);

    let mut report = ReprocessReport::default();
    for document in &documents {
        let Some(target) = CrawlTarget::from_url(&document.url) else {
            tracing::debug!("No target for stored URL {}", document.url);
            report.unrecognized += 1;
            continue;
        };

        let article = extract(&document.raw_html, site);
        if let Err(e) = validate_article(&article.title, &article.body) {
            tracing::debug!("Rejected {}: {}", document.url, e);
            report.rejected += 1;
            continue;
        }

        let text = parsed_text(&article.title, &document.url, site, &article.body);
        match cache.write_parsed(&target, &text) {
            Ok(_) => report.written += 1,
            Err(e) => {
                tracing::warn!("Failed to write parsed text for {}: {}", target, e);
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        "{}: {} parsed, {} rejected, {} unrecognized, {} failed",
        site,
        report.written,
        report.rejected,
        report.unrecognized,
        report.failed
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SqliteStore;

    const ARTICLE: &str = r#"<html><body><h1>Vitality win IEM Cologne</h1>
        <div class="news-content"><p>Vitality beat MOUZ 2-0 in the grand final.</p></div>
        </body></html>"#;

    #[test]
    fn test_parsed_text_format() {
        assert_eq!(
            parsed_text("T", "https://www.hltv.org/news/1/t", Site::Hltv, "Body"),
            "Title: T\nURL: https://www.hltv.org/news/1/t\nSource: hltv\n\nBody"
        );
    }

    #[test]
    fn test_reprocess_writes_valid_articles() {
        let dir = tempfile::tempdir().unwrap();
        let cache = RawCache::new(dir.path());
        cache.ensure_dirs().unwrap();
        let store = SqliteStore::new_in_memory().unwrap();

        store
            .save("https://www.hltv.org/news/100/vitality-win", ARTICLE, "hltv")
            .unwrap();
        store
            .save(
                "https://www.hltv.org/news/101/empty",
                "<html><body><h1>Empty</h1></body></html>",
                "hltv",
            )
            .unwrap();
        store
            .save("https://www.hltv.org/matches/5/x", ARTICLE, "hltv")
            .unwrap();
        store
            .save("https://www.cybersport.ru/tags/cs2/other", ARTICLE, "cybersport")
            .unwrap();

        let report = reprocess_site(&store, &cache, Site::Hltv).unwrap();
        assert_eq!(
            report,
            ReprocessReport {
                written: 1,
                rejected: 1,
                unrecognized: 1,
                failed: 0
            }
        );

        let written =
            std::fs::read_to_string(cache.parsed_path(&CrawlTarget::hltv(100, "vitality-win")))
                .unwrap();
        assert!(written.starts_with(
            "Title: Vitality win IEM Cologne\nURL: https://www.hltv.org/news/100/vitality-win\nSource: hltv\n\n"
        ));
        assert!(written.ends_with("Vitality beat MOUZ 2-0 in the grand final."));
    }
}
