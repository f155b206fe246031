//! Title and body extraction from stored article markup

use crate::crawler::Site;
use scraper::{ElementRef, Html, Selector};

/// Paragraphs shorter than this (in bytes) are ignored on HLTV pages
const HLTV_MIN_PARAGRAPH: usize = 15;

/// Paragraphs must be longer than this (in bytes) on Cybersport pages
const CYBERSPORT_MIN_PARAGRAPH: usize = 20;

/// Below this many bytes, Cybersport extraction falls back to every paragraph
const CYBERSPORT_FALLBACK_BELOW: usize = 500;

/// Containers that hold the news text on HLTV, tried in order
const HLTV_CONTAINERS: &[&str] = &[
    ".news-content",
    ".article-content",
    ".standard-box .bodyshot-team",
    "article.newspost",
    ".newstext",
];

const CYBERSPORT_CONTAINERS: &str = ".article-content, .content, article, .post-content";

/// Extracted article text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Article {
    pub title: String,
    pub body: String,
}

/// Extracts the title and body text of an article page
pub fn extract(markup: &str, site: Site) -> Article {
    let document = Html::parse_document(markup);
    let title = first_heading(&document);
    let body = match site {
        Site::Hltv => hltv_body(&document),
        Site::Cybersport => cybersport_body(&document),
    };
    Article {
        title,
        body: body.trim().to_string(),
    }
}

fn first_heading(document: &Html) -> String {
    Selector::parse("h1")
        .ok()
        .and_then(|selector| document.select(&selector).next().map(element_text))
        .unwrap_or_default()
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn push_paragraph(body: &mut String, element: ElementRef<'_>, text: &str) {
    if element.value().name() == "blockquote" {
        body.push_str("> ");
    }
    body.push_str(text);
    body.push_str("\n\n");
}

fn hltv_body(document: &Html) -> String {
    let Ok(paragraphs) = Selector::parse("p, blockquote") else {
        return String::new();
    };

    let mut body = String::new();
    for container_css in HLTV_CONTAINERS {
        let Ok(container) = Selector::parse(container_css) else {
            continue;
        };
        for element in document.select(&container) {
            for paragraph in element.select(&paragraphs) {
                let text = element_text(paragraph);
                if text.len() >= HLTV_MIN_PARAGRAPH {
                    push_paragraph(&mut body, paragraph, &text);
                }
            }
        }
        if !body.is_empty() {
            return body;
        }
    }

    for paragraph in document.select(&paragraphs) {
        if in_page_chrome(paragraph) {
            continue;
        }
        let text = element_text(paragraph);
        if text.len() < HLTV_MIN_PARAGRAPH || looks_like_code(&text) {
            continue;
        }
        push_paragraph(&mut body, paragraph, &text);
    }
    body
}

fn cybersport_body(document: &Html) -> String {
    let Ok(paragraphs) = Selector::parse("p") else {
        return String::new();
    };

    let mut body = String::new();
    if let Ok(containers) = Selector::parse(CYBERSPORT_CONTAINERS) {
        for container in document.select(&containers) {
            for paragraph in container.select(&paragraphs) {
                let text = element_text(paragraph);
                if text.len() > CYBERSPORT_MIN_PARAGRAPH {
                    push_paragraph(&mut body, paragraph, &text);
                }
            }
        }
    }

    if body.len() < CYBERSPORT_FALLBACK_BELOW {
        body.clear();
        for paragraph in document.select(&paragraphs) {
            let text = element_text(paragraph);
            if text.len() > CYBERSPORT_MIN_PARAGRAPH {
                push_paragraph(&mut body, paragraph, &text);
            }
        }
    }
    body
}

/// True for paragraphs inside scripts, navigation, headers, footers,
/// comment threads or forum widgets
fn in_page_chrome(element: ElementRef<'_>) -> bool {
    let inside_chrome = element.ancestors().filter_map(ElementRef::wrap).any(|a| {
        matches!(
            a.value().name(),
            "script" | "style" | "noscript" | "nav" | "header" | "footer"
        )
    });
    if inside_chrome {
        return true;
    }

    let parent_class = element
        .parent()
        .and_then(ElementRef::wrap)
        .and_then(|parent| parent.value().attr("class"))
        .unwrap_or_default();
    ["comment", "forum", "navigation"]
        .iter()
        .any(|marker| parent_class.contains(marker))
}

fn looks_like_code(text: &str) -> bool {
    (text.contains('{') && text.contains('}'))
        || text.contains("window.")
        || text.contains("document.")
        || text.contains("appendChild")
        || text.contains("createElement")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hltv_container_paragraphs() {
        let html = r#"
            <html><body>
            <h1> NAVI win the major </h1>
            <div class="news-content">
                <p>NAVI have won the PGL Major in Stockholm.</p>
                <p>short</p>
                <blockquote>We played our best CS this year.</blockquote>
            </div>
            <p>Outside paragraph that should be ignored here.</p>
            </body></html>
        "#;
        let article = extract(html, Site::Hltv);
        assert_eq!(article.title, "NAVI win the major");
        assert_eq!(
            article.body,
            "NAVI have won the PGL Major in Stockholm.\n\n> We played our best CS this year."
        );
    }

    #[test]
    fn test_hltv_fallback_skips_chrome_and_code() {
        let html = r#"
            <html><body>
            <h1>Title</h1>
            <nav><p>Navigation paragraph long enough</p></nav>
            <div class="comment-body"><p>A forum comment that is long</p></div>
            <p>var x = { a: 1 }; window.foo = bar;</p>
            <p>The actual article paragraph text.</p>
            </body></html>
        "#;
        let article = extract(html, Site::Hltv);
        assert_eq!(article.body, "The actual article paragraph text.");
    }

    #[test]
    fn test_cybersport_containers() {
        let html = r#"
            <html><body>
            <h1>s1mple возвращается</h1>
            <div class="post-content">
                <p>Александр «s1mple» Костылев вернулся в основной состав.</p>
                <p>коротко</p>
            </div>
            </body></html>
        "#;
        let article = extract(html, Site::Cybersport);
        assert_eq!(article.title, "s1mple возвращается");
        assert!(article.body.starts_with("Александр «s1mple» Костылев"));
        assert!(!article.body.contains("коротко\n"));
    }

    #[test]
    fn test_missing_title_is_empty() {
        let article = extract("<p>no heading here at all</p>", Site::Hltv);
        assert_eq!(article.title, "");
    }
}
