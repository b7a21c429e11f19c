use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::{ErrorContext, Result};

/// Rewrite root-absolute asset references in a document so it can be served
/// from an arbitrary sub-path: `href="/…` and `src="/…` become `href="./…`
/// and `src="./…`. Idempotent: rewritten prefixes no longer match.
pub fn rewrite_asset_refs(html: &str) -> String {
    let re = Regex::new(r#"(href|src)="/"#).expect("static pattern");
    re.replace_all(html, "${1}=\"./").to_string()
}

/// Apply [`rewrite_asset_refs`] to the entry document of a build output
/// directory. Only the top-level `index.html` is touched; script bundles are
/// left alone. Returns whether an entry document was found.
pub fn rewrite_entry_html(output_dir: &Path) -> Result<bool> {
    let index = output_dir.join("index.html");
    if !index.is_file() {
        return Ok(false);
    }

    let html = fs::read_to_string(&index)
        .with_io_context(|| format!("reading {}", index.display()))?;
    let rewritten = rewrite_asset_refs(&html);

    if rewritten != html {
        fs::write(&index, rewritten)
            .with_io_context(|| format!("writing {}", index.display()))?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_refs_become_relative() {
        let html = r#"<link href="/assets/index.css"><script src="/assets/index.js"></script>"#;
        let out = rewrite_asset_refs(html);
        assert_eq!(
            out,
            r#"<link href="./assets/index.css"><script src="./assets/index.js"></script>"#
        );
    }

    #[test]
    fn relative_refs_are_untouched() {
        let html = r#"<link href="./style.css"><img src="img/logo.png">"#;
        assert_eq!(rewrite_asset_refs(html), html);
    }

    #[test]
    fn rewriting_twice_equals_rewriting_once() {
        let html = r#"<a href="/page"><img src="/logo.svg"></a>"#;
        let once = rewrite_asset_refs(html);
        let twice = rewrite_asset_refs(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn entry_document_is_rewritten_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let index = tmp.path().join("index.html");
        std::fs::write(&index, r#"<script src="/assets/app.js"></script>"#).unwrap();
        std::fs::write(tmp.path().join("other.html"), r#"<a href="/x">x</a>"#).unwrap();

        assert!(rewrite_entry_html(tmp.path()).unwrap());
        assert_eq!(
            std::fs::read_to_string(&index).unwrap(),
            r#"<script src="./assets/app.js"></script>"#
        );
        // Only the entry document is processed
        assert_eq!(
            std::fs::read_to_string(tmp.path().join("other.html")).unwrap(),
            r#"<a href="/x">x</a>"#
        );
    }

    #[test]
    fn missing_entry_document_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(!rewrite_entry_html(tmp.path()).unwrap());
    }
}
