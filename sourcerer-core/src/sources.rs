//! Source content formatting.
//!
//! Turns retrieved documents into citation-tagged text lines
//! (`[citation]: content` without the brackets — the bracketing happens
//! in the model's answer). Order always matches input document order;
//! no re-ranking happens here.

use crate::types::ScoredDocument;

/// Format documents into one `"{citation}: {body}"` line each.
///
/// When `use_semantic_captions` is set and a document carries captions,
/// the caption snippets stand in for the full content. Image-citation
/// mode only changes how the citation key is derived.
pub fn format_sources(
    documents: &[ScoredDocument],
    use_semantic_captions: bool,
    use_image_citation: bool,
) -> Vec<String> {
    documents
        .iter()
        .map(|doc| {
            let citation = citation_key(doc.sourcepage.as_deref().unwrap_or(""), use_image_citation);
            let body = if use_semantic_captions && !doc.captions.is_empty() {
                let snippets: Vec<&str> = doc
                    .captions
                    .iter()
                    .map(|c| {
                        c.highlights
                            .first()
                            .map(String::as_str)
                            .unwrap_or(c.text.as_str())
                    })
                    .collect();
                nonewlines(&snippets.join(" . "))
            } else {
                nonewlines(&doc.content)
            };
            format!("{citation}: {body}")
        })
        .collect()
}

/// Derive the citation key for a source page.
///
/// Image mode cites the page image directly. Otherwise a rendered page
/// image `Name-3.png` is mapped back to its document page
/// `Name.pdf#page=3`; everything else passes through unchanged.
pub fn citation_key(sourcepage: &str, use_image_citation: bool) -> String {
    if use_image_citation {
        return sourcepage.to_string();
    }
    if let Some(stem) = sourcepage.strip_suffix(".png")
        && let Some(dash) = stem.rfind('-')
        && let Ok(page) = stem[dash + 1..].parse::<u32>()
    {
        return format!("{}.pdf#page={}", &stem[..dash], page);
    }
    sourcepage.to_string()
}

fn nonewlines(text: &str) -> String {
    text.replace('\n', " ").replace('\r', " ")
}
