//! Paragraph splitting on blank-line boundaries.
//!
//! A paragraph is any non-empty run of text delimited by two consecutive
//! newlines. Callers choose between two output shapes depending on how chunk
//! ids will be assigned: a flattened sequence across all pages, or a nested
//! per-page sequence that preserves page boundaries.

use std::sync::OnceLock;

use regex::Regex;

fn paragraph_break() -> &'static Regex {
    static BREAK: OnceLock<Regex> = OnceLock::new();
    BREAK.get_or_init(|| Regex::new(r"\n\n").expect("paragraph break pattern"))
}

/// Splits one page's text into trimmed, non-empty paragraphs.
pub fn split_page(text: &str) -> Vec<String> {
    paragraph_break()
        .split(text)
        .map(str::trim)
        .filter(|fragment| !fragment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits every page, preserving page boundaries.
pub fn split_pages(pages: &[String]) -> Vec<Vec<String>> {
    pages.iter().map(|page| split_page(page)).collect()
}

/// Splits every page into one flat sequence; page boundaries are lost.
pub fn split_pages_flat(pages: &[String]) -> Vec<String> {
    pages.iter().flat_map(|page| split_page(page)).collect()
}

/// How chunk ids are derived during indexing.
///
/// Ids are opaque keys downstream, but a collection built with one scheme
/// should be extended with the same scheme, so the choice is an explicit
/// parameter rather than two divergent code paths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChunkIdStrategy {
    /// Sequential ordinal across all pages: `0`, `1`, `2`, ...
    #[default]
    Flat,
    /// Composite page/paragraph pair: `page_0_para_0`, `page_0_para_1`, ...
    PerPage,
}

/// A paragraph chunk with its assigned id and source page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabeledChunk {
    pub id: String,
    /// Zero-based page the paragraph came from.
    pub page: usize,
    pub content: String,
}

/// Splits pages into paragraphs and assigns ids under the chosen strategy.
///
/// Surviving paragraphs keep their original order in both schemes.
pub fn label_chunks(pages: &[String], strategy: ChunkIdStrategy) -> Vec<LabeledChunk> {
    let mut chunks = Vec::new();
    let mut flat_ordinal = 0usize;

    for (page_index, paragraphs) in split_pages(pages).into_iter().enumerate() {
        for (para_index, content) in paragraphs.into_iter().enumerate() {
            let id = match strategy {
                ChunkIdStrategy::Flat => flat_ordinal.to_string(),
                ChunkIdStrategy::PerPage => format!("page_{page_index}_para_{para_index}"),
            };
            chunks.push(LabeledChunk {
                id,
                page: page_index,
                content,
            });
            flat_ordinal += 1;
        }
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pages() -> Vec<String> {
        vec![
            "Ohm's law relates voltage and current.\n\n  \n\nPower equals voltage times current.".to_string(),
            String::new(),
            "Kirchhoff's current law.\n\nKirchhoff's voltage law.".to_string(),
        ]
    }

    #[test]
    fn whitespace_only_fragments_are_discarded() {
        let paragraphs = split_page("first\n\n   \n\n\t\n\nsecond");
        assert_eq!(paragraphs, vec!["first", "second"]);
    }

    #[test]
    fn nested_shape_preserves_page_boundaries() {
        let nested = split_pages(&pages());
        assert_eq!(nested.len(), 3);
        assert_eq!(nested[0].len(), 2);
        assert!(nested[1].is_empty());
        assert_eq!(nested[2].len(), 2);
    }

    #[test]
    fn flat_shape_preserves_paragraph_order() {
        let flat = split_pages_flat(&pages());
        assert_eq!(flat.len(), 4);
        assert!(flat[0].starts_with("Ohm's law"));
        assert!(flat[1].starts_with("Power equals"));
        assert!(flat[2].starts_with("Kirchhoff's current"));
        assert!(flat[3].starts_with("Kirchhoff's voltage"));
    }

    #[test]
    fn flat_ids_are_sequential_across_pages() {
        let chunks = label_chunks(&pages(), ChunkIdStrategy::Flat);
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["0", "1", "2", "3"]);
        assert_eq!(chunks[2].page, 2);
    }

    #[test]
    fn per_page_ids_restart_on_each_page() {
        let chunks = label_chunks(&pages(), ChunkIdStrategy::PerPage);
        let ids: Vec<&str> = chunks.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(
            ids,
            vec![
                "page_0_para_0",
                "page_0_para_1",
                "page_2_para_0",
                "page_2_para_1",
            ]
        );
    }

    #[test]
    fn single_newlines_do_not_split() {
        let paragraphs = split_page("line one\nline two\n\nnext paragraph");
        assert_eq!(paragraphs, vec!["line one\nline two", "next paragraph"]);
    }
}
