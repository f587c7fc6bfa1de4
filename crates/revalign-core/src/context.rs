//! Sentence context reconstruction around highlighted tokens.
//!
//! Upstream sentence splitting breaks on encoding debris, so a "sentence"
//! may be a fragment such as `? of the results .`. The reconstructor marks
//! the highlighted tokens, repairs fragments by merging neighbours, and adds
//! one sentence of context per side.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::domain::{Document, TokenId};

/// Sentences shorter than this are treated as split fragments.
pub const MIN_SENTENCE_CHARS: usize = 20;

/// Text left behind by characters lost during corpus extraction.
pub const PLACEHOLDER: &str = "?";

const MARK_OPEN: &str = "[[";
const MARK_CLOSE: &str = "]]";

/// Marked target text and the text around it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextWindow {
    /// Every sentence touched by the highlight, highlighted tokens in `[[..]]`.
    pub target: String,
    /// `target` with one neighbouring sentence on each side.
    pub extended: String,
}

/// Wrap a token in highlight markers.
pub fn mark(text: &str) -> String {
    format!("{MARK_OPEN}{text}{MARK_CLOSE}")
}

/// Reconstruct the context of `highlighted` in `document`.
///
/// `None` when no highlighted token occurs in the document; the caller
/// cannot relocate the sentence and should discard the error instance.
pub fn locate(document: &Document, highlighted: &[TokenId]) -> Option<ContextWindow> {
    let wanted: HashSet<&TokenId> = highlighted.iter().collect();
    let rendered: Vec<RenderedSentence> = document
        .sentences()
        .iter()
        .map(|sentence| {
            let mut matches = 0;
            let words: Vec<String> = sentence
                .tokens
                .iter()
                .map(|token| {
                    if wanted.contains(&token.id) {
                        matches += 1;
                        mark(&token.text)
                    } else {
                        token.text.clone()
                    }
                })
                .collect();
            RenderedSentence {
                matches,
                text: words.join(" "),
            }
        })
        .collect();

    let touched: Vec<usize> = rendered
        .iter()
        .enumerate()
        .filter(|(_, s)| s.matches > 0)
        .map(|(i, _)| i)
        .collect();
    let (&first, &last) = (touched.first()?, touched.last()?);
    let mut span = Span {
        first,
        last,
        text: join_parts(touched.iter().map(|&i| rendered[i].text.as_str())),
    };

    if is_fragment(&span.text) {
        span = expand(&rendered, &span);
    }
    let extended = expand(&rendered, &span).text;

    Some(ContextWindow {
        target: span.text,
        extended,
    })
}

struct RenderedSentence {
    matches: usize,
    text: String,
}

/// Sentence range `first..=last` and the text standing for it.
struct Span {
    first: usize,
    last: usize,
    text: String,
}

/// Target text that looks like a sentence-split fragment.
fn is_fragment(text: &str) -> bool {
    let starts_with_placeholder =
        text.starts_with(PLACEHOLDER) || text.starts_with(&mark(PLACEHOLDER));
    let starts_lowercase = text.chars().next().is_some_and(char::is_lowercase);
    let unmarked_len = text.chars().filter(|c| *c != '[' && *c != ']').count();
    starts_with_placeholder || starts_lowercase || unmarked_len < MIN_SENTENCE_CHARS
}

fn is_trivial(text: &str) -> bool {
    text == PLACEHOLDER || text.chars().count() < MIN_SENTENCE_CHARS
}

/// Add one sentence on each side of `span`. A trivial neighbour brings the
/// sentence beyond it along, at most once per side.
fn expand(sentences: &[RenderedSentence], span: &Span) -> Span {
    let mut first = span.first;
    let mut last = span.last;

    let mut before: Vec<&str> = Vec::new();
    if first > 0 {
        first -= 1;
        before.push(&sentences[first].text);
        if is_trivial(&sentences[first].text) && first > 0 {
            first -= 1;
            before.insert(0, &sentences[first].text);
        }
    }

    let mut after: Vec<&str> = Vec::new();
    if last + 1 < sentences.len() {
        last += 1;
        after.push(&sentences[last].text);
        if is_trivial(&sentences[last].text) && last + 1 < sentences.len() {
            last += 1;
            after.push(&sentences[last].text);
        }
    }

    let text = join_parts(
        before
            .into_iter()
            .chain(std::iter::once(span.text.as_str()))
            .chain(after),
    );
    Span { first, last, text }
}

fn join_parts<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    parts
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Spaced numeric character references left by the corpus export, and
/// their replacements.
const ENTITY_REPAIRS: [(&str, &str); 8] = [
    ("& # 8211 ;", "-"),
    ("& # 8212 ;", "--"),
    ("& # 8217 ;", "'"),
    ("& # 8220 ;", "\""),
    ("& # 8221 ;", "\""),
    ("& # 8230 ;", "..."),
    ("& # 160 ;", " "),
    ("& # 160", " "),
];

/// Replace spaced numeric entities (`& # 8217 ;`) with their characters and
/// drop any remaining `& #` debris.
pub fn repair_entities(text: &str) -> String {
    let repaired = ENTITY_REPAIRS
        .iter()
        .fold(text.to_string(), |acc, (entity, replacement)| {
            acc.replace(entity, replacement)
        });
    repaired.replace("& #", "")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(raw: &[&str]) -> Vec<TokenId> {
        raw.iter().map(|s| TokenId::from(*s)).collect()
    }

    fn essay() -> Document {
        Document::from_sentences(
            "essay.xml",
            vec![
                vec![("w1", "The"), ("w2", "survey"), ("w3", "covered"), ("w4", "three"), ("w5", "districts"), ("w6", ".")],
                vec![("w7", "However"), ("w8", "the"), ("w9", "results"), ("w10", "were"), ("w11", "mixed"), ("w12", ".")],
                vec![("w13", "Most"), ("w14", "people"), ("w15", "answered"), ("w16", "online"), ("w17", ".")],
            ],
        )
    }

    #[test]
    fn marks_tokens_and_adds_neighbours() {
        let window = locate(&essay(), &ids(&["w7"])).unwrap();
        assert_eq!(window.target, "[[However]] the results were mixed .");
        assert_eq!(
            window.extended,
            "The survey covered three districts . [[However]] the results were mixed . Most people answered online ."
        );
    }

    #[test]
    fn span_covers_every_touched_sentence() {
        let window = locate(&essay(), &ids(&["w6", "w7"])).unwrap();
        assert_eq!(
            window.target,
            "The survey covered three districts [[.]] [[However]] the results were mixed ."
        );
        assert!(window.extended.ends_with("answered online ."));
    }

    #[test]
    fn unknown_tokens_yield_none() {
        assert!(locate(&essay(), &ids(&["w99"])).is_none());
        assert!(locate(&essay(), &[]).is_none());
    }

    #[test]
    fn lowercase_fragment_merges_neighbours() {
        let doc = Document::from_sentences(
            "essay.xml",
            vec![
                vec![("w1", "Our"), ("w2", "group"), ("w3", "visited"), ("w4", "the"), ("w5", "harbour")],
                vec![("w6", "and"), ("w7", "the"), ("w8", "old"), ("w9", "market"), ("w10", "yesterday")],
                vec![("w11", "Everyone"), ("w12", "enjoyed"), ("w13", "the"), ("w14", "trip"), ("w15", "a"), ("w16", "lot")],
                vec![("w17", "We"), ("w18", "will"), ("w19", "return"), ("w20", "next"), ("w21", "spring")],
            ],
        );
        let window = locate(&doc, &ids(&["w8"])).unwrap();
        assert_eq!(
            window.target,
            "Our group visited the harbour and the [[old]] market yesterday Everyone enjoyed the trip a lot"
        );
        assert_eq!(
            window.extended,
            format!("{} We will return next spring", window.target)
        );
    }

    #[test]
    fn short_neighbour_pulls_in_the_next_one() {
        let doc = Document::from_sentences(
            "essay.xml",
            vec![
                vec![("w1", "This"), ("w2", "first"), ("w3", "sentence"), ("w4", "is"), ("w5", "long"), ("w6", "enough")],
                vec![("w7", "?")],
                vec![("w8", "Therefore"), ("w9", "the"), ("w10", "plan"), ("w11", "needs"), ("w12", "revision")],
            ],
        );
        let window = locate(&doc, &ids(&["w8"])).unwrap();
        assert_eq!(window.target, "[[Therefore]] the plan needs revision");
        assert_eq!(
            window.extended,
            "This first sentence is long enough ? [[Therefore]] the plan needs revision"
        );
    }

    #[test]
    fn locate_is_idempotent() {
        let doc = essay();
        let span = ids(&["w9", "w10"]);
        assert_eq!(locate(&doc, &span), locate(&doc, &span));
    }

    #[test]
    fn repairs_spaced_entities() {
        assert_eq!(repair_entities("don & # 8217 ;t"), "don't");
        assert_eq!(repair_entities("wait & # 8230 ;"), "wait ...");
        assert_eq!(repair_entities("a & # 160 ; b"), "a   b");
        assert_eq!(repair_entities("odd & #x"), "odd x");
        assert_eq!(repair_entities("in 1600"), "in 1600");
    }
}
