//! TEI document loading.
//!
//! Three kinds of files share the TEI namespace:
//! - essays: `<s>` sentences holding `<w xml:id="..">` words, possibly
//!   wrapped in highlight elements
//! - word alignments: `<link type=".." prev="f#w1" next="f#w1"/>`
//! - annotated essays: `<note type=".." target="#w3">comment</note>`

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::NsReader;
use tracing::debug;

use crate::annotations::TeacherNote;
use crate::domain::{AlignmentEdge, Document, EditType, Result, RevalignError, Sentence, Token, TokenId};

const TEI_NS: &[u8] = b"http://www.tei-c.org/ns/1.0";

/// Link types describing the aligned files rather than tokens.
const BOOKKEEPING_LINK_TYPES: [&str; 2] = ["from_file", "to_file"];

/// Read a file, mapping a missing path to [`RevalignError::NotFound`].
pub fn read_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| {
        if e.kind() == ErrorKind::NotFound {
            RevalignError::NotFound(path.to_path_buf())
        } else {
            RevalignError::Io(e)
        }
    })
}

/// Load an essay into sentences and tokens.
pub fn load_document(path: &Path) -> Result<Document> {
    let xml = read_source(path)?;
    parse_document(path, &xml)
}

/// Load the alignment links of a `_wordAlign` file.
pub fn load_alignments(path: &Path) -> Result<Vec<AlignmentEdge>> {
    let xml = read_source(path)?;
    parse_alignments(path, &xml)
}

/// Load the teacher notes of an annotated essay.
pub fn load_notes(path: &Path) -> Result<Vec<TeacherNote>> {
    let xml = read_source(path)?;
    parse_notes(path, &xml)
}

fn in_tei(ns: &ResolveResult<'_>) -> bool {
    matches!(ns, ResolveResult::Bound(Namespace(uri)) if *uri == TEI_NS)
}

fn is_tei_element(ns: &ResolveResult<'_>, e: &BytesStart<'_>, local: &[u8]) -> bool {
    in_tei(ns) && e.local_name().as_ref() == local
}

fn attribute(e: &BytesStart<'_>, name: &str, source: &Path) -> Result<Option<String>> {
    let attr = e
        .try_get_attribute(name)
        .map_err(|err| RevalignError::malformed(source, err))?;
    attr.map(|a| {
        a.unescape_value()
            .map(|v| v.into_owned())
            .map_err(|err| RevalignError::malformed(source, err))
    })
    .transpose()
}

/// Token id from a `file#id` reference.
fn fragment(reference: &str) -> &str {
    reference
        .split_once('#')
        .map_or(reference, |(_, id)| id)
}

struct PendingWord {
    id: Option<String>,
    text: String,
}

/// Parse an essay. Words nested inside highlight wrappers count as direct
/// children of their sentence.
pub fn parse_document(source: &Path, xml: &str) -> Result<Document> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut sentences: Vec<Sentence> = Vec::new();
    let mut current: Option<Vec<Token>> = None;
    let mut word: Option<PendingWord> = None;

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| RevalignError::malformed(source, e))?;
        match event {
            Event::Start(e) if is_tei_element(&ns, &e, b"s") => {
                if current.is_some() {
                    return Err(RevalignError::malformed(source, "nested sentence element"));
                }
                current = Some(Vec::new());
            }
            Event::Empty(e) if is_tei_element(&ns, &e, b"s") => {
                if current.is_some() {
                    return Err(RevalignError::malformed(source, "nested sentence element"));
                }
                sentences.push(Sentence {
                    index: sentences.len(),
                    tokens: Vec::new(),
                });
            }
            Event::End(e) if in_tei(&ns) && e.local_name().as_ref() == b"s" => {
                let tokens = current.take().ok_or_else(|| {
                    RevalignError::malformed(source, "sentence closed before it was opened")
                })?;
                sentences.push(Sentence {
                    index: sentences.len(),
                    tokens,
                });
            }
            Event::Start(e) if current.is_some() && is_tei_element(&ns, &e, b"w") => {
                word = Some(PendingWord {
                    id: attribute(&e, "xml:id", source)?,
                    text: String::new(),
                });
            }
            Event::Text(t) => {
                if let Some(w) = word.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| RevalignError::malformed(source, e))?;
                    w.text.push_str(&text);
                }
            }
            Event::CData(t) => {
                if let Some(w) = word.as_mut() {
                    w.text.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Event::End(e) if in_tei(&ns) && e.local_name().as_ref() == b"w" => {
                let (Some(w), Some(tokens)) = (word.take(), current.as_mut()) else {
                    continue;
                };
                // Words without an identifier or text cannot be aligned.
                if let Some(id) = w.id.filter(|_| !w.text.is_empty()) {
                    tokens.push(Token {
                        id: TokenId::new(id),
                        text: w.text,
                        sentence: sentences.len(),
                    });
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if current.is_some() {
        return Err(RevalignError::malformed(source, "unterminated sentence element"));
    }
    if sentences.is_empty() {
        return Err(RevalignError::malformed(source, "no sentence elements"));
    }

    let document = Document::new(source, sentences);
    debug!(
        path = %source.display(),
        sentences = document.sentences().len(),
        tokens = document.token_count(),
        "document loaded"
    );
    Ok(document)
}

/// Parse alignment links. Links carrying a `target` attribute describe the
/// source files and are never part of the token alignment.
pub fn parse_alignments(source: &Path, xml: &str) -> Result<Vec<AlignmentEdge>> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut edges = Vec::new();
    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| RevalignError::malformed(source, e))?;
        match event {
            Event::Start(e) | Event::Empty(e) if is_tei_element(&ns, &e, b"link") => {
                if attribute(&e, "target", source)?.is_some() {
                    continue;
                }
                let kind = attribute(&e, "type", source)?
                    .ok_or_else(|| RevalignError::malformed(source, "link without type"))?;
                if BOOKKEEPING_LINK_TYPES.contains(&kind.as_str()) {
                    continue;
                }
                let edit: EditType = kind
                    .parse()
                    .map_err(|err| RevalignError::malformed(source, err))?;
                let original = attribute(&e, "prev", source)?;
                let revised = attribute(&e, "next", source)?;
                edges.push(AlignmentEdge::new(
                    original.as_deref().map(fragment).filter(|id| !id.is_empty()),
                    revised.as_deref().map(fragment).filter(|id| !id.is_empty()),
                    edit,
                ));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    debug!(path = %source.display(), edges = edges.len(), "alignments loaded");
    Ok(edges)
}

/// Parse teacher notes. Text of nested elements belongs to the enclosing note.
pub fn parse_notes(source: &Path, xml: &str) -> Result<Vec<TeacherNote>> {
    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut notes = Vec::new();
    let mut pending: Option<(TeacherNote, String)> = None;
    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| RevalignError::malformed(source, e))?;
        match event {
            Event::Start(e) if pending.is_none() && is_tei_element(&ns, &e, b"note") => {
                pending = Some((note_attributes(&e, source)?, String::new()));
            }
            Event::Empty(e) if pending.is_none() && is_tei_element(&ns, &e, b"note") => {
                notes.push(note_attributes(&e, source)?);
            }
            Event::Text(t) => {
                if let Some((_, text)) = pending.as_mut() {
                    let chunk = t
                        .unescape()
                        .map_err(|e| RevalignError::malformed(source, e))?;
                    if !text.is_empty() {
                        text.push(' ');
                    }
                    text.push_str(&chunk);
                }
            }
            Event::End(e) if in_tei(&ns) && e.local_name().as_ref() == b"note" => {
                if let Some((mut note, text)) = pending.take() {
                    note.text = Some(text).filter(|t| !t.is_empty());
                    notes.push(note);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    debug!(path = %source.display(), notes = notes.len(), "notes loaded");
    Ok(notes)
}

fn note_attributes(e: &BytesStart<'_>, source: &Path) -> Result<TeacherNote> {
    Ok(TeacherNote {
        text: None,
        code: attribute(e, "type", source)?,
        target: attribute(e, "target", source)?,
    })
}
