//! Comment filtering: keeping teacher comments that carry local linguistic
//! feedback and dropping extraction junk, dates, phonetic transcriptions and
//! (optionally) praise or holistic remarks.

use regex::Regex;

/// Decides which open-ended comments enter the output, and in what form.
pub trait CommentFilter {
    /// The cleaned comment, or `None` when it should be discarded.
    fn filter(&self, comment: &str, course: &str) -> Option<String>;
}

/// Keeps every non-empty comment unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThrough;

impl CommentFilter for PassThrough {
    fn filter(&self, comment: &str, _course: &str) -> Option<String> {
        Some(comment.to_string()).filter(|c| !c.is_empty())
    }
}

/// Comments this long or longer are essays of their own, not feedback.
pub const DEFAULT_MAX_COMMENT_LEN: usize = 300;
const MIN_ALPHA_RATIO: f64 = 0.4;
const JUNK_MAX_LEN: usize = 40;
const DATE_MAX_WORDS: usize = 4;
const PHONETIC_MAX_WORDS: usize = 6;
const PRAISE_MAX_LEN: usize = 100;

const JUNK_CASE_SENSITIVE: &[&str] = &[
    "See memo", "BE ,T1", "BE, T2", "Quantity", "Discount", "Birthday", "Aspect", "Microsoft",
    "eV / kT", "if !vml", "endif", "if !supportLists", "Object.Method()", "#NAME?", "https://",
    "http : / / ", "if !support", "if !  support", "page:Section", "7a-7b",
];

const JUNK_CASE_INSENSITIVE: &[&str] = &[
    "salestime", "salesdate", "sales date", "sales time", "unitpricehk", "unitinstock",
    "branchzone", "productid", "online",
];

const MONTHS: &[&str] = &[
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

const PHONETIC_SYMBOLS: &[&str] = &[
    "ʦ", "ʱ", "ʰ", "ʂ", "ɕ", "ʑ", "ʨ", "æ", "ɲ", "ʎ", "ɳ", "ṣ", "ẓ",
];

/// Courses whose comments may be phonetic transcriptions.
const PHONETIC_COURSE_PREFIX: &str = "CTL";

/// Phrases and adjectives identifying praise-only or holistic comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PraiseLexicon {
    /// Matched anywhere in the comment regardless of length.
    pub markers: Vec<String>,
    /// A short comment containing one of these is praise.
    pub adjectives: Vec<String>,
    /// Generated `<adjective> <noun>` phrases.
    pub phrases: Vec<String>,
}

const PRAISE_ADJECTIVES: &[&str] = &["good", "great", "nice", "excellent", "wonderful"];

const PRAISE_NOUNS: &[&str] = &[
    "topic", "draft", "first draft", "second draft", "final draft", "work", "attempt", "try",
    "effort", "job", "response", "improvement", "writing", "essay", "piece", "report", "website",
    "opening", "begining", "introduction", "intro", "start", "title", "tittle", "paragraph",
    "reference", "inclusion", "sentence", "background", "discussion", "lead", "changes",
    "analysis", "conclusion", "summary", "overview", "structure", "grouping", "comparison",
    "definition", "expression", "explanation", "evaluation", "content", "insight", "point",
    "understanding", "teamwork", "cause", "clarity", "choice", "use", "way", "placement",
    "organisation",
];

const LINKING_PRAISE_NOUNS: &[&str] = &[
    "link", "linking", "signpost", "signposting", "connector", "connective",
];

impl PraiseLexicon {
    /// Praise phrases of the study. `linking` adds nouns naming linking
    /// devices, so that "good linking" counts as praise too.
    pub fn standard(linking: bool) -> Self {
        let mut nouns: Vec<&str> = PRAISE_NOUNS.to_vec();
        if linking {
            nouns.extend(LINKING_PRAISE_NOUNS);
        }
        let mut phrases = vec!["good luck".to_string(), "nicely".to_string()];
        for adj in PRAISE_ADJECTIVES {
            phrases.push(format!("{adj}!"));
            phrases.push(format!("{adj} !"));
            phrases.extend(nouns.iter().map(|noun| format!("{adj} {noun}")));
        }
        Self {
            markers: ["end comment", "comments:", "dear"]
                .map(String::from)
                .to_vec(),
            adjectives: ["good", "great", "nice", "excellent", "wonderful", "lovely"]
                .map(String::from)
                .to_vec(),
            phrases,
        }
    }

    /// True for comments that assess the essay as a whole rather than
    /// asking for a local revision. Tuned for precision over recall.
    pub fn is_holistic(&self, comment: &str) -> bool {
        let comment = comment.to_lowercase().replace("  ", " ");
        let short = comment.chars().count() <= PRAISE_MAX_LEN;

        if self.markers.iter().any(|m| comment.contains(m.as_str())) {
            return true;
        }
        let squashed = comment.replace(' ', "");
        for adj in &self.adjectives {
            if *adj == squashed || comment == format!("very {adj}") {
                return true;
            }
            if short && comment.contains(adj.as_str()) {
                return true;
            }
        }
        let negated = comment.contains("not") || comment.contains("n't");
        self.phrases
            .iter()
            .any(|p| *p == comment || (short && !negated && comment.contains(p.as_str())))
    }
}

/// The study's heuristic comment filter.
#[derive(Debug, Clone)]
pub struct HeuristicCommentFilter {
    max_len: usize,
    praise: Option<PraiseLexicon>,
    noise: Vec<Regex>,
}

impl HeuristicCommentFilter {
    /// `praise`: when set, praise-only and holistic comments are dropped.
    pub fn new(praise: Option<PraiseLexicon>) -> Self {
        let noise = [r"\[ ?\d* ?\]?", r"Figure \d+", r"photo \d+", r"see \d+"]
            .iter()
            .filter_map(|pattern| Regex::new(pattern).ok())
            .collect();
        Self {
            max_len: DEFAULT_MAX_COMMENT_LEN,
            praise,
            noise,
        }
    }

    /// Keep only comments shorter than `max_len` characters.
    pub fn with_max_len(mut self, max_len: usize) -> Self {
        self.max_len = max_len;
        self
    }

    /// Strip editor debris: a leading `{`, `|` separators, bracketed
    /// reference numbers and figure/photo/page pointers.
    pub fn clean(&self, comment: &str) -> String {
        let stripped = comment.trim_start_matches('{').replace('|', "");
        self.noise.iter().fold(stripped, |acc, re| {
            re.replace_all(&acc, "").into_owned()
        })
    }
}

impl Default for HeuristicCommentFilter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl CommentFilter for HeuristicCommentFilter {
    fn filter(&self, comment: &str, course: &str) -> Option<String> {
        let comment = self.clean(comment);
        if comment.is_empty() {
            return None;
        }
        let words: Vec<&str> = comment.split(' ').filter(|w| !w.is_empty()).collect();

        let keep = comment.chars().count() < self.max_len
            && has_enough_alpha(&comment)
            && !is_junk(&comment)
            && !is_mostly_phonetic(&words, course)
            && !is_date(&words)
            && !self.praise.as_ref().is_some_and(|p| p.is_holistic(&comment));
        keep.then_some(comment)
    }
}

/// Alphabetic characters (ignoring spaces and `#`) make up at least 40% of
/// the full comment length.
pub fn has_enough_alpha(comment: &str) -> bool {
    let total = comment.chars().count();
    if total == 0 {
        return false;
    }
    let alpha = comment
        .chars()
        .filter(|c| *c != ' ' && *c != '#' && c.is_alphabetic())
        .count();
    alpha as f64 / total as f64 >= MIN_ALPHA_RATIO
}

/// Short comments that are spreadsheet cells, markup remnants or URLs.
pub fn is_junk(comment: &str) -> bool {
    if comment.chars().count() >= JUNK_MAX_LEN {
        return false;
    }
    let lower = comment.to_lowercase();
    JUNK_CASE_SENSITIVE.iter().any(|j| comment.contains(j))
        || JUNK_CASE_INSENSITIVE.iter().any(|j| lower.contains(j))
}

/// A handful of words naming a month.
pub fn is_date(words: &[&str]) -> bool {
    words.len() <= DATE_MAX_WORDS
        && words
            .iter()
            .any(|w| MONTHS.contains(&w.replace(',', "").as_str()))
}

/// Pronunciation-course comments made of phonetic symbols.
pub fn is_mostly_phonetic(words: &[&str], course: &str) -> bool {
    if !course.starts_with(PHONETIC_COURSE_PREFIX) || words.len() > PHONETIC_MAX_WORDS {
        return false;
    }
    let has_vowel = words
        .iter()
        .any(|w| w.chars().any(|c| matches!(c, 'a' | 'e' | 'i' | 'o' | 'u')));
    !has_vowel
        || words
            .iter()
            .any(|w| PHONETIC_SYMBOLS.iter().any(|s| w.contains(s)))
}
