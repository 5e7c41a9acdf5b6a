//! Text segmentation for interactive reading.
//!
//! Passages are shown sentence by sentence and word by word; hovering a word
//! narrates its spelling. None of these functions fail: degenerate input yields
//! an empty or single-element result.

use serde::Serialize;

/// A word as displayed, with the letter-by-letter form used for narration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WordView {
    pub display: String,
    pub spelling: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentenceView {
    pub text: String,
    pub words: Vec<WordView>,
}

/// Splits after `.`, `!` or `?` whenever the punctuation is followed by whitespace.
///
/// The punctuation stays with its sentence and the whitespace run is dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, c)) = chars.next() {
        if !matches!(c, '.' | '!' | '?') {
            continue;
        }
        let end = idx + c.len_utf8();
        let mut next_start = end;
        while let Some(&(ws_idx, ws)) = chars.peek() {
            if !ws.is_whitespace() {
                break;
            }
            next_start = ws_idx + ws.len_utf8();
            chars.next();
        }
        if next_start > end {
            push_non_empty(&mut sentences, &text[start..end]);
            start = next_start;
        }
    }
    push_non_empty(&mut sentences, &text[start..]);
    sentences
}

fn push_non_empty(out: &mut Vec<String>, piece: &str) {
    if !piece.is_empty() {
        out.push(piece.to_string());
    }
}

/// Splits on single spaces, keeping each token exactly as written.
pub fn split_words(sentence: &str) -> Vec<String> {
    sentence
        .split(' ')
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}

/// Letters only, separated by spaces: `"Cat,"` becomes `"C a t"`.
pub fn spelling_form(word: &str) -> String {
    let letters: Vec<String> = word
        .chars()
        .filter(|c| c.is_alphabetic())
        .map(String::from)
        .collect();
    letters.join(" ")
}

/// Full sentence/word breakdown of a passage.
pub fn segment(text: &str) -> Vec<SentenceView> {
    split_sentences(text)
        .into_iter()
        .map(|sentence| {
            let words = split_words(&sentence)
                .into_iter()
                .map(|display| WordView {
                    spelling: spelling_form(&display),
                    display,
                })
                .collect();
            SentenceView {
                text: sentence,
                words,
            }
        })
        .collect()
}
