use serde::Serialize;

/// A sentence of the transcript together with its position in it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Sentence<'a> {
    /// Zero-based position in the transcript; unique per segmentation
    pub index: usize,
    /// Verbatim slice of the transcript, terminator included
    pub text: &'a str,
}

fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?')
}

/// Split text into sentences on runs of `.`, `!` and `?`.
///
/// Each sentence keeps its terminating run and is trimmed of surrounding
/// whitespace. Fragments with nothing before the terminator are dropped, so
/// `"Wait... what?!"` yields `["Wait...", "what?!"]` and `"!!"` yields nothing.
pub fn segment(text: &str) -> Vec<Sentence<'_>> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((pos, c)) = chars.next() {
        if !is_terminator(c) {
            continue;
        }

        let body_end = pos;
        let mut end = pos + c.len_utf8();
        while let Some(&(next_pos, next)) = chars.peek() {
            if !is_terminator(next) {
                break;
            }
            end = next_pos + next.len_utf8();
            chars.next();
        }

        push_fragment(&mut sentences, text, start, body_end, end);
        start = end;
    }

    push_fragment(&mut sentences, text, start, text.len(), text.len());
    sentences
}

fn push_fragment<'a>(
    sentences: &mut Vec<Sentence<'a>>,
    text: &'a str,
    start: usize,
    body_end: usize,
    end: usize,
) {
    if text[start..body_end].trim().is_empty() {
        return;
    }

    sentences.push(Sentence {
        index: sentences.len(),
        text: text[start..end].trim(),
    });
}
