use super::error::PipelineError;
use super::model::TextUnit;

/// Most TTS backends cap the text per request; the Google Translate endpoint
/// accepts roughly 200 characters.
pub const DEFAULT_MAX_UNIT_CHARS: usize = 200;

/// Collapse all whitespace runs (including newlines) to a single space and
/// trim the ends. PDF extraction output is full of hard line breaks.
pub fn normalize(text: &str) -> String {
    let whitespace = regex::Regex::new(r"\s+").unwrap();
    whitespace.replace_all(text, " ").trim().to_string()
}

/// Split normalized text into an ordered sequence of speech units of at most
/// `max_unit_chars` characters each.
///
/// Sentences (runs ending in `.`, `!` or `?`, plus a final unterminated
/// fragment) are greedily packed together, separated by single spaces. A
/// sentence that alone exceeds the limit is packed word by word instead. A
/// single word longer than the limit is irreducible and emitted whole; that
/// is the only case where a unit may exceed `max_unit_chars`.
pub fn segment(text: &str, max_unit_chars: usize) -> Result<Vec<TextUnit>, PipelineError> {
    let normalized = normalize(text);
    if normalized.is_empty() {
        return Err(PipelineError::EmptyInput);
    }

    let sentence_pattern = regex::Regex::new(r"[^.!?]+[.!?]+|[^.!?]+$").unwrap();
    let mut sentences: Vec<&str> = sentence_pattern
        .find_iter(&normalized)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .collect();
    // Text made of nothing but boundary markers has no match; treat the whole
    // thing as one sentence, like an unterminated fragment.
    if sentences.is_empty() {
        sentences.push(&normalized);
    }

    let mut units: Vec<String> = Vec::new();
    let mut current = String::new();

    for sentence in sentences {
        if fits(&current, sentence, max_unit_chars) {
            push_piece(&mut current, sentence);
            continue;
        }

        if !current.is_empty() {
            units.push(std::mem::take(&mut current));
        }

        if sentence.chars().count() <= max_unit_chars {
            current.push_str(sentence);
            continue;
        }

        // Oversized sentence: pack word by word.
        for word in sentence.split(' ') {
            if fits(&current, word, max_unit_chars) {
                push_piece(&mut current, word);
            } else {
                if !current.is_empty() {
                    units.push(std::mem::take(&mut current));
                }
                // A word longer than the limit lands here alone and is
                // emitted whole once the next piece arrives.
                current.push_str(word);
            }
        }
    }

    if !current.is_empty() {
        units.push(current);
    }

    Ok(units
        .into_iter()
        .enumerate()
        .map(|(index, content)| TextUnit { index, content })
        .collect())
}

/// Would appending `piece` (with a separating space if needed) keep the
/// accumulated unit within the limit?
fn fits(current: &str, piece: &str, max_unit_chars: usize) -> bool {
    let piece_len = piece.chars().count();
    if current.is_empty() {
        piece_len <= max_unit_chars
    } else {
        current.chars().count() + 1 + piece_len <= max_unit_chars
    }
}

fn push_piece(current: &mut String, piece: &str) {
    if !current.is_empty() {
        current.push(' ');
    }
    current.push_str(piece);
}
