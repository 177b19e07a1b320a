//! Just enough lexing to know which parts of a text are SQL code, and which are string literals
//! or comments.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    SingleQuote,
    DoubleQuote,
    LineComment,
    BlockComment,
}

/// Marks every byte of `text` that is plain code.
///
/// Quote characters and comment delimiters belong to what they delimit, so they are not code.
/// A doubled single quote (`'it''s'`) closes and reopens the literal, which happens to work.
pub fn code_mask(text: &str) -> Vec<bool> {
    let bytes = text.as_bytes();
    let mut mask = vec![false; bytes.len()];
    let mut state = State::Normal;
    let mut position = 0;

    while position < bytes.len() {
        let current = bytes[position];
        let next = bytes.get(position + 1).copied();
        // Comment delimiters are two bytes long.
        let mut width = 1;

        state = match (state, current, next) {
            (State::Normal, b'\'', _) => State::SingleQuote,
            (State::Normal, b'"', _) => State::DoubleQuote,
            (State::Normal, b'-', Some(b'-')) => {
                width = 2;
                State::LineComment
            }
            (State::Normal, b'/', Some(b'*')) => {
                width = 2;
                State::BlockComment
            }
            (State::Normal, _, _) => {
                mask[position] = true;
                State::Normal
            }
            (State::SingleQuote, b'\'', _) => State::Normal,
            (State::DoubleQuote, b'"', _) => State::Normal,
            (State::LineComment, b'\n', _) => State::Normal,
            (State::BlockComment, b'*', Some(b'/')) => {
                width = 2;
                State::Normal
            }
            (state, _, _) => state,
        };

        position += width;
    }

    mask
}

/// The first word of the text, after any leading comments.
///
/// Returns None if there is nothing but comments, or if a leading comment never ends.
pub fn first_token(text: &str) -> Option<&str> {
    let mut rest = text.trim_start();

    loop {
        if let Some(comment) = rest.strip_prefix("--") {
            let (_, after) = comment.split_once('\n')?;
            rest = after.trim_start();
        } else if let Some(comment) = rest.strip_prefix("/*") {
            let (_, after) = comment.split_once("*/")?;
            rest = after.trim_start();
        } else {
            break;
        }
    }

    rest.split(|c: char| c.is_whitespace() || c == '(')
        .find(|token| !token.is_empty())
}
