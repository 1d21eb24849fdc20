//! Byte-level scanning helpers shared by the date and time rules.
//!
//! The extraction rules work over maximal ASCII digit runs with their byte
//! offsets, so separator characters (`-`, `.`, `/`, `:`) can be checked
//! exactly between two runs.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct NumberRun {
    pub start: usize,
    pub end: usize,
    pub value: u32,
    pub digits: usize,
}

/// Maximal digit runs of up to four digits. Longer runs (phone numbers,
/// ids) are excluded so they can never be misread as dates or times.
pub(crate) fn number_runs(text: &str) -> Vec<NumberRun> {
    let bytes = text.as_bytes();
    let mut runs = Vec::new();
    let mut index = 0;

    while index < bytes.len() {
        if !bytes[index].is_ascii_digit() {
            index += 1;
            continue;
        }

        let start = index;
        while index < bytes.len() && bytes[index].is_ascii_digit() {
            index += 1;
        }

        let digits = index - start;
        if digits <= 4 {
            if let Ok(value) = text[start..index].parse::<u32>() {
                runs.push(NumberRun { start, end: index, value, digits });
            }
        }
    }

    runs
}

/// True when the byte immediately before `position` is not alphanumeric
/// (or the run starts the text). Mirrors a word boundary before a match.
pub(crate) fn clear_before(text: &str, position: usize) -> bool {
    position == 0 || !text.as_bytes()[position - 1].is_ascii_alphanumeric()
}

/// Word-boundary check after a match.
pub(crate) fn clear_after(text: &str, position: usize) -> bool {
    text.as_bytes().get(position).map_or(true, |byte| !byte.is_ascii_alphanumeric())
}

/// The single byte between two runs, if they are exactly one byte apart.
pub(crate) fn separator(text: &str, left: &NumberRun, right: &NumberRun) -> Option<u8> {
    (right.start == left.end + 1).then(|| text.as_bytes()[left.end])
}

/// True when the two runs are separated by one or more spaces only.
pub(crate) fn space_separated(text: &str, left: &NumberRun, right: &NumberRun) -> bool {
    right.start > left.end
        && text.as_bytes()[left.end..right.start].iter().all(|byte| *byte == b' ')
}
