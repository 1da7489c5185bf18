//! Plain-text layout helpers shared by the terminal UI and the PDF renderer

/// Greedy word wrap on whitespace, counting characters rather than bytes.
///
/// Line breaks in `text` are kept (a blank line stays blank) and the result
/// always has at least one line. A word longer than `max_chars` gets a line
/// of its own instead of being split.
pub fn wrap_words(text: &str, max_chars: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let needed =
                line.chars().count() + word.chars().count() + usize::from(!line.is_empty());
            if needed > max_chars && !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(word);
        }
        lines.push(line);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
