use heapless::String;

use crate::config::STATUS_WIDTH;

pub type StatusLine = String<STATUS_WIDTH>;

/// Fit `text` to one display row: cut at the width, pad with spaces so the
/// previous contents are overwritten. The display only has ASCII glyphs.
pub fn status_line(text: &str) -> StatusLine {
    let mut line = StatusLine::new();
    for ch in text.chars().take(STATUS_WIDTH) {
        let glyph = if ch.is_ascii() && !ch.is_ascii_control() { ch } else { '?' };
        let _ = line.push(glyph);
    }
    while line.len() < STATUS_WIDTH {
        let _ = line.push(' ');
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_short_text() {
        assert_eq!(status_line("Drop OK.").as_str(), "Drop OK.        ");
        assert_eq!(status_line("").as_str(), " ".repeat(STATUS_WIDTH));
    }

    #[test]
    fn cuts_long_text_and_masks_non_ascii() {
        assert_eq!(status_line("Retrieving B1 from rack").as_str(), "Retrieving B1 fr");
        assert_eq!(status_line("Posição").as_str(), "Posi??o         ");
    }
}
