//! Line breaking for the fixed template regions.
//!
//! There is no shaping engine here: widths are estimated from a per-glyph advance table
//! tuned for a geometric sans. The template clips the headline region, so an
//! underestimate can never bleed into the captions.

pub const ELLIPSIS: char = '…';

/// Estimated horizontal advance of `c` in ems at bold weight.
fn advance(c: char) -> f32 {
    match c {
        ' ' => 0.26,
        'i' | 'j' | 'l' | 'I' | '.' | ',' | ':' | ';' | '\'' | '!' | '|' | '`' => 0.28,
        'f' | 't' | 'r' | '(' | ')' | '[' | ']' | '{' | '}' | '-' | '/' | '\\' | '"' => 0.38,
        'm' | 'w' => 0.86,
        'M' | 'W' => 0.92,
        '@' | '%' | '&' | '—' => 0.9,
        '…' => 0.8,
        '0'..='9' => 0.6,
        c if c.is_uppercase() => 0.68,
        c if c.is_lowercase() => 0.56,
        // CJK, emoji and other wide scripts
        c if c as u32 >= 0x2E80 => 1.0,
        _ => 0.6,
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub letter_spacing: f32,
    pub bold: bool,
}

impl TextStyle {
    pub fn new(font_size: f32) -> Self { Self { font_size, letter_spacing: 0.0, bold: false } }

    pub fn bold(self) -> Self { Self { bold: true, ..self } }

    /// Letter spacing in ems, as CSS `letter-spacing: <n>em`.
    pub fn tracking(self, em: f32) -> Self { Self { letter_spacing: em * self.font_size, ..self } }

    pub fn measure(&self, text: &str) -> f32 {
        let weight = if self.bold { 1.0 } else { 0.94 };
        text.chars().map(|c| advance(c) * weight * self.font_size + self.letter_spacing).sum()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Wrapped {
    pub lines: Vec<String>,
    /// Whether text was dropped to respect `max_lines`.
    pub truncated: bool,
}

/// Greedy line breaking at whitespace. Words wider than `max_width` are broken by character.
/// When more than `max_lines` lines are produced, the last kept line is ellipsized.
pub fn wrap(text: &str, style: TextStyle, max_width: f32, max_lines: usize) -> Wrapped {
    let max_lines = max_lines.max(1);
    let mut lines = Vec::<String>::new();
    let mut line = String::new();
    for word in text.split_whitespace() {
        let candidate = if line.is_empty() { word.to_string() } else { format!("{line} {word}") };
        if style.measure(&candidate) <= max_width {
            line = candidate;
            continue;
        }
        if !line.is_empty() {
            lines.push(std::mem::take(&mut line));
        }
        if style.measure(word) <= max_width {
            line = word.to_string();
            continue;
        }
        for c in word.chars() {
            line.push(c);
            if line.chars().count() > 1 && style.measure(&line) > max_width {
                line.pop();
                lines.push(std::mem::replace(&mut line, c.to_string()));
            }
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }

    let truncated = lines.len() > max_lines;
    if truncated {
        lines.truncate(max_lines);
        if let Some(last) = lines.last_mut() {
            ellipsize(last, style, max_width);
        }
    }
    Wrapped { lines, truncated }
}

fn ellipsize(line: &mut String, style: TextStyle, max_width: f32) {
    while !line.is_empty() && style.measure(&format!("{line}{ELLIPSIS}")) > max_width {
        line.pop();
    }
    line.truncate(line.trim_end().len());
    line.push(ELLIPSIS);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_line() {
        let style = TextStyle::new(20.0);
        let wrapped = wrap("Q3 Launch", style, 1000.0, 2);
        assert_eq!(wrapped.lines, vec!["Q3 Launch"]);
        assert!(!wrapped.truncated);
    }

    #[test]
    fn test_breaks_at_whitespace() {
        let style = TextStyle::new(10.0);
        let width = style.measure("gamma delta");
        let wrapped = wrap("alpha beta gamma delta", style, width, 4);
        assert_eq!(wrapped.lines, vec!["alpha beta", "gamma delta"]);
        for line in &wrapped.lines {
            assert!(style.measure(line) <= width);
        }
    }

    #[test]
    fn test_breaks_long_word() {
        let style = TextStyle::new(10.0);
        let width = style.measure("aaaa");
        let wrapped = wrap("aaaaaaaaaa", style, width, 10);
        assert_eq!(wrapped.lines, vec!["aaaa", "aaaa", "aa"]);
    }

    #[test]
    fn test_truncates_with_ellipsis() {
        let style = TextStyle::new(10.0).bold();
        let width = style.measure("word word");
        let wrapped = wrap("word word word word word word", style, width, 2);
        assert!(wrapped.truncated);
        assert_eq!(wrapped.lines.len(), 2);
        let last = wrapped.lines.last().unwrap();
        assert!(last.ends_with(ELLIPSIS));
        assert!(style.measure(last) <= width);
    }

    #[test]
    fn test_tracking_widens() {
        let plain = TextStyle::new(28.0);
        let tracked = plain.tracking(0.32);
        assert!(tracked.measure("KICKER") > plain.measure("KICKER"));
        assert_eq!(tracked.letter_spacing, 28.0 * 0.32);
    }

    #[test]
    fn test_empty() {
        let wrapped = wrap("   ", TextStyle::new(10.0), 100.0, 2);
        assert!(wrapped.lines.is_empty());
        assert!(!wrapped.truncated);
    }
}
