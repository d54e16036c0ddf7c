//! Rich-text to drawing-markup translation for title and footer content.
//!
//! Supports the tag set {b/strong, u, br, p} plus basic entity decoding.
//! Unknown tags are transparent. Paragraphs insert a line break only when
//! preceded by non-blank content, so output never opens with a blank line.

/// Underline start/stop and line-break directives of the drawing markup.
pub const UNDERLINE_START: &str = "\\L";
pub const UNDERLINE_STOP: &str = "\\l";
pub const NEW_LINE: &str = "\\P";

/// Translate a rich-text fragment into drawing-markup directives.
pub fn to_drawing_markup(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut bold_depth = 0usize;
    let mut chars = input.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '<' => {
                let mut tag = String::new();
                for t in chars.by_ref() {
                    if t == '>' {
                        break;
                    }
                    tag.push(t);
                }
                apply_tag(&tag, &mut out, &mut bold_depth);
            }
            '&' => {
                let mut entity = String::new();
                let mut terminated = false;
                while let Some(&next) = chars.peek() {
                    if next == ';' {
                        chars.next();
                        terminated = true;
                        break;
                    }
                    if !next.is_ascii_alphanumeric() || entity.len() >= 8 {
                        break;
                    }
                    entity.push(next);
                    chars.next();
                }
                match decode_entity(&entity) {
                    Some(decoded) if terminated => out.push_str(decoded),
                    _ => {
                        // not a recognized entity: emit verbatim
                        out.push('&');
                        out.push_str(&entity);
                        if terminated {
                            out.push(';');
                        }
                    }
                }
            }
            _ => out.push(c),
        }
    }

    // unbalanced bold groups still need closing
    for _ in 0..bold_depth {
        out.push('}');
    }
    out
}

fn apply_tag(raw: &str, out: &mut String, bold_depth: &mut usize) {
    let tag = raw.trim().trim_end_matches('/').trim().to_ascii_lowercase();
    let (closing, name) = match tag.strip_prefix('/') {
        Some(rest) => (true, rest.trim()),
        None => (false, tag.as_str()),
    };
    // attributes are irrelevant here
    let name = name.split_whitespace().next().unwrap_or("");

    match (name, closing) {
        ("b" | "strong", false) => {
            out.push_str("{\\fArial|b1;");
            *bold_depth += 1;
        }
        ("b" | "strong", true) => {
            if *bold_depth > 0 {
                out.push('}');
                *bold_depth -= 1;
            }
        }
        ("u", false) => out.push_str(UNDERLINE_START),
        ("u", true) => out.push_str(UNDERLINE_STOP),
        ("br", _) => out.push_str(NEW_LINE),
        ("p", false) => {
            // line break only when preceded by non-blank content
            if has_content(out) {
                out.push_str(NEW_LINE);
            }
        }
        ("p", true) => {}
        _ => {}
    }
}

/// Whether any visible text has been emitted yet (directives don't count).
fn has_content(out: &str) -> bool {
    let mut chars = out.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                chars.next();
            }
            '{' | '}' | ';' => {}
            c if c.is_whitespace() => {}
            _ => return true,
        }
    }
    false
}

fn decode_entity(entity: &str) -> Option<&'static str> {
    match entity {
        "amp" => Some("&"),
        "lt" => Some("<"),
        "gt" => Some(">"),
        "nbsp" => Some(" "),
        "quot" => Some("\""),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(to_drawing_markup("PLAN OF SURVEY"), "PLAN OF SURVEY");
        assert_eq!(to_drawing_markup(""), "");
    }

    #[test]
    fn paragraphs_break_without_leading_blank_line() {
        let out = to_drawing_markup("<p>FIRST</p><p>SECOND</p><p>THIRD</p>");
        assert_eq!(out, "FIRST\\PSECOND\\PTHIRD");
    }

    #[test]
    fn leading_paragraph_emits_no_break() {
        assert!(!to_drawing_markup("<p>ONLY</p>").starts_with("\\P"));
    }

    #[test]
    fn bold_wraps_in_a_font_group() {
        let out = to_drawing_markup("<p>A</p><p><strong>B</strong></p>");
        assert_eq!(out, "A\\P{\\fArial|b1;B}");
    }

    #[test]
    fn underline_and_breaks() {
        assert_eq!(to_drawing_markup("<u>X</u><br/>Y"), "\\LX\\l\\PY");
    }

    #[test]
    fn entities_decode() {
        let out = to_drawing_markup("<p>A &amp; B</p>");
        assert_eq!(out, "A & B");
    }

    #[test]
    fn bare_ampersand_survives() {
        assert_eq!(to_drawing_markup("A & B"), "A & B");
        assert_eq!(to_drawing_markup("&bogus;"), "&bogus;");
    }

    #[test]
    fn unknown_tags_are_transparent() {
        assert_eq!(to_drawing_markup("<span>A</span>"), "A");
    }
}
