use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param",
    "source", "track", "wbr",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment<'a> {
    Text(Cow<'a, str>),
    Open { name: String, raw: &'a str },
    Close { name: String },
    /// Void or self-closing element, comment, doctype.
    Inert { name: String, raw: &'a str },
}

#[derive(Clone, Debug)]
struct Token<'a> {
    start: usize,
    raw: &'a str,
    segment: Segment<'a>,
}

impl Token<'_> {
    fn text_len(&self) -> usize {
        match &self.segment {
            Segment::Text(text) => text.chars().count(),
            _ => 0,
        }
    }
}

fn tokenizer() -> &'static Regex {
    static RE_TOKEN: OnceLock<Regex> = OnceLock::new();
    RE_TOKEN.get_or_init(|| {
        Regex::new(
            r"(?s)<!--.*?-->|</?[A-Za-z][^>]*>|<[!?][^>]*>|&(?:#[0-9]+|#[xX][0-9A-Fa-f]+|[A-Za-z][A-Za-z0-9]*);|[^<&]+|[<&]",
        )
        .unwrap()
    })
}

fn tag_name(raw: &str) -> String {
    raw.trim_start_matches('<')
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

fn decode_entity(raw: &str) -> Option<char> {
    let body = raw.strip_prefix('&')?.strip_suffix(';')?;
    if let Some(num) = body.strip_prefix('#') {
        let code = match num.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => num.parse::<u32>().ok()?,
        };
        return char::from_u32(code);
    }
    match body {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => None,
    }
}

fn classify(raw: &str) -> Segment<'_> {
    if raw.starts_with("<!") || raw.starts_with("<?") {
        return Segment::Inert {
            name: String::new(),
            raw,
        };
    }
    if raw.len() > 1 && raw.starts_with('<') {
        let name = tag_name(raw);
        if raw.starts_with("</") {
            return Segment::Close { name };
        }
        if raw.ends_with("/>") || VOID_ELEMENTS.contains(&name.as_str()) {
            return Segment::Inert { name, raw };
        }
        return Segment::Open { name, raw };
    }
    if raw.len() > 1 && raw.starts_with('&') {
        if let Some(ch) = decode_entity(raw) {
            return Segment::Text(Cow::Owned(ch.to_string()));
        }
    }
    Segment::Text(Cow::Borrowed(raw))
}

fn tokenize(html: &str) -> Vec<Token<'_>> {
    tokenizer()
        .find_iter(html)
        .map(|m| Token {
            start: m.start(),
            raw: m.as_str(),
            segment: classify(m.as_str()),
        })
        .collect()
}

pub fn segments(html: &str) -> Vec<Segment<'_>> {
    tokenize(html).into_iter().map(|t| t.segment).collect()
}

pub fn plain_text(html: &str) -> String {
    let mut out = String::new();
    for token in tokenize(html) {
        if let Segment::Text(text) = token.segment {
            out.push_str(&text);
        }
    }
    out
}

pub fn text_len(html: &str) -> usize {
    tokenize(html).iter().map(Token::text_len).sum()
}

/// Content that renders as an empty block.
pub fn is_empty(html: &str) -> bool {
    html.is_empty() || html == "<br>"
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Bias {
    /// Stop at the first position reaching the offset, before any tags.
    Earliest,
    /// Skip closing and opening tags sitting at the offset.
    Latest,
}

struct Cut<'a> {
    byte: usize,
    open: Vec<(String, &'a str)>,
}

fn apply_tag<'a>(open: &mut Vec<(String, &'a str)>, segment: &Segment<'a>) {
    match segment {
        Segment::Open { name, raw } => open.push((name.clone(), *raw)),
        Segment::Close { name } => {
            if let Some(idx) = open.iter().rposition(|(n, _)| n == name) {
                open.truncate(idx);
            }
        }
        _ => {}
    }
}

fn locate<'a>(html: &'a str, tokens: &[Token<'a>], offset: usize, bias: Bias) -> Cut<'a> {
    let mut pos = 0usize;
    let mut open: Vec<(String, &'a str)> = Vec::new();

    for token in tokens {
        let at_offset = pos == offset;
        match &token.segment {
            Segment::Text(_) => {
                let len = token.text_len();
                if at_offset {
                    return Cut {
                        byte: token.start,
                        open,
                    };
                }
                if pos + len > offset {
                    // Entities are single-character tokens, so a cut inside is a literal run.
                    let within = offset - pos;
                    let byte = token
                        .raw
                        .char_indices()
                        .nth(within)
                        .map(|(i, _)| i)
                        .unwrap_or(token.raw.len());
                    return Cut {
                        byte: token.start + byte,
                        open,
                    };
                }
                pos += len;
            }
            Segment::Inert { .. } => {
                if at_offset {
                    return Cut {
                        byte: token.start,
                        open,
                    };
                }
            }
            segment @ (Segment::Open { .. } | Segment::Close { .. }) => {
                if at_offset && bias == Bias::Earliest {
                    return Cut {
                        byte: token.start,
                        open,
                    };
                }
                apply_tag(&mut open, segment);
            }
        }
    }

    Cut {
        byte: html.len(),
        open,
    }
}

/// Cuts `html` at plain-text offsets `start..end`, dropping what lies between.
///
/// Elements open at the cut are closed at the end of `before` and reopened at the
/// start of `after`, so both halves stay balanced.
pub fn split_at(html: &str, start: usize, end: usize) -> (String, String) {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    let tokens = tokenize(html);
    let head = locate(html, &tokens, start, Bias::Earliest);
    let tail = locate(html, &tokens, end, Bias::Latest);

    let mut before = html[..head.byte].to_string();
    for (name, _) in head.open.iter().rev() {
        before.push_str("</");
        before.push_str(name);
        before.push('>');
    }

    let mut after = String::new();
    for (_, raw) in &tail.open {
        after.push_str(raw);
    }
    after.push_str(&html[tail.byte.max(head.byte)..]);

    (before, after)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn projects_text_like_text_content() {
        assert_eq!(plain_text("Hello <b>wor</b>ld"), "Hello world");
        assert_eq!(plain_text("a&amp;b&lt;c&#65;&#x42;"), "a&b<cAB");
        assert_eq!(plain_text("line<br>next"), "linenext");
        assert_eq!(plain_text("x &unknown; y"), "x &unknown; y");
        assert_eq!(plain_text("1 < 2"), "1 < 2");
        assert_eq!(text_len("<i>héllo</i>"), 5);
    }

    #[test]
    fn splits_plain_text() {
        assert_eq!(
            split_at("Hello world", 6, 6),
            ("Hello ".to_string(), "world".to_string())
        );
    }

    #[test]
    fn split_balances_open_elements() {
        let (before, after) = split_at("<b>Hello world</b>!", 5, 5);
        assert_eq!(before, "<b>Hello</b>");
        assert_eq!(after, "<b> world</b>!");
    }

    #[test]
    fn split_drops_selected_text() {
        let (before, after) = split_at("abc<i>def</i>ghi", 2, 7);
        assert_eq!(before, "ab");
        assert_eq!(after, "hi");
    }

    #[test]
    fn split_at_boundaries_keeps_markup_on_one_side() {
        assert_eq!(
            split_at("<b>Hi</b>", 0, 0),
            (String::new(), "<b>Hi</b>".to_string())
        );
        assert_eq!(
            split_at("<b>Hi</b>", 2, 2),
            ("<b>Hi</b>".to_string(), String::new())
        );
        assert_eq!(
            split_at("a<br>b", 1, 1),
            ("a".to_string(), "<br>b".to_string())
        );
    }

    #[test]
    fn split_counts_entities_as_one_char() {
        let (before, after) = split_at("a&amp;b", 2, 2);
        assert_eq!(before, "a&amp;");
        assert_eq!(after, "b");
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(escape_text("<a & \"b\">"), "&lt;a &amp; &quot;b&quot;&gt;");
        assert!(is_empty("<br>"));
        assert!(!is_empty("<b></b>"));
    }
}
