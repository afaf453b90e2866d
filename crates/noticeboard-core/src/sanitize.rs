use std::sync::LazyLock;

use regex::Regex;

/// Tags kept in custom notice HTML.
const ALLOWED_TAGS: &[&str] = &[
    "a", "abbr", "b", "blockquote", "br", "code", "div", "em", "h1", "h2", "h3", "h4", "h5",
    "h6", "hr", "i", "img", "li", "ol", "p", "pre", "span", "strong", "u", "ul",
];

/// Attributes kept on allowed tags.
const ALLOWED_ATTRS: &[&str] = &[
    "alt", "class", "height", "href", "id", "rel", "src", "style", "target", "title", "width",
];

/// Attributes whose value is a URL and must use a safe scheme.
const URL_ATTRS: &[&str] = &["href", "src"];

const BLOCKED_SCHEMES: &[&str] = &["javascript:", "vbscript:", "data:"];

/// `<script>` and `<style>` blocks, content included.
static SCRIPT_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(?:script|style)\b[^>]*>.*?</\s*(?:script|style)\s*>").unwrap()
});

static COMMENTS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());

static ANY_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

static TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<(/?)([a-zA-Z][a-zA-Z0-9]*)([^>]*)>").unwrap());

static ATTR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([a-zA-Z_:][-a-zA-Z0-9_:.]*)(?:\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
    )
    .unwrap()
});

/// A `<` and whatever follows it up to the next `<`, `>` or end of input.
static LESS_THAN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^<>]*>?").unwrap());

/// Numeric or named character reference; the trailing `;` is optional, as
/// browsers accept it missing.
static CHAR_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(?:#[xX]([0-9a-fA-F]+)|#([0-9]+)|([a-zA-Z][a-zA-Z0-9]*));?").unwrap()
});

/// Named references that can spell out a URL scheme.
const NAMED_REFS: &[(&str, char)] = &[
    ("colon", ':'),
    ("Tab", '\t'),
    ("NewLine", '\n'),
    ("nbsp", '\u{a0}'),
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
    ("lpar", '('),
    ("rpar", ')'),
    ("sol", '/'),
    ("period", '.'),
];

static OCTETS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"%[a-fA-F0-9]{2}").unwrap());

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\r\n\t ]+").unwrap());

/// Reduce user input to a single line of plain text: tags (and script/style
/// content) removed, percent-encoded octets removed, control characters
/// dropped, whitespace collapsed and trimmed.
pub fn sanitize_text_field(input: &str) -> String {
    let mut out = input.to_string();
    if out.contains('<') {
        out = escape_lone_less_than(&out);
        out = SCRIPT_BLOCKS.replace_all(&out, "").into_owned();
        out = ANY_TAG.replace_all(&out, "").into_owned();
    }
    // Octet removal can expose new sequences ("%%4141"), so repeat.
    loop {
        let next = OCTETS.replace_all(&out, "").into_owned();
        if next == out {
            break;
        }
        out = next;
    }
    out = WHITESPACE.replace_all(&out, " ").into_owned();
    out.retain(|c| !c.is_control());
    out.trim().to_string()
}

/// Filter HTML against the post allow-list. Disallowed tags are removed but
/// their text kept; script and style blocks are dropped whole; event handler
/// attributes and script URLs never survive.
pub fn sanitize_post_html(input: &str) -> String {
    let without_scripts = SCRIPT_BLOCKS.replace_all(input, "");
    let without_comments = COMMENTS.replace_all(&without_scripts, "");
    TAG.replace_all(&without_comments, |caps: &regex::Captures| {
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();
        if !ALLOWED_TAGS.contains(&name.as_str()) {
            return String::new();
        }
        if closing {
            return format!("</{name}>");
        }
        let raw_attrs = caps[3].trim_end();
        let self_closing = raw_attrs.ends_with('/');
        let attrs = filter_attrs(raw_attrs.trim_end_matches('/'));
        if self_closing {
            format!("<{name}{attrs} />")
        } else {
            format!("<{name}{attrs}>")
        }
    })
    .into_owned()
}

fn filter_attrs(raw: &str) -> String {
    let mut out = String::new();
    for caps in ATTR.captures_iter(raw) {
        let name = caps[1].to_ascii_lowercase();
        if name.starts_with("on") || !ALLOWED_ATTRS.contains(&name.as_str()) {
            continue;
        }
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .or_else(|| caps.get(4))
            .map(|m| m.as_str())
            .unwrap_or("");
        if URL_ATTRS.contains(&name.as_str()) && has_blocked_scheme(value) {
            continue;
        }
        out.push_str(&format!(" {name}=\"{}\"", value.replace('"', "&quot;")));
    }
    out
}

/// A `<` that never reaches a `>` is text, not a tag.
fn escape_lone_less_than(input: &str) -> String {
    LESS_THAN
        .replace_all(input, |caps: &regex::Captures| {
            let m = &caps[0];
            if m.ends_with('>') {
                m.to_string()
            } else {
                m.replacen('<', "&lt;", 1)
            }
        })
        .into_owned()
}

/// Decode character references until the value stops changing, so nested
/// encodings like `&amp;#106;` are caught too. Unknown names and invalid code
/// points are left as written.
fn decode_char_refs(value: &str) -> String {
    let mut out = value.to_string();
    for _ in 0..4 {
        let next = CHAR_REF
            .replace_all(&out, |caps: &regex::Captures| {
                let decoded = if let Some(hex) = caps.get(1) {
                    u32::from_str_radix(hex.as_str(), 16).ok().and_then(char::from_u32)
                } else if let Some(dec) = caps.get(2) {
                    dec.as_str().parse::<u32>().ok().and_then(char::from_u32)
                } else {
                    let name = &caps[3];
                    NAMED_REFS
                        .iter()
                        .find(|(n, _)| *n == name)
                        .map(|(_, c)| *c)
                };
                decoded.map_or_else(|| caps[0].to_string(), String::from)
            })
            .into_owned();
        if next == out {
            break;
        }
        out = next;
    }
    out
}

fn has_blocked_scheme(url: &str) -> bool {
    let compact: String = decode_char_refs(url)
        .chars()
        .filter(|c| !c.is_whitespace() && !c.is_control())
        .collect::<String>()
        .to_ascii_lowercase();
    BLOCKED_SCHEMES.iter().any(|s| compact.starts_with(s))
}
