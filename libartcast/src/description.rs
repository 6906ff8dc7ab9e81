//! Description markup translation
//!
//! Submissions carry their description as a small HTML subset (bold,
//! italic, underline, strikethrough, line breaks, links). Each website
//! accepts a different dialect, so adapters pick a translation here and
//! layer their own rewrites on top.

use std::sync::OnceLock;

use regex::Regex;

/// A per-website shorthand for linking user profiles, e.g. key "db" with
/// url "https://derpibooru.org/profiles/$1" turns `:db:rainpelt:` into a
/// link to that profile.
#[derive(Debug, Clone)]
pub struct UsernameShortcut {
    pub key: &'static str,
    pub url: &'static str,
}

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)<a[^>]*?href="(?P<url>[^"]*)"[^>]*>(?P<text>.*?)</a>"#)
            .expect("link pattern")
    })
}

fn tag_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</?[a-z][^>]*>").expect("tag pattern"))
}

fn shortcut_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r":(?P<key>[a-z]{2,16}):(?P<name>[A-Za-z0-9_.\- ]+):").expect("shortcut pattern")
    })
}

fn replace_breaks(text: &str) -> String {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>").expect("br pattern"));
    re.replace_all(text, "\n").into_owned()
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

fn replace_pairs(text: &str, pairs: &[(&str, &str, &str)]) -> String {
    let mut out = text.to_string();
    for (tag, open, close) in pairs {
        for variant in [tag.to_string(), tag.to_uppercase()] {
            out = out.replace(&format!("<{}>", variant), open);
            out = out.replace(&format!("</{}>", variant), close);
        }
    }
    out
}

/// Expand `:key:name:` profile shortcuts into plain links, so the dialect
/// translations below can carry them through.
pub fn expand_username_shortcuts(text: &str, shortcuts: &[UsernameShortcut]) -> String {
    shortcut_re()
        .replace_all(text, |caps: &regex::Captures| {
            let key = &caps["key"];
            let name = &caps["name"];
            match shortcuts.iter().find(|s| s.key == key) {
                Some(shortcut) => {
                    let url = shortcut.url.replace("$1", name);
                    format!(r#"<a href="{}">{}</a>"#, url, name)
                }
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Strip markup entirely: links become "text (url)", breaks become
/// newlines, everything else is dropped.
pub fn to_plaintext(html: &str) -> String {
    let text = replace_breaks(html);
    let text = link_re()
        .replace_all(&text, |caps: &regex::Captures| {
            let url = &caps["url"];
            let label = &caps["text"];
            if label == url {
                url.to_string()
            } else {
                format!("{} ({})", label, url)
            }
        })
        .into_owned();
    let text = tag_re().replace_all(&text, "").into_owned();
    decode_entities(&text).trim().to_string()
}

/// Translate to BBCode ([b], [i], [u], [s], [url=..]).
pub fn to_bbcode(html: &str) -> String {
    let text = replace_breaks(html);
    let text = replace_pairs(
        &text,
        &[
            ("b", "[b]", "[/b]"),
            ("strong", "[b]", "[/b]"),
            ("i", "[i]", "[/i]"),
            ("em", "[i]", "[/i]"),
            ("u", "[u]", "[/u]"),
            ("s", "[s]", "[/s]"),
        ],
    );
    let text = link_re()
        .replace_all(&text, "[url=$url]$text[/url]")
        .into_owned();
    let text = tag_re().replace_all(&text, "").into_owned();
    decode_entities(&text).trim().to_string()
}

/// Translate to Markdown (**bold**, *italic*, [text](url)).
pub fn to_markdown(html: &str) -> String {
    let text = replace_breaks(html);
    let text = replace_pairs(
        &text,
        &[
            ("b", "**", "**"),
            ("strong", "**", "**"),
            ("i", "*", "*"),
            ("em", "*", "*"),
            ("u", "", ""),
            ("s", "~~", "~~"),
        ],
    );
    let text = link_re().replace_all(&text, "[$text]($url)").into_owned();
    let text = tag_re().replace_all(&text, "").into_owned();
    decode_entities(&text).trim().to_string()
}

/// Translate to the Textile flavor the booru family accepts: emphasis
/// markers and `"text":url` links.
pub fn to_textile(html: &str) -> String {
    let text = replace_breaks(html);
    let text = replace_pairs(
        &text,
        &[
            ("b", "*", "*"),
            ("strong", "*", "*"),
            ("i", "_", "_"),
            ("em", "_", "_"),
            ("u", "+", "+"),
            ("s", "-", "-"),
        ],
    );
    let text = link_re()
        .replace_all(&text, r#""$text":$url"#)
        .into_owned();
    let text = tag_re().replace_all(&text, "").into_owned();
    decode_entities(&text).trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str =
        r#"<b>Commission</b> for <a href="https://example.com/u/rain">rain</a><br>drawn <i>fast</i>"#;

    #[test]
    fn test_to_plaintext() {
        assert_eq!(
            to_plaintext(SAMPLE),
            "Commission for rain (https://example.com/u/rain)\ndrawn fast"
        );
    }

    #[test]
    fn test_to_plaintext_bare_url_not_doubled() {
        let html = r#"<a href="https://example.com">https://example.com</a>"#;
        assert_eq!(to_plaintext(html), "https://example.com");
    }

    #[test]
    fn test_to_bbcode() {
        assert_eq!(
            to_bbcode(SAMPLE),
            "[b]Commission[/b] for [url=https://example.com/u/rain]rain[/url]\ndrawn [i]fast[/i]"
        );
    }

    #[test]
    fn test_to_markdown() {
        assert_eq!(
            to_markdown(SAMPLE),
            "**Commission** for [rain](https://example.com/u/rain)\ndrawn *fast*"
        );
    }

    #[test]
    fn test_to_textile() {
        assert_eq!(
            to_textile(SAMPLE),
            "*Commission* for \"rain\":https://example.com/u/rain\ndrawn _fast_"
        );
    }

    #[test]
    fn test_entities_decoded() {
        assert_eq!(to_plaintext("cats &amp; dogs"), "cats & dogs");
    }

    #[test]
    fn test_expand_username_shortcuts() {
        let shortcuts = [UsernameShortcut {
            key: "db",
            url: "https://derpibooru.org/profiles/$1",
        }];
        let text = expand_username_shortcuts("art by :db:rainpelt:", &shortcuts);
        assert_eq!(
            text,
            r#"art by <a href="https://derpibooru.org/profiles/rainpelt">rainpelt</a>"#
        );
    }

    #[test]
    fn test_unknown_shortcut_left_alone() {
        let shortcuts = [UsernameShortcut {
            key: "db",
            url: "https://derpibooru.org/profiles/$1",
        }];
        let text = expand_username_shortcuts("art by :fa:rainpelt:", &shortcuts);
        assert_eq!(text, "art by :fa:rainpelt:");
    }
}
