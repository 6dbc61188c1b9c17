use std::fmt;

use super::tag::Tag;

/// One unit of tokenizer output.
///
/// `Display` renders the token back into markup.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Token {
    Word(String),
    /// A run of spaces and tabs.
    Spaces(String),
    /// A lone `\n` in text.
    Newline,
    Punctuation(char),
    Tag(Tag),
    /// A start tag closed with `/>`, which has no matching end tag.
    SelfClosingTag(Tag),
    Comment(String),
    Doctype {
        keyword: String,
        data: String,
    },
    ProcessingInstruction {
        target: String,
        data: String,
    },
    CData(String),
    EntityReference(String),
    CharacterEntity(char),
    /// Raw text discarded while recovering from malformed markup.
    Garbage(String),
    /// Never produced by [`Tokenizer`](super::Tokenizer).
    Number(i64),
    /// Never produced by [`Tokenizer`](super::Tokenizer).
    Script(String),
}

impl Token {
    pub fn is_tag(&self) -> bool {
        matches!(self, Self::Tag(_) | Self::SelfClosingTag(_))
    }

    pub fn as_tag(&self) -> Option<&Tag> {
        match self {
            Self::Tag(tag) | Self::SelfClosingTag(tag) => Some(tag),
            _ => None,
        }
    }

    /// A labelled form for logs and listings.
    pub fn describe(&self) -> String {
        match self {
            Self::Word(word) => format!("Word: {}", quoted(word)),
            Self::Spaces(spaces) => {
                let escaped: String = spaces
                    .chars()
                    .map(|c| match c {
                        ' ' => " ".to_string(),
                        '\t' => "\\t".to_string(),
                        '\n' => "\\n".to_string(),
                        '\r' => "\\r".to_string(),
                        _ => "?".to_string(),
                    })
                    .collect();
                format!("Spaces: {}", quoted_as(&escaped, spaces.chars().count() == 1))
            }
            Self::Newline => "Newline".to_string(),
            Self::Punctuation(c) => format!("Punctuation: {c:?}"),
            Self::Tag(tag) => format!("Tag: {tag}"),
            Self::SelfClosingTag(_) => format!("Empty Element: {self}"),
            Self::Comment(body) => format!("Comment: {body:?}"),
            Self::Doctype { keyword, data } => format!("Doctype: {keyword} {data}"),
            Self::ProcessingInstruction { target, data } => format!("PI: {target} {data}"),
            Self::CData(body) => format!("CData: {body:?}"),
            Self::EntityReference(name) => format!("Entity: {name}"),
            Self::CharacterEntity(c) => format!("Char Entity: {c:?}"),
            Self::Garbage(text) => format!("Garbage: {text:?}"),
            Self::Number(n) => format!("Number: {n}"),
            Self::Script(text) => format!("Script: {text:?}"),
        }
    }
}

fn quoted(s: &str) -> String {
    quoted_as(s, s.chars().count() == 1)
}

fn quoted_as(s: &str, single: bool) -> String {
    let q = if single { '\'' } else { '"' };
    format!("{q}{s}{q}")
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Word(text) | Self::Spaces(text) | Self::Garbage(text) | Self::Script(text) => {
                f.write_str(text)
            }
            Self::Newline => f.write_str("\n"),
            Self::Punctuation(c) => write!(f, "{c}"),
            Self::Tag(tag) => tag.write_markup(f, false),
            Self::SelfClosingTag(tag) => tag.write_markup(f, true),
            Self::Comment(body) => write!(f, "<!--{body}-->"),
            Self::Doctype { keyword, data } => write!(f, "<!{keyword} {data}>"),
            Self::ProcessingInstruction { target, data } => write!(f, "<?{target} {data}?>"),
            Self::CData(body) => write!(f, "<![CDATA[{body}]]>"),
            Self::EntityReference(name) => write!(f, "&{name};"),
            Self::CharacterEntity(c) => write!(f, "&#{};", u32::from(*c)),
            Self::Number(n) => write!(f, "{n}"),
        }
    }
}
