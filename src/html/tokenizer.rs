use std::{fmt, mem, vec};

use super::{
    tag::{is_name_char, is_name_start_char, Tag},
    tag_body::TagBody,
    token::Token,
};
use crate::io::{Location, PushbackReader};

/// Entities recognised when a reference is missing its `;`.
const KNOWN_ENTITIES: [&str; 3] = ["amp", "nbsp", "quot"];

const DTD_KEYWORDS: [&str; 5] = ["DOCTYPE", "ELEMENT", "ATTLIST", "ENTITY", "NOTATION"];

#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct Options {
    /// Keep tag and attribute names as written instead of lowercasing them.
    pub case_sensitive: bool,
}

/// Anomaly counters, readable after any number of tokens.
#[derive(Copy, Clone, Default, PartialEq, Eq, Debug)]
pub struct Diagnostics {
    /// Malformed markup discarded up to the next `>`.
    pub errors: usize,
    /// Ambiguous input fixed up in place, such as a stray `&` or a missing `;`.
    pub recoveries: usize,
    /// Benign anomalies: end of input inside a construct, overwritten
    /// attribute values, out of range character references.
    pub warnings: usize,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub(super) enum State {
    Recover,

    Initial,
    Spaces,

    OpenTag,
    TagName,
    EmptyElement1,
    EndTag1,
    EndTag2,

    Sgml,
    Dtd1,
    Dtd2,
    Dtd3,

    Comment1,
    Comment2,
    Comment3,
    Comment4,

    Cdata1,
    Cdata2,
    Cdata3,
    Cdata4,
    Cdata5,

    PiTarget,
    PiData,
    EndPi,

    Entity,
    Ref,
    Char,
    Hex,
    Decimal,
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Recover => "error recovery",
            Self::Initial => "text content",
            Self::Spaces => "white-space content",
            Self::OpenTag => "tag markup entry",
            Self::TagName => "start-tag name",
            Self::EmptyElement1 => "empty-element close",
            Self::EndTag1 => "end-tag begin",
            Self::EndTag2 => "end-tag name",
            Self::Sgml => "SGML markup begin",
            Self::Dtd1 => "DTD keyword",
            Self::Dtd2 => "DTD white-space",
            Self::Dtd3 => "DTD unparsed data",
            Self::Comment1 => "comment entry-sequence",
            Self::Comment2 => "comment content",
            Self::Comment3 => "comment exit-sequence A",
            Self::Comment4 => "comment exit-sequence B",
            Self::Cdata1 => "CDATA entry-sequence A",
            Self::Cdata2 => "CDATA entry-sequence B",
            Self::Cdata3 => "CDATA content",
            Self::Cdata4 => "CDATA exit-sequence A",
            Self::Cdata5 => "CDATA exit-sequence B",
            Self::PiTarget => "PI target",
            Self::PiData => "PI data",
            Self::EndPi => "PI end",
            Self::Entity => "entity markup begin",
            Self::Ref => "entity reference",
            Self::Char => "character reference begin",
            Self::Hex => "hexadecimal character reference",
            Self::Decimal => "decimal character reference",
        })
    }
}

/// Outcome of feeding one character to the state machine.
enum Step {
    Continue,
    Emit(Token),
    End,
}

#[inline]
pub(super) fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

#[inline]
fn is_punctuation(c: char) -> bool {
    matches!(
        c,
        '\'' | '`'
            | '!'
            | '"'
            | '^'
            | '*'
            | '('
            | ')'
            | '-'
            | '_'
            | '+'
            | '='
            | '|'
            | '['
            | ']'
            | '{'
            | '}'
            | ':'
            | ';'
            | '@'
            | '~'
            | '#'
            | ','
            | '.'
            | '?'
            | '/'
            | '\\'
    )
}

fn is_known_entity(name: &str) -> bool {
    KNOWN_ENTITIES.contains(&name)
}

/// Splits markup text into [`Token`]s, one per call to [`Tokenizer::next_token`].
///
/// Malformed markup never stops the tokenizer. Unrecoverable fragments are
/// returned as [`Token::Garbage`] and counted in [`Diagnostics`].
#[must_use]
pub struct Tokenizer<I> {
    pub(super) reader: PushbackReader<I>,
    options: Options,
    pub(super) state: State,
    buf: String,
    // DTD keyword, PI target, the `x` of a hex reference, or white-space
    // before the `>` of an empty element
    name: String,
    // what separated the PI target from its data, if anything
    pi_sep: Option<char>,
    pub(super) diagnostics: Diagnostics,
}

impl Tokenizer<vec::IntoIter<char>> {
    pub fn from_text(text: &str, options: Options) -> Self {
        Self::new(PushbackReader::from_text(text), options)
    }
}

impl<I: Iterator<Item = char>> Tokenizer<I> {
    pub fn new(reader: PushbackReader<I>, options: Options) -> Self {
        Self {
            reader,
            options,
            state: State::Initial,
            buf: String::new(),
            name: String::new(),
            pi_sep: None,
            diagnostics: Diagnostics::default(),
        }
    }

    #[inline]
    pub fn options(&self) -> Options {
        self.options
    }

    #[inline]
    pub fn diagnostics(&self) -> Diagnostics {
        self.diagnostics
    }

    #[inline]
    pub fn location(&self) -> Location {
        self.reader.location()
    }

    #[inline]
    pub fn char_count(&self) -> usize {
        self.reader.char_count()
    }

    pub fn into_reader(self) -> PushbackReader<I> {
        self.reader
    }

    /// Where the reader is, for log messages.
    pub(super) fn here(&self) -> String {
        match self.reader.name() {
            Some(name) => format!("{name}:{}", self.reader.location()),
            None => self.reader.location().to_string(),
        }
    }

    pub(super) fn set_state(&mut self, state: State) {
        if self.state != state {
            log::trace!("changing state from {} to {}", self.state, state);
        }
        self.state = state;
    }

    #[inline]
    fn take_buf(&mut self) -> String {
        mem::take(&mut self.buf)
    }

    pub(super) fn new_tag(&self, name: &str) -> Tag {
        Tag::new(name, self.options.case_sensitive)
    }

    /// Replays `raw` and discards it, and everything up to the next `>`,
    /// as garbage.
    pub(super) fn recover(&mut self, c: char, raw: &str) {
        log::error!(
            "character {c:?} cannot be accepted from the {} state ({})",
            self.state,
            self.here()
        );
        self.reader.unread_str(raw);
        self.buf.clear();
        self.diagnostics.errors += 1;
        self.set_state(State::Recover);
    }

    fn recovered(&mut self, msg: &str) {
        log::warn!("recovery assumed that {msg} ({})", self.here());
        self.diagnostics.recoveries += 1;
    }

    /// Returns the next token, or `None` once the input is exhausted.
    pub fn next_token(&mut self) -> Option<Token> {
        self.buf.clear();
        self.name.clear();
        loop {
            let Some(c) = self.reader.read() else {
                return self.end_of_stream();
            };
            match self.step(c) {
                Step::Continue => {}
                Step::Emit(token) => {
                    log::debug!("token {}", token.describe());
                    return Some(token);
                }
                Step::End => return None,
            }
        }
    }

    fn end_of_stream(&mut self) -> Option<Token> {
        let state = mem::replace(&mut self.state, State::Initial);
        let leftovers = self.take_buf();
        match state {
            State::Initial | State::Spaces if leftovers.is_empty() => None,
            State::Initial => Some(Token::Word(leftovers)),
            State::Spaces => Some(Token::Spaces(leftovers)),
            _ => {
                log::warn!(
                    "unexpected end of input in the {state} state ({})",
                    self.here()
                );
                self.diagnostics.warnings += 1;
                None
            }
        }
    }

    fn step(&mut self, c: char) -> Step {
        match self.state {
            State::Recover => {
                self.buf.push(c);
                if c == '>' {
                    self.set_state(State::Initial);
                    return Step::Emit(Token::Garbage(self.take_buf()));
                }
            }
            State::Initial => return self.text(c),
            State::Spaces => match c {
                ' ' | '\t' | '\r' => self.buf.push(c),
                _ => {
                    self.reader.unread(c);
                    self.set_state(State::Initial);
                    return Step::Emit(Token::Spaces(self.take_buf()));
                }
            },
            State::OpenTag => match c {
                '!' => self.set_state(State::Sgml),
                '?' => {
                    self.pi_sep = None;
                    self.set_state(State::PiTarget);
                }
                '/' => {
                    self.buf.push(c);
                    self.set_state(State::EndTag1);
                }
                c if is_name_start_char(c) => {
                    self.buf.push(c);
                    self.set_state(State::TagName);
                }
                _ => self.recover(c, &format!("<{c}")),
            },
            State::TagName => match c {
                '>' => {
                    self.set_state(State::Initial);
                    let tag = self.new_tag(&self.buf);
                    return Step::Emit(Token::Tag(tag));
                }
                c if is_space(c) => {
                    let tag = self.new_tag(&self.buf);
                    return self.tag_body(tag);
                }
                '/' => self.set_state(State::EmptyElement1),
                c if is_name_char(c) => self.buf.push(c),
                _ => self.recover(c, &format!("<{}{c}", self.buf)),
            },
            State::EmptyElement1 => match c {
                '>' => {
                    self.set_state(State::Initial);
                    let tag = self.new_tag(&self.buf);
                    return Step::Emit(Token::SelfClosingTag(tag));
                }
                // kept only to replay the raw text on error
                c if is_space(c) => self.name.push(c),
                _ => self.recover(c, &format!("<{}/{}{c}", self.buf, self.name)),
            },
            State::EndTag1 => match c {
                c if is_name_char(c) => {
                    self.buf.push(c);
                    self.set_state(State::EndTag2);
                }
                // `</>` has no name to close
                _ => self.recover(c, &format!("<{}{c}", self.buf)),
            },
            State::EndTag2 => match c {
                '>' => {
                    self.set_state(State::Initial);
                    let tag = self.new_tag(&self.buf);
                    return Step::Emit(Token::Tag(tag));
                }
                c if is_name_char(c) => self.buf.push(c),
                _ => self.recover(c, &format!("<{}{c}", self.buf)),
            },
            State::Sgml => match c {
                '-' => self.set_state(State::Comment1),
                '[' => self.set_state(State::Cdata1),
                c if is_name_start_char(c) => {
                    self.buf.push(c);
                    self.set_state(State::Dtd1);
                }
                _ => self.recover(c, &format!("<!{c}")),
            },
            State::Dtd1 => match c {
                c if is_space(c) => {
                    if DTD_KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(&self.buf)) {
                        self.name = self.take_buf();
                        self.set_state(State::Dtd2);
                    } else {
                        log::error!("unrecognised DTD keyword {:?}", self.buf);
                        self.recover(c, &format!("<!{}{c}", self.buf));
                    }
                }
                c if is_name_char(c) => self.buf.push(c),
                _ => self.recover(c, &format!("<!{}{c}", self.buf)),
            },
            State::Dtd2 => match c {
                c if is_space(c) => {}
                '>' => {
                    self.set_state(State::Initial);
                    return Step::Emit(Token::Doctype {
                        keyword: mem::take(&mut self.name),
                        data: String::new(),
                    });
                }
                _ => {
                    self.buf.push(c);
                    self.set_state(State::Dtd3);
                }
            },
            State::Dtd3 => match c {
                '>' => {
                    self.set_state(State::Initial);
                    return Step::Emit(Token::Doctype {
                        keyword: mem::take(&mut self.name),
                        data: self.take_buf(),
                    });
                }
                _ => self.buf.push(c),
            },
            State::Comment1 => match c {
                '-' => self.set_state(State::Comment2),
                _ => self.recover(c, &format!("<!-{c}")),
            },
            State::Comment2 => {
                self.buf.push(c);
                if c == '-' {
                    self.set_state(State::Comment3);
                }
            }
            State::Comment3 => {
                self.buf.push(c);
                if c == '-' {
                    self.set_state(State::Comment4);
                } else {
                    self.set_state(State::Comment2);
                }
            }
            State::Comment4 => match c {
                '>' => {
                    self.set_state(State::Initial);
                    // drop the `--` of the terminator
                    self.buf.truncate(self.buf.len() - 2);
                    return Step::Emit(Token::Comment(self.take_buf()));
                }
                // a longer run of dashes still ends at the last two
                '-' => self.buf.push(c),
                _ => {
                    self.buf.push(c);
                    self.set_state(State::Comment2);
                }
            },
            State::Cdata1 => match c {
                c if is_name_char(c) => {
                    self.buf.push(c);
                    self.set_state(State::Cdata2);
                }
                _ => self.recover(c, &format!("<![{c}")),
            },
            State::Cdata2 => match c {
                '[' if self.buf.eq_ignore_ascii_case("CDATA") => {
                    self.buf.clear();
                    self.set_state(State::Cdata3);
                }
                '[' => {
                    log::error!("CDATA declaration expected, found {:?}", self.buf);
                    self.recover(c, &format!("<![{}{c}", self.buf));
                }
                c if is_name_char(c) => self.buf.push(c),
                _ => self.recover(c, &format!("<![{}{c}", self.buf)),
            },
            State::Cdata3 => match c {
                ']' => self.set_state(State::Cdata4),
                _ => self.buf.push(c),
            },
            State::Cdata4 => match c {
                ']' => self.set_state(State::Cdata5),
                _ => {
                    self.buf.push(']');
                    self.reader.unread(c);
                    self.set_state(State::Cdata3);
                }
            },
            State::Cdata5 => match c {
                '>' => {
                    self.set_state(State::Initial);
                    return Step::Emit(Token::CData(self.take_buf()));
                }
                // `]]]>`: the first bracket is content
                ']' => self.buf.push(']'),
                _ => {
                    self.buf.push_str("]]");
                    self.reader.unread(c);
                    self.set_state(State::Cdata3);
                }
            },
            State::PiTarget => match c {
                c if is_space(c) => {
                    self.name = self.take_buf();
                    self.pi_sep = Some(c);
                    self.set_state(State::PiData);
                }
                '?' => {
                    self.name = self.take_buf();
                    self.set_state(State::EndPi);
                }
                '>' => self.recover(c, &format!("<?{}{c}", self.buf)),
                _ => self.buf.push(c),
            },
            State::PiData => match c {
                '?' => self.set_state(State::EndPi),
                _ => self.buf.push(c),
            },
            State::EndPi => match c {
                '>' => {
                    self.set_state(State::Initial);
                    return Step::Emit(Token::ProcessingInstruction {
                        target: mem::take(&mut self.name),
                        data: self.take_buf(),
                    });
                }
                _ => {
                    let mut raw = format!("<?{}", self.name);
                    raw.extend(self.pi_sep);
                    raw.push_str(&self.buf);
                    raw.push('?');
                    raw.push(c);
                    self.recover(c, &raw);
                }
            },
            State::Entity => match c {
                '#' => self.set_state(State::Char),
                c if is_name_start_char(c) => {
                    self.reader.unread(c);
                    self.set_state(State::Ref);
                }
                _ => {
                    // A bare `&` in hand-written markup; re-read it escaped.
                    log::debug!("character {c:?} cannot start an entity name");
                    self.reader.unread(c);
                    self.reader.unread_str("&amp;");
                    self.recovered("'&' is not intended as an entity reference");
                    self.set_state(State::Initial);
                }
            },
            State::Ref => match c {
                ';' => {
                    self.set_state(State::Initial);
                    return Step::Emit(Token::EntityReference(self.take_buf()));
                }
                c if is_name_char(c) => self.buf.push(c),
                _ if is_known_entity(&self.buf) => {
                    self.reader.unread(c);
                    self.recovered("';' should have ended this entity reference");
                    self.set_state(State::Initial);
                    return Step::Emit(Token::EntityReference(self.take_buf()));
                }
                _ => {
                    self.buf.push(c);
                    let text = self.take_buf();
                    self.reader.unread_str(&text);
                    self.recovered("text was not intended as an entity reference");
                    self.set_state(State::Initial);
                }
            },
            State::Char => match c {
                '0'..='9' => {
                    self.buf.push(c);
                    self.set_state(State::Decimal);
                }
                'x' | 'X' => {
                    self.name.push(c);
                    self.set_state(State::Hex);
                }
                _ => self.recover(c, &format!("&#{c}")),
            },
            State::Hex => match c {
                c if c.is_ascii_hexdigit() => self.buf.push(c),
                _ if self.buf.is_empty() => {
                    let text = format!("#{}{c}", self.name);
                    self.reader.unread_str(&text);
                    self.recovered("text was not intended as a character reference");
                    self.set_state(State::Initial);
                }
                _ => return self.char_reference(c, 16),
            },
            State::Decimal => match c {
                '0'..='9' => self.buf.push(c),
                _ => return self.char_reference(c, 10),
            },
        }
        Step::Continue
    }

    /// Text content: words are split on markup, spaces, newlines and punctuation.
    fn text(&mut self, c: char) -> Step {
        match c {
            '<' => {
                self.set_state(State::OpenTag);
                self.flush_word()
            }
            '&' => {
                self.set_state(State::Entity);
                self.flush_word()
            }
            ' ' | '\t' | '\r' => {
                self.reader.unread(c);
                self.set_state(State::Spaces);
                self.flush_word()
            }
            '\n' if self.buf.is_empty() => Step::Emit(Token::Newline),
            '\n' => {
                self.reader.unread(c);
                Step::Emit(Token::Word(self.take_buf()))
            }
            c if is_punctuation(c) => {
                if self.buf.is_empty() {
                    return Step::Emit(Token::Punctuation(c));
                }
                self.reader.unread(c);
                Step::Emit(Token::Word(self.take_buf()))
            }
            c => {
                self.buf.push(c);
                Step::Continue
            }
        }
    }

    fn flush_word(&mut self) -> Step {
        if self.buf.is_empty() {
            Step::Continue
        } else {
            Step::Emit(Token::Word(self.take_buf()))
        }
    }

    /// Ends a numeric reference on `c`; anything but `;` is a missing `;`.
    fn char_reference(&mut self, c: char, radix: u32) -> Step {
        if c != ';' {
            self.reader.unread(c);
            self.recovered("';' should have ended this character reference");
        }
        self.set_state(State::Initial);
        let digits = self.take_buf();
        let value = match u32::from_str_radix(&digits, radix).ok().and_then(char::from_u32) {
            Some(value) => value,
            None => {
                log::warn!(
                    "character reference {digits:?} is not a valid character ({})",
                    self.here()
                );
                self.diagnostics.warnings += 1;
                char::REPLACEMENT_CHARACTER
            }
        };
        Step::Emit(Token::CharacterEntity(value))
    }

    fn tag_body(&mut self, tag: Tag) -> Step {
        match self.read_tag_body(tag) {
            TagBody::Closed(tag) => {
                self.set_state(State::Initial);
                Step::Emit(Token::Tag(tag))
            }
            TagBody::SelfClosed(tag) => {
                self.set_state(State::Initial);
                Step::Emit(Token::SelfClosingTag(tag))
            }
            // the rest of the tag is still waiting in Recover
            TagBody::Aborted(tag) => Step::Emit(Token::Tag(tag)),
            TagBody::Eof => {
                self.set_state(State::Initial);
                Step::End
            }
        }
    }
}

impl<I: Iterator<Item = char>> Iterator for Tokenizer<I> {
    type Item = Token;

    #[inline]
    fn next(&mut self) -> Option<Token> {
        self.next_token()
    }
}
