//! The attribute list of a start tag, read once the tag name has been
//! ended by white-space.

use std::{fmt, mem};

use super::{
    tag::{is_name_char, Insertion, Tag},
    tokenizer::{is_space, State, Tokenizer},
};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
enum BodyState {
    /// Between attributes.
    Attribute,
    Name1,
    /// White-space after a name: either a valueless attribute or `=` follows.
    Name2,
    Value1,
    Value2,
    /// Unquoted value.
    Label,
    /// `"` delimited value.
    Quoted,
    /// `'` delimited value.
    Comma,
    EmptyElement2,
}

impl fmt::Display for BodyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Attribute => "tag attribute",
            Self::Name1 => "attribute name A",
            Self::Name2 => "attribute name B",
            Self::Value1 => "attribute value begin",
            Self::Value2 => "attribute value end",
            Self::Label => "literal value",
            Self::Quoted => "quoted value",
            Self::Comma => "inverted-comma delimited value",
            Self::EmptyElement2 => "empty-element close",
        })
    }
}

pub(super) enum TagBody {
    Closed(Tag),
    /// Closed with `/>`.
    SelfClosed(Tag),
    /// Malformed attribute markup; the tag holds what was read before it.
    Aborted(Tag),
    Eof,
}

impl<I: Iterator<Item = char>> Tokenizer<I> {
    pub(super) fn read_tag_body(&mut self, mut tag: Tag) -> TagBody {
        let mut state = BodyState::Attribute;
        let mut attr = String::new();
        let mut value = String::new();
        // source text of the pending attribute or `/`, replayed on error
        let mut raw = String::new();

        while let Some(c) = self.reader.read() {
            let next = match state {
                BodyState::Attribute => match c {
                    '>' => return TagBody::Closed(tag),
                    '/' => {
                        raw = c.to_string();
                        BodyState::EmptyElement2
                    }
                    c if is_space(c) => state,
                    c if is_name_char(c) => {
                        attr.push(c);
                        raw = c.to_string();
                        BodyState::Name1
                    }
                    _ => return self.abort(tag, state, c, &c.to_string()),
                },
                BodyState::Name1 => match c {
                    '>' => {
                        self.add_attribute(&mut tag, &attr, None);
                        return TagBody::Closed(tag);
                    }
                    '/' => {
                        self.add_attribute(&mut tag, &mem::take(&mut attr), None);
                        raw = c.to_string();
                        BodyState::EmptyElement2
                    }
                    '=' => {
                        raw.push(c);
                        BodyState::Value1
                    }
                    c if is_space(c) => {
                        raw.push(c);
                        BodyState::Name2
                    }
                    c if is_name_char(c) => {
                        attr.push(c);
                        raw.push(c);
                        state
                    }
                    _ => return self.abort(tag, state, c, &format!("{raw}{c}")),
                },
                BodyState::Name2 => match c {
                    '>' => {
                        self.add_attribute(&mut tag, &attr, None);
                        return TagBody::Closed(tag);
                    }
                    '/' => {
                        self.add_attribute(&mut tag, &mem::take(&mut attr), None);
                        raw = c.to_string();
                        BodyState::EmptyElement2
                    }
                    '=' => {
                        raw.push(c);
                        BodyState::Value1
                    }
                    c if is_space(c) => {
                        raw.push(c);
                        state
                    }
                    c if is_name_char(c) => {
                        self.add_attribute(&mut tag, &attr, None);
                        attr.clear();
                        attr.push(c);
                        raw = c.to_string();
                        BodyState::Name1
                    }
                    _ => {
                        // the valueless attribute is complete; only `c` is replayed
                        self.add_attribute(&mut tag, &attr, None);
                        return self.abort(tag, state, c, &c.to_string());
                    }
                },
                BodyState::Value1 => match c {
                    c if is_space(c) => {
                        raw.push(c);
                        state
                    }
                    '"' => BodyState::Quoted,
                    '\'' => BodyState::Comma,
                    c if is_name_char(c) => {
                        value.push(c);
                        BodyState::Label
                    }
                    _ => return self.abort(tag, state, c, &format!("{raw}{c}")),
                },
                BodyState::Label => match c {
                    '>' => {
                        self.add_attribute(&mut tag, &attr, Some(&value));
                        return TagBody::Closed(tag);
                    }
                    c if is_space(c) => {
                        self.add_attribute(&mut tag, &attr, Some(&value));
                        attr.clear();
                        value.clear();
                        BodyState::Attribute
                    }
                    _ => {
                        value.push(c);
                        state
                    }
                },
                BodyState::Quoted | BodyState::Comma => {
                    let quote = if state == BodyState::Quoted { '"' } else { '\'' };
                    if c == quote {
                        self.add_attribute(&mut tag, &attr, Some(&value));
                        attr.clear();
                        value.clear();
                        BodyState::Value2
                    } else {
                        value.push(c);
                        state
                    }
                }
                BodyState::Value2 => match c {
                    '>' => return TagBody::Closed(tag),
                    '/' => {
                        raw = c.to_string();
                        BodyState::EmptyElement2
                    }
                    c if is_space(c) => BodyState::Attribute,
                    _ => {
                        // no space before the next attribute
                        self.reader.unread(c);
                        BodyState::Attribute
                    }
                },
                BodyState::EmptyElement2 => match c {
                    '>' => return TagBody::SelfClosed(tag),
                    c if is_space(c) => {
                        raw.push(c);
                        state
                    }
                    _ => return self.abort(tag, state, c, &format!("{raw}{c}")),
                },
            };
            if next != state {
                log::trace!("changing tag body state from {state} to {next}");
                state = next;
            }
        }

        log::warn!("unexpected end of input in tag <{}> ({})", tag.name(), self.here());
        self.diagnostics.warnings += 1;
        TagBody::Eof
    }

    fn add_attribute(&mut self, tag: &mut Tag, name: &str, value: Option<&str>) {
        match tag.add_attribute(name, value) {
            Ok(Insertion::Overwritten) => self.diagnostics.warnings += 1,
            Ok(_) => {}
            Err(err) => log::error!("attribute ignored: {err} ({})", self.here()),
        }
    }

    /// Hands back the tag read so far and leaves `raw` to be discarded by
    /// the outer machine.
    fn abort(&mut self, tag: Tag, state: BodyState, c: char, raw: &str) -> TagBody {
        log::error!(
            "character {c:?} cannot be accepted from the {state} state ({})",
            self.here()
        );
        self.reader.unread_str(raw);
        self.diagnostics.errors += 1;
        self.set_state(State::Recover);
        TagBody::Aborted(tag)
    }
}
