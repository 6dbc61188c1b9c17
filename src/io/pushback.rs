use std::vec;

use super::Location;

/// A character reader with an unbounded pushback stack.
///
/// Characters that are pushed back are handed out again, last in first out,
/// before the underlying source is consulted. Only characters drawn from the
/// source advance the location and the character count.
///
/// Every `\r` is dropped on read, including one that was pushed back.
#[must_use]
pub struct PushbackReader<I> {
    inner: I,
    name: Option<String>,
    pushback: Vec<char>,
    loc: Location,
    consumed: usize,
}

impl<I: Iterator<Item = char>> PushbackReader<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            name: None,
            pushback: Vec::new(),
            loc: Location::START,
            consumed: 0,
        }
    }

    /// Creates a reader whose source is identified by a file name or URL.
    pub fn with_name<S: Into<String>>(inner: I, name: S) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::new(inner)
        }
    }

    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[inline]
    pub fn location(&self) -> Location {
        self.loc
    }

    /// Number of characters drawn from the underlying source so far.
    #[inline]
    pub fn char_count(&self) -> usize {
        self.consumed
    }

    /// Number of characters waiting to be replayed.
    #[inline]
    pub fn pending(&self) -> usize {
        self.pushback.len()
    }

    fn read_raw(&mut self) -> Option<char> {
        let c = self.inner.next()?;
        if c == '\n' {
            self.loc.line += 1;
            self.loc.column = 0;
        } else {
            self.loc.column += 1;
        }
        self.consumed += 1;
        Some(c)
    }

    pub fn read(&mut self) -> Option<char> {
        loop {
            let c = match self.pushback.pop() {
                Some(c) => c,
                None => self.read_raw()?,
            };
            // TODO: `\r` is dropped rather than normalized to `\n`; confirm
            //       whether old-Mac line endings need to be supported.
            if c != '\r' {
                log::trace!("char {c:?} at {}", self.loc);
                return Some(c);
            }
        }
    }

    pub fn unread(&mut self, c: char) {
        log::trace!("pushback char {c:?}");
        self.pushback.push(c);
    }

    /// Pushes a whole string back so that it is read again left to right.
    pub fn unread_str(&mut self, s: &str) {
        if s.is_empty() {
            return;
        }
        log::trace!("pushback string {s:?}");
        self.pushback.extend(s.chars().rev());
    }
}

impl PushbackReader<vec::IntoIter<char>> {
    /// Creates a reader over the characters of an in-memory document.
    pub fn from_text(text: &str) -> Self {
        Self::new(text.chars().collect::<Vec<_>>().into_iter())
    }
}

impl<I: Iterator<Item = char>> Iterator for PushbackReader<I> {
    type Item = char;

    #[inline]
    fn next(&mut self) -> Option<char> {
        self.read()
    }
}
