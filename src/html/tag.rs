use std::fmt;

use indexmap::IndexMap;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TagError {
    #[error("invalid attribute name {name:?}: unexpected {c:?}")]
    InvalidName { name: String, c: char },
}

/// What happened to the tag when an attribute was added.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Insertion {
    Added,
    Updated,
    /// An existing value was replaced. The last write wins.
    Overwritten,
}

/// First character of a tag or attribute name.
#[inline]
pub fn is_name_start_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == ':'
}

/// Any character of a tag name, as scanned by the tokenizer.
#[inline]
pub fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':')
}

// Only the name-start class is accepted for attribute names, not the wider
// XML `NameChar` production (`-`, `.`, digits and the non-ASCII ranges).
fn validate_name(name: &str) -> Result<(), TagError> {
    match name.chars().find(|&c| !is_name_start_char(c)) {
        Some(c) => Err(TagError::InvalidName {
            name: name.to_string(),
            c,
        }),
        None if name.is_empty() => Err(TagError::InvalidName {
            name: String::new(),
            c: '\0',
        }),
        None => Ok(()),
    }
}

pub fn unescape_attribute_value(value: &str) -> String {
    value
        .replace("&amp;", "&")
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
}

pub fn escape_attribute_value(value: &str) -> String {
    // `&` goes first so the other substitutions are not escaped twice
    value
        .replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// The form attribute values are stored in, whatever escaping the input used.
pub fn canonical_attribute_value(value: &str) -> String {
    escape_attribute_value(&unescape_attribute_value(value))
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Attribute {
    name: String,
    value: Option<String>,
}

impl Attribute {
    /// A value of `true` (in any case) makes a valueless, boolean-style attribute.
    pub fn new<S: Into<String>>(name: S, value: Option<String>) -> Self {
        let value = value.filter(|v| !v.eq_ignore_ascii_case("true"));
        Self {
            name: name.into(),
            value,
        }
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Sets the value; `None` never erases an existing one.
    ///
    /// Returns `true` when a previous value was overwritten.
    pub fn set_value(&mut self, value: Option<String>) -> bool {
        let Some(value) = value else {
            return false;
        };
        let overwritten = match &self.value {
            Some(old) => {
                log::warn!(
                    "overwriting value of attribute {:?}: old {old:?}, new {value:?}",
                    self.name
                );
                true
            }
            None => false,
        };
        self.value = Some(value);
        overwritten
    }
}

/// A start or end tag with its attributes in source order.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Tag {
    // end tags keep their leading `/`
    name: String,
    case_sensitive: bool,
    attrs: IndexMap<String, Attribute>,
}

impl Tag {
    /// Creates a tag; a name starting with `/` makes an end tag.
    pub fn new(name: &str, case_sensitive: bool) -> Self {
        let name = if case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        };
        Self {
            name,
            case_sensitive,
            attrs: IndexMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        self.name.strip_prefix('/').unwrap_or(&self.name)
    }

    #[inline]
    pub fn is_end_tag(&self) -> bool {
        self.name.starts_with('/')
    }

    #[inline]
    pub fn is_case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    fn key(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_string()
        } else {
            name.to_lowercase()
        }
    }

    /// Adds an attribute, or sets the value of an existing one.
    ///
    /// Values are stored in canonical escaped form, see
    /// [`canonical_attribute_value`].
    pub fn add_attribute(&mut self, name: &str, value: Option<&str>) -> Result<Insertion, TagError> {
        validate_name(name)?;
        let key = self.key(name);
        let value = value.map(canonical_attribute_value);
        match self.attrs.get_mut(&key) {
            Some(attr) => {
                if attr.set_value(value) {
                    Ok(Insertion::Overwritten)
                } else {
                    Ok(Insertion::Updated)
                }
            }
            None => {
                let attr = Attribute::new(key.clone(), value);
                self.attrs.insert(key, attr);
                Ok(Insertion::Added)
            }
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attrs.get(&self.key(name))
    }

    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Attribute::value)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attrs.contains_key(&self.key(name))
    }

    pub fn attributes(&self) -> impl Iterator<Item = &Attribute> {
        self.attrs.values()
    }

    #[inline]
    pub fn attribute_count(&self) -> usize {
        self.attrs.len()
    }

    /// Removes every attribute except `name`.
    pub fn retain_attribute(&mut self, name: &str) {
        let key = self.key(name);
        self.attrs.retain(|k, _| *k == key);
    }

    /// Removes every attribute not listed in `names`.
    pub fn retain_attributes(&mut self, names: &[&str]) {
        let keys: Vec<String> = names.iter().map(|name| self.key(name)).collect();
        self.attrs.retain(|k, _| keys.contains(k));
    }

    fn write_open(&self, f: &mut impl fmt::Write, name: &str) -> fmt::Result {
        write!(f, "<{name}")?;
        for (name, attr) in &self.attrs {
            match attr.value() {
                Some(value) => write!(f, " {name}=\"{value}\"")?,
                None => write!(f, " {name}")?,
            }
        }
        Ok(())
    }

    /// Writes the tag as markup, closing it with `/>` when `self_closing`.
    pub fn write_markup(&self, f: &mut impl fmt::Write, self_closing: bool) -> fmt::Result {
        self.write_open(f, &self.name)?;
        f.write_str(if self_closing { "/>" } else { ">" })
    }

    /// Writes an element whose only content is a comment. An end tag is
    /// written as the element it closes.
    pub fn write_element_with_comment(&self, f: &mut impl fmt::Write, comment: &str) -> fmt::Result {
        self.write_open(f, self.name())?;
        write!(f, "><!--{comment}--></{}>", self.name())
    }

    pub fn to_element_with_comment(&self, comment: &str) -> String {
        ElementWithComment { tag: self, comment }.to_string()
    }
}

struct ElementWithComment<'a> {
    tag: &'a Tag,
    comment: &'a str,
}

impl fmt::Display for ElementWithComment<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.tag.write_element_with_comment(f, self.comment)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_markup(f, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_is_lowercased_unless_case_sensitive() {
        assert_eq!("div", Tag::new("DIV", false).name());
        assert_eq!("DIV", Tag::new("DIV", true).name());
        assert!(Tag::new("div", true).is_case_sensitive());
    }

    #[test]
    fn end_tag_name() {
        let tag = Tag::new("/B", false);
        assert!(tag.is_end_tag());
        assert_eq!("b", tag.name());
        assert_eq!("</b>", tag.to_string());
        assert!(!Tag::new("b", false).is_end_tag());
    }

    #[test]
    fn boolean_attribute_values() {
        assert_eq!(None, Attribute::new("checked", Some("TRUE".into())).value());
        assert_eq!(Some("false"), Attribute::new("checked", Some("false".into())).value());
        assert_eq!(None, Attribute::new("checked", None).value());
    }

    #[test]
    fn set_value() {
        let mut attr = Attribute::new("a", None);
        assert!(!attr.set_value(None));
        assert!(!attr.set_value(Some("1".into())));
        assert!(!attr.set_value(None));
        assert_eq!(Some("1"), attr.value());
        assert!(attr.set_value(Some("2".into())));
        assert_eq!(Some("2"), attr.value());
    }

    #[test]
    fn add_attribute() {
        let mut tag = Tag::new("a", false);
        assert_eq!(Ok(Insertion::Added), tag.add_attribute("HREF", Some("x")));
        assert_eq!(Ok(Insertion::Updated), tag.add_attribute("href", None));
        assert_eq!(Ok(Insertion::Overwritten), tag.add_attribute("Href", Some("y")));
        assert_eq!(Some("y"), tag.attribute_value("hReF"));
        assert_eq!(1, tag.attribute_count());
        assert_eq!("href", tag.attribute("href").unwrap().name());
    }

    #[test]
    fn case_sensitive_attributes() {
        let mut tag = Tag::new("a", true);
        tag.add_attribute("Id", Some("1")).unwrap();
        tag.add_attribute("id", Some("2")).unwrap();
        assert_eq!(2, tag.attribute_count());
        assert_eq!(Some("1"), tag.attribute_value("Id"));
        assert!(!tag.has_attribute("ID"));
    }

    #[test]
    fn invalid_attribute_names_are_rejected() {
        let mut tag = Tag::new("p", false);
        assert_eq!(
            Err(TagError::InvalidName {
                name: "data-x".into(),
                c: '-'
            }),
            tag.add_attribute("data-x", Some("1"))
        );
        assert!(tag.add_attribute("h1", None).is_err());
        assert!(tag.add_attribute("", None).is_err());
        assert!(tag.add_attribute("xml:lang", Some("en")).is_ok());
        assert!(tag.add_attribute("_x", None).is_ok());
        assert_eq!(2, tag.attribute_count());
    }

    #[test]
    fn escaping() {
        assert_eq!("a &amp; b &quot;c&quot; &lt;d&gt;", escape_attribute_value("a & b \"c\" <d>"));
        assert_eq!("a & b \"c\" <d>", unescape_attribute_value("a &amp; b &quot;c&quot; &lt;d&gt;"));
        assert_eq!("&amp;amp;", escape_attribute_value("&amp;"));
    }

    #[test]
    fn canonical_values_are_stable() {
        for value in ["plain", "a & b", "&amp; &lt;", "&amp;lt;", "\"q\" 'q'", "x > y"] {
            let once = canonical_attribute_value(value);
            assert_eq!(once, canonical_attribute_value(&once), "{value}");
        }
        assert_eq!("a &amp; b", canonical_attribute_value("a & b"));
        assert_eq!("a &amp; b", canonical_attribute_value("a &amp; b"));
        assert_eq!("&lt;", canonical_attribute_value("&amp;lt;"));
    }

    #[test]
    fn stored_values_are_canonical() {
        let mut tag = Tag::new("a", false);
        tag.add_attribute("title", Some("Tom & \"Jerry\"")).unwrap();
        assert_eq!(Some("Tom &amp; &quot;Jerry&quot;"), tag.attribute_value("title"));
    }

    #[test]
    fn attributes_keep_insertion_order() {
        let mut tag = Tag::new("img", false);
        for name in ["src", "alt", "width", "class"] {
            tag.add_attribute(name, Some("v")).unwrap();
        }
        let names: Vec<&str> = tag.attributes().map(Attribute::name).collect();
        assert_eq!(vec!["src", "alt", "width", "class"], names);
    }

    #[test]
    fn retain() {
        let mut tag = Tag::new("a", false);
        for name in ["href", "class", "id", "title"] {
            tag.add_attribute(name, Some("v")).unwrap();
        }
        tag.retain_attributes(&["TITLE", "href", "missing"]);
        let names: Vec<&str> = tag.attributes().map(Attribute::name).collect();
        assert_eq!(vec!["href", "title"], names);
        tag.retain_attribute("Title");
        assert_eq!(1, tag.attribute_count());
        assert!(tag.has_attribute("title"));
    }

    #[test]
    fn render() {
        let mut tag = Tag::new("input", false);
        tag.add_attribute("type", Some("checkbox")).unwrap();
        tag.add_attribute("checked", None).unwrap();
        tag.add_attribute("title", Some("a<b")).unwrap();
        assert_eq!(r#"<input type="checkbox" checked title="a&lt;b">"#, tag.to_string());

        let mut out = String::new();
        tag.write_markup(&mut out, true).unwrap();
        assert_eq!(r#"<input type="checkbox" checked title="a&lt;b"/>"#, out);
    }

    #[test]
    fn element_with_comment() {
        let mut tag = Tag::new("script", false);
        tag.add_attribute("src", Some("a.js")).unwrap();
        assert_eq!(
            r#"<script src="a.js"><!--empty--></script>"#,
            tag.to_element_with_comment("empty")
        );
    }

    #[test]
    fn end_tag_element_with_comment() {
        let tag = Tag::new("/B", false);
        assert_eq!("<b><!--c--></b>", tag.to_element_with_comment("c"));

        let mut out = String::new();
        tag.write_element_with_comment(&mut out, "").unwrap();
        assert_eq!("<b><!----></b>", out);
    }
}
