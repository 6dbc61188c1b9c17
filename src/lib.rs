//! A lenient, streaming tokenizer for HTML and SGML-like markup.
//!
//! Malformed input never aborts tokenizing: stray ampersands and missing
//! entity terminators are fixed up in place, and anything that cannot be
//! made sense of is handed back as [`Token::Garbage`] up to the next `>`.
//!
//! ```
//! use tagsoup::{Options, Token, Tokenizer};
//!
//! let tokens: Vec<Token> = Tokenizer::from_text("<b>hi</b>", Options::default()).collect();
//! assert_eq!(3, tokens.len());
//! assert_eq!(Token::Word("hi".into()), tokens[1]);
//! ```

pub mod html;
pub mod io;

pub use html::{Attribute, Diagnostics, Options, Tag, Token, Tokenizer};
pub use io::{Location, PushbackReader};
