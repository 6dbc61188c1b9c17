//! Lenient tokenizing of HTML and SGML-like markup.

pub use tag::*;
pub use token::*;
pub use tokenizer::{Diagnostics, Options, Tokenizer};

mod tag;
mod tag_body;
mod token;
mod tokenizer;
