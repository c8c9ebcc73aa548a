//! Filter Expression: the Lucene-like boolean grammar rules use to select
//! which events they apply to.

mod ast;
mod lexer;

pub use ast::FilterExpression;
