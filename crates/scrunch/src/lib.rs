//! scrunch: a scope-aware JavaScript cruncher
//!
//! Parses a script, analyzes its scopes, renames what can safely be
//! renamed, and emits the shortest equivalent text.
//!
//! # Design Principles
//!
//! 1. **Arena AST**
//!    - Nodes live in one flat vector, referenced by index
//!    - Every node knows its parent; structural edits go through a single
//!      validated entry point
//!
//! 2. **Lexing on-demand**
//!    - The lexer is pulled by the parser, enabling context-sensitive
//!      tokenization (regex vs division, conditional-compilation comments)
//!
//! 3. **Analysis before transformation**
//!    - One walk builds the scope tree and label stack; a second binds
//!      every identifier
//!    - `eval` and `with` mark whole scopes as unknowable instead of
//!      disabling renaming globally
//!
//! 4. **Renaming is a scope-tree operation**
//!    - The cruncher never touches the AST; the emitter reads assigned
//!      names off the bindings
//!
//! # Example
//!
//! ```ignore
//! use scrunch::{minify, MinifyOptions};
//!
//! let out = minify("function f() { var count = 0; return count; }",
//!                  &MinifyOptions::default())?;
//! assert_eq!(out.code, "function f(){var a=0;return a}");
//! ```

mod token;
mod lexer;
mod ast;
mod parser;
mod span;

mod scope;
mod analyze;
mod crunch;
mod codegen;
mod error;

use serde::{Deserialize, Serialize};

// Re-exports
pub use token::{Token, TokenKind};
pub use lexer::Lexer;
pub use ast::*;
pub use parser::{Parser, ParseError};
pub use span::{LineIndex, Span};
pub use scope::{Binding, BindingId, BindingKind, Scope, ScopeId, ScopeKind, ScopeTree};
pub use analyze::{analyze, Analysis};
pub use crunch::{crunch, encode_name, label_text, CrunchEnumerator, CrunchOptions};
pub use codegen::{Codegen, CodegenOptions, Format, OutputMode};
pub use error::{Diagnostic, Error, Severity};

/// Everything the pipeline can be told.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MinifyOptions {
    pub crunch: CrunchOptions,
    pub codegen: CodegenOptions,
}

/// Result of minifying one document.
#[derive(Debug)]
pub struct MinifyOutput {
    pub code: String,
    /// Recoverable problems found during analysis, in source order.
    pub diagnostics: Vec<Diagnostic>,
}

/// Parse a script into an AST without transforming it.
pub fn parse(source: &str) -> Result<Ast, ParseError> {
    Parser::new(source).parse()
}

/// The whole pipeline: parse, analyze, crunch, emit.
pub fn minify(source: &str, options: &MinifyOptions) -> Result<MinifyOutput, Error> {
    let mut ast = parse(source)?;
    let mut analysis = analyze(&mut ast, &options.crunch);
    crunch(&mut analysis.scopes, &options.crunch);
    let code = Codegen::new(&ast, &analysis.scopes, &options.crunch, &options.codegen).generate();
    Ok(MinifyOutput { code, diagnostics: analysis.diagnostics })
}
