use derive_more::Display;

use weft_span::Spanned;

pub type Tokens<'src> = Vec<Spanned<Token<'src>>>;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Token<'src> {
    Ident(&'src str),

    #[display("module")]
    Module,
    #[display("import")]
    Import,
    #[display("type")]
    Type,
    #[display("let")]
    Let,
    #[display("proc")]
    Proc,
    #[display("struct")]
    Struct,

    #[display("*")]
    Star,
    #[display(".")]
    Dot,
    #[display(":")]
    Colon,
    #[display(";")]
    Semi,
    #[display(",")]
    Comma,
    #[display("=")]
    Eq,
    #[display("(")]
    OpenParen,
    #[display(")")]
    CloseParen,
    #[display("{{")]
    OpenBrace,
    #[display("}}")]
    CloseBrace,
}
