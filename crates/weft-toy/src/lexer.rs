use chumsky::prelude::*;

use weft_span::{Diagnostic, Loc, SourceId, Span};

use crate::{
    error::ToyError,
    token::{Token, Tokens},
};

pub type Extra<'src> = extra::Err<Rich<'src, char>>;

pub struct TokenizeResult<'src> {
    pub tokens: Option<Tokens<'src>>,
    pub errors: Vec<Diagnostic>,
}

pub fn tokenize(input: &str, source: SourceId) -> TokenizeResult<'_> {
    let (tokens, errors) = lexer().parse(input).into_output_errors();

    let errors = errors
        .into_iter()
        .map(|error| {
            let span = error.span();
            let loc = Loc::new(source, Span::new(span.start, span.end));
            ToyError::Syntax {
                message: error.to_string(),
                loc,
            }
            .into()
        })
        .collect();

    TokenizeResult { tokens, errors }
}

pub fn lexer<'src>() -> impl Parser<'src, &'src str, Tokens<'src>, Extra<'src>> {
    let ctrl = choice((
        just('*').to(Token::Star),
        just('.').to(Token::Dot),
        just(':').to(Token::Colon),
        just(';').to(Token::Semi),
        just(',').to(Token::Comma),
        just('=').to(Token::Eq),
        just('(').to(Token::OpenParen),
        just(')').to(Token::CloseParen),
        just('{').to(Token::OpenBrace),
        just('}').to(Token::CloseBrace),
    ));

    let word = text::ident().map(|ident: &'src str| match ident {
        "module" => Token::Module,
        "import" => Token::Import,
        "type" => Token::Type,
        "let" => Token::Let,
        "proc" => Token::Proc,
        "struct" => Token::Struct,
        _ => Token::Ident(ident),
    });

    let token = ctrl.or(word);

    let comment = just('#')
        .then(any().and_is(just('\n').not()).repeated())
        .padded();

    token
        .map_with(|t, e| {
            let span: SimpleSpan = e.span();
            (t, Span::new(span.start, span.end))
        })
        .padded_by(comment.repeated())
        .padded()
        // skip the offending character and keep lexing
        .recover_with(skip_then_retry_until(any().ignored(), end()))
        .repeated()
        .collect()
}
