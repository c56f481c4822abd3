//! Combinator parser over the token stream.
//!
//! Every item ends in `;`, which is also where the parser resynchronises
//! after an error, so one bad item never hides the rest of the file.

use chumsky::{input::ValueInput, prelude::*};
use ecow::EcoString;

use weft_span::{Diagnostic, Loc, SourceId, Span, Spanned};

use crate::{
    ast::{Binding, Decl, DeclKind, Path, ToyAst, TypeExpr},
    error::ToyError,
    token::Token,
};

pub type Error<'t> = Rich<'t, Token<'t>, Span>;
pub type Extra<'t> = extra::Err<Error<'t>>;

pub struct ParseResult {
    pub ast: ToyAst,
    pub errors: Vec<Diagnostic>,
}

pub fn parse<'t>(tokens: &'t [Spanned<Token<'t>>], source: SourceId) -> ParseResult {
    let end = tokens.last().map_or(0, |(_, span)| span.end);
    let eoi = Span::new(end, end);
    let input = tokens.map(eoi, |(t, s)| (t, s));

    let (ast, errors) = file_parser(source).parse(input).into_output_errors();

    let errors = errors
        .into_iter()
        .map(|error| {
            ToyError::Syntax {
                message: error.to_string(),
                loc: Loc::new(source, *error.span()),
            }
            .into()
        })
        .collect();

    ParseResult {
        ast: ast.unwrap_or_default(),
        errors,
    }
}

#[derive(Clone)]
enum Item {
    Import(Path),
    Decl(Decl),
}

/// ```bnf
/// file ::= ('module' path ';')? item*
/// item ::= 'import' path ';'
///        | 'type' ident '=' type ';'
///        | 'let' ident ':' type ';'
///        | 'proc' ident '(' bindings ')' (':' type)? ';'
/// ```
pub fn file_parser<'t, I>(source: SourceId) -> impl Parser<'t, I, ToyAst, Extra<'t>>
where
    I: ValueInput<'t, Token = Token<'t>, Span = Span>,
{
    let header = just(Token::Module)
        .ignore_then(
            path_parser(source)
                .then_ignore(just(Token::Semi))
                .map(Some)
                .recover_with(via_parser(skip_item().to(None))),
        )
        .or_not()
        .map(Option::flatten);

    header
        .then(item_parser(source).repeated().collect::<Vec<_>>())
        .then_ignore(end())
        .map(|(module, items)| {
            let mut ast = ToyAst {
                module,
                ..ToyAst::default()
            };
            for item in items.into_iter().flatten() {
                match item {
                    Item::Import(path) => ast.imports.push(path),
                    Item::Decl(decl) => ast.decls.push(decl),
                }
            }
            ast
        })
}

fn item_parser<'t, I>(source: SourceId) -> impl Parser<'t, I, Option<Item>, Extra<'t>> + Clone
where
    I: ValueInput<'t, Token = Token<'t>, Span = Span>,
{
    let ty = type_parser(source);
    let semi = just(Token::Semi);

    let import = just(Token::Import)
        .ignore_then(path_parser(source))
        .then_ignore(semi.clone())
        .map(Item::Import);

    let type_decl = just(Token::Type)
        .ignore_then(ident_parser(source))
        .then_ignore(just(Token::Eq))
        .then(ty.clone())
        .then_ignore(semi.clone())
        .map(|((name, loc), ty)| {
            Item::Decl(Decl {
                name,
                loc,
                kind: DeclKind::Type(ty),
            })
        });

    let let_decl = just(Token::Let)
        .ignore_then(ident_parser(source))
        .then_ignore(just(Token::Colon))
        .then(ty.clone())
        .then_ignore(semi.clone())
        .map(|((name, loc), ty)| {
            Item::Decl(Decl {
                name,
                loc,
                kind: DeclKind::Let(ty),
            })
        });

    let proc_decl = just(Token::Proc)
        .ignore_then(ident_parser(source))
        .then(
            bindings_parser(ty.clone(), source)
                .delimited_by(just(Token::OpenParen), just(Token::CloseParen)),
        )
        .then(just(Token::Colon).ignore_then(ty).or_not())
        .then_ignore(semi.clone())
        .map(|(((name, loc), params), result)| {
            Item::Decl(Decl {
                name,
                loc,
                kind: DeclKind::Proc { params, result },
            })
        });

    let late_module = just(Token::Module)
        .ignore_then(path_parser(source))
        .then_ignore(semi)
        .validate(|_, e, emitter| {
            emitter.emit(Rich::custom(
                e.span(),
                "`module` must be the first item of a file",
            ));
            None::<Item>
        });

    choice((
        import.map(Some),
        type_decl.map(Some),
        let_decl.map(Some),
        proc_decl.map(Some),
        late_module,
    ))
    .recover_with(via_parser(skip_item().to(None)))
    .boxed()
}

/// Skips up to and including the next `;`, always consuming at least one token.
fn skip_item<'t, I>() -> impl Parser<'t, I, (), Extra<'t>> + Clone
where
    I: ValueInput<'t, Token = Token<'t>, Span = Span>,
{
    let semi = just(Token::Semi);

    semi.clone().ignored().or(any()
        .and_is(semi.clone().not())
        .repeated()
        .at_least(1)
        .then(semi.or_not())
        .ignored())
}

/// ```bnf
/// type ::= '*' type
///        | 'struct' '{' bindings '}'
///        | path
/// ```
pub fn type_parser<'t, I>(source: SourceId) -> impl Parser<'t, I, TypeExpr, Extra<'t>> + Clone
where
    I: ValueInput<'t, Token = Token<'t>, Span = Span>,
{
    recursive(|ty| {
        let pointer = just(Token::Star)
            .ignore_then(ty.clone())
            .map_with(move |inner, e| {
                TypeExpr::Pointer(Box::new(inner), Loc::new(source, e.span()))
            });

        let strukt = just(Token::Struct)
            .ignore_then(
                bindings_parser(ty, source)
                    .delimited_by(just(Token::OpenBrace), just(Token::CloseBrace)),
            )
            .map_with(move |fields, e| TypeExpr::Struct(fields, Loc::new(source, e.span())));

        let named = path_parser(source).map(TypeExpr::Named);

        choice((pointer, strukt, named))
    })
    .boxed()
}

/// `name: type` pairs separated by commas, trailing comma allowed.
fn bindings_parser<'t, I>(
    ty: impl Parser<'t, I, TypeExpr, Extra<'t>> + Clone,
    source: SourceId,
) -> impl Parser<'t, I, Vec<Binding>, Extra<'t>> + Clone
where
    I: ValueInput<'t, Token = Token<'t>, Span = Span>,
{
    ident_parser(source)
        .then_ignore(just(Token::Colon))
        .then(ty)
        .map(|((name, loc), ty)| Binding { name, loc, ty })
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect()
}

pub fn path_parser<'t, I>(source: SourceId) -> impl Parser<'t, I, Path, Extra<'t>> + Clone
where
    I: ValueInput<'t, Token = Token<'t>, Span = Span>,
{
    ident_parser(source)
        .map(|(name, _)| name)
        .separated_by(just(Token::Dot))
        .at_least(1)
        .collect::<Vec<_>>()
        .map_with(move |segments, e| Path {
            segments,
            loc: Loc::new(source, e.span()),
        })
}

fn ident_parser<'t, I>(source: SourceId) -> impl Parser<'t, I, (EcoString, Loc), Extra<'t>> + Clone
where
    I: ValueInput<'t, Token = Token<'t>, Span = Span>,
{
    select! { Token::Ident(name) => EcoString::from(name) }
        .map_with(move |name, e| (name, Loc::new(source, e.span())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    fn parse_str(input: &str) -> ParseResult {
        let source = SourceId::from_usize(1);
        let tokens = tokenize(input, source).tokens.unwrap();
        parse(&tokens, source)
    }

    fn names(path: &Path) -> Vec<&str> {
        path.segments.iter().map(EcoString::as_str).collect()
    }

    #[test]
    fn module_and_imports() {
        let result = parse_str("module std.io; import A; import b.c;");

        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(names(result.ast.module.as_ref().unwrap()), ["std", "io"]);
        assert_eq!(result.ast.imports.len(), 2);
        assert_eq!(names(&result.ast.imports[1]), ["b", "c"]);
    }

    #[test]
    fn type_declarations() {
        let result = parse_str("type T = *B.U; type P = struct { a: int, next: *P, };");

        assert!(result.errors.is_empty(), "{:?}", result.errors);
        let [t, p] = result.ast.decls.as_slice() else {
            panic!("expected two declarations");
        };

        assert_eq!(t.name, "T");
        let DeclKind::Type(TypeExpr::Pointer(inner, _)) = &t.kind else {
            panic!("T should be a pointer");
        };
        assert!(matches!(&**inner, TypeExpr::Named(path) if path.to_string() == "B.U"));

        let DeclKind::Type(TypeExpr::Struct(fields, _)) = &p.kind else {
            panic!("P should be a struct");
        };
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1].name, "next");
    }

    #[test]
    fn locations_cover_the_syntax() {
        let result = parse_str("type T = *B.U;");

        let decl = &result.ast.decls[0];
        assert_eq!(decl.loc.span, Span::new(5, 6));
        let DeclKind::Type(ty) = &decl.kind else {
            panic!("T should be a type");
        };
        assert_eq!(ty.loc().span.start, 9);
    }

    #[test]
    fn procs_and_lets() {
        let result = parse_str("proc f(a: int, b: *T): bool; proc g(); let x: int;");

        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert!(matches!(
            &result.ast.decls[0].kind,
            DeclKind::Proc { params, result: Some(_) } if params.len() == 2
        ));
        assert!(matches!(
            &result.ast.decls[1].kind,
            DeclKind::Proc { params, result: None } if params.is_empty()
        ));
        assert!(matches!(&result.ast.decls[2].kind, DeclKind::Let(_)));
    }

    #[test]
    fn recovers_at_semicolon() {
        let result = parse_str("type = int; let x: int; type T int; let y: bool;");

        assert_eq!(result.errors.len(), 2);
        let names = result
            .ast
            .decls
            .iter()
            .map(|decl| decl.name.as_str())
            .collect::<Vec<_>>();
        assert_eq!(names, ["x", "y"]);
    }

    #[test]
    fn stray_semicolon_is_one_error() {
        let result = parse_str("; let x: int;");

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.ast.decls.len(), 1);
    }

    #[test]
    fn broken_header_keeps_items() {
        let result = parse_str("module ; let x: int;");

        assert_eq!(result.errors.len(), 1);
        assert!(result.ast.module.is_none());
        assert_eq!(result.ast.decls[0].name, "x");
    }

    #[test]
    fn late_module_is_an_error() {
        let result = parse_str("let x: int; module A;");

        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].message.contains("first item"));
        assert!(result.ast.module.is_none());
        assert_eq!(result.ast.decls.len(), 1);
    }

    #[test]
    fn missing_semicolon_at_end() {
        let result = parse_str("type T = int");

        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].code, Some(ToyError::SYNTAX));
        assert!(result.ast.decls.is_empty());
    }
}
