//! PHP subset parser using nom
//!
//! Covers what generated dependency-provider classes are made of.
//!
//! # EBNF Grammar
//!
//! ```ebnf
//! file        = "<?php", {top_stmt}, ["?>"];
//! top_stmt    = declare | namespace | use | class | stmt;
//! declare     = "declare", "(", ident, "=", expr, {",", ident, "=", expr}, ")", ";";
//! namespace   = "namespace", name, ";";          (* scopes the statements after it *)
//! use         = "use", name, ["as", ident], {",", name, ["as", ident]}, ";";
//! class       = {"abstract" | "final" | "readonly"}, "class", ident,
//!               ["extends", name], ["implements", name, {",", name}],
//!               "{", {member}, "}";
//! member      = "use", name, {",", name}, ";"
//!             | {modifier}, ( "const", ident, "=", expr, {",", ident, "=", expr}, ";"
//!                           | "function", ["&"], ident, params, [":", type], (block | ";")
//!                           | [type], variable, ["=", expr], {",", variable, ["=", expr]}, ";" );
//! stmt        = "return", [expr], ";"
//!             | "if", "(", expr, ")", block, {("elseif" | "else", "if"), "(", expr, ")", block},
//!               ["else", block]
//!             | expr, ";";
//! block       = "{", {stmt}, "}";
//! params      = "(", [param, {",", param}, [","]], ")";
//! param       = [type], ["&"], ["..."], variable, ["=", expr];
//! type        = ["?"], name, {"|", name};
//!
//! expr        = assignable, "=", expr | ternary;
//! ternary     = binary, ["?", [expr], ":", ternary];
//! binary      = unary, {binop, unary};      (* precedence climbing, see BinaryOp *)
//! unary       = ("!" | "-" | "+"), unary | postfix;
//! postfix     = primary, {("->" | "?->"), ident, [args] | "[", [expr], "]"};
//! primary     = variable | number | string | array | "(", expr, ")" | closure | arrow_fn
//!             | "new", name, [args]
//!             | name, "::", (variable | ident, [args])
//!             | name, [args];
//! ```

use std::cell::Cell;

use nom::{
    branch::alt,
    bytes::complete::{tag, tag_no_case, take_until, take_while},
    character::complete::{char, digit0, digit1, multispace1, not_line_ending, one_of, satisfy},
    combinator::{cut, map, map_res, not, opt, peek, recognize, value},
    error::{context, ErrorKind, ParseError, VerboseError, VerboseErrorKind},
    multi::{many0, separated_list1},
    sequence::{pair, preceded, terminated, tuple},
    IResult, Offset,
};

use super::{Parser, SyntaxError};
use crate::ast::{
    Arg, ArrayItem, BinaryOp, ClassDecl, ClassMethod, ClosureUse, Expr, Modifiers, Name,
    NodeIdGenerator, Param, Span, Stmt, StmtKind, SyntaxTree, UnaryOp, UseItem, Visibility,
};

type PResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

const OPEN_TAG: &str = "<?php";

/// Parser for the PHP subset used by generated dependency-provider classes.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhpParser;

impl PhpParser {
    pub fn new() -> Self {
        Self
    }
}

impl Parser for PhpParser {
    fn parse(&self, source: &str) -> Result<SyntaxTree, SyntaxError> {
        let grammar = Grammar::new(source);
        let stmts = grammar.finish(grammar.file(source))?;
        Ok(SyntaxTree::new(
            stmts,
            Some(source.to_string()),
            grammar.ids(),
        ))
    }

    fn parse_expression(&self, fragment: &str) -> Result<Expr, SyntaxError> {
        let grammar = Grammar::new(fragment);
        let result = tuple((
            |i| grammar.expr(i),
            opt(preceded(sp, char(';'))),
            sp,
            end_of_input,
        ))(fragment)
        .map(|(rest, (expr, _, _, _))| (rest, expr));
        grammar.finish(result)
    }

    fn parse_statements(&self, fragment: &str) -> Result<Vec<Stmt>, SyntaxError> {
        let grammar = Grammar::new(fragment);
        let result = terminated(|i| grammar.stmt_list(i, None), end_of_input)(fragment);
        grammar.finish(result)
    }

    fn name(&self) -> &'static str {
        "php"
    }
}

/// True when `text` holds nothing but whitespace and comments.
pub fn is_trivia(text: &str) -> bool {
    matches!(sp(text), Ok(("", _)))
}

// ---------------------------------------------------------------------------
// Lexical helpers
// ---------------------------------------------------------------------------

fn fail<'a, T>(input: &'a str, kind: ErrorKind) -> PResult<'a, T> {
    Err(nom::Err::Error(VerboseError::from_error_kind(input, kind)))
}

fn end_of_input(input: &str) -> PResult<'_, ()> {
    if input.is_empty() {
        Ok((input, ()))
    } else {
        Err(nom::Err::Failure(VerboseError {
            errors: vec![(input, VerboseErrorKind::Context("end of input"))],
        }))
    }
}

fn line_comment(input: &str) -> PResult<'_, &str> {
    recognize(pair(alt((tag("//"), tag("#"))), not_line_ending))(input)
}

fn block_comment(input: &str) -> PResult<'_, &str> {
    recognize(tuple((tag("/*"), take_until("*/"), tag("*/"))))(input)
}

fn comment(input: &str) -> PResult<'_, &str> {
    alt((block_comment, line_comment))(input)
}

/// Skip whitespace and comments
fn sp(input: &str) -> PResult<'_, ()> {
    value((), many0(alt((multispace1, comment))))(input)
}

/// Skip whitespace, collecting the comments passed on the way
fn trivia(input: &str) -> PResult<'_, Vec<&str>> {
    let mut comments = Vec::new();
    let mut rest = input;
    loop {
        if let Ok((next, _)) = multispace1::<_, VerboseError<&str>>(rest) {
            rest = next;
        } else if let Ok((next, text)) = comment(rest) {
            comments.push(text);
            rest = next;
        } else {
            return Ok((rest, comments));
        }
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || !c.is_ascii()
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || !c.is_ascii()
}

fn ident(input: &str) -> PResult<'_, &str> {
    recognize(pair(satisfy(is_ident_start), take_while(is_ident_char)))(input)
}

fn keyword<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    terminated(tag_no_case(word), not(peek(satisfy(is_ident_char))))
}

/// Keyword preceded by optional whitespace
fn kw<'a>(word: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    preceded(sp, keyword(word))
}

/// Punctuation preceded by optional whitespace
fn punct<'a>(symbol: &'static str) -> impl FnMut(&'a str) -> PResult<'a, &'a str> {
    preceded(sp, tag(symbol))
}

fn qualified_name(input: &str) -> PResult<'_, Name> {
    map(
        recognize(tuple((opt(char('\\')), ident, many0(pair(char('\\'), ident))))),
        Name::new,
    )(input)
}

fn variable(input: &str) -> PResult<'_, &str> {
    preceded(char('$'), ident)(input)
}

fn type_hint(input: &str) -> PResult<'_, String> {
    map(
        recognize(pair(opt(char('?')), separated_list1(char('|'), qualified_name))),
        str::to_string,
    )(input)
}

fn return_type(input: &str) -> PResult<'_, String> {
    preceded(
        tuple((sp, char(':'), not(char(':')), sp)),
        context("return type", cut(type_hint)),
    )(input)
}

fn number(input: &str) -> PResult<'_, Expr> {
    alt((
        map_res(
            recognize(tuple((
                digit1,
                alt((
                    recognize(tuple((char('.'), digit0, opt(exponent)))),
                    exponent,
                )),
            ))),
            |text: &str| text.parse::<f64>().map(Expr::Float),
        ),
        map_res(digit1, |text: &str| text.parse::<i64>().map(Expr::Int)),
    ))(input)
}

fn exponent(input: &str) -> PResult<'_, &str> {
    recognize(tuple((one_of("eE"), opt(one_of("+-")), digit1)))(input)
}

fn unterminated<'a, T>(input: &'a str) -> PResult<'a, T> {
    Err(nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context("terminated string"))],
    }))
}

fn single_quoted(input: &str) -> PResult<'_, String> {
    let (rest, _) = char('\'')(input)?;
    let mut text = String::new();
    let mut chars = rest.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '\'' => return Ok((&rest[idx + 1..], text)),
            '\\' => match chars.next() {
                Some((_, escaped @ ('\\' | '\''))) => text.push(escaped),
                Some((_, other)) => {
                    text.push('\\');
                    text.push(other);
                }
                None => break,
            },
            other => text.push(other),
        }
    }
    unterminated(input)
}

fn double_quoted(input: &str) -> PResult<'_, String> {
    let (rest, _) = char('"')(input)?;
    let mut chars = rest.char_indices();
    while let Some((idx, c)) = chars.next() {
        match c {
            '"' => return Ok((&rest[idx + 1..], rest[..idx].to_string())),
            '\\' => {
                chars.next();
            }
            _ => {}
        }
    }
    unterminated(input)
}

fn binary_op(input: &str) -> PResult<'_, BinaryOp> {
    preceded(
        sp,
        alt((
            value(BinaryOp::Coalesce, terminated(tag("??"), not(char('=')))),
            value(BinaryOp::BoolOr, terminated(tag("||"), not(char('=')))),
            value(BinaryOp::BoolAnd, terminated(tag("&&"), not(char('=')))),
            value(BinaryOp::Identical, tag("===")),
            value(BinaryOp::NotIdentical, tag("!==")),
            value(BinaryOp::Equal, terminated(tag("=="), not(char('>')))),
            value(BinaryOp::NotEqual, alt((tag("!="), tag("<>")))),
            value(BinaryOp::SmallerOrEqual, terminated(tag("<="), not(char('>')))),
            value(BinaryOp::GreaterOrEqual, tag(">=")),
            value(BinaryOp::Smaller, terminated(char('<'), not(one_of("<=")))),
            value(BinaryOp::Greater, terminated(char('>'), not(one_of(">=")))),
            value(BinaryOp::Concat, terminated(char('.'), not(one_of(".=")))),
            value(BinaryOp::Plus, terminated(char('+'), not(one_of("+=")))),
            value(BinaryOp::Minus, terminated(char('-'), not(one_of("-=>")))),
            value(BinaryOp::Mul, terminated(char('*'), not(one_of("*=")))),
            value(BinaryOp::Div, terminated(char('/'), not(char('=')))),
            value(BinaryOp::Mod, terminated(char('%'), not(char('=')))),
        )),
    )(input)
}

fn unary_op(input: &str) -> PResult<'_, UnaryOp> {
    alt((
        value(UnaryOp::Not, terminated(char('!'), not(char('=')))),
        value(UnaryOp::Minus, terminated(char('-'), not(one_of("-=>")))),
        value(UnaryOp::Plus, terminated(char('+'), not(one_of("+=")))),
    ))(input)
}

/// Comma separated items up to `close`, trailing comma allowed. The opening
/// delimiter has already been consumed.
fn delimited_list<'a, T, F>(mut input: &'a str, close: char, mut item: F) -> PResult<'a, Vec<T>>
where
    F: FnMut(&'a str) -> PResult<'a, T>,
{
    let mut items = Vec::new();
    loop {
        let (rest, _) = sp(input)?;
        if let Ok((rest, _)) = char::<_, VerboseError<&str>>(close)(rest) {
            return Ok((rest, items));
        }
        let (rest, parsed) = cut(&mut item)(rest)?;
        items.push(parsed);
        let (rest, _) = sp(rest)?;
        if let Ok((rest, _)) = char::<_, VerboseError<&str>>(',')(rest) {
            input = rest;
            continue;
        }
        let (rest, _) = cut(char(close))(rest)?;
        return Ok((rest, items));
    }
}

fn else_if(input: &str) -> PResult<'_, &str> {
    alt((kw("elseif"), recognize(pair(kw("else"), kw("if")))))(input)
}

/// `=` that is not part of `==`, `===` or `=>`
fn assign_op(input: &str) -> PResult<'_, char> {
    preceded(sp, terminated(char('='), not(one_of("=>"))))(input)
}

fn question_mark(input: &str) -> PResult<'_, char> {
    preceded(sp, terminated(char('?'), not(alt((tag("?"), tag("->"))))))(input)
}

/// `:` that is not part of `::`
fn colon(input: &str) -> PResult<'_, char> {
    preceded(sp, terminated(char(':'), not(char(':'))))(input)
}

/// `->` or the nullsafe `?->`; true for the latter
fn object_operator(input: &str) -> PResult<'_, bool> {
    alt((value(true, tag("?->")), value(false, tag("->"))))(input)
}

fn is_assignable(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Variable(_)
            | Expr::PropertyFetch { .. }
            | Expr::StaticPropertyFetch { .. }
            | Expr::ArrayDimFetch { .. }
    )
}

// ---------------------------------------------------------------------------
// Grammar
// ---------------------------------------------------------------------------

struct Grammar<'s> {
    source: &'s str,
    next_id: Cell<u32>,
}

impl<'s> Grammar<'s> {
    fn new(source: &'s str) -> Self {
        Self {
            source,
            next_id: Cell::new(1),
        }
    }

    fn ids(&self) -> NodeIdGenerator {
        NodeIdGenerator::starting_at(self.next_id.get())
    }

    fn offset(&self, rest: &str) -> usize {
        self.source.offset(rest)
    }

    fn node(&self, kind: StmtKind, comments: &[&str], span: Span) -> Stmt {
        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let mut stmt = Stmt::new(crate::ast::NodeId::new(id), kind);
        stmt.span = Some(span);
        stmt.comments = comments.iter().map(|c| c.to_string()).collect();
        stmt
    }

    /// Converts a nom outcome into the boundary error type.
    fn finish<T>(&self, result: PResult<'s, T>) -> Result<T, SyntaxError> {
        match result {
            Ok((_, parsed)) => Ok(parsed),
            Err(nom::Err::Incomplete(_)) => Err(SyntaxError::at(
                self.source,
                self.source.len(),
                "unexpected end of input",
            )),
            Err(nom::Err::Error(error)) | Err(nom::Err::Failure(error)) => {
                Err(self.describe(&error))
            }
        }
    }

    fn describe(&self, error: &VerboseError<&str>) -> SyntaxError {
        let Some((input, _)) = error.errors.first() else {
            return SyntaxError::at(self.source, 0, "invalid syntax");
        };
        let expected = error.errors.iter().find_map(|(_, kind)| match kind {
            VerboseErrorKind::Context(label) => Some(format!("expected {label}")),
            VerboseErrorKind::Char(c) => Some(format!("expected '{c}'")),
            VerboseErrorKind::Nom(_) => None,
        });
        let found = match input.chars().next() {
            Some(c) => format!("found '{c}'"),
            None => "found end of input".to_string(),
        };
        let message = match expected {
            Some(expected) => format!("{expected}, {found}"),
            None => format!("unexpected input, {found}"),
        };
        SyntaxError::at(self.source, self.offset(input), message)
    }

    // -- files and top-level statements ------------------------------------

    fn file(&self, input: &'s str) -> PResult<'s, Vec<Stmt>> {
        let (rest, _) = context("'<?php' open tag", tag(OPEN_TAG))(input)?;
        let (rest, flat) = self.stmt_list(rest, None)?;
        Ok((rest, group_namespaces(flat)))
    }

    /// Statements up to `close` (consumed) or the end of input.
    fn stmt_list(&self, mut input: &'s str, close: Option<char>) -> PResult<'s, Vec<Stmt>> {
        let mut stmts = Vec::new();
        loop {
            let (ahead, _) = sp(input)?;
            match close {
                Some(close) => {
                    if let Ok((rest, _)) = char::<_, VerboseError<&str>>(close)(ahead) {
                        return Ok((rest, stmts));
                    }
                    if ahead.is_empty() {
                        return Err(nom::Err::Failure(VerboseError::from_char(ahead, close)));
                    }
                }
                None => {
                    if ahead.is_empty() {
                        return Ok((ahead, stmts));
                    }
                    if let Ok((rest, _)) = tag::<_, _, VerboseError<&str>>("?>")(ahead) {
                        return Ok((rest, stmts));
                    }
                }
            }
            let (rest, stmt) = cut(|i| self.stmt(i))(input)?;
            stmts.push(stmt);
            input = rest;
        }
    }

    fn stmt(&self, input: &'s str) -> PResult<'s, Stmt> {
        let (input, comments) = trivia(input)?;
        let start = self.offset(comments.first().copied().unwrap_or(input));
        let (rest, (kind, body)) = context(
            "statement",
            alt((
                |i| self.declare(i),
                |i| self.namespace(i),
                |i| self.use_imports(i),
                |i| self.class(i),
                |i| self.return_stmt(i),
                |i| self.if_stmt(i),
                |i| self.expression_stmt(i),
            )),
        )(input)?;
        let mut span = Span::new(start, self.offset(rest));
        span.body = body;
        Ok((rest, self.node(kind, &comments, span)))
    }

    fn declare(&self, input: &'s str) -> PResult<'s, (StmtKind, Option<usize>)> {
        let (rest, _) = keyword("declare")(input)?;
        let (rest, _) = cut(punct("("))(rest)?;
        let (rest, directives) = delimited_list(rest, ')', |i| {
            let (i, name) = preceded(sp, ident)(i)?;
            let (i, _) = cut(punct("="))(i)?;
            let (i, value) = self.expr(i)?;
            Ok((i, (name.to_string(), value)))
        })?;
        let (rest, _) = cut(punct(";"))(rest)?;
        Ok((rest, (StmtKind::Declare(directives), None)))
    }

    fn namespace(&self, input: &'s str) -> PResult<'s, (StmtKind, Option<usize>)> {
        let (rest, _) = keyword("namespace")(input)?;
        let (rest, name) = context("namespace name", cut(preceded(sp, qualified_name)))(rest)?;
        let (rest, _) = cut(punct(";"))(rest)?;
        let body = self.offset(rest);
        Ok((
            rest,
            (
                StmtKind::Namespace {
                    name,
                    stmts: Vec::new(),
                },
                Some(body),
            ),
        ))
    }

    fn use_imports(&self, input: &'s str) -> PResult<'s, (StmtKind, Option<usize>)> {
        let (rest, _) = keyword("use")(input)?;
        let (rest, items) = cut(separated_list1(punct(","), |i| self.use_item(i)))(rest)?;
        let (rest, _) = cut(punct(";"))(rest)?;
        Ok((rest, (StmtKind::Use(items), None)))
    }

    fn use_item(&self, input: &'s str) -> PResult<'s, UseItem> {
        let (rest, name) = preceded(sp, qualified_name)(input)?;
        let (rest, alias) = opt(preceded(kw("as"), cut(preceded(sp, ident))))(rest)?;
        Ok((
            rest,
            UseItem {
                name,
                alias: alias.map(str::to_string),
            },
        ))
    }

    fn class(&self, input: &'s str) -> PResult<'s, (StmtKind, Option<usize>)> {
        let (rest, flags) = many0(terminated(
            alt((keyword("abstract"), keyword("final"), keyword("readonly"))),
            sp,
        ))(input)?;
        let (rest, _) = keyword("class")(rest)?;
        let (rest, name) = context("class name", cut(preceded(sp, ident)))(rest)?;
        let (rest, extends) = opt(preceded(kw("extends"), cut(preceded(sp, qualified_name))))(rest)?;
        let (rest, implements) = opt(preceded(
            kw("implements"),
            cut(separated_list1(punct(","), preceded(sp, qualified_name))),
        ))(rest)?;
        let (rest, _) = cut(punct("{"))(rest)?;
        let body = self.offset(rest);
        let (rest, members) = self.member_list(rest)?;

        let mut modifiers = Modifiers::default();
        for flag in flags {
            match flag.to_ascii_lowercase().as_str() {
                "abstract" => modifiers.is_abstract = true,
                "final" => modifiers.is_final = true,
                _ => modifiers.is_readonly = true,
            }
        }
        Ok((
            rest,
            (
                StmtKind::Class(ClassDecl {
                    modifiers,
                    name: name.to_string(),
                    extends,
                    implements: implements.unwrap_or_default(),
                    members,
                }),
                Some(body),
            ),
        ))
    }

    // -- class members -------------------------------------------------------

    fn member_list(&self, mut input: &'s str) -> PResult<'s, Vec<Stmt>> {
        let mut members = Vec::new();
        loop {
            let (ahead, _) = sp(input)?;
            if let Ok((rest, _)) = char::<_, VerboseError<&str>>('}')(ahead) {
                return Ok((rest, members));
            }
            let (rest, member) = context("class member", cut(|i| self.member(i)))(input)?;
            members.push(member);
            input = rest;
        }
    }

    fn member(&self, input: &'s str) -> PResult<'s, Stmt> {
        let (input, comments) = trivia(input)?;
        let start = self.offset(comments.first().copied().unwrap_or(input));
        let (rest, (kind, body)) = alt((
            |i| self.trait_use(i),
            |i| self.modified_member(i),
        ))(input)?;
        let mut span = Span::new(start, self.offset(rest));
        span.body = body;
        Ok((rest, self.node(kind, &comments, span)))
    }

    fn trait_use(&self, input: &'s str) -> PResult<'s, (StmtKind, Option<usize>)> {
        let (rest, _) = keyword("use")(input)?;
        let (rest, names) = cut(separated_list1(punct(","), preceded(sp, qualified_name)))(rest)?;
        let (rest, _) = cut(punct(";"))(rest)?;
        Ok((rest, (StmtKind::TraitUse(names), None)))
    }

    fn modifiers(&self, input: &'s str) -> PResult<'s, Modifiers> {
        let (rest, words) = many0(terminated(
            alt((
                keyword("public"),
                keyword("protected"),
                keyword("private"),
                keyword("static"),
                keyword("abstract"),
                keyword("final"),
                keyword("readonly"),
                keyword("var"),
            )),
            sp,
        ))(input)?;
        let mut modifiers = Modifiers::default();
        for word in words {
            match word.to_ascii_lowercase().as_str() {
                "public" => modifiers.visibility = Some(Visibility::Public),
                "protected" => modifiers.visibility = Some(Visibility::Protected),
                "private" => modifiers.visibility = Some(Visibility::Private),
                "static" => modifiers.is_static = true,
                "abstract" => modifiers.is_abstract = true,
                "final" => modifiers.is_final = true,
                "readonly" => modifiers.is_readonly = true,
                _ => {}
            }
        }
        Ok((rest, modifiers))
    }

    fn modified_member(&self, input: &'s str) -> PResult<'s, (StmtKind, Option<usize>)> {
        let (rest, modifiers) = self.modifiers(input)?;
        if let Ok((rest, _)) = keyword("const")(rest) {
            let (rest, consts) =
                cut(separated_list1(punct(","), |i| self.const_entry(i)))(rest)?;
            let (rest, _) = cut(punct(";"))(rest)?;
            return Ok((rest, (StmtKind::ClassConst { modifiers, consts }, None)));
        }
        if let Ok((rest, _)) = keyword("function")(rest) {
            return cut(|i| self.method_rest(i, modifiers))(rest);
        }
        self.property(rest, modifiers)
    }

    fn method_rest(&self, input: &'s str, modifiers: Modifiers) -> PResult<'s, (StmtKind, Option<usize>)> {
        let (rest, by_ref) = preceded(sp, opt(char('&')))(input)?;
        let (rest, name) = context("method name", preceded(sp, ident))(rest)?;
        let (rest, params) = self.params(rest)?;
        let (rest, return_type) = opt(return_type)(rest)?;
        let (ahead, _) = sp(rest)?;
        if let Ok((rest, _)) = char::<_, VerboseError<&str>>(';')(ahead) {
            let method = ClassMethod {
                modifiers,
                by_ref: by_ref.is_some(),
                name: name.to_string(),
                params,
                return_type,
                body: None,
            };
            return Ok((rest, (StmtKind::ClassMethod(method), None)));
        }
        let (rest, _) = context("method body", char('{'))(ahead)?;
        let body_offset = self.offset(rest);
        let (rest, stmts) = self.stmt_list(rest, Some('}'))?;
        let method = ClassMethod {
            modifiers,
            by_ref: by_ref.is_some(),
            name: name.to_string(),
            params,
            return_type,
            body: Some(stmts),
        };
        Ok((rest, (StmtKind::ClassMethod(method), Some(body_offset))))
    }

    fn property(&self, input: &'s str, modifiers: Modifiers) -> PResult<'s, (StmtKind, Option<usize>)> {
        let (rest, type_hint) = opt(terminated(
            preceded(not(char('$')), type_hint),
            sp,
        ))(input)?;
        let (rest, props) = separated_list1(punct(","), |i| self.property_entry(i))(rest)?;
        let (rest, _) = cut(punct(";"))(rest)?;
        Ok((
            rest,
            (
                StmtKind::Property {
                    modifiers,
                    type_hint,
                    props,
                },
                None,
            ),
        ))
    }

    fn const_entry(&self, input: &'s str) -> PResult<'s, (String, Expr)> {
        let (rest, name) = preceded(sp, ident)(input)?;
        let (rest, _) = cut(punct("="))(rest)?;
        let (rest, value) = cut(|i| self.expr(i))(rest)?;
        Ok((rest, (name.to_string(), value)))
    }

    fn property_entry(&self, input: &'s str) -> PResult<'s, (String, Option<Expr>)> {
        let (rest, name) = preceded(sp, variable)(input)?;
        let (rest, default) = opt(preceded(assign_op, cut(|i| self.expr(i))))(rest)?;
        Ok((rest, (name.to_string(), default)))
    }

    fn params(&self, input: &'s str) -> PResult<'s, Vec<Param>> {
        let (rest, _) = context("parameter list", punct("("))(input)?;
        delimited_list(rest, ')', |i| self.param(i))
    }

    fn param(&self, input: &'s str) -> PResult<'s, Param> {
        let (rest, _) = sp(input)?;
        let (rest, type_hint) = opt(terminated(preceded(not(one_of("$&.")), type_hint), sp))(rest)?;
        let (rest, by_ref) = opt(terminated(char('&'), sp))(rest)?;
        let (rest, variadic) = opt(terminated(tag("..."), sp))(rest)?;
        let (rest, name) = context("parameter", variable)(rest)?;
        let (rest, default) = opt(preceded(assign_op, cut(|i| self.expr(i))))(rest)?;
        Ok((
            rest,
            Param {
                type_hint,
                by_ref: by_ref.is_some(),
                variadic: variadic.is_some(),
                name: name.to_string(),
                default,
            },
        ))
    }

    // -- statements ----------------------------------------------------------

    fn return_stmt(&self, input: &'s str) -> PResult<'s, (StmtKind, Option<usize>)> {
        let (rest, _) = keyword("return")(input)?;
        let (ahead, _) = sp(rest)?;
        if let Ok((rest, _)) = char::<_, VerboseError<&str>>(';')(ahead) {
            return Ok((rest, (StmtKind::Return(None), None)));
        }
        let (rest, expr) = cut(|i| self.expr(i))(rest)?;
        let (rest, _) = cut(punct(";"))(rest)?;
        Ok((rest, (StmtKind::Return(Some(expr)), None)))
    }

    fn if_stmt(&self, input: &'s str) -> PResult<'s, (StmtKind, Option<usize>)> {
        let (rest, _) = keyword("if")(input)?;
        let (rest, (cond, then)) = cut(|i| self.guarded_block(i))(rest)?;
        let mut else_ifs = Vec::new();
        let mut otherwise = None;
        let mut input = rest;
        loop {
            if let Ok((rest, _)) = else_if(input) {
                let (rest, branch) = cut(|i| self.guarded_block(i))(rest)?;
                else_ifs.push(branch);
                input = rest;
                continue;
            }
            if let Ok((rest, _)) = kw("else")(input) {
                let (rest, _) = cut(punct("{"))(rest)?;
                let (rest, stmts) = self.stmt_list(rest, Some('}'))?;
                otherwise = Some(stmts);
                input = rest;
            }
            break;
        }
        Ok((
            input,
            (
                StmtKind::If {
                    cond,
                    then,
                    else_ifs,
                    otherwise,
                },
                None,
            ),
        ))
    }

    /// `(cond) { stmts }`
    fn guarded_block(&self, input: &'s str) -> PResult<'s, (Expr, Vec<Stmt>)> {
        let (rest, _) = punct("(")(input)?;
        let (rest, cond) = self.expr(rest)?;
        let (rest, _) = punct(")")(rest)?;
        let (rest, _) = punct("{")(rest)?;
        let (rest, stmts) = self.stmt_list(rest, Some('}'))?;
        Ok((rest, (cond, stmts)))
    }

    fn expression_stmt(&self, input: &'s str) -> PResult<'s, (StmtKind, Option<usize>)> {
        let (rest, expr) = self.expr(input)?;
        let (rest, _) = cut(context("';'", punct(";")))(rest)?;
        Ok((rest, (StmtKind::Expression(expr), None)))
    }

    // -- expressions ---------------------------------------------------------

    fn expr(&self, input: &'s str) -> PResult<'s, Expr> {
        let (input, _) = sp(input)?;
        if let Ok((rest, target)) = self.postfix(input) {
            if is_assignable(&target) {
                if let Ok((rest, _)) = assign_op(rest) {
                    let (rest, value) = cut(|i| self.expr(i))(rest)?;
                    return Ok((
                        rest,
                        Expr::Assign {
                            target: Box::new(target),
                            value: Box::new(value),
                        },
                    ));
                }
            }
        }
        self.ternary(input)
    }

    fn ternary(&self, input: &'s str) -> PResult<'s, Expr> {
        let (rest, cond) = self.binary(input, BinaryOp::Coalesce.precedence())?;
        let Ok((rest, _)) = question_mark(rest) else {
            return Ok((rest, cond));
        };
        if let Ok((rest, _)) = colon(rest) {
            let (rest, otherwise) = cut(|i| self.ternary(i))(rest)?;
            return Ok((
                rest,
                Expr::Ternary {
                    cond: Box::new(cond),
                    then: None,
                    otherwise: Box::new(otherwise),
                },
            ));
        }
        let (rest, then) = cut(|i| self.expr(i))(rest)?;
        let (rest, _) = cut(punct(":"))(rest)?;
        let (rest, otherwise) = cut(|i| self.ternary(i))(rest)?;
        Ok((
            rest,
            Expr::Ternary {
                cond: Box::new(cond),
                then: Some(Box::new(then)),
                otherwise: Box::new(otherwise),
            },
        ))
    }

    /// Precedence climbing over `BinaryOp::precedence`
    fn binary(&self, input: &'s str, min_prec: u8) -> PResult<'s, Expr> {
        let (mut input, mut left) = self.unary(input)?;
        while let Ok((rest, op)) = binary_op(input) {
            let prec = op.precedence();
            if prec < min_prec {
                break;
            }
            let next_min = if op.is_right_assoc() { prec } else { prec + 1 };
            let (rest, right) = context("right operand", cut(|i| self.binary(i, next_min)))(rest)?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
            input = rest;
        }
        Ok((input, left))
    }

    fn unary(&self, input: &'s str) -> PResult<'s, Expr> {
        let (input, _) = sp(input)?;
        if let Ok((rest, op)) = unary_op(input) {
            let (rest, operand) = cut(|i| self.unary(i))(rest)?;
            return Ok((
                rest,
                Expr::UnaryOp {
                    op,
                    operand: Box::new(operand),
                },
            ));
        }
        self.postfix(input)
    }

    fn postfix(&self, input: &'s str) -> PResult<'s, Expr> {
        let (mut input, mut expr) = self.primary(input)?;
        loop {
            let (ahead, _) = sp(input)?;
            if let Ok((rest, nullsafe)) = object_operator(ahead) {
                let (rest, name) = context("member name", cut(preceded(sp, ident)))(rest)?;
                let target = Box::new(expr);
                match self.args(rest) {
                    Ok((rest, args)) => {
                        expr = Expr::MethodCall {
                            target,
                            name: name.to_string(),
                            args,
                            nullsafe,
                        };
                        input = rest;
                    }
                    Err(nom::Err::Error(_)) => {
                        expr = Expr::PropertyFetch {
                            target,
                            name: name.to_string(),
                            nullsafe,
                        };
                        input = rest;
                    }
                    Err(error) => return Err(error),
                }
                continue;
            }
            if let Ok((rest, _)) = char::<_, VerboseError<&str>>('[')(ahead) {
                let (after, _) = sp(rest)?;
                let (rest, dim) = match char::<_, VerboseError<&str>>(']')(after) {
                    Ok((rest, _)) => (rest, None),
                    Err(_) => {
                        let (rest, dim) = cut(|i| self.expr(i))(rest)?;
                        let (rest, _) = cut(punct("]"))(rest)?;
                        (rest, Some(Box::new(dim)))
                    }
                };
                expr = Expr::ArrayDimFetch {
                    target: Box::new(expr),
                    dim,
                };
                input = rest;
                continue;
            }
            return Ok((input, expr));
        }
    }

    fn primary(&self, input: &'s str) -> PResult<'s, Expr> {
        let (input, _) = sp(input)?;
        context(
            "expression",
            alt((
                map(variable, |name| Expr::Variable(name.to_string())),
                number,
                map(single_quoted, Expr::String),
                map(double_quoted, Expr::InterpolatedString),
                |i| self.short_array(i),
                |i| self.parenthesized(i),
                |i| self.closure(i),
                |i| self.new_expr(i),
                |i| self.name_expr(i),
            )),
        )(input)
    }

    fn parenthesized(&self, input: &'s str) -> PResult<'s, Expr> {
        let (rest, _) = char('(')(input)?;
        let (rest, expr) = cut(|i| self.expr(i))(rest)?;
        let (rest, _) = cut(punct(")"))(rest)?;
        Ok((rest, expr))
    }

    fn args(&self, input: &'s str) -> PResult<'s, Vec<Arg>> {
        let (rest, _) = punct("(")(input)?;
        delimited_list(rest, ')', |i| self.arg(i))
    }

    fn arg(&self, input: &'s str) -> PResult<'s, Arg> {
        let (rest, _) = sp(input)?;
        let (rest, name) = opt(terminated(ident, colon))(rest)?;
        let (rest, unpack) = opt(punct("..."))(rest)?;
        let (rest, value) = self.expr(rest)?;
        Ok((
            rest,
            Arg {
                name: name.map(str::to_string),
                unpack: unpack.is_some(),
                value,
            },
        ))
    }

    fn short_array(&self, input: &'s str) -> PResult<'s, Expr> {
        let (rest, _) = char('[')(input)?;
        let (rest, items) = delimited_list(rest, ']', |i| self.array_item(i))?;
        Ok((
            rest,
            Expr::Array {
                items,
                long_syntax: false,
            },
        ))
    }

    fn array_item(&self, input: &'s str) -> PResult<'s, ArrayItem> {
        let (rest, _) = sp(input)?;
        if let Ok((rest, _)) = tag::<_, _, VerboseError<&str>>("...")(rest) {
            let (rest, value) = self.expr(rest)?;
            return Ok((
                rest,
                ArrayItem {
                    unpack: true,
                    ..ArrayItem::value(value)
                },
            ));
        }
        let (rest, by_ref) = opt(terminated(char('&'), sp))(rest)?;
        let (rest, first) = self.expr(rest)?;
        if by_ref.is_none() {
            if let Ok((rest, _)) = punct("=>")(rest) {
                let (rest, by_ref) = opt(preceded(sp, char('&')))(rest)?;
                let (rest, value) = cut(|i| self.expr(i))(rest)?;
                return Ok((
                    rest,
                    ArrayItem {
                        by_ref: by_ref.is_some(),
                        ..ArrayItem::keyed(first, value)
                    },
                ));
            }
        }
        Ok((
            rest,
            ArrayItem {
                by_ref: by_ref.is_some(),
                ..ArrayItem::value(first)
            },
        ))
    }

    fn closure(&self, input: &'s str) -> PResult<'s, Expr> {
        let (rest, is_static) = opt(terminated(keyword("static"), sp))(input)?;
        let is_static = is_static.is_some();
        if let Ok((rest, _)) = keyword("function")(rest) {
            let (rest, _) = preceded(sp, opt(char('&')))(rest)?;
            let (rest, params) = cut(|i| self.params(i))(rest)?;
            let (rest, uses) = opt(preceded(
                kw("use"),
                cut(preceded(punct("("), |i| delimited_list(i, ')', closure_use))),
            ))(rest)?;
            let (rest, return_type) = opt(return_type)(rest)?;
            let (rest, _) = context("closure body", cut(punct("{")))(rest)?;
            let (rest, body) = self.stmt_list(rest, Some('}'))?;
            return Ok((
                rest,
                Expr::Closure {
                    is_static,
                    params,
                    uses: uses.unwrap_or_default(),
                    return_type,
                    body,
                },
            ));
        }
        if let Ok((rest, _)) = keyword("fn")(rest) {
            let (rest, params) = cut(|i| self.params(i))(rest)?;
            let (rest, return_type) = opt(return_type)(rest)?;
            let (rest, _) = cut(punct("=>"))(rest)?;
            let (rest, body) = cut(|i| self.expr(i))(rest)?;
            return Ok((
                rest,
                Expr::ArrowFunction {
                    is_static,
                    params,
                    return_type,
                    body: Box::new(body),
                },
            ));
        }
        fail(input, ErrorKind::Tag)
    }

    fn new_expr(&self, input: &'s str) -> PResult<'s, Expr> {
        let (rest, _) = keyword("new")(input)?;
        let (rest, class) = context("class name", cut(preceded(sp, qualified_name)))(rest)?;
        let (rest, args) = match self.args(rest) {
            Ok((rest, args)) => (rest, args),
            Err(nom::Err::Error(_)) => (rest, Vec::new()),
            Err(error) => return Err(error),
        };
        Ok((rest, Expr::New { class, args }))
    }

    fn name_expr(&self, input: &'s str) -> PResult<'s, Expr> {
        let (rest, name) = qualified_name(input)?;

        if name.0.eq_ignore_ascii_case("array") {
            if let Ok((rest, _)) = punct("(")(rest) {
                let (rest, items) = delimited_list(rest, ')', |i| self.array_item(i))?;
                return Ok((
                    rest,
                    Expr::Array {
                        items,
                        long_syntax: true,
                    },
                ));
            }
        }

        if let Ok((rest, _)) = punct("::")(rest) {
            let (rest, _) = sp(rest)?;
            if let Ok((rest, property)) = variable(rest) {
                return Ok((
                    rest,
                    Expr::StaticPropertyFetch {
                        class: name,
                        name: property.to_string(),
                    },
                ));
            }
            let (rest, member) = context("class member", cut(ident))(rest)?;
            return match self.args(rest) {
                Ok((rest, args)) => Ok((
                    rest,
                    Expr::StaticCall {
                        class: name,
                        name: member.to_string(),
                        args,
                    },
                )),
                Err(nom::Err::Error(_)) => Ok((
                    rest,
                    Expr::ClassConstFetch {
                        class: name,
                        name: member.to_string(),
                    },
                )),
                Err(error) => Err(error),
            };
        }

        match self.args(rest) {
            Ok((rest, args)) => Ok((rest, Expr::FuncCall { name, args })),
            Err(nom::Err::Error(_)) => Ok((rest, Expr::ConstFetch(name))),
            Err(error) => Err(error),
        }
    }
}

fn closure_use(input: &str) -> PResult<'_, ClosureUse> {
    let (rest, by_ref) = opt(terminated(char('&'), sp))(input)?;
    let (rest, name) = variable(rest)?;
    Ok((
        rest,
        ClosureUse {
            by_ref: by_ref.is_some(),
            name: name.to_string(),
        },
    ))
}

/// Moves the statements following each `namespace X;` header into it.
fn group_namespaces(flat: Vec<Stmt>) -> Vec<Stmt> {
    let mut grouped: Vec<Stmt> = Vec::new();
    for stmt in flat {
        let opens_namespace = matches!(stmt.kind, StmtKind::Namespace { .. });
        if !opens_namespace {
            if let Some(Stmt {
                span: ns_span,
                kind: StmtKind::Namespace { stmts, .. },
                ..
            }) = grouped.last_mut()
            {
                if let (Some(ns_span), Some(span)) = (ns_span.as_mut(), stmt.span) {
                    ns_span.end = span.end;
                }
                stmts.push(stmt);
                continue;
            }
        }
        grouped.push(stmt);
    }
    grouped
}
