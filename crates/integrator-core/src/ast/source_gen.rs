// Source code generation from the syntax tree.
//
// Nodes that still carry a span into the original text are copied verbatim,
// so an untouched tree prints back byte for byte. Dirty containers keep their
// original header and the whitespace between untouched siblings; everything
// without a span is pretty-printed in PSR-12 style.

use super::*;
use crate::parser::php::is_trivia;

const INDENT: &str = "    ";
const OPEN_TAG: &str = "<?php";

/// Trait for nodes that can generate their default-style source representation
pub trait ToSource {
    fn to_source(&self) -> String;
}

/// Boundary contract for turning a tree back into source text.
pub trait Printer {
    fn print(&self, tree: &SyntaxTree) -> String;
}

/// Format-preserving printer for the PHP subset understood by `PhpParser`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhpPrinter;

impl Printer for PhpPrinter {
    fn print(&self, tree: &SyntaxTree) -> String {
        SourceWriter::new(tree.source.as_deref()).file(&tree.stmts)
    }
}

impl ToSource for SyntaxTree {
    fn to_source(&self) -> String {
        SourceWriter::new(None).file(&self.stmts)
    }
}

impl ToSource for Stmt {
    fn to_source(&self) -> String {
        let mut writer = SourceWriter::new(None);
        writer.stmt(self);
        writer.out
    }
}

impl ToSource for ClassMethod {
    fn to_source(&self) -> String {
        let mut writer = SourceWriter::new(None);
        writer.method(self);
        writer.out
    }
}

impl ToSource for Expr {
    fn to_source(&self) -> String {
        let mut writer = SourceWriter::new(None);
        writer.expr(self);
        writer.out
    }
}

/// How siblings of a statement list are separated when they are printed fresh.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    TopLevel,
    Members,
    Body,
}

impl Layout {
    fn blank_line_before(self, prev: Option<&Stmt>, next: &Stmt) -> bool {
        match self {
            Layout::TopLevel => !matches!(
                (prev.map(|stmt| &stmt.kind), &next.kind),
                (Some(StmtKind::Use(_)), StmtKind::Use(_))
            ),
            Layout::Members => prev.is_some(),
            Layout::Body => false,
        }
    }
}

// Precedence levels shared by the expression printer.
const PREC_ASSIGN: u8 = 1;
const PREC_TERNARY: u8 = 2;
const PREC_UNARY: u8 = 11;
const PREC_POSTFIX: u8 = 12;

fn precedence(expr: &Expr) -> u8 {
    match expr {
        Expr::Assign { .. } | Expr::Closure { .. } | Expr::ArrowFunction { .. } => PREC_ASSIGN,
        Expr::Ternary { .. } => PREC_TERNARY,
        Expr::BinaryOp { op, .. } => op.precedence(),
        Expr::UnaryOp { .. } | Expr::New { .. } => PREC_UNARY,
        _ => PREC_POSTFIX,
    }
}

fn is_simple(expr: &Expr) -> bool {
    match expr {
        Expr::Int(_)
        | Expr::Float(_)
        | Expr::String(_)
        | Expr::InterpolatedString(_)
        | Expr::ConstFetch(_)
        | Expr::ClassConstFetch { .. }
        | Expr::Variable(_) => true,
        Expr::Array { items, .. } => items.is_empty(),
        _ => false,
    }
}

fn escape_single_quoted(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NAN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "INF" } else { "-INF" }.to_string();
    }
    let text = value.to_string();
    if text.contains(['.', 'e', 'E']) {
        text
    } else {
        format!("{text}.0")
    }
}

struct SourceWriter<'s> {
    source: Option<&'s str>,
    out: String,
    depth: usize,
}

impl<'s> SourceWriter<'s> {
    fn new(source: Option<&'s str>) -> Self {
        Self {
            source,
            out: String::new(),
            depth: 0,
        }
    }

    /// Source slice of a span, if the span really points into our source.
    fn original(&self, span: Option<Span>) -> Option<(&'s str, Span)> {
        let source = self.source?;
        let span = span?;
        let valid = span.start <= span.end
            && span.end <= source.len()
            && source.is_char_boundary(span.start)
            && source.is_char_boundary(span.end)
            && span
                .body
                .map_or(true, |body| body >= span.start && body <= span.end && source.is_char_boundary(body));
        valid.then_some((source, span))
    }

    /// Original text between two offsets, usable only when it holds nothing
    /// but whitespace and comments.
    fn gap(&self, from: Option<usize>, to: Option<usize>) -> Option<&'s str> {
        let source = self.source?;
        let (from, to) = (from?, to?);
        if from > to || to > source.len() || !source.is_char_boundary(from) || !source.is_char_boundary(to) {
            return None;
        }
        let text = &source[from..to];
        is_trivia(text).then_some(text)
    }

    fn newline(&mut self) {
        self.out.push('\n');
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
    }

    fn file(mut self, stmts: &[Stmt]) -> String {
        let open = self
            .source
            .filter(|source| source.starts_with(OPEN_TAG))
            .map(|_| OPEN_TAG.len());
        self.out.push_str(OPEN_TAG);
        let last = self.sequence(stmts, open, Layout::TopLevel);
        let end = self.source.map(str::len);
        match self.gap(last, end) {
            Some(text) => self.out.push_str(text),
            None => self.out.push('\n'),
        }
        self.out
    }

    /// Prints a statement list and returns the end offset of the last sibling
    /// when it has one, for the caller's closing gap.
    fn sequence(&mut self, stmts: &[Stmt], open: Option<usize>, layout: Layout) -> Option<usize> {
        let mut prev_end = open;
        let mut prev: Option<&Stmt> = None;
        for stmt in stmts {
            let start = self.original(stmt.span).map(|(_, span)| span.start);
            match self.gap(prev_end, start) {
                Some(text) => self.out.push_str(text),
                None => {
                    if layout.blank_line_before(prev, stmt) {
                        self.out.push('\n');
                    }
                    self.newline();
                }
            }
            self.stmt(stmt);
            prev_end = self.original(stmt.span).map(|(_, span)| span.end);
            prev = Some(stmt);
        }
        prev_end
    }

    /// Prints `stmts` one level deeper and closes the block with `}`.
    fn block(&mut self, stmts: &[Stmt], open: Option<usize>, close: Option<usize>, layout: Layout) {
        self.depth += 1;
        let last = self.sequence(stmts, open, layout);
        self.depth -= 1;
        match self.gap(last, close) {
            Some(text) => self.out.push_str(text),
            None => self.newline(),
        }
        self.out.push('}');
    }

    fn stmt(&mut self, stmt: &Stmt) {
        if let Some((source, span)) = self.original(stmt.span) {
            if !stmt.dirty {
                self.out.push_str(&source[span.start..span.end]);
                return;
            }
            if self.dirty_container(stmt, source, span) {
                return;
            }
        }

        for comment in &stmt.comments {
            self.out.push_str(comment);
            self.newline();
        }

        match &stmt.kind {
            StmtKind::Declare(directives) => {
                self.out.push_str("declare(");
                for (i, (name, value)) in directives.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(name);
                    self.out.push('=');
                    self.expr(value);
                }
                self.out.push_str(");");
            }
            StmtKind::Namespace { name, stmts } => {
                self.out.push_str(&format!("namespace {name};"));
                self.sequence(stmts, None, Layout::TopLevel);
            }
            StmtKind::Use(items) => {
                self.out.push_str("use ");
                self.use_items(items);
                self.out.push(';');
            }
            StmtKind::Class(class) => self.class(class),
            StmtKind::TraitUse(names) => {
                let names = names.iter().map(|n| n.0.as_str()).collect::<Vec<_>>();
                self.out.push_str(&format!("use {};", names.join(", ")));
            }
            StmtKind::ClassConst { modifiers, consts } => {
                self.modifiers(modifiers);
                self.out.push_str("const ");
                for (i, (name, value)) in consts.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push_str(name);
                    self.out.push_str(" = ");
                    self.expr(value);
                }
                self.out.push(';');
            }
            StmtKind::Property {
                modifiers,
                type_hint,
                props,
            } => {
                if *modifiers == Modifiers::default() {
                    self.out.push_str("var ");
                } else {
                    self.modifiers(modifiers);
                }
                if let Some(type_hint) = type_hint {
                    self.out.push_str(type_hint);
                    self.out.push(' ');
                }
                for (i, (name, default)) in props.iter().enumerate() {
                    if i > 0 {
                        self.out.push_str(", ");
                    }
                    self.out.push('$');
                    self.out.push_str(name);
                    if let Some(default) = default {
                        self.out.push_str(" = ");
                        self.expr(default);
                    }
                }
                self.out.push(';');
            }
            StmtKind::ClassMethod(method) => self.method(method),
            StmtKind::Return(value) => match value {
                Some(value) => {
                    self.out.push_str("return ");
                    self.expr(value);
                    self.out.push(';');
                }
                None => self.out.push_str("return;"),
            },
            StmtKind::Expression(expr) => {
                self.expr(expr);
                self.out.push(';');
            }
            StmtKind::If {
                cond,
                then,
                else_ifs,
                otherwise,
            } => {
                self.out.push_str("if (");
                self.expr(cond);
                self.out.push_str(") {");
                self.block(then, None, None, Layout::Body);
                for (cond, stmts) in else_ifs {
                    self.out.push_str(" elseif (");
                    self.expr(cond);
                    self.out.push_str(") {");
                    self.block(stmts, None, None, Layout::Body);
                }
                if let Some(stmts) = otherwise {
                    self.out.push_str(" else {");
                    self.block(stmts, None, None, Layout::Body);
                }
            }
        }
    }

    /// Re-prints a dirty container around its original header. Returns false
    /// when the node has no recorded body offset and must be printed fresh.
    fn dirty_container(&mut self, stmt: &Stmt, source: &'s str, span: Span) -> bool {
        let Some(body) = span.body else {
            return false;
        };
        let closing = span.end.checked_sub(1).filter(|&end| end >= body);
        match &stmt.kind {
            StmtKind::Namespace { stmts, .. } => {
                self.out.push_str(&source[span.start..body]);
                self.sequence(stmts, Some(body), Layout::TopLevel);
                true
            }
            StmtKind::Class(class) => {
                self.out.push_str(&source[span.start..body]);
                self.block(&class.members, Some(body), closing, Layout::Members);
                true
            }
            StmtKind::ClassMethod(ClassMethod {
                body: Some(stmts), ..
            }) => {
                self.out.push_str(&source[span.start..body]);
                self.block(stmts, Some(body), closing, Layout::Body);
                true
            }
            _ => false,
        }
    }

    fn use_items(&mut self, items: &[UseItem]) {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            self.out.push_str(item.name.trimmed());
            if let Some(alias) = &item.alias {
                self.out.push_str(" as ");
                self.out.push_str(alias);
            }
        }
    }

    fn modifiers(&mut self, modifiers: &Modifiers) {
        if modifiers.is_abstract {
            self.out.push_str("abstract ");
        }
        if modifiers.is_final {
            self.out.push_str("final ");
        }
        if let Some(visibility) = modifiers.visibility {
            self.out.push_str(visibility.as_str());
            self.out.push(' ');
        }
        if modifiers.is_static {
            self.out.push_str("static ");
        }
        if modifiers.is_readonly {
            self.out.push_str("readonly ");
        }
    }

    fn class(&mut self, class: &ClassDecl) {
        self.modifiers(&class.modifiers);
        self.out.push_str("class ");
        self.out.push_str(&class.name);
        if let Some(parent) = &class.extends {
            self.out.push_str(" extends ");
            self.out.push_str(&parent.0);
        }
        if !class.implements.is_empty() {
            let names = class.implements.iter().map(|n| n.0.as_str()).collect::<Vec<_>>();
            self.out.push_str(" implements ");
            self.out.push_str(&names.join(", "));
        }
        self.newline();
        self.out.push('{');
        self.block(&class.members, None, None, Layout::Members);
    }

    fn method(&mut self, method: &ClassMethod) {
        self.modifiers(&method.modifiers);
        self.out.push_str("function ");
        if method.by_ref {
            self.out.push('&');
        }
        self.out.push_str(&method.name);
        self.params(&method.params);
        if let Some(return_type) = &method.return_type {
            self.out.push_str(": ");
            self.out.push_str(return_type);
        }
        match &method.body {
            Some(stmts) => {
                self.newline();
                self.out.push('{');
                self.block(stmts, None, None, Layout::Body);
            }
            None => self.out.push(';'),
        }
    }

    fn params(&mut self, params: &[Param]) {
        self.out.push('(');
        for (i, param) in params.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            if let Some(type_hint) = &param.type_hint {
                self.out.push_str(type_hint);
                self.out.push(' ');
            }
            if param.by_ref {
                self.out.push('&');
            }
            if param.variadic {
                self.out.push_str("...");
            }
            self.out.push('$');
            self.out.push_str(&param.name);
            if let Some(default) = &param.default {
                self.out.push_str(" = ");
                self.expr(default);
            }
        }
        self.out.push(')');
    }

    fn args(&mut self, args: &[Arg]) {
        self.out.push('(');
        for (i, arg) in args.iter().enumerate() {
            if i > 0 {
                self.out.push_str(", ");
            }
            if let Some(name) = &arg.name {
                self.out.push_str(name);
                self.out.push_str(": ");
            }
            if arg.unpack {
                self.out.push_str("...");
            }
            self.expr(&arg.value);
        }
        self.out.push(')');
    }

    fn expr(&mut self, expr: &Expr) {
        self.expr_prec(expr, 0);
    }

    fn expr_prec(&mut self, expr: &Expr, min: u8) {
        let parens = precedence(expr) < min;
        if parens {
            self.out.push('(');
        }
        self.expr_inner(expr);
        if parens {
            self.out.push(')');
        }
    }

    fn expr_inner(&mut self, expr: &Expr) {
        match expr {
            Expr::Int(n) => self.out.push_str(&n.to_string()),
            Expr::Float(f) => self.out.push_str(&format_float(*f)),
            Expr::String(s) => {
                self.out.push('\'');
                self.out.push_str(&escape_single_quoted(s));
                self.out.push('\'');
            }
            Expr::InterpolatedString(raw) => {
                self.out.push('"');
                self.out.push_str(raw);
                self.out.push('"');
            }
            Expr::ConstFetch(name) => self.out.push_str(&name.0),
            Expr::Variable(name) => {
                self.out.push('$');
                self.out.push_str(name);
            }
            Expr::Array { items, long_syntax } => self.array(items, *long_syntax),
            Expr::New { class, args } => {
                self.out.push_str("new ");
                self.out.push_str(&class.0);
                self.args(args);
            }
            Expr::FuncCall { name, args } => {
                self.out.push_str(&name.0);
                self.args(args);
            }
            Expr::MethodCall {
                target,
                name,
                args,
                nullsafe,
            } => {
                self.expr_prec(target, PREC_POSTFIX);
                self.out.push_str(if *nullsafe { "?->" } else { "->" });
                self.out.push_str(name);
                self.args(args);
            }
            Expr::PropertyFetch {
                target,
                name,
                nullsafe,
            } => {
                self.expr_prec(target, PREC_POSTFIX);
                self.out.push_str(if *nullsafe { "?->" } else { "->" });
                self.out.push_str(name);
            }
            Expr::StaticCall { class, name, args } => {
                self.out.push_str(&format!("{class}::{name}"));
                self.args(args);
            }
            Expr::StaticPropertyFetch { class, name } => {
                self.out.push_str(&format!("{class}::${name}"));
            }
            Expr::ClassConstFetch { class, name } => {
                self.out.push_str(&format!("{class}::{name}"));
            }
            Expr::ArrayDimFetch { target, dim } => {
                self.expr_prec(target, PREC_POSTFIX);
                self.out.push('[');
                if let Some(dim) = dim {
                    self.expr(dim);
                }
                self.out.push(']');
            }
            Expr::Assign { target, value } => {
                self.expr_prec(target, PREC_POSTFIX);
                self.out.push_str(" = ");
                self.expr_prec(value, PREC_ASSIGN);
            }
            Expr::BinaryOp { op, left, right } => {
                let prec = op.precedence();
                let (left_min, right_min) = if op.is_right_assoc() {
                    (prec + 1, prec)
                } else {
                    (prec, prec + 1)
                };
                self.expr_prec(left, left_min);
                self.out.push(' ');
                self.out.push_str(op.symbol());
                self.out.push(' ');
                self.expr_prec(right, right_min);
            }
            Expr::UnaryOp { op, operand } => {
                self.out.push_str(op.symbol());
                self.expr_prec(operand, PREC_UNARY);
            }
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                self.expr_prec(cond, PREC_TERNARY + 1);
                match then {
                    Some(then) => {
                        self.out.push_str(" ? ");
                        self.expr_prec(then, PREC_TERNARY + 1);
                        self.out.push_str(" : ");
                    }
                    None => self.out.push_str(" ?: "),
                }
                self.expr_prec(otherwise, PREC_TERNARY + 1);
            }
            Expr::Closure {
                is_static,
                params,
                uses,
                return_type,
                body,
            } => {
                if *is_static {
                    self.out.push_str("static ");
                }
                self.out.push_str("function ");
                self.params(params);
                if !uses.is_empty() {
                    let uses = uses
                        .iter()
                        .map(|u| format!("{}${}", if u.by_ref { "&" } else { "" }, u.name))
                        .collect::<Vec<_>>();
                    self.out.push_str(&format!(" use ({})", uses.join(", ")));
                }
                if let Some(return_type) = return_type {
                    self.out.push_str(": ");
                    self.out.push_str(return_type);
                }
                self.out.push_str(" {");
                self.block(body, None, None, Layout::Body);
            }
            Expr::ArrowFunction {
                is_static,
                params,
                return_type,
                body,
            } => {
                if *is_static {
                    self.out.push_str("static ");
                }
                self.out.push_str("fn ");
                self.params(params);
                if let Some(return_type) = return_type {
                    self.out.push_str(": ");
                    self.out.push_str(return_type);
                }
                self.out.push_str(" => ");
                self.expr_prec(body, PREC_ASSIGN);
            }
        }
    }

    fn array(&mut self, items: &[ArrayItem], long_syntax: bool) {
        let (open, close) = if long_syntax { ("array(", ')') } else { ("[", ']') };
        self.out.push_str(open);
        let inline = items
            .iter()
            .all(|item| item.key.is_none() && is_simple(&item.value));
        if inline {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    self.out.push_str(", ");
                }
                self.array_item(item);
            }
        } else {
            self.depth += 1;
            for item in items {
                self.newline();
                self.array_item(item);
                self.out.push(',');
            }
            self.depth -= 1;
            self.newline();
        }
        self.out.push(close);
    }

    fn array_item(&mut self, item: &ArrayItem) {
        if let Some(key) = &item.key {
            self.expr(key);
            self.out.push_str(" => ");
        }
        if item.by_ref {
            self.out.push('&');
        }
        if item.unpack {
            self.out.push_str("...");
        }
        self.expr(&item.value);
    }
}
