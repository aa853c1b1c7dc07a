// Syntax tree for the PHP subset found in generated dependency-provider classes.
// Parsed by `crate::parser::PhpParser`, printed back by `source_gen::PhpPrinter`.

pub mod source_gen;
pub mod walk;
pub use source_gen::{PhpPrinter, Printer, ToSource};
pub use walk::{find_first_expr, visit_stmts_mut, Child, ChildMut};

#[cfg(test)]
mod source_gen_tests;

use std::fmt;

/// Byte offsets of a node inside the source text it was parsed from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    /// Offset just past the opener of the node's body: the `{` of a class or
    /// method, the `;` of a `namespace X;` header.
    pub body: Option<usize>,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start,
            end,
            body: None,
        }
    }

    pub fn with_body(mut self, body: usize) -> Self {
        self.body = Some(body);
        self
    }
}

/// Identity of a statement-level node, unique within one tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn new(id: u32) -> Self {
        NodeId(id)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({})", self.0)
    }
}

/// Allocator for node ids. Owned by the tree the ids belong to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdGenerator {
    next_id: u32,
}

impl NodeIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(1)
    }

    pub fn starting_at(next_id: u32) -> Self {
        Self { next_id }
    }

    pub fn next(&mut self) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn peek(&self) -> u32 {
        self.next_id
    }
}

impl Default for NodeIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// A (possibly qualified) name: `Foo`, `Foo\Bar`, `\Foo\Bar`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Name(pub String);

impl Name {
    pub fn new(name: impl Into<String>) -> Self {
        Name(name.into())
    }

    pub fn is_fully_qualified(&self) -> bool {
        self.0.starts_with('\\')
    }

    /// Name without a leading namespace separator.
    pub fn trimmed(&self) -> &str {
        self.0.trim_start_matches('\\')
    }

    pub fn first_segment(&self) -> &str {
        self.trimmed().split('\\').next().unwrap_or_default()
    }

    pub fn last_segment(&self) -> &str {
        self.trimmed().rsplit('\\').next().unwrap_or_default()
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visibility {
    Public,
    Protected,
    Private,
}

impl Visibility {
    pub fn as_str(self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Protected => "protected",
            Visibility::Private => "private",
        }
    }
}

/// Member and class modifiers, in the canonical PHP order when printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub visibility: Option<Visibility>,
    pub is_abstract: bool,
    pub is_final: bool,
    pub is_static: bool,
    pub is_readonly: bool,
}

impl Modifiers {
    pub fn public() -> Self {
        Self {
            visibility: Some(Visibility::Public),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Stmt {
    pub id: NodeId,
    pub span: Option<Span>,
    /// Set on containers whose own text went stale because a descendant was
    /// rewritten. The span of a dirty node still locates its surroundings.
    pub dirty: bool,
    /// Comments directly preceding the statement, verbatim.
    pub comments: Vec<String>,
    pub kind: StmtKind,
}

impl Stmt {
    pub fn new(id: NodeId, kind: StmtKind) -> Self {
        Self {
            id,
            span: None,
            dirty: false,
            comments: Vec::new(),
            kind,
        }
    }

    pub fn as_method(&self) -> Option<&ClassMethod> {
        match &self.kind {
            StmtKind::ClassMethod(method) => Some(method),
            _ => None,
        }
    }

    pub fn as_class(&self) -> Option<&ClassDecl> {
        match &self.kind {
            StmtKind::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn is_method_named(&self, name: &str) -> bool {
        self.as_method()
            .is_some_and(|method| method.name.eq_ignore_ascii_case(name))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StmtKind {
    /// declare(strict_types=1);
    Declare(Vec<(String, Expr)>),
    /// namespace Foo\Bar; followed by the statements it scopes
    Namespace { name: Name, stmts: Vec<Stmt> },
    Use(Vec<UseItem>),
    Class(ClassDecl),
    TraitUse(Vec<Name>),
    ClassConst {
        modifiers: Modifiers,
        consts: Vec<(String, Expr)>,
    },
    Property {
        modifiers: Modifiers,
        type_hint: Option<String>,
        props: Vec<(String, Option<Expr>)>,
    },
    ClassMethod(ClassMethod),
    Return(Option<Expr>),
    Expression(Expr),
    If {
        cond: Expr,
        then: Vec<Stmt>,
        else_ifs: Vec<(Expr, Vec<Stmt>)>,
        otherwise: Option<Vec<Stmt>>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct UseItem {
    pub name: Name,
    pub alias: Option<String>,
}

impl UseItem {
    /// Name under which the import is visible in the file.
    pub fn local_name(&self) -> &str {
        self.alias
            .as_deref()
            .unwrap_or_else(|| self.name.last_segment())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassDecl {
    pub modifiers: Modifiers,
    pub name: String,
    pub extends: Option<Name>,
    pub implements: Vec<Name>,
    pub members: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassMethod {
    pub modifiers: Modifiers,
    pub by_ref: bool,
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Option<String>,
    /// None for abstract methods.
    pub body: Option<Vec<Stmt>>,
}

impl ClassMethod {
    pub fn stmts(&self) -> &[Stmt] {
        self.body.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub type_hint: Option<String>,
    pub by_ref: bool,
    pub variadic: bool,
    pub name: String,
    pub default: Option<Expr>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Arg {
    pub name: Option<String>,
    pub unpack: bool,
    pub value: Expr,
}

impl Arg {
    pub fn positional(value: Expr) -> Self {
        Self {
            name: None,
            unpack: false,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayItem {
    pub key: Option<Expr>,
    pub value: Expr,
    pub by_ref: bool,
    pub unpack: bool,
}

impl ArrayItem {
    pub fn value(value: Expr) -> Self {
        Self {
            key: None,
            value,
            by_ref: false,
            unpack: false,
        }
    }

    pub fn keyed(key: Expr, value: Expr) -> Self {
        Self {
            key: Some(key),
            ..Self::value(value)
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosureUse {
    pub by_ref: bool,
    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Coalesce,
    BoolOr,
    BoolAnd,
    Identical,
    NotIdentical,
    Equal,
    NotEqual,
    Smaller,
    SmallerOrEqual,
    Greater,
    GreaterOrEqual,
    Concat,
    Plus,
    Minus,
    Mul,
    Div,
    Mod,
}

impl BinaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Coalesce => "??",
            BinaryOp::BoolOr => "||",
            BinaryOp::BoolAnd => "&&",
            BinaryOp::Identical => "===",
            BinaryOp::NotIdentical => "!==",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
            BinaryOp::Smaller => "<",
            BinaryOp::SmallerOrEqual => "<=",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterOrEqual => ">=",
            BinaryOp::Concat => ".",
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
        }
    }

    /// Binding strength; higher binds tighter.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOp::Coalesce => 3,
            BinaryOp::BoolOr => 4,
            BinaryOp::BoolAnd => 5,
            BinaryOp::Identical
            | BinaryOp::NotIdentical
            | BinaryOp::Equal
            | BinaryOp::NotEqual => 6,
            BinaryOp::Smaller
            | BinaryOp::SmallerOrEqual
            | BinaryOp::Greater
            | BinaryOp::GreaterOrEqual => 7,
            BinaryOp::Concat => 8,
            BinaryOp::Plus | BinaryOp::Minus => 9,
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod => 10,
        }
    }

    pub fn is_right_assoc(self) -> bool {
        matches!(self, BinaryOp::Coalesce)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Minus,
    Plus,
}

impl UnaryOp {
    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Minus => "-",
            UnaryOp::Plus => "+",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    // Literals
    Int(i64),
    Float(f64),
    /// Single-quoted semantics; the value is unescaped.
    String(String),
    /// Raw contents of a double-quoted string, kept as written.
    InterpolatedString(String),
    /// Constants, including `true`, `false` and `null`.
    ConstFetch(Name),
    Array {
        items: Vec<ArrayItem>,
        long_syntax: bool,
    },

    Variable(String),

    // Calls and access
    New {
        class: Name,
        args: Vec<Arg>,
    },
    FuncCall {
        name: Name,
        args: Vec<Arg>,
    },
    MethodCall {
        target: Box<Expr>,
        name: String,
        args: Vec<Arg>,
        nullsafe: bool,
    },
    PropertyFetch {
        target: Box<Expr>,
        name: String,
        nullsafe: bool,
    },
    StaticCall {
        class: Name,
        name: String,
        args: Vec<Arg>,
    },
    StaticPropertyFetch {
        class: Name,
        name: String,
    },
    /// `Foo::BAR` and `Foo::class`
    ClassConstFetch {
        class: Name,
        name: String,
    },
    ArrayDimFetch {
        target: Box<Expr>,
        dim: Option<Box<Expr>>,
    },

    // Operators
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    UnaryOp {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Ternary {
        cond: Box<Expr>,
        then: Option<Box<Expr>>,
        otherwise: Box<Expr>,
    },

    // Functions
    Closure {
        is_static: bool,
        params: Vec<Param>,
        uses: Vec<ClosureUse>,
        return_type: Option<String>,
        body: Vec<Stmt>,
    },
    ArrowFunction {
        is_static: bool,
        params: Vec<Param>,
        return_type: Option<String>,
        body: Box<Expr>,
    },
}

impl Expr {
    pub fn null() -> Self {
        Expr::ConstFetch(Name::new("null"))
    }

    pub fn bool(value: bool) -> Self {
        Expr::ConstFetch(Name::new(if value { "true" } else { "false" }))
    }

    pub fn empty_array() -> Self {
        Expr::Array {
            items: Vec::new(),
            long_syntax: false,
        }
    }

    pub fn is_array_literal(&self) -> bool {
        matches!(self, Expr::Array { .. })
    }
}

/// One parsed source file: the statement list plus the text it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxTree {
    pub stmts: Vec<Stmt>,
    /// Original text; spans index into it.
    pub source: Option<String>,
    pub ids: NodeIdGenerator,
}

impl SyntaxTree {
    pub fn new(stmts: Vec<Stmt>, source: Option<String>, ids: NodeIdGenerator) -> Self {
        Self {
            stmts,
            source,
            ids,
        }
    }

    /// Tree built in memory, without source text.
    pub fn detached(stmts: Vec<Stmt>, ids: NodeIdGenerator) -> Self {
        Self::new(stmts, None, ids)
    }
}
