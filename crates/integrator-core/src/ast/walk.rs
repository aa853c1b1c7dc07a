// Generic traversal over statements and expressions.
//
// Children are listed in source order, so walks are depth-first preorder the
// same way a printed file reads.

use super::*;

/// A direct child of a node: an expression or a nested statement list.
#[derive(Debug, Clone, Copy)]
pub enum Child<'a> {
    Expr(&'a Expr),
    Block(&'a [Stmt]),
}

/// Mutable counterpart of [`Child`].
#[derive(Debug)]
pub enum ChildMut<'a> {
    Expr(&'a mut Expr),
    Block(&'a mut Vec<Stmt>),
}

fn param_defaults(params: &[Param]) -> impl Iterator<Item = Child<'_>> {
    params.iter().filter_map(|param| param.default.as_ref().map(Child::Expr))
}

fn param_defaults_mut(params: &mut [Param]) -> impl Iterator<Item = ChildMut<'_>> {
    params
        .iter_mut()
        .filter_map(|param| param.default.as_mut().map(ChildMut::Expr))
}

impl Stmt {
    pub fn children(&self) -> Vec<Child<'_>> {
        let mut children = Vec::new();
        match &self.kind {
            StmtKind::Declare(directives) => {
                children.extend(directives.iter().map(|(_, value)| Child::Expr(value)));
            }
            StmtKind::Namespace { stmts, .. } => children.push(Child::Block(stmts)),
            StmtKind::Use(_) | StmtKind::TraitUse(_) => {}
            StmtKind::Class(class) => children.push(Child::Block(&class.members)),
            StmtKind::ClassConst { consts, .. } => {
                children.extend(consts.iter().map(|(_, value)| Child::Expr(value)));
            }
            StmtKind::Property { props, .. } => {
                children.extend(props.iter().filter_map(|(_, value)| value.as_ref().map(Child::Expr)));
            }
            StmtKind::ClassMethod(method) => {
                children.extend(param_defaults(&method.params));
                if let Some(body) = &method.body {
                    children.push(Child::Block(body));
                }
            }
            StmtKind::Return(value) => children.extend(value.as_ref().map(Child::Expr)),
            StmtKind::Expression(expr) => children.push(Child::Expr(expr)),
            StmtKind::If {
                cond,
                then,
                else_ifs,
                otherwise,
            } => {
                children.push(Child::Expr(cond));
                children.push(Child::Block(then));
                for (cond, stmts) in else_ifs {
                    children.push(Child::Expr(cond));
                    children.push(Child::Block(stmts));
                }
                children.extend(otherwise.as_deref().map(Child::Block));
            }
        }
        children
    }

    pub fn children_mut(&mut self) -> Vec<ChildMut<'_>> {
        let mut children = Vec::new();
        match &mut self.kind {
            StmtKind::Declare(directives) => {
                children.extend(directives.iter_mut().map(|(_, value)| ChildMut::Expr(value)));
            }
            StmtKind::Namespace { stmts, .. } => children.push(ChildMut::Block(stmts)),
            StmtKind::Use(_) | StmtKind::TraitUse(_) => {}
            StmtKind::Class(class) => children.push(ChildMut::Block(&mut class.members)),
            StmtKind::ClassConst { consts, .. } => {
                children.extend(consts.iter_mut().map(|(_, value)| ChildMut::Expr(value)));
            }
            StmtKind::Property { props, .. } => {
                children.extend(
                    props
                        .iter_mut()
                        .filter_map(|(_, value)| value.as_mut().map(ChildMut::Expr)),
                );
            }
            StmtKind::ClassMethod(method) => {
                children.extend(param_defaults_mut(&mut method.params));
                if let Some(body) = &mut method.body {
                    children.push(ChildMut::Block(body));
                }
            }
            StmtKind::Return(value) => children.extend(value.as_mut().map(ChildMut::Expr)),
            StmtKind::Expression(expr) => children.push(ChildMut::Expr(expr)),
            StmtKind::If {
                cond,
                then,
                else_ifs,
                otherwise,
            } => {
                children.push(ChildMut::Expr(cond));
                children.push(ChildMut::Block(then));
                for (cond, stmts) in else_ifs {
                    children.push(ChildMut::Expr(cond));
                    children.push(ChildMut::Block(stmts));
                }
                children.extend(otherwise.as_mut().map(ChildMut::Block));
            }
        }
        children
    }
}

impl Expr {
    pub fn children(&self) -> Vec<Child<'_>> {
        let mut children = Vec::new();
        match self {
            Expr::Int(_)
            | Expr::Float(_)
            | Expr::String(_)
            | Expr::InterpolatedString(_)
            | Expr::ConstFetch(_)
            | Expr::Variable(_)
            | Expr::StaticPropertyFetch { .. }
            | Expr::ClassConstFetch { .. } => {}
            Expr::Array { items, .. } => {
                for item in items {
                    children.extend(item.key.as_ref().map(Child::Expr));
                    children.push(Child::Expr(&item.value));
                }
            }
            Expr::New { args, .. } | Expr::FuncCall { args, .. } | Expr::StaticCall { args, .. } => {
                children.extend(args.iter().map(|arg| Child::Expr(&arg.value)));
            }
            Expr::MethodCall { target, args, .. } => {
                children.push(Child::Expr(target));
                children.extend(args.iter().map(|arg| Child::Expr(&arg.value)));
            }
            Expr::PropertyFetch { target, .. } => children.push(Child::Expr(target)),
            Expr::ArrayDimFetch { target, dim } => {
                children.push(Child::Expr(target));
                children.extend(dim.as_deref().map(Child::Expr));
            }
            Expr::Assign { target, value } => {
                children.push(Child::Expr(target));
                children.push(Child::Expr(value));
            }
            Expr::BinaryOp { left, right, .. } => {
                children.push(Child::Expr(left));
                children.push(Child::Expr(right));
            }
            Expr::UnaryOp { operand, .. } => children.push(Child::Expr(operand)),
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                children.push(Child::Expr(cond));
                children.extend(then.as_deref().map(Child::Expr));
                children.push(Child::Expr(otherwise));
            }
            Expr::Closure { params, body, .. } => {
                children.extend(param_defaults(params));
                children.push(Child::Block(body));
            }
            Expr::ArrowFunction { params, body, .. } => {
                children.extend(param_defaults(params));
                children.push(Child::Expr(body));
            }
        }
        children
    }

    pub fn children_mut(&mut self) -> Vec<ChildMut<'_>> {
        let mut children = Vec::new();
        match self {
            Expr::Int(_)
            | Expr::Float(_)
            | Expr::String(_)
            | Expr::InterpolatedString(_)
            | Expr::ConstFetch(_)
            | Expr::Variable(_)
            | Expr::StaticPropertyFetch { .. }
            | Expr::ClassConstFetch { .. } => {}
            Expr::Array { items, .. } => {
                for item in items {
                    children.extend(item.key.as_mut().map(ChildMut::Expr));
                    children.push(ChildMut::Expr(&mut item.value));
                }
            }
            Expr::New { args, .. } | Expr::FuncCall { args, .. } | Expr::StaticCall { args, .. } => {
                children.extend(args.iter_mut().map(|arg| ChildMut::Expr(&mut arg.value)));
            }
            Expr::MethodCall { target, args, .. } => {
                children.push(ChildMut::Expr(target));
                children.extend(args.iter_mut().map(|arg| ChildMut::Expr(&mut arg.value)));
            }
            Expr::PropertyFetch { target, .. } => children.push(ChildMut::Expr(target)),
            Expr::ArrayDimFetch { target, dim } => {
                children.push(ChildMut::Expr(target));
                children.extend(dim.as_deref_mut().map(ChildMut::Expr));
            }
            Expr::Assign { target, value } => {
                children.push(ChildMut::Expr(target));
                children.push(ChildMut::Expr(value));
            }
            Expr::BinaryOp { left, right, .. } => {
                children.push(ChildMut::Expr(left));
                children.push(ChildMut::Expr(right));
            }
            Expr::UnaryOp { operand, .. } => children.push(ChildMut::Expr(operand)),
            Expr::Ternary {
                cond,
                then,
                otherwise,
            } => {
                children.push(ChildMut::Expr(cond));
                children.extend(then.as_deref_mut().map(ChildMut::Expr));
                children.push(ChildMut::Expr(otherwise));
            }
            Expr::Closure { params, body, .. } => {
                children.extend(param_defaults_mut(params));
                children.push(ChildMut::Block(body));
            }
            Expr::ArrowFunction { params, body, .. } => {
                children.extend(param_defaults_mut(params));
                children.push(ChildMut::Expr(body));
            }
        }
        children
    }
}

/// First expression below `stmts`, in depth-first preorder, accepted by
/// `accept`. Closure bodies are searched too.
pub fn find_first_expr<'a, F>(stmts: &'a [Stmt], accept: &mut F) -> Option<&'a Expr>
where
    F: FnMut(&Expr) -> bool,
{
    stmts.iter().find_map(|stmt| find_in_children(stmt.children(), accept))
}

fn find_in_children<'a, F>(children: Vec<Child<'a>>, accept: &mut F) -> Option<&'a Expr>
where
    F: FnMut(&Expr) -> bool,
{
    children.into_iter().find_map(|child| match child {
        Child::Expr(expr) => find_in_expr(expr, accept),
        Child::Block(stmts) => find_first_expr(stmts, accept),
    })
}

fn find_in_expr<'a, F>(expr: &'a Expr, accept: &mut F) -> Option<&'a Expr>
where
    F: FnMut(&Expr) -> bool,
{
    if accept(expr) {
        return Some(expr);
    }
    find_in_children(expr.children(), accept)
}

/// Calls `visit` on every statement below `stmts`, parents before children,
/// including statements inside closures.
pub fn visit_stmts_mut<F>(stmts: &mut [Stmt], visit: &mut F)
where
    F: FnMut(&mut Stmt),
{
    for stmt in stmts {
        visit(stmt);
        for child in stmt.children_mut() {
            visit_child_mut(child, visit);
        }
    }
}

fn visit_child_mut<F>(child: ChildMut<'_>, visit: &mut F)
where
    F: FnMut(&mut Stmt),
{
    match child {
        ChildMut::Block(stmts) => visit_stmts_mut(stmts, visit),
        ChildMut::Expr(expr) => {
            for child in expr.children_mut() {
                visit_child_mut(child, visit);
            }
        }
    }
}
