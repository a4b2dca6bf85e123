//! Resolution: annotating parsed trees with types and symbols.
//!
//! The resolver is the stand-in for a host compiler's attribution phase.
//! It works against a declared environment (`Globals`): imported classes,
//! pre-declared variables (method parameters), and method signatures.
//! Local variables get fresh `LocalId`s; identifiers and member selects
//! get a `Resolution`; every expression gets a type.
//!
//! Resolution is lenient: errors are collected and the affected nodes keep
//! `Ty::Error`, so a partially resolvable unit can still be matched where
//! its types are known.

use rustc_hash::FxHashMap;
use tailor_types::{Prim, Ty, TypeVarDecl, Types};

use crate::ast::{
    BinaryOp, Block, Expr, ExprKind, Ident, LocalId, Resolution, Stmt, StmtKind, TyRef,
    TySyntax, UnaryOp,
};
use crate::error::{ResolveError, ResolveErrorKind};
use crate::span::Span;

/// A method (or constructor) signature.
#[derive(Clone, Debug, PartialEq)]
pub struct MethodSig {
    pub type_params: Vec<TypeVarDecl>,
    pub params: Vec<Ty>,
    pub varargs: bool,
    pub ret: Ty,
}

impl MethodSig {
    pub fn simple(params: Vec<Ty>, ret: Ty) -> Self {
        MethodSig { type_params: Vec::new(), params, varargs: false, ret }
    }

    pub fn generic(type_params: Vec<TypeVarDecl>, params: Vec<Ty>, ret: Ty) -> Self {
        MethodSig { type_params, params, varargs: false, ret }
    }

    pub fn with_varargs(mut self) -> Self {
        self.varargs = true;
        self
    }
}

/// The declared environment a unit is resolved against: imported classes,
/// pre-declared variables, and member signatures.
#[derive(Clone, Debug, Default)]
pub struct Globals {
    classes: FxHashMap<String, String>,
    imports: Vec<String>,
    statics: FxHashMap<(String, String), MethodSig>,
    static_fields: FxHashMap<(String, String), Ty>,
    methods: FxHashMap<(String, String), MethodSig>,
    vars: Vec<(String, Ty)>,
}

impl Globals {
    pub fn new() -> Self {
        let mut globals = Globals::default();
        // java.lang is visible without an explicit import.
        for name in [
            "java.lang.Object",
            "java.lang.String",
            "java.lang.CharSequence",
            "java.lang.Number",
            "java.lang.Integer",
            "java.lang.Long",
            "java.lang.Double",
            "java.lang.Boolean",
            "java.lang.Character",
            "java.lang.System",
            "java.lang.Math",
        ] {
            let simple = name.rsplit('.').next().unwrap_or(name).to_owned();
            globals.classes.insert(simple, name.to_owned());
            globals.classes.insert(name.to_owned(), name.to_owned());
        }
        globals
    }

    /// Import a class: its simple name becomes visible, and the import is
    /// recorded for the import policy.
    pub fn import_class(&mut self, fq: &str) {
        let simple = fq.rsplit('.').next().unwrap_or(fq).to_owned();
        self.classes.insert(simple, fq.to_owned());
        self.classes.insert(fq.to_owned(), fq.to_owned());
        self.imports.push(fq.to_owned());
    }

    /// Pre-declare a variable (a method parameter of the unit).
    pub fn declare_var(&mut self, name: impl Into<String>, ty: Ty) {
        self.vars.push((name.into(), ty));
    }

    pub fn add_static(&mut self, class: &str, name: &str, sig: MethodSig) {
        self.statics.insert((class.to_owned(), name.to_owned()), sig);
    }

    pub fn add_static_field(&mut self, class: &str, name: &str, ty: Ty) {
        self.static_fields.insert((class.to_owned(), name.to_owned()), ty);
    }

    pub fn add_method(&mut self, class: &str, name: &str, sig: MethodSig) {
        self.methods.insert((class.to_owned(), name.to_owned()), sig);
    }

    /// The explicit imports, in declaration order.
    pub fn imports(&self) -> &[String] {
        &self.imports
    }

    fn class_fq(&self, name: &str) -> Option<&str> {
        self.classes.get(name).map(String::as_str)
    }
}

/// Resolve a block in place. Returns every resolution error found.
pub fn resolve_block(block: &mut Block, types: &Types, globals: &Globals) -> Vec<ResolveError> {
    let mut resolver = Resolver {
        types,
        globals,
        scopes: vec![FxHashMap::default()],
        next_local: 0,
        errors: Vec::new(),
    };
    for (name, ty) in &globals.vars {
        resolver.declare(name.clone(), ty.clone());
    }
    resolver.block_stmts(block);
    resolver.errors
}

struct Resolver<'a> {
    types: &'a Types,
    globals: &'a Globals,
    scopes: Vec<FxHashMap<String, (LocalId, Ty)>>,
    next_local: u32,
    errors: Vec<ResolveError>,
}

impl<'a> Resolver<'a> {
    fn error(&mut self, kind: ResolveErrorKind, span: Span) {
        self.errors.push(ResolveError::new(kind, span));
    }

    fn declare(&mut self, name: String, ty: Ty) -> LocalId {
        let id = LocalId(self.next_local);
        self.next_local += 1;
        self.scopes.last_mut().expect("scope stack is never empty").insert(name, (id, ty));
        id
    }

    fn lookup(&self, name: &str) -> Option<(LocalId, Ty)> {
        self.scopes.iter().rev().find_map(|scope| scope.get(name).cloned())
    }

    // ── Statements ─────────────────────────────────────────────────────

    fn block_stmts(&mut self, block: &mut Block) {
        self.scopes.push(FxHashMap::default());
        for stmt in &mut block.stmts {
            self.stmt(stmt);
        }
        self.scopes.pop();
    }

    fn stmt(&mut self, s: &mut Stmt) {
        match &mut s.kind {
            StmtKind::Expr(e) => self.expr(e),
            StmtKind::VarDecl(decl) => {
                self.ty_ref(&mut decl.ty);
                if let Some(init) = &mut decl.init {
                    self.expr(init);
                }
                decl.sym = self.declare(decl.name.clone(), decl.ty.ty.clone());
            }
            StmtKind::Block(b) => self.block_stmts(b),
            StmtKind::If { cond, then_stmt, else_stmt } => {
                self.expr(cond);
                self.stmt(then_stmt);
                if let Some(e) = else_stmt {
                    self.stmt(e);
                }
            }
            StmtKind::While { cond, body } => {
                self.expr(cond);
                self.stmt(body);
            }
            StmtKind::DoWhile { body, cond } => {
                self.stmt(body);
                self.expr(cond);
            }
            StmtKind::For { init, cond, update, body } => {
                self.scopes.push(FxHashMap::default());
                for s in init {
                    self.stmt(s);
                }
                if let Some(c) = cond {
                    self.expr(c);
                }
                for u in update {
                    self.expr(u);
                }
                self.stmt(body);
                self.scopes.pop();
            }
            StmtKind::Try { body, catches, finally } => {
                self.block_stmts(body);
                for c in catches {
                    self.scopes.push(FxHashMap::default());
                    self.ty_ref(&mut c.param.ty);
                    c.param.sym = self.declare(c.param.name.clone(), c.param.ty.ty.clone());
                    for stmt in &mut c.body.stmts {
                        self.stmt(stmt);
                    }
                    self.scopes.pop();
                }
                if let Some(f) = finally {
                    self.block_stmts(f);
                }
            }
            StmtKind::Labeled { stmt, .. } => self.stmt(stmt),
            StmtKind::Break { .. } | StmtKind::Continue { .. } => {}
            StmtKind::Return(value) => {
                if let Some(e) = value {
                    self.expr(e);
                }
            }
            StmtKind::Throw(e) => self.expr(e),
        }
    }

    // ── Types ──────────────────────────────────────────────────────────

    fn ty_ref(&mut self, ty_ref: &mut TyRef) {
        if let Some(syntax) = ty_ref.syntax.clone() {
            ty_ref.ty = self.ty_from_syntax(&syntax, ty_ref.span);
        }
    }

    fn ty_from_syntax(&mut self, syntax: &TySyntax, span: Span) -> Ty {
        let mut base = if let Some(prim) = syntax.prim {
            Ty::Prim(prim)
        } else {
            let known = self
                .globals
                .class_fq(&syntax.name)
                .map(str::to_owned)
                .or_else(|| self.types.has_class(&syntax.name).then(|| syntax.name.clone()));
            match known {
                Some(fq) => {
                    let args = syntax
                        .args
                        .iter()
                        .map(|a| self.ty_from_syntax(a, span))
                        .collect::<Vec<_>>();
                    Ty::generic(fq, args)
                }
                None => {
                    self.error(ResolveErrorKind::UnknownType(syntax.name.clone()), span);
                    Ty::Error
                }
            }
        };
        for _ in 0..syntax.array_dims {
            base = Ty::array(base);
        }
        base
    }

    // ── Expressions ────────────────────────────────────────────────────

    fn expr(&mut self, e: &mut Expr) {
        match &mut e.kind {
            ExprKind::Lit(lit) => e.ty = lit.ty(),
            ExprKind::Ident(_) => self.ident(e),
            ExprKind::Select { .. } => self.select(e),
            ExprKind::Call { .. } => self.call(e),
            ExprKind::Unary { op, operand } => {
                self.expr(operand);
                e.ty = match op {
                    UnaryOp::Not => Ty::boolean(),
                    UnaryOp::Neg => promote_unary(&operand.ty),
                    _ => operand.ty.clone(),
                };
            }
            ExprKind::Binary { op, lhs, rhs } => {
                self.expr(lhs);
                self.expr(rhs);
                e.ty = binary_ty(*op, &lhs.ty, &rhs.ty);
            }
            ExprKind::Assign { lhs, rhs } => {
                self.expr(lhs);
                self.expr(rhs);
                e.ty = lhs.ty.clone();
            }
            ExprKind::CompoundAssign { lhs, rhs, .. } => {
                self.expr(lhs);
                self.expr(rhs);
                e.ty = lhs.ty.clone();
            }
            ExprKind::Conditional { cond, then_expr, else_expr } => {
                self.expr(cond);
                self.expr(then_expr);
                self.expr(else_expr);
                e.ty = if then_expr.ty == else_expr.ty {
                    then_expr.ty.clone()
                } else if then_expr.ty == Ty::Null {
                    else_expr.ty.clone()
                } else if else_expr.ty == Ty::Null {
                    then_expr.ty.clone()
                } else {
                    self.types.lub(&[then_expr.ty.clone(), else_expr.ty.clone()])
                };
            }
            ExprKind::Paren(inner) => {
                self.expr(inner);
                e.ty = inner.ty.clone();
            }
            ExprKind::Cast { ty, expr } => {
                self.ty_ref(ty);
                self.expr(expr);
                e.ty = ty.ty.clone();
            }
            ExprKind::InstanceOf { expr, ty } => {
                self.expr(expr);
                self.ty_ref(ty);
                e.ty = Ty::boolean();
            }
            ExprKind::ArrayAccess { array, index } => {
                self.expr(array);
                self.expr(index);
                e.ty = match &array.ty {
                    Ty::Array(elem) => (**elem).clone(),
                    _ => Ty::Error,
                };
            }
            ExprKind::NewClass { class, args } => {
                self.ty_ref(class);
                for a in args {
                    self.expr(a);
                }
                e.ty = class.ty.clone();
            }
            ExprKind::NewArray { elem, dims, init } => {
                self.ty_ref(elem);
                for d in dims.iter_mut() {
                    self.expr(d);
                }
                if let Some(init) = init {
                    for i in init {
                        self.expr(i);
                    }
                }
                e.ty = Ty::array(elem.ty.clone());
            }
        }
    }

    fn ident(&mut self, e: &mut Expr) {
        let span = e.span;
        let ExprKind::Ident(id) = &mut e.kind else {
            return;
        };
        let class = self.globals.class_fq(&id.name).map(str::to_owned);
        if let Some((sym, ty)) = self.lookup(&id.name) {
            id.res = Resolution::Local(sym);
            e.ty = ty;
        } else if let Some(fq) = class {
            e.ty = Ty::class(&fq);
            id.res = Resolution::Class(fq);
        } else {
            let name = id.name.clone();
            self.error(ResolveErrorKind::UnknownIdentifier(name), span);
        }
    }

    fn select(&mut self, e: &mut Expr) {
        // A dotted path naming a class collapses to a class reference.
        if let Some(path) = flatten_raw_path(e) {
            if let Some(fq) = self.globals.class_fq(&path) {
                let fq = fq.to_owned();
                e.ty = Ty::class(&fq);
                e.kind = ExprKind::Ident(Ident { name: path, res: Resolution::Class(fq) });
                return;
            }
        }
        let span = e.span;
        let ExprKind::Select { base, name } = &mut e.kind else {
            return;
        };
        self.expr(base);
        let name = name.clone();
        if let Some(cls) = class_ref_fq(base) {
            let cls = cls.to_owned();
            let field_ty = self.globals.static_fields.get(&(cls.clone(), name.clone())).cloned();
            if let Some(ty) = field_ty {
                e.ty = ty;
                return;
            }
            let sig = self.globals.statics.get(&(cls.clone(), name.clone())).cloned();
            match sig {
                Some(sig) => e.ty = Ty::method(sig.params, sig.ret),
                None => self.error(ResolveErrorKind::UnknownMember { on: cls, name }, span),
            }
        } else if let Some((_, sig)) = self.find_method(&base.ty.clone(), &name) {
            e.ty = Ty::method(sig.params, sig.ret);
        } else if base.ty != Ty::Error {
            let on = base.ty.to_string();
            self.error(ResolveErrorKind::UnknownMember { on, name }, span);
        }
    }

    fn call(&mut self, e: &mut Expr) {
        let span = e.span;
        let ExprKind::Call { callee, args } = &mut e.kind else {
            return;
        };
        for a in args.iter_mut() {
            self.expr(a);
        }
        let arg_tys: Vec<Ty> = args.iter().map(|a| a.ty.clone()).collect();

        let ExprKind::Select { .. } = &callee.kind else {
            self.expr(callee);
            self.error(
                ResolveErrorKind::UnknownMember { on: "<unit>".to_owned(), name: String::new() },
                span,
            );
            return;
        };

        // Resolve the callee's base ourselves so the signature can be
        // instantiated against the actual argument types.
        let ExprKind::Select { base, name } = &mut callee.kind else {
            return;
        };
        self.expr(base);
        let name = name.clone();
        let sig = if let Some(cls) = class_ref_fq(base) {
            let cls = cls.to_owned();
            let found = self.globals.statics.get(&(cls.clone(), name.clone())).cloned();
            match found {
                Some(sig) => Some((format!("{cls}.{name}"), sig)),
                None => {
                    self.error(ResolveErrorKind::UnknownMember { on: cls, name: name.clone() }, span);
                    None
                }
            }
        } else {
            let recv = base.ty.clone();
            match self.find_method(&recv, &name) {
                Some((owner, sig)) => Some((format!("{owner}.{name}"), sig)),
                None => {
                    if recv != Ty::Error {
                        self.error(
                            ResolveErrorKind::UnknownMember { on: recv.to_string(), name: name.clone() },
                            span,
                        );
                    }
                    None
                }
            }
        };
        let Some((label, sig)) = sig else {
            return;
        };
        let (method_ty, ret) = self.apply_sig(&label, &sig, &arg_tys, span);
        callee.ty = method_ty;
        e.ty = ret;
    }

    /// Look up an instance method on the receiver type, walking the
    /// erased supertype chain and substituting the owner's type
    /// parameters by the receiver's arguments.
    fn find_method(&self, recv: &Ty, name: &str) -> Option<(String, MethodSig)> {
        let recv_class = recv.class_name()?;
        for owner in self.types.super_names(recv_class) {
            let Some(sig) = self.globals.methods.get(&(owner.clone(), name.to_owned())) else {
                continue;
            };
            let mut sig = sig.clone();
            if let (Some(params), Some(inst)) =
                (self.types.class_params(&owner), self.types.as_supertype(recv, &owner))
            {
                if params.len() == inst.args.len() && !params.is_empty() {
                    let params = params.to_vec();
                    let lookup = |n: &str| {
                        params.iter().position(|p| p == n).map(|i| inst.args[i].clone())
                    };
                    sig.params = sig.params.iter().map(|p| p.subst(&lookup)).collect();
                    sig.ret = sig.ret.subst(&lookup);
                }
            }
            return Some((owner, sig));
        }
        None
    }

    /// Check argument types against a signature and compute the call's
    /// type, instantiating generic signatures through the type service.
    fn apply_sig(&mut self, label: &str, sig: &MethodSig, args: &[Ty], span: Span) -> (Ty, Ty) {
        let mut params = sig.params.clone();
        if sig.varargs {
            if let Some(Ty::Array(elem)) = params.last().cloned() {
                let fixed = params.len() - 1;
                let passes_as_array = args.len() == params.len()
                    && matches!(args.last(), Some(Ty::Array(_)));
                if !passes_as_array && args.len() >= fixed {
                    params.truncate(fixed);
                    params.extend(std::iter::repeat((*elem).clone()).take(args.len() - fixed));
                }
            }
        }
        if params.len() != args.len() {
            self.error(ResolveErrorKind::ArgumentMismatch { name: label.to_owned() }, span);
            return (Ty::Error, Ty::Error);
        }
        // Box primitive arguments passed where a reference is expected.
        let actuals: Vec<Ty> = params
            .iter()
            .zip(args)
            .map(|(p, a)| if !matches!(p, Ty::Prim(_)) { a.boxed() } else { a.clone() })
            .collect();
        if sig.type_params.is_empty() {
            for (p, a) in params.iter().zip(&actuals) {
                let ok = self.types.is_subtype(a, p)
                    || *a == Ty::Error
                    || p.class_name() == Some("java.lang.Object");
                if !ok {
                    self.error(ResolveErrorKind::ArgumentMismatch { name: label.to_owned() }, span);
                    return (Ty::Error, Ty::Error);
                }
            }
            (Ty::method(params, sig.ret.clone()), sig.ret.clone())
        } else {
            match self.types.infer(&sig.type_params, &params, &actuals) {
                Ok(inst) => {
                    let params: Vec<Ty> = params.iter().map(|p| inst.apply(p)).collect();
                    let ret = inst.apply(&sig.ret);
                    (Ty::method(params, ret.clone()), ret)
                }
                Err(_) => {
                    self.error(ResolveErrorKind::ArgumentMismatch { name: label.to_owned() }, span);
                    (Ty::Error, Ty::Error)
                }
            }
        }
    }
}

/// The class a resolved expression refers to, if it is a class reference.
pub fn class_ref_fq(e: &Expr) -> Option<&str> {
    if let ExprKind::Ident(Ident { res: Resolution::Class(fq), .. }) = &e.kind {
        Some(fq)
    } else {
        None
    }
}

/// The dotted name of a chain of unresolved identifiers, if that is what
/// this expression is.
fn flatten_raw_path(e: &Expr) -> Option<String> {
    match &e.kind {
        ExprKind::Ident(id) if matches!(id.res, Resolution::Unresolved) => Some(id.name.clone()),
        ExprKind::Select { base, name } => Some(format!("{}.{name}", flatten_raw_path(base)?)),
        _ => None,
    }
}

fn promote_unary(ty: &Ty) -> Ty {
    match ty {
        Ty::Prim(p) => match p.widening_rank() {
            Some(r) if r < 2 => Ty::int(),
            Some(_) => ty.clone(),
            None => Ty::Error,
        },
        _ => Ty::Error,
    }
}

fn binary_ty(op: BinaryOp, lhs: &Ty, rhs: &Ty) -> Ty {
    match op {
        BinaryOp::Add
            if lhs.class_name() == Some("java.lang.String")
                || rhs.class_name() == Some("java.lang.String") =>
        {
            Ty::string()
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            match (lhs, rhs) {
                (Ty::Prim(a), Ty::Prim(b)) => match (a.widening_rank(), b.widening_rank()) {
                    (Some(ra), Some(rb)) => Ty::Prim(match ra.max(rb).max(2) {
                        2 => Prim::Int,
                        3 => Prim::Long,
                        4 => Prim::Float,
                        _ => Prim::Double,
                    }),
                    _ => Ty::Error,
                },
                _ => Ty::Error,
            }
        }
        BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge
        | BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::And
        | BinaryOp::Or => Ty::boolean(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_stmts;

    fn env() -> (Types, Globals) {
        let types = Types::with_defaults();
        let mut globals = Globals::new();
        globals.import_class("java.util.List");
        globals.import_class("java.util.ArrayList");
        globals.import_class("java.util.Collections");
        globals.add_static(
            "java.util.Collections",
            "singletonList",
            MethodSig::generic(
                vec![TypeVarDecl::new("T")],
                vec![Ty::var("T")],
                Ty::generic("java.util.List", vec![Ty::var("T")]),
            ),
        );
        globals.add_method("java.lang.String", "getBytes", MethodSig::simple(vec![], Ty::array(Ty::byte())));
        (types, globals)
    }

    fn resolve(src: &str, types: &Types, globals: &Globals) -> Block {
        let stmts = parse_stmts(src).expect("parse failure");
        let span = Span::new(0, src.len() as u32);
        let mut block = Block { stmts, span };
        let errors = resolve_block(&mut block, types, globals);
        assert!(errors.is_empty(), "unexpected resolve errors: {errors:?}");
        block
    }

    fn first_expr(block: &Block) -> &Expr {
        match &block.stmts[0].kind {
            StmtKind::Expr(e) => e,
            StmtKind::VarDecl(d) => d.init.as_ref().expect("initializer"),
            other => panic!("unexpected statement: {other:?}"),
        }
    }

    #[test]
    fn literals_and_locals() {
        let (types, globals) = env();
        let block = resolve("int x = 3; x + 4;", &types, &globals);
        let StmtKind::VarDecl(decl) = &block.stmts[0].kind else {
            panic!("expected decl");
        };
        assert_eq!(decl.ty.ty, Ty::int());
        let StmtKind::Expr(sum) = &block.stmts[1].kind else {
            panic!("expected expr");
        };
        assert_eq!(sum.ty, Ty::int());
    }

    #[test]
    fn generic_static_call_is_instantiated() {
        let (types, globals) = env();
        let block = resolve("Collections.singletonList(1);", &types, &globals);
        let call = first_expr(&block);
        assert_eq!(
            call.ty,
            Ty::generic("java.util.List", vec![Ty::class("java.lang.Integer")])
        );
    }

    #[test]
    fn instance_method_on_literal() {
        let (types, globals) = env();
        let block = resolve("\"foo\".getBytes();", &types, &globals);
        assert_eq!(first_expr(&block).ty, Ty::array(Ty::byte()));
    }

    #[test]
    fn string_concatenation() {
        let (types, globals) = env();
        let mut globals = globals;
        globals.declare_var("string", Ty::string());
        let block = resolve("string + 90;", &types, &globals);
        assert_eq!(first_expr(&block).ty, Ty::string());
    }

    #[test]
    fn dotted_class_path_collapses() {
        let (types, globals) = env();
        let block = resolve("java.util.Collections.singletonList(\"a\");", &types, &globals);
        let call = first_expr(&block);
        let ExprKind::Call { callee, .. } = &call.kind else {
            panic!("expected call");
        };
        let ExprKind::Select { base, .. } = &callee.kind else {
            panic!("expected select");
        };
        assert_eq!(class_ref_fq(base), Some("java.util.Collections"));
    }

    #[test]
    fn unknown_identifier_is_reported() {
        let (types, globals) = env();
        let stmts = parse_stmts("mystery;").unwrap();
        let mut block = Block { stmts, span: Span::DUMMY };
        let errors = resolve_block(&mut block, &types, &globals);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].kind, ResolveErrorKind::UnknownIdentifier(_)));
    }
}
