//! The MysoreScript abstract syntax tree.
//!
//! Nodes are built once by the parser and then shared immutably: closures
//! and method tables keep `&'static` back-references into the tree for the
//! life of the process. The interpreter-facing slots on expression and
//! closure nodes (constant cache, captured-variable sets, execution count,
//! cached compiled entry point) therefore use interior mutability.

use mysore_core::{Span, Value};
use rustc_hash::FxHashSet;
use std::cell::{Cell, OnceCell};

/// An identifier with its source location.
#[derive(Debug, Clone)]
pub struct Ident {
    /// The identifier text.
    pub name: String,
    /// Where it appeared.
    pub span: Span,
}

/// A block of statements.
#[derive(Debug)]
pub struct Statements {
    /// The statements in source order.
    pub statements: Vec<Stmt>,
}

impl Statements {
    /// Visit every statement, accumulating declared and used names.
    pub fn collect_var_uses(&self, decls: &mut FxHashSet<String>, uses: &mut FxHashSet<String>) {
        for stmt in &self.statements {
            stmt.collect_var_uses(decls, uses);
        }
    }
}

/// A statement with its source location.
#[derive(Debug)]
pub struct Stmt {
    /// What kind of statement.
    pub kind: StmtKind,
    /// Where it appeared.
    pub span: Span,
}

/// Statement kinds.
#[derive(Debug)]
pub enum StmtKind {
    /// `var x;` or `var x = expr;`
    Decl {
        /// The declared name.
        name: Ident,
        /// The initialiser, if present.
        init: Option<Expr>,
    },
    /// `x = expr;`
    Assignment {
        /// The assigned variable.
        target: Ident,
        /// The assigned expression.
        expr: Expr,
    },
    /// `return expr;`
    Return(Expr),
    /// `if (cond) { body }` — there is no `else` in MysoreScript.
    If {
        /// The condition.
        condition: Expr,
        /// The body, executed once when the condition is true.
        body: Statements,
    },
    /// `while (cond) { body }`
    While {
        /// The condition.
        condition: Expr,
        /// The body, executed while the condition remains true.
        body: Statements,
    },
    /// `class Name { … }` or `class Name : Super { … }`
    Class(ClassDecl),
    /// An expression in statement position.
    Expr(Expr),
}

impl Stmt {
    /// Accumulate declared and used names.
    ///
    /// Two behaviours are deliberate and load-bearing for closure capture:
    /// a declaration contributes only its declared name (the initialiser is
    /// not traversed), and class declarations contribute nothing (classes
    /// cannot appear inside closures).
    pub fn collect_var_uses(&self, decls: &mut FxHashSet<String>, uses: &mut FxHashSet<String>) {
        match &self.kind {
            StmtKind::Decl { name, .. } => {
                decls.insert(name.name.clone());
            }
            StmtKind::Assignment { target, expr } => {
                uses.insert(target.name.clone());
                expr.collect_var_uses(decls, uses);
            }
            StmtKind::Return(expr) => expr.collect_var_uses(decls, uses),
            StmtKind::If { condition, body } | StmtKind::While { condition, body } => {
                condition.collect_var_uses(decls, uses);
                body.collect_var_uses(decls, uses);
            }
            StmtKind::Class(_) => {}
            StmtKind::Expr(expr) => expr.collect_var_uses(decls, uses),
        }
    }
}

/// A class declaration.
///
/// When no superclass form was parsed the single identifier lands in the
/// superclass-name slot and `name` is empty; [`class_name`] and
/// [`superclass`] sort this out for consumers.
///
/// [`class_name`]: Self::class_name
/// [`superclass`]: Self::superclass
#[derive(Debug)]
pub struct ClassDecl {
    /// The class name, present only when a superclass was also named.
    pub name: Option<Ident>,
    /// The superclass name, or the class name when `name` is empty.
    pub superclass_name: Ident,
    /// Instance-variable names, in declaration order.
    pub ivars: Vec<Ident>,
    /// Method declarations.
    pub methods: Vec<ClosureDecl>,
}

impl ClassDecl {
    /// The declared class name.
    pub fn class_name(&self) -> &str {
        match &self.name {
            Some(name) => &name.name,
            None => &self.superclass_name.name,
        }
    }

    /// The declared superclass name, if one was given.
    pub fn superclass(&self) -> Option<&str> {
        self.name.as_ref().map(|_| self.superclass_name.name.as_str())
    }
}

/// An expression with its source location and constant-expression cache.
#[derive(Debug)]
pub struct Expr {
    /// What kind of expression.
    pub kind: ExprKind,
    /// Where it appeared.
    pub span: Span,
    /// Cached result, used only when the expression is constant. Null means
    /// "not evaluated yet".
    cache: Cell<Value>,
}

impl Expr {
    /// Create an expression node.
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            cache: Cell::new(Value::NULL),
        }
    }

    /// Is this expression constant, so its result can be cached?
    ///
    /// Literals are constant; a binary operation is constant iff both sides
    /// are. Everything else is not.
    pub fn is_constant_expression(&self) -> bool {
        match &self.kind {
            ExprKind::Number(_) | ExprKind::StringLiteral(_) => true,
            ExprKind::BinOp { lhs, rhs, .. } => {
                lhs.is_constant_expression() && rhs.is_constant_expression()
            }
            _ => false,
        }
    }

    /// The cached result, or null if none has been stored.
    pub fn cached(&self) -> Value {
        self.cache.get()
    }

    /// Store a result in the constant cache.
    pub fn store_cache(&self, value: Value) {
        self.cache.set(value);
    }

    /// Accumulate declared and used names.
    pub fn collect_var_uses(&self, decls: &mut FxHashSet<String>, uses: &mut FxHashSet<String>) {
        match &self.kind {
            ExprKind::Number(_) | ExprKind::StringLiteral(_) | ExprKind::New(_) => {}
            ExprKind::VarRef(name) => {
                uses.insert(name.name.clone());
            }
            ExprKind::BinOp { lhs, rhs, .. } => {
                lhs.collect_var_uses(decls, uses);
                rhs.collect_var_uses(decls, uses);
            }
            ExprKind::Call {
                callee, arguments, ..
            } => {
                callee.collect_var_uses(decls, uses);
                for arg in arguments {
                    arg.collect_var_uses(decls, uses);
                }
            }
            ExprKind::Closure(decl) => decl.collect_var_uses(decls, uses),
        }
    }
}

/// Expression kinds.
#[derive(Debug)]
pub enum ExprKind {
    /// An integer literal.
    Number(i64),
    /// A string literal.
    StringLiteral(String),
    /// A variable reference.
    VarRef(Ident),
    /// A binary operation.
    BinOp {
        /// The operator.
        op: BinOpKind,
        /// Left operand.
        lhs: Box<Expr>,
        /// Right operand.
        rhs: Box<Expr>,
    },
    /// A closure call (`callee(args)`) or method call (`callee.m(args)`).
    Call {
        /// The callee, or the receiver for a method call.
        callee: Box<Expr>,
        /// The method name; absent when invoking a closure.
        method: Option<Ident>,
        /// Argument expressions, in order.
        arguments: Vec<Expr>,
    },
    /// `new ClassName`
    New(Ident),
    /// A closure declaration in expression position.
    Closure(ClosureDecl),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOpKind {
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `+`
    Add,
    /// `-`
    Sub,
    /// `==`
    Eq,
    /// `!=`
    Ne,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `>=`
    Ge,
}

impl BinOpKind {
    /// Comparisons operate on raw tagged words and never dispatch to
    /// methods; the arithmetic operators do dispatch when the left operand
    /// is not a small integer.
    pub const fn is_comparison(self) -> bool {
        matches!(self, Self::Eq | Self::Ne | Self::Lt | Self::Gt | Self::Le | Self::Ge)
    }

    /// The method name this operator dispatches to on non-integer operands.
    pub const fn method_name(self) -> Option<&'static str> {
        match self {
            Self::Mul => Some("mul"),
            Self::Div => Some("div"),
            Self::Add => Some("add"),
            Self::Sub => Some("sub"),
            _ => None,
        }
    }

    /// Apply the operator to two unboxed integers.
    ///
    /// Arithmetic wraps silently; division follows the host operation.
    /// Comparisons yield 0 or 1.
    pub fn apply_ints(self, lhs: i64, rhs: i64) -> i64 {
        match self {
            Self::Mul => lhs.wrapping_mul(rhs),
            Self::Div => lhs.wrapping_div(rhs),
            Self::Add => lhs.wrapping_add(rhs),
            Self::Sub => lhs.wrapping_sub(rhs),
            Self::Eq => i64::from(lhs == rhs),
            Self::Ne => i64::from(lhs != rhs),
            Self::Lt => i64::from(lhs < rhs),
            Self::Gt => i64::from(lhs > rhs),
            Self::Le => i64::from(lhs <= rhs),
            Self::Ge => i64::from(lhs >= rhs),
        }
    }
}

/// A closure declaration: a method, a named function, or a true closure.
#[derive(Debug)]
pub struct ClosureDecl {
    /// The closure name; absent for anonymous closures in expression
    /// position, always present for methods.
    pub name: Option<Ident>,
    /// Parameter names, in order.
    pub parameters: Vec<Ident>,
    /// The body.
    pub body: Statements,
    /// Where the declaration appeared.
    pub span: Span,

    /// Names declared anywhere inside the body, filled by `check`.
    decls: OnceCell<FxHashSet<String>>,
    /// Captured names in the order fixed at first `check`. Also serves as
    /// the "has `check` run" flag.
    captured: OnceCell<Vec<String>>,
    /// How many times this declaration has been interpreted.
    execution_count: Cell<u32>,
    /// Type-erased compiled entry point, once the backend has produced one.
    compiled: Cell<*const ()>,
}

impl ClosureDecl {
    /// Create a closure declaration node.
    pub fn new(name: Option<Ident>, parameters: Vec<Ident>, body: Statements, span: Span) -> Self {
        Self {
            name,
            parameters,
            body,
            span,
            decls: OnceCell::new(),
            captured: OnceCell::new(),
            execution_count: Cell::new(0),
            compiled: Cell::new(std::ptr::null()),
        }
    }

    /// The declared parameter count.
    pub fn arity(&self) -> usize {
        self.parameters.len()
    }

    /// The name, or a placeholder for anonymous closures.
    pub fn name_or_anon(&self) -> &str {
        self.name.as_ref().map_or("<anonymous>", |n| n.name.as_str())
    }

    /// Compute the declared and captured name sets for this closure.
    ///
    /// Runs at most once; repeated calls are no-ops. Captured names are the
    /// names used inside the body that are neither parameters nor local
    /// declarations. Their order is fixed here and never changes: closure
    /// objects allocated from this node rely on positional agreement with
    /// it.
    pub fn check(&self) {
        if self.captured.get().is_some() {
            return;
        }
        let mut decls = FxHashSet::default();
        let mut uses = FxHashSet::default();
        self.body.collect_var_uses(&mut decls, &mut uses);
        for param in &self.parameters {
            uses.remove(param.name.as_str());
        }
        for decl in &decls {
            uses.remove(decl.as_str());
        }
        let mut captured: Vec<String> = uses.into_iter().collect();
        captured.sort();
        let _ = self.captured.set(captured);
        let _ = self.decls.set(decls);
    }

    /// The captured names in their fixed order. Empty before `check`.
    pub fn captured(&self) -> &[String] {
        self.captured.get().map_or(&[], Vec::as_slice)
    }

    /// Number of captured variables. Meaningful only after `check`.
    pub fn captured_count(&self) -> usize {
        self.captured().len()
    }

    /// Whether `check` has run.
    pub fn is_checked(&self) -> bool {
        self.captured.get().is_some()
    }

    /// Increment the execution counter, returning the new count.
    pub fn bump_execution_count(&self) -> u32 {
        let count = self.execution_count.get() + 1;
        self.execution_count.set(count);
        count
    }

    /// The current execution count.
    pub fn execution_count(&self) -> u32 {
        self.execution_count.get()
    }

    /// The cached compiled entry point, if the backend produced one.
    pub fn compiled_entry(&self) -> Option<*const ()> {
        let entry = self.compiled.get();
        (!entry.is_null()).then_some(entry)
    }

    /// Cache the compiled entry point for this declaration.
    pub fn set_compiled_entry(&self, entry: *const ()) {
        self.compiled.set(entry);
    }

    /// Report captured names as uses and this closure's name (if any) as a
    /// declaration in the enclosing scope.
    pub fn collect_var_uses(&self, decls: &mut FxHashSet<String>, uses: &mut FxHashSet<String>) {
        self.check();
        for name in self.captured() {
            uses.insert(name.clone());
        }
        if let Some(name) = &self.name {
            decls.insert(name.name.clone());
        }
    }
}
