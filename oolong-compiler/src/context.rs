use std::collections::HashMap;

use crate::ast::{
    Binding, Decl, Expression, ExpressionKind, ElseBranch, NodeId, SourceSpan, Statement,
    StatementKind, TypeExpr, Unit,
};

/// A syntactic location an expected type can be read from, captured during
/// the index walk so queries need only the oracle afterwards.
#[derive(Debug, Clone)]
pub enum ContextSite {
    /// A value of the enclosing function or function literal's `return`.
    Return {
        results: Vec<TypeExpr>,
        values: Vec<NodeId>,
    },
    /// A right-hand side of `targets = values`.
    Assign {
        targets: Vec<(NodeId, SourceSpan)>,
        values: Vec<NodeId>,
    },
    /// An initializer of `var names annotation = values` (or `names := values`).
    VarDecl {
        names: Vec<Binding>,
        annotation: Option<TypeExpr>,
        values: Vec<NodeId>,
    },
    /// An argument of a call.
    CallArg {
        callee_span: SourceSpan,
        args: Vec<NodeId>,
    },
}

/// Parent map plus context-site table for one unit, built in a single
/// linear walk. The index holds ids and cloned annotations; the tree
/// itself stays immutable while queries run.
#[derive(Debug, Default)]
pub struct ContextIndex {
    parent: HashMap<NodeId, NodeId>,
    sites: Vec<ContextSite>,
    site_of: HashMap<NodeId, usize>,
}

impl ContextIndex {
    pub fn build(unit: &Unit) -> Self {
        let mut index = Self::default();
        let mut walker = Walker {
            index: &mut index,
            result_stack: Vec::new(),
        };
        walker.walk_unit(unit);
        index
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.parent.get(&id).copied()
    }

    pub fn site_for(&self, id: NodeId) -> Option<&ContextSite> {
        self.site_of.get(&id).map(|index| &self.sites[*index])
    }

    /// Walks the parent chain from `id` to the nearest recorded site.
    /// Returns the site together with the child the chain entered it from,
    /// so callers can recover the ordinal position.
    pub fn enclosing_site(&self, id: NodeId) -> Option<(&ContextSite, NodeId)> {
        let mut current = id;
        loop {
            if let Some(site) = self.site_for(current) {
                return Some((site, current));
            }
            current = self.parent_of(current)?;
        }
    }

    fn record_site(&mut self, site: ContextSite, roots: &[NodeId]) {
        let index = self.sites.len();
        self.sites.push(site);
        for root in roots {
            self.site_of.insert(*root, index);
        }
    }

    fn record_parent(&mut self, child: NodeId, parent: NodeId) {
        self.parent.insert(child, parent);
    }
}

struct Walker<'a> {
    index: &'a mut ContextIndex,
    /// Declared result annotations of the enclosing function or literal.
    result_stack: Vec<Vec<TypeExpr>>,
}

impl<'a> Walker<'a> {
    fn walk_unit(&mut self, unit: &Unit) {
        for decl in &unit.decls {
            match decl {
                Decl::Func(func) => {
                    self.result_stack.push(func.results.clone());
                    self.walk_block(&func.body.statements);
                    self.result_stack.pop();
                }
                Decl::Var(var) => {
                    let values: Vec<NodeId> = var.values.iter().map(|value| value.id).collect();
                    self.index.record_site(
                        ContextSite::VarDecl {
                            names: var.names.clone(),
                            annotation: var.annotation.clone(),
                            values: values.clone(),
                        },
                        &values,
                    );
                    for value in &var.values {
                        self.walk_expr(value);
                    }
                }
                Decl::Type(_) => {}
                Decl::Const(constant) => {
                    for spec in &constant.specs {
                        if let Some(value) = &spec.value {
                            self.walk_expr(value);
                        }
                    }
                }
            }
        }
    }

    fn walk_block(&mut self, statements: &[Statement]) {
        for statement in statements {
            self.walk_stmt(statement);
        }
    }

    fn walk_stmt(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::Var(var) => {
                let values: Vec<NodeId> = var.values.iter().map(|value| value.id).collect();
                self.index.record_site(
                    ContextSite::VarDecl {
                        names: var.names.clone(),
                        annotation: var.annotation.clone(),
                        values: values.clone(),
                    },
                    &values,
                );
                for value in &var.values {
                    self.walk_expr(value);
                }
            }
            StatementKind::Assign(assign) => {
                let targets: Vec<(NodeId, SourceSpan)> = assign
                    .targets
                    .iter()
                    .map(|target| (target.id, target.span))
                    .collect();
                let values: Vec<NodeId> = assign.values.iter().map(|value| value.id).collect();
                self.index.record_site(
                    ContextSite::Assign {
                        targets,
                        values: values.clone(),
                    },
                    &values,
                );
                for target in &assign.targets {
                    self.walk_expr(target);
                }
                for value in &assign.values {
                    self.walk_expr(value);
                }
            }
            StatementKind::Return(ret) => {
                let results = self.result_stack.last().cloned().unwrap_or_default();
                let values: Vec<NodeId> = ret.values.iter().map(|value| value.id).collect();
                self.index.record_site(
                    ContextSite::Return {
                        results,
                        values: values.clone(),
                    },
                    &values,
                );
                for value in &ret.values {
                    self.walk_expr(value);
                }
            }
            StatementKind::If(conditional) => {
                self.walk_expr(&conditional.cond);
                self.walk_block(&conditional.then_block.statements);
                match &conditional.else_branch {
                    Some(ElseBranch::If(nested)) => self.walk_stmt(nested),
                    Some(ElseBranch::Block(block)) => self.walk_block(&block.statements),
                    None => {}
                }
            }
            StatementKind::For(repeat) => {
                if let Some(init) = &repeat.init {
                    self.walk_stmt(init);
                }
                if let Some(cond) = &repeat.cond {
                    self.walk_expr(cond);
                }
                if let Some(post) = &repeat.post {
                    self.walk_stmt(post);
                }
                self.walk_block(&repeat.body.statements);
            }
            StatementKind::Match(matched) => {
                self.walk_expr(&matched.scrutinee);
                for arm in &matched.arms {
                    self.walk_block(&arm.body.statements);
                }
            }
            StatementKind::Expression(expression) => self.walk_expr(expression),
            StatementKind::Block(block) => self.walk_block(&block.statements),
        }
    }

    fn walk_expr(&mut self, expression: &Expression) {
        match &expression.kind {
            ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) => {}
            ExpressionKind::Composite(composite) => {
                for field in &composite.fields {
                    self.index.record_parent(field.value.id, expression.id);
                    self.walk_expr(&field.value);
                }
            }
            ExpressionKind::Unary(unary) => {
                self.index.record_parent(unary.operand.id, expression.id);
                self.walk_expr(&unary.operand);
            }
            ExpressionKind::Binary(binary) => {
                self.index.record_parent(binary.left.id, expression.id);
                self.index.record_parent(binary.right.id, expression.id);
                self.walk_expr(&binary.left);
                self.walk_expr(&binary.right);
            }
            ExpressionKind::Call(call) => {
                self.index.record_parent(call.callee.id, expression.id);
                self.walk_expr(&call.callee);
                let args: Vec<NodeId> = call.args.iter().map(|arg| arg.id).collect();
                self.index.record_site(
                    ContextSite::CallArg {
                        callee_span: call.callee.span,
                        args: args.clone(),
                    },
                    &args,
                );
                for arg in &call.args {
                    self.walk_expr(arg);
                }
            }
            ExpressionKind::Selector(selector) => {
                self.index.record_parent(selector.object.id, expression.id);
                self.walk_expr(&selector.object);
            }
            ExpressionKind::Index(indexed) => {
                self.index.record_parent(indexed.object.id, expression.id);
                self.index.record_parent(indexed.index.id, expression.id);
                self.walk_expr(&indexed.object);
                self.walk_expr(&indexed.index);
            }
            ExpressionKind::Grouping(inner) => {
                self.index.record_parent(inner.id, expression.id);
                self.walk_expr(inner);
            }
            ExpressionKind::FuncLit(lit) => {
                self.result_stack.push(lit.results.clone());
                self.walk_block(&lit.body.statements);
                self.result_stack.pop();
            }
        }
    }
}
