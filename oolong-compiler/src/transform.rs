use anyhow::{bail, Result};

use crate::addressable::TempAllocator;
use crate::ast::{
    AstBuilder, Block, Decl, ElseBranch, Expression, ExpressionKind, Statement, StatementKind,
    TypeExpr, TypeExprKind, Unit,
};
use crate::context::ContextIndex;
use crate::diagnostics::{Diagnostics, ErrorCategory};
use crate::infer::InferenceEngine;
use crate::matcher::compile_match;
use crate::oracle::TypeOracle;
use crate::printer;
use crate::source::SourceFile;
use crate::sumtype::{emit_instance_decls, emit_tag_decls, rewrite_constructor};
use crate::types::{resolve_type_expr, InstanceRegistry, SumKind, VariantTag};

#[derive(Debug, Default)]
pub struct TransformOptions {
    /// Also render the generated declarations as Go source in the output.
    pub dump_generated: bool,
}

/// Everything the driver splices back into the build: generated top-level
/// declarations plus the registry describing them. The unit itself is
/// rewritten in place.
pub struct Transformed {
    pub declarations: Vec<Decl>,
    pub registry: InstanceRegistry,
    pub rendered_declarations: Option<String>,
}

/// One pass over one compilation unit. The registry, temporary counter
/// and sink all live inside a single invocation, so independent units can
/// be processed on separate transformers without shared state.
pub struct Transformer {
    options: TransformOptions,
    diagnostics: Diagnostics,
}

impl Transformer {
    pub fn new(options: TransformOptions) -> Self {
        Self {
            options,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Diagnostics {
        self.diagnostics
    }

    /// Rewrites constructor uses and match constructs in `unit` and
    /// returns the pending declarations. Every independent problem in the
    /// unit is reported before the pass answers; a unit with any reported
    /// error fails as a whole even though offending nodes were simply
    /// left untransformed.
    pub fn transform(
        &mut self,
        source: &SourceFile,
        unit: &mut Unit,
        builder: &mut AstBuilder,
        oracle: Option<&dyn TypeOracle>,
    ) -> Result<Transformed> {
        let mut registry = InstanceRegistry::new();
        let mut temps = TempAllocator::new();

        rewrite_sum_annotations(unit, &mut registry, &mut self.diagnostics);

        let index = ContextIndex::build(unit);
        let engine = InferenceEngine::new(oracle, &index);

        let mut pass = Pass {
            builder: &mut *builder,
            temps: &mut temps,
            registry: &mut registry,
            engine: &engine,
            diagnostics: &mut self.diagnostics,
        };
        pass.visit_unit(unit);

        let mut declarations = Vec::new();
        for kind in [SumKind::Result, SumKind::Option] {
            if registry.instances().any(|instance| instance.kind == kind) {
                declarations.extend(emit_tag_decls(builder, kind));
            }
        }
        for name in registry.unemitted() {
            let instance = registry
                .lookup(&name)
                .expect("unemitted names come from the registry")
                .clone();
            declarations.extend(emit_instance_decls(builder, &instance));
            registry.mark_emitted(&name);
        }

        let rendered_declarations = self
            .options
            .dump_generated
            .then(|| printer::render_decls(&declarations));

        if self.diagnostics.has_errors() {
            bail!(
                "failed to transform {}: {} error(s)",
                source.display_name(),
                self.diagnostics.error_count()
            );
        }

        Ok(Transformed {
            declarations,
            registry,
            rendered_declarations,
        })
    }
}

/// Pre-scan: registers every structured sum-type annotation the desugarer
/// left in the tree and rewrites it to the generated named type. Runs
/// before any constructor queries the registry.
fn rewrite_sum_annotations(
    unit: &mut Unit,
    registry: &mut InstanceRegistry,
    diagnostics: &mut Diagnostics,
) {
    for decl in &mut unit.decls {
        match decl {
            Decl::Func(func) => {
                if let Some(receiver) = &mut func.receiver {
                    rewrite_type(&mut receiver.ty, registry, diagnostics);
                }
                for parameter in &mut func.params {
                    rewrite_type(&mut parameter.ty, registry, diagnostics);
                }
                for result in &mut func.results {
                    rewrite_type(result, registry, diagnostics);
                }
                rewrite_block_types(&mut func.body, registry, diagnostics);
            }
            Decl::Var(var) => {
                if let Some(annotation) = &mut var.annotation {
                    rewrite_type(annotation, registry, diagnostics);
                }
                for value in &mut var.values {
                    rewrite_expr_types(value, registry, diagnostics);
                }
            }
            Decl::Type(type_decl) => match &mut type_decl.kind {
                crate::ast::TypeDeclKind::Struct(fields) => {
                    for field in fields {
                        rewrite_type(&mut field.ty, registry, diagnostics);
                    }
                }
                crate::ast::TypeDeclKind::Defined(ty) => {
                    rewrite_type(ty, registry, diagnostics);
                }
            },
            Decl::Const(constant) => {
                for spec in &mut constant.specs {
                    if let Some(annotation) = &mut spec.annotation {
                        rewrite_type(annotation, registry, diagnostics);
                    }
                    if let Some(value) = &mut spec.value {
                        rewrite_expr_types(value, registry, diagnostics);
                    }
                }
            }
        }
    }
}

fn rewrite_block_types(
    block: &mut Block,
    registry: &mut InstanceRegistry,
    diagnostics: &mut Diagnostics,
) {
    for statement in &mut block.statements {
        rewrite_stmt_types(statement, registry, diagnostics);
    }
}

fn rewrite_stmt_types(
    statement: &mut Statement,
    registry: &mut InstanceRegistry,
    diagnostics: &mut Diagnostics,
) {
    match &mut statement.kind {
        StatementKind::Var(var) => {
            if let Some(annotation) = &mut var.annotation {
                rewrite_type(annotation, registry, diagnostics);
            }
            for value in &mut var.values {
                rewrite_expr_types(value, registry, diagnostics);
            }
        }
        StatementKind::Assign(assign) => {
            for target in &mut assign.targets {
                rewrite_expr_types(target, registry, diagnostics);
            }
            for value in &mut assign.values {
                rewrite_expr_types(value, registry, diagnostics);
            }
        }
        StatementKind::Return(ret) => {
            for value in &mut ret.values {
                rewrite_expr_types(value, registry, diagnostics);
            }
        }
        StatementKind::If(conditional) => {
            rewrite_expr_types(&mut conditional.cond, registry, diagnostics);
            rewrite_block_types(&mut conditional.then_block, registry, diagnostics);
            match &mut conditional.else_branch {
                Some(ElseBranch::If(nested)) => rewrite_stmt_types(nested, registry, diagnostics),
                Some(ElseBranch::Block(block)) => {
                    rewrite_block_types(block, registry, diagnostics)
                }
                None => {}
            }
        }
        StatementKind::For(repeat) => {
            if let Some(init) = &mut repeat.init {
                rewrite_stmt_types(init, registry, diagnostics);
            }
            if let Some(cond) = &mut repeat.cond {
                rewrite_expr_types(cond, registry, diagnostics);
            }
            if let Some(post) = &mut repeat.post {
                rewrite_stmt_types(post, registry, diagnostics);
            }
            rewrite_block_types(&mut repeat.body, registry, diagnostics);
        }
        StatementKind::Match(matched) => {
            rewrite_expr_types(&mut matched.scrutinee, registry, diagnostics);
            for arm in &mut matched.arms {
                rewrite_block_types(&mut arm.body, registry, diagnostics);
            }
        }
        StatementKind::Expression(expression) => {
            rewrite_expr_types(expression, registry, diagnostics)
        }
        StatementKind::Block(block) => rewrite_block_types(block, registry, diagnostics),
    }
}

fn rewrite_expr_types(
    expression: &mut Expression,
    registry: &mut InstanceRegistry,
    diagnostics: &mut Diagnostics,
) {
    match &mut expression.kind {
        ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) => {}
        ExpressionKind::Composite(composite) => {
            rewrite_type(&mut composite.ty, registry, diagnostics);
            for field in &mut composite.fields {
                rewrite_expr_types(&mut field.value, registry, diagnostics);
            }
        }
        ExpressionKind::Unary(unary) => {
            rewrite_expr_types(&mut unary.operand, registry, diagnostics)
        }
        ExpressionKind::Binary(binary) => {
            rewrite_expr_types(&mut binary.left, registry, diagnostics);
            rewrite_expr_types(&mut binary.right, registry, diagnostics);
        }
        ExpressionKind::Call(call) => {
            rewrite_expr_types(&mut call.callee, registry, diagnostics);
            for arg in &mut call.args {
                rewrite_expr_types(arg, registry, diagnostics);
            }
        }
        ExpressionKind::Selector(selector) => {
            rewrite_expr_types(&mut selector.object, registry, diagnostics)
        }
        ExpressionKind::Index(indexed) => {
            rewrite_expr_types(&mut indexed.object, registry, diagnostics);
            rewrite_expr_types(&mut indexed.index, registry, diagnostics);
        }
        ExpressionKind::Grouping(inner) => rewrite_expr_types(inner, registry, diagnostics),
        ExpressionKind::FuncLit(lit) => {
            for parameter in &mut lit.params {
                rewrite_type(&mut parameter.ty, registry, diagnostics);
            }
            for result in &mut lit.results {
                rewrite_type(result, registry, diagnostics);
            }
            rewrite_block_types(&mut lit.body, registry, diagnostics);
        }
    }
}

/// Bottom-up so nested instantiations register their inner instances
/// before the outer name is formed.
fn rewrite_type(
    texpr: &mut TypeExpr,
    registry: &mut InstanceRegistry,
    diagnostics: &mut Diagnostics,
) {
    match &mut texpr.kind {
        TypeExprKind::Name(_) | TypeExprKind::Any => {}
        TypeExprKind::Pointer(inner) => rewrite_type(inner, registry, diagnostics),
        TypeExprKind::Slice(element) => rewrite_type(element, registry, diagnostics),
        TypeExprKind::Map(key, value) => {
            rewrite_type(key, registry, diagnostics);
            rewrite_type(value, registry, diagnostics);
        }
        TypeExprKind::Func {
            params, results, ..
        } => {
            for parameter in params {
                rewrite_type(parameter, registry, diagnostics);
            }
            for result in results {
                rewrite_type(result, registry, diagnostics);
            }
        }
        TypeExprKind::Struct(fields) => {
            for field in fields {
                rewrite_type(&mut field.ty, registry, diagnostics);
            }
        }
        TypeExprKind::Sum { kind, params } => {
            for parameter in params.iter_mut() {
                rewrite_type(parameter, registry, diagnostics);
            }
            let resolved: Option<Vec<_>> = params.iter().map(resolve_type_expr).collect();
            let Some(resolved) = resolved else {
                diagnostics.push_error(
                    ErrorCategory::InvalidSumTypeUsage,
                    format!("cannot resolve the type parameters of this {} annotation", kind),
                    Some(texpr.span),
                );
                return;
            };
            let name = registry.register(*kind, resolved);
            texpr.kind = TypeExprKind::Name(name);
        }
    }
}

struct Pass<'a, 'b> {
    builder: &'a mut AstBuilder,
    temps: &'a mut TempAllocator,
    registry: &'a mut InstanceRegistry,
    engine: &'a InferenceEngine<'b>,
    diagnostics: &'a mut Diagnostics,
}

impl Pass<'_, '_> {
    fn visit_unit(&mut self, unit: &mut Unit) {
        for decl in &mut unit.decls {
            match decl {
                Decl::Func(func) => self.visit_block(&mut func.body),
                Decl::Var(var) => {
                    for value in &mut var.values {
                        self.visit_expr(value);
                    }
                }
                Decl::Type(_) => {}
                Decl::Const(constant) => {
                    for spec in &mut constant.specs {
                        if let Some(value) = &mut spec.value {
                            self.visit_expr(value);
                        }
                    }
                }
            }
        }
    }

    fn visit_block(&mut self, block: &mut Block) {
        for statement in &mut block.statements {
            self.visit_stmt(statement);
        }
    }

    fn visit_stmt(&mut self, statement: &mut Statement) {
        match &mut statement.kind {
            StatementKind::Var(var) => {
                for value in &mut var.values {
                    self.visit_expr(value);
                }
            }
            StatementKind::Assign(assign) => {
                for target in &mut assign.targets {
                    self.visit_expr(target);
                }
                for value in &mut assign.values {
                    self.visit_expr(value);
                }
            }
            StatementKind::Return(ret) => {
                for value in &mut ret.values {
                    self.visit_expr(value);
                }
            }
            StatementKind::If(conditional) => {
                self.visit_expr(&mut conditional.cond);
                self.visit_block(&mut conditional.then_block);
                match &mut conditional.else_branch {
                    Some(ElseBranch::If(nested)) => self.visit_stmt(nested),
                    Some(ElseBranch::Block(block)) => self.visit_block(block),
                    None => {}
                }
            }
            StatementKind::For(repeat) => {
                if let Some(init) = &mut repeat.init {
                    self.visit_stmt(init);
                }
                if let Some(cond) = &mut repeat.cond {
                    self.visit_expr(cond);
                }
                if let Some(post) = &mut repeat.post {
                    self.visit_stmt(post);
                }
                self.visit_block(&mut repeat.body);
            }
            StatementKind::Match(matched) => {
                self.visit_expr(&mut matched.scrutinee);
                for arm in &mut matched.arms {
                    self.visit_block(&mut arm.body);
                }
                self.lower_match(statement);
            }
            StatementKind::Expression(expression) => self.visit_expr(expression),
            StatementKind::Block(block) => self.visit_block(block),
        }
    }

    fn lower_match(&mut self, statement: &mut Statement) {
        let span = statement.span;
        let kind = std::mem::replace(&mut statement.kind, StatementKind::Block(Block::default()));
        let matched = match kind {
            StatementKind::Match(matched) => matched,
            other => {
                statement.kind = other;
                return;
            }
        };
        match compile_match(
            self.builder,
            self.temps,
            self.registry,
            self.engine,
            self.diagnostics,
            span,
            matched.clone(),
        ) {
            Some(lowered) => {
                statement.kind = lowered.kind;
            }
            None => {
                // Left untransformed; the failure is already in the sink.
                statement.kind = StatementKind::Match(matched);
            }
        }
    }

    fn visit_expr(&mut self, expression: &mut Expression) {
        match &mut expression.kind {
            ExpressionKind::Identifier(ident) => {
                if ident.name == VariantTag::None.name() {
                    rewrite_constructor(
                        self.builder,
                        self.temps,
                        self.registry,
                        self.engine,
                        self.diagnostics,
                        expression,
                        VariantTag::None,
                    );
                }
            }
            ExpressionKind::Literal(_) => {}
            ExpressionKind::Composite(composite) => {
                for field in &mut composite.fields {
                    self.visit_expr(&mut field.value);
                }
            }
            ExpressionKind::Unary(unary) => self.visit_expr(&mut unary.operand),
            ExpressionKind::Binary(binary) => {
                self.visit_expr(&mut binary.left);
                self.visit_expr(&mut binary.right);
            }
            ExpressionKind::Call(call) => {
                let constructor = match &call.callee.kind {
                    ExpressionKind::Identifier(ident) => VariantTag::from_name(&ident.name),
                    _ => None,
                };
                if constructor.is_none() {
                    self.visit_expr(&mut call.callee);
                }
                for arg in &mut call.args {
                    self.visit_expr(arg);
                }
                match constructor {
                    Some(VariantTag::None) => {
                        self.diagnostics.push_error(
                            ErrorCategory::InvalidSumTypeUsage,
                            "None does not take arguments",
                            Some(expression.span),
                        );
                    }
                    Some(tag) => {
                        rewrite_constructor(
                            self.builder,
                            self.temps,
                            self.registry,
                            self.engine,
                            self.diagnostics,
                            expression,
                            tag,
                        );
                    }
                    None => {}
                }
            }
            ExpressionKind::Selector(selector) => self.visit_expr(&mut selector.object),
            ExpressionKind::Index(indexed) => {
                self.visit_expr(&mut indexed.object);
                self.visit_expr(&mut indexed.index);
            }
            ExpressionKind::Grouping(inner) => self.visit_expr(inner),
            ExpressionKind::FuncLit(lit) => self.visit_block(&mut lit.body),
        }
    }
}
