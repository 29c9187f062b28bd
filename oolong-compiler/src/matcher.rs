use crate::addressable::TempAllocator;
use crate::ast::{
    AstBuilder, BinaryOp, Binding, Block, ElseBranch, Expression, ExpressionKind, MatchStatement,
    SourceSpan, Statement, UnaryOp,
};
use crate::diagnostics::{Diagnostics, ErrorCategory};
use crate::infer::InferenceEngine;
use crate::parser::parse_guard_expression;
use crate::types::{InstanceRegistry, SumKind, Type, VariantTag};

/// An arm that survived validation, ready for chain compilation.
struct CompiledArm {
    /// `None` marks the wildcard arm.
    tag: Option<VariantTag>,
    binding: Option<Binding>,
    guard: Option<Expression>,
    body: Block,
    span: SourceSpan,
}

/// Compiles one match construct into an ordered conditional chain over a
/// captured scrutinee temporary. Stateless across calls: everything it
/// shares with the rest of the pass is the sink. Returns `None` when the
/// site cannot be lowered; arm-local problems drop the arm and keep the
/// siblings.
pub fn compile_match(
    builder: &mut AstBuilder,
    temps: &mut TempAllocator,
    registry: &InstanceRegistry,
    engine: &InferenceEngine<'_>,
    diagnostics: &mut Diagnostics,
    span: SourceSpan,
    matched: MatchStatement,
) -> Option<Statement> {
    if matched.arms.is_empty() {
        diagnostics.push_error(
            ErrorCategory::InvalidSumTypeUsage,
            "match expression has no arms",
            Some(span),
        );
        return None;
    }

    let scrutinee_name = scrutinee_instance_name(registry, engine, &matched.scrutinee);
    let kind = match resolve_kind(registry, engine, diagnostics, &matched, span) {
        KindResolution::Known(kind) => Some(kind),
        KindResolution::Unknown => None,
        KindResolution::Conflict => return None,
    };

    let arms = validate_arms(builder, engine, diagnostics, kind, matched.arms);
    if !check_exhaustiveness(diagnostics, kind, scrutinee_name.as_deref(), &arms, span) {
        return None;
    }
    if arms.is_empty() {
        return None;
    }

    Some(compile_chain(builder, temps, diagnostics, span, matched.scrutinee, arms))
}

fn scrutinee_instance_name(
    registry: &InstanceRegistry,
    engine: &InferenceEngine<'_>,
    scrutinee: &Expression,
) -> Option<String> {
    match engine.infer(scrutinee)? {
        Type::Named(name) => registry.lookup(&name).map(|instance| instance.generated_name.clone()),
        _ => None,
    }
}

enum KindResolution {
    Known(SumKind),
    Unknown,
    Conflict,
}

/// Oracle-backed scrutinee resolution first; without it, fall back to the
/// constructors the arms reference. The fallback cannot recover payload
/// types but is enough to compile the chain and judge coverage.
fn resolve_kind(
    registry: &InstanceRegistry,
    engine: &InferenceEngine<'_>,
    diagnostics: &mut Diagnostics,
    matched: &MatchStatement,
    span: SourceSpan,
) -> KindResolution {
    if let Some(ty) = engine.infer(&matched.scrutinee) {
        if let Type::Named(name) = &ty {
            if let Some(instance) = registry.lookup(name) {
                return KindResolution::Known(instance.kind);
            }
        }
    }

    let mut seen: Option<SumKind> = None;
    for arm in &matched.arms {
        let Some(tag) = VariantTag::from_name(&arm.pattern) else {
            continue;
        };
        match seen {
            None => seen = Some(tag.kind()),
            Some(kind) if kind != tag.kind() => {
                diagnostics.push_error(
                    ErrorCategory::InvalidSumTypeUsage,
                    "match mixes Result and Option constructor patterns",
                    Some(span),
                );
                return KindResolution::Conflict;
            }
            Some(_) => {}
        }
    }
    match seen {
        Some(kind) => KindResolution::Known(kind),
        None => KindResolution::Unknown,
    }
}

fn validate_arms(
    builder: &mut AstBuilder,
    engine: &InferenceEngine<'_>,
    diagnostics: &mut Diagnostics,
    kind: Option<SumKind>,
    arms: Vec<crate::ast::MatchArm>,
) -> Vec<CompiledArm> {
    let mut compiled = Vec::new();
    let mut saw_wildcard = false;

    for arm in arms {
        let tag = if arm.is_wildcard() {
            if saw_wildcard {
                diagnostics.push_error(
                    ErrorCategory::InvalidSumTypeUsage,
                    "duplicate wildcard arm",
                    Some(arm.span),
                );
                continue;
            }
            saw_wildcard = true;
            None
        } else {
            let Some(tag) = VariantTag::from_name(&arm.pattern) else {
                diagnostics.push_error(
                    ErrorCategory::InvalidSumTypeUsage,
                    format!("unknown constructor pattern '{}'", arm.pattern),
                    Some(arm.pattern_span),
                );
                continue;
            };
            if let Some(kind) = kind {
                if tag.kind() != kind {
                    diagnostics.push_error(
                        ErrorCategory::InvalidSumTypeUsage,
                        format!(
                            "pattern {} does not belong to a {} scrutinee",
                            tag.name(),
                            kind.type_name()
                        ),
                        Some(arm.pattern_span),
                    );
                    continue;
                }
            }
            Some(tag)
        };

        let payload_slots = tag.and_then(VariantTag::payload_field).map_or(0, |_| 1);
        if arm.bindings.len() > payload_slots {
            let pattern = match tag {
                Some(tag) => tag.name(),
                None => "_",
            };
            diagnostics.push_error(
                ErrorCategory::InvalidSumTypeUsage,
                format!(
                    "pattern {} binds {} value(s) but carries {}",
                    pattern,
                    arm.bindings.len(),
                    payload_slots
                ),
                Some(arm.pattern_span),
            );
            continue;
        }

        let guard = match arm.guard {
            Some(guard) => {
                match validate_guard(builder, engine, &guard.text, guard.span) {
                    Ok(expression) => Some(expression),
                    Err((message, position)) => {
                        diagnostics.push_error(
                            ErrorCategory::InvalidGuard,
                            message,
                            Some(position),
                        );
                        continue;
                    }
                }
            }
            None => None,
        };

        compiled.push(CompiledArm {
            tag,
            binding: arm.bindings.into_iter().next(),
            guard,
            body: arm.body,
            span: arm.span,
        });
    }

    compiled
}

/// Parses guard text as a host expression and, when the oracle has an
/// opinion about the parsed expression, insists it is exactly boolean.
/// Outer-scope identifiers are not checked here; scope analysis belongs
/// to the host's own compilation.
fn validate_guard(
    builder: &mut AstBuilder,
    engine: &InferenceEngine<'_>,
    text: &str,
    span: SourceSpan,
) -> Result<Expression, (String, SourceSpan)> {
    let expression = parse_guard_expression(text, span.line, span.column, builder)
        .map_err(|error| {
            (
                format!("malformed guard expression: {}", error.message),
                SourceSpan::single_point(error.line, error.column),
            )
        })?;

    if let Some(oracle) = engine.oracle() {
        if let Some(ty) = oracle.type_of(expression.span) {
            if !oracle.is_boolean(&ty) {
                return Err((
                    format!("guard must be a boolean expression, found {}", ty.describe()),
                    expression.span,
                ));
            }
        }
    }

    Ok(expression)
}

/// Covered iff every declared variant is matched by an unguarded arm or an
/// unguarded wildcard arm exists. A guarded arm may be false at runtime,
/// so it never discharges its variant.
fn check_exhaustiveness(
    diagnostics: &mut Diagnostics,
    kind: Option<SumKind>,
    scrutinee_name: Option<&str>,
    arms: &[CompiledArm],
    span: SourceSpan,
) -> bool {
    let unguarded_wildcard = arms
        .iter()
        .any(|arm| arm.tag.is_none() && arm.guard.is_none());
    if unguarded_wildcard {
        return true;
    }

    let Some(kind) = kind else {
        diagnostics.push_error_with_hint(
            ErrorCategory::NonExhaustiveMatch,
            "cannot establish coverage for a match over an unresolved scrutinee",
            Some(span),
            "add a trailing wildcard arm",
        );
        return false;
    };

    let missing: Vec<&str> = kind
        .variants()
        .iter()
        .filter(|variant| {
            !arms
                .iter()
                .any(|arm| arm.tag == Some(**variant) && arm.guard.is_none())
        })
        .map(|variant| variant.name())
        .collect();

    if missing.is_empty() {
        return true;
    }

    let subject = scrutinee_name.unwrap_or(kind.type_name());
    diagnostics.push_error_with_hint(
        ErrorCategory::NonExhaustiveMatch,
        format!(
            "match over {} does not cover {}",
            subject,
            missing.join(", ")
        ),
        Some(span),
        "cover the missing variant(s) with unguarded arms or a wildcard arm; guarded arms never count toward coverage",
    );
    false
}

fn compile_chain(
    builder: &mut AstBuilder,
    temps: &mut TempAllocator,
    diagnostics: &mut Diagnostics,
    span: SourceSpan,
    scrutinee: Expression,
    mut arms: Vec<CompiledArm>,
) -> Statement {
    // Arms below an unguarded wildcard can never be reached under
    // first-match semantics.
    if let Some(position) = arms
        .iter()
        .position(|arm| arm.tag.is_none() && arm.guard.is_none())
    {
        for dead in &arms[position + 1..] {
            diagnostics.push_warning(
                ErrorCategory::InvalidSumTypeUsage,
                "arm is unreachable: it follows a wildcard arm",
                Some(dead.span),
            );
        }
        arms.truncate(position + 1);
    }

    let temp = temps.fresh();
    let scrutinee_span = scrutinee.span;
    let capture_binding = Binding {
        name: temp.clone(),
        span: scrutinee_span,
    };
    let capture = builder.var_stmt(vec![capture_binding], None, vec![scrutinee], true);

    let mut else_branch: Option<ElseBranch> = None;
    for arm in arms.into_iter().rev() {
        let body = arm_body(builder, &temp, &arm.tag, &arm.binding, arm.body);
        match arm_condition(builder, &temp, arm.tag, arm.binding.as_ref(), arm.guard) {
            Some(condition) => {
                let statement = builder.if_stmt(condition, body, else_branch.take());
                else_branch = Some(ElseBranch::If(Box::new(statement)));
            }
            None => {
                // Unguarded wildcard: the trailing `else`.
                else_branch = Some(ElseBranch::Block(body));
            }
        }
    }

    let mut statements = vec![capture];
    match else_branch {
        Some(ElseBranch::If(head)) => statements.push(*head),
        Some(ElseBranch::Block(block)) => statements.extend(block.statements),
        None => {}
    }

    let mut lowered = builder.block_stmt(Block::new(statements));
    lowered.span = span;
    lowered
}

/// `__tmpN.tag == Tag`, `&&`-combined with the guard when one exists.
/// The guard lands to the right of the tag test, so it only evaluates
/// once the pattern has matched and its bindings are safe to dereference.
fn arm_condition(
    builder: &mut AstBuilder,
    temp: &str,
    tag: Option<VariantTag>,
    binding: Option<&Binding>,
    guard: Option<Expression>,
) -> Option<Expression> {
    let guard = guard.map(|mut expression| {
        if let (Some(tag), Some(binding)) = (tag, binding) {
            if let Some(field) = tag.payload_field() {
                substitute_binding(builder, &mut expression, &binding.name, temp, field);
            }
        }
        expression
    });

    let tag_test = tag.map(|tag| {
        let object = builder.ident(temp, SourceSpan::default());
        let lhs = builder.selector(object, "tag");
        let rhs = builder.ident(tag.name(), SourceSpan::default());
        builder.binary(BinaryOp::Eq, lhs, rhs)
    });

    match (tag_test, guard) {
        (Some(tag_test), Some(guard)) => {
            let grouped = builder.grouping(guard);
            Some(builder.binary(BinaryOp::And, tag_test, grouped))
        }
        (Some(tag_test), None) => Some(tag_test),
        (None, Some(guard)) => Some(guard),
        (None, None) => None,
    }
}

/// Opens the arm body with the payload binding (`x := *__tmpN.ok`) before
/// the user statements.
fn arm_body(
    builder: &mut AstBuilder,
    temp: &str,
    tag: &Option<VariantTag>,
    binding: &Option<Binding>,
    body: Block,
) -> Block {
    let (Some(tag), Some(binding)) = (tag, binding) else {
        return body;
    };
    let Some(field) = tag.payload_field() else {
        return body;
    };

    let object = builder.ident(temp, SourceSpan::default());
    let selector = builder.selector(object, field);
    let payload = builder.unary(UnaryOp::Deref, selector);
    let declare = builder.var_stmt(vec![binding.clone()], None, vec![payload], true);

    let mut statements = vec![declare];
    statements.extend(body.statements);
    Block::new(statements)
}

/// Replaces references to the pattern binding inside a guard with a
/// parenthesized dereference of the captured payload, so the guard can
/// run before the binding declaration exists.
fn substitute_binding(
    builder: &mut AstBuilder,
    expression: &mut Expression,
    name: &str,
    temp: &str,
    field: &str,
) {
    let replace = match &expression.kind {
        ExpressionKind::Identifier(ident) => ident.name == name,
        _ => false,
    };
    if replace {
        let object = builder.ident(temp, expression.span);
        let selector = builder.selector(object, field);
        let deref = builder.unary(UnaryOp::Deref, selector);
        let grouped = builder.grouping(deref);
        expression.kind = grouped.kind;
        return;
    }

    match &mut expression.kind {
        ExpressionKind::Identifier(_) | ExpressionKind::Literal(_) => {}
        ExpressionKind::Composite(composite) => {
            for composite_field in &mut composite.fields {
                substitute_binding(builder, &mut composite_field.value, name, temp, field);
            }
        }
        ExpressionKind::Unary(unary) => {
            substitute_binding(builder, &mut unary.operand, name, temp, field);
        }
        ExpressionKind::Binary(binary) => {
            substitute_binding(builder, &mut binary.left, name, temp, field);
            substitute_binding(builder, &mut binary.right, name, temp, field);
        }
        ExpressionKind::Call(call) => {
            substitute_binding(builder, &mut call.callee, name, temp, field);
            for arg in &mut call.args {
                substitute_binding(builder, arg, name, temp, field);
            }
        }
        ExpressionKind::Selector(selector) => {
            substitute_binding(builder, &mut selector.object, name, temp, field);
        }
        ExpressionKind::Index(indexed) => {
            substitute_binding(builder, &mut indexed.object, name, temp, field);
            substitute_binding(builder, &mut indexed.index, name, temp, field);
        }
        ExpressionKind::Grouping(inner) => {
            substitute_binding(builder, inner, name, temp, field);
        }
        ExpressionKind::FuncLit(_) => {}
    }
}
