use crate::addressable::{reference_to, TempAllocator};
use crate::ast::{
    AstBuilder, BinaryOp, Block, CompositeField, ConstDecl, ConstSpec, Decl, Expression,
    ExpressionKind, FieldDef, FuncDecl, Literal, Param, Receiver, SourceSpan, Statement,
    TypeDecl, TypeDeclKind, TypeExpr, TypeExprKind, UnaryOp,
};
use crate::diagnostics::{Diagnostics, ErrorCategory};
use crate::infer::InferenceEngine;
use crate::types::{type_to_expr, InstanceRegistry, SumKind, SumTypeInstance, Type, VariantTag};

/// How the syntactic context of a constructor resolved.
enum ContextResolution {
    Absent,
    Mismatch(Type),
    Instance(SumTypeInstance),
}

fn resolve_context(
    engine: &InferenceEngine<'_>,
    registry: &InstanceRegistry,
    id: crate::ast::NodeId,
    kind: SumKind,
) -> ContextResolution {
    let Some(ty) = engine.infer_from_context(id) else {
        return ContextResolution::Absent;
    };
    if let Type::Named(name) = &ty {
        if let Some(instance) = registry.lookup(name) {
            if instance.kind == kind {
                return ContextResolution::Instance(instance.clone());
            }
        }
    }
    ContextResolution::Mismatch(ty)
}

/// Rewrites one constructor use in place. `Ok(v)`/`Some(v)` carry their
/// payload's type; `Err(e)` and `None` are value-less and live entirely
/// off context inference. On any failure the node is left untransformed
/// and the problem goes to the sink; invalid output is never emitted.
pub fn rewrite_constructor(
    builder: &mut AstBuilder,
    temps: &mut TempAllocator,
    registry: &mut InstanceRegistry,
    engine: &InferenceEngine<'_>,
    diagnostics: &mut Diagnostics,
    expression: &mut Expression,
    tag: VariantTag,
) {
    let kind = tag.kind();
    let span = expression.span;

    if let ExpressionKind::Call(call) = &expression.kind {
        if call.args.len() != 1 {
            diagnostics.push_error(
                ErrorCategory::InvalidSumTypeUsage,
                format!(
                    "{} expects exactly one argument, found {}",
                    tag.name(),
                    call.args.len()
                ),
                Some(span),
            );
            return;
        }
    }

    let context = resolve_context(engine, registry, expression.id, kind);

    let type_params = match tag {
        VariantTag::Ok | VariantTag::Some => {
            match context {
                ContextResolution::Instance(instance) => instance.type_params,
                // A payload-carrying constructor never requires its
                // context; a foreign one is the host checker's to flag.
                ContextResolution::Absent | ContextResolution::Mismatch(_) => {
                    let payload_ty = match &expression.kind {
                        ExpressionKind::Call(call) => engine.infer(&call.args[0]),
                        _ => None,
                    };
                    let Some(payload_ty) = payload_ty else {
                        diagnostics.push_error_with_hint(
                            ErrorCategory::TypeInferenceFailure,
                            format!("cannot infer the payload type of {}(...)", tag.name()),
                            Some(span),
                            "annotate the destination or pass a value with a known type",
                        );
                        return;
                    };
                    match kind {
                        SumKind::Result => vec![payload_ty.defaulted(), Type::Error],
                        SumKind::Option => vec![payload_ty.defaulted()],
                    }
                }
            }
        }
        VariantTag::Err | VariantTag::None => match context {
            ContextResolution::Instance(instance) => instance.type_params,
            ContextResolution::Absent => {
                let shape = match tag {
                    VariantTag::Err => "Err(...)",
                    _ => "None",
                };
                diagnostics.push_error_with_hint(
                    ErrorCategory::TypeInferenceFailure,
                    format!(
                        "cannot infer the {} type of {} from its context",
                        kind.type_name(),
                        shape
                    ),
                    Some(span),
                    format!(
                        "annotate the destination with the intended {} type",
                        kind.type_name()
                    ),
                );
                return;
            }
            ContextResolution::Mismatch(ty) => {
                let shape = match tag {
                    VariantTag::Err => "Err(...)",
                    _ => "None",
                };
                diagnostics.push_error_with_hint(
                    ErrorCategory::InvalidSumTypeUsage,
                    format!(
                        "{} used where a value of type {} is expected",
                        shape,
                        ty.describe()
                    ),
                    Some(span),
                    format!(
                        "{} can only appear where a {} instance is expected",
                        shape,
                        kind.type_name()
                    ),
                );
                return;
            }
        },
    };

    let generated_name = registry.register(kind, type_params.clone());

    let mut fields = vec![CompositeField {
        name: "tag".to_string(),
        value: builder.ident(tag.name(), span),
    }];

    if let Some(field) = tag.payload_field() {
        let payload_index = tag
            .payload_param_index()
            .expect("payload field implies payload parameter");
        let old_kind = std::mem::replace(
            &mut expression.kind,
            ExpressionKind::Literal(Literal::Nil),
        );
        let payload = match old_kind {
            ExpressionKind::Call(mut call) => call.args.remove(0),
            other => {
                // Arity was validated above; a payload variant is always
                // a call at this point.
                expression.kind = other;
                return;
            }
        };
        let hint = type_to_expr(builder, &type_params[payload_index]);
        let reference = reference_to(builder, temps, payload, hint);
        fields.push(CompositeField {
            name: field.to_string(),
            value: reference,
        });
    }

    let ty = builder.type_expr(span, TypeExprKind::Name(generated_name));
    expression.kind = ExpressionKind::Composite(crate::ast::CompositeLiteral { ty, fields });
}

/// Once-per-unit tag type and constants for a kind:
///
/// ```go
/// type resultTag uint8
///
/// const (
///     Ok resultTag = iota
///     Err
/// )
/// ```
pub fn emit_tag_decls(builder: &mut AstBuilder, kind: SumKind) -> Vec<Decl> {
    let tag_type = TypeDecl {
        id: builder.next_id(),
        name: kind.tag_type_name().to_string(),
        kind: TypeDeclKind::Defined(builder.type_name("uint8")),
        span: SourceSpan::default(),
    };

    let mut specs = Vec::new();
    for (position, variant) in kind.variants().iter().enumerate() {
        if position == 0 {
            let annotation = builder.type_name(kind.tag_type_name());
            let iota = builder.ident("iota", SourceSpan::default());
            specs.push(ConstSpec {
                name: variant.name().to_string(),
                annotation: Some(annotation),
                value: Some(iota),
            });
        } else {
            specs.push(ConstSpec {
                name: variant.name().to_string(),
                annotation: None,
                value: None,
            });
        }
    }
    let constants = ConstDecl {
        id: builder.next_id(),
        specs,
        span: SourceSpan::default(),
    };

    vec![Decl::Type(tag_type), Decl::Const(constants)]
}

/// Struct declaration plus the full method set for one instance.
pub fn emit_instance_decls(builder: &mut AstBuilder, instance: &SumTypeInstance) -> Vec<Decl> {
    let mut decls = vec![Decl::Type(instance_struct(builder, instance))];
    match instance.kind {
        SumKind::Result => emit_result_methods(builder, instance, &mut decls),
        SumKind::Option => emit_option_methods(builder, instance, &mut decls),
    }
    decls
}

fn instance_struct(builder: &mut AstBuilder, instance: &SumTypeInstance) -> TypeDecl {
    let mut fields = vec![FieldDef {
        name: "tag".to_string(),
        ty: builder.type_name(instance.kind.tag_type_name()),
        span: SourceSpan::default(),
    }];
    for variant in instance.kind.variants() {
        let (Some(field), Some(index)) = (variant.payload_field(), variant.payload_param_index())
        else {
            continue;
        };
        let payload = type_to_expr(builder, &instance.type_params[index]);
        fields.push(FieldDef {
            name: field.to_string(),
            ty: builder.type_pointer(payload),
            span: SourceSpan::default(),
        });
    }
    TypeDecl {
        id: builder.next_id(),
        name: instance.generated_name.clone(),
        kind: TypeDeclKind::Struct(fields),
        span: SourceSpan::default(),
    }
}

fn method(
    builder: &mut AstBuilder,
    instance: &SumTypeInstance,
    receiver: &str,
    name: &str,
    params: Vec<Param>,
    results: Vec<TypeExpr>,
    body: Block,
) -> Decl {
    let receiver_ty = builder.type_name(&instance.generated_name);
    Decl::Func(FuncDecl {
        id: builder.next_id(),
        name: name.to_string(),
        name_span: SourceSpan::default(),
        receiver: Some(Receiver {
            name: receiver.to_string(),
            ty: receiver_ty,
        }),
        params,
        variadic: false,
        results,
        body,
        span: SourceSpan::default(),
    })
}

fn param(name: &str, ty: TypeExpr) -> Param {
    Param {
        name: name.to_string(),
        span: SourceSpan::default(),
        ty,
    }
}

fn recv_field(builder: &mut AstBuilder, receiver: &str, field: &str) -> Expression {
    let object = builder.ident(receiver, SourceSpan::default());
    builder.selector(object, field)
}

fn tag_is(builder: &mut AstBuilder, receiver: &str, tag: VariantTag, equal: bool) -> Expression {
    let lhs = recv_field(builder, receiver, "tag");
    let rhs = builder.ident(tag.name(), SourceSpan::default());
    let op = if equal { BinaryOp::Eq } else { BinaryOp::NotEq };
    builder.binary(op, lhs, rhs)
}

fn panic_stmt(builder: &mut AstBuilder, message: &str) -> Statement {
    let callee = builder.ident("panic", SourceSpan::default());
    let argument = builder.string(message);
    let call = builder.call(callee, vec![argument]);
    builder.expr_stmt(call)
}

/// `if recv.field == nil { panic("name: Tag tag with nil payload") }`
///
/// A tag with a missing payload is a corrupted construction; the fault
/// is internal, never a user error.
fn nil_payload_guard(
    builder: &mut AstBuilder,
    instance: &SumTypeInstance,
    receiver: &str,
    tag: VariantTag,
) -> Statement {
    let field = tag
        .payload_field()
        .expect("nil guard is only emitted for payload variants");
    let lhs = recv_field(builder, receiver, field);
    let nil = builder.expr(SourceSpan::default(), ExpressionKind::Literal(Literal::Nil));
    let cond = builder.binary(BinaryOp::Eq, lhs, nil);
    let message = format!(
        "{}: {} tag with nil payload",
        instance.generated_name,
        tag.name()
    );
    let fault = panic_stmt(builder, &message);
    builder.if_stmt(cond, Block::new(vec![fault]), None)
}

fn deref_payload(builder: &mut AstBuilder, receiver: &str, tag: VariantTag) -> Expression {
    let field = tag
        .payload_field()
        .expect("payload deref is only emitted for payload variants");
    let selector = recv_field(builder, receiver, field);
    builder.unary(UnaryOp::Deref, selector)
}

fn return_recv(builder: &mut AstBuilder, receiver: &str) -> Statement {
    let recv = builder.ident(receiver, SourceSpan::default());
    builder.ret(vec![recv])
}

/// `struct { tag <tagType>; <fields...> }` used by the map combinators.
/// Structural rather than nominal: the host has no generics, so a mapped
/// payload cannot name a new instantiation; callers downcast instead.
fn mapped_struct(
    builder: &mut AstBuilder,
    instance: &SumTypeInstance,
    transformed: VariantTag,
) -> TypeExpr {
    let mut fields = vec![FieldDef {
        name: "tag".to_string(),
        ty: builder.type_name(instance.kind.tag_type_name()),
        span: SourceSpan::default(),
    }];
    for variant in instance.kind.variants() {
        let (Some(field), Some(index)) = (variant.payload_field(), variant.payload_param_index())
        else {
            continue;
        };
        let payload = if *variant == transformed {
            builder.type_any()
        } else {
            type_to_expr(builder, &instance.type_params[index])
        };
        fields.push(FieldDef {
            name: field.to_string(),
            ty: builder.type_pointer(payload),
            span: SourceSpan::default(),
        });
    }
    builder.type_struct(fields)
}

/// Shared body of `mapOk`/`mapErr`/`mapSome`: copy the tag, transform the
/// matched variant's payload, propagate the other variant untouched.
fn map_method(
    builder: &mut AstBuilder,
    instance: &SumTypeInstance,
    receiver: &str,
    name: &str,
    transformed: VariantTag,
) -> Decl {
    let payload_index = transformed
        .payload_param_index()
        .expect("map combinators transform payload variants");
    let payload_ty = type_to_expr(builder, &instance.type_params[payload_index]);
    let any = builder.type_any();
    let transform_ty = builder.type_func(vec![payload_ty], vec![any]);
    let out_ty = mapped_struct(builder, instance, transformed);

    let mut statements = Vec::new();

    // var mapped struct{...}
    let out_binding = crate::ast::Binding {
        name: "mapped".to_string(),
        span: SourceSpan::default(),
    };
    statements.push(builder.var_stmt(vec![out_binding], Some(out_ty.clone()), Vec::new(), false));

    // mapped.tag = recv.tag
    let out_tag = recv_field(builder, "mapped", "tag");
    let recv_tag = recv_field(builder, receiver, "tag");
    statements.push(builder.assign(vec![out_tag], vec![recv_tag]));

    // if recv.tag != Transformed { copy other payloads; return mapped }
    let mut passthrough = Vec::new();
    for variant in instance.kind.variants() {
        let Some(field) = variant.payload_field() else {
            continue;
        };
        if *variant == transformed {
            continue;
        }
        let out_field = recv_field(builder, "mapped", field);
        let recv_payload = recv_field(builder, receiver, field);
        passthrough.push(builder.assign(vec![out_field], vec![recv_payload]));
    }
    let out_ident = builder.ident("mapped", SourceSpan::default());
    passthrough.push(builder.ret(vec![out_ident]));
    let other_tag = tag_is(builder, receiver, transformed, false);
    statements.push(builder.if_stmt(other_tag, Block::new(passthrough), None));

    // nil guard, transform, store, return
    statements.push(nil_payload_guard(builder, instance, receiver, transformed));
    let payload = deref_payload(builder, receiver, transformed);
    let transform_ref = builder.ident("transform", SourceSpan::default());
    let call = builder.call(transform_ref, vec![payload]);
    let value_binding = crate::ast::Binding {
        name: "value".to_string(),
        span: SourceSpan::default(),
    };
    statements.push(builder.var_stmt(vec![value_binding], None, vec![call], true));

    let out_field = recv_field(
        builder,
        "mapped",
        transformed.payload_field().expect("payload variant"),
    );
    let value_ident = builder.ident("value", SourceSpan::default());
    let address = builder.unary(UnaryOp::Addr, value_ident);
    statements.push(builder.assign(vec![out_field], vec![address]));

    let out_ident = builder.ident("mapped", SourceSpan::default());
    statements.push(builder.ret(vec![out_ident]));

    let transform_param = param("transform", transform_ty);
    method(
        builder,
        instance,
        receiver,
        name,
        vec![transform_param],
        vec![out_ty],
        Block::new(statements),
    )
}

fn emit_result_methods(
    builder: &mut AstBuilder,
    instance: &SumTypeInstance,
    decls: &mut Vec<Decl>,
) {
    let recv = "r";
    let ok_ty = instance.type_params[0].clone();
    let err_ty = instance.type_params[1].clone();
    let self_name = instance.generated_name.clone();

    // isOk / isErr
    for (name, tag) in [("isOk", VariantTag::Ok), ("isErr", VariantTag::Err)] {
        let bool_ty = builder.type_name("bool");
        let test = tag_is(builder, recv, tag, true);
        let body = Block::new(vec![builder.ret(vec![test])]);
        decls.push(method(builder, instance, recv, name, Vec::new(), vec![bool_ty], body));
    }

    // unwrap
    {
        let result_ty = type_to_expr(builder, &ok_ty);
        let wrong_tag = tag_is(builder, recv, VariantTag::Ok, false);
        let fault = panic_stmt(
            builder,
            &format!("unwrap called on Err value of {self_name}"),
        );
        let tag_guard = builder.if_stmt(wrong_tag, Block::new(vec![fault]), None);
        let nil_guard = nil_payload_guard(builder, instance, recv, VariantTag::Ok);
        let payload = deref_payload(builder, recv, VariantTag::Ok);
        let give_back = builder.ret(vec![payload]);
        let body = Block::new(vec![tag_guard, nil_guard, give_back]);
        decls.push(method(builder, instance, recv, "unwrap", Vec::new(), vec![result_ty], body));
    }

    // unwrapOr
    {
        let fallback_ty = type_to_expr(builder, &ok_ty);
        let result_ty = type_to_expr(builder, &ok_ty);
        let wrong_tag = tag_is(builder, recv, VariantTag::Ok, false);
        let fallback = builder.ident("fallback", SourceSpan::default());
        let use_fallback = builder.ret(vec![fallback]);
        let tag_guard = builder.if_stmt(wrong_tag, Block::new(vec![use_fallback]), None);
        let nil_guard = nil_payload_guard(builder, instance, recv, VariantTag::Ok);
        let payload = deref_payload(builder, recv, VariantTag::Ok);
        let give_back = builder.ret(vec![payload]);
        let body = Block::new(vec![tag_guard, nil_guard, give_back]);
        let fallback_param = param("fallback", fallback_ty);
        decls.push(method(
            builder,
            instance,
            recv,
            "unwrapOr",
            vec![fallback_param],
            vec![result_ty],
            body,
        ));
    }

    // unwrapOrElse: the handler sees the error, and only runs on Err.
    {
        let err_param_ty = type_to_expr(builder, &err_ty);
        let ok_result_ty = type_to_expr(builder, &ok_ty);
        let handle_ty = builder.type_func(vec![err_param_ty], vec![ok_result_ty.clone()]);

        let is_ok = tag_is(builder, recv, VariantTag::Ok, true);
        let ok_nil_guard = nil_payload_guard(builder, instance, recv, VariantTag::Ok);
        let ok_payload = deref_payload(builder, recv, VariantTag::Ok);
        let ok_return = builder.ret(vec![ok_payload]);
        let ok_branch = builder.if_stmt(is_ok, Block::new(vec![ok_nil_guard, ok_return]), None);

        let err_nil_guard = nil_payload_guard(builder, instance, recv, VariantTag::Err);
        let err_payload = deref_payload(builder, recv, VariantTag::Err);
        let handle = builder.ident("handle", SourceSpan::default());
        let handled = builder.call(handle, vec![err_payload]);
        let err_return = builder.ret(vec![handled]);

        let body = Block::new(vec![ok_branch, err_nil_guard, err_return]);
        let handle_param = param("handle", handle_ty);
        decls.push(method(
            builder,
            instance,
            recv,
            "unwrapOrElse",
            vec![handle_param],
            vec![ok_result_ty],
            body,
        ));
    }

    decls.push(map_method(builder, instance, recv, "mapOk", VariantTag::Ok));
    decls.push(map_method(builder, instance, recv, "mapErr", VariantTag::Err));

    // andThen: monadic bind; the callee returns a full instance, so
    // chaining never double-wraps.
    {
        let ok_param_ty = type_to_expr(builder, &ok_ty);
        let self_ty = builder.type_name(&self_name);
        let next_ty = builder.type_func(vec![ok_param_ty], vec![self_ty.clone()]);
        let wrong_tag = tag_is(builder, recv, VariantTag::Ok, false);
        let short_circuit = return_recv(builder, recv);
        let tag_guard = builder.if_stmt(wrong_tag, Block::new(vec![short_circuit]), None);
        let nil_guard = nil_payload_guard(builder, instance, recv, VariantTag::Ok);
        let payload = deref_payload(builder, recv, VariantTag::Ok);
        let next = builder.ident("next", SourceSpan::default());
        let chained = builder.call(next, vec![payload]);
        let give_back = builder.ret(vec![chained]);
        let body = Block::new(vec![tag_guard, nil_guard, give_back]);
        let next_param = param("next", next_ty);
        decls.push(method(
            builder,
            instance,
            recv,
            "andThen",
            vec![next_param],
            vec![self_ty],
            body,
        ));
    }

    // orElse
    {
        let err_param_ty = type_to_expr(builder, &err_ty);
        let self_ty = builder.type_name(&self_name);
        let rescue_ty = builder.type_func(vec![err_param_ty], vec![self_ty.clone()]);
        let is_ok = tag_is(builder, recv, VariantTag::Ok, true);
        let short_circuit = return_recv(builder, recv);
        let tag_guard = builder.if_stmt(is_ok, Block::new(vec![short_circuit]), None);
        let nil_guard = nil_payload_guard(builder, instance, recv, VariantTag::Err);
        let payload = deref_payload(builder, recv, VariantTag::Err);
        let rescue = builder.ident("rescue", SourceSpan::default());
        let rescued = builder.call(rescue, vec![payload]);
        let give_back = builder.ret(vec![rescued]);
        let body = Block::new(vec![tag_guard, nil_guard, give_back]);
        let rescue_param = param("rescue", rescue_ty);
        decls.push(method(
            builder,
            instance,
            recv,
            "orElse",
            vec![rescue_param],
            vec![self_ty],
            body,
        ));
    }

    // filter: predicate plus an explicit replacement error, no implicit
    // message is ever invented.
    {
        let ok_param_ty = type_to_expr(builder, &ok_ty);
        let bool_ty = builder.type_name("bool");
        let keep_ty = builder.type_func(vec![ok_param_ty], vec![bool_ty]);
        let replacement_ty = type_to_expr(builder, &err_ty);
        let self_ty = builder.type_name(&self_name);

        let wrong_tag = tag_is(builder, recv, VariantTag::Ok, false);
        let short_circuit = return_recv(builder, recv);
        let tag_guard = builder.if_stmt(wrong_tag, Block::new(vec![short_circuit]), None);
        let nil_guard = nil_payload_guard(builder, instance, recv, VariantTag::Ok);

        let payload = deref_payload(builder, recv, VariantTag::Ok);
        let keep = builder.ident("keep", SourceSpan::default());
        let kept = builder.call(keep, vec![payload]);
        let keep_return = return_recv(builder, recv);
        let keep_branch = builder.if_stmt(kept, Block::new(vec![keep_return]), None);

        let replacement = builder.ident("replacement", SourceSpan::default());
        let replacement_ref = builder.unary(UnaryOp::Addr, replacement);
        let rejected_ty = builder.type_expr(
            SourceSpan::default(),
            TypeExprKind::Name(self_name.clone()),
        );
        let err_tag = builder.ident(VariantTag::Err.name(), SourceSpan::default());
        let rejected = builder.composite(
            rejected_ty,
            vec![
                CompositeField {
                    name: "tag".to_string(),
                    value: err_tag,
                },
                CompositeField {
                    name: "err".to_string(),
                    value: replacement_ref,
                },
            ],
        );
        let reject_return = builder.ret(vec![rejected]);

        let body = Block::new(vec![tag_guard, nil_guard, keep_branch, reject_return]);
        let keep_param = param("keep", keep_ty);
        let replacement_param = param("replacement", replacement_ty);
        decls.push(method(
            builder,
            instance,
            recv,
            "filter",
            vec![keep_param, replacement_param],
            vec![self_ty],
            body,
        ));
    }

    emit_and_or(builder, instance, recv, VariantTag::Ok, decls);
}

fn emit_option_methods(
    builder: &mut AstBuilder,
    instance: &SumTypeInstance,
    decls: &mut Vec<Decl>,
) {
    let recv = "o";
    let some_ty = instance.type_params[0].clone();
    let self_name = instance.generated_name.clone();

    for (name, tag) in [("isSome", VariantTag::Some), ("isNone", VariantTag::None)] {
        let bool_ty = builder.type_name("bool");
        let test = tag_is(builder, recv, tag, true);
        let body = Block::new(vec![builder.ret(vec![test])]);
        decls.push(method(builder, instance, recv, name, Vec::new(), vec![bool_ty], body));
    }

    // unwrap
    {
        let result_ty = type_to_expr(builder, &some_ty);
        let wrong_tag = tag_is(builder, recv, VariantTag::Some, false);
        let fault = panic_stmt(
            builder,
            &format!("unwrap called on None value of {self_name}"),
        );
        let tag_guard = builder.if_stmt(wrong_tag, Block::new(vec![fault]), None);
        let nil_guard = nil_payload_guard(builder, instance, recv, VariantTag::Some);
        let payload = deref_payload(builder, recv, VariantTag::Some);
        let give_back = builder.ret(vec![payload]);
        let body = Block::new(vec![tag_guard, nil_guard, give_back]);
        decls.push(method(builder, instance, recv, "unwrap", Vec::new(), vec![result_ty], body));
    }

    // unwrapOr
    {
        let fallback_ty = type_to_expr(builder, &some_ty);
        let result_ty = type_to_expr(builder, &some_ty);
        let wrong_tag = tag_is(builder, recv, VariantTag::Some, false);
        let fallback = builder.ident("fallback", SourceSpan::default());
        let use_fallback = builder.ret(vec![fallback]);
        let tag_guard = builder.if_stmt(wrong_tag, Block::new(vec![use_fallback]), None);
        let nil_guard = nil_payload_guard(builder, instance, recv, VariantTag::Some);
        let payload = deref_payload(builder, recv, VariantTag::Some);
        let give_back = builder.ret(vec![payload]);
        let body = Block::new(vec![tag_guard, nil_guard, give_back]);
        let fallback_param = param("fallback", fallback_ty);
        decls.push(method(
            builder,
            instance,
            recv,
            "unwrapOr",
            vec![fallback_param],
            vec![result_ty],
            body,
        ));
    }

    // unwrapOrElse: lazy, the producer only runs on None.
    {
        let result_ty = type_to_expr(builder, &some_ty);
        let produce_ty = builder.type_func(Vec::new(), vec![result_ty.clone()]);
        let is_some = tag_is(builder, recv, VariantTag::Some, true);
        let nil_guard = nil_payload_guard(builder, instance, recv, VariantTag::Some);
        let payload = deref_payload(builder, recv, VariantTag::Some);
        let some_return = builder.ret(vec![payload]);
        let some_branch = builder.if_stmt(is_some, Block::new(vec![nil_guard, some_return]), None);
        let produce = builder.ident("produce", SourceSpan::default());
        let produced = builder.call(produce, Vec::new());
        let none_return = builder.ret(vec![produced]);
        let body = Block::new(vec![some_branch, none_return]);
        let produce_param = param("produce", produce_ty);
        decls.push(method(
            builder,
            instance,
            recv,
            "unwrapOrElse",
            vec![produce_param],
            vec![result_ty],
            body,
        ));
    }

    decls.push(map_method(builder, instance, recv, "mapSome", VariantTag::Some));

    // andThen
    {
        let some_param_ty = type_to_expr(builder, &some_ty);
        let self_ty = builder.type_name(&self_name);
        let next_ty = builder.type_func(vec![some_param_ty], vec![self_ty.clone()]);
        let wrong_tag = tag_is(builder, recv, VariantTag::Some, false);
        let short_circuit = return_recv(builder, recv);
        let tag_guard = builder.if_stmt(wrong_tag, Block::new(vec![short_circuit]), None);
        let nil_guard = nil_payload_guard(builder, instance, recv, VariantTag::Some);
        let payload = deref_payload(builder, recv, VariantTag::Some);
        let next = builder.ident("next", SourceSpan::default());
        let chained = builder.call(next, vec![payload]);
        let give_back = builder.ret(vec![chained]);
        let body = Block::new(vec![tag_guard, nil_guard, give_back]);
        let next_param = param("next", next_ty);
        decls.push(method(
            builder,
            instance,
            recv,
            "andThen",
            vec![next_param],
            vec![self_ty],
            body,
        ));
    }

    // orElse
    {
        let self_ty = builder.type_name(&self_name);
        let produce_ty = builder.type_func(Vec::new(), vec![self_ty.clone()]);
        let is_some = tag_is(builder, recv, VariantTag::Some, true);
        let short_circuit = return_recv(builder, recv);
        let tag_guard = builder.if_stmt(is_some, Block::new(vec![short_circuit]), None);
        let produce = builder.ident("produce", SourceSpan::default());
        let produced = builder.call(produce, Vec::new());
        let give_back = builder.ret(vec![produced]);
        let body = Block::new(vec![tag_guard, give_back]);
        let produce_param = param("produce", produce_ty);
        decls.push(method(
            builder,
            instance,
            recv,
            "orElse",
            vec![produce_param],
            vec![self_ty],
            body,
        ));
    }

    // filter: a failing predicate degrades to None, nothing is invented.
    {
        let some_param_ty = type_to_expr(builder, &some_ty);
        let bool_ty = builder.type_name("bool");
        let keep_ty = builder.type_func(vec![some_param_ty], vec![bool_ty]);
        let self_ty = builder.type_name(&self_name);

        let wrong_tag = tag_is(builder, recv, VariantTag::Some, false);
        let short_circuit = return_recv(builder, recv);
        let tag_guard = builder.if_stmt(wrong_tag, Block::new(vec![short_circuit]), None);
        let nil_guard = nil_payload_guard(builder, instance, recv, VariantTag::Some);

        let payload = deref_payload(builder, recv, VariantTag::Some);
        let keep = builder.ident("keep", SourceSpan::default());
        let kept = builder.call(keep, vec![payload]);
        let keep_return = return_recv(builder, recv);
        let keep_branch = builder.if_stmt(kept, Block::new(vec![keep_return]), None);

        let none_ty = builder.type_expr(
            SourceSpan::default(),
            TypeExprKind::Name(self_name.clone()),
        );
        let none_tag = builder.ident(VariantTag::None.name(), SourceSpan::default());
        let none_value = builder.composite(
            none_ty,
            vec![CompositeField {
                name: "tag".to_string(),
                value: none_tag,
            }],
        );
        let none_return = builder.ret(vec![none_value]);

        let body = Block::new(vec![tag_guard, nil_guard, keep_branch, none_return]);
        let keep_param = param("keep", keep_ty);
        decls.push(method(
            builder,
            instance,
            recv,
            "filter",
            vec![keep_param],
            vec![self_ty],
            body,
        ));
    }

    emit_and_or(builder, instance, recv, VariantTag::Some, decls);
}

/// `and`/`or`: eager short-circuit combination of two same-shape values.
fn emit_and_or(
    builder: &mut AstBuilder,
    instance: &SumTypeInstance,
    recv: &str,
    success: VariantTag,
    decls: &mut Vec<Decl>,
) {
    for (name, keep_self_on_success) in [("and", false), ("or", true)] {
        let self_ty = builder.type_name(&instance.generated_name);
        let other_ty = builder.type_name(&instance.generated_name);
        let test = tag_is(builder, recv, success, keep_self_on_success);
        let short_circuit = return_recv(builder, recv);
        let tag_guard = builder.if_stmt(test, Block::new(vec![short_circuit]), None);
        let other = builder.ident("other", SourceSpan::default());
        let give_back = builder.ret(vec![other]);
        let body = Block::new(vec![tag_guard, give_back]);
        let other_param = param("other", other_ty);
        decls.push(method(
            builder,
            instance,
            recv,
            name,
            vec![other_param],
            vec![self_ty],
            body,
        ));
    }
}
