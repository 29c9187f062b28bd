mod common;

use common::{binding, call, func_decl, sp, sum_annotation, unit_with_body};
use oolong_compiler::{
    contains_node, AstBuilder, Block, ContextIndex, InferenceEngine, MapOracle, NodeId, Signature,
    SumKind, Type, Unit,
};

#[test]
fn return_context_resolves_the_declared_result_type() {
    let mut builder = AstBuilder::new();
    let payload = builder.ident("cause", sp(2, 12));
    let constructor = call(&mut builder, "Err", 2, 8, vec![payload]);
    let target = constructor.id;
    let ret = builder.ret(vec![constructor]);
    let annotation = sum_annotation(&mut builder, SumKind::Result, &["int", "error"]);
    let decl = func_decl(&mut builder, "f", vec![annotation], Block::new(vec![ret]));
    let unit = Unit::new(vec![decl]);

    let index = ContextIndex::build(&unit);
    let oracle = MapOracle::new();
    let engine = InferenceEngine::new(Some(&oracle), &index);

    assert_eq!(
        engine.infer_from_context(target),
        Some(Type::Named("Result_int_error".to_string())),
        "return position must resolve the enclosing function's declared result"
    );
}

#[test]
fn assignment_context_matches_ordinal_position_on_the_left() {
    let mut builder = AstBuilder::new();
    let first_target = builder.ident("a", sp(3, 1));
    let second_target = builder.ident("b", sp(3, 4));
    let first_value = builder.ident("x", sp(3, 8));
    let second_value = builder.ident("y", sp(3, 11));
    let probe = second_value.id;
    let assign = builder.assign(
        vec![first_target, second_target],
        vec![first_value, second_value],
    );
    let unit = unit_with_body(&mut builder, vec![assign]);

    let index = ContextIndex::build(&unit);
    let mut oracle = MapOracle::new();
    oracle.insert_type(sp(3, 1), Type::Int);
    oracle.insert_type(sp(3, 4), Type::Named("Result_int_error".to_string()));
    let engine = InferenceEngine::new(Some(&oracle), &index);

    assert_eq!(
        engine.infer_from_context(probe),
        Some(Type::Named("Result_int_error".to_string())),
        "the second right-hand value must read the second target's type"
    );
}

#[test]
fn var_decl_context_prefers_the_explicit_annotation() {
    let mut builder = AstBuilder::new();
    let value = builder.ident("v", sp(4, 20));
    let probe = value.id;
    let name = binding("out", 4, 5);
    let annotation = sum_annotation(&mut builder, SumKind::Option, &["string"]);
    let declare = builder.var_stmt(vec![name], Some(annotation), vec![value], false);
    let unit = unit_with_body(&mut builder, vec![declare]);

    let index = ContextIndex::build(&unit);
    let oracle = MapOracle::new();
    let engine = InferenceEngine::new(Some(&oracle), &index);

    assert_eq!(
        engine.infer_from_context(probe),
        Some(Type::Named("Option_string".to_string()))
    );
}

#[test]
fn var_decl_context_falls_back_to_the_declared_variable_type() {
    let mut builder = AstBuilder::new();
    let value = builder.ident("v", sp(5, 12));
    let probe = value.id;
    let name = binding("out", 5, 5);
    let declare = builder.var_stmt(vec![name], None, vec![value], true);
    let unit = unit_with_body(&mut builder, vec![declare]);

    let index = ContextIndex::build(&unit);
    let mut oracle = MapOracle::new();
    oracle.insert_type(sp(5, 5), Type::Named("Option_int".to_string()));
    let engine = InferenceEngine::new(Some(&oracle), &index);

    assert_eq!(
        engine.infer_from_context(probe),
        Some(Type::Named("Option_int".to_string()))
    );
}

#[test]
fn call_argument_context_reads_the_parameter_at_the_ordinal() {
    let mut builder = AstBuilder::new();
    let first = builder.ident("a", sp(6, 10));
    let second = builder.ident("b", sp(6, 13));
    let probe = second.id;
    let invocation = call(&mut builder, "store", 6, 4, vec![first, second]);
    let statement = builder.expr_stmt(invocation);
    let unit = unit_with_body(&mut builder, vec![statement]);

    let index = ContextIndex::build(&unit);
    let mut oracle = MapOracle::new();
    oracle.insert_signature(
        sp(6, 4),
        Signature {
            params: vec![Type::Int, Type::Named("Result_int_error".to_string())],
            variadic: false,
            results: Vec::new(),
        },
    );
    let engine = InferenceEngine::new(Some(&oracle), &index);

    assert_eq!(
        engine.infer_from_context(probe),
        Some(Type::Named("Result_int_error".to_string()))
    );
}

#[test]
fn variadic_call_arguments_resolve_to_the_element_type() {
    let mut builder = AstBuilder::new();
    let first = builder.ident("prefix", sp(7, 9));
    let second = builder.ident("a", sp(7, 17));
    let third = builder.ident("b", sp(7, 20));
    let past_last = third.id;
    let invocation = call(&mut builder, "join", 7, 4, vec![first, second, third]);
    let statement = builder.expr_stmt(invocation);
    let unit = unit_with_body(&mut builder, vec![statement]);

    let index = ContextIndex::build(&unit);
    let mut oracle = MapOracle::new();
    oracle.insert_signature(
        sp(7, 4),
        Signature {
            params: vec![Type::String, Type::Slice(Box::new(Type::Int))],
            variadic: true,
            results: vec![Type::String],
        },
    );
    let engine = InferenceEngine::new(Some(&oracle), &index);

    assert_eq!(
        engine.infer_from_context(past_last),
        Some(Type::Int),
        "positions at or past a variadic parameter take the element type, not the slice"
    );
}

#[test]
fn call_context_unwraps_one_level_of_named_function_type() {
    let mut builder = AstBuilder::new();
    let argument = builder.ident("req", sp(8, 11));
    let probe = argument.id;
    let invocation = call(&mut builder, "handle", 8, 4, vec![argument]);
    let statement = builder.expr_stmt(invocation);
    let unit = unit_with_body(&mut builder, vec![statement]);

    let index = ContextIndex::build(&unit);
    let mut oracle = MapOracle::new();
    oracle.insert_type(sp(8, 4), Type::Named("HandlerFunc".to_string()));
    oracle.insert_underlying(
        "HandlerFunc",
        Type::Func(Signature {
            params: vec![Type::Named("Request".to_string())],
            variadic: false,
            results: Vec::new(),
        }),
    );
    let engine = InferenceEngine::new(Some(&oracle), &index);

    assert_eq!(
        engine.infer_from_context(probe),
        Some(Type::Named("Request".to_string()))
    );
}

#[test]
fn the_walk_climbs_through_grouping_to_the_nearest_site() {
    let mut builder = AstBuilder::new();
    let target = builder.ident("out", sp(9, 1));
    let inner = builder.ident("v", sp(9, 8));
    let probe = inner.id;
    let grouped = builder.grouping(inner);
    let assign = builder.assign(vec![target], vec![grouped]);
    let unit = unit_with_body(&mut builder, vec![assign]);

    let index = ContextIndex::build(&unit);
    let mut oracle = MapOracle::new();
    oracle.insert_type(sp(9, 1), Type::String);
    let engine = InferenceEngine::new(Some(&oracle), &index);

    assert_eq!(engine.infer_from_context(probe), Some(Type::String));
}

#[test]
fn without_an_oracle_every_context_kind_is_absent() {
    let mut builder = AstBuilder::new();

    // Annotated var-decl: syntactically resolvable, still refused.
    let value = builder.ident("v", sp(2, 20));
    let annotated_probe = value.id;
    let name = binding("out", 2, 5);
    let annotation = sum_annotation(&mut builder, SumKind::Result, &["int", "error"]);
    let declare = builder.var_stmt(vec![name], Some(annotation), vec![value], false);

    // Return inside the same function.
    let returned = builder.ident("w", sp(3, 8));
    let return_probe = returned.id;
    let ret = builder.ret(vec![returned]);

    let result_annotation = sum_annotation(&mut builder, SumKind::Result, &["int", "error"]);
    let decl = func_decl(
        &mut builder,
        "f",
        vec![result_annotation],
        Block::new(vec![declare, ret]),
    );
    let unit = Unit::new(vec![decl]);

    let index = ContextIndex::build(&unit);
    let engine = InferenceEngine::new(None, &index);

    assert_eq!(
        engine.infer_from_context(annotated_probe),
        None,
        "context inference must refuse to guess without a type checker"
    );
    assert_eq!(engine.infer_from_context(return_probe), None);
}

#[test]
fn contains_node_finds_nested_nodes_and_rejects_foreign_ones() {
    let mut builder = AstBuilder::new();
    let inner = builder.ident("x", sp(1, 10));
    let needle = inner.id;
    let deref = builder.unary(oolong_compiler::UnaryOp::Deref, inner);
    let outer = call(&mut builder, "f", 1, 1, vec![deref]);
    let unrelated = builder.ident("y", sp(2, 1));

    assert!(contains_node(&outer, needle));
    assert!(!contains_node(&outer, unrelated.id));
    assert!(!contains_node(&unrelated, NodeId(9999)));
}
