mod common;

use common::{call, source, sp, unit_with_body};
use oolong_compiler::{
    parse_guard_expression, render_expr, AstBuilder, Block, ErrorCategory, MapOracle, MatchArm,
    MatchGuard, MatchStatement, SourceSpan, StatementKind, TransformOptions, Transformer, Type,
};

#[test]
fn guards_parse_the_go_expression_subset() {
    let mut builder = AstBuilder::new();
    for text in [
        "x > 0",
        "x > 0 && ready",
        "!done || count <= limit",
        "flags&0xFF != 0",
        "strings.HasPrefix(name, \"tmp\")",
        "items[0] == 'a'",
        "(a + b) * c >= threshold",
        "*p == nil",
    ] {
        let parsed = parse_guard_expression(text, 1, 1, &mut builder);
        assert!(parsed.is_ok(), "expected '{text}' to parse: {parsed:?}");
    }
}

#[test]
fn parsing_preserves_structure_through_rendering() {
    let mut builder = AstBuilder::new();
    let parsed = parse_guard_expression("x > 0 && (a || b)", 1, 1, &mut builder)
        .expect("well-formed guard");
    assert_eq!(render_expr(&parsed), "x > 0 && (a || b)");
}

#[test]
fn malformed_guards_are_rejected_with_positions() {
    let mut builder = AstBuilder::new();

    let error = parse_guard_expression("x +", 4, 9, &mut builder)
        .expect_err("a dangling operator cannot parse");
    assert!(error.message.contains("incomplete"));
    assert_eq!(error.line, 4);

    let error = parse_guard_expression("", 4, 9, &mut builder)
        .expect_err("an empty guard cannot parse");
    assert!(error.message.contains("incomplete"));

    let error = parse_guard_expression("x > 0 extra", 4, 9, &mut builder)
        .expect_err("trailing tokens cannot parse");
    assert!(error.message.contains("trailing"));

    let error = parse_guard_expression("x = 1", 4, 9, &mut builder)
        .expect_err("assignment is not an expression");
    assert!(error.message.contains("assignment"));
}

#[test]
fn guard_positions_rebase_onto_the_arm_location() {
    let mut builder = AstBuilder::new();
    let parsed =
        parse_guard_expression("x > 0", 7, 22, &mut builder).expect("well-formed guard");
    assert_eq!(
        parsed.span,
        SourceSpan::new(7, 22, 7, 26),
        "guard spans must land in unit coordinates, not guard-local ones"
    );
}

fn guarded_match_unit(
    builder: &mut AstBuilder,
    guard_text: &str,
) -> oolong_compiler::Unit {
    let scrutinee = call(builder, "compute", 2, 11, Vec::new());
    let guarded_value = builder.int(1);
    let guarded_ret = builder.ret(vec![guarded_value]);
    let fallback_value = builder.int(2);
    let fallback_ret = builder.ret(vec![fallback_value]);
    let err_value = builder.int(3);
    let err_ret = builder.ret(vec![err_value]);

    let arms = vec![
        MatchArm {
            pattern: "Ok".to_string(),
            pattern_span: sp(3, 5),
            bindings: vec![common::binding("x", 3, 8)],
            guard: Some(MatchGuard {
                text: guard_text.to_string(),
                span: sp(3, 20),
            }),
            body: Block::new(vec![guarded_ret]),
            span: sp(3, 5),
        },
        MatchArm {
            pattern: "Ok".to_string(),
            pattern_span: sp(4, 5),
            bindings: vec![common::binding("x", 4, 8)],
            guard: None,
            body: Block::new(vec![fallback_ret]),
            span: sp(4, 5),
        },
        MatchArm {
            pattern: "Err".to_string(),
            pattern_span: sp(5, 5),
            bindings: vec![common::binding("e", 5, 8)],
            guard: None,
            body: Block::new(vec![err_ret]),
            span: sp(5, 5),
        },
    ];
    let matched = builder.stmt(
        sp(2, 5),
        StatementKind::Match(MatchStatement { scrutinee, arms }),
    );
    unit_with_body(builder, vec![matched])
}

#[test]
fn an_oracle_typed_guard_must_be_exactly_boolean() {
    let mut builder = AstBuilder::new();
    let mut unit = guarded_match_unit(&mut builder, "count");

    // "count" parses to an identifier spanning columns 20..24 of line 3.
    let mut oracle = MapOracle::new();
    oracle.insert_type(SourceSpan::new(3, 20, 3, 24), Type::Int);

    let mut transformer = Transformer::new(TransformOptions::default());
    let outcome = transformer.transform(&source(), &mut unit, &mut builder, Some(&oracle));
    assert!(outcome.is_err());

    let entries = transformer.diagnostics().entries();
    assert_eq!(entries.len(), 1, "found {entries:?}");
    assert_eq!(entries[0].category, ErrorCategory::InvalidGuard);
    assert!(
        entries[0].message.contains("boolean"),
        "got: {}",
        entries[0].message
    );
}

#[test]
fn an_untyped_guard_passes_through_for_the_host_to_check() {
    let mut builder = AstBuilder::new();
    let mut unit = guarded_match_unit(&mut builder, "outerScopeFlag");

    // No oracle fact for the guard: definedness and typing are deferred
    // to the host's own compilation.
    let oracle = MapOracle::new();
    let mut transformer = Transformer::new(TransformOptions::default());
    transformer
        .transform(&source(), &mut unit, &mut builder, Some(&oracle))
        .expect("an oracle-silent guard must be permitted");
}

#[test]
fn guard_bindings_substitute_to_payload_dereferences() {
    let mut builder = AstBuilder::new();
    let mut unit = guarded_match_unit(&mut builder, "x > 0 && x < max");

    let oracle = MapOracle::new();
    let mut transformer = Transformer::new(TransformOptions::default());
    transformer
        .transform(&source(), &mut unit, &mut builder, Some(&oracle))
        .expect("guard referencing its own binding must compile");

    let func = match &unit.decls[0] {
        oolong_compiler::Decl::Func(func) => func,
        other => panic!("expected a function declaration, found {other:?}"),
    };
    let rendered = oolong_compiler::render_stmt(&func.body.statements[0]);
    assert!(
        rendered.contains("((*__tmp0.ok) > 0 && (*__tmp0.ok) < max)"),
        "the binding must read the captured payload, the outer name must not: {rendered}"
    );
    assert!(
        rendered.contains("x := *__tmp0.ok"),
        "the body still introduces the binding: {rendered}"
    );
}
