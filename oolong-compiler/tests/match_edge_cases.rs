mod common;

use common::{binding, call, sp};
use oolong_compiler::{
    compile_match, AstBuilder, Block, ContextIndex, DiagnosticLevel, Diagnostics, ErrorCategory,
    InferenceEngine, InstanceRegistry, MatchArm, MatchGuard, MatchStatement, Statement,
    TempAllocator, Unit,
};

fn arm(
    builder: &mut AstBuilder,
    pattern: &str,
    line: usize,
    bindings: &[&str],
    guard: Option<&str>,
    body_value: i64,
) -> MatchArm {
    let value = builder.int(body_value);
    let ret = builder.ret(vec![value]);
    MatchArm {
        pattern: pattern.to_string(),
        pattern_span: sp(line, 5),
        bindings: bindings.iter().map(|name| binding(name, line, 8)).collect(),
        guard: guard.map(|text| MatchGuard {
            text: text.to_string(),
            span: sp(line, 20),
        }),
        body: Block::new(vec![ret]),
        span: sp(line, 5),
    }
}

fn compile(
    builder: &mut AstBuilder,
    diagnostics: &mut Diagnostics,
    arms: Vec<MatchArm>,
) -> Option<Statement> {
    let unit = Unit::default();
    let index = ContextIndex::build(&unit);
    let engine = InferenceEngine::new(None, &index);
    let registry = InstanceRegistry::new();
    let mut temps = TempAllocator::new();
    let scrutinee = call(builder, "compute", 2, 11, Vec::new());
    compile_match(
        builder,
        &mut temps,
        &registry,
        &engine,
        diagnostics,
        sp(2, 5),
        MatchStatement { scrutinee, arms },
    )
}

#[test]
fn a_wildcard_arm_completes_coverage() {
    let mut builder = AstBuilder::new();
    let mut diagnostics = Diagnostics::new();
    let arms = vec![
        arm(&mut builder, "Ok", 3, &["x"], None, 1),
        arm(&mut builder, "_", 4, &[], None, 2),
    ];
    let lowered = compile(&mut builder, &mut diagnostics, arms);
    assert!(lowered.is_some(), "Ok plus wildcard covers a Result");
    assert!(diagnostics.is_empty(), "found {:?}", diagnostics.entries());

    let rendered = oolong_compiler::render_stmt(&lowered.unwrap());
    assert!(rendered.contains("if __tmp0.tag == Ok {"));
    assert!(rendered.contains("} else {"), "wildcard compiles to the trailing else: {rendered}");
}

#[test]
fn a_guarded_wildcard_does_not_complete_coverage() {
    let mut builder = AstBuilder::new();
    let mut diagnostics = Diagnostics::new();
    let arms = vec![
        arm(&mut builder, "Ok", 3, &["x"], None, 1),
        arm(&mut builder, "_", 4, &[], Some("flag"), 2),
    ];
    let lowered = compile(&mut builder, &mut diagnostics, arms);
    assert!(lowered.is_none());
    assert_eq!(
        diagnostics.entries()[0].category,
        ErrorCategory::NonExhaustiveMatch
    );
    assert!(
        diagnostics.entries()[0].message.contains("Err"),
        "the uncovered variant must be named: {}",
        diagnostics.entries()[0].message
    );
}

#[test]
fn arms_after_a_wildcard_are_flagged_unreachable_but_not_fatal() {
    let mut builder = AstBuilder::new();
    let mut diagnostics = Diagnostics::new();
    let arms = vec![
        arm(&mut builder, "_", 3, &[], None, 1),
        arm(&mut builder, "Ok", 4, &["x"], None, 2),
    ];
    let lowered = compile(&mut builder, &mut diagnostics, arms);
    assert!(lowered.is_some());
    assert!(!diagnostics.has_errors(), "unreachability is advisory");
    assert_eq!(diagnostics.entries().len(), 1);
    assert_eq!(diagnostics.entries()[0].level, DiagnosticLevel::Warning);
    assert!(diagnostics.entries()[0].message.contains("unreachable"));

    let rendered = oolong_compiler::render_stmt(&lowered.unwrap());
    assert!(
        !rendered.contains("return 2"),
        "the dead arm must not be emitted: {rendered}"
    );
}

#[test]
fn mixing_result_and_option_constructors_is_rejected() {
    let mut builder = AstBuilder::new();
    let mut diagnostics = Diagnostics::new();
    let arms = vec![
        arm(&mut builder, "Ok", 3, &["x"], None, 1),
        arm(&mut builder, "None", 4, &[], None, 2),
    ];
    let lowered = compile(&mut builder, &mut diagnostics, arms);
    assert!(lowered.is_none());
    assert_eq!(
        diagnostics.entries()[0].category,
        ErrorCategory::InvalidSumTypeUsage
    );
}

#[test]
fn an_unknown_constructor_pattern_drops_only_its_arm() {
    let mut builder = AstBuilder::new();
    let mut diagnostics = Diagnostics::new();
    let arms = vec![
        arm(&mut builder, "Oops", 3, &[], None, 1),
        arm(&mut builder, "_", 4, &[], None, 2),
    ];
    let lowered = compile(&mut builder, &mut diagnostics, arms);
    assert!(lowered.is_some(), "the wildcard still compiles");
    assert_eq!(diagnostics.entries().len(), 1);
    assert!(diagnostics.entries()[0]
        .message
        .contains("unknown constructor pattern 'Oops'"));
}

#[test]
fn a_duplicate_wildcard_is_rejected_and_the_first_one_stands() {
    let mut builder = AstBuilder::new();
    let mut diagnostics = Diagnostics::new();
    let arms = vec![
        arm(&mut builder, "Err", 3, &["e"], None, 1),
        arm(&mut builder, "_", 4, &[], None, 2),
        arm(&mut builder, "_", 5, &[], None, 3),
    ];
    let lowered = compile(&mut builder, &mut diagnostics, arms);
    assert!(lowered.is_some());
    let errors: Vec<_> = diagnostics
        .entries()
        .iter()
        .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("duplicate wildcard"));
}

#[test]
fn bindings_on_a_payload_less_variant_drop_the_arm() {
    let mut builder = AstBuilder::new();
    let mut diagnostics = Diagnostics::new();
    let arms = vec![
        arm(&mut builder, "Some", 3, &["v"], None, 1),
        arm(&mut builder, "None", 4, &["v"], None, 2),
    ];
    let lowered = compile(&mut builder, &mut diagnostics, arms);
    assert!(
        lowered.is_none(),
        "dropping the None arm leaves the match non-exhaustive"
    );
    let categories: Vec<ErrorCategory> = diagnostics
        .entries()
        .iter()
        .map(|diagnostic| diagnostic.category)
        .collect();
    assert!(categories.contains(&ErrorCategory::InvalidSumTypeUsage));
    assert!(categories.contains(&ErrorCategory::NonExhaustiveMatch));
}

#[test]
fn scrutinee_capture_evaluates_the_expression_once() {
    let mut builder = AstBuilder::new();
    let mut diagnostics = Diagnostics::new();
    let arms = vec![
        arm(&mut builder, "Some", 3, &["v"], None, 1),
        arm(&mut builder, "None", 4, &[], None, 2),
    ];
    let lowered = compile(&mut builder, &mut diagnostics, arms).expect("exhaustive");
    let rendered = oolong_compiler::render_stmt(&lowered);
    assert_eq!(
        rendered.matches("compute()").count(),
        1,
        "the scrutinee must be captured into a temporary exactly once: {rendered}"
    );
    assert!(rendered.contains("__tmp0 := compute()"));
    assert!(rendered.contains("v := *__tmp0.some"));
}
