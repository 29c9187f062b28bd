//! Property-based tests for canonical type naming, registry idempotence,
//! and addressability totality.

use proptest::prelude::*;

use oolong_compiler::{
    is_addressable, reference_to, render_expr, AstBuilder, InstanceRegistry, SourceSpan, SumKind,
    TempAllocator, Type, UnaryOp,
};

/// Mirror of the semantic type tree so strategies stay independent of the
/// crate's internals.
#[derive(Debug, Clone)]
enum TestType {
    Bool,
    Int,
    Float64,
    Str,
    Error,
    Named(String),
    Pointer(Box<TestType>),
    Slice(Box<TestType>),
    Map(Box<TestType>, Box<TestType>),
}

impl TestType {
    fn build(&self) -> Type {
        match self {
            TestType::Bool => Type::Bool,
            TestType::Int => Type::Int,
            TestType::Float64 => Type::Float64,
            TestType::Str => Type::String,
            TestType::Error => Type::Error,
            TestType::Named(name) => Type::Named(name.clone()),
            TestType::Pointer(inner) => Type::Pointer(Box::new(inner.build())),
            TestType::Slice(element) => Type::Slice(Box::new(element.build())),
            TestType::Map(key, value) => {
                Type::Map(Box::new(key.build()), Box::new(value.build()))
            }
        }
    }
}

fn leaf_type() -> impl Strategy<Value = TestType> {
    prop_oneof![
        Just(TestType::Bool),
        Just(TestType::Int),
        Just(TestType::Float64),
        Just(TestType::Str),
        Just(TestType::Error),
        "[a-z][a-z0-9]{0,6}(\\.[A-Z][A-Za-z0-9]{0,5})?".prop_map(TestType::Named),
    ]
}

fn arbitrary_type() -> impl Strategy<Value = TestType> {
    leaf_type().prop_recursive(3, 16, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|ty| TestType::Pointer(Box::new(ty))),
            inner.clone().prop_map(|ty| TestType::Slice(Box::new(ty))),
            (inner.clone(), inner)
                .prop_map(|(key, value)| TestType::Map(Box::new(key), Box::new(value))),
        ]
    })
}

/// Mirror of the expression shapes the analyzer classifies.
#[derive(Debug, Clone)]
enum TestExpr {
    Variable(String),
    IntLiteral(i64),
    StrLiteral(String),
    Call(Box<TestExpr>),
    Selector(Box<TestExpr>, String),
    Index(Box<TestExpr>),
    Deref(Box<TestExpr>),
    Negate(Box<TestExpr>),
    Group(Box<TestExpr>),
}

impl TestExpr {
    fn build(&self, builder: &mut AstBuilder) -> oolong_compiler::Expression {
        let span = SourceSpan::single_point(1, 1);
        match self {
            TestExpr::Variable(name) => builder.ident(name, span),
            TestExpr::IntLiteral(value) => builder.int(*value),
            TestExpr::StrLiteral(value) => builder.string(value),
            TestExpr::Call(callee) => {
                let callee = callee.build(builder);
                builder.call(callee, Vec::new())
            }
            TestExpr::Selector(object, field) => {
                let object = object.build(builder);
                builder.selector(object, field)
            }
            TestExpr::Index(object) => {
                let object = object.build(builder);
                let index = builder.int(0);
                builder.expr(
                    span,
                    oolong_compiler::ExpressionKind::Index(oolong_compiler::IndexExpression {
                        object: Box::new(object),
                        index: Box::new(index),
                    }),
                )
            }
            TestExpr::Deref(operand) => {
                let operand = operand.build(builder);
                builder.unary(UnaryOp::Deref, operand)
            }
            TestExpr::Negate(operand) => {
                let operand = operand.build(builder);
                builder.unary(UnaryOp::Neg, operand)
            }
            TestExpr::Group(inner) => {
                let inner = inner.build(builder);
                builder.grouping(inner)
            }
        }
    }
}

fn arbitrary_expr() -> impl Strategy<Value = TestExpr> {
    let leaf = prop_oneof![
        "[a-z][a-z0-9]{0,5}".prop_map(TestExpr::Variable),
        any::<i64>().prop_map(TestExpr::IntLiteral),
        "[a-z ]{0,8}".prop_map(TestExpr::StrLiteral),
    ];
    leaf.prop_recursive(4, 24, 2, |inner| {
        prop_oneof![
            inner.clone().prop_map(|e| TestExpr::Call(Box::new(e))),
            (inner.clone(), "[a-z][a-z0-9]{0,5}")
                .prop_map(|(e, field)| TestExpr::Selector(Box::new(e), field)),
            inner.clone().prop_map(|e| TestExpr::Index(Box::new(e))),
            inner.clone().prop_map(|e| TestExpr::Deref(Box::new(e))),
            inner.clone().prop_map(|e| TestExpr::Negate(Box::new(e))),
            inner.prop_map(|e| TestExpr::Group(Box::new(e))),
        ]
    })
}

proptest! {
    /// Canonical names are deterministic and always identifier-safe.
    #[test]
    fn canonical_names_are_identifier_safe(ty in arbitrary_type()) {
        let ty = ty.build();
        let name = ty.canonical_name();
        prop_assert_eq!(&name, &ty.canonical_name(), "encoding must be deterministic");
        prop_assert!(!name.is_empty());
        prop_assert!(
            name.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '_'),
            "'{}' contains characters unfit for an identifier",
            name
        );
        prop_assert!(
            !name.starts_with(|ch: char| ch.is_ascii_digit()),
            "'{}' cannot start an identifier",
            name
        );
    }

    /// Registering the same combination any number of times keeps exactly
    /// one instance and one name.
    #[test]
    fn registration_is_idempotent(ty in arbitrary_type(), err in arbitrary_type()) {
        let params = vec![ty.build(), err.build()];
        let mut registry = InstanceRegistry::new();
        let first = registry.register(SumKind::Result, params.clone());
        let second = registry.register(SumKind::Result, params);
        prop_assert_eq!(first.clone(), second);
        prop_assert_eq!(registry.len(), 1);
        prop_assert!(registry.lookup(&first).is_some());
    }

    /// For every expression, either it is addressable and referencing
    /// prefixes `&`, or the temporary-binding closure takes over. There is
    /// no third outcome.
    #[test]
    fn addressability_is_total(shape in arbitrary_expr()) {
        let mut builder = AstBuilder::new();
        let mut temps = TempAllocator::new();
        let expression = shape.build(&mut builder);
        let addressable = is_addressable(&expression);

        let hint = builder.type_name("int");
        let reference = reference_to(&mut builder, &mut temps, expression, hint);
        let rendered = render_expr(&reference);

        if addressable {
            prop_assert!(
                rendered.starts_with('&'),
                "addressable expressions take a direct reference: {}",
                rendered
            );
        } else {
            prop_assert!(
                rendered.starts_with("func() *int {"),
                "non-addressable expressions go through the closure: {}",
                rendered
            );
            prop_assert!(
                rendered.ends_with("}()"),
                "non-addressable expressions close the closure call: {}",
                rendered
            );
        }
    }
}
