#![allow(dead_code)]

use std::path::PathBuf;

use oolong_compiler::{
    AstBuilder, Binding, Block, Decl, Expression, FuncDecl, SourceFile, SourceId, SourceSpan,
    SumKind, TypeExpr, TypeExprKind, Unit,
};

pub fn sp(line: usize, column: usize) -> SourceSpan {
    SourceSpan::single_point(line, column)
}

pub fn source() -> SourceFile {
    SourceFile::new(SourceId(0), PathBuf::from("unit.go"), String::new())
}

pub fn binding(name: &str, line: usize, column: usize) -> Binding {
    Binding {
        name: name.to_string(),
        span: sp(line, column),
    }
}

pub fn sum_annotation(builder: &mut AstBuilder, kind: SumKind, params: &[&str]) -> TypeExpr {
    let params: Vec<TypeExpr> = params.iter().map(|name| builder.type_name(name)).collect();
    builder.type_expr(SourceSpan::default(), TypeExprKind::Sum { kind, params })
}

pub fn call(
    builder: &mut AstBuilder,
    callee: &str,
    line: usize,
    column: usize,
    args: Vec<Expression>,
) -> Expression {
    let callee = builder.ident(callee, sp(line, column));
    builder.call(callee, args)
}

/// `func <name>() <results> { <body> }`
pub fn func_decl(
    builder: &mut AstBuilder,
    name: &str,
    results: Vec<TypeExpr>,
    body: Block,
) -> Decl {
    Decl::Func(FuncDecl {
        id: builder.next_id(),
        name: name.to_string(),
        name_span: sp(1, 6),
        receiver: None,
        params: Vec::new(),
        variadic: false,
        results,
        body,
        span: sp(1, 1),
    })
}

pub fn unit_with_body(builder: &mut AstBuilder, body: Vec<oolong_compiler::Statement>) -> Unit {
    let decl = func_decl(builder, "f", Vec::new(), Block::new(body));
    Unit::new(vec![decl])
}
