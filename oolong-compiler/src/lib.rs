mod addressable;
mod ast;
mod context;
mod diagnostics;
mod infer;
mod lexer;
mod matcher;
mod oracle;
mod parser;
mod printer;
mod source;
mod sumtype;
mod transform;
mod types;

pub use crate::addressable::{is_addressable, wrap_non_addressable, reference_to, TempAllocator};
pub use crate::ast::{
    AssignStatement, AstBuilder, BinaryExpression, BinaryOp, Binding, Block, CallExpression,
    CompositeField, CompositeLiteral, ConstDecl, ConstSpec, Decl, ElseBranch, Expression,
    ExpressionKind, FieldDef, ForStatement, FuncDecl, FuncLit, Identifier, IfStatement,
    IndexExpression, Literal, MatchArm, MatchGuard, MatchStatement, NodeId, Param, Receiver,
    ReturnStatement, SelectorExpression, SourceSpan, Statement, StatementKind, TypeDecl,
    TypeDeclKind, TypeExpr, TypeExprKind, UnaryExpression, UnaryOp, Unit, VarDecl, VarStatement,
};
pub use crate::context::{ContextIndex, ContextSite};
pub use crate::diagnostics::{Diagnostic, DiagnosticLevel, Diagnostics, ErrorCategory};
pub use crate::infer::{contains_node, InferenceEngine};
pub use crate::lexer::{LexError, Lexer, Token, TokenKind};
pub use crate::matcher::compile_match;
pub use crate::oracle::{
    MapOracle, OracleSnapshot, SignatureFact, SnapshotError, SnapshotOracle, TypeFact, TypeOracle,
    UnderlyingFact,
};
pub use crate::parser::{parse_guard_expression, ParseError};
pub use crate::printer::{render_decl, render_decls, render_expr, render_stmt};
pub use crate::source::{SourceFile, SourceId};
pub use crate::sumtype::{emit_instance_decls, emit_tag_decls, rewrite_constructor};
pub use crate::transform::{TransformOptions, Transformed, Transformer};
pub use crate::types::{
    instance_name, resolve_type_expr, type_to_expr, InstanceRegistry, Signature, SumKind,
    SumTypeInstance, Type, UntypedKind, VariantTag,
};
