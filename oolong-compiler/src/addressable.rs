use crate::ast::{
    AstBuilder, Binding, Block, Expression, ExpressionKind, TypeExpr, UnaryOp,
};

/// Classifies an expression under the host's addressability rules.
/// Variables, selector chains rooted in an addressable value, indexing
/// into an addressable container, pointer dereferences and parenthesized
/// addressable expressions qualify. Everything else, including literals,
/// composite literals, call results, operator results and conversions,
/// defaults to non-addressable.
pub fn is_addressable(expression: &Expression) -> bool {
    match &expression.kind {
        ExpressionKind::Identifier(ident) => {
            !matches!(ident.name.as_str(), "true" | "false" | "nil" | "iota")
        }
        ExpressionKind::Selector(selector) => is_addressable(&selector.object),
        ExpressionKind::Index(indexed) => is_addressable(&indexed.object),
        ExpressionKind::Unary(unary) => unary.op == UnaryOp::Deref,
        ExpressionKind::Grouping(inner) => is_addressable(inner),
        _ => false,
    }
}

/// Fresh `__tmp<N>` names, monotonically increasing within one unit.
#[derive(Debug, Default)]
pub struct TempAllocator {
    next: usize,
}

impl TempAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fresh(&mut self) -> String {
        let name = format!("__tmp{}", self.next);
        self.next += 1;
        name
    }
}

/// Binds `expression` to a fresh temporary inside an immediately-invoked
/// zero-argument closure returning the temporary's address:
///
/// ```go
/// func() *T { __tmpN := expression; return &__tmpN }()
/// ```
///
/// The host compiler's own escape analysis keeps the temporary alive, so
/// no runtime helper is involved.
pub fn wrap_non_addressable(
    builder: &mut AstBuilder,
    temps: &mut TempAllocator,
    expression: Expression,
    type_hint: TypeExpr,
) -> Expression {
    let span = expression.span;
    let temp = temps.fresh();

    let binding = Binding {
        name: temp.clone(),
        span,
    };
    let declare = builder.var_stmt(vec![binding], None, vec![expression], true);
    let temp_ref = builder.ident(&temp, span);
    let address = builder.unary(UnaryOp::Addr, temp_ref);
    let give_back = builder.ret(vec![address]);

    let pointer = builder.type_pointer(type_hint);
    let closure = builder.func_lit(Vec::new(), vec![pointer], Block::new(vec![declare, give_back]));
    builder.call(closure, Vec::new())
}

/// A reference to `expression`: `&expression` when it is addressable, the
/// temporary-binding closure otherwise. Total over all expressions.
pub fn reference_to(
    builder: &mut AstBuilder,
    temps: &mut TempAllocator,
    expression: Expression,
    type_hint: TypeExpr,
) -> Expression {
    if is_addressable(&expression) {
        builder.unary(UnaryOp::Addr, expression)
    } else {
        wrap_non_addressable(builder, temps, expression, type_hint)
    }
}
