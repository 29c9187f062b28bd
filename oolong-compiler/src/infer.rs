use crate::ast::{Expression, ExpressionKind, Literal, NodeId, SourceSpan};
use crate::context::{ContextIndex, ContextSite};
use crate::oracle::TypeOracle;
use crate::types::{resolve_type_expr, Signature, Type, UntypedKind};

/// Bounded depth-first containment test with early exit.
pub fn contains_node(root: &Expression, target: NodeId) -> bool {
    if root.id == target {
        return true;
    }
    root.children()
        .into_iter()
        .any(|child| contains_node(child, target))
}

/// Resolves expression types through the oracle with a structural fallback,
/// and expected types from the syntactic context of a value-less node.
pub struct InferenceEngine<'a> {
    oracle: Option<&'a dyn TypeOracle>,
    index: &'a ContextIndex,
}

impl<'a> InferenceEngine<'a> {
    pub fn new(oracle: Option<&'a dyn TypeOracle>, index: &'a ContextIndex) -> Self {
        Self { oracle, index }
    }

    pub fn oracle(&self) -> Option<&'a dyn TypeOracle> {
        self.oracle
    }

    /// Oracle lookup first: the checker's answer is authoritative and
    /// already sees through aliases and qualification. The structural
    /// fallback covers literals and the builtin boolean identifiers only.
    pub fn infer(&self, expression: &Expression) -> Option<Type> {
        if let Some(oracle) = self.oracle {
            if let Some(ty) = oracle.type_of(expression.span) {
                return Some(ty);
            }
        }
        self.structural(expression)
    }

    fn structural(&self, expression: &Expression) -> Option<Type> {
        match &expression.kind {
            ExpressionKind::Literal(Literal::Int(_)) => Some(Type::Untyped(UntypedKind::Int)),
            ExpressionKind::Literal(Literal::Float(_)) => Some(Type::Untyped(UntypedKind::Float)),
            ExpressionKind::Literal(Literal::Str(_)) => Some(Type::Untyped(UntypedKind::Str)),
            ExpressionKind::Literal(Literal::Rune(_)) => Some(Type::Untyped(UntypedKind::Rune)),
            ExpressionKind::Literal(Literal::Nil) => None,
            ExpressionKind::Identifier(ident) if ident.name == "true" || ident.name == "false" => {
                Some(Type::Untyped(UntypedKind::Bool))
            }
            ExpressionKind::Grouping(inner) => self.structural(inner),
            _ => None,
        }
    }

    /// Expected type at the nearest enclosing context site. Strictly
    /// oracle-gated: without a checker behind it, every case returns
    /// `None`. There is no syntactic fallback.
    pub fn infer_from_context(&self, id: NodeId) -> Option<Type> {
        let oracle = self.oracle?;
        let (site, child) = self.index.enclosing_site(id)?;
        match site {
            ContextSite::Return { results, .. } => {
                // Single-value simplification: only the first declared
                // result participates in context inference.
                results.first().and_then(resolve_type_expr)
            }
            ContextSite::Assign { targets, values } => {
                let position = values.iter().position(|value| *value == child)?;
                let (_, target_span) = targets.get(position)?;
                oracle.type_of(*target_span)
            }
            ContextSite::VarDecl {
                names,
                annotation,
                values,
            } => {
                if let Some(annotation) = annotation {
                    return resolve_type_expr(annotation);
                }
                let position = values.iter().position(|value| *value == child)?;
                let name = names.get(position)?;
                oracle.type_of(name.span)
            }
            ContextSite::CallArg { callee_span, args } => {
                let position = args.iter().position(|arg| *arg == child)?;
                let signature = self.callee_signature(*callee_span)?;
                signature.param_at(position)
            }
        }
    }

    /// Callee signature via the oracle, seeing through one level of
    /// named-type wrapping around a function type.
    fn callee_signature(&self, span: SourceSpan) -> Option<Signature> {
        let oracle = self.oracle?;
        if let Some(signature) = oracle.signature_of(span) {
            return Some(signature);
        }
        match oracle.type_of(span)? {
            Type::Func(signature) => Some(signature),
            Type::Named(name) => match oracle.underlying_of(&name)? {
                Type::Func(signature) => Some(signature),
                _ => None,
            },
            _ => None,
        }
    }
}

impl Signature {
    /// Parameter type at an argument position. For a variadic callee any
    /// position at or past the last parameter yields the element type of
    /// the trailing slice, never the slice itself.
    pub fn param_at(&self, position: usize) -> Option<Type> {
        if self.variadic && !self.params.is_empty() && position + 1 >= self.params.len() {
            match self.params.last() {
                Some(Type::Slice(element)) => Some((**element).clone()),
                _ => None,
            }
        } else {
            self.params.get(position).cloned()
        }
    }
}
