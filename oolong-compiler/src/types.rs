use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ast::{AstBuilder, TypeExpr, TypeExprKind};

/// The two sum-type shapes the pass lowers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SumKind {
    Result,
    Option,
}

impl SumKind {
    pub fn type_name(self) -> &'static str {
        match self {
            SumKind::Result => "Result",
            SumKind::Option => "Option",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            SumKind::Result => 2,
            SumKind::Option => 1,
        }
    }

    pub fn variants(self) -> &'static [VariantTag] {
        match self {
            SumKind::Result => &[VariantTag::Ok, VariantTag::Err],
            SumKind::Option => &[VariantTag::Some, VariantTag::None],
        }
    }

    /// Name of the generated Go tag type shared by every instance of the kind.
    pub fn tag_type_name(self) -> &'static str {
        match self {
            SumKind::Result => "resultTag",
            SumKind::Option => "optionTag",
        }
    }
}

impl fmt::Display for SumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariantTag {
    Ok,
    Err,
    Some,
    None,
}

impl VariantTag {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Ok" => Some(VariantTag::Ok),
            "Err" => Some(VariantTag::Err),
            "Some" => Some(VariantTag::Some),
            "None" => Some(VariantTag::None),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            VariantTag::Ok => "Ok",
            VariantTag::Err => "Err",
            VariantTag::Some => "Some",
            VariantTag::None => "None",
        }
    }

    pub fn kind(self) -> SumKind {
        match self {
            VariantTag::Ok | VariantTag::Err => SumKind::Result,
            VariantTag::Some | VariantTag::None => SumKind::Option,
        }
    }

    /// Generated struct field holding this variant's payload, if it has one.
    pub fn payload_field(self) -> Option<&'static str> {
        match self {
            VariantTag::Ok => Some("ok"),
            VariantTag::Err => Some("err"),
            VariantTag::Some => Some("some"),
            VariantTag::None => None,
        }
    }

    /// Position of this variant's payload in the instance type parameters.
    pub fn payload_param_index(self) -> Option<usize> {
        match self {
            VariantTag::Ok | VariantTag::Some => Some(0),
            VariantTag::Err => Some(1),
            VariantTag::None => None,
        }
    }
}

impl fmt::Display for VariantTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kinds of Go untyped constants the structural fallback can produce.
/// Each normalizes to its default concrete type before canonical encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UntypedKind {
    Int,
    Float,
    Rune,
    Str,
    Bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Bool,
    Int,
    Float64,
    String,
    Error,
    Rune,
    Named(String),
    Pointer(Box<Type>),
    Slice(Box<Type>),
    Map(Box<Type>, Box<Type>),
    Func(Signature),
    Untyped(UntypedKind),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Signature {
    pub params: Vec<Type>,
    pub variadic: bool,
    pub results: Vec<Type>,
}

impl Type {
    pub fn from_name(name: &str) -> Type {
        match name {
            "bool" => Type::Bool,
            "int" => Type::Int,
            "float64" => Type::Float64,
            "string" => Type::String,
            "error" => Type::Error,
            "rune" => Type::Rune,
            other => Type::Named(other.to_string()),
        }
    }

    /// Replaces an untyped constant type with its Go default; concrete
    /// types pass through unchanged.
    pub fn defaulted(&self) -> Type {
        match self {
            Type::Untyped(UntypedKind::Int) => Type::Int,
            Type::Untyped(UntypedKind::Float) => Type::Float64,
            Type::Untyped(UntypedKind::Rune) => Type::Rune,
            Type::Untyped(UntypedKind::Str) => Type::String,
            Type::Untyped(UntypedKind::Bool) => Type::Bool,
            other => other.clone(),
        }
    }

    /// Deterministic, identifier-safe encoding used inside generated names.
    pub fn canonical_name(&self) -> String {
        match self {
            Type::Bool => "bool".to_string(),
            Type::Int => "int".to_string(),
            Type::Float64 => "float64".to_string(),
            Type::String => "string".to_string(),
            Type::Error => "error".to_string(),
            Type::Rune => "rune".to_string(),
            Type::Named(name) => oolong_support::sanitize_identifier(name).into_owned(),
            Type::Pointer(inner) => format!("ptr_{}", inner.canonical_name()),
            Type::Slice(element) => format!("slice_{}", element.canonical_name()),
            Type::Map(key, value) => {
                format!("map_{}_{}", key.canonical_name(), value.canonical_name())
            }
            Type::Func(signature) => {
                let mut parts: Vec<String> = vec!["func".to_string()];
                parts.extend(signature.params.iter().map(Type::canonical_name));
                parts.push("to".to_string());
                parts.extend(signature.results.iter().map(Type::canonical_name));
                oolong_support::join_mangled(parts.iter().map(|part| part.as_str()))
            }
            Type::Untyped(_) => self.defaulted().canonical_name(),
        }
    }

    /// Go-syntax rendering for error messages.
    pub fn describe(&self) -> String {
        match self {
            Type::Bool => "bool".to_string(),
            Type::Int => "int".to_string(),
            Type::Float64 => "float64".to_string(),
            Type::String => "string".to_string(),
            Type::Error => "error".to_string(),
            Type::Rune => "rune".to_string(),
            Type::Named(name) => name.clone(),
            Type::Pointer(inner) => format!("*{}", inner.describe()),
            Type::Slice(element) => format!("[]{}", element.describe()),
            Type::Map(key, value) => format!("map[{}]{}", key.describe(), value.describe()),
            Type::Func(signature) => {
                let params = signature
                    .params
                    .iter()
                    .map(Type::describe)
                    .collect::<Vec<_>>()
                    .join(", ");
                match signature.results.len() {
                    0 => format!("func({params})"),
                    1 => format!("func({params}) {}", signature.results[0].describe()),
                    _ => {
                        let results = signature
                            .results
                            .iter()
                            .map(Type::describe)
                            .collect::<Vec<_>>()
                            .join(", ");
                        format!("func({params}) ({results})")
                    }
                }
            }
            Type::Untyped(kind) => {
                let name = match kind {
                    UntypedKind::Int => "int",
                    UntypedKind::Float => "float",
                    UntypedKind::Rune => "rune",
                    UntypedKind::Str => "string",
                    UntypedKind::Bool => "bool",
                };
                format!("untyped {name}")
            }
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// The generated type name for one `(kind, params)` combination, e.g.
/// `Result_int_error`. Untyped parameters are defaulted first so the same
/// instantiation never mangles two ways.
pub fn instance_name(kind: SumKind, params: &[Type]) -> String {
    let mut parts: Vec<String> = vec![kind.type_name().to_string()];
    parts.extend(params.iter().map(|param| param.defaulted().canonical_name()));
    oolong_support::join_mangled(parts.iter().map(|part| part.as_str()))
}

/// Structural resolution of a syntactic annotation. Returns `None` for
/// shapes that have no structured counterpart (anonymous structs, the
/// empty interface).
pub fn resolve_type_expr(texpr: &TypeExpr) -> Option<Type> {
    match &texpr.kind {
        TypeExprKind::Name(name) => Some(Type::from_name(name)),
        TypeExprKind::Pointer(inner) => Some(Type::Pointer(Box::new(resolve_type_expr(inner)?))),
        TypeExprKind::Slice(element) => Some(Type::Slice(Box::new(resolve_type_expr(element)?))),
        TypeExprKind::Map(key, value) => Some(Type::Map(
            Box::new(resolve_type_expr(key)?),
            Box::new(resolve_type_expr(value)?),
        )),
        TypeExprKind::Func {
            params,
            variadic,
            results,
        } => {
            let params = params
                .iter()
                .map(resolve_type_expr)
                .collect::<Option<Vec<_>>>()?;
            let results = results
                .iter()
                .map(resolve_type_expr)
                .collect::<Option<Vec<_>>>()?;
            Some(Type::Func(Signature {
                params,
                variadic: *variadic,
                results,
            }))
        }
        TypeExprKind::Struct(_) | TypeExprKind::Any => None,
        TypeExprKind::Sum { kind, params } => {
            let params = params
                .iter()
                .map(resolve_type_expr)
                .collect::<Option<Vec<_>>>()?;
            Some(Type::Named(instance_name(*kind, &params)))
        }
    }
}

/// Syntactic annotation for a resolved type, used when codegen writes a
/// type back into the tree (wrapper return types, method signatures).
pub fn type_to_expr(builder: &mut AstBuilder, ty: &Type) -> TypeExpr {
    match ty {
        Type::Bool => builder.type_name("bool"),
        Type::Int => builder.type_name("int"),
        Type::Float64 => builder.type_name("float64"),
        Type::String => builder.type_name("string"),
        Type::Error => builder.type_name("error"),
        Type::Rune => builder.type_name("rune"),
        Type::Named(name) => builder.type_name(name),
        Type::Pointer(inner) => {
            let inner = type_to_expr(builder, inner);
            builder.type_pointer(inner)
        }
        Type::Slice(element) => {
            let element = type_to_expr(builder, element);
            builder.type_expr(element.span, TypeExprKind::Slice(Box::new(element)))
        }
        Type::Map(key, value) => {
            let key = type_to_expr(builder, key);
            let value = type_to_expr(builder, value);
            builder.type_expr(
                key.span,
                TypeExprKind::Map(Box::new(key), Box::new(value)),
            )
        }
        Type::Func(signature) => {
            let params = signature
                .params
                .iter()
                .map(|param| type_to_expr(builder, param))
                .collect();
            let results = signature
                .results
                .iter()
                .map(|result| type_to_expr(builder, result))
                .collect();
            builder.type_func(params, results)
        }
        Type::Untyped(_) => {
            let defaulted = ty.defaulted();
            type_to_expr(builder, &defaulted)
        }
    }
}

#[derive(Debug, Clone)]
pub struct SumTypeInstance {
    pub kind: SumKind,
    pub type_params: Vec<Type>,
    pub generated_name: String,
    pub emitted: bool,
}

/// Per-unit instantiation registry: exactly one entry per distinct
/// `(kind, type_params)`, keyed by generated name, insertion-ordered so
/// declaration output is deterministic. The inference engine is the sole
/// writer; everything else only looks names up.
#[derive(Debug, Default)]
pub struct InstanceRegistry {
    by_name: HashMap<String, SumTypeInstance>,
    order: Vec<String>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self {
            by_name: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Idempotent: registering the same combination twice returns the same
    /// name and keeps a single entry.
    pub fn register(&mut self, kind: SumKind, type_params: Vec<Type>) -> String {
        let type_params: Vec<Type> = type_params.iter().map(Type::defaulted).collect();
        let name = instance_name(kind, &type_params);
        if !self.by_name.contains_key(&name) {
            self.by_name.insert(
                name.clone(),
                SumTypeInstance {
                    kind,
                    type_params,
                    generated_name: name.clone(),
                    emitted: false,
                },
            );
            self.order.push(name.clone());
        }
        name
    }

    /// The single place a name is recognized as one of our sum types.
    pub fn lookup(&self, name: &str) -> Option<&SumTypeInstance> {
        self.by_name.get(name)
    }

    pub fn instances(&self) -> impl Iterator<Item = &SumTypeInstance> {
        self.order.iter().map(|name| &self.by_name[name])
    }

    /// Names registered but not yet declared, in registration order.
    pub fn unemitted(&self) -> Vec<String> {
        self.order
            .iter()
            .filter(|name| !self.by_name[*name].emitted)
            .cloned()
            .collect()
    }

    pub fn mark_emitted(&mut self, name: &str) {
        if let Some(instance) = self.by_name.get_mut(name) {
            instance.emitted = true;
        }
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
