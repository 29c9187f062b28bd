use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ast::SourceSpan;
use crate::types::{Signature, Type};

/// Span-keyed access to the host type-checker's results. The oracle is
/// optional everywhere it is consumed; absence selects the documented
/// degraded mode of each component instead of a hard failure.
pub trait TypeOracle {
    fn type_of(&self, span: SourceSpan) -> Option<Type>;

    fn signature_of(&self, span: SourceSpan) -> Option<Signature>;

    /// One level of named-type unwrapping, mirroring the host checker's
    /// underlying-type query. Used to see through `type HandlerFunc func(...)`.
    fn underlying_of(&self, name: &str) -> Option<Type> {
        let _ = name;
        None
    }

    fn is_boolean(&self, ty: &Type) -> bool {
        match ty {
            Type::Bool => true,
            Type::Named(name) => matches!(self.underlying_of(name), Some(Type::Bool)),
            _ => false,
        }
    }
}

/// In-memory oracle for embedding and tests.
#[derive(Debug, Default)]
pub struct MapOracle {
    types: HashMap<SourceSpan, Type>,
    signatures: HashMap<SourceSpan, Signature>,
    underlying: HashMap<String, Type>,
}

impl MapOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_type(&mut self, span: SourceSpan, ty: Type) {
        self.types.insert(span, ty);
    }

    pub fn insert_signature(&mut self, span: SourceSpan, signature: Signature) {
        self.signatures.insert(span, signature);
    }

    pub fn insert_underlying(&mut self, name: &str, ty: Type) {
        self.underlying.insert(name.to_string(), ty);
    }
}

impl TypeOracle for MapOracle {
    fn type_of(&self, span: SourceSpan) -> Option<Type> {
        self.types.get(&span).cloned()
    }

    fn signature_of(&self, span: SourceSpan) -> Option<Signature> {
        self.signatures.get(&span).cloned()
    }

    fn underlying_of(&self, name: &str) -> Option<Type> {
        self.underlying.get(name).cloned()
    }
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("malformed oracle snapshot: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeFact {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    #[serde(rename = "type")]
    pub ty: Type,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureFact {
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub signature: Signature,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnderlyingFact {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: Type,
}

/// Sidecar file the host toolchain dumps after running its type checker
/// over the preprocessed unit: one fact per expression span it resolved.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OracleSnapshot {
    #[serde(default)]
    pub types: Vec<TypeFact>,
    #[serde(default)]
    pub signatures: Vec<SignatureFact>,
    #[serde(default)]
    pub underlying: Vec<UnderlyingFact>,
}

/// Oracle backed by a decoded snapshot sidecar.
#[derive(Debug, Default)]
pub struct SnapshotOracle {
    inner: MapOracle,
}

impl SnapshotOracle {
    pub fn from_snapshot(snapshot: OracleSnapshot) -> Self {
        let mut inner = MapOracle::new();
        for fact in snapshot.types {
            let span = SourceSpan::new(fact.line, fact.column, fact.end_line, fact.end_column);
            inner.insert_type(span, fact.ty);
        }
        for fact in snapshot.signatures {
            let span = SourceSpan::new(fact.line, fact.column, fact.end_line, fact.end_column);
            inner.insert_signature(span, fact.signature);
        }
        for fact in snapshot.underlying {
            inner.insert_underlying(&fact.name, fact.ty);
        }
        Self { inner }
    }

    pub fn from_json(text: &str) -> Result<Self, SnapshotError> {
        let snapshot: OracleSnapshot = serde_json::from_str(text)?;
        Ok(Self::from_snapshot(snapshot))
    }
}

impl TypeOracle for SnapshotOracle {
    fn type_of(&self, span: SourceSpan) -> Option<Type> {
        self.inner.type_of(span)
    }

    fn signature_of(&self, span: SourceSpan) -> Option<Signature> {
        self.inner.signature_of(span)
    }

    fn underlying_of(&self, name: &str) -> Option<Type> {
        self.inner.underlying_of(name)
    }
}
