//! Column-to-field signatures, derived once per model type and cached.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::Model;
use crate::value::FieldKind;

/// Where one column lands inside a model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSignature {
    /// Position in `Model::FIELDS`.
    pub index: usize,
    pub name: &'static str,
    pub column: String,
    pub kind: FieldKind,
}

/// Column name -> field mapping for one model type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSignature {
    type_name: &'static str,
    fields: HashMap<String, FieldSignature>,
}

impl ModelSignature {
    /// Build the signature for `M` from its field table.
    ///
    /// Columns are not checked for uniqueness: when two fields resolve to the
    /// same column, the later one wins.
    pub fn derive<M: Model>() -> Self {
        let mut fields = HashMap::with_capacity(M::FIELDS.len());
        for (index, field) in M::FIELDS.iter().enumerate() {
            let column = field.column();
            fields.insert(
                column.clone(),
                FieldSignature {
                    index,
                    name: field.name,
                    column,
                    kind: field.kind,
                },
            );
        }

        Self {
            type_name: M::TYPE_NAME,
            fields,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Look up the field a column maps to.
    pub fn field(&self, column: &str) -> Option<&FieldSignature> {
        self.fields.get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Process-wide cache of model signatures.
///
/// Lookups take a read lock; a miss re-checks and derives under the write
/// lock, so each type is derived exactly once even under concurrent first use.
#[derive(Debug, Default)]
pub struct SignatureCache {
    signatures: RwLock<HashMap<TypeId, Arc<ModelSignature>>>,
}

impl SignatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Signature for `M`, deriving and caching it on first use.
    pub fn signature<M: Model>(&self) -> Arc<ModelSignature> {
        let key = TypeId::of::<M>();
        if let Some(signature) = self.signatures.read().get(&key) {
            return Arc::clone(signature);
        }

        let mut signatures = self.signatures.write();
        let signature = signatures.entry(key).or_insert_with(|| {
            log::debug!("Deriving model signature for {}", M::TYPE_NAME);
            Arc::new(ModelSignature::derive::<M>())
        });
        Arc::clone(signature)
    }

    /// An already derived signature, looked up by the model's type name.
    pub fn by_name(&self, type_name: &str) -> Option<Arc<ModelSignature>> {
        self.signatures
            .read()
            .values()
            .find(|signature| signature.type_name() == type_name)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.signatures.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.read().is_empty()
    }
}
