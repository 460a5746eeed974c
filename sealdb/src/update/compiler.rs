use crate::collection::Document;
use crate::common::{DOC_ID, DOC_REF, OP_INC, OP_SET, OP_UNSET};
use crate::errors::{ErrorKind, SealError, SealResult};
use crate::update::Mutation;

/// Compiles update expressions into an ordered list of [`Mutation`]s.
///
/// ```rust,ignore
/// let mutation = MutationCompiler::compile(&doc! {
///     "$set": { status: "archived", "meta.by": "admin" },
///     "$inc": { visits: 1 },
///     "$unset": { draft: 1 },
/// })?;
/// ```
pub struct MutationCompiler;

impl MutationCompiler {
    pub fn compile(update: &Document) -> SealResult<CompiledMutation> {
        let mut mutations = Vec::new();
        for (operator, fields) in update.iter() {
            if !matches!(operator.as_str(), OP_SET | OP_UNSET | OP_INC) {
                log::debug!("Ignoring unsupported update key {}", operator);
                continue;
            }

            let fields = fields.as_document().ok_or_else(|| {
                update_error(&format!("{} expects a document, found {}", operator, fields))
            })?;
            for (path, operand) in fields.iter() {
                if path == DOC_ID {
                    log::error!("Attempt to mutate the document id");
                    return Err(SealError::new(
                        "Document id is immutable",
                        ErrorKind::ValidationError,
                    ));
                }
                if path == DOC_REF {
                    log::error!("Attempt to mutate the reserved {} key", DOC_REF);
                    return Err(SealError::new(
                        &format!("{} is reserved and cannot be a document field", DOC_REF),
                        ErrorKind::ValidationError,
                    ));
                }

                let mutation = match operator.as_str() {
                    OP_SET => Mutation::Set {
                        path: path.clone(),
                        value: operand.clone(),
                    },
                    OP_UNSET => Mutation::Unset { path: path.clone() },
                    _ => {
                        if !operand.is_number() {
                            return Err(update_error(&format!(
                                "{} on {} expects a number, found {}",
                                OP_INC, path, operand
                            )));
                        }
                        Mutation::Inc {
                            path: path.clone(),
                            amount: operand.clone(),
                        }
                    }
                };
                mutations.push(mutation);
            }
        }
        Ok(CompiledMutation { mutations })
    }
}

fn update_error(message: &str) -> SealError {
    log::error!("{}", message);
    SealError::new(message, ErrorKind::UpdateError)
}

/// An executable update: mutations applied in declaration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompiledMutation {
    mutations: Vec<Mutation>,
}

impl CompiledMutation {
    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn apply(&self, document: &mut Document, upsert: bool) {
        for mutation in &self.mutations {
            mutation.apply(document, upsert);
        }
    }

    pub fn apply_all<'a>(&self, documents: impl IntoIterator<Item = &'a mut Document>, upsert: bool) {
        for document in documents {
            self.apply(document, upsert);
        }
    }
}

impl From<Vec<Mutation>> for CompiledMutation {
    fn from(mutations: Vec<Mutation>) -> Self {
        CompiledMutation { mutations }
    }
}
