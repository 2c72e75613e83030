//! Session type → failure classifier lookup.

use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::resilience::classifier::{FailureClassifier, FaultCodeClassifier, HttpStatusClassifier};
use crate::session::SessionType;

/// Classifier lookup errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// Tag is not one of the known session types.
    #[error("Unknown session type '{0}'")]
    UnknownSessionType(String),

    /// Tag is known but nothing is registered for it.
    #[error("No failure classifier registered for session type '{0}'")]
    Unregistered(SessionType),
}

/// Maps each session type to its classifier.
#[derive(Debug, Clone, Default)]
pub struct ClassifierRegistry {
    classifiers: HashMap<SessionType, Arc<dyn FailureClassifier>>,
}

impl ClassifierRegistry {
    /// Registry with no classifiers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Registry covering every built-in session type.
    pub fn builtin() -> Self {
        let fault_codes: Arc<dyn FailureClassifier> = Arc::new(FaultCodeClassifier::new());
        Self::empty()
            .register(SessionType::Enterprise, fault_codes.clone())
            .register(SessionType::Partner, fault_codes)
            .register(SessionType::Rest, Arc::new(HttpStatusClassifier::new()))
    }

    /// Add or replace the classifier for a session type.
    pub fn register(mut self, session_type: SessionType, classifier: Arc<dyn FailureClassifier>) -> Self {
        self.classifiers.insert(session_type, classifier);
        self
    }

    pub fn resolve(&self, session_type: SessionType) -> Result<Arc<dyn FailureClassifier>, RegistryError> {
        self.classifiers
            .get(&session_type)
            .cloned()
            .ok_or(RegistryError::Unregistered(session_type))
    }
}
