use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimulationError {
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameter { field: &'static str, reason: String },
    #[error("simulation produced a non-finite `{field}`")]
    NonFinite { field: &'static str },
}

impl SimulationError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        SimulationError::InvalidParameter {
            field,
            reason: reason.into(),
        }
    }

    /// Name of the offending field, for mapping back onto CLI flags or payload keys.
    pub fn field(&self) -> &'static str {
        match self {
            SimulationError::InvalidParameter { field, .. } => field,
            SimulationError::NonFinite { field } => field,
        }
    }
}
