//! Error types for patch graph operations.

use patchbay_core::{EngineError, PortKind, UnitError};
use patchbay_registry::RegistryError;
use thiserror::Error;

use crate::boundary::BoundarySide;
use crate::connection::ConnectionSpec;
use crate::id::{ConnectionId, UnitId};

/// Why a candidate connection was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidReason {
    /// The source unit has no output port of that name.
    #[error("no output port '{0}' on the source unit")]
    MissingOutput(String),

    /// The destination unit has no input port of that name.
    #[error("no input port '{0}' on the destination unit")]
    MissingInput(String),

    /// Output and input carry different port kinds.
    #[error("cannot connect {from} output to {to} input")]
    KindMismatch {
        /// Kind of the output port.
        from: PortKind,
        /// Kind of the input port.
        to: PortKind,
    },

    /// The same output is already wired to the same input.
    #[error("connection already exists")]
    Duplicate,
}

/// Errors that can occur during patch graph operations.
#[derive(Debug, Error)]
pub enum PatchError {
    /// No factory is registered under this type id.
    #[error("unknown unit type '{0}'")]
    UnknownType(String),

    /// The unit id does not refer to a live unit.
    #[error("unknown unit '{0}'")]
    UnknownUnit(UnitId),

    /// The connection id does not refer to a live connection.
    #[error("unknown connection {0}")]
    UnknownConnection(ConnectionId),

    /// The candidate connection failed validation.
    #[error("invalid connection {spec}: {reason}")]
    InvalidConnection {
        /// Requested endpoints.
        spec: ConnectionSpec,
        /// What was wrong with it.
        reason: InvalidReason,
    },

    /// A port of that name already exists on the unit.
    #[error("port '{port}' already exists on unit '{unit}'")]
    DuplicatePort {
        /// Owning unit.
        unit: UnitId,
        /// Port name.
        port: String,
    },

    /// The explicit unit id has been used in this graph before.
    #[error("unit id '{0}' is already in use")]
    DuplicateUnitId(UnitId),

    /// The id belongs to a boundary pseudo-unit, or is reserved for one.
    #[error("unit '{0}' is reserved for patch boundaries")]
    ReservedUnit(UnitId),

    /// The graph already has a boundary pseudo-unit on this side.
    #[error("patch already has an {0} boundary")]
    DuplicateBoundary(BoundarySide),

    /// The unit factory refused the settings.
    #[error("failed to create unit '{type_id}'")]
    UnitCreation {
        /// Type id being created.
        type_id: String,
        /// Why the factory failed.
        #[source]
        source: UnitError,
    },

    /// The Audio Engine rejected a wiring request.
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// A patch document is internally inconsistent.
    #[error("malformed patch document: {0}")]
    Document(String),

    /// The registry refused a registration.
    #[error(transparent)]
    Registry(RegistryError),
}

impl From<RegistryError> for PatchError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownType(id) => PatchError::UnknownType(id),
            RegistryError::Create {
                type_id,
                source: UnitError::Nested(nested),
            } => match nested.downcast::<PatchError>() {
                // A nested patch naming an unregistered type fails like a flat one.
                Ok(nested) => match *nested {
                    PatchError::UnknownType(id) => PatchError::UnknownType(id),
                    other => PatchError::UnitCreation {
                        type_id,
                        source: UnitError::Nested(Box::new(other)),
                    },
                },
                Err(nested) => PatchError::UnitCreation {
                    type_id,
                    source: UnitError::Nested(nested),
                },
            },
            RegistryError::Create { type_id, source } => PatchError::UnitCreation { type_id, source },
            err @ (RegistryError::DuplicateType(_) | RegistryError::ReservedType(_)) => {
                PatchError::Registry(err)
            }
        }
    }
}
