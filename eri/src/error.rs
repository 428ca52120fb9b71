use thiserror::Error;

pub type Result<T, E = EriError> = std::result::Result<T, E>;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EriError {
    #[error("Not yet implemented: integrals with derivative order {derivative_order} (only 0 is supported)")]
    NotImplemented { derivative_order: u32 },

    #[error("Angular momentum l={am} of shell {shell} in basis set {basis} exceeds the supported maximum l={max}")]
    UnsupportedAngularMomentum {
        am: usize,
        max: usize,
        basis: usize,
        shell: usize,
    },

    #[error("Output buffer too small: {required} elements required, {supplied} supplied")]
    BufferTooSmall { required: usize, supplied: usize },

    #[error("Internal invariant violated ({what}): {required} elements required, {available} available")]
    InvariantViolation {
        what: &'static str,
        required: usize,
        available: usize,
    },

    #[error("Shell index {index} at position {position} is out of range for a basis set of {len} shells")]
    ShellIndexOutOfRange {
        position: usize,
        index: usize,
        len: usize,
    },

    #[error("Contraction {index} requested from shell {shell}, which has {count} contractions")]
    InvalidContraction {
        shell: usize,
        index: usize,
        count: usize,
    },
}
