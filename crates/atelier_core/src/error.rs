use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown persona label: {0:?}")]
    UnknownPersona(String),

    #[error("unknown backend {kind} = {value:?}")]
    UnknownBackend { kind: &'static str, value: String },
}
