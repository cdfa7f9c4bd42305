use thiserror::Error;

pub type EpkeResult<T> = Result<T, EpkeError>;

#[derive(Error, Debug)]
pub enum EpkeError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },
}
