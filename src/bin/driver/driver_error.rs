use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("cannot target the host architecture {0}; pass -A explicitly")]
    UnsupportedHost(String),
}
