use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{}", .0)]
    Custom(String),

    #[error("IO::{:?}: {}", .0, .0)]
    Io(#[from] std::io::Error),

    #[error("{}", .0)]
    Flow(#[from] repset_core::flows::FlowError),

    #[error("{}", .0)]
    Provider(#[from] repset_core::provider::ProviderError),
}
