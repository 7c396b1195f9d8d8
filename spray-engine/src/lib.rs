pub mod command;
pub mod highlight;
pub mod workspace;

pub mod errors {
    use spray_core::errors::PassError;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EngineError {
        #[error("entity with id {0} not found")]
        EntityNotFound(u64),
        #[error(transparent)]
        Pass(#[from] PassError),
    }
}
