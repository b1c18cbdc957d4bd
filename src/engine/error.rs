use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("`{bin}` not found in PATH; install newman (npm install -g newman) or use --engine native")]
    BinaryNotFound { bin: String },
    #[error("failed to start `{bin}`")]
    Spawn {
        bin: String,
        #[source]
        source: std::io::Error,
    },
    #[error("newman exited with {status} without writing a run summary")]
    MissingSummary { status: String },
}
