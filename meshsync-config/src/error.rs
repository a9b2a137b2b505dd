use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("cluster config entry {0:?} is malformed: {1}")]
    MalformedEntry(String, meshsync_core::CoreError),

    #[error("local node {host}:{coord_port} is not listed in --cluster")]
    LocalNodeNotInCluster { host: String, coord_port: u16 },

    #[error("--cluster must not be empty")]
    EmptyCluster,
}

pub type Result<T> = std::result::Result<T, ConfigError>;
