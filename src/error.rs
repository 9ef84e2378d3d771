// Startup error module
// Everything that keeps the server from starting; none of it happens per request

use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::assets::ManifestError;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("install defaults: {0}")]
    Defaults(#[source] io::Error),
    #[error("load config: {0}")]
    Config(#[from] config::ConfigError),
    #[error("init logger: {0}")]
    Logger(#[source] io::Error),
    #[error("load bundle '{path}': {source}")]
    Bundle {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("bundle has no manifest at '{0}'")]
    ManifestMissing(String),
    #[error("resolve entry paths: {0}")]
    Manifest(#[from] ManifestError),
    #[error("skin directory '{0}' does not exist")]
    SkinMissing(PathBuf),
    #[error("{0}")]
    Address(String),
    #[error("bind {addr}: {source}")]
    Bind {
        addr: std::net::SocketAddr,
        #[source]
        source: io::Error,
    },
    #[error("build runtime: {0}")]
    Runtime(#[source] io::Error),
}
