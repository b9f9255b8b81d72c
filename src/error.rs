use std::path::PathBuf;
use thiserror::Error;

use crate::cartridge::CartridgeType;

pub type Result<T> = std::result::Result<T, TapeError>;

#[derive(Error, Debug)]
pub enum TapeError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Geometry error: {0}")]
    Geometry(String),

    #[error("{property} is not implemented for cartridge type {cartridge}")]
    NotImplemented {
        cartridge: CartridgeType,
        property: &'static str,
    },

    #[error("Block cache error: {0}")]
    Cache(String),

    #[error("Refusing to overwrite existing file: {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl TapeError {
    pub fn configuration<T: Into<String>>(msg: T) -> Self {
        Self::Configuration(msg.into())
    }

    pub fn geometry<T: Into<String>>(msg: T) -> Self {
        Self::Geometry(msg.into())
    }

    pub fn not_implemented(cartridge: CartridgeType, property: &'static str) -> Self {
        Self::NotImplemented {
            cartridge,
            property,
        }
    }

    pub fn cache<T: Into<String>>(msg: T) -> Self {
        Self::Cache(msg.into())
    }

    pub fn parse<T: Into<String>>(msg: T) -> Self {
        Self::Parse(msg.into())
    }
}

impl From<TapeError> for std::io::Error {
    fn from(error: TapeError) -> Self {
        match error {
            TapeError::Io(e) => e,
            other => std::io::Error::new(std::io::ErrorKind::Other, other),
        }
    }
}
