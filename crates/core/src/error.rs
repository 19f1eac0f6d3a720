//! Error types for the board domain

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("This username is already in use. Please choose another one.")]
    NameTaken(String),

    #[error("This color is already in use. Please choose another one.")]
    ColorTaken(String),

    #[error("You have already joined")]
    AlreadyJoined,

    #[error("You can only delete your own cards")]
    NotAuthor,

    #[error("You must be logged in to like cards")]
    NotJoined,
}

pub type Result<T> = std::result::Result<T, Error>;
