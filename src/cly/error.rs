use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClyError {
    #[error("No command provided!")]
    NoCommandName,

    #[error("Can't register command with white spaces: '{0}'")]
    InvalidCommandName(String),

    #[error("Can't register command aliases with white spaces: '{alias}' (command '{command}')")]
    InvalidAlias { command: String, alias: String },

    #[error("Command '{0}' has already been registered.")]
    DuplicateCommand(String),

    #[error("Default handler has already been registered.")]
    DefaultAlreadyRegistered,

    #[error("'{name}' is already in use by command '{existing}'")]
    AliasConflict { name: String, existing: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ClyError>;

/// What every command handler returns. Errors pass through `run` untouched.
pub type HandlerResult = anyhow::Result<()>;
