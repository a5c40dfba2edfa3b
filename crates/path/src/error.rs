use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum PathError {
    #[error("Parse error in '{expression}': {message}")]
    Parse { expression: String, message: String },

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Undefined environment variable '%{0}'")]
    UnknownVariable(String),

    #[error("Function '{function}' error: {message}")]
    Function { function: String, message: String },

    #[error("Type error: {0}")]
    Type(String),

    #[error("{0}")]
    Access(String),
}
