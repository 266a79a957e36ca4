mod environment;
mod error;
mod process_error;

pub use environment::Environment;
pub use error::AppError;
pub use process_error::ProcessError;
