// Utility modules for common functionality
pub mod constants;
pub mod format;
pub mod logger;
pub mod validation;
