mod config;
pub mod error;

pub use config::Config;
pub use config::Deployments;
pub use error::AzureError;
