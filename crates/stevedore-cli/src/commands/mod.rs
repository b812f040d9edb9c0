mod healthcheck;
mod serve;

pub use healthcheck::HealthcheckCommand;
pub use serve::ServeCommand;
