//! Infrastructure layer: storage backends, services, settings, mail.

pub mod config_service;
pub mod email;
pub mod pg;
pub mod seed;
pub mod settings;
pub mod store;
pub mod user_service;
pub mod users;


pub use config_service::ConfigurationService;
pub use settings::Settings;
pub use store::{ConfigStore, InMemoryConfigStore, PostgresConfigStore, StoreError};
pub use user_service::{LoginResponse, UserService};
pub use users::{InMemoryUserStore, PostgresUserStore, UserStore};
