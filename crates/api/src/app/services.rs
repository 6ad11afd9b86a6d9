//! Service wiring: storage backend, mailer, token codec, seeding.

use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;

use configserver_auth::{Hs256Jwt, JwtValidator, PasswordHasher};
use configserver_infra::email::{EmailSender, LogEmailSender, SmtpEmailSender};
use configserver_infra::{
    ConfigStore, ConfigurationService, InMemoryConfigStore, InMemoryUserStore,
    PostgresConfigStore, PostgresUserStore, Settings, UserService, UserStore, pg, seed,
};

/// Everything the handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub config: ConfigurationService,
    pub users: UserService,
    pub jwt: Arc<dyn JwtValidator>,
}

pub async fn build_services(settings: &Settings) -> anyhow::Result<AppServices> {
    let (config_store, user_store): (Arc<dyn ConfigStore>, Arc<dyn UserStore>) =
        match &settings.database.url {
            Some(url) => {
                let pool = pg::connect(url, settings.database.max_connections)
                    .await
                    .context("failed to connect to postgres")?;
                pg::migrate(&pool).await.context("failed to apply schema")?;
                (
                    Arc::new(PostgresConfigStore::new(pool.clone())),
                    Arc::new(PostgresUserStore::new(pool)),
                )
            }
            None => {
                tracing::warn!("no database url configured; using in-memory storage");
                (
                    Arc::new(InMemoryConfigStore::new()),
                    Arc::new(InMemoryUserStore::new()),
                )
            }
        };

    let mailer: Arc<dyn EmailSender> = match &settings.smtp.host {
        Some(host) => Arc::new(
            SmtpEmailSender::new(host, &settings.smtp).context("invalid smtp settings")?,
        ),
        None => {
            tracing::warn!("no smtp host configured; emails will only be logged");
            Arc::new(LogEmailSender)
        }
    };

    let jwt = Arc::new(Hs256Jwt::new(
        settings.auth.jwt_secret.as_bytes(),
        Duration::seconds(settings.auth.token_ttl_secs),
    ));

    let config = ConfigurationService::new(config_store);
    let users = UserService::new(
        user_store,
        PasswordHasher::new(settings.auth.bcrypt_cost),
        jwt.clone(),
        mailer,
        settings.app.public_url.clone(),
        Duration::hours(settings.auth.reset_token_ttl_hours),
    );

    if settings.seed.default_users {
        seed::seed_default_users(&users)
            .await
            .context("failed to seed default users")?;
    }
    if settings.seed.sample_data {
        seed::seed_sample_data(&config)
            .await
            .context("failed to seed sample data")?;
    }

    Ok(AppServices { config, users, jwt })
}
