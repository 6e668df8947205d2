use std::sync::Arc;

use time::Duration;
use tracing::{info, warn};

use crate::config::AppConfig;
use crate::mailer::{Mailer, MemoryMailer, SmtpMailer};
use crate::store::{MemoryUserStore, PgUserStore, UserStore};
use crate::verification::VerificationService;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<dyn UserStore>,
    pub verification: VerificationService,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = AppConfig::from_env()?;

        let store = match &config.database_url {
            Some(url) => {
                let pg = PgUserStore::connect(url).await?;
                pg.migrate().await?;
                info!("using postgres store");
                Arc::new(pg) as Arc<dyn UserStore>
            }
            None => {
                warn!("DATABASE_URL not set; using in-memory store, data is lost on restart");
                Arc::new(MemoryUserStore::new()) as Arc<dyn UserStore>
            }
        };

        let mailer = match &config.smtp {
            Some(smtp) if smtp.tls => Arc::new(SmtpMailer::new(smtp)?) as Arc<dyn Mailer>,
            Some(smtp) => Arc::new(SmtpMailer::new_local(
                &smtp.host,
                smtp.port,
                &smtp.from_name,
                &smtp.from_email,
            )?) as Arc<dyn Mailer>,
            None => {
                warn!("SMTP_HOST not set; verification emails are logged, not delivered");
                Arc::new(MemoryMailer::new()) as Arc<dyn Mailer>
            }
        };

        Ok(Self::from_parts(Arc::new(config), store, mailer))
    }

    pub fn from_parts(
        config: Arc<AppConfig>,
        store: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let verification = VerificationService::new(
            store.clone(),
            mailer,
            Duration::minutes(config.verify_code_ttl_minutes),
        );
        Self {
            config,
            store,
            verification,
        }
    }
}
