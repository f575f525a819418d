//! Daily sweep entry point. Run once per day: flips DUE tasks past their
//! due date to OVERDUE, reactivates expired waivers, then raises overdue
//! and escalation notifications.

use std::sync::Arc;

use monitor_service::infrastructure::database::postgres::{
    PgAuditRepository, PgEventRepository, PgNotificationRepository, PgPatientRepository,
    PgTaskRepository,
};
use monitor_service::jobs::DailySweep;
use monitor_service::services::notification_engine::{LogSender, NotificationEngine};
use monitor_service::services::task_generator::TaskGenerator;
use shared::infrastructure::database::{create_pool, DatabaseService};
use shared::Settings;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let settings = Settings::from_env()
        .map_err(|e| anyhow::anyhow!("failed to load configuration: {e}"))?;

    let subscriber = tracing_subscriber::fmt().with_env_filter(
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&settings.logging.level)),
    );
    if settings.logging.json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("starting daily sweep");

    let pool = create_pool(&settings.database).await?;
    let database_service = DatabaseService::new(pool.clone());
    database_service.health_check().await?;

    let tasks = Arc::new(PgTaskRepository::new(pool.clone()));
    let patients = Arc::new(PgPatientRepository::new(pool.clone()));
    let events = Arc::new(PgEventRepository::new(pool.clone()));
    let notifications = Arc::new(PgNotificationRepository::new(pool.clone()));
    let audit = Arc::new(PgAuditRepository::new(pool));

    let task_generator = TaskGenerator::new(tasks.clone(), audit.clone(), &settings.monitoring);
    let notification_engine = NotificationEngine::new(
        notifications,
        tasks,
        patients,
        events,
        audit,
        Arc::new(LogSender),
        settings.notifications.clone(),
        settings.monitoring.escalation_threshold_days,
    );

    let summary = DailySweep::new(task_generator, notification_engine)
        .run()
        .await?;
    info!(
        tasks_marked_overdue = summary.tasks_marked_overdue,
        waivers_reactivated = summary.waivers_reactivated,
        notifications_created = summary.notifications_created,
        "daily sweep complete"
    );
    Ok(())
}
