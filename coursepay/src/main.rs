mod balance;
mod commissions;
mod config;
mod enrollments;
mod handlers;
mod intake;
mod state;
#[cfg(test)]
mod testutil;
mod transactions;
mod withdrawals;

use actix_web::{App, HttpServer, middleware::Logger, web};
use dotenv::dotenv;
use pretty_env_logger::env_logger::{Builder, Env};

use crate::config::AppConfig;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    if cli::run_cli().await {
        return Ok(());
    }

    let logger_env = Env::default().default_filter_or("debug");
    let mut logger_builder = Builder::from_env(logger_env);
    logger_builder.init();

    let config = AppConfig::from_env().map_err(|e| {
        log::error!("Application initialization failed: {:#}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    let state = config.create_app_state().await.map_err(|e| {
        log::error!("Application initialization failed: {:#}", e);
        std::io::Error::new(std::io::ErrorKind::Other, e.to_string())
    })?;

    log::info!("App state initialized successfully");

    let data = web::Data::new(state);

    // Spawn the periodic balance reconciliation sweep
    {
        let runner_state = data.clone();
        let interval = config.reconcile_interval_secs;
        tokio::spawn(async move {
            balance::start_reconciliation_runner(runner_state, interval).await;
        });
    }

    HttpServer::new(move || {
        App::new()
            .app_data(data.clone())
            .wrap(Logger::new("%a %t %r %s  %{Referer}i %Dms"))
            .service(handlers::index)
            .service(handlers::payment_confirmed)
            .service(handlers::lesson_completed)
            .service(handlers::get_enrollment_progress)
            .service(handlers::sync_enrollment_progress)
            .service(handlers::request_withdrawal)
            .service(handlers::change_withdrawal_status)
            .service(handlers::approve_commission)
            .service(handlers::mark_commission_paid)
            .service(handlers::request_affiliate_payout)
            .service(handlers::get_commission_summary)
            .service(handlers::get_lecturer_earnings)
    })
    .bind((config.bind_addr.as_str(), config.bind_port))?
    .run()
    .await
}
