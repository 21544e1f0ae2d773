use std::sync::Arc;

use pm_po::api::{self, AppState};
use pm_po::application::PurchaseOrderService;
use pm_po::infrastructure::persistence::{MIGRATOR, PostgresUnitOfWorkFactory};
use procure_bootstrap::{ServiceConfig, run_http_server};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    run_http_server(
        ServiceConfig::default().with_migrator(&MIGRATOR),
        |infra| async move {
            let uow_factory = Arc::new(PostgresUnitOfWorkFactory::new(infra.postgres_pool()));
            let service = Arc::new(PurchaseOrderService::new(uow_factory));

            Ok(api::router(AppState::new(service).with_infrastructure(infra)))
        },
    )
    .await
}
