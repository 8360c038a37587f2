//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{error, info};

use crate::app::options::{AppOptions, GatewayOptions};
use crate::authn::token::TokenSigner;
use crate::authn::users::{UserDirectory, UserRecord};
use crate::authn::LocalCredentials;
use crate::errors::GatewayError;
use crate::executor::CommandExecutor;
use crate::facade::{Gateway, GatewayParts};
use crate::policy::CommandPolicy;
use crate::registry::{DeviceRegistry, StoredDevice};
use crate::routeros::RouterOsConnector;
use crate::server::serve::serve;
use crate::server::state::ServerState;
use crate::session::{DeviceConnector, SessionFactory};
use crate::snapshot::BackupStore;
use crate::storage::collection::JsonCollection;

/// Run the gateway until `shutdown_signal` resolves
pub async fn run(
    options: AppOptions,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), GatewayError> {
    info!("Initializing routergate...");

    let AppOptions {
        server,
        gateway,
        max_shutdown_delay,
    } = options;

    gateway.layout.setup().await?;
    let gateway = Arc::new(build_gateway(gateway, Arc::new(RouterOsConnector)));

    let (shutdown_tx, _shutdown_rx): (broadcast::Sender<()>, _) = broadcast::channel(1);
    let mut server_shutdown_rx = shutdown_tx.subscribe();
    let server_handle = serve(&server, Arc::new(ServerState::new(gateway)), async move {
        let _ = server_shutdown_rx.recv().await;
    })
    .await?;

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");
    let _ = shutdown_tx.send(());

    match tokio::time::timeout(max_shutdown_delay, server_handle).await {
        Ok(joined) => joined.map_err(|e| GatewayError::ServerError(e.to_string()))??,
        Err(_) => {
            error!("Shutdown timed out after {:?}", max_shutdown_delay);
            return Err(GatewayError::ServerError("shutdown timed out".to_string()));
        }
    }

    info!("Shutdown complete");
    Ok(())
}

/// Wire the gateway core over the JSON stores in `options.layout`
pub fn build_gateway(options: GatewayOptions, connector: Arc<dyn DeviceConnector>) -> Gateway {
    let layout = options.layout;

    let users = Arc::new(UserDirectory::new(Arc::new(JsonCollection::<UserRecord>::new(
        layout.users_file(),
    ))));
    let registry = Arc::new(DeviceRegistry::new(
        Arc::new(JsonCollection::<StoredDevice>::new(layout.routers_file())),
        options.default_device_port,
    ));
    let signer = TokenSigner::new(options.jwt_secret, options.token_ttl);
    let credentials = Arc::new(LocalCredentials::new(users.clone(), signer));

    info!(
        "Writes {}; connect timeout {:?}; command timeout {:?}",
        if options.write_enabled { "enabled" } else { "disabled" },
        options.connect_timeout,
        options.command_timeout
    );

    Gateway::new(GatewayParts {
        credentials,
        users,
        registry,
        policy: CommandPolicy::new(options.write_enabled),
        sessions: SessionFactory::new(connector, options.connect_timeout),
        executor: CommandExecutor::new(options.command_timeout),
        backups: BackupStore::new(layout.backups_dir()),
    })
}
