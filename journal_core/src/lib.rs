pub mod entity;
pub mod ids;
pub mod models;

use std::time::Duration;

use iroh::Endpoint;
use zel_core::{prelude::RpcServerBuilder, protocol::RpcClient, IrohBundle};

use crate::service::{
    debates::{DebatesClient, DebatesServer, DebatesService},
    groups::{GroupsClient, GroupsServer, GroupsService},
    penalties::{PenaltiesClient, PenaltiesServer, PenaltiesService},
    policies::{PoliciesClient, PoliciesServer, PoliciesService},
    sweeper::{ProposalSweeper, SweeperHandle},
    votes::{VotesClient, VotesServer, VotesService},
};

pub mod service;

pub mod error;

pub mod config;

static ALPN: &[u8] = b"journal::0.1.0";

/// Main runtime handle for the journal moderation node.
pub struct JournalCore {
    pub config: config::JournalConfig,

    /// Server bundle that accepts inbound RPC traffic.
    pub server: IrohBundle,

    /// Client-side endpoint used to reach the local server.
    pub client_endpoint: Endpoint,

    /// Background resolution of overdue proposals.
    sweeper: SweeperHandle,

    /// Typed clients for the local server.
    pub groups: GroupsClient,
    pub policies: PoliciesClient,
    pub votes: VotesClient,
    pub debates: DebatesClient,
    pub penalties: PenaltiesClient,
}

impl JournalCore {
    pub async fn start() -> Result<Self, Box<dyn std::error::Error>> {
        let config = config::get_or_init().await?;
        tracing::info!(database = %config.database_path.display(), "starting journal core");
        // ----------------
        // Server endpoint
        // ----------------
        let mut server_builder = IrohBundle::builder(Some(config.secret_key.clone())).await?;
        let server_endpoint = server_builder.endpoint().clone();

        // DB + migrations
        let db = models::open_or_create_db(&config).await?;
        models::migrate_up(&db).await?;

        let groups_service = GroupsService::new(db.clone());
        let policies_service = PoliciesService::new(db.clone(), config.policy_limits);
        let votes_service = VotesService::new(db.clone());
        let debates_service = DebatesService::new(db.clone());
        let penalties_service = PenaltiesService::new(db.clone());

        let sweeper = ProposalSweeper::new(
            policies_service.clone(),
            Duration::from_secs(config.sweep_interval_secs),
        )
        .spawn();

        // Register RPC servers
        let rpc_server_builder = RpcServerBuilder::new(ALPN, server_endpoint.clone());

        let rpc_server_builder = groups_service.register_service(rpc_server_builder);
        let rpc_server_builder = policies_service.register_service(rpc_server_builder);
        let rpc_server_builder = votes_service.register_service(rpc_server_builder);
        let rpc_server_builder = debates_service.register_service(rpc_server_builder);
        let rpc_server_builder = penalties_service.register_service(rpc_server_builder);

        let rpc_server = rpc_server_builder.build();

        let server = server_builder.accept(ALPN, rpc_server).finish().await;

        server.wait_online().await;

        // ----------------
        // Client endpoint
        // ----------------
        let client_endpoint = Endpoint::builder()
            .secret_key(config.client_secret_key.clone())
            .alpns(vec![ALPN.to_vec()])
            .bind()
            .await?;

        client_endpoint.online().await;

        // Connect client endpoint -> server endpoint, one connection per typed client
        let connect = || async {
            let conn = client_endpoint
                .connect(server.endpoint.addr(), ALPN)
                .await?;
            Ok::<_, Box<dyn std::error::Error>>(RpcClient::new(conn).await?)
        };

        let groups = GroupsClient::new(connect().await?);
        let policies = PoliciesClient::new(connect().await?);
        let votes = VotesClient::new(connect().await?);
        let debates = DebatesClient::new(connect().await?);
        let penalties = PenaltiesClient::new(connect().await?);

        tracing::info!("journal core online");

        Ok(Self {
            config,
            server,
            client_endpoint,
            sweeper,
            groups,
            policies,
            votes,
            debates,
            penalties,
        })
    }

    pub async fn shutdown(self) -> Result<(), Box<dyn std::error::Error>> {
        self.sweeper.stop().await;

        // Close client endpoint
        self.client_endpoint.close().await;

        // Shutdown server bundle
        self.server.shutdown(Duration::from_secs(5)).await?;

        tracing::info!("journal core stopped");
        Ok(())
    }
}

pub mod prelude {
    pub use super::ids;
    pub use super::entity;
    pub use super::models;

    pub use super::service;

    pub use super::error;

    pub use super::config;

    pub use zel_core;
}
