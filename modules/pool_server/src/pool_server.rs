//! Gasless pool server
//!
//! Serves `POST /` (sponsor and sign, or countersign) and `GET /conditions`
//! for a single pool key.

use anyhow::Result;
use gasless_common::{LedgerQuery, PoolConditions, Signer};
use gasless_module_sponsor::Pool;
use std::sync::Arc;
use tracing::info;

mod configuration;
mod server;
mod signer;

pub use configuration::PoolServerConfig;
pub use server::router;
pub use signer::KeySigner;

/// Build the pool described by `config` on top of `ledger`
pub fn build_pool<L: LedgerQuery>(
    config: &PoolServerConfig,
    ledger: L,
    conditions: PoolConditions,
) -> Result<Pool<L, KeySigner>> {
    let signer = config.load_signer()?;
    let address = config.pool_address(&signer)?;
    info!("Pool key {} sponsoring from {address}", signer.key_hash());

    Ok(Pool::new(ledger, signer, address, conditions).with_reservation(config.fee_reservation))
}

/// Listen until ctrl-c
pub async fn serve<L, S>(pool: Arc<Pool<L, S>>, listen: &str) -> Result<()>
where
    L: LedgerQuery + 'static,
    S: Signer + 'static,
{
    let listener = tokio::net::TcpListener::bind(listen).await?;
    info!("Pool server listening on {listen}");

    axum::serve(listener, router(pool))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Pool server shutting down");
        })
        .await?;
    Ok(())
}
