//! Remote pool validation
//!
//! Fetches a pool's published conditions, runs the same checks the pool will
//! run, and only then asks the pool to countersign.

use async_trait::async_trait;
use gasless_codec::Transaction;
use gasless_common::{
    LedgerQuery, SponsorError,
    protocol::{ConditionsResponse, PoolRequest, PoolResponse},
};
use gasless_module_sponsor::{PoolValidation, validation::validate_transaction};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// HTTP access to one pool server
pub struct PoolEndpoint {
    client: Client,
    url: String,
}

fn remote_error(e: impl std::fmt::Display) -> SponsorError {
    SponsorError::SigningServerError(e.to_string())
}

impl PoolEndpoint {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// `GET {pool}/conditions`
    pub async fn fetch_conditions(&self) -> Result<ConditionsResponse, SponsorError> {
        let url = format!("{}/conditions", self.url);
        debug!("Fetching pool conditions from {url}");
        let response = self.client.get(&url).send().await.map_err(remote_error)?;
        if !response.status().is_success() {
            return Err(remote_error(format!("{url} returned {}", response.status())));
        }
        response.json().await.map_err(remote_error)
    }

    /// `POST {pool}` with the transaction alone, asking for a countersignature
    pub async fn request_signature(&self, tx_cbor: &str) -> Result<String, SponsorError> {
        let request = PoolRequest::countersign(tx_cbor.to_string());
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(remote_error)?;

        // failures carry a JSON body with the reason, whatever the status
        let status = response.status();
        let reply: PoolResponse = response
            .json()
            .await
            .map_err(|e| remote_error(format!("pool returned {status}: {e}")))?;

        if let Some(error) = reply.error {
            return Err(remote_error(format!("{}: {}", error.code, error.message)));
        }
        match reply.data {
            Some(signed) if reply.success => Ok(signed),
            _ => Err(remote_error(format!("pool returned {status} without a transaction"))),
        }
    }
}

/// Validation against a remote pool, checked first on the local ledger view
pub struct SponsorClient<L> {
    ledger: L,
    endpoint: PoolEndpoint,
}

impl<L: LedgerQuery> SponsorClient<L> {
    pub fn new(ledger: L, endpoint: PoolEndpoint) -> Self {
        Self { ledger, endpoint }
    }

    pub fn endpoint(&self) -> &PoolEndpoint {
        &self.endpoint
    }
}

#[async_trait]
impl<L: LedgerQuery> PoolValidation for SponsorClient<L> {
    async fn validate_tx(&self, tx_cbor: &str) -> Result<String, SponsorError> {
        let tx = Transaction::from_hex(tx_cbor)?;
        let remote = self.endpoint.fetch_conditions().await?;

        validate_transaction(&self.ledger, &tx, &remote.pub_key, &remote.conditions).await?;

        let signed = self.endpoint.request_signature(tx_cbor.trim()).await?;
        info!("Pool {} countersigned transaction", self.endpoint.url());
        Ok(signed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gasless_common::{PoolConditions, Value};
    use gasless_module_sponsor::augment::sponsor_transaction;
    use gasless_test_utils::{
        InMemoryLedger, TxBuilder, address, key_hash, test_params, tx_input, utxo,
    };
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const POOL: u8 = 2;

    fn ledger() -> InMemoryLedger {
        let ledger = InMemoryLedger::default();
        ledger.add_utxo(utxo(tx_input(1, 0), address(1), Value::new(10_000_000)));
        ledger
    }

    async fn sponsored(ledger: &InMemoryLedger) -> String {
        let base = Transaction::decode(
            &TxBuilder::new()
                .input(tx_input(1, 0))
                .output(address(3), Value::new(9_000_000))
                .build(),
        )
        .unwrap();
        let pool_utxo = utxo(tx_input(POOL, 0), address(POOL), Value::new(5_000_000));
        ledger.add_utxo(pool_utxo.clone());

        sponsor_transaction(ledger, base, &pool_utxo, key_hash(POOL), &test_params())
            .await
            .unwrap()
            .to_hex()
            .unwrap()
    }

    async fn publish(server: &MockServer, conditions: PoolConditions) {
        let body = ConditionsResponse {
            pub_key: key_hash(POOL),
            conditions,
        };
        Mock::given(method("GET"))
            .and(path("/conditions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(server)
            .await;
    }

    fn client(ledger: InMemoryLedger, server: &MockServer) -> SponsorClient<InMemoryLedger> {
        let endpoint = PoolEndpoint::new(&format!("{}/", server.uri()), Duration::from_secs(5));
        SponsorClient::new(ledger, endpoint.unwrap())
    }

    #[tokio::test]
    async fn valid_tx_is_sent_for_countersignature() {
        let server = MockServer::start().await;
        let ledger = ledger();
        let tx = sponsored(&ledger).await;
        publish(&server, PoolConditions::default()).await;

        Mock::given(method("POST"))
            .and(path("/"))
            .and(body_json(json!({ "txCbor": tx })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "data": "84signed", "error": null, "success": true })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let signed = client(ledger, &server).validate_tx(&tx).await.unwrap();
        assert_eq!(signed, "84signed");
    }

    #[tokio::test]
    async fn local_rejection_never_reaches_the_pool() {
        let server = MockServer::start().await;
        let ledger = ledger();
        let tx = sponsored(&ledger).await;
        publish(
            &server,
            PoolConditions {
                whitelist: Some(vec![address(7).to_string()]),
                ..Default::default()
            },
        )
        .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(ledger, &server).validate_tx(&tx).await.unwrap_err();
        assert_eq!(err, SponsorError::AddressNotWhitelisted);
    }

    #[tokio::test]
    async fn pool_refusal_is_a_signing_server_error() {
        let server = MockServer::start().await;
        let ledger = ledger();
        let tx = sponsored(&ledger).await;
        publish(&server, PoolConditions::default()).await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(422).set_body_json(json!({
                "data": null,
                "error": { "code": "FeeMismatch", "message": "fee" },
                "success": false
            })))
            .mount(&server)
            .await;

        let err = client(ledger, &server).validate_tx(&tx).await.unwrap_err();
        assert_eq!(err.code(), "SigningServerError");
        assert!(err.to_string().contains("FeeMismatch"));
    }

    #[tokio::test]
    async fn unreachable_conditions_fail_remotely() {
        let server = MockServer::start().await;
        let ledger = ledger();
        let tx = sponsored(&ledger).await;
        Mock::given(method("GET"))
            .and(path("/conditions"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = client(ledger, &server).validate_tx(&tx).await.unwrap_err();
        assert_eq!(err.code(), "SigningServerError");
    }

    #[tokio::test]
    async fn undecodable_tx_is_rejected_before_any_call() {
        let server = MockServer::start().await;
        let err = client(ledger(), &server).validate_tx("zz").await.unwrap_err();
        assert_eq!(err.code(), "InvalidTransaction");
        assert!(server.received_requests().await.unwrap().is_empty());
    }
}
