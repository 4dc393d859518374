use etcd_client::{
    Client, ConnectOptions, DeleteOptions, EventType, GetOptions, PutOptions, WatchOptions,
};
use tracing::{debug, warn};

use crate::{Error, KvEntry, LeaseId, Result, Store, WatchEvent, WatchKind, WatchStream};

/// Coordination-store client backed by a real etcd cluster. Grounded on the
/// `etcd_client::Client` usage pattern in Ballista's scheduler cluster
/// module (`Client::connect(urls, None)`, then issuing calls straight off
/// that connection). `Client` wraps a cloneable gRPC channel, so each call
/// below clones it rather than guarding a single handle behind a mutex —
/// that keeps concurrent watch setup from blocking on in-flight RPCs.
pub struct EtcdStore {
    client: Client,
}

impl EtcdStore {
    pub async fn connect(endpoints: &[String], options: Option<ConnectOptions>) -> Result<Self> {
        let client = Client::connect(endpoints, options)
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait::async_trait]
impl Store for EtcdStore {
    async fn lease_grant(&self, ttl_secs: i64) -> Result<LeaseId> {
        let mut client = self.client.clone();
        let resp = client
            .lease_grant(ttl_secs, None)
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(LeaseId(resp.id()))
    }

    async fn lease_keep_alive(&self, id: LeaseId) -> Result<()> {
        let mut client = self.client.clone();
        let (mut keeper, mut stream) = client
            .lease_keep_alive(id.0)
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        keeper
            .keep_alive()
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        match stream
            .message()
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?
        {
            Some(resp) if resp.ttl() > 0 => Ok(()),
            _ => Err(Error::LeaseExpired(id.0)),
        }
    }

    async fn lease_revoke(&self, id: LeaseId) -> Result<()> {
        let mut client = self.client.clone();
        client
            .lease_revoke(id.0)
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn put(&self, key: &str, value: Vec<u8>, lease: Option<LeaseId>) -> Result<()> {
        let mut client = self.client.clone();
        let options = lease.map(|id| PutOptions::new().with_lease(id.0));
        client
            .put(key, value, options)
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<KvEntry>> {
        let mut client = self.client.clone();
        let resp = client
            .get(key, None)
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(resp.kvs().first().map(|kv| KvEntry {
            key: String::from_utf8_lossy(kv.key()).into_owned(),
            value: kv.value().to_vec(),
        }))
    }

    async fn get_prefix(&self, prefix: &str) -> Result<Vec<KvEntry>> {
        let mut client = self.client.clone();
        let resp = client
            .get(prefix, Some(GetOptions::new().with_prefix()))
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(resp
            .kvs()
            .iter()
            .map(|kv| KvEntry {
                key: String::from_utf8_lossy(kv.key()).into_owned(),
                value: kv.value().to_vec(),
            })
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut client = self.client.clone();
        client
            .delete(key, Some(DeleteOptions::new()))
            .await
            .map_err(|e| Error::Unavailable(e.to_string()))?;
        Ok(())
    }

    fn watch_prefix(&self, prefix: &str) -> WatchStream {
        let prefix = prefix.to_string();
        let mut client = self.client.clone();
        let (tx, rx) = tokio::sync::mpsc::channel::<WatchEvent>(256);

        tokio::spawn(async move {
            let (mut watcher, mut stream) = match client
                .watch(prefix.clone(), Some(WatchOptions::new().with_prefix()))
                .await
            {
                Ok(pair) => pair,
                Err(e) => {
                    warn!(error = %e, prefix = %prefix, "failed to start watch");
                    return;
                }
            };
            // The watcher handle must stay alive for as long as `stream`
            // yields messages; it is dropped together with this task.
            let _keep_alive = &mut watcher;

            loop {
                match stream.message().await {
                    Ok(Some(resp)) => {
                        for event in resp.events() {
                            let Some(kv) = event.kv() else { continue };
                            let ev = WatchEvent {
                                kind: match event.event_type() {
                                    EventType::Put => WatchKind::Put,
                                    EventType::Delete => WatchKind::Delete,
                                },
                                key: String::from_utf8_lossy(kv.key()).into_owned(),
                                value: kv.value().to_vec(),
                            };
                            if tx.send(ev).await.is_err() {
                                return;
                            }
                        }
                    }
                    Ok(None) => {
                        debug!(prefix = %prefix, "watch stream closed");
                        return;
                    }
                    Err(e) => {
                        warn!(error = %e, prefix = %prefix, "watch stream error");
                        return;
                    }
                }
            }
        });

        Box::pin(tokio_stream::wrappers::ReceiverStream::new(rx))
    }

    async fn close(&self) {
        debug!("closing etcd client");
    }
}
