//! Redis relay for multi-node group fan-out.

#[cfg(feature = "redis-pubsub")]
pub use implementation::RedisRelay;

#[cfg(feature = "redis-pubsub")]
mod implementation {
    use std::sync::Arc;

    use futures::StreamExt;
    use serde::{Deserialize, Serialize};
    use tokio::task::JoinHandle;
    use tracing::{error, info, warn};
    use uuid::Uuid;

    use cipherchat_core::error::{AppError, ErrorKind};
    use cipherchat_core::result::AppResult;
    use cipherchat_core::traits::GroupEvent;

    use crate::backplane::local::LocalBackplane;

    /// Redis channel all nodes share.
    const RELAY_CHANNEL: &str = "cipherchat:events";

    /// One relayed publish.
    #[derive(Debug, Serialize, Deserialize)]
    struct RelayFrame {
        /// Node the publish originated on; used to skip self-delivery.
        origin: Uuid,
        /// Target group.
        group: String,
        /// The published event.
        event: GroupEvent,
    }

    /// Mirrors backplane publishes through Redis PUBLISH.
    #[derive(Debug, Clone)]
    pub struct RedisRelay {
        /// Redis connection URL.
        url: String,
        /// This node's identity on the relay channel.
        origin: Uuid,
    }

    impl RedisRelay {
        /// Creates a relay for the given Redis URL.
        pub fn new(url: &str) -> Self {
            Self {
                url: url.to_string(),
                origin: Uuid::new_v4(),
            }
        }

        /// Publishes an event frame for sibling nodes.
        pub async fn publish(&self, group: &str, event: &GroupEvent) -> AppResult<()> {
            let frame = RelayFrame {
                origin: self.origin,
                group: group.to_string(),
                event: event.clone(),
            };
            let body = serde_json::to_string(&frame)?;

            let client = redis::Client::open(self.url.as_str()).map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Redis connection failed", e)
            })?;
            let mut conn = client.get_multiplexed_async_connection().await.map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Redis connection failed", e)
            })?;

            redis::cmd("PUBLISH")
                .arg(RELAY_CHANNEL)
                .arg(body)
                .query_async::<i64>(&mut conn)
                .await
                .map_err(|e| {
                    AppError::with_source(ErrorKind::StoreUnavailable, "Redis PUBLISH failed", e)
                })?;

            Ok(())
        }

        /// Spawns the subscriber loop applying remote publishes to local
        /// group members.
        pub fn spawn_subscriber(
            self: Arc<Self>,
            backplane: Arc<LocalBackplane>,
        ) -> JoinHandle<()> {
            tokio::spawn(async move {
                loop {
                    if let Err(e) = self.subscribe_loop(&backplane).await {
                        error!(error = %e, "Relay subscriber failed, reconnecting");
                        tokio::time::sleep(std::time::Duration::from_secs(1)).await;
                    }
                }
            })
        }

        async fn subscribe_loop(&self, backplane: &LocalBackplane) -> AppResult<()> {
            let client = redis::Client::open(self.url.as_str()).map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Redis connection failed", e)
            })?;
            let mut pubsub = client.get_async_pubsub().await.map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Redis connection failed", e)
            })?;
            pubsub.subscribe(RELAY_CHANNEL).await.map_err(|e| {
                AppError::with_source(ErrorKind::StoreUnavailable, "Redis SUBSCRIBE failed", e)
            })?;
            info!(channel = RELAY_CHANNEL, "Relay subscriber connected");

            let mut stream = pubsub.on_message();
            while let Some(message) = stream.next().await {
                let payload: String = match message.get_payload() {
                    Ok(payload) => payload,
                    Err(e) => {
                        warn!(error = %e, "Undecodable relay payload");
                        continue;
                    }
                };
                match serde_json::from_str::<RelayFrame>(&payload) {
                    Ok(frame) if frame.origin != self.origin => {
                        backplane.deliver_local(&frame.group, &frame.event);
                    }
                    Ok(_) => {} // own publish, already delivered locally
                    Err(e) => warn!(error = %e, "Malformed relay frame"),
                }
            }

            Err(AppError::store_unavailable("Relay subscription ended"))
        }
    }
}
