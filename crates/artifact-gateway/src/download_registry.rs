//! Token to download bindings
//!
//! Expired bindings are only dropped by the periodic sweep, so a binding
//! can outlive its TTL by up to one sweep interval.

use artifact_common::Token;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// What a token resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadDescriptor {
    /// Upstream artifact URL
    pub url: String,

    /// Name the client downloads the file as
    pub file_name: String,

    /// Project the artifact was listed under
    pub project: String,
}

struct DownloadEntry {
    descriptor: DownloadDescriptor,
    expires_at: Instant,
}

#[derive(Default)]
pub struct DownloadRegistry {
    entries: RwLock<HashMap<Token, DownloadEntry>>,
}

impl DownloadRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, token: Token, descriptor: DownloadDescriptor, ttl: Duration) {
        self.register_all([(token, descriptor)], ttl).await;
    }

    /// Bind every token in `downloads`, replacing existing bindings
    pub async fn register_all<I>(&self, downloads: I, ttl: Duration)
    where
        I: IntoIterator<Item = (Token, DownloadDescriptor)>,
    {
        let expires_at = Instant::now() + ttl;
        let mut entries = self.entries.write().await;
        for (token, descriptor) in downloads {
            entries.insert(
                token,
                DownloadEntry {
                    descriptor,
                    expires_at,
                },
            );
        }
    }

    pub async fn resolve(&self, token: &str) -> Option<DownloadDescriptor> {
        let entries = self.entries.read().await;
        entries.get(token).map(|entry| entry.descriptor.clone())
    }

    /// Remove every expired binding, returning how many were removed
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.expires_at > now);
        before - entries.len()
    }

    /// Run [`DownloadRegistry::sweep`] every `interval` for the life of the process
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let registry = Arc::clone(self);

        tokio::spawn(async move {
            info!("Sweeping expired download links every {:?}", interval);

            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let removed = registry.sweep().await;
                if removed > 0 {
                    info!("Swept {} expired download links", removed);
                } else {
                    debug!("Sweep found no expired download links");
                }
            }
        })
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor(name: &str) -> DownloadDescriptor {
        DownloadDescriptor {
            url: format!("http://ci.test/job/demo/10/artifact/{}", name),
            file_name: name.to_string(),
            project: "demo".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let registry = DownloadRegistry::new();
        let token = Token::encode(1_000, 0);
        registry
            .register(token.clone(), descriptor("a.zip"), Duration::from_secs(60))
            .await;

        assert_eq!(
            registry.resolve(token.as_str()).await,
            Some(descriptor("a.zip"))
        );
        assert_eq!(registry.resolve("unknown").await, None);
    }

    #[tokio::test]
    async fn test_register_all_replaces_bindings() {
        let registry = DownloadRegistry::new();
        let token = Token::encode(1_000, 0);

        registry
            .register(token.clone(), descriptor("a.zip"), Duration::from_secs(60))
            .await;
        registry
            .register_all(
                vec![
                    (token.clone(), descriptor("b.zip")),
                    (Token::encode(1_000, 1), descriptor("c.zip")),
                ],
                Duration::from_secs(60),
            )
            .await;

        assert_eq!(registry.len().await, 2);
        assert_eq!(
            registry.resolve(token.as_str()).await.map(|d| d.file_name),
            Some("b.zip".to_string())
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_removes_only_expired() {
        let registry = DownloadRegistry::new();
        registry
            .register(Token::encode(1, 0), descriptor("old.zip"), Duration::from_secs(10))
            .await;
        registry
            .register(Token::encode(2, 0), descriptor("new.zip"), Duration::from_secs(100))
            .await;

        tokio::time::advance(Duration::from_secs(11)).await;

        // Expired but not yet swept
        assert!(registry.resolve(Token::encode(1, 0).as_str()).await.is_some());

        assert_eq!(registry.sweep().await, 1);
        assert!(registry.resolve(Token::encode(1, 0).as_str()).await.is_none());
        assert!(registry.resolve(Token::encode(2, 0).as_str()).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_bounds_staleness() {
        let registry = Arc::new(DownloadRegistry::new());
        let interval = Duration::from_secs(60);
        let token = Token::encode(1, 0);

        registry
            .register(token.clone(), descriptor("a.zip"), Duration::from_secs(30))
            .await;
        let sweeper = registry.spawn_sweeper(interval);

        // Past expiry, before the first tick
        tokio::time::sleep(Duration::from_secs(45)).await;
        assert!(registry.resolve(token.as_str()).await.is_some());

        // Two sweep intervals past expiry
        tokio::time::sleep(Duration::from_secs(30) + 2 * interval).await;
        assert!(registry.resolve(token.as_str()).await.is_none());
        assert!(registry.is_empty().await);

        sweeper.abort();
    }
}
