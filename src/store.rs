use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Campaign, CampaignStatus, SendLogEntry};

mod postgres;

pub use postgres::PgCampaignStore;

/// Durable home of campaigns and their send logs.
///
/// Writes are expected to be visible to any read that follows them.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn create(&self, campaign: &Campaign) -> Result<(), anyhow::Error>;

    async fn update(&self, campaign: &Campaign) -> Result<(), anyhow::Error>;

    /// Log entries are append-only.
    async fn append(&self, entry: &SendLogEntry) -> Result<(), anyhow::Error>;

    async fn get(&self, campaign_id: Uuid) -> Result<Option<Campaign>, anyhow::Error>;

    /// Entries of one campaign, in the order they were appended.
    async fn logs(&self, campaign_id: Uuid) -> Result<Vec<SendLogEntry>, anyhow::Error>;

    /// Completed campaigns, most recently completed first.
    async fn history(&self, limit: usize) -> Result<Vec<Campaign>, anyhow::Error>;
}

/// Process-local store, used by tests and by single-instance deployments
/// that do not need the history to survive a restart.
#[derive(Default)]
pub struct InMemoryCampaignStore {
    campaigns: Mutex<HashMap<Uuid, Campaign>>,
    logs: Mutex<Vec<SendLogEntry>>,
}

impl InMemoryCampaignStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("The in-memory campaign store lock was poisoned")
}

#[async_trait]
impl CampaignStore for InMemoryCampaignStore {
    async fn create(&self, campaign: &Campaign) -> Result<(), anyhow::Error> {
        let mut campaigns = self.campaigns.lock().map_err(poisoned)?;
        if campaigns.contains_key(&campaign.id()) {
            anyhow::bail!("Campaign {} already exists", campaign.id());
        }
        campaigns.insert(campaign.id(), campaign.clone());
        Ok(())
    }

    async fn update(&self, campaign: &Campaign) -> Result<(), anyhow::Error> {
        let mut campaigns = self.campaigns.lock().map_err(poisoned)?;
        match campaigns.get_mut(&campaign.id()) {
            Some(stored) => {
                *stored = campaign.clone();
                Ok(())
            }
            None => anyhow::bail!("Campaign {} does not exist", campaign.id()),
        }
    }

    async fn append(&self, entry: &SendLogEntry) -> Result<(), anyhow::Error> {
        self.logs.lock().map_err(poisoned)?.push(entry.clone());
        Ok(())
    }

    async fn get(&self, campaign_id: Uuid) -> Result<Option<Campaign>, anyhow::Error> {
        Ok(self.campaigns.lock().map_err(poisoned)?.get(&campaign_id).cloned())
    }

    async fn logs(&self, campaign_id: Uuid) -> Result<Vec<SendLogEntry>, anyhow::Error> {
        Ok(self
            .logs
            .lock()
            .map_err(poisoned)?
            .iter()
            .filter(|entry| entry.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn history(&self, limit: usize) -> Result<Vec<Campaign>, anyhow::Error> {
        let mut completed: Vec<Campaign> = self
            .campaigns
            .lock()
            .map_err(poisoned)?
            .values()
            .filter(|c| c.status() == CampaignStatus::Completed)
            .cloned()
            .collect();
        completed.sort_by_key(|c| std::cmp::Reverse(c.completed_at()));
        completed.truncate(limit);
        Ok(completed)
    }
}
