use async_trait::async_trait;
use slipbot_core::{
    config::SlipsConfig, entitlement::Tier, error::SlipbotError, traits::SlipSource,
};

/// Serves the slip text configured for each tier.
pub struct StaticSlips {
    config: SlipsConfig,
}

impl StaticSlips {
    pub fn new(config: SlipsConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SlipSource for StaticSlips {
    async fn slip(&self, tier: Tier) -> Result<String, SlipbotError> {
        Ok(match tier {
            Tier::Free => self.config.free.clone(),
            Tier::Normal => self.config.normal.clone(),
            Tier::Premium => self.config.premium.clone(),
        })
    }
}
