//! Access-token monitor.
//!
//! Checks the platform credential and escalates by band: expired and
//! soon-to-expire tokens alert every admin; a token inside the advisory
//! window gets a softer heads-up; a healthy token stays quiet.

use crate::activity::ActivityLog;
use crate::domain::{AgentLogEntry, TokenBand, TokenStatus, agents};
use crate::error::Result;
use crate::notify::Notifier;
use crate::platform::SocialPlatform;
use std::sync::Arc;

pub struct TokenMonitor {
    activity: ActivityLog,
    notifier: Notifier,
    platform: Arc<dyn SocialPlatform>,
}

impl TokenMonitor {
    pub fn new(
        activity: ActivityLog,
        notifier: Notifier,
        platform: Arc<dyn SocialPlatform>,
    ) -> Self {
        Self {
            activity,
            notifier,
            platform,
        }
    }

    /// One check: fetch status, classify, notify per band.
    pub async fn check(&self) -> Result<TokenStatus> {
        let status = self.platform.get_token_status().await?;

        let band = status.band();
        match band {
            TokenBand::Expired => {
                self.notifier.notify_admins(
                    "alert",
                    "Access token expired",
                    "The platform access token is invalid or expired. Publishing is down until it is renewed.",
                )?;
            }
            TokenBand::Urgent => {
                let days = status.days_until_expiry.unwrap_or(0);
                self.notifier.notify_admins(
                    "alert",
                    "Access token expiring soon",
                    &format!("The platform access token expires in {} day(s). Renew it now.", days),
                )?;
            }
            TokenBand::Advisory => {
                let days = status.days_until_expiry.unwrap_or(0);
                self.notifier.notify_admins(
                    "advisory",
                    "Access token renewal due",
                    &format!("The platform access token expires in {} day(s).", days),
                )?;
            }
            TokenBand::Healthy => {}
        }

        self.activity.record(AgentLogEntry::info(
            agents::TOKEN_MONITOR,
            &format!(
                "token check: valid={}, days_until_expiry={:?}",
                status.is_valid, status.days_until_expiry
            ),
        ))?;

        tracing::debug!(valid = status.is_valid, band = ?band, "token check complete");
        Ok(status)
    }
}
