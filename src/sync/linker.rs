//! Pilot linking
//!
//! Connects locally registered members to their synced Airtable pilot record
//! by callsign. Matching ignores case. A member without a match is left alone
//! and retried on the next run.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::repositories::{PilotRepository, UserRoleRepository, VirtualAirlineRepository};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LinkReport {
    /// Unlinked roles with a callsign that were looked up
    pub examined: u64,
    /// Roles whose link was set during this run
    pub linked: u64,
}

impl LinkReport {
    fn absorb(&mut self, other: LinkReport) {
        self.examined += other.examined;
        self.linked += other.linked;
    }
}

pub struct PilotLinker {
    roles: UserRoleRepository,
    pilots: PilotRepository,
    vas: VirtualAirlineRepository,
}

impl PilotLinker {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self {
            roles: UserRoleRepository::new(db.clone()),
            pilots: PilotRepository::new(db.clone()),
            vas: VirtualAirlineRepository::new(db),
        }
    }

    /// Link the unlinked roles of one VA.
    #[instrument(skip(self), fields(va_id = %va_id))]
    pub async fn run_for_va(&self, va_id: Uuid) -> Result<LinkReport, RepositoryError> {
        let mut report = LinkReport::default();

        for role in self.roles.list_unlinked_with_callsign(va_id).await? {
            let Some(callsign) = role.callsign.as_deref() else {
                continue;
            };
            report.examined += 1;

            let Some(pilot) = self.pilots.find_by_callsign(va_id, callsign).await? else {
                debug!(role_id = %role.id, callsign, "No synced pilot for callsign yet");
                continue;
            };
            if self
                .roles
                .set_pilot_link(role.id, &pilot.airtable_record_id)
                .await?
            {
                report.linked += 1;
                info!(
                    role_id = %role.id,
                    user_id = %role.user_id,
                    callsign,
                    pilot_record_id = %pilot.airtable_record_id,
                    "Linked user to pilot"
                );
            }
        }

        Ok(report)
    }

    /// Link roles across every active VA; a failing VA does not stop the rest.
    #[instrument(skip(self))]
    pub async fn run_all(&self) -> LinkReport {
        let vas = match self.vas.list_active().await {
            Ok(vas) => vas,
            Err(err) => {
                error!(error = ?err, "Failed to list virtual airlines for linking");
                return LinkReport::default();
            }
        };

        let mut total = LinkReport::default();
        for va in vas {
            match self.run_for_va(va.id).await {
                Ok(report) => total.absorb(report),
                Err(err) => {
                    error!(error = %err, va_id = %va.id, "Pilot linking failed for virtual airline");
                }
            }
        }

        info!(
            examined = total.examined,
            linked = total.linked,
            "Pilot linking completed"
        );
        total
    }
}
