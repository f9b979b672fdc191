use ahash::AHashMap;
use tracing::warn;

use crate::core::error::{JobError, Result};
use crate::core::types::ObjectId;
use crate::jobs::capacity::RosterEntry;
use crate::jobs::catalog::{CatalogView, JobCatalog};
use crate::jobs::job::Job;
use crate::policy::capabilities::{Role, RoleCapabilities};
use crate::policy::roles::{
    ClaimerPolicy, EnergyCyclePolicy, ManagerPolicy, MineralMinerPolicy, MinerPolicy,
    PowerUpgraderPolicy, RemoteColonizerPolicy, RemoteHarvesterPolicy, RemoteReserverPolicy,
    RolePolicy, ScoutPolicy, SpendOrder,
};
use crate::policy::select::SelectionContext;

/// A job picked for a worker, with where it should stand while doing it
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub job: Job,
    pub move_target_override: Option<ObjectId>,
}

/// Role to policy lookup
pub struct PolicyRegistry {
    policies: AHashMap<Role, Box<dyn RolePolicy>>,
}

impl Default for PolicyRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(MinerPolicy::new(Role::Miner)));
        registry.register(Box::new(MinerPolicy::new(Role::RemoteMiner)));
        registry.register(Box::new(MineralMinerPolicy));
        registry.register(Box::new(EnergyCyclePolicy::new(
            Role::Harvester,
            SpendOrder::DeliverFirst,
        )));
        registry.register(Box::new(EnergyCyclePolicy::new(Role::Lorry, SpendOrder::DeliverFirst)));
        registry.register(Box::new(EnergyCyclePolicy::new(Role::Worker, SpendOrder::LaborFirst)));
        registry.register(Box::new(ManagerPolicy));
        registry.register(Box::new(PowerUpgraderPolicy));
        registry.register(Box::new(ClaimerPolicy));
        registry.register(Box::new(RemoteReserverPolicy));
        registry.register(Box::new(RemoteColonizerPolicy));
        registry.register(Box::new(RemoteHarvesterPolicy));
        registry.register(Box::new(ScoutPolicy));
        registry
    }
}

impl PolicyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn empty() -> Self {
        Self {
            policies: AHashMap::new(),
        }
    }

    /// Replaces any policy already registered for the same role
    pub fn register(&mut self, policy: Box<dyn RolePolicy>) {
        self.policies.insert(policy.role(), policy);
    }

    pub fn unregister(&mut self, role: Role) -> Option<Box<dyn RolePolicy>> {
        self.policies.remove(&role)
    }

    pub fn get(&self, role: Role) -> Result<&dyn RolePolicy> {
        self.policies
            .get(&role)
            .map(|p| p.as_ref())
            .ok_or(JobError::NoPolicy(role))
    }

    /// Run the worker's role chain against the catalog
    ///
    /// `worker` describes the worker as it stands now; `view.roster` is the
    /// snapshot taken at the start of the tick.
    pub fn select_job(
        &self,
        catalog: &mut JobCatalog,
        view: CatalogView<'_>,
        worker: &RosterEntry,
        capabilities: &RoleCapabilities,
    ) -> Result<Option<Selection>> {
        let policy = self.get(worker.role)?;
        let caps = capabilities.for_role(worker.role);
        let mut ctx = SelectionContext::new(catalog, view, worker, &caps);
        let Some(job) = policy.select_job(&mut ctx)? else {
            return Ok(None);
        };
        // a failed lookup only costs the override, never the job
        let move_target_override = match policy.move_override(&job, &mut ctx) {
            Ok(target) => target,
            Err(err) => {
                warn!(worker = %worker.worker, error = %err, "move override lookup failed");
                None
            }
        };
        Ok(Some(Selection {
            job,
            move_target_override,
        }))
    }
}
