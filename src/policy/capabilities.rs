//! Worker roles and the capability flags that gate their priority chains

use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::{JobError, Result};
use crate::jobs::job::JobKind;
use crate::world::entity::EntityKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Miner,
    RemoteMiner,
    MineralMiner,
    Harvester,
    Worker,
    Lorry,
    Manager,
    PowerUpgrader,
    Claimer,
    RemoteReserver,
    RemoteColonizer,
    RemoteHarvester,
    Scout,
    // Military roles are driven elsewhere
    Defender,
    Attacker,
    Healer,
}

impl Role {
    pub const ALL: [Role; 16] = [
        Role::Miner,
        Role::RemoteMiner,
        Role::MineralMiner,
        Role::Harvester,
        Role::Worker,
        Role::Lorry,
        Role::Manager,
        Role::PowerUpgrader,
        Role::Claimer,
        Role::RemoteReserver,
        Role::RemoteColonizer,
        Role::RemoteHarvester,
        Role::Scout,
        Role::Defender,
        Role::Attacker,
        Role::Healer,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Role::Miner => "miner",
            Role::RemoteMiner => "remote_miner",
            Role::MineralMiner => "mineral_miner",
            Role::Harvester => "harvester",
            Role::Worker => "worker",
            Role::Lorry => "lorry",
            Role::Manager => "manager",
            Role::PowerUpgrader => "power_upgrader",
            Role::Claimer => "claimer",
            Role::RemoteReserver => "remote_reserver",
            Role::RemoteColonizer => "remote_colonizer",
            Role::RemoteHarvester => "remote_harvester",
            Role::Scout => "scout",
            Role::Defender => "defender",
            Role::Attacker => "attacker",
            Role::Healer => "healer",
        }
    }

    pub fn from_name(name: &str) -> Option<Role> {
        Role::ALL.iter().copied().find(|role| role.name() == name)
    }

    pub fn is_military(&self) -> bool {
        matches!(self, Role::Defender | Role::Attacker | Role::Healer)
    }

    /// Roles that sit on a source and count against its access tiles
    pub fn is_miner(&self) -> bool {
        matches!(self, Role::Miner | Role::RemoteMiner)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Capability {
    HarvestSources,
    HarvestMinerals,
    GetFromContainer,
    GetFromLink,
    GetFromStorage,
    GetFromTerminal,
    GetDroppedEnergy,
    GetLootJobs,
    FillSpawn,
    FillExtension,
    FillTower,
    FillLink,
    FillStorage,
    FillTerminal,
    Build,
    Repair,
    WallRepair,
    Upgrade,
    Sign,
    Claim,
    Reserve,
    AttackController,
}

impl Capability {
    /// Delivery capabilities map to a job kind and a destination kind
    pub fn delivery_target(&self) -> Option<(JobKind, EntityKind)> {
        match self {
            Capability::FillSpawn => Some((JobKind::Fill, EntityKind::Spawn)),
            Capability::FillExtension => Some((JobKind::Fill, EntityKind::Extension)),
            Capability::FillTower => Some((JobKind::Fill, EntityKind::Tower)),
            Capability::FillLink => Some((JobKind::Fill, EntityKind::Link)),
            Capability::FillStorage => Some((JobKind::Store, EntityKind::Storage)),
            Capability::FillTerminal => Some((JobKind::Store, EntityKind::Terminal)),
            _ => None,
        }
    }
}

/// One link of a delivery chain: a job kind restricted to some destinations
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryStep {
    pub kind: JobKind,
    pub targets: Vec<EntityKind>,
}

/// Capabilities of one role, in configured order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilitySet {
    pub capabilities: Vec<Capability>,
}

impl CapabilitySet {
    pub fn new(capabilities: impl IntoIterator<Item = Capability>) -> Self {
        let mut set = Self::default();
        for capability in capabilities {
            if !set.capabilities.contains(&capability) {
                set.capabilities.push(capability);
            }
        }
        set
    }

    pub fn has(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    pub fn has_any(&self, capabilities: &[Capability]) -> bool {
        capabilities.iter().any(|c| self.has(*c))
    }

    /// Delivery capabilities folded into steps, preserving configured order
    ///
    /// Consecutive capabilities that share a job kind form one step whose
    /// candidates compete on distance; a later step is only consulted when
    /// every earlier one came up empty.
    pub fn delivery_chain(&self) -> Vec<DeliveryStep> {
        let mut steps: Vec<DeliveryStep> = Vec::new();
        for (kind, target) in self.capabilities.iter().filter_map(|c| c.delivery_target()) {
            match steps.last_mut() {
                Some(step) if step.kind == kind => step.targets.push(target),
                _ => steps.push(DeliveryStep {
                    kind,
                    targets: vec![target],
                }),
            }
        }
        steps
    }
}

#[derive(Debug, Deserialize)]
struct RoleTable {
    #[serde(default)]
    roles: BTreeMap<String, CapabilitySet>,
}

/// Role to capability mapping, read once per selection
#[derive(Debug, Clone)]
pub struct RoleCapabilities {
    roles: AHashMap<Role, CapabilitySet>,
}

impl Default for RoleCapabilities {
    fn default() -> Self {
        use Capability::*;
        let table: [(Role, &[Capability]); 13] = [
            (Role::Miner, &[HarvestSources]),
            (Role::RemoteMiner, &[HarvestSources]),
            (Role::MineralMiner, &[HarvestMinerals, FillTerminal, FillStorage]),
            (
                Role::Harvester,
                &[
                    GetFromContainer,
                    GetDroppedEnergy,
                    GetLootJobs,
                    HarvestSources,
                    FillSpawn,
                    FillExtension,
                    FillTower,
                    FillStorage,
                    FillTerminal,
                    Build,
                    Repair,
                    Upgrade,
                ],
            ),
            (
                Role::Worker,
                &[
                    GetFromContainer,
                    GetDroppedEnergy,
                    GetLootJobs,
                    GetFromStorage,
                    GetFromTerminal,
                    HarvestSources,
                    Build,
                    Repair,
                    WallRepair,
                    Upgrade,
                    FillTower,
                ],
            ),
            (
                Role::Lorry,
                &[
                    GetFromContainer,
                    GetDroppedEnergy,
                    GetLootJobs,
                    FillSpawn,
                    FillExtension,
                    FillTower,
                    FillStorage,
                    FillTerminal,
                ],
            ),
            (
                Role::Manager,
                &[
                    GetFromStorage,
                    GetFromTerminal,
                    FillLink,
                    FillSpawn,
                    FillExtension,
                    FillTower,
                    FillTerminal,
                ],
            ),
            (Role::PowerUpgrader, &[GetFromLink, GetFromStorage, Upgrade]),
            (Role::Claimer, &[Claim, AttackController]),
            (Role::RemoteReserver, &[Reserve]),
            (
                Role::RemoteColonizer,
                &[GetFromContainer, GetDroppedEnergy, HarvestSources, Build, Repair, Upgrade],
            ),
            (
                Role::RemoteHarvester,
                &[
                    GetFromContainer,
                    GetDroppedEnergy,
                    HarvestSources,
                    FillSpawn,
                    FillExtension,
                    FillStorage,
                    FillTerminal,
                ],
            ),
            (Role::Scout, &[Sign]),
        ];

        Self {
            roles: table
                .iter()
                .map(|(role, caps)| (*role, CapabilitySet::new(caps.iter().copied())))
                .collect(),
        }
    }
}

impl RoleCapabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in defaults overridden by every role the document lists
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let table: RoleTable = toml::from_str(content)?;
        let mut capabilities = Self::default();
        for (name, set) in table.roles {
            let role = Role::from_name(&name)
                .ok_or_else(|| {
                    JobError::InvalidConfig(format!("Unknown role '{}' in capability table", name))
                })?;
            capabilities.set(role, set);
        }
        Ok(capabilities)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    pub fn set(&mut self, role: Role, set: CapabilitySet) {
        self.roles.insert(role, CapabilitySet::new(set.capabilities));
    }

    /// Capabilities of a role; a role nobody configured can do nothing
    pub fn for_role(&self, role: Role) -> CapabilitySet {
        self.roles.get(&role).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_names_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_name(role.name()), Some(role));
        }
        assert_eq!(Role::from_name("pirate"), None);
    }

    #[test]
    fn test_delivery_chain_groups_consecutive_kinds() {
        use Capability::*;
        let set = CapabilitySet::new([
            GetFromContainer,
            FillSpawn,
            FillExtension,
            FillTower,
            FillStorage,
            Build,
        ]);
        let chain = set.delivery_chain();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain[0].kind, JobKind::Fill);
        assert_eq!(
            chain[0].targets,
            vec![EntityKind::Spawn, EntityKind::Extension, EntityKind::Tower]
        );
        assert_eq!(chain[1].targets, vec![EntityKind::Storage]);
    }

    #[test]
    fn test_tower_before_storage_order() {
        use Capability::*;
        let chain = CapabilitySet::new([FillTower, FillStorage]).delivery_chain();
        assert_eq!(chain[0].targets, vec![EntityKind::Tower]);
        assert_eq!(chain[1].targets, vec![EntityKind::Storage]);
    }

    #[test]
    fn test_toml_overrides_one_role() {
        let caps = RoleCapabilities::from_toml_str(
            r#"
            [roles.harvester]
            capabilities = ["harvest-sources", "fill-tower", "fill-storage"]
            "#,
        )
        .unwrap();
        let harvester = caps.for_role(Role::Harvester);
        assert_eq!(harvester.capabilities.len(), 3);
        assert!(!harvester.has(Capability::Build));
        assert!(caps.for_role(Role::Worker).has(Capability::WallRepair));
        assert!(caps.for_role(Role::Defender).capabilities.is_empty());
    }

    #[test]
    fn test_toml_unknown_role_rejected() {
        let err =
            RoleCapabilities::from_toml_str("[roles.pirate]\ncapabilities = []\n").unwrap_err();
        assert!(matches!(err, JobError::InvalidConfig(_)));
    }
}
