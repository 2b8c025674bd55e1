//! Resources in one class that go away with their owner in another class.

use std::collections::HashSet;

use cloudsweep_config::ResourceClass;

use super::{Decision, DecisionReason};
use crate::resources::ResourceDescriptor;

/// How a dependent names the resource it hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DependentLink {
    /// `attached_to` holds the owner id.
    Attachment,
    /// The dependent id is this prefix followed by the owner id.
    NamePrefix(&'static str),
}

/// Removing an `owner` resource releases its dependents in another class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cascade {
    pub owner: ResourceClass,
    pub dependent: ResourceClass,
    pub link: DependentLink,
}

impl Cascade {
    /// Owner id `resource` hangs off, if it is a dependent under this cascade.
    pub fn owner_id<'a>(&self, resource: &'a ResourceDescriptor) -> Option<&'a str> {
        if resource.class != self.dependent || resource.is_child() {
            return None;
        }
        match self.link {
            DependentLink::Attachment => resource.attached_to.as_deref(),
            DependentLink::NamePrefix(prefix) => resource
                .id
                .strip_prefix(prefix)
                .filter(|owner| !owner.is_empty()),
        }
    }
}

/// Attached volumes go with their instance, function log groups with
/// their function.
pub const DEFAULT_CASCADES: [Cascade; 2] = [
    Cascade {
        owner: ResourceClass::Ec2Instance,
        dependent: ResourceClass::EbsVolume,
        link: DependentLink::Attachment,
    },
    Cascade {
        owner: ResourceClass::LambdaFunction,
        dependent: ResourceClass::LogGroup,
        link: DependentLink::NamePrefix("/aws/lambda/"),
    },
];

/// Owners removed, or planned for removal, earlier in the run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReleasedOwners {
    released: Vec<(Cascade, HashSet<String>)>,
}

impl ReleasedOwners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn release(&mut self, cascade: Cascade, owners: impl IntoIterator<Item = String>) {
        match self.released.iter_mut().find(|(known, _)| *known == cascade) {
            Some((_, known)) => known.extend(owners),
            None => self.released.push((cascade, owners.into_iter().collect())),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.released.iter().all(|(_, owners)| owners.is_empty())
    }

    /// The released owner `resource` depends on, if any.
    pub fn owner_of(&self, resource: &ResourceDescriptor) -> Option<(ResourceClass, String)> {
        self.released.iter().find_map(|(cascade, owners)| {
            let owner = cascade.owner_id(resource)?;
            owners
                .contains(owner)
                .then(|| (cascade.owner, owner.to_string()))
        })
    }
}

/// Revisit a decision in light of owners released earlier in the run.
///
/// A dependent of a released owner is included even when its own rules
/// exclude it, unless it is provider-managed or ignored. With
/// `dependents_only`, nothing else is included.
pub fn decide_dependent(
    resource: &ResourceDescriptor,
    decision: Decision,
    released: &ReleasedOwners,
    dependents_only: bool,
) -> Decision {
    let hard_exclusion = matches!(
        decision.reason,
        DecisionReason::ManagedByProvider | DecisionReason::Ignored
    );
    if !hard_exclusion && let Some((owner_class, owner)) = released.owner_of(resource) {
        return Decision {
            resource_id: resource.id.clone(),
            included: true,
            reason: DecisionReason::DependentOf { owner_class, owner },
        };
    }
    if dependents_only && decision.included {
        return Decision::exclude(resource, DecisionReason::OwnerNotRemoved);
    }
    decision
}
