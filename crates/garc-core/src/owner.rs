//! Ownership index: which Runner, if any, controls a child object.
//!
//! Computed from the child's own metadata on every call and never cached.
use std::fmt;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt, runtime::reflector::ObjectRef};

use garc_model::{ModelError, ModelResult, RUNNER_KIND, Runner};

/// Kinds of child objects a Runner owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildKind {
    ConfigMap,
    Deployment,
}

impl ChildKind {
    #[inline]
    pub fn as_label(&self) -> &'static str {
        match self {
            ChildKind::ConfigMap => "configmap",
            ChildKind::Deployment => "deployment",
        }
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// A child's controller owner, as read from its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerRelation {
    pub object_kind: ChildKind,
    pub owner_kind: String,
    pub owner_name: String,
}

impl OwnerRelation {
    /// True when the owner is a Runner of this controller's API group.
    pub fn is_runner(&self) -> bool {
        self.owner_kind == RUNNER_KIND
    }

    pub fn is_owned_by_runner(&self, runner_name: &str) -> bool {
        self.is_runner() && self.owner_name == runner_name
    }
}

/// The owner reference marked `controller: true`, if any.
pub fn controller_owner(meta: &ObjectMeta) -> Option<&OwnerReference> {
    meta.owner_references
        .as_deref()?
        .iter()
        .find(|r| r.controller == Some(true))
}

/// Relation to the controller owner; `None` when the object has no controller
/// or is controlled by a different API group.
pub fn relation_of(object_kind: ChildKind, meta: &ObjectMeta) -> Option<OwnerRelation> {
    let owner = controller_owner(meta)?;
    if owner.kind == RUNNER_KIND && owner.api_version != Runner::api_version(&()) {
        return None;
    }
    Some(OwnerRelation {
        object_kind,
        owner_kind: owner.kind.clone(),
        owner_name: owner.name.clone(),
    })
}

/// Key of the Runner that controls `obj`, used to route child events.
pub fn runner_ref_of<K>(object_kind: ChildKind, obj: &K) -> Option<ObjectRef<Runner>>
where
    K: Resource,
{
    let relation = relation_of(object_kind, obj.meta())?;
    if !relation.is_runner() {
        return None;
    }
    let mut key = ObjectRef::new(&relation.owner_name);
    if let Some(ns) = obj.namespace() {
        key = key.within(&ns);
    }
    Some(key)
}

/// Controller owner reference pointing at `runner`, blocking owner deletion.
pub fn owner_reference(runner: &Runner) -> ModelResult<OwnerReference> {
    let mut owner = runner
        .controller_owner_ref(&())
        .ok_or(ModelError::MissingMetadata("uid"))?;
    owner.block_owner_deletion = Some(true);
    Ok(owner)
}
