use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Operation a caller wants to perform on a resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    View,
    Update,
    Delete,
}

impl Action {
    /// Whether the action targets an existing record (and therefore an owner).
    pub fn targets_existing(self) -> bool {
        !matches!(self, Action::Create)
    }

    /// Verb used in denial messages. Update and delete share the edit keys.
    pub fn verb(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::View => "view",
            Action::Update | Action::Delete => "edit",
        }
    }

    /// The capability family checked for this action.
    pub fn capability(self) -> Capability {
        match self {
            Action::Create => Capability::Create,
            Action::View => Capability::View,
            Action::Update | Action::Delete => Capability::Edit,
        }
    }
}

impl core::fmt::Display for Action {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Action::Create => f.write_str("create"),
            Action::View => f.write_str("view"),
            Action::Update => f.write_str("update"),
            Action::Delete => f.write_str("delete"),
        }
    }
}

/// Capability family a permission key grants.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Create,
    View,
    Edit,
}

/// Resource types guarded by permission keys.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    TimeEntry,
    Category,
    Organization,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 3] = [
        ResourceKind::TimeEntry,
        ResourceKind::Category,
        ResourceKind::Organization,
    ];

    /// Lower-case plural used in denial messages ("time entries").
    pub fn plural(self) -> &'static str {
        match self {
            ResourceKind::TimeEntry => "time entries",
            ResourceKind::Category => "categories",
            ResourceKind::Organization => "organizations",
        }
    }

    /// Capitalized singular used in not-found messages ("Time entry").
    pub fn title(self) -> &'static str {
        match self {
            ResourceKind::TimeEntry => "Time entry",
            ResourceKind::Category => "Category",
            ResourceKind::Organization => "Organization",
        }
    }
}

impl core::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ResourceKind::TimeEntry => f.write_str("time_entry"),
            ResourceKind::Category => f.write_str("category"),
            ResourceKind::Organization => f.write_str("organization"),
        }
    }
}

/// Ownership scope of a permission key.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Records owned by the acting user.
    Own,
    /// Records owned by anyone.
    Any,
}

/// Permission key granted to a user.
///
/// Closed enumeration: every key names a capability, a resource kind and, for
/// everything but create, an ownership scope. Keys are stored and serialized by
/// their variant name.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PermissionKey {
    CanCreateTimeEntry,
    CanViewOwnTimeEntry,
    CanViewAnyTimeEntry,
    CanEditOwnTimeEntry,
    CanEditAnyTimeEntry,

    CanCreateCategory,
    CanViewOwnCategory,
    CanViewAnyCategory,
    CanEditOwnCategory,
    CanEditAnyCategory,

    CanCreateOrganization,
    CanViewOwnOrganization,
    CanViewAnyOrganization,
    CanEditOwnOrganization,
    CanEditAnyOrganization,
}

impl PermissionKey {
    pub const ALL: [PermissionKey; 15] = [
        PermissionKey::CanCreateTimeEntry,
        PermissionKey::CanViewOwnTimeEntry,
        PermissionKey::CanViewAnyTimeEntry,
        PermissionKey::CanEditOwnTimeEntry,
        PermissionKey::CanEditAnyTimeEntry,
        PermissionKey::CanCreateCategory,
        PermissionKey::CanViewOwnCategory,
        PermissionKey::CanViewAnyCategory,
        PermissionKey::CanEditOwnCategory,
        PermissionKey::CanEditAnyCategory,
        PermissionKey::CanCreateOrganization,
        PermissionKey::CanViewOwnOrganization,
        PermissionKey::CanViewAnyOrganization,
        PermissionKey::CanEditOwnOrganization,
        PermissionKey::CanEditAnyOrganization,
    ];

    /// Decompose the key into `(capability, resource, scope)`.
    ///
    /// Create keys carry no scope.
    pub fn parts(self) -> (Capability, ResourceKind, Option<Scope>) {
        use Capability as C;
        use PermissionKey as K;
        use ResourceKind as R;
        use Scope as S;

        match self {
            K::CanCreateTimeEntry => (C::Create, R::TimeEntry, None),
            K::CanViewOwnTimeEntry => (C::View, R::TimeEntry, Some(S::Own)),
            K::CanViewAnyTimeEntry => (C::View, R::TimeEntry, Some(S::Any)),
            K::CanEditOwnTimeEntry => (C::Edit, R::TimeEntry, Some(S::Own)),
            K::CanEditAnyTimeEntry => (C::Edit, R::TimeEntry, Some(S::Any)),

            K::CanCreateCategory => (C::Create, R::Category, None),
            K::CanViewOwnCategory => (C::View, R::Category, Some(S::Own)),
            K::CanViewAnyCategory => (C::View, R::Category, Some(S::Any)),
            K::CanEditOwnCategory => (C::Edit, R::Category, Some(S::Own)),
            K::CanEditAnyCategory => (C::Edit, R::Category, Some(S::Any)),

            K::CanCreateOrganization => (C::Create, R::Organization, None),
            K::CanViewOwnOrganization => (C::View, R::Organization, Some(S::Own)),
            K::CanViewAnyOrganization => (C::View, R::Organization, Some(S::Any)),
            K::CanEditOwnOrganization => (C::Edit, R::Organization, Some(S::Own)),
            K::CanEditAnyOrganization => (C::Edit, R::Organization, Some(S::Any)),
        }
    }

    /// Find the key for a capability on a resource kind.
    ///
    /// Returns `None` for combinations that do not exist (a create key with a
    /// scope, or a view/edit key without one).
    pub fn lookup(capability: Capability, resource: ResourceKind, scope: Option<Scope>) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.parts() == (capability, resource, scope))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PermissionKey::CanCreateTimeEntry => "CanCreateTimeEntry",
            PermissionKey::CanViewOwnTimeEntry => "CanViewOwnTimeEntry",
            PermissionKey::CanViewAnyTimeEntry => "CanViewAnyTimeEntry",
            PermissionKey::CanEditOwnTimeEntry => "CanEditOwnTimeEntry",
            PermissionKey::CanEditAnyTimeEntry => "CanEditAnyTimeEntry",
            PermissionKey::CanCreateCategory => "CanCreateCategory",
            PermissionKey::CanViewOwnCategory => "CanViewOwnCategory",
            PermissionKey::CanViewAnyCategory => "CanViewAnyCategory",
            PermissionKey::CanEditOwnCategory => "CanEditOwnCategory",
            PermissionKey::CanEditAnyCategory => "CanEditAnyCategory",
            PermissionKey::CanCreateOrganization => "CanCreateOrganization",
            PermissionKey::CanViewOwnOrganization => "CanViewOwnOrganization",
            PermissionKey::CanViewAnyOrganization => "CanViewAnyOrganization",
            PermissionKey::CanEditOwnOrganization => "CanEditOwnOrganization",
            PermissionKey::CanEditAnyOrganization => "CanEditAnyOrganization",
        }
    }
}

impl core::fmt::Display for PermissionKey {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown permission key '{0}'")]
pub struct UnknownPermissionKey(pub String);

impl core::str::FromStr for PermissionKey {
    type Err = UnknownPermissionKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == s)
            .ok_or_else(|| UnknownPermissionKey(s.to_string()))
    }
}

/// Permission keys granted to one user.
///
/// Granting a key twice is the same as granting it once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionSet(BTreeSet<PermissionKey>);

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: PermissionKey) -> bool {
        self.0.insert(key)
    }

    pub fn contains(&self, key: PermissionKey) -> bool {
        self.0.contains(&key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = PermissionKey> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<PermissionKey> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = PermissionKey>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[PermissionKey; N]> for PermissionSet {
    fn from(keys: [PermissionKey; N]) -> Self {
        keys.into_iter().collect()
    }
}

impl Extend<PermissionKey> for PermissionSet {
    fn extend<I: IntoIterator<Item = PermissionKey>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}
