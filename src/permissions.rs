use serde::{Deserialize, Serialize};

/// Community roles, ordered by privilege.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    clap::ValueEnum,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
    Founder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Capability {
    SendMessage,
    PostAnnouncement,
    GrantAdmin,
    RevokeAdmin,
    BanUser,
    KickUser,
    /// Share or delete notes and add note subjects.
    ManageNotes,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::SendMessage,
        Capability::PostAnnouncement,
        Capability::GrantAdmin,
        Capability::RevokeAdmin,
        Capability::BanUser,
        Capability::KickUser,
        Capability::ManageNotes,
    ];

    /// Lowest role holding this capability.
    pub fn minimum_role(self) -> Role {
        match self {
            Capability::SendMessage => Role::User,
            Capability::PostAnnouncement
            | Capability::GrantAdmin
            | Capability::RevokeAdmin
            | Capability::BanUser
            | Capability::KickUser
            | Capability::ManageNotes => Role::Admin,
        }
    }
}

/// A user as seen by the chat: identity plus role and presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: String,
    pub name: String,
    #[serde(default = "default_avatar")]
    pub avatar: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_avatar() -> String {
    "👤".to_string()
}

fn default_status() -> String {
    "online".to_string()
}

impl Member {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: default_avatar(),
            role,
            status: default_status(),
        }
    }
}

pub fn has_capability(member: &Member, capability: Capability) -> bool {
    member.role >= capability.minimum_role()
}

/// Whether `actor` may apply a moderation capability to `target`. Nobody acts
/// on themselves or on a founder; promotion only applies to plain users and
/// demotion only to admins.
pub fn can_act_on(actor: &Member, target: &Member, capability: Capability) -> bool {
    if !has_capability(actor, capability) {
        return false;
    }
    if actor.id == target.id || target.role == Role::Founder {
        return false;
    }
    match capability {
        Capability::GrantAdmin => target.role == Role::User,
        Capability::RevokeAdmin => target.role == Role::Admin,
        _ => true,
    }
}

/// Capability set computed once for a member, for callers that check many
/// capabilities against the same user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Permissions {
    role: Role,
    granted: Vec<Capability>,
}

impl Permissions {
    pub fn for_member(member: &Member) -> Self {
        let granted = Capability::ALL
            .into_iter()
            .filter(|cap| has_capability(member, *cap))
            .collect();
        Self {
            role: member.role,
            granted,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn allows(&self, capability: Capability) -> bool {
        self.granted.contains(&capability)
    }

    pub fn is_staff(&self) -> bool {
        self.role >= Role::Admin
    }

    pub fn granted(&self) -> &[Capability] {
        &self.granted
    }
}
