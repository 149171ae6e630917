//! crates/roster_core/src/roles.rs
//!
//! Maps identity claims to application roles and decides what each role may
//! do within a chapter.

use uuid::Uuid;

use crate::domain::{Chapter, User};

/// Claims issued by the identity provider may carry an application prefix,
/// e.g. `MentorApp.Admin`.
pub const ROLE_CLAIM_PREFIX: &str = "MentorApp.";

/// Application roles, ordered from least to most privileged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Role {
    Mentor,
    ChapterCoordinator,
    Admin,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Mentor => "Mentor",
            Role::ChapterCoordinator => "ChapterCoordinator",
            Role::Admin => "Admin",
        }
    }

    /// Parses a single claim. Unknown claims yield `None`.
    pub fn from_claim(claim: &str) -> Option<Role> {
        let claim = claim.trim();
        let name = claim.strip_prefix(ROLE_CLAIM_PREFIX).unwrap_or(claim);
        match name.to_ascii_lowercase().as_str() {
            "admin" => Some(Role::Admin),
            "chaptercoordinator" | "coordinator" => Some(Role::ChapterCoordinator),
            "mentor" => Some(Role::Mentor),
            _ => None,
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::from_claim(s).ok_or_else(|| format!("unknown role '{}'", s))
    }
}

/// Picks the most privileged role among the claims, ignoring unknown ones.
pub fn highest_role<S: AsRef<str>>(claims: &[S]) -> Option<Role> {
    claims.iter().filter_map(|c| Role::from_claim(c.as_ref())).max()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    ViewRoster,
    ManageSessions,
    SignOffSessions,
    MarkOwnUnavailability,
    SubmitReport,
}

/// The identity of the user behind the current request.
///
/// Built by the auth middleware for every request and handed to handlers
/// through request extensions, so nothing about the caller lives in
/// process-wide state.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: User,
    /// The auth session token the request was authenticated with.
    pub access_token: String,
}

impl RequestContext {
    pub fn new(user: User, access_token: impl Into<String>) -> Self {
        Self {
            user,
            access_token: access_token.into(),
        }
    }

    pub fn user_id(&self) -> Uuid {
        self.user.id
    }

    pub fn role(&self) -> Role {
        self.user.role
    }

    /// Whether the caller may act on `chapter_id` at all.
    pub fn in_chapter(&self, chapter_id: Uuid) -> bool {
        self.user.role == Role::Admin || self.user.chapter_id == Some(chapter_id)
    }

    pub fn can(&self, permission: Permission, chapter_id: Uuid) -> bool {
        if !self.in_chapter(chapter_id) {
            return false;
        }
        match (self.user.role, permission) {
            (Role::Admin, _) => true,
            (Role::ChapterCoordinator, _) => true,
            (Role::Mentor, Permission::ViewRoster)
            | (Role::Mentor, Permission::MarkOwnUnavailability)
            | (Role::Mentor, Permission::SubmitReport) => true,
            (Role::Mentor, _) => false,
        }
    }

    /// Filters a chapter list down to the ones this caller can see.
    pub fn accessible_chapters(&self, chapters: Vec<Chapter>) -> Vec<Chapter> {
        chapters
            .into_iter()
            .filter(|c| self.in_chapter(c.id))
            .collect()
    }
}
