//! User model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

use crate::models::ClientSite;

/// Role tags stored in a user's `role` array.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Employee,
    Client,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Client => "client",
            Role::Admin => "admin",
        }
    }
}

/// User document stored in Firestore (`users` collection).
///
/// Employees, clients and admins all live here, told apart by `role`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Firestore document ID (never written back as a field)
    #[serde(rename = "_firestore_id", default, skip_serializing)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    /// Phone number in E.164 form, matched against phone sign-ins
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub role: Vec<String>,
    /// Push notification tokens registered by the mobile app
    #[serde(default)]
    pub fcmtoken: Vec<String>,
    #[serde(default)]
    pub group: Vec<String>,
}

impl User {
    pub fn has_role(&self, role: Role) -> bool {
        self.role.iter().any(|r| r == role.as_str())
    }
}

/// User profile as shown in the dashboard lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct UserProfile {
    pub id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub active: bool,
    pub role: Vec<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            address: user.address.clone(),
            active: user.active,
            role: user.role.clone(),
        }
    }
}

/// One row of the user/client join: a user and every site it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserRow {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub clients: Vec<ClientSite>,
}
