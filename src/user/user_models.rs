//! User data models

use serde::Serialize;

/// A registered user as stored. Never serialized outbound, see [`PublicUser`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: usize,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct PublicUser {
    pub id: usize,
    pub username: String,
    pub email: String,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
        }
    }
}

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct UserPlaylist {
    pub id: usize,
    pub user_id: usize,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created: i64,
}
