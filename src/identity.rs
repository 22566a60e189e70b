use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};

use crate::config::Routes;

/// Backends hand out either numeric or string primary keys.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum UserId {
    Num(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Num(n) => write!(f, "{}", n),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

impl From<i64> for UserId {
    fn from(v: i64) -> Self { UserId::Num(v) }
}

impl From<i32> for UserId {
    fn from(v: i32) -> Self { UserId::Num(v as i64) }
}

impl From<&str> for UserId {
    fn from(v: &str) -> Self { UserId::Text(v.to_string()) }
}

/// Dashboard role. Unknown role strings are kept verbatim and routed like freelancers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Manager,
    Freelancer,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Freelancer => "freelancer",
            Role::Other(s) => s.as_str(),
        }
    }

    /// Landing route after login; anything that is not admin or manager lands on the freelancer home.
    pub fn home_route<'a>(&self, routes: &'a Routes) -> &'a str {
        match self {
            Role::Admin => &routes.admin_home,
            Role::Manager => &routes.manager_home,
            Role::Freelancer | Role::Other(_) => &routes.freelancer_home,
        }
    }
}

impl From<String> for Role {
    fn from(s: String) -> Self {
        match s.as_str() {
            "admin" => Role::Admin,
            "manager" => Role::Manager,
            "freelancer" => Role::Freelancer,
            _ => Role::Other(s),
        }
    }
}

impl From<&str> for Role {
    fn from(s: &str) -> Self { Role::from(s.to_string()) }
}

impl From<Role> for String {
    fn from(r: Role) -> Self {
        match r {
            Role::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

/// A missing or null role is an unknown role.
impl Default for Role {
    fn default() -> Self { Role::Other(String::new()) }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

/// Public profile of the signed-in user. Replaced wholesale on every login or session check.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Identity {
    pub id: UserId,
    #[serde(default, deserialize_with = "null_as_default")]
    pub role: Role,
    #[serde(default, deserialize_with = "null_as_default")]
    pub username: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub email: String,
    /// Remaining display attributes the backend chose to send.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Backends send `null` for unset profile fields; treat it like an absent field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

impl Identity {
    pub fn new(id: impl Into<UserId>, role: Role) -> Self {
        Self { id: id.into(), role, username: String::new(), email: String::new(), extra: Default::default() }
    }

    /// Extracts the `user` object from a session-check or login payload.
    /// Absent, null or malformed users all count as "no identity".
    pub fn from_payload(payload: &serde_json::Value) -> Option<Identity> {
        let user = payload.get("user")?;
        if user.is_null() { return None; }
        match serde_json::from_value::<Identity>(user.clone()) {
            Ok(identity) => Some(identity),
            Err(e) => {
                tracing::warn!(target: "freelance::identity", error = %e, "ignoring malformed user payload");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn role_parsing_keeps_unknown_values() {
        assert_eq!(Role::from("admin"), Role::Admin);
        assert_eq!(Role::from("manager"), Role::Manager);
        assert_eq!(Role::from("freelancer"), Role::Freelancer);
        assert_eq!(Role::from("auditor"), Role::Other("auditor".into()));
        assert_eq!(String::from(Role::Other("auditor".into())), "auditor");
    }

    #[test]
    fn home_routes() {
        let routes = Routes::default();
        assert_eq!(Role::Admin.home_route(&routes), "/admin/dashboard");
        assert_eq!(Role::Manager.home_route(&routes), "/manager/dashboard");
        assert_eq!(Role::Freelancer.home_route(&routes), "/freelancer/dashboard");
        assert_eq!(Role::Other("guest".into()).home_route(&routes), "/freelancer/dashboard");
    }

    #[test]
    fn identity_from_payload() {
        let id = Identity::from_payload(&json!({"user": {"id": 1, "role": "manager"}, "csrf_token": "abc"})).unwrap();
        assert_eq!(id.id, UserId::Num(1));
        assert_eq!(id.role, Role::Manager);
        assert_eq!(id.username, "");

        let id = Identity::from_payload(&json!({"user": {"id": "u-7", "role": "admin", "username": "ada", "email": "ada@x.io", "avatar": "a.png"}})).unwrap();
        assert_eq!(id.id, UserId::Text("u-7".into()));
        assert_eq!(id.email, "ada@x.io");
        assert_eq!(id.extra.get("avatar"), Some(&json!("a.png")));
    }

    #[test]
    fn null_profile_fields_are_empty() {
        let id = Identity::from_payload(&json!({"user": {"id": 1, "role": "manager", "username": "m", "email": null}})).unwrap();
        assert_eq!(id.role, Role::Manager);
        assert_eq!(id.username, "m");
        assert_eq!(id.email, "");
        assert!(id.extra.is_empty());
    }

    #[test]
    fn missing_or_null_role_routes_like_freelancer() {
        let routes = Routes::default();
        for payload in [json!({"user": {"id": 1}}), json!({"user": {"id": 1, "role": null}})] {
            let id = Identity::from_payload(&payload).unwrap();
            assert_eq!(id.role, Role::Other(String::new()));
            assert_eq!(id.role.home_route(&routes), "/freelancer/dashboard");
        }
    }

    #[test]
    fn identity_absent_or_malformed() {
        assert!(Identity::from_payload(&json!({})).is_none());
        assert!(Identity::from_payload(&json!({"user": null})).is_none());
        assert!(Identity::from_payload(&json!({"user": {"role": "admin"}})).is_none());
        assert!(Identity::from_payload(&json!({"error": "bad"})).is_none());
    }
}
