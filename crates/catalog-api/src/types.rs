// Wire types for the catalog HTTP API.
//
// Field names follow the server's camelCase JSON.

use serde::{Deserialize, Deserializer, Serialize};

/// A category of instruments (reference data, rarely changes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub item_count: u64,
    pub summary: String,
    pub description: String,
}

/// Body of `GET /categories`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CategoryList {
    pub categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instrument {
    pub id: i64,
    pub category_id: i64,
    /// Subject (`sub`) of the owning user.
    pub user_id: String,
    pub name: String,
    pub summary: String,
    pub description: String,
    pub image_url: String,
}

/// Body of `GET /instruments/all` and `GET /instruments?cat=<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InstrumentList {
    pub instruments: Vec<Instrument>,
}

/// Request body for creating or replacing an instrument.
///
/// The server assigns `id` and `userId`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstrumentDraft {
    pub name: String,
    pub category_id: i64,
    pub summary: String,
    pub description: String,
    pub image_url: String,
}

/// Roles granted by the identity provider.
///
/// Only `admin` carries meaning here; anything else is kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Role {
    Admin,
    Other(String),
}

impl From<String> for Role {
    fn from(name: String) -> Self {
        if name == "admin" {
            Self::Admin
        } else {
            Self::Other(name)
        }
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => "admin".to_owned(),
            Role::Other(name) => name,
        }
    }
}

/// The signed-in user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    /// Subject, otherwise known as user ID.
    pub sub: String,
    #[serde(
        rename = "http:auth/roles",
        default,
        deserialize_with = "lenient_roles",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub roles: Vec<Role>,
}

/// Identity providers can be misconfigured: anything other than an array
/// of strings yields no roles instead of a parse failure.
fn lenient_roles<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<Role>, D::Error> {
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(name) => Some(Role::from(name)),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn instrument_uses_camel_case() {
        let instrument: Instrument = serde_json::from_value(json!({
            "id": 0,
            "categoryId": 0,
            "userId": "google-oauth2|1337",
            "name": "Flute",
            "summary": "Flute summary",
            "description": "Long description of flutes.",
            "imageUrl": "https://example.com/flute.jpg"
        }))
        .unwrap();

        assert_eq!(instrument.category_id, 0);
        assert_eq!(instrument.user_id, "google-oauth2|1337");
        assert_eq!(instrument.image_url, "https://example.com/flute.jpg");
    }

    #[test]
    fn user_roles_default_to_empty() {
        let user: User =
            serde_json::from_value(json!({ "name": "Nonny Mouse", "sub": "x|1" })).unwrap();
        assert!(user.roles.is_empty());

        let admin: User = serde_json::from_value(json!({
            "name": "Admin",
            "sub": "x|2",
            "http:auth/roles": ["admin"]
        }))
        .unwrap();
        assert_eq!(admin.roles, vec![Role::Admin]);
    }

    #[test]
    fn unknown_roles_are_kept() {
        let user: User = serde_json::from_value(json!({
            "name": "Addy Min",
            "sub": "foo|123",
            "http:auth/roles": ["fakerole", "admin"]
        }))
        .unwrap();
        assert_eq!(user.roles, vec![Role::Other("fakerole".into()), Role::Admin]);
    }

    #[test]
    fn malformed_roles_yield_none() {
        for roles in [
            json!(null),
            json!(1),
            json!("admin"),
            json!({ "admin": "admin" }),
            json!([["admin"]]),
            json!({ "0": "admin", "length": 1 }),
        ] {
            let user: User = serde_json::from_value(json!({
                "name": "Edna Valid",
                "sub": "foo|123",
                "http:auth/roles": roles.clone()
            }))
            .unwrap();
            assert!(user.roles.is_empty(), "roles: {roles}");
        }
    }
}
