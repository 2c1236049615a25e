use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;

/// Authenticated identity driving the channel lifecycle. Passed in
/// explicitly by the host application whenever it observes a change.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdentityContext {
    pub user_id: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub is_admin: bool,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default, deserialize_with = "brand_list_or_empty")]
    pub assigned_brands: Vec<String>,
}

impl IdentityContext {
    pub fn new(user_id: impl Into<String>, full_name: impl Into<String>) -> Self {
        Self { user_id: user_id.into(), full_name: full_name.into(), ..Self::default() }
    }
}

// Identity providers are not consistent about the brand association; any
// value that is not a proper sequence collapses to an empty set.
fn brand_list_or_empty<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match JsonValue::deserialize(deserializer)? {
        JsonValue::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                JsonValue::String(brand) => Some(brand),
                JsonValue::Number(brand) => Some(brand.to_string()),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn brand_list_parses_a_proper_sequence() {
        let identity: IdentityContext = serde_json::from_value(json!({
            "userId": "u1",
            "fullName": "Asha Rao",
            "isAdmin": true,
            "roles": ["manager"],
            "assignedBrands": ["b1", 7],
        }))
        .unwrap();
        assert_eq!(identity.assigned_brands, vec!["b1".to_string(), "7".to_string()]);
    }

    #[test]
    fn brand_list_collapses_non_sequences_to_empty() {
        for brands in [json!("b1"), json!(3), json!(null), json!({"b": 1})] {
            let identity: IdentityContext = serde_json::from_value(json!({
                "userId": "u1",
                "assignedBrands": brands,
            }))
            .unwrap();
            assert!(identity.assigned_brands.is_empty(), "for {brands}");
        }
    }

    #[test]
    fn absent_brand_list_defaults_to_empty() {
        let identity: IdentityContext =
            serde_json::from_value(json!({ "userId": "u1" })).unwrap();
        assert!(identity.assigned_brands.is_empty());
        assert!(identity.roles.is_empty());
        assert!(!identity.is_admin);
    }
}
