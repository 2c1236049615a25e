use crate::error::LinkError;
use crate::identity::IdentityContext;
use serde::{Deserialize, Serialize};

/// Client-to-server frames, tagged on `type` on the wire.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientMessage {
    Register(RegisterPayload),
    #[serde(rename_all = "camelCase")]
    JoinRoom { brand_id: String },
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegisterPayload {
    pub user_id: String,
    pub full_name: String,
    pub is_admin: bool,
    pub roles: Vec<String>,
    pub assigned_brands: Vec<String>,
}

impl ClientMessage {
    pub fn register(identity: &IdentityContext) -> Self {
        ClientMessage::Register(RegisterPayload {
            user_id: identity.user_id.clone(),
            full_name: identity.full_name.clone(),
            is_admin: identity.is_admin,
            roles: identity.roles.clone(),
            assigned_brands: identity.assigned_brands.clone(),
        })
    }

    pub fn join_room(brand_id: impl Into<String>) -> Self {
        ClientMessage::JoinRoom { brand_id: brand_id.into() }
    }

    /// One line-delimited wire frame, without the trailing newline.
    pub fn to_frame(&self) -> Result<String, LinkError> {
        serde_json::to_string(self).map_err(|e| LinkError::Encode(e.to_string()))
    }
}
