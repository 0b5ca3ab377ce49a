//! VK API client
//!
//! Covers the four methods the bot depends on: `utils.resolveScreenName`,
//! `groups.isMember`, `groups.getById` and `wall.post`. The whole client is
//! absent when VK_TOKEN is unset; callers treat that as "cannot verify".

use serde_json::Value;

use crate::core::config;
use crate::core::error::{AppError, AppResult};

use super::MembershipStatus;

pub struct VkClient {
    http: reqwest::Client,
    api_base: String,
    token: String,
    group: String,
}

impl VkClient {
    pub fn new(token: String, group: String) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_base: config::vk::API_BASE.to_string(),
            token,
            group,
        }
    }

    /// Builds a client from VK_TOKEN / VK_GROUP_DOMAIN; None when unconfigured.
    pub fn from_env() -> Option<Self> {
        config::vk::VK_TOKEN
            .as_ref()
            .map(|token| Self::new(token.clone(), config::vk::VK_GROUP_DOMAIN.clone()))
    }

    /// Overrides the API base URL (wiremock in tests).
    pub fn with_api_base(mut self, api_base: &str) -> Self {
        self.api_base = api_base.trim_end_matches('/').to_string();
        self
    }

    pub fn group(&self) -> &str {
        &self.group
    }

    async fn call(&self, method: &str, params: &[(&str, &str)]) -> AppResult<Value> {
        let url = format!("{}/method/{}", self.api_base, method);
        let response = self
            .http
            .get(&url)
            .query(params)
            .query(&[("access_token", self.token.as_str()), ("v", config::vk::API_VERSION)])
            .send()
            .await?;
        let body: Value = response.json().await?;

        if let Some(error) = body.get("error") {
            return Err(AppError::Vk(format!("{} failed: {}", method, error)));
        }
        body.get("response")
            .cloned()
            .ok_or_else(|| AppError::Vk(format!("{} returned no response field", method)))
    }

    /// Resolves a screen name to a numeric user id.
    ///
    /// Returns Ok(None) when the name does not resolve to a user.
    pub async fn resolve_screen_name(&self, handle: &str) -> AppResult<Option<i64>> {
        let response = self.call("utils.resolveScreenName", &[("screen_name", handle)]).await?;
        if response.get("type").and_then(Value::as_str) != Some("user") {
            return Ok(None);
        }
        Ok(response.get("object_id").and_then(Value::as_i64))
    }

    /// Numeric id from a stored VK handle: "id12345" and "12345" short-circuit,
    /// anything else goes through screen-name resolution.
    async fn numeric_id(&self, vk_id: &str) -> AppResult<Option<i64>> {
        let bare = vk_id.strip_prefix("id").unwrap_or(vk_id);
        if !bare.is_empty() && bare.chars().all(|c| c.is_ascii_digit()) {
            return Ok(bare.parse().ok());
        }
        self.resolve_screen_name(vk_id).await
    }

    /// Membership of the configured group for a linked VK profile.
    ///
    /// Resolution or transport failures yield `Unknown`, never `NotMember`.
    pub async fn member_status(&self, vk_id: &str) -> MembershipStatus {
        let user_id = match self.numeric_id(vk_id).await {
            Ok(Some(id)) => id,
            Ok(None) => {
                log::warn!("VK handle {} did not resolve to a user", vk_id);
                return MembershipStatus::Unknown;
            }
            Err(e) => {
                log::warn!("VK resolve failed for {}: {}", vk_id, e);
                return MembershipStatus::Unknown;
            }
        };

        let user_id = user_id.to_string();
        match self
            .call(
                "groups.isMember",
                &[("group_id", self.group.as_str()), ("user_id", user_id.as_str())],
            )
            .await
        {
            Ok(Value::Number(n)) => {
                if n.as_i64() == Some(1) {
                    MembershipStatus::Confirmed
                } else {
                    MembershipStatus::NotMember
                }
            }
            Ok(other) => {
                log::warn!("VK groups.isMember returned unexpected payload: {}", other);
                MembershipStatus::Unknown
            }
            Err(e) => {
                log::warn!("VK groups.isMember failed for {}: {}", vk_id, e);
                MembershipStatus::Unknown
            }
        }
    }

    /// Publishes a text post on the group wall (cross-posted poster).
    ///
    /// Returns Ok(true) on success; any API failure surfaces as an error so
    /// the broadcast report can mention it.
    pub async fn publish_to_group(&self, message: &str) -> AppResult<bool> {
        let group = self
            .call("groups.getById", &[("group_id", self.group.as_str())])
            .await?;
        let group_id = group
            .as_array()
            .and_then(|groups| groups.first())
            .or(Some(&group))
            .and_then(|g| g.get("id"))
            .and_then(Value::as_i64)
            .ok_or_else(|| AppError::Vk("groups.getById returned no id".to_string()))?;

        let owner_id = format!("-{}", group_id);
        let response = self
            .call(
                "wall.post",
                &[
                    ("owner_id", owner_id.as_str()),
                    ("from_group", "1"),
                    ("message", message),
                ],
            )
            .await?;
        Ok(response.get("post_id").and_then(Value::as_i64).is_some())
    }
}
