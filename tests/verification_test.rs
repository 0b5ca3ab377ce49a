//! Integration tests for aggregate membership verification
//!
//! Run with: cargo test --test verification_test

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use tusabot::verify::{verify_user, MembershipOracle, MembershipStatus, VkClient};

/// Oracle with a fixed per-channel answer; unknown channels degrade to Unknown.
struct MapOracle(HashMap<&'static str, MembershipStatus>);

#[async_trait]
impl MembershipOracle for MapOracle {
    async fn channel_status(&self, channel: &str, _user_id: i64) -> MembershipStatus {
        self.0.get(channel).copied().unwrap_or(MembershipStatus::Unknown)
    }
}

fn channels() -> Vec<String> {
    vec!["@main".to_string(), "@second".to_string()]
}

fn vk_client(server: &MockServer) -> VkClient {
    VkClient::new("test-token".to_string(), "party.club".to_string()).with_api_base(&server.uri())
}

async fn member_server(is_member: i64) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/method/groups.isMember"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": is_member})))
        .mount(&server)
        .await;
    server
}

#[tokio::test]
async fn passes_only_when_every_check_confirms() {
    use MembershipStatus::*;
    let oracle = MapOracle(HashMap::from([("@main", Confirmed), ("@second", Confirmed)]));
    let server = member_server(1).await;
    let client = vk_client(&server);

    let report = verify_user(&oracle, &channels(), Some(&client), 10, Some("id42")).await;
    assert_eq!(report.vk, Some(Confirmed));
    assert!(report.passed());
}

#[tokio::test]
async fn one_missing_channel_fails_the_aggregate() {
    use MembershipStatus::*;
    let oracle = MapOracle(HashMap::from([("@main", Confirmed), ("@second", NotMember)]));

    let report = verify_user(&oracle, &channels(), None, 10, None).await;
    assert!(!report.passed());
    // The confirmed channel still reads as confirmed in the report
    assert_eq!(report.channels[0].status, Confirmed);
    assert_eq!(report.channels[1].status, NotMember);
}

#[tokio::test]
async fn vk_non_membership_fails_even_with_all_channels() {
    use MembershipStatus::*;
    let oracle = MapOracle(HashMap::from([("@main", Confirmed), ("@second", Confirmed)]));
    let server = member_server(0).await;
    let client = vk_client(&server);

    let report = verify_user(&oracle, &channels(), Some(&client), 10, Some("id42")).await;
    assert_eq!(report.vk, Some(NotMember));
    assert!(!report.passed());
}

#[tokio::test]
async fn unlinked_vk_profile_is_excluded_from_the_aggregate() {
    use MembershipStatus::*;
    let oracle = MapOracle(HashMap::from([("@main", Confirmed), ("@second", Confirmed)]));
    let server = member_server(0).await;
    let client = vk_client(&server);

    // VK is configured but the user never linked a profile
    let report = verify_user(&oracle, &channels(), Some(&client), 10, None).await;
    assert_eq!(report.vk, None);
    assert!(report.passed());
}

#[tokio::test]
async fn unreachable_vk_api_is_unknown_not_a_denial() {
    use MembershipStatus::*;
    let oracle = MapOracle(HashMap::from([("@main", Confirmed), ("@second", Confirmed)]));
    // Nothing mounted: every VK call fails
    let server = MockServer::start().await;
    let client = vk_client(&server);

    let report = verify_user(&oracle, &channels(), Some(&client), 10, Some("id42")).await;
    assert_eq!(report.vk, Some(Unknown));
    assert!(!report.passed());
}

#[tokio::test]
async fn channel_failure_does_not_mask_the_other_channel() {
    use MembershipStatus::*;
    // "@second" is missing from the map and degrades to Unknown
    let oracle = MapOracle(HashMap::from([("@main", Confirmed)]));

    let report = verify_user(&oracle, &channels(), None, 10, None).await;
    assert_eq!(report.channels[0].status, Confirmed);
    assert_eq!(report.channels[1].status, Unknown);
    assert!(!report.passed());
}
