//! # Friend Data Transfer Objects
//!
//! Request and response structures for the `/friends/*` endpoints.

use serde::{Deserialize, Serialize};

/// Friend information
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Friend {
    pub id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Incoming friend request
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FriendRequest {
    pub id: String,
    pub from_user_id: String,
    #[serde(default)]
    pub from_email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from_profile_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// `GET /friends/list`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FriendsListResponse {
    #[serde(default)]
    pub friends: Vec<Friend>,
}

/// `GET /friends/requests`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FriendRequestsResponse {
    #[serde(default)]
    pub requests: Vec<FriendRequest>,
}

/// `POST /friends/add`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddFriendRequest {
    pub email: String,
}

/// `POST /friends/accept/{id}`. The backend returns the new friend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcceptFriendResponse {
    #[serde(default)]
    pub friend: Option<Friend>,
}
