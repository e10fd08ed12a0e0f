//! # Friend Management API Client
//!
//! HTTP client methods for friend requests and friend management.

use shared::dto::{
    AcceptFriendResponse, AddFriendRequest, Friend, FriendRequest, FriendRequestsResponse,
    FriendsListResponse,
};

use super::client::ApiClient;
use crate::core::Result;

impl ApiClient {
    /// Get the friends list
    pub async fn list_friends(&self, token: &str) -> Result<Vec<Friend>> {
        let response: FriendsListResponse = self.get_json("/friends/list", token).await?;
        Ok(response.friends)
    }

    /// Get incoming friend requests
    pub async fn list_friend_requests(&self, token: &str) -> Result<Vec<FriendRequest>> {
        let response: FriendRequestsResponse = self.get_json("/friends/requests", token).await?;
        Ok(response.requests)
    }

    /// Accept a friend request. Returns the new friend when the backend includes it.
    pub async fn accept_friend_request(&self, token: &str, request_id: &str) -> Result<Option<Friend>> {
        let request = self
            .client
            .post(self.url(&format!("/friends/accept/{}", request_id)))
            .bearer_auth(token);
        let response = self.send("/friends/accept", request).await?;
        // Older backends answer with an empty body
        let body = response.text().await?;
        Ok(serde_json::from_str::<AcceptFriendResponse>(&body)
            .ok()
            .and_then(|r| r.friend))
    }

    /// Reject a friend request
    pub async fn reject_friend_request(&self, token: &str, request_id: &str) -> Result<()> {
        let request = self
            .client
            .post(self.url(&format!("/friends/reject/{}", request_id)))
            .bearer_auth(token);
        self.send("/friends/reject", request).await?;
        Ok(())
    }

    /// Send a friend request by email
    pub async fn add_friend(&self, token: &str, email: &str) -> Result<()> {
        let request = self
            .client
            .post(self.url("/friends/add"))
            .bearer_auth(token)
            .json(&AddFriendRequest {
                email: email.to_string(),
            });
        self.send("/friends/add", request).await?;
        Ok(())
    }

    /// Remove a friend
    pub async fn delete_friend(&self, token: &str, friend_id: &str) -> Result<()> {
        let request = self
            .client
            .delete(self.url(&format!("/friends/{}", friend_id)))
            .bearer_auth(token);
        self.send("/friends/delete", request).await?;
        Ok(())
    }
}
