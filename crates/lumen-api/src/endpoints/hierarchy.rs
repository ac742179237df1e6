// Hierarchy document and nested-create endpoints
//
// The hierarchy travels as raw JSON in both directions. Alias folding and
// pruning happen in `lumen-core`, never here.

use reqwest::Method;
use tracing::debug;

use super::component;
use crate::client::{CallOptions, ResilientClient, check_envelope};
use crate::error::Error;
use crate::models::{
    Ack, CreateDeviceRequest, CreateDeviceResponse, CreateLocationRequest,
    CreateLocationResponse, GroupsResponse, LegacyDeviceRequest,
};

impl ResilientClient {
    /// Fetch the full hierarchy document.
    ///
    /// `GET /api/hierarchy`
    pub async fn get_hierarchy(&self) -> Result<serde_json::Value, Error> {
        let options = CallOptions::get().policy(self.default_policy());
        let payload = self.call("api/hierarchy", options).await?;
        check_envelope(payload.into_json()?)
    }

    /// Replace the whole hierarchy document on the server.
    ///
    /// `PUT /api/hierarchy`. Last writer wins: there is no version check.
    pub async fn put_hierarchy(&self, document: &serde_json::Value) -> Result<(), Error> {
        debug!("persisting hierarchy document");
        let options = CallOptions::with_method(Method::PUT)
            .body(document.clone())
            .policy(self.default_policy());
        let payload = self.call("api/hierarchy", options).await?;
        check_envelope(payload.into_json()?)?;
        Ok(())
    }

    /// List the groups of one zone.
    ///
    /// `GET /api/groups?zone_id={zone_id}`
    pub async fn list_groups(&self, zone_id: &str) -> Result<Vec<serde_json::Value>, Error> {
        let path = format!("api/groups?zone_id={}", component(zone_id));
        let resp: GroupsResponse = self.get_json(&path, self.default_policy()).await?;
        Ok(resp.groups)
    }

    /// Create a Location through the dedicated endpoint; the server assigns the id.
    ///
    /// `POST /api/zones/{zone_id}/groups/{group_id}/locations`
    pub async fn create_location(
        &self,
        zone_id: &str,
        group_id: &str,
        request: &CreateLocationRequest,
    ) -> Result<serde_json::Value, Error> {
        let path = format!(
            "api/zones/{}/groups/{}/locations",
            component(zone_id),
            component(group_id)
        );
        debug!(zone_id, group_id, name = %request.name, "creating location");
        let resp: CreateLocationResponse =
            self.post_json(&path, request, self.default_policy()).await?;
        Ok(resp.location)
    }

    /// Create a Device inside a Location; the server assigns the id.
    ///
    /// `POST /api/zones/{zone_id}/groups/{group_id}/locations/{location_id}/devices`
    pub async fn create_device(
        &self,
        zone_id: &str,
        group_id: &str,
        location_id: &str,
        request: &CreateDeviceRequest,
    ) -> Result<serde_json::Value, Error> {
        let path = format!(
            "api/zones/{}/groups/{}/locations/{}/devices",
            component(zone_id),
            component(group_id),
            component(location_id)
        );
        debug!(zone_id, group_id, location_id, name = %request.name, "creating device");
        let resp: CreateDeviceResponse =
            self.post_json(&path, request, self.default_policy()).await?;
        Ok(resp.device)
    }

    /// Legacy flat device creation, used when the nested endpoint is unusable.
    ///
    /// `POST /add_device`
    pub async fn add_device_legacy(&self, request: &LegacyDeviceRequest) -> Result<Ack, Error> {
        debug!(name = %request.name, "creating device via legacy endpoint");
        self.post_json("add_device", request, self.default_policy())
            .await
    }
}
