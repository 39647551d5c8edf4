use serde::{Deserialize, Serialize};

use super::common::{PointSummary, UserSummary};
use crate::models::route;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePointView {
    pub id: i64,
    pub position: i32,
    pub service_point_id: i64,
    pub service_point: PointSummary,
}

/// A route with its cleaner and ordered points
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteView {
    #[serde(flatten)]
    pub route: route::Model,
    pub cleaner: Option<UserSummary>,
    pub route_points: Vec<RoutePointView>,
}

#[derive(Debug, Serialize)]
pub struct RouteListResponse {
    pub routes: Vec<RouteView>,
}

#[derive(Debug, Serialize)]
pub struct RouteResponse {
    pub route: RouteView,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRouteRequest {
    pub name: String,
    pub cleaner_id: i64,
    #[serde(default)]
    pub service_point_ids: Vec<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRouteRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub cleaner_id: Option<i64>,
    #[serde(default)]
    pub service_point_ids: Option<Vec<i64>>,
}
