//! Route management
//!
//! A route is an ordered list of points handed to one cleaner. Saving a
//! route's points rewrites that cleaner's assignments to match; changing
//! assignments directly never touches routes.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

use crate::error::{AppError, Result};
use crate::models::prelude::*;
use crate::schemas::{CreateRouteRequest, RoutePointView, RouteView, UpdateRouteRequest};
use crate::services::assignments;
use crate::services::views;

/// Which routes a caller may see and edit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteScope {
    Company(i64),
    /// Company-less administrator: every route
    Unrestricted,
}

impl RouteScope {
    /// Scope for an actor, or an error when a non-admin has no company
    pub fn for_actor(actor: &user::Model) -> Result<Self> {
        match (actor.company_id, actor.role) {
            (Some(company_id), _) => Ok(RouteScope::Company(company_id)),
            (None, UserRole::Admin) => Ok(RouteScope::Unrestricted),
            (None, _) => Err(AppError::BadRequest(
                "Manager not assigned to a company".to_string(),
            )),
        }
    }

    /// Company stored on routes created in this scope
    fn company_id(&self) -> Option<i64> {
        match self {
            RouteScope::Company(id) => Some(*id),
            RouteScope::Unrestricted => None,
        }
    }
}

async fn find_scoped<C: ConnectionTrait>(
    db: &C,
    scope: RouteScope,
    route_id: i64,
) -> Result<route::Model> {
    let mut query = Route::find_by_id(route_id);
    if let RouteScope::Company(company_id) = scope {
        query = query.filter(route::Column::CompanyId.eq(company_id));
    }
    query
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Route not found".to_string()))
}

async fn require_route_cleaner<C: ConnectionTrait>(db: &C, cleaner_id: i64) -> Result<()> {
    let cleaner = User::find_by_id(cleaner_id)
        .filter(user::Column::Role.eq(UserRole::Cleaner))
        .one(db)
        .await?;
    match cleaner {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound("Cleaner not found".to_string())),
    }
}

async fn next_order_num<C: ConnectionTrait>(db: &C, company_id: Option<i64>) -> Result<i32> {
    let filter = match company_id {
        Some(id) => route::Column::CompanyId.eq(id),
        None => route::Column::CompanyId.is_null(),
    };
    let max: Option<Option<i32>> = Route::find()
        .select_only()
        .column_as(Expr::col(route::Column::OrderNum).max(), "max_order")
        .filter(filter)
        .into_tuple()
        .one(db)
        .await?;
    Ok(max.flatten().unwrap_or(0) + 1)
}

/// Write route points for `point_ids`, using each id's index as its position
async fn insert_route_points<C: ConnectionTrait>(
    db: &C,
    route_id: i64,
    point_ids: &[(usize, i64)],
) -> Result<()> {
    if point_ids.is_empty() {
        return Ok(());
    }
    let rows: Vec<route_point::ActiveModel> = point_ids
        .iter()
        .map(|(position, point_id)| route_point::ActiveModel {
            route_id: Set(route_id),
            service_point_id: Set(*point_id),
            position: Set(*position as i32),
            ..Default::default()
        })
        .collect();
    RoutePoint::insert_many(rows).exec_without_returning(db).await?;
    Ok(())
}

/// Create a route and hand its points to the cleaner
pub async fn create_route<C>(db: &C, scope: RouteScope, req: &CreateRouteRequest) -> Result<RouteView>
where
    C: ConnectionTrait + TransactionTrait,
{
    let name = req.name.trim();
    if name.is_empty() {
        return Err(AppError::BadRequest("Route name is required".to_string()));
    }

    require_route_cleaner(db, req.cleaner_id).await?;

    let known = assignments::existing_point_ids(db, &req.service_point_ids).await?;
    if req.service_point_ids.iter().any(|id| !known.contains(id)) {
        return Err(AppError::BadRequest(
            "Some service points not found".to_string(),
        ));
    }

    let txn = db.begin().await?;

    let now = Utc::now();
    let order_num = next_order_num(&txn, scope.company_id()).await?;
    let route = route::ActiveModel {
        name: Set(name.to_string()),
        company_id: Set(scope.company_id()),
        cleaner_id: Set(req.cleaner_id),
        order_num: Set(order_num),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&txn)
    .await?;

    let positioned: Vec<(usize, i64)> = req.service_point_ids.iter().copied().enumerate().collect();
    insert_route_points(&txn, route.id, &positioned).await?;
    // Assignments follow the route; direct assignment edits never flow back
    assignments::replace_assignments(&txn, req.cleaner_id, &req.service_point_ids).await?;

    let view = route_view(&txn, route).await?;
    txn.commit().await?;

    tracing::info!(route_id = view.route.id, cleaner_id = req.cleaner_id, "Route created");
    Ok(view)
}

/// Edit a route; a new point list re-syncs the effective cleaner's assignments
pub async fn update_route<C>(
    db: &C,
    scope: RouteScope,
    route_id: i64,
    req: &UpdateRouteRequest,
) -> Result<RouteView>
where
    C: ConnectionTrait + TransactionTrait,
{
    let existing = find_scoped(db, scope, route_id).await?;

    if let Some(cleaner_id) = req.cleaner_id {
        require_route_cleaner(db, cleaner_id).await?;
    }
    let cleaner_id = req.cleaner_id.unwrap_or(existing.cleaner_id);

    let txn = db.begin().await?;

    let mut active: route::ActiveModel = existing.into();
    if let Some(name) = req.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        active.name = Set(name.to_string());
    }
    active.cleaner_id = Set(cleaner_id);
    active.updated_at = Set(Utc::now());
    let route = active.update(&txn).await?;

    if let Some(point_ids) = &req.service_point_ids {
        RoutePoint::delete_many()
            .filter(route_point::Column::RouteId.eq(route_id))
            .exec(&txn)
            .await?;

        // Ids that no longer resolve are dropped; survivors keep their index
        let known = assignments::existing_point_ids(&txn, point_ids).await?;
        let positioned: Vec<(usize, i64)> = point_ids
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, id)| known.contains(id))
            .collect();
        insert_route_points(&txn, route_id, &positioned).await?;

        let resolved: Vec<i64> = positioned.iter().map(|(_, id)| *id).collect();
        assignments::replace_assignments(&txn, cleaner_id, &resolved).await?;
    }

    let view = route_view(&txn, route).await?;
    txn.commit().await?;

    tracing::info!(route_id, cleaner_id, "Route updated");
    Ok(view)
}

/// Remove a route and its points.
///
/// The cleaner keeps the assignments last synced from this route.
pub async fn delete_route<C>(db: &C, scope: RouteScope, route_id: i64) -> Result<()>
where
    C: ConnectionTrait + TransactionTrait,
{
    let route = find_scoped(db, scope, route_id).await?;

    let txn = db.begin().await?;
    RoutePoint::delete_many()
        .filter(route_point::Column::RouteId.eq(route.id))
        .exec(&txn)
        .await?;
    Route::delete_by_id(route.id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(route_id, "Route deleted");
    Ok(())
}

/// Routes in scope, ordered by `order_num`
pub async fn list_routes<C: ConnectionTrait>(db: &C, scope: RouteScope) -> Result<Vec<RouteView>> {
    let mut query = Route::find().order_by_asc(route::Column::OrderNum);
    if let RouteScope::Company(company_id) = scope {
        query = query.filter(route::Column::CompanyId.eq(company_id));
    }
    let routes = query.all(db).await?;
    route_views(db, routes).await
}

async fn route_view<C: ConnectionTrait>(db: &C, route: route::Model) -> Result<RouteView> {
    let mut views = route_views(db, vec![route]).await?;
    views
        .pop()
        .ok_or_else(|| AppError::Internal("Route view missing".to_string()))
}

async fn route_views<C: ConnectionTrait>(
    db: &C,
    routes: Vec<route::Model>,
) -> Result<Vec<RouteView>> {
    if routes.is_empty() {
        return Ok(Vec::new());
    }

    let route_ids: Vec<i64> = routes.iter().map(|r| r.id).collect();
    let points = RoutePoint::find()
        .filter(route_point::Column::RouteId.is_in(route_ids))
        .order_by_asc(route_point::Column::Position)
        .all(db)
        .await?;

    let summaries = views::point_summaries(db, points.iter().map(|p| p.service_point_id), false).await?;
    let cleaners = views::user_summaries(db, routes.iter().map(|r| r.cleaner_id)).await?;

    let mut by_route: HashMap<i64, Vec<RoutePointView>> = HashMap::new();
    for point in points {
        if let Some(summary) = summaries.get(&point.service_point_id) {
            by_route.entry(point.route_id).or_default().push(RoutePointView {
                id: point.id,
                position: point.position,
                service_point_id: point.service_point_id,
                service_point: summary.clone(),
            });
        }
    }

    Ok(routes
        .into_iter()
        .map(|route| RouteView {
            cleaner: cleaners.get(&route.cleaner_id).cloned(),
            route_points: by_route.remove(&route.id).unwrap_or_default(),
            route,
        })
        .collect())
}

/// Point ids of a route in position order
pub async fn route_point_ids<C: ConnectionTrait>(db: &C, route_id: i64) -> Result<Vec<i64>> {
    Ok(RoutePoint::find()
        .select_only()
        .column(route_point::Column::ServicePointId)
        .filter(route_point::Column::RouteId.eq(route_id))
        .order_by_asc(route_point::Column::Position)
        .into_tuple()
        .all(db)
        .await?)
}
