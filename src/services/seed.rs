//! Demo data for local development
//!
//! Wipes tenant data and recreates four Baku companies with their service
//! points, two managers, six cleaners, assignments and today's sample tasks.
//! Passwords live in the identity provider, so only profiles are created.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};

use crate::error::Result;
use crate::models::prelude::*;
use crate::services::calendar::DayWindow;

/// Row counts written by [`seed_demo_data`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedSummary {
    pub companies: usize,
    pub service_points: usize,
    pub users: usize,
    pub assignments: usize,
    pub tasks: usize,
}

struct CompanySeed {
    key: &'static str,
    name: &'static str,
    description: &'static str,
}

const COMPANIES: [CompanySeed; 4] = [
    CompanySeed {
        key: "unibank",
        name: "Unibank",
        description: "Unibank Commercial Bank",
    },
    CompanySeed {
        key: "pashabank",
        name: "Pasha Bank",
        description: "Pasha Bank OJSC",
    },
    CompanySeed {
        key: "kapitalbank",
        name: "Kapital Bank",
        description: "Kapital Bank OJSC",
    },
    CompanySeed {
        key: "mintcliner",
        name: "Mint Cliner",
        description: "Public Transport Infrastructure",
    },
];

/// (company key, count, type, base latitude, base longitude)
const POINT_BATCHES: [(&str, usize, ServicePointType, f64, f64); 4] = [
    ("unibank", 7, ServicePointType::Atm, 40.37, 49.82),
    ("pashabank", 5, ServicePointType::Atm, 40.38, 49.84),
    ("kapitalbank", 3, ServicePointType::Atm, 40.39, 49.85),
    ("mintcliner", 10, ServicePointType::BusStop, 40.40, 49.86),
];

const MANAGERS: [(&str, &str, &str); 2] = [
    ("manager_unibank", "m1@unibank.az", "unibank"),
    ("manager_mint", "m2@mint.az", "mintcliner"),
];

const CLEANERS: [(&str, &str, &str); 6] = [
    ("cleaner_ali", "ali@mint.az", "mintcliner"),
    ("cleaner_vusal", "vusal@mint.az", "mintcliner"),
    ("cleaner_leila", "leila@mint.az", "mintcliner"),
    ("cleaner_samir", "samir@unibank.az", "unibank"),
    ("cleaner_elvin", "elvin@pashabank.az", "pashabank"),
    ("cleaner_nargiz", "nargiz@kapital.az", "kapitalbank"),
];

fn point_name(company: &str, kind: ServicePointType, n: usize) -> (String, String) {
    match (company, kind) {
        (_, ServicePointType::BusStop) => (
            format!("Bus Stop #{}", n),
            format!("Baku, Main Road, Stop {}", n),
        ),
        ("unibank", _) => (
            format!("Unibank ATM #{}", n),
            format!("Baku, Street {}, Branch {}", n * 10, n),
        ),
        ("pashabank", _) => (
            format!("Pasha Bank ATM #{}", n),
            format!("Baku, Ave {}, Center {}", n * 5, n),
        ),
        _ => (format!("Kapital Bank ATM #{}", n), format!("Baku, Metro {}", n)),
    }
}

/// Spread points around the base coordinate without a random source
fn jitter(n: usize, span: f64) -> f64 {
    ((n as f64 * 0.618_034) % 1.0) * span
}

pub async fn seed_demo_data<C>(db: &C) -> Result<SeedSummary>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;
    let now = Utc::now();
    let mut summary = SeedSummary::default();

    CleaningTask::delete_many().exec(&txn).await?;
    CleanerAssignment::delete_many().exec(&txn).await?;
    RoutePoint::delete_many().exec(&txn).await?;
    Route::delete_many().exec(&txn).await?;
    User::delete_many()
        .filter(user::Column::Role.is_in([UserRole::Manager, UserRole::Cleaner]))
        .exec(&txn)
        .await?;
    ServicePoint::delete_many().exec(&txn).await?;
    Company::delete_many().exec(&txn).await?;

    let admin_exists = User::find()
        .filter(user::Column::Username.eq("admin"))
        .one(&txn)
        .await?
        .is_some();
    if !admin_exists {
        user::ActiveModel {
            username: Set("admin".to_string()),
            role: Set(UserRole::Admin),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        summary.users += 1;
    }

    let mut company_ids = std::collections::HashMap::new();
    for seed in &COMPANIES {
        let company = company::ActiveModel {
            name: Set(seed.name.to_string()),
            description: Set(Some(seed.description.to_string())),
            address: Set(Some("Baku, Azerbaijan".to_string())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        company_ids.insert(seed.key, company.id);
        summary.companies += 1;
    }

    let mut points: Vec<service_point::Model> = Vec::new();
    for (key, count, kind, lat, lng) in POINT_BATCHES {
        let company_id = company_ids[key];
        for n in 1..=count {
            let (name, address) = point_name(key, kind, n);
            let point = service_point::ActiveModel {
                name: Set(name),
                point_type: Set(kind),
                address: Set(address),
                latitude: Set(lat + jitter(n, 0.04)),
                longitude: Set(lng + jitter(n + 3, 0.06)),
                company_id: Set(company_id),
                created_at: Set(now),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(&txn)
            .await?;
            points.push(point);
        }
    }
    summary.service_points = points.len();

    for (username, email, key) in MANAGERS {
        user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(Some(email.to_string())),
            role: Set(UserRole::Manager),
            company_id: Set(Some(company_ids[key])),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        summary.users += 1;
    }

    let mut cleaners = Vec::new();
    for (username, email, key) in CLEANERS {
        let cleaner = user::ActiveModel {
            username: Set(username.to_string()),
            email: Set(Some(email.to_string())),
            role: Set(UserRole::Cleaner),
            company_id: Set(Some(company_ids[key])),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        cleaners.push(cleaner);
        summary.users += 1;
    }

    // Bus stops rotate over the three Mint cleaners; Unibank ATMs go to Samir
    let mut assignments: Vec<(i64, i64)> = points
        .iter()
        .filter(|p| p.point_type == ServicePointType::BusStop)
        .enumerate()
        .map(|(i, p)| (cleaners[i % 3].id, p.id))
        .collect();
    assignments.extend(
        points
            .iter()
            .filter(|p| p.company_id == company_ids["unibank"])
            .map(|p| (cleaners[3].id, p.id)),
    );

    for (cleaner_id, point_id) in &assignments {
        cleaner_assignment::ActiveModel {
            cleaner_id: Set(*cleaner_id),
            service_point_id: Set(*point_id),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;
    }
    summary.assignments = assignments.len();

    let today = DayWindow::containing(now);
    for (i, point) in points.iter().take(15).enumerate() {
        let Some((cleaner_id, _)) = assignments.iter().find(|(_, p)| *p == point.id) else {
            continue;
        };
        let status = match i {
            0..=4 => TaskStatus::Completed,
            5..=9 => TaskStatus::InProgress,
            _ => TaskStatus::Pending,
        };
        let completed = status == TaskStatus::Completed;

        cleaning_task::ActiveModel {
            service_point_id: Set(point.id),
            cleaner_id: Set(*cleaner_id),
            status: Set(status),
            scheduled_at: Set(Some(today.start)),
            generation_day: Set(Some(today.day)),
            completed_at: Set(completed.then_some(now)),
            notes: Set(completed.then(|| "Everything is clean".to_string())),
            photos: Set(completed.then(|| r#"["/uploads/sample.jpg"]"#.to_string())),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        }
        .insert(&txn)
        .await?;
        summary.tasks += 1;
    }

    txn.commit().await?;

    tracing::info!(
        companies = summary.companies,
        service_points = summary.service_points,
        users = summary.users,
        assignments = summary.assignments,
        tasks = summary.tasks,
        "Demo data seeded"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jitter_stays_in_span() {
        for n in 0..50 {
            let j = jitter(n, 0.04);
            assert!((0.0..0.04).contains(&j));
        }
    }

    #[test]
    fn test_point_names() {
        assert_eq!(
            point_name("mintcliner", ServicePointType::BusStop, 2).0,
            "Bus Stop #2"
        );
        assert_eq!(
            point_name("unibank", ServicePointType::Atm, 3).1,
            "Baku, Street 30, Branch 3"
        );
    }
}
