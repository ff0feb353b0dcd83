use common::Round;
use sea_orm::sea_query::{
    Index, IndexCreateStatement, MysqlQueryBuilder, PostgresQueryBuilder, SqliteQueryBuilder,
};
use sea_orm::*;
use tracing::info;

use crate::entity::{quiz_submission, role, role_permission, round3_submission, round_access};

/// Default roles seeded on startup.
const DEFAULT_ROLES: &[&str] = &["admin", "contestant"];

/// Default role-permission mappings seeded on startup. Participation itself
/// needs no permission beyond authentication; these gate the admin surface.
const DEFAULT_MAPPINGS: &[(&str, &str)] = &[
    ("admin", "round:manage"),
    ("admin", "round:bypass_gate"),
    ("admin", "round3:review"),
    ("admin", "round3:score"),
    ("admin", "participant:provision"),
];

/// Seed the `role` and `role_permission` tables with defaults.
pub async fn seed_role_permissions(db: &DatabaseConnection) -> Result<(), DbErr> {
    let mut roles_inserted = 0u32;
    for &name in DEFAULT_ROLES {
        let model = role::ActiveModel {
            name: Set(name.to_string()),
        };

        let result = role::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(role::Column::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => roles_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if roles_inserted > 0 {
        info!("Seeded {} new roles", roles_inserted);
    }

    let mut perms_inserted = 0u32;
    for &(role, permission) in DEFAULT_MAPPINGS {
        let model = role_permission::ActiveModel {
            role: Set(role.to_string()),
            permission: Set(permission.to_string()),
        };

        let result = role_permission::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::columns([
                    role_permission::Column::Role,
                    role_permission::Column::Permission,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => perms_inserted += 1,
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    if perms_inserted > 0 {
        info!("Seeded {} new role-permission mappings", perms_inserted);
    }

    Ok(())
}

/// Ensure a `round_access` row exists for every round, disabled by default.
pub async fn seed_round_access(db: &DatabaseConnection) -> Result<(), DbErr> {
    for &round in Round::ALL {
        let model = round_access::ActiveModel {
            round: Set(round.number()),
            enabled: Set(false),
            enabled_at: Set(None),
            updated_at: Set(chrono::Utc::now()),
        };

        let result = round_access::Entity::insert(model)
            .on_conflict(
                sea_orm::sea_query::OnConflict::column(round_access::Column::Round)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(db)
            .await;

        match result {
            Ok(_) => info!(round = round.number(), "Seeded round access row"),
            Err(DbErr::RecordNotInserted) => {}
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

fn build_index_sql(db: &DatabaseConnection, stmt: &IndexCreateStatement) -> String {
    match db.get_database_backend() {
        DbBackend::Postgres => stmt.to_string(PostgresQueryBuilder),
        DbBackend::Sqlite => stmt.to_string(SqliteQueryBuilder),
        DbBackend::MySql => stmt.to_string(MysqlQueryBuilder),
        _ => unreachable!("unsupported database backend"),
    }
}

/// Ensure required database indexes exist.
///
/// SeaORM's schema-sync doesn't support composite unique indexes, so we
/// create them manually on startup. These indexes are the atomic
/// check-and-insert behind the one-submission-per-round invariant, so a
/// failure here is fatal.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // At most one quiz submission per (participant, round).
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("uq_quiz_submission_user_round")
        .table(quiz_submission::Entity)
        .col(quiz_submission::Column::UserId)
        .col(quiz_submission::Column::Round)
        .to_owned();
    db.execute_unprepared(&build_index_sql(db, &stmt)).await?;
    info!("Ensured index uq_quiz_submission_user_round exists");

    // At most one Round 3 submission per (participant, track, challenge).
    let stmt = Index::create()
        .if_not_exists()
        .unique()
        .name("uq_round3_submission_user_track_challenge")
        .table(round3_submission::Entity)
        .col(round3_submission::Column::UserId)
        .col(round3_submission::Column::Track)
        .col(round3_submission::Column::ChallengeId)
        .to_owned();
    db.execute_unprepared(&build_index_sql(db, &stmt)).await?;
    info!("Ensured index uq_round3_submission_user_track_challenge exists");

    Ok(())
}
