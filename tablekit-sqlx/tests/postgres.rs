//! Runs against a live PostgreSQL when `DATABASE_URL` is set; every test
//! returns early otherwise.

use tablekit_core::prelude::*;
use tablekit_core::{DataError, Opaque, TxState};
use tablekit_macros::Record;
use tablekit_sqlx::{DatabaseConfig, IsolationLevel, PgStore, PgTxOptions};

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Member {
    #[column(read_only)]
    id: i64,
    email: String,
    #[column(write_only)]
    secret: String,
}

async fn setup(table: &str) -> Option<Table<Member, PgStore>> {
    let url = std::env::var("DATABASE_URL").ok()?;
    let store = PgStore::connect(&DatabaseConfig::new(url)).await.ok()?;
    sqlx::query(&format!("DROP TABLE IF EXISTS {table}"))
        .execute(store.pool())
        .await
        .ok()?;
    sqlx::query(&format!(
        "CREATE TABLE {table} (id BIGSERIAL PRIMARY KEY, email TEXT NOT NULL UNIQUE, secret TEXT NOT NULL)"
    ))
    .execute(store.pool())
    .await
    .ok()?;
    Some(Table::new(table, Transactor::new(store)))
}

fn member(email: &str) -> Member {
    Member {
        id: 0,
        email: email.into(),
        secret: "hunter2".into(),
    }
}

#[tokio::test]
async fn test_insert_returning_hides_write_only() {
    let Some(members) = setup("tk_members_returning").await else {
        return;
    };
    let ctx = Context::new();
    let created = members
        .insert_one(&ctx, &member("a@example.com"), true)
        .await
        .unwrap()
        .unwrap();
    assert!(created.id > 0);
    assert_eq!(created.email, "a@example.com");
    assert_eq!(created.secret, "");

    let found = members
        .find(&ctx, |q| {
            q.where_eq("email", "a@example.com");
        })
        .await
        .unwrap();
    assert_eq!(found, Some(created));
}

#[tokio::test]
async fn test_unique_violation_is_classified() {
    let Some(members) = setup("tk_members_unique").await else {
        return;
    };
    let ctx = Context::new();
    members
        .insert_one(&ctx, &member("dup@example.com"), false)
        .await
        .unwrap();
    let err = members
        .insert_one(&ctx, &member("dup@example.com"), false)
        .await
        .unwrap_err();

    let classified = err.classify::<PgStore>().unwrap();
    assert!(classified.is_unique_violation(Some("email")));
    assert!(!classified.is_unique_violation(Some("other_col")));
}

#[tokio::test]
async fn test_scope_rolls_back_everything() {
    let Some(members) = setup("tk_members_scope").await else {
        return;
    };
    let txer = members.transactor().clone();
    let ctx = Context::new();
    let opts = PgTxOptions::default().isolation(IsolationLevel::RepeatableRead);
    let scope = txer.begin(&ctx, vec![Box::new(opts) as Opaque]).await.unwrap();

    members.insert_one(&ctx, &member("x@example.com"), false).await.unwrap();
    let err = members
        .insert_one(&ctx, &member("x@example.com"), false)
        .await
        .unwrap_err();
    assert!(err.is_query());
    assert_eq!(scope.state().await, TxState::RolledBack);
    drop(scope);

    let fresh = Context::new();
    assert_eq!(members.count(&fresh, |_| {}).await.unwrap(), 0);
}

#[tokio::test]
async fn test_update_and_delete() {
    let Some(members) = setup("tk_members_update").await else {
        return;
    };
    let ctx = Context::new();
    members
        .insert(&ctx, &[member("u1@example.com"), member("u2@example.com")], false)
        .await
        .unwrap();

    let updated = members
        .update(
            &ctx,
            None,
            |u| {
                u.set("email", "renamed@example.com").where_eq("email", "u1@example.com");
            },
            true,
        )
        .await
        .unwrap();
    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].email, "renamed@example.com");

    let deleted = members
        .delete(&ctx, |d| {
            d.where_like("email", "u%");
        }, false)
        .await
        .unwrap();
    assert!(deleted.is_empty());
    assert_eq!(members.count(&ctx, |_| {}).await.unwrap(), 1);
}

#[tokio::test]
async fn test_read_only_transaction_rejects_writes() {
    let Some(members) = setup("tk_members_read_only").await else {
        return;
    };
    let ctx = Context::new();
    let scope = members
        .transactor()
        .begin_with(&ctx, PgTxOptions::default().read_only())
        .await
        .unwrap();
    let err = members
        .insert_one(&ctx, &member("ro@example.com"), false)
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Query(_)));
    drop(scope);
}
