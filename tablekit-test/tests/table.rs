use tablekit_core::prelude::*;
use tablekit_core::{DecodeError, IdentifierPolicy};
use tablekit_macros::Record;
use tablekit_test::{Event, MemoryDbError, MemoryStore};

#[derive(Debug, Default, Clone, PartialEq, Record)]
struct Account {
    #[column(read_only)]
    id: i64,
    name: String,
    #[column(write_only)]
    secret: String,
}

fn account(name: &str, secret: &str) -> Account {
    Account {
        id: 0,
        name: name.into(),
        secret: secret.into(),
    }
}

fn accounts(store: &MemoryStore) -> Table<Account, MemoryStore> {
    Table::new("accounts", Transactor::new(store.clone()))
}

fn stored(id: i64, name: &str) -> Row {
    Row::new().with("id", id).with("name", name)
}

#[tokio::test]
async fn test_insert_one_returning_hides_write_only() {
    let store = MemoryStore::new();
    store.push_rows(vec![stored(7, "alice")]);
    let ctx = Context::new();

    let created = accounts(&store)
        .insert_one(&ctx, &account("alice", "s3cret"), true)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(created.id, 7);
    assert_eq!(created.name, "alice");
    assert_eq!(created.secret, "");
    let events = store.events();
    assert!(matches!(events[0], Event::Begin { tx: 1, .. }));
    assert_eq!(
        events[1],
        Event::Query {
            tx: 1,
            sql: "INSERT INTO accounts (name, secret) VALUES ($1, $2) RETURNING id, name".into(),
            args: vec![Value::Text("alice".into()), Value::Text("s3cret".into())],
        }
    );
    assert_eq!(events[2], Event::Commit { tx: 1 });
}

#[tokio::test]
async fn test_insert_empty_never_touches_store() {
    let store = MemoryStore::new();
    let inserted = accounts(&store)
        .insert(&Context::new(), &[], true)
        .await
        .unwrap();
    assert!(inserted.is_empty());
    assert!(store.events().is_empty());
}

#[tokio::test]
async fn test_insert_many_without_returning_executes() {
    let store = MemoryStore::new();
    store.push_affected(2);

    let inserted = accounts(&store)
        .insert(
            &Context::new(),
            &[account("a", "1"), account("b", "2")],
            false,
        )
        .await
        .unwrap();

    assert!(inserted.is_empty());
    assert!(matches!(
        &store.events()[1],
        Event::Execute { sql, args, .. }
            if sql == "INSERT INTO accounts (name, secret) VALUES ($1, $2), ($3, $4)" && args.len() == 4
    ));
    assert_eq!(store.commits(), 1);
}

#[tokio::test]
async fn test_insert_one_without_rows_is_none() {
    let store = MemoryStore::new();
    let created = accounts(&store)
        .insert_one(&Context::new(), &account("a", "1"), true)
        .await
        .unwrap();
    assert_eq!(created, None);
}

#[tokio::test]
async fn test_find_all_maps_rows() {
    let store = MemoryStore::new();
    store.push_rows(vec![stored(1, "alice"), stored(2, "bob")]);

    let found = accounts(&store).find_all(&Context::new()).await.unwrap();

    assert_eq!(found.len(), 2);
    assert_eq!(found[1].name, "bob");
    assert_eq!(store.statements(), vec!["SELECT id, name FROM accounts"]);
}

#[tokio::test]
async fn test_find_all_by_applies_customizer() {
    let store = MemoryStore::new();
    accounts(&store)
        .find_all_by(&Context::new(), |q| {
            q.where_like("name", "a%").order_by("id", false).limit(10);
        })
        .await
        .unwrap();
    assert_eq!(
        store.statements(),
        vec!["SELECT id, name FROM accounts WHERE name LIKE $1 ORDER BY id DESC LIMIT 10"]
    );
}

#[tokio::test]
async fn test_find_without_match_is_none() {
    let store = MemoryStore::new();
    let found = accounts(&store)
        .find(&Context::new(), |q| {
            q.where_eq("name", "nobody");
        })
        .await
        .unwrap();

    assert_eq!(found, None);
    assert_eq!(
        store.statements(),
        vec!["SELECT id, name FROM accounts WHERE name = $1 LIMIT 1"]
    );
    assert_eq!(store.commits(), 1);
}

#[tokio::test]
async fn test_update_without_assignments_is_skipped() {
    let store = MemoryStore::new();
    let updated = accounts(&store)
        .update(&Context::new(), None, |_| {}, true)
        .await
        .unwrap();
    assert!(updated.is_empty());
    assert!(store.events().is_empty());

    // Removing every assignment a record contributed counts too.
    let record = account("a", "1");
    accounts(&store)
        .update(
            &Context::new(),
            Some(&record),
            |u| {
                u.unset("name").unset("secret").where_eq("id", 1i64);
            },
            false,
        )
        .await
        .unwrap();
    assert!(store.events().is_empty());
}

#[tokio::test]
async fn test_update_from_record_with_overrides() {
    let store = MemoryStore::new();
    store.push_rows(vec![stored(3, "bobby")]);
    let record = account("bob", "x");

    let updated = accounts(&store)
        .update(
            &Context::new(),
            Some(&record),
            |u| {
                u.set("name", "bobby").unset("secret").where_eq("id", 3i64);
            },
            true,
        )
        .await
        .unwrap();

    assert_eq!(
        updated,
        vec![Account {
            id: 3,
            name: "bobby".into(),
            secret: String::new(),
        }]
    );
    assert_eq!(
        store.events()[1],
        Event::Query {
            tx: 1,
            sql: "UPDATE accounts SET name = $1 WHERE id = $2 RETURNING id, name".into(),
            args: vec![Value::Text("bobby".into()), Value::Int(3)],
        }
    );
}

#[tokio::test]
async fn test_update_without_record() {
    let store = MemoryStore::new();
    let updated = accounts(&store)
        .update(
            &Context::new(),
            None,
            |u| {
                u.set("secret", "rotated").where_in("id", [1i64, 2]);
            },
            false,
        )
        .await
        .unwrap();
    assert!(updated.is_empty());
    assert_eq!(
        store.statements(),
        vec!["UPDATE accounts SET secret = $1 WHERE id IN ($2, $3)"]
    );
}

#[tokio::test]
async fn test_delete_requires_a_condition() {
    let store = MemoryStore::new();
    let table = accounts(&store);
    let ctx = Context::new();

    assert!(table.delete(&ctx, |_| {}, true).await.unwrap().is_empty());
    assert!(store.events().is_empty());

    store.push_rows(vec![stored(4, "gone")]);
    let deleted = table
        .delete(
            &ctx,
            |d| {
                d.where_eq("id", 4i64);
            },
            true,
        )
        .await
        .unwrap();
    assert_eq!(deleted[0].id, 4);
    assert_eq!(
        store.statements(),
        vec!["DELETE FROM accounts WHERE id = $1 RETURNING id, name"]
    );
}

#[tokio::test]
async fn test_count() {
    let store = MemoryStore::new();
    store.push_rows(vec![Row::new().with("count", 42i64)]);

    let count = accounts(&store)
        .count(&Context::new(), |c| {
            c.where_not_null("name");
        })
        .await
        .unwrap();

    assert_eq!(count, 42);
    assert_eq!(
        store.statements(),
        vec!["SELECT COUNT(*) AS count FROM accounts WHERE name IS NOT NULL"]
    );
}

#[tokio::test]
async fn test_find_page_runs_in_one_transaction() {
    let store = MemoryStore::new();
    store
        .push_rows(vec![Row::new().with("count", 25i64)])
        .push_rows(vec![stored(11, "k"), stored(12, "l")]);
    let pageable = Pageable::new(1, 10).sorted_by("name,desc");

    let page = accounts(&store)
        .find_page(&Context::new(), &pageable, |q| {
            q.where_gt("id", 0i64);
        })
        .await
        .unwrap();

    assert_eq!(page.total_elements, 25);
    assert_eq!(page.total_pages, 3);
    assert_eq!(page.content.len(), 2);
    assert_eq!(
        store.statements(),
        vec![
            "SELECT COUNT(*) AS count FROM accounts WHERE id > $1",
            "SELECT id, name FROM accounts WHERE id > $1 ORDER BY name DESC LIMIT 10 OFFSET 10",
        ]
    );
    assert_eq!(store.begins(), 1);
    assert_eq!(store.commits(), 1);
}

#[tokio::test]
async fn test_custom_row_mapper() {
    let store = MemoryStore::new();
    store.push_rows(vec![stored(1, "alice")]);
    let table = accounts(&store).with_row_mapper(|row| {
        Ok(Account {
            id: row.try_get("id")?,
            name: row.try_get::<String>("name")?.to_uppercase(),
            secret: "mapped".into(),
        })
    });

    let found = table.find_all(&Context::new()).await.unwrap();
    assert_eq!(found[0].name, "ALICE");
    assert_eq!(found[0].secret, "mapped");
}

#[tokio::test]
async fn test_unique_violation_is_classified() {
    let store = MemoryStore::new();
    store.push_error(MemoryDbError::unique_violation("email"));

    let err = accounts(&store)
        .insert_one(&Context::new(), &account("dup", "x"), false)
        .await
        .unwrap_err();

    let classified = err.classify::<MemoryStore>().unwrap();
    assert!(classified.is_unique_violation(Some("email")));
    assert!(!classified.is_unique_violation(Some("other_col")));
    assert_eq!(store.rollbacks(), 1);
    assert_eq!(store.commits(), 0);
}

#[tokio::test]
async fn test_rollback_failure_is_joined() {
    let store = MemoryStore::new();
    store
        .push_error(MemoryDbError::new("42P01", "relation does not exist"))
        .fail_rollback(MemoryDbError::connection_failure("connection lost"));

    let err = accounts(&store)
        .find_all(&Context::new())
        .await
        .unwrap_err();

    assert!(err.is_query());
    assert!(err.is_rollback());
    assert_eq!(err.causes().len(), 2);
    assert_eq!(
        err.to_string(),
        "Query error: relation does not exist (SQLSTATE 42P01); \
         Rollback error: connection lost (SQLSTATE 08006)"
    );
    // The original failure is classified first.
    assert_eq!(err.classify::<MemoryStore>().unwrap().code(), "42P01");
}

#[tokio::test]
async fn test_begin_failure_surfaces_without_statements() {
    let store = MemoryStore::new();
    store.fail_begin(MemoryDbError::new("53300", "too many connections"));

    let err = accounts(&store)
        .find_all(&Context::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::Begin(_)));
    assert_eq!(err.classify::<MemoryStore>().unwrap().code(), "53300");
    assert!(store.statements().is_empty());
}

#[tokio::test]
async fn test_decode_failure_rolls_back() {
    let store = MemoryStore::new();
    store.push_rows(vec![Row::new().with("id", "not a number")]);

    let err = accounts(&store)
        .find_all(&Context::new())
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::Decode(DecodeError { ref column, .. }) if column == "id"));
    assert_eq!(store.rollbacks(), 1);
}

#[tokio::test]
async fn test_invalid_identifier_never_begins() {
    let store = MemoryStore::new();
    let err = accounts(&store)
        .find_all_by(&Context::new(), |q| {
            q.where_eq("name = name OR 1", 1i64);
        })
        .await
        .unwrap_err();
    assert!(matches!(err, DataError::Build(_)));
    assert_eq!(store.begins(), 0);
}

#[tokio::test]
async fn test_quoted_identifiers() {
    let store = MemoryStore::new();
    let table = Table::<Account, MemoryStore>::new("accounts", Transactor::new(store.clone()))
        .with_identifier_policy(IdentifierPolicy::Quote);
    table.find_all(&Context::new()).await.unwrap();
    assert_eq!(
        store.statements(),
        vec![r#"SELECT "id", "name" FROM "accounts""#]
    );
}

#[tokio::test]
async fn test_separate_contexts_use_separate_transactions() {
    let store = MemoryStore::new();
    let table = accounts(&store);
    let (first, second) = (Context::new(), Context::new());
    let (a, b) = tokio::join!(table.find_all(&first), table.find_all(&second));
    a.unwrap();
    b.unwrap();
    assert_eq!(store.begins(), 2);
    assert_eq!(store.commits(), 2);
}
