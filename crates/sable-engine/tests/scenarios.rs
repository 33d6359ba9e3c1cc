//! End-to-end engine scenarios: create/insert/scan, snapshot isolation,
//! rollback invisibility, update/delete semantics, lock conflicts, and
//! crash recovery across restarts.

use sable_common::{Column, DataType, EngineConfig, PageId, SableError, Value};
use sable_engine::codec::Record;
use sable_engine::{CompareOp, Engine, Plan, Session, WhereCondition};
use sable_storage::DiskManager;
use tempfile::TempDir;

fn config(dir: &TempDir) -> EngineConfig {
    EngineConfig::new(dir.path().join("data")).with_cache_capacity(8)
}

fn create_users() -> Plan {
    Plan::CreateTable {
        table: "Users".into(),
        columns: vec![
            Column::not_null("id", DataType::Int),
            Column::nullable("name", DataType::Str),
        ],
    }
}

fn insert_users(rows: &[(i32, &str)]) -> Plan {
    Plan::Insert {
        table: "Users".into(),
        rows: rows
            .iter()
            .map(|(id, name)| vec![Value::Int(*id), Value::Str((*name).into())])
            .collect(),
    }
}

fn select_all() -> Plan {
    Plan::SeqScan {
        table: "Users".into(),
    }
}

fn select_where_id(id: i32) -> Plan {
    Plan::Filter {
        input: Box::new(select_all()),
        conditions: vec![WhereCondition::new("id", CompareOp::Eq, Value::Int(id))],
    }
}

fn rows_of(engine: &Engine, session: &mut Session, plan: &Plan) -> Vec<(i32, String)> {
    engine
        .execute(session, plan)
        .unwrap()
        .rows
        .into_iter()
        .map(|row| match (&row[0], &row[1]) {
            (Value::Int(id), Value::Str(name)) => (*id, name.clone()),
            other => panic!("unexpected row shape: {other:?}"),
        })
        .collect()
}

#[test]
fn s1_create_insert_scan() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();
    let mut session = Session::new();

    engine.execute(&mut session, &create_users()).unwrap();
    let result = engine
        .execute(
            &mut session,
            &insert_users(&[(1, "张三"), (2, "李四"), (3, "王五")]),
        )
        .unwrap();
    assert_eq!(result.rows_affected, 3);

    let rows = rows_of(&engine, &mut session, &select_all());
    assert_eq!(
        rows,
        vec![
            (1, "张三".to_string()),
            (2, "李四".to_string()),
            (3, "王五".to_string()),
        ]
    );
}

#[test]
fn s2_snapshot_isolation() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();
    let mut setup = Session::new();
    engine.execute(&mut setup, &create_users()).unwrap();
    engine
        .execute(&mut setup, &insert_users(&[(1, "张三")]))
        .unwrap();

    let mut session_a = Session::new();
    let mut session_b = Session::new();

    engine.begin(&mut session_a).unwrap();
    engine
        .execute(&mut session_a, &insert_users(&[(4, "赵六")]))
        .unwrap();

    engine.begin(&mut session_b).unwrap();
    let rows = rows_of(&engine, &mut session_b, &select_all());
    assert!(!rows.iter().any(|(id, _)| *id == 4), "b must not see row 4");

    engine.commit(&mut session_a).unwrap();

    // Same snapshot: the commit stays invisible to b.
    let rows = rows_of(&engine, &mut session_b, &select_all());
    assert!(
        !rows.iter().any(|(id, _)| *id == 4),
        "b's snapshot must stay stable across a's commit"
    );

    engine.commit(&mut session_b).unwrap();

    // A fresh statement takes a fresh snapshot and sees row 4.
    let mut fresh = Session::new();
    let rows = rows_of(&engine, &mut fresh, &select_all());
    assert!(rows.contains(&(4, "赵六".to_string())));
}

#[test]
fn s3_rollback_invisibility_across_restart() {
    let dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(config(&dir)).unwrap();
        let mut session = Session::new();
        engine.execute(&mut session, &create_users()).unwrap();

        engine.begin(&mut session).unwrap();
        engine
            .execute(&mut session, &insert_users(&[(5, "x")]))
            .unwrap();
        engine.rollback(&mut session).unwrap();

        let rows = rows_of(&engine, &mut session, &select_all());
        assert!(rows.is_empty(), "rolled-back insert must be invisible");
        engine.close().unwrap();
    }

    // After a restart the record is still invisible.
    let engine = Engine::open(config(&dir)).unwrap();
    let mut session = Session::new();
    let rows = rows_of(&engine, &mut session, &select_all());
    assert!(rows.is_empty());
}

#[test]
fn s4_update_produces_one_visible_version() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();
    let mut session = Session::new();
    engine.execute(&mut session, &create_users()).unwrap();
    engine
        .execute(&mut session, &insert_users(&[(1, "张三")]))
        .unwrap();

    let result = engine
        .execute(
            &mut session,
            &Plan::Update {
                table: "Users".into(),
                set_clause: vec![("name".to_string(), Value::Str("Z".into()))],
                conditions: vec![WhereCondition::new("id", CompareOp::Eq, Value::Int(1))],
            },
        )
        .unwrap();
    assert_eq!(result.rows_affected, 1);

    let rows = rows_of(&engine, &mut session, &select_where_id(1));
    assert_eq!(rows, vec![(1, "Z".to_string())]);
    engine.close().unwrap();

    // Before vacuum, the superseded version is still decodeable from
    // disk: two physical versions of id 1 exist.
    let disk = DiskManager::new(dir.path().join("data")).unwrap();
    let mut versions = Vec::new();
    for pid in 0..disk.page_count("Users").unwrap() {
        let page = disk.read_page("Users", PageId::new(pid)).unwrap();
        for slot in 0..page.item_count() {
            let record = Record::decode(page.record_bytes(slot).unwrap(), 2).unwrap();
            versions.push(record);
        }
    }
    assert_eq!(versions.len(), 2);
    assert!(versions
        .iter()
        .any(|r| r.values[1] == Value::Str("张三".into()) && r.xmax.is_valid()));
    assert!(versions
        .iter()
        .any(|r| r.values[1] == Value::Str("Z".into()) && !r.xmax.is_valid()));
}

#[test]
fn s5_delete_then_reinsert() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();
    let mut session = Session::new();
    engine.execute(&mut session, &create_users()).unwrap();
    engine
        .execute(&mut session, &insert_users(&[(1, "a"), (2, "old")]))
        .unwrap();

    let result = engine
        .execute(
            &mut session,
            &Plan::Delete {
                table: "Users".into(),
                conditions: vec![WhereCondition::new("id", CompareOp::Eq, Value::Int(2))],
            },
        )
        .unwrap();
    assert_eq!(result.rows_affected, 1);

    engine
        .execute(&mut session, &insert_users(&[(2, "new")]))
        .unwrap();

    let rows = rows_of(&engine, &mut session, &select_where_id(2));
    assert_eq!(rows, vec![(2, "new".to_string())]);
}

#[test]
fn s6_lock_conflict_rolls_back_reader() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();
    let mut setup = Session::new();
    engine.execute(&mut setup, &create_users()).unwrap();
    engine
        .execute(&mut setup, &insert_users(&[(1, "a")]))
        .unwrap();

    // t_a holds X on Users via an open UPDATE.
    let mut session_a = Session::new();
    engine.begin(&mut session_a).unwrap();
    engine
        .execute(
            &mut session_a,
            &Plan::Update {
                table: "Users".into(),
                set_clause: vec![("name".to_string(), Value::Str("b".into()))],
                conditions: vec![],
            },
        )
        .unwrap();

    // t_b's SELECT fails fast and its transaction is rolled back.
    let mut session_b = Session::new();
    engine.begin(&mut session_b).unwrap();
    let err = engine.execute(&mut session_b, &select_all()).unwrap_err();
    assert!(err.is_lock_conflict());
    assert!(!session_b.in_transaction());

    // t_a proceeds and commits.
    engine.commit(&mut session_a).unwrap();
    let mut fresh = Session::new();
    let rows = rows_of(&engine, &mut fresh, &select_all());
    assert_eq!(rows, vec![(1, "b".to_string())]);
}

#[test]
fn s7_crash_recovery_keeps_committed_loses_uncommitted() {
    let dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(config(&dir)).unwrap();
        let mut setup = Session::new();
        engine.execute(&mut setup, &create_users()).unwrap();

        // t_a inserts and commits.
        let mut session_a = Session::new();
        engine.begin(&mut session_a).unwrap();
        engine
            .execute(&mut session_a, &insert_users(&[(1, "a"), (2, "b")]))
            .unwrap();
        engine.commit(&mut session_a).unwrap();

        // t_b inserts and never commits.
        let mut session_b = Session::new();
        engine.begin(&mut session_b).unwrap();
        engine
            .execute(&mut session_b, &insert_users(&[(9, "ghost")]))
            .unwrap();

        // Crash: engine dropped without close(), dirty pages lost.
    }

    let engine = Engine::open(config(&dir)).unwrap();
    let mut session = Session::new();
    let rows = rows_of(&engine, &mut session, &select_all());
    assert_eq!(rows, vec![(1, "a".to_string()), (2, "b".to_string())]);
}

#[test]
fn insert_durability_across_clean_restart() {
    let dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(config(&dir)).unwrap();
        let mut session = Session::new();
        engine.execute(&mut session, &create_users()).unwrap();
        engine
            .execute(&mut session, &insert_users(&[(1, "张三"), (2, "李四")]))
            .unwrap();
        engine.close().unwrap();
    }
    let engine = Engine::open(config(&dir)).unwrap();
    let mut session = Session::new();
    let rows = rows_of(&engine, &mut session, &select_all());
    assert_eq!(rows, vec![(1, "张三".to_string()), (2, "李四".to_string())]);
}

#[test]
fn index_survives_restart_and_serves_lookups() {
    let dir = TempDir::new().unwrap();
    {
        let engine = Engine::open(config(&dir)).unwrap();
        let mut session = Session::new();
        engine.execute(&mut session, &create_users()).unwrap();
        engine
            .execute(
                &mut session,
                &Plan::CreateIndex {
                    index: None,
                    table: "Users".into(),
                    column: "name".into(),
                },
            )
            .unwrap();
        engine
            .execute(&mut session, &insert_users(&[(1, "ada"), (2, "bob")]))
            .unwrap();
        engine.close().unwrap();
    }

    let engine = Engine::open(config(&dir)).unwrap();
    assert!(engine.storage().index_on("Users", "name").is_some());

    let mut session = Session::new();
    let result = engine
        .execute(
            &mut session,
            &Plan::Filter {
                input: Box::new(select_all()),
                conditions: vec![WhereCondition::new(
                    "name",
                    CompareOp::Eq,
                    Value::Str("bob".into()),
                )],
            },
        )
        .unwrap();
    assert_eq!(result.rows.len(), 1);
    assert_eq!(result.rows[0][0], Value::Int(2));
}

#[test]
fn projection_and_filter_pipeline() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();
    let mut session = Session::new();
    engine.execute(&mut session, &create_users()).unwrap();
    engine
        .execute(&mut session, &insert_users(&[(1, "ada"), (2, "bob")]))
        .unwrap();

    let result = engine
        .execute(
            &mut session,
            &Plan::Projection {
                input: Box::new(Plan::Filter {
                    input: Box::new(select_all()),
                    conditions: vec![WhereCondition::new(
                        "name",
                        CompareOp::Like,
                        Value::Str("d".into()),
                    )],
                }),
                columns: vec!["name".into()],
            },
        )
        .unwrap();
    assert_eq!(result.columns, vec!["name"]);
    assert_eq!(result.rows, vec![vec![Value::Str("ada".into())]]);

    // Unknown projection column is a semantic error, which ends the
    // auto-commit transaction but leaves the engine usable.
    let err = engine
        .execute(
            &mut session,
            &Plan::Projection {
                input: Box::new(select_all()),
                columns: vec!["ghost".into()],
            },
        )
        .unwrap_err();
    assert!(matches!(err, SableError::Semantic(_)));
    assert_eq!(rows_of(&engine, &mut session, &select_all()).len(), 2);
}

#[test]
fn error_inside_transaction_rolls_it_back() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();
    let mut session = Session::new();
    engine.execute(&mut session, &create_users()).unwrap();

    engine.begin(&mut session).unwrap();
    engine
        .execute(&mut session, &insert_users(&[(1, "kept?")]))
        .unwrap();
    // NOT NULL violation aborts the statement and the transaction.
    let err = engine
        .execute(
            &mut session,
            &Plan::Insert {
                table: "Users".into(),
                rows: vec![vec![Value::Null, Value::Null]],
            },
        )
        .unwrap_err();
    assert!(matches!(err, SableError::Semantic(_)));
    assert!(!session.in_transaction());

    // The first insert was rolled back with the transaction.
    let rows = rows_of(&engine, &mut session, &select_all());
    assert!(rows.is_empty());
}

#[test]
fn tx_state_errors() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();
    let mut session = Session::new();

    assert!(matches!(
        engine.commit(&mut session),
        Err(SableError::TxState(_))
    ));
    assert!(matches!(
        engine.rollback(&mut session),
        Err(SableError::TxState(_))
    ));

    engine.begin(&mut session).unwrap();
    assert!(matches!(
        engine.begin(&mut session),
        Err(SableError::TxState(_))
    ));
    engine.commit(&mut session).unwrap();
}

#[test]
fn drop_table_then_recreate() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();
    let mut session = Session::new();
    engine.execute(&mut session, &create_users()).unwrap();
    engine
        .execute(&mut session, &insert_users(&[(1, "a")]))
        .unwrap();

    engine
        .execute(
            &mut session,
            &Plan::DropTable {
                table: "Users".into(),
            },
        )
        .unwrap();
    let err = engine.execute(&mut session, &select_all()).unwrap_err();
    assert!(matches!(err, SableError::TableNotFound(_)));

    // The name is reusable and the old rows are gone.
    engine.execute(&mut session, &create_users()).unwrap();
    assert!(rows_of(&engine, &mut session, &select_all()).is_empty());
}

#[test]
fn vacuum_reclaims_and_preserves_visible_rows() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();
    let mut session = Session::new();
    engine.execute(&mut session, &create_users()).unwrap();
    engine
        .execute(
            &mut session,
            &insert_users(&[(1, "a"), (2, "b"), (3, "c")]),
        )
        .unwrap();
    engine
        .execute(
            &mut session,
            &Plan::Delete {
                table: "Users".into(),
                conditions: vec![WhereCondition::new("id", CompareOp::Lt, Value::Int(3))],
            },
        )
        .unwrap();

    let reclaimed = engine.vacuum("Users").unwrap();
    assert_eq!(reclaimed, 2);

    let rows = rows_of(&engine, &mut session, &select_all());
    assert_eq!(rows, vec![(3, "c".to_string())]);
}

#[test]
fn update_in_open_transaction_is_isolated() {
    let dir = TempDir::new().unwrap();
    let engine = Engine::open(config(&dir)).unwrap();
    let mut setup = Session::new();
    engine.execute(&mut setup, &create_users()).unwrap();
    engine
        .execute(&mut setup, &insert_users(&[(1, "before")]))
        .unwrap();

    let mut writer = Session::new();
    engine.begin(&mut writer).unwrap();
    engine
        .execute(
            &mut writer,
            &Plan::Update {
                table: "Users".into(),
                set_clause: vec![("name".to_string(), Value::Str("after".into()))],
                conditions: vec![],
            },
        )
        .unwrap();
    // The writer sees its own new version.
    let rows = rows_of(&engine, &mut writer, &select_all());
    assert_eq!(rows, vec![(1, "after".to_string())]);
    engine.rollback(&mut writer).unwrap();

    // After rollback the original version is what everyone sees.
    let mut fresh = Session::new();
    let rows = rows_of(&engine, &mut fresh, &select_all());
    assert_eq!(rows, vec![(1, "before".to_string())]);
}
