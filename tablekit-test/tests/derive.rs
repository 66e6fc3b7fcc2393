use tablekit_core::{Access, Record, Row, Structure, Value};
use tablekit_macros::Record;

#[derive(Debug, Default, PartialEq, Record)]
struct Profile {
    #[column(read_only)]
    id: i64,
    #[column(rename = "display_name")]
    name: String,
    #[column(write_only)]
    password_hash: String,
    bio: Option<String>,
    #[column(skip)]
    cached_score: u32,
}

#[derive(Debug, Default, PartialEq, Record)]
struct Tagged<T> {
    #[column(read_only)]
    id: i64,
    value: T,
}

#[test]
fn test_fields_follow_declaration_order() {
    let fields = Profile::fields();
    let columns: Vec<_> = fields.iter().map(|f| f.column).collect();
    assert_eq!(columns, ["id", "display_name", "password_hash", "bio"]);
    assert_eq!(fields[0].access, Access::ReadOnly);
    assert_eq!(fields[1].name, "name");
    assert_eq!(fields[2].access, Access::WriteOnly);
    assert_eq!(fields[3].access, Access::ReadWrite);
}

#[test]
fn test_structure_splits_read_and_write() {
    let structure = Structure::of::<Profile>();
    assert_eq!(structure.read_columns(), ["id", "display_name", "bio"]);
    assert_eq!(
        structure.write_columns(),
        ["display_name", "password_hash", "bio"]
    );
}

#[test]
fn test_write_values_skip_read_only() {
    let profile = Profile {
        id: 9,
        name: "ada".into(),
        password_hash: "x1".into(),
        bio: None,
        cached_score: 3,
    };
    let structure = Structure::of::<Profile>();
    assert_eq!(
        structure.write_pairs(&profile),
        vec![
            ("display_name", Value::Text("ada".into())),
            ("password_hash", Value::Text("x1".into())),
            ("bio", Value::Null(tablekit_core::ValueKind::Text)),
        ]
    );
}

#[test]
fn test_from_row_defaults_missing_and_skipped() {
    let row = Row::new()
        .with("id", 4i64)
        .with("display_name", "ada")
        .with("bio", Some("hello".to_string()));

    let profile = Profile::from_row(&row).unwrap();

    assert_eq!(
        profile,
        Profile {
            id: 4,
            name: "ada".into(),
            password_hash: String::new(),
            bio: Some("hello".into()),
            cached_score: 0,
        }
    );
}

#[test]
fn test_from_row_type_mismatch() {
    let row = Row::new().with("id", "four");
    let err = Profile::from_row(&row).unwrap_err();
    assert_eq!(err.column, "id");
}

#[test]
fn test_generic_record() {
    assert_eq!(Structure::of::<Tagged<String>>().write_columns(), ["value"]);

    let row = Row::new().with("id", 1i64).with("value", "tag");
    let tagged = Tagged::<String>::from_row(&row).unwrap();
    assert_eq!(tagged.value, "tag");

    let counted = Tagged { id: 0, value: 5i64 };
    assert_eq!(counted.values(), vec![Value::Int(0), Value::Int(5)]);
}
