//! Tests for `#[derive(SettingsRecord)]`

use settings_records::{ColumnDef, ColumnType, CreateTable, Json, Row, SettingsRecord, SettingsStore};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, SettingsRecord)]
struct WindowState {
    width: u32,
    maximized: bool,
    title: Option<String>,
    opened: u64,
}

#[derive(Debug, Clone, Default, SettingsRecord)]
struct HTTPSettings {
    timeout_ms: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct Layout {
    panes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, SettingsRecord)]
#[record(table = "editor", empty = "Editor::defaults")]
struct Editor {
    #[column(name = "fontSize")]
    font_size: f64,
    layout: Json<Layout>,
    shortcuts: Json<BTreeMap<String, String>>,
    #[column(skip)]
    unsaved: bool,
}

impl Editor {
    fn defaults() -> Self {
        Self {
            font_size: 14.0,
            layout: Json(Layout {
                panes: vec!["main".into()],
            }),
            shortcuts: Json(BTreeMap::new()),
            unsaved: false,
        }
    }
}

#[test]
fn test_default_table_and_columns() {
    assert_eq!(WindowState::TABLE, "window_state");
    assert_eq!(
        WindowState::columns(),
        vec![
            ColumnDef::new("width", ColumnType::Integer),
            ColumnDef::new("maximized", ColumnType::Boolean),
            ColumnDef::new("title", ColumnType::Text),
            ColumnDef::new("opened", ColumnType::Integer),
        ]
    );
    assert_eq!(WindowState::empty(), WindowState::default());
}

#[test]
fn test_acronym_table_name_and_wide_integers() {
    assert_eq!(HTTPSettings::TABLE, "http_settings");

    let row = HTTPSettings { timeout_ms: 30_000 }.encode();
    assert_eq!(HTTPSettings::decode(&row).timeout_ms, 30_000);

    let state = WindowState {
        opened: 12,
        ..WindowState::default()
    };
    assert_eq!(WindowState::decode(&state.encode()), state);
}

#[test]
fn test_renamed_and_skipped_columns() {
    assert_eq!(Editor::TABLE, "editor");

    let names: Vec<&str> = Editor::columns().iter().map(|c| c.name).collect();
    assert_eq!(names, ["fontSize", "layout", "shortcuts"]);
    assert_eq!(Editor::columns()[1].column_type, ColumnType::Json);

    let row = Editor::defaults().encode();
    assert!(row.raw("fontSize").is_some());
    assert!(row.raw("unsaved").is_none());
}

#[test]
fn test_decode_falls_back_per_field() {
    let row = Row::new().with("fontSize", &18.5_f64).with("layout", &"not json".to_string());

    let decoded = Editor::decode(&row);
    assert_eq!(decoded.font_size, 18.5);
    assert_eq!(decoded.layout, Editor::defaults().layout);
    assert!(!decoded.unsaved);
}

#[test]
fn test_derived_record_persists() {
    let dir = tempfile::tempdir().unwrap();
    let mut shortcuts = BTreeMap::new();
    shortcuts.insert("save".to_string(), "ctrl+s".to_string());

    {
        let store = SettingsStore::<Editor>::builder("editor")
            .folder(dir.path())
            .without_watcher()
            .version(CreateTable::<Editor>::new("v01"))
            .build()
            .unwrap();
        store.update(|e| {
            e.shortcuts = Json(shortcuts.clone());
            e.unsaved = true;
        });
        assert!(store.get(|e| e.unsaved));
    }

    let store = SettingsStore::<Editor>::builder("editor")
        .folder(dir.path())
        .without_watcher()
        .version(CreateTable::<Editor>::new("v01"))
        .build()
        .unwrap();
    assert_eq!(store.get(|e| e.shortcuts.0.clone()), shortcuts);
    assert!(!store.get(|e| e.unsaved));
}
