use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use clinic_calendar_core::sources::{EventSink, StaticEvents, StaticResources};
use clinic_calendar_core::{
    CalendarEvent, EditorDraft, EditorMode, EventEditor, InitialSelection, Resource,
    ResourceFilterManager, ResourcePolicy, ScheduleError, ScheduleStore,
};

fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 6, day)
        .expect("valid date")
        .and_hms_opt(hour, 0, 0)
        .expect("valid time")
}

fn two_doctors() -> ResourceFilterManager {
    ResourceFilterManager::from_source(
        &StaticResources(vec![
            Resource::new("A", "Dr A", "#aa0000").selected(true),
            Resource::new("B", "Dr B", "#00bb00"),
        ]),
        InitialSelection::Supplied,
    )
    .expect("load roster")
}

fn draft_x() -> EditorDraft {
    EditorDraft {
        title: "X".to_string(),
        patient_label: "Patient X".to_string(),
        kind: "consultation".to_string(),
        date: "2025-06-10".to_string(),
        time: "10:00".to_string(),
        end_date: "2025-06-10".to_string(),
        end_time: "11:00".to_string(),
        resource_id: "A".to_string(),
        source_event_id: None,
    }
}

#[test]
fn resource_filtering_end_to_end() {
    let mut resources = two_doctors();
    let mut store = ScheduleStore::new(ResourcePolicy::Lenient);

    let x = store.insert(&draft_x(), &resources).expect("insert X");
    assert_eq!(x.start, at(10, 10));
    assert_eq!(x.end, at(10, 11));

    assert_eq!(store.query(&["A"], ""), vec![&x]);
    assert!(store.query(&["B"], "").is_empty());

    resources.toggle("B");
    assert_eq!(resources.active_resource_ids(), vec!["A", "B"]);
    assert_eq!(store.query(&resources.active_resource_ids(), ""), vec![&x]);

    resources.clear_all();
    for search in ["", "x", "anything"] {
        assert!(store.visible(&resources, search).is_empty());
    }
}

#[test]
fn insert_then_update_keeps_the_original_id() {
    let resources = two_doctors();
    let mut store = ScheduleStore::new(ResourcePolicy::Lenient);

    let created = store.insert(&draft_x(), &resources).expect("insert");
    let mut renamed = draft_x();
    renamed.title = "X renamed".to_string();
    store.update(&created.id, &renamed, &resources).expect("update");

    let visible = store.query(&["A", "B"], "");
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].id, created.id);
    assert_eq!(visible[0].title, "X renamed");
}

#[test]
fn store_bootstraps_from_event_source() {
    let source = StaticEvents(vec![CalendarEvent {
        id: "1749549600000".to_string(),
        title: "Imported".to_string(),
        patient_label: "Mme Martin".to_string(),
        kind: "suivi".to_string(),
        start: at(10, 9),
        end: at(10, 10),
        resource_id: "A".to_string(),
        background_color: "#aa0000".to_string(),
        border_color: "#aa0000".to_string(),
    }]);
    let resources = two_doctors();
    let mut store =
        ScheduleStore::from_source(&source, ResourcePolicy::Lenient).expect("load events");

    let added = store.insert(&draft_x(), &resources).expect("insert");
    assert_ne!(added.id, "1749549600000");
    assert_eq!(store.len(), 2);
}

/// Sink standing in for the clinic API: assigns its own ids and can be told
/// to reject everything.
#[derive(Default)]
struct ApiSink {
    reject: bool,
    next_id: AtomicU64,
    deleted: Mutex<Vec<String>>,
}

impl ApiSink {
    fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    fn deleted(&self) -> Vec<String> {
        self.deleted.lock().expect("lock").clone()
    }
}

#[async_trait]
impl EventSink for ApiSink {
    async fn create(&self, mut event: CalendarEvent) -> anyhow::Result<CalendarEvent> {
        if self.reject {
            anyhow::bail!("api unavailable");
        }
        event.id = format!("srv-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1);
        Ok(event)
    }

    async fn update(&self, event: CalendarEvent) -> anyhow::Result<CalendarEvent> {
        if self.reject {
            anyhow::bail!("api unavailable");
        }
        Ok(event)
    }

    async fn delete(&self, id: &str) -> anyhow::Result<()> {
        if self.reject {
            anyhow::bail!("api unavailable");
        }
        self.deleted.lock().expect("lock").push(id.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn editor_saves_through_sink_and_adopts_server_id() {
    let resources = two_doctors();
    let mut store = ScheduleStore::new(ResourcePolicy::Lenient);
    let mut editor = EventEditor::default();
    let sink = ApiSink::default();

    editor.open_for_create("A", at(10, 9)).expect("open");
    {
        let draft = editor.draft_mut().expect("draft");
        draft.title = "Bilan".to_string();
        draft.patient_label = "M. Leroy".to_string();
    }
    let saved = editor
        .confirm_with_sink(&mut store, &resources, &sink)
        .await
        .expect("save");

    assert_eq!(saved.id, "srv-1");
    assert_eq!(editor.mode(), EditorMode::Closed);
    assert_eq!(store.get("srv-1").map(|e| e.title.as_str()), Some("Bilan"));

    editor.open_for_edit(&saved).expect("open edit");
    assert!(
        editor
            .delete_with_sink(true, &mut store, &sink)
            .await
            .expect("delete")
    );
    assert!(store.is_empty());
    assert_eq!(sink.deleted(), vec!["srv-1"]);
}

#[tokio::test]
async fn rejected_save_keeps_editor_open_and_store_unchanged() {
    let resources = two_doctors();
    let mut store = ScheduleStore::new(ResourcePolicy::Lenient);
    let mut editor = EventEditor::default();
    let sink = ApiSink::rejecting();

    editor.open_for_create("A", at(10, 9)).expect("open");
    {
        let draft = editor.draft_mut().expect("draft");
        draft.title = "Bilan".to_string();
        draft.patient_label = "M. Leroy".to_string();
    }
    let err = editor
        .confirm_with_sink(&mut store, &resources, &sink)
        .await
        .expect_err("sink rejects");

    assert!(matches!(err, ScheduleError::PersistenceFailure(ref msg) if msg.contains("api unavailable")));
    assert_eq!(editor.mode(), EditorMode::Creating);
    assert!(!editor.is_saving());
    assert!(store.is_empty());
}

#[tokio::test]
async fn store_persistence_reconciles_and_tolerates_double_delete() {
    let resources = two_doctors();
    let mut store = ScheduleStore::new(ResourcePolicy::Lenient);
    let sink = ApiSink::default();

    let created = store
        .persist_insert(&draft_x(), &resources, &sink)
        .await
        .expect("persist insert");
    assert_eq!(created.id, "srv-1");

    let mut moved = draft_x();
    moved.time = "14:00".to_string();
    moved.end_time = "14:30".to_string();
    let updated = store
        .persist_update(&created.id, &moved, &resources, &sink)
        .await
        .expect("persist update");
    assert_eq!(updated.start, at(10, 14));

    store.persist_remove("srv-1", &sink).await.expect("first delete");
    store.persist_remove("srv-1", &sink).await.expect("second delete is a no-op");
    assert_eq!(sink.deleted(), vec!["srv-1"]);
    assert!(store.is_empty());

    let failing = ApiSink::rejecting();
    let err = store
        .persist_insert(&draft_x(), &resources, &failing)
        .await
        .expect_err("rejected");
    assert!(matches!(err, ScheduleError::PersistenceFailure(_)));
    assert!(store.is_empty());
}
