//! History and library survive a process restart.

use super::test_utils::{orchestrator, ScriptedAdapter, StyleScript};
use flashui::store::{
    restore_library, restore_store, save_current, save_snapshot, HistoryPersistence,
    SledHistoryStore,
};
use flashui::{ArtifactLibrary, ArtifactStatus, SessionStore};
use std::sync::Arc;
use tempfile::TempDir;

#[tokio::test(start_paused = true)]
async fn test_generated_session_and_saved_artifact_reload() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("store");

    let adapter = Arc::new(
        ScriptedAdapter::new("[\"Minimal\", \"Bold\"]")
            .style("Minimal", StyleScript::Stream(vec!["<h1>", "A</h1>"]))
            .style("Bold", StyleScript::Denied),
    );
    let store = Arc::new(SessionStore::new());
    let report = orchestrator(store.clone(), adapter)
        .run("card", 2)
        .await
        .unwrap();
    let session = store.session(&report.session_id).unwrap();
    let saved_id = session.artifacts()[0].id().clone();

    {
        let persistence = SledHistoryStore::open(&db_path).unwrap();
        assert!(save_snapshot(&store, &persistence).unwrap());
        save_current(&store, &persistence).unwrap();

        let mut library = ArtifactLibrary::default();
        library.save(&store, &saved_id).unwrap();
        persistence.save_library(library.items()).unwrap();
        persistence.flush().unwrap();
    }

    let persistence = SledHistoryStore::open(&db_path).unwrap();
    let restored = restore_store(&persistence);
    assert_eq!(restored.sessions(), vec![session.clone()]);
    assert_eq!(restored.current_session().unwrap().id(), session.id());

    let library = restore_library(&persistence);
    assert_eq!(library.len(), 1);
    let item = library.get(saved_id.as_str()).unwrap();
    assert_eq!(item.prompt, "card");
    assert_eq!(item.style_name, "Minimal");
    assert_eq!(item.html, session.artifacts()[0].html());
}

#[test]
fn test_interrupted_generation_restores_as_failed() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("store");

    let live = SessionStore::new();
    let session = live.create_session("card", 2, "Loading");
    let first = session.artifacts()[0].id().clone();
    assert!(live.merge_fragment(session.id(), &first, "<div>partial").is_applied());
    {
        let persistence = SledHistoryStore::open(&db_path).unwrap();
        save_snapshot(&live, &persistence).unwrap();
        persistence.flush().unwrap();
    }

    let persistence = SledHistoryStore::open(&db_path).unwrap();
    let restored = restore_store(&persistence);
    let session = restored.current_session().unwrap();
    assert!(session.is_finished());
    assert!(session
        .artifacts()
        .iter()
        .all(|a| a.status() == ArtifactStatus::Error));
    assert_eq!(session.artifacts()[0].html(), "<div>partial");
}
