//! Participant tokens are credentials and must never be logged in full.

use std::io;
use std::sync::{Arc, Mutex};

use roomgate::{
    AdmissionConfig, AdmissionController, Decision, InMemoryStore, RoomMeta, RoomRepository,
};
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// fmt writer collecting every formatted line in memory
#[derive(Clone, Default)]
struct CapturedLogs {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedLogs {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLogs {
    type Writer = CapturedLogs;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

fn admitted_token(decision: Decision) -> String {
    match decision {
        Decision::Admitted(token) => token,
        other => panic!("expected Admitted, got {other:?}"),
    }
}

#[tokio::test]
async fn minted_tokens_never_appear_in_logs() {
    let logs = CapturedLogs::default();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(logs.clone())
        .with_max_level(Level::TRACE)
        .with_ansi(false)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let store = Arc::new(InMemoryStore::new());
    RoomRepository::new(store.clone())
        .create_room(&RoomMeta::new("room", 0))
        .await
        .unwrap();
    let controller = AdmissionController::new(store, AdmissionConfig::default());

    let first = admitted_token(controller.evaluate_admission("room", None).await.unwrap());
    let second = admitted_token(controller.evaluate_admission("room", None).await.unwrap());

    assert_eq!(
        controller.evaluate_admission("room", Some(&first)).await.unwrap(),
        Decision::AlreadyAdmitted
    );
    assert_eq!(
        controller.evaluate_admission("room", None).await.unwrap(),
        Decision::RoomFull
    );
    controller.record_heartbeat("room", &second).await.unwrap();

    let output = logs.contents();
    // The store layer logged the activity writes, just not the tokens
    assert!(output.contains("Expiring value set in memory"));
    assert!(output.contains(&format!("activity:room:{}..", &first[..4])));
    for token in [&first, &second] {
        let hits: Vec<&str> = output.lines().filter(|line| line.contains(token.as_str())).collect();
        assert!(hits.is_empty(), "token leaked into logs: {hits:?}");
    }
}
