use std::sync::Arc;

use tracing::{error, info};

use crate::imei::Imei;
use crate::notifier::Notifier;
use crate::platform::IncomingMessage;
use crate::verifier::{CheckResult, ImeiChecker};
use crate::whitelist::WhitelistStore;

pub const REGISTERED_TEXT: &str =
    "You have been added to the whitelist. You can now use the bot.";
pub const INVALID_IMEI_TEXT: &str = "Invalid IMEI. An IMEI must consist of 15 digits.";

/// What happened to a single inbound message.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// First contact: the chat was added to the whitelist and the text ignored
    Registered,
    InvalidImei,
    Checked(CheckResult),
}

/// Handles chat messages. Built once at startup and shared across updates.
pub struct MessageHandler {
    whitelist: WhitelistStore,
    checker: Arc<dyn ImeiChecker>,
    notifier: Arc<dyn Notifier>,
}

impl MessageHandler {
    pub fn new(
        whitelist: WhitelistStore,
        checker: Arc<dyn ImeiChecker>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            whitelist,
            checker,
            notifier,
        }
    }

    pub async fn handle(&self, msg: &IncomingMessage) -> Outcome {
        let chat_id = msg.chat_id;
        let user_id = chat_id.to_string();

        if !self.whitelist.contains(&user_id).await {
            // Persist failures are not fatal; the notice still goes out
            match self.whitelist.register(&user_id).await {
                Ok(()) => info!("Chat {} added to whitelist", chat_id),
                Err(e) => error!("Failed to persist whitelist entry {}: {:#}", user_id, e),
            }
            self.notifier.send(chat_id, REGISTERED_TEXT).await;
            return Outcome::Registered;
        }

        let text = msg.text.as_deref().unwrap_or_default().trim();
        let imei = match Imei::parse(text) {
            Some(imei) => imei,
            None => {
                self.notifier.send(chat_id, INVALID_IMEI_TEXT).await;
                return Outcome::InvalidImei;
            }
        };

        info!("Chat {} requested check for IMEI {}", chat_id, imei);

        let result = self.checker.check(&imei).await;
        self.notifier
            .send(chat_id, &format!("IMEI info: {}", result))
            .await;

        Outcome::Checked(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::Mutex;

    struct FakeChecker {
        result: CheckResult,
        calls: Mutex<Vec<String>>,
    }

    impl FakeChecker {
        fn new(result: CheckResult) -> Arc<Self> {
            Arc::new(Self {
                result,
                calls: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ImeiChecker for FakeChecker {
        async fn check(&self, imei: &Imei) -> CheckResult {
            self.calls.lock().unwrap().push(imei.to_string());
            self.result.clone()
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<(i64, String)>>,
    }

    impl RecordingNotifier {
        fn sent(&self) -> Vec<(i64, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, chat_id: i64, text: &str) {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
        }
    }

    struct Harness {
        dir: tempfile::TempDir,
        whitelist: WhitelistStore,
        checker: Arc<FakeChecker>,
        notifier: Arc<RecordingNotifier>,
        handler: MessageHandler,
    }

    fn harness(result: CheckResult) -> Harness {
        harness_at("whitelist.json", result)
    }

    fn harness_at(whitelist_file: &str, result: CheckResult) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let whitelist = WhitelistStore::new(dir.path().join(whitelist_file));
        let checker = FakeChecker::new(result);
        let notifier = Arc::new(RecordingNotifier::default());
        let handler = MessageHandler::new(whitelist.clone(), checker.clone(), notifier.clone());
        Harness {
            dir,
            whitelist,
            checker,
            notifier,
            handler,
        }
    }

    fn message(chat_id: i64, text: &str) -> IncomingMessage {
        IncomingMessage {
            chat_id,
            text: Some(text.to_string()),
        }
    }

    #[tokio::test]
    async fn test_new_chat_is_registered_and_not_checked() {
        let h = harness(CheckResult::Decoded(json!({ "ok": true })));

        let outcome = h.handler.handle(&message(42, "356938035643809")).await;

        assert_eq!(outcome, Outcome::Registered);
        assert!(h.checker.calls().is_empty());
        assert_eq!(h.notifier.sent(), vec![(42, REGISTERED_TEXT.to_string())]);
        assert_eq!(h.whitelist.load().await, vec!["42".to_string()]);
    }

    #[tokio::test]
    async fn test_known_chat_with_invalid_text_gets_validation_error() {
        let h = harness(CheckResult::Decoded(json!({ "ok": true })));
        h.whitelist.save(&["42".to_string()]).await.unwrap();

        for text in ["hello", "12345", "35693803564380x", "3569380356438091"] {
            let outcome = h.handler.handle(&message(42, text)).await;
            assert_eq!(outcome, Outcome::InvalidImei);
        }

        assert!(h.checker.calls().is_empty());
        assert!(h
            .notifier
            .sent()
            .iter()
            .all(|(id, text)| *id == 42 && text == INVALID_IMEI_TEXT));
    }

    #[tokio::test]
    async fn test_known_chat_without_text_gets_validation_error() {
        let h = harness(CheckResult::Unavailable);
        h.whitelist.save(&["42".to_string()]).await.unwrap();

        let msg = IncomingMessage {
            chat_id: 42,
            text: None,
        };
        assert_eq!(h.handler.handle(&msg).await, Outcome::InvalidImei);
        assert!(h.checker.calls().is_empty());
    }

    #[tokio::test]
    async fn test_known_chat_with_valid_imei_is_checked() {
        let remote = json!({ "status": "successful", "model": "iPhone" });
        let h = harness(CheckResult::Decoded(remote.clone()));
        h.whitelist.save(&["42".to_string()]).await.unwrap();

        let outcome = h.handler.handle(&message(42, "  356938035643809\n")).await;

        assert_eq!(outcome, Outcome::Checked(CheckResult::Decoded(remote.clone())));
        assert_eq!(h.checker.calls(), vec!["356938035643809".to_string()]);
        assert_eq!(
            h.notifier.sent(),
            vec![(42, format!("IMEI info: {}", remote))]
        );
    }

    #[tokio::test]
    async fn test_unavailable_result_is_relayed() {
        let h = harness(CheckResult::Unavailable);
        h.whitelist.save(&["42".to_string()]).await.unwrap();

        let outcome = h.handler.handle(&message(42, "356938035643809")).await;

        assert_eq!(outcome, Outcome::Checked(CheckResult::Unavailable));
        assert_eq!(
            h.notifier.sent(),
            vec![(
                42,
                r#"IMEI info: {"error":"Unable to check IMEI"}"#.to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_second_message_after_registration_is_checked() {
        let h = harness(CheckResult::Decoded(json!({ "ok": true })));

        assert_eq!(
            h.handler.handle(&message(-100, "356938035643809")).await,
            Outcome::Registered
        );
        assert!(matches!(
            h.handler.handle(&message(-100, "356938035643809")).await,
            Outcome::Checked(_)
        ));
        assert_eq!(h.whitelist.load().await, vec!["-100".to_string()]);
    }

    #[tokio::test]
    async fn test_registration_appends_to_existing_list() {
        let h = harness(CheckResult::Unavailable);
        h.whitelist.save(&["1".to_string()]).await.unwrap();

        h.handler.handle(&message(2, "hi")).await;

        assert_eq!(
            h.whitelist.load().await,
            vec!["1".to_string(), "2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_registration_notice_sent_when_persist_fails() {
        let h = harness_at("missing-dir/whitelist.json", CheckResult::Unavailable);

        let outcome = h.handler.handle(&message(42, "356938035643809")).await;

        assert_eq!(outcome, Outcome::Registered);
        assert!(h.checker.calls().is_empty());
        assert_eq!(h.notifier.sent(), vec![(42, REGISTERED_TEXT.to_string())]);
        assert!(h.whitelist.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_whitelist_is_not_overwritten() {
        let h = harness(CheckResult::Unavailable);
        std::fs::write(h.dir.path().join("whitelist.json"), "[\"1\",").unwrap();

        let outcome = h.handler.handle(&message(1, "356938035643809")).await;

        assert_eq!(outcome, Outcome::Registered);
        assert_eq!(
            std::fs::read_to_string(h.dir.path().join("whitelist.json")).unwrap(),
            "[\"1\","
        );
    }
}
