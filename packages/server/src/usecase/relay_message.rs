//! UseCase: 受信フレームの分類と配送
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - RelayMessageUseCase::execute() メソッド
//! - フレームの分類（生存確認応答 / 宛先付き / ブロードキャスト / 無視 / プレーンテキスト）
//!
//! ### どのような状況を想定しているか
//! - 正常系：宛先付きメッセージは宛先にだけ届く
//! - 正常系：宛先なしメッセージは送信者を含む全員に届く
//! - 正常系：JSON オブジェクトでないフレーム（空白のみを含む）は type=message としてそのまま配送される
//! - 異常系：文字列でない宛先は配送せず送信者にエラーを返す
//! - 異常系：宛先が不正・名前空間違い・不在の場合は送信者にエラーを返す
//! - 異常系：永続化に失敗しても配送は行われる（message_id なし）

use std::sync::Arc;

use ordertalk_shared::time::Clock;

use crate::{
    domain::{
        ClientKey, ConnectionRegistry, MessageStore, NewMessage, RecipientKey, Role, Timestamp,
    },
    infrastructure::dto::websocket::{ErrorMessage, InboundFrame, InboundRecipient, MessageType},
};

use super::{
    ChannelScope, SessionError, SessionPeer,
    envelope::{chat_envelope, persist_best_effort},
};

/// How an inbound frame was handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// `pong` (or `ping`) frame; only refreshes liveness.
    LivenessAck,
    /// Nothing to deliver.
    Ignored,
    Direct { recipient: ClientKey, delivered: bool },
    Broadcast { recipients: usize },
    /// Recipient could not be resolved; an error envelope went back to the sender.
    Rejected { reason: String },
}

/// 受信フレーム配送のユースケース
pub struct RelayMessageUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    store: Arc<dyn MessageStore>,
    clock: Arc<dyn Clock>,
}

impl RelayMessageUseCase {
    pub fn new(
        registry: Arc<dyn ConnectionRegistry>,
        store: Arc<dyn MessageStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            store,
            clock,
        }
    }

    /// 生存確認応答（トランスポートの Pong を含む）を記録
    pub async fn acknowledge_liveness(&self, peer: &SessionPeer) {
        self.registry.touch(peer.connection_id()).await;
    }

    /// 1 フレームを処理
    ///
    /// `Err` はセッションを強制終了すべき想定外のエラーのみ。
    /// 宛先エラーや配送失敗は `Ok` で返し、接続は維持される。
    pub async fn execute(
        &self,
        peer: &SessionPeer,
        text: &str,
    ) -> Result<RelayOutcome, SessionError> {
        if text.trim() == "pong" {
            self.acknowledge_liveness(peer).await;
            return Ok(RelayOutcome::LivenessAck);
        }

        let Some(frame) = InboundFrame::parse(text) else {
            tracing::debug!("Frame from {} is not a JSON object, relaying as text", peer);
            return self.broadcast(peer, MessageType::Message, text).await;
        };

        if frame.is_liveness_ack() {
            self.acknowledge_liveness(peer).await;
            return Ok(RelayOutcome::LivenessAck);
        }
        let Some(content) = frame.content() else {
            tracing::debug!("Frame from {} has no content, ignoring", peer);
            return Ok(RelayOutcome::Ignored);
        };

        match frame.recipient() {
            Some(InboundRecipient::Key(recipient)) => self.direct(peer, recipient, content).await,
            Some(InboundRecipient::Invalid(value)) => {
                self.reject(peer, format!("recipient key must be a string, got {}", value))
            }
            None => self.broadcast(peer, MessageType::Broadcast, content).await,
        }
    }

    async fn direct(
        &self,
        peer: &SessionPeer,
        recipient: &str,
        content: &str,
    ) -> Result<RelayOutcome, SessionError> {
        let resolved = match peer.scope() {
            ChannelScope::Open => {
                ClientKey::new(recipient.to_string()).map_err(|e| e.to_string())
            }
            ChannelScope::Role(role) => RecipientKey::parse_in(recipient, role.counterpart())
                .map(RecipientKey::to_client_key)
                .map_err(|e| e.to_string()),
        };
        let recipient = match resolved {
            Ok(key) => key,
            Err(reason) => return self.reject(peer, reason),
        };

        let kind = match peer.scope() {
            ChannelScope::Role(Role::Admin) => MessageType::AdminMessage,
            _ => MessageType::DirectMessage,
        };
        let message = self.new_message(peer, content, Some(recipient.clone()));
        let stored = persist_best_effort(self.store.as_ref(), message.clone()).await;
        let envelope = chat_envelope(kind, &message, stored, self.now());

        let delivered = self
            .registry
            .send_to(&recipient, &serde_json::to_string(&envelope)?)
            .await;
        if delivered {
            tracing::debug!("Delivered message from {} to '{}'", peer, recipient);
        } else {
            tracing::info!("Recipient '{}' is not connected, told {}", recipient, peer);
            self.reply_error(peer, &format!("recipient {} is not connected", recipient))?;
        }

        Ok(RelayOutcome::Direct {
            recipient,
            delivered,
        })
    }

    async fn broadcast(
        &self,
        peer: &SessionPeer,
        kind: MessageType,
        content: &str,
    ) -> Result<RelayOutcome, SessionError> {
        let message = self.new_message(peer, content, None);
        let stored = persist_best_effort(self.store.as_ref(), message.clone()).await;
        let envelope = chat_envelope(kind, &message, stored, self.now());

        let recipients = self
            .registry
            .broadcast(&serde_json::to_string(&envelope)?, None)
            .await;
        tracing::debug!("Broadcasted message from {} ({} live)", peer, recipients);

        Ok(RelayOutcome::Broadcast { recipients })
    }

    fn new_message(
        &self,
        peer: &SessionPeer,
        content: &str,
        recipient_key: Option<ClientKey>,
    ) -> NewMessage {
        NewMessage {
            content: content.to_string(),
            sender_key: peer.key().map(|key| key.to_string()),
            sender_name: peer.name().to_string(),
            broadcast: recipient_key.is_none(),
            recipient_key,
        }
    }

    fn reject(&self, peer: &SessionPeer, reason: String) -> Result<RelayOutcome, SessionError> {
        tracing::info!("Rejected recipient from {}: {}", peer, reason);
        self.reply_error(peer, &reason)?;
        Ok(RelayOutcome::Rejected { reason })
    }

    fn reply_error(&self, peer: &SessionPeer, detail: &str) -> Result<(), SessionError> {
        let payload = serde_json::to_string(&ErrorMessage::new(detail))?;
        if !peer.reply(payload) {
            tracing::debug!("Error envelope for {} dropped, writer already stopped", peer);
        }
        Ok(())
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{
            Identity, MessageStoreError, MockMessageStore, OutboundFrame, StoredMessage,
        },
        infrastructure::{
            registry::{InMemoryConnectionRegistry, RegistryConfig},
            repository::InMemoryMessageStore,
        },
    };
    use ordertalk_shared::time::FixedClock;
    use tokio::sync::mpsc;

    type Receiver = mpsc::UnboundedReceiver<OutboundFrame>;

    struct Fixture {
        usecase: RelayMessageUseCase,
        registry: Arc<InMemoryConnectionRegistry>,
    }

    fn create_fixture(store: Arc<dyn MessageStore>) -> Fixture {
        let clock = Arc::new(FixedClock::new(1_700_000_000_000));
        let registry = Arc::new(InMemoryConnectionRegistry::new(
            RegistryConfig::default(),
            clock.clone(),
        ));
        Fixture {
            usecase: RelayMessageUseCase::new(registry.clone(), store, clock),
            registry,
        }
    }

    fn create_default_fixture() -> Fixture {
        let clock = Arc::new(FixedClock::new(1_700_000_000_000));
        create_fixture(Arc::new(InMemoryMessageStore::new(clock)))
    }

    async fn join_open(fixture: &Fixture, key: Option<&str>, name: &str) -> (SessionPeer, Receiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let key = key.map(|k| ClientKey::new(k.to_string()).unwrap());
        let peer = SessionPeer::open(key, Some(name.to_string()), tx);
        fixture.registry.register(peer.to_connection()).await;
        (peer, rx)
    }

    async fn join_role(fixture: &Fixture, role: Role, id: u64) -> (SessionPeer, Receiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        let identity = Identity {
            id,
            display_name: format!("{}{}", role, id),
            role,
        };
        let peer = SessionPeer::authenticated(&identity, tx);
        fixture.registry.register(peer.to_connection()).await;
        (peer, rx)
    }

    fn next_json(rx: &mut Receiver) -> serde_json::Value {
        match rx.try_recv() {
            Ok(OutboundFrame::Text(text)) => serde_json::from_str(&text).unwrap(),
            other => panic!("expected a text frame, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_direct_message_reaches_only_recipient() {
        // テスト項目: 宛先付きメッセージは宛先にだけ届き、message_id が付与される
        // given (前提条件):
        let fixture = create_default_fixture();
        let (alice, mut alice_rx) = join_open(&fixture, Some("user_1"), "alice").await;
        let (_bob, mut bob_rx) = join_open(&fixture, Some("admin_1"), "bob").await;
        let (_carol, mut carol_rx) = join_open(&fixture, Some("user_2"), "carol").await;

        // when (操作):
        let outcome = fixture
            .usecase
            .execute(&alice, r#"{"content":"hi","recipient_key":"admin_1"}"#)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            outcome,
            RelayOutcome::Direct {
                recipient: ClientKey::new("admin_1".to_string()).unwrap(),
                delivered: true,
            }
        );
        let received = next_json(&mut bob_rx);
        assert_eq!(received["type"], "direct_message");
        assert_eq!(received["content"], "hi");
        assert_eq!(received["sender_key"], "user_1");
        assert_eq!(received["sender_name"], "alice");
        assert_eq!(received["recipient_key"], "admin_1");
        assert_eq!(received["message_id"], 1);
        assert!(alice_rx.try_recv().is_err());
        assert!(carol_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_includes_sender() {
        // テスト項目: 宛先なしメッセージは送信者自身と匿名接続を含む全員に届く
        // given (前提条件):
        let fixture = create_default_fixture();
        let (alice, mut alice_rx) = join_open(&fixture, Some("user_1"), "alice").await;
        let (_guest, mut guest_rx) = join_open(&fixture, None, "guest").await;

        // when (操作):
        let outcome = fixture
            .usecase
            .execute(&alice, r#"{"content":"hello all"}"#)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(outcome, RelayOutcome::Broadcast { recipients: 2 });
        for rx in [&mut alice_rx, &mut guest_rx] {
            let received = next_json(rx);
            assert_eq!(received["type"], "broadcast");
            assert_eq!(received["content"], "hello all");
            assert!(received.get("recipient_key").is_none());
        }
    }

    #[tokio::test]
    async fn test_plain_text_is_relayed_verbatim() {
        // テスト項目: JSON としてデコードできないフレームは type=message でそのまま配送される
        // given (前提条件):
        let fixture = create_default_fixture();
        let (alice, _alice_rx) = join_open(&fixture, Some("user_1"), "alice").await;
        let (_bob, mut bob_rx) = join_open(&fixture, Some("user_2"), "bob").await;

        // when (操作):
        let outcome = fixture.usecase.execute(&alice, "just text {").await.unwrap();

        // then (期待する結果):
        assert_eq!(outcome, RelayOutcome::Broadcast { recipients: 2 });
        let received = next_json(&mut bob_rx);
        assert_eq!(received["type"], "message");
        assert_eq!(received["content"], "just text {");
        assert_eq!(received["sender_key"], "user_1");
    }

    #[tokio::test]
    async fn test_liveness_ack_is_not_delivered() {
        // テスト項目: pong フレーム（JSON・生テキストとも）は配送されず生存確認としてのみ扱われる
        // given (前提条件):
        let fixture = create_default_fixture();
        let (alice, _alice_rx) = join_open(&fixture, Some("user_1"), "alice").await;
        let (_bob, mut bob_rx) = join_open(&fixture, Some("user_2"), "bob").await;

        for frame in [r#"{"type":"pong"}"#, "pong"] {
            // when (操作):
            let outcome = fixture.usecase.execute(&alice, frame).await.unwrap();

            // then (期待する結果):
            assert_eq!(outcome, RelayOutcome::LivenessAck);
        }
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_frames_without_content_are_ignored() {
        // テスト項目: content を持たない JSON フレームは無視される
        // given (前提条件):
        let fixture = create_default_fixture();
        let (alice, _alice_rx) = join_open(&fixture, Some("user_1"), "alice").await;
        let (_bob, mut bob_rx) = join_open(&fixture, Some("user_2"), "bob").await;

        for frame in [r#"{"recipient_key":"user_2"}"#, r#"{"content":""}"#] {
            // when (操作):
            let outcome = fixture.usecase.execute(&alice, frame).await.unwrap();

            // then (期待する結果):
            assert_eq!(outcome, RelayOutcome::Ignored, "frame: {}", frame);
        }
        assert!(bob_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_blank_text_is_relayed_as_message() {
        // テスト項目: 空白だけのフレームも破棄されず type=message として配送される
        // given (前提条件):
        let fixture = create_default_fixture();
        let (alice, _alice_rx) = join_open(&fixture, Some("user_1"), "alice").await;
        let (_bob, mut bob_rx) = join_open(&fixture, Some("user_2"), "bob").await;

        // when (操作):
        let outcome = fixture.usecase.execute(&alice, "   ").await.unwrap();

        // then (期待する結果):
        assert_eq!(outcome, RelayOutcome::Broadcast { recipients: 2 });
        let received = next_json(&mut bob_rx);
        assert_eq!(received["type"], "message");
        assert_eq!(received["content"], "   ");
    }

    #[tokio::test]
    async fn test_non_string_recipient_is_rejected_not_broadcast() {
        // テスト項目: 文字列でない宛先を持つフレームは誰にも配送されず、送信者にエラーが返る
        // given (前提条件):
        let fixture = create_default_fixture();
        let (alice, mut alice_rx) = join_open(&fixture, Some("user_1"), "alice").await;
        let (_bob, mut bob_rx) = join_open(&fixture, Some("admin_1"), "bob").await;
        let (_carol, mut carol_rx) = join_open(&fixture, Some("user_2"), "carol").await;

        // when (操作):
        let outcome = fixture
            .usecase
            .execute(&alice, r#"{"content":"secret","recipient_key":1}"#)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(matches!(outcome, RelayOutcome::Rejected { .. }));
        let error = next_json(&mut alice_rx);
        assert_eq!(error["type"], "error");
        assert!(error["detail"].as_str().unwrap().contains("must be a string"));
        assert!(alice_rx.try_recv().is_err());
        assert!(bob_rx.try_recv().is_err());
        assert!(carol_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_both_recipient_fields_stay_direct() {
        // テスト項目: recipient_key と recipient_id の両方を持つフレームも宛先にだけ届く
        // given (前提条件):
        let fixture = create_default_fixture();
        let (alice, mut alice_rx) = join_open(&fixture, Some("user_1"), "alice").await;
        let (_bob, mut bob_rx) = join_open(&fixture, Some("admin_1"), "bob").await;
        let (_carol, mut carol_rx) = join_open(&fixture, Some("user_2"), "carol").await;

        // when (操作):
        let outcome = fixture
            .usecase
            .execute(
                &alice,
                r#"{"content":"secret for admin 1","recipient_key":"admin_1","recipient_id":"admin_1"}"#,
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(
            outcome,
            RelayOutcome::Direct {
                recipient: ClientKey::new("admin_1".to_string()).unwrap(),
                delivered: true,
            }
        );
        let received = next_json(&mut bob_rx);
        assert_eq!(received["type"], "direct_message");
        assert_eq!(received["content"], "secret for admin 1");
        assert!(alice_rx.try_recv().is_err());
        assert!(carol_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_recipient_reports_error_to_sender() {
        // テスト項目: 接続していない宛先への送信は delivered=false となり、送信者にエラーが返る
        // given (前提条件):
        let fixture = create_default_fixture();
        let (alice, mut alice_rx) = join_open(&fixture, Some("user_1"), "alice").await;

        // when (操作):
        let outcome = fixture
            .usecase
            .execute(&alice, r#"{"content":"hi","recipient_id":"user_404"}"#)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(matches!(
            outcome,
            RelayOutcome::Direct {
                delivered: false,
                ..
            }
        ));
        let error = next_json(&mut alice_rx);
        assert_eq!(error["type"], "error");
        assert!(error["detail"].as_str().unwrap().contains("user_404"));
    }

    #[tokio::test]
    async fn test_admin_channel_sends_admin_message() {
        // テスト項目: 管理者チャンネルからの送信は admin_message としてユーザーに届く
        // given (前提条件):
        let fixture = create_default_fixture();
        let (admin, _admin_rx) = join_role(&fixture, Role::Admin, 1).await;
        let (_user, mut user_rx) = join_role(&fixture, Role::User, 7).await;

        // when (操作):
        let outcome = fixture
            .usecase
            .execute(&admin, r#"{"content":"order shipped","recipient_key":"user_7"}"#)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(matches!(outcome, RelayOutcome::Direct { delivered: true, .. }));
        let received = next_json(&mut user_rx);
        assert_eq!(received["type"], "admin_message");
        assert_eq!(received["sender_key"], "admin_1");
    }

    #[tokio::test]
    async fn test_role_channel_rejects_wrong_namespace() {
        // テスト項目: ユーザーチャンネルから user_<id> 宛てには送れず、エラーが返る
        // given (前提条件):
        let fixture = create_default_fixture();
        let (user, mut user_rx) = join_role(&fixture, Role::User, 1).await;
        let (_other, mut other_rx) = join_role(&fixture, Role::User, 2).await;

        // when (操作):
        let outcome = fixture
            .usecase
            .execute(&user, r#"{"content":"psst","recipient_key":"user_2"}"#)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(matches!(outcome, RelayOutcome::Rejected { .. }));
        assert_eq!(next_json(&mut user_rx)["type"], "error");
        assert!(other_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_role_channel_rejects_malformed_recipient() {
        // テスト項目: 形式が不正な宛先キーは拒否される
        // given (前提条件):
        let fixture = create_default_fixture();
        let (user, mut user_rx) = join_role(&fixture, Role::User, 1).await;

        // when (操作):
        let outcome = fixture
            .usecase
            .execute(&user, r#"{"content":"hi","recipient_key":"admin_abc"}"#)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(matches!(outcome, RelayOutcome::Rejected { .. }));
        assert_eq!(next_json(&mut user_rx)["type"], "error");
    }

    #[tokio::test]
    async fn test_persistence_failure_still_delivers() {
        // テスト項目: 永続化に失敗しても配送は行われ、message_id は付与されない
        // given (前提条件):
        let mut store = MockMessageStore::new();
        store
            .expect_persist_message()
            .times(1)
            .returning(|_| Err(MessageStoreError::Unavailable("disk full".to_string())));
        let fixture = create_fixture(Arc::new(store));
        let (alice, _alice_rx) = join_open(&fixture, Some("user_1"), "alice").await;
        let (_bob, mut bob_rx) = join_open(&fixture, Some("user_2"), "bob").await;

        // when (操作):
        let outcome = fixture
            .usecase
            .execute(&alice, r#"{"content":"still here","recipient_key":"user_2"}"#)
            .await
            .unwrap();

        // then (期待する結果):
        assert!(matches!(outcome, RelayOutcome::Direct { delivered: true, .. }));
        let received = next_json(&mut bob_rx);
        assert_eq!(received["content"], "still here");
        assert!(received.get("message_id").is_none());
    }

    #[tokio::test]
    async fn test_persisted_record_describes_direct_message() {
        // テスト項目: 宛先付きメッセージは broadcast=false で宛先とともに永続化される
        // given (前提条件):
        let mut store = MockMessageStore::new();
        store
            .expect_persist_message()
            .withf(|message| {
                !message.broadcast
                    && message.content == "hi"
                    && message.sender_key.as_deref() == Some("user_1")
                    && message.recipient_key.as_ref().map(|k| k.as_str()) == Some("user_2")
            })
            .times(1)
            .returning(|_| {
                Ok(StoredMessage {
                    message_id: 42,
                    timestamp: Timestamp::new(1_700_000_000_000),
                })
            });
        let fixture = create_fixture(Arc::new(store));
        let (alice, _alice_rx) = join_open(&fixture, Some("user_1"), "alice").await;
        let (_bob, mut bob_rx) = join_open(&fixture, Some("user_2"), "bob").await;

        // when (操作):
        fixture
            .usecase
            .execute(&alice, r#"{"content":"hi","recipient_key":"user_2"}"#)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(next_json(&mut bob_rx)["message_id"], 42);
    }
}
