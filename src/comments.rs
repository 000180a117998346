//! Comment Response Engine.
//!
//! Scans recent platform posts for fresh comments and answers them. Buy-intent
//! comments on a campaign post get the campaign's reply template; everything
//! else goes through the Oracle, which may decline with an IGNORE sentinel.
//! The comment id in the log table makes every decision idempotent.

use crate::activity::ActivityLog;
use crate::domain::{AgentLogEntry, CommentAction, CommentLog, ProductCampaign, agents};
use crate::error::Result;
use crate::notify::Notifier;
use crate::oracle::{Retrier, Sleeper};
use crate::platform::{PlatformComment, PlatformPost, SocialPlatform};
use crate::store::SharedStore;
use std::sync::Arc;
use std::time::Duration;

/// How many recent posts to scan per tick.
const POSTS_TO_SCAN: usize = 10;

/// How much of the campaign copy must lead the platform post text to count
/// as a match when we cannot match by id.
const COPY_MATCH_PREFIX: usize = 40;

/// Phrases signalling a purchase question, Portuguese first.
const BUY_INTENT_KEYWORDS: [&str; 12] = [
    "quero",
    "comprar",
    "como compro",
    "onde compro",
    "quanto custa",
    "preço",
    "preco",
    "valor",
    "link",
    "buy",
    "price",
    "how much",
];

/// Oracle reply meaning "do not answer this comment".
const IGNORE_SENTINEL: &str = "IGNORE";

/// What one engine tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineRunSummary {
    pub scanned: usize,
    pub replied: usize,
    pub ignored: usize,
    pub failed: usize,
}

impl EngineRunSummary {
    fn handled(&self) -> usize {
        self.replied + self.ignored + self.failed
    }
}

pub struct CommentEngine {
    store: SharedStore,
    activity: ActivityLog,
    notifier: Notifier,
    platform: Arc<dyn SocialPlatform>,
    retrier: Arc<Retrier>,
    sleeper: Arc<dyn Sleeper>,
    /// Pause between consecutive replies.
    reply_delay: Duration,
}

impl CommentEngine {
    pub fn new(
        store: SharedStore,
        activity: ActivityLog,
        notifier: Notifier,
        platform: Arc<dyn SocialPlatform>,
        retrier: Arc<Retrier>,
        sleeper: Arc<dyn Sleeper>,
        reply_delay: Duration,
    ) -> Self {
        Self {
            store,
            activity,
            notifier,
            platform,
            retrier,
            sleeper,
            reply_delay,
        }
    }

    /// One engine pass over recent posts.
    pub async fn run(&self) -> Result<EngineRunSummary> {
        let posts = self.platform.get_posts(POSTS_TO_SCAN).await?;

        let campaigns = {
            let store = self.store.lock().expect("store lock poisoned");
            store.list_campaigns()?
        };

        let mut summary = EngineRunSummary::default();

        for post in &posts {
            let comments = match self.platform.get_post_comments(&post.id).await {
                Ok(comments) => comments,
                Err(err) => {
                    tracing::warn!(post_id = %post.id, error = %err, "comment fetch failed");
                    continue;
                }
            };

            // The platform id was recorded on the item at publish time; it
            // leads back to the internal id campaigns are keyed by.
            let internal_id = {
                let store = self.store.lock().expect("store lock poisoned");
                store.post_by_platform_id(&post.id)?.map(|item| item.id)
            };
            let campaign = match_campaign(&campaigns, post, internal_id.as_deref());

            for comment in &comments {
                summary.scanned += 1;

                let already_handled = {
                    let store = self.store.lock().expect("store lock poisoned");
                    store.has_comment(&comment.id)?
                };
                if already_handled {
                    continue;
                }

                if summary.handled() > 0 {
                    self.sleeper.sleep(self.reply_delay).await;
                }

                match self.handle_comment(comment, campaign, post).await? {
                    CommentAction::Replied => summary.replied += 1,
                    CommentAction::Ignored => summary.ignored += 1,
                    CommentAction::Failed => summary.failed += 1,
                }
            }
        }

        if summary.handled() > 0 {
            self.activity.record(AgentLogEntry::result(
                agents::COMMENT_ENGINE,
                &format!(
                    "engine pass: {} replied, {} ignored, {} failed of {} scanned",
                    summary.replied, summary.ignored, summary.failed, summary.scanned
                ),
                serde_json::json!({
                    "replied": summary.replied,
                    "ignored": summary.ignored,
                    "failed": summary.failed,
                }),
            ))?;
        }

        Ok(summary)
    }

    /// Decide and act on one fresh comment.
    async fn handle_comment(
        &self,
        comment: &PlatformComment,
        campaign: Option<&ProductCampaign>,
        post: &PlatformPost,
    ) -> Result<CommentAction> {
        let reply = match campaign {
            Some(campaign) if campaign.auto_reply && has_buy_intent(&comment.text) => {
                render_template(&campaign.reply_template, &comment.author_name)
            }
            _ => match self.reply_from_oracle(comment, post).await {
                Ok(Some(reply)) => reply,
                Ok(None) => return self.log(comment, CommentAction::Ignored, ""),
                Err(err) => {
                    tracing::warn!(comment_id = %comment.id, error = %err, "oracle reply failed");
                    return self.log(comment, CommentAction::Failed, "");
                }
            },
        };

        match self.platform.reply_to_comment(&comment.id, &reply).await {
            Ok(()) => {
                tracing::info!(comment_id = %comment.id, "replied to comment");
                self.log(comment, CommentAction::Replied, &reply)
            }
            Err(err) => {
                self.notifier.notify_admins(
                    "alert",
                    "Comment reply failed",
                    &format!("Could not reply to {}: {}", comment.author_name, err),
                )?;
                self.log(comment, CommentAction::Failed, &reply)
            }
        }
    }

    /// Oracle fallback for comments with no matching campaign template.
    /// Returns None when the Oracle declines to answer.
    async fn reply_from_oracle(
        &self,
        comment: &PlatformComment,
        post: &PlatformPost,
    ) -> Result<Option<String>> {
        let prompt = format!(
            "You answer comments on a brand's social media page, in the \
             commenter's language, warm and brief.\n\
             Post: \"{}\"\n\
             Comment from {}: \"{}\"\n\
             If no answer is appropriate, reply with exactly IGNORE.",
            post.message, comment.author_name, comment.text
        );

        let reply = self.retrier.generate(&prompt).await?;
        let reply = reply.trim();
        if reply.is_empty() || reply == IGNORE_SENTINEL {
            Ok(None)
        } else {
            Ok(Some(reply.to_string()))
        }
    }

    fn log(&self, comment: &PlatformComment, action: CommentAction, reply: &str) -> Result<CommentAction> {
        let store = self.store.lock().expect("store lock poisoned");
        store.log_comment(&CommentLog::new(&comment.id, action, reply))?;
        Ok(action)
    }
}

/// Find the campaign behind a platform post: exact match on the internal item
/// the platform post id maps to, then the copy text as join key (the
/// published message starts with the campaign's copy).
fn match_campaign<'a>(
    campaigns: &'a [ProductCampaign],
    post: &PlatformPost,
    internal_id: Option<&str>,
) -> Option<&'a ProductCampaign> {
    campaigns.iter().find(|campaign| {
        if internal_id.is_some_and(|id| campaign.post_id == id) {
            return true;
        }
        let prefix: String = campaign.copy_text.chars().take(COPY_MATCH_PREFIX).collect();
        !prefix.is_empty() && post.message.starts_with(&prefix)
    })
}

fn has_buy_intent(text: &str) -> bool {
    let lower = text.to_lowercase();
    BUY_INTENT_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Substitute `[NAME]` with the commenter's first name token.
fn render_template(template: &str, author_name: &str) -> String {
    let first_name = author_name.split_whitespace().next().unwrap_or("você");
    template.replace("[NAME]", first_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContentItem, PostStatus, ProductCandidate};
    use crate::notify::testing::RecordingSink;
    use crate::oracle::retry::testing::{RecordingSleeper, ScriptedOracle};
    use crate::platform::testing::MockPlatform;
    use crate::store::Store;

    fn candidate() -> ProductCandidate {
        ProductCandidate {
            id: "prod-1".to_string(),
            name: "Air Fryer".to_string(),
            url: "https://shop.example.com/prod-1".to_string(),
            price: 299.0,
            description: "desc".to_string(),
            units_sold: 10,
        }
    }

    struct Fixture {
        engine: CommentEngine,
        store: SharedStore,
        platform: Arc<MockPlatform>,
        sink: Arc<RecordingSink>,
    }

    fn fixture(oracle_reply: &str) -> Fixture {
        let store = Store::open_in_memory().unwrap().into_shared();
        let sink = Arc::new(RecordingSink::default());
        let activity = ActivityLog::new(store.clone(), sink.clone());
        let notifier = Notifier::new(store.clone(), sink.clone());
        let platform = Arc::new(MockPlatform::new());
        let retrier = Arc::new(Retrier::with_sleeper(
            Arc::new(ScriptedOracle::rate_limited(0, oracle_reply)),
            Arc::new(RecordingSleeper::default()),
        ));
        let engine = CommentEngine::new(
            store.clone(),
            activity,
            notifier,
            platform.clone(),
            retrier,
            Arc::new(RecordingSleeper::default()),
            Duration::from_secs(3),
        );
        Fixture {
            engine,
            store,
            platform,
            sink,
        }
    }

    fn add_post(platform: &MockPlatform, id: &str, message: &str) {
        platform.posts.lock().unwrap().push(PlatformPost {
            id: id.to_string(),
            message: message.to_string(),
            created_at: 1,
        });
    }

    fn add_comment(platform: &MockPlatform, post_id: &str, id: &str, author: &str, text: &str) {
        platform
            .comments
            .lock()
            .unwrap()
            .entry(post_id.to_string())
            .or_default()
            .push(PlatformComment {
                id: id.to_string(),
                author_name: author.to_string(),
                text: text.to_string(),
            });
    }

    fn add_campaign(store: &SharedStore, copy: &str, template: &str) {
        let campaign = ProductCampaign::new("post-1", &candidate(), copy, template);
        store.lock().unwrap().insert_campaign(&campaign).unwrap();
    }

    #[tokio::test]
    async fn test_buy_intent_gets_template_reply_with_first_name() {
        let f = fixture("unused");
        add_campaign(&f.store, "Best air fryer deal of the year!", "Oi [NAME], o link está na bio!");
        add_post(&f.platform, "fb-1", "Best air fryer deal of the year! Buy now.");
        add_comment(&f.platform, "fb-1", "c-1", "Maria Silva", "Quero! Quanto custa?");

        let summary = f.engine.run().await.unwrap();
        assert_eq!(summary.replied, 1);

        let replies = f.platform.replies.lock().unwrap();
        assert_eq!(replies[0].0, "c-1");
        assert_eq!(replies[0].1, "Oi Maria, o link está na bio!");
    }

    #[tokio::test]
    async fn test_campaign_found_through_platform_post_id() {
        let f = fixture("generic oracle reply");

        // Published campaign item whose message the platform decorated, so
        // the copy-prefix fallback cannot fire
        let mut item = ContentItem::new_approved("Air Fryer", "Best air fryer deal!", vec![], 0);
        item.status = PostStatus::Published;
        item.published_at = Some(1);
        item.platform_post_id = Some("fb-9".to_string());
        f.store.lock().unwrap().insert_post(&item).unwrap();

        let campaign = ProductCampaign::new(
            &item.id,
            &candidate(),
            "Best air fryer deal!",
            "Oi [NAME], link na bio!",
        );
        f.store.lock().unwrap().insert_campaign(&campaign).unwrap();

        add_post(&f.platform, "fb-9", "[Promo] deal of the day, see description");
        add_comment(&f.platform, "fb-9", "c-1", "Maria Silva", "Quero! Como compro?");

        let summary = f.engine.run().await.unwrap();
        assert_eq!(summary.replied, 1);
        assert_eq!(f.platform.replies.lock().unwrap()[0].1, "Oi Maria, link na bio!");
    }

    #[tokio::test]
    async fn test_missing_author_name_falls_back() {
        assert_eq!(render_template("Oi [NAME]!", ""), "Oi você!");
        assert_eq!(render_template("Oi [NAME]!", "   "), "Oi você!");
    }

    #[tokio::test]
    async fn test_comment_without_buy_intent_goes_to_oracle() {
        let f = fixture("Obrigado pelo carinho!");
        add_campaign(&f.store, "Best air fryer deal!", "Oi [NAME]!");
        add_post(&f.platform, "fb-1", "Best air fryer deal! Today only.");
        add_comment(&f.platform, "fb-1", "c-1", "Ana", "Adorei a página!");

        let summary = f.engine.run().await.unwrap();
        assert_eq!(summary.replied, 1);
        assert_eq!(f.platform.replies.lock().unwrap()[0].1, "Obrigado pelo carinho!");
    }

    #[tokio::test]
    async fn test_ignore_sentinel_logs_ignored_without_reply() {
        let f = fixture("IGNORE");
        add_post(&f.platform, "fb-1", "Plain post");
        add_comment(&f.platform, "fb-1", "c-1", "Bot", "spam spam spam");

        let summary = f.engine.run().await.unwrap();
        assert_eq!(summary.ignored, 1);
        assert!(f.platform.replies.lock().unwrap().is_empty());

        let store = f.store.lock().unwrap();
        assert_eq!(store.count_comments_by_action(CommentAction::Ignored).unwrap(), 1);
    }

    #[tokio::test]
    async fn test_handled_comment_never_replied_twice() {
        let f = fixture("Olá!");
        add_post(&f.platform, "fb-1", "Plain post");
        add_comment(&f.platform, "fb-1", "c-1", "Ana", "Oi!");

        let first = f.engine.run().await.unwrap();
        assert_eq!(first.replied, 1);

        // Same comment still present on the next pass
        let second = f.engine.run().await.unwrap();
        assert_eq!(second.replied, 0);
        assert_eq!(second.scanned, 1);
        assert_eq!(f.platform.replies.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_reply_failure_logged_and_siblings_continue() {
        let f = fixture("Olá!");
        add_post(&f.platform, "fb-1", "Plain post");
        add_comment(&f.platform, "fb-1", "c-1", "Ana", "Oi!");
        add_comment(&f.platform, "fb-1", "c-2", "Bia", "Olá!");
        f.platform.failing_replies.lock().unwrap().push("c-1".to_string());

        let summary = f.engine.run().await.unwrap();
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.replied, 1);

        // Failed comment is still recorded so it is not retried forever
        let store = f.store.lock().unwrap();
        assert!(store.has_comment("c-1").unwrap());
        drop(store);
        // Admin heard about the failure
        assert!(f.sink.count() >= 1);
    }

    #[tokio::test]
    async fn test_oracle_failure_marks_comment_failed() {
        let f = fixture("unused");
        {
            let oracle = ScriptedOracle::new(
                vec![crate::oracle::OracleError::ApiError {
                    status: 500,
                    message: "down".to_string(),
                }],
                "unused",
            );
            let retrier = Arc::new(Retrier::with_sleeper(
                Arc::new(oracle),
                Arc::new(RecordingSleeper::default()),
            ));
            let engine = CommentEngine::new(
                f.store.clone(),
                ActivityLog::new(f.store.clone(), Arc::new(RecordingSink::default())),
                Notifier::new(f.store.clone(), Arc::new(RecordingSink::default())),
                f.platform.clone(),
                retrier,
                Arc::new(RecordingSleeper::default()),
                Duration::from_secs(3),
            );
            add_post(&f.platform, "fb-1", "Plain post");
            add_comment(&f.platform, "fb-1", "c-1", "Ana", "Oi!");

            let summary = engine.run().await.unwrap();
            assert_eq!(summary.failed, 1);
            assert!(f.store.lock().unwrap().has_comment("c-1").unwrap());
        }
    }

    #[test]
    fn test_buy_intent_detection_is_case_insensitive() {
        assert!(has_buy_intent("QUERO comprar agora"));
        assert!(has_buy_intent("Qual o preço?"));
        assert!(has_buy_intent("How much is it?"));
        assert!(!has_buy_intent("Que foto linda!"));
    }

    #[test]
    fn test_campaign_match_by_copy_prefix() {
        let campaign = ProductCampaign::new("post-1", &candidate(), "Unbeatable deal on the Air Fryer 3000", "t");
        let matching = PlatformPost {
            id: "fb-1".to_string(),
            message: "Unbeatable deal on the Air Fryer 3000 — today only #promo".to_string(),
            created_at: 1,
        };
        let other = PlatformPost {
            id: "fb-2".to_string(),
            message: "Totally unrelated post".to_string(),
            created_at: 1,
        };

        let campaigns = vec![campaign];
        assert!(match_campaign(&campaigns, &matching, None).is_some());
        assert!(match_campaign(&campaigns, &other, None).is_none());
        // The internal id wins even when the message does not
        assert!(match_campaign(&campaigns, &other, Some("post-1")).is_some());
    }
}
