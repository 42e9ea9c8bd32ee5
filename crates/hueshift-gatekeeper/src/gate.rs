//! Submission screening and ingestion

use crate::{IntakeConfig, IntakeError, IntakeTarget};
use hueshift_domain::traits::{AssetFetcher, Authorizer, ChannelModerator};
use hueshift_domain::{has_image_extension, Asset, Attachment, ChannelId, ResourceKind, Submission};
use std::collections::HashMap;
use std::sync::Arc;

/// Why a submission was not considered at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The channel has no intake target
    NotIntakeChannel,

    /// The target requires a mention and the post had none
    NotAddressed,

    /// An open channel post without attachments
    NoAttachments,
}

/// Why a submission was turned down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectionReason {
    /// The author lacks the target's capability
    Unauthorized,

    /// No attachment (or, in a restricted channel, not every attachment)
    /// has an allowed image extension, or no download was an image
    NotAnImage,

    /// Every image failed to download or store
    DownloadFailed,
}

impl RejectionReason {
    /// Notice shown to the author
    pub fn notice(&self, mention: &str, target: &IntakeTarget) -> String {
        match (self, target.restricted) {
            (RejectionReason::Unauthorized, true) => {
                format!("{} Only server boosters can post in this channel!", mention)
            }
            (RejectionReason::Unauthorized, false) => format!(
                "{} Only server boosters can add {} images!",
                mention,
                noun(target.resource)
            ),
            (RejectionReason::NotAnImage, true) => {
                format!("{} Only image posts are allowed in this channel!", mention)
            }
            (RejectionReason::NotAnImage, false) => format!(
                "{} Only .png, .jpg, .jpeg and .gif images can be added.",
                mention
            ),
            (RejectionReason::DownloadFailed, _) => format!(
                "{} Could not download the attached images. Please try again.",
                mention
            ),
        }
    }
}

/// Result of screening one submission
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntakeOutcome {
    /// Not an intake submission; nothing was done
    Ignored(IgnoreReason),

    /// At least one asset joined the pool
    Accepted {
        /// Assets appended to the pool
        assets: Vec<Asset>,
        /// Filenames of images that could not be ingested
        failed: Vec<String>,
    },

    /// Turned down with a notice; the pool is unchanged
    Rejected(RejectionReason),
}

/// External collaborators used by intake
#[derive(Clone)]
pub struct IntakeCollaborators {
    /// Capability checks
    pub authorizer: Arc<dyn Authorizer>,

    /// Post removal and notices
    pub moderator: Arc<dyn ChannelModerator>,

    /// Attachment downloads
    pub fetcher: Arc<dyn AssetFetcher>,
}

/// Screens submissions and appends accepted images to rotation pools
///
/// Steps for a submission in a target channel:
/// 1. the author must hold the target's capability, otherwise the post is
///    removed and a transient notice explains why
/// 2. attachments are filtered by image extension; a restricted channel
///    rejects the post the same way if anything else was attached
/// 3. each image is downloaded (bounded by the fetch timeout), checked to
///    really be an image, stored, and appended to the pool
///
/// Intake only ever appends, so it never disturbs a task's cursor or
/// pending shuffle draws.
///
/// # Examples
///
/// ```no_run
/// use hueshift_gatekeeper::{IntakeCollaborators, IntakeConfig, IntakeGate, IntakeTarget};
///
/// # async fn run(
/// #     collaborators: IntakeCollaborators,
/// #     target: IntakeTarget,
/// #     submission: hueshift_domain::Submission,
/// # ) -> Result<(), Box<dyn std::error::Error>> {
/// let mut gate = IntakeGate::new(IntakeConfig::default(), collaborators);
/// gate.add_target(target)?;
///
/// let outcome = gate.submit(&submission).await;
/// println!("{:?}", outcome);
/// # Ok(())
/// # }
/// ```
pub struct IntakeGate {
    config: IntakeConfig,
    targets: HashMap<ChannelId, IntakeTarget>,
    collaborators: IntakeCollaborators,
}

impl IntakeGate {
    /// Create a gate with no targets
    pub fn new(config: IntakeConfig, collaborators: IntakeCollaborators) -> Self {
        Self {
            config,
            targets: HashMap::new(),
            collaborators,
        }
    }

    /// Register a target channel
    pub fn add_target(&mut self, target: IntakeTarget) -> Result<(), IntakeError> {
        if self.targets.contains_key(&target.channel) {
            return Err(IntakeError::DuplicateChannel(target.channel));
        }
        tracing::debug!(
            "Intake for {} on channel {} (restricted: {})",
            target.resource,
            target.channel,
            target.restricted
        );
        self.targets.insert(target.channel, target);
        Ok(())
    }

    /// Target registered for `channel`
    pub fn target(&self, channel: ChannelId) -> Option<&IntakeTarget> {
        self.targets.get(&channel)
    }

    /// Channels with a target
    pub fn channels(&self) -> Vec<ChannelId> {
        let mut channels: Vec<ChannelId> = self.targets.keys().copied().collect();
        channels.sort();
        channels
    }

    /// Screen one submission
    ///
    /// Never fails: every problem becomes a rejection with a notice, or a
    /// logged per-attachment failure.
    pub async fn submit(&self, submission: &Submission) -> IntakeOutcome {
        let Some(target) = self.targets.get(&submission.channel) else {
            return IntakeOutcome::Ignored(IgnoreReason::NotIntakeChannel);
        };
        if target.require_mention && !submission.mentions_bot {
            return IntakeOutcome::Ignored(IgnoreReason::NotAddressed);
        }
        if !target.restricted && submission.attachments.is_empty() {
            return IntakeOutcome::Ignored(IgnoreReason::NoAttachments);
        }

        let authorized = self
            .collaborators
            .authorizer
            .authorize(submission.author, target.capability)
            .await;
        if !authorized {
            return self.reject(target, submission, RejectionReason::Unauthorized).await;
        }

        let images: Vec<&Attachment> = submission
            .attachments
            .iter()
            .filter(|a| has_image_extension(&a.filename))
            .collect();
        let has_other = images.len() < submission.attachments.len();
        if images.is_empty() || (target.restricted && has_other) {
            return self.reject(target, submission, RejectionReason::NotAnImage).await;
        }

        let mut assets = Vec::new();
        let mut failed = Vec::new();
        let mut undecodable = 0;
        for attachment in images {
            match self.ingest(target, attachment).await {
                Ok(asset) => {
                    let added = target
                        .pool
                        .lock()
                        .unwrap_or_else(|poisoned| poisoned.into_inner())
                        .append(asset.clone());
                    if added {
                        tracing::info!("Added {} to the {} pool", asset, target.resource);
                    }
                    assets.push(asset);
                }
                Err(e) => {
                    tracing::warn!("Could not ingest {}: {}", attachment.filename, e);
                    if matches!(e, IntakeError::NotAnImage(_)) {
                        undecodable += 1;
                    }
                    failed.push(attachment.filename.clone());
                }
            }
        }

        if assets.is_empty() {
            let reason = if undecodable == failed.len() {
                RejectionReason::NotAnImage
            } else {
                RejectionReason::DownloadFailed
            };
            return self.reject(target, submission, reason).await;
        }

        let mention = submission.author_mention();
        let ttl = Some(self.config.notice_ttl(target.restricted));
        for asset in assets.iter().filter(|a| matches!(a, Asset::Stored(_))) {
            tracing::debug!("Acknowledging {}", asset);
            let text = format!(
                "{} image from {} has been added to the rotation!",
                capitalized(noun(target.resource)),
                mention
            );
            self.collaborators
                .moderator
                .post_notice(submission.channel, &text, ttl)
                .await;
        }

        IntakeOutcome::Accepted { assets, failed }
    }

    async fn ingest(&self, target: &IntakeTarget, attachment: &Attachment) -> Result<Asset, IntakeError> {
        let Some(storage) = &target.storage else {
            return Ok(Asset::Remote(attachment.url.clone()));
        };

        let timeout = self.config.fetch_timeout;
        let bytes = tokio::time::timeout(timeout, self.collaborators.fetcher.fetch(&attachment.url))
            .await
            .map_err(|_| IntakeError::Timeout(timeout))??;
        if !infer::is_image(&bytes) {
            return Err(IntakeError::NotAnImage(attachment.filename.clone()));
        }

        let storage = storage.clone();
        let filename = attachment.filename.clone();
        let path = tokio::task::spawn_blocking(move || storage.save(&filename, &bytes)).await??;
        Ok(Asset::Stored(path))
    }

    async fn reject(
        &self,
        target: &IntakeTarget,
        submission: &Submission,
        reason: RejectionReason,
    ) -> IntakeOutcome {
        tracing::info!(
            "Rejected submission {} from {} in {}: {:?}",
            submission.message_id,
            submission.author,
            submission.channel,
            reason
        );

        let moderator = &self.collaborators.moderator;
        if target.restricted || reason == RejectionReason::Unauthorized {
            moderator
                .remove_submission(submission.channel, submission.message_id)
                .await;
        }

        let notice = reason.notice(&submission.author_mention(), target);
        let ttl = Some(self.config.notice_ttl(target.restricted));
        moderator.post_notice(submission.channel, &notice, ttl).await;

        IntakeOutcome::Rejected(reason)
    }
}

fn noun(resource: ResourceKind) -> &'static str {
    match resource {
        ResourceKind::RoleColor => "color",
        ResourceKind::Banner => "banner",
        ResourceKind::Icon => "icon",
    }
}

fn capitalized(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hueshift_domain::{ActorId, CapabilityId};
    use hueshift_remote::mock::{MockFetcher, RecordingModerator, StaticAuthorizer, SAMPLE_PNG};
    use hueshift_rotator::AssetPool;
    use hueshift_store::AssetStorage;
    use std::time::Duration;
    use tempfile::TempDir;

    const BOOSTER: CapabilityId = CapabilityId(500);
    const MEMBER: ActorId = ActorId(1);
    const BANNERS: ChannelId = ChannelId(10);
    const ICONS: ChannelId = ChannelId(20);

    struct Fixture {
        _dir: TempDir,
        gate: IntakeGate,
        moderator: Arc<RecordingModerator>,
        fetcher: Arc<MockFetcher>,
        banner_pool: hueshift_rotator::SharedPool,
        banner_storage: AssetStorage,
        icon_pool: hueshift_rotator::SharedPool,
    }

    fn fixture(authorizer: StaticAuthorizer, fetcher: MockFetcher) -> Fixture {
        let dir = TempDir::new().unwrap();
        let storage = AssetStorage::open(dir.path().join("banners")).unwrap();
        let moderator = Arc::new(RecordingModerator::new());
        let fetcher = Arc::new(fetcher);
        let banner_pool = AssetPool::shuffle_bag(Vec::new()).shared();
        let icon_pool = AssetPool::random_with_eviction(Vec::new()).shared();

        let mut gate = IntakeGate::new(
            IntakeConfig::default(),
            IntakeCollaborators {
                authorizer: Arc::new(authorizer),
                moderator: moderator.clone(),
                fetcher: fetcher.clone(),
            },
        );
        gate.add_target(IntakeTarget::open(
            ResourceKind::Banner,
            BANNERS,
            BOOSTER,
            banner_pool.clone(),
            storage.clone(),
        ))
        .unwrap();
        gate.add_target(IntakeTarget::restricted(
            ResourceKind::Icon,
            ICONS,
            BOOSTER,
            icon_pool.clone(),
        ))
        .unwrap();

        Fixture {
            _dir: dir,
            gate,
            moderator,
            fetcher,
            banner_pool,
            banner_storage: storage,
            icon_pool,
        }
    }

    fn submission(channel: ChannelId, mentions_bot: bool, files: &[&str]) -> Submission {
        Submission {
            message_id: 77,
            author: MEMBER,
            channel,
            mentions_bot,
            content: String::new(),
            attachments: files
                .iter()
                .map(|f| Attachment::new(*f, format!("https://cdn.example/{}", f)))
                .collect(),
        }
    }

    fn booster() -> StaticAuthorizer {
        StaticAuthorizer::new().grant(MEMBER, BOOSTER)
    }

    #[tokio::test]
    async fn test_unknown_channel_is_ignored() {
        let f = fixture(booster(), MockFetcher::new());
        let outcome = f.gate.submit(&submission(ChannelId(99), true, &["a.png"])).await;
        assert_eq!(outcome, IntakeOutcome::Ignored(IgnoreReason::NotIntakeChannel));
        assert!(f.moderator.notices().is_empty());
    }

    #[tokio::test]
    async fn test_open_channel_requires_mention() {
        let f = fixture(booster(), MockFetcher::new());
        let outcome = f.gate.submit(&submission(BANNERS, false, &["a.png"])).await;
        assert_eq!(outcome, IntakeOutcome::Ignored(IgnoreReason::NotAddressed));

        let outcome = f.gate.submit(&submission(BANNERS, true, &[])).await;
        assert_eq!(outcome, IntakeOutcome::Ignored(IgnoreReason::NoAttachments));
    }

    #[tokio::test]
    async fn test_unauthorized_banner_is_removed() {
        let f = fixture(StaticAuthorizer::new(), MockFetcher::new());
        let outcome = f.gate.submit(&submission(BANNERS, true, &["a.png"])).await;

        assert_eq!(outcome, IntakeOutcome::Rejected(RejectionReason::Unauthorized));
        assert_eq!(f.moderator.removed(), vec![(BANNERS, 77)]);
        let notices = f.moderator.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].text, "<@1> Only server boosters can add banner images!");
        assert_eq!(notices[0].ttl, Some(Duration::from_secs(10)));
        assert!(f.fetcher.requested().is_empty());
        assert!(f.banner_pool.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_banner_is_stored_and_appended() {
        let fetcher = MockFetcher::new();
        fetcher.insert("https://cdn.example/sunset.png", SAMPLE_PNG.to_vec());
        let f = fixture(booster(), fetcher);

        let outcome = f.gate.submit(&submission(BANNERS, true, &["sunset.png", "notes.txt"])).await;
        let IntakeOutcome::Accepted { assets, failed } = outcome else {
            panic!("Expected acceptance, got {:?}", outcome);
        };
        assert!(failed.is_empty());
        assert_eq!(assets.len(), 1);

        let Asset::Stored(path) = &assets[0] else {
            panic!("Expected a stored asset");
        };
        assert_eq!(std::fs::read(path).unwrap(), SAMPLE_PNG);
        assert_eq!(f.banner_pool.lock().unwrap().items(), &assets[..]);

        let notices = f.moderator.notices();
        assert_eq!(notices[0].text, "Banner image from <@1> has been added to the rotation!");
        assert!(f.moderator.removed().is_empty());
    }

    #[tokio::test]
    async fn test_partial_download_failure() {
        let fetcher = MockFetcher::new();
        fetcher.insert("https://cdn.example/ok.png", SAMPLE_PNG.to_vec());
        let f = fixture(booster(), fetcher);

        let outcome = f.gate.submit(&submission(BANNERS, true, &["ok.png", "gone.png"])).await;
        let IntakeOutcome::Accepted { assets, failed } = outcome else {
            panic!("Expected acceptance, got {:?}", outcome);
        };
        assert_eq!(assets.len(), 1);
        assert_eq!(failed, vec!["gone.png".to_string()]);
    }

    #[tokio::test]
    async fn test_downloaded_non_image_is_not_stored() {
        let fetcher = MockFetcher::new();
        fetcher.insert("https://cdn.example/error.png", b"<html>Not Found</html>".to_vec());
        let f = fixture(booster(), fetcher);

        let outcome = f.gate.submit(&submission(BANNERS, true, &["error.png"])).await;
        assert_eq!(outcome, IntakeOutcome::Rejected(RejectionReason::NotAnImage));
        assert!(f.banner_pool.lock().unwrap().is_empty());
        assert!(f.banner_storage.list().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mixed_failures_report_download_failure() {
        let fetcher = MockFetcher::new();
        fetcher.insert("https://cdn.example/error.png", b"<html>Not Found</html>".to_vec());
        let f = fixture(booster(), fetcher);

        let outcome = f.gate.submit(&submission(BANNERS, true, &["error.png", "gone.png"])).await;
        assert_eq!(outcome, IntakeOutcome::Rejected(RejectionReason::DownloadFailed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_download_times_out() {
        let fetcher = MockFetcher::new().with_delay(Duration::from_secs(60));
        fetcher.insert("https://cdn.example/slow.png", SAMPLE_PNG.to_vec());
        let f = fixture(booster(), fetcher);

        let outcome = f.gate.submit(&submission(BANNERS, true, &["slow.png"])).await;
        assert_eq!(outcome, IntakeOutcome::Rejected(RejectionReason::DownloadFailed));
        assert!(f.banner_pool.lock().unwrap().is_empty());
        assert!(f.moderator.removed().is_empty());
    }

    #[tokio::test]
    async fn test_restricted_channel_accepts_urls() {
        let f = fixture(booster(), MockFetcher::new());
        let outcome = f.gate.submit(&submission(ICONS, false, &["face.GIF"])).await;

        let expected = Asset::Remote("https://cdn.example/face.GIF".to_string());
        assert_eq!(
            outcome,
            IntakeOutcome::Accepted {
                assets: vec![expected.clone()],
                failed: Vec::new()
            }
        );
        assert!(f.icon_pool.lock().unwrap().contains(&expected));
        assert!(f.fetcher.requested().is_empty());
        assert!(f.moderator.notices().is_empty());
    }

    #[tokio::test]
    async fn test_restricted_channel_removes_non_images() {
        let f = fixture(booster(), MockFetcher::new());

        let cases: [&[&str]; 3] = [&[], &["doc.pdf"], &["a.png", "b.webp"]];
        for files in cases {
            let outcome = f.gate.submit(&submission(ICONS, false, files)).await;
            assert_eq!(outcome, IntakeOutcome::Rejected(RejectionReason::NotAnImage));
        }

        assert_eq!(f.moderator.removed().len(), 3);
        let notices = f.moderator.notices();
        assert_eq!(notices[0].text, "<@1> Only image posts are allowed in this channel!");
        assert_eq!(notices[0].ttl, Some(Duration::from_secs(5)));
        assert!(f.icon_pool.lock().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_channel() {
        let f = fixture(booster(), MockFetcher::new());
        let mut gate = f.gate;
        let result = gate.add_target(IntakeTarget::restricted(
            ResourceKind::Icon,
            ICONS,
            BOOSTER,
            f.icon_pool.clone(),
        ));
        assert!(matches!(result, Err(IntakeError::DuplicateChannel(ICONS))));
        assert_eq!(gate.channels(), vec![BANNERS, ICONS]);
    }
}
