//! Assembly of rotations, intake and commands

use crate::commands::{Command, CommandError, USAGE};
use crate::config::Settings;
use crate::AppError;
use hueshift_domain::traits::{
    AssetFetcher, Authorizer, ChannelModerator, OperatorNotifier, ResourceApplier,
};
use hueshift_domain::{
    has_image_extension, hue_ramp, Asset, ChannelId, RateLimitSignal, ResourceKind, Submission,
};
use hueshift_gatekeeper::{IntakeCollaborators, IntakeConfig, IntakeGate, IntakeOutcome, IntakeTarget};
use hueshift_rotator::{
    load_rotation_config, AssetPool, Collaborators, FailureClassifier, RotationHandle,
    RotationMetrics, RotationTask, Rotator, SharedPool,
};
use hueshift_store::{AssetStorage, ConfigStore};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// How long command error notices stay up
const COMMAND_NOTICE_TTL: Duration = Duration::from_secs(10);

/// External collaborators the app is built from
///
/// In production one API client usually fills several slots.
#[derive(Clone)]
pub struct Services {
    /// Applies colors and images
    pub applier: Arc<dyn ResourceApplier>,

    /// Downloads remote assets
    pub fetcher: Arc<dyn AssetFetcher>,

    /// Receives rate-limit escalations
    pub notifier: Arc<dyn OperatorNotifier>,

    /// Checks contributor and command permissions
    pub authorizer: Arc<dyn Authorizer>,

    /// Removes posts and posts notices
    pub moderator: Arc<dyn ChannelModerator>,
}

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Handled by intake
    Intake(IntakeOutcome),

    /// A command was run and answered
    Command(Command),

    /// A prefixed message that did not parse
    Invalid(CommandError),

    /// The author may not run commands
    Unauthorized,
}

/// Every rotation plus intake, built from one config store
///
/// # Examples
///
/// ```no_run
/// use hueshift_bot::{App, Services};
/// use hueshift_bot::config::Settings;
/// use hueshift_store::ConfigStore;
/// use std::sync::Arc;
///
/// # async fn run(services: Services) -> Result<(), Box<dyn std::error::Error>> {
/// let store = Arc::new(ConfigStore::open("config.json")?);
/// let settings = Settings::load(&store)?;
/// let app = App::new(settings, store, services)?;
///
/// app.start_all().await?;
/// tokio::signal::ctrl_c().await?;
/// app.shutdown().await;
/// # Ok(())
/// # }
/// ```
pub struct App {
    settings: Settings,
    tasks: Mutex<Vec<RotationTask>>,
    handles: HashMap<ResourceKind, RotationHandle>,
    gate: IntakeGate,
    classifier: Arc<FailureClassifier>,
    authorizer: Arc<dyn Authorizer>,
    moderator: Arc<dyn ChannelModerator>,
}

impl App {
    /// Build every rotation and the intake gate
    ///
    /// Restores persisted cursors and loads stored banners. Nothing starts
    /// until [`App::start_all`].
    pub fn new(settings: Settings, store: Arc<ConfigStore>, services: Services) -> Result<Self, AppError> {
        let classifier = Arc::new(FailureClassifier::new(services.notifier.clone()));
        let collaborators = Collaborators {
            applier: services.applier.clone(),
            fetcher: services.fetcher.clone(),
            classifier: classifier.clone(),
        };

        let mut gate = IntakeGate::new(
            IntakeConfig::default().with_fetch_timeout(settings.intake_fetch_timeout),
            IntakeCollaborators {
                authorizer: services.authorizer.clone(),
                moderator: services.moderator.clone(),
                fetcher: services.fetcher.clone(),
            },
        );

        let mut tasks = Vec::new();

        let colors = Rotator::new(
            ResourceKind::RoleColor,
            load_rotation_config(&store, ResourceKind::RoleColor)?,
            AssetPool::cursor(hue_ramp()).shared(),
            store.clone(),
            collaborators.clone(),
        );
        tasks.push(RotationTask::new(colors));

        let storage = AssetStorage::open(&settings.banner_storage_path)?;
        let stored = storage.list()?.into_iter().map(Asset::Stored).collect();
        let banner_pool = AssetPool::shuffle_bag(stored).shared();
        let banners = Rotator::new(
            ResourceKind::Banner,
            load_rotation_config(&store, ResourceKind::Banner)?,
            banner_pool.clone(),
            store.clone(),
            collaborators.clone(),
        )
        .with_storage(storage.clone());
        tasks.push(RotationTask::new(banners));
        gate.add_target(IntakeTarget::open(
            ResourceKind::Banner,
            settings.designated_channel,
            settings.booster_role,
            banner_pool,
            storage,
        ))?;

        if let Some(icon_channel) = settings.icon_channel {
            let icon_pool = AssetPool::random_with_eviction(Vec::new()).shared();
            append_urls(&icon_pool, settings.icon_urls.iter().cloned());
            let icons = Rotator::new(
                ResourceKind::Icon,
                load_rotation_config(&store, ResourceKind::Icon)?,
                icon_pool.clone(),
                store.clone(),
                collaborators,
            );
            tasks.push(RotationTask::new(icons));
            gate.add_target(IntakeTarget::restricted(
                ResourceKind::Icon,
                icon_channel,
                settings.booster_role,
                icon_pool,
            ))?;
        } else if !settings.icon_urls.is_empty() {
            tracing::warn!("icon_urls is set but icon_channel_id is not; icon rotation is disabled");
        }

        let handles = tasks.iter().map(|t| (t.resource(), t.handle())).collect();
        for task in &tasks {
            let handle = task.handle();
            tracing::info!(
                "Built {} rotation: {} assets, every {:?}",
                task.resource(),
                handle.assets().len(),
                handle.config().interval
            );
        }

        Ok(Self {
            settings,
            tasks: Mutex::new(tasks),
            handles,
            gate,
            classifier,
            authorizer: services.authorizer,
            moderator: services.moderator,
        })
    }

    /// Loaded settings
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Handle of a built rotation
    pub fn handle(&self, resource: ResourceKind) -> Option<RotationHandle> {
        self.handles.get(&resource).cloned()
    }

    /// Built rotations, in startup order
    pub fn resources(&self) -> Vec<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .filter(|r| self.handles.contains_key(r))
            .collect()
    }

    /// Channels whose messages should be dispatched
    pub fn watched_channels(&self) -> Vec<ChannelId> {
        self.gate.channels()
    }

    /// Add image URLs found in earlier icon channel posts
    ///
    /// Authorship is not re-checked; those posts already passed intake.
    /// Returns how many new icons joined the pool.
    pub fn seed_history(&self, history: &[Submission]) -> usize {
        let (Some(channel), Some(icons)) = (self.settings.icon_channel, self.handle(ResourceKind::Icon)) else {
            return 0;
        };

        let urls = history
            .iter()
            .filter(|s| s.channel == channel)
            .flat_map(|s| s.attachments.iter())
            .filter(|a| has_image_extension(&a.filename))
            .map(|a| a.url.clone());
        let added = append_urls(&icons.pool(), urls);
        tracing::info!("Loaded {} icons from channel history", added);
        added
    }

    /// Start every rotation
    pub async fn start_all(&self) -> Result<(), AppError> {
        let mut tasks = self.tasks.lock().await;
        for task in tasks.iter_mut() {
            task.start()?;
        }
        Ok(())
    }

    /// Stop every rotation and report its metrics
    pub async fn shutdown(&self) -> Vec<(ResourceKind, RotationMetrics)> {
        let mut tasks = self.tasks.lock().await;
        let mut report = Vec::new();
        for task in tasks.iter_mut() {
            task.stop().await;
            let metrics = task.handle().metrics();
            tracing::info!("{} rotation stopped\n{}", task.resource(), metrics.summary());
            report.push((task.resource(), metrics));
        }
        report
    }

    /// Post the startup notice to the designated channel
    pub async fn announce_startup(&self) {
        let rotations: Vec<String> = self
            .resources()
            .into_iter()
            .filter_map(|r| {
                let interval = self.handle(r)?.config().interval;
                Some(format!("{} every {}s", label(r), interval.as_secs_f64()))
            })
            .collect();
        let text = format!("hueshift started! Rotating {}.", rotations.join(", "));
        self.moderator
            .post_notice(self.settings.designated_channel, &text, None)
            .await;
    }

    /// Escalate a throttling signal observed outside any rotation
    pub async fn observe_rate_limit(&self, signal: &RateLimitSignal) {
        self.classifier.escalate(signal).await;
    }

    /// Route one inbound message to commands or intake
    pub async fn handle_message(&self, submission: &Submission) -> Dispatch {
        if submission.channel == self.settings.designated_channel {
            if let Some(parsed) = Command::parse(&submission.content).transpose() {
                return self.handle_command(submission, parsed).await;
            }
        }

        Dispatch::Intake(self.gate.submit(submission).await)
    }

    async fn handle_command(
        &self,
        submission: &Submission,
        parsed: Result<Command, CommandError>,
    ) -> Dispatch {
        let channel = submission.channel;
        let authorized = self
            .authorizer
            .authorize(submission.author, self.settings.booster_role)
            .await;
        if !authorized {
            let text = format!(
                "{} Only server boosters can use bot commands!",
                submission.author_mention()
            );
            self.moderator
                .post_notice(channel, &text, Some(COMMAND_NOTICE_TTL))
                .await;
            return Dispatch::Unauthorized;
        }

        match parsed {
            Ok(command) => {
                tracing::info!("{} ran {:?}", submission.author, command);
                let reply = self.execute(&command);
                self.moderator.post_notice(channel, &reply, None).await;
                Dispatch::Command(command)
            }
            Err(e) => {
                self.moderator
                    .post_notice(channel, &e.to_string(), Some(COMMAND_NOTICE_TTL))
                    .await;
                Dispatch::Invalid(e)
            }
        }
    }

    /// Run a command and return the reply text
    pub fn execute(&self, command: &Command) -> String {
        let Some(resource) = command.resource() else {
            return USAGE.to_string();
        };
        let Some(handle) = self.handle(resource) else {
            return format!("The {} rotation is not enabled.", label(resource));
        };

        match command {
            Command::Help => USAGE.to_string(),
            Command::List(_) => list_reply(resource, &handle.assets()),
            Command::Delete(_, n) => delete_reply(resource, &handle, *n),
            Command::Next(_) => {
                handle.trigger_now();
                format!("Changing the {} now.", label(resource))
            }
            Command::Interval(_, interval) => match handle.set_interval(*interval) {
                Ok(()) => format!(
                    "{} change interval set to {} seconds.",
                    capitalized(label(resource)),
                    interval.as_secs_f64()
                ),
                Err(e) => format!("Could not change the interval: {}", e),
            },
            Command::Refresh(_) => match handle.refresh_from_storage() {
                Ok(count) => format!("Reloaded the {} rotation: {} in the pool.", label(resource), count),
                Err(e) => {
                    tracing::error!("Refresh of {} failed: {}", resource, e);
                    format!("Could not reload the {} rotation: {}", label(resource), e)
                }
            },
        }
    }
}

fn append_urls(pool: &SharedPool, urls: impl IntoIterator<Item = String>) -> usize {
    let mut pool = pool.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    urls.into_iter()
        .filter(|url| pool.append(Asset::Remote(url.clone())))
        .count()
}

fn list_reply(resource: ResourceKind, assets: &[Asset]) -> String {
    if assets.is_empty() {
        return format!("No {} images in rotation.", label(resource));
    }

    let mut lines = vec![format!("{} rotation ({}):", capitalized(label(resource)), assets.len())];
    lines.extend(
        assets
            .iter()
            .enumerate()
            .map(|(i, asset)| format!("{}. {}", i + 1, asset_name(asset))),
    );
    lines.join("\n")
}

fn delete_reply(resource: ResourceKind, handle: &RotationHandle, n: usize) -> String {
    let assets = handle.assets();
    let Some(asset) = assets.get(n - 1) else {
        return format!(
            "There is no {} number {}. Use `rgb! {} list` to see the rotation.",
            label(resource),
            n,
            label(resource)
        );
    };
    if !asset.is_evictable() {
        return "Colors cannot be deleted.".to_string();
    }

    match handle.delete_asset(asset) {
        Ok(_) => format!("Deleted {} {}.", label(resource), asset_name(asset)),
        Err(e) => {
            tracing::error!("Failed to delete {}: {}", asset, e);
            format!("Could not delete {}: {}", asset_name(asset), e)
        }
    }
}

fn asset_name(asset: &Asset) -> String {
    match asset {
        Asset::Stored(path) => path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string()),
        other => other.to_string(),
    }
}

fn label(resource: ResourceKind) -> &'static str {
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
