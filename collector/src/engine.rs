use crate::progress::ProgressTracker;
use crate::records::{CommentRecordBuilder, PostRecordBuilder};
use crate::retry::{Attempted, RateLimitedCaller};
use crate::selector;
use crate::sink::{EventSink, StopSignal};
use harvest_core::{
    CollectionEvent, CommentRecord, CommentSelectionPolicy, Community, CoreError, ErrorExt,
    ListingLimit, ListingProvider, PageRequest, PostHandle, PostRecord, ProgressEvent,
    RankingMethod, MAX_PAGE_SIZE,
};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Listing cap applied when a request carries no limit.
pub const DEFAULT_MAX_UNBOUNDED_POSTS: u32 = 1000;

/// Parameters of one collection run.
#[derive(Debug, Clone)]
pub struct CollectionRequest {
    pub communities: Vec<Community>,
    pub methods: Vec<RankingMethod>,
    pub limit: ListingLimit,
    pub collect_comments: bool,
    pub selection: CommentSelectionPolicy,
    /// Pause after every post.
    pub sleep: Duration,
}

impl CollectionRequest {
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.communities.is_empty() {
            return Err(CoreError::InvalidInput {
                message: "at least one community is required".to_string(),
            });
        }
        if self.methods.is_empty() {
            return Err(CoreError::InvalidInput {
                message: "at least one ranking method is required".to_string(),
            });
        }
        if self.limit == ListingLimit::Bounded(0) {
            return Err(CoreError::InvalidInput {
                message: "post limit must be at least 1".to_string(),
            });
        }
        self.selection.validate()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionSummary {
    pub posts: u64,
    pub comments: u64,
    pub warnings: u64,
    pub skipped_communities: u64,
    pub cancelled: bool,
}

enum ListingOutcome {
    Finished,
    CommunityGone,
    Cancelled,
}

/// Event bookkeeping for one run.
struct Run<'s, S> {
    sink: &'s mut S,
    tracker: ProgressTracker,
    summary: CollectionSummary,
}

impl<S: EventSink> Run<'_, S> {
    fn post(&mut self, record: PostRecord) {
        self.summary.posts += 1;
        self.sink.emit(CollectionEvent::PostCollected(record));
    }

    fn comment(&mut self, record: CommentRecord) {
        self.summary.comments += 1;
        self.sink.emit(CollectionEvent::CommentCollected(record));
    }

    fn progress(&mut self, event: ProgressEvent) {
        self.sink.emit(CollectionEvent::ProgressUpdate(event));
    }

    fn warn(&mut self, message: String) {
        warn!("{}", message);
        self.summary.warnings += 1;
        self.sink.emit(CollectionEvent::Warning(message));
    }
}

/// Drives communities x ranking methods x posts x comments against a
/// [`ListingProvider`].
///
/// The engine keeps nothing between runs. Callers that want to resume keep
/// an [`Accumulator`](crate::Accumulator) and pass it (alone or paired with
/// another sink) to every call.
pub struct CollectionEngine<P> {
    provider: P,
    caller: RateLimitedCaller,
    max_unbounded_posts: u32,
}

impl<P: ListingProvider> CollectionEngine<P> {
    pub fn new(provider: P, caller: RateLimitedCaller) -> Self {
        Self {
            provider,
            caller,
            max_unbounded_posts: DEFAULT_MAX_UNBOUNDED_POSTS,
        }
    }

    pub fn with_max_unbounded_posts(mut self, max_posts: u32) -> Self {
        self.max_unbounded_posts = max_posts.max(1);
        self
    }

    pub fn caller(&self) -> &RateLimitedCaller {
        &self.caller
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Runs one collection, emitting events to `sink` as they happen.
    ///
    /// Only an invalid request is returned as `Err`, before any remote call.
    /// Every failure during the run becomes a `Warning` event and the run
    /// continues with the next post, method or community.
    pub async fn collect<S: EventSink>(
        &self,
        request: &CollectionRequest,
        sink: &mut S,
        stop: &StopSignal,
    ) -> Result<CollectionSummary, CoreError> {
        request.validate()?;

        info!(
            "Collecting {:?} posts from {} communities x {} ranking methods (comments: {})",
            request.limit,
            request.communities.len(),
            request.methods.len(),
            request.collect_comments
        );

        let mut run = Run {
            sink,
            tracker: ProgressTracker::new(
                request.communities.len(),
                request.methods.len(),
                request.limit,
            ),
            summary: CollectionSummary::default(),
        };

        'communities: for community in &request.communities {
            if stop.is_stop_requested() {
                run.summary.cancelled = true;
                break;
            }

            if let Err(message) = self.lookup_community(community).await {
                run.warn(message);
                run.summary.skipped_communities += 1;
                run.tracker.finish_slots(request.methods.len());
                continue;
            }

            for (index, &method) in request.methods.iter().enumerate() {
                let outcome = self
                    .collect_listing(community, method, request, &mut run, stop)
                    .await;
                run.tracker.finish_slot();

                match outcome {
                    ListingOutcome::Finished => {}
                    ListingOutcome::CommunityGone => {
                        run.summary.skipped_communities += 1;
                        run.tracker
                            .finish_slots(request.methods.len() - index - 1);
                        continue 'communities;
                    }
                    ListingOutcome::Cancelled => {
                        run.summary.cancelled = true;
                        break 'communities;
                    }
                }
            }
        }

        if run.summary.cancelled {
            info!("Collection stopped on request");
        } else {
            let event = run.tracker.complete();
            run.progress(event);
        }

        let metrics = self.caller.metrics();
        info!(
            "Collection finished: {} posts, {} comments, {} warnings ({} remote calls, {} retries)",
            run.summary.posts,
            run.summary.comments,
            run.summary.warnings,
            metrics.total_calls,
            metrics.total_retries
        );

        Ok(run.summary)
    }

    /// Resolves to the warning text when the community has to be skipped.
    async fn lookup_community(&self, community: &Community) -> Result<(), String> {
        let name = format!("about r/{}", community);
        match self
            .caller
            .call(&name, || self.provider.lookup_community(community))
            .await
        {
            Ok(Attempted::Completed(info)) => {
                debug!(
                    "Found r/{} ({} subscribers)",
                    info.name,
                    info.subscribers
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "unknown".to_string())
                );
                Ok(())
            }
            Ok(Attempted::Skipped { attempts }) => Err(format!(
                "Skipping r/{}: still rate limited after {} attempts",
                community, attempts
            )),
            Err(e) if e.is_not_found() => {
                Err(format!("Community r/{} not found, skipping it", community))
            }
            Err(e) => Err(format!(
                "Could not look up r/{}, skipping it: {}",
                community, e
            )),
        }
    }

    async fn collect_listing<S: EventSink>(
        &self,
        community: &Community,
        method: RankingMethod,
        request: &CollectionRequest,
        run: &mut Run<'_, S>,
        stop: &StopSignal,
    ) -> ListingOutcome {
        let cap = match request.limit {
            ListingLimit::Bounded(n) => n,
            ListingLimit::Unbounded => self.max_unbounded_posts,
        };
        info!("Collecting up to {} {} posts from r/{}", cap, method, community);

        let mut fetched: u32 = 0;
        let mut after: Option<String> = None;

        while fetched < cap {
            if stop.is_stop_requested() {
                return ListingOutcome::Cancelled;
            }

            let page_request = PageRequest {
                limit: (cap - fetched).min(MAX_PAGE_SIZE),
                after: after.clone(),
            };
            let name = format!("{} listing of r/{}", method, community);
            let page = match self
                .caller
                .call(&name, || {
                    self.provider
                        .listing_page(community, method, page_request.clone())
                })
                .await
            {
                Ok(Attempted::Completed(page)) => page,
                Ok(Attempted::Skipped { attempts }) => {
                    run.warn(format!(
                        "Skipping {} posts of r/{}: still rate limited after {} attempts",
                        method, community, attempts
                    ));
                    return ListingOutcome::Finished;
                }
                Err(e) if e.is_not_found() => {
                    run.warn(format!("Community r/{} not found, skipping it", community));
                    return ListingOutcome::CommunityGone;
                }
                Err(e) => {
                    run.warn(format!(
                        "Failed to fetch {} posts from r/{}, skipping: {}",
                        method, community, e
                    ));
                    return ListingOutcome::Finished;
                }
            };

            debug!(
                "Received {} {} posts from r/{}",
                page.posts.len(),
                method,
                community
            );
            if page.posts.is_empty() {
                break;
            }

            let remaining = (cap - fetched) as usize;
            for post in page.posts.iter().take(remaining) {
                if stop.is_stop_requested() {
                    return ListingOutcome::Cancelled;
                }

                fetched += 1;
                match PostRecordBuilder::build(post, community, method) {
                    Ok(record) => {
                        run.post(record);
                        if request.collect_comments {
                            if let Err(e) = self.collect_comments(post, request, run).await {
                                run.warn(format!(
                                    "Skipping comments of post {}: {}",
                                    post.id, e
                                ));
                            }
                        }
                    }
                    Err(e) => run.warn(format!("Skipping post {}: {}", post.id, e)),
                }

                if !request.sleep.is_zero() {
                    sleep(request.sleep).await;
                }
                let event = run.tracker.record_post();
                run.progress(event);
            }

            match page.after {
                Some(next) if after.as_deref() != Some(next.as_str()) => after = Some(next),
                _ => break,
            }
        }

        ListingOutcome::Finished
    }

    /// Fetches, selects and emits the comments of a post already emitted.
    async fn collect_comments<S: EventSink>(
        &self,
        post: &PostHandle,
        request: &CollectionRequest,
        run: &mut Run<'_, S>,
    ) -> Result<(), CoreError> {
        let name = format!("comments of post {}", post.id);
        let comments = match self
            .caller
            .call(&name, || self.provider.comments(post))
            .await?
        {
            Attempted::Completed(comments) => comments,
            Attempted::Skipped { attempts } => {
                run.warn(format!(
                    "Skipping comments of post {}: still rate limited after {} attempts",
                    post.id, attempts
                ));
                return Ok(());
            }
        };

        let total = comments.len();
        let records = selector::select(comments, &request.selection)
            .iter()
            .map(|comment| CommentRecordBuilder::build(comment, &post.id))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(
            "Kept {} of {} comments for post {}",
            records.len(),
            total,
            post.id
        );

        for record in records {
            run.comment(record);
        }
        Ok(())
    }
}
