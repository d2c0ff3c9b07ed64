#![allow(dead_code)]

use collector::{CollectionRequest, EventSink, StopSignal};
use harvest_core::{
    CollectionEvent, CommentHandle, CommentSelectionPolicy, Community, CommunityInfo, CoreError,
    ListingLimit, ListingPage, ListingProvider, PageRequest, PostHandle, ProgressEvent,
    RankingMethod, RedditApiError,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

/// In-memory provider serving the same posts for every ranking method.
#[derive(Default)]
pub struct StubProvider {
    posts: HashMap<String, Vec<PostHandle>>,
    comments: HashMap<String, Vec<CommentHandle>>,
    failing_methods: HashSet<RankingMethod>,
    throttled_methods: HashSet<RankingMethod>,
    vanished_communities: HashSet<String>,
    failing_comments: HashSet<String>,
    throttled_comments: bool,
    calls: Mutex<Vec<String>>,
}

impl StubProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_community(
        mut self,
        name: &str,
        post_count: usize,
        comments_per_post: usize,
    ) -> Self {
        let posts: Vec<PostHandle> = (1..=post_count)
            .map(|i| post_handle(&format!("{}_p{}", name, i)))
            .collect();
        for post in &posts {
            let comments = (1..=comments_per_post)
                .map(|j| comment_handle(&format!("{}_c{}", post.id, j), &format!("reply {}", j)))
                .collect();
            self.comments.insert(post.id.clone(), comments);
        }
        self.posts.insert(name.to_string(), posts);
        self
    }

    pub fn with_posts(mut self, name: &str, posts: Vec<PostHandle>) -> Self {
        self.posts.insert(name.to_string(), posts);
        self
    }

    pub fn with_comments(mut self, post_id: &str, comments: Vec<CommentHandle>) -> Self {
        self.comments.insert(post_id.to_string(), comments);
        self
    }

    pub fn failing_listing(mut self, method: RankingMethod) -> Self {
        self.failing_methods.insert(method);
        self
    }

    pub fn throttled_listing(mut self, method: RankingMethod) -> Self {
        self.throttled_methods.insert(method);
        self
    }

    /// The community resolves on lookup but its listings answer not found.
    pub fn vanishing_listing(mut self, name: &str) -> Self {
        self.vanished_communities.insert(name.to_string());
        self
    }

    pub fn failing_comments(mut self, post_id: &str) -> Self {
        self.failing_comments.insert(post_id.to_string());
        self
    }

    pub fn throttled_comments(mut self) -> Self {
        self.throttled_comments = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

impl ListingProvider for StubProvider {
    async fn lookup_community(&self, community: &Community) -> Result<CommunityInfo, CoreError> {
        self.record(format!("about {}", community));
        match self.posts.get(community.as_str()) {
            Some(_) => Ok(CommunityInfo {
                name: community.to_string(),
                subscribers: Some(1234),
            }),
            None => Err(RedditApiError::SubredditNotFound {
                subreddit: community.to_string(),
            }
            .into()),
        }
    }

    async fn listing_page(
        &self,
        community: &Community,
        method: RankingMethod,
        request: PageRequest,
    ) -> Result<ListingPage, CoreError> {
        self.record(format!("{} {}", method, community));
        if self.failing_methods.contains(&method) {
            return Err(RedditApiError::ServerError { status_code: 503 }.into());
        }
        if self.throttled_methods.contains(&method) {
            return Err(RedditApiError::RateLimitExceeded { retry_after: 10 }.into());
        }
        if self.vanished_communities.contains(community.as_str()) {
            return Err(RedditApiError::SubredditNotFound {
                subreddit: community.to_string(),
            }
            .into());
        }

        let posts = self.posts.get(community.as_str()).cloned().unwrap_or_default();
        let start: usize = request
            .after
            .as_deref()
            .and_then(|cursor| cursor.parse().ok())
            .unwrap_or(0);
        let end = (start + request.limit as usize).min(posts.len());

        Ok(ListingPage {
            posts: posts[start.min(end)..end].to_vec(),
            after: (end < posts.len()).then(|| end.to_string()),
        })
    }

    async fn comments(&self, post: &PostHandle) -> Result<Vec<CommentHandle>, CoreError> {
        self.record(format!("comments {}", post.id));
        if self.throttled_comments {
            return Err(RedditApiError::RateLimitExceeded { retry_after: 10 }.into());
        }
        if self.failing_comments.contains(&post.id) {
            return Err(RedditApiError::ServerError { status_code: 500 }.into());
        }
        Ok(self.comments.get(&post.id).cloned().unwrap_or_default())
    }
}

pub fn post_handle(id: &str) -> PostHandle {
    PostHandle {
        id: id.to_string(),
        title: format!("Title of {}", id),
        author: Some("poster".to_string()),
        score: 42,
        num_comments: 3,
        upvote_ratio: 0.87,
        url: format!("https://www.reddit.com/r/testsub/comments/{}/", id),
        permalink: format!("/r/testsub/comments/{}/", id),
        created_utc: 1_700_000_000.0,
    }
}

pub fn comment_handle(id: &str, body: &str) -> CommentHandle {
    CommentHandle {
        id: id.to_string(),
        author: Some("commenter".to_string()),
        score: 3,
        body: body.to_string(),
        created_utc: 1_700_000_100.0,
    }
}

pub fn request(communities: &[&str], methods: &[RankingMethod], limit: u32) -> CollectionRequest {
    CollectionRequest {
        communities: communities
            .iter()
            .map(|name| Community::new(name).unwrap())
            .collect(),
        methods: methods.to_vec(),
        limit: ListingLimit::Bounded(limit),
        collect_comments: false,
        selection: CommentSelectionPolicy::All,
        sleep: Duration::ZERO,
    }
}

pub fn progress_events(events: &[CollectionEvent]) -> Vec<ProgressEvent> {
    events
        .iter()
        .filter_map(|event| match event {
            CollectionEvent::ProgressUpdate(progress) => Some(*progress),
            _ => None,
        })
        .collect()
}

pub fn warnings(events: &[CollectionEvent]) -> Vec<&str> {
    events
        .iter()
        .filter_map(|event| match event {
            CollectionEvent::Warning(message) => Some(message.as_str()),
            _ => None,
        })
        .collect()
}

/// Sink that raises the stop flag once it has seen `after` posts.
pub struct StopAfterPosts<S> {
    pub inner: S,
    pub stop: StopSignal,
    pub after: usize,
    seen: usize,
}

impl<S> StopAfterPosts<S> {
    pub fn new(inner: S, stop: StopSignal, after: usize) -> Self {
        Self {
            inner,
            stop,
            after,
            seen: 0,
        }
    }
}

impl<S: EventSink> EventSink for StopAfterPosts<S> {
    fn emit(&mut self, event: CollectionEvent) {
        if matches!(event, CollectionEvent::PostCollected(_)) {
            self.seen += 1;
            if self.seen >= self.after {
                self.stop.request_stop();
            }
        }
        self.inner.emit(event);
    }
}
