// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Post and comment aggregation.
//!
//! Read paths join posts with their comment counts and category names at
//! request time; nothing is denormalized onto the post document. Listing is
//! filtered, sorted newest first and paginated in memory after the store
//! returns the candidate set.

use crate::db::Store;
use crate::error::{AppError, Result};
use crate::models::{
    new_id, parse_id, Category, CategorySummary, Comment, CommentView, Post, PostPage, PostView,
    VoteCounts, VoteDirection,
};
use chrono::Utc;
use futures_util::{stream, StreamExt};
use std::collections::{HashMap, HashSet};

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Concurrent comment-count lookups while building a page.
const MAX_CONCURRENT_COUNTS: usize = 16;

/// Which posts to list.
#[derive(Debug, Clone, Default)]
pub struct PostFilter {
    /// Case-insensitive substring of the title
    pub title_query: Option<String>,
    /// Category name, matched ignoring case
    pub category_name: Option<String>,
}

/// Where pagination links point.
#[derive(Debug, Clone)]
pub struct PageLinks {
    /// Absolute URL of the listing, without query string
    pub base_url: String,
    /// Query parameters repeated on every link, ahead of `page` and `limit`
    pub params: Vec<(&'static str, String)>,
}

impl PageLinks {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            params: Vec::new(),
        }
    }

    pub fn with_param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    fn url(&self, page: u32, page_size: u32) -> String {
        let mut query: Vec<String> = self
            .params
            .iter()
            .map(|(name, value)| format!("{}={}", name, urlencoding::encode(value)))
            .collect();
        query.push(format!("page={}", page));
        query.push(format!("limit={}", page_size));
        format!("{}?{}", self.base_url, query.join("&"))
    }
}

/// Position of one page within a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: u32,
    pub page_size: u32,
    pub total_items: u32,
    pub total_pages: u32,
}

impl PageWindow {
    /// Validate a 1-indexed page request against `total_items`.
    pub fn new(page: u32, page_size: u32, total_items: usize) -> Result<Self> {
        check_page_request(page, page_size)?;
        let total_items = u32::try_from(total_items)
            .map_err(|_| AppError::Internal(anyhow::anyhow!("Result set too large")))?;
        if total_items == 0 {
            return Err(AppError::NotFound("No posts found".to_string()));
        }
        let total_pages = total_items.div_ceil(page_size);
        if page > total_pages {
            return Err(AppError::NotFound(format!(
                "Page {} is past the last page ({})",
                page, total_pages
            )));
        }
        Ok(Self {
            page,
            page_size,
            total_items,
            total_pages,
        })
    }

    /// Index range of this page's items.
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = ((self.page - 1) * self.page_size) as usize;
        let end = (start + self.page_size as usize).min(self.total_items as usize);
        start..end
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

pub fn check_page_request(page: u32, page_size: u32) -> Result<()> {
    if page < 1 {
        return Err(AppError::InvalidArgument("page must be at least 1".to_string()));
    }
    if !(1..=MAX_PAGE_SIZE).contains(&page_size) {
        return Err(AppError::InvalidArgument(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok(())
}

/// Newest first, ties broken by ID descending.
pub fn sort_newest_first(posts: &mut [Post]) {
    posts.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| b.id.cmp(&a.id))
    });
}

fn required_text(value: &str, what: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::InvalidArgument(format!("{} is required", what)));
    }
    Ok(value.to_string())
}

/// Turn a post's comments into views for the comments directly under the post.
///
/// Each view carries its direct reply count. With `nested`, each view also
/// carries its reply subtree. Siblings are ordered oldest first.
pub fn aggregate_thread(comments: &[Comment], nested: bool) -> Vec<CommentView> {
    let mut children: HashMap<Option<&str>, Vec<&Comment>> = HashMap::new();
    for comment in comments {
        children
            .entry(comment.parent_comment_id.as_deref())
            .or_default()
            .push(comment);
    }
    for siblings in children.values_mut() {
        siblings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
    }

    fn build<'a>(
        parent: Option<&'a str>,
        children: &HashMap<Option<&'a str>, Vec<&'a Comment>>,
        nested: bool,
    ) -> Vec<CommentView> {
        children
            .get(&parent)
            .map(|siblings| {
                siblings
                    .iter()
                    .map(|&comment| {
                        let key = Some(comment.id.as_str());
                        let reply_count = children.get(&key).map_or(0, |r| r.len()) as u64;
                        let mut view = CommentView::new(comment, reply_count);
                        if nested {
                            view.replies = Some(build(key, children, nested));
                        }
                        view
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    build(None, &children, nested)
}

/// IDs of `root` and every comment below it.
fn subtree_ids(comments: &[Comment], root: &str) -> Vec<String> {
    let mut by_parent: HashMap<&str, Vec<&str>> = HashMap::new();
    for comment in comments {
        if let Some(parent) = comment.parent_comment_id.as_deref() {
            by_parent.entry(parent).or_default().push(&comment.id);
        }
    }

    let mut ids = vec![root.to_string()];
    let mut next = 0;
    while next < ids.len() {
        if let Some(replies) = by_parent.get(ids[next].as_str()) {
            ids.extend(replies.iter().map(|id| id.to_string()));
        }
        next += 1;
    }
    ids
}

#[derive(Clone)]
pub struct ContentService {
    db: Store,
}

impl ContentService {
    pub fn new(db: Store) -> Self {
        Self { db }
    }

    // ─── Helpers ─────────────────────────────────────────────────

    async fn load_post(&self, raw_id: &str) -> Result<Post> {
        let id = parse_id(raw_id, "postId")?;
        self.db
            .get_post(&id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {}", id)))
    }

    /// Load a comment and check it belongs to `post_id`.
    async fn load_comment_in_post(&self, post_id: &str, raw_comment_id: &str) -> Result<Comment> {
        let id = parse_id(raw_comment_id, "commentId")?;
        match self.db.get_comment(&id).await? {
            Some(comment) if comment.post_id == post_id => Ok(comment),
            _ => Err(AppError::NotFound(format!("Comment {}", id))),
        }
    }

    /// Resolve category names to IDs, keeping first-seen order without duplicates.
    async fn resolve_categories(&self, names: &[String]) -> Result<Vec<String>> {
        let mut ids = Vec::with_capacity(names.len());
        let mut seen = HashSet::new();
        for name in names {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let category = self
                .db
                .find_category_by_name(name)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("Category {}", name)))?;
            if seen.insert(category.id.clone()) {
                ids.push(category.id);
            }
        }
        Ok(ids)
    }

    async fn reply_count(&self, post_id: &str, comment_id: &str) -> Result<u64> {
        Ok(self
            .db
            .list_comments_for_post(post_id)
            .await?
            .iter()
            .filter(|c| c.parent_comment_id.as_deref() == Some(comment_id))
            .count() as u64)
    }

    async fn category_index(&self) -> Result<HashMap<String, Category>> {
        Ok(self
            .db
            .list_categories()
            .await?
            .into_iter()
            .map(|c| (c.id.clone(), c))
            .collect())
    }

    fn summaries(post: &Post, index: &HashMap<String, Category>) -> Vec<CategorySummary> {
        post.category_ids
            .iter()
            .filter_map(|id| index.get(id))
            .map(|c| CategorySummary {
                id: c.id.clone(),
                name: c.name.clone(),
            })
            .collect()
    }

    /// Join posts with comment counts and category names, preserving order.
    async fn post_views(&self, posts: &[Post]) -> Result<Vec<PostView>> {
        let index = self.category_index().await?;
        let post_ids: Vec<String> = posts.iter().map(|post| post.id.clone()).collect();
        let counts: Vec<u64> = stream::iter(post_ids)
            .map(|post_id| {
                let db = self.db.clone();
                async move { db.count_comments_for_post(&post_id).await }
            })
            .buffered(MAX_CONCURRENT_COUNTS)
            .collect::<Vec<Result<u64>>>()
            .await
            .into_iter()
            .collect::<Result<Vec<u64>>>()?;

        Ok(posts
            .iter()
            .zip(counts)
            .map(|(post, total)| PostView::new(post, Self::summaries(post, &index), total))
            .collect())
    }

    async fn post_view(&self, post: &Post) -> Result<PostView> {
        let mut views = self.post_views(std::slice::from_ref(post)).await?;
        views
            .pop()
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("Post view missing")))
    }

    // ─── Posts ───────────────────────────────────────────────────

    pub async fn list_posts(
        &self,
        filter: &PostFilter,
        page: u32,
        page_size: u32,
        links: &PageLinks,
    ) -> Result<PostPage> {
        check_page_request(page, page_size)?;

        let category_id = match filter.category_name.as_deref() {
            Some(name) => Some(
                self.db
                    .find_category_by_name(name)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("Category {}", name)))?
                    .id,
            ),
            None => None,
        };

        let mut posts = self.db.list_posts(category_id.as_deref()).await?;

        if let Some(query) = filter
            .title_query
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
        {
            let needle = query.to_lowercase();
            posts.retain(|p| p.title.to_lowercase().contains(&needle));
        }

        sort_newest_first(&mut posts);

        let window = PageWindow::new(page, page_size, posts.len())?;
        let items = self.post_views(&posts[window.range()]).await?;

        tracing::debug!(
            page,
            page_size,
            total_items = window.total_items,
            "Listed posts"
        );

        Ok(PostPage {
            items,
            page: window.page,
            page_size: window.page_size,
            total_items: window.total_items,
            total_pages: window.total_pages,
            next_page: window
                .has_next()
                .then(|| links.url(page + 1, page_size)),
            prev_page: window
                .has_prev()
                .then(|| links.url(page - 1, page_size)),
        })
    }

    pub async fn get_post(&self, raw_id: &str) -> Result<PostView> {
        let post = self.load_post(raw_id).await?;
        self.post_view(&post).await
    }

    pub async fn create_post(
        &self,
        title: &str,
        content: &str,
        category_names: &[String],
    ) -> Result<PostView> {
        let title = required_text(title, "Title")?;
        let content = required_text(content, "Content")?;
        let category_ids = self.resolve_categories(category_names).await?;

        let now = Utc::now();
        let post = Post {
            id: new_id(),
            title,
            content,
            category_ids,
            upvotes: 0,
            downvotes: 0,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_post(&post).await?;

        tracing::info!(post_id = %post.id, "Post created");
        self.post_view(&post).await
    }

    /// Apply the given fields; absent fields keep their value.
    pub async fn update_post(
        &self,
        raw_id: &str,
        title: Option<&str>,
        content: Option<&str>,
        category_names: Option<&[String]>,
    ) -> Result<PostView> {
        let mut post = self.load_post(raw_id).await?;

        if let Some(title) = title {
            post.title = required_text(title, "Title")?;
        }
        if let Some(content) = content {
            post.content = required_text(content, "Content")?;
        }
        if let Some(names) = category_names {
            post.category_ids = self.resolve_categories(names).await?;
        }
        post.updated_at = Utc::now();

        self.db.update_post(&post).await?;
        self.post_view(&post).await
    }

    /// Delete a post together with its whole comment thread.
    pub async fn delete_post(&self, raw_id: &str) -> Result<()> {
        let id = parse_id(raw_id, "postId")?;
        if !self.db.delete_post(&id).await? {
            return Err(AppError::NotFound(format!("Post {}", id)));
        }
        tracing::info!(post_id = %id, "Post deleted");
        Ok(())
    }

    pub async fn vote_on_post(&self, raw_id: &str, direction: VoteDirection) -> Result<VoteCounts> {
        let id = parse_id(raw_id, "postId")?;
        self.db
            .increment_post_vote(&id, direction)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Post {}", id)))
    }

    // ─── Comments ────────────────────────────────────────────────

    /// Top-level comments of a post, optionally with their reply trees.
    pub async fn list_comments(&self, raw_post_id: &str, nested: bool) -> Result<Vec<CommentView>> {
        let post = self.load_post(raw_post_id).await?;
        let comments = self.db.list_comments_for_post(&post.id).await?;
        Ok(aggregate_thread(&comments, nested))
    }

    pub async fn get_comment(&self, raw_post_id: &str, raw_comment_id: &str) -> Result<CommentView> {
        let post = self.load_post(raw_post_id).await?;
        let comment = self.load_comment_in_post(&post.id, raw_comment_id).await?;

        let reply_count = self.reply_count(&post.id, &comment.id).await?;

        Ok(CommentView::new(&comment, reply_count))
    }

    /// Comment on a post, or reply to `parent_comment_id` of the same post.
    pub async fn create_comment(
        &self,
        raw_post_id: &str,
        parent_comment_id: Option<&str>,
        content: &str,
    ) -> Result<CommentView> {
        let content = required_text(content, "Content")?;
        let post = self.load_post(raw_post_id).await?;
        let parent_comment_id = match parent_comment_id {
            Some(raw) => Some(self.load_comment_in_post(&post.id, raw).await?.id),
            None => None,
        };

        let now = Utc::now();
        let comment = Comment {
            id: new_id(),
            post_id: post.id,
            parent_comment_id,
            content,
            upvotes: 0,
            downvotes: 0,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_comment(&comment).await?;

        tracing::info!(
            comment_id = %comment.id,
            post_id = %comment.post_id,
            "Comment created"
        );
        Ok(CommentView::new(&comment, 0))
    }

    pub async fn update_comment(
        &self,
        raw_post_id: &str,
        raw_comment_id: &str,
        content: &str,
    ) -> Result<CommentView> {
        let content = required_text(content, "Content")?;
        let post = self.load_post(raw_post_id).await?;
        let mut comment = self.load_comment_in_post(&post.id, raw_comment_id).await?;

        comment.content = content;
        comment.updated_at = Utc::now();
        self.db.update_comment(&comment).await?;

        let reply_count = self.reply_count(&post.id, &comment.id).await?;
        Ok(CommentView::new(&comment, reply_count))
    }

    /// Delete a comment and all replies below it. Returns how many were removed.
    pub async fn delete_comment(&self, raw_post_id: &str, raw_comment_id: &str) -> Result<usize> {
        let post = self.load_post(raw_post_id).await?;
        let comment = self.load_comment_in_post(&post.id, raw_comment_id).await?;

        let thread = self.db.list_comments_for_post(&post.id).await?;
        let ids = subtree_ids(&thread, &comment.id);
        let deleted = self.db.delete_comments(&ids).await?;

        tracing::info!(comment_id = %comment.id, deleted, "Comment subtree deleted");
        Ok(deleted)
    }

    pub async fn vote_on_comment(
        &self,
        raw_post_id: &str,
        raw_comment_id: &str,
        direction: VoteDirection,
    ) -> Result<VoteCounts> {
        let post = self.load_post(raw_post_id).await?;
        let comment = self.load_comment_in_post(&post.id, raw_comment_id).await?;
        self.db
            .increment_comment_vote(&comment.id, direction)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Comment {}", comment.id)))
    }
}
