//! Renderers consume [`RenderDelta`]s and status changes from the app.

use std::io::{self, Write};

use chrono::Utc;

use crate::display::{
    artist_name, display_tags, format_number, post_text, time_ago, user_handle, Engagement,
};
use crate::feed::RenderDelta;
use crate::models::Post;

pub trait Renderer {
    /// Paint new posts.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    fn render(&mut self, delta: &RenderDelta) -> io::Result<()>;

    /// Show a transient loading banner.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    fn show_loading(&mut self, message: &str) -> io::Result<()>;

    /// Replace the loading banner with an empty state for `tags`.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    fn show_empty(&mut self, tags: &str) -> io::Result<()>;

    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    fn show_error(&mut self, message: &str) -> io::Result<()>;

    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    fn show_notice(&mut self, message: &str) -> io::Result<()>;

    /// Full detail for one post.
    ///
    /// # Errors
    ///
    /// Returns an error if the output cannot be written.
    fn show_post(&mut self, post: &Post, avatar_url: Option<&str>) -> io::Result<()>;
}

/// Plain-text timeline written to any [`Write`].
pub struct TerminalRenderer<W> {
    out: W,
}

impl<W: Write> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_post(&mut self, post: &Post) -> io::Result<()> {
        let name = artist_name(post);
        let age = post
            .created_at
            .map(|t| time_ago(t, Utc::now()))
            .unwrap_or_default();
        let engagement = Engagement::of(post);
        let kind = if post.is_video() { "video" } else { "image" };

        writeln!(self.out, "{}", "-".repeat(60))?;
        writeln!(self.out, "{name} {} {age}  #{}", user_handle(&name), post.id)?;
        writeln!(self.out, "{}", post_text(post))?;

        let tags = display_tags(post);
        if !tags.is_empty() {
            let line: Vec<String> = tags.iter().map(|t| format!("#{}", t.replace('_', " "))).collect();
            writeln!(self.out, "{}", line.join(" "))?;
        }

        writeln!(self.out, "[{kind}] {}  [{}]", post.media_url, post.rating.label())?;
        writeln!(
            self.out,
            "replies {}  reposts {}  likes {}  views {}",
            format_number(engagement.replies),
            format_number(engagement.reposts),
            format_number(engagement.likes),
            format_number(engagement.views),
        )
    }
}

impl<W: Write> Renderer for TerminalRenderer<W> {
    fn render(&mut self, delta: &RenderDelta) -> io::Result<()> {
        if let RenderDelta::Replace(posts) = delta {
            writeln!(self.out, "=== {} posts ===", posts.len())?;
        }
        for post in delta.posts() {
            self.write_post(post)?;
        }
        self.out.flush()
    }

    fn show_loading(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "... {message}")?;
        self.out.flush()
    }

    fn show_empty(&mut self, tags: &str) -> io::Result<()> {
        writeln!(self.out, "No posts found for '{tags}'.")?;
        self.out.flush()
    }

    fn show_error(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "! {message}")?;
        self.out.flush()
    }

    fn show_notice(&mut self, message: &str) -> io::Result<()> {
        writeln!(self.out, "{message}")?;
        self.out.flush()
    }

    fn show_post(&mut self, post: &Post, avatar_url: Option<&str>) -> io::Result<()> {
        self.write_post(post)?;
        writeln!(self.out, "uploader: {}", post.uploader_name)?;
        if let Some(avatar) = avatar_url {
            writeln!(self.out, "avatar: {avatar}")?;
        }
        if let Some(preview) = &post.preview_url {
            writeln!(self.out, "preview: {preview}")?;
        }
        writeln!(
            self.out,
            "score: +{} / {} (total {})",
            post.score.up, post.score.down, post.score.total
        )?;
        if !post.tags.artist.is_empty() {
            writeln!(self.out, "artists: {}", post.tags.artist.join(", "))?;
        }
        self.out.flush()
    }
}
