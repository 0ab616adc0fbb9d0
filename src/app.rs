//! Command dispatch: turns user commands into feed, auth and favorites
//! calls and hands the results to a [`Renderer`].

use std::collections::HashSet;
use std::io;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

use crate::auth::{self, GateError, SharedAuth};
use crate::display::post_page_url;
use crate::favorites::FavoritesClient;
use crate::feed::{FeedController, LoadOutcome};
use crate::render::Renderer;
use crate::source::PostSource;

pub const HELP: &str = "\
commands:
  search <tags>          search posts (empty resets to the default feed)
  more | <enter>         load the next page
  retry                  reload the current page after an error
  show <id>              post details
  like <id>              toggle favorite (requires login)
  share <id>             print the post's link
  home | profile         switch view
  login <user> <key>     log in with your API key
  cancel                 leave the login form
  logout
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Search(String),
    More,
    Retry,
    Show(u64),
    Like(u64),
    Share(u64),
    Home,
    Profile,
    Login { username: String, api_key: String },
    Cancel,
    Logout,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ParseCommandError(String);

fn parse_id(arg: Option<&str>, command: &str) -> Result<u64, ParseCommandError> {
    arg.and_then(|a| a.trim_start_matches('#').parse().ok())
        .ok_or_else(|| ParseCommandError(format!("usage: {command} <post id>")))
}

impl FromStr for Command {
    type Err = ParseCommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (name, rest) = line.split_once(char::is_whitespace).unwrap_or((line, ""));
        let rest = rest.trim();
        let mut args = rest.split_whitespace();

        match name.to_ascii_lowercase().as_str() {
            "" | "more" | "m" => Ok(Self::More),
            "search" | "s" => Ok(Self::Search(rest.to_string())),
            "retry" => Ok(Self::Retry),
            "show" => parse_id(args.next(), "show").map(Self::Show),
            "like" | "fav" => parse_id(args.next(), "like").map(Self::Like),
            "share" => parse_id(args.next(), "share").map(Self::Share),
            "home" | "feed" => Ok(Self::Home),
            "profile" => Ok(Self::Profile),
            "login" => match (args.next(), args.next()) {
                (Some(username), Some(api_key)) => Ok(Self::Login {
                    username: username.to_string(),
                    api_key: api_key.to_string(),
                }),
                _ => Err(ParseCommandError("usage: login <username> <api key>".to_string())),
            },
            "cancel" => Ok(Self::Cancel),
            "logout" => Ok(Self::Logout),
            "help" | "?" => Ok(Self::Help),
            "quit" | "exit" | "q" => Ok(Self::Quit),
            other => Err(ParseCommandError(format!(
                "unknown command '{other}', type 'help' for a list"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Feed,
    Login,
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct App<S, R> {
    feed: FeedController<S>,
    favorites: FavoritesClient,
    auth: SharedAuth,
    renderer: R,
    site_url: String,
    view: View,
    liked: HashSet<u64>,
}

impl<S: PostSource, R: Renderer> App<S, R> {
    pub fn new(
        feed: FeedController<S>,
        favorites: FavoritesClient,
        auth: SharedAuth,
        renderer: R,
        site_url: impl Into<String>,
    ) -> Self {
        Self {
            feed,
            favorites,
            auth,
            renderer,
            site_url: site_url.into(),
            view: View::Feed,
            liked: HashSet::new(),
        }
    }

    #[must_use]
    pub fn view(&self) -> View {
        self.view
    }

    #[must_use]
    pub fn feed(&self) -> &FeedController<S> {
        &self.feed
    }

    #[must_use]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    #[must_use]
    pub fn is_liked(&self, post_id: u64) -> bool {
        self.liked.contains(&post_id)
    }

    /// Load the default feed.
    ///
    /// # Errors
    ///
    /// Returns an error if the renderer fails.
    pub async fn start(&mut self) -> io::Result<()> {
        self.renderer.show_loading("Loading posts...")?;
        let outcome = self.feed.load_initial().await;
        self.present(outcome)
    }

    /// Run one command.
    ///
    /// # Errors
    ///
    /// Returns an error if the renderer fails.
    pub async fn handle(&mut self, command: Command) -> io::Result<Flow> {
        debug!(?command, "Handling command");
        match command {
            Command::Search(tags) => {
                self.view = View::Feed;
                self.renderer.show_loading("Searching posts...")?;
                let outcome = self.feed.set_query(&tags).await;
                self.present(outcome)?;
            }
            Command::More => {
                self.renderer.show_loading("Loading more posts...")?;
                let outcome = self.feed.load_more().await;
                self.present(outcome)?;
            }
            Command::Retry => match self.feed.retry().await {
                LoadOutcome::Unchanged => self.renderer.show_notice("Nothing to retry.")?,
                outcome => self.present(outcome)?,
            },
            Command::Show(id) => self.show(id).await?,
            Command::Like(id) => self.toggle_like(id).await?,
            Command::Share(id) => {
                let url = post_page_url(&self.site_url, id);
                self.renderer.show_notice(&url)?;
            }
            Command::Home | Command::Cancel => {
                self.view = View::Feed;
                self.renderer.show_notice("Back to feed.")?;
            }
            Command::Profile => self.show_profile_or_login()?,
            Command::Login { username, api_key } => {
                let result = auth::lock(&self.auth).login(&username, &api_key);
                match result {
                    Ok(()) => {
                        self.renderer.show_notice("Login successful!")?;
                        self.show_profile_or_login()?;
                    }
                    Err(e) => {
                        debug!(error = %e, "Login rejected");
                        self.renderer
                            .show_error("Login failed. Please check your credentials.")?;
                    }
                }
            }
            Command::Logout => {
                auth::lock(&self.auth).logout();
                self.liked.clear();
                self.view = View::Feed;
                self.renderer.show_notice("Logged out.")?;
            }
            Command::Help => self.renderer.show_notice(HELP)?,
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    fn present(&mut self, outcome: LoadOutcome) -> io::Result<()> {
        match outcome {
            LoadOutcome::Rendered(delta) => self.renderer.render(&delta),
            LoadOutcome::NoResults => {
                let tags = self.feed.snapshot().tags;
                self.renderer.show_empty(&tags)
            }
            LoadOutcome::Failed(failure) => self.renderer.show_error(failure.message),
            LoadOutcome::Unchanged | LoadOutcome::Skipped | LoadOutcome::Stale => Ok(()),
        }
    }

    async fn show(&mut self, id: u64) -> io::Result<()> {
        let Some(post) = self.feed.post(id) else {
            return self.renderer.show_error(&format!("Post #{id} is not in the feed."));
        };
        let avatar = match post.uploader_id {
            Some(uploader_id) => self.feed.source().avatar_url(uploader_id).await,
            None => None,
        };
        self.renderer.show_post(&post, avatar.as_deref())
    }

    fn show_profile_or_login(&mut self) -> io::Result<()> {
        let username = auth::lock(&self.auth).username().map(ToString::to_string);
        match username {
            Some(username) => {
                self.view = View::Profile;
                self.renderer.show_notice(&format!(
                    "Profile\n  Username: {username}\n  Status: Logged in\n  Page: {}/users/{username}",
                    self.site_url.trim_end_matches('/')
                ))
            }
            None => {
                self.view = View::Login;
                self.renderer.show_notice(
                    "Log in with your username and API key: login <username> <api key>",
                )
            }
        }
    }

    async fn toggle_like(&mut self, id: u64) -> io::Result<()> {
        if !auth::lock(&self.auth).is_authenticated() {
            self.renderer.show_error("Please log in to add favorites")?;
            return self.show_profile_or_login();
        }

        let liked = self.liked.contains(&id);
        let result = if liked {
            self.favorites.remove_favorite(id).await
        } else {
            self.favorites.add_favorite(id).await
        };

        match result {
            Ok(()) if liked => {
                self.liked.remove(&id);
                self.renderer.show_notice(&format!("Removed #{id} from favorites."))
            }
            Ok(()) => {
                self.liked.insert(id);
                self.renderer.show_notice(&format!("Added #{id} to favorites."))
            }
            Err(GateError::AuthRejected) => {
                self.liked.clear();
                self.view = View::Feed;
                self.renderer
                    .show_error("Authentication failed. Please check your login credentials.")
            }
            Err(GateError::NotAuthenticated) => {
                self.renderer.show_error("Please log in to add favorites")?;
                self.show_profile_or_login()
            }
            Err(e) => {
                debug!(post_id = id, error = %e, "Favorite toggle failed");
                let action = if liked { "remove from" } else { "add to" };
                self.renderer.show_error(&format!(
                    "Failed to {action} favorites. Please check your login credentials."
                ))
            }
        }
    }
}
