//! A terminal stand-in for an embedded browser.
//!
//! The surface prints the authorization URL and asks the user to open it in
//! a real browser. Every line typed afterwards is treated as a page the
//! surface navigated to, so pasting the final `https://localhost/#access_token=...`
//! address completes the sign-in. End of input closes the surface.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};
use twitch_auth::{NavigableSurface, Result, SurfaceHost, SurfaceId, TwitchAuthError};

// ---------------------------------------------------------------------------
// Surface
// ---------------------------------------------------------------------------

/// A surface whose navigations are lines read from `R`.
pub struct LineSurface<R> {
    id: SurfaceId,
    lines: Option<Lines<R>>,
    prompt: bool,
}

impl<R: AsyncBufRead + Unpin + Send> LineSurface<R> {
    pub fn new(id: SurfaceId, reader: R) -> Self {
        Self {
            id,
            lines: Some(reader.lines()),
            prompt: true,
        }
    }

    /// Suppress the instructions printed on navigation.
    #[cfg(test)]
    pub fn quiet(mut self) -> Self {
        self.prompt = false;
        self
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> NavigableSurface for LineSurface<R> {
    fn id(&self) -> SurfaceId {
        self.id
    }

    fn navigate(&mut self, url: &str) -> Result<()> {
        if self.lines.is_none() {
            return Err(TwitchAuthError::SurfaceClosed);
        }
        if self.prompt {
            eprintln!();
            eprintln!("  Open this URL in your browser and sign in:");
            eprintln!();
            eprintln!("    {url}");
            eprintln!();
            eprintln!("  Then paste the address you were redirected to and press Enter.");
            eprintln!();
        }
        Ok(())
    }

    async fn next_url(&mut self) -> Option<String> {
        let lines = self.lines.as_mut()?;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if !line.is_empty() {
                        return Some(line.to_string());
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "failed to read navigation from input");
                    break;
                }
            }
        }
        self.lines = None;
        None
    }

    fn close(&mut self) {
        self.lines = None;
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// Hands out stdin-backed surfaces and tracks which one is displayed.
#[derive(Default)]
pub struct TerminalHost {
    next_id: AtomicU64,
    displayed: Mutex<Vec<SurfaceId>>,
}

impl TerminalHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of the surfaces currently displayed.
    #[cfg(test)]
    pub fn displayed(&self) -> Vec<SurfaceId> {
        self.displayed
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }
}

impl SurfaceHost for TerminalHost {
    fn create_surface(&self) -> Result<Box<dyn NavigableSurface>> {
        let id = SurfaceId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        let surface: LineSurface<BufReader<Stdin>> =
            LineSurface::new(id, BufReader::new(tokio::io::stdin()));
        Ok(Box::new(surface))
    }

    fn add_surface(&self, id: SurfaceId) {
        if let Ok(mut displayed) = self.displayed.lock() {
            displayed.push(id);
        }
        tracing::debug!(surface = %id, "waiting for redirect on stdin");
    }

    fn remove_surface(&self, id: SurfaceId) {
        if let Ok(mut displayed) = self.displayed.lock() {
            displayed.retain(|d| *d != id);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
