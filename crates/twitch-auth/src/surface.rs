//! Browser-surface capabilities supplied by the host.
//!
//! The sign-in flow never renders anything itself. It asks a
//! [`SurfaceHost`] for a [`NavigableSurface`], points it at the
//! authorization page, and reads the URIs it navigates to until the
//! redirect shows up.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// Identifies a surface to its host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SurfaceId(pub u64);

impl fmt::Display for SurfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "surface-{}", self.0)
    }
}

/// A browser view that reports where it navigates.
#[async_trait]
pub trait NavigableSurface: Send {
    /// The id the host knows this surface by.
    fn id(&self) -> SurfaceId;

    /// Start loading `url`.
    fn navigate(&mut self, url: &str) -> Result<()>;

    /// Wait for the next navigated-to URI.
    ///
    /// Returns `None` once the surface has been torn down and will never
    /// navigate again.
    async fn next_url(&mut self) -> Option<String>;

    /// Stop loading and release the view.
    fn close(&mut self);
}

/// The place surfaces are created and displayed, e.g. a game viewport.
pub trait SurfaceHost: Send + Sync {
    /// Create a new, not yet displayed, surface.
    fn create_surface(&self) -> Result<Box<dyn NavigableSurface>>;

    /// Display the surface.
    fn add_surface(&self, id: SurfaceId);

    /// Stop displaying the surface. Unknown ids are ignored.
    fn remove_surface(&self, id: SurfaceId);
}

// ---------------------------------------------------------------------------
// Mounted surface guard
// ---------------------------------------------------------------------------

/// A surface currently displayed by its host.
///
/// Tearing down (closing the surface and removing it from the host) happens
/// exactly once: either through [`MountedSurface::unmount`] or, if the
/// sign-in is abandoned, when the guard is dropped.
pub struct MountedSurface {
    surface: Box<dyn NavigableSurface>,
    host: Arc<dyn SurfaceHost>,
    mounted: bool,
}

impl MountedSurface {
    /// Navigate `surface` to `url` and display it on `host`.
    ///
    /// # Errors
    ///
    /// Propagates the surface's navigation error; the surface is closed
    /// and never displayed in that case.
    pub fn mount(
        mut surface: Box<dyn NavigableSurface>,
        host: Arc<dyn SurfaceHost>,
        url: &str,
    ) -> Result<Self> {
        if let Err(e) = surface.navigate(url) {
            surface.close();
            return Err(e);
        }
        host.add_surface(surface.id());
        tracing::debug!(surface = %surface.id(), "browser surface displayed");

        Ok(Self {
            surface,
            host,
            mounted: true,
        })
    }

    pub fn id(&self) -> SurfaceId {
        self.surface.id()
    }

    /// Wait for the next navigation. `None` once the surface is gone.
    pub async fn next_url(&mut self) -> Option<String> {
        if !self.mounted {
            return None;
        }
        self.surface.next_url().await
    }

    /// Close the surface and remove it from the host.
    pub fn unmount(&mut self) {
        if !self.mounted {
            return;
        }
        self.mounted = false;
        let id = self.surface.id();
        self.host.remove_surface(id);
        self.surface.close();
        tracing::debug!(surface = %id, "browser surface torn down");
    }
}

impl Drop for MountedSurface {
    fn drop(&mut self) {
        self.unmount();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Log(Mutex<Vec<String>>);

    impl Log {
        fn push(&self, entry: String) {
            self.0.lock().unwrap().push(entry);
        }

        fn entries(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    struct ScriptedSurface {
        urls: Vec<String>,
        fail_navigate: bool,
        log: Arc<Log>,
    }

    #[async_trait]
    impl NavigableSurface for ScriptedSurface {
        fn id(&self) -> SurfaceId {
            SurfaceId(7)
        }

        fn navigate(&mut self, url: &str) -> Result<()> {
            if self.fail_navigate {
                return Err(crate::TwitchAuthError::Surface {
                    reason: "no browser".to_string(),
                });
            }
            self.log.push(format!("navigate {url}"));
            Ok(())
        }

        async fn next_url(&mut self) -> Option<String> {
            if self.urls.is_empty() {
                None
            } else {
                Some(self.urls.remove(0))
            }
        }

        fn close(&mut self) {
            self.log.push("close".to_string());
        }
    }

    struct LoggingHost(Arc<Log>);

    impl SurfaceHost for LoggingHost {
        fn create_surface(&self) -> Result<Box<dyn NavigableSurface>> {
            unreachable!("tests build surfaces directly")
        }

        fn add_surface(&self, id: SurfaceId) {
            self.0.push(format!("add {id}"));
        }

        fn remove_surface(&self, id: SurfaceId) {
            self.0.push(format!("remove {id}"));
        }
    }

    type Fixture = (Box<dyn NavigableSurface>, Arc<dyn SurfaceHost>, Arc<Log>);

    fn fixture(urls: &[&str], fail_navigate: bool) -> Fixture {
        let log = Arc::new(Log::default());
        let surface = ScriptedSurface {
            urls: urls.iter().map(|u| u.to_string()).collect(),
            fail_navigate,
            log: Arc::clone(&log),
        };
        let host = LoggingHost(Arc::clone(&log));
        (Box::new(surface), Arc::new(host), log)
    }

    #[tokio::test]
    async fn mount_navigates_then_displays() {
        let (surface, host, log) = fixture(&["https://a", "https://b"], false);
        let mut mounted = MountedSurface::mount(surface, host, "https://start").unwrap();

        assert_eq!(log.entries(), vec!["navigate https://start", "add surface-7"]);
        assert_eq!(mounted.next_url().await.as_deref(), Some("https://a"));
        assert_eq!(mounted.next_url().await.as_deref(), Some("https://b"));
        assert_eq!(mounted.next_url().await, None);
    }

    #[tokio::test]
    async fn unmount_happens_once() {
        let (surface, host, log) = fixture(&["https://a"], false);
        let mut mounted = MountedSurface::mount(surface, host, "https://start").unwrap();

        mounted.unmount();
        mounted.unmount();
        assert_eq!(mounted.next_url().await, None);
        drop(mounted);

        let entries = log.entries();
        assert_eq!(entries.iter().filter(|e| *e == "close").count(), 1);
        assert_eq!(entries.iter().filter(|e| *e == "remove surface-7").count(), 1);
    }

    #[test]
    fn drop_tears_down() {
        let (surface, host, log) = fixture(&[], false);
        let mounted = MountedSurface::mount(surface, host, "https://start").unwrap();
        drop(mounted);

        assert_eq!(
            log.entries(),
            vec!["navigate https://start", "add surface-7", "remove surface-7", "close"]
        );
    }

    #[test]
    fn failed_navigation_is_never_displayed() {
        let (surface, host, log) = fixture(&[], true);
        assert!(MountedSurface::mount(surface, host, "https://start").is_err());
        assert_eq!(log.entries(), vec!["close"]);
    }
}
