// Overlay window lifecycle

use crate::channel::{ChannelEvent, EventChannel, EventSink};
use crate::error::Result;
use crate::window::{spawn_window, WindowHandle, WindowOptions};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

/// Opens and closes the overlay window.
///
/// Injected into whichever window needs it; there is no global overlay handle.
#[async_trait]
pub trait WindowManager: Send + Sync {
    /// Open the overlay, or focus it if it is already open
    async fn open_overlay(&self) -> Result<()>;

    /// Close the overlay if open
    async fn close_overlay(&self) -> Result<()>;

    async fn is_overlay_open(&self) -> bool;

    /// Returns whether the overlay is open afterwards
    async fn toggle_overlay(&self) -> Result<bool> {
        if self.is_overlay_open().await {
            self.close_overlay().await?;
            Ok(false)
        } else {
            self.open_overlay().await?;
            Ok(true)
        }
    }
}

/// Overlay window geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayGeometry {
    pub width: u32,
    pub height: u32,
    pub min_width: u32,
    pub min_height: u32,
    pub always_on_top: bool,
}

impl Default for OverlayGeometry {
    fn default() -> Self {
        Self {
            width: 580,
            height: 450,
            min_width: 480,
            min_height: 200,
            always_on_top: true,
        }
    }
}

/// Runs the overlay as a window task on the shared channel
pub struct OverlayManager {
    channel: EventChannel,
    options: WindowOptions,
    geometry: OverlayGeometry,
    overlay: Mutex<Option<WindowHandle>>,
}

impl OverlayManager {
    pub fn new(channel: EventChannel, options: WindowOptions, geometry: OverlayGeometry) -> Self {
        Self {
            channel,
            options,
            geometry,
            overlay: Mutex::new(None),
        }
    }

    pub fn geometry(&self) -> OverlayGeometry {
        self.geometry
    }

    /// Handle to the open overlay
    pub async fn overlay(&self) -> Option<WindowHandle> {
        self.overlay
            .lock()
            .await
            .as_ref()
            .filter(|h| !h.is_closed())
            .cloned()
    }
}

#[async_trait]
impl WindowManager for OverlayManager {
    async fn open_overlay(&self) -> Result<()> {
        let mut overlay = self.overlay.lock().await;
        if overlay.as_ref().is_some_and(|h| !h.is_closed()) {
            tracing::debug!("Overlay already open, focusing");
            return Ok(());
        }

        tracing::info!(
            "Opening overlay {} ({}x{}, min {}x{})",
            self.options.label,
            self.geometry.width,
            self.geometry.height,
            self.geometry.min_width,
            self.geometry.min_height
        );
        *overlay = Some(spawn_window(self.options.clone(), &self.channel, None, None));
        Ok(())
    }

    async fn close_overlay(&self) -> Result<()> {
        let Some(handle) = self.overlay.lock().await.take() else {
            return Ok(());
        };

        if let Err(e) = handle.shutdown().await {
            tracing::debug!("Overlay already gone: {}", e);
        }
        tracing::info!("Overlay {} closed", handle.label());
        self.channel
            .publish(handle.label(), ChannelEvent::OverlayClosed);
        Ok(())
    }

    async fn is_overlay_open(&self) -> bool {
        self.overlay().await.is_some()
    }
}
