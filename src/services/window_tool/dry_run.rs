use crate::error::Result;
use crate::events::{ScreenGeometry, WindowGeometry, WindowHandle, WindowInfo};
use crate::kiosk_error;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use tracing::info;

use super::r#trait::WindowTool;

/// Эмулируемый "рабочий стол" для dry-run: запущенные программы открывают здесь окна,
/// а DryRunWindowTool их находит.
pub struct DryRunDesktop {
    windows: Mutex<Vec<WindowInfo>>,
    next_id: AtomicU32,
}

impl Default for DryRunDesktop {
    fn default() -> Self {
        Self::new()
    }
}

impl DryRunDesktop {
    pub fn new() -> Self {
        Self {
            windows: Mutex::new(Vec::new()),
            next_id: AtomicU32::new(0x0100_0001),
        }
    }

    /// Открыть окно размером с "обычное" окно приложения
    pub fn open_window(&self, class: &str) -> WindowHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let handle = WindowHandle::new(format!("0x{:08x}", id));
        let window = WindowInfo::new(handle.clone(), format!("{} - dry_run", class))
            .with_class(class.to_string())
            .with_geometry(WindowGeometry { x: 40, y: 40, width: 800, height: 480 });
        self.windows.lock().push(window);
        handle
    }

    pub fn close_window(&self, handle: &WindowHandle) {
        self.windows.lock().retain(|window| &window.handle != handle);
    }

    pub fn windows(&self) -> Vec<WindowInfo> {
        self.windows.lock().clone()
    }

    fn resize(&self, handle: &WindowHandle, screen: ScreenGeometry) -> bool {
        let mut windows = self.windows.lock();
        match windows.iter_mut().find(|window| &window.handle == handle) {
            Some(window) => {
                window.geometry = Some(WindowGeometry { x: 0, y: 0, width: screen.width, height: screen.height });
                true
            }
            None => false,
        }
    }

    fn contains(&self, handle: &WindowHandle) -> bool {
        self.windows.lock().iter().any(|window| &window.handle == handle)
    }
}

pub struct DryRunWindowTool {
    desktop: Arc<DryRunDesktop>,
}

impl DryRunWindowTool {
    pub fn new(desktop: Arc<DryRunDesktop>) -> Self {
        info!("Dry-run режим - WindowTool работает в режиме эмуляции");
        Self { desktop }
    }

    fn require(&self, handle: &WindowHandle) -> Result<()> {
        if self.desktop.contains(handle) {
            Ok(())
        } else {
            Err(kiosk_error!(tool, "окно {} не существует", handle))
        }
    }
}

#[async_trait::async_trait]
impl WindowTool for DryRunWindowTool {
    async fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        Ok(self.desktop.windows())
    }

    async fn activate(&self, window: &WindowHandle) -> Result<()> {
        self.require(window)?;
        info!("[DRY RUN] activate {}", window);
        Ok(())
    }

    async fn maximize_undecorated(&self, window: &WindowHandle) -> Result<()> {
        self.require(window)?;
        info!("[DRY RUN] maximize + undecorate {}", window);
        Ok(())
    }

    async fn set_fullscreen(&self, window: &WindowHandle, screen: ScreenGeometry) -> Result<()> {
        if !self.desktop.resize(window, screen) {
            return Err(kiosk_error!(tool, "окно {} не существует", window));
        }
        info!("[DRY RUN] fullscreen {} -> {}", window, screen);
        Ok(())
    }

    async fn press_fullscreen_key(&self, window: &WindowHandle) -> Result<()> {
        self.require(window)?;
        info!("[DRY RUN] F11 -> {}", window);
        Ok(())
    }

    async fn click(&self, window: &WindowHandle, x: i32, y: i32) -> Result<()> {
        self.require(window)?;
        info!("[DRY RUN] click {} @ {},{}", window, x, y);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_dry_run_desktop_roundtrip() {
        let desktop = Arc::new(DryRunDesktop::new());
        let tool = DryRunWindowTool::new(desktop.clone());

        let handle = desktop.open_window("chat.py");
        let found = tool.find_window("CHAT").await.unwrap();
        assert_eq!(found.handle, handle);

        tool.set_fullscreen(&handle, ScreenGeometry::new(1024, 600)).await.unwrap();
        let found = tool.find_window("chat.py").await.unwrap();
        assert_eq!(found.geometry.map(|g| (g.width, g.height)), Some((1024, 600)));

        desktop.close_window(&handle);
        assert!(tool.find_window("chat.py").await.is_none());
        assert!(tool.activate(&handle).await.is_err());
    }
}
