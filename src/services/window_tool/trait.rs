use crate::config::Config;
use crate::error::Result;
use crate::events::{ScreenGeometry, WindowHandle, WindowInfo};
use crate::utils::DisplayEnv;
use std::sync::Arc;
use tracing::debug;

use super::dry_run::{DryRunDesktop, DryRunWindowTool};
use super::system::SystemWindowTool;

/// Адаптер к внешним утилитам управления окнами
#[async_trait::async_trait]
pub trait WindowTool: Send + Sync {
    /// Список окон с классом и геометрией
    async fn list_windows(&self) -> Result<Vec<WindowInfo>>;

    async fn activate(&self, window: &WindowHandle) -> Result<()>;

    /// Развернуть окно и убрать декорации
    async fn maximize_undecorated(&self, window: &WindowHandle) -> Result<()>;

    /// Подсказка оконному менеджеру: fullscreen + размер экрана
    async fn set_fullscreen(&self, window: &WindowHandle, screen: ScreenGeometry) -> Result<()>;

    /// Жёсткий вариант: эмуляция F11 в окне
    async fn press_fullscreen_key(&self, window: &WindowHandle) -> Result<()>;

    /// Синтетическое движение мыши и клик в точке внутри окна
    async fn click(&self, window: &WindowHandle, x: i32, y: i32) -> Result<()>;

    /// Первое окно, у которого класс или заголовок содержит `window_class` (без учёта регистра).
    /// Любой сбой утилиты трактуется как "окна нет".
    async fn find_window(&self, window_class: &str) -> Option<WindowInfo> {
        match self.list_windows().await {
            Ok(windows) => windows
                .into_iter()
                .find(|window| window.matches_class(window_class)),
            Err(e) => {
                debug!("Поиск окна '{}' не удался: {}", window_class, e);
                None
            }
        }
    }
}

/// Factory function to create an appropriate window tool based on the dry_run flag
pub fn create_window_tool(
    config: &Config,
    desktop: Arc<DryRunDesktop>,
    dry_run: bool,
) -> Arc<dyn WindowTool> {
    if dry_run {
        Arc::new(DryRunWindowTool::new(desktop))
    } else {
        Arc::new(SystemWindowTool::new(DisplayEnv::from_config(&config.display)))
    }
}
