use crate::config::DisplayConfig;
use crate::events::{ScreenGeometry, WindowInfo};
use crate::services::window_tool::WindowTool;
use std::sync::Arc;
use tracing::{info, warn};

/// Политика вывода окна на передний план.
///
/// Все операции best-effort: результат показывает, были ли команды отправлены,
/// а не то, выполнил ли их оконный менеджер.
pub struct WindowPolicy {
    tool: Arc<dyn WindowTool>,
    screen: ScreenGeometry,
    tolerance: u32,
    wake_point: (i32, i32),
}

impl WindowPolicy {
    pub fn new(tool: Arc<dyn WindowTool>, screen: ScreenGeometry, display: &DisplayConfig) -> Self {
        Self {
            tool,
            screen,
            tolerance: display.fullscreen_tolerance_px,
            wake_point: display.wake_point,
        }
    }

    pub async fn find_window(&self, window_class: &str) -> Option<WindowInfo> {
        self.tool.find_window(window_class).await
    }

    /// Активировать окно, развернуть и убрать декорации
    pub async fn activate(&self, window_class: &str) -> bool {
        let Some(window) = self.find_window(window_class).await else {
            warn!("Окно {} не найдено", window_class);
            return false;
        };

        if let Err(e) = self.tool.activate(&window.handle).await {
            warn!("Не удалось активировать окно {} ({}): {}", window_class, window.handle, e);
            return false;
        }
        if let Err(e) = self.tool.maximize_undecorated(&window.handle).await {
            warn!("Не удалось развернуть окно {} ({}): {}", window_class, window.handle, e);
        }

        info!("Окно активировано: {} ({})", window_class, window.handle);
        true
    }

    /// Развернуть окно на весь экран, если оно ещё не развёрнуто.
    /// Уже развёрнутое окно не трогаем: ни одной команды оконному менеджеру.
    pub async fn ensure_fullscreen(&self, window_class: &str, force: bool) -> bool {
        let Some(window) = self.find_window(window_class).await else {
            warn!("Окно {} не найдено, fullscreen невозможен", window_class);
            return false;
        };

        if let Some(geometry) = window.geometry {
            if geometry.fills(self.screen, self.tolerance) {
                crate::debug_if_enabled!(
                    "{} уже на весь экран ({}x{}), ничего не делаем",
                    window_class,
                    geometry.width,
                    geometry.height
                );
                return true;
            }
        }

        let result = if force {
            self.tool.press_fullscreen_key(&window.handle).await
        } else {
            self.tool.set_fullscreen(&window.handle, self.screen).await
        };

        match result {
            Ok(()) => {
                info!(
                    "{} развёрнут на весь экран {} (force: {})",
                    window_class, self.screen, force
                );
                true
            }
            Err(e) => {
                warn!("Не удалось развернуть {} на весь экран: {}", window_class, e);
                false
            }
        }
    }

    /// "Разбудить" окно, застрявшее в погашенном состоянии: активация + синтетический клик
    pub async fn wake(&self, window_class: &str) -> bool {
        let Some(window) = self.find_window(window_class).await else {
            return false;
        };

        let (x, y) = self.wake_point;
        match self.tool.click(&window.handle, x, y).await {
            Ok(()) => {
                info!("Окно {} разбужено", window_class);
                true
            }
            Err(e) => {
                warn!("Не удалось разбудить окно {}: {}", window_class, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::WindowGeometry;
    use crate::test_support::FakeWindowTool;

    fn policy(tool: Arc<FakeWindowTool>) -> WindowPolicy {
        WindowPolicy::new(tool, ScreenGeometry::new(1024, 600), &DisplayConfig::default())
    }

    #[tokio::test]
    async fn test_ensure_fullscreen_is_silent_when_already_fullscreen() {
        let tool = Arc::new(FakeWindowTool::new());
        tool.open_window("chat.py", WindowGeometry { x: 0, y: 0, width: 1020, height: 600 });
        let policy = policy(tool.clone());

        assert!(policy.ensure_fullscreen("chat.py", false).await);
        assert!(policy.ensure_fullscreen("chat.py", true).await);
        assert_eq!(tool.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_ensure_fullscreen_hint_and_force_modes() {
        let tool = Arc::new(FakeWindowTool::new());
        tool.open_window("chat.py", WindowGeometry { x: 50, y: 50, width: 640, height: 480 });
        let policy = policy(tool.clone());

        assert!(policy.ensure_fullscreen("chat.py", true).await);
        assert_eq!(tool.calls("f11"), 1);
        assert_eq!(tool.calls("fullscreen"), 0);

        assert!(policy.ensure_fullscreen("chat.py", false).await);
        assert_eq!(tool.calls("fullscreen"), 1);

        // После подсказки окно уже на весь экран - повторный вызов ничего не отправляет
        let before = tool.mutation_count();
        assert!(policy.ensure_fullscreen("chat.py", false).await);
        assert_eq!(tool.mutation_count(), before);
    }

    #[tokio::test]
    async fn test_activate_missing_window() {
        let tool = Arc::new(FakeWindowTool::new());
        let policy = policy(tool.clone());

        assert!(!policy.activate("chat.py").await);
        assert!(!policy.ensure_fullscreen("chat.py", false).await);
        assert!(!policy.wake("chat.py").await);
        assert_eq!(tool.mutation_count(), 0);
    }

    #[tokio::test]
    async fn test_activate_and_wake_dispatch_commands() {
        let tool = Arc::new(FakeWindowTool::new());
        tool.open_window("chat.py", WindowGeometry { x: 0, y: 0, width: 1024, height: 600 });
        let policy = policy(tool.clone());

        assert!(policy.activate("CHAT.PY").await);
        assert_eq!(tool.calls("activate"), 1);
        assert_eq!(tool.calls("maximize"), 1);

        assert!(policy.wake("chat.py").await);
        assert_eq!(tool.calls("click"), 1);
    }

    #[tokio::test]
    async fn test_tool_failure_is_not_found() {
        let tool = Arc::new(FakeWindowTool::new());
        tool.open_window("chat.py", WindowGeometry { x: 0, y: 0, width: 1024, height: 600 });
        tool.set_broken(true);
        let policy = policy(tool.clone());

        assert!(policy.find_window("chat.py").await.is_none());
        assert!(!policy.activate("chat.py").await);
    }
}
