use crate::error::Result;
use crate::events::{ScreenGeometry, WindowHandle, WindowInfo};
use crate::utils::DisplayEnv;
use tracing::{debug, info};

use super::r#trait::WindowTool;
use super::wmctrl::WmctrlTool;
use super::xdotool::XdotoolTool;

/// Реальный адаптер: wmctrl для списка окон и состояний, xdotool для эмуляции ввода
pub struct SystemWindowTool {
    wmctrl: WmctrlTool,
    xdotool: XdotoolTool,
}

impl SystemWindowTool {
    pub fn new(display: DisplayEnv) -> Self {
        let shown = display.get("DISPLAY").unwrap_or("?").to_owned();
        info!("Инициализация SystemWindowTool (DISPLAY={})", shown);
        Self {
            wmctrl: WmctrlTool::new(display.clone()),
            xdotool: XdotoolTool::new(display),
        }
    }
}

#[async_trait::async_trait]
impl WindowTool for SystemWindowTool {
    async fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        self.wmctrl.list_windows().await
    }

    async fn activate(&self, window: &WindowHandle) -> Result<()> {
        self.wmctrl.activate(window).await
    }

    async fn maximize_undecorated(&self, window: &WindowHandle) -> Result<()> {
        let maximized = self.wmctrl.add_state(window, "maximized_vert,maximized_horz").await;
        // Декорации снимаются отдельной командой: wmctrl принимает не больше двух свойств за раз
        let undecorated = self.wmctrl.add_state(window, "undecorated").await;
        if let Err(e) = &undecorated {
            debug!("Не удалось убрать декорации окна {}: {}", window, e);
        }
        maximized
    }

    async fn set_fullscreen(&self, window: &WindowHandle, screen: ScreenGeometry) -> Result<()> {
        self.wmctrl.add_state(window, "fullscreen").await?;
        self.wmctrl.move_resize(window, screen).await
    }

    async fn press_fullscreen_key(&self, window: &WindowHandle) -> Result<()> {
        self.xdotool.press_key(window, "F11").await
    }

    async fn click(&self, window: &WindowHandle, x: i32, y: i32) -> Result<()> {
        self.xdotool.click(window, x, y).await
    }
}
