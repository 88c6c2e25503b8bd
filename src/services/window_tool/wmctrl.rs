use crate::error::Result;
use crate::events::{ScreenGeometry, WindowHandle, WindowInfo};
use crate::utils::DisplayEnv;
use smallvec::SmallVec;
use tracing::debug;

use crate::utils::run_tool;

pub struct WmctrlTool {
    display: DisplayEnv,
}

impl WmctrlTool {
    pub fn new(display: DisplayEnv) -> Self {
        Self { display }
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        run_tool(self.display.command("wmctrl", args), "wmctrl").await
    }

    pub async fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        let stdout = self.run(&["-l", "-x", "-G"]).await?;
        let windows = parse_window_list(&stdout);
        debug!("wmctrl вернул {} окон", windows.len());
        Ok(windows.into_vec())
    }

    pub async fn activate(&self, window: &WindowHandle) -> Result<()> {
        self.run(&["-i", "-a", window.as_str()]).await.map(|_| ())
    }

    /// Добавить окну состояния `_NET_WM_STATE` (например, `maximized_vert,maximized_horz`)
    pub async fn add_state(&self, window: &WindowHandle, states: &str) -> Result<()> {
        let action = format!("add,{}", states);
        self.run(&["-i", "-r", window.as_str(), "-b", &action])
            .await
            .map(|_| ())
    }

    pub async fn move_resize(&self, window: &WindowHandle, screen: ScreenGeometry) -> Result<()> {
        let geometry = format!("0,0,0,{},{}", screen.width, screen.height);
        self.run(&["-i", "-r", window.as_str(), "-e", &geometry])
            .await
            .map(|_| ())
    }
}

/// Окон на киоске единицы, поэтому список почти всегда остаётся на стеке
fn parse_window_list(stdout: &str) -> SmallVec<[WindowInfo; 4]> {
    stdout
        .lines()
        .filter_map(WindowInfo::parse_wmctrl_line)
        .collect()
}
