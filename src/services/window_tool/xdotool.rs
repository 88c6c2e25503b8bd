use crate::error::Result;
use crate::events::WindowHandle;
use crate::utils::DisplayEnv;

use crate::utils::run_tool;

pub struct XdotoolTool {
    display: DisplayEnv,
}

impl XdotoolTool {
    pub fn new(display: DisplayEnv) -> Self {
        Self { display }
    }

    async fn run(&self, args: &[&str]) -> Result<String> {
        run_tool(self.display.command("xdotool", args), "xdotool").await
    }

    pub async fn press_key(&self, window: &WindowHandle, key: &str) -> Result<()> {
        self.run(&["windowactivate", window.as_str(), "key", key])
            .await
            .map(|_| ())
    }

    pub async fn click(&self, window: &WindowHandle, x: i32, y: i32) -> Result<()> {
        let (x, y) = (x.to_string(), y.to_string());
        self.run(&[
            "windowactivate",
            window.as_str(),
            "mousemove",
            "--window",
            window.as_str(),
            &x,
            &y,
            "click",
            "1",
        ])
        .await
        .map(|_| ())
    }
}
