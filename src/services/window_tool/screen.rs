use crate::events::ScreenGeometry;
use crate::utils::DisplayEnv;
use tracing::{debug, info, warn};

use crate::utils::run_tool;

/// Способы узнать разрешение экрана, в порядке приоритета
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionProbe {
    Xwininfo,
    Xrandr,
    Xdpyinfo,
}

impl ResolutionProbe {
    pub const ALL: [ResolutionProbe; 3] = [
        ResolutionProbe::Xwininfo,
        ResolutionProbe::Xrandr,
        ResolutionProbe::Xdpyinfo,
    ];

    fn program(&self) -> &'static str {
        match self {
            ResolutionProbe::Xwininfo => "xwininfo",
            ResolutionProbe::Xrandr => "xrandr",
            ResolutionProbe::Xdpyinfo => "xdpyinfo",
        }
    }

    fn args(&self) -> &'static [&'static str] {
        match self {
            ResolutionProbe::Xwininfo => &["-root"],
            _ => &[],
        }
    }

    /// Извлечь `WxH` из вывода утилиты
    pub fn parse(&self, output: &str) -> Option<ScreenGeometry> {
        match self {
            // "  -geometry 1024x600+0+0"
            ResolutionProbe::Xwininfo => output
                .lines()
                .find_map(|line| line.trim().strip_prefix("-geometry"))
                .and_then(|rest| rest.trim().split('+').next())
                .and_then(ScreenGeometry::parse),
            // "   1024x600      60.00*+"
            ResolutionProbe::Xrandr => output
                .lines()
                .find(|line| line.contains('*'))
                .and_then(|line| line.split_whitespace().next())
                .and_then(ScreenGeometry::parse),
            // "  dimensions:    1024x600 pixels (271x159 millimeters)"
            ResolutionProbe::Xdpyinfo => output
                .lines()
                .find_map(|line| line.trim().strip_prefix("dimensions:"))
                .and_then(|rest| rest.split_whitespace().next())
                .and_then(ScreenGeometry::parse),
        }
    }
}

/// Перебрать способы по порядку; первый разобранный `WxH` выигрывает.
/// Если не сработал ни один - `fallback`: неверное разрешение хуже для fullscreen,
/// но не должно ронять супервизор.
pub async fn detect_screen_resolution(display: &DisplayEnv, fallback: ScreenGeometry) -> ScreenGeometry {
    for probe in ResolutionProbe::ALL {
        let program = probe.program();
        match run_tool(display.command(program, probe.args()), program).await {
            Ok(output) => {
                if let Some(screen) = probe.parse(&output) {
                    info!("Разрешение экрана {} (через {:?})", screen, probe);
                    return screen;
                }
                debug!("{:?}: не удалось разобрать вывод", probe);
            }
            Err(e) => debug!("{:?}: {}", probe, e),
        }
    }

    warn!("Не удалось определить разрешение экрана, используем {}", fallback);
    fallback
}
