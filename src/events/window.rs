use serde::{Deserialize, Serialize};
use std::fmt;

/// Идентификатор окна в формате оконного менеджера (например, `0x03a00003`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowHandle(pub String);

impl WindowHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WindowHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Информация об окне
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub title: String,
    pub class: String,
    pub geometry: Option<WindowGeometry>,
}

impl WindowInfo {
    pub fn new(handle: WindowHandle, title: String) -> Self {
        Self {
            handle,
            title,
            class: String::new(),
            geometry: None,
        }
    }

    pub fn with_class(mut self, class: String) -> Self {
        self.class = class;
        self
    }

    pub fn with_geometry(mut self, geometry: WindowGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Проверить, соответствует ли окно идентификатору класса (регистронезависимо, по подстроке)
    pub fn matches_class(&self, window_class: &str) -> bool {
        if window_class.is_empty() {
            return false;
        }
        let pattern_lower = window_class.to_lowercase();
        self.class.to_lowercase().contains(&pattern_lower)
            || self.title.to_lowercase().contains(&pattern_lower)
    }

    /// Разобрать строку вывода `wmctrl -lxG`:
    /// `<id> <desktop> <x> <y> <w> <h> <class> <host> <title...>`
    pub fn parse_wmctrl_line(line: &str) -> Option<Self> {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() < 7 || !parts[0].starts_with("0x") {
            return None;
        }

        let geometry = WindowGeometry {
            x: parts[2].parse().ok()?,
            y: parts[3].parse().ok()?,
            width: parts[4].parse().ok()?,
            height: parts[5].parse().ok()?,
        };

        let title = if parts.len() > 8 {
            parts[8..].join(" ")
        } else {
            String::new()
        };

        Some(
            WindowInfo::new(WindowHandle::new(parts[0]), title)
                .with_class(parts[6].to_string())
                .with_geometry(geometry),
        )
    }
}

impl fmt::Display for WindowInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.class.is_empty() {
            write!(f, "{} \"{}\"", self.handle, self.title)
        } else {
            write!(f, "{} \"{}\" ({})", self.handle, self.title, self.class)
        }
    }
}

/// Геометрия окна
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WindowGeometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl WindowGeometry {
    /// Окно считается развёрнутым, если его размер отличается от экрана меньше чем на `tolerance`
    pub fn fills(&self, screen: ScreenGeometry, tolerance: u32) -> bool {
        self.width.abs_diff(screen.width) < tolerance
            && self.height.abs_diff(screen.height) < tolerance
    }
}

/// Разрешение экрана, определяется один раз при старте
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenGeometry {
    pub width: u32,
    pub height: u32,
}

impl ScreenGeometry {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Разобрать строку вида `1024x600`
    pub fn parse(text: &str) -> Option<Self> {
        let (width, height) = text.trim().split_once('x')?;
        let width = width.trim().parse().ok()?;
        let height = height.trim().parse().ok()?;
        if width == 0 || height == 0 {
            return None;
        }
        Some(Self { width, height })
    }
}

impl fmt::Display for ScreenGeometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}
