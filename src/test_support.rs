//! Подделки внешнего мира для тестов контроллера, политики окон и сторожей

use crate::error::Result;
use crate::events::{ScreenGeometry, WindowGeometry, WindowHandle, WindowInfo};
use crate::kiosk_error;
use crate::services::controller::{
    ForegroundSnapshot, ForegroundSwitch, HealthReport, SwitchOutcome,
};
use crate::services::process::{Launcher, ManagedProcess};
use crate::services::program::{ProgramRole, ProgramSpec};
use crate::services::window_tool::WindowTool;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Default)]
struct FakeDesktop {
    windows: Vec<WindowInfo>,
    next_id: u32,
    calls: HashMap<&'static str, usize>,
    broken: bool,
    vanish_on_click: bool,
}

/// Оконный менеджер в памяти со счётчиками вызовов
#[derive(Default)]
pub struct FakeWindowTool {
    desktop: Mutex<FakeDesktop>,
}

impl FakeWindowTool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open_window(&self, class: &str, geometry: WindowGeometry) -> WindowHandle {
        let mut desktop = self.desktop.lock();
        desktop.next_id += 1;
        let handle = WindowHandle::new(format!("0x{:08x}", 0x0300_0000 + desktop.next_id));
        desktop.windows.push(
            WindowInfo::new(handle.clone(), class.to_string())
                .with_class(format!("{}.Fake", class))
                .with_geometry(geometry),
        );
        handle
    }

    pub fn close_window(&self, handle: &WindowHandle) {
        self.desktop.lock().windows.retain(|w| &w.handle != handle);
    }

    /// Приложение пересоздало окно: новый идентификатор, та же геометрия
    pub fn recreate_window(&self, class: &str) -> Option<WindowHandle> {
        let old = {
            let mut desktop = self.desktop.lock();
            let index = desktop.windows.iter().position(|w| w.matches_class(class))?;
            desktop.windows.remove(index)
        };
        let geometry = old.geometry.unwrap_or(WindowGeometry { x: 0, y: 0, width: 800, height: 480 });
        Some(self.open_window(class, geometry))
    }

    pub fn calls(&self, name: &str) -> usize {
        self.desktop.lock().calls.get(name).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.desktop.lock().calls.values().sum()
    }

    /// Все вызовы, кроме чтения списка окон
    pub fn mutation_count(&self) -> usize {
        self.total_calls() - self.calls("list")
    }

    pub fn reset_calls(&self) {
        self.desktop.lock().calls.clear();
    }

    pub fn set_broken(&self, broken: bool) {
        self.desktop.lock().broken = broken;
    }

    /// Следующий клик закрывает окно (окно "зависло" и пропало)
    pub fn set_vanish_on_click(&self, vanish: bool) {
        self.desktop.lock().vanish_on_click = vanish;
    }

    fn record(&self, name: &'static str, handle: Option<&WindowHandle>) -> Result<()> {
        let mut desktop = self.desktop.lock();
        *desktop.calls.entry(name).or_default() += 1;
        if desktop.broken {
            return Err(kiosk_error!(tool, "{}: утилита недоступна", name));
        }
        if let Some(handle) = handle {
            if !desktop.windows.iter().any(|w| &w.handle == handle) {
                return Err(kiosk_error!(tool, "{}: окно {} не существует", name, handle));
            }
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl WindowTool for FakeWindowTool {
    async fn list_windows(&self) -> Result<Vec<WindowInfo>> {
        self.record("list", None)?;
        Ok(self.desktop.lock().windows.clone())
    }

    async fn activate(&self, window: &WindowHandle) -> Result<()> {
        self.record("activate", Some(window))
    }

    async fn maximize_undecorated(&self, window: &WindowHandle) -> Result<()> {
        self.record("maximize", Some(window))
    }

    async fn set_fullscreen(&self, window: &WindowHandle, screen: ScreenGeometry) -> Result<()> {
        self.record("fullscreen", Some(window))?;
        let mut desktop = self.desktop.lock();
        if let Some(w) = desktop.windows.iter_mut().find(|w| &w.handle == window) {
            w.geometry = Some(WindowGeometry { x: 0, y: 0, width: screen.width, height: screen.height });
        }
        Ok(())
    }

    async fn press_fullscreen_key(&self, window: &WindowHandle) -> Result<()> {
        self.record("f11", Some(window))
    }

    async fn click(&self, window: &WindowHandle, _x: i32, _y: i32) -> Result<()> {
        self.record("click", Some(window))?;
        let mut desktop = self.desktop.lock();
        if desktop.vanish_on_click {
            desktop.vanish_on_click = false;
            desktop.windows.retain(|w| &w.handle != window);
        }
        Ok(())
    }
}

/// Поведение запуска для одного класса окна
#[derive(Debug, Clone)]
struct LaunchBehavior {
    opens_window: bool,
    dies_on_launch: bool,
    fail_launches: u32,
}

impl Default for LaunchBehavior {
    fn default() -> Self {
        Self { opens_window: true, dies_on_launch: false, fail_launches: 0 }
    }
}

#[derive(Default)]
struct LauncherState {
    behavior: HashMap<String, LaunchBehavior>,
    launches: HashMap<String, usize>,
    reaps: HashMap<String, usize>,
    alive: HashMap<String, Vec<(Arc<AtomicBool>, Option<WindowHandle>)>>,
    next_pid: u32,
}

pub struct FakeProcess {
    pid: u32,
    alive: Arc<AtomicBool>,
    window: Option<WindowHandle>,
    tool: Arc<FakeWindowTool>,
}

#[async_trait::async_trait]
impl ManagedProcess for FakeProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn is_alive(&mut self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn stop(&mut self, _graceful_timeout: Duration) {
        self.kill().await;
    }

    async fn kill(&mut self) {
        self.alive.store(false, Ordering::SeqCst);
        if let Some(window) = self.window.take() {
            self.tool.close_window(&window);
        }
    }
}

/// Запуск "программ", которые открывают окна в FakeWindowTool
pub struct FakeLauncher {
    tool: Arc<FakeWindowTool>,
    state: Mutex<LauncherState>,
}

impl FakeLauncher {
    pub fn new(tool: Arc<FakeWindowTool>) -> Self {
        Self {
            tool,
            state: Mutex::new(LauncherState { next_pid: 1000, ..Default::default() }),
        }
    }

    fn behavior_mut<'a>(state: &'a mut LauncherState, class: &str) -> &'a mut LaunchBehavior {
        state.behavior.entry(class.to_string()).or_default()
    }

    pub fn set_opens_window(&self, class: &str, opens: bool) {
        Self::behavior_mut(&mut self.state.lock(), class).opens_window = opens;
    }

    pub fn set_dies_on_launch(&self, class: &str, dies: bool) {
        Self::behavior_mut(&mut self.state.lock(), class).dies_on_launch = dies;
    }

    /// Следующие `count` запусков вернут ошибку запуска
    pub fn fail_next_launches(&self, class: &str, count: u32) {
        Self::behavior_mut(&mut self.state.lock(), class).fail_launches = count;
    }

    pub fn launches(&self, class: &str) -> usize {
        self.state.lock().launches.get(class).copied().unwrap_or(0)
    }

    pub fn reaps(&self, class: &str) -> usize {
        self.state.lock().reaps.get(class).copied().unwrap_or(0)
    }

    /// Процесс убит извне: флаг жизни сброшен, окно закрыто
    pub fn kill_external(&self, class: &str) {
        let processes = self.state.lock().alive.remove(class).unwrap_or_default();
        for (alive, window) in processes {
            alive.store(false, Ordering::SeqCst);
            if let Some(window) = window {
                self.tool.close_window(&window);
            }
        }
    }
}

#[async_trait::async_trait]
impl Launcher for FakeLauncher {
    async fn launch(&self, spec: &ProgramSpec) -> Result<Box<dyn ManagedProcess>> {
        let class = spec.window_class.clone();
        let mut state = self.state.lock();
        *state.launches.entry(class.clone()).or_default() += 1;

        let behavior = Self::behavior_mut(&mut state, &class);
        if behavior.fail_launches > 0 {
            behavior.fail_launches -= 1;
            return Err(kiosk_error!(launch, "{}: запуск не удался", class));
        }
        let behavior = behavior.clone();

        state.next_pid += 1;
        let pid = state.next_pid;
        let alive = Arc::new(AtomicBool::new(!behavior.dies_on_launch));

        let window = if behavior.opens_window && !behavior.dies_on_launch {
            Some(self.tool.open_window(&class, WindowGeometry { x: 40, y: 40, width: 800, height: 480 }))
        } else {
            None
        };

        state
            .alive
            .entry(class)
            .or_default()
            .push((alive.clone(), window.clone()));

        Ok(Box::new(FakeProcess { pid, alive, window, tool: self.tool.clone() }))
    }

    async fn reap_strays(&self, spec: &ProgramSpec) {
        *self.state.lock().reaps.entry(spec.window_class.clone()).or_default() += 1;
    }
}

/// Контроллер-заглушка: записывает запросы сторожей
pub struct RecordingSwitch {
    state: Mutex<ForegroundSnapshot>,
    requests: Mutex<Vec<ProgramRole>>,
    activity_records: Mutex<usize>,
    health_checks: Mutex<usize>,
}

impl RecordingSwitch {
    pub fn new(current: ProgramRole) -> Self {
        let now = Instant::now();
        Self {
            state: Mutex::new(ForegroundSnapshot {
                current,
                last_activity: now,
                last_switch: None,
                started_at: now,
            }),
            requests: Mutex::new(Vec::new()),
            activity_records: Mutex::new(0),
            health_checks: Mutex::new(0),
        }
    }

    pub fn requests(&self) -> Vec<ProgramRole> {
        self.requests.lock().clone()
    }

    pub fn activity_records(&self) -> usize {
        *self.activity_records.lock()
    }

    pub fn health_checks(&self) -> usize {
        *self.health_checks.lock()
    }

    pub fn set_current(&self, current: ProgramRole) {
        self.state.lock().current = current;
    }
}

#[async_trait::async_trait]
impl ForegroundSwitch for RecordingSwitch {
    fn snapshot(&self) -> ForegroundSnapshot {
        *self.state.lock()
    }

    fn record_activity(&self) {
        *self.activity_records.lock() += 1;
        self.state.lock().last_activity = Instant::now();
    }

    async fn request_switch(&self, target: ProgramRole) -> SwitchOutcome {
        self.requests.lock().push(target);
        let mut state = self.state.lock();
        if state.current == target {
            return SwitchOutcome::AlreadyCurrent;
        }
        let now = Instant::now();
        state.current = target;
        state.last_switch = Some(now);
        state.last_activity = now;
        SwitchOutcome::Switched
    }

    async fn check_health(&self) -> HealthReport {
        *self.health_checks.lock() += 1;
        if self.state.lock().current == ProgramRole::Primary {
            HealthReport::Healthy
        } else {
            HealthReport::NotForeground
        }
    }
}
