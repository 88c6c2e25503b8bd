//! ForegroundController: the only owner of foreground state and process handles.
//!
//! All transitions run under one async mutex (the switch lock) so that process and
//! window side effects of a switch are atomic for every caller. Watchdogs only read
//! snapshots and request transitions through [`ForegroundSwitch`].

use crate::config::{Config, SwitchingConfig};
use crate::error::KioskError;
use crate::events::WindowHandle;
use crate::services::process::Launcher;
use crate::services::program::{ProgramRole, ProgramSpec, SupervisedProgram};
use crate::services::window_policy::WindowPolicy;
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, error, info, warn};

/// Сколько ждём освобождения блокировки переключения при остановке
const SHUTDOWN_LOCK_WAIT: Duration = Duration::from_secs(5);

/// Снимок состояния переднего плана для сторожей (только чтение)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForegroundSnapshot {
    pub current: ProgramRole,
    pub last_activity: Instant,
    pub last_switch: Option<Instant>,
    pub started_at: Instant,
}

impl ForegroundSnapshot {
    pub fn startup_grace_elapsed(&self, grace: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.started_at) >= grace
    }

    pub fn inactive_for(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_activity)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    Switched,
    AlreadyCurrent,
    CoolingDown,
    /// Потолок перезапусков цели достигнут, текущая программа не тронута
    RestartsExhausted,
    /// Цель не поднялась; предыдущая программа возвращена на передний план
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthReport {
    NotForeground,
    Healthy,
    Recovered,
    Down,
}

/// Состояние программы для диагностики и тестов
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramStatus {
    pub alive: bool,
    pub pid: Option<u32>,
    pub last_window: Option<WindowHandle>,
    pub restart_count: u32,
}

/// Публичная поверхность контроллера для сторожей
#[async_trait::async_trait]
pub trait ForegroundSwitch: Send + Sync {
    fn snapshot(&self) -> ForegroundSnapshot;

    /// Обновить время последней активности пользователя
    fn record_activity(&self);

    async fn request_switch(&self, target: ProgramRole) -> SwitchOutcome;

    /// Проверка здоровья primary, пока он на переднем плане
    async fn check_health(&self) -> HealthReport;
}

#[derive(Debug, Error)]
enum LaunchFailure {
    #[error("{0}")]
    Spawn(#[from] KioskError),
    #[error("процесс завершился до появления окна")]
    Died,
    #[error("окно не появилось за {0:?}")]
    WindowTimeout(Duration),
}

struct Programs {
    primary: SupervisedProgram,
    idle: SupervisedProgram,
}

impl Programs {
    fn get_mut(&mut self, role: ProgramRole) -> &mut SupervisedProgram {
        match role {
            ProgramRole::Primary => &mut self.primary,
            ProgramRole::Idle => &mut self.idle,
        }
    }
}

pub struct ForegroundController {
    timings: SwitchingConfig,
    launcher: Arc<dyn Launcher>,
    policy: WindowPolicy,
    specs: [ProgramSpec; 2],
    // Блокировка переключения: держится на всё время перехода
    programs: Mutex<Programs>,
    state: RwLock<ForegroundSnapshot>,
}

impl ForegroundController {
    pub fn new(config: &Config, launcher: Arc<dyn Launcher>, policy: WindowPolicy) -> Self {
        let primary = SupervisedProgram::from_config(ProgramRole::Primary, config);
        let idle = SupervisedProgram::from_config(ProgramRole::Idle, config);
        let now = Instant::now();

        Self {
            timings: config.switching.clone(),
            launcher,
            policy,
            specs: [primary.spec.clone(), idle.spec.clone()],
            programs: Mutex::new(Programs { primary, idle }),
            state: RwLock::new(ForegroundSnapshot {
                current: ProgramRole::Primary,
                last_activity: now,
                last_switch: None,
                started_at: now,
            }),
        }
    }

    /// Первый запуск: primary выводится на передний план с политикой перезапусков
    pub async fn start(&self) -> bool {
        let mut programs = self.programs.lock().await;
        info!("Запуск primary при старте супервизора");

        let ok = self.launch_until_ready(programs.get_mut(ProgramRole::Primary)).await;

        let mut state = self.state.write();
        state.current = ProgramRole::Primary;
        state.last_activity = Instant::now();
        ok
    }

    pub async fn program_status(&self, role: ProgramRole) -> ProgramStatus {
        let mut programs = self.programs.lock().await;
        let program = programs.get_mut(role);
        ProgramStatus {
            alive: program.is_alive(),
            pid: program.pid(),
            last_window: program.last_window.clone(),
            restart_count: program.restart_count,
        }
    }

    async fn switch_to(&self, target: ProgramRole) -> SwitchOutcome {
        let mut programs = self.programs.lock().await;
        let snapshot = *self.state.read();

        if snapshot.current == target {
            return SwitchOutcome::AlreadyCurrent;
        }

        let cooldown = self.timings.cooldown();
        if let Some(last_switch) = snapshot.last_switch {
            if Instant::now().saturating_duration_since(last_switch) < cooldown {
                info!("Переключение в {} пропущено: пауза {:?} после прошлого переключения", target, cooldown);
                return SwitchOutcome::CoolingDown;
            }
        }

        {
            let program = programs.get_mut(target);
            if program.restarts_exhausted() && !program.is_alive() {
                error!(
                    critical = true,
                    "{} недоступен: потолок перезапусков ({}) достигнут, нужна ручная проверка",
                    target,
                    program.restart_count
                );
                return SwitchOutcome::RestartsExhausted;
            }
        }

        info!("Переключение {} -> {}", snapshot.current, target);

        // Вторая программа не должна оставаться запущенной: ресурсы и фокус ввода
        Self::kill_program(programs.get_mut(snapshot.current)).await;
        sleep(self.timings.settle_delay()).await;

        let ok = self.bring_up(programs.get_mut(target)).await;
        if !ok {
            warn!("Не удалось вывести {} на передний план, возврат к {}", target, snapshot.current);
            let previous = programs.get_mut(snapshot.current);
            if !previous.restarts_exhausted() && !self.bring_up(previous).await {
                error!("{} не удалось вернуть на передний план", snapshot.current);
            }
        }

        let now = Instant::now();
        let mut state = self.state.write();
        state.last_switch = Some(now);
        if ok {
            state.current = target;
            state.last_activity = now;
            info!("Передний план: {}", target);
            SwitchOutcome::Switched
        } else {
            SwitchOutcome::Failed
        }
    }

    /// Убедиться, что процесс жив, окно активно и развёрнуто
    async fn bring_up(&self, program: &mut SupervisedProgram) -> bool {
        let class = program.window_class().to_owned();

        if program.is_alive() {
            self.policy.activate(&class).await;
            self.policy.ensure_fullscreen(&class, false).await;
        } else {
            warn!("{} не запущен, запускаем", program.role());
            if !self.launch_until_ready(program).await {
                return false;
            }
        }

        if program.role() != ProgramRole::Primary {
            return true;
        }

        // Окно могло застрять в погашенном состоянии
        self.policy.wake(&class).await;
        sleep(self.timings.wake_verify_delay()).await;

        match self.policy.find_window(&class).await {
            Some(window) => {
                program.last_window = Some(window.handle);
                true
            }
            None => {
                error!("Окно {} не видно после активации, перезапуск", class);
                self.restart(program).await
            }
        }
    }

    async fn check_primary(&self) -> HealthReport {
        let mut programs = self.programs.lock().await;
        if self.state.read().current != ProgramRole::Primary {
            return HealthReport::NotForeground;
        }

        let primary = programs.get_mut(ProgramRole::Primary);
        if !primary.is_alive() {
            if primary.restarts_exhausted() {
                debug!("primary остаётся остановленным: потолок перезапусков достигнут");
                return HealthReport::Down;
            }
            warn!("primary (PID: {:?}) завершился, перезапуск", primary.last_pid);
            return if self.restart(primary).await {
                HealthReport::Recovered
            } else {
                HealthReport::Down
            };
        }

        let pid = primary.pid();
        if pid != primary.last_pid {
            warn!("PID primary изменился: {:?} -> {:?}", primary.last_pid, pid);
            primary.last_pid = pid;
        }

        let class = primary.window_class().to_owned();
        if let Some(window) = self.policy.find_window(&class).await {
            if primary.last_window.as_ref() != Some(&window.handle) {
                warn!(
                    "Окно primary пересоздано: {:?} -> {}",
                    primary.last_window, window.handle
                );
                primary.last_window = Some(window.handle);
                self.policy.activate(&class).await;
            }
        }

        self.policy.ensure_fullscreen(&class, false).await;
        HealthReport::Healthy
    }

    /// Политика перезапуска после наблюдаемого сбоя
    async fn restart(&self, program: &mut SupervisedProgram) -> bool {
        if program.register_failure() {
            Self::kill_program(program).await;
            Self::give_up(program);
            return false;
        }

        warn!("Перезапуск {} (подряд: {})", program.role(), program.restart_count);
        Self::kill_program(program).await;
        sleep(self.timings.restart_backoff()).await;
        self.launch_until_ready(program).await
    }

    /// Запуск с ожиданием окна; при неудаче - backoff и новая попытка до потолка.
    /// У программы без потолка (idle) ровно одна попытка: повтор сделает следующий опрос.
    async fn launch_until_ready(&self, program: &mut SupervisedProgram) -> bool {
        loop {
            if program.restarts_exhausted() {
                Self::give_up(program);
                return false;
            }

            match self.launch_and_detect(program).await {
                Ok(window) => {
                    program.register_success(window);
                    let class = program.window_class().to_owned();
                    self.policy.activate(&class).await;
                    self.policy.ensure_fullscreen(&class, false).await;
                    info!(
                        "{} запущен (PID: {:?}, окно: {:?})",
                        program.role(),
                        program.last_pid,
                        program.last_window
                    );
                    return true;
                }
                Err(e) => {
                    warn!("{} не запустился: {}", program.role(), e);
                    let exhausted = program.register_failure();
                    Self::kill_program(program).await;

                    if program.max_restarts.is_none() {
                        return false;
                    }
                    if exhausted {
                        Self::give_up(program);
                        return false;
                    }

                    warn!("Повторный запуск {} (подряд: {})", program.role(), program.restart_count);
                    sleep(self.timings.restart_backoff()).await;
                }
            }
        }
    }

    async fn launch_and_detect(
        &self,
        program: &mut SupervisedProgram,
    ) -> Result<Option<WindowHandle>, LaunchFailure> {
        Self::kill_program(program).await;
        self.launcher.reap_strays(&program.spec).await;

        let process = self.launcher.launch(&program.spec).await?;
        program.last_pid = Some(process.pid());
        program.process = Some(process);

        self.wait_for_window(program).await
    }

    /// Опрос окна каждые `window_poll` до таймаута; смерть процесса прерывает ожидание
    async fn wait_for_window(
        &self,
        program: &mut SupervisedProgram,
    ) -> Result<Option<WindowHandle>, LaunchFailure> {
        let timeout = program.spec.window_timeout;
        let deadline = Instant::now() + timeout;
        let class = program.window_class().to_owned();

        loop {
            if let Some(window) = self.policy.find_window(&class).await {
                info!("Окно {} появилось ({})", class, window.handle);
                return Ok(Some(window.handle));
            }
            if !program.is_alive() {
                return Err(LaunchFailure::Died);
            }
            if Instant::now() >= deadline {
                break;
            }
            sleep(self.timings.window_poll()).await;
        }

        if program.max_restarts.is_none() {
            // Для заставки окно не обязательно: активируем при следующей возможности
            warn!("Окно {} не появилось за {:?}, процесс работает", class, timeout);
            return Ok(None);
        }
        Err(LaunchFailure::WindowTimeout(timeout))
    }

    async fn kill_program(program: &mut SupervisedProgram) {
        if let Some(mut process) = program.process.take() {
            debug!("SIGKILL {} (PID: {})", program.role(), process.pid());
            process.kill().await;
        }
    }

    fn give_up(program: &SupervisedProgram) {
        error!(
            critical = true,
            "{} перезапускался {} раз подряд без успеха, автоматические перезапуски остановлены",
            program.role(),
            program.restart_count
        );
    }

    /// Остановка супервизора: обе программы убиваются безусловно, без штатного пути
    pub async fn terminate_all(&self) {
        match tokio::time::timeout(SHUTDOWN_LOCK_WAIT, self.programs.lock()).await {
            Ok(mut programs) => {
                for role in [ProgramRole::Primary, ProgramRole::Idle] {
                    Self::kill_program(programs.get_mut(role)).await;
                }
            }
            Err(_) => {
                warn!("Блокировка переключения занята, завершаем программы по командной строке");
                for spec in &self.specs {
                    self.launcher.reap_strays(spec).await;
                }
            }
        }
        info!("Все программы остановлены");
    }
}

#[async_trait::async_trait]
impl ForegroundSwitch for ForegroundController {
    fn snapshot(&self) -> ForegroundSnapshot {
        *self.state.read()
    }

    fn record_activity(&self) {
        self.state.write().last_activity = Instant::now();
    }

    async fn request_switch(&self, target: ProgramRole) -> SwitchOutcome {
        self.switch_to(target).await
    }

    async fn check_health(&self) -> HealthReport {
        self.check_primary().await
    }
}
