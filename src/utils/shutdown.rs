use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::watch;

/// Общий флаг работы: все циклы сторожей проверяют его на каждой итерации
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    pub fn listener(&self) -> ShutdownListener {
        ShutdownListener {
            rx: self.tx.subscribe(),
        }
    }

    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }
}

#[derive(Clone)]
pub struct ShutdownListener {
    rx: watch::Receiver<bool>,
}

impl ShutdownListener {
    pub fn is_running(&self) -> bool {
        !*self.rx.borrow()
    }

    /// Дождаться остановки (возвращается сразу, если она уже запрошена)
    pub async fn stopped(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Подписка на SIGINT и SIGTERM. Обработчики ставятся сразу при создании,
/// поэтому сигнал, пришедший до первого `recv`, не теряется.
pub struct ExitSignals {
    interrupt: Signal,
    terminate: Signal,
}

impl ExitSignals {
    pub fn install() -> std::io::Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Дождаться сигнала завершения и вернуть его имя
    pub async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}
