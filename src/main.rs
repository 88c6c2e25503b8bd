use anyhow::Result;
use clap::Parser;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{error, info, warn};
mod config;
mod error;
mod events;
mod services;
#[cfg(test)]
mod test_support;
mod utils;

use config::Config;
use services::{
    create_launcher,
    create_watchdogs,
    create_window_tool,
    detect_screen_resolution,
    DryRunDesktop,
    ForegroundController,
    WindowPolicy,
};
use utils::{DisplayEnv, ExitSignals, Shutdown};

/// Сколько ждём завершения сторожей при остановке
const SHUTDOWN_TIMEOUT: tokio::time::Duration = tokio::time::Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "kiosk-supervisor")]
#[command(about = "Супервизор переднего плана киоска: основное приложение и заставка")]
struct Args {
    /// Путь к файлу конфигурации
    #[arg(short, long, default_value = "kiosk.toml")]
    config: String,

    /// Режим сухого запуска (программы и окна эмулируются)
    #[arg(long)]
    dry_run: bool,

    /// Уровень логирования (по умолчанию из конфигурации)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    // Загрузка конфигурации
    let config = Config::load(&args.config)?;

    // Инициализация системы логирования
    let level = args.log_level.as_deref().unwrap_or(&config.logging.level);
    init_tracing(level, &config.logging.format)?;

    info!("Запуск kiosk-supervisor v{}", env!("CARGO_PKG_VERSION"));
    info!("Конфигурация загружена из: {}", args.config);
    config.warn_on_ambiguous_classes();

    if args.dry_run {
        warn!("Режим сухого запуска - программы и окна эмулируются");
    } else {
        // Проверка прав доступа
        utils::permissions::ensure_root()?;
        if let Err(e) = utils::permissions::check_input_devices_access() {
            warn!("{}", e);
        }
    }

    // Инициализация компонентов (общий эмулируемый рабочий стол нужен только в dry-run)
    let display = DisplayEnv::from_config(&config.display);
    let desktop = Arc::new(DryRunDesktop::new());
    let window_tool = create_window_tool(&config, desktop.clone(), args.dry_run);
    let launcher = create_launcher(&config, desktop, args.dry_run);

    let screen = if args.dry_run {
        config.display.fallback_screen()
    } else {
        detect_screen_resolution(&display, config.display.fallback_screen()).await
    };
    info!("Разрешение экрана: {}", screen);

    let policy = WindowPolicy::new(window_tool, screen, &config.display);
    let controller = Arc::new(ForegroundController::new(&config, launcher, policy));

    info!("Все компоненты инициализированы");

    // Сигналы ловим уже во время старта: запуск primary может занять минуты
    let mut signals = ExitSignals::install()?;

    let shutdown = Shutdown::new();
    let mut tasks = JoinSet::new();

    let started = tokio::select! {
        ok = controller.start() => Some(ok),
        received = signals.recv() => {
            info!("Получен сигнал завершения ({}) во время старта", received);
            None
        }
    };

    let exit_code = match started {
        None => ExitCode::SUCCESS,
        Some(ok) => {
            if !ok {
                error!("primary не запустился при старте, сторожа продолжат попытки");
            }

            // Запуск всех сторожей параллельно
            for watchdog in create_watchdogs(&config, controller.clone(), display, args.dry_run) {
                let name = watchdog.name();
                let listener = shutdown.listener();
                tasks.spawn(async move { (name, watchdog.run(listener).await) });
            }
            info!("Все сторожа запущены ({})", tasks.len());

            wait_for_exit(&mut tasks, &mut signals).await
        }
    };

    info!("Завершение работы...");
    shutdown.trigger();

    // Ожидаем завершения сторожей (с таймаутом)
    let shutdown_result = tokio::time::timeout(SHUTDOWN_TIMEOUT, async {
        while tasks.join_next().await.is_some() {}
    })
    .await;

    match shutdown_result {
        Ok(_) => info!("Все сторожа завершили работу корректно"),
        Err(_) => {
            warn!("Таймаут при завершении сторожей");
            tasks.abort_all();
        }
    }

    controller.terminate_all().await;

    info!("kiosk-supervisor завершил работу");
    Ok(exit_code)
}

/// Ждать сигнала завершения или падения сторожа
async fn wait_for_exit(
    tasks: &mut JoinSet<(&'static str, error::Result<()>)>,
    signals: &mut ExitSignals,
) -> ExitCode {
    loop {
        tokio::select! {
            received = signals.recv() => {
                info!("Получен сигнал завершения ({})", received);
                return ExitCode::SUCCESS;
            }
            Some(joined) = tasks.join_next() => match joined {
                Ok((name, Ok(()))) => warn!("Сторож {} завершился", name),
                Ok((name, Err(e))) => {
                    error!("Ошибка в стороже {}: {}", name, e);
                    return ExitCode::FAILURE;
                }
                Err(e) => {
                    error!("Сторож упал: {}", e);
                    return ExitCode::FAILURE;
                }
            },
        }
    }
}

fn init_tracing(level: &str, format: &str) -> Result<()> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))?;

    let registry = tracing_subscriber::registry().with(filter);
    if format == "pretty" {
        registry.with(tracing_subscriber::fmt::layer().pretty()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().compact()).init();
    }

    Ok(())
}
